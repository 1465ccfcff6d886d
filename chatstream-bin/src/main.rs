use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chatstream_core::{
    EventHandler, EventStreamDecoder, RequestOptions, StreamOutcome, Usage,
    compare::{StreamRequest, decode_all},
    config::Config,
    guard::{InMemoryCredentials, Navigator},
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "chat event-stream decoder CLI", long_about = None)]
struct Cli {
    /// Config file (JSON or TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RequestArgs {
    /// JSON request body; the request is a POST when set, a GET otherwise
    #[arg(long)]
    body: Option<String>,

    /// Extra header as `name:value`, repeatable
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode one stream (prints fragments live)
    Decode {
        #[arg(long)]
        url: String,
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Decode several streams concurrently and print one summary per stream
    Compare {
        #[arg(long = "url", required = true)]
        urls: Vec<String>,
        #[command(flatten)]
        request: RequestArgs,
    },
}

impl RequestArgs {
    fn options(&self) -> anyhow::Result<RequestOptions> {
        let mut opts = match &self.body {
            Some(raw) => {
                let json: serde_json::Value = serde_json::from_str(raw)
                    .map_err(|e| anyhow::anyhow!("--body is not valid JSON: {e}"))?;
                RequestOptions::post_json(&json)?
            }
            None => RequestOptions::get(),
        };
        for h in &self.headers {
            let (name, value) = h
                .split_once(':')
                .ok_or_else(|| anyhow::anyhow!("header '{h}' must look like name:value"))?;
            opts = opts.header(name.trim(), value.trim())?;
        }
        Ok(opts)
    }
}

/// Prints fragments as they arrive and a summary line at the end.
#[derive(Default)]
struct Printer {
    saw_text: bool,
}

impl Printer {
    fn end_line(&mut self) {
        if self.saw_text {
            println!();
            self.saw_text = false;
        }
    }
}

impl EventHandler for Printer {
    fn on_start(&mut self, stream_id: &str) {
        eprintln!("[start: {stream_id}]");
    }

    fn on_chunk(&mut self, fragment: &str, _stream_id: &str) {
        self.saw_text = true;
        print!("{fragment}");
        io::stdout().flush().ok();
    }

    fn on_tool_call(
        &mut self,
        payload: &serde_json::Map<String, serde_json::Value>,
        _stream_id: Option<&str>,
        _usage: Option<&Usage>,
    ) {
        self.end_line();
        eprintln!("[tool call: {}]", serde_json::Value::Object(payload.clone()));
    }

    fn on_tool_response(
        &mut self,
        payload: &serde_json::Map<String, serde_json::Value>,
        _stream_id: Option<&str>,
        _usage: Option<&Usage>,
    ) {
        self.end_line();
        eprintln!("[tool result: {}]", serde_json::Value::Object(payload.clone()));
    }

    fn on_complete(&mut self, full_text: &str, stream_id: Option<&str>, usage: Option<&Usage>) {
        self.end_line();
        eprintln!(
            "[done: stream={} chars={} tokens={}]",
            stream_id.unwrap_or("-"),
            full_text.chars().count(),
            usage.and_then(Usage::total).map_or_else(|| "-".to_string(), |t| t.to_string()),
        );
    }

    fn on_error(&mut self, message: &str, code: Option<&str>, http_status: Option<u16>) {
        self.end_line();
        eprintln!("[error: {message} code={code:?} status={http_status:?}]");
    }
}

/// A terminal has no login screen; tell the user what to do instead.
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn current_path(&self) -> String {
        "/".to_string()
    }

    fn navigate(&self, path: &str) {
        eprintln!("[session expired: log in again ({path}) and refresh CHATSTREAM_TOKEN]");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    let credentials = Arc::new(InMemoryCredentials::default());
    if let Ok(token) = std::env::var("CHATSTREAM_TOKEN") {
        credentials.set(token);
    }
    let decoder = EventStreamDecoder::from_config(&cfg)?
        .with_credentials(credentials)
        .with_navigator(Arc::new(ConsoleNavigator));

    match cli.command {
        Commands::Decode { url, request } => {
            let mut printer = Printer::default();
            let outcome = decoder.decode(&url, request.options()?, &mut printer).await?;
            printer.end_line();
            if outcome == StreamOutcome::Ended {
                eprintln!("[stream ended without completion]");
            }
            if !matches!(outcome, StreamOutcome::Completed) {
                std::process::exit(1);
            }
        }
        Commands::Compare { urls, request } => {
            let options = request.options()?;
            let requests = urls
                .into_iter()
                .map(|url| StreamRequest::new(url.clone(), url, options.clone()))
                .collect();
            for summary in decode_all(&decoder, requests).await {
                println!("{}", serde_json::to_string(&summary)?);
            }
        }
    }

    Ok(())
}
