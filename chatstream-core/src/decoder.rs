//! Decode entry point and read loop.

use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use tracing::field::Empty;
use tracing_futures::Instrument;

use crate::config::{Config, DecoderCfg};
use crate::dialect::{Classified, classify};
use crate::dispatch::{StreamState, Terminal};
use crate::error::CoreResult;
use crate::frame::{Frame, extract_frame};
use crate::guard::{CredentialStore, GuardDecision, InMemoryCredentials, Navigator, TransportGuard};
use crate::handler::EventHandler;
use crate::http_client::HttpClient;
use crate::normalizer::normalize;
use crate::stream::{StreamOutcome, Usage};
use crate::telemetry::{self, StreamTrace};
use crate::transport::{ByteStream, RequestOptions, Transport};

/// Turns streamed HTTP responses into canonical handler callbacks.
///
/// One decoder can serve many concurrent `decode` calls; all per-stream state
/// lives inside the call.
#[derive(Clone)]
pub struct EventStreamDecoder {
    transport: Arc<dyn Transport>,
    cfg: DecoderCfg,
    credentials: Arc<dyn CredentialStore>,
    navigator: Option<Arc<dyn Navigator>>,
}

/// What the read loop saw, beyond the outcome.
#[derive(Debug, Default)]
struct ReadReport {
    stream_id: Option<String>,
    usage: Option<Usage>,
    frames: u64,
    skipped: u64,
}

impl EventStreamDecoder {
    pub fn new(transport: Arc<dyn Transport>, cfg: DecoderCfg) -> Self {
        Self {
            transport,
            cfg,
            credentials: Arc::new(InMemoryCredentials::default()),
            navigator: None,
        }
    }

    /// Decoder over a reqwest client built from `cfg.http`.
    pub fn from_config(cfg: &Config) -> CoreResult<Self> {
        cfg.validate()?;
        let http = HttpClient::new(&cfg.http)?;
        Ok(Self::new(Arc::new(http), cfg.decoder.clone()))
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn config(&self) -> &DecoderCfg {
        &self.cfg
    }

    /// Opens `url` and feeds the streamed response to `handler`.
    ///
    /// HTTP failures are reported through `handler.on_error` and the returned
    /// outcome; an auth expiry fires no callback at all. `Err` is reserved for
    /// the exchange itself failing, before or during the body.
    pub async fn decode<H: EventHandler + ?Sized>(
        &self,
        url: &str,
        options: RequestOptions,
        handler: &mut H,
    ) -> CoreResult<StreamOutcome> {
        let span = tracing::info_span!("chatstream.decode", url = %url, stream_id = Empty);
        self.decode_inner(url, options, handler).instrument(span).await
    }

    /// Runs the pipeline over an already opened body, skipping the transport
    /// guard.
    pub async fn decode_body<H: EventHandler + ?Sized>(
        &self,
        body: ByteStream,
        handler: &mut H,
    ) -> CoreResult<StreamOutcome> {
        let span = tracing::info_span!("chatstream.decode_body", stream_id = Empty);
        async {
            let (outcome, _) = self.read_loop(body, handler).await?;
            Ok(outcome)
        }
        .instrument(span)
        .await
    }

    async fn decode_inner<H: EventHandler + ?Sized>(
        &self,
        url: &str,
        mut options: RequestOptions,
        handler: &mut H,
    ) -> CoreResult<StreamOutcome> {
        let started = Instant::now();
        let guard = TransportGuard::new(&self.cfg, self.credentials.as_ref(), self.navigator.as_deref());
        guard.prepare(&mut options);

        let trace = StreamTrace::new().url(url);
        let response = match self.transport.send(url, options).await {
            Ok(r) => r,
            Err(e) => {
                telemetry::emit(trace.failed(&e.to_string()).latency_ms(started.elapsed().as_millis()));
                return Err(e);
            }
        };
        let trace = trace.request_id_opt(response.request_id.as_deref());

        let body = match guard.inspect(response) {
            GuardDecision::Proceed(body) => body,
            GuardDecision::AuthExpired => {
                let outcome = StreamOutcome::AuthExpired;
                telemetry::emit(trace.outcome(outcome).latency_ms(started.elapsed().as_millis()));
                return Ok(outcome);
            }
            GuardDecision::HttpError(status) => {
                handler.on_error(&http_error_message(status), None, Some(status));
                let outcome = StreamOutcome::HttpError(status);
                telemetry::emit(trace.outcome(outcome).latency_ms(started.elapsed().as_millis()));
                return Ok(outcome);
            }
        };

        match self.read_loop(body, handler).await {
            Ok((outcome, report)) => {
                telemetry::emit(
                    trace
                        .outcome(outcome)
                        .stream_id_opt(report.stream_id.as_deref())
                        .frames(report.frames, report.skipped)
                        .usage(report.usage.as_ref())
                        .latency_ms(started.elapsed().as_millis()),
                );
                Ok(outcome)
            }
            Err(e) => {
                telemetry::emit(trace.failed(&e.to_string()).latency_ms(started.elapsed().as_millis()));
                Err(e)
            }
        }
    }

    /// Reads `body` to its end. The body is owned here and dropped on every
    /// exit path, including a mid-stream read error.
    async fn read_loop<H: EventHandler + ?Sized>(
        &self,
        mut body: ByteStream,
        handler: &mut H,
    ) -> CoreResult<(StreamOutcome, ReadReport)> {
        let mut assembler = crate::lines::LineAssembler::new();
        let mut state = StreamState::default();
        let mut report = ReadReport::default();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for line in assembler.push(&chunk) {
                // keep draining, but nothing after a terminal event is processed
                if state.is_terminal() {
                    continue;
                }
                let Some(frame) = extract_frame(&line) else {
                    continue;
                };
                report.frames += 1;
                match frame {
                    Frame::Sentinel => state.complete(handler),
                    Frame::Payload(payload) => {
                        if !self.process_payload(payload, &mut state, handler) {
                            report.skipped += 1;
                        }
                    }
                }
            }
        }
        if let Some(tail) = assembler.finish() {
            tracing::debug!(bytes = tail.len(), "discarding unterminated trailing line");
        }

        let outcome = match state.terminal() {
            Terminal::Completed => StreamOutcome::Completed,
            Terminal::Errored => StreamOutcome::Errored,
            Terminal::Open => {
                tracing::debug!("stream ended without a terminal frame");
                StreamOutcome::Ended
            }
        };
        report.stream_id = state.stream_id().map(str::to_owned);
        report.usage = state.usage().cloned();
        Ok((outcome, report))
    }

    /// Returns false when the payload could not be decoded at all.
    fn process_payload<H: EventHandler + ?Sized>(
        &self,
        payload: &str,
        state: &mut StreamState,
        handler: &mut H,
    ) -> bool {
        match classify(payload, self.cfg.legacy_dialects) {
            Ok(Classified::Event(wire)) => {
                for step in normalize(wire, state, &self.cfg) {
                    state.apply(step, handler);
                }
                true
            }
            Ok(Classified::Unrecognized) => {
                tracing::debug!("ignoring payload matching no known dialect");
                true
            }
            Ok(Classified::Disabled(dialect)) => {
                tracing::debug!(dialect = dialect.as_str(), "legacy dialect disabled; frame ignored");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, payload = %preview(payload), "skipping undecodable frame");
                false
            }
        }
    }
}

impl std::fmt::Debug for EventStreamDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStreamDecoder")
            .field("cfg", &self.cfg)
            .field("navigator", &self.navigator.is_some())
            .finish_non_exhaustive()
    }
}

fn http_error_message(status: u16) -> String {
    format!("request failed with HTTP status {status}")
}

fn preview(s: &str) -> &str {
    const MAX: usize = 120;
    if s.len() <= MAX {
        return s;
    }
    let mut end = MAX;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
