use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::Client;
use reqwest::header::USER_AGENT;

use crate::config::HttpCfg;
use crate::error::{ChatStreamError, CoreResult};
use crate::transport::{RequestOptions, Transport, TransportResponse};

/// Thin wrapper around reqwest::Client with defaults and helpers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    user_agent: String,
}

impl HttpClient {
    pub fn new(cfg: &HttpCfg) -> CoreResult<Self> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .timeout(Duration::from_millis(cfg.request_timeout_ms));
        if let Some(n) = cfg.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(n);
        }
        let inner = builder
            .build()
            .map_err(|e| ChatStreamError::Other(anyhow::anyhow!("http client build failed: {e}")))?;
        Ok(Self {
            inner,
            user_agent: cfg.user_agent.clone(),
        })
    }

    pub fn new_default() -> CoreResult<Self> {
        Self::new(&HttpCfg::default())
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn send(&self, url: &str, options: RequestOptions) -> CoreResult<TransportResponse> {
        let RequestOptions {
            method,
            mut headers,
            body,
        } = options;
        if !headers.contains_key(USER_AGENT)
            && let Ok(ua) = self.user_agent.parse()
        {
            headers.insert(USER_AGENT, ua);
        }

        let mut req = self.inner.request(method, url).headers(headers);
        if let Some(body) = body {
            req = req.body(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ChatStreamError::transport(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        let request_id = extract_request_id(resp.headers());
        let body = resp
            .bytes_stream()
            .map_err(|e| ChatStreamError::transport(format!("body read failed: {e}")));
        Ok(TransportResponse {
            status,
            request_id,
            body: Box::pin(body),
        })
    }
}

fn extract_request_id(headers: &reqwest::header::HeaderMap) -> Option<String> {
    static CANDIDATES: [&str; 4] = ["x-request-id", "request-id", "x-trace-id", "x-correlation-id"];
    for k in CANDIDATES {
        if let Some(v) = headers.get(k)
            && let Ok(s) = v.to_str()
        {
            return Some(s.to_string());
        }
    }
    None
}
