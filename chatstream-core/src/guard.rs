//! Response inspection before any body byte is read.
//!
//! `PENDING → {OK, AUTH_EXPIRED, HTTP_ERROR}`: only an OK response hands its
//! body to the line assembler.

use std::sync::Mutex;

use http::HeaderValue;
use http::header::{ACCEPT, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};

use crate::config::DecoderCfg;
use crate::transport::{ByteStream, RequestOptions, TransportResponse};

pub const EVENT_STREAM: &str = "text/event-stream";

/// Locally held session credential.
pub trait CredentialStore: Send + Sync {
    fn token(&self) -> Option<SecretString>;
    fn clear(&self);
}

/// Moves the user to another screen, e.g. the login page.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn navigate(&self, path: &str);
}

/// Process-local credential holder.
#[derive(Default)]
pub struct InMemoryCredentials {
    token: Mutex<Option<SecretString>>,
}

impl InMemoryCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        let store = Self::default();
        store.set(token);
        store
    }

    pub fn set(&self, token: impl Into<String>) {
        let secret = SecretString::new(token.into().into_boxed_str());
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(secret);
    }

    pub fn is_set(&self) -> bool {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }
}

impl std::fmt::Debug for InMemoryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCredentials")
            .field("set", &self.is_set())
            .finish()
    }
}

impl CredentialStore for InMemoryCredentials {
    fn token(&self) -> Option<SecretString> {
        self.token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|s| SecretString::new(s.expose_secret().into()))
    }

    fn clear(&self) {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

pub enum GuardDecision {
    Proceed(ByteStream),
    AuthExpired,
    HttpError(u16),
}

impl std::fmt::Debug for GuardDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proceed(_) => f.write_str("Proceed(..)"),
            Self::AuthExpired => f.write_str("AuthExpired"),
            Self::HttpError(s) => f.debug_tuple("HttpError").field(s).finish(),
        }
    }
}

pub struct TransportGuard<'a> {
    cfg: &'a DecoderCfg,
    credentials: &'a dyn CredentialStore,
    navigator: Option<&'a dyn Navigator>,
}

impl<'a> TransportGuard<'a> {
    pub fn new(
        cfg: &'a DecoderCfg,
        credentials: &'a dyn CredentialStore,
        navigator: Option<&'a dyn Navigator>,
    ) -> Self {
        Self {
            cfg,
            credentials,
            navigator,
        }
    }

    /// Forces `Accept: text/event-stream` and adds a bearer token when the
    /// caller did not set `Authorization` themselves.
    pub fn prepare(&self, options: &mut RequestOptions) {
        options
            .headers
            .insert(ACCEPT, HeaderValue::from_static(EVENT_STREAM));
        if options.headers.contains_key(AUTHORIZATION) {
            return;
        }
        if let Some(token) = self.credentials.token() {
            match HeaderValue::from_str(&format!("Bearer {}", token.expose_secret())) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    options.headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("stored credential is not a valid header value; sending without it"),
            }
        }
    }

    /// Decides what happens to a response. The body is dropped unread unless
    /// the status is a success.
    pub fn inspect(&self, response: TransportResponse) -> GuardDecision {
        let status = response.status;
        if status.as_u16() == self.cfg.auth_expiry_status {
            tracing::warn!(status = status.as_u16(), "session expired; clearing credentials");
            self.credentials.clear();
            if let Some(nav) = self.navigator
                && nav.current_path() != self.cfg.login_path
            {
                nav.navigate(&self.cfg.login_path);
            }
            return GuardDecision::AuthExpired;
        }
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), request_id = ?response.request_id, "stream request failed");
            return GuardDecision::HttpError(status.as_u16());
        }
        GuardDecision::Proceed(response.body)
    }
}
