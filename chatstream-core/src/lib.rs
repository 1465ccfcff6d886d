pub mod compare;
pub mod config;
pub mod decoder;
pub mod dialect;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod guard;
pub mod handler;
pub mod http_client;
pub mod lines;
pub mod normalizer;
pub mod stream;
pub mod telemetry;
pub mod transport;
#[cfg(test)]
pub mod test_util;

pub use decoder::EventStreamDecoder;
pub use error::{ChatStreamError, CoreResult};
pub use handler::{Callbacks, EventHandler, EventLog};
pub use stream::{StreamEvent, StreamOutcome, Usage};
pub use transport::RequestOptions;
