//! Call dispatch: the backend contract and its implementations.

mod http;
mod kafka;
mod nop;

pub use http::HttpDispatcher;
pub use kafka::{KafkaDispatcher, MESSAGE_KEY_ATTRIBUTE, MESSAGE_TOPIC_ATTRIBUTE};
pub use nop::NopDispatcher;

use crate::attributes::Attributes;
use crate::scope::Scope;
use async_trait::async_trait;
use stampede_config::Call;
use thiserror::Error;

/// Executes one configured call against a backend.
///
/// Implementations must be safe for concurrent invocation by many walks. On
/// success the returned store is either the input store unchanged or the
/// input store augmented with the call's declared results; on failure the
/// caller's store is untouched and the state runner records the error.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(
        &self,
        scope: &Scope,
        call: &Call,
        attributes: &Attributes,
    ) -> Result<Attributes, DispatchError>;
}

/// Call failures, as observed by the state runner. The runner does not
/// distinguish transport failures from application failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("method not specified")]
    MissingMethod,

    #[error("url not specified")]
    MissingUrl,

    #[error("invalid method {0:?}")]
    InvalidMethod(String),

    #[error("received status code {0}")]
    Status(u16),

    #[error("key {0:?} not found in the response body")]
    MissingResultKey(String),

    #[error("attribute {0:?} not defined")]
    MissingAttribute(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode the response body: {0}")]
    Decode(String),

    #[error("failed to encode the message body: {0}")]
    Encode(String),
}
