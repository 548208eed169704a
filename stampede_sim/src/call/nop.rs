//! The no-op backend.

use super::{DispatchError, Dispatcher};
use crate::attributes::Attributes;
use crate::scope::Scope;
use async_trait::async_trait;
use stampede_config::Call;

/// Performs no side effect and returns the input attributes unchanged.
pub struct NopDispatcher;

#[async_trait]
impl Dispatcher for NopDispatcher {
    async fn dispatch(
        &self,
        _scope: &Scope,
        _call: &Call,
        attributes: &Attributes,
    ) -> Result<Attributes, DispatchError> {
        Ok(attributes.clone())
    }
}
