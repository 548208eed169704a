//! Fatal simulation errors.

use crate::cardinality::CardinalityError;
use crate::sample::SampleError;
use thiserror::Error;

/// Errors that end the whole simulation: the scope is cancelled and the
/// error is logged once. Statically checkable variants are raised by model
/// compilation before anything runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("unknown entity {0:?}")]
    UnknownEntity(String),

    #[error("unknown state {0:?}")]
    UnknownState(String),

    #[error("negative transition probability {probability} in state {state:?}")]
    NegativeWeight { state: String, probability: f64 },

    #[error("transition probabilities of state {0:?} sum to zero")]
    ZeroWeightSum(String),

    #[error("attribute {0:?} has an empty list of values")]
    EmptyValues(String),

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error(transparent)]
    Cardinality(#[from] CardinalityError),
}
