//! Evaluates entity-set cardinality terms against an attribute store.

use crate::attributes::Attributes;
use stampede_config::Value;
use thiserror::Error;

/// Errors raised while resolving a cardinality term.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardinalityError {
    #[error("cannot parse cardinality {0:?} as an integer")]
    Unparseable(String),

    #[error("cardinality attribute {0:?} is neither an integer nor a string")]
    UnsupportedType(String),
}

/// Resolves a cardinality term: the empty term means one instance, a term
/// naming an attribute reads that attribute (integers verbatim, strings
/// parsed as decimal), and anything else is parsed as a decimal literal.
pub fn resolve_cardinality(
    term: &str,
    attributes: &Attributes,
) -> Result<i64, CardinalityError> {
    match attributes.get(term) {
        Some(Value::Int(value)) => Ok(*value),
        Some(Value::Str(text)) => text
            .parse()
            .map_err(|_| CardinalityError::Unparseable(text.clone())),
        Some(_) => Err(CardinalityError::UnsupportedType(term.to_string())),
        None => {
            if term.is_empty() {
                return Ok(1);
            }
            term.parse()
                .map_err(|_| CardinalityError::Unparseable(term.to_string()))
        }
    }
}
