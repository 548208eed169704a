//! Draws attribute values from their configured distributions.

use crate::rng::SimRng;
use rand::Rng;
use rand_distr::StandardNormal;
use stampede_config::{Attribute, AttributeKind, Value};
use std::collections::BTreeSet;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while sampling an attribute value. Sampling only fails on
/// an empty value list; every other variant is infallible.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error("empty list of values")]
    EmptyValues,
}

/// Draws one value from the distribution described by `spec`.
///
/// Numeric samples keep their natural numeric type; nothing is coerced to a
/// string at this layer.
pub fn sample(spec: &Attribute, rng: &SimRng) -> Result<Value, SampleError> {
    match spec.kind {
        AttributeKind::Int => Ok(Value::Int(spec.value as i64)),
        AttributeKind::RandomInt => Ok(Value::Int(rng.int_in(spec.min, spec.max))),
        AttributeKind::RandomFloat => Ok(Value::Float(rng.float_in(spec.min, spec.max))),
        AttributeKind::PowerFloat => {
            let exponent = spec.n + 1.0;
            let draw = rng.unit();
            let value = ((spec.max.powf(exponent) - spec.min.powf(exponent)) * draw
                + spec.min.powf(exponent))
            .powf(1.0 / exponent);
            Ok(Value::Float(value))
        }
        AttributeKind::NormalFloat => {
            let z: f64 = rng.with(|rng| rng.sample(StandardNormal));
            Ok(Value::Float((z * spec.std_dev + spec.n).abs()))
        }
        AttributeKind::String => Ok(Value::Str(spec.string_value.clone())),
        AttributeKind::RandomString => {
            if spec.string_value.is_empty() {
                return Ok(Value::Str(Uuid::new_v4().to_string()));
            }
            if spec.min != 0.0 || spec.max != 0.0 {
                let suffix = rng.int_in(spec.min, spec.max);
                return Ok(Value::Str(format!("{}{}", spec.string_value, suffix)));
            }
            Ok(Value::Str(format!("{}{}", spec.string_value, Uuid::new_v4())))
        }
        AttributeKind::RandomValue => {
            if spec.values.is_empty() {
                return Err(SampleError::EmptyValues);
            }
            Ok(spec.values[rng.index(spec.values.len())].clone())
        }
        AttributeKind::RandomSubset => {
            if spec.values.is_empty() {
                return Err(SampleError::EmptyValues);
            }
            // distinct indices, sampled with replacement: the subset size is
            // at most the draw count, which is uniform in [0, len)
            let draws = rng.index(spec.values.len());
            let mut picked = BTreeSet::new();
            for _ in 0..draws {
                picked.insert(rng.index(spec.values.len()));
            }
            Ok(Value::List(
                picked
                    .into_iter()
                    .map(|index| spec.values[index].clone())
                    .collect(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(kind: AttributeKind) -> Attribute {
        Attribute {
            kind,
            ..Attribute::default()
        }
    }

    #[test]
    fn test_fixed_values() {
        let rng = SimRng::seeded(1);

        let mut int = spec(AttributeKind::Int);
        int.value = 42.9;
        assert_eq!(sample(&int, &rng).expect("int"), Value::Int(42));

        let mut text = spec(AttributeKind::String);
        text.string_value = "fixed".to_string();
        assert_eq!(sample(&text, &rng).expect("string"), Value::from("fixed"));
    }

    #[test]
    fn test_uniform_bounds() {
        let rng = SimRng::seeded(2);

        let mut int = spec(AttributeKind::RandomInt);
        int.min = 10.0;
        int.max = 20.0;
        let mut float = spec(AttributeKind::RandomFloat);
        float.min = -1.0;
        float.max = 1.0;

        for _ in 0..512 {
            match sample(&int, &rng).expect("int") {
                Value::Int(value) => assert!((10..20).contains(&value)),
                other => panic!("unexpected value {other:?}"),
            }
            match sample(&float, &rng).expect("float") {
                Value::Float(value) => assert!((-1.0..1.0).contains(&value)),
                other => panic!("unexpected value {other:?}"),
            }
        }
    }

    #[test]
    fn test_power_float_stays_in_range() {
        let rng = SimRng::seeded(3);
        let mut power = spec(AttributeKind::PowerFloat);
        power.min = 1.0;
        power.max = 100.0;
        power.n = -2.5;

        for _ in 0..512 {
            match sample(&power, &rng).expect("power") {
                Value::Float(value) => assert!((1.0..=100.0).contains(&value)),
                other => panic!("unexpected value {other:?}"),
            }
        }
    }

    #[test]
    fn test_normal_float_is_non_negative() {
        let rng = SimRng::seeded(4);
        let mut normal = spec(AttributeKind::NormalFloat);
        normal.n = 0.0;
        normal.std_dev = 10.0;

        for _ in 0..512 {
            match sample(&normal, &rng).expect("normal") {
                Value::Float(value) => assert!(value >= 0.0),
                other => panic!("unexpected value {other:?}"),
            }
        }
    }

    #[test]
    fn test_normal_float_accepts_negative_std_dev() {
        // the deviation's sign folds away; only its magnitude matters
        let rng = SimRng::seeded(4);
        let mut normal = spec(AttributeKind::NormalFloat);
        normal.n = 5.0;
        normal.std_dev = -1.0;
        for _ in 0..64 {
            match sample(&normal, &rng).expect("normal") {
                Value::Float(value) => assert!(value >= 0.0),
                other => panic!("unexpected value {other:?}"),
            }
        }
    }

    #[test]
    fn test_random_string_variants() {
        let rng = SimRng::seeded(5);

        let bare = spec(AttributeKind::RandomString);
        let first = sample(&bare, &rng).expect("uuid");
        let second = sample(&bare, &rng).expect("uuid");
        assert_ne!(first, second);

        let mut prefixed = spec(AttributeKind::RandomString);
        prefixed.string_value = "user-".to_string();
        match sample(&prefixed, &rng).expect("prefixed") {
            Value::Str(value) => {
                assert!(value.starts_with("user-"));
                assert!(value.len() > "user-".len());
            }
            other => panic!("unexpected value {other:?}"),
        }

        let mut numbered = spec(AttributeKind::RandomString);
        numbered.string_value = "user-".to_string();
        numbered.min = 0.0;
        numbered.max = 100.0;
        for _ in 0..64 {
            match sample(&numbered, &rng).expect("numbered") {
                Value::Str(value) => {
                    let suffix: i64 = value
                        .strip_prefix("user-")
                        .expect("prefix")
                        .parse()
                        .expect("numeric suffix");
                    assert!((0..100).contains(&suffix));
                }
                other => panic!("unexpected value {other:?}"),
            }
        }
    }

    #[test]
    fn test_random_value_picks_members() {
        let rng = SimRng::seeded(6);
        let mut choice = spec(AttributeKind::RandomValue);
        choice.values = vec![Value::from("a"), Value::from("b"), Value::from("c")];

        for _ in 0..64 {
            let value = sample(&choice, &rng).expect("choice");
            assert!(choice.values.contains(&value));
        }

        choice.values.clear();
        assert_eq!(sample(&choice, &rng), Err(SampleError::EmptyValues));
    }

    #[test]
    fn test_random_subset_boundaries() {
        let rng = SimRng::seeded(7);
        let mut subset = spec(AttributeKind::RandomSubset);
        subset.values = vec![Value::from("a"), Value::from("b"), Value::from("c")];

        for _ in 0..512 {
            match sample(&subset, &rng).expect("subset") {
                Value::List(items) => {
                    // size is uniform over [0, len), elements unique members
                    assert!(items.len() < 3);
                    for item in &items {
                        assert!(subset.values.contains(item));
                    }
                    let unique: BTreeSet<String> =
                        items.iter().map(|item| item.to_string()).collect();
                    assert_eq!(unique.len(), items.len());
                }
                other => panic!("unexpected value {other:?}"),
            }
        }

        subset.values.clear();
        assert_eq!(sample(&subset, &rng), Err(SampleError::EmptyValues));
    }
}
