//! Serde support for the suffixed duration grammar used by timers.
//!
//! Accepted units are `ns`, `us`, `ms`, `s`, `m` and `h`; segments compose
//! (`1m30s`) and fractions are allowed (`1.5s`). A bare `0` is valid. Plain
//! integers are read as nanoseconds.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Parses a suffixed duration string.
pub fn parse(input: &str) -> Result<Duration, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError(input.to_string()));
    }
    if trimmed == "0" {
        return Ok(Duration::ZERO);
    }
    let mut total = Duration::ZERO;
    let mut rest = trimmed;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(ParseError(input.to_string()));
        }
        let value: f64 = rest[..digits]
            .parse()
            .map_err(|_| ParseError(input.to_string()))?;
        rest = &rest[digits..];
        let (nanos_per_unit, unit_len) = if rest.starts_with("ns") {
            (1.0, 2)
        } else if rest.starts_with("us") {
            (1_000.0, 2)
        } else if rest.starts_with("ms") {
            (1_000_000.0, 2)
        } else if rest.starts_with('s') {
            (1_000_000_000.0, 1)
        } else if rest.starts_with('m') {
            (60_000_000_000.0, 1)
        } else if rest.starts_with('h') {
            (3_600_000_000_000.0, 1)
        } else {
            return Err(ParseError(input.to_string()));
        };
        total += Duration::from_nanos((value * nanos_per_unit) as u64);
        rest = &rest[unit_len..];
    }
    Ok(total)
}

/// The input was not a valid suffixed duration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid duration {0:?}")]
pub struct ParseError(pub String);

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Input {
        Text(String),
        Nanos(u64),
    }

    match Input::deserialize(deserializer)? {
        Input::Text(raw) => parse(&raw).map_err(D::Error::custom),
        Input::Nanos(value) => Ok(Duration::from_nanos(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        assert_eq!(parse("250ms").expect("ms"), Duration::from_millis(250));
        assert_eq!(parse("10ns").expect("ns"), Duration::from_nanos(10));
        assert_eq!(parse("5us").expect("us"), Duration::from_micros(5));
        assert_eq!(parse("2s").expect("s"), Duration::from_secs(2));
        assert_eq!(parse("3m").expect("m"), Duration::from_secs(180));
        assert_eq!(parse("1h").expect("h"), Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_composed_and_fractional() {
        assert_eq!(parse("1m30s").expect("composed"), Duration::from_secs(90));
        assert_eq!(parse("1.5s").expect("fraction"), Duration::from_millis(1500));
        assert_eq!(parse("0").expect("zero"), Duration::ZERO);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("").is_err());
        assert!(parse("10").is_err());
        assert!(parse("s").is_err());
        assert!(parse("ten seconds").is_err());
    }

    #[test]
    fn test_deserialize_string_or_nanos() {
        #[derive(Deserialize)]
        struct Wrapper {
            #[serde(with = "super")]
            interval: Duration,
        }

        let parsed: Wrapper = serde_yaml::from_str("interval: 20ms").expect("string");
        assert_eq!(parsed.interval, Duration::from_millis(20));

        let parsed: Wrapper = serde_yaml::from_str("interval: 1000").expect("nanos");
        assert_eq!(parsed.interval, Duration::from_nanos(1000));
    }
}
