//! Declarative configuration model for the stampede workload simulator.
//!
//! A simulation document is a YAML tree with five top-level keys:
//! `constants`, `root-entities`, `entities`, `state` and `backend`. The
//! engine consumes this model read-only; all cross-reference validation
//! happens when the simulation compiles it.

pub mod duration;
mod value;

pub use value::Value;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read the configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse the configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The root of a simulation document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Simulation-wide constants, seeding the attribute store of every root
    /// entity set.
    #[serde(default)]
    pub constants: IndexMap<String, Value>,

    /// Entity sets created when the simulation starts.
    #[serde(default, rename = "root-entities")]
    pub root_entities: Vec<EntitySet>,

    /// All named entities in the simulation.
    #[serde(default, deserialize_with = "nullable_map")]
    pub entities: IndexMap<String, Entity>,

    /// All named states, with the transitions between them.
    #[serde(default, rename = "state", deserialize_with = "nullable_map")]
    pub states: IndexMap<String, State>,

    /// Which call backend performs transition calls.
    #[serde(default)]
    pub backend: Backend,
}

impl Config {
    /// Parses a configuration from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}

/// Call backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Nop,
    Http,
    Kafka,
}

/// Directs the spawner: which entity to create, how many, and at what pace.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntitySet {
    /// How many instances to create: a literal integer or the name of an
    /// attribute.
    #[serde(default, deserialize_with = "string_or_int")]
    pub cardinality: String,

    /// Name of the entity to create.
    pub entity: String,

    /// Cadence of instance creation.
    #[serde(default)]
    pub timer: Timer,
}

/// A named entity: its attribute distributions, subordinate sets and the
/// state its instances start in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub attributes: IndexMap<String, Attribute>,

    /// Name of the state entered once an instance is created; empty means
    /// the instance has no state walk.
    #[serde(default)]
    pub initial_state: String,

    /// Subordinate entity sets forked by every instance.
    #[serde(default)]
    pub subordinates: Vec<EntitySet>,
}

/// A named state with its transition cadence and outgoing edges.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct State {
    #[serde(default)]
    pub attributes: IndexMap<String, Attribute>,

    /// Cadence at which one of the transitions fires.
    #[serde(default)]
    pub timer: Timer,

    /// Weighted outgoing edges; a state without transitions is terminal.
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

/// One weighted edge out of a state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transition {
    /// Name of the target state.
    pub state: String,

    /// Non-negative probability weight; selection is proportional by sum.
    #[serde(default)]
    pub probability: f64,

    /// Call performed when this transition fires.
    #[serde(default)]
    pub call: Call,

    /// State entered instead of `state` when the call fails.
    #[serde(default, rename = "on-failure")]
    pub on_failure: String,
}

/// A configured external effect invoked on a transition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Call {
    #[serde(default)]
    pub method: String,

    /// URL template; `{name}` placeholders are rendered from the attribute
    /// store by the dispatcher.
    #[serde(default)]
    pub url: String,

    #[serde(default, rename = "params")]
    pub parameters: Vec<CallParameter>,

    /// Response keys copied back into named attributes.
    #[serde(default)]
    pub results: Vec<CallResult>,
}

impl Call {
    /// A call with none of method, URL, parameters or results is treated as
    /// absent by the state runner.
    pub fn is_empty(&self) -> bool {
        self.method.is_empty()
            && self.url.is_empty()
            && self.parameters.is_empty()
            && self.results.is_empty()
    }
}

/// Where a call parameter is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// JSON-encoded field of the request body.
    Body,
    /// Query-string parameter.
    Form,
    /// Request header.
    Header,
}

/// One call parameter: an attribute reference and the key it is sent under.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallParameter {
    #[serde(rename = "type")]
    pub kind: ParameterKind,

    /// Name of the attribute providing the value.
    pub attribute: String,

    /// Parameter key.
    pub key: String,
}

/// Maps a response key to the attribute it is stored under.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallResult {
    pub key: String,
    pub attribute: String,
}

/// Timer cadence selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerKind {
    /// No timer configured: fires immediately.
    #[default]
    Immediate,
    /// Fires at fixed intervals of `interval`.
    Fixed,
    /// Fires at uniformly random intervals in `[min, max)`.
    Random,
}

/// Cadence configuration for spawning and transitions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Timer {
    #[serde(default, rename = "type")]
    pub kind: TimerKind,

    #[serde(default, with = "duration")]
    pub min: Duration,

    #[serde(default, with = "duration")]
    pub max: Duration,

    #[serde(default, with = "duration")]
    pub interval: Duration,
}

/// Attribute variant selector; the sampler dispatches on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Fixed numeric `value`.
    #[default]
    Int,
    /// Uniform integer in `[min, max)`.
    RandomInt,
    /// Uniform float in `[min, max)`.
    RandomFloat,
    /// Power-law sample in `[min, max]` with exponent `n`, via the inverse
    /// CDF `[(max^(n+1) - min^(n+1)) * u + min^(n+1)]^(1 / (n+1))`.
    PowerFloat,
    /// `|Normal(mean = n, stddev = std_dev)|`.
    NormalFloat,
    /// Fixed `string_value`.
    String,
    /// A fresh UUID, optionally prefixed by `string_value`; with a non-zero
    /// `min`/`max` range the prefix is followed by a uniform integer
    /// instead.
    RandomString,
    /// One uniformly chosen element of `values`.
    RandomValue,
    /// A random-size subset of `values`.
    RandomSubset,
}

/// Describes how one attribute's value is sampled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub kind: AttributeKind,

    #[serde(default, rename = "string-value")]
    pub string_value: String,

    #[serde(default)]
    pub value: f64,

    #[serde(default)]
    pub min: f64,

    #[serde(default)]
    pub max: f64,

    #[serde(default)]
    pub n: f64,

    #[serde(default, rename = "std-dev")]
    pub std_dev: f64,

    #[serde(default)]
    pub values: Vec<Value>,
}

/// Accepts either a string or an integer scalar, normalising to a string.
/// Cardinalities are written both ways (`cardinality: 3` and
/// `cardinality: number-of-users`).
fn string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Input {
        Text(String),
        Number(i64),
    }

    match Input::deserialize(deserializer)? {
        Input::Text(raw) => Ok(raw),
        Input::Number(value) => Ok(value.to_string()),
    }
}

/// Accepts a mapping whose values may be YAML nulls (`terminal-state:` with
/// no body), substituting the default value.
fn nullable_map<'de, D, T>(deserializer: D) -> Result<IndexMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let raw = IndexMap::<String, Option<T>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(key, value)| (key, value.unwrap_or_default()))
        .collect())
}
