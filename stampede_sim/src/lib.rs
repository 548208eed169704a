//! The stampede simulation engine.
//!
//! Given a declarative description of entity populations, per-entity
//! attribute distributions and a probabilistic state machine with timed
//! transitions, the engine spawns synthetic actors that traverse states
//! over wall-clock time and emit outbound calls on each transition.
//!
//! # Architecture
//!
//! ```text
//! Simulation::new
//!   ├─ Model::compile          resolve names to indices, validate
//!   ├─ Executor                W workers, bounded queue of 16 * W jobs
//!   └─ per root entity set     spawn loop paced by its Timer
//!         └─ entity constructor  sample attributes, fork subordinates
//!               └─ state walk    sample, wait, select, call, fork next
//! ```
//!
//! Every fork point copies the attribute store, so sibling walks never
//! observe each other's mutations. One shared [`Scope`] cancels the whole
//! tree; [`Simulation::close`] cancels it and drains the executor.

mod attributes;
pub mod call;
mod cardinality;
mod error;
mod executor;
mod model;
mod rng;
mod sample;
mod scope;
mod simulation;
mod timer;

pub use attributes::Attributes;
pub use call::{
    DispatchError, Dispatcher, HttpDispatcher, KafkaDispatcher, NopDispatcher,
};
pub use cardinality::{resolve_cardinality, CardinalityError};
pub use error::SimError;
pub use executor::{Executor, Job};
pub use rng::SimRng;
pub use sample::{sample, SampleError};
pub use scope::{Cancelled, Scope, TaskGroup, TaskGuard};
pub use simulation::{Simulation, ERROR_ATTRIBUTE};
pub use timer::Timer;
