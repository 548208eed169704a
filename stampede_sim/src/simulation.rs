//! The simulation engine: entity spawning, state walks and the run handle.

use crate::attributes::Attributes;
use crate::call::Dispatcher;
use crate::cardinality::resolve_cardinality;
use crate::error::SimError;
use crate::executor::{Executor, Job};
use crate::model::{Model, SetRef, StateModel};
use crate::rng::SimRng;
use crate::sample::sample;
use crate::scope::{Scope, TaskGroup};
use crate::timer::Timer;
use stampede_config::{Config, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Attribute under which a failed call's error is recorded.
pub const ERROR_ATTRIBUTE: &str = "error";

/// Handle to a running simulation.
///
/// Construction compiles and validates the configuration, launches the root
/// entity sets and returns immediately. The simulation then runs until every
/// walk ends ([`wait`](Simulation::wait)) or until it is shut down
/// ([`close`](Simulation::close)).
pub struct Simulation {
    inner: Arc<Inner>,
}

struct Inner {
    model: Model,
    dispatcher: Arc<dyn Dispatcher>,
    scope: Scope,
    tasks: TaskGroup,
    executor: Arc<Executor>,
    rng: SimRng,
}

impl Simulation {
    /// Starts a simulation with `workers` executor workers.
    pub fn new(
        config: &Config,
        dispatcher: Arc<dyn Dispatcher>,
        workers: usize,
    ) -> Result<Self, SimError> {
        Self::with_rng(config, dispatcher, workers, SimRng::new())
    }

    /// Like [`new`](Simulation::new), with a caller-provided random source
    /// for reproducible runs.
    pub fn with_rng(
        config: &Config,
        dispatcher: Arc<dyn Dispatcher>,
        workers: usize,
        rng: SimRng,
    ) -> Result<Self, SimError> {
        let model = Model::compile(config)?;
        let scope = Scope::new();
        let executor = Executor::new(workers, scope.clone());
        let inner = Arc::new(Inner {
            model,
            dispatcher,
            scope,
            tasks: TaskGroup::new(),
            executor,
            rng,
        });

        let constants: Attributes = config
            .constants
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        for index in 0..inner.model.roots.len() {
            spawn_entity_set(&inner, SetRef::Root(index), constants.clone());
        }

        Ok(Self { inner })
    }

    /// The simulation's cancellation scope.
    pub fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    /// Resolves once every spawn loop and state walk has ended naturally.
    pub async fn wait(&self) {
        self.inner.tasks.wait().await;
    }

    /// Cancels the scope, closes the executor queue and waits for in-flight
    /// work to unwind.
    pub async fn close(&self) {
        self.inner.scope.cancel();
        self.inner.executor.close();
        self.inner.tasks.wait().await;
    }
}

/// Cancels the scope on a fatal error; only the first error is logged.
fn fatal(inner: &Inner, err: &SimError) {
    if inner.scope.cancel() {
        error!(error = %err, "fatal simulation error");
    }
}

fn spawn_entity_set(inner: &Arc<Inner>, set: SetRef, attributes: Attributes) {
    let guard = inner.tasks.enter();
    let inner = inner.clone();
    tokio::spawn(async move {
        let _guard = guard;
        run_entity_set(&inner, set, attributes).await;
    });
}

/// Produces the configured number of entity instances, pacing each on the
/// set's timer. Cancellation interrupts the wait and ends the loop early.
async fn run_entity_set(inner: &Arc<Inner>, set: SetRef, attributes: Attributes) {
    let set = set.resolve(&inner.model);
    let count = match resolve_cardinality(&set.cardinality, &attributes) {
        Ok(count) => count,
        Err(err) => {
            fatal(inner, &err.into());
            return;
        }
    };
    debug!(
        entity = %inner.model.entities[set.entity].name,
        count,
        "spawning entity set"
    );
    let timer = Timer::new(set.timer.clone(), inner.rng.clone());
    for _ in 0..count {
        if timer.next(&inner.scope).await.is_err() {
            return;
        }
        construct_entity(inner, set.entity, attributes.clone());
    }
}

/// Materialises one actor: samples its attributes, forks subordinate sets
/// and enters the initial state when one is configured.
fn construct_entity(inner: &Arc<Inner>, entity: usize, mut attributes: Attributes) {
    let model = &inner.model.entities[entity];
    for (name, spec) in &model.attributes {
        match sample(spec, &inner.rng) {
            Ok(value) => attributes.insert(name.clone(), value),
            Err(err) => {
                fatal(inner, &err.into());
                return;
            }
        }
    }
    for index in 0..model.subordinates.len() {
        spawn_entity_set(
            inner,
            SetRef::Subordinate { entity, index },
            attributes.clone(),
        );
    }
    if let Some(state) = model.initial_state {
        enter_state(inner, state, attributes);
    }
}

/// Enters a state: terminal check, state-attribute sampling, then the
/// post-timer work is scheduled on the executor after the state's delay.
fn enter_state(inner: &Arc<Inner>, state: usize, mut attributes: Attributes) {
    let model = &inner.model.states[state];
    if model.transitions.is_empty() {
        debug!(state = %model.name, "walk ended");
        return;
    }
    for (name, spec) in &model.attributes {
        match sample(spec, &inner.rng) {
            Ok(value) => attributes.insert(name.clone(), value),
            Err(err) => {
                fatal(inner, &err.into());
                return;
            }
        }
    }
    let timer = Timer::new(model.timer.clone(), inner.rng.clone());
    let guard = inner.tasks.enter();
    let job_inner = inner.clone();
    let job: Job = Box::pin(async move {
        let _guard = guard;
        fire_transition(job_inner, state, attributes).await;
    });
    inner.executor.submit(timer.delay(), job);
}

/// Picks one transition by weighted choice: subtract each weight from a
/// uniform draw below the sum; the first transition reaching zero wins, ties
/// broken by declaration order.
fn pick_transition(state: &StateModel, rng: &SimRng) -> usize {
    let mut draw = state.weight_sum * rng.unit();
    for (index, transition) in state.transitions.iter().enumerate() {
        draw -= transition.probability;
        if draw <= 0.0 {
            return index;
        }
    }
    // the draw is strictly below the sum; only floating-point slack lands here
    state.transitions.len() - 1
}

/// The post-timer half of a state visit: select a transition, perform its
/// call and fork the successor walk.
async fn fire_transition(inner: Arc<Inner>, state: usize, attributes: Attributes) {
    if inner.scope.is_cancelled() {
        return;
    }
    let model = &inner.model.states[state];
    let transition = &model.transitions[pick_transition(model, &inner.rng)];

    let mut next_state = transition.target;
    let mut next_attributes = attributes;
    if let Some(call) = &transition.call {
        match inner
            .dispatcher
            .dispatch(&inner.scope, call, &next_attributes)
            .await
        {
            Ok(returned) => next_attributes = returned,
            Err(err) => {
                warn!(state = %model.name, error = %err, "error performing call");
                next_attributes.insert(ERROR_ATTRIBUTE, Value::Str(err.to_string()));
                if let Some(recover) = transition.on_failure {
                    next_state = recover;
                }
            }
        }
    }
    // a cancelled scope forks no successors, whatever the call returned
    if inner.scope.is_cancelled() {
        return;
    }
    enter_state(&inner, next_state, next_attributes);
}
