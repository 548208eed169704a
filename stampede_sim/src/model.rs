//! Index-resolved form of the configuration.
//!
//! Entity, state and transition references are resolved to indices once,
//! before anything runs; walks dereference by index only. Compilation also
//! front-loads every statically checkable configuration error: unknown
//! references, negative weights, zero weight sums and empty value lists.

use crate::error::SimError;
use stampede_config::{Attribute, AttributeKind, Call, Config, EntitySet, Timer};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub(crate) struct Model {
    pub entities: Vec<EntityModel>,
    pub states: Vec<StateModel>,
    pub roots: Vec<SetModel>,
}

#[derive(Debug, Clone)]
pub(crate) struct SetModel {
    pub entity: usize,
    pub cardinality: String,
    pub timer: Timer,
}

#[derive(Debug, Clone)]
pub(crate) struct EntityModel {
    pub name: String,
    pub attributes: Vec<(String, Attribute)>,
    pub subordinates: Vec<SetModel>,
    pub initial_state: Option<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct StateModel {
    pub name: String,
    pub attributes: Vec<(String, Attribute)>,
    pub timer: Timer,
    pub transitions: Vec<TransitionModel>,
    pub weight_sum: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct TransitionModel {
    pub target: usize,
    pub probability: f64,
    pub call: Option<Call>,
    pub on_failure: Option<usize>,
}

/// Locates one entity set within the model, so spawned tasks can carry a
/// cheap copyable reference instead of borrowing the set itself.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SetRef {
    Root(usize),
    Subordinate { entity: usize, index: usize },
}

impl SetRef {
    pub fn resolve(self, model: &Model) -> &SetModel {
        match self {
            SetRef::Root(index) => &model.roots[index],
            SetRef::Subordinate { entity, index } => {
                &model.entities[entity].subordinates[index]
            }
        }
    }
}

impl Model {
    pub fn compile(config: &Config) -> Result<Self, SimError> {
        let entity_index: HashMap<&str, usize> = config
            .entities
            .keys()
            .enumerate()
            .map(|(index, name)| (name.as_str(), index))
            .collect();
        let state_index: HashMap<&str, usize> = config
            .states
            .keys()
            .enumerate()
            .map(|(index, name)| (name.as_str(), index))
            .collect();

        let mut states = Vec::with_capacity(config.states.len());
        for (name, state) in &config.states {
            let mut transitions = Vec::with_capacity(state.transitions.len());
            let mut weight_sum = 0.0;
            for transition in &state.transitions {
                if transition.probability < 0.0 {
                    return Err(SimError::NegativeWeight {
                        state: name.clone(),
                        probability: transition.probability,
                    });
                }
                weight_sum += transition.probability;
                let target = *state_index
                    .get(transition.state.as_str())
                    .ok_or_else(|| SimError::UnknownState(transition.state.clone()))?;
                let on_failure = if transition.on_failure.is_empty() {
                    None
                } else {
                    Some(
                        *state_index
                            .get(transition.on_failure.as_str())
                            .ok_or_else(|| {
                                SimError::UnknownState(transition.on_failure.clone())
                            })?,
                    )
                };
                let call = if transition.call.is_empty() {
                    None
                } else {
                    Some(transition.call.clone())
                };
                transitions.push(TransitionModel {
                    target,
                    probability: transition.probability,
                    call,
                    on_failure,
                });
            }
            if !transitions.is_empty() && weight_sum == 0.0 {
                return Err(SimError::ZeroWeightSum(name.clone()));
            }
            states.push(StateModel {
                name: name.clone(),
                attributes: compile_attributes(&state.attributes)?,
                timer: state.timer.clone(),
                transitions,
                weight_sum,
            });
        }

        let mut entities = Vec::with_capacity(config.entities.len());
        for (name, entity) in &config.entities {
            let initial_state = if entity.initial_state.is_empty() {
                None
            } else {
                Some(
                    *state_index
                        .get(entity.initial_state.as_str())
                        .ok_or_else(|| {
                            SimError::UnknownState(entity.initial_state.clone())
                        })?,
                )
            };
            let subordinates = entity
                .subordinates
                .iter()
                .map(|set| compile_set(set, &entity_index))
                .collect::<Result<_, _>>()?;
            entities.push(EntityModel {
                name: name.clone(),
                attributes: compile_attributes(&entity.attributes)?,
                subordinates,
                initial_state,
            });
        }

        let roots = config
            .root_entities
            .iter()
            .map(|set| compile_set(set, &entity_index))
            .collect::<Result<_, _>>()?;

        Ok(Model {
            entities,
            states,
            roots,
        })
    }
}

fn compile_set(
    set: &EntitySet,
    entity_index: &HashMap<&str, usize>,
) -> Result<SetModel, SimError> {
    let entity = *entity_index
        .get(set.entity.as_str())
        .ok_or_else(|| SimError::UnknownEntity(set.entity.clone()))?;
    Ok(SetModel {
        entity,
        cardinality: set.cardinality.clone(),
        timer: set.timer.clone(),
    })
}

fn compile_attributes(
    attributes: &indexmap::IndexMap<String, Attribute>,
) -> Result<Vec<(String, Attribute)>, SimError> {
    attributes
        .iter()
        .map(|(name, spec)| {
            let needs_values = matches!(
                spec.kind,
                AttributeKind::RandomValue | AttributeKind::RandomSubset
            );
            if needs_values && spec.values.is_empty() {
                return Err(SimError::EmptyValues(name.clone()));
            }
            Ok((name.clone(), spec.clone()))
        })
        .collect()
}
