//! Deferred writes to the world, gathered during a cycle and applied together.
//!
//! Agents enqueue [Mutation]s through a shared reference while they run. Nothing they
//! enqueue is visible to queries until the world commits the queue at the end of the
//! cycle, which needs exclusive access and therefore cannot overlap any read.

use crate::network::LightState;
use crate::object::{MovingObjectAttributes, MovingObjectState, ObjectId};
use crate::TrafficLightId;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A pending change to the world.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    AddMovingObject {
        id: ObjectId,
        attributes: MovingObjectAttributes,
    },
    RemoveMovingObject(ObjectId),
    UpdateMovingObject {
        id: ObjectId,
        state: MovingObjectState,
    },
    SetTrafficLightState {
        light: TrafficLightId,
        state: LightState,
    },
}

/// Where the world is in its cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CycleState {
    #[default]
    Idle,
    AcceptingMutations,
    Committing,
}

/// The mutations of one cycle, grouped in the order they are applied.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Batch {
    pub removes: Vec<ObjectId>,
    pub adds: Vec<(ObjectId, MovingObjectAttributes)>,
    /// The last update enqueued for each object.
    pub updates: BTreeMap<ObjectId, MovingObjectState>,
    /// The last state enqueued for each light.
    pub light_states: Vec<(TrafficLightId, LightState)>,
}

#[derive(Debug, Default)]
struct Pending {
    mutations: Vec<Mutation>,
    state: CycleState,
}

/// A queue of mutations that any number of threads may append to.
#[derive(Debug, Default)]
pub struct MutationQueue {
    pending: Mutex<Pending>,
}

impl MutationQueue {
    pub fn new() -> Self {
        Default::default()
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        // A panic while holding the lock cannot leave the vector half-written
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a mutation to the current cycle.
    pub fn push(&self, mutation: Mutation) {
        let mut pending = self.lock();
        pending.state = CycleState::AcceptingMutations;
        pending.mutations.push(mutation);
    }

    /// The number of mutations waiting to be committed.
    pub fn len(&self) -> usize {
        self.lock().mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().mutations.is_empty()
    }

    pub fn state(&self) -> CycleState {
        self.lock().state
    }

    /// Takes every pending mutation and enters the committing state.
    pub(crate) fn drain(&self) -> Batch {
        let mutations = {
            let mut pending = self.lock();
            pending.state = CycleState::Committing;
            std::mem::take(&mut pending.mutations)
        };

        let mut batch = Batch::default();
        let mut lights = BTreeMap::new();
        for mutation in mutations {
            match mutation {
                Mutation::AddMovingObject { id, attributes } => batch.adds.push((id, attributes)),
                Mutation::RemoveMovingObject(id) => batch.removes.push(id),
                Mutation::UpdateMovingObject { id, state } => {
                    batch.updates.insert(id, state);
                }
                Mutation::SetTrafficLightState { light, state } => {
                    lights.insert(light, state);
                }
            }
        }
        batch.light_states = lights.into_iter().collect();
        batch
    }

    /// Returns to the idle state once a commit has been applied.
    pub(crate) fn finish(&self) {
        self.lock().state = CycleState::Idle;
    }

    /// Discards every pending mutation.
    pub(crate) fn clear(&self) {
        let mut pending = self.lock();
        pending.mutations.clear();
        pending.state = CycleState::Idle;
    }
}
