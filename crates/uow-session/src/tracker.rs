//! Ordered registry of object states.
//!
//! The [`Tracker`] keeps one [`ObjectState`] per key in registration order.
//! Commit walks it front to back, so writes within one commit are forwarded
//! in the order objects first entered the session.

use indexmap::IndexMap;
use uow_mapper::Mapper;

use crate::state::ObjectState;

pub struct Tracker<M: Mapper> {
    states: IndexMap<M::Key, ObjectState<M>>,
}

impl<M: Mapper> Tracker<M> {
    pub fn new() -> Self {
        Self {
            states: IndexMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            states: IndexMap::with_capacity(capacity),
        }
    }

    /// Append `state`, or replace the entry for its key in place.
    ///
    /// A replaced entry keeps the position of the first state registered
    /// under that key.
    pub fn add(&mut self, state: ObjectState<M>) {
        self.states.insert(state.key().clone(), state);
    }

    /// Remove the entry for `key`, preserving the order of the rest.
    pub fn remove(&mut self, key: &M::Key) -> Option<ObjectState<M>> {
        self.states.shift_remove(key)
    }

    pub fn get(&self, key: &M::Key) -> Option<&ObjectState<M>> {
        self.states.get(key)
    }

    /// States in registration order.
    ///
    /// Each call starts a fresh pass.
    pub fn each(&self) -> impl Iterator<Item = &ObjectState<M>> {
        self.states.values()
    }

    /// Keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &M::Key> {
        self.states.keys()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl<M: Mapper> Default for Tracker<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Mapper> std::fmt::Debug for Tracker<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.states.values().map(|s| (s.key(), s.kind())))
            .finish()
    }
}
