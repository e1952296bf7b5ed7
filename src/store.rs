//! Concurrent deduplicating storage of serialized states.
//!
//! Every distinct state vector is assigned a stable index on first
//! discovery. Insertion is a single atomic insert-if-absent operation, so two
//! workers racing on the same state agree on one index and exactly one of
//! them sees the state as new.

use std::ops::Index;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;

use crate::error::{ModelFault, Resource, TraversalError, TraversalResult};

type FxDashMap<K, V> = DashMap<K, V, FxBuildHasher>;

/// A fixed-capacity map from state vectors to indices `0..capacity`.
pub struct StateStore {
    indices: FxDashMap<Box<[u8]>, usize>,
    states: Box<[OnceLock<Box<[u8]>>]>,
    count: AtomicUsize,
    state_vector_size: usize,
}

impl StateStore {
    pub fn new(capacity: usize, state_vector_size: usize) -> Self {
        Self {
            indices: DashMap::with_capacity_and_hasher(capacity.min(1 << 16), FxBuildHasher),
            states: (0..capacity).map(|_| OnceLock::new()).collect(),
            count: AtomicUsize::new(0),
            state_vector_size,
        }
    }

    pub fn capacity(&self) -> usize {
        self.states.len()
    }

    pub fn state_vector_size(&self) -> usize {
        self.state_vector_size
    }

    /// Get the number of stored states.
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire).min(self.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts `state` unless it is already stored.
    ///
    /// Returns whether the state is new, and its index. States of the wrong
    /// width are reported as a model fault.
    pub fn add_state(&self, state: &[u8]) -> TraversalResult<(bool, usize)> {
        if state.len() != self.state_vector_size {
            return Err(ModelFault::new(format!(
                "state vector has {} bytes, expected {}",
                state.len(),
                self.state_vector_size
            ))
            .into());
        }

        if let Some(index) = self.indices.get(state) {
            return Ok((false, *index));
        }

        match self.indices.entry(state.into()) {
            Entry::Occupied(entry) => Ok((false, *entry.get())),
            Entry::Vacant(entry) => {
                let index = self.count.fetch_add(1, Ordering::AcqRel);
                if index >= self.capacity() {
                    return Err(TraversalError::OutOfMemory {
                        resource: Resource::StateStorage,
                        capacity: self.capacity(),
                    });
                }
                // The slot is filled before the index is published.
                let _ = self.states[index].set(state.into());
                entry.insert(index);
                Ok((true, index))
            }
        }
    }

    /// Get the state with the given index, if it has been stored.
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.states.get(index)?.get().map(|state| &**state)
    }

    /// Get the index of `state`, if it has been stored.
    pub fn index_of(&self, state: &[u8]) -> Option<usize> {
        self.indices.get(state).map(|index| *index)
    }

    /// Forgets all states.
    pub fn clear(&mut self) {
        self.indices.clear();
        for state in self.states.iter_mut() {
            state.take();
        }
        *self.count.get_mut() = 0;
    }
}

impl Index<usize> for StateStore {
    type Output = [u8];

    fn index(&self, index: usize) -> &Self::Output {
        match self.get(index) {
            Some(state) => state,
            None => panic!("State {} has not been stored", index),
        }
    }
}
