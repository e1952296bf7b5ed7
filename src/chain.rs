//! Merge-aware storage of probabilistic transitions, keyed by source state.
//!
//! The chain is a flat, preallocated pool of elements. Every source state (and
//! the initial distribution) owns a singly linked list threaded through the
//! pool by `next` indices. Adding a transition either merges it into an
//! existing element with the same target and labels, or claims a fresh slot
//! with a single atomic increment.
//!
//! # Concurrency
//!
//! Slot allocation is safe under any number of writers. Walking and merging a
//! chain is only sound if at most one thread writes the chain of a given
//! source at a time. The traversal guarantees this, since each state is
//! expanded exactly once, by the worker that discovered it.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use log::debug;

use crate::error::{ProbabilityError, Resource, TraversalError, TraversalResult};
use crate::model::IndexedTransition;
use crate::types::LabelSet;
use crate::utils::{is_one, sum_probabilities, PROBABILITY_TOLERANCE};

/// Marks the end of a chain.
const NONE: usize = usize::MAX;

/// Bytes taken by one element, used by the capacity planner.
pub const ELEMENT_SIZE: usize = std::mem::size_of::<TransitionChainElement>();

/// One merged outgoing edge of a source state.
#[derive(Debug)]
pub struct TransitionChainElement {
    target: AtomicUsize,
    labels: AtomicU32,
    probability: AtomicU64,
    next: AtomicUsize,
}

impl TransitionChainElement {
    fn empty() -> Self {
        Self {
            target: AtomicUsize::new(NONE),
            labels: AtomicU32::new(0),
            probability: AtomicU64::new(0f64.to_bits()),
            next: AtomicUsize::new(NONE),
        }
    }

    /// Get the target state index.
    pub fn target(&self) -> usize {
        self.target.load(Ordering::Acquire)
    }
    /// Get the labels holding in the target state.
    pub fn labels(&self) -> LabelSet {
        LabelSet::from_bits(self.labels.load(Ordering::Acquire))
    }
    /// Get the accumulated probability.
    pub fn probability(&self) -> f64 {
        f64::from_bits(self.probability.load(Ordering::Acquire))
    }

    fn next(&self) -> usize {
        self.next.load(Ordering::Acquire)
    }

    fn matches(&self, target: usize, labels: LabelSet) -> bool {
        self.target() == target && self.labels() == labels
    }

    fn add_probability(&self, probability: f64) {
        // Single writer per chain, so load-then-store cannot lose an update.
        let sum = self.probability() + probability;
        self.probability.store(sum.to_bits(), Ordering::Release);
    }
}

/// A snapshot of one chain element.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ChainEntry {
    pub target: usize,
    pub labels: LabelSet,
    pub probability: f64,
}

impl From<&TransitionChainElement> for ChainEntry {
    fn from(element: &TransitionChainElement) -> Self {
        Self {
            target: element.target(),
            labels: element.labels(),
            probability: element.probability(),
        }
    }
}

/// Per-source chains of merged probabilistic transitions.
pub struct TransitionChain {
    heads: Box<[AtomicUsize]>,
    initial_head: AtomicUsize,
    elements: Box<[TransitionChainElement]>,
    count: AtomicUsize,
}

impl TransitionChain {
    /// Creates a chain for sources `0..number_of_sources` with room for `capacity` elements.
    pub fn new(number_of_sources: usize, capacity: usize) -> Self {
        let heads = (0..number_of_sources).map(|_| AtomicUsize::new(NONE)).collect();
        let elements = (0..capacity).map(|_| TransitionChainElement::empty()).collect();
        Self {
            heads,
            initial_head: AtomicUsize::new(NONE),
            elements,
            count: AtomicUsize::new(0),
        }
    }

    /// Get the number of element slots.
    pub fn capacity(&self) -> usize {
        self.elements.len()
    }

    /// Get the number of sources the chain can hold.
    pub fn number_of_sources(&self) -> usize {
        self.heads.len()
    }

    /// Get the number of claimed elements.
    pub fn transition_count(&self) -> usize {
        self.count.load(Ordering::Acquire).min(self.capacity())
    }

    fn head(&self, source: usize, is_initial: bool) -> TraversalResult<&AtomicUsize> {
        if is_initial {
            return Ok(&self.initial_head);
        }
        self.heads.get(source).ok_or(TraversalError::OutOfMemory {
            resource: Resource::StateStorage,
            capacity: self.heads.len(),
        })
    }

    fn alloc(&self) -> TraversalResult<usize> {
        let index = self.count.fetch_add(1, Ordering::AcqRel);
        if index >= self.capacity() {
            return Err(TraversalError::OutOfMemory {
                resource: Resource::TransitionChain,
                capacity: self.capacity(),
            });
        }
        Ok(index)
    }

    /// Adds the transitions leaving `source`, or the initial distribution if `is_initial` is set.
    ///
    /// Transitions with the same target and labels as an existing element of
    /// the chain are merged into it by summing their probabilities.
    pub fn add_state_info(
        &self,
        source: usize,
        is_initial: bool,
        transitions: &[IndexedTransition],
    ) -> TraversalResult<()> {
        let head = self.head(source, is_initial)?;
        let state = if is_initial { None } else { Some(source) };

        for transition in transitions {
            let probability = transition.probability.ok_or(TraversalError::MissingProbability {
                state,
                target: transition.target,
            })?;

            let mut last = NONE;
            let mut index = head.load(Ordering::Acquire);
            while index != NONE {
                let element = &self.elements[index];
                if element.matches(transition.target, transition.labels) {
                    break;
                }
                last = index;
                index = element.next();
            }

            if index != NONE {
                self.elements[index].add_probability(probability);
                continue;
            }

            let slot = self.alloc()?;
            let element = &self.elements[slot];
            element.target.store(transition.target, Ordering::Relaxed);
            element.labels.store(transition.labels.bits(), Ordering::Relaxed);
            element.probability.store(probability.to_bits(), Ordering::Relaxed);
            element.next.store(NONE, Ordering::Relaxed);

            if last == NONE {
                head.store(slot, Ordering::Release);
            } else {
                self.elements[last].next.store(slot, Ordering::Release);
            }
        }

        Ok(())
    }

    /// Turns `index` into an absorbing state with a self-loop of probability one.
    pub fn create_stuttering_state(&self, index: usize) -> TraversalResult<()> {
        debug!("Creating stuttering state {}", index);
        self.add_state_info(
            index,
            false,
            &[IndexedTransition {
                target: index,
                labels: LabelSet::EMPTY,
                probability: Some(1.0),
            }],
        )
    }

    fn iter_from(&self, head: usize) -> ChainIter<'_> {
        ChainIter { chain: self, index: head }
    }

    /// Iterates over the merged transitions leaving `source`.
    pub fn transitions(&self, source: usize) -> ChainIter<'_> {
        let head = self.heads.get(source).map_or(NONE, |h| h.load(Ordering::Acquire));
        self.iter_from(head)
    }

    /// Iterates over the merged initial distribution.
    pub fn initial_distribution(&self) -> ChainIter<'_> {
        self.iter_from(self.initial_head.load(Ordering::Acquire))
    }

    /// Iterates over the sources with at least one outgoing transition, in index order.
    pub fn source_states(&self) -> impl Iterator<Item = usize> + '_ {
        self.heads
            .iter()
            .enumerate()
            .filter(|(_, head)| head.load(Ordering::Acquire) != NONE)
            .map(|(source, _)| source)
    }

    /// Iterates over all claimed elements, in allocation order.
    pub fn elements(&self) -> impl Iterator<Item = ChainEntry> + '_ {
        self.elements[..self.transition_count()].iter().map(ChainEntry::from)
    }

    fn validate_chain(&self, head: usize, state: Option<usize>) -> Result<(), ProbabilityError> {
        let sum = sum_probabilities(self.iter_from(head).map(|e| e.probability));
        if !is_one(sum, PROBABILITY_TOLERANCE) {
            return Err(ProbabilityError { state, sum });
        }
        Ok(())
    }

    /// Checks that the outgoing probabilities of every source sum up to one.
    pub fn validate_states(&self) -> Result<(), ProbabilityError> {
        for source in self.source_states() {
            self.validate_chain(self.heads[source].load(Ordering::Acquire), Some(source))?;
        }
        Ok(())
    }

    /// Checks that the initial distribution sums up to one.
    pub fn validate_initial_distribution(&self) -> Result<(), ProbabilityError> {
        self.validate_chain(self.initial_head.load(Ordering::Acquire), None)
    }

    /// Forgets all transitions. Slots are reused by the next traversal.
    pub fn clear(&mut self) {
        for head in self.heads.iter_mut() {
            *head.get_mut() = NONE;
        }
        *self.initial_head.get_mut() = NONE;
        *self.count.get_mut() = 0;
    }
}

/// Iterator over one chain.
pub struct ChainIter<'a> {
    chain: &'a TransitionChain,
    index: usize,
}

impl Iterator for ChainIter<'_> {
    type Item = ChainEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index == NONE {
            return None;
        }
        let element = &self.chain.elements[self.index];
        self.index = element.next();
        Some(ChainEntry::from(element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn transition(target: usize, labels: u32, probability: f64) -> IndexedTransition {
        IndexedTransition {
            target,
            labels: LabelSet::from_bits(labels),
            probability: Some(probability),
        }
    }

    #[test]
    fn test_merge_equal_pairs() {
        let chain = TransitionChain::new(4, 16);
        chain.add_state_info(0, false, &[transition(1, 0, 0.3)]).unwrap();
        chain.add_state_info(0, false, &[transition(1, 0, 0.2)]).unwrap();

        let entries: Vec<_> = chain.transitions(0).collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target, 1);
        assert!((entries[0].probability - 0.5).abs() < 1e-12);
        assert_eq!(chain.transition_count(), 1);
    }

    #[test]
    fn test_different_labels_are_not_merged() {
        let chain = TransitionChain::new(4, 16);
        chain
            .add_state_info(
                0,
                false,
                &[transition(1, 0b01, 0.25), transition(1, 0b10, 0.25), transition(2, 0b01, 0.5)],
            )
            .unwrap();
        let targets: Vec<_> = chain.transitions(0).map(|e| (e.target, e.labels.bits())).collect();
        assert_eq!(targets, vec![(1, 0b01), (1, 0b10), (2, 0b01)]);
        assert!(chain.validate_states().is_ok());
    }

    #[test]
    fn test_initial_distribution() {
        let chain = TransitionChain::new(4, 16);
        chain
            .add_state_info(0, true, &[transition(0, 0, 0.5), transition(1, 0, 0.5)])
            .unwrap();
        assert_eq!(chain.initial_distribution().count(), 2);
        assert_eq!(chain.transitions(0).count(), 0);
        assert_eq!(chain.source_states().count(), 0);
        assert!(chain.validate_initial_distribution().is_ok());
    }

    #[test]
    fn test_validation_failure() {
        let chain = TransitionChain::new(4, 16);
        chain.add_state_info(2, false, &[transition(1, 0, 0.4)]).unwrap();
        let error = chain.validate_states().unwrap_err();
        assert_eq!(error.state, Some(2));
        assert!((error.sum - 0.4).abs() < 1e-12);

        let error = chain.validate_initial_distribution().unwrap_err();
        assert_eq!(error.state, None);
    }

    #[test]
    fn test_pool_exhausted() {
        let chain = TransitionChain::new(4, 2);
        let result = chain.add_state_info(
            0,
            false,
            &[transition(1, 0, 0.2), transition(2, 0, 0.2), transition(3, 0, 0.6)],
        );
        assert_eq!(
            result,
            Err(TraversalError::OutOfMemory {
                resource: Resource::TransitionChain,
                capacity: 2
            })
        );
        assert_eq!(chain.transition_count(), 2);
    }

    #[test]
    fn test_missing_probability() {
        let chain = TransitionChain::new(4, 4);
        let result = chain.add_state_info(
            1,
            false,
            &[IndexedTransition {
                target: 2,
                labels: LabelSet::EMPTY,
                probability: None,
            }],
        );
        assert_eq!(
            result,
            Err(TraversalError::MissingProbability {
                state: Some(1),
                target: 2
            })
        );
    }

    #[test]
    fn test_stuttering_state() {
        let chain = TransitionChain::new(5, 4);
        chain.create_stuttering_state(4).unwrap();
        let entries: Vec<_> = chain.transitions(4).collect();
        assert_eq!(
            entries,
            vec![ChainEntry {
                target: 4,
                labels: LabelSet::EMPTY,
                probability: 1.0
            }]
        );
    }

    #[test]
    fn test_concurrent_sources() {
        let chain = TransitionChain::new(8, 8 * 4);
        std::thread::scope(|s| {
            for source in 0..8 {
                let chain = &chain;
                s.spawn(move || {
                    for target in 0..4 {
                        chain
                            .add_state_info(source, false, &[transition(target, 0, 0.25)])
                            .unwrap();
                    }
                });
            }
        });
        assert_eq!(chain.transition_count(), 32);
        assert_eq!(chain.source_states().count(), 8);
        assert!(chain.validate_states().is_ok());
    }

    #[test]
    fn test_clear() {
        let mut chain = TransitionChain::new(2, 4);
        chain.add_state_info(0, false, &[transition(1, 0, 1.0)]).unwrap();
        chain.clear();
        assert_eq!(chain.transition_count(), 0);
        assert_eq!(chain.transitions(0).count(), 0);
        assert_eq!(chain.elements().count(), 0);
    }
}
