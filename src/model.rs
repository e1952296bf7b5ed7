//! The contract between the traversal engine and the analyzed model.
//!
//! The engine treats states as opaque, fixed-width byte vectors: it only
//! compares, hashes and copies them. Everything else (how successors are
//! computed, what a state means, how a counterexample is replayed) is up to
//! the [`AnalysisModel`] implementation.

use std::fmt;

use crate::error::ModelFault;
use crate::types::LabelSet;

/// One outgoing edge produced by a model, before its target has been deduplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Serialized target state. Must be exactly `state_vector_size` bytes long.
    pub target: Box<[u8]>,
    /// Invalid transitions are skipped by the engine and never stored.
    pub is_valid: bool,
    /// Atomic-formula labels holding in the target state.
    pub labels: LabelSet,
    /// Probability of taking this transition. Required when building Markov chains.
    pub probability: Option<f64>,
    /// Whether the transition is redirected into the stuttering state.
    pub to_stuttering_state: bool,
}

impl Transition {
    /// Creates a valid, non-probabilistic transition.
    pub fn new(target: impl Into<Box<[u8]>>, labels: LabelSet) -> Self {
        Self {
            target: target.into(),
            is_valid: true,
            labels,
            probability: None,
            to_stuttering_state: false,
        }
    }

    /// Creates a valid transition taken with probability `probability`.
    pub fn with_probability(target: impl Into<Box<[u8]>>, labels: LabelSet, probability: f64) -> Self {
        Self {
            probability: Some(probability),
            ..Self::new(target, labels)
        }
    }

    /// Creates a transition that the engine ignores.
    pub fn invalid(target: impl Into<Box<[u8]>>) -> Self {
        Self {
            is_valid: false,
            ..Self::new(target, LabelSet::EMPTY)
        }
    }
}

/// The transitions computed for one source state (or for the initial states).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionCollection {
    transitions: Vec<Transition>,
    total_count: usize,
}

impl TransitionCollection {
    /// Creates a collection; `total_count` counts all transitions the model computed.
    pub fn new(transitions: Vec<Transition>) -> Self {
        let total_count = transitions.len();
        Self {
            transitions,
            total_count,
        }
    }

    /// Creates a collection that reports a larger number of computed transitions
    /// than it retains, e.g. when the model already dropped some of them.
    pub fn with_total_count(transitions: Vec<Transition>, total_count: usize) -> Self {
        Self {
            total_count: total_count.max(transitions.len()),
            transitions,
        }
    }

    /// The number of retained transitions, including invalid ones.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// The number of transitions computed by the model.
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// Iterates over the valid transitions only.
    pub fn valid(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter().filter(|t| t.is_valid)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transition> {
        self.transitions.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Transition> {
        self.transitions.iter_mut()
    }
}

impl From<Vec<Transition>> for TransitionCollection {
    fn from(transitions: Vec<Transition>) -> Self {
        Self::new(transitions)
    }
}

impl<'a> IntoIterator for &'a TransitionCollection {
    type Item = &'a Transition;
    type IntoIter = std::slice::Iter<'a, Transition>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A transition whose target has been replaced by its state store index.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct IndexedTransition {
    pub target: usize,
    pub labels: LabelSet,
    pub probability: Option<f64>,
}

/// A finite execution path demonstrating an invariant violation, a deadlock or a model fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterExample {
    /// Serialized states along the path, oldest first.
    pub path: Vec<Box<[u8]>>,
    /// Whether the last step of the path raised a fault.
    pub ends_with_exception: bool,
}

impl CounterExample {
    pub fn new(path: Vec<Box<[u8]>>, ends_with_exception: bool) -> Self {
        Self {
            path,
            ends_with_exception,
        }
    }

    /// The number of steps between the states of the path.
    pub fn step_count(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    /// The last state of the path, if any.
    pub fn last_state(&self) -> Option<&[u8]> {
        self.path.last().map(|s| s.as_ref())
    }
}

impl fmt::Display for CounterExample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "counterexample with {} states", self.path.len())?;
        if self.ends_with_exception {
            write!(f, " (ends with an exception)")?;
        }
        Ok(())
    }
}

/// Totals gathered during one traversal.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TraversalStatistics {
    /// Number of distinct states discovered.
    pub state_count: usize,
    /// Number of valid transitions handled.
    pub transition_count: usize,
    /// Number of transitions computed by the model, including invalid ones.
    pub computed_transition_count: usize,
    /// Deepest frame count reached by any worker.
    pub level_count: usize,
}

impl fmt::Display for TraversalStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Discovered {} states, {} transitions, {} levels.",
            crate::utils::format_count(self.state_count),
            crate::utils::format_count(self.transition_count),
            self.level_count
        )
    }
}

/// The outcome of an invariant check.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub formula_holds: bool,
    pub counter_example: Option<CounterExample>,
    pub statistics: TraversalStatistics,
}

/// A transition-producing system explored by the traversal engine.
///
/// Every worker owns its own model instance, created by a factory passed to
/// the traverser, so implementations may keep mutable scratch state.
pub trait AnalysisModel: Send {
    /// The width of every serialized state, in bytes.
    fn state_vector_size(&self) -> usize;

    /// Computes the transitions into the initial states.
    fn initial_transitions(&mut self) -> Result<TransitionCollection, ModelFault>;

    /// Computes the transitions leaving `state`.
    fn successor_transitions(&mut self, state: &[u8]) -> Result<TransitionCollection, ModelFault>;

    /// Restores the model to a pristine state before a new traversal.
    fn reset(&mut self) {}

    /// Builds a counterexample from the serialized states along a path.
    fn create_counter_example(&self, path: Vec<Box<[u8]>>, ends_with_exception: bool) -> CounterExample {
        CounterExample::new(path, ends_with_exception)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let collection = TransitionCollection::new(vec![
            Transition::new(vec![1u8], LabelSet::EMPTY),
            Transition::invalid(vec![2u8]),
            Transition::with_probability(vec![3u8], LabelSet::EMPTY.with(0), 0.5),
        ]);
        assert_eq!(collection.len(), 3);
        assert_eq!(collection.total_count(), 3);
        let targets: Vec<u8> = collection.valid().map(|t| t.target[0]).collect();
        assert_eq!(targets, vec![1, 3]);
    }

    #[test]
    fn test_total_count_never_below_len() {
        let collection = TransitionCollection::with_total_count(vec![Transition::invalid(vec![0u8])], 0);
        assert_eq!(collection.total_count(), 1);
    }

    #[test]
    fn test_statistics_display() {
        let statistics = TraversalStatistics {
            state_count: 1234,
            transition_count: 5678,
            computed_transition_count: 6000,
            level_count: 7,
        };
        assert_eq!(
            statistics.to_string(),
            "Discovered 1,234 states, 5,678 transitions, 7 levels."
        );
    }

    #[test]
    fn test_counter_example() {
        let ce = CounterExample::new(vec![vec![0u8].into(), vec![1u8].into()], false);
        assert_eq!(ce.step_count(), 1);
        assert_eq!(ce.last_state(), Some(&[1u8][..]));
        assert_eq!(ce.to_string(), "counterexample with 2 states");
    }
}
