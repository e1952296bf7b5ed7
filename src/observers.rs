//! Hooks into the expansion of states.
//!
//! A traversal is specialized by registering observers in its
//! [`TraversalParameters`]. Every worker materializes its own instances from
//! the registered factories, so observers may keep per-worker state without
//! synchronization.
//!
//! During the expansion of a state, observers run in this order:
//!
//! 1. [`TransitionModifier`]s rewrite the computed transitions.
//! 2. [`StateAction`]s see every newly discovered state.
//! 3. [`TransitionAction`]s see every valid transition.
//! 4. [`BatchedTransitionAction`]s see all valid transitions of the source at once.

use std::fmt;
use std::sync::Arc;

use crate::context::TraversalContext;
use crate::error::TraversalResult;
use crate::model::{IndexedTransition, TransitionCollection};
use crate::types::LabelSet;

/// Outcome of a [`StateAction`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Verdict {
    Continue,
    /// The state violates the checked property.
    Violation,
}

pub trait TransitionModifier: Send {
    fn modify_transitions(
        &mut self,
        context: &TraversalContext,
        transitions: &mut TransitionCollection,
        source: Option<&[u8]>,
        is_initial: bool,
    );
}

pub trait StateAction: Send {
    fn process_state(
        &mut self,
        context: &TraversalContext,
        state: &[u8],
        index: usize,
        labels: LabelSet,
        is_initial: bool,
    ) -> Verdict;
}

pub trait TransitionAction: Send {
    fn process_transition(
        &mut self,
        context: &TraversalContext,
        source: usize,
        transition: &IndexedTransition,
        is_initial: bool,
    ) -> TraversalResult<()>;
}

pub trait BatchedTransitionAction: Send {
    fn process_transitions(
        &mut self,
        context: &TraversalContext,
        source: usize,
        transitions: &[IndexedTransition],
        is_initial: bool,
    ) -> TraversalResult<()>;
}

type Factory<T> = Arc<dyn Fn() -> Box<T> + Send + Sync>;

/// The observers taking part in a traversal.
#[derive(Clone, Default)]
pub struct TraversalParameters {
    transition_modifiers: Vec<Factory<dyn TransitionModifier>>,
    state_actions: Vec<Factory<dyn StateAction>>,
    transition_actions: Vec<Factory<dyn TransitionAction>>,
    batched_transition_actions: Vec<Factory<dyn BatchedTransitionAction>>,
}

impl TraversalParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transition_modifier<T, F>(&mut self, create: F)
    where
        T: TransitionModifier + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.transition_modifiers
            .push(Arc::new(move || Box::new(create()) as Box<dyn TransitionModifier>));
    }

    pub fn add_state_action<T, F>(&mut self, create: F)
    where
        T: StateAction + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.state_actions
            .push(Arc::new(move || Box::new(create()) as Box<dyn StateAction>));
    }

    pub fn add_transition_action<T, F>(&mut self, create: F)
    where
        T: TransitionAction + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.transition_actions
            .push(Arc::new(move || Box::new(create()) as Box<dyn TransitionAction>));
    }

    pub fn add_batched_transition_action<T, F>(&mut self, create: F)
    where
        T: BatchedTransitionAction + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.batched_transition_actions
            .push(Arc::new(move || Box::new(create()) as Box<dyn BatchedTransitionAction>));
    }

    pub fn clear(&mut self) {
        self.transition_modifiers.clear();
        self.state_actions.clear();
        self.transition_actions.clear();
        self.batched_transition_actions.clear();
    }

    /// Creates a fresh set of observer instances.
    pub(crate) fn materialize(&self) -> Observers {
        Observers {
            transition_modifiers: self.transition_modifiers.iter().map(|f| f()).collect(),
            state_actions: self.state_actions.iter().map(|f| f()).collect(),
            transition_actions: self.transition_actions.iter().map(|f| f()).collect(),
            batched_transition_actions: self.batched_transition_actions.iter().map(|f| f()).collect(),
        }
    }
}

impl fmt::Debug for TraversalParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraversalParameters")
            .field("transition_modifiers", &self.transition_modifiers.len())
            .field("state_actions", &self.state_actions.len())
            .field("transition_actions", &self.transition_actions.len())
            .field("batched_transition_actions", &self.batched_transition_actions.len())
            .finish()
    }
}

/// The observer instances owned by one worker.
#[derive(Default)]
pub(crate) struct Observers {
    pub transition_modifiers: Vec<Box<dyn TransitionModifier>>,
    pub state_actions: Vec<Box<dyn StateAction>>,
    pub transition_actions: Vec<Box<dyn TransitionAction>>,
    pub batched_transition_actions: Vec<Box<dyn BatchedTransitionAction>>,
}

/// Redirects every valid transition whose labels satisfy a condition into
/// the stuttering state, so that its target is never expanded.
#[derive(Clone)]
pub struct EarlyTerminationModifier {
    terminate_early: Arc<dyn Fn(LabelSet) -> bool + Send + Sync>,
}

impl EarlyTerminationModifier {
    pub fn new(terminate_early: Arc<dyn Fn(LabelSet) -> bool + Send + Sync>) -> Self {
        Self { terminate_early }
    }
}

impl TransitionModifier for EarlyTerminationModifier {
    fn modify_transitions(
        &mut self,
        _context: &TraversalContext,
        transitions: &mut TransitionCollection,
        _source: Option<&[u8]>,
        _is_initial: bool,
    ) {
        for transition in transitions.iter_mut().filter(|t| t.is_valid) {
            if (self.terminate_early)(transition.labels) {
                transition.to_stuttering_state = true;
            }
        }
    }
}

/// Flags every newly discovered state in which the given label does not hold.
#[derive(Debug, Copy, Clone)]
pub struct InvariantViolationAction {
    invariant: usize,
}

impl InvariantViolationAction {
    pub fn new(invariant: usize) -> Self {
        Self { invariant }
    }
}

impl StateAction for InvariantViolationAction {
    fn process_state(
        &mut self,
        _context: &TraversalContext,
        _state: &[u8],
        _index: usize,
        labels: LabelSet,
        _is_initial: bool,
    ) -> Verdict {
        if labels.contains(self.invariant) {
            Verdict::Continue
        } else {
            Verdict::Violation
        }
    }
}
