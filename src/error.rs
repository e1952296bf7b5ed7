//! Error types for model traversal.
//!
//! Errors are split by where they can arise:
//!
//! - [`ConfigError`]: misconfiguration, rejected eagerly at construction time.
//! - [`TraversalError`]: fatal conditions hit while exploring the state space.
//! - [`ProbabilityError`]: probability-sum violations found by explicit validation.
//! - [`AnalysisError`]: what a caller finally sees, together with the counterexample (if any).

use std::fmt;

use thiserror::Error;

use crate::model::CounterExample;

/// Result type alias for traversal operations.
pub type TraversalResult<T> = std::result::Result<T, TraversalError>;

/// Misconfiguration of the traversal engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("density limit must be greater than 0, got {0}")]
    InvalidDensity(i64),

    #[error("byte budget of {budget} bytes is below the minimum of {minimum} bytes")]
    BudgetTooSmall { budget: u64, minimum: u64 },

    #[error("{name} must be at least {minimum}, got {value}")]
    CapacityTooSmall { name: &'static str, value: u64, minimum: u64 },

    #[error("size of a state must be at least 1 byte")]
    EmptyStateVector,

    #[error("at most {maximum} state labels are supported, got {count}")]
    TooManyLabels { count: usize, maximum: usize },
}

/// A storage area with a fixed, preallocated capacity.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Resource {
    DfsFrame,
    DfsState,
    StateStorage,
    TransitionChain,
}

impl Resource {
    /// The configuration knob that has to be raised when the resource is exhausted.
    pub fn hint(self) -> &'static str {
        match self {
            Resource::DfsFrame | Resource::DfsState => "stack capacity",
            Resource::StateStorage => "state capacity",
            Resource::TransitionChain => "transition capacity",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::DfsFrame => "depth first search frame",
            Resource::DfsState => "depth first search state",
            Resource::StateStorage => "state",
            Resource::TransitionChain => "transition chain element",
        };
        f.write_str(name)
    }
}

/// A fault raised by the analyzed model itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ModelFault {
    message: String,
}

impl ModelFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ModelFault {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ModelFault {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// A fatal condition encountered during traversal. Nothing is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TraversalError {
    #[error("deadlock: {} has no valid outgoing transitions", describe_source(.state))]
    Deadlock { state: Option<usize> },

    #[error("unable to allocate an additional {resource} (capacity {capacity}); try increasing the {}", resource_hint(.resource))]
    OutOfMemory { resource: Resource, capacity: usize },

    #[error("the model raised a fault: {0}")]
    Model(#[from] ModelFault),

    #[error("the model panicked: {0}")]
    ModelPanicked(String),

    #[error("transition from {} to state {target} carries no probability", describe_source(.state))]
    MissingProbability { state: Option<usize>, target: usize },
}

impl TraversalError {
    /// Whether this error is a capacity exhaustion. No counterexample is built for those.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, TraversalError::OutOfMemory { .. })
    }
}

fn resource_hint(resource: &Resource) -> &'static str {
    resource.hint()
}

fn describe_source(state: &Option<usize>) -> String {
    match state {
        Some(state) => format!("state {}", state),
        None => "the initial distribution".to_string(),
    }
}

/// Outgoing probabilities of a distribution do not sum up to one.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("probabilities of {} should sum up to 1, but sum up to {sum}", describe_source(.state))]
pub struct ProbabilityError {
    pub state: Option<usize>,
    pub sum: f64,
}

/// The failure of an analysis run, with the counterexample generated for it.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{error}")]
    Traversal {
        #[source]
        error: TraversalError,
        counter_example: Option<CounterExample>,
    },

    #[error(transparent)]
    Probability(#[from] ProbabilityError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AnalysisError {
    /// The counterexample leading to the failure, if one was generated.
    pub fn counter_example(&self) -> Option<&CounterExample> {
        match self {
            AnalysisError::Traversal { counter_example, .. } => counter_example.as_ref(),
            _ => None,
        }
    }

    /// The traversal error, if the analysis failed during traversal.
    pub fn traversal_error(&self) -> Option<&TraversalError> {
        match self {
            AnalysisError::Traversal { error, .. } => Some(error),
            _ => None,
        }
    }
}
