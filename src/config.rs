//! Configuration of an analysis run.
//!
//! Setters consume and return the configuration, so a configuration reads as
//! one expression:
//!
//! ```
//! use ltmc_rs::capacity::ModelCapacity;
//! use ltmc_rs::config::AnalysisConfiguration;
//!
//! let config = AnalysisConfiguration::default()
//!     .with_cpu_count(2)
//!     .with_model_capacity(ModelCapacity::tiny_by_memory())
//!     .with_early_termination(true);
//! assert!(config.validate().is_ok());
//! ```

use crate::capacity::ModelCapacity;
use crate::error::ConfigError;

/// Stack capacities below this value are rejected.
pub const MIN_STACK_CAPACITY: usize = 1024;

/// Default number of frames and states of each worker stack.
pub const DEFAULT_STACK_CAPACITY: usize = 1 << 20;

/// Default number of discovered states between two progress reports.
pub const DEFAULT_REPORT_STATE_COUNT_DELTA: usize = 200_000;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfiguration {
    /// Number of worker threads. [`with_cpu_count`](Self::with_cpu_count)
    /// clamps it to the available CPUs.
    pub cpu_count: usize,
    /// Capacity of each worker's depth first search stack.
    pub stack_capacity: usize,
    /// Capacity of the state store and the transition chain.
    pub model_capacity: ModelCapacity,
    /// Whether counterexamples are built for violations and failures.
    pub generate_counter_example: bool,
    /// Whether the traversal stops at the first invariant violation.
    pub enable_early_termination: bool,
    /// Whether transitions satisfying the terminate-early condition are
    /// redirected into the stuttering state before expansion.
    pub enable_static_pruning: bool,
    /// Whether generated Markov chains are checked to sum up to one.
    pub validate_probabilities: bool,
    /// Whether only progress reports are logged at info level.
    pub progress_reports_only: bool,
    /// Number of discovered states between two progress reports.
    pub report_state_count_delta: usize,
}

impl Default for AnalysisConfiguration {
    fn default() -> Self {
        Self {
            cpu_count: num_cpus::get(),
            stack_capacity: DEFAULT_STACK_CAPACITY,
            model_capacity: ModelCapacity::default(),
            generate_counter_example: true,
            enable_early_termination: false,
            enable_static_pruning: true,
            validate_probabilities: cfg!(debug_assertions),
            progress_reports_only: false,
            report_state_count_delta: DEFAULT_REPORT_STATE_COUNT_DELTA,
        }
    }
}

impl AnalysisConfiguration {
    pub fn with_cpu_count(mut self, cpu_count: usize) -> Self {
        self.cpu_count = cpu_count.clamp(1, num_cpus::get().max(1));
        self
    }

    /// Starts exactly `worker_count` workers, even if fewer CPUs are available.
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.cpu_count = worker_count.max(1);
        self
    }

    pub fn with_stack_capacity(mut self, stack_capacity: usize) -> Self {
        self.stack_capacity = stack_capacity;
        self
    }

    pub fn with_model_capacity(mut self, model_capacity: ModelCapacity) -> Self {
        self.model_capacity = model_capacity;
        self
    }

    pub fn with_counter_examples(mut self, generate: bool) -> Self {
        self.generate_counter_example = generate;
        self
    }

    pub fn with_early_termination(mut self, enable: bool) -> Self {
        self.enable_early_termination = enable;
        self
    }

    pub fn with_static_pruning(mut self, enable: bool) -> Self {
        self.enable_static_pruning = enable;
        self
    }

    pub fn with_probability_validation(mut self, enable: bool) -> Self {
        self.validate_probabilities = enable;
        self
    }

    pub fn with_progress_reports_only(mut self, enable: bool) -> Self {
        self.progress_reports_only = enable;
        self
    }

    pub fn with_report_state_count_delta(mut self, delta: usize) -> Self {
        self.report_state_count_delta = delta.max(1);
        self
    }

    /// The number of workers actually started.
    pub fn effective_cpu_count(&self) -> usize {
        self.cpu_count.max(1)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stack_capacity < MIN_STACK_CAPACITY {
            return Err(ConfigError::CapacityTooSmall {
                name: "stack capacity",
                value: self.stack_capacity as u64,
                minimum: MIN_STACK_CAPACITY as u64,
            });
        }
        if self.report_state_count_delta == 0 {
            return Err(ConfigError::CapacityTooSmall {
                name: "report state count delta",
                value: 0,
                minimum: 1,
            });
        }
        self.model_capacity.validate()
    }
}
