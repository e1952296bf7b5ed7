//! Capacity planning for the preallocated traversal storage.
//!
//! All storage areas (state slots, transition chain elements) are allocated up
//! front and never grow. This module derives their sizes from either explicit
//! counts or a byte budget combined with an assumed model density.
//!
//! # Density
//!
//! The density is the average number of outgoing transitions per state. A
//! fixed density `d` gives
//!
//! ```text
//! size_of_state * n + size_of_transition * n * d = budget
//!   => n = budget / (size_of_state + size_of_transition * d)
//! ```
//!
//! A [`Dense`][ModelDensity::Dense] model is assumed to be near-complete, so
//! `d = n` and the quadratic equation is estimated by `n = sqrt(budget / size_of_transition)`.

use std::fmt;

use crate::error::ConfigError;

/// Byte budgets below this value are rejected.
pub const MIN_BYTE_BUDGET: u64 = ByteSize::KIBIBYTE.0;

/// Byte budgets above this value are clamped.
pub const MAX_BYTE_BUDGET: u64 = 5 * ByteSize::GIBIBYTE.0;

/// Explicit state capacities below this value are rejected.
pub const MIN_STATE_CAPACITY: usize = 1024;

/// The smallest number of states a plan may yield.
pub const MIN_PLANNED_STATES: usize = 4;

/// An amount of memory in bytes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub const KIBIBYTE: ByteSize = ByteSize(1024);
    pub const MEBIBYTE: ByteSize = ByteSize(1024 * 1024);
    pub const GIBIBYTE: ByteSize = ByteSize(1024 * 1024 * 1024);

    pub const fn kib(n: u64) -> Self {
        ByteSize(n.saturating_mul(Self::KIBIBYTE.0))
    }

    pub const fn mib(n: u64) -> Self {
        ByteSize(n.saturating_mul(Self::MEBIBYTE.0))
    }

    pub const fn gib(n: u64) -> Self {
        ByteSize(n.saturating_mul(Self::GIBIBYTE.0))
    }

    pub const fn bytes(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0 as f64;
        if self.0 >= Self::GIBIBYTE.0 {
            write!(f, "{:.2} GiB", value / Self::GIBIBYTE.0 as f64)
        } else if self.0 >= Self::MEBIBYTE.0 {
            write!(f, "{:.2} MiB", value / Self::MEBIBYTE.0 as f64)
        } else if self.0 >= Self::KIBIBYTE.0 {
            write!(f, "{:.2} KiB", value / Self::KIBIBYTE.0 as f64)
        } else {
            write!(f, "{} B", self.0)
        }
    }
}

/// Assumed number of outgoing transitions per state.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ModelDensity {
    /// The number of transitions per state grows with the number of states.
    Dense,
    /// 4096 transitions per state on average.
    High,
    /// 16 transitions per state on average.
    #[default]
    Medium,
    /// 8 transitions per state on average.
    Sparse,
    /// 1 transition per state on average.
    VerySparse,
    /// A custom average, must be positive.
    Limit(i64),
}

impl ModelDensity {
    /// The fixed number of transitions per state, or `None` for [`Dense`][ModelDensity::Dense].
    pub fn transitions_per_state(self) -> Result<Option<usize>, ConfigError> {
        let d = match self {
            ModelDensity::Dense => return Ok(None),
            ModelDensity::High => 4096,
            ModelDensity::Medium => 16,
            ModelDensity::Sparse => 8,
            ModelDensity::VerySparse => 1,
            ModelDensity::Limit(n) if n <= 0 => return Err(ConfigError::InvalidDensity(n)),
            ModelDensity::Limit(n) => usize::try_from(n).map_err(|_| ConfigError::InvalidDensity(n))?,
        };
        Ok(Some(d))
    }
}

/// A capacity plan: how many states, distributions and transitions to preallocate.
///
/// # Invariants
///
/// - `number_of_states > 0`
/// - `number_of_distributions > number_of_states`
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ModelByteSize {
    pub size_of_state: usize,
    pub size_of_transition: usize,
    pub number_of_states: usize,
    pub number_of_distributions: usize,
    pub number_of_transitions: usize,
}

impl ModelByteSize {
    pub fn new(
        size_of_state: usize,
        size_of_transition: usize,
        number_of_states: usize,
        number_of_distributions: usize,
        number_of_transitions: usize,
    ) -> Result<Self, ConfigError> {
        if size_of_state == 0 {
            return Err(ConfigError::EmptyStateVector);
        }
        if number_of_states == 0 {
            return Err(ConfigError::CapacityTooSmall {
                name: "number of states",
                value: 0,
                minimum: 1,
            });
        }
        if number_of_distributions <= number_of_states {
            return Err(ConfigError::CapacityTooSmall {
                name: "number of distributions",
                value: number_of_distributions as u64,
                minimum: number_of_states as u64 + 1,
            });
        }
        Ok(Self {
            size_of_state,
            size_of_transition,
            number_of_states,
            number_of_distributions,
            number_of_transitions,
        })
    }

    pub fn memory_limit_states(&self) -> ByteSize {
        ByteSize((self.number_of_states as u64).saturating_mul(self.size_of_state as u64))
    }

    pub fn memory_limit_transitions(&self) -> ByteSize {
        ByteSize((self.number_of_transitions as u64).saturating_mul(self.size_of_transition as u64))
    }

    pub fn total_memory_limit(&self) -> ByteSize {
        ByteSize(
            self.memory_limit_states()
                .0
                .saturating_add(self.memory_limit_transitions().0),
        )
    }
}

impl fmt::Display for ModelByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} states, {} distributions, {} transitions ({})",
            self.number_of_states,
            self.number_of_distributions,
            self.number_of_transitions,
            self.total_memory_limit()
        )
    }
}

fn distributions_for(number_of_states: usize, density: usize) -> usize {
    let per_state = (density as f64).sqrt().ceil() as usize;
    number_of_states
        .saturating_mul(per_state)
        .max(number_of_states.saturating_add(1))
}

/// Sizes the storage of a model under a byte budget and a density assumption.
///
/// Budgets above [`MAX_BYTE_BUDGET`] are clamped. With `size_of_transition == 0`
/// no transitions are stored and the whole budget goes to states.
pub fn plan(
    byte_budget: ByteSize,
    density: ModelDensity,
    size_of_state: usize,
    size_of_transition: usize,
) -> Result<ModelByteSize, ConfigError> {
    if byte_budget.0 < MIN_BYTE_BUDGET {
        return Err(ConfigError::BudgetTooSmall {
            budget: byte_budget.0,
            minimum: MIN_BYTE_BUDGET,
        });
    }
    if size_of_state == 0 {
        return Err(ConfigError::EmptyStateVector);
    }
    let fixed_density = density.transitions_per_state()?;
    let budget = byte_budget.0.min(MAX_BYTE_BUDGET);

    let (number_of_states, d) = if size_of_transition == 0 {
        let n = usize::try_from(budget / size_of_state as u64).unwrap_or(usize::MAX);
        (n, fixed_density.unwrap_or(0))
    } else {
        match fixed_density {
            None => {
                let estimate = (budget as f64 / size_of_transition as f64).sqrt().floor() as usize;
                let n = estimate.max(MIN_PLANNED_STATES);
                (n, n)
            }
            Some(d) => {
                let per_state = (size_of_transition as u64)
                    .saturating_mul(d as u64)
                    .saturating_add(size_of_state as u64);
                let n = usize::try_from(budget / per_state).unwrap_or(usize::MAX);
                (n, d)
            }
        }
    };

    if number_of_states < MIN_PLANNED_STATES {
        return Err(ConfigError::CapacityTooSmall {
            name: "number of states",
            value: number_of_states as u64,
            minimum: MIN_PLANNED_STATES as u64,
        });
    }

    ModelByteSize::new(
        size_of_state,
        size_of_transition,
        number_of_states,
        distributions_for(number_of_states, d),
        number_of_states.saturating_mul(d),
    )
}

/// How the capacity of the traversal storage is determined.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ModelCapacity {
    /// A fixed number of states with a density assumption for the transitions.
    ByModelDensity { state_capacity: usize, density: ModelDensity },
    /// Explicit numbers of states, distributions and transitions.
    ByModelSize {
        state_capacity: usize,
        distribution_capacity: usize,
        transition_capacity: usize,
    },
    /// A total memory budget with a density assumption.
    ByMemorySize { memory_limit: ByteSize, density: ModelDensity },
}

impl ModelCapacity {
    pub fn by_model_size(state_capacity: usize, transition_capacity: usize) -> Self {
        let density = transition_capacity / state_capacity.max(1);
        ModelCapacity::ByModelSize {
            state_capacity,
            distribution_capacity: distributions_for(state_capacity, density),
            transition_capacity,
        }
    }

    pub fn tiny_by_density() -> Self {
        ModelCapacity::ByModelDensity {
            state_capacity: 1024,
            density: ModelDensity::Dense,
        }
    }

    pub fn small_by_density() -> Self {
        ModelCapacity::ByModelDensity {
            state_capacity: 1 << 20,
            density: ModelDensity::Medium,
        }
    }

    pub fn normal_by_density() -> Self {
        ModelCapacity::ByModelDensity {
            state_capacity: 1 << 24,
            density: ModelDensity::Medium,
        }
    }

    pub fn large_by_density() -> Self {
        ModelCapacity::ByModelDensity {
            state_capacity: 1 << 28,
            density: ModelDensity::High,
        }
    }

    pub fn tiny_by_size() -> Self {
        Self::by_model_size(1024, 1024 * 1024)
    }

    pub fn small_by_size() -> Self {
        Self::by_model_size(1 << 20, 1 << 25)
    }

    pub fn normal_by_size() -> Self {
        Self::by_model_size(1 << 24, 1 << 29)
    }

    pub fn large_by_size() -> Self {
        Self::by_model_size(1 << 28, 1 << 30)
    }

    pub fn tiny_by_memory() -> Self {
        ModelCapacity::ByMemorySize {
            memory_limit: ByteSize::mib(1),
            density: ModelDensity::Sparse,
        }
    }

    pub fn small_by_memory() -> Self {
        ModelCapacity::ByMemorySize {
            memory_limit: ByteSize::mib(16),
            density: ModelDensity::Sparse,
        }
    }

    pub fn normal_by_memory() -> Self {
        ModelCapacity::ByMemorySize {
            memory_limit: ByteSize::mib(512),
            density: ModelDensity::High,
        }
    }

    pub fn large_by_memory() -> Self {
        ModelCapacity::ByMemorySize {
            memory_limit: ByteSize::gib(5),
            density: ModelDensity::High,
        }
    }

    /// Checks the capacity without deriving a plan.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            ModelCapacity::ByModelDensity { state_capacity, density } => {
                check_state_capacity(state_capacity)?;
                density.transitions_per_state().map(|_| ())
            }
            ModelCapacity::ByModelSize {
                state_capacity,
                distribution_capacity,
                ..
            } => {
                check_state_capacity(state_capacity)?;
                if distribution_capacity <= state_capacity {
                    return Err(ConfigError::CapacityTooSmall {
                        name: "distribution capacity",
                        value: distribution_capacity as u64,
                        minimum: state_capacity as u64 + 1,
                    });
                }
                Ok(())
            }
            ModelCapacity::ByMemorySize { memory_limit, density } => {
                if memory_limit.0 < MIN_BYTE_BUDGET {
                    return Err(ConfigError::BudgetTooSmall {
                        budget: memory_limit.0,
                        minimum: MIN_BYTE_BUDGET,
                    });
                }
                density.transitions_per_state().map(|_| ())
            }
        }
    }

    /// Derives the capacity plan for states and transitions of the given sizes.
    pub fn derive_model_byte_size(
        &self,
        size_of_state: usize,
        size_of_transition: usize,
    ) -> Result<ModelByteSize, ConfigError> {
        self.validate()?;
        match *self {
            ModelCapacity::ByModelDensity { state_capacity, density } => {
                let d = density.transitions_per_state()?.unwrap_or(state_capacity);
                ModelByteSize::new(
                    size_of_state,
                    size_of_transition,
                    state_capacity,
                    distributions_for(state_capacity, d),
                    state_capacity.saturating_mul(d),
                )
            }
            ModelCapacity::ByModelSize {
                state_capacity,
                distribution_capacity,
                transition_capacity,
            } => ModelByteSize::new(
                size_of_state,
                size_of_transition,
                state_capacity,
                distribution_capacity,
                transition_capacity,
            ),
            ModelCapacity::ByMemorySize { memory_limit, density } => {
                plan(memory_limit, density, size_of_state, size_of_transition)
            }
        }
    }
}

impl Default for ModelCapacity {
    fn default() -> Self {
        ModelCapacity::ByMemorySize {
            memory_limit: ByteSize::mib(10),
            density: ModelDensity::Medium,
        }
    }
}

fn check_state_capacity(state_capacity: usize) -> Result<(), ConfigError> {
    if state_capacity < MIN_STATE_CAPACITY {
        return Err(ConfigError::CapacityTooSmall {
            name: "state capacity",
            value: state_capacity as u64,
            minimum: MIN_STATE_CAPACITY as u64,
        });
    }
    Ok(())
}
