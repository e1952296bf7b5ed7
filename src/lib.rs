//! # ltmc-rs: Parallel State Space Traversal in Rust
//!
//! **`ltmc-rs`** explores the reachable state space of a model on a fixed pool of threads
//! and turns it into something checkable: a verdict for an invariant, or a
//! **labeled transition Markov chain** for probabilistic analysis.
//!
//! ## How it works
//!
//! A model is anything implementing [`AnalysisModel`][crate::model::AnalysisModel]: it has
//! fixed-size byte states, produces the initial transitions, and computes the successors of
//! a state. Every worker thread owns one model instance and a depth-first stack.
//! New states are deduplicated through a shared concurrent [`StateStore`][crate::store::StateStore],
//! and idle workers steal frames from busy ones through the [`LoadBalancer`][crate::balancer::LoadBalancer].
//!
//! ## Key Features
//!
//! - **Work stealing**: Idle workers announce themselves and receive half of a busy worker's pending frames.
//! - **Bounded memory**: All storage is preallocated by the [`capacity`] planner. Running out is a reported error, never a reallocation.
//! - **Counterexamples**: Violations, deadlocks and model faults produce the path leading to them.
//! - **Markov chains**: Probabilistic transitions are merged per source and exported to PRISM or Graphviz.
//! - **Static pruning**: Transitions satisfying a terminate-early condition end in a single absorbing state.
//!
//! ## Basic Usage
//!
//! ```rust
//! use ltmc_rs::capacity::ModelCapacity;
//! use ltmc_rs::config::AnalysisConfiguration;
//! use ltmc_rs::error::ModelFault;
//! use ltmc_rs::ltmc::LtmcGenerator;
//! use ltmc_rs::model::{AnalysisModel, Transition, TransitionCollection};
//! use ltmc_rs::types::LabelSet;
//!
//! // A coin flipped until it shows heads.
//! struct Coin;
//!
//! impl AnalysisModel for Coin {
//!     fn state_vector_size(&self) -> usize {
//!         1
//!     }
//!
//!     fn initial_transitions(&mut self) -> Result<TransitionCollection, ModelFault> {
//!         self.successor_transitions(&[0])
//!     }
//!
//!     fn successor_transitions(&mut self, state: &[u8]) -> Result<TransitionCollection, ModelFault> {
//!         let heads = LabelSet::EMPTY.with(0);
//!         Ok(match state[0] {
//!             0 => vec![
//!                 Transition::with_probability(vec![0], LabelSet::EMPTY, 0.5),
//!                 Transition::with_probability(vec![1], heads, 0.5),
//!             ],
//!             _ => vec![Transition::with_probability(vec![1], heads, 1.0)],
//!         }
//!         .into())
//!     }
//! }
//!
//! let config = AnalysisConfiguration::default()
//!     .with_worker_count(2)
//!     .with_stack_capacity(1024)
//!     .with_model_capacity(ModelCapacity::by_model_size(1024, 4096));
//! let mut generator = LtmcGenerator::new(|| Coin, config, vec!["heads".to_string()]).unwrap();
//! let ltmc = generator.generate().unwrap();
//!
//! assert_eq!(ltmc.statistics().state_count, 2);
//! let heads = ltmc.probability_of(None, |e| e.labels.contains(0));
//! assert!((heads - 0.5).abs() < 1e-9);
//! println!("{}", ltmc.to_prism().unwrap());
//! ```
//!
//! ## Core Components
//!
//! - **[`traverser`]**: The parallel traversal driving the [`worker`]s.
//! - **[`invariant`]**: Checking that a label holds in every reachable state.
//! - **[`ltmc`]**: Building labeled transition Markov chains, exported by [`prism`] and [`dot`].
//! - **[`checker`]**: Bounded reachability probabilities on generated chains.
//! - **[`capacity`]**: Planning how many states and transitions fit into a memory budget.
//!
//! For the observer hooks a traversal runs, see the [`observers`] module documentation.

pub mod balancer;
pub mod capacity;
pub mod chain;
pub mod checker;
pub mod config;
pub mod context;
pub mod dot;
pub mod error;
pub mod invariant;
pub mod ltmc;
pub mod model;
pub mod observers;
pub mod prism;
pub mod stack;
pub mod store;
pub mod traverser;
pub mod types;
pub mod utils;
pub mod worker;
