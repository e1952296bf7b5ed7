//! Parallel traversal of the reachable state space of a model.
//!
//! The [`ModelTraverser`] owns the workers and the shared
//! [`TraversalContext`]. A traversal seeds the initial states on the first
//! worker, then runs every worker on its own thread until the load balancer
//! observes that all of them ran out of work, or until a worker terminates
//! the traversal.
//!
//! What a traversal computes is determined by the observers registered in
//! [`TraversalParameters`]; see [`crate::invariant`] and [`crate::ltmc`].

use std::thread;

use log::{debug, info};

use crate::capacity::ModelByteSize;
use crate::config::AnalysisConfiguration;
use crate::context::TraversalContext;
use crate::error::{AnalysisError, ConfigError};
use crate::model::{AnalysisModel, CounterExample, TraversalStatistics};
use crate::observers::TraversalParameters;
use crate::worker::Worker;

pub struct ModelTraverser<M> {
    context: TraversalContext,
    workers: Vec<Worker<M>>,
}

impl<M: AnalysisModel> ModelTraverser<M> {
    /// Creates one model per worker and plans the storage.
    ///
    /// `size_of_transition` is the number of bytes stored per transition; zero
    /// if transitions are not stored at all.
    pub fn new<F>(
        create_model: F,
        configuration: AnalysisConfiguration,
        size_of_transition: usize,
    ) -> Result<Self, ConfigError>
    where
        F: Fn() -> M,
    {
        configuration.validate()?;

        let workers: Vec<Worker<M>> = (0..configuration.effective_cpu_count())
            .map(|index| Worker::new(index, create_model()))
            .collect();
        let state_vector_size = workers[0].model().state_vector_size();
        let model_byte_size = configuration
            .model_capacity
            .derive_model_byte_size(state_vector_size, size_of_transition)?;
        debug!("Capacity plan: {}", model_byte_size);

        Ok(Self {
            context: TraversalContext::new(configuration, model_byte_size, state_vector_size),
            workers,
        })
    }

    pub fn context(&self) -> &TraversalContext {
        &self.context
    }

    pub fn parameters_mut(&mut self) -> &mut TraversalParameters {
        &mut self.context.parameters
    }

    pub fn configuration(&self) -> &AnalysisConfiguration {
        &self.context.configuration
    }

    pub fn model_byte_size(&self) -> ModelByteSize {
        self.context.model_byte_size
    }

    pub fn state_vector_size(&self) -> usize {
        self.context.states.state_vector_size()
    }

    /// Index of the artificial absorbing state targeted by pruned transitions.
    pub fn stuttering_state_index(&self) -> usize {
        self.context.stuttering_state_index
    }

    /// Takes the counterexample of the last traversal, if one was built.
    pub fn take_counter_example(&self) -> Option<CounterExample> {
        self.context.take_counter_example()
    }

    /// Explores all states reachable from the initial states of the model.
    pub fn traverse_model(&mut self) -> Result<TraversalStatistics, AnalysisError> {
        self.context.reset();
        for worker in self.workers.iter_mut() {
            worker.reset(&self.context);
        }

        let context = &self.context;
        let verbose = !context.configuration.progress_reports_only;
        if verbose {
            info!("Traversing the model with {} CPU cores.", self.workers.len());
            info!("State vector has {} bytes.", context.states.state_vector_size());
        }

        self.workers[0].compute_initial_states(context);

        if !context.load_balancer.is_terminated() {
            thread::scope(|s| {
                for worker in self.workers.iter_mut() {
                    s.spawn(move || worker.check(context));
                }
            });
        }

        let statistics = context.counters.snapshot();
        if verbose {
            context.report();
        }

        if let Some(error) = context.take_error() {
            return Err(AnalysisError::Traversal {
                error,
                counter_example: context.take_counter_example(),
            });
        }
        Ok(statistics)
    }
}
