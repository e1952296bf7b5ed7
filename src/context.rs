//! State shared by all workers of one traversal.

use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::balancer::LoadBalancer;
use crate::capacity::ModelByteSize;
use crate::config::AnalysisConfiguration;
use crate::error::TraversalError;
use crate::model::{CounterExample, TraversalStatistics};
use crate::observers::TraversalParameters;
use crate::stack::DfsStack;
use crate::store::StateStore;

/// Running totals, updated concurrently by the workers.
#[derive(Debug, Default)]
pub struct TraversalCounters {
    state_count: AtomicUsize,
    transition_count: AtomicUsize,
    computed_transition_count: AtomicUsize,
    level_count: AtomicUsize,
}

impl TraversalCounters {
    pub fn add(&self, states: usize, transitions: usize, computed_transitions: usize) {
        self.state_count.fetch_add(states, Ordering::Relaxed);
        self.transition_count.fetch_add(transitions, Ordering::Relaxed);
        self.computed_transition_count
            .fetch_add(computed_transitions, Ordering::Relaxed);
    }

    /// Raises the level count to `level` if it is deeper.
    pub fn update_level(&self, level: usize) {
        self.level_count.fetch_max(level, Ordering::Relaxed);
    }

    pub fn state_count(&self) -> usize {
        self.state_count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TraversalStatistics {
        TraversalStatistics {
            state_count: self.state_count.load(Ordering::Relaxed),
            transition_count: self.transition_count.load(Ordering::Relaxed),
            computed_transition_count: self.computed_transition_count.load(Ordering::Relaxed),
            level_count: self.level_count.load(Ordering::Relaxed),
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

const NO_WORKER: isize = -1;

pub struct TraversalContext {
    pub configuration: AnalysisConfiguration,
    pub load_balancer: LoadBalancer,
    pub parameters: TraversalParameters,
    pub states: StateStore,
    pub counters: TraversalCounters,
    pub model_byte_size: ModelByteSize,
    /// Index of the artificial absorbing state targeted by pruned transitions.
    pub stuttering_state_index: usize,
    generating_counter_example: AtomicIsize,
    counter_example: Mutex<Option<CounterExample>>,
    error: Mutex<Option<TraversalError>>,
    formula_holds: AtomicBool,
    next_report: AtomicUsize,
}

impl TraversalContext {
    pub fn new(
        configuration: AnalysisConfiguration,
        model_byte_size: ModelByteSize,
        state_vector_size: usize,
    ) -> Self {
        let stacks = (0..configuration.effective_cpu_count())
            .map(|_| DfsStack::new(configuration.stack_capacity))
            .collect();
        let next_report = configuration.report_state_count_delta;
        Self {
            load_balancer: LoadBalancer::new(stacks),
            parameters: TraversalParameters::new(),
            states: StateStore::new(model_byte_size.number_of_states, state_vector_size),
            counters: TraversalCounters::default(),
            stuttering_state_index: model_byte_size.number_of_states,
            model_byte_size,
            generating_counter_example: AtomicIsize::new(NO_WORKER),
            counter_example: Mutex::new(None),
            error: Mutex::new(None),
            formula_holds: AtomicBool::new(true),
            next_report: AtomicUsize::new(next_report),
            configuration,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.load_balancer.worker_count()
    }

    /// Claims the right to build the counterexample. Only the first claim succeeds.
    pub fn claim_counter_example(&self, worker: usize) -> bool {
        self.generating_counter_example
            .compare_exchange(NO_WORKER, worker as isize, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn set_counter_example(&self, counter_example: CounterExample) {
        *self.counter_example.lock() = Some(counter_example);
    }

    pub fn take_counter_example(&self) -> Option<CounterExample> {
        self.counter_example.lock().take()
    }

    /// Records a fatal error. Only the first one is kept.
    pub fn record_error(&self, error: TraversalError) {
        let mut slot = self.error.lock();
        if slot.is_none() {
            warn!("Traversal failed: {}", error);
            *slot = Some(error);
        } else {
            debug!("Ignoring subsequent traversal failure: {}", error);
        }
    }

    pub fn take_error(&self) -> Option<TraversalError> {
        self.error.lock().take()
    }

    pub fn has_error(&self) -> bool {
        self.error.lock().is_some()
    }

    pub fn formula_holds(&self) -> bool {
        self.formula_holds.load(Ordering::Acquire)
    }

    pub fn report_violation(&self) {
        self.formula_holds.store(false, Ordering::Release);
    }

    /// Logs the statistics each time another batch of states has been discovered.
    pub fn report_progress(&self) {
        let state_count = self.counters.state_count();
        let next_report = self.next_report.load(Ordering::Relaxed);
        if state_count < next_report {
            return;
        }
        let delta = self.configuration.report_state_count_delta;
        if self
            .next_report
            .compare_exchange(next_report, next_report + delta, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            self.report();
        }
    }

    pub fn report(&self) {
        info!("{}", self.counters.snapshot());
    }

    /// Prepares the context for a new traversal.
    pub fn reset(&mut self) {
        self.load_balancer.reset();
        self.states.clear();
        self.counters.reset();
        *self.generating_counter_example.get_mut() = NO_WORKER;
        *self.counter_example.get_mut() = None;
        *self.error.get_mut() = None;
        *self.formula_holds.get_mut() = true;
        *self.next_report.get_mut() = self.configuration.report_state_count_delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::capacity::ModelCapacity;
    use crate::error::ModelFault;

    fn context() -> TraversalContext {
        let configuration = AnalysisConfiguration::default()
            .with_cpu_count(1)
            .with_stack_capacity(1024)
            .with_report_state_count_delta(10);
        let model_byte_size = ModelCapacity::tiny_by_size().derive_model_byte_size(4, 32).unwrap();
        TraversalContext::new(configuration, model_byte_size, 4)
    }

    #[test]
    fn test_counter_example_claimed_once() {
        let context = context();
        assert!(context.claim_counter_example(1));
        assert!(!context.claim_counter_example(0));
        assert!(!context.claim_counter_example(1));
    }

    #[test]
    fn test_first_error_wins() {
        let context = context();
        context.record_error(TraversalError::Deadlock { state: Some(1) });
        context.record_error(ModelFault::new("late").into());
        assert_eq!(context.take_error(), Some(TraversalError::Deadlock { state: Some(1) }));
    }

    #[test]
    fn test_counters() {
        let context = context();
        context.counters.add(3, 5, 6);
        context.counters.add(1, 1, 2);
        context.counters.update_level(4);
        context.counters.update_level(2);
        let statistics = context.counters.snapshot();
        assert_eq!(statistics.state_count, 4);
        assert_eq!(statistics.transition_count, 6);
        assert_eq!(statistics.computed_transition_count, 8);
        assert_eq!(statistics.level_count, 4);
    }

    #[test]
    fn test_progress_report_advances() {
        let context = context();
        context.counters.add(25, 0, 0);
        context.report_progress();
        assert_eq!(context.next_report.load(Ordering::Relaxed), 20);
        context.report_progress();
        assert_eq!(context.next_report.load(Ordering::Relaxed), 30);
        context.report_progress();
        assert_eq!(context.next_report.load(Ordering::Relaxed), 30);
    }

    #[test]
    fn test_reset() {
        let mut context = context();
        context.report_violation();
        assert!(context.claim_counter_example(0));
        context.states.add_state(&[0, 0, 0, 1]).unwrap();
        context.reset();
        assert!(context.formula_holds());
        assert!(context.claim_counter_example(0));
        assert!(context.states.is_empty());
    }
}
