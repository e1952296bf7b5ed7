//! The unit of parallel execution of a traversal.
//!
//! Each worker owns one model instance and one stack (held by the load
//! balancer). It repeatedly takes the topmost state of its stack, asks the
//! model for the successors, deduplicates them through the shared state
//! store and pushes the new ones as the next frame.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use log::debug;

use crate::context::TraversalContext;
use crate::error::{ModelFault, TraversalError, TraversalResult};
use crate::model::{AnalysisModel, IndexedTransition, TransitionCollection};
use crate::observers::{Observers, Verdict};

pub struct Worker<M> {
    index: usize,
    model: M,
    observers: Option<Observers>,
    indexed: Vec<IndexedTransition>,
}

/// Runs a model callback, turning panics into traversal errors.
fn call_model<T>(f: impl FnOnce() -> Result<T, ModelFault>) -> TraversalResult<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result.map_err(TraversalError::from),
        Err(payload) => Err(TraversalError::ModelPanicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl<M: AnalysisModel> Worker<M> {
    pub fn new(index: usize, model: M) -> Self {
        Self {
            index,
            model,
            observers: None,
            indexed: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Restores the model, clears the stack and recreates the observers.
    pub fn reset(&mut self, context: &TraversalContext) {
        self.model.reset();
        context.load_balancer.stack(self.index).clear();
        self.observers = Some(context.parameters.materialize());
    }

    /// Expands the initial transitions of the model, seeding the first frame.
    pub fn compute_initial_states(&mut self, context: &TraversalContext) {
        let model = &mut self.model;
        match call_model(|| model.initial_transitions()) {
            Ok(transitions) => self.handle_transitions(context, transitions, 0, true),
            Err(error) => {
                context.load_balancer.terminate();
                let out_of_memory = error.is_out_of_memory();
                context.record_error(error);
                if !out_of_memory
                    && context.claim_counter_example(self.index)
                    && context.configuration.generate_counter_example
                {
                    context.set_counter_example(self.model.create_counter_example(Vec::new(), true));
                }
            }
        }
    }

    /// Explores states until the load balancer stops the worker.
    pub fn check(&mut self, context: &TraversalContext) {
        while context.load_balancer.load_balance(self.index) {
            let Some(state) = context.load_balancer.stack(self.index).try_get_state() else {
                continue;
            };

            let source = &context.states[state];
            let model = &mut self.model;
            let transitions = match call_model(|| model.successor_transitions(source)) {
                Ok(transitions) => transitions,
                Err(error) => {
                    self.fail(context, error, true);
                    return;
                }
            };

            self.handle_transitions(context, transitions, state, false);

            let level = context.load_balancer.stack(self.index).frame_count();
            context.counters.update_level(level);
            context.report_progress();
        }
    }

    fn handle_transitions(
        &mut self,
        context: &TraversalContext,
        mut transitions: TransitionCollection,
        source: usize,
        is_initial: bool,
    ) {
        if let Err(error) = self.expand(context, &mut transitions, source, is_initial) {
            self.fail(context, error, false);
        }
    }

    fn expand(
        &mut self,
        context: &TraversalContext,
        transitions: &mut TransitionCollection,
        source: usize,
        is_initial: bool,
    ) -> TraversalResult<()> {
        let Self {
            index,
            model,
            observers,
            indexed,
        } = self;
        let observers = observers.get_or_insert_with(|| context.parameters.materialize());
        let source_state = if is_initial { None } else { Some(&context.states[source]) };

        for modifier in observers.transition_modifiers.iter_mut() {
            modifier.modify_transitions(context, transitions, source_state, is_initial);
        }

        indexed.clear();
        let mut state_count = 0;
        {
            let mut stack = context.load_balancer.stack(*index);
            stack.push_frame()?;

            for transition in transitions.valid() {
                let (is_new, target) = if transition.to_stuttering_state {
                    (false, context.stuttering_state_index)
                } else {
                    context.states.add_state(&transition.target)?
                };

                if is_new {
                    state_count += 1;
                    stack.push_state(target)?;

                    for action in observers.state_actions.iter_mut() {
                        let verdict =
                            action.process_state(context, &transition.target, target, transition.labels, is_initial);
                        if verdict == Verdict::Violation {
                            debug!("Worker {} found a violation in state {}", index, target);
                            context.report_violation();
                            if context.configuration.enable_early_termination {
                                context.load_balancer.terminate();
                            }
                            Self::build_counter_example(&*model, *index, context, stack.get_path(), false, false);
                        }
                    }
                }

                let transition = IndexedTransition {
                    target,
                    labels: transition.labels,
                    probability: transition.probability,
                };
                for action in observers.transition_actions.iter_mut() {
                    action.process_transition(context, source, &transition, is_initial)?;
                }
                indexed.push(transition);
            }
        }

        if indexed.is_empty() {
            return Err(TraversalError::Deadlock {
                state: if is_initial { None } else { Some(source) },
            });
        }

        context
            .counters
            .add(state_count, indexed.len(), transitions.total_count());
        debug!(
            "Worker {} expanded {}: {} transitions, {} new states",
            index,
            if is_initial { "the initial states".to_string() } else { format!("state {}", source) },
            indexed.len(),
            state_count
        );

        for action in observers.batched_transition_actions.iter_mut() {
            action.process_transitions(context, source, &indexed[..], is_initial)?;
        }

        Ok(())
    }

    /// Terminates the traversal because of `error`.
    fn fail(&self, context: &TraversalContext, error: TraversalError, add_additional_state: bool) {
        context.load_balancer.terminate();
        let out_of_memory = error.is_out_of_memory();
        context.record_error(error);
        if !out_of_memory {
            self.create_counter_example(context, true, add_additional_state);
        }
    }

    /// Builds a counterexample for the current path of the worker, unless
    /// another worker already did so.
    ///
    /// With `add_additional_state`, a zero-filled state is appended, standing
    /// for the step that raised a fault.
    pub fn create_counter_example(
        &self,
        context: &TraversalContext,
        ends_with_exception: bool,
        add_additional_state: bool,
    ) {
        let path = context.load_balancer.stack(self.index).get_path();
        Self::build_counter_example(
            &self.model,
            self.index,
            context,
            path,
            ends_with_exception,
            add_additional_state,
        );
    }

    fn build_counter_example(
        model: &M,
        worker: usize,
        context: &TraversalContext,
        path: Vec<usize>,
        ends_with_exception: bool,
        add_additional_state: bool,
    ) {
        if !context.claim_counter_example(worker) {
            return;
        }
        if !context.configuration.generate_counter_example {
            return;
        }

        let state_vector_size = model.state_vector_size();
        let mut trace: Vec<Box<[u8]>> = path.iter().map(|&state| context.states[state].into()).collect();
        if add_additional_state {
            trace.push(vec![0; state_vector_size].into_boxed_slice());
        }

        debug!("Worker {} builds a counterexample of length {}", worker, trace.len());
        context.set_counter_example(model.create_counter_example(trace, ends_with_exception));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::capacity::ModelCapacity;
    use crate::config::AnalysisConfiguration;
    use crate::model::Transition;
    use crate::types::LabelSet;

    /// Counts down from the initial state to zero, where it deadlocks.
    struct Countdown {
        start: u8,
    }

    impl AnalysisModel for Countdown {
        fn state_vector_size(&self) -> usize {
            1
        }

        fn initial_transitions(&mut self) -> Result<TransitionCollection, ModelFault> {
            Ok(vec![Transition::new(vec![self.start], LabelSet::EMPTY)].into())
        }

        fn successor_transitions(&mut self, state: &[u8]) -> Result<TransitionCollection, ModelFault> {
            match state[0] {
                0 => Ok(vec![Transition::invalid(vec![0])].into()),
                13 => Err(ModelFault::new("unlucky")),
                n => Ok(vec![Transition::new(vec![n - 1], LabelSet::EMPTY)].into()),
            }
        }
    }

    fn context() -> TraversalContext {
        let configuration = AnalysisConfiguration::default()
            .with_cpu_count(1)
            .with_stack_capacity(1024);
        let model_byte_size = ModelCapacity::tiny_by_size().derive_model_byte_size(1, 0).unwrap();
        TraversalContext::new(configuration, model_byte_size, 1)
    }

    #[test]
    fn test_initial_states() {
        let context = context();
        let mut worker = Worker::new(0, Countdown { start: 3 });
        worker.reset(&context);
        worker.compute_initial_states(&context);
        assert_eq!(context.counters.snapshot().state_count, 1);
        assert_eq!(context.load_balancer.stack(0).get_path(), vec![0]);
    }

    #[test]
    fn test_deadlock_is_fatal() {
        let context = context();
        let mut worker = Worker::new(0, Countdown { start: 3 });
        worker.reset(&context);
        worker.compute_initial_states(&context);
        worker.check(&context);

        assert_eq!(context.take_error(), Some(TraversalError::Deadlock { state: Some(3) }));
        let counter_example = context.take_counter_example().unwrap();
        assert!(counter_example.ends_with_exception);
        let path: Vec<u8> = counter_example.path.iter().map(|s| s[0]).collect();
        assert_eq!(path, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_model_fault_adds_final_state() {
        let context = context();
        let mut worker = Worker::new(0, Countdown { start: 14 });
        worker.reset(&context);
        worker.compute_initial_states(&context);
        worker.check(&context);

        assert_eq!(context.take_error(), Some(ModelFault::new("unlucky").into()));
        let counter_example = context.take_counter_example().unwrap();
        let path: Vec<u8> = counter_example.path.iter().map(|s| s[0]).collect();
        assert_eq!(path, vec![14, 13, 0]);
    }

    #[test]
    fn test_panic_message() {
        let error = call_model::<()>(|| panic!("boom")).unwrap_err();
        assert_eq!(error, TraversalError::ModelPanicked("boom".to_string()));
        let error = call_model::<()>(|| panic!("{} {}", "formatted", 42)).unwrap_err();
        assert_eq!(error, TraversalError::ModelPanicked("formatted 42".to_string()));
    }
}
