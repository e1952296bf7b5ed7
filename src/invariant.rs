//! Checking that a label holds in every reachable state.

use log::info;

use crate::config::AnalysisConfiguration;
use crate::error::{AnalysisError, ConfigError};
use crate::model::{AnalysisModel, AnalysisResult};
use crate::observers::InvariantViolationAction;
use crate::traverser::ModelTraverser;
use crate::types::MAX_LABELS;

/// Checks an invariant given as the index of a state label.
///
/// The invariant holds in a state iff its label holds in the state, as
/// reported by the labels of the transitions leading into it. The first
/// violating state found ends the counterexample. With early termination
/// enabled, the traversal stops right there.
pub struct InvariantChecker<M> {
    traverser: ModelTraverser<M>,
}

impl<M: AnalysisModel> InvariantChecker<M> {
    pub fn new<F>(
        create_model: F,
        configuration: AnalysisConfiguration,
        invariant: usize,
    ) -> Result<Self, ConfigError>
    where
        F: Fn() -> M,
    {
        if invariant >= MAX_LABELS {
            return Err(ConfigError::TooManyLabels {
                count: invariant + 1,
                maximum: MAX_LABELS,
            });
        }
        let mut traverser = ModelTraverser::new(create_model, configuration, 0)?;
        traverser
            .parameters_mut()
            .add_state_action(move || InvariantViolationAction::new(invariant));
        Ok(Self { traverser })
    }

    pub fn traverser(&self) -> &ModelTraverser<M> {
        &self.traverser
    }

    pub fn check(&mut self) -> Result<AnalysisResult, AnalysisError> {
        let statistics = self.traverser.traverse_model()?;
        let formula_holds = self.traverser.context().formula_holds();
        let counter_example = self.traverser.take_counter_example();

        if !formula_holds && !self.traverser.configuration().progress_reports_only {
            info!("Invariant violation detected.");
        }

        Ok(AnalysisResult {
            formula_holds,
            counter_example,
            statistics,
        })
    }
}
