//! Generation of labeled transition Markov chains.
//!
//! The [`LtmcGenerator`] traverses a probabilistic model and records every
//! expanded state's outgoing distribution in a [`TransitionChain`]. The
//! result, a [`LabeledTransitionMarkovChain`], can be exported to PRISM
//! (see [`crate::prism`]) or GraphViz (see [`crate::dot`]).
//!
//! # Static pruning
//!
//! Given a terminate-early condition over labels, transitions satisfying it
//! are redirected into an artificial absorbing state (the stuttering state)
//! and their targets are never expanded. This keeps the chain small when
//! only the probability of reaching such states is of interest.

use std::sync::Arc;

use log::info;

use crate::chain::{ChainEntry, ChainIter, TransitionChain, ELEMENT_SIZE};
use crate::config::AnalysisConfiguration;
use crate::context::TraversalContext;
use crate::error::{AnalysisError, ConfigError, TraversalResult};
use crate::model::{AnalysisModel, IndexedTransition, TraversalStatistics};
use crate::observers::{BatchedTransitionAction, EarlyTerminationModifier};
use crate::traverser::ModelTraverser;
use crate::types::{LabelSet, MAX_LABELS};

/// Records the distribution of every expanded state into a shared chain.
pub struct LtmcBuilder {
    chain: Arc<TransitionChain>,
}

impl LtmcBuilder {
    pub fn new(chain: Arc<TransitionChain>) -> Self {
        Self { chain }
    }
}

impl BatchedTransitionAction for LtmcBuilder {
    fn process_transitions(
        &mut self,
        _context: &TraversalContext,
        source: usize,
        transitions: &[IndexedTransition],
        is_initial: bool,
    ) -> TraversalResult<()> {
        self.chain.add_state_info(source, is_initial, transitions)
    }
}

/// A discrete-time Markov chain whose transitions carry state labels.
pub struct LabeledTransitionMarkovChain {
    labels: Vec<String>,
    chain: Arc<TransitionChain>,
    statistics: TraversalStatistics,
    stuttering_state: Option<usize>,
}

impl LabeledTransitionMarkovChain {
    pub fn new(
        labels: Vec<String>,
        chain: Arc<TransitionChain>,
        statistics: TraversalStatistics,
        stuttering_state: Option<usize>,
    ) -> Self {
        Self {
            labels,
            chain,
            statistics,
            stuttering_state,
        }
    }

    /// Names of the labels, indexed like the bits of a [`LabelSet`].
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn chain(&self) -> &TransitionChain {
        &self.chain
    }

    pub fn statistics(&self) -> TraversalStatistics {
        self.statistics
    }

    /// The artificial absorbing state, if static pruning was applied.
    pub fn stuttering_state(&self) -> Option<usize> {
        self.stuttering_state
    }

    pub fn source_states(&self) -> impl Iterator<Item = usize> + '_ {
        self.chain.source_states()
    }

    pub fn transitions(&self, source: usize) -> ChainIter<'_> {
        self.chain.transitions(source)
    }

    pub fn initial_distribution(&self) -> ChainIter<'_> {
        self.chain.initial_distribution()
    }

    /// The largest state index occurring in the chain.
    pub fn max_state_index(&self) -> Option<usize> {
        self.chain
            .elements()
            .map(|entry| entry.target)
            .chain(self.source_states())
            .max()
    }

    /// Names of the labels in `labels`.
    pub fn label_names(&self, labels: LabelSet) -> Vec<&str> {
        labels
            .iter()
            .filter_map(|i| self.labels.get(i).map(String::as_str))
            .collect()
    }

    /// Probability of the transitions from `source` whose targets satisfy `predicate`.
    pub fn probability_of(&self, source: Option<usize>, predicate: impl Fn(&ChainEntry) -> bool) -> f64 {
        let entries = match source {
            Some(source) => self.transitions(source),
            None => self.initial_distribution(),
        };
        crate::utils::sum_probabilities(entries.filter(|e| predicate(e)).map(|e| e.probability))
    }
}

type TerminateEarly = Arc<dyn Fn(LabelSet) -> bool + Send + Sync>;

/// Builds a [`LabeledTransitionMarkovChain`] by traversing a model.
pub struct LtmcGenerator<M> {
    traverser: ModelTraverser<M>,
    labels: Vec<String>,
    terminate_early: Option<TerminateEarly>,
}

impl<M: AnalysisModel> LtmcGenerator<M> {
    pub fn new<F>(
        create_model: F,
        configuration: AnalysisConfiguration,
        labels: Vec<String>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn() -> M,
    {
        if labels.len() > MAX_LABELS {
            return Err(ConfigError::TooManyLabels {
                count: labels.len(),
                maximum: MAX_LABELS,
            });
        }
        let traverser = ModelTraverser::new(create_model, configuration, ELEMENT_SIZE)?;
        Ok(Self {
            traverser,
            labels,
            terminate_early: None,
        })
    }

    /// Sets the condition under which transitions are pruned into the stuttering state.
    pub fn with_terminate_early<P>(mut self, condition: P) -> Self
    where
        P: Fn(LabelSet) -> bool + Send + Sync + 'static,
    {
        self.terminate_early = Some(Arc::new(condition));
        self
    }

    pub fn traverser(&self) -> &ModelTraverser<M> {
        &self.traverser
    }

    pub fn generate(&mut self) -> Result<LabeledTransitionMarkovChain, AnalysisError> {
        let model_byte_size = self.traverser.model_byte_size();
        let stuttering_state_index = self.traverser.stuttering_state_index();
        let chain = Arc::new(TransitionChain::new(
            model_byte_size.number_of_states + 1,
            model_byte_size.number_of_transitions,
        ));

        let prune = self.traverser.configuration().enable_static_pruning;
        let parameters = self.traverser.parameters_mut();
        parameters.clear();

        let mut stuttering_state = None;
        if let (true, Some(condition)) = (prune, &self.terminate_early) {
            let condition = condition.clone();
            parameters.add_transition_modifier(move || EarlyTerminationModifier::new(condition.clone()));
            chain
                .create_stuttering_state(stuttering_state_index)
                .map_err(|error| AnalysisError::Traversal {
                    error,
                    counter_example: None,
                })?;
            stuttering_state = Some(stuttering_state_index);
        }

        let builder_chain = chain.clone();
        parameters.add_batched_transition_action(move || LtmcBuilder::new(builder_chain.clone()));

        let statistics = self.traverser.traverse_model()?;

        if self.traverser.configuration().validate_probabilities {
            chain.validate_initial_distribution()?;
            chain.validate_states()?;
        }

        if !self.traverser.configuration().progress_reports_only {
            info!(
                "Generated labeled transition Markov chain with {} transitions.",
                chain.transition_count()
            );
        }

        Ok(LabeledTransitionMarkovChain::new(
            self.labels.clone(),
            chain,
            statistics,
            stuttering_state,
        ))
    }
}
