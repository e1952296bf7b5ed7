//! Bounded reachability on labeled transition Markov chains.
//!
//! Labels sit on transitions, so formulas are decided per transition rather
//! than per state. For `phi U<=k psi` a transition is *satisfied* if its
//! labels satisfy `psi`, *excluded* if they satisfy neither `psi` nor `phi`,
//! and open otherwise. Only open transitions continue the iteration.
//!
//! The step from the artificial initial state into the initial distribution
//! is not counted. The stuttering state loops on itself without labels, so
//! it absorbs with probability zero.

use std::time::Instant;

use log::debug;

use crate::chain::ChainIter;
use crate::ltmc::LabeledTransitionMarkovChain;
use crate::types::LabelSet;
use crate::utils::sum_probabilities;

/// Number of iterations between two progress messages.
const REPORT_INTERVAL: usize = 10;

/// The outgoing distribution of one source state, with satisfied transitions
/// folded into a single probability and excluded ones dropped.
#[derive(Debug)]
struct Row {
    satisfied: f64,
    open: Vec<(usize, f64)>,
}

impl Row {
    fn new(entries: ChainIter<'_>, phi: &impl Fn(LabelSet) -> bool, psi: &impl Fn(LabelSet) -> bool) -> Self {
        let mut satisfied = Vec::new();
        let mut open = Vec::new();
        for entry in entries {
            if psi(entry.labels) {
                satisfied.push(entry.probability);
            } else if phi(entry.labels) {
                open.push((entry.target, entry.probability));
            }
        }
        Self {
            satisfied: sum_probabilities(satisfied),
            open,
        }
    }

    fn evaluate(&self, x: &[f64]) -> f64 {
        self.satisfied + sum_probabilities(self.open.iter().map(|&(target, p)| p * x[target]))
    }
}

impl LabeledTransitionMarkovChain {
    /// Probability of taking a transition labeled with `psi` within `steps` steps.
    pub fn bounded_reachability<Psi>(&self, psi: Psi, steps: usize) -> f64
    where
        Psi: Fn(LabelSet) -> bool,
    {
        self.bounded_until(|_| true, psi, steps)
    }

    /// Probability of taking a transition labeled with `psi` within `steps`
    /// steps, while every transition before it is labeled with `phi`.
    pub fn bounded_until<Phi, Psi>(&self, phi: Phi, psi: Psi, steps: usize) -> f64
    where
        Phi: Fn(LabelSet) -> bool,
        Psi: Fn(LabelSet) -> bool,
    {
        let state_count = self.max_state_index().map_or(0, |index| index + 1);
        let rows: Vec<(usize, Row)> = self
            .source_states()
            .map(|source| (source, Row::new(self.transitions(source), &phi, &psi)))
            .collect();
        let initial = Row::new(self.initial_distribution(), &phi, &psi);

        let mut x_old = vec![0.0; state_count];
        let mut x_new = vec![0.0; state_count];
        let start = Instant::now();
        for iteration in 1..=steps {
            std::mem::swap(&mut x_old, &mut x_new);
            for (source, row) in &rows {
                x_new[*source] = row.evaluate(&x_old);
            }

            if iteration % REPORT_INTERVAL == 0 {
                debug!(
                    "{} bounded until iterations in {:?}, current probability {}",
                    iteration,
                    start.elapsed(),
                    initial.evaluate(&x_new)
                );
            }
        }

        initial.evaluate(&x_new)
    }
}
