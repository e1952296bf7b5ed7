#![allow(dead_code)]

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use ltmc_rs::capacity::ModelCapacity;
use ltmc_rs::config::AnalysisConfiguration;
use ltmc_rs::error::ModelFault;
use ltmc_rs::model::{AnalysisModel, Transition, TransitionCollection};
use ltmc_rs::types::LabelSet;

pub fn config(cpu_count: usize) -> AnalysisConfiguration {
    AnalysisConfiguration::default()
        .with_worker_count(cpu_count)
        .with_stack_capacity(4096)
        .with_model_capacity(ModelCapacity::by_model_size(4096, 1 << 16))
        .with_probability_validation(true)
}

/// A random acyclic graph over `u16` nodes. Sinks loop on themselves.
#[derive(Clone)]
pub struct RandomDag {
    roots: Vec<u16>,
    successors: Vec<Vec<u16>>,
}

impl RandomDag {
    pub fn generate(seed: u64, nodes: usize, max_degree: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let successors = (0..nodes)
            .map(|i| {
                if i + 1 == nodes {
                    return Vec::new();
                }
                let degree = rng.random_range(0..=max_degree);
                (0..degree)
                    .map(|_| rng.random_range(i + 1..nodes) as u16)
                    .collect()
            })
            .collect();
        let roots = (0..3).map(|_| rng.random_range(0..nodes / 4) as u16).collect();
        Self { roots, successors }
    }

    /// Nodes reachable from the roots, computed sequentially.
    pub fn reachable(&self) -> BTreeSet<Vec<u8>> {
        let mut seen = BTreeSet::new();
        let mut pending: Vec<u16> = self.roots.clone();
        while let Some(node) = pending.pop() {
            if seen.insert(node) {
                pending.extend(self.successors[node as usize].iter().copied());
            }
        }
        seen.into_iter().map(|n| n.to_le_bytes().to_vec()).collect()
    }

    fn transitions(&self, targets: &[u16]) -> TransitionCollection {
        targets
            .iter()
            .map(|t| Transition::new(t.to_le_bytes().to_vec(), LabelSet::EMPTY))
            .collect::<Vec<_>>()
            .into()
    }
}

impl AnalysisModel for RandomDag {
    fn state_vector_size(&self) -> usize {
        2
    }

    fn initial_transitions(&mut self) -> Result<TransitionCollection, ModelFault> {
        Ok(self.transitions(&self.roots))
    }

    fn successor_transitions(&mut self, state: &[u8]) -> Result<TransitionCollection, ModelFault> {
        let node = u16::from_le_bytes([state[0], state[1]]);
        let successors = &self.successors[node as usize];
        if successors.is_empty() {
            Ok(self.transitions(&[node]))
        } else {
            Ok(self.transitions(successors))
        }
    }
}

/// Counts from zero up to `limit`, where it stays.
///
/// Label 0 holds in every state below `bound`. `faulty` makes the step out of
/// that state fail.
pub struct Counter {
    pub limit: u8,
    pub bound: u8,
    pub faulty: Option<u8>,
}

impl Counter {
    pub fn new(limit: u8, bound: u8) -> Self {
        Self {
            limit,
            bound,
            faulty: None,
        }
    }

    fn to(&self, value: u8) -> Transition {
        let labels = if value < self.bound { LabelSet::EMPTY.with(0) } else { LabelSet::EMPTY };
        Transition::with_probability(vec![value], labels, 1.0)
    }
}

impl AnalysisModel for Counter {
    fn state_vector_size(&self) -> usize {
        1
    }

    fn initial_transitions(&mut self) -> Result<TransitionCollection, ModelFault> {
        Ok(vec![self.to(0)].into())
    }

    fn successor_transitions(&mut self, state: &[u8]) -> Result<TransitionCollection, ModelFault> {
        let value = state[0];
        if Some(value) == self.faulty {
            return Err(ModelFault::new(format!("step from {} failed", value)));
        }
        Ok(vec![self.to(value.saturating_add(1).min(self.limit))].into())
    }
}

pub const DONE: usize = 0;
pub const SIX: usize = 1;

/// The Knuth-Yao die: a fair coin simulating a six-sided die.
///
/// States are `[s, d]`. Coin states `s` in `0..7` flip, `s = 7` shows face `d`.
/// Label [`DONE`] holds once a face shows, [`SIX`] if that face is six.
pub struct Dice;

impl Dice {
    pub fn labels() -> Vec<String> {
        vec!["done".to_string(), "six".to_string()]
    }

    fn coin(s: u8) -> Transition {
        Transition::with_probability(vec![s, 0], LabelSet::EMPTY, 0.5)
    }

    fn face(d: u8, probability: f64) -> Transition {
        let labels = LabelSet::EMPTY.with(DONE);
        let labels = if d == 6 { labels.with(SIX) } else { labels };
        Transition::with_probability(vec![7, d], labels, probability)
    }
}

impl AnalysisModel for Dice {
    fn state_vector_size(&self) -> usize {
        2
    }

    fn initial_transitions(&mut self) -> Result<TransitionCollection, ModelFault> {
        Ok(vec![Transition::with_probability(vec![0, 0], LabelSet::EMPTY, 1.0)].into())
    }

    fn successor_transitions(&mut self, state: &[u8]) -> Result<TransitionCollection, ModelFault> {
        let transitions = match (state[0], state[1]) {
            (0, _) => vec![Self::coin(1), Self::coin(2)],
            (1, _) => vec![Self::coin(3), Self::coin(4)],
            (2, _) => vec![Self::coin(5), Self::coin(6)],
            (3, _) => vec![Self::coin(1), Self::face(1, 0.5)],
            (4, _) => vec![Self::face(2, 0.5), Self::face(3, 0.5)],
            (5, _) => vec![Self::face(4, 0.5), Self::face(5, 0.5)],
            (6, _) => vec![Self::coin(2), Self::face(6, 0.5)],
            (7, d) => vec![Self::face(d, 1.0)],
            (s, _) => return Err(ModelFault::new(format!("invalid coin state {}", s))),
        };
        Ok(transitions.into())
    }
}
