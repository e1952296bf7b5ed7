use std::collections::BTreeMap;

use proptest::prelude::*;

use ltmc_rs::chain::TransitionChain;
use ltmc_rs::model::IndexedTransition;
use ltmc_rs::types::LabelSet;
use ltmc_rs::utils::{is_one, sum_probabilities};

fn transition_strategy() -> impl Strategy<Value = (usize, u32, f64)> {
    (0usize..6, 0u32..4, 0.01f64..1.0)
}

fn indexed(transitions: &[(usize, u32, f64)]) -> Vec<IndexedTransition> {
    transitions
        .iter()
        .map(|&(target, labels, probability)| IndexedTransition {
            target,
            labels: LabelSet::from_bits(labels),
            probability: Some(probability),
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Each (target, labels) pair appears once per source, carrying the sum of its inputs.
    #[test]
    fn merged_entries_are_unique_and_summed(
        transitions in prop::collection::vec(transition_strategy(), 1..40),
    ) {
        let chain = TransitionChain::new(4, 64);
        chain.add_state_info(2, false, &indexed(&transitions)).unwrap();

        let mut expected: BTreeMap<(usize, u32), f64> = BTreeMap::new();
        for &(target, labels, probability) in &transitions {
            *expected.entry((target, labels)).or_default() += probability;
        }

        let entries: Vec<_> = chain.transitions(2).collect();
        prop_assert_eq!(entries.len(), expected.len());
        for entry in &entries {
            let sum = expected[&(entry.target, entry.labels.bits())];
            prop_assert!((entry.probability - sum).abs() < 1e-9, "{} != {}", entry.probability, sum);
        }
        prop_assert_eq!(chain.transitions(1).count(), 0);
    }

    /// Normalized distributions stay closed under merging.
    #[test]
    fn normalized_distributions_sum_to_one(
        transitions in prop::collection::vec(transition_strategy(), 1..40),
    ) {
        let total: f64 = transitions.iter().map(|t| t.2).sum();
        let normalized: Vec<_> = transitions.iter().map(|&(t, l, p)| (t, l, p / total)).collect();

        let chain = TransitionChain::new(1, 64);
        chain.add_state_info(0, true, &indexed(&normalized)).unwrap();
        chain.add_state_info(0, false, &indexed(&normalized)).unwrap();

        let sum = sum_probabilities(chain.initial_distribution().map(|e| e.probability));
        prop_assert!(is_one(sum, 1e-9), "initial distribution sums to {}", sum);
        prop_assert!(chain.validate_states().is_ok());
        prop_assert!(chain.validate_initial_distribution().is_ok());
    }
}
