//! Markov chain to DOT (Graphviz) conversion.
//!
//! This module renders a [`LabeledTransitionMarkovChain`] as a directed graph in DOT format,
//! which can be visualized using Graphviz tools like `dot`, `neato`, or online viewers.
//!
//! # DOT Format
//!
//! The generated DOT output follows these conventions:
//! - **States** are rendered as circles, labeled with their index
//! - **The initial distribution** starts at an artificial point-shaped node `init`
//! - **The stuttering state** (if any) is rendered with its own style
//! - **Edges** are labeled with the probability and, optionally, the label names
//!   of the merged transition
//!
//! # Examples
//!
//! ```no_run
//! # fn render(ltmc: &ltmc_rs::ltmc::LabeledTransitionMarkovChain) {
//! let dot = ltmc.to_dot().unwrap();
//! std::fs::write("chain.dot", dot).unwrap();
//! // Render with: dot -Tpng chain.dot -o chain.png
//! # }
//! ```

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::chain::ChainEntry;
use crate::ltmc::LabeledTransitionMarkovChain;

/// Configuration options for DOT output generation.
///
/// Use `DotConfig::default()` for standard settings.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for state nodes (default: "circle")
    pub node_shape: &'static str,
    /// Shape for the artificial initial node (default: "point")
    pub initial_shape: &'static str,
    /// Style for the stuttering state (default: "dashed")
    pub stuttering_style: &'static str,
    /// Whether to print label names on edges (default: true)
    pub show_labels: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "circle",
            initial_shape: "point",
            stuttering_style: "dashed",
            show_labels: true,
        }
    }
}

impl LabeledTransitionMarkovChain {
    /// Converts the chain to DOT (Graphviz) format.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts the chain to DOT format with custom configuration.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ltmc_rs::dot::DotConfig;
    /// # fn render(ltmc: &ltmc_rs::ltmc::LabeledTransitionMarkovChain) {
    ///
    /// let config = DotConfig {
    ///     show_labels: false,
    ///     ..DotConfig::default()
    /// };
    ///
    /// let dot = ltmc.to_dot_with_config(&config).unwrap();
    /// # }
    /// ```
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;

        writeln!(dot, "{{ rank=source")?;
        writeln!(dot, "init [shape={}, label=\"\"];", config.initial_shape)?;
        writeln!(dot, "}}")?;

        // Every state occurring in the chain, either as source or as target
        let states: BTreeSet<usize> = self
            .chain()
            .elements()
            .map(|entry| entry.target)
            .chain(self.source_states())
            .collect();
        for &state in states.iter() {
            if Some(state) == self.stuttering_state() {
                writeln!(dot, "{} [label=\"stutter\", style={}];", state, config.stuttering_style)?;
            } else {
                writeln!(dot, "{} [label=\"{}\"];", state, state)?;
            }
        }

        for entry in self.initial_distribution() {
            writeln!(dot, "init -> {} [label=\"{}\"];", entry.target, self.edge_label(&entry, config))?;
        }
        for source in self.source_states() {
            for entry in self.transitions(source) {
                writeln!(dot, "{} -> {} [label=\"{}\"];", source, entry.target, self.edge_label(&entry, config))?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }

    fn edge_label(&self, entry: &ChainEntry, config: &DotConfig) -> String {
        if config.show_labels && !entry.labels.is_empty() {
            format!("{} {{{}}}", entry.probability, self.label_names(entry.labels).join(", "))
        } else {
            entry.probability.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::chain::TransitionChain;
    use crate::model::{IndexedTransition, TraversalStatistics};
    use crate::types::LabelSet;

    fn transition(target: usize, labels: u32, probability: f64) -> IndexedTransition {
        IndexedTransition {
            target,
            labels: LabelSet::from_bits(labels),
            probability: Some(probability),
        }
    }

    /// Two states: 0 loops or moves on to the absorbing state 2, labeled `goal`.
    fn example(stuttering: bool) -> LabeledTransitionMarkovChain {
        let chain = TransitionChain::new(3, 16);
        chain.add_state_info(0, true, &[transition(0, 0, 1.0)]).unwrap();
        chain
            .add_state_info(0, false, &[transition(0, 0, 0.25), transition(2, 0b1, 0.75)])
            .unwrap();
        let stuttering_state = if stuttering {
            chain.create_stuttering_state(2).unwrap();
            Some(2)
        } else {
            chain.add_state_info(2, false, &[transition(2, 0b1, 1.0)]).unwrap();
            None
        };
        LabeledTransitionMarkovChain::new(
            vec!["goal".to_string()],
            Arc::new(chain),
            TraversalStatistics::default(),
            stuttering_state,
        )
    }

    /// Basic test: verify DOT output is generated without errors
    #[test]
    fn test_to_dot_basic() {
        let dot = example(false).to_dot().unwrap();

        assert!(dot.starts_with("digraph {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("init -> 0 [label=\"1\"];"));
        assert!(dot.contains("0 -> 2 [label=\"0.75 {goal}\"];"));
        assert!(dot.contains("2 -> 2 [label=\"1 {goal}\"];"));
    }

    #[test]
    fn test_to_dot_stuttering_state() {
        let dot = example(true).to_dot().unwrap();
        assert!(dot.contains("2 [label=\"stutter\", style=dashed];"));
        assert!(dot.contains("2 -> 2 [label=\"1\"];"));
    }

    /// Test with custom configuration
    #[test]
    fn test_to_dot_with_config() {
        let config = DotConfig {
            show_labels: false,
            ..DotConfig::default()
        };

        let dot = example(false).to_dot_with_config(&config).unwrap();
        assert!(dot.starts_with("digraph {"));
        assert!(!dot.contains("goal"));
        assert!(dot.contains("0 -> 2 [label=\"0.75\"];"));
    }

    /// Helper test to write DOT file for manual inspection (disabled by default)
    #[test]
    #[ignore]
    fn test_write_dot_file() {
        let dot = example(true).to_dot().unwrap();

        std::fs::write("test_output.dot", &dot).unwrap();
        println!("DOT output:\n{}", dot);

        for format in ["png", "svg"] {
            let output = std::process::Command::new("dot")
                .arg(format!("-T{}", format))
                .arg("test_output.dot")
                .arg("-o")
                .arg(format!("test_output.{}", format))
                .output();

            if let Ok(output) = output {
                if output.status.success() {
                    println!("Generated test_output.{}", format);
                }
            }
        }
    }
}
