use std::time::Instant;

use clap::Parser;

use ltmc_rs::config::AnalysisConfiguration;
use ltmc_rs::error::ModelFault;
use ltmc_rs::invariant::InvariantChecker;
use ltmc_rs::model::{AnalysisModel, Transition, TransitionCollection};
use ltmc_rs::types::LabelSet;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of worker threads.
    #[clap(long, value_name = "INT", default_value = "4")]
    threads: usize,

    /// Let processes enter the critical section without waiting for their turn.
    #[clap(long)]
    broken: bool,

    /// Stop at the first violation.
    #[clap(long)]
    early: bool,
}

const IDLE: u8 = 0;
const FLAGGED: u8 = 1;
const WAITING: u8 = 2;
const CRITICAL: u8 = 3;

/// Peterson's mutual exclusion protocol for two processes.
///
/// The state is `[pc0, pc1, flag0, flag1, turn]`. Label 0 holds iff at most
/// one process is in its critical section.
struct Peterson {
    broken: bool,
}

impl Peterson {
    fn step(&self, state: &[u8], i: usize) -> [u8; 5] {
        let other = 1 - i;
        let mut next = [state[0], state[1], state[2], state[3], state[4]];
        match state[i] {
            IDLE => {
                next[2 + i] = 1;
                next[i] = FLAGGED;
            }
            FLAGGED => {
                next[4] = other as u8;
                next[i] = WAITING;
            }
            WAITING => {
                if self.broken || state[2 + other] == 0 || state[4] == i as u8 {
                    next[i] = CRITICAL;
                }
            }
            _ => {
                next[2 + i] = 0;
                next[i] = IDLE;
            }
        }
        next
    }

    fn transition(state: [u8; 5]) -> Transition {
        let mutex = !(state[0] == CRITICAL && state[1] == CRITICAL);
        let labels = if mutex { LabelSet::EMPTY.with(0) } else { LabelSet::EMPTY };
        Transition::new(state.to_vec(), labels)
    }
}

impl AnalysisModel for Peterson {
    fn state_vector_size(&self) -> usize {
        5
    }

    fn initial_transitions(&mut self) -> Result<TransitionCollection, ModelFault> {
        Ok(vec![Self::transition([IDLE, IDLE, 0, 0, 0])].into())
    }

    fn successor_transitions(&mut self, state: &[u8]) -> Result<TransitionCollection, ModelFault> {
        Ok((0..2)
            .map(|i| Self::transition(self.step(state, i)))
            .collect::<Vec<_>>()
            .into())
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let config = AnalysisConfiguration::default()
        .with_cpu_count(args.threads)
        .with_early_termination(args.early);

    let broken = args.broken;
    let mut checker = InvariantChecker::new(move || Peterson { broken }, config, 0)?;
    let result = checker.check()?;

    println!("{}", result.statistics);
    if result.formula_holds {
        println!("Mutual exclusion holds.");
    } else {
        println!("Mutual exclusion is violated.");
    }
    if let Some(counter_example) = &result.counter_example {
        println!("Counterexample:\n{}", counter_example);
    }

    let time_total = time_total.elapsed();
    println!("\nAll done in {:.3} s", time_total.as_secs_f64());
    Ok(())
}
