use std::io::Write as _;
use std::time::Instant;

use clap::Parser;

use ltmc_rs::capacity::{ByteSize, ModelCapacity, ModelDensity};
use ltmc_rs::config::AnalysisConfiguration;
use ltmc_rs::error::ModelFault;
use ltmc_rs::ltmc::LtmcGenerator;
use ltmc_rs::model::{AnalysisModel, Transition, TransitionCollection};
use ltmc_rs::types::LabelSet;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of dice rolled one after another.
    #[arg(value_name = "INT", default_value = "3")]
    dice: u8,

    /// Number of worker threads.
    #[clap(long, value_name = "INT", default_value = "4")]
    threads: usize,

    /// Memory budget for states and transitions (in MiB).
    #[clap(long, value_name = "INT", default_value = "64")]
    memory: u64,

    /// Redirect transitions into finished states to the stuttering state.
    #[clap(long)]
    prune: bool,

    /// Write the chain in PRISM format to this file.
    #[clap(long, value_name = "FILE")]
    prism: Option<String>,

    /// Write the chain in DOT format to this file.
    #[clap(long, value_name = "FILE")]
    dot: Option<String>,
}

const DONE: usize = 0;
const MAX: usize = 1;

/// Rolls Knuth-Yao dice with a fair coin, summing up the faces.
///
/// The state is `[rolled, coin, total]`, where `coin == 0` starts a new die.
struct Dice {
    count: u8,
}

impl Dice {
    fn labels(&self, rolled: u8, total: u8) -> LabelSet {
        let mut labels = LabelSet::EMPTY;
        if rolled == self.count {
            labels = labels.with(DONE);
        }
        if total == 6 * self.count {
            labels = labels.with(MAX);
        }
        labels
    }

    fn flip(&self, rolled: u8, coin: u8, total: u8) -> Transition {
        Transition::with_probability(vec![rolled, coin, total], self.labels(rolled, total), 0.5)
    }

    fn face(&self, rolled: u8, total: u8, face: u8) -> Transition {
        let (rolled, total) = (rolled + 1, total + face);
        Transition::with_probability(vec![rolled, 0, total], self.labels(rolled, total), 0.5)
    }
}

impl AnalysisModel for Dice {
    fn state_vector_size(&self) -> usize {
        3
    }

    fn initial_transitions(&mut self) -> Result<TransitionCollection, ModelFault> {
        Ok(vec![Transition::with_probability(vec![0, 0, 0], self.labels(0, 0), 1.0)].into())
    }

    fn successor_transitions(&mut self, state: &[u8]) -> Result<TransitionCollection, ModelFault> {
        let (rolled, coin, total) = (state[0], state[1], state[2]);
        if rolled == self.count {
            return Ok(vec![Transition::with_probability(state.to_vec(), self.labels(rolled, total), 1.0)].into());
        }
        let transitions = match coin {
            0 => vec![self.flip(rolled, 1, total), self.flip(rolled, 2, total)],
            1 => vec![self.flip(rolled, 3, total), self.flip(rolled, 4, total)],
            2 => vec![self.flip(rolled, 5, total), self.flip(rolled, 6, total)],
            3 => vec![self.flip(rolled, 1, total), self.face(rolled, total, 1)],
            4 => vec![self.face(rolled, total, 2), self.face(rolled, total, 3)],
            5 => vec![self.face(rolled, total, 4), self.face(rolled, total, 5)],
            6 => vec![self.flip(rolled, 2, total), self.face(rolled, total, 6)],
            _ => return Err(ModelFault::new(format!("invalid coin state {}", coin))),
        };
        Ok(transitions.into())
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
    if args.dice == 0 || args.dice > 42 {
        color_eyre::eyre::bail!("Number of dice must be in 1..=42, got {}", args.dice);
    }

    let config = AnalysisConfiguration::default()
        .with_cpu_count(args.threads)
        .with_static_pruning(args.prune)
        .with_model_capacity(ModelCapacity::ByMemorySize {
            memory_limit: ByteSize::mib(args.memory),
            density: ModelDensity::Sparse,
        });

    let count = args.dice;
    let labels = vec!["done".to_string(), "max".to_string()];
    let mut generator =
        LtmcGenerator::new(move || Dice { count }, config, labels)?.with_terminate_early(|l| l.contains(DONE));
    println!("capacity = {}", generator.traverser().model_byte_size());

    let ltmc = generator.generate()?;
    println!("{}", ltmc.statistics());
    println!("stuttering state = {:?}", ltmc.stuttering_state());

    if let Some(path) = &args.prism {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        ltmc.export_to_prism(&mut file)?;
        file.flush()?;
        println!("Wrote PRISM model to '{}'", path);
    }
    if let Some(path) = &args.dot {
        std::fs::write(path, ltmc.to_dot()?)?;
        println!("Wrote DOT graph to '{}'", path);
    }

    let time_total = time_total.elapsed();
    println!("\nAll done in {:.3} s", time_total.as_secs_f64());
    Ok(())
}
