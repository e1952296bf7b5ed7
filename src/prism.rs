//! Export of labeled transition Markov chains to the PRISM language.
//!
//! The chain becomes a single `dtmc` module with one global `currentState`
//! variable. The artificial state `-1` is the initial state; its command
//! draws from the initial distribution. Each label becomes a boolean global,
//! set on every transition to whether the transition carries the label.
//! Commands are indented by a tab and a space.
//!
//! ```text
//! dtmc
//!
//! global currentState : [-1..2] init -1;
//! global done : bool init false;
//!
//! module systemModule
//! 	 [] currentState=-1 -> 0.5:(currentState'=0) & (done' = false) + 0.5:(currentState'=1) & (done' = false);
//! 	 ...
//! endmodule
//! ```

use std::io::{self, Write};

use crate::chain::{ChainEntry, ChainIter};
use crate::ltmc::LabeledTransitionMarkovChain;

/// Index of the artificial initial state.
const INITIAL_STATE: isize = -1;

impl LabeledTransitionMarkovChain {
    /// Writes the chain as a PRISM `dtmc` model.
    pub fn export_to_prism<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let max_state = self.max_state_index().map_or(0, |index| index as isize);

        writeln!(writer, "dtmc")?;
        writeln!(writer)?;
        writeln!(writer, "global currentState : [{}..{}] init {};", INITIAL_STATE, max_state, INITIAL_STATE)?;
        for label in self.labels() {
            writeln!(writer, "global {} : bool init false;", label)?;
        }
        writeln!(writer)?;
        writeln!(writer, "module systemModule")?;

        self.write_command(writer, INITIAL_STATE, self.initial_distribution())?;
        for source in self.source_states() {
            self.write_command(writer, source as isize, self.transitions(source))?;
        }

        writeln!(writer, "endmodule")?;
        Ok(())
    }

    /// Writes the prism model into a string.
    pub fn to_prism(&self) -> io::Result<String> {
        let mut buffer = Vec::new();
        self.export_to_prism(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn write_command<W: Write>(&self, writer: &mut W, source: isize, transitions: ChainIter<'_>) -> io::Result<()> {
        let mut first = true;
        for entry in transitions.filter(|e| e.probability > 0.0) {
            if first {
                write!(writer, "\t [] currentState={} -> ", source)?;
                first = false;
            } else {
                write!(writer, " + ")?;
            }
            self.write_update(writer, &entry)?;
        }
        if !first {
            writeln!(writer, ";")?;
        }
        Ok(())
    }

    fn write_update<W: Write>(&self, writer: &mut W, entry: &ChainEntry) -> io::Result<()> {
        write!(writer, "{}:(currentState'={})", entry.probability, entry.target)?;
        for (i, label) in self.labels().iter().enumerate() {
            write!(writer, " & ({}' = {})", label, entry.labels.contains(i))?;
        }
        Ok(())
    }
}
