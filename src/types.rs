//! Type-safe wrappers for state labels.
//!
//! Every transition carries the set of atomic-formula labels that hold in its
//! target state. Labels are identified by their position in the label list of
//! the analysis, so a set of labels is just a small bit set.
use std::fmt;

/// The maximum number of labels a [`LabelSet`] can hold.
pub const MAX_LABELS: usize = 32;

/// A set of atomic-formula labels (0-indexed) holding in a state.
///
/// # Invariants
///
/// - Only label indices `< MAX_LABELS` can be stored
/// - Two label sets are equal iff they contain the same labels
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct LabelSet(u32);

impl LabelSet {
    /// The set without any label.
    pub const EMPTY: LabelSet = LabelSet(0);

    /// Creates a label set from its raw bit representation.
    pub const fn from_bits(bits: u32) -> Self {
        LabelSet(bits)
    }

    /// Creates a label set where label `i` holds iff `holds[i]` is true.
    ///
    /// # Panics
    ///
    /// Panics if more than [`MAX_LABELS`] values are given.
    pub fn from_bools(holds: &[bool]) -> Self {
        assert!(holds.len() <= MAX_LABELS, "Too many labels: {}", holds.len());
        holds
            .iter()
            .enumerate()
            .filter(|(_, &h)| h)
            .fold(LabelSet::EMPTY, |set, (i, _)| set.with(i))
    }

    /// Returns the raw bit representation.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Checks whether label `index` holds.
    pub fn contains(self, index: usize) -> bool {
        assert!(index < MAX_LABELS, "Label index {} out of range", index);
        self.0 & (1 << index) != 0
    }

    /// Returns a copy of this set with label `index` added.
    pub fn with(self, index: usize) -> Self {
        assert!(index < MAX_LABELS, "Label index {} out of range", index);
        LabelSet(self.0 | (1 << index))
    }

    /// Returns a copy of this set with label `index` removed.
    pub fn without(self, index: usize) -> Self {
        assert!(index < MAX_LABELS, "Label index {} out of range", index);
        LabelSet(self.0 & !(1 << index))
    }

    /// Returns the number of labels in the set.
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Checks whether no label holds.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the indices of the labels in the set, in increasing order.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        (0..MAX_LABELS).filter(move |&i| self.0 & (1 << i) != 0)
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (k, i) in self.iter().enumerate() {
            if k > 0 {
                write!(f, ", ")?;
            }
            write!(f, "L{}", i)?;
        }
        write!(f, "}}")
    }
}

impl From<LabelSet> for u32 {
    fn from(set: LabelSet) -> Self {
        set.0
    }
}

impl FromIterator<usize> for LabelSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        iter.into_iter().fold(LabelSet::EMPTY, |set, i| set.with(i))
    }
}
