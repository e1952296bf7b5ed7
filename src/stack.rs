//! Per-worker depth first search stack.
//!
//! The stack stores state indices in one flat array, partitioned into frames.
//! A frame holds the unexplored successors of one expanded state and is
//! described by an `offset` into the array and a `count`:
//!
//! ```text
//! states: [ 5 6 | 9 ... ]
//! frames: [ (0, 2), (2, 1) ]
//! ```
//!
//! The topmost state of every frame lies on the current depth first path, so
//! the path is recovered by reading the last state of each frame, which makes
//! the stack the source of counterexamples.
//!
//! # Invariants
//!
//! - `frames[i].offset == frames[i - 1].offset + frames[i - 1].count` at the time frame `i` is pushed
//! - Only the topmost frame grows
//! - Neither the number of frames nor the number of states exceeds the capacity

use crate::error::{Resource, TraversalError, TraversalResult};

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
struct Frame {
    offset: usize,
    count: usize,
}

/// A fixed-capacity stack of frames of state indices.
#[derive(Debug)]
pub struct DfsStack {
    frames: Vec<Frame>,
    states: Vec<usize>,
    capacity: usize,
}

impl DfsStack {
    /// Creates a stack holding at most `capacity` frames and `capacity` states.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Stack capacity must be positive");
        Self {
            frames: Vec::with_capacity(capacity),
            states: vec![0; capacity],
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the number of frames currently on the stack.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Opens a new frame directly after the states of the previous one.
    pub fn push_frame(&mut self) -> TraversalResult<()> {
        if self.frames.len() >= self.capacity {
            return Err(TraversalError::OutOfMemory {
                resource: Resource::DfsFrame,
                capacity: self.capacity,
            });
        }
        let offset = self.frames.last().map_or(0, |f| f.offset + f.count);
        self.frames.push(Frame { offset, count: 0 });
        Ok(())
    }

    /// Appends a state to the topmost frame.
    ///
    /// # Panics
    ///
    /// Panics if there is no frame.
    pub fn push_state(&mut self, state: usize) -> TraversalResult<()> {
        let capacity = self.capacity;
        let Some(frame) = self.frames.last_mut() else {
            panic!("No frame to push the state into");
        };
        let offset = frame.offset + frame.count;
        if offset >= capacity {
            return Err(TraversalError::OutOfMemory {
                resource: Resource::DfsState,
                capacity,
            });
        }
        self.states[offset] = state;
        frame.count += 1;
        Ok(())
    }

    /// Returns the topmost state of the topmost non-empty frame.
    ///
    /// Exhausted frames are dropped on the way down. Dropping a frame also
    /// removes the state of the previous frame that led to it, since that
    /// state is fully explored. The returned state itself stays on the stack
    /// until its own frame is exhausted, so it remains part of the path.
    pub fn try_get_state(&mut self) -> Option<usize> {
        while let Some(frame) = self.frames.last() {
            if frame.count > 0 {
                return Some(self.states[frame.offset + frame.count - 1]);
            }
            self.frames.pop();
            if let Some(previous) = self.frames.last_mut() {
                previous.count -= 1;
            }
        }
        None
    }

    /// The current depth first path: the topmost state of every frame, oldest first.
    pub fn get_path(&self) -> Vec<usize> {
        self.frames
            .iter()
            .filter(|f| f.count > 0)
            .map(|f| self.states[f.offset + f.count - 1])
            .collect()
    }

    /// Whether some frame holds more than one state.
    pub fn can_split(&self) -> bool {
        self.frames.iter().any(|f| f.count > 1)
    }

    /// Moves part of the work of this stack to the empty stack `other`.
    ///
    /// Frames are mirrored from the bottom up. Frames with a single state are
    /// copied. The first frame with more than one state is split: its lower
    /// half goes to `other` and the split stops there. A frame without states
    /// aborts the whole split, leaving `other` empty.
    ///
    /// Returns whether `other` received any work.
    pub fn split_work(&mut self, other: &mut DfsStack) -> bool {
        assert!(other.is_empty(), "Expected an empty stack");

        for i in 0..self.frames.len() {
            if other.push_frame().is_err() {
                other.clear();
                return false;
            }

            let Frame { offset, count } = self.frames[i];
            match count {
                0 => {
                    other.clear();
                    return false;
                }
                1 => {
                    if other.push_state(self.states[offset]).is_err() {
                        other.clear();
                        return false;
                    }
                }
                _ => {
                    let other_count = count / 2;
                    for &state in &self.states[offset..offset + other_count] {
                        if other.push_state(state).is_err() {
                            other.clear();
                            return false;
                        }
                    }
                    self.frames[i] = Frame {
                        offset: offset + other_count,
                        count: count - other_count,
                    };
                    return true;
                }
            }
        }

        other.clear();
        false
    }

    #[cfg(test)]
    fn frame_sizes(&self) -> Vec<usize> {
        self.frames.iter().map(|f| f.count).collect()
    }
}
