//! Fixed-Size Circular Buffer for Altitude History
//!
//! ## Overview
//!
//! A ring buffer with a compile-time capacity. When full, a push overwrites the
//! oldest element, so the buffer always holds the most recent `N` samples in
//! chronological order. No heap allocation happens at any point.
//!
//! The event detector keeps its altitude window in one of these
//! ([`AltitudeHistory`]), and the trend and variance checks read the newest
//! samples through [`CircularBuffer::recent`].
//!
//! ```text
//! CircularBuffer<f32, 5> after pushing 1..=7:
//! ┌─────┬─────┬─────┬─────┬─────┐
//! │  6  │  7  │  3  │  4  │  5  │  ← physical slots
//! └─────┴─────┴─────┴─────┴─────┘
//!          ↑     ↑
//!          │     └── oldest (write_pos = 2)
//!          └──────── newest
//!
//! Logical view (iter): [3, 4, 5, 6, 7]
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use cansat_core::buffer::CircularBuffer;
//!
//! let mut history: CircularBuffer<f32, 10> = CircularBuffer::new();
//! history.push(120.0);
//! history.push(121.5);
//!
//! assert_eq!(history.last(), Some(&121.5));
//! assert_eq!(history.recent(1).next(), Some(&121.5));
//! ```

use crate::constants::flight::ALTITUDE_HISTORY_LEN;

/// Rolling altitude window owned by the event detector
pub type AltitudeHistory = CircularBuffer<f32, ALTITUDE_HISTORY_LEN>;

/// Fixed-size circular buffer
///
/// ## Internal Invariants
///
/// - `write_pos < N`
/// - `len <= N`
/// - Iteration yields items oldest to newest
#[derive(Clone, Debug)]
pub struct CircularBuffer<T: Copy, const N: usize> {
    /// Storage, `None` for slots never written
    data: [Option<T>; N],

    /// Index where the next write will occur
    write_pos: usize,

    /// Current number of valid items
    len: usize,
}

impl<T: Copy, const N: usize> CircularBuffer<T, N> {
    /// Creates an empty buffer
    ///
    /// This is a const function so histories can live in statics.
    pub const fn new() -> Self {
        Self {
            data: [None; N],
            write_pos: 0,
            len: 0,
        }
    }

    /// Adds an item, overwriting the oldest one when full
    pub fn push(&mut self, item: T) {
        self.data[self.write_pos] = Some(item);
        self.write_pos = (self.write_pos + 1) % N;

        if self.len < N {
            self.len += 1;
        }
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Buffer capacity
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Most recent item
    pub fn last(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }

        let idx = if self.write_pos == 0 { N - 1 } else { self.write_pos - 1 };
        self.data[idx].as_ref()
    }

    /// Iterate over items from oldest to newest
    pub fn iter(&self) -> CircularBufferIter<'_, T, N> {
        CircularBufferIter {
            buffer: self,
            index: 0,
            end: self.len,
        }
    }

    /// Iterate over the newest `count` items, oldest of them first
    ///
    /// Yields fewer items when the buffer holds less than `count`.
    pub fn recent(&self, count: usize) -> CircularBufferIter<'_, T, N> {
        let start = self.len.saturating_sub(count);
        CircularBufferIter {
            buffer: self,
            index: start,
            end: self.len,
        }
    }

    /// Clear all items
    pub fn clear(&mut self) {
        self.data = [None; N];
        self.write_pos = 0;
        self.len = 0;
    }

    /// Gets an item by logical index (0 = oldest, len-1 = newest)
    ///
    /// ```text
    /// Physical array:  [D, E, A, B, C]  (write_pos = 2)
    /// Logical view:    [A, B, C, D, E]
    /// logical[i] = physical[(write_pos + i) % N]
    /// ```
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }

        let actual_index = if self.len < N {
            index
        } else {
            (self.write_pos + index) % N
        };

        self.data[actual_index].as_ref()
    }
}

/// Iterator over circular buffer contents
pub struct CircularBufferIter<'a, T: Copy, const N: usize> {
    buffer: &'a CircularBuffer<T, N>,
    index: usize,
    end: usize,
}

impl<'a, T: Copy, const N: usize> Iterator for CircularBufferIter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.end {
            return None;
        }

        let item = self.buffer.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<'a, T: Copy, const N: usize> ExactSizeIterator for CircularBufferIter<'a, T, N> {}

impl<T: Copy, const N: usize> Default for CircularBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
