//! A fixed-capacity window of per-second tallies with running totals.
//!
//! `Window` slices the observed timeline into one-second cells: every closed
//! second contributes exactly one [`Cell`] holding that second's event count
//! and accumulated statistic. The window keeps the most recent `capacity`
//! cells and maintains running totals over them, so closing a second is O(1):
//! - `roll()` pushes the newest cell and, once full, evicts the oldest
//! - both totals are adjusted by `incoming - evicted`, never by re-summing
//! - `count()` / `statistic()` read the totals without touching the cells
//!
//! ## Example
//! ```rust,ignore
//! let mut window = Window::with_capacity(60);
//! window.roll(Cell { count: 3, statistic: 1024.0 });
//! let per_minute = window.count(); // total over the resident cells
//! ```

use std::collections::VecDeque;

/// The finalized tally of exactly one elapsed second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Cell {
    pub count: u64,
    pub statistic: f64,
}

#[derive(Clone)]
pub(crate) struct Window {
    cells: VecDeque<Cell>,
    capacity: usize,
    count: u64,
    statistic: f64,
}

impl Window {
    pub fn with_capacity(capacity: usize) -> Self {
        Window {
            cells: VecDeque::with_capacity(capacity),
            capacity,
            count: 0,
            statistic: 0.0,
        }
    }

    /// Closes one second: pushes `cell` at the head, evicting the oldest
    /// cell once the window is full, and updates both running totals.
    pub fn roll(&mut self, cell: Cell) {
        let evicted = if self.cells.len() == self.capacity {
            self.cells.pop_front().unwrap_or_default()
        } else {
            Cell::default()
        };
        self.cells.push_back(cell);
        self.count = self.count + cell.count - evicted.count;
        self.statistic += cell.statistic - evicted.statistic;
    }

    /// Number of seconds currently resident, `0..=capacity`.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.cells.len() == self.capacity
    }

    /// Total event count over the resident cells.
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Total statistic over the resident cells.
    #[inline]
    pub fn statistic(&self) -> f64 {
        self.statistic
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.count = 0;
        self.statistic = 0.0;
    }
}
