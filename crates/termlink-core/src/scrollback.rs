//! Bounded scrollback line stack.
//!
//! Rows that scroll off the top of the engine's visible grid land here and
//! are recalled most-recent-first when the engine reflows after a resize.
//! Rows are stored at the width they had when evicted; recall adjusts to
//! the requested width, padding with a caller-supplied default cell.
//!
//! The stack is generic over the cell type because it stores rows in the
//! *engine's* representation: what was pushed is handed back verbatim.

/// Default capacity, in rows.
pub const DEFAULT_SCROLLBACK_CAPACITY: usize = 10_000;

/// A bounded LIFO stack of stored rows.
///
/// Once full, further pushes are discarded; stored rows are never evicted
/// to make room. Capacity is fixed at construction.
#[derive(Debug)]
pub struct Scrollback<C> {
    lines: Vec<Box<[C]>>,
    capacity: usize,
}

impl<C: Clone> Scrollback<C> {
    /// An empty stack with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SCROLLBACK_CAPACITY)
    }

    /// An empty stack holding at most `capacity` rows.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Vec::new(),
            capacity,
        }
    }

    /// Number of stored rows.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether no rows are stored.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether the stack has reached capacity.
    #[must_use]
    #[inline]
    pub fn is_full(&self) -> bool {
        self.lines.len() >= self.capacity
    }

    /// Maximum number of rows.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store a copy of `row`. Discarded without effect when full.
    pub fn push(&mut self, row: &[C]) {
        if self.lines.len() < self.capacity {
            self.lines.push(row.to_vec().into_boxed_slice());
        }
    }

    /// Recall the most recently pushed row into `out`.
    ///
    /// Copies `min(stored width, out.len())` cells from the stored row;
    /// columns past the stored width are filled with `default`. Returns
    /// `false` and leaves `out` untouched when the stack is empty.
    pub fn pop_into(&mut self, out: &mut [C], default: &C) -> bool {
        let Some(line) = self.lines.pop() else {
            return false;
        };
        let copied = line.len().min(out.len());
        out[..copied].clone_from_slice(&line[..copied]);
        for cell in &mut out[copied..] {
            *cell = default.clone();
        }
        true
    }
}

impl<C: Clone> Default for Scrollback<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_stops_at_capacity() {
        let mut stack: Scrollback<u8> = Scrollback::with_capacity(3);
        for i in 0..5u8 {
            stack.push(&[i]);
        }
        assert_eq!(stack.len(), 3);
        assert!(stack.is_full());

        // LIFO: the rows that survive are the first three pushed.
        let mut out = [0u8];
        assert!(stack.pop_into(&mut out, &9));
        assert_eq!(out, [2]);
    }

    #[test]
    fn pop_adjusts_width() {
        let mut stack: Scrollback<u8> = Scrollback::with_capacity(4);
        stack.push(&[1, 2, 3]);

        // Wider than stored: pad the tail with the default.
        let mut wide = [0u8; 5];
        assert!(stack.pop_into(&mut wide, &7));
        assert_eq!(wide, [1, 2, 3, 7, 7]);

        // Narrower than stored: truncate.
        stack.push(&[4, 5, 6]);
        let mut narrow = [0u8; 2];
        assert!(stack.pop_into(&mut narrow, &7));
        assert_eq!(narrow, [4, 5]);
    }

    #[test]
    fn pop_from_empty_fails() {
        let mut stack: Scrollback<u8> = Scrollback::with_capacity(2);
        let mut out = [42u8; 2];
        assert!(!stack.pop_into(&mut out, &0));
        assert_eq!(out, [42, 42]);
    }

    #[test]
    fn full_capacity_round_trip() {
        // cap+1 pushes yield exactly cap stored rows; cap pops succeed and
        // the cap+1'th fails.
        let mut stack: Scrollback<u8> = Scrollback::new();
        let width = 80usize;
        for i in 0..=DEFAULT_SCROLLBACK_CAPACITY {
            let row = vec![(i % 251) as u8; width];
            stack.push(&row);
        }
        assert_eq!(stack.len(), DEFAULT_SCROLLBACK_CAPACITY);

        let mut out = vec![0u8; width];
        assert!(stack.pop_into(&mut out, &0));
        assert_eq!(stack.len(), DEFAULT_SCROLLBACK_CAPACITY - 1);
        // The most recently *stored* row is the cap'th push; the cap+1'th
        // was dropped.
        let expected = ((DEFAULT_SCROLLBACK_CAPACITY - 1) % 251) as u8;
        assert!(out.iter().all(|&b| b == expected));

        for _ in 1..DEFAULT_SCROLLBACK_CAPACITY {
            assert!(stack.pop_into(&mut out, &0));
        }
        assert!(!stack.pop_into(&mut out, &0));
    }
}
