//! The terminal surface: a cell grid plus per-row damage intervals.
//!
//! Damage is tracked as one half-open column interval per row. Merging two
//! damage events on the same row takes the bounding union (minimum of the
//! begins, maximum of the ends) rather than a precise interval set; the
//! merge stays O(1) and the renderer repaints at most a few extra cells.

use std::ops::Range;

use crate::cell::Cell;

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    /// Visible rows.
    pub rows: u16,
    /// Visible columns.
    pub cols: u16,
}

impl TermSize {
    /// Create a new size.
    #[must_use]
    #[inline]
    pub const fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }

    /// Clamp both dimensions to at least one cell.
    #[must_use]
    #[inline]
    pub fn clamped(self) -> Self {
        Self {
            rows: self.rows.max(1),
            cols: self.cols.max(1),
        }
    }
}

/// A cell position (row, column), 0-indexed from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    /// Row index.
    pub row: u16,
    /// Column index.
    pub col: u16,
}

impl Pos {
    /// Create a new position.
    #[must_use]
    #[inline]
    pub const fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }
}

/// A rectangle of cells, half-open in both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// First row inside the rectangle.
    pub start_row: u16,
    /// First row past the rectangle.
    pub end_row: u16,
    /// First column inside the rectangle.
    pub start_col: u16,
    /// First column past the rectangle.
    pub end_col: u16,
}

impl Rect {
    /// Create a rectangle from half-open row and column ranges.
    #[must_use]
    #[inline]
    pub const fn new(start_row: u16, end_row: u16, start_col: u16, end_col: u16) -> Self {
        Self {
            start_row,
            end_row,
            start_col,
            end_col,
        }
    }

    /// The rectangle covering an entire surface of `size`.
    #[must_use]
    #[inline]
    pub const fn full(size: TermSize) -> Self {
        Self::new(0, size.rows, 0, size.cols)
    }

    /// Intersection with `other`; the result may be empty.
    #[must_use]
    pub fn intersect(self, other: Rect) -> Rect {
        Rect {
            start_row: self.start_row.max(other.start_row),
            end_row: self.end_row.min(other.end_row),
            start_col: self.start_col.max(other.start_col),
            end_col: self.end_col.min(other.end_col),
        }
    }

    /// Whether the rectangle contains no cells.
    #[must_use]
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.start_row >= self.end_row || self.start_col >= self.end_col
    }
}

/// Damage interval for one row: the half-open column range mutated since
/// the last drain. `begin >= end` means the row is clean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowDamage {
    begin: u16,
    end: u16,
}

impl RowDamage {
    /// No damage.
    pub const CLEAN: RowDamage = RowDamage { begin: 0, end: 0 };

    /// Whether the interval is empty.
    #[must_use]
    #[inline]
    pub const fn is_clean(self) -> bool {
        self.begin >= self.end
    }

    /// The damaged column range.
    #[must_use]
    #[inline]
    pub const fn range(self) -> Range<u16> {
        self.begin..self.end
    }

    /// Merge `[begin, end)` into the interval, taking the bounding union.
    fn merge(&mut self, begin: u16, end: u16) {
        if self.is_clean() {
            self.begin = begin;
            self.end = end;
        } else {
            self.begin = self.begin.min(begin);
            self.end = self.end.max(end);
        }
    }
}

/// One row's worth of drained damage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamagedRow {
    /// Row index.
    pub row: u16,
    /// Damaged column range.
    pub cols: Range<u16>,
}

/// Convert a usize row index to u16. Row counts are bounded by `u16`, so
/// the saturation only covers arithmetic on already-invalid input.
#[inline]
fn row_u16(idx: usize) -> u16 {
    idx.try_into().unwrap_or(u16::MAX)
}

/// The rendered terminal content.
///
/// Cells are stored row-major. A freshly constructed surface is blank and
/// clean; the first engine damage callback paints it.
#[derive(Debug)]
pub struct Surface {
    size: TermSize,
    cells: Vec<Cell>,
    damage: Vec<RowDamage>,
}

impl Surface {
    /// Create a blank surface of `size` with no damage recorded.
    #[must_use]
    pub fn new(size: TermSize) -> Self {
        let area = usize::from(size.rows) * usize::from(size.cols);
        Self {
            size,
            cells: vec![Cell::blank(); area],
            damage: vec![RowDamage::CLEAN; usize::from(size.rows)],
        }
    }

    /// Current size.
    #[must_use]
    #[inline]
    pub fn size(&self) -> TermSize {
        self.size
    }

    /// Reallocate to `size`, blanking the grid and marking every row fully
    /// damaged. Resizing to the current size is a no-op and records no
    /// damage.
    pub fn resize(&mut self, size: TermSize) {
        if size == self.size {
            return;
        }
        let area = usize::from(size.rows) * usize::from(size.cols);
        self.size = size;
        self.cells = vec![Cell::blank(); area];
        self.damage = vec![
            RowDamage {
                begin: 0,
                end: size.cols,
            };
            usize::from(size.rows)
        ];
    }

    #[inline]
    fn index(&self, row: u16, col: u16) -> usize {
        usize::from(row) * usize::from(self.size.cols) + usize::from(col)
    }

    /// The cell at (`row`, `col`), or `None` when out of range.
    #[must_use]
    pub fn cell(&self, row: u16, col: u16) -> Option<&Cell> {
        if row < self.size.rows && col < self.size.cols {
            let idx = self.index(row, col);
            self.cells.get(idx)
        } else {
            None
        }
    }

    /// Overwrite the cell at (`row`, `col`); out-of-range writes are
    /// dropped. Callers record damage separately via [`Surface::mark_damage`].
    pub fn set_cell(&mut self, row: u16, col: u16, cell: Cell) {
        if row < self.size.rows && col < self.size.cols {
            let idx = self.index(row, col);
            self.cells[idx] = cell;
        }
    }

    /// Merge `[begin, end)` into `row`'s damage interval, clamped to the
    /// surface width.
    pub fn mark_damage(&mut self, row: u16, begin: u16, end: u16) {
        if row >= self.size.rows {
            return;
        }
        let end = end.min(self.size.cols);
        let begin = begin.min(end);
        if begin >= end {
            return;
        }
        self.damage[usize::from(row)].merge(begin, end);
    }

    /// The damage interval currently recorded for `row`.
    #[must_use]
    pub fn row_damage(&self, row: u16) -> RowDamage {
        self.damage
            .get(usize::from(row))
            .copied()
            .unwrap_or(RowDamage::CLEAN)
    }

    /// Return all damaged rows and clear every interval.
    pub fn take_damage(&mut self) -> Vec<DamagedRow> {
        let mut rows = Vec::new();
        for (row, damage) in self.damage.iter_mut().enumerate() {
            if !damage.is_clean() {
                rows.push(DamagedRow {
                    row: row_u16(row),
                    cols: damage.range(),
                });
                *damage = RowDamage::CLEAN;
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_surface_is_clean() {
        let mut surface = Surface::new(TermSize::new(4, 10));
        assert!(surface.take_damage().is_empty());
        assert!(surface.cell(0, 0).unwrap().is_blank());
    }

    #[test]
    fn resize_marks_full_damage() {
        let mut surface = Surface::new(TermSize::new(4, 10));
        surface.resize(TermSize::new(6, 12));
        let rows = surface.take_damage();
        assert_eq!(rows.len(), 6);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(usize::from(row.row), i);
            assert_eq!(row.cols, 0..12);
        }
    }

    #[test]
    fn resize_to_same_size_records_no_damage() {
        let mut surface = Surface::new(TermSize::new(4, 10));
        surface.resize(TermSize::new(6, 12));
        surface.take_damage();

        // The boundary case: an equal-size resize must not dirty anything.
        surface.resize(TermSize::new(6, 12));
        assert!(surface.take_damage().is_empty());
    }

    #[test]
    fn damage_merge_takes_bounding_union() {
        let mut surface = Surface::new(TermSize::new(2, 80));
        surface.mark_damage(0, 10, 20);
        surface.mark_damage(0, 40, 50);
        surface.mark_damage(0, 15, 18);
        let rows = surface.take_damage();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row, 0);
        assert_eq!(rows[0].cols, 10..50);
    }

    #[test]
    fn damage_is_clamped_to_width() {
        let mut surface = Surface::new(TermSize::new(1, 20));
        surface.mark_damage(0, 5, 500);
        let rows = surface.take_damage();
        assert_eq!(rows[0].cols, 5..20);
    }

    #[test]
    fn empty_interval_is_ignored() {
        let mut surface = Surface::new(TermSize::new(1, 20));
        surface.mark_damage(0, 7, 7);
        surface.mark_damage(0, 9, 3);
        assert!(surface.take_damage().is_empty());
    }

    #[test]
    fn out_of_range_row_is_ignored() {
        let mut surface = Surface::new(TermSize::new(2, 20));
        surface.mark_damage(5, 0, 10);
        assert!(surface.take_damage().is_empty());
    }

    #[test]
    fn take_damage_clears() {
        let mut surface = Surface::new(TermSize::new(2, 20));
        surface.mark_damage(1, 2, 4);
        assert_eq!(surface.take_damage().len(), 1);
        assert!(surface.take_damage().is_empty());
    }

    #[test]
    fn set_and_get_cell() {
        let mut surface = Surface::new(TermSize::new(2, 4));
        let cell = Cell::new(
            'q',
            crate::StyleFlags::ITALIC,
            crate::Color::Rgb(1, 2, 3),
            crate::Color::Default,
        );
        surface.set_cell(1, 3, cell.clone());
        assert_eq!(surface.cell(1, 3), Some(&cell));
        assert_eq!(surface.cell(2, 0), None);
        // Out-of-range writes are dropped.
        surface.set_cell(9, 9, cell);
    }

    #[test]
    fn rect_intersection() {
        let a = Rect::new(0, 10, 0, 10);
        let b = Rect::new(5, 20, 8, 9);
        assert_eq!(a.intersect(b), Rect::new(5, 10, 8, 9));
        assert!(Rect::new(3, 3, 0, 5).is_empty());
    }

    proptest! {
        // The bounding-union law: for any sequence of merges on one row,
        // the drained interval is exactly (min of begins, max of ends),
        // independent of submission order.
        #[test]
        fn bounding_union_law(spans in proptest::collection::vec((0u16..80, 0u16..80), 1..32)) {
            let mut surface = Surface::new(TermSize::new(1, 80));
            let mut expected: Option<(u16, u16)> = None;
            for &(a, b) in &spans {
                let (begin, end) = (a.min(b), a.max(b));
                surface.mark_damage(0, begin, end);
                if begin < end {
                    expected = Some(match expected {
                        None => (begin, end),
                        Some((lo, hi)) => (lo.min(begin), hi.max(end)),
                    });
                }
            }
            let rows = surface.take_damage();
            match expected {
                None => prop_assert!(rows.is_empty()),
                Some((lo, hi)) => {
                    prop_assert_eq!(rows.len(), 1);
                    prop_assert_eq!(rows[0].cols.clone(), lo..hi);
                }
            }
        }
    }
}
