//! Screen cell value types.
//!
//! A cell is an immutable value: damage conversion overwrites cells
//! wholesale rather than patching individual fields. The one exception is
//! the wide-character repair in the bridge, which writes a fresh blank cell
//! derived from the cell to its left.

use arrayvec::ArrayVec;

use crate::style::{Color, StyleFlags};

/// Maximum Unicode scalar values stored per cell (a base character plus
/// combining marks).
pub const MAX_CELL_CHARS: usize = 6;

bitflags::bitflags! {
    /// Wide-character placement markers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u8 {
        /// First column of a two-column character.
        const WIDE_LEAD  = 1 << 0;
        /// Second column of a two-column character.
        const WIDE_TRAIL = 1 << 1;
    }
}

/// One cell of the terminal surface.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    /// Unicode scalars rendered in this cell; empty means blank.
    pub text: ArrayVec<char, MAX_CELL_CHARS>,
    /// Wide-character markers.
    pub flags: CellFlags,
    /// Style attribute bits.
    pub style: StyleFlags,
    /// Foreground color.
    pub fg: Color,
    /// Background color.
    pub bg: Color,
}

impl Cell {
    /// A blank cell with default colors and no attributes.
    #[must_use]
    pub fn blank() -> Self {
        Self::default()
    }

    /// A cell holding one character with the given presentation.
    #[must_use]
    pub fn new(ch: char, style: StyleFlags, fg: Color, bg: Color) -> Self {
        let mut text = ArrayVec::new();
        text.push(ch);
        Self {
            text,
            flags: CellFlags::empty(),
            style,
            fg,
            bg,
        }
    }

    /// Whether this cell renders as an empty blank.
    #[must_use]
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }

    /// Whether this cell is the leading half of a wide character.
    #[must_use]
    #[inline]
    pub fn is_wide_lead(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_LEAD)
    }

    /// Whether this cell is the trailing half of a wide character.
    #[must_use]
    #[inline]
    pub fn is_wide_trail(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_TRAIL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cell() {
        let cell = Cell::blank();
        assert!(cell.is_blank());
        assert!(!cell.is_wide_lead());
        assert!(!cell.is_wide_trail());
        assert_eq!(cell.fg, Color::Default);
        assert_eq!(cell.bg, Color::Default);
    }

    #[test]
    fn single_char_cell() {
        let cell = Cell::new('x', StyleFlags::BOLD, Color::Indexed(2), Color::Default);
        assert_eq!(cell.text.as_slice(), ['x']);
        assert!(!cell.is_blank());
        assert!(cell.style.contains(StyleFlags::BOLD));
    }

    #[test]
    fn combining_marks_fit() {
        let mut cell = Cell::new('e', StyleFlags::empty(), Color::Default, Color::Default);
        for _ in 0..MAX_CELL_CHARS - 1 {
            cell.text.push('\u{0301}');
        }
        assert_eq!(cell.text.len(), MAX_CELL_CHARS);
    }
}
