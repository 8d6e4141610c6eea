//! Color and style attribute types.

/// A cell color: the terminal default, a 256-color palette index, or a
/// direct RGB value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// The terminal's default foreground or background.
    #[default]
    Default,
    /// Palette index 0-255.
    Indexed(u8),
    /// Direct 24-bit color.
    Rgb(u8, u8, u8),
}

impl Color {
    /// Whether this is the terminal default.
    #[must_use]
    #[inline]
    pub const fn is_default(self) -> bool {
        matches!(self, Color::Default)
    }
}

bitflags::bitflags! {
    /// Text style attribute bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StyleFlags: u8 {
        const BOLD      = 1 << 0;
        const ITALIC    = 1 << 1;
        const UNDERLINE = 1 << 2;
        const BLINK     = 1 << 3;
        const REVERSE   = 1 << 4;
        const STRIKE    = 1 << 5;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_color_is_default() {
        assert!(Color::default().is_default());
        assert!(!Color::Indexed(7).is_default());
        assert!(!Color::Rgb(1, 2, 3).is_default());
    }

    #[test]
    fn style_flags_compose() {
        let style = StyleFlags::BOLD | StyleFlags::UNDERLINE;
        assert!(style.contains(StyleFlags::BOLD));
        assert!(!style.contains(StyleFlags::ITALIC));
    }
}
