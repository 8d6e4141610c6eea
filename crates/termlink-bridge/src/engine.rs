//! The terminal-emulation engine boundary.
//!
//! The engine is an external collaborator; this module is the whole of its
//! contract. [`Engine`] is the input surface this crate drives; the engine
//! answers by synchronously invoking [`EngineSink`] callbacks on whichever
//! thread made the call. The original C-style callback table becomes a
//! trait object, and callbacks receive the session's sink as an explicit
//! argument instead of locating it through thread-local state.
//!
//! Engine-side value types ([`EngineCell`], [`EngineColor`], [`EngineAttrs`])
//! are deliberately distinct from the surface types in `termlink-core`: the
//! conversion between them is the adapter's job and happens once per
//! damaged cell.

use arrayvec::ArrayVec;
use termlink_core::{Pos, Rect, TermSize, MAX_CELL_CHARS};

bitflags::bitflags! {
    /// Keyboard modifier mask forwarded to the engine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const ALT   = 1 << 1;
        const CTRL  = 1 << 2;
    }
}

/// Non-character keys the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedKey {
    Enter,
    Tab,
    Backspace,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    /// Function keys F1..=F12.
    Function(u8),
}

/// Mouse button reported to the engine; at most one per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
}

/// Engine-side color, converted to the surface representation on damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineColor {
    /// The engine's default foreground or background.
    #[default]
    Default,
    /// Palette index 0-255.
    Indexed(u8),
    /// Direct 24-bit color.
    Rgb(u8, u8, u8),
}

bitflags::bitflags! {
    /// Engine-side style attribute bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EngineAttrs: u8 {
        const BOLD      = 1 << 0;
        const ITALIC    = 1 << 1;
        const UNDERLINE = 1 << 2;
        const BLINK     = 1 << 3;
        const REVERSE   = 1 << 4;
        const STRIKE    = 1 << 5;
    }
}

/// A cell as reported by the engine's screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCell {
    /// Unicode scalars; empty means blank.
    pub chars: ArrayVec<char, MAX_CELL_CHARS>,
    /// Display columns this cell occupies; 2 marks a wide lead.
    pub width: u8,
    /// This cell is the continuation half of a wide character.
    pub wide_trail: bool,
    /// Foreground color.
    pub fg: EngineColor,
    /// Background color.
    pub bg: EngineColor,
    /// Style attribute bits.
    pub attrs: EngineAttrs,
}

impl Default for EngineCell {
    fn default() -> Self {
        Self::blank()
    }
}

impl EngineCell {
    /// A blank single-width cell with default colors.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            chars: ArrayVec::new(),
            width: 1,
            wide_trail: false,
            fg: EngineColor::Default,
            bg: EngineColor::Default,
            attrs: EngineAttrs::empty(),
        }
    }

    /// A single-width cell holding one character.
    #[must_use]
    pub fn from_char(ch: char) -> Self {
        let mut cell = Self::blank();
        cell.chars.push(ch);
        cell
    }

    /// The continuation half of a wide character.
    #[must_use]
    pub fn trail() -> Self {
        let mut cell = Self::blank();
        cell.wide_trail = true;
        cell
    }

    /// Whether this cell is the leading half of a wide character.
    #[must_use]
    #[inline]
    pub fn is_wide_lead(&self) -> bool {
        self.width == 2
    }
}

/// Terminal properties announced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    /// Window title (string-valued, possibly fragmented).
    Title,
    /// Cursor visibility.
    CursorVisible,
    /// Cursor blink.
    CursorBlink,
    /// Mouse reporting has been enabled or disabled.
    MouseReporting,
    /// The alternate screen buffer was entered or left.
    AltScreen,
    /// A property this layer does not interpret.
    Other(u16),
}

/// One fragment of a possibly-fragmented string property value.
#[derive(Debug, Clone, Copy)]
pub struct StringFragment<'a> {
    /// Fragment payload.
    pub bytes: &'a [u8],
    /// First fragment of the value; resets the accumulator.
    pub initial: bool,
    /// Last fragment; commits the accumulated value.
    pub is_final: bool,
}

impl<'a> StringFragment<'a> {
    /// A value delivered whole, in a single fragment.
    #[must_use]
    pub fn complete(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            initial: true,
            is_final: true,
        }
    }
}

/// Value carried by a property update.
#[derive(Debug, Clone, Copy)]
pub enum PropertyValue<'a> {
    Bool(bool),
    Str(StringFragment<'a>),
}

/// Read-only view of the engine's screen, valid for the duration of one
/// damage callback.
pub trait ScreenReader {
    /// The engine's current size.
    fn size(&self) -> TermSize;

    /// The authoritative cell at `pos`, or `None` when `pos` is outside
    /// the engine's screen (a size-mismatch race).
    fn cell(&self, pos: Pos) -> Option<EngineCell>;
}

/// Callbacks the engine invokes synchronously while processing input.
///
/// Every method except [`EngineSink::on_output`] returns whether the
/// callback was handled; `false` is non-fatal and at most logged.
pub trait EngineSink {
    /// Bytes the engine wants delivered to the child process (query
    /// responses and similar).
    fn on_output(&mut self, bytes: &[u8]);

    /// A rectangle of the screen changed; `screen` answers cell queries.
    fn on_damage(&mut self, rect: Rect, screen: &dyn ScreenReader) -> bool;

    /// The engine moved a rectangle of cells (scroll optimization hint).
    fn on_move_rect(&mut self, dest: Rect, src: Rect) -> bool;

    /// The cursor moved.
    fn on_move_cursor(&mut self, pos: Pos, old: Pos, visible: bool) -> bool;

    /// A terminal property changed.
    fn on_set_property(&mut self, prop: Property, value: PropertyValue<'_>) -> bool;

    /// The bell rang.
    fn on_bell(&mut self) -> bool;

    /// The engine's own screen size changed.
    fn on_resize(&mut self, size: TermSize) -> bool;

    /// A row scrolled off the top of the screen.
    fn on_scrollback_push(&mut self, cells: &[EngineCell]) -> bool;

    /// The engine wants the most recently scrolled-off row back, adjusted
    /// to `out.len()` columns; missing columns are filled with `default`.
    fn on_scrollback_pop(&mut self, out: &mut [EngineCell], default: &EngineCell) -> bool;
}

/// The input surface of the external emulation engine.
///
/// Any input may synchronously produce output bytes or screen callbacks,
/// so every call carries the sink. Callers serialize all calls for one
/// session; the engine may assume it is never re-entered.
pub trait Engine {
    /// Feed bytes read from the child process.
    fn receive(&mut self, bytes: &[u8], sink: &mut dyn EngineSink);

    /// Flush damage the engine has merged but not yet reported.
    fn flush_damage(&mut self, sink: &mut dyn EngineSink);

    /// Inject a named key.
    fn key(&mut self, key: NamedKey, mods: Modifiers, sink: &mut dyn EngineSink);

    /// Inject a Unicode character.
    fn unichar(&mut self, ch: char, mods: Modifiers, sink: &mut dyn EngineSink);

    /// Report the mouse position.
    fn mouse_move(&mut self, pos: Pos, mods: Modifiers, sink: &mut dyn EngineSink);

    /// Report a button press or release at the last reported position.
    fn mouse_button(
        &mut self,
        button: MouseButton,
        pressed: bool,
        mods: Modifiers,
        sink: &mut dyn EngineSink,
    );

    /// Focus gained or lost.
    fn focus(&mut self, focused: bool, sink: &mut dyn EngineSink);

    /// Resize the engine's screen.
    fn set_size(&mut self, size: TermSize, sink: &mut dyn EngineSink);

    /// The engine's current size.
    fn size(&self) -> TermSize;
}
