//! Event translation between the host UI, the engine, and the shared
//! surface.
//!
//! Input direction: crossterm key/mouse/focus/resize events become engine
//! calls. Output direction: engine callbacks become mutations of the
//! [`SharedTerminalState`], applied under one short lock acquisition per
//! callback, plus child-bound bytes relayed to the PTY writer.
//!
//! The shared-state lock is never held across an engine call or a PTY
//! write; the adapter's own serialization (one mutex around the whole
//! adapter, owned by the session) is what keeps engine calls ordered.

use std::io::Write;
use std::sync::Arc;

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton as HostButton, MouseEvent,
    MouseEventKind,
};
use log::{debug, error};
use termlink_core::{
    Cell, CellFlags, Color, CursorSnapshot, FairMutex, Pos, Rect, Scrollback,
    SharedTerminalState, StyleFlags, Surface, TermSize,
};

use crate::engine::{
    Engine, EngineAttrs, EngineCell, EngineColor, EngineSink, Modifiers, MouseButton, NamedKey,
    Property, PropertyValue, ScreenReader,
};

// Input conversion.

fn conv_modifiers(mods: KeyModifiers) -> Modifiers {
    let mut out = Modifiers::empty();
    out.set(Modifiers::SHIFT, mods.contains(KeyModifiers::SHIFT));
    out.set(Modifiers::ALT, mods.contains(KeyModifiers::ALT));
    out.set(Modifiers::CTRL, mods.contains(KeyModifiers::CONTROL));
    out
}

fn conv_key(code: KeyCode) -> Option<NamedKey> {
    Some(match code {
        KeyCode::Enter => NamedKey::Enter,
        KeyCode::Tab | KeyCode::BackTab => NamedKey::Tab,
        KeyCode::Backspace => NamedKey::Backspace,
        KeyCode::Esc => NamedKey::Escape,
        KeyCode::Up => NamedKey::Up,
        KeyCode::Down => NamedKey::Down,
        KeyCode::Left => NamedKey::Left,
        KeyCode::Right => NamedKey::Right,
        KeyCode::Insert => NamedKey::Insert,
        KeyCode::Delete => NamedKey::Delete,
        KeyCode::Home => NamedKey::Home,
        KeyCode::End => NamedKey::End,
        KeyCode::PageUp => NamedKey::PageUp,
        KeyCode::PageDown => NamedKey::PageDown,
        KeyCode::F(n) if (1..=12).contains(&n) => NamedKey::Function(n),
        _ => return None,
    })
}

/// Button and press flag for a mouse event, when it carries one. The host
/// event already names a single button, so the left > middle > right >
/// wheel priority of the protocol reduces to this mapping.
fn conv_mouse_button(kind: MouseEventKind) -> Option<(MouseButton, bool)> {
    match kind {
        MouseEventKind::Down(button) => Some((conv_button(button), true)),
        MouseEventKind::Up(button) => Some((conv_button(button), false)),
        MouseEventKind::ScrollUp => Some((MouseButton::WheelUp, true)),
        MouseEventKind::ScrollDown => Some((MouseButton::WheelDown, true)),
        MouseEventKind::Drag(_)
        | MouseEventKind::Moved
        | MouseEventKind::ScrollLeft
        | MouseEventKind::ScrollRight => None,
    }
}

fn conv_button(button: HostButton) -> MouseButton {
    match button {
        HostButton::Left => MouseButton::Left,
        HostButton::Middle => MouseButton::Middle,
        HostButton::Right => MouseButton::Right,
    }
}

// Output conversion.

fn conv_color(color: EngineColor) -> Color {
    match color {
        EngineColor::Default => Color::Default,
        EngineColor::Indexed(idx) => Color::Indexed(idx),
        EngineColor::Rgb(r, g, b) => Color::Rgb(r, g, b),
    }
}

fn conv_attrs(attrs: EngineAttrs) -> StyleFlags {
    let mut style = StyleFlags::empty();
    style.set(StyleFlags::BOLD, attrs.contains(EngineAttrs::BOLD));
    style.set(StyleFlags::ITALIC, attrs.contains(EngineAttrs::ITALIC));
    style.set(StyleFlags::UNDERLINE, attrs.contains(EngineAttrs::UNDERLINE));
    style.set(StyleFlags::BLINK, attrs.contains(EngineAttrs::BLINK));
    style.set(StyleFlags::REVERSE, attrs.contains(EngineAttrs::REVERSE));
    style.set(StyleFlags::STRIKE, attrs.contains(EngineAttrs::STRIKE));
    style
}

/// Write one converted engine cell into the surface.
fn put_cell(surface: &mut Surface, row: u16, col: u16, src: &EngineCell) {
    if src.wide_trail {
        // The engine and the host may disagree on which characters are
        // double-width. When the host did not render a wide lead to the
        // left, replace the orphan trail with a blank space carrying the
        // left neighbor's presentation.
        if col > 0 {
            if let Some(prev) = surface.cell(row, col - 1).cloned() {
                if !prev.is_wide_lead() {
                    let cell = Cell::new(' ', prev.style, prev.fg, prev.bg);
                    surface.set_cell(row, col, cell);
                }
            }
        }
        return;
    }

    let mut cell = Cell::blank();
    cell.text = src.chars.clone();
    cell.style = conv_attrs(src.attrs);
    cell.fg = conv_color(src.fg);
    cell.bg = conv_color(src.bg);
    if src.is_wide_lead() {
        cell.flags |= CellFlags::WIDE_LEAD;
        // Keep the surface self-consistent even when the engine damages
        // only the lead column.
        let mut trail = Cell::blank();
        trail.flags = CellFlags::WIDE_TRAIL;
        trail.style = cell.style;
        trail.fg = cell.fg;
        trail.bg = cell.bg;
        surface.set_cell(row, col + 1, trail);
    }
    surface.set_cell(row, col, cell);
}

/// Copy a damaged area from the engine's screen into the surface.
///
/// A size mismatch means a resize callback raced the damage; the surface
/// is resized (marking everything damaged) and the rectangle's own bounds
/// are ignored in favor of the whole grid.
fn draw_area(surface: &mut Surface, term_size: TermSize, area: Rect, screen: &dyn ScreenReader) {
    let rect = if surface.size() != term_size {
        surface.resize(term_size);
        Rect::full(term_size)
    } else {
        area.intersect(Rect::full(surface.size()))
    };
    if rect.is_empty() {
        return;
    }
    for row in rect.start_row..rect.end_row {
        for col in rect.start_col..rect.end_col {
            match screen.cell(Pos::new(row, col)) {
                Some(cell) => put_cell(surface, row, col, &cell),
                // Unavailable under a size-mismatch race: blank it.
                None => surface.set_cell(row, col, Cell::blank()),
            }
        }
        surface.mark_damage(row, rect.start_col, rect.end_col);
    }
}

/// Cursor and title state accumulated between damage flushes, published to
/// the shared aggregate in one short lock acquisition.
struct LocalState {
    cursor: CursorSnapshot,
    cursor_changed: bool,
    title: Vec<u8>,
    title_changed: bool,
}

impl LocalState {
    fn new() -> Self {
        Self {
            // Published on the first flush so the renderer starts from a
            // known cursor.
            cursor: CursorSnapshot::default(),
            cursor_changed: true,
            title: Vec::new(),
            title_changed: false,
        }
    }
}

/// The callback half of the adapter: owns everything the engine's sink
/// callbacks touch.
struct SurfaceSink {
    shared: Arc<FairMutex<SharedTerminalState>>,
    writer: Box<dyn Write + Send>,
    scrollback: Scrollback<EngineCell>,
    title_frag: Vec<u8>,
    local: LocalState,
    mouse_enabled: bool,
    alt_screen: bool,
}

impl SurfaceSink {
    fn new(writer: Box<dyn Write + Send>, shared: Arc<FairMutex<SharedTerminalState>>) -> Self {
        Self {
            shared,
            writer,
            scrollback: Scrollback::new(),
            title_frag: Vec::new(),
            local: LocalState::new(),
            mouse_enabled: false,
            alt_screen: false,
        }
    }

    /// Publish pending cursor/title state and the mode flags.
    fn publish(&mut self) {
        let local = &mut self.local;
        let mouse_reporting = self.mouse_enabled;
        let alt_screen = self.alt_screen;
        self.shared.with(|state| {
            if local.cursor_changed {
                state.set_cursor(local.cursor);
                local.cursor_changed = false;
            }
            if local.title_changed {
                state.set_title(std::mem::take(&mut local.title));
                local.title_changed = false;
            }
            state.mouse_reporting = mouse_reporting;
            state.alt_screen = alt_screen;
        });
    }
}

impl EngineSink for SurfaceSink {
    fn on_output(&mut self, bytes: &[u8]) {
        // write_all retries partial writes and transient interrupts; a hard
        // failure here means the child is gone and the session is ending.
        if let Err(err) = self.writer.write_all(bytes) {
            error!("child-bound write failed: {err}");
        }
    }

    fn on_damage(&mut self, rect: Rect, screen: &dyn ScreenReader) -> bool {
        let term_size = screen.size();
        self.shared
            .with(|state| draw_area(&mut state.surface, term_size, rect, screen));
        true
    }

    fn on_move_rect(&mut self, dest: Rect, src: Rect) -> bool {
        debug!("unhandled move_rect {src:?} -> {dest:?}");
        false
    }

    fn on_move_cursor(&mut self, pos: Pos, _old: Pos, _visible: bool) -> bool {
        self.local.cursor.pos = pos;
        self.local.cursor_changed = true;
        true
    }

    fn on_set_property(&mut self, prop: Property, value: PropertyValue<'_>) -> bool {
        // String values arrive in fragments; accumulate until the final
        // one, then commit below.
        if let PropertyValue::Str(frag) = value {
            if frag.initial {
                self.title_frag.clear();
            }
            self.title_frag.extend_from_slice(frag.bytes);
            if !frag.is_final {
                return true;
            }
        }

        match (prop, value) {
            (Property::Title, PropertyValue::Str(_)) => {
                self.local.title = std::mem::take(&mut self.title_frag);
                self.local.title_changed = true;
                true
            }
            (Property::CursorVisible, PropertyValue::Bool(visible)) => {
                self.local.cursor.visible = visible;
                self.local.cursor_changed = true;
                true
            }
            (Property::CursorBlink, PropertyValue::Bool(blinking)) => {
                self.local.cursor.blinking = blinking;
                self.local.cursor_changed = true;
                true
            }
            (Property::MouseReporting, PropertyValue::Bool(enabled)) => {
                self.mouse_enabled = enabled;
                true
            }
            (Property::AltScreen, PropertyValue::Bool(active)) => {
                self.alt_screen = active;
                true
            }
            _ => {
                debug!("unhandled property {prop:?}");
                false
            }
        }
    }

    fn on_bell(&mut self) -> bool {
        debug!("bell");
        false
    }

    fn on_resize(&mut self, size: TermSize) -> bool {
        // The surface follows the engine size on the next damage callback.
        debug!("engine resize to {}x{}", size.rows, size.cols);
        false
    }

    fn on_scrollback_push(&mut self, cells: &[EngineCell]) -> bool {
        self.scrollback.push(cells);
        true
    }

    fn on_scrollback_pop(&mut self, out: &mut [EngineCell], default: &EngineCell) -> bool {
        self.scrollback.pop_into(out, default)
    }
}

/// Drives one engine instance and owns its sink.
///
/// All methods must be externally serialized per session (the session
/// wraps the adapter in a mutex); the engine is never re-entered.
pub struct EngineAdapter {
    engine: Box<dyn Engine + Send>,
    sink: SurfaceSink,
}

impl EngineAdapter {
    /// Wire `engine` to `shared` and the child-bound `writer`, and bring
    /// the engine to `size` (clamped to at least 1x1).
    pub fn new(
        engine: Box<dyn Engine + Send>,
        size: TermSize,
        writer: Box<dyn Write + Send>,
        shared: Arc<FairMutex<SharedTerminalState>>,
    ) -> Self {
        let mut adapter = Self {
            engine,
            sink: SurfaceSink::new(writer, shared),
        };
        let size = size.clamped();
        if adapter.engine.size() != size {
            adapter.engine.set_size(size, &mut adapter.sink);
        }
        adapter.sink.publish();
        adapter
    }

    /// The shared state this adapter mutates.
    #[must_use]
    pub fn shared(&self) -> &Arc<FairMutex<SharedTerminalState>> {
        &self.sink.shared
    }

    /// Feed bytes the child process wrote.
    pub fn receive_from_child(&mut self, bytes: &[u8]) {
        self.engine.receive(bytes, &mut self.sink);
    }

    /// Flush merged damage and publish pending cursor/title/mode state.
    pub fn flush_damage(&mut self) {
        self.engine.flush_damage(&mut self.sink);
        self.sink.publish();
    }

    /// Resize the engine. Sizes are clamped to at least 1x1 and a resize
    /// to the current size is not forwarded, avoiding redundant reflows.
    pub fn set_size(&mut self, size: TermSize) {
        let size = size.clamped();
        if size != self.engine.size() {
            self.engine.set_size(size, &mut self.sink);
        }
    }

    /// The engine's current size.
    #[must_use]
    pub fn size(&self) -> TermSize {
        self.engine.size()
    }

    /// Forward a focus change.
    pub fn set_focus(&mut self, focused: bool) {
        self.engine.focus(focused, &mut self.sink);
    }

    /// Translate a host key event into engine input.
    pub fn handle_key_down(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        let mods = conv_modifiers(key.modifiers);
        match key.code {
            KeyCode::Char(ch) => {
                // A bare Ctrl+letter behaves like a raw terminal: the
                // literal control byte, with no modifier reported.
                if mods == Modifiers::CTRL && ch.is_ascii_alphabetic() {
                    let byte = ch.to_ascii_uppercase() as u8 & 0x1f;
                    self.engine
                        .unichar(char::from(byte), Modifiers::empty(), &mut self.sink);
                } else {
                    self.engine.unichar(ch, mods, &mut self.sink);
                }
            }
            code => {
                if let Some(named) = conv_key(code) {
                    self.engine.key(named, mods, &mut self.sink);
                }
            }
        }
    }

    /// Translate a host mouse event into engine input.
    ///
    /// When the engine never enabled mouse reporting but a full-screen
    /// application is active, wheel motion is approximated by three arrow
    /// key presses.
    pub fn handle_mouse(&mut self, event: MouseEvent) {
        if self.sink.mouse_enabled {
            let mods = conv_modifiers(event.modifiers);
            let pos = Pos::new(event.row, event.column);
            self.engine.mouse_move(pos, mods, &mut self.sink);
            if let Some((button, pressed)) = conv_mouse_button(event.kind) {
                self.engine.mouse_button(button, pressed, mods, &mut self.sink);
            }
        } else if self.sink.alt_screen {
            let key = match event.kind {
                MouseEventKind::ScrollUp => NamedKey::Up,
                MouseEventKind::ScrollDown => NamedKey::Down,
                MouseEventKind::ScrollLeft => NamedKey::Left,
                MouseEventKind::ScrollRight => NamedKey::Right,
                _ => return,
            };
            for _ in 0..3 {
                self.engine.key(key, Modifiers::empty(), &mut self.sink);
            }
        }
    }
}
