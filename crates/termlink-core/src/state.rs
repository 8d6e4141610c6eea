//! The shared aggregate mutated by the engine thread and drained by the UI
//! thread.
//!
//! One instance exists per terminal session, wrapped in a
//! [`FairMutex`](crate::sync::FairMutex). The engine thread publishes
//! surface damage, cursor moves, title updates, and mode toggles; the UI
//! thread calls [`SharedTerminalState::drain`] and receives only what
//! changed since its previous drain.

use crate::surface::{DamagedRow, Pos, Surface, TermSize};

/// Cursor presentation as seen by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorSnapshot {
    /// Cursor position.
    pub pos: Pos,
    /// Whether the cursor is shown.
    pub visible: bool,
    /// Whether the cursor blinks.
    pub blinking: bool,
}

impl Default for CursorSnapshot {
    fn default() -> Self {
        Self {
            pos: Pos::default(),
            visible: true,
            blinking: false,
        }
    }
}

#[derive(Debug, Default)]
struct TitleState {
    bytes: Vec<u8>,
    changed: bool,
}

/// Everything that changed since the previous drain.
#[derive(Debug, Default)]
pub struct SurfaceUpdate {
    /// Damaged rows with their column intervals, top to bottom.
    pub rows: Vec<DamagedRow>,
    /// New cursor state, when it changed.
    pub cursor: Option<CursorSnapshot>,
    /// New title bytes, when the title changed.
    pub title: Option<Vec<u8>>,
}

impl SurfaceUpdate {
    /// Whether the update carries nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.cursor.is_none() && self.title.is_none()
    }
}

/// Shared terminal session state.
///
/// Access is mediated by a single lock; see the crate docs for the
/// threading discipline.
#[derive(Debug)]
pub struct SharedTerminalState {
    /// The rendered cell grid and its damage intervals.
    pub surface: Surface,
    cursor: CursorSnapshot,
    cursor_changed: bool,
    title: TitleState,
    /// The engine has enabled mouse reporting.
    pub mouse_reporting: bool,
    /// The alternate screen buffer is active.
    pub alt_screen: bool,
}

impl SharedTerminalState {
    /// Create session state with a blank surface of `size`.
    #[must_use]
    pub fn new(size: TermSize) -> Self {
        Self {
            surface: Surface::new(size),
            cursor: CursorSnapshot::default(),
            cursor_changed: false,
            title: TitleState::default(),
            mouse_reporting: false,
            alt_screen: false,
        }
    }

    /// Publish a new cursor state, flagging it for the next drain.
    pub fn set_cursor(&mut self, cursor: CursorSnapshot) {
        self.cursor = cursor;
        self.cursor_changed = true;
    }

    /// The current cursor state, whether or not it is pending.
    #[must_use]
    pub fn cursor(&self) -> CursorSnapshot {
        self.cursor
    }

    /// Publish a new title, flagging it for the next drain.
    pub fn set_title(&mut self, bytes: Vec<u8>) {
        self.title.bytes = bytes;
        self.title.changed = true;
    }

    /// The current title bytes.
    #[must_use]
    pub fn title(&self) -> &[u8] {
        &self.title.bytes
    }

    /// Atomically read and clear all pending changes.
    pub fn drain(&mut self) -> SurfaceUpdate {
        let cursor = if self.cursor_changed {
            self.cursor_changed = false;
            Some(self.cursor)
        } else {
            None
        };
        let title = if self.title.changed {
            self.title.changed = false;
            Some(self.title.bytes.clone())
        } else {
            None
        };
        SurfaceUpdate {
            rows: self.surface.take_damage(),
            cursor,
            title,
        }
    }
}
