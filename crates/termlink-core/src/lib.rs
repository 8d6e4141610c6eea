//! Engine-agnostic shared terminal state.
//!
//! This crate is the state half of termlink: the cell grid and per-row
//! damage intervals a host UI paints from, the cursor/title/mode aggregate
//! shared between the engine-driving thread and the render thread, the
//! bounded scrollback stack, and the fair lock that mediates all
//! cross-thread access.
//!
//! It performs no I/O and knows nothing about escape sequences; the
//! `termlink-bridge` crate owns the PTY and the emulation-engine boundary.
//!
//! ## Threading model
//!
//! Exactly one [`SharedTerminalState`] exists per terminal session, wrapped
//! in a [`FairMutex`]. The engine thread mutates it (one callback's worth
//! of changes per lock acquisition); the UI thread drains it (one
//! [`SharedTerminalState::drain`] per lock acquisition). Neither side holds
//! the lock across blocking I/O or engine calls.

pub mod cell;
pub mod scrollback;
pub mod state;
pub mod style;
pub mod surface;
pub mod sync;

pub use cell::{Cell, CellFlags, MAX_CELL_CHARS};
pub use scrollback::{Scrollback, DEFAULT_SCROLLBACK_CAPACITY};
pub use state::{CursorSnapshot, SharedTerminalState, SurfaceUpdate};
pub use style::{Color, StyleFlags};
pub use surface::{DamagedRow, Pos, Rect, RowDamage, Surface, TermSize};
pub use sync::FairMutex;
