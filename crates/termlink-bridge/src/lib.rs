//! The boundary layer between a PTY child process, an external
//! terminal-emulation engine, and a host UI.
//!
//! ```text
//! ┌──────────┐ bytes ┌────────────┐ callbacks ┌─────────────────────┐
//! │   PTY    │ ────▶ │   engine   │ ────────▶ │ SharedTerminalState │
//! │ (child)  │       │ (external) │           │   (termlink-core)   │
//! └──────────┘       └────────────┘           └─────────────────────┘
//!      ▲                   ▲                            │ drain
//!      │ output relay      │ key/mouse/resize/focus     ▼
//!      └───────────────────┴──────────────────────── host UI
//! ```
//!
//! The engine itself (escape-sequence parsing, cursor semantics, color
//! state) is an external collaborator reached through the traits in
//! [`engine`]. This crate supplies everything around it: the PTY transport
//! ([`pty`]), the event translation in both directions plus the child-bound
//! output relay ([`adapter`]), and the per-session engine thread with its
//! teardown protocol ([`session`]).

pub mod adapter;
pub mod engine;
#[cfg(unix)]
pub mod pty;
#[cfg(unix)]
pub mod session;


pub use adapter::EngineAdapter;
pub use engine::{
    Engine, EngineAttrs, EngineCell, EngineColor, EngineSink, Modifiers, MouseButton, NamedKey,
    Property, PropertyValue, ScreenReader, StringFragment,
};
#[cfg(unix)]
pub use pty::{Pty, PtyError, PtyOptions, Shell};
#[cfg(unix)]
pub use session::Session;
