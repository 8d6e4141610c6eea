//! End-to-end session tests against a real PTY child.
#![cfg(unix)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use parking_lot::Mutex;
use termlink_bridge::engine::{
    Engine, EngineSink, Modifiers, MouseButton, NamedKey,
};
use termlink_bridge::pty::{PtyOptions, Shell};
use termlink_bridge::session::Session;
use termlink_core::{Pos, TermSize};

/// Minimal engine: records bytes from the child and turns keyboard input
/// into child-bound bytes through the output relay.
struct CaptureEngine {
    size: TermSize,
    received: Arc<Mutex<Vec<u8>>>,
    resizes: Arc<Mutex<Vec<TermSize>>>,
}

impl Engine for CaptureEngine {
    fn receive(&mut self, bytes: &[u8], _sink: &mut dyn EngineSink) {
        self.received.lock().extend_from_slice(bytes);
    }

    fn flush_damage(&mut self, _sink: &mut dyn EngineSink) {}

    fn key(&mut self, key: NamedKey, _mods: Modifiers, sink: &mut dyn EngineSink) {
        if key == NamedKey::Enter {
            sink.on_output(b"\r");
        }
    }

    fn unichar(&mut self, ch: char, _mods: Modifiers, sink: &mut dyn EngineSink) {
        let mut buf = [0u8; 4];
        sink.on_output(ch.encode_utf8(&mut buf).as_bytes());
    }

    fn mouse_move(&mut self, _pos: Pos, _mods: Modifiers, _sink: &mut dyn EngineSink) {}

    fn mouse_button(
        &mut self,
        _button: MouseButton,
        _pressed: bool,
        _mods: Modifiers,
        _sink: &mut dyn EngineSink,
    ) {
    }

    fn focus(&mut self, _focused: bool, _sink: &mut dyn EngineSink) {}

    fn set_size(&mut self, size: TermSize, _sink: &mut dyn EngineSink) {
        self.size = size;
        self.resizes.lock().push(size);
    }

    fn size(&self) -> TermSize {
        self.size
    }
}

struct TestSession {
    session: Session,
    received: Arc<Mutex<Vec<u8>>>,
    resizes: Arc<Mutex<Vec<TermSize>>>,
    exited: Arc<AtomicBool>,
}

fn spawn(options: PtyOptions) -> TestSession {
    let received = Arc::new(Mutex::new(Vec::new()));
    let resizes = Arc::new(Mutex::new(Vec::new()));
    let engine = CaptureEngine {
        size: TermSize::new(0, 0),
        received: Arc::clone(&received),
        resizes: Arc::clone(&resizes),
    };
    let exited = Arc::new(AtomicBool::new(false));
    let exit_flag = Arc::clone(&exited);
    let session = Session::spawn(Box::new(engine), options, TermSize::new(24, 80), move || {
        exit_flag.store(true, Ordering::Release);
    })
    .expect("session spawn");
    TestSession {
        session,
        received,
        resizes,
        exited,
    }
}

fn sh(script: &str) -> PtyOptions {
    PtyOptions {
        shell: Some(Shell {
            program: "/bin/sh".into(),
            args: vec!["-c".into(), script.into()],
        }),
        ..PtyOptions::default()
    }
}

fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out");
        thread::sleep(Duration::from_millis(10));
    }
}

fn received_contains(received: &Mutex<Vec<u8>>, needle: &[u8]) -> bool {
    received
        .lock()
        .windows(needle.len())
        .any(|window| window == needle)
}

#[test]
fn child_output_reaches_engine() {
    let mut t = spawn(sh("printf ready"));
    wait_for(|| received_contains(&t.received, b"ready"));
    t.session.close();
}

#[test]
fn keyboard_input_round_trips_through_child() {
    let mut t = spawn(sh("read line; printf \"got:$line\""));
    for ch in "hi".chars() {
        t.session
            .handle_key_down(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE));
    }
    t.session
        .handle_key_down(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
    wait_for(|| received_contains(&t.received, b"got:hi"));
    t.session.close();
}

#[test]
fn child_exit_raises_session_ended_notification() {
    let t = spawn(sh("exit 0"));
    wait_for(|| t.exited.load(Ordering::Acquire));
    assert!(t.session.has_exited());
}

#[test]
fn resize_reaches_engine_and_kernel() {
    let mut t = spawn(sh("sleep 1; stty size"));
    t.session.resize(TermSize::new(31, 101));
    wait_for(|| t.resizes.lock().contains(&TermSize::new(31, 101)));
    // The child's own query reflects the kernel-side winsize.
    wait_for(|| received_contains(&t.received, b"31 101"));
    t.session.close();
}

#[test]
fn close_is_idempotent_and_reaps_child() {
    let mut t = spawn(sh("cat"));
    t.session.close();
    t.session.close();
}

#[test]
fn drain_starts_empty_after_initial_cursor_publish() {
    let t = spawn(sh("sleep 1"));
    // The construction-time publish carries the initial cursor; nothing
    // else is pending until the engine reports damage.
    let update = t.session.drain();
    assert!(update.cursor.is_some());
    assert!(update.rows.is_empty());
    assert!(update.title.is_none());
    assert!(t.session.drain().is_empty());
}
