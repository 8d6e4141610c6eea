//! Per-session thread management and teardown.
//!
//! Two threads share one session. The engine thread owns PTY reads and
//! feeds the engine, whose callbacks mutate the shared state; the UI
//! thread injects input events and periodically drains the shared state to
//! render. The shared-state lock is never held across a PTY read/write or
//! an engine call, and the PTY is only released after the engine thread
//! has observably stopped.

use std::fs::File;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossterm::event::{KeyEvent, MouseEvent};
use log::error;
use parking_lot::Mutex;
use polling::{Event, Events, PollMode, Poller};
use termlink_core::{FairMutex, SharedTerminalState, SurfaceUpdate, TermSize};

use crate::adapter::EngineAdapter;
use crate::engine::Engine;
use crate::pty::{read_master, Pty, PtyError, PtyOptions};

/// Poller key for master readability.
const PTY_READ_TOKEN: usize = 0;

/// Bytes read from the child per wakeup.
const READ_BUFFER_SIZE: usize = 4096;

/// One live terminal session: child process, engine thread, shared state.
///
/// Dropping the session (or calling [`Session::close`]) stops the engine
/// thread, reaps the child, and releases the PTY, in that order.
pub struct Session {
    adapter: Arc<Mutex<EngineAdapter>>,
    shared: Arc<FairMutex<SharedTerminalState>>,
    pty: Option<Pty>,
    poller: Arc<Poller>,
    shutdown: Arc<AtomicBool>,
    exited: Arc<AtomicBool>,
    pending_resize: Arc<Mutex<Option<TermSize>>>,
    reader: Option<JoinHandle<()>>,
}

impl Session {
    /// Spawn the child, wire `engine` to fresh shared state, and start the
    /// engine thread.
    ///
    /// `on_exit` runs on the engine thread when the child exits or the
    /// read loop fails. It must hand off to the owning thread (post an
    /// event, set a flag) rather than calling [`Session::close`] itself;
    /// a thread cannot join on its own completion.
    pub fn spawn(
        engine: Box<dyn Engine + Send>,
        options: PtyOptions,
        size: TermSize,
        on_exit: impl FnOnce() + Send + 'static,
    ) -> Result<Self, PtyError> {
        let size = size.clamped();
        let pty = Pty::new(options, size)?;
        let shared = Arc::new(FairMutex::new(SharedTerminalState::new(size)));
        let writer = pty.writer()?;
        let adapter = Arc::new(Mutex::new(EngineAdapter::new(
            engine,
            size,
            Box::new(writer),
            Arc::clone(&shared),
        )));

        let poller = Arc::new(Poller::new()?);
        let file = pty.reader()?;
        unsafe {
            poller.add_with_mode(&file, Event::readable(PTY_READ_TOKEN), PollMode::Level)?;
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let exited = Arc::new(AtomicBool::new(false));
        let pending_resize = Arc::new(Mutex::new(None));

        let read_loop = ReadLoop {
            file,
            poller: Arc::clone(&poller),
            adapter: Arc::clone(&adapter),
            shutdown: Arc::clone(&shutdown),
            exited: Arc::clone(&exited),
            pending_resize: Arc::clone(&pending_resize),
        };
        let reader = std::thread::Builder::new()
            .name("termlink-engine".into())
            .spawn(move || read_loop.run(on_exit))?;

        Ok(Self {
            adapter,
            shared,
            pty: Some(pty),
            poller,
            shutdown,
            exited,
            pending_resize,
            reader: Some(reader),
        })
    }

    /// The shared state this session renders from.
    #[must_use]
    pub fn shared(&self) -> Arc<FairMutex<SharedTerminalState>> {
        Arc::clone(&self.shared)
    }

    /// Drain everything that changed since the previous drain.
    pub fn drain(&self) -> SurfaceUpdate {
        self.shared.with(SharedTerminalState::drain)
    }

    /// Translate and inject a host key event.
    pub fn handle_key_down(&self, key: KeyEvent) {
        self.adapter.lock().handle_key_down(key);
    }

    /// Translate and inject a host mouse event.
    pub fn handle_mouse(&self, event: MouseEvent) {
        self.adapter.lock().handle_mouse(event);
    }

    /// Forward a focus change.
    pub fn set_focus(&self, focused: bool) {
        self.adapter.lock().set_focus(focused);
    }

    /// Propagate a new size.
    ///
    /// The kernel-side PTY is resized immediately; the engine resize is
    /// applied now when the engine thread is idle, otherwise parked for
    /// the engine thread to apply on its next wakeup. The UI thread never
    /// blocks on the engine thread, so a render may observe the old
    /// surface size until the next damage callback.
    pub fn resize(&self, size: TermSize) {
        let size = size.clamped();
        if let Some(pty) = &self.pty {
            if let Err(err) = pty.resize(size) {
                error!("PTY resize failed: {err}");
            }
        }
        match self.adapter.try_lock() {
            Some(mut adapter) => adapter.set_size(size),
            None => {
                *self.pending_resize.lock() = Some(size);
                let _ = self.poller.notify();
            }
        }
    }

    /// Whether the read loop observed child exit.
    #[must_use]
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    /// Stop the engine thread, then reap the child and release the PTY.
    ///
    /// Idempotent. Must be called from a thread other than the engine
    /// thread; `on_exit` handlers hand off instead of calling this
    /// directly.
    pub fn close(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.poller.notify();
        if let Some(reader) = self.reader.take() {
            if let Err(err) = reader.join() {
                error!("engine thread panicked: {err:?}");
            }
        }
        // SIGHUP + reap, exactly once, after the loop has stopped.
        self.pty = None;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/// State moved onto the engine thread.
struct ReadLoop {
    file: File,
    poller: Arc<Poller>,
    adapter: Arc<Mutex<EngineAdapter>>,
    shutdown: Arc<AtomicBool>,
    exited: Arc<AtomicBool>,
    pending_resize: Arc<Mutex<Option<TermSize>>>,
}

impl ReadLoop {
    fn run(mut self, on_exit: impl FnOnce()) {
        let mut buf = [0u8; READ_BUFFER_SIZE];
        let mut events = Events::new();
        let mut child_gone = false;

        'outer: while !self.shutdown.load(Ordering::Acquire) {
            // A resize parked by the UI thread while we held the adapter.
            if let Some(size) = self.pending_resize.lock().take() {
                self.adapter.lock().set_size(size);
            }

            events.clear();
            if let Err(err) = self.poller.wait(&mut events, None) {
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                error!("PTY poll failed: {err}");
                break;
            }

            for event in events.iter() {
                if event.key != PTY_READ_TOKEN {
                    continue;
                }
                // Read outside any lock; the master is readable, so this
                // does not block the UI thread's input path.
                match read_master(&mut self.file, &mut buf) {
                    Ok(0) => {
                        child_gone = true;
                        break 'outer;
                    }
                    Ok(n) => {
                        let mut adapter = self.adapter.lock();
                        adapter.receive_from_child(&buf[..n]);
                        adapter.flush_damage();
                    }
                    Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
                    Err(err) => {
                        error!("PTY read failed: {err}");
                        child_gone = true;
                        break 'outer;
                    }
                }
            }
        }

        let _ = self.poller.delete(&self.file);
        if child_gone {
            self.exited.store(true, Ordering::Release);
            on_exit();
        }
    }
}
