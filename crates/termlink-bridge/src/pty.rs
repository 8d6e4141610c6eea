//! Unix PTY transport.
//!
//! Owns the master descriptor and the child process handle for one
//! session. Spawning either yields a fully valid [`Pty`] or an error with
//! every intermediate descriptor already closed; teardown (SIGHUP plus
//! reap) happens exactly once, on drop.

use std::ffi::CStr;
use std::ffi::CString;
use std::fs::File;
use std::io::{self, Read, Write};
use std::mem::MaybeUninit;
use std::os::fd::AsRawFd;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command};
use std::{env, ptr};

use libc::{c_int, TIOCSCTTY, TIOCSWINSZ};
use rustix_openpty::openpty;
use rustix_openpty::rustix::termios::Winsize;
use termlink_core::TermSize;

/// Shell program and arguments for the child.
#[derive(Debug, Clone)]
pub struct Shell {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
}

impl Shell {
    /// A program with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }
}

/// Child setup hook, run between fork and exec.
pub type ChildSetup = Box<dyn FnMut() -> io::Result<()> + Send + Sync>;

/// Options for spawning the child process.
#[derive(Default)]
pub struct PtyOptions {
    /// Program to run; falls back to `$SHELL`, then the passwd entry,
    /// then `/bin/sh`.
    pub shell: Option<Shell>,
    /// Child working directory.
    pub working_directory: Option<PathBuf>,
    /// Extra environment variables; these override the defaults
    /// (`TERM=xterm-256color`, `COLORTERM=truecolor`).
    pub env: Vec<(String, String)>,
    /// Hook run in the child after the PTY is wired up, before exec.
    pub child_setup: Option<ChildSetup>,
}

/// Error allocating a PTY or spawning the child.
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("failed to open PTY: {0}")]
    Openpty(io::Error),
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Set the controlling terminal for the child process.
fn set_controlling_terminal(fd: c_int) -> io::Result<()> {
    let res = unsafe {
        #[allow(clippy::cast_lossless)]
        libc::ioctl(fd, TIOCSCTTY as _, 0)
    };
    if res == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

/// The login shell recorded in the passwd database for the current user.
fn passwd_shell(buf: &mut [i8; 1024]) -> io::Result<String> {
    let mut entry: MaybeUninit<libc::passwd> = MaybeUninit::uninit();
    let mut res: *mut libc::passwd = ptr::null_mut();

    let uid = unsafe { libc::getuid() };
    let status = unsafe {
        libc::getpwuid_r(
            uid,
            entry.as_mut_ptr(),
            buf.as_mut_ptr() as *mut _,
            buf.len(),
            &mut res,
        )
    };
    if status != 0 || res.is_null() {
        return Err(io::Error::other("getpwuid_r failed"));
    }
    let entry = unsafe { entry.assume_init() };
    let shell = unsafe { CStr::from_ptr(entry.pw_shell) };
    shell
        .to_str()
        .map(str::to_owned)
        .map_err(|_| io::Error::other("non-UTF-8 shell in passwd entry"))
}

/// Default child program: `$SHELL`, the passwd entry, or `/bin/sh`.
fn default_shell() -> Shell {
    let mut buf = [0i8; 1024];
    let program = env::var("SHELL")
        .ok()
        .or_else(|| passwd_shell(&mut buf).ok())
        .unwrap_or_else(|| "/bin/sh".into());
    Shell::new(program)
}

fn to_winsize(size: TermSize) -> Winsize {
    Winsize {
        ws_row: size.rows,
        ws_col: size.cols,
        ws_xpixel: 0,
        ws_ypixel: 0,
    }
}

/// A pseudo-terminal master plus the child it is attached to.
pub struct Pty {
    child: Child,
    file: File,
}

impl Pty {
    /// Allocate a PTY pair and spawn the child attached to the slave side.
    pub fn new(mut options: PtyOptions, size: TermSize) -> Result<Self, PtyError> {
        let pty = openpty(None, Some(&to_winsize(size.clamped())))
            .map_err(|err| PtyError::Openpty(err.into()))?;
        let (master, slave) = (pty.controller, pty.user);
        let master_fd = master.as_raw_fd();
        let slave_fd = slave.as_raw_fd();

        let shell = options.shell.take().unwrap_or_else(default_shell);
        let mut builder = Command::new(&shell.program);
        builder.args(&shell.args);

        // Child stdio is the slave side of the pair.
        builder.stdin(slave.try_clone()?);
        builder.stderr(slave.try_clone()?);
        builder.stdout(slave);

        builder.env("TERM", "xterm-256color");
        builder.env("COLORTERM", "truecolor");
        for (key, value) in &options.env {
            builder.env(key, value);
        }

        let working_directory = options
            .working_directory
            .as_ref()
            .and_then(|path| CString::new(path.as_os_str().as_bytes()).ok());
        let mut child_setup = options.child_setup.take();

        unsafe {
            builder.pre_exec(move || {
                // New session, with the slave as controlling terminal.
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }

                // Set working directory, ignoring invalid paths.
                if let Some(dir) = working_directory.as_ref() {
                    libc::chdir(dir.as_ptr());
                }

                set_controlling_terminal(slave_fd)?;

                // No longer need slave/master fds.
                libc::close(slave_fd);
                libc::close(master_fd);

                // Reset signal handlers to defaults.
                libc::signal(libc::SIGCHLD, libc::SIG_DFL);
                libc::signal(libc::SIGHUP, libc::SIG_DFL);
                libc::signal(libc::SIGINT, libc::SIG_DFL);
                libc::signal(libc::SIGQUIT, libc::SIG_DFL);
                libc::signal(libc::SIGTERM, libc::SIG_DFL);
                libc::signal(libc::SIGALRM, libc::SIG_DFL);

                if let Some(setup) = child_setup.as_mut() {
                    setup()?;
                }

                Ok(())
            });
        }

        match builder.spawn() {
            Ok(child) => Ok(Pty {
                child,
                file: File::from(master),
            }),
            // `master` and `slave` close on drop; nothing leaks.
            Err(source) => Err(PtyError::Spawn {
                program: shell.program,
                source,
            }),
        }
    }

    /// The master-side file handle.
    #[must_use]
    pub fn file(&self) -> &File {
        &self.file
    }

    /// An independent handle to the master for reading on another thread.
    pub fn reader(&self) -> io::Result<File> {
        self.file.try_clone()
    }

    /// An independent handle to the master for child-bound writes.
    pub fn writer(&self) -> io::Result<File> {
        self.file.try_clone()
    }

    /// Child process id.
    #[must_use]
    pub fn child_id(&self) -> u32 {
        self.child.id()
    }

    /// Read child output from the master.
    ///
    /// Transient interrupts are retried transparently. `Ok(0)` means the
    /// child exited (EOF, or the EIO some kernels report once the slave
    /// side is gone) and is the session-ended sentinel, not an error.
    pub fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_master(&mut self.file, buf)
    }

    /// Write child-bound bytes to the master.
    ///
    /// One write attempt with transient-interrupt retry; partial writes
    /// are returned for the caller to retry.
    pub fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        loop {
            match self.file.write(bytes) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    /// Propagate new window dimensions to the kernel-side PTY so the
    /// child's own row/col queries reflect reality.
    pub fn resize(&self, size: TermSize) -> io::Result<()> {
        let win = to_winsize(size.clamped());
        let res = unsafe { libc::ioctl(self.file.as_raw_fd(), TIOCSWINSZ, &win as *const _) };
        if res < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// Shared read path for the owning handle and cloned reader handles.
pub(crate) fn read_master(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match file.read(buf) {
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) if err.raw_os_error() == Some(libc::EIO) => return Ok(0),
            other => return other,
        }
    }
}

impl Drop for Pty {
    fn drop(&mut self) {
        // Hang up, then reap. Drop runs exactly once per handle, on every
        // exit path.
        unsafe {
            #[allow(clippy::cast_possible_wrap)]
            libc::kill(self.child.id() as i32, libc::SIGHUP);
        }
        let _ = self.child.wait();
    }
}
