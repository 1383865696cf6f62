//! Zero-downtime process handoff.
//!
//! # Responsibilities
//! - Spawn a replacement process holding a duplicate of the listening
//!   socket at a fixed descriptor slot
//! - Let a replacement tell its parent to retire
//!
//! # Design Decisions
//! - The replacement is the same executable with the same arguments;
//!   only `MINI_GATEWAY_CONTINUE=<parent pid>` is added to its environment
//! - The duplicate lands at descriptor 3 in the child only; the parent's
//!   copy is closed once the child is running
//! - A replacement only signals the process named in the marker, and only
//!   while that process is still its parent
//! - The parent reaps the child on a dedicated thread and logs its exit

use std::ffi::OsString;
use std::net::TcpListener as StdTcpListener;
use std::path::PathBuf;
use std::sync::Arc;

use crate::lifecycle::LifecycleError;

/// Environment variable marking a replacement process. Holds the pid of
/// the process that spawned it.
pub const CONTINUE_ENV: &str = "MINI_GATEWAY_CONTINUE";

/// Descriptor slot the listening socket occupies in a replacement.
pub const INHERITED_FD: i32 = 3;

/// Whether this process was started as a replacement.
pub fn is_replacement() -> bool {
    std::env::var_os(CONTINUE_ENV).is_some_and(|v| !v.is_empty())
}

/// Mechanism for handing the listening socket to a new process.
pub trait Handoff: Send + Sync {
    /// Start a replacement sharing `listener`. Returns its process id.
    fn spawn_replacement(&self, listener: &StdTcpListener) -> Result<u32, LifecycleError>;

    /// Called by a replacement once it is serving.
    fn notify_parent(&self) -> Result<(), LifecycleError>;
}

/// Handoff for the current platform, re-executing the running binary.
pub fn default_handoff() -> Result<Arc<dyn Handoff>, LifecycleError> {
    #[cfg(unix)]
    {
        Ok(Arc::new(ProcessHandoff::current()?))
    }
    #[cfg(not(unix))]
    {
        Ok(Arc::new(UnsupportedHandoff))
    }
}

/// Re-executes a program with the socket installed at [`INHERITED_FD`].
#[derive(Debug, Clone)]
pub struct ProcessHandoff {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessHandoff {
    pub fn new(program: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// The running executable with the arguments it was started with.
    pub fn current() -> Result<Self, LifecycleError> {
        let program = std::env::current_exe().map_err(LifecycleError::Spawn)?;
        Ok(Self::new(program, std::env::args_os().skip(1).collect()))
    }
}

#[cfg(unix)]
impl Handoff for ProcessHandoff {
    fn spawn_replacement(&self, listener: &StdTcpListener) -> Result<u32, LifecycleError> {
        use nix::fcntl::{fcntl, FcntlArg, FdFlag};
        use nix::unistd::dup2;
        use std::os::fd::AsRawFd;
        use std::os::unix::process::CommandExt;
        use std::process::Command;

        let duplicate = listener.try_clone().map_err(LifecycleError::Spawn)?;
        let fd = duplicate.as_raw_fd();

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env(CONTINUE_ENV, std::process::id().to_string());

        // SAFETY: the hook only calls async-signal-safe dup2/fcntl.
        unsafe {
            command.pre_exec(move || {
                if fd == INHERITED_FD {
                    fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty()))?;
                } else {
                    dup2(fd, INHERITED_FD)?;
                }
                Ok(())
            });
        }

        let child = command.spawn().map_err(LifecycleError::Spawn)?;
        drop(duplicate);

        let pid = child.id();
        tracing::info!(pid, program = %self.program.display(), "Replacement process spawned");

        let reaper = std::thread::Builder::new()
            .name(format!("reap-{}", pid))
            .spawn(move || reap(child));
        if let Err(e) = reaper {
            tracing::warn!(pid, error = %e, "Failed to start reaper for replacement process");
        }
        Ok(pid)
    }

    fn notify_parent(&self) -> Result<(), LifecycleError> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::{getppid, Pid};

        let parent = getppid().as_raw();
        let marker = std::env::var(CONTINUE_ENV).ok();

        match parent_to_retire(marker.as_deref(), parent) {
            Some(pid) => {
                kill(Pid::from_raw(pid), Signal::SIGTERM)
                    .map_err(|e| LifecycleError::Notify(e.to_string()))?;
                tracing::info!(parent = pid, "Parent asked to drain");
            }
            None => tracing::warn!(
                parent,
                marker = ?marker,
                "Spawning process is no longer our parent, nothing to retire"
            ),
        }
        Ok(())
    }
}

/// Pid to signal on takeover: the one in the marker, if it is still `parent`.
#[cfg_attr(not(unix), allow(dead_code))]
fn parent_to_retire(marker: Option<&str>, parent: i32) -> Option<i32> {
    let pid: i32 = marker?.trim().parse().ok()?;
    (pid > 1 && pid == parent).then_some(pid)
}

#[cfg(unix)]
fn reap(mut child: std::process::Child) {
    let pid = child.id();
    match child.wait() {
        Ok(status) if status.success() => tracing::info!(pid, "Replacement process exited"),
        Ok(status) => tracing::error!(pid, status = %status, "Replacement process failed"),
        Err(e) => tracing::warn!(pid, error = %e, "Failed to wait on replacement process"),
    }
}

#[cfg(not(unix))]
impl Handoff for ProcessHandoff {
    fn spawn_replacement(&self, listener: &StdTcpListener) -> Result<u32, LifecycleError> {
        UnsupportedHandoff.spawn_replacement(listener)
    }

    fn notify_parent(&self) -> Result<(), LifecycleError> {
        UnsupportedHandoff.notify_parent()
    }
}

/// Handoff for platforms without descriptor inheritance. Only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedHandoff;

impl Handoff for UnsupportedHandoff {
    fn spawn_replacement(&self, _listener: &StdTcpListener) -> Result<u32, LifecycleError> {
        tracing::warn!("Zero-downtime restart is not supported on this platform");
        Err(LifecycleError::Unsupported)
    }

    fn notify_parent(&self) -> Result<(), LifecycleError> {
        Ok(())
    }
}
