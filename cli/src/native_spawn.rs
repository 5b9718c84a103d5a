//! Starting the target command using POSIX APIs.
//!
//! Two shapes:
//! - [`exec_replace`]: the launcher becomes the command (fixed shim path,
//!   nothing to clean up afterwards).
//! - [`fork_exec_wait`]: fork, the child becomes the command and the parent
//!   waits for it so the caller can remove the extracted shim.

use std::io;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Command, ExitStatus};

use log::{debug, warn};

use crate::error::{LaunchError, EXIT_FAILURE};

/// Replace the current process image with `command`.
///
/// Only returns if the exec failed.
pub fn exec_replace(command: &mut Command) -> LaunchError {
    let program = command.get_program().to_string_lossy().into_owned();
    debug!("Exec {}", program);

    let source = command.exec();
    LaunchError::Exec { program, source }
}

/// Fork, exec `command` in the child and wait for it in the parent.
///
/// The child never returns from this function: it either becomes the
/// command or exits with 127 after printing a diagnostic. Leaving via
/// `std::process::exit` skips destructors, so RAII state the caller holds
/// (the extracted shim) is only ever cleaned up by the parent.
pub fn fork_exec_wait(command: &mut Command) -> Result<ExitStatus, LaunchError> {
    // SAFETY: the launcher is single-threaded at this point.
    let pid = unsafe { libc::fork() };

    match pid {
        -1 => Err(LaunchError::Process {
            op: "fork",
            source: io::Error::last_os_error(),
        }),
        0 => {
            // Child process
            let err = exec_replace(command);
            eprintln!("nerfed: {}", err);
            std::process::exit(err.exit_code().into());
        }
        child_pid => {
            // Parent process
            debug!(
                "Spawned '{}' with PID {}",
                command.get_program().to_string_lossy(),
                child_pid
            );

            // Terminal interrupts go to the whole foreground process group.
            // Let the command decide what to do with them while we stay
            // alive to clean up.
            let _ignore = IgnoreInterrupts::new();
            wait_for(child_pid).map_err(|source| LaunchError::Process {
                op: "waitpid",
                source,
            })
        }
    }
}

fn wait_for(pid: libc::pid_t) -> io::Result<ExitStatus> {
    let mut status: libc::c_int = 0;
    loop {
        // SAFETY: `status` is a valid out pointer.
        let result = unsafe { libc::waitpid(pid, &mut status, 0) };
        if result == pid {
            return Ok(ExitStatus::from_raw(status));
        }

        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

/// The launcher's own exit code for a finished command.
///
/// A normal exit is passed through unchanged; death by signal N maps to
/// 128 + N, the way shells report it.
pub fn exit_code(status: ExitStatus) -> u8 {
    if let Some(code) = status.code() {
        return code as u8;
    }
    if let Some(signal) = status.signal() {
        warn!("Command terminated by signal {}", signal);
        return (128 + signal) as u8;
    }
    EXIT_FAILURE
}

/// Ignores SIGINT and SIGQUIT for its lifetime, like `system(3)` does.
struct IgnoreInterrupts {
    int: libc::sighandler_t,
    quit: libc::sighandler_t,
}

impl IgnoreInterrupts {
    fn new() -> Self {
        // SAFETY: installing SIG_IGN has no handler-safety requirements.
        unsafe {
            Self {
                int: libc::signal(libc::SIGINT, libc::SIG_IGN),
                quit: libc::signal(libc::SIGQUIT, libc::SIG_IGN),
            }
        }
    }
}

impl Drop for IgnoreInterrupts {
    fn drop(&mut self) {
        // SAFETY: restores the dispositions returned by `signal` above.
        unsafe {
            libc::signal(libc::SIGINT, self.int);
            libc::signal(libc::SIGQUIT, self.quit);
        }
    }
}
