use std::ffi::CString;
use std::os::fd::{AsRawFd, BorrowedFd, RawFd};
use std::os::unix::ffi::OsStrExt;

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{dup2, execvp, fork, ForkResult, Pid};
use tracing::debug;

use crate::command::Command;
use crate::error::{ExecError, LaunchError, SpawnError};
use crate::pipe::Pipe;

const EXIT_NOT_FOUND: i32 = 127;
const EXIT_CANNOT_EXEC: i32 = 126;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
    pid: Pid,
}

impl ProcessHandle {
    pub fn new(pid: Pid) -> Self {
        ProcessHandle { pid }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }
}

/// OS process-spawning service used by the executor.
///
/// `spawn_stage` starts `command` with its stdin/stdout replaced by the given
/// descriptors (or inherited when `None`). Callers keep ownership of the
/// descriptors and close their own copies afterwards.
pub trait Spawner {
    fn open_pipe(&mut self) -> Result<Pipe, ExecError> {
        Pipe::open()
    }

    fn spawn_stage(
        &mut self,
        command: &Command,
        stdin: Option<BorrowedFd<'_>>,
        stdout: Option<BorrowedFd<'_>>,
    ) -> Result<ProcessHandle, SpawnError>;

    fn wait(&mut self, handle: ProcessHandle) -> Result<WaitStatus, ExecError>;
}

/// fork + dup2 + execvp.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForkSpawner;

impl Spawner for ForkSpawner {
    fn spawn_stage(
        &mut self,
        command: &Command,
        stdin: Option<BorrowedFd<'_>>,
        stdout: Option<BorrowedFd<'_>>,
    ) -> Result<ProcessHandle, SpawnError> {
        let program = command.program();
        if program.is_empty() {
            return Err(LaunchError::NotFound(String::new()).into());
        }
        // everything the child needs is allocated here, before the fork
        let argv = command
            .arguments
            .iter()
            .map(|a| CString::new(a.as_bytes()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| LaunchError::Nul(program.to_string_lossy().into_owned()))?;
        let mut not_found = b"tsh: command not found: ".to_vec();
        not_found.extend_from_slice(program.as_bytes());
        not_found.push(b'\n');
        let stdin = stdin.map(|fd| fd.as_raw_fd());
        let stdout = stdout.map(|fd| fd.as_raw_fd());

        // SAFETY: until exec or _exit the child only makes async-signal-safe calls
        let forked = unsafe { fork() }.map_err(ExecError::Fork)?;
        match forked {
            ForkResult::Parent { child } => {
                debug!(pid = %child, program = %program.to_string_lossy(), ?stdin, ?stdout, "spawned stage");
                Ok(ProcessHandle::new(child))
            }
            ForkResult::Child => exec_child(&argv, stdin, stdout, &not_found),
        }
    }

    fn wait(&mut self, handle: ProcessHandle) -> Result<WaitStatus, ExecError> {
        loop {
            match waitpid(handle.pid, None) {
                Ok(status) => {
                    debug!(pid = %handle.pid, ?status, "reaped stage");
                    return Ok(status);
                }
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(ExecError::Wait(e)),
            }
        }
    }
}

fn exec_child(argv: &[CString], stdin: Option<RawFd>, stdout: Option<RawFd>, not_found: &[u8]) -> ! {
    // the Rust runtime ignores SIGPIPE and exec would pass that on; producers
    // must die quietly when their consumer goes away
    // SAFETY: installing SIG_DFL runs no handler code
    let _ = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) };
    if let Some(fd) = stdin {
        redirect(fd, libc::STDIN_FILENO);
    }
    if let Some(fd) = stdout {
        redirect(fd, libc::STDOUT_FILENO);
    }
    // pipe descriptors are O_CLOEXEC: the copies inherited from the parent close here
    let err = match execvp(&argv[0], argv) {
        Ok(never) => match never {},
        Err(e) => e,
    };
    if err == Errno::ENOENT {
        write_stderr(not_found);
        exit_child(EXIT_NOT_FOUND);
    }
    write_stderr(b"tsh: exec failed: ");
    write_stderr(err.desc().as_bytes());
    write_stderr(b"\n");
    exit_child(EXIT_CANNOT_EXEC)
}

fn redirect(fd: RawFd, target: RawFd) {
    let res = if fd == target {
        // dup2 onto itself keeps FD_CLOEXEC, so clear it by hand
        fcntl(fd, FcntlArg::F_SETFD(FdFlag::empty())).map(|_| ())
    } else {
        dup2(fd, target).map(|_| ())
    };
    if let Err(e) = res {
        write_stderr(b"tsh: dup2 failed: ");
        write_stderr(e.desc().as_bytes());
        write_stderr(b"\n");
        exit_child(EXIT_CANNOT_EXEC);
    }
}

fn write_stderr(buf: &[u8]) {
    // SAFETY: plain write(2) on a valid buffer
    let _ = unsafe { libc::write(libc::STDERR_FILENO, buf.as_ptr().cast(), buf.len()) };
}

fn exit_child(code: i32) -> ! {
    // SAFETY: _exit skips atexit handlers and stdio flushing that belong to the parent
    unsafe { libc::_exit(code) }
}
