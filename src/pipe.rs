use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use nix::fcntl::OFlag;
use nix::unistd::pipe2;

use crate::error::ExecError;

/// One OS pipe. Each end is released exactly once: either through `close`,
/// by taking it out, or when the `Pipe` is dropped.
///
/// Both ends are created close-on-exec. A forked child only keeps the end
/// it dup2'd onto its stdio; every other inherited copy goes away with exec.
#[derive(Debug)]
pub struct Pipe {
    read: Option<OwnedFd>,
    write: Option<OwnedFd>,
}

impl Pipe {
    pub fn open() -> Result<Self, ExecError> {
        let (read, write) = pipe2(OFlag::O_CLOEXEC).map_err(ExecError::Pipe)?;
        Ok(Pipe { read: Some(read), write: Some(write) })
    }

    pub fn read_end(&self) -> Option<BorrowedFd<'_>> {
        self.read.as_ref().map(|fd| fd.as_fd())
    }

    pub fn write_end(&self) -> Option<BorrowedFd<'_>> {
        self.write.as_ref().map(|fd| fd.as_fd())
    }

    pub fn take_read_end(&mut self) -> Option<OwnedFd> {
        self.read.take()
    }

    pub fn take_write_end(&mut self) -> Option<OwnedFd> {
        self.write.take()
    }

    pub fn close(&mut self) {
        drop(self.take_read_end());
        drop(self.take_write_end());
    }

    pub fn is_closed(&self) -> bool {
        self.read.is_none() && self.write.is_none()
    }
}
