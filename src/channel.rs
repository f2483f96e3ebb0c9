use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use tracing::{debug, warn};

pub const DEFAULT_FIFO_BASE: &str = "/tmp/minitimer.";

/// Named pipe other processes write single command characters into.
///
/// The pipe is unlinked when the channel is dropped.
pub struct ControlChannel {
    path: PathBuf,
    file: File,
}

impl ControlChannel {
    pub fn path_for(base: &str, pid: u32) -> PathBuf {
        PathBuf::from(format!("{base}{pid}"))
    }

    pub fn create(base: &str) -> Result<Self> {
        Self::create_at(Self::path_for(base, std::process::id()))
    }

    pub fn create_at(path: PathBuf) -> Result<Self> {
        mkfifo(path.as_path(), Mode::S_IRUSR | Mode::S_IWUSR)
            .with_context(|| format!("could not create control channel {}", path.display()))?;

        // Read-write so the pipe never reports end-of-file between writers.
        let opened = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(OFlag::O_NONBLOCK.bits())
            .open(&path);
        let file = match opened {
            Ok(file) => file,
            Err(err) => {
                if let Err(remove_err) = fs::remove_file(&path) {
                    warn!(path = %path.display(), "failed to remove control channel: {remove_err}");
                }
                return Err(err)
                    .with_context(|| format!("could not open control channel {}", path.display()));
            }
        };

        debug!(path = %path.display(), "control channel created");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads one pending byte without blocking.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut buf = [0_u8; 1];
        match self.file.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(None)
            }
            Err(err) => Err(err)
                .with_context(|| format!("could not read control channel {}", self.path.display())),
        }
    }
}

impl AsFd for ControlChannel {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl Drop for ControlChannel {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "control channel removed"),
            Err(err) => warn!(path = %self.path.display(), "failed to remove control channel: {err}"),
        }
    }
}
