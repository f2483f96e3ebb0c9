use std::io;
use std::os::fd::AsFd;

use anyhow::{Context, Result};
use nix::sys::termios::{LocalFlags, SetArg, SpecialCharacterIndices, Termios, tcgetattr, tcsetattr};
use tracing::debug;

/// Turns off echo and line buffering on stdin until restored or dropped.
pub struct TerminalGuard {
    original: Termios,
    restored: bool,
}

impl TerminalGuard {
    pub fn enable() -> Result<Self> {
        let stdin = io::stdin();
        let original = tcgetattr(stdin.as_fd()).context("could not get terminal attributes")?;

        let mut unbuffered = original.clone();
        unbuffered
            .local_flags
            .remove(LocalFlags::ECHO | LocalFlags::ICANON);
        unbuffered.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        unbuffered.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        tcsetattr(stdin.as_fd(), SetArg::TCSAFLUSH, &unbuffered)
            .context("could not set terminal attributes")?;

        debug!("terminal echo and line buffering disabled");
        Ok(Self {
            original,
            restored: false,
        })
    }

    pub fn restore(mut self) -> Result<()> {
        self.restored = true;
        self.apply_original()
            .context("could not reset terminal, use `reset` to do it manually")
    }

    fn apply_original(&self) -> Result<()> {
        tcsetattr(io::stdin().as_fd(), SetArg::TCSAFLUSH, &self.original)?;
        debug!("terminal attributes restored");
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(err) = self.apply_original() {
            eprintln!("error: could not reset terminal ({err}), use `reset` to do it manually");
        }
    }
}
