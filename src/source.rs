use std::io;
use std::os::fd::{AsFd, AsRawFd};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use tracing::debug;

use crate::channel::ControlChannel;
use crate::command::Command;

/// Where the control loop gets its commands from. Polled once per tick and never blocks.
pub trait EventSource {
    fn poll_command(&mut self) -> Result<Option<Command>>;
}

/// Sets the returned flag when the process is asked to terminate.
pub fn register_shutdown_flag() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM, SIGHUP] {
        signal_hook::flag::register(signal, Arc::clone(&flag))
            .with_context(|| format!("could not register handler for signal {signal}"))?;
    }
    Ok(flag)
}

/// Keyboard, control channel and termination signals merged into one stream.
///
/// A pending signal always wins. Otherwise the keyboard is read before the
/// channel; whatever is not read stays queued for the next tick.
pub struct SystemEventSource {
    channel: ControlChannel,
    keyboard: bool,
    shutdown: Arc<AtomicBool>,
}

impl SystemEventSource {
    pub fn new(channel: ControlChannel, keyboard: bool, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            channel,
            keyboard,
            shutdown,
        }
    }

    pub fn channel(&self) -> &ControlChannel {
        &self.channel
    }

    fn pending_sources(&self) -> Result<(bool, bool)> {
        let stdin = io::stdin();
        let mut fds = vec![PollFd::new(self.channel.as_fd(), PollFlags::POLLIN)];
        if self.keyboard {
            fds.push(PollFd::new(stdin.as_fd(), PollFlags::POLLIN));
        }

        match poll(&mut fds, PollTimeout::ZERO) {
            Ok(_) => {}
            Err(Errno::EINTR) => return Ok((false, false)),
            Err(err) => return Err(err).context("could not poll for input"),
        }

        let ready = |fd: &PollFd<'_>| {
            fd.revents().is_some_and(|events| {
                events.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR)
            })
        };
        let channel_ready = ready(&fds[0]);
        let keyboard_ready = fds.get(1).is_some_and(ready);
        Ok((keyboard_ready, channel_ready))
    }

    fn read_keyboard(&mut self) -> Result<Option<u8>> {
        let mut buf = [0_u8; 1];
        match nix::unistd::read(io::stdin().as_raw_fd(), &mut buf) {
            Ok(0) => {
                debug!("stdin closed, keyboard commands disabled");
                self.keyboard = false;
                Ok(None)
            }
            Ok(_) => Ok(Some(buf[0])),
            Err(Errno::EAGAIN | Errno::EINTR) => Ok(None),
            Err(err) => Err(err).context("could not read keyboard input"),
        }
    }
}

impl EventSource for SystemEventSource {
    fn poll_command(&mut self) -> Result<Option<Command>> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Ok(Some(Command::Quit));
        }

        let (keyboard_ready, channel_ready) = self.pending_sources()?;
        let byte = if keyboard_ready {
            self.read_keyboard()?
        } else if channel_ready {
            self.channel.read_byte()?
        } else {
            None
        };

        Ok(byte.and_then(|byte| {
            let command = Command::from_byte(byte);
            if command.is_none() {
                debug!(byte, "ignoring unrecognized input");
            }
            command
        }))
    }
}
