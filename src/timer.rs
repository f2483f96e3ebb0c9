use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::debug;

use crate::clock::ClockTime;
use crate::command::Command;
use crate::render::{Frame, Renderer};
use crate::source::EventSource;

pub const DEFAULT_INCREMENT_SECS: u32 = 10;
const IDLE_POLL: Duration = Duration::from_millis(50);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RunState {
    Running,
    Paused,
    Quit,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CountMode {
    Down,
    Up,
}

impl CountMode {
    fn tick_delta(self) -> i64 {
        match self {
            CountMode::Down => -1,
            CountMode::Up => 1,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimerOutcome {
    Expired,
    Quit,
}

#[derive(Copy, Clone, Debug)]
pub struct TimerSettings {
    pub mode: CountMode,
    pub increment_secs: u32,
    pub tick: Duration,
}

impl TimerSettings {
    pub fn idle_poll(&self) -> Duration {
        self.tick.min(IDLE_POLL)
    }
}

/// Mutable state of one timer run.
///
/// While lap is held the display shows `last_rendered`, which stops following
/// `time` until lap is released.
#[derive(Clone, Debug)]
pub struct TimerState {
    initial: ClockTime,
    time: ClockTime,
    run: RunState,
    lap_held: bool,
    last_rendered: ClockTime,
}

impl TimerState {
    pub fn new(initial: ClockTime) -> Self {
        Self {
            initial,
            time: initial,
            run: RunState::Running,
            lap_held: false,
            last_rendered: initial,
        }
    }

    pub fn time(&self) -> ClockTime {
        self.time
    }

    pub fn apply(&mut self, command: Command, increment_secs: u32) {
        match command {
            Command::TogglePause => {
                self.run = match self.run {
                    RunState::Running => RunState::Paused,
                    RunState::Paused => RunState::Running,
                    RunState::Quit => RunState::Quit,
                };
            }
            Command::ToggleLap => {
                self.lap_held = !self.lap_held;
                self.last_rendered = self.time;
            }
            Command::Increment => {
                self.time = self.time.normalize(i64::from(increment_secs));
            }
            Command::Reset => {
                self.time = self.initial;
                self.last_rendered = self.initial;
            }
            Command::Quit => self.run = RunState::Quit,
        }
    }

    pub fn advance(&mut self, delta_seconds: i64) {
        self.time = self.time.normalize(delta_seconds);
    }

    fn frame(&mut self) -> Frame {
        if !self.lap_held {
            self.last_rendered = self.time;
        }
        Frame {
            time: self.last_rendered,
            running: self.run == RunState::Running,
            lap_held: self.lap_held,
        }
    }
}

pub struct Timer<S> {
    state: TimerState,
    settings: TimerSettings,
    source: S,
    renderer: Renderer,
}

impl<S: EventSource> Timer<S> {
    pub fn new(initial: ClockTime, settings: TimerSettings, source: S, renderer: Renderer) -> Self {
        Self {
            state: TimerState::new(initial),
            settings,
            source,
            renderer,
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    /// Runs until the countdown passes zero or a quit command arrives.
    ///
    /// A quit polled on the same tick the countdown expires takes priority.
    pub fn run(&mut self) -> Result<TimerOutcome> {
        let outcome = self.run_loop()?;
        self.renderer.finish()?;
        Ok(outcome)
    }

    fn run_loop(&mut self) -> Result<TimerOutcome> {
        let delta = self.settings.mode.tick_delta();
        let mut redraw = true;
        let mut next_tick = Instant::now();

        loop {
            let expired = self.settings.mode == CountMode::Down && self.state.time.is_expired();
            if let Some(command) = self.source.poll_command()?
                && (command == Command::Quit || !expired)
            {
                debug!(?command, time = %self.state.time, "applying command");
                self.state.apply(command, self.settings.increment_secs);
                redraw = true;
            }

            if self.state.run == RunState::Quit {
                return Ok(TimerOutcome::Quit);
            }
            if expired {
                return Ok(TimerOutcome::Expired);
            }

            if self.state.run == RunState::Running {
                let frame = self.state.frame();
                self.renderer.render(&frame)?;
                self.state.advance(delta);
                redraw = false;
                next_tick = next_deadline(next_tick, self.settings.tick, Instant::now());
                sleep_until(next_tick);
            } else {
                if redraw {
                    let frame = self.state.frame();
                    self.renderer.render(&frame)?;
                    redraw = false;
                }
                let idle = self.settings.idle_poll();
                if !idle.is_zero() {
                    thread::sleep(idle);
                }
                next_tick = Instant::now();
            }
        }
    }
}

/// Ticks are paced against a deadline so render time does not accumulate as drift.
/// A deadline more than one tick in the past (suspend, stopped process) is dropped.
fn next_deadline(previous: Instant, tick: Duration, now: Instant) -> Instant {
    let next = previous + tick;
    if now.saturating_duration_since(next) > tick {
        now + tick
    } else {
        next
    }
}

fn sleep_until(deadline: Instant) {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if !remaining.is_zero() {
        thread::sleep(remaining);
    }
}
