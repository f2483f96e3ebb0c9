mod channel;
mod clock;
mod command;
mod config;
mod render;
mod source;
mod terminal;
mod timer;

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::Command as ShellCommand;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::channel::ControlChannel;
use crate::clock::ClockTime;
use crate::config::{TimerConfig, load_timer_config};
use crate::render::{DisplayMode, OutputFormat, RenderSettings, Renderer};
use crate::source::{SystemEventSource, register_shutdown_flag};
use crate::terminal::TerminalGuard;
use crate::timer::{CountMode, Timer, TimerOutcome, TimerSettings};

#[derive(Parser, Debug)]
#[command(
    name = "minitimer",
    version,
    about = "Terminal countdown timer and stopwatch",
    after_help = "Runtime commands (keyboard or control pipe): p/space pause, l lap, + increment, r reset, q quit"
)]
struct Cli {
    /// Initial time as HH:MM:SS (defaults to 00:00:00 with --up)
    #[arg(value_name = "HH:MM:SS", required_unless_present = "up")]
    time: Option<String>,

    /// Count up from the initial time instead of down
    #[arg(short, long)]
    up: bool,

    /// Text shown after the time
    #[arg(short = 'L', long)]
    label: Option<String>,

    /// Print every update on its own line instead of redrawing in place
    #[arg(short, long)]
    newline: bool,

    /// Shell command to run when the countdown expires
    #[arg(short, long, value_name = "CMD")]
    exec: Option<String>,

    /// Also append every update to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Control pipe path prefix; the process id is appended
    #[arg(long, value_name = "PATH")]
    fifo_base: Option<String>,

    /// printf-style format taking hours, minutes and seconds
    #[arg(long, value_name = "FMT")]
    format: Option<String>,

    /// Seconds added by the increment command
    #[arg(long, value_name = "SECS")]
    increment: Option<u32>,

    /// Marker shown before the time while the timer is running
    #[arg(long, value_name = "STR")]
    run_indicator: Option<String>,

    /// Marker shown before the time while a lap is held
    #[arg(long, value_name = "STR")]
    lap_indicator: Option<String>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    #[arg(long, default_value_t = 1_000, hide = true)]
    tick_ms: u64,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let initial = match cli.time.as_deref() {
        Some(text) => text
            .parse::<ClockTime>()
            .with_context(|| format!("invalid or ill-formed time '{text}' (must be HH:MM:SS)"))?,
        None => ClockTime::ZERO,
    };

    let file_config = match &cli.config {
        Some(path) => load_timer_config(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => TimerConfig::default(),
    };
    let config = merge_cli_overrides(file_config, &cli)?;
    let format = OutputFormat::parse(&config.output_format)
        .with_context(|| format!("invalid output format '{}'", config.output_format))?;

    let mut renderer = Renderer::new(RenderSettings {
        format,
        run_indicator: config.run_indicator,
        lap_indicator: config.lap_indicator,
        label: cli.label.clone(),
    });
    let stdout_mode = if cli.newline {
        DisplayMode::Line
    } else {
        DisplayMode::Overwrite
    };
    renderer.add_sink("stdout", Box::new(io::stdout()), stdout_mode);
    if let Some(path) = &cli.output {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("could not open output file {}", path.display()))?;
        renderer.add_sink(path.display().to_string(), Box::new(file), DisplayMode::Line);
    }

    let shutdown = register_shutdown_flag()?;
    let channel = ControlChannel::create(&config.fifo_base)?;
    let keyboard = io::stdin().is_terminal();
    let terminal = if keyboard {
        Some(TerminalGuard::enable()?)
    } else {
        info!("stdin is not a terminal, keyboard commands disabled");
        None
    };

    let settings = TimerSettings {
        mode: if cli.up { CountMode::Up } else { CountMode::Down },
        increment_secs: config.increment_secs,
        tick: Duration::from_millis(cli.tick_ms),
    };
    let source = SystemEventSource::new(channel, keyboard, shutdown);
    info!(
        path = %source.channel().path().display(),
        "listening for commands on control channel"
    );
    let mut timer = Timer::new(initial, settings, source, renderer);
    let outcome = timer.run();
    let final_time = timer.state().time();

    if let Some(guard) = terminal {
        guard.restore()?;
    }
    drop(timer);
    let outcome = outcome?;
    info!(?outcome, time = %final_time, "timer finished");

    if outcome == TimerOutcome::Expired
        && let Some(command) = cli.exec.as_deref()
    {
        run_expiry_command(command)?;
    }
    Ok(())
}

fn merge_cli_overrides(mut config: TimerConfig, cli: &Cli) -> Result<TimerConfig> {
    if cli.increment == Some(0) {
        bail!("--increment must be greater than zero");
    }
    if let Some(fifo_base) = &cli.fifo_base {
        config.fifo_base = fifo_base.clone();
    }
    if let Some(format) = &cli.format {
        config.output_format = format.clone();
    }
    if let Some(increment) = cli.increment {
        config.increment_secs = increment;
    }
    if let Some(indicator) = &cli.run_indicator {
        config.run_indicator = indicator.clone();
    }
    if let Some(indicator) = &cli.lap_indicator {
        config.lap_indicator = indicator.clone();
    }
    Ok(config)
}

fn run_expiry_command(command: &str) -> Result<()> {
    info!(command, "running expiry command");
    let status = ShellCommand::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .with_context(|| format!("could not run expiry command '{command}'"))?;
    if !status.success() {
        warn!(command, %status, "expiry command failed");
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "minitimer=debug"
    } else {
        "minitimer=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
