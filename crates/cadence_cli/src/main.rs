//! Cadence CLI
//!
//! Drive keyframe animations headlessly and inspect the values they produce.

use anyhow::Result;
use cadence_animation::{FrameClock, FrameScheduler};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod scenario;

use config::AnimationFile;
use scenario::Scenario;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cadence keyframe animation CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an animation and print every delivered sample as a JSON line
    Run {
        /// Animation definition (TOML)
        file: PathBuf,

        /// Scenario of host steps (JSON); defaults to playing until settled
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Frame rate used when no scenario is given
        #[arg(long, default_value = "60")]
        fps: u32,

        /// Frame limit used when no scenario is given
        #[arg(long, default_value = "10000")]
        max_frames: usize,
    },

    /// Validate an animation definition and print its timing
    Check {
        /// Animation definition (TOML)
        file: PathBuf,
    },
}

/// One delivered output value
#[derive(Debug, Clone, Copy, Serialize)]
struct Sample {
    time_ms: f64,
    value: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            file,
            scenario,
            fps,
            max_frames,
        } => cmd_run(&file, scenario.as_deref(), fps, max_frames),
        Commands::Check { file } => cmd_check(&file),
    }
}

fn cmd_run(file: &Path, scenario: Option<&Path>, fps: u32, max_frames: usize) -> Result<()> {
    if fps == 0 {
        anyhow::bail!("--fps must be greater than zero");
    }

    let definition = AnimationFile::load(file)?;
    let scenario = match scenario {
        Some(path) => Scenario::from_path(path)?,
        None => Scenario::until_settled(1000.0 / fps as f64, max_frames),
    };

    let clock = FrameScheduler::new();
    let samples = Arc::new(Mutex::new(Vec::new()));
    let sink = samples.clone();
    let output_clock = clock.clone();
    let animation = definition.build(clock.clone(), move |value| {
        let sample = Sample {
            time_ms: output_clock.now(),
            value,
        };
        if let Ok(mut samples) = sink.lock() {
            samples.push(sample);
        }
    })?;

    info!(
        file = %file.display(),
        steps = scenario.steps.len(),
        "running animation"
    );
    let report = scenario::run(&scenario, &animation, &clock);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let samples = samples
        .lock()
        .map_err(|_| anyhow::anyhow!("sample buffer poisoned"))?;
    for sample in samples.iter() {
        writeln!(out, "{}", serde_json::to_string(sample)?)?;
    }
    writeln!(out, "{}", serde_json::to_string(&report)?)?;

    info!(
        samples = samples.len(),
        frames = report.frames,
        completion = %report.completion,
        "done"
    );
    Ok(())
}

fn cmd_check(file: &Path) -> Result<()> {
    let definition = AnimationFile::load(file)?;
    let animation = definition.build(FrameScheduler::new(), |_| {})?;
    let timing = animation.timing();

    println!("{}", file.display());
    println!(
        "  keyframes:      {} ({} after easing)",
        definition.keyframes.len(),
        animation.keyframe_count()
    );
    println!("  duration:       {:.3}s", timing.duration());
    println!("  delay:          {:.3}s", timing.delay());
    println!("  end delay:      {:.3}s", timing.end_delay());
    println!("  repeat:         {}", timing.repeat());
    println!("  direction:      {:?}", timing.direction());
    println!("  total duration: {:.3}s", timing.total_duration());
    println!("  start value:    {}", animation.value_at(0.0));
    println!("  end value:      {}", animation.value_at(1.0));

    Ok(())
}
