//! Kinetic CLI
//!
//! Runs a single spring or tween against the wall clock and prints every
//! frame it produces:
//!
//! ```text
//! kinetic spring --from 0 --to 100 --stiffness 0.2
//! kinetic tween --from 0 --to 1 --duration 300 --easing ease-out-cubic
//! ```
//!
//! Defaults come from `kinetic.toml` (or `--config <path>`); flags override them.

mod config;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config::{parse_easing, KineticConfig};
use kinetic_animation::{
    spring, tweened, Completion, FrameScheduler, SetOptions, TweenOverrides, Value,
};
use kinetic_core::{Subscribable, Unsubscriber};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Drive spring and tween animations from the command line
#[derive(Parser, Debug)]
#[command(name = "kinetic")]
#[command(about = "Run spring and tween animations and print their frames")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./kinetic.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Stop after this many frames even if the animation is still moving
    #[arg(long, global = true, default_value = "600")]
    max_frames: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Animate with spring physics
    Spring(SpringArgs),

    /// Animate with a timed tween
    Tween(TweenArgs),
}

#[derive(Args, Debug)]
struct SpringArgs {
    #[arg(long, allow_negative_numbers = true)]
    from: f64,

    #[arg(long, allow_negative_numbers = true)]
    to: f64,

    #[arg(long)]
    stiffness: Option<f64>,

    #[arg(long)]
    damping: Option<f64>,

    #[arg(long)]
    precision: Option<f64>,

    /// Snap to the target instead of animating
    #[arg(long)]
    hard: bool,
}

#[derive(Args, Debug)]
struct TweenArgs {
    #[arg(long, allow_negative_numbers = true)]
    from: f64,

    #[arg(long, allow_negative_numbers = true)]
    to: f64,

    /// Milliseconds
    #[arg(long)]
    duration: Option<f64>,

    /// Milliseconds
    #[arg(long)]
    delay: Option<f64>,

    /// Easing name, e.g. `ease-in-out-quad`
    #[arg(long)]
    easing: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("Failed to resolve working directory")?;
    let config = KineticConfig::discover(cli.config.as_deref(), &cwd)?;

    match cli.command {
        Commands::Spring(args) => run_spring(&config, args, cli.max_frames),
        Commands::Tween(args) => run_tween(&config, args, cli.max_frames),
    }
}

fn run_spring(config: &KineticConfig, args: SpringArgs, max_frames: usize) -> Result<()> {
    let mut options = config.spring.options();
    if let Some(stiffness) = args.stiffness {
        options = options.with_stiffness(stiffness);
    }
    if let Some(damping) = args.damping {
        options = options.with_damping(damping);
    }
    if let Some(precision) = args.precision {
        options = options.with_precision(precision);
    }
    tracing::info!(?options, from = args.from, to = args.to, "running spring");

    let store = spring(args.from, options);
    let _printer = print_frames(&store);
    let set = SetOptions {
        hard: args.hard,
        soft: None,
    };
    let done = store
        .set_with(args.to, set)
        .context("Failed to start spring")?;

    drive(done, max_frames)
}

fn run_tween(config: &KineticConfig, args: TweenArgs, max_frames: usize) -> Result<()> {
    let options = config.tween.options()?;
    let mut overrides = TweenOverrides::default();
    if let Some(duration) = args.duration {
        overrides = overrides.duration(duration);
    }
    if let Some(delay) = args.delay {
        overrides = overrides.delay(delay);
    }
    if let Some(name) = &args.easing {
        overrides = overrides.easing(parse_easing(name)?);
    }
    tracing::info!(
        ?options,
        duration = ?args.duration,
        easing = ?args.easing,
        from = args.from,
        to = args.to,
        "running tween"
    );

    let store = tweened(args.from, options);
    let _printer = print_frames(&store);
    let done = store
        .set_with(args.to, overrides)
        .context("Failed to start tween")?;

    drive(done, max_frames)
}

/// Print one line per value the store emits
fn print_frames<S: Subscribable<Value = Value>>(store: &S) -> Unsubscriber {
    let scheduler = FrameScheduler::current();
    store.subscribe(move |value: &Value| {
        let shown = match value.as_number() {
            Some(n) => format!("{n:.4}"),
            None => format!("{value:?}"),
        };
        println!(
            "frame={} t={:.1} value={}",
            scheduler.frame_count(),
            scheduler.now(),
            shown
        );
    })
}

fn drive(done: Completion, max_frames: usize) -> Result<()> {
    let scheduler = FrameScheduler::current();
    let frames = scheduler.run_until_idle(max_frames);

    if done.is_resolved() {
        tracing::info!(frames, "animation finished");
    } else {
        tracing::warn!(frames, "stopped before the animation finished");
    }
    Ok(())
}
