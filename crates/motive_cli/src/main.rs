//! `motive` - play and inspect composed motion scenes
//!
//! ```text
//! motive play scenes/intro.toml --frame-ms 50
//! motive play scenes/intro.toml --pause-at 400 --resume-at 900 --json
//! motive inspect scenes/intro.toml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use futures::executor::LocalPool;
use motive_animation::Scheduler;
use motive_cli::{play, Outcome, PlaybackOptions, Scene, SceneConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Play and inspect composed motion scenes
#[derive(Parser, Debug)]
#[command(name = "motive")]
#[command(about = "Play and inspect composed motion scenes")]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a scene's root motion and print every frame
    Play(PlayArgs),
    /// Print the composed motion tree with normalized keyframes
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Scene file
    scene: PathBuf,

    /// Time advanced per frame
    #[arg(long, default_value_t = 16.0)]
    frame_ms: f32,

    /// Pause the root once this much time has passed
    #[arg(long)]
    pause_at: Option<f32>,

    /// Resume the root once this much time has passed
    #[arg(long)]
    resume_at: Option<f32>,

    /// Give up after this much time
    #[arg(long, default_value_t = 60_000.0)]
    max_ms: f32,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Scene file
    scene: PathBuf,

    /// Print the tree as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Play(args) => cmd_play(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_play(args: PlayArgs) -> Result<()> {
    let config = SceneConfig::load(&args.scene)?;
    let options = PlaybackOptions {
        frame_ms: args.frame_ms,
        pause_at_ms: args.pause_at,
        resume_at_ms: args.resume_at,
        max_ms: args.max_ms,
    };

    let report = play(&config, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for frame in &report.frames {
            println!("{frame}");
        }
        println!(
            "{} after {}ms ({} handles)",
            report.outcome, report.elapsed_ms, report.handles_created
        );
    }

    match report.outcome {
        Outcome::Failed { error } => {
            anyhow::bail!("Scene {} failed: {error}", args.scene.display())
        }
        Outcome::TimedOut => {
            tracing::warn!(max_ms = args.max_ms, "scene did not finish in time");
            Ok(())
        }
        Outcome::Finished => Ok(()),
    }
}

fn cmd_inspect(args: InspectArgs) -> Result<()> {
    let config = SceneConfig::load(&args.scene)?;

    let pool = LocalPool::new();
    let scene = Scene::build(&config, Scheduler::new(pool.spawner()))?;
    let summary = scene.summary();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }
    Ok(())
}
