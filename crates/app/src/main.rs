use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use ledline_core::{
    ConfigProvider, JsonConfigFile, LedlineError, LogSinkFactory, PlayRequest, Scheduler,
    StripOptions, SystemConfig, Timeline,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// How often `play` checks whether its timeline has finished.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Time the final all-off frame gets to reach the strip before exit.
const RESET_GRACE: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> ledline_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            timeline,
            config,
            leds,
            gpio,
            process_id,
        } => run_play(&timeline, config, leds, gpio, process_id).await,
        Commands::Validate { timeline } => run_validate(&timeline),
    }
}

fn load_timeline(path: &Path) -> ledline_core::Result<Timeline> {
    let raw = std::fs::read_to_string(path)?;
    Timeline::from_json(&raw)
}

async fn run_play(
    path: &Path,
    config: Option<PathBuf>,
    leds: usize,
    gpio: Option<u32>,
    process_id: Option<String>,
) -> ledline_core::Result<()> {
    let mut timeline = load_timeline(path)?;
    if !timeline.enabled {
        return Err(LedlineError::msg(format!(
            "timeline {:?} is disabled",
            timeline.name
        )));
    }
    if let Some(gpio) = gpio {
        timeline = timeline.with_gpio(gpio);
    }
    for (step, reason) in timeline.malformed_steps() {
        tracing::warn!(step_id = %step.id, number = step.number, %reason, "step will be skipped");
    }

    let provider: Arc<dyn ConfigProvider> = match config {
        Some(path) => Arc::new(JsonConfigFile::new(path)),
        None => Arc::new(SystemConfig {
            leds,
            ..SystemConfig::default()
        }),
    };
    // Fail early on a broken config instead of letting the scheduler drop the play.
    let system = provider.system_config()?;
    StripOptions::from_system(&system, timeline.gpio.unwrap_or(system.gpio)).validate()?;

    let shutdown = CancellationToken::new();
    let (scheduler, task) = Scheduler::spawn(provider, Arc::new(LogSinkFactory), shutdown.clone());

    let request = match process_id {
        Some(id) => PlayRequest::with_id(id, timeline),
        None => PlayRequest::new(timeline),
    };
    let process_id = request.process_id.clone();
    tracing::info!(%process_id, path = %path.display(), "submitting timeline");
    scheduler.play(request)?;

    let mut poll = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                tracing::info!("interrupted, stopping all timelines");
                scheduler.stop_all()?;
                tokio::time::sleep(RESET_GRACE).await;
                break;
            }
            _ = poll.tick() => {
                if !scheduler.running().await?.contains(&process_id) {
                    tracing::info!(%process_id, "timeline done");
                    break;
                }
            }
        }
    }

    shutdown.cancel();
    task.await
        .map_err(|err| LedlineError::msg(format!("scheduler task failed: {err}")))?;
    Ok(())
}

fn run_validate(path: &Path) -> ledline_core::Result<()> {
    let timeline = load_timeline(path)?;
    let malformed: Vec<_> = timeline.malformed_steps().collect();
    for (step, reason) in &malformed {
        tracing::warn!(step_id = %step.id, number = step.number, %reason, "malformed step");
    }
    let summary = serde_json::json!({
        "name": timeline.name,
        "enabled": timeline.enabled,
        "gpio": timeline.gpio,
        "steps": timeline.steps.len(),
        "malformed": malformed.len(),
    });
    println!("{summary}");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Plays LED strip timelines", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a timeline until it ends or Ctrl-C is pressed.
    Play {
        /// Timeline JSON document.
        timeline: PathBuf,
        /// System config JSON (gpio, leds, pixel order, colors). Built-in
        /// defaults are used when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Strip length when no config file is given.
        #[arg(short, long, default_value_t = 0)]
        leds: usize,
        /// Output pin override for this play.
        #[arg(short, long)]
        gpio: Option<u32>,
        /// Process id to register the play under; generated when omitted.
        #[arg(long)]
        process_id: Option<String>,
    },
    /// Decode a timeline and report steps that would be skipped.
    Validate {
        /// Timeline JSON document.
        timeline: PathBuf,
    },
}
