mod ui;

use std::{env, path::PathBuf, sync::mpsc};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use futures::StreamExt;
use knightcam_controller::{FrameSource, ImageSequenceCamera, SyntheticCamera};
use knightcam_network::{LocalServer, RealtimeServer};
use knightcam_ops::{init_tracing, TelemetryStore};
use knightcam_orchestrator::{MatchRunner, Orchestrator};
use knightcam_types::{
    config::{CameraSource, KnightcamConfig, MotionPattern},
    events::{LifecyclePhase, SystemEvent},
};
use tokio::task::JoinHandle;
use tracing::info;

use crate::ui::UiMessage;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    Synthetic,
    Directory,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PatternArg {
    Still,
    Wander,
    Fixed,
}

/// Motion-activated reaction game: touch the highlighted button before time runs out.
#[derive(Debug, Parser)]
#[command(name = "knightcam", version)]
struct Cli {
    /// TOML config file (defaults to $KNIGHTCAM_CONFIG, then configs/dev.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Where frames come from.
    #[arg(long, value_enum)]
    source: Option<SourceArg>,
    /// Directory of PNG frames for the directory source.
    #[arg(long)]
    frames_dir: Option<String>,
    /// Scripted movement for the synthetic camera.
    #[arg(long, value_enum)]
    pattern: Option<PatternArg>,
    /// Region the fixed pattern waves over.
    #[arg(long, default_value_t = 0)]
    region: usize,
    /// Seed for target selection.
    #[arg(long)]
    seed: Option<u64>,
    /// Stop after this many frames.
    #[arg(long)]
    max_ticks: Option<u64>,
    /// Show the terminal HUD instead of log output.
    #[arg(long)]
    tui: bool,
}

struct UiHandle {
    tx: mpsc::Sender<UiMessage>,
    forwarder: JoinHandle<()>,
    view: JoinHandle<Result<()>>,
}

enum Finished {
    Session(Result<()>),
    Viewer(std::result::Result<Result<()>, tokio::task::JoinError>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli);
    if !cli.tui {
        init_tracing(&config.ops)?;
    }

    let network = LocalServer::new(config.network.channel_capacity);
    let telemetry = TelemetryStore::new();
    let session = run_session(config.clone(), network.clone(), telemetry);

    let Some(mut ui) = cli.tui.then(|| spawn_ui(&network, summarize(&config))) else {
        return session.await;
    };

    let finished = tokio::select! {
        result = session => Finished::Session(result),
        joined = &mut ui.view => Finished::Viewer(joined),
    };

    match finished {
        Finished::Session(result) => {
            network
                .publish(SystemEvent::lifecycle(LifecyclePhase::Shutdown, None))
                .await?;
            let _ = ui.tx.send(UiMessage::Shutdown);
            let viewer = ui.view.await?;
            ui.forwarder.abort();
            result.and(viewer)
        }
        // Leaving the HUD stops the camera loop.
        Finished::Viewer(joined) => {
            ui.forwarder.abort();
            joined?
        }
    }
}

async fn run_session(
    config: KnightcamConfig,
    network: LocalServer,
    telemetry: TelemetryStore,
) -> Result<()> {
    match config.camera.source {
        CameraSource::Synthetic => {
            let camera = SyntheticCamera::new(config.camera.clone());
            play(&config, camera, network, telemetry).await
        }
        CameraSource::Directory => {
            let dir = config.camera.frames_dir.clone().unwrap_or_default();
            play(&config, ImageSequenceCamera::new(dir), network, telemetry).await
        }
    }
}

async fn play<C>(
    config: &KnightcamConfig,
    camera: C,
    network: LocalServer,
    telemetry: TelemetryStore,
) -> Result<()>
where
    C: FrameSource,
{
    let mut orchestrator = Orchestrator::new(config, camera, network, telemetry)?;
    orchestrator.boot().await?;
    orchestrator.run().await?;
    info!("Session finished; restart to play again");
    Ok(())
}

fn spawn_ui(network: &LocalServer, summary: String) -> UiHandle {
    let (tx, rx) = mpsc::channel();
    let mut events = network.subscribe();
    let forward_tx = tx.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if forward_tx.send(UiMessage::Event(event)).is_err() {
                break;
            }
        }
    });
    let view = tokio::task::spawn_blocking(move || ui::run(rx, summary));
    UiHandle {
        tx,
        forwarder,
        view,
    }
}

fn summarize(config: &KnightcamConfig) -> String {
    format!(
        "{:?} {}x{} @{}fps",
        config.camera.source, config.camera.width, config.camera.height, config.camera.fps
    )
}

fn load_config(cli: &Cli) -> KnightcamConfig {
    let path = cli
        .config
        .clone()
        .or_else(|| env::var("KNIGHTCAM_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("configs/dev.toml"));
    let mut config = match KnightcamConfig::from_file(&path) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!(
                "Failed to load config from '{}': {err}. Falling back to internal defaults.",
                path.display()
            );
            KnightcamConfig::default()
        }
    };
    apply_overrides(&mut config, cli);
    if let Err(err) = config.validate() {
        eprintln!(
            "Invalid config in '{}': {err}. Falling back to internal defaults.",
            path.display()
        );
        config = KnightcamConfig::default();
    }
    config
}

fn apply_overrides(config: &mut KnightcamConfig, cli: &Cli) {
    if let Some(source) = cli.source {
        config.camera.source = match source {
            SourceArg::Synthetic => CameraSource::Synthetic,
            SourceArg::Directory => CameraSource::Directory,
        };
    }
    if let Some(dir) = &cli.frames_dir {
        config.camera.frames_dir = Some(dir.clone());
    }
    if let Some(pattern) = cli.pattern {
        config.camera.pattern = match pattern {
            PatternArg::Still => MotionPattern::Still,
            PatternArg::Wander => MotionPattern::Wander { dwell_frames: 45 },
            PatternArg::Fixed => MotionPattern::Fixed { region: cli.region },
        };
    }
    if cli.seed.is_some() {
        config.session.seed = cli.seed;
    }
    if cli.max_ticks.is_some() {
        config.session.max_ticks = cli.max_ticks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_config() {
        let cli = Cli::parse_from([
            "knightcam",
            "--pattern",
            "fixed",
            "--region",
            "2",
            "--seed",
            "11",
            "--max-ticks",
            "90",
        ]);
        let mut config = KnightcamConfig::default();
        apply_overrides(&mut config, &cli);
        assert_eq!(config.camera.pattern, MotionPattern::Fixed { region: 2 });
        assert_eq!(config.session.seed, Some(11));
        assert_eq!(config.session.max_ticks, Some(90));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_override_falls_back_to_defaults() {
        let cli = Cli::parse_from([
            "knightcam",
            "--config",
            "/definitely/missing.toml",
            "--source",
            "directory",
        ]);
        let config = load_config(&cli);
        assert_eq!(config.camera.source, CameraSource::Synthetic);
    }
}
