//! High-level orchestrator driving the camera, the game session, and the
//! renderers once per frame.

mod session;

use std::time::Instant as WallInstant;

use async_trait::async_trait;
use chrono::Utc;
use knightcam_controller::FrameSource;
use knightcam_network::RealtimeServer;
use knightcam_ops::{ensure_telemetry_dir, TelemetryStore};
use knightcam_types::{
    config::{KnightcamConfig, SessionConfig},
    events::{LifecyclePhase, SystemEvent},
    region::validate_layout,
    round::Transition,
    telemetry::{RoundRecord, TickSample},
    KnightcamError, Result,
};
use knightcam_vision::MaskRecorder;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub use session::{GameSession, SkipReason, TickOutcome};

pub struct Orchestrator<C, N>
where
    C: FrameSource,
    N: RealtimeServer,
{
    camera: C,
    network: N,
    telemetry: TelemetryStore,
    session: GameSession,
    recorder: MaskRecorder,
    config: SessionConfig,
    telemetry_dir: String,
    frame_interval: Duration,
    origin: Option<Instant>,
    ticks: u64,
}

impl<C, N> Orchestrator<C, N>
where
    C: FrameSource,
    N: RealtimeServer,
{
    pub fn new(
        config: &KnightcamConfig,
        camera: C,
        network: N,
        telemetry: TelemetryStore,
    ) -> Result<Self> {
        let session = GameSession::with_default_regions(config.session.seed)?;
        let fps = u64::from(config.camera.fps.max(1));
        Ok(Self {
            camera,
            network,
            telemetry,
            session,
            recorder: MaskRecorder::new(&config.vision),
            config: config.session.clone(),
            telemetry_dir: config.ops.telemetry_dir.clone(),
            frame_interval: Duration::from_micros(1_000_000 / fps),
            origin: None,
            ticks: 0,
        })
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Milliseconds since the camera became ready.
    fn now_ms(&self) -> u64 {
        self.origin
            .map(|origin| origin.elapsed().as_millis() as u64)
            .unwrap_or_default()
    }

    /// Connects the camera and starts the first round. A camera failure
    /// leaves the session idle.
    pub async fn boot(&mut self) -> Result<()> {
        ensure_telemetry_dir(&self.telemetry_dir)?;
        self.network.run().await?;
        self.publish(SystemEvent::lifecycle(LifecyclePhase::Boot, None))
            .await?;

        self.camera.connect().await?;
        let (width, height) = self
            .camera
            .resolution()
            .ok_or_else(|| orchestrator_error("camera connected without a resolution"))?;
        validate_layout(self.session.regions(), width, height)?;

        self.origin = Some(Instant::now());
        if let Some(started) = self.session.start(0) {
            self.publish(SystemEvent::round(started)).await?;
        }
        self.publish(SystemEvent::lifecycle(
            LifecyclePhase::Ready,
            Some(format!("camera ready at {width}x{height}")),
        ))
        .await?;
        Ok(())
    }

    /// Processes one frame. Returns `None` once the camera stops.
    pub async fn play_tick(&mut self) -> Result<Option<TickOutcome>> {
        if self.origin.is_none() {
            return Err(orchestrator_error("play_tick called before boot"));
        }
        let capture_start = WallInstant::now();
        let Some(frame) = self.camera.capture_frame().await? else {
            return Ok(None);
        };
        let capture_us = capture_start.elapsed().as_micros() as u64;

        let now_ms = self.now_ms();
        let process_start = WallInstant::now();
        let outcome = self.session.tick(frame, now_ms);
        let process_us = process_start.elapsed().as_micros() as u64;
        self.ticks += 1;

        self.telemetry
            .record_tick(TickSample {
                capture_us,
                process_us,
                motion_pixels: outcome.motion_pixels(),
                at_ms: now_ms,
            })
            .await?;

        if let Some(transition) = outcome.transition {
            self.handle_transition(transition, &outcome).await?;
        }
        self.publish(SystemEvent::snapshot(self.session.snapshot(now_ms)))
            .await?;
        Ok(Some(outcome))
    }

    async fn handle_transition(
        &mut self,
        transition: Transition,
        outcome: &TickOutcome,
    ) -> Result<()> {
        let finished = match transition {
            Transition::RoundStarted { .. } => None,
            Transition::RoundEnded {
                round,
                target,
                activated,
                hit,
                lives,
            } => Some((round, target, activated, hit, lives)),
            Transition::GameOver {
                round,
                target,
                activated,
            } => Some((round, target, activated, false, 0)),
        };

        if let Some((round, target, activated, hit, lives_after)) = finished {
            self.telemetry
                .record_round(RoundRecord {
                    round,
                    target,
                    activated,
                    hit,
                    lives_after,
                    ended_at: Utc::now(),
                })
                .await?;
            if let Some(mask) = outcome.mask.as_ref().filter(|_| self.recorder.is_enabled()) {
                match self.recorder.persist(mask, &format!("round{round}")) {
                    Ok(Some(path)) => {
                        self.publish(SystemEvent::ops(
                            format!("motion mask saved to {}", path.display()),
                            &["vision", "mask"],
                        ))
                        .await?;
                    }
                    Ok(None) => {}
                    Err(err) => warn!("Could not save motion mask: {err}"),
                }
            }
        }

        self.publish(SystemEvent::round(transition)).await
    }

    async fn publish(&self, event: SystemEvent) -> Result<()> {
        let cloned = event.clone();
        self.network.publish(event).await?;
        self.telemetry.record_event(cloned).await?;
        Ok(())
    }

    fn reached_tick_limit(&self) -> bool {
        self.config
            .max_ticks
            .is_some_and(|limit| self.ticks >= limit)
    }
}

#[async_trait]
pub trait MatchRunner {
    async fn run(&mut self) -> Result<()>;
}

#[async_trait]
impl<C, N> MatchRunner for Orchestrator<C, N>
where
    C: FrameSource + Send + Sync,
    N: RealtimeServer + Send + Sync,
{
    /// Ticks at the camera frame rate until the game ends, the camera stops
    /// or fails, or the tick limit is reached. The session is always closed
    /// out; a capture failure is returned after telemetry is flushed.
    async fn run(&mut self) -> Result<()> {
        let mut pacer = interval(self.frame_interval);
        pacer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut failure = None;
        let reason = loop {
            pacer.tick().await;
            if self.session.is_game_over() {
                break "game over";
            }
            if self.reached_tick_limit() {
                break "tick limit reached";
            }
            match self.play_tick().await {
                Ok(Some(_)) => {}
                Ok(None) => break "camera stopped",
                Err(err) => {
                    warn!("Frame {} failed: {err}", self.ticks + 1);
                    failure = Some(err);
                    break "camera error";
                }
            }
        };

        let state = self.session.state();
        let summary = format!(
            "{reason} after {} ticks: round {}, score {}, lives {}",
            self.ticks, state.round_number, state.score, state.lives
        );
        info!("Session ended: {}", summary);
        debug!("Camera metrics: {:?}", self.camera.metrics());
        self.telemetry.add_note(summary.clone()).await;
        let session = self.telemetry.snapshot_session().await;
        let latency = session
            .mean_process_us()
            .map(|us| format!("mean processing {us}us per frame"));
        self.publish(SystemEvent::telemetry(session.latest_tick(), latency))
            .await?;
        self.publish(SystemEvent::lifecycle(
            LifecyclePhase::SessionEnd,
            Some(summary),
        ))
        .await?;

        if let Err(err) = self.telemetry.persist(&self.telemetry_dir).await {
            warn!("Telemetry not saved: {err}");
        }
        failure.map_or(Ok(()), Err)
    }
}

pub fn orchestrator_error(message: impl Into<String>) -> KnightcamError {
    KnightcamError::Orchestrator(message.into())
}
