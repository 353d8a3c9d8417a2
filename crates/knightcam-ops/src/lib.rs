//! Operational helpers: logging and telemetry persistence.

use std::{path::PathBuf, sync::Arc};

use chrono::{DateTime, Utc};
use knightcam_types::{
    config::OpsConfig,
    events::SystemEvent,
    telemetry::{RoundRecord, SessionTelemetry, TickSample},
    KnightcamError, Result,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

/// Tick samples kept in memory; older ones are dropped first.
const MAX_TICK_SAMPLES: usize = 4_096;

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| KnightcamError::Ops(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| KnightcamError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}

/// In-memory telemetry for one play session.
#[derive(Clone)]
pub struct TelemetryStore {
    session_id: Uuid,
    started_at: DateTime<Utc>,
    events: Arc<Mutex<Vec<SystemEvent>>>,
    session: Arc<Mutex<SessionTelemetry>>,
}

impl Default for TelemetryStore {
    fn default() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            events: Arc::default(),
            session: Arc::default(),
        }
    }
}

#[derive(Serialize)]
struct TelemetryReport<'a> {
    session_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    hits: usize,
    misses: usize,
    mean_process_us: Option<u64>,
    telemetry: &'a SessionTelemetry,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub async fn record_event(&self, event: SystemEvent) -> Result<()> {
        self.events.lock().await.push(event);
        Ok(())
    }

    pub async fn record_round(&self, record: RoundRecord) -> Result<()> {
        self.session.lock().await.rounds.push(record);
        Ok(())
    }

    pub async fn record_tick(&self, sample: TickSample) -> Result<()> {
        let mut session = self.session.lock().await;
        if session.tick_samples.len() == MAX_TICK_SAMPLES {
            session.tick_samples.pop_front();
        }
        session.tick_samples.push_back(sample);
        Ok(())
    }

    pub async fn add_note(&self, note: impl Into<String>) {
        self.session.lock().await.notes.push(note.into());
    }

    pub async fn snapshot_events(&self) -> Vec<SystemEvent> {
        self.events.lock().await.clone()
    }

    pub async fn snapshot_session(&self) -> SessionTelemetry {
        self.session.lock().await.clone()
    }

    /// Writes a JSON summary of the session into `dir`.
    pub async fn persist(&self, dir: &str) -> Result<PathBuf> {
        let dir = ensure_telemetry_dir(dir)?;
        let session = self.session.lock().await;
        let report = TelemetryReport {
            session_id: self.session_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            hits: session.hits(),
            misses: session.misses(),
            mean_process_us: session.mean_process_us(),
            telemetry: &*session,
        };
        let body = serde_json::to_string_pretty(&report)
            .map_err(|err| KnightcamError::Ops(format!("failed to encode telemetry: {err}")))?;
        let path = dir.join(format!("session_{}.json", self.session_id));
        tokio::fs::write(&path, body)
            .await
            .map_err(|err| KnightcamError::Ops(format!("failed to write telemetry: {err}")))?;
        info!("Telemetry written to {:?}", path);
        Ok(path)
    }
}

pub fn ensure_telemetry_dir(path: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(path);
    std::fs::create_dir_all(&dir)
        .map_err(|err| KnightcamError::Ops(format!("failed to create telemetry dir: {err}")))?;
    info!("Telemetry directory ready at {:?}", dir);
    Ok(dir)
}
