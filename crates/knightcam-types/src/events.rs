use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    round::{RoundSnapshot, Transition},
    telemetry::TickSample,
};

/// High-level event bus message kinds moving through the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Lifecycle,
    Round,
    Snapshot,
    Telemetry,
    Ops,
}

/// Immutable event envelope for logging, rendering, and replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Lifecycle(LifecycleEvent),
    Round(Transition),
    Snapshot(RoundSnapshot),
    Telemetry(TelemetryEvent),
    Ops(OpsEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub phase: LifecyclePhase,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LifecyclePhase {
    Boot,
    Ready,
    SessionEnd,
    Shutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub tick: Option<TickSample>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpsEvent {
    pub message: String,
    pub tags: Vec<String>,
}

impl SystemEvent {
    pub fn new(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn lifecycle(phase: LifecyclePhase, details: Option<String>) -> Self {
        Self::new(
            EventKind::Lifecycle,
            EventPayload::Lifecycle(LifecycleEvent { phase, details }),
        )
    }

    pub fn round(transition: Transition) -> Self {
        Self::new(EventKind::Round, EventPayload::Round(transition))
    }

    pub fn snapshot(snapshot: RoundSnapshot) -> Self {
        Self::new(EventKind::Snapshot, EventPayload::Snapshot(snapshot))
    }

    pub fn telemetry(tick: Option<TickSample>, notes: Option<String>) -> Self {
        Self::new(
            EventKind::Telemetry,
            EventPayload::Telemetry(TelemetryEvent { tick, notes }),
        )
    }

    pub fn ops(message: impl Into<String>, tags: &[&str]) -> Self {
        Self::new(
            EventKind::Ops,
            EventPayload::Ops(OpsEvent {
                message: message.into(),
                tags: tags.iter().map(|tag| tag.to_string()).collect(),
            }),
        )
    }
}
