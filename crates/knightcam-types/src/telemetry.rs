use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cost of one processed frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TickSample {
    pub capture_us: u64,
    pub process_us: u64,
    pub motion_pixels: usize,
    pub at_ms: u64,
}

/// Outcome of a finished round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub target: usize,
    pub activated: Option<usize>,
    pub hit: bool,
    pub lives_after: u8,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionTelemetry {
    pub rounds: Vec<RoundRecord>,
    pub tick_samples: VecDeque<TickSample>,
    pub notes: Vec<String>,
}

impl SessionTelemetry {
    pub fn hits(&self) -> usize {
        self.rounds.iter().filter(|r| r.hit).count()
    }

    pub fn misses(&self) -> usize {
        self.rounds.len() - self.hits()
    }

    pub fn mean_process_us(&self) -> Option<u64> {
        if self.tick_samples.is_empty() {
            return None;
        }
        let total: u64 = self.tick_samples.iter().map(|s| s.process_us).sum();
        Some(total / self.tick_samples.len() as u64)
    }

    pub fn latest_tick(&self) -> Option<TickSample> {
        self.tick_samples.back().copied()
    }
}
