use serde::{Deserialize, Serialize};

/// Length of one round's countdown.
pub const ROUND_MS: u64 = 2_000;
/// Length of the post-round feedback window.
pub const FLASH_MS: u64 = 500;
pub const MAX_LIVES: u8 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    RoundActive,
    Flash,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashColor {
    Success,
    Fail,
}

/// Authoritative game state. Timestamps are milliseconds on the session's
/// monotonic clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundState {
    pub phase: Phase,
    /// Only meaningful while the phase is `RoundActive` or `Flash`.
    pub target_region_index: Option<usize>,
    pub round_deadline: Option<u64>,
    pub flash_deadline: Option<u64>,
    pub last_activated_region_index: Option<usize>,
    pub hit_recorded: bool,
    pub lives: u8,
    pub flashing_target_index: Option<usize>,
    pub flash_color: Option<FlashColor>,
    pub round_number: u32,
    pub score: u32,
}

impl RoundState {
    pub fn new(lives: u8) -> Self {
        Self {
            phase: Phase::Idle,
            target_region_index: None,
            round_deadline: None,
            flash_deadline: None,
            last_activated_region_index: None,
            hit_recorded: false,
            lives,
            flashing_target_index: None,
            flash_color: None,
            round_number: 0,
            score: 0,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// Read-only projection handed to renderers.
    pub fn snapshot(&self, now_ms: u64) -> RoundSnapshot {
        let deadline = match self.phase {
            Phase::RoundActive => self.round_deadline,
            Phase::Flash => self.flash_deadline,
            Phase::Idle | Phase::GameOver => None,
        };
        RoundSnapshot {
            phase: self.phase,
            target_region_index: self.target_region_index,
            flashing_target_index: self.flashing_target_index,
            flash_color: self.flash_color,
            lives: self.lives,
            game_over: self.is_game_over(),
            round_number: self.round_number,
            score: self.score,
            remaining_ms: deadline.map(|d| d.saturating_sub(now_ms)),
            at_ms: now_ms,
        }
    }
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new(MAX_LIVES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub phase: Phase,
    pub target_region_index: Option<usize>,
    pub flashing_target_index: Option<usize>,
    pub flash_color: Option<FlashColor>,
    pub lives: u8,
    pub game_over: bool,
    pub round_number: u32,
    pub score: u32,
    pub remaining_ms: Option<u64>,
    pub at_ms: u64,
}

/// A single phase change produced by the round clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    RoundStarted {
        round: u32,
        target: usize,
        deadline_ms: u64,
    },
    RoundEnded {
        round: u32,
        target: usize,
        activated: Option<usize>,
        hit: bool,
        lives: u8,
    },
    GameOver {
        round: u32,
        target: usize,
        activated: Option<usize>,
    },
}
