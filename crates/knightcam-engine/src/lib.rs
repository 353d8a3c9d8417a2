//! Round clock: the round / flash / game-over state machine.
//!
//! The clock is polled once per rendered frame with the current timestamp and
//! performs at most one phase change per call. It owns no timers.

use knightcam_types::{
    round::{FlashColor, Phase, RoundState, Transition, FLASH_MS, MAX_LIVES, ROUND_MS},
    KnightcamError, Result,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info, warn};

pub struct RoundClock {
    state: RoundState,
    rng: StdRng,
    region_count: usize,
}

impl RoundClock {
    /// Creates an idle clock. A seed makes target selection reproducible.
    pub fn new(region_count: usize, seed: Option<u64>) -> Result<Self> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(region_count, rng)
    }

    pub fn with_rng(region_count: usize, rng: StdRng) -> Result<Self> {
        if region_count == 0 {
            return Err(KnightcamError::Layout(
                "round clock needs at least one region".into(),
            ));
        }
        Ok(Self {
            state: RoundState::new(MAX_LIVES),
            rng,
            region_count,
        })
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn region_count(&self) -> usize {
        self.region_count
    }

    /// Leaves `Idle` for the first round. No-op in any other phase.
    pub fn start(&mut self, now_ms: u64) -> Option<Transition> {
        if self.state.phase != Phase::Idle {
            return None;
        }
        Some(self.begin_round(now_ms))
    }

    /// Remembers `index` as the region touched most recently this round.
    /// Ignored outside `RoundActive`.
    pub fn record_activation(&mut self, index: usize) -> bool {
        if self.state.phase != Phase::RoundActive || index >= self.region_count {
            return false;
        }
        if self.state.last_activated_region_index != Some(index) {
            debug!("Region {} activated", index);
        }
        self.state.last_activated_region_index = Some(index);
        true
    }

    /// Applies the deadline-driven transition due at `now_ms`, if any.
    pub fn advance(&mut self, now_ms: u64) -> Option<Transition> {
        match self.state.phase {
            Phase::Idle | Phase::GameOver => None,
            Phase::RoundActive => {
                let deadline = self.state.round_deadline?;
                (now_ms >= deadline).then(|| self.end_round(now_ms))
            }
            Phase::Flash => {
                let deadline = self.state.flash_deadline?;
                (now_ms >= deadline && self.state.lives > 0).then(|| self.begin_round(now_ms))
            }
        }
    }

    fn begin_round(&mut self, now_ms: u64) -> Transition {
        let target = self.rng.gen_range(0..self.region_count);
        let deadline_ms = now_ms + ROUND_MS;
        let state = &mut self.state;
        state.phase = Phase::RoundActive;
        state.round_number += 1;
        state.target_region_index = Some(target);
        state.round_deadline = Some(deadline_ms);
        state.flash_deadline = None;
        state.last_activated_region_index = None;
        state.hit_recorded = false;
        state.flashing_target_index = None;
        state.flash_color = None;
        info!(
            "Round {} started: target region {} until {}ms",
            state.round_number, target, deadline_ms
        );
        Transition::RoundStarted {
            round: state.round_number,
            target,
            deadline_ms,
        }
    }

    fn end_round(&mut self, now_ms: u64) -> Transition {
        let state = &mut self.state;
        let round = state.round_number;
        // begin_round always sets a target before entering RoundActive.
        let target = state.target_region_index.unwrap_or_default();
        let activated = state.last_activated_region_index;
        let hit = activated == Some(target);
        state.hit_recorded = hit;
        if hit {
            state.score += 1;
        } else {
            state.lives = state.lives.saturating_sub(1);
        }

        if state.lives == 0 {
            state.phase = Phase::GameOver;
            state.target_region_index = None;
            state.round_deadline = None;
            state.flash_deadline = None;
            state.flashing_target_index = None;
            state.flash_color = None;
            warn!(
                "Round {} missed (target {}, touched {:?}); no lives left",
                round, target, activated
            );
            return Transition::GameOver {
                round,
                target,
                activated,
            };
        }

        state.phase = Phase::Flash;
        state.round_deadline = None;
        state.flash_deadline = Some(now_ms + FLASH_MS);
        state.flashing_target_index = Some(target);
        state.flash_color = Some(if hit {
            FlashColor::Success
        } else {
            FlashColor::Fail
        });
        info!(
            "Round {} {}: target {}, touched {:?}, lives {}",
            round,
            if hit { "hit" } else { "missed" },
            target,
            activated,
            state.lives
        );
        Transition::RoundEnded {
            round,
            target,
            activated,
            hit,
            lives: state.lives,
        }
    }
}
