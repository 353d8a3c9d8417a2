//! Per-frame game logic: diff, activation, clock.

use knightcam_engine::RoundClock;
use knightcam_types::{
    frame::{Frame, MotionMask},
    region::{default_regions, layout_rects, Region},
    round::{Phase, RoundSnapshot, RoundState, Transition},
    Result,
};
use knightcam_vision::{ActiveSet, FrameDiffer, RegionActivation};
use tracing::{trace, warn};

/// Why a tick did not run motion detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No previous frame to compare against yet.
    FirstFrame,
    /// The frame size changed; the stale frame was dropped.
    DimensionMismatch,
    GameOver,
}

/// What happened during one tick.
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    pub transition: Option<Transition>,
    pub active: ActiveSet,
    pub mask: Option<MotionMask>,
    pub skipped: Option<SkipReason>,
}

impl TickOutcome {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }

    pub fn motion_pixels(&self) -> usize {
        self.mask.as_ref().map_or(0, MotionMask::motion_count)
    }
}

/// Owns the round state, the region list and the previous frame.
pub struct GameSession {
    clock: RoundClock,
    regions: Vec<Region>,
    differ: FrameDiffer,
    activation: RegionActivation,
    previous: Option<Frame>,
}

impl GameSession {
    pub fn new(regions: Vec<Region>, seed: Option<u64>) -> Result<Self> {
        let clock = RoundClock::new(regions.len(), seed)?;
        Ok(Self {
            clock,
            regions,
            differ: FrameDiffer::new(),
            activation: RegionActivation::new(),
            previous: None,
        })
    }

    pub fn with_default_regions(seed: Option<u64>) -> Result<Self> {
        Self::new(default_regions(), seed)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn state(&self) -> &RoundState {
        self.clock.state()
    }

    pub fn snapshot(&self, now_ms: u64) -> RoundSnapshot {
        self.clock.state().snapshot(now_ms)
    }

    pub fn is_game_over(&self) -> bool {
        self.clock.phase() == Phase::GameOver
    }

    pub fn has_previous_frame(&self) -> bool {
        self.previous.is_some()
    }

    /// The pipeline is ready: begin the first round.
    pub fn start(&mut self, now_ms: u64) -> Option<Transition> {
        self.clock.start(now_ms)
    }

    pub fn tick(&mut self, current: Frame, now_ms: u64) -> TickOutcome {
        if self.is_game_over() {
            return TickOutcome::skipped(SkipReason::GameOver);
        }

        let Some(previous) = self.previous.take() else {
            self.previous = Some(current);
            return TickOutcome::skipped(SkipReason::FirstFrame);
        };

        let mut outcome = match self.differ.diff(&previous, &current) {
            Ok(mask) => TickOutcome {
                mask: Some(mask),
                ..TickOutcome::default()
            },
            Err(err) => {
                warn!("Skipping motion detection for one tick: {err}");
                TickOutcome::skipped(SkipReason::DimensionMismatch)
            }
        };

        if let Some(mask) = &outcome.mask {
            if self.clock.phase() == Phase::RoundActive {
                let rects = layout_rects(&self.regions, current.width(), current.height());
                outcome.active = self.activation.activate(mask, &rects);
                if let Some(winner) = outcome.active.winner() {
                    self.clock.record_activation(winner);
                }
                trace!(
                    "Tick at {}ms: {} motion pixels, ratios {:?}, active {:?}",
                    now_ms,
                    mask.motion_count(),
                    RegionActivation::ratios(mask, &rects),
                    outcome.active.indices()
                );
            }
        }

        outcome.transition = self.clock.advance(now_ms);
        self.previous = Some(current);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knightcam_types::round::{FlashColor, FLASH_MS, MAX_LIVES, ROUND_MS};

    const W: u32 = 320;
    const H: u32 = 240;
    const BG: [u8; 3] = [40, 40, 40];
    const HAND: [u8; 3] = [220, 200, 180];

    fn background() -> Frame {
        Frame::solid(W, H, BG)
    }

    fn session() -> GameSession {
        GameSession::with_default_regions(Some(9)).expect("session")
    }

    fn touching(session: &GameSession, region: usize) -> Frame {
        let rect = session.regions()[region].rect(W, H);
        background().with_patch(rect, HAND)
    }

    /// Starts a session at t=0 and feeds it the first (reference) frame.
    fn started() -> GameSession {
        let mut session = session();
        session.start(0);
        let outcome = session.tick(background(), 0);
        assert_eq!(outcome.skipped, Some(SkipReason::FirstFrame));
        session
    }

    fn target(session: &GameSession) -> usize {
        session.state().target_region_index.expect("target")
    }

    #[test]
    fn first_tick_only_stores_frame() {
        let mut session = session();
        session.start(0);
        assert!(!session.has_previous_frame());
        let outcome = session.tick(background(), 10);
        assert_eq!(outcome.skipped, Some(SkipReason::FirstFrame));
        assert!(outcome.mask.is_none());
        assert!(session.has_previous_frame());
    }

    #[test]
    fn touching_target_scores_a_hit() {
        let mut session = started();
        let t = target(&session);
        let outcome = session.tick(touching(&session, t), 100);
        assert_eq!(outcome.active.winner(), Some(t));
        assert_eq!(session.state().last_activated_region_index, Some(t));

        session.tick(background(), ROUND_MS - 1);
        assert_eq!(session.state().phase, Phase::RoundActive);
        let outcome = session.tick(background(), ROUND_MS);
        assert!(matches!(
            outcome.transition,
            Some(Transition::RoundEnded { hit: true, .. })
        ));
        let state = session.state();
        assert!(state.hit_recorded);
        assert_eq!(state.lives, MAX_LIVES);
        assert_eq!(state.phase, Phase::Flash);
        assert_eq!(state.flash_color, Some(FlashColor::Success));
    }

    #[test]
    fn touching_wrong_region_is_a_miss() {
        let mut session = started();
        let wrong = (target(&session) + 1) % 3;
        session.tick(touching(&session, wrong), 100);
        session.tick(background(), ROUND_MS);
        let state = session.state();
        assert!(!state.hit_recorded);
        assert_eq!(state.lives, MAX_LIVES - 1);
        assert_eq!(state.flash_color, Some(FlashColor::Fail));
    }

    #[test]
    fn simultaneous_touches_credit_the_later_region() {
        let mut session = started();
        let rects = layout_rects(session.regions(), W, H);
        let both = background()
            .with_patch(rects[0], HAND)
            .with_patch(rects[2], HAND);
        let outcome = session.tick(both, 100);
        assert_eq!(outcome.active.indices(), &[0, 2]);
        assert_eq!(session.state().last_activated_region_index, Some(2));
    }

    #[test]
    fn motion_during_flash_is_ignored() {
        let mut session = started();
        session.tick(background(), ROUND_MS);
        assert_eq!(session.state().phase, Phase::Flash);
        let outcome = session.tick(touching(&session, 0), ROUND_MS + 10);
        assert!(outcome.active.is_empty());
        assert_eq!(session.state().last_activated_region_index, None);
    }

    #[test]
    fn dimension_change_skips_detection_for_one_tick() {
        let mut session = started();
        let t = target(&session);
        let resized = Frame::solid(640, 480, BG);
        let outcome = session.tick(resized, 100);
        assert_eq!(outcome.skipped, Some(SkipReason::DimensionMismatch));
        assert!(outcome.active.is_empty());

        // The resized frame is the new reference; detection resumes.
        let rect = session.regions()[t].rect(640, 480);
        let outcome = session.tick(Frame::solid(640, 480, BG).with_patch(rect, HAND), 200);
        assert_eq!(outcome.skipped, None);
        assert_eq!(outcome.active.winner(), Some(t));
    }

    #[test]
    fn clock_still_runs_on_mismatched_tick() {
        let mut session = started();
        let outcome = session.tick(Frame::solid(640, 480, BG), ROUND_MS);
        assert_eq!(outcome.skipped, Some(SkipReason::DimensionMismatch));
        assert!(outcome.transition.is_some());
        assert_eq!(session.state().phase, Phase::Flash);
    }

    #[test]
    fn three_missed_rounds_end_the_game() {
        let mut session = started();
        let mut now = 0;
        for round in 1..=3 {
            assert_eq!(session.state().round_number, round);
            now += ROUND_MS;
            let outcome = session.tick(background(), now);
            if round < 3 {
                assert_eq!(session.state().phase, Phase::Flash);
                now += FLASH_MS;
                session.tick(background(), now);
            } else {
                // Lives hit zero at expiry: straight to GameOver, no flash.
                assert!(matches!(
                    outcome.transition,
                    Some(Transition::GameOver { round: 3, .. })
                ));
            }
        }
        let final_state = session.state().clone();
        assert_eq!(final_state.lives, 0);
        assert_eq!(final_state.phase, Phase::GameOver);

        let outcome = session.tick(touching(&session, 0), now + 16);
        assert_eq!(outcome.skipped, Some(SkipReason::GameOver));
        assert!(outcome.transition.is_none());
        assert_eq!(session.state(), &final_state);
        assert_eq!(session.start(now + 32), None);
        assert!(session.snapshot(now + 32).game_over);
    }

    #[test]
    fn idle_session_never_starts_by_itself() {
        let mut session = session();
        session.tick(background(), 0);
        let outcome = session.tick(touching(&session, 1), 5_000);
        assert!(outcome.active.is_empty());
        assert!(outcome.transition.is_none());
        assert_eq!(session.state().phase, Phase::Idle);
    }
}
