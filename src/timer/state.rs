use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ClockPhase {
    #[default]
    Idle,
    Running,
    Break,
    Completed,
}

/// Countdown configuration for one run of sessions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSettings {
    pub session_length_secs: u64,
    pub break_length_secs: u64,
    pub number_of_sessions: u32,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            session_length_secs: 25 * 60,
            break_length_secs: 5 * 60,
            number_of_sessions: 2,
        }
    }
}

impl TimerSettings {
    /// Length of the time axis: every session plus every break.
    pub fn total_duration_secs(&self) -> u64 {
        u64::from(self.number_of_sessions)
            .saturating_mul(self.session_length_secs.saturating_add(self.break_length_secs))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum PhaseTransition {
    BreakStarted { sessions_elapsed: u32 },
    SessionStarted { sessions_elapsed: u32 },
    Completed,
}

/// One elapsed second. `phase` is the phase the second elapsed in, so the
/// tick that drains a running phase still reports `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockTick {
    pub tick: u64,
    pub phase: ClockPhase,
    pub transition: Option<PhaseTransition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureOutcome {
    Applied,
    Deferred,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClock {
    phase: ClockPhase,
    paused: bool,
    remaining_secs: u64,
    sessions_elapsed: u32,
    /// Ticks since the run started, across sessions and breaks.
    elapsed_ticks: u64,
    settings: TimerSettings,
    #[serde(skip)]
    pending_settings: Option<TimerSettings>,
}

impl SessionClock {
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            phase: ClockPhase::default(),
            paused: false,
            remaining_secs: settings.session_length_secs,
            sessions_elapsed: 0,
            elapsed_ticks: 0,
            settings,
            pending_settings: None,
        }
    }

    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_ticking(&self) -> bool {
        !self.paused && matches!(self.phase, ClockPhase::Running | ClockPhase::Break)
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn sessions_elapsed(&self) -> u32 {
        self.sessions_elapsed
    }

    pub fn elapsed_ticks(&self) -> u64 {
        self.elapsed_ticks
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn pending_settings(&self) -> Option<&TimerSettings> {
        self.pending_settings.as_ref()
    }

    /// Whether `start` would begin or resume a run.
    pub fn can_start(&self) -> bool {
        self.paused || self.phase == ClockPhase::Idle
    }

    /// Begin a run from idle or resume from pause. Anything else is ignored.
    pub fn start(&mut self) -> bool {
        if !self.can_start() {
            return false;
        }
        if self.paused {
            self.paused = false;
            return true;
        }
        self.phase = ClockPhase::Running;
        self.remaining_secs = self.settings.session_length_secs;
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.paused || !matches!(self.phase, ClockPhase::Running | ClockPhase::Break) {
            return false;
        }
        self.paused = true;
        true
    }

    pub fn tick(&mut self) -> Option<ClockTick> {
        if !self.is_ticking() {
            return None;
        }

        let phase = self.phase;
        self.elapsed_ticks += 1;
        self.remaining_secs = self.remaining_secs.saturating_sub(1);

        let transition = if self.remaining_secs == 0 {
            Some(self.finish_phase())
        } else {
            None
        };

        Some(ClockTick {
            tick: self.elapsed_ticks,
            phase,
            transition,
        })
    }

    /// Back to idle from anywhere; deferred settings take effect here.
    pub fn reset(&mut self) {
        if let Some(settings) = self.pending_settings.take() {
            self.settings = settings;
        }
        *self = Self::new(self.settings);
    }

    pub fn configure(&mut self, settings: TimerSettings) -> ConfigureOutcome {
        if self.phase == ClockPhase::Idle {
            self.settings = settings;
            self.pending_settings = None;
            self.remaining_secs = settings.session_length_secs;
            ConfigureOutcome::Applied
        } else {
            self.pending_settings = Some(settings);
            ConfigureOutcome::Deferred
        }
    }

    fn finish_phase(&mut self) -> PhaseTransition {
        match self.phase {
            ClockPhase::Running => {
                self.sessions_elapsed += 1;
                self.phase = ClockPhase::Break;
                self.remaining_secs = self.settings.break_length_secs;
                if self.remaining_secs == 0 {
                    self.finish_break()
                } else {
                    PhaseTransition::BreakStarted {
                        sessions_elapsed: self.sessions_elapsed,
                    }
                }
            }
            ClockPhase::Break => self.finish_break(),
            ClockPhase::Idle | ClockPhase::Completed => PhaseTransition::Completed,
        }
    }

    fn finish_break(&mut self) -> PhaseTransition {
        if self.sessions_elapsed >= self.settings.number_of_sessions {
            self.phase = ClockPhase::Completed;
            self.remaining_secs = 0;
            PhaseTransition::Completed
        } else {
            self.phase = ClockPhase::Running;
            self.remaining_secs = self.settings.session_length_secs;
            PhaseTransition::SessionStarted {
                sessions_elapsed: self.sessions_elapsed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(session: u64, brk: u64, sessions: u32) -> TimerSettings {
        TimerSettings {
            session_length_secs: session,
            break_length_secs: brk,
            number_of_sessions: sessions,
        }
    }

    fn run_ticks(clock: &mut SessionClock, n: usize) -> Vec<ClockTick> {
        (0..n).filter_map(|_| clock.tick()).collect()
    }

    #[test]
    fn idle_clock_does_not_tick() {
        let mut clock = SessionClock::new(settings(3, 1, 1));
        assert!(clock.tick().is_none());
        assert_eq!(clock.remaining_secs(), 3);
    }

    #[test]
    fn starts_only_from_idle_or_paused() {
        let mut clock = SessionClock::new(settings(2, 0, 1));
        assert_eq!(clock.phase(), ClockPhase::Idle);
        assert!(clock.can_start());

        assert!(clock.start());
        assert!(!clock.can_start());
        assert!(clock.pause());
        assert!(clock.can_start());
        assert!(clock.start());

        run_ticks(&mut clock, 2);
        assert_eq!(clock.phase(), ClockPhase::Completed);
        assert!(!clock.can_start());
        assert!(!clock.start());
    }

    #[test]
    fn runs_sessions_and_breaks_to_completion() {
        let mut clock = SessionClock::new(settings(3, 2, 2));
        assert!(clock.start());

        let ticks = run_ticks(&mut clock, 20);
        assert_eq!(ticks.len(), 10);

        let transitions: Vec<_> = ticks.iter().filter_map(|t| t.transition).collect();
        assert_eq!(
            transitions,
            vec![
                PhaseTransition::BreakStarted { sessions_elapsed: 1 },
                PhaseTransition::SessionStarted { sessions_elapsed: 1 },
                PhaseTransition::BreakStarted { sessions_elapsed: 2 },
                PhaseTransition::Completed,
            ]
        );
        assert_eq!(ticks[2].phase, ClockPhase::Running);
        assert_eq!(ticks[3].phase, ClockPhase::Break);
        assert_eq!(clock.phase(), ClockPhase::Completed);
        assert_eq!(clock.sessions_elapsed(), 2);
        assert_eq!(clock.elapsed_ticks(), settings(3, 2, 2).total_duration_secs());
    }

    #[test]
    fn pause_holds_remaining_and_resume_returns_to_phase() {
        let mut clock = SessionClock::new(settings(5, 2, 1));
        clock.start();
        run_ticks(&mut clock, 5);
        assert_eq!(clock.phase(), ClockPhase::Break);

        assert!(clock.pause());
        assert!(clock.tick().is_none());
        assert_eq!(clock.remaining_secs(), 2);

        assert!(clock.start());
        assert_eq!(clock.phase(), ClockPhase::Break);
        assert!(!clock.is_paused());
    }

    #[test]
    fn invalid_transitions_are_ignored() {
        let mut clock = SessionClock::new(settings(5, 2, 1));
        assert!(!clock.pause());
        clock.start();
        clock.tick();
        assert!(!clock.start());
        assert_eq!(clock.remaining_secs(), 4);
    }

    #[test]
    fn zero_length_break_resolves_in_the_same_tick() {
        let mut clock = SessionClock::new(settings(2, 0, 2));
        clock.start();
        let ticks = run_ticks(&mut clock, 2);

        assert_eq!(
            ticks[1].transition,
            Some(PhaseTransition::SessionStarted { sessions_elapsed: 1 })
        );
        assert_eq!(clock.phase(), ClockPhase::Running);
        assert_eq!(clock.remaining_secs(), 2);
    }

    #[test]
    fn configure_applies_when_idle_and_defers_otherwise() {
        let mut clock = SessionClock::new(settings(5, 2, 1));
        assert_eq!(clock.configure(settings(8, 2, 1)), ConfigureOutcome::Applied);
        assert_eq!(clock.remaining_secs(), 8);

        clock.start();
        clock.tick();
        assert_eq!(clock.configure(settings(20, 2, 1)), ConfigureOutcome::Deferred);
        assert_eq!(clock.remaining_secs(), 7);
        assert_eq!(clock.settings().session_length_secs, 8);

        clock.reset();
        assert_eq!(clock.phase(), ClockPhase::Idle);
        assert_eq!(clock.remaining_secs(), 20);
        assert_eq!(clock.sessions_elapsed(), 0);
        assert!(clock.pending_settings().is_none());
    }
}
