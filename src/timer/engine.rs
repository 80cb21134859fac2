//! Synchronous core of a run: clock, aggregator, live timeline and history.
//!
//! `TimerController` drives this once per second; tests drive it directly.

use std::sync::Arc;

use serde::Serialize;

use crate::error::TimelineResult;
use crate::models::{ActivitySample, SessionTimeline};
use crate::settings::UserSettings;
use crate::timeline::{layout_timeline, IntervalAggregator, SessionHistory, TickOutcome, TimelineSnapshot};

use super::state::{ClockPhase, ClockTick, ConfigureOutcome, PhaseTransition, SessionClock};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: ClockTick,
    pub outcome: TickOutcome,
    /// Set when this tick completed the run.
    pub archived: Option<Arc<SessionTimeline>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub clock: SessionClock,
    pub timeline: TimelineSnapshot,
    pub pending_intervals: usize,
    pub history_len: usize,
}

pub struct FocusEngine {
    clock: SessionClock,
    aggregator: IntervalAggregator,
    live: SessionTimeline,
    history: SessionHistory,
    /// The live timeline belongs to a run that has left idle and has not
    /// been archived yet.
    run_started: bool,
}

impl FocusEngine {
    pub fn new(settings: &UserSettings) -> Self {
        Self {
            clock: SessionClock::new(settings.timer),
            aggregator: IntervalAggregator::new(settings.aggregator_config()),
            live: SessionTimeline::new(settings.timer.total_duration_secs()),
            history: SessionHistory::new(settings.history_limit),
            run_started: false,
        }
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn aggregator(&self) -> &IntervalAggregator {
        &self.aggregator
    }

    pub fn live(&self) -> &SessionTimeline {
        &self.live
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn start(&mut self) -> bool {
        let from_idle = self.clock.phase() == ClockPhase::Idle && !self.clock.is_paused();
        if !self.clock.start() {
            return false;
        }
        if from_idle {
            self.live = SessionTimeline::new(self.clock.settings().total_duration_secs());
            self.run_started = true;
            log_info!("Run {} started", self.live.id());
        }
        true
    }

    pub fn pause(&mut self) -> bool {
        self.clock.pause()
    }

    /// Advance one second with the latest sample. `None` when the clock is
    /// not ticking.
    pub fn handle_tick(&mut self, sample: &ActivitySample) -> TimelineResult<Option<TickReport>> {
        let Some(tick) = self.clock.tick() else {
            return Ok(None);
        };

        let outcome = self
            .aggregator
            .advance(tick.tick, tick.phase, sample, &mut self.live);

        let archived = if tick.transition == Some(PhaseTransition::Completed) {
            self.aggregator.reset();
            Some(self.archive_live())
        } else {
            None
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                log_warn!("Dropped commit at tick {}: {err}", tick.tick);
                // A completed run still has to reach the caller for persistence.
                if archived.is_none() {
                    return Err(err);
                }
                TickOutcome::NoOp
            }
        };

        Ok(Some(TickReport {
            tick,
            outcome,
            archived,
        }))
    }

    /// Return to idle. Uncommitted data is discarded; a started run is archived.
    pub fn reset(&mut self) -> Option<Arc<SessionTimeline>> {
        let discarded = self.aggregator.reset();
        if discarded > 0 {
            log_info!("Reset discarded {discarded} uncommitted intervals");
        }

        let archived = self.run_started.then(|| self.archive_live());
        self.clock.reset();
        let total = self.clock.settings().total_duration_secs();
        self.replace_live(|live| live.rebase(total));
        archived
    }

    /// Apply new settings. Aggregator tuning applies at once; the countdown
    /// change waits for the next idle while a run is active, with the live
    /// timeline rebased onto the new axis length.
    pub fn configure(&mut self, settings: &UserSettings) {
        self.aggregator.set_config(settings.aggregator_config());
        self.history.set_limit(settings.history_limit);

        let total = settings.timer.total_duration_secs();
        match self.clock.configure(settings.timer) {
            ConfigureOutcome::Applied => {
                self.live = SessionTimeline::new(total);
            }
            ConfigureOutcome::Deferred => {
                self.replace_live(|live| live.rebase(total));
            }
        }
    }

    pub fn preload_history<I>(&mut self, timelines: I)
    where
        I: IntoIterator<Item = SessionTimeline>,
    {
        for timeline in timelines {
            self.history.push(Arc::new(timeline));
        }
    }

    pub fn delete_session(&mut self, id: &str) -> bool {
        self.history.delete(id).is_some()
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        layout_timeline(&self.live)
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            clock: self.clock.clone(),
            timeline: self.snapshot(),
            pending_intervals: self.aggregator.pending().len(),
            history_len: self.history.len(),
        }
    }

    fn archive_live(&mut self) -> Arc<SessionTimeline> {
        let next_total = self
            .clock
            .pending_settings()
            .unwrap_or(self.clock.settings())
            .total_duration_secs();
        let archived = self.history.archive(&mut self.live, next_total);
        self.run_started = false;
        log_info!(
            "Archived timeline {} ({} windows)",
            archived.id(),
            archived.windows().len()
        );
        archived
    }

    fn replace_live(&mut self, f: impl FnOnce(SessionTimeline) -> SessionTimeline) {
        let live = std::mem::replace(&mut self.live, SessionTimeline::new(0));
        self.live = f(live);
    }
}
