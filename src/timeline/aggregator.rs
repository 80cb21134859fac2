//! Per-tick folding of window samples into committed timeline intervals.
//!
//! Two tiers: a window must be dwelt on for `minimum_activity_duration_secs`
//! before anything it buffered is committed, while every title change inside
//! a window is buffered at full one-tick resolution.

use serde::Serialize;

use crate::error::TimelineResult;
use crate::models::{ActivitySample, SessionTimeline, TitleInterval, NO_WINDOW};
use crate::timeline::config::AggregatorConfig;
use crate::timer::ClockPhase;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickPair {
    pub current: u64,
    pub previous: u64,
}

impl TickPair {
    fn at(tick: u64) -> Self {
        Self {
            current: tick,
            previous: tick,
        }
    }

    pub fn elapsed(&self) -> u64 {
        self.current.abs_diff(self.previous)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveWindow {
    pub current: String,
    pub old: String,
}

impl Default for ActiveWindow {
    fn default() -> Self {
        Self {
            current: NO_WINDOW.to_string(),
            old: NO_WINDOW.to_string(),
        }
    }
}

/// Window-level decision for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAction {
    /// Same window as last tick.
    Stay { threshold_met: bool },
    /// A different window is focused: the buffer is noise and gets dropped.
    Switch,
}

/// What a single `advance` did to the timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TickOutcome {
    Committed { window_class: String, intervals: usize },
    Flushed { window_class: String, discarded: usize },
    Appended,
    /// Phase does not sample; pending data dropped.
    Inert,
    NoOp,
}

pub fn window_transition(
    active_window: &str,
    window_ticks: TickPair,
    sample: &ActivitySample,
    minimum_activity_duration_secs: u64,
) -> WindowAction {
    if sample.window_class != active_window {
        return WindowAction::Switch;
    }
    WindowAction::Stay {
        threshold_met: window_ticks.elapsed() >= minimum_activity_duration_secs,
    }
}

/// Record `title` for the second ending at `tick`, i.e. the range `[tick - 1, tick]`.
pub fn title_append(mut buffer: Vec<TitleInterval>, title: &str, tick: u64) -> Vec<TitleInterval> {
    let Some(start) = tick.checked_sub(1) else {
        return buffer;
    };

    match buffer.last_mut() {
        Some(last) if last.range.end() > start => {}
        Some(last) if last.title == title && last.range.end() == start => {
            last.range.extend_to(tick);
        }
        _ => {
            if let Ok(interval) = TitleInterval::new(title, start, tick) {
                buffer.push(interval);
            }
        }
    }
    buffer
}

#[derive(Debug, Clone, Default)]
pub struct IntervalAggregator {
    config: AggregatorConfig,
    window_ticks: TickPair,
    title_ticks: TickPair,
    active_window: ActiveWindow,
    pending: Vec<TitleInterval>,
}

impl IntervalAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AggregatorConfig) {
        self.config = config;
    }

    pub fn pending(&self) -> &[TitleInterval] {
        &self.pending
    }

    pub fn active_window(&self) -> &ActiveWindow {
        &self.active_window
    }

    pub fn window_ticks(&self) -> TickPair {
        self.window_ticks
    }

    pub fn title_ticks(&self) -> TickPair {
        self.title_ticks
    }

    pub fn samples_in(&self, phase: ClockPhase) -> bool {
        match phase {
            ClockPhase::Running => true,
            ClockPhase::Break => self.config.sample_during_break,
            ClockPhase::Idle | ClockPhase::Completed => false,
        }
    }

    /// Fold the sample observed during `tick` into the buffer, committing to
    /// `timeline` once the window has been held long enough.
    ///
    /// Order per tick: flush on switch (against the previous window), append
    /// this tick's title, then commit, so a tick that just reaches the dwell
    /// threshold is part of its own commit.
    pub fn advance(
        &mut self,
        tick: u64,
        phase: ClockPhase,
        sample: &ActivitySample,
        timeline: &mut SessionTimeline,
    ) -> TimelineResult<TickOutcome> {
        if !self.samples_in(phase) {
            return Ok(self.go_inert(tick));
        }

        self.window_ticks.current = tick;
        self.title_ticks.current = tick;

        let action = window_transition(
            &self.active_window.current,
            self.window_ticks,
            sample,
            self.config.minimum_activity_duration_secs,
        );
        let excluded = self.config.is_excluded(&sample.window_class);
        let mut outcome = TickOutcome::NoOp;

        if action == WindowAction::Switch {
            let discarded = std::mem::take(&mut self.pending).len();
            self.window_ticks.previous = self.window_ticks.current;
            if discarded > 0 {
                log_debug!(
                    "tick {tick}: left '{}' before threshold, dropped {discarded} intervals",
                    self.active_window.current
                );
            }
            outcome = TickOutcome::Flushed {
                window_class: self.active_window.current.clone(),
                discarded,
            };
        }

        if self.title_ticks.previous != self.title_ticks.current {
            if !excluded {
                self.pending = title_append(std::mem::take(&mut self.pending), &sample.title, tick);
                if outcome == TickOutcome::NoOp {
                    outcome = TickOutcome::Appended;
                }
            }
            self.title_ticks.previous = self.title_ticks.current;
        }

        let commit = match action {
            WindowAction::Stay { threshold_met: true } if !excluded && !self.pending.is_empty() => {
                Some(self.commit(&sample.window_class, timeline))
            }
            _ => None,
        };

        self.active_window.old =
            std::mem::replace(&mut self.active_window.current, sample.window_class.clone());

        match commit {
            Some(result) => result,
            None => Ok(outcome),
        }
    }

    /// Drop everything buffered, as on session reset. Returns how many
    /// pending intervals were discarded.
    pub fn reset(&mut self) -> usize {
        let discarded = self.pending.len();
        *self = Self::new(std::mem::take(&mut self.config));
        discarded
    }

    fn commit(
        &mut self,
        window_class: &str,
        timeline: &mut SessionTimeline,
    ) -> TimelineResult<TickOutcome> {
        let intervals = std::mem::take(&mut self.pending);
        let count = intervals.len();
        self.window_ticks.previous = self.window_ticks.current;
        timeline.insert(window_class, intervals)?;

        log_debug!(
            "tick {}: committed {count} intervals for '{window_class}'",
            self.window_ticks.current
        );
        Ok(TickOutcome::Committed {
            window_class: window_class.to_string(),
            intervals: count,
        })
    }

    fn go_inert(&mut self, tick: u64) -> TickOutcome {
        self.pending.clear();
        self.window_ticks = TickPair::at(tick);
        self.title_ticks = TickPair::at(tick);
        if self.active_window.current != NO_WINDOW {
            self.active_window.old =
                std::mem::replace(&mut self.active_window.current, NO_WINDOW.to_string());
        }
        TickOutcome::Inert
    }
}
