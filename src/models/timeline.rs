//! Interval data model shared by the live chart and session history.
//!
//! A `SessionTimeline` maps each window class (in order of first appearance)
//! to a strictly ordered, non-overlapping list of `TitleInterval`s measured in
//! ticks from the start of the run.

use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{TimelineError, TimelineResult};

/// Half-open tick span `[start, end)` with `end > start`.
///
/// Serialized as a two element array to match the persisted chart shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(u64, u64)", into = "(u64, u64)")]
pub struct TickRange {
    start: u64,
    end: u64,
}

impl TickRange {
    pub fn new(start: u64, end: u64) -> TimelineResult<Self> {
        if end <= start {
            return Err(TimelineError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn duration(&self) -> u64 {
        self.end - self.start
    }

    /// True when `next` begins exactly where this range ends.
    pub fn touches(&self, next: &TickRange) -> bool {
        self.end == next.start
    }

    pub(crate) fn extend_to(&mut self, end: u64) {
        debug_assert!(end > self.end);
        self.end = end;
    }
}

impl TryFrom<(u64, u64)> for TickRange {
    type Error = TimelineError;

    fn try_from((start, end): (u64, u64)) -> Result<Self, Self::Error> {
        TickRange::new(start, end)
    }
}

impl From<TickRange> for (u64, u64) {
    fn from(range: TickRange) -> Self {
        (range.start, range.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleInterval {
    pub title: String,
    pub range: TickRange,
}

impl TitleInterval {
    pub fn new(title: impl Into<String>, start: u64, end: u64) -> TimelineResult<Self> {
        Ok(Self {
            title: title.into(),
            range: TickRange::new(start, end)?,
        })
    }

    pub fn duration(&self) -> u64 {
        self.range.duration()
    }

    /// Same title and contiguous: the two belong in one stored entry.
    pub fn continues_with(&self, next: &TitleInterval) -> bool {
        self.title == next.title && self.range.touches(&next.range)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowIntervals {
    pub window_class: String,
    pub intervals: Vec<TitleInterval>,
}

impl WindowIntervals {
    pub fn total_secs(&self) -> u64 {
        self.intervals.iter().map(TitleInterval::duration).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTimeline {
    id: String,
    started_at: DateTime<Utc>,
    total_duration_secs: u64,
    windows: Vec<WindowIntervals>,
}

impl SessionTimeline {
    pub fn new(total_duration_secs: u64) -> Self {
        Self::with_start(total_duration_secs, Utc::now())
    }

    pub fn with_start(total_duration_secs: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            started_at,
            total_duration_secs,
            windows: Vec::new(),
        }
    }

    /// Rebuild a stored timeline, re-checking every interval on the way in.
    pub fn restore(
        id: String,
        started_at: DateTime<Utc>,
        total_duration_secs: u64,
        windows: Vec<WindowIntervals>,
    ) -> TimelineResult<Self> {
        let mut timeline = Self {
            id,
            started_at,
            total_duration_secs,
            windows: Vec::with_capacity(windows.len()),
        };
        for window in windows {
            timeline.insert(&window.window_class, window.intervals)?;
        }
        Ok(timeline)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.total_duration_secs
    }

    pub fn windows(&self) -> &[WindowIntervals] {
        &self.windows
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn intervals_for(&self, window_class: &str) -> Option<&[TitleInterval]> {
        self.windows
            .iter()
            .find(|w| w.window_class == window_class)
            .map(|w| w.intervals.as_slice())
    }

    /// Append `intervals` to the window's sequence in arrival order.
    ///
    /// An interval continuing the last stored one (same title, end == start)
    /// extends it instead of being stored separately. The whole batch is
    /// rejected if any interval would start before the end of its
    /// predecessor. Returns the number of new entries stored.
    pub fn insert<I>(&mut self, window_class: &str, intervals: I) -> TimelineResult<usize>
    where
        I: IntoIterator<Item = TitleInterval>,
    {
        let incoming: Vec<TitleInterval> = intervals.into_iter().collect();
        if incoming.is_empty() {
            return Ok(0);
        }

        let mut previous_end = self
            .intervals_for(window_class)
            .and_then(|existing| existing.last())
            .map(|last| last.range.end());
        for interval in &incoming {
            if let Some(end) = previous_end {
                if interval.range.start() < end {
                    return Err(TimelineError::OverlappingInterval {
                        window_class: window_class.to_string(),
                        start: interval.range.start(),
                        previous_end: end,
                    });
                }
            }
            previous_end = Some(interval.range.end());
        }

        let window = self.window_entry(window_class);
        let mut added = 0;
        for interval in incoming {
            match window.intervals.last_mut() {
                Some(last) if last.continues_with(&interval) => {
                    last.range.extend_to(interval.range.end());
                }
                _ => {
                    window.intervals.push(interval);
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    /// Same id, start and recorded data with a new axis length.
    pub fn rebase(self, total_duration_secs: u64) -> Self {
        Self {
            total_duration_secs,
            ..self
        }
    }

    fn window_entry(&mut self, window_class: &str) -> &mut WindowIntervals {
        let index = match self
            .windows
            .iter()
            .position(|w| w.window_class == window_class)
        {
            Some(index) => index,
            None => {
                self.windows.push(WindowIntervals {
                    window_class: window_class.to_string(),
                    intervals: Vec::new(),
                });
                self.windows.len() - 1
            }
        };
        &mut self.windows[index]
    }
}
