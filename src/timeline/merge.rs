use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{SessionTimeline, TickRange, TitleInterval};
use crate::timeline::summary::{condensed_details, window_totals, TitleTotal, WindowTotal};

/// A run of intervals where each one ends exactly where the next begins,
/// regardless of title. `details` keeps the original intervals for tooltips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedRange {
    pub range: TickRange,
    pub details: Vec<TitleInterval>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum BarSegment {
    Active {
        range: TickRange,
        width_pct: f64,
        details: Vec<TitleInterval>,
        condensed: Vec<TitleTotal>,
    },
    Inactive {
        range: TickRange,
        width_pct: f64,
    },
}

impl BarSegment {
    pub fn range(&self) -> TickRange {
        match self {
            BarSegment::Active { range, .. } | BarSegment::Inactive { range, .. } => *range,
        }
    }

    pub fn width_pct(&self) -> f64 {
        match self {
            BarSegment::Active { width_pct, .. } | BarSegment::Inactive { width_pct, .. } => {
                *width_pct
            }
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, BarSegment::Active { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRow {
    pub window_class: String,
    pub total_secs: u64,
    pub intervals: Vec<TitleInterval>,
    pub segments: Vec<BarSegment>,
}

/// Read-only view of a timeline, shaped for the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSnapshot {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub total_duration_secs: u64,
    pub rows: Vec<TimelineRow>,
    pub totals: Vec<WindowTotal>,
}

pub fn merge_contiguous(intervals: &[TitleInterval]) -> Vec<MergedRange> {
    let mut merged: Vec<MergedRange> = Vec::new();

    for interval in intervals {
        match merged.last_mut() {
            Some(current) if current.range.touches(&interval.range) => {
                current.range.extend_to(interval.range.end());
                current.details.push(interval.clone());
            }
            _ => merged.push(MergedRange {
                range: interval.range,
                details: vec![interval.clone()],
            }),
        }
    }

    merged
}

pub fn width_pct(duration: u64, total_duration_secs: u64) -> f64 {
    if total_duration_secs == 0 {
        return 0.0;
    }
    duration as f64 / total_duration_secs as f64 * 100.0
}

/// Lay one window's intervals out on `[0, total_duration_secs]`, inferring the
/// inactive gaps. Zero-width gaps are left out.
pub fn layout_row(intervals: &[TitleInterval], total_duration_secs: u64) -> Vec<BarSegment> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for merged in merge_contiguous(intervals) {
        push_gap(&mut segments, cursor, merged.range.start(), total_duration_secs);
        cursor = merged.range.end();
        segments.push(BarSegment::Active {
            range: merged.range,
            width_pct: width_pct(merged.range.duration(), total_duration_secs),
            condensed: condensed_details(&merged.details),
            details: merged.details,
        });
    }
    push_gap(&mut segments, cursor, total_duration_secs, total_duration_secs);

    segments
}

pub fn layout_timeline(timeline: &SessionTimeline) -> TimelineSnapshot {
    let total = timeline.total_duration_secs();
    TimelineSnapshot {
        id: timeline.id().to_string(),
        started_at: timeline.started_at(),
        total_duration_secs: total,
        rows: timeline
            .windows()
            .iter()
            .map(|window| TimelineRow {
                window_class: window.window_class.clone(),
                total_secs: window.total_secs(),
                intervals: window.intervals.clone(),
                segments: layout_row(&window.intervals, total),
            })
            .collect(),
        totals: window_totals(timeline),
    }
}

fn push_gap(segments: &mut Vec<BarSegment>, start: u64, end: u64, total_duration_secs: u64) {
    if let Ok(range) = TickRange::new(start, end) {
        segments.push(BarSegment::Inactive {
            range,
            width_pct: width_pct(range.duration(), total_duration_secs),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(title: &str, start: u64, end: u64) -> TitleInterval {
        TitleInterval::new(title, start, end).unwrap()
    }

    fn spans(segments: &[BarSegment]) -> Vec<(bool, u64, u64)> {
        segments
            .iter()
            .map(|s| (s.is_active(), s.range().start(), s.range().end()))
            .collect()
    }

    #[test]
    fn contiguous_intervals_merge_across_titles() {
        let intervals = [interval("A", 0, 20), interval("B", 20, 40), interval("A", 40, 60)];
        let merged = merge_contiguous(&intervals);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].range, TickRange::new(0, 60).unwrap());
        assert_eq!(merged[0].details.len(), 3);

        let segments = layout_row(&intervals, 60);
        match &segments[0] {
            BarSegment::Active { condensed, .. } => {
                assert_eq!(condensed[0].title, "A");
                assert_eq!(condensed[0].total_secs, 40);
            }
            other => panic!("expected active segment, got {other:?}"),
        }
    }

    #[test]
    fn gaps_break_segments() {
        let intervals = [interval("A", 0, 5), interval("A", 7, 9), interval("B", 9, 12)];
        let merged = merge_contiguous(&intervals);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].range, TickRange::new(7, 12).unwrap());
    }

    #[test]
    fn infers_leading_and_trailing_gaps() {
        let segments = layout_row(&[interval("A", 20, 40)], 60);

        assert_eq!(spans(&segments), vec![(false, 0, 20), (true, 20, 40), (false, 40, 60)]);
        for segment in &segments {
            assert!((segment.width_pct() - 100.0 / 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_width_gaps_are_omitted() {
        let segments = layout_row(&[interval("A", 0, 30), interval("B", 40, 60)], 60);
        assert_eq!(spans(&segments), vec![(true, 0, 30), (false, 30, 40), (true, 40, 60)]);
    }

    #[test]
    fn zero_axis_length_gives_zero_widths() {
        let segments = layout_row(&[interval("A", 0, 5)], 0);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].width_pct(), 0.0);
    }

    #[test]
    fn snapshot_has_one_row_per_window() {
        let mut timeline = SessionTimeline::new(12);
        timeline.insert("Editor", [interval("Writing", 0, 5)]).unwrap();
        timeline.insert("Browser", [interval("Docs", 5, 10)]).unwrap();

        let snapshot = layout_timeline(&timeline);
        assert_eq!(snapshot.id, timeline.id());
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.rows[1].total_secs, 5);
        assert_eq!(snapshot.totals[0].total_minutes, 0.1);
        assert_eq!(
            spans(&snapshot.rows[1].segments),
            vec![(false, 0, 5), (true, 5, 10), (false, 10, 12)]
        );
    }
}
