use std::collections::HashMap;

use serde::Serialize;

use crate::models::{SessionTimeline, TitleInterval};

/// Time spent in one window over the whole timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowTotal {
    pub window_class: String,
    pub total_secs: u64,
    /// Minutes rounded to one decimal.
    pub total_minutes: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleTotal {
    pub title: String,
    pub total_secs: u64,
}

pub fn window_totals(timeline: &SessionTimeline) -> Vec<WindowTotal> {
    let axis = timeline.total_duration_secs();
    timeline
        .windows()
        .iter()
        .map(|window| {
            let total_secs = window.total_secs();
            WindowTotal {
                window_class: window.window_class.clone(),
                total_secs,
                total_minutes: (total_secs as f64 * 10.0 / 60.0).round() / 10.0,
                percentage: if axis == 0 {
                    0.0
                } else {
                    total_secs as f64 / axis as f64 * 100.0
                },
            }
        })
        .collect()
}

/// Durations summed per title, longest first; ties keep first appearance.
pub fn condensed_details(details: &[TitleInterval]) -> Vec<TitleTotal> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<TitleTotal> = Vec::new();

    for interval in details {
        match index.get(interval.title.as_str()) {
            Some(&i) => totals[i].total_secs += interval.duration(),
            None => {
                index.insert(interval.title.as_str(), totals.len());
                totals.push(TitleTotal {
                    title: interval.title.clone(),
                    total_secs: interval.duration(),
                });
            }
        }
    }

    totals.sort_by(|a, b| b.total_secs.cmp(&a.total_secs));
    totals
}

/// The raw intervals, longest first (stable for equal durations).
pub fn ordered_details(details: &[TitleInterval]) -> Vec<TitleInterval> {
    let mut ordered = details.to_vec();
    ordered.sort_by(|a, b| b.duration().cmp(&a.duration()));
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(title: &str, start: u64, end: u64) -> TitleInterval {
        TitleInterval::new(title, start, end).unwrap()
    }

    #[test]
    fn condenses_repeated_titles() {
        let details = [
            interval("docs", 0, 10),
            interval("mail", 10, 40),
            interval("docs", 40, 70),
            interval("chat", 70, 80),
        ];

        let condensed = condensed_details(&details);
        let pairs: Vec<_> = condensed
            .iter()
            .map(|t| (t.title.as_str(), t.total_secs))
            .collect();
        assert_eq!(pairs, vec![("docs", 40), ("mail", 30), ("chat", 10)]);
    }

    #[test]
    fn orders_by_duration_keeping_ties_stable() {
        let details = [interval("a", 0, 5), interval("b", 5, 15), interval("c", 15, 20)];
        let titles: Vec<_> = ordered_details(&details)
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["b", "a", "c"]);
    }

    #[test]
    fn window_totals_round_minutes() {
        let mut timeline = SessionTimeline::new(600);
        timeline.insert("code", [interval("a", 0, 100)]).unwrap();
        timeline.insert("term", [interval("zsh", 100, 130)]).unwrap();

        let totals = window_totals(&timeline);
        assert_eq!(totals[0].total_secs, 100);
        assert_eq!(totals[0].total_minutes, 1.7);
        assert_eq!(totals[1].total_minutes, 0.5);
        assert!((totals[1].percentage - 5.0).abs() < 1e-9);
    }
}
