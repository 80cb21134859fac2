use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use tokio::sync::watch;

use crate::models::{ActivitySample, WindowEvent};

/// Normalizes whatever the observation feed delivers into the latest
/// `(window_class, title)` pair. Holds no history: readers always get the
/// most recent sample, so a silent feed means "unchanged since last tick".
pub struct ActivitySampler {
    latest: watch::Sender<ActivitySample>,
    active: AtomicBool,
    excluded: RwLock<Vec<String>>,
}

impl ActivitySampler {
    pub fn new(excluded: Vec<String>) -> Self {
        let (latest, _) = watch::channel(ActivitySample::none());
        Self {
            latest,
            active: AtomicBool::new(false),
            excluded: RwLock::new(excluded),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    /// Stop accepting events and forget the last observation.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.latest.send_replace(ActivitySample::none());
    }

    pub fn set_excluded(&self, excluded: Vec<String>) {
        let mut guard = self
            .excluded
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = excluded;
    }

    /// Record an observation. Ignored while inactive; excluded windows are
    /// reported as no observation. Empty titles are kept as-is.
    pub fn publish(&self, event: WindowEvent) {
        if !self.is_active() {
            return;
        }

        let sample = if self.is_excluded(&event.window_class) {
            ActivitySample::none()
        } else {
            ActivitySample::new(event.window_class, event.title)
        };
        self.latest.send_replace(sample);
    }

    pub fn current_sample(&self) -> ActivitySample {
        if !self.is_active() {
            return ActivitySample::none();
        }
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ActivitySample> {
        self.latest.subscribe()
    }

    fn is_excluded(&self, window_class: &str) -> bool {
        self.excluded
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .any(|class| class == window_class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_sampler_reports_no_window() {
        let sampler = ActivitySampler::new(Vec::new());
        sampler.publish(WindowEvent::new("code", "main.rs"));
        assert!(sampler.current_sample().is_none());
    }

    #[test]
    fn keeps_only_the_latest_event() {
        let sampler = ActivitySampler::new(Vec::new());
        sampler.activate();
        sampler.publish(WindowEvent::new("code", "main.rs"));
        sampler.publish(WindowEvent::new("term", ""));

        assert_eq!(sampler.current_sample(), ActivitySample::new("term", ""));
        assert_eq!(sampler.current_sample(), ActivitySample::new("term", ""));
    }

    #[test]
    fn excluded_windows_map_to_none() {
        let sampler = ActivitySampler::new(vec!["focusline".into()]);
        sampler.activate();
        sampler.publish(WindowEvent::new("code", "a"));
        sampler.publish(WindowEvent::new("focusline", "Settings"));
        assert!(sampler.current_sample().is_none());

        sampler.set_excluded(Vec::new());
        sampler.publish(WindowEvent::new("focusline", "Settings"));
        assert_eq!(sampler.current_sample().window_class, "focusline");
    }

    #[test]
    fn deactivate_clears_the_last_sample() {
        let sampler = ActivitySampler::new(Vec::new());
        let mut rx = sampler.subscribe();
        sampler.activate();
        sampler.publish(WindowEvent::new("code", "a"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().window_class, "code");

        sampler.deactivate();
        assert!(rx.borrow().is_none());
        sampler.activate();
        assert!(sampler.current_sample().is_none());
    }
}
