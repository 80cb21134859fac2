use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::WindowEvent;

use super::loop_worker::sensing_loop;
use super::sampler::ActivitySampler;

/// Owns the sensing loop for the lifetime of the controller. Starting and
/// stopping sensing only toggles the sampler; the loop keeps draining the
/// window feed either way.
pub struct SensingController {
    sampler: Arc<ActivitySampler>,
    handle: Option<JoinHandle<()>>,
    cancel_token: CancellationToken,
}

impl SensingController {
    /// Must be called from within a tokio runtime.
    pub fn new(sampler: Arc<ActivitySampler>, feed: mpsc::Receiver<WindowEvent>) -> Self {
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sensing_loop(
            feed,
            Arc::clone(&sampler),
            cancel_token.clone(),
        ));

        Self {
            sampler,
            handle: Some(handle),
            cancel_token,
        }
    }

    pub fn is_running(&self) -> bool {
        self.sampler.is_active()
    }

    /// Whether the loop is still draining the feed.
    pub fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    pub fn start_sensing(&self) -> Result<()> {
        if !self.is_alive() {
            bail!("window feed is closed");
        }
        if !self.sampler.is_active() {
            info!("Starting window sensing");
            self.sampler.activate();
        }
        Ok(())
    }

    pub fn stop_sensing(&self) {
        if self.sampler.is_active() {
            info!("Stopping window sensing");
        }
        self.sampler.deactivate();
    }

    /// Stop sensing and wait for the loop to exit.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stop_sensing();
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.await.context("sensing loop task failed to join")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_events_only_while_running() {
        let sampler = Arc::new(ActivitySampler::new(Vec::new()));
        let (tx, rx) = mpsc::channel(8);
        let mut controller = SensingController::new(Arc::clone(&sampler), rx);
        let mut latest = sampler.subscribe();

        controller.start_sensing().unwrap();
        controller.start_sensing().unwrap();
        assert!(controller.is_running());
        assert!(sampler.current_sample().is_none());

        tx.send(WindowEvent::new("code", "lib.rs")).await.unwrap();
        latest.changed().await.unwrap();
        assert_eq!(sampler.current_sample().title, "lib.rs");

        controller.stop_sensing();
        assert!(!controller.is_running());
        assert!(sampler.current_sample().is_none());

        controller.shutdown().await.unwrap();
        assert!(!controller.is_alive());
        assert!(controller.start_sensing().is_err());
    }

    #[tokio::test]
    async fn feed_is_drained_while_stopped() {
        let sampler = Arc::new(ActivitySampler::new(Vec::new()));
        let (tx, rx) = mpsc::channel(4);
        let controller = SensingController::new(Arc::clone(&sampler), rx);

        for n in 0..20 {
            tx.send(WindowEvent::new("term", format!("zsh {n}")))
                .await
                .unwrap();
        }
        while tx.capacity() < 4 {
            tokio::task::yield_now().await;
        }
        assert!(sampler.current_sample().is_none());

        controller.start_sensing().unwrap();
        let mut latest = sampler.subscribe();
        tx.send(WindowEvent::new("term", "vim")).await.unwrap();
        latest.changed().await.unwrap();
        assert_eq!(sampler.current_sample().title, "vim");
    }

    #[tokio::test]
    async fn closed_feed_refuses_to_start() {
        let sampler = Arc::new(ActivitySampler::new(Vec::new()));
        let (tx, rx) = mpsc::channel(4);
        let controller = SensingController::new(sampler, rx);
        drop(tx);

        while controller.is_alive() {
            tokio::task::yield_now().await;
        }
        assert!(controller.start_sensing().is_err());
        assert!(!controller.is_running());
    }
}
