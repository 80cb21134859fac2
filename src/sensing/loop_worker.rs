use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::WindowEvent;

use super::sampler::ActivitySampler;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

// Import the logging macros (exported at crate root)
use crate::{log_debug, log_info};

/// Forward window events into the sampler until cancelled or the feed closes.
/// The feed is drained even while the sampler is inactive so producers never
/// block; the sampler drops those events.
pub async fn sensing_loop(
    mut feed: mpsc::Receiver<WindowEvent>,
    sampler: Arc<ActivitySampler>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("sensing loop shutting down");
                break;
            }
            event = feed.recv() => {
                match event {
                    Some(event) => {
                        log_debug!("window event: {} / {}", event.window_class, event.title);
                        sampler.publish(event);
                    }
                    None => {
                        log_info!("window feed closed, sensing loop exiting");
                        break;
                    }
                }
            }
        }
    }
}
