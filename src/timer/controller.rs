use std::{sync::Arc, time::Duration};

use anyhow::Result;
use log::{error, info};
use serde::Serialize;
use tokio::{
    sync::{broadcast, mpsc, Mutex},
    task::JoinHandle,
    time::{self, Instant},
};

use crate::{
    db::Database,
    models::{SessionTimeline, WindowEvent},
    sensing::{ActivitySampler, SensingController},
    settings::{SettingsRepository, UserSettings},
    timeline::{layout_timeline, TickOutcome, TimelineSnapshot},
};

use super::{
    engine::{EngineStatus, FocusEngine},
    state::{PhaseTransition, SessionClock},
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum TimerEvent {
    StateChanged {
        clock: SessionClock,
    },
    Heartbeat {
        clock: SessionClock,
        timeline: TimelineSnapshot,
    },
    TimelineCommitted {
        tick: u64,
        window_class: String,
        intervals: usize,
    },
    SessionArchived {
        timeline: TimelineSnapshot,
    },
}

#[derive(Clone)]
pub struct TimerController {
    engine: Arc<Mutex<FocusEngine>>,
    db: Database,
    settings: Arc<dyn SettingsRepository>,
    events: broadcast::Sender<TimerEvent>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
    sampler: Arc<ActivitySampler>,
    sensing: Arc<Mutex<SensingController>>,
}

impl TimerController {
    pub fn new(
        db: Database,
        settings: Arc<dyn SettingsRepository>,
        feed: mpsc::Receiver<WindowEvent>,
    ) -> Self {
        let debug_mode = std::env::var("FOCUSLINE_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let user_settings = settings.load();
        let sampler = Arc::new(ActivitySampler::new(user_settings.excluded_windows.clone()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            engine: Arc::new(Mutex::new(FocusEngine::new(&user_settings))),
            db,
            settings,
            events,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: if debug_mode { 1 } else { 10 },
            sensing: Arc::new(Mutex::new(SensingController::new(
                Arc::clone(&sampler),
                feed,
            ))),
            sampler,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub async fn status(&self) -> EngineStatus {
        self.engine.lock().await.status()
    }

    pub async fn snapshot(&self) -> TimelineSnapshot {
        self.engine.lock().await.snapshot()
    }

    /// Archived timelines, oldest first.
    pub async fn history(&self) -> Vec<TimelineSnapshot> {
        let engine = self.engine.lock().await;
        engine
            .history()
            .entries()
            .map(|timeline| layout_timeline(timeline))
            .collect()
    }

    /// Fill history from the database. Returns how many timelines were loaded.
    pub async fn load_history(&self) -> Result<usize> {
        let limit = self.settings.load().history_limit;
        let stored = self.db.list_timelines(limit).await?;
        let count = stored.len();
        self.engine.lock().await.preload_history(stored);
        info!("Loaded {count} archived timelines");
        Ok(count)
    }

    /// Begin a run or resume a paused one. `false` when there was nothing to do.
    pub async fn start(&self) -> Result<bool> {
        {
            let sensing = self.sensing.lock().await;
            let mut engine = self.engine.lock().await;
            if !engine.clock().can_start() {
                return Ok(false);
            }
            sensing.start_sensing()?;
            engine.start();
        }

        self.spawn_ticker().await;
        self.emit_state_changed().await;
        Ok(true)
    }

    pub async fn pause(&self) -> Result<bool> {
        if !self.engine.lock().await.pause() {
            return Ok(false);
        }

        self.cancel_ticker().await;
        self.sensing.lock().await.stop_sensing();
        self.emit_state_changed().await;
        Ok(true)
    }

    /// Back to idle. A started run that was not archived yet is archived and
    /// persisted before this returns; uncommitted activity is dropped.
    pub async fn reset(&self) -> Result<Option<String>> {
        self.cancel_ticker().await;
        self.sensing.lock().await.stop_sensing();

        let archived_id = {
            let mut engine = self.engine.lock().await;
            let archived = engine.reset();
            let archived_id = archived.as_ref().map(|timeline| timeline.id().to_string());
            // Persist under the engine lock so a delete cannot overtake the insert.
            if let Some(timeline) = archived {
                publish_archived(&self.events, &self.db, timeline).await;
            }
            archived_id
        };

        self.emit_state_changed().await;
        Ok(archived_id)
    }

    /// Reset, then stop the sensing loop for good.
    pub async fn shutdown(&self) -> Result<Option<String>> {
        let archived = self.reset().await?;
        self.sensing.lock().await.shutdown().await?;
        Ok(archived)
    }

    pub async fn update_settings(&self, settings: UserSettings) -> Result<()> {
        self.settings.save(&settings)?;
        self.sampler.set_excluded(settings.excluded_windows.clone());
        self.engine.lock().await.configure(&settings);
        info!("Settings updated");
        self.emit_state_changed().await;
        Ok(())
    }

    /// Remove an archived timeline from memory and storage. `false` when
    /// neither knew the id.
    pub async fn delete_session(&self, id: &str) -> Result<bool> {
        let in_memory = self.engine.lock().await.delete_session(id);
        let in_db = self.db.delete_timeline(id).await?;
        Ok(in_memory || in_db)
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let engine = self.engine.clone();
        let events = self.events.clone();
        let db = self.db.clone();
        let sampler = self.sampler.clone();
        let sensing = self.sensing.clone();
        let tick_interval = self.tick_interval;
        let heartbeat_every = self.heartbeat_every_ticks;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
            let mut ticks: u32 = 0;
            loop {
                interval.tick().await;

                let sample = sampler.current_sample();
                let (report, clock, snapshot) = {
                    let mut guard = engine.lock().await;
                    let report = match guard.handle_tick(&sample) {
                        Ok(Some(report)) => report,
                        Ok(None) => break,
                        Err(err) => {
                            error!("Failed to fold activity sample: {err}");
                            continue;
                        }
                    };
                    if let Some(archived) = &report.archived {
                        publish_archived(&events, &db, Arc::clone(archived)).await;
                    }
                    (report, guard.clock().clone(), guard.snapshot())
                };

                if let TickOutcome::Committed {
                    window_class,
                    intervals,
                } = &report.outcome
                {
                    let _ = events.send(TimerEvent::TimelineCommitted {
                        tick: report.tick.tick,
                        window_class: window_class.clone(),
                        intervals: *intervals,
                    });
                }

                if report.tick.transition.is_some() {
                    let _ = events.send(TimerEvent::StateChanged {
                        clock: clock.clone(),
                    });
                }

                if report.archived.is_some() {
                    sensing.lock().await.stop_sensing();
                }

                if report.tick.transition == Some(PhaseTransition::Completed) {
                    break;
                }

                ticks = ticks.wrapping_add(1);
                if ticks % heartbeat_every == 0 {
                    let _ = events.send(TimerEvent::Heartbeat {
                        clock,
                        timeline: snapshot,
                    });
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    async fn emit_state_changed(&self) {
        let clock = self.engine.lock().await.clock().clone();
        let _ = self.events.send(TimerEvent::StateChanged { clock });
    }
}

/// Announce an archived run and persist it.
async fn publish_archived(
    events: &broadcast::Sender<TimerEvent>,
    db: &Database,
    timeline: Arc<SessionTimeline>,
) {
    let _ = events.send(TimerEvent::SessionArchived {
        timeline: layout_timeline(&timeline),
    });

    if let Err(err) = db.insert_timeline(&timeline).await {
        error!("Failed to persist timeline {}: {err:?}", timeline.id());
    }
}
