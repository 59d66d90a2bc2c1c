//! Demo scheduler — timer-driven scenario sequencer
//!
//! Runs a fixed timeline of demo scenarios against the coordinator. Each
//! timeline entry gets its own timer task; all tasks of a run are held as
//! one cancellable set, so `stop()` tears the whole run down at once. A
//! generation counter guards against a stale timer from a previous run
//! firing into a new one.
//!
//! `start`/`stop` are idempotent and report via their return value whether
//! they changed anything, so a double-start can never produce a second,
//! uncancellable timer set.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::DemoTiming;
use crate::events::{CareEvent, SharedEventBus};

/// One scenario slot on the demo timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub scenario: String,
    /// Offset from run start at which this scenario begins.
    pub start_ms: u64,
    /// Offset from run start at which this scenario ends.
    pub end_ms: u64,
}

impl TimelineEntry {
    pub fn new(scenario: impl Into<String>, start_ms: u64, end_ms: u64) -> Self {
        Self {
            scenario: scenario.into(),
            start_ms,
            end_ms,
        }
    }

    /// The stock demo loop: three scenarios, 24 seconds each.
    pub fn demo_timeline() -> Vec<Self> {
        vec![
            Self::new("meal_confusion", 0, 24_000),
            Self::new("stove_safety", 24_000, 48_000),
            Self::new("wandering", 48_000, 72_000),
        ]
    }
}

/// Snapshot of the scheduler for status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub elapsed_ms: u64,
    pub current_index: Option<usize>,
    pub current_scenario: Option<String>,
    pub total_entries: usize,
}

/// Called when a timeline entry fires, with the scenario tag and its index.
/// Handlers that need async work spawn it themselves.
pub type FireHandler = Arc<dyn Fn(String, usize) + Send + Sync>;

struct State {
    running: bool,
    generation: u64,
    started_at: Option<Instant>,
    entries: Vec<TimelineEntry>,
    current_index: Option<usize>,
    handles: Vec<JoinHandle<()>>,
}

/// Timer-driven sequencer over a demo timeline.
pub struct DemoScheduler {
    timing: DemoTiming,
    events: SharedEventBus,
    state: Mutex<State>,
}

impl DemoScheduler {
    pub fn new(timing: DemoTiming, events: SharedEventBus) -> Arc<Self> {
        Arc::new(Self {
            timing,
            events,
            state: Mutex::new(State {
                running: false,
                generation: 0,
                started_at: None,
                entries: Vec::new(),
                current_index: None,
                handles: Vec::new(),
            }),
        })
    }

    /// Start a run over `entries`. Returns `false` (and does nothing) when a
    /// run is already active or the timeline is empty.
    ///
    /// Each entry fires `trigger_offset_ms` after its start offset; the run
    /// auto-stops `stop_buffer_ms` after the last entry's end.
    pub fn start(self: &Arc<Self>, entries: Vec<TimelineEntry>, on_fire: FireHandler) -> bool {
        if entries.is_empty() {
            debug!("refusing to start demo with empty timeline");
            return false;
        }

        let generation;
        {
            let mut state = self.state.lock().expect("scheduler lock poisoned");
            if state.running {
                debug!("demo already running; start ignored");
                return false;
            }
            state.running = true;
            state.generation += 1;
            state.started_at = Some(Instant::now());
            state.entries = entries.clone();
            state.current_index = None;
            generation = state.generation;
        }

        info!(entries = entries.len(), "demo run starting");
        self.events.publish(CareEvent::DemoStarted {
            entries: entries.len(),
        });

        let mut handles = Vec::with_capacity(entries.len() + 1);

        for (index, entry) in entries.iter().enumerate() {
            let scheduler = Arc::clone(self);
            let on_fire = Arc::clone(&on_fire);
            let scenario = entry.scenario.clone();
            let fire_at = Duration::from_millis(entry.start_ms + self.timing.trigger_offset_ms);

            handles.push(tokio::spawn(async move {
                tokio::time::sleep(fire_at).await;
                if !scheduler.mark_fired(generation, index) {
                    return;
                }
                debug!(scenario = %scenario, index, "timeline entry firing");
                on_fire(scenario, index);
            }));
        }

        let last_end = entries.last().map(|e| e.end_ms).unwrap_or(0);
        let stop_at = Duration::from_millis(last_end + self.timing.stop_buffer_ms);
        let scheduler = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            tokio::time::sleep(stop_at).await;
            if scheduler.generation() == generation {
                info!("demo timeline exhausted; auto-stopping");
                scheduler.stop();
            }
        }));

        let mut state = self.state.lock().expect("scheduler lock poisoned");
        // stop() may have raced in between; tear the timers down again.
        if !state.running || state.generation != generation {
            for handle in handles {
                handle.abort();
            }
            return true;
        }
        state.handles = handles;
        true
    }

    /// Stop the active run, aborting every pending timer. Returns `false`
    /// when nothing was running.
    pub fn stop(&self) -> bool {
        let handles = {
            let mut state = self.state.lock().expect("scheduler lock poisoned");
            if !state.running {
                return false;
            }
            state.running = false;
            state.current_index = None;
            state.started_at = None;
            std::mem::take(&mut state.handles)
        };

        for handle in &handles {
            handle.abort();
        }
        info!(timers = handles.len(), "demo run stopped");
        self.events.publish(CareEvent::DemoStopped);
        true
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.state.lock().expect("scheduler lock poisoned");
        SchedulerStatus {
            running: state.running,
            elapsed_ms: state
                .started_at
                .map(|t| t.elapsed().as_millis() as u64)
                .unwrap_or(0),
            current_index: state.current_index,
            current_scenario: state
                .current_index
                .and_then(|i| state.entries.get(i))
                .map(|e| e.scenario.clone()),
            total_entries: state.entries.len(),
        }
    }

    /// Record that entry `index` fired, unless the run it belonged to is
    /// gone. Returns whether the fire is still valid.
    fn mark_fired(&self, generation: u64, index: usize) -> bool {
        let mut state = self.state.lock().expect("scheduler lock poisoned");
        if !state.running || state.generation != generation {
            return false;
        }
        state.current_index = Some(index);
        true
    }

    fn generation(&self) -> u64 {
        self.state.lock().expect("scheduler lock poisoned").generation
    }
}
