//! Timer-driven input sampling, decoupled from the source's push rate.

use std::sync::Arc;
use std::sync::Mutex;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::history::{InputSample, SampleHistory};
use crate::TraceConfig;

/// Pulls the latest available input state; `None` when no snapshot exists
/// yet (nothing is appended then). Typically backed by the hub's snapshot
/// cache.
pub type SampleProvider = Arc<dyn Fn() -> Option<InputSample> + Send + Sync>;

/// Samples driver inputs at a fixed rate into a [`SampleHistory`].
///
/// The sampling rate is independent of the upstream push rate: when the
/// source is slower the same snapshot is recorded more than once, when it is
/// faster intermediate snapshots are skipped. `start`/`stop` are idempotent;
/// stopping leaves the collected history intact.
pub struct InputTraceSampler {
    config: TraceConfig,
    history: SampleHistory,
    provider: SampleProvider,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl InputTraceSampler {
    pub fn new(config: TraceConfig, provider: SampleProvider) -> Self {
        let history = SampleHistory::new(config.capacity());
        Self {
            config,
            history,
            provider,
            task: Mutex::new(None),
        }
    }

    /// Begin sampling. No-op when already running.
    pub fn start(&self) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.is_some() {
            debug!("Input trace sampler already running");
            return;
        }

        let history = self.history.clone();
        let provider = Arc::clone(&self.provider);
        let period = self.config.sample_interval();

        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Some(sample) = provider() {
                    history.push(sample);
                }
            }
        }));
        debug!(
            rate_hz = self.config.sample_rate_hz(),
            capacity = self.config.capacity(),
            "Input trace sampler started"
        );
    }

    /// Stop sampling and release the timer. No-op when already stopped; the
    /// last-collected history stays available for inspection.
    pub fn stop(&self) {
        let handle = {
            let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
            task.take()
        };
        match handle {
            Some(handle) => {
                handle.abort();
                debug!("Input trace sampler stopped");
            }
            None => debug!("Stop requested while sampler not running"),
        }
    }

    pub fn is_running(&self) -> bool {
        let task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        task.is_some()
    }

    /// Handle to the collected history for rendering.
    pub fn history(&self) -> SampleHistory {
        self.history.clone()
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }
}

impl Drop for InputTraceSampler {
    fn drop(&mut self) {
        self.stop();
    }
}
