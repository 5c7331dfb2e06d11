//! Fixed-capacity rolling sample history.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use openoverlay_telemetry::PhysicsSnapshot;

/// Driver inputs at the moment of capture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSample {
    /// Normalized 0..=1.
    pub throttle: f32,
    /// Normalized 0..=1.
    pub brake: f32,
    /// Degrees, negative is left.
    pub steering_angle: f32,
}

impl InputSample {
    pub fn from_physics(physics: &PhysicsSnapshot) -> Self {
        Self {
            throttle: physics.throttle,
            brake: physics.brake,
            steering_angle: physics.steering_angle,
        }
    }
}

/// Ring of the most recent input samples.
///
/// Single writer (the sampling timer), any number of readers. Appends at
/// capacity evict exactly the oldest sample, so insertion order is preserved
/// and steady-state length is constant. Cloning the history clones the
/// handle, not the samples.
#[derive(Clone)]
pub struct SampleHistory {
    samples: Arc<Mutex<VecDeque<InputSample>>>,
    capacity: usize,
}

impl SampleHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn push(&self, sample: InputSample) {
        // Recover from mutex poisoning: losing one trace sample is
        // acceptable, panicking the sampler is not.
        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());

        if samples.len() >= self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Consistent copy of the current history, oldest first. Never observes
    /// a torn sample; does not block the writer beyond the copy.
    pub fn snapshot(&self) -> Vec<InputSample> {
        let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<InputSample> {
        let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.back().copied()
    }

    pub fn len(&self) -> usize {
        let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.clear();
    }
}
