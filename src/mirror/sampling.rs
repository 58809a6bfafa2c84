//! Per-request mirroring decision.

use rand::Rng;

/// Decides whether a request is copied to the shadow backend.
///
/// Draws come from the thread-local generator, so concurrent requests never
/// share generator state.
#[derive(Debug, Clone, Copy)]
pub struct Sampler {
    percent: f64,
}

impl Sampler {
    /// `percent` is the share of traffic to mirror; 100 mirrors everything.
    pub fn new(percent: f64) -> Self {
        Self { percent }
    }

    pub fn should_mirror(&self) -> bool {
        self.accepts(rand::thread_rng().gen::<f64>())
    }

    /// `draw` is uniform in `[0, 1)`.
    fn accepts(&self, draw: f64) -> bool {
        self.percent >= 100.0 || draw * 100.0 < self.percent
    }
}
