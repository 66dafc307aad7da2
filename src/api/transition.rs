use tracing::trace;

use super::BarPlacement;

pub const DEFAULT_BAR_TRANSITION_MS: f64 = 250.0;

/// Linear width animation toward the latest bar placements.
///
/// Every retarget restarts from zero-width bars anchored at the zero
/// baseline: positive bars grow rightwards, negative bars grow leftwards.
/// Timestamps are milliseconds on the caller's clock.
#[derive(Debug, Clone, PartialEq)]
pub struct BarTransition {
    duration_ms: f64,
    started_at: f64,
    target: Vec<BarPlacement>,
    origin: f64,
}

impl Default for BarTransition {
    fn default() -> Self {
        Self::new(DEFAULT_BAR_TRANSITION_MS)
    }
}

impl BarTransition {
    #[must_use]
    pub fn new(duration_ms: f64) -> Self {
        Self {
            duration_ms: if duration_ms.is_finite() { duration_ms.max(0.0) } else { 0.0 },
            started_at: 0.0,
            target: Vec::new(),
            origin: 0.0,
        }
    }

    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    /// Restarts the animation toward `target`; `origin` is the pixel
    /// position of the zero baseline every bar grows away from.
    pub fn retarget(&mut self, target: Vec<BarPlacement>, origin: f64, now_ms: f64) {
        trace!(bars = target.len(), origin, now_ms, "bar transition retargeted");
        self.target = target;
        self.origin = origin;
        self.started_at = now_ms;
    }

    pub fn clear(&mut self) {
        self.target.clear();
    }

    #[must_use]
    pub fn target(&self) -> &[BarPlacement] {
        &self.target
    }

    /// Progress in `[0, 1]` at `now_ms`.
    #[must_use]
    pub fn progress(&self, now_ms: f64) -> f64 {
        if self.duration_ms == 0.0 {
            return 1.0;
        }
        ((now_ms - self.started_at) / self.duration_ms).clamp(0.0, 1.0)
    }

    #[must_use]
    pub fn is_finished(&self, now_ms: f64) -> bool {
        self.progress(now_ms) >= 1.0
    }

    /// Interpolated placements at `now_ms`.
    #[must_use]
    pub fn current(&self, now_ms: f64) -> Vec<BarPlacement> {
        let t = self.progress(now_ms);
        if t >= 1.0 {
            return self.target.clone();
        }
        self.target
            .iter()
            .map(|bar| {
                let width = bar.width * t;
                let x = if bar.x < self.origin { self.origin - width } else { bar.x };
                BarPlacement { x, width, ..*bar }
            })
            .collect()
    }
}
