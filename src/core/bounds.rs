use serde::{Deserialize, Serialize};

use crate::core::{TextMeasurer, TextStyle};
use crate::error::{ChartError, ChartResult};

/// Axis-aligned rectangle in pixel space.
///
/// Values are immutable: every padding operation returns a new rectangle.
/// Padding never produces a negative extent; an inset larger than the
/// available size collapses that side to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    #[must_use]
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Bounds of a single line of text placed at the origin.
    #[must_use]
    pub fn for_text(measurer: &dyn TextMeasurer, text: &str, style: TextStyle) -> Self {
        let metrics = measurer.measure(text, style);
        Self::new(0.0, 0.0, metrics.width, metrics.height)
    }

    #[must_use]
    pub fn right(self) -> f64 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(self) -> f64 {
        self.top + self.height
    }

    #[must_use]
    pub fn center_y(self) -> f64 {
        self.top + self.height / 2.0
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width >= 0.0
            && self.height >= 0.0
    }

    pub fn validate(self) -> ChartResult<Self> {
        if !self.is_valid() {
            return Err(ChartError::InvalidBounds {
                width: self.width,
                height: self.height,
            });
        }
        Ok(self)
    }

    #[must_use]
    pub fn pad_left(self, amount: f64) -> Self {
        let applied = amount.min(self.width);
        Self {
            left: self.left + applied,
            width: self.width - applied,
            ..self
        }
    }

    #[must_use]
    pub fn pad_right(self, amount: f64) -> Self {
        Self {
            width: (self.width - amount).max(0.0),
            ..self
        }
    }

    #[must_use]
    pub fn pad_top(self, amount: f64) -> Self {
        let applied = amount.min(self.height);
        Self {
            top: self.top + applied,
            height: self.height - applied,
            ..self
        }
    }

    #[must_use]
    pub fn pad_bottom(self, amount: f64) -> Self {
        Self {
            height: (self.height - amount).max(0.0),
            ..self
        }
    }
}
