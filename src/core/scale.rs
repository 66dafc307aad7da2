use serde::{Deserialize, Serialize};

use crate::core::ValueFormat;
use crate::core::ticks::nice_ticks;
use crate::error::{ChartError, ChartResult};

/// Partial domain override read from configuration.
///
/// Each side replaces the matching side of the computed default domain.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainOverride {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl DomainOverride {
    #[must_use]
    pub const fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn apply(self, default: (f64, f64)) -> (f64, f64) {
        (self.min.unwrap_or(default.0), self.max.unwrap_or(default.1))
    }

    pub fn validate(self) -> ChartResult<Self> {
        for (side, value) in [("min", self.min), ("max", self.max)] {
            if value.is_some_and(|v| !v.is_finite()) {
                return Err(ChartError::InvalidData(format!(
                    "axis domain {side} must be finite"
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(ChartError::InvalidData(
                    "axis domain min must be <= max".to_owned(),
                ));
            }
        }
        Ok(self)
    }
}

/// Linear mapping from a numeric domain to a pixel range.
///
/// A zero-width domain (for example every value is 0) maps as if it were
/// `[start, start + 1]`, so placements stay finite while ticks still show
/// the single domain value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisScale {
    domain: (f64, f64),
    range: (f64, f64),
    #[serde(default)]
    tick_format: ValueFormat,
}

impl AxisScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> ChartResult<Self> {
        if !domain.0.is_finite() || !domain.1.is_finite() {
            return Err(ChartError::InvalidData(
                "scale domain must be finite".to_owned(),
            ));
        }
        if !range.0.is_finite() || !range.1.is_finite() {
            return Err(ChartError::InvalidData(
                "scale range must be finite".to_owned(),
            ));
        }

        Ok(Self {
            domain,
            range,
            tick_format: ValueFormat::default(),
        })
    }

    #[must_use]
    pub fn with_tick_format(mut self, tick_format: ValueFormat) -> Self {
        self.tick_format = tick_format;
        self
    }

    #[must_use]
    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    #[must_use]
    pub fn tick_format(&self) -> &ValueFormat {
        &self.tick_format
    }

    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.domain.0 == self.domain.1
    }

    fn mapping_domain(&self) -> (f64, f64) {
        if self.is_degenerate() {
            (self.domain.0, self.domain.0 + 1.0)
        } else {
            self.domain
        }
    }

    /// Pixel position of `value`.
    #[must_use]
    pub fn place(&self, value: f64) -> f64 {
        let (start, end) = self.mapping_domain();
        let normalized = (value - start) / (end - start);
        self.range.0 + normalized * (self.range.1 - self.range.0)
    }

    /// Domain value at `pixel`. A zero-width range maps everything to the domain start.
    #[must_use]
    pub fn invert(&self, pixel: f64) -> f64 {
        let span = self.range.1 - self.range.0;
        if span == 0.0 {
            return self.domain.0;
        }
        let (start, end) = self.mapping_domain();
        start + (pixel - self.range.0) / span * (end - start)
    }

    #[must_use]
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        if self.is_degenerate() {
            return vec![self.domain.0];
        }
        nice_ticks(self.domain.0, self.domain.1, count)
    }

    #[must_use]
    pub fn format_tick(&self, value: f64) -> String {
        self.tick_format.format(value)
    }
}
