use serde::{Deserialize, Serialize};

use crate::core::{DomainOverride, ValueFormat};
use crate::error::{ChartError, ChartResult};

pub const DEFAULT_BASE_FONT_SIZE: f64 = 16.0;
pub const DEFAULT_NO_DATA_MESSAGE: &str = "No matching data";

/// Chart configuration document.
///
/// Serializable with defaults on every field so stored documents may omit
/// anything they do not customize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub title: String,
    pub base_font_size: f64,
    pub x_axis: AxisConfig,
    pub discrete_bar: DiscreteBarConfig,
    pub tuning: DiscreteBarTuning,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            base_font_size: DEFAULT_BASE_FONT_SIZE,
            x_axis: AxisConfig::default(),
            discrete_bar: DiscreteBarConfig::default(),
            tuning: DiscreteBarTuning::default(),
        }
    }
}

impl ChartConfig {
    #[must_use]
    pub fn with_base_font_size(mut self, base_font_size: f64) -> Self {
        self.base_font_size = base_font_size;
        self
    }

    #[must_use]
    pub fn with_domain(mut self, domain: DomainOverride) -> Self {
        self.x_axis.domain = domain;
        self
    }

    #[must_use]
    pub fn with_value_format(mut self, format: ValueFormat) -> Self {
        self.discrete_bar.value_format = format;
        self
    }

    #[must_use]
    pub fn with_selected_keys(mut self, keys: Vec<String>) -> Self {
        self.discrete_bar.selected_keys = Some(keys);
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: BarOrder) -> Self {
        self.discrete_bar.order = order;
        self
    }

    pub fn validate(&self) -> ChartResult<()> {
        if !self.base_font_size.is_finite() || self.base_font_size <= 0.0 {
            return Err(ChartError::InvalidData(
                "base font size must be finite and > 0".to_owned(),
            ));
        }
        self.x_axis.domain.validate()?;
        self.x_axis.tick_format.validate()?;
        self.discrete_bar.value_format.validate()?;
        self.tuning.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    pub domain: DomainOverride,
    pub tick_format: ValueFormat,
}

/// Row ordering applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarOrder {
    #[default]
    AsGiven,
    ValueAscending,
    ValueDescending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscreteBarConfig {
    /// Format of the value labels drawn at the end of each bar.
    pub value_format: ValueFormat,
    /// Restricts the chart to these keys when present.
    pub selected_keys: Option<Vec<String>>,
    pub order: BarOrder,
    pub no_data_message: String,
}

impl Default for DiscreteBarConfig {
    fn default() -> Self {
        Self {
            value_format: ValueFormat::default(),
            selected_keys: None,
            order: BarOrder::default(),
            no_data_message: DEFAULT_NO_DATA_MESSAGE.to_owned(),
        }
    }
}

/// Layout constants of the discrete bar chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscreteBarTuning {
    pub legend_font_ratio: f64,
    pub end_label_font_ratio: f64,
    pub axis_font_ratio: f64,
    /// Share of each row taken by the bar; the rest is spacing.
    pub bar_fill_ratio: f64,
    pub negative_label_separator_px: f64,
    pub outer_right_padding_px: f64,
    pub axis_label_padding_px: f64,
    pub end_label_offset_px: f64,
    pub legend_gap_px: f64,
}

impl Default for DiscreteBarTuning {
    fn default() -> Self {
        Self {
            legend_font_ratio: 0.85,
            end_label_font_ratio: 0.75,
            axis_font_ratio: 0.7,
            bar_fill_ratio: 0.8,
            negative_label_separator_px: 10.0,
            outer_right_padding_px: 10.0,
            axis_label_padding_px: 5.0,
            end_label_offset_px: 5.0,
            legend_gap_px: 5.0,
        }
    }
}

impl DiscreteBarTuning {
    pub fn validate(self) -> ChartResult<()> {
        for (name, ratio) in [
            ("legend_font_ratio", self.legend_font_ratio),
            ("end_label_font_ratio", self.end_label_font_ratio),
            ("axis_font_ratio", self.axis_font_ratio),
            ("bar_fill_ratio", self.bar_fill_ratio),
        ] {
            if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
                return Err(ChartError::InvalidData(format!(
                    "tuning `{name}` must be in (0, 1]"
                )));
            }
        }

        for (name, px) in [
            ("negative_label_separator_px", self.negative_label_separator_px),
            ("outer_right_padding_px", self.outer_right_padding_px),
            ("axis_label_padding_px", self.axis_label_padding_px),
            ("end_label_offset_px", self.end_label_offset_px),
            ("legend_gap_px", self.legend_gap_px),
        ] {
            if !px.is_finite() || px < 0.0 {
                return Err(ChartError::InvalidData(format!(
                    "tuning `{name}` must be finite and >= 0"
                )));
            }
        }

        Ok(())
    }
}
