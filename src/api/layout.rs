use serde::{Deserialize, Serialize};

use crate::core::{Bounds, DiscreteBarDatum};

use super::HorizontalAxis;

/// Horizontal extent of one bar in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarPlacement {
    pub x: f64,
    pub width: f64,
    /// Top edge of the bar.
    pub y: f64,
    pub height: f64,
}

impl BarPlacement {
    #[must_use]
    pub fn right(self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn center_y(self) -> f64 {
        self.y + self.height / 2.0
    }
}

/// Everything a renderer needs to draw one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRow {
    pub datum: DiscreteBarDatum,
    pub placement: BarPlacement,
    pub value_label: String,
    /// Right edge of the legend label.
    pub legend_x: f64,
    /// Anchor of the end label; it extends left of this for negative bars.
    pub end_label_x: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarChartLayout {
    pub bounds: Bounds,
    pub inner_bounds: Bounds,
    pub legend_width: f64,
    pub legend_font_size: f64,
    pub end_label_font_size: f64,
    pub left_end_label_width: f64,
    pub right_end_label_width: f64,
    pub x_axis: HorizontalAxis,
    pub bar_height: f64,
    pub bar_spacing: f64,
    pub rows: Vec<BarRow>,
}

impl BarChartLayout {
    #[must_use]
    pub fn placements(&self) -> Vec<BarPlacement> {
        self.rows.iter().map(|row| row.placement).collect()
    }
}

/// Target geometry of a discrete bar chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DiscreteBarLayout {
    /// Nothing to draw; `message` replaces the chart.
    NoData { bounds: Bounds, message: String },
    Bars(BarChartLayout),
}

impl DiscreteBarLayout {
    #[must_use]
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData { .. })
    }

    #[must_use]
    pub fn bars(&self) -> Option<&BarChartLayout> {
        match self {
            Self::Bars(layout) => Some(layout),
            Self::NoData { .. } => None,
        }
    }

    #[must_use]
    pub fn bounds(&self) -> Bounds {
        match self {
            Self::NoData { bounds, .. } => *bounds,
            Self::Bars(layout) => layout.bounds,
        }
    }
}
