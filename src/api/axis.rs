use serde::{Deserialize, Serialize};

use crate::core::{
    AxisScale, TextMeasurer, TextStyle, axis_tick_target_count, ticks::AXIS_TARGET_SPACING_PX,
};

const AXIS_MIN_TICKS: usize = 2;
const AXIS_MAX_TICKS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisTick {
    pub value: f64,
    pub x: f64,
    pub label: String,
}

/// Value axis drawn under the bars.
///
/// Ticks and the axis height depend on the scale and on measured label
/// extents, so both are resolved when the axis is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizontalAxis {
    pub scale: AxisScale,
    pub font_size: f64,
    pub ticks: Vec<AxisTick>,
    pub height: f64,
}

impl HorizontalAxis {
    #[must_use]
    pub fn build(
        scale: AxisScale,
        font_size: f64,
        label_padding: f64,
        measurer: &dyn TextMeasurer,
    ) -> Self {
        let (range_start, range_end) = scale.range();
        let tick_count = axis_tick_target_count(
            (range_end - range_start).abs(),
            AXIS_TARGET_SPACING_PX,
            AXIS_MIN_TICKS,
            AXIS_MAX_TICKS,
        );

        let style = TextStyle::new(font_size);
        let mut label_height: f64 = 0.0;
        let ticks: Vec<AxisTick> = scale
            .ticks(tick_count)
            .into_iter()
            .map(|value| {
                let label = scale.format_tick(value);
                label_height = label_height.max(measurer.measure(&label, style).height);
                AxisTick {
                    value,
                    x: scale.place(value),
                    label,
                }
            })
            .collect();

        if ticks.is_empty() {
            label_height = font_size;
        }

        Self {
            scale,
            font_size,
            ticks,
            height: label_height + label_padding,
        }
    }

    /// Vertical center of the tick labels for an axis whose bottom edge is `bottom`.
    #[must_use]
    pub fn label_y(&self, bottom: f64) -> f64 {
        bottom - self.height / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::HorizontalAxis;
    use crate::core::{AxisScale, HeuristicTextMeasurer};

    #[test]
    fn height_is_label_height_plus_padding() {
        let scale = AxisScale::new((0.0, 100.0), (0.0, 400.0)).expect("scale");
        let axis = HorizontalAxis::build(scale, 10.0, 5.0, &HeuristicTextMeasurer);

        assert_eq!(axis.height, 15.0);
        assert_eq!(axis.ticks.first().map(|t| t.value), Some(0.0));
        assert_eq!(axis.ticks.last().map(|t| t.value), Some(100.0));
        assert!(axis.ticks.iter().all(|tick| (0.0..=400.0).contains(&tick.x)));
    }

    #[test]
    fn degenerate_scale_shows_single_zero_tick() {
        let scale = AxisScale::new((0.0, 0.0), (10.0, 300.0)).expect("scale");
        let axis = HorizontalAxis::build(scale, 10.0, 5.0, &HeuristicTextMeasurer);

        assert_eq!(axis.ticks.len(), 1);
        assert_eq!(axis.ticks[0].label, "0");
        assert_eq!(axis.ticks[0].x, 10.0);
    }
}
