use tracing::trace;

use crate::api::{BarChartLayout, BarPlacement, DEFAULT_BASE_FONT_SIZE, DiscreteBarLayout};
use crate::core::Color;
use crate::render::{LinePrimitive, RectPrimitive, RenderFrame, TextHAlign, TextPrimitive};

/// Colors and stroke widths of the discrete bar scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarSceneStyle {
    pub label_color: Color,
    pub axis_label_color: Color,
    pub grid_color: Color,
    pub grid_width: f64,
    /// Multiplied into each datum's color alpha.
    pub bar_opacity: f64,
    pub no_data_color: Color,
    pub no_data_font_size: f64,
}

impl Default for BarSceneStyle {
    fn default() -> Self {
        Self {
            label_color: Color::rgb(0.2, 0.2, 0.2),
            axis_label_color: Color::rgb(0.4, 0.4, 0.4),
            grid_color: Color::rgba(0.0, 0.0, 0.0, 0.1),
            grid_width: 1.0,
            bar_opacity: 0.85,
            no_data_color: Color::rgb(0.4, 0.4, 0.4),
            no_data_font_size: DEFAULT_BASE_FONT_SIZE,
        }
    }
}

/// Materializes a layout into draw commands.
///
/// `animated` replaces the target bar geometry (for example with
/// `BarTransition::current`); end labels follow the animated bar ends.
/// Empty labels produce no text primitive.
#[must_use]
pub fn build_discrete_bar_frame(
    layout: &DiscreteBarLayout,
    animated: Option<&[BarPlacement]>,
    style: &BarSceneStyle,
) -> RenderFrame {
    match layout {
        DiscreteBarLayout::NoData { bounds, message } => {
            let mut frame = RenderFrame::new(*bounds);
            if !message.is_empty() {
                frame = frame.with_text(TextPrimitive::new(
                    message.as_str(),
                    bounds.left + bounds.width / 2.0,
                    bounds.center_y(),
                    style.no_data_font_size,
                    style.no_data_color,
                    TextHAlign::Center,
                ));
            }
            frame
        }
        DiscreteBarLayout::Bars(layout) => build_bars(layout, animated, style),
    }
}

fn build_bars(
    layout: &BarChartLayout,
    animated: Option<&[BarPlacement]>,
    style: &BarSceneStyle,
) -> RenderFrame {
    let mut frame = RenderFrame::new(layout.bounds);
    let inner = layout.inner_bounds;
    let axis = &layout.x_axis;
    let label_y = axis.label_y(layout.bounds.bottom());

    for tick in &axis.ticks {
        frame.lines.push(LinePrimitive::vertical(
            tick.x,
            inner.top,
            inner.bottom(),
            style.grid_width,
            style.grid_color,
        ));
        if !tick.label.is_empty() {
            frame.texts.push(TextPrimitive::new(
                tick.label.as_str(),
                tick.x,
                label_y,
                axis.font_size,
                style.axis_label_color,
                TextHAlign::Center,
            ));
        }
    }

    for (index, row) in layout.rows.iter().enumerate() {
        let target = row.placement;
        let bar = animated
            .and_then(|bars| bars.get(index).copied())
            .unwrap_or(target);

        frame.rects.push(RectPrimitive::new(
            bar.x,
            bar.y,
            bar.width,
            bar.height,
            row.datum.color.with_opacity(style.bar_opacity),
        ));

        if !row.datum.label.is_empty() {
            frame.texts.push(TextPrimitive::new(
                row.datum.label.as_str(),
                row.legend_x,
                target.center_y(),
                layout.legend_font_size,
                style.label_color,
                TextHAlign::Right,
            ));
        }

        if !row.value_label.is_empty() {
            let (x, h_align) = if row.datum.is_negative() {
                (bar.x - (target.x - row.end_label_x), TextHAlign::Right)
            } else {
                (bar.right() + (row.end_label_x - target.right()), TextHAlign::Left)
            };
            frame.texts.push(TextPrimitive::new(
                row.value_label.as_str(),
                x,
                target.center_y(),
                layout.end_label_font_size,
                style.label_color,
                h_align,
            ));
        }
    }

    trace!(
        lines = frame.lines.len(),
        rects = frame.rects.len(),
        texts = frame.texts.len(),
        "discrete bar frame built"
    );
    frame
}
