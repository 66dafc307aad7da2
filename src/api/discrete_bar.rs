use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::core::{AxisScale, Bounds, DiscreteBarDatum, TextMeasurer, TextStyle, ValueFormat, widest_text};
use crate::error::ChartResult;
use crate::reactive::{DerivedCell, Disposer, Graph, RootCell};

use super::{
    BarChartLayout, BarOrder, BarPlacement, BarRow, BarTransition, ChartConfig, DiscreteBarLayout,
    DiscreteBarTuning, HorizontalAxis,
};

type Rows = Rc<[DiscreteBarDatum]>;

/// Horizontal discrete bar chart expressed as derived cells.
///
/// The dataset, configuration and outer bounds are root cells; every
/// intermediate quantity (legend width, end-label widths, domain, range,
/// scale, axis, inner bounds, bar geometry) is a derived cell, so changing
/// one input recomputes only the quantities that read it.
pub struct DiscreteBarChart {
    graph: Graph,
    dataset: RootCell<Vec<DiscreteBarDatum>>,
    config: RootCell<ChartConfig>,
    bounds: RootCell<Bounds>,
    cells: LayoutCells,
}

impl fmt::Debug for DiscreteBarChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscreteBarChart")
            .field("bounds", &self.bounds)
            .field("layout", &self.cells.layout)
            .finish_non_exhaustive()
    }
}

struct LayoutCells {
    chart_bounds: DerivedCell<Bounds>,
    data: DerivedCell<Rows>,
    fail_message: DerivedCell<Option<String>>,
    legend_font_size: DerivedCell<f64>,
    end_label_font_size: DerivedCell<f64>,
    legend_width: DerivedCell<f64>,
    has_positive: DerivedCell<bool>,
    has_negative: DerivedCell<bool>,
    right_end_label_width: DerivedCell<f64>,
    left_end_label_width: DerivedCell<f64>,
    x_domain_default: DerivedCell<(f64, f64)>,
    x_domain: DerivedCell<(f64, f64)>,
    x_range: DerivedCell<(f64, f64)>,
    x_scale: DerivedCell<AxisScale>,
    x_axis: DerivedCell<HorizontalAxis>,
    inner_bounds: DerivedCell<Bounds>,
    bar_height: DerivedCell<f64>,
    bar_spacing: DerivedCell<f64>,
    bar_placements: DerivedCell<Vec<BarPlacement>>,
    layout: DerivedCell<DiscreteBarLayout>,
}

impl LayoutCells {
    fn build(
        graph: &Graph,
        dataset: &RootCell<Vec<DiscreteBarDatum>>,
        config: &RootCell<ChartConfig>,
        bounds: &RootCell<Bounds>,
        measurer: Rc<dyn TextMeasurer>,
    ) -> Self {
        // Narrow slices of the configuration so unrelated edits stop here.
        let tuning: DerivedCell<DiscreteBarTuning> = {
            let config = config.clone();
            graph.derived("discrete_bar.tuning", move || Ok(config.with(|c| c.tuning)))
        };
        let base_font_size = {
            let config = config.clone();
            graph.derived("discrete_bar.base_font_size", move || {
                Ok(config.with(|c| c.base_font_size))
            })
        };
        let value_format: DerivedCell<ValueFormat> = {
            let config = config.clone();
            graph.derived("discrete_bar.value_format", move || {
                Ok(config.with(|c| c.discrete_bar.value_format.clone()))
            })
        };

        let chart_bounds = {
            let bounds = bounds.clone();
            let tuning = tuning.clone();
            graph.derived("discrete_bar.chart_bounds", move || {
                Ok(bounds.get().pad_right(tuning.get()?.outer_right_padding_px))
            })
        };

        let data: DerivedCell<Rows> = {
            let dataset = dataset.clone();
            let config = config.clone();
            graph.derived("discrete_bar.data", move || {
                let (selected, order) = config.with(|c| {
                    (c.discrete_bar.selected_keys.clone(), c.discrete_bar.order)
                });
                let rows = dataset.with(|rows| eligible_rows(rows, selected.as_deref(), order));
                Ok(Rows::from(rows))
            })
        };

        let fail_message = {
            let data = data.clone();
            let config = config.clone();
            graph.derived("discrete_bar.fail_message", move || {
                if data.get()?.is_empty() {
                    Ok(Some(config.with(|c| c.discrete_bar.no_data_message.clone())))
                } else {
                    Ok(None)
                }
            })
        };

        let legend_font_size = {
            let base = base_font_size.clone();
            let tuning = tuning.clone();
            graph.derived("discrete_bar.legend_font_size", move || {
                Ok(tuning.get()?.legend_font_ratio * base.get()?)
            })
        };

        let end_label_font_size = {
            let base = base_font_size.clone();
            let tuning = tuning.clone();
            graph.derived("discrete_bar.end_label_font_size", move || {
                Ok(tuning.get()?.end_label_font_ratio * base.get()?)
            })
        };

        let axis_font_size = {
            let base = base_font_size.clone();
            let tuning = tuning.clone();
            graph.derived("discrete_bar.axis_font_size", move || {
                Ok(tuning.get()?.axis_font_ratio * base.get()?)
            })
        };

        let legend_width = {
            let data = data.clone();
            let font_size = legend_font_size.clone();
            let measurer = Rc::clone(&measurer);
            graph.derived("discrete_bar.legend_width", move || {
                let rows = data.get()?;
                let style = TextStyle::new(font_size.get()?);
                Ok(widest_text(
                    measurer.as_ref(),
                    rows.iter().map(|row| row.label.as_str()),
                    style,
                ))
            })
        };

        let has_positive = {
            let data = data.clone();
            graph.derived("discrete_bar.has_positive", move || {
                Ok(data.get()?.iter().any(|row| !row.is_negative()))
            })
        };

        let has_negative = {
            let data = data.clone();
            graph.derived("discrete_bar.has_negative", move || {
                Ok(data.get()?.iter().any(DiscreteBarDatum::is_negative))
            })
        };

        let right_end_label_width = {
            let has_positive = has_positive.clone();
            let data = data.clone();
            let format = value_format.clone();
            let font_size = end_label_font_size.clone();
            let measurer = Rc::clone(&measurer);
            graph.derived("discrete_bar.right_end_label_width", move || {
                if !has_positive.get()? {
                    return Ok(0.0);
                }
                let rows = data.get()?;
                let format = format.get()?;
                let labels: Vec<String> = rows
                    .iter()
                    .filter(|row| !row.is_negative())
                    .map(|row| format.format(row.value))
                    .collect();
                Ok(widest_text(
                    measurer.as_ref(),
                    labels.iter().map(String::as_str),
                    TextStyle::new(font_size.get()?),
                ))
            })
        };

        let left_end_label_width = {
            let has_negative = has_negative.clone();
            let data = data.clone();
            let format = value_format.clone();
            let font_size = end_label_font_size.clone();
            let tuning = tuning.clone();
            let measurer = Rc::clone(&measurer);
            graph.derived("discrete_bar.left_end_label_width", move || {
                if !has_negative.get()? {
                    return Ok(0.0);
                }
                let rows = data.get()?;
                let format = format.get()?;
                let labels: Vec<String> = rows
                    .iter()
                    .filter(|row| row.is_negative())
                    .map(|row| format.format(row.value))
                    .collect();
                let widest = widest_text(
                    measurer.as_ref(),
                    labels.iter().map(String::as_str),
                    TextStyle::new(font_size.get()?),
                );
                Ok(widest + tuning.get()?.negative_label_separator_px)
            })
        };

        let x_domain_default = {
            let data = data.clone();
            graph.derived("discrete_bar.x_domain_default", move || {
                Ok(default_domain(&data.get()?))
            })
        };

        let x_domain = {
            let config = config.clone();
            let default = x_domain_default.clone();
            graph.derived("discrete_bar.x_domain", move || {
                let domain_override = config.with(|c| c.x_axis.domain);
                let (start, end) = domain_override.apply(default.get()?);
                if start > end {
                    debug!(start, end, "explicit domain crosses the data domain; swapping ends");
                    return Ok((end, start));
                }
                Ok((start, end))
            })
        };

        let x_range = {
            let chart_bounds = chart_bounds.clone();
            let legend_width = legend_width.clone();
            let left = left_end_label_width.clone();
            let right = right_end_label_width.clone();
            graph.derived("discrete_bar.x_range", move || {
                let bounds = chart_bounds.get()?;
                let start = bounds.left + legend_width.get()? + left.get()?;
                let end = (bounds.right() - right.get()?).max(start);
                Ok((start, end))
            })
        };

        let x_scale = {
            let config = config.clone();
            let domain = x_domain.clone();
            let range = x_range.clone();
            graph.derived("discrete_bar.x_scale", move || {
                let tick_format = config.with(|c| c.x_axis.tick_format.clone());
                Ok(AxisScale::new(domain.get()?, range.get()?)?.with_tick_format(tick_format))
            })
        };

        let x_axis = {
            let scale = x_scale.clone();
            let font_size = axis_font_size.clone();
            let tuning = tuning.clone();
            let measurer = Rc::clone(&measurer);
            graph.derived("discrete_bar.x_axis", move || {
                Ok(HorizontalAxis::build(
                    scale.get()?,
                    font_size.get()?,
                    tuning.get()?.axis_label_padding_px,
                    measurer.as_ref(),
                ))
            })
        };

        let inner_bounds = {
            let chart_bounds = chart_bounds.clone();
            let legend_width = legend_width.clone();
            let left = left_end_label_width.clone();
            let right = right_end_label_width.clone();
            let x_axis = x_axis.clone();
            graph.derived("discrete_bar.inner_bounds", move || {
                Ok(chart_bounds
                    .get()?
                    .pad_left(legend_width.get()? + left.get()?)
                    .pad_bottom(x_axis.get()?.height)
                    .pad_right(right.get()?))
            })
        };

        let bar_height = {
            let data = data.clone();
            let inner = inner_bounds.clone();
            let tuning = tuning.clone();
            graph.derived("discrete_bar.bar_height", move || {
                let count = data.get()?.len();
                if count == 0 {
                    return Ok(0.0);
                }
                Ok(tuning.get()?.bar_fill_ratio * inner.get()?.height / count as f64)
            })
        };

        let bar_spacing = {
            let data = data.clone();
            let inner = inner_bounds.clone();
            let bar_height = bar_height.clone();
            graph.derived("discrete_bar.bar_spacing", move || {
                let count = data.get()?.len();
                if count == 0 {
                    return Ok(0.0);
                }
                Ok(inner.get()?.height / count as f64 - bar_height.get()?)
            })
        };

        let bar_placements: DerivedCell<Vec<BarPlacement>> = {
            let data = data.clone();
            let scale = x_scale.clone();
            let inner = inner_bounds.clone();
            let bar_height = bar_height.clone();
            let bar_spacing = bar_spacing.clone();
            graph.derived("discrete_bar.bar_placements", move || {
                let rows = data.get()?;
                let scale = scale.get()?;
                let top = inner.get()?.top;
                let height = bar_height.get()?;
                let step = height + bar_spacing.get()?;
                Ok(rows
                    .iter()
                    .enumerate()
                    .map(|(index, row)| place_bar(&scale, row.value, top + index as f64 * step, height))
                    .collect())
            })
        };

        let layout = {
            let fail_message = fail_message.clone();
            let chart_bounds = chart_bounds.clone();
            let data = data.clone();
            let inner_bounds = inner_bounds.clone();
            let legend_width = legend_width.clone();
            let legend_font_size = legend_font_size.clone();
            let end_label_font_size = end_label_font_size.clone();
            let left = left_end_label_width.clone();
            let right = right_end_label_width.clone();
            let x_axis = x_axis.clone();
            let bar_height = bar_height.clone();
            let bar_spacing = bar_spacing.clone();
            let placements = bar_placements.clone();
            let format = value_format.clone();
            let tuning = tuning.clone();
            graph.derived("discrete_bar.layout", move || {
                let bounds = chart_bounds.get()?;
                if let Some(message) = fail_message.get()? {
                    debug!(%message, "discrete bar chart has no data");
                    return Ok(DiscreteBarLayout::NoData { bounds, message });
                }

                let tuning = tuning.get()?;
                let legend_width = legend_width.get()?;
                let format = format.get()?;
                let legend_x = bounds.left + legend_width - tuning.legend_gap_px;
                let rows: Vec<BarRow> = data
                    .get()?
                    .iter()
                    .zip(placements.get()?)
                    .map(|(datum, placement)| {
                        let end_label_x = if datum.is_negative() {
                            placement.x - tuning.end_label_offset_px
                        } else {
                            placement.right() + tuning.end_label_offset_px
                        };
                        BarRow {
                            value_label: format.format(datum.value),
                            datum: datum.clone(),
                            placement,
                            legend_x,
                            end_label_x,
                        }
                    })
                    .collect();

                let layout = BarChartLayout {
                    bounds,
                    inner_bounds: inner_bounds.get()?,
                    legend_width,
                    legend_font_size: legend_font_size.get()?,
                    end_label_font_size: end_label_font_size.get()?,
                    left_end_label_width: left.get()?,
                    right_end_label_width: right.get()?,
                    x_axis: x_axis.get()?,
                    bar_height: bar_height.get()?,
                    bar_spacing: bar_spacing.get()?,
                    rows,
                };
                debug!(
                    rows = layout.rows.len(),
                    legend_width = layout.legend_width,
                    left_label = layout.left_end_label_width,
                    right_label = layout.right_end_label_width,
                    "discrete bar layout computed"
                );
                Ok(DiscreteBarLayout::Bars(layout))
            })
        };

        Self {
            chart_bounds,
            data,
            fail_message,
            legend_font_size,
            end_label_font_size,
            legend_width,
            has_positive,
            has_negative,
            right_end_label_width,
            left_end_label_width,
            x_domain_default,
            x_domain,
            x_range,
            x_scale,
            x_axis,
            inner_bounds,
            bar_height,
            bar_spacing,
            bar_placements,
            layout,
        }
    }
}

impl DiscreteBarChart {
    pub fn new(
        graph: &Graph,
        config: ChartConfig,
        dataset: Vec<DiscreteBarDatum>,
        bounds: Bounds,
        measurer: Rc<dyn TextMeasurer>,
    ) -> ChartResult<Self> {
        config.validate()?;
        bounds.validate()?;

        let dataset = graph.root("discrete_bar.dataset", dataset);
        let config = graph.root("discrete_bar.config", config);
        let bounds = graph.root("discrete_bar.bounds", bounds);
        let cells = LayoutCells::build(graph, &dataset, &config, &bounds, measurer);

        Ok(Self {
            graph: graph.clone(),
            dataset,
            config,
            bounds,
            cells,
        })
    }

    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn set_dataset(&self, rows: Vec<DiscreteBarDatum>) {
        trace!(rows = rows.len(), "set discrete bar dataset");
        self.dataset.set(rows);
    }

    pub fn set_config(&self, config: ChartConfig) -> ChartResult<()> {
        config.validate()?;
        self.config.set(config);
        Ok(())
    }

    pub fn set_bounds(&self, bounds: Bounds) -> ChartResult<()> {
        self.bounds.set(bounds.validate()?);
        Ok(())
    }

    /// Replaces configuration and dataset together; readers never see one
    /// without the other.
    pub fn replace_inputs(
        &self,
        config: ChartConfig,
        rows: Vec<DiscreteBarDatum>,
    ) -> ChartResult<()> {
        config.validate()?;
        self.graph.run_action(|| {
            self.config.set(config);
            self.dataset.set(rows);
        });
        Ok(())
    }

    #[must_use]
    pub fn dataset(&self) -> Vec<DiscreteBarDatum> {
        self.dataset.get()
    }

    #[must_use]
    pub fn config(&self) -> ChartConfig {
        self.config.get()
    }

    #[must_use]
    pub fn outer_bounds(&self) -> Bounds {
        self.bounds.get()
    }

    /// Outer bounds after the right-hand padding.
    pub fn chart_bounds(&self) -> ChartResult<Bounds> {
        self.cells.chart_bounds.get()
    }

    /// Records eligible for layout, filtered, de-duplicated and ordered.
    pub fn data(&self) -> ChartResult<Rc<[DiscreteBarDatum]>> {
        self.cells.data.get()
    }

    pub fn fail_message(&self) -> ChartResult<Option<String>> {
        self.cells.fail_message.get()
    }

    pub fn legend_font_size(&self) -> ChartResult<f64> {
        self.cells.legend_font_size.get()
    }

    pub fn end_label_font_size(&self) -> ChartResult<f64> {
        self.cells.end_label_font_size.get()
    }

    pub fn legend_width(&self) -> ChartResult<f64> {
        self.cells.legend_width.get()
    }

    pub fn has_positive(&self) -> ChartResult<bool> {
        self.cells.has_positive.get()
    }

    pub fn has_negative(&self) -> ChartResult<bool> {
        self.cells.has_negative.get()
    }

    pub fn right_end_label_width(&self) -> ChartResult<f64> {
        self.cells.right_end_label_width.get()
    }

    pub fn left_end_label_width(&self) -> ChartResult<f64> {
        self.cells.left_end_label_width.get()
    }

    pub fn x_domain_default(&self) -> ChartResult<(f64, f64)> {
        self.cells.x_domain_default.get()
    }

    /// Default domain with the configured override applied.
    pub fn x_domain(&self) -> ChartResult<(f64, f64)> {
        self.cells.x_domain.get()
    }

    pub fn x_range(&self) -> ChartResult<(f64, f64)> {
        self.cells.x_range.get()
    }

    pub fn x_scale(&self) -> ChartResult<AxisScale> {
        self.cells.x_scale.get()
    }

    pub fn x_axis(&self) -> ChartResult<HorizontalAxis> {
        self.cells.x_axis.get()
    }

    pub fn inner_bounds(&self) -> ChartResult<Bounds> {
        self.cells.inner_bounds.get()
    }

    pub fn bar_height(&self) -> ChartResult<f64> {
        self.cells.bar_height.get()
    }

    pub fn bar_spacing(&self) -> ChartResult<f64> {
        self.cells.bar_spacing.get()
    }

    pub fn bar_placements(&self) -> ChartResult<Vec<BarPlacement>> {
        self.cells.bar_placements.get()
    }

    /// Target layout snapshot; `NoData` when nothing is eligible.
    pub fn layout(&self) -> ChartResult<DiscreteBarLayout> {
        self.cells.layout.get()
    }

    #[must_use]
    pub fn layout_cell(&self) -> &DerivedCell<DiscreteBarLayout> {
        &self.cells.layout
    }

    #[must_use]
    pub fn bar_placements_cell(&self) -> &DerivedCell<Vec<BarPlacement>> {
        &self.cells.bar_placements
    }

    /// Restarts `transition` from zero-width bars whenever the target
    /// geometry changes. The transition is cleared while there is no data.
    pub fn drive_transition(
        &self,
        transition: Rc<RefCell<BarTransition>>,
        clock: Rc<dyn Fn() -> f64>,
    ) -> Disposer {
        let fail_message = self.cells.fail_message.clone();
        let placements = self.cells.bar_placements.clone();
        let scale = self.cells.x_scale.clone();
        self.graph.autorun("discrete_bar.transition", move || {
            match fail_message.get() {
                Ok(None) => {}
                Ok(Some(_)) => {
                    transition.borrow_mut().clear();
                    return;
                }
                Err(err) => {
                    warn!(error = %err, "skipping bar transition; layout failed");
                    return;
                }
            }
            match (placements.get(), scale.get()) {
                (Ok(target), Ok(scale)) => {
                    transition.borrow_mut().retarget(target, scale.place(0.0), (*clock)());
                }
                (Err(err), _) | (_, Err(err)) => {
                    warn!(error = %err, "skipping bar transition; placements failed");
                }
            }
        })
    }
}

/// Bar spanning from the zero baseline to `value`.
fn place_bar(scale: &AxisScale, value: f64, y: f64, height: f64) -> BarPlacement {
    let origin = scale.place(0.0);
    let end = scale.place(value);
    let x = if value < 0.0 { end } else { origin };
    BarPlacement {
        x,
        width: (end - origin).abs(),
        y,
        height,
    }
}

/// Default value domain: data extent with the lower end extended to zero.
/// The upper end stays at the largest value, so an all-negative dataset
/// ends short of the baseline.
fn default_domain(rows: &[DiscreteBarDatum]) -> (f64, f64) {
    if rows.is_empty() {
        return (0.0, 0.0);
    }
    let (min, max) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), row| {
        (lo.min(row.value), hi.max(row.value))
    });
    (min.min(0.0), max)
}

/// Finite-valued records, restricted to `selected` keys, first record per key.
fn eligible_rows(
    rows: &[DiscreteBarDatum],
    selected: Option<&[String]>,
    order: BarOrder,
) -> Vec<DiscreteBarDatum> {
    let mut by_key: IndexMap<&str, &DiscreteBarDatum> = IndexMap::with_capacity(rows.len());
    for row in rows {
        if !row.value.is_finite() {
            trace!(key = %row.key, "skipping non-finite value");
            continue;
        }
        if selected.is_some_and(|keys| !keys.iter().any(|key| *key == row.key)) {
            continue;
        }
        if by_key.contains_key(row.key.as_str()) {
            warn!(key = %row.key, "duplicate dataset key; keeping the first record");
            continue;
        }
        by_key.insert(row.key.as_str(), row);
    }

    let mut eligible: Vec<DiscreteBarDatum> = by_key.into_values().cloned().collect();
    match order {
        BarOrder::AsGiven => {}
        BarOrder::ValueAscending => eligible.sort_by(|a, b| a.value.total_cmp(&b.value)),
        BarOrder::ValueDescending => eligible.sort_by(|a, b| b.value.total_cmp(&a.value)),
    }
    eligible
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datum(key: &str, value: f64) -> DiscreteBarDatum {
        DiscreteBarDatum::new(key, key.to_uppercase(), value)
    }

    #[test]
    fn eligible_rows_filter_dedupe_and_order() {
        let rows = vec![
            datum("a", 3.0),
            datum("b", f64::NAN),
            datum("c", -1.0),
            datum("a", 9.0),
            datum("d", 7.0),
        ];

        let as_given = eligible_rows(&rows, None, BarOrder::AsGiven);
        let keys: Vec<&str> = as_given.iter().map(|row| row.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "c", "d"]);
        assert_eq!(as_given[0].value, 3.0);

        let selected = vec!["d".to_owned(), "c".to_owned()];
        let descending = eligible_rows(&rows, Some(&selected), BarOrder::ValueDescending);
        let keys: Vec<&str> = descending.iter().map(|row| row.key.as_str()).collect();
        assert_eq!(keys, vec!["d", "c"]);
    }

    #[test]
    fn default_domain_extends_down_to_zero() {
        assert_eq!(default_domain(&[datum("a", 3.0), datum("b", 8.0)]), (0.0, 8.0));
        assert_eq!(default_domain(&[datum("a", -5.0), datum("b", 10.0)]), (-5.0, 10.0));
        assert_eq!(default_domain(&[datum("a", -5.0), datum("b", -2.0)]), (-5.0, -2.0));
        assert_eq!(default_domain(&[]), (0.0, 0.0));
    }

    #[test]
    fn bars_grow_away_from_the_baseline() {
        let scale = AxisScale::new((-10.0, 10.0), (0.0, 200.0)).expect("scale");

        let positive = place_bar(&scale, 10.0, 0.0, 8.0);
        assert_eq!(positive.x, 100.0);
        assert_eq!(positive.width, 100.0);

        let negative = place_bar(&scale, -5.0, 10.0, 8.0);
        assert_eq!(negative.x, 50.0);
        assert_eq!(negative.width, 50.0);
        assert_eq!(negative.right(), 100.0);
    }
}
