/// Pixel spacing the horizontal value axis aims for between tick labels.
pub const AXIS_TARGET_SPACING_PX: f64 = 80.0;

/// Number of ticks that fit `axis_span_px` at the target spacing.
#[must_use]
pub fn axis_tick_target_count(
    axis_span_px: f64,
    target_spacing_px: f64,
    min_ticks: usize,
    max_ticks: usize,
) -> usize {
    if !axis_span_px.is_finite() || axis_span_px <= 0.0 {
        return min_ticks;
    }
    if !target_spacing_px.is_finite() || target_spacing_px <= 0.0 {
        return min_ticks;
    }

    let raw = (axis_span_px / target_spacing_px).floor() as usize + 1;
    raw.clamp(min_ticks, max_ticks)
}

/// Step of the form 1, 2 or 5 times a power of ten giving about `count` ticks.
#[must_use]
pub fn nice_step(start: f64, end: f64, count: usize) -> f64 {
    let span = (end - start).abs();
    if count == 0 || !span.is_finite() || span == 0.0 {
        return 0.0;
    }

    let raw = span / count as f64;
    let power = 10f64.powf(raw.log10().floor());
    let error = raw / power;
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    factor * power
}

/// Round-valued ticks covering `[start, end]` in ascending order.
///
/// A zero-width interval yields its single value.
#[must_use]
pub fn nice_ticks(start: f64, end: f64, count: usize) -> Vec<f64> {
    if count == 0 || !start.is_finite() || !end.is_finite() {
        return Vec::new();
    }
    let (low, high) = if start <= end { (start, end) } else { (end, start) };
    if low == high {
        return vec![low];
    }

    let step = nice_step(low, high, count);
    if step <= 0.0 || !step.is_finite() {
        return vec![low, high];
    }

    let first = (low / step).ceil() as i64;
    let last = (high / step).floor() as i64;
    (first..=last)
        .map(|index| {
            let value = index as f64 * step;
            // Snap away accumulated error such as 0.30000000000000004.
            let precision = 10f64.powi((-step.log10().floor()).max(0.0) as i32 + 1);
            let snapped = (value * precision).round() / precision;
            if snapped == 0.0 { 0.0 } else { snapped }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{axis_tick_target_count, nice_step, nice_ticks};

    #[test]
    fn steps_are_one_two_or_five_times_a_power_of_ten() {
        assert_eq!(nice_step(0.0, 10.0, 10), 1.0);
        assert_eq!(nice_step(0.0, 10.0, 5), 2.0);
        assert_eq!(nice_step(0.0, 100.0, 4), 20.0);
        assert_eq!(nice_step(0.0, 1.0, 2), 0.5);
    }

    #[test]
    fn ticks_cover_negative_and_positive_values() {
        assert_eq!(nice_ticks(-5.0, 10.0, 5), vec![-4.0, -2.0, 0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn fractional_ticks_are_snapped() {
        assert_eq!(nice_ticks(0.0, 0.5, 5), vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5]);
    }

    #[test]
    fn zero_width_interval_yields_single_tick() {
        assert_eq!(nice_ticks(0.0, 0.0, 5), vec![0.0]);
    }

    #[test]
    fn target_count_is_clamped() {
        assert_eq!(axis_tick_target_count(800.0, 80.0, 2, 8), 8);
        assert_eq!(axis_tick_target_count(100.0, 80.0, 2, 8), 2);
        assert_eq!(axis_tick_target_count(f64::NAN, 80.0, 2, 8), 2);
    }
}
