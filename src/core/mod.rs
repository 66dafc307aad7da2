pub mod bounds;
pub mod format;
pub mod scale;
pub mod text;
pub mod ticks;
pub mod types;

pub use bounds::Bounds;
pub use format::ValueFormat;
pub use scale::{AxisScale, DomainOverride};
pub use text::{
    CachedTextMeasurer, HeuristicTextMeasurer, TextMeasureCacheStats, TextMeasurer, TextMetrics,
    TextStyle, widest_text,
};
pub use ticks::{axis_tick_target_count, nice_step, nice_ticks};
pub use types::{Color, DiscreteBarDatum};
