mod axis;
mod chart_config;
mod discrete_bar;
mod layout;
mod transition;

pub use axis::{AxisTick, HorizontalAxis};
pub use chart_config::{
    AxisConfig, BarOrder, ChartConfig, DEFAULT_BASE_FONT_SIZE, DEFAULT_NO_DATA_MESSAGE,
    DiscreteBarConfig, DiscreteBarTuning,
};
pub use discrete_bar::DiscreteBarChart;
pub use layout::{BarChartLayout, BarPlacement, BarRow, DiscreteBarLayout};
pub use transition::{BarTransition, DEFAULT_BAR_TRANSITION_MS};
