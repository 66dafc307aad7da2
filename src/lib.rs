//! chart-studio: reactive layout engine for discrete bar charts.
//!
//! The crate is split into a dependency-tracked computation graph
//! (`reactive`), value types and measurement (`core`), the bar chart layout
//! engine built on derived cells (`api`), backend-agnostic draw commands
//! (`render`) and the asynchronous editor boundary (`editor`).

pub mod api;
pub mod core;
pub mod editor;
pub mod error;
pub mod reactive;
pub mod render;
pub mod telemetry;

pub use api::{ChartConfig, DiscreteBarChart, DiscreteBarLayout};
pub use error::{ChartError, ChartResult};
pub use reactive::{DerivedCell, Graph, RootCell};
