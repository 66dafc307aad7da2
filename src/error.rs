use thiserror::Error;

pub type ChartResult<T> = Result<T, ChartError>;

/// Errors surfaced by the graph, the layout engine and the editor boundary.
///
/// The type is `Clone` so a derived cell can memoize a failed computation
/// and hand the same error to every reader.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    #[error("invalid bounds: width={width}, height={height}")]
    InvalidBounds { width: f64, height: f64 },

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("dependency cycle detected while computing `{node}`")]
    DependencyCycle { node: String },

    #[error("failed to fetch `{url}`: {reason}")]
    Fetch { url: String, reason: String },

    #[error("failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("preference store error: {0}")]
    Preference(String),
}

impl ChartError {
    pub(crate) fn decode(what: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            what,
            reason: err.to_string(),
        }
    }
}
