//! Error types of the simulation library.

use thiserror::Error;

/// Errors raised by graph construction, simulation and persistence.
///
/// An unreachable destination is not an error, searches report it as `None`.
#[derive(Debug, Error)]
pub enum Error {
    /// Generator parameters that cannot describe a graph.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Simulation parameters outside their domain.
    #[error("invalid simulation parameters: {0}")]
    InvalidParams(String),

    /// Experiment kind that no generator exists for.
    #[error("{0} is not a valid experiment. Use city, complete, or random.")]
    UnknownTopology(String),

    /// Weight update on a vertex pair without an edge.
    #[error("no edge between {from} and {to}")]
    MissingEdge { from: String, to: String },

    #[error("pipeline stage panicked: {0}")]
    StagePanicked(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_topology(msg: impl Into<String>) -> Self {
        Self::InvalidTopology(msg.into())
    }

    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    pub fn missing_edge(from: &str, to: &str) -> Self {
        Self::MissingEdge {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
