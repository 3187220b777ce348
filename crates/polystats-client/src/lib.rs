mod fetcher;
mod source;

pub use fetcher::Fetcher;
pub use source::{HttpPolygonSource, MemoryPolygonSource, PolygonSource, DEFAULT_SOURCE_URL};

use polystats_core::PolygonError;
use thiserror::Error;

/// Any failure while retrieving polygons. Every variant is fatal to a run.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request for polygon {index} failed: {source}")]
    Transport {
        index: usize,
        #[source]
        source: reqwest::Error,
    },

    #[error("Polygon {index} request returned status {status}")]
    UnexpectedStatus {
        index: usize,
        status: reqwest::StatusCode,
    },

    #[error("Polygon {index} is malformed: {source}")]
    Malformed {
        index: usize,
        #[source]
        source: PolygonError,
    },

    #[error("Polygon {index} unavailable: {reason}")]
    Unavailable { index: usize, reason: String },

    #[error("Deadline exceeded after fetching {fetched} of {requested} polygons")]
    DeadlineExceeded { fetched: usize, requested: usize },
}

impl FetchError {
    /// Index of the polygon whose fetch failed, if the failure is tied to one
    pub fn index(&self) -> Option<usize> {
        match self {
            FetchError::Transport { index, .. }
            | FetchError::UnexpectedStatus { index, .. }
            | FetchError::Malformed { index, .. }
            | FetchError::Unavailable { index, .. } => Some(*index),
            FetchError::DeadlineExceeded { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
