use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolygonError {
    #[error("Malformed polygon body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Polygon body is empty")]
    EmptyBody,
}

pub type Result<T> = std::result::Result<T, PolygonError>;
