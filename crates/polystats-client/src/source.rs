use crate::{FetchError, Result};
use async_trait::async_trait;
use polystats_core::Polygon;
use reqwest::StatusCode;
use std::time::Duration;

pub const DEFAULT_SOURCE_URL: &str = "http://localhost:8080/polygon";

/// Something that can hand out polygons one request at a time
#[async_trait]
pub trait PolygonSource: Send + Sync {
    /// Fetch the polygon for position `index`
    async fn fetch(&self, index: usize) -> Result<Polygon>;
}

/// Polygon source backed by an HTTP endpoint returning one JSON polygon per GET
pub struct HttpPolygonSource {
    client: reqwest::Client,
    url: String,
}

impl HttpPolygonSource {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;

        Ok(HttpPolygonSource {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PolygonSource for HttpPolygonSource {
    async fn fetch(&self, index: usize) -> Result<Polygon> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| FetchError::Transport { index, source })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::UnexpectedStatus { index, status });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport { index, source })?;

        Polygon::from_json(&body).map_err(|source| FetchError::Malformed { index, source })
    }
}

/// In-memory polygon source, mostly useful for tests and dry runs
pub struct MemoryPolygonSource {
    polygons: Vec<Polygon>,
}

impl MemoryPolygonSource {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        MemoryPolygonSource { polygons }
    }
}

#[async_trait]
impl PolygonSource for MemoryPolygonSource {
    async fn fetch(&self, index: usize) -> Result<Polygon> {
        self.polygons
            .get(index)
            .cloned()
            .ok_or_else(|| FetchError::Unavailable {
                index,
                reason: format!("only {} polygons available", self.polygons.len()),
            })
    }
}
