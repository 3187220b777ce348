use crate::{FetchError, PolygonSource, Result};
use polystats_core::Polygon;
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info};

/// Sequentially pulls a fixed number of polygons from a source.
///
/// Fetching is all-or-nothing: the first failure aborts the whole batch and
/// polygons fetched so far are dropped.
pub struct Fetcher {
    source: Arc<dyn PolygonSource>,
}

impl Fetcher {
    pub fn new(source: Arc<dyn PolygonSource>) -> Self {
        Fetcher { source }
    }

    /// Fetch `count` polygons in order, giving up once `deadline` passes
    pub async fn fetch_all(&self, count: usize, deadline: Instant) -> Result<Vec<Polygon>> {
        info!("Fetching {} polygons", count);

        // `count` is user-supplied; grow as polygons arrive
        let mut polygons = Vec::new();

        for index in 0..count {
            let polygon = match timeout_at(deadline, self.source.fetch(index)).await {
                Ok(Ok(polygon)) => polygon,
                Ok(Err(e)) => {
                    error!("Fetching polygon {} failed: {}", index, e);
                    return Err(e);
                }
                Err(_) => {
                    error!("Deadline passed while fetching polygon {}", index);
                    return Err(FetchError::DeadlineExceeded {
                        fetched: index,
                        requested: count,
                    });
                }
            };

            debug!("Fetched polygon {} ({} points)", index, polygon.len());
            polygons.push(polygon);
        }

        Ok(polygons)
    }
}
