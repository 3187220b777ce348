mod polygon;
mod aggregate;
mod error;

pub use polygon::{Point, WeightedPoint, Polygon, Task, TaskIndex};
pub use aggregate::{Aggregate, Bbox, TaskStats};
pub use error::{PolygonError, Result};

/// A polygon whose weight sum is strictly greater than this is "heavy".
pub const HEAVY_WEIGHT_THRESHOLD: f32 = 100.0;
