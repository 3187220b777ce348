use crate::{PolygonError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Zero-based position of a polygon in fetch order
pub type TaskIndex = usize;

/// Integer 2D coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Point { x, y }
    }
}

/// A point carrying an additive weight.
///
/// On the wire the coordinates sit next to the weight:
/// `{"x": 1, "y": 2, "weight": 3.5}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedPoint {
    #[serde(flatten)]
    pub point: Point,
    pub weight: f32,
}

impl WeightedPoint {
    pub fn new(x: i64, y: i64, weight: f32) -> Self {
        WeightedPoint {
            point: Point::new(x, y),
            weight,
        }
    }

    pub fn x(&self) -> i64 {
        self.point.x
    }

    pub fn y(&self) -> i64 {
        self.point.y
    }
}

/// Ordered sequence of weighted points
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    #[serde(default)]
    pub points: Vec<WeightedPoint>,
}

impl Polygon {
    pub fn new(points: Vec<WeightedPoint>) -> Self {
        Polygon { points }
    }

    /// Parse a polygon from a JSON response body
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(PolygonError::EmptyBody);
        }
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Sum of the weights of every point
    pub fn weight_sum(&self) -> f32 {
        self.points.iter().map(|p| p.weight).sum()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl From<Vec<WeightedPoint>> for Polygon {
    fn from(points: Vec<WeightedPoint>) -> Self {
        Polygon::new(points)
    }
}

/// One unit of work: a polygon and its position in fetch order
#[derive(Debug, Clone)]
pub struct Task {
    pub index: TaskIndex,
    pub polygon: Arc<Polygon>,
}

impl Task {
    pub fn new(index: TaskIndex, polygon: Arc<Polygon>) -> Self {
        Task { index, polygon }
    }

    /// Number the polygons in the order they were fetched
    pub fn from_polygons(polygons: Vec<Polygon>) -> Vec<Task> {
        polygons
            .into_iter()
            .enumerate()
            .map(|(index, polygon)| Task::new(index, Arc::new(polygon)))
            .collect()
    }
}
