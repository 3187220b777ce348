use crate::{Point, Polygon, Task, TaskIndex, HEAVY_WEIGHT_THRESHOLD};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Inclusive bounding box over integer points.
///
/// An empty box holds sentinel corners (`x1 = y1 = i64::MAX`,
/// `x2 = y2 = i64::MIN`) so that folding the first point yields a
/// degenerate box around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bbox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl Bbox {
    pub fn empty() -> Self {
        Bbox {
            x1: i64::MAX,
            y1: i64::MAX,
            x2: i64::MIN,
            y2: i64::MIN,
        }
    }

    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Bbox { x1, y1, x2, y2 }
    }

    /// True until at least one point has been folded in
    pub fn is_empty(&self) -> bool {
        self.x1 > self.x2 || self.y1 > self.y2
    }

    /// Grow the box to cover `point`
    pub fn include(&mut self, point: Point) {
        self.x1 = self.x1.min(point.x);
        self.y1 = self.y1.min(point.y);
        self.x2 = self.x2.max(point.x);
        self.y2 = self.y2.max(point.y);
    }

    /// Grow the box to cover `other`
    pub fn union(&mut self, other: &Bbox) {
        self.x1 = self.x1.min(other.x1);
        self.y1 = self.y1.min(other.y1);
        self.x2 = self.x2.max(other.x2);
        self.y2 = self.y2.max(other.y2);
    }
}

impl Default for Bbox {
    fn default() -> Self {
        Self::empty()
    }
}

/// Statistics of a single polygon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskStats {
    pub index: TaskIndex,
    pub weight_sum: f32,
    pub bbox: Bbox,
}

impl TaskStats {
    pub fn compute(task: &Task) -> Self {
        let mut weight_sum = 0.0f32;
        let mut bbox = Bbox::empty();

        for p in &task.polygon.points {
            weight_sum += p.weight;
            bbox.include(p.point);
        }

        TaskStats {
            index: task.index,
            weight_sum,
            bbox,
        }
    }

    pub fn is_heavy(&self) -> bool {
        self.weight_sum > HEAVY_WEIGHT_THRESHOLD
    }
}

/// Aggregate statistics over a set of polygons.
///
/// Folding is associative and commutative: any partition of the task set can
/// be folded into separate aggregates and merged in any order to obtain the
/// same result as a single sequential fold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Aggregate {
    pub bbox: Bbox,

    /// Largest per-polygon weight sum seen, never below zero
    pub max_weight: f32,

    /// Heavy polygons keyed by task index
    #[serde(serialize_with = "serialize_heavy")]
    heavy_polygons: BTreeMap<TaskIndex, Arc<Polygon>>,

    #[serde(skip)]
    tasks_processed: usize,
}

impl Aggregate {
    pub fn new() -> Self {
        Aggregate {
            bbox: Bbox::empty(),
            max_weight: 0.0,
            heavy_polygons: BTreeMap::new(),
            tasks_processed: 0,
        }
    }

    /// Sequential fold over `tasks`
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut aggregate = Aggregate::new();
        for task in tasks {
            aggregate.absorb(task);
        }
        aggregate
    }

    /// Fold partial aggregates into one
    pub fn reduce(partials: impl IntoIterator<Item = Aggregate>) -> Self {
        partials
            .into_iter()
            .fold(Aggregate::new(), |mut acc, partial| {
                acc.merge(partial);
                acc
            })
    }

    /// Compute the statistics of `task` and fold them in
    pub fn absorb(&mut self, task: &Task) -> TaskStats {
        let stats = TaskStats::compute(task);
        self.record(&stats, &task.polygon);
        stats
    }

    /// Fold already computed statistics of `polygon`
    pub fn record(&mut self, stats: &TaskStats, polygon: &Arc<Polygon>) {
        self.bbox.union(&stats.bbox);
        if stats.weight_sum > self.max_weight {
            self.max_weight = stats.weight_sum;
        }
        if stats.is_heavy() {
            self.heavy_polygons.insert(stats.index, polygon.clone());
        }
        self.tasks_processed += 1;
    }

    /// Fold another aggregate built from a disjoint set of tasks
    pub fn merge(&mut self, other: Aggregate) {
        self.bbox.union(&other.bbox);
        if other.max_weight > self.max_weight {
            self.max_weight = other.max_weight;
        }
        self.heavy_polygons.extend(other.heavy_polygons);
        self.tasks_processed += other.tasks_processed;
    }

    /// Heavy polygons in fetch order
    pub fn heavy_polygons(&self) -> impl Iterator<Item = &Arc<Polygon>> {
        self.heavy_polygons.values()
    }

    /// Fetch indices of the heavy polygons
    pub fn heavy_indices(&self) -> impl Iterator<Item = TaskIndex> + '_ {
        self.heavy_polygons.keys().copied()
    }

    pub fn heavy_count(&self) -> usize {
        self.heavy_polygons.len()
    }

    /// Number of tasks folded into this aggregate
    pub fn tasks_processed(&self) -> usize {
        self.tasks_processed
    }

    /// True if no task contributed anything
    pub fn is_empty(&self) -> bool {
        self.tasks_processed == 0
    }
}

impl Default for Aggregate {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize_heavy<S>(
    heavy: &BTreeMap<TaskIndex, Arc<Polygon>>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(heavy.values())
}
