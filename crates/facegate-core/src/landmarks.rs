use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A 2-D point in source-frame pixel space.
pub type Point = (f32, f32);

pub const LEFT_EYE: &str = "left_eye";
pub const RIGHT_EYE: &str = "right_eye";
pub const NOSE_TIP: &str = "nose_tip";

/// Named facial regions returned by the landmark service, each an ordered
/// point sequence. Regions iterate in name order, so every consumer sees the
/// same point order for the same input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    regions: BTreeMap<String, Vec<Point>>,
}

impl LandmarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, name: impl Into<String>, points: Vec<Point>) -> Self {
        self.regions.insert(name.into(), points);
        self
    }

    pub fn region(&self, name: &str) -> Option<&[Point]> {
        self.regions.get(name).map(Vec::as_slice)
    }

    pub fn regions(&self) -> impl Iterator<Item = (&str, &[Point])> {
        self.regions
            .iter()
            .map(|(name, pts)| (name.as_str(), pts.as_slice()))
    }

    /// All points of all regions, flattened.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.regions.values().flat_map(|pts| pts.iter().copied())
    }

    pub fn point_count(&self) -> usize {
        self.regions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.point_count() == 0
    }
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f32 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

/// Mean of a point sequence, `None` when empty.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f32;
    let (sx, sy) = points
        .iter()
        .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.0, sy + p.1));
    Some((sx / n, sy / n))
}
