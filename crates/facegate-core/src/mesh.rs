//! Landmark mesh overlay.
//!
//! Flattens every region into one point cloud, marks each point, and joins
//! every pair of points closer than the proximity threshold with an edge whose
//! opacity fades linearly with distance. The pair scan is O(n²); landmark sets
//! carry tens of points, not thousands.

use crate::frame::Geometry;
use crate::landmarks::{distance, LandmarkSet, Point};

/// Marker fill, RGBA.
pub const MARKER_COLOR: [u8; 4] = [0, 255, 255, 230];
/// Edge stroke, RGB; alpha comes from [`Edge::opacity`].
pub const EDGE_COLOR: [u8; 3] = [0, 255, 200];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshStyle {
    pub marker_radius: f32,
    /// Blur radius of the marker glow.
    pub glow: f32,
    /// Pairs at or beyond this distance are not joined.
    pub proximity: f32,
    pub edge_width: f32,
}

impl Default for MeshStyle {
    fn default() -> Self {
        Self {
            marker_radius: 3.0,
            glow: 12.0,
            proximity: 70.0,
            edge_width: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub center: Point,
    pub radius: f32,
    pub glow: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: Point,
    pub to: Point,
    /// 1.0 at distance 0, approaching 0.0 at the proximity threshold.
    pub opacity: f32,
    pub width: f32,
}

/// Drawing primitives for one frame, sized to the source frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub geometry: Geometry,
    pub markers: Vec<Marker>,
    pub edges: Vec<Edge>,
    /// Unordered point pairs examined for edges: C(n, 2).
    pub pairs_considered: usize,
}

impl Overlay {
    /// An empty overlay: the "no face" frame.
    pub fn cleared(geometry: Geometry) -> Self {
        Self {
            geometry,
            markers: Vec::new(),
            edges: Vec::new(),
            pairs_considered: 0,
        }
    }

    pub fn is_clear(&self) -> bool {
        self.markers.is_empty() && self.edges.is_empty()
    }
}

/// Map a landmark set to overlay primitives. Deterministic for a given input.
pub fn render_mesh(landmarks: &LandmarkSet, geometry: Geometry, style: &MeshStyle) -> Overlay {
    let points: Vec<Point> = landmarks.points().collect();

    let markers = points
        .iter()
        .map(|&center| Marker {
            center,
            radius: style.marker_radius,
            glow: style.glow,
        })
        .collect();

    let mut edges = Vec::new();
    let mut pairs_considered = 0usize;
    for (i, &a) in points.iter().enumerate() {
        for &b in &points[i + 1..] {
            pairs_considered += 1;
            let d = distance(a, b);
            if d < style.proximity {
                edges.push(Edge {
                    from: a,
                    to: b,
                    opacity: 1.0 - d / style.proximity,
                    width: style.edge_width,
                });
            }
        }
    }

    Overlay {
        geometry,
        markers,
        edges,
        pairs_considered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> Geometry {
        Geometry::new(640, 480)
    }

    #[test]
    fn test_close_pair_single_edge() {
        let set = LandmarkSet::new().with_region("chin", vec![(0.0, 0.0), (30.0, 40.0)]);
        let overlay = render_mesh(&set, geometry(), &MeshStyle::default());
        assert_eq!(overlay.markers.len(), 2);
        assert_eq!(overlay.edges.len(), 1);
        let opacity = overlay.edges[0].opacity;
        assert!(opacity > 0.0 && opacity < 1.0);
        // distance 50 → 1 - 50/70
        assert!((opacity - (1.0 - 50.0 / 70.0)).abs() < 1e-6);
    }

    #[test]
    fn test_far_pair_no_edge() {
        let set = LandmarkSet::new()
            .with_region("a", vec![(0.0, 0.0)])
            .with_region("b", vec![(70.0, 0.0)]);
        let overlay = render_mesh(&set, geometry(), &MeshStyle::default());
        assert_eq!(overlay.markers.len(), 2);
        assert!(overlay.edges.is_empty());
        assert_eq!(overlay.pairs_considered, 1);
    }

    #[test]
    fn test_pairs_considered_is_n_choose_2() {
        // three close points plus one far away: 6 pairs, 3 edges
        let set = LandmarkSet::new()
            .with_region("left_eye", vec![(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)])
            .with_region("nose_tip", vec![(500.0, 500.0)]);
        let overlay = render_mesh(&set, geometry(), &MeshStyle::default());
        assert_eq!(overlay.pairs_considered, 6);
        assert_eq!(overlay.edges.len(), 3);
    }

    #[test]
    fn test_render_is_idempotent() {
        let set = LandmarkSet::new()
            .with_region("top_lip", vec![(5.0, 5.0), (20.0, 8.0), (33.0, 9.0)])
            .with_region("chin", vec![(10.0, 60.0), (90.0, 61.0)]);
        let first = render_mesh(&set, geometry(), &MeshStyle::default());
        let second = render_mesh(&set, geometry(), &MeshStyle::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_set_renders_clear() {
        let overlay = render_mesh(&LandmarkSet::new(), geometry(), &MeshStyle::default());
        assert!(overlay.is_clear());
        assert_eq!(overlay, Overlay::cleared(geometry()));
    }
}
