//! Overlay sinks: where rendered mesh primitives end up.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use facegate_core::mesh::{EDGE_COLOR, MARKER_COLOR};
use facegate_core::{Frame, Overlay, Point};
use image::{Rgb, RgbImage};

pub trait OverlaySink: Send + 'static {
    /// Present `overlay` over `frame`, replacing whatever was shown before.
    fn draw(&mut self, overlay: &Overlay, frame: &Frame);

    /// Remove the overlay ("no face").
    fn clear(&mut self, frame: &Frame);
}

/// Logs primitive counts at debug level.
#[derive(Debug, Default)]
pub struct LogSink;

impl OverlaySink for LogSink {
    fn draw(&mut self, overlay: &Overlay, _frame: &Frame) {
        tracing::debug!(
            markers = overlay.markers.len(),
            edges = overlay.edges.len(),
            pairs = overlay.pairs_considered,
            "overlay drawn"
        );
    }

    fn clear(&mut self, _frame: &Frame) {
        tracing::debug!("overlay cleared");
    }
}

/// Composites the overlay onto the frame and writes it to a PNG, overwriting
/// the previous snapshot.
pub struct SnapshotSink {
    path: PathBuf,
    written: u64,
}

impl SnapshotSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshots written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    fn write(&mut self, frame: &Frame, overlay: Option<&Overlay>) {
        let mut image = match frame.decode_rgb() {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(error = %e, "snapshot: frame decode failed");
                return;
            }
        };
        if let Some(overlay) = overlay {
            rasterize(overlay, &mut image);
        }
        match image.save(&self.path) {
            Ok(()) => self.written += 1,
            Err(e) => tracing::warn!(error = %e, path = %self.path.display(), "snapshot write failed"),
        }
    }
}

impl OverlaySink for SnapshotSink {
    fn draw(&mut self, overlay: &Overlay, frame: &Frame) {
        self.write(frame, Some(overlay));
    }

    fn clear(&mut self, frame: &Frame) {
        self.write(frame, None);
    }
}

/// Paint overlay primitives onto `image`: edges first, markers on top.
/// Work is bounded by the image size whatever the coordinates.
pub fn rasterize(overlay: &Overlay, image: &mut RgbImage) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    for edge in &overlay.edges {
        let Some((from, to)) = clip_segment(edge.from, edge.to, width, height) else {
            continue;
        };
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = (dx.abs().max(dy.abs()) * 2.0).ceil().max(1.0) as u32;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            blend(image, from.0 + dx * t, from.1 + dy * t, EDGE_COLOR, edge.opacity);
        }
    }

    let marker_rgb = [MARKER_COLOR[0], MARKER_COLOR[1], MARKER_COLOR[2]];
    let marker_alpha = MARKER_COLOR[3] as f32 / 255.0;
    for marker in &overlay.markers {
        let r = marker.radius;
        let (cx, cy) = marker.center;
        let (Some(xs), Some(ys)) = (pixel_span(cx, r, width), pixel_span(cy, r, height)) else {
            continue;
        };
        for py in ys {
            for px in xs.clone() {
                if (px as f32 - cx).hypot(py as f32 - cy) <= r {
                    blend(image, px as f32, py as f32, marker_rgb, marker_alpha);
                }
            }
        }
    }
}

/// Pixel indices within `radius` of `center` on one axis, clipped to `0..len`.
fn pixel_span(center: f32, radius: f32, len: u32) -> Option<RangeInclusive<u32>> {
    if !center.is_finite() || !radius.is_finite() {
        return None;
    }
    let lo = (center - radius).floor().max(0.0);
    let hi = (center + radius).ceil().min((len - 1) as f32);
    (lo <= hi).then(|| lo as u32..=hi as u32)
}

/// Liang-Barsky clip of a segment to the pixel rectangle.
fn clip_segment(from: Point, to: Point, width: u32, height: u32) -> Option<(Point, Point)> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    if ![from.0, from.1, dx, dy].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (max_x, max_y) = ((width - 1) as f32, (height - 1) as f32);

    let (mut t0, mut t1) = (0.0f32, 1.0f32);
    for (p, q) in [(-dx, from.0), (dx, max_x - from.0), (-dy, from.1), (dy, max_y - from.1)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some((
        (from.0 + dx * t0, from.1 + dy * t0),
        (from.0 + dx * t1, from.1 + dy * t1),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use facegate_core::{render_mesh, Edge, Geometry, LandmarkSet, Marker, MeshStyle};

    #[test]
    fn test_rasterize_marks_points_and_edges() {
        let mut image = RgbImage::new(40, 40);
        let set = LandmarkSet::new().with_region("chin", vec![(5.0, 20.0), (35.0, 20.0)]);
        let overlay = render_mesh(&set, Geometry::new(40, 40), &MeshStyle::default());
        rasterize(&overlay, &mut image);

        // marker centre picks up the cyan fill
        let Rgb(marker) = *image.get_pixel(5, 20);
        assert_eq!(marker[0], 0);
        assert!(marker[1] > 200 && marker[2] > 200);

        // edge midpoint is tinted but fainter than a marker
        let Rgb(mid) = *image.get_pixel(20, 20);
        assert!(mid[1] > 0 && mid[1] < marker[1]);

        // off-mesh pixel untouched
        assert_eq!(*image.get_pixel(20, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_rasterize_ignores_out_of_bounds() {
        let mut image = RgbImage::new(10, 10);
        let set = LandmarkSet::new().with_region("chin", vec![(-20.0, -20.0), (500.0, 500.0)]);
        let overlay = render_mesh(&set, Geometry::new(10, 10), &MeshStyle::default());
        rasterize(&overlay, &mut image);
        assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_rasterize_far_coordinates_terminate() {
        let mut image = RgbImage::new(10, 10);
        let far = 33_554_432.0;
        let set = LandmarkSet::new().with_region("chin", vec![(far, far), (far + 8.0, far)]);
        let overlay = render_mesh(&set, Geometry::new(10, 10), &MeshStyle::default());
        assert_eq!(overlay.edges.len(), 1);
        rasterize(&overlay, &mut image);
        assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_rasterize_clips_edges_and_markers_to_image() {
        let mut image = RgbImage::new(10, 10);
        let overlay = Overlay {
            geometry: Geometry::new(10, 10),
            markers: vec![
                Marker {
                    center: (f32::MAX, 2.0),
                    radius: 3.0,
                    glow: 12.0,
                },
                Marker {
                    center: (8.0, 8.0),
                    radius: f32::INFINITY,
                    glow: 12.0,
                },
            ],
            edges: vec![
                Edge {
                    from: (0.0, 5.0),
                    to: (1.0e30, 5.0),
                    opacity: 1.0,
                    width: 1.0,
                },
                Edge {
                    from: (f32::NAN, 1.0),
                    to: (3.0, 1.0),
                    opacity: 1.0,
                    width: 1.0,
                },
            ],
            pairs_considered: 1,
        };
        rasterize(&overlay, &mut image);

        // the long edge is drawn across the visible row only
        assert!((0..10).all(|x| image.get_pixel(x, 5)[1] > 0));
        assert_eq!(*image.get_pixel(5, 1), Rgb([0, 0, 0]));
        assert_eq!(*image.get_pixel(5, 8), Rgb([0, 0, 0]));
    }
}
