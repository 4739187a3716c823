use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use facegate_core::frame::DEFAULT_JPEG_QUALITY;
use facegate_core::{Frame, Geometry};
use image::imageops::FilterType;
use image::{ImageFormat, RgbImage};

use crate::{CameraError, FrameSource, Readiness};

/// Playback rate used when none is configured.
pub const DEFAULT_REPLAY_FPS: f32 = 30.0;

/// A camera that plays a directory of stills as a looping live feed.
///
/// Files are played in name order at a fixed frame rate measured from the
/// moment the camera started; sampling returns whichever still is "on air".
/// Every frame is scaled to the geometry of the first one.
pub struct ReplayCamera {
    dir: PathBuf,
    paths: Vec<PathBuf>,
    fps: f32,
    quality: u8,
    started: Instant,
    geometry: Mutex<Geometry>,
    stopped: AtomicBool,
}

impl ReplayCamera {
    /// Open the feed and start decoding its first frame in the background.
    ///
    /// Must be called from within a Tokio runtime. Fails immediately when the
    /// directory cannot be read or holds no images.
    pub fn start(dir: &Path, fps: f32) -> Result<(Arc<Self>, Readiness), CameraError> {
        let paths = list_frames(dir)?;
        tracing::info!(dir = %dir.display(), frames = paths.len(), fps, "replay camera opened");

        let camera = Arc::new(Self {
            dir: dir.to_path_buf(),
            paths,
            fps: if fps > 0.0 { fps } else { DEFAULT_REPLAY_FPS },
            quality: DEFAULT_JPEG_QUALITY,
            started: Instant::now(),
            geometry: Mutex::new(Geometry::default()),
            stopped: AtomicBool::new(false),
        });

        let (tx, readiness) = Readiness::channel();
        let warmup = Arc::clone(&camera);
        tokio::task::spawn_blocking(move || {
            let result = decode(&warmup.paths[0]).map(|img| {
                let geometry = Geometry::new(img.width(), img.height());
                *warmup.geometry.lock().unwrap_or_else(PoisonError::into_inner) = geometry;
                tracing::info!(width = geometry.width, height = geometry.height, "first frame ready");
                geometry
            });
            let _ = tx.send(result);
        });

        Ok((camera, readiness))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn frame_count(&self) -> usize {
        self.paths.len()
    }

    fn current_index(&self) -> usize {
        let elapsed = self.started.elapsed().as_secs_f32();
        (elapsed * self.fps) as usize % self.paths.len()
    }

}

fn decode(path: &Path) -> Result<RgbImage, CameraError> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| CameraError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

/// Decode one still, scale it to the feed geometry and re-encode it.
fn render_still(path: &Path, geometry: Geometry, quality: u8) -> Result<Frame, CameraError> {
    let mut img = decode(path)?;
    if img.width() != geometry.width || img.height() != geometry.height {
        img = image::imageops::resize(&img, geometry.width, geometry.height, FilterType::Triangle);
    }
    Ok(Frame::encode(&img, quality)?)
}

impl FrameSource for ReplayCamera {
    fn geometry(&self) -> Geometry {
        *self.geometry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn capture_still(&self) -> Result<Frame, CameraError> {
        if self.is_stopped() {
            return Err(CameraError::Stopped);
        }
        let geometry = self.geometry();
        if !geometry.is_known() {
            return Ok(Frame::degenerate());
        }

        let path = self.paths[self.current_index()].clone();
        let quality = self.quality;
        tokio::task::spawn_blocking(move || render_still(&path, geometry, quality)).await?
    }

    fn stop(&self) -> bool {
        let first = !self.stopped.swap(true, Ordering::SeqCst);
        if first {
            tracing::info!(dir = %self.dir.display(), "camera stopped");
        }
        first
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, CameraError> {
    let entries = std::fs::read_dir(dir).map_err(|source| match source.kind() {
        std::io::ErrorKind::PermissionDenied => CameraError::PermissionDenied(dir.to_path_buf()),
        std::io::ErrorKind::NotFound => CameraError::NoDevice(dir.to_path_buf()),
        _ => CameraError::Unavailable {
            path: dir.to_path_buf(),
            source,
        },
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && ImageFormat::from_path(p).is_ok())
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Err(CameraError::NoDevice(dir.to_path_buf()));
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "facegate-hw-test-{tag}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(dir: &Path, name: &str, w: u32, h: u32) {
        RgbImage::from_pixel(w, h, Rgb([200, 180, 160]))
            .save(dir.join(name))
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_dir_is_no_device() {
        let dir = std::env::temp_dir().join("facegate-hw-test-definitely-missing");
        let err = ReplayCamera::start(&dir, 30.0).err().unwrap();
        assert!(matches!(err, CameraError::NoDevice(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_empty_dir_is_no_device() {
        let dir = temp_dir("empty");
        std::fs::write(dir.join("notes.txt"), b"not a frame").unwrap();
        let err = ReplayCamera::start(&dir, 30.0).err().unwrap();
        assert!(matches!(err, CameraError::NoDevice(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_ready_then_capture() {
        let dir = temp_dir("ready");
        write_png(&dir, "000.png", 40, 30);
        write_png(&dir, "001.png", 80, 60);

        let (camera, readiness) = ReplayCamera::start(&dir, 30.0).unwrap();
        assert_eq!(camera.frame_count(), 2);

        let geometry = readiness.wait().await.unwrap();
        assert_eq!(geometry, Geometry::new(40, 30));
        assert_eq!(camera.geometry(), geometry);

        let frame = camera.capture_still().await.unwrap();
        assert_eq!(frame.geometry(), geometry);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_unreadable_frame_is_per_frame_error() {
        let dir = temp_dir("corrupt");
        write_png(&dir, "000.png", 16, 12);

        let (camera, readiness) = ReplayCamera::start(&dir, 30.0).unwrap();
        readiness.wait().await.unwrap();
        std::fs::write(dir.join("000.png"), b"definitely not a png").unwrap();

        let err = camera.capture_still().await.unwrap_err();
        assert!(matches!(err, CameraError::Decode { .. }));
        assert!(!err.is_fatal());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_stop_exactly_once() {
        let dir = temp_dir("stop");
        write_png(&dir, "a.png", 8, 8);

        let (camera, readiness) = ReplayCamera::start(&dir, 30.0).unwrap();
        readiness.wait().await.unwrap();
        assert!(camera.stop());
        assert!(!camera.stop());
        assert!(matches!(camera.capture_still().await, Err(CameraError::Stopped)));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
