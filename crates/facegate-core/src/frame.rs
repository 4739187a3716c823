use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, TimeDelta, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use thiserror::Error;

/// JPEG quality used when re-encoding a still for upload.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

const DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
    #[error("frame has no geometry (0x0)")]
    Degenerate,
    #[error("not a base64 JPEG data URL")]
    InvalidDataUrl,
}

/// Pixel dimensions of the camera feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
}

impl Geometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True once the feed has produced a frame with non-zero size.
    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// An encoded still taken from the camera feed. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    geometry: Geometry,
    bytes: Vec<u8>,
    captured_at: DateTime<Utc>,
}

impl Frame {
    /// Re-encode a raw RGB image as a lossy JPEG still.
    pub fn encode(image: &RgbImage, quality: u8) -> Result<Self, FrameError> {
        let geometry = Geometry::new(image.width(), image.height());
        if !geometry.is_known() {
            return Ok(Self::degenerate());
        }

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality).encode_image(image)?;

        Ok(Self {
            geometry,
            bytes,
            captured_at: Utc::now(),
        })
    }

    /// The zero-size still returned when the feed has no geometry yet.
    pub fn degenerate() -> Self {
        Self {
            geometry: Geometry::default(),
            bytes: Vec::new(),
            captured_at: Utc::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.geometry.width
    }

    pub fn height(&self) -> u32 {
        self.geometry.height
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn is_degenerate(&self) -> bool {
        !self.geometry.is_known()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Time since the still was taken.
    pub fn age(&self) -> TimeDelta {
        Utc::now() - self.captured_at
    }

    /// `data:image/jpeg;base64,...` form expected by the HTTP endpoints.
    pub fn to_data_url(&self) -> String {
        format!("{DATA_URL_PREFIX}{}", STANDARD.encode(&self.bytes))
    }

    /// Parse a still previously produced by [`Frame::to_data_url`].
    pub fn from_data_url(url: &str) -> Result<Self, FrameError> {
        let encoded = url
            .strip_prefix(DATA_URL_PREFIX)
            .ok_or(FrameError::InvalidDataUrl)?;
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| FrameError::InvalidDataUrl)?;
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)?;

        Ok(Self {
            geometry: Geometry::new(decoded.width(), decoded.height()),
            bytes,
            captured_at: Utc::now(),
        })
    }

    /// Decode back into RGB pixels (used for overlay snapshots).
    pub fn decode_rgb(&self) -> Result<RgbImage, FrameError> {
        if self.is_degenerate() {
            return Err(FrameError::Degenerate);
        }
        let decoded = image::load_from_memory_with_format(&self.bytes, ImageFormat::Jpeg)?;
        Ok(decoded.to_rgb8())
    }
}
