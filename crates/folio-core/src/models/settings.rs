use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use validator::Validate;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Keep the source format where it can be re-encoded
    #[default]
    Original,
    Jpeg,
    Png,
    Webp,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            OutputFormat::Original => write!(f, "original"),
            OutputFormat::Jpeg => write!(f, "jpeg"),
            OutputFormat::Png => write!(f, "png"),
            OutputFormat::Webp => write!(f, "webp"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "original" => Ok(OutputFormat::Original),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            _ => Err(anyhow::anyhow!("Invalid output format: {}", s)),
        }
    }
}

/// Optional maximum dimensions. Images are only ever shrunk to fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ResizeBounds {
    #[validate(range(min = 1, message = "Max width must be at least 1 pixel"))]
    pub max_width: Option<u32>,
    #[validate(range(min = 1, message = "Max height must be at least 1 pixel"))]
    pub max_height: Option<u32>,
}

impl ResizeBounds {
    pub fn new(max_width: Option<u32>, max_height: Option<u32>) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_width.is_none() && self.max_height.is_none()
    }

    /// Target dimensions for an image of `width` x `height`.
    ///
    /// The width bound is applied first; the height bound is then checked
    /// against the already-scaled height, so a width constraint can make the
    /// height constraint unnecessary.
    pub fn fit(&self, width: u32, height: u32) -> (u32, u32) {
        let mut w = width as f64;
        let mut h = height as f64;

        if let Some(max_w) = self.max_width.filter(|m| *m > 0) {
            let max_w = max_w as f64;
            if w > max_w {
                h = h * max_w / w;
                w = max_w;
            }
        }
        if let Some(max_h) = self.max_height.filter(|m| *m > 0) {
            let max_h = max_h as f64;
            if h > max_h {
                w = w * max_h / h;
                h = max_h;
            }
        }

        ((w.round() as u32).max(1), (h.round() as u32).max(1))
    }
}

/// Transform parameters for one batch. Passed by value into the pipeline and
/// never mutated while a batch runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    /// Lossy compression quality, 0-100
    #[validate(range(max = 100, message = "Quality must be between 0 and 100"))]
    pub quality: u8,
    pub format: OutputFormat,
    #[validate(nested)]
    pub resize: ResizeBounds,
    /// Clockwise rotation in degrees
    #[validate(range(min = 0.0, max = 360.0, message = "Rotation must be between 0 and 360"))]
    pub rotation: f32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    /// Percentages, 100 = unchanged
    #[validate(range(max = 200, message = "Brightness must be between 0 and 200"))]
    pub brightness: u16,
    #[validate(range(max = 200, message = "Contrast must be between 0 and 200"))]
    pub contrast: u16,
    #[validate(range(max = 200, message = "Saturation must be between 0 and 200"))]
    pub saturation: u16,
    pub grayscale: bool,
    pub sepia: bool,
    /// Blur radius in pixels
    #[validate(range(min = 0.0, max = 100.0, message = "Blur must be between 0 and 100"))]
    pub blur: f32,
    /// Desired maximum output size for lossy formats
    #[validate(range(min = 1, message = "Target size must be at least 1 KB"))]
    pub target_kb: Option<u32>,
    pub remove_exif: bool,
    pub auto_orient: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: 80,
            format: OutputFormat::Original,
            resize: ResizeBounds::default(),
            rotation: 0.0,
            flip_horizontal: false,
            flip_vertical: false,
            brightness: 100,
            contrast: 100,
            saturation: 100,
            grayscale: false,
            sepia: false,
            blur: 0.0,
            target_kb: None,
            remove_exif: true,
            auto_orient: true,
        }
    }
}

impl Settings {
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality,
            ..Self::default()
        }
    }

    /// Validate ranges and reject non-finite floats.
    pub fn validated(self) -> Result<Self, AppError> {
        self.validate()?;
        if !self.rotation.is_finite() || !self.blur.is_finite() {
            return Err(AppError::InvalidInput(
                "Rotation and blur must be finite numbers".to_string(),
            ));
        }
        Ok(self)
    }

    pub fn has_color_adjustments(&self) -> bool {
        self.brightness != 100 || self.contrast != 100 || self.saturation != 100
    }

    pub fn has_filters(&self) -> bool {
        self.has_color_adjustments() || self.grayscale || self.sepia || self.blur > 0.0
    }

    /// Rotation normalised to [0, 360).
    pub fn normalized_rotation(&self) -> f32 {
        self.rotation.rem_euclid(360.0)
    }
}
