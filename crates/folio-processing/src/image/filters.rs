use folio_core::Settings;
use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};

/// Image filter configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterConfig {
    /// Brightness adjustment (-100 to 100, where 0 is no change)
    pub brightness: Option<i32>,
    /// Contrast adjustment (-100 to 100, where 0 is no change)
    pub contrast: Option<f32>,
    /// Saturation adjustment (-100 to 100, where 0 is no change)
    pub saturation: Option<f32>,
    /// Grayscale enabled
    pub grayscale: bool,
    /// Sepia tone enabled
    pub sepia: bool,
    /// Gaussian blur radius in pixels
    pub blur: Option<f32>,
}

impl FilterConfig {
    /// Build from batch settings, where colour adjustments are percentages
    /// with 100 meaning unchanged.
    pub fn from_settings(settings: &Settings) -> Self {
        let adjustment = |pct: u16| (pct != 100).then_some(pct as i32 - 100);
        Self {
            brightness: adjustment(settings.brightness),
            contrast: adjustment(settings.contrast).map(|a| a as f32),
            saturation: adjustment(settings.saturation).map(|a| a as f32),
            grayscale: settings.grayscale,
            sepia: settings.sepia,
            blur: (settings.blur > 0.0).then_some(settings.blur),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == FilterConfig::default()
    }
}

pub struct ImageFilters;

impl ImageFilters {
    /// Apply all configured filters to an image, as successive passes:
    /// colour adjustments, grayscale, sepia, then blur.
    pub fn apply(img: DynamicImage, config: &FilterConfig) -> DynamicImage {
        let mut result = img;

        if let Some(brightness) = config.brightness {
            result = Self::adjust_brightness(result, brightness);
        }

        if let Some(contrast) = config.contrast {
            result = Self::adjust_contrast(result, contrast);
        }

        if let Some(saturation) = config.saturation {
            result = Self::adjust_saturation(result, saturation);
        }

        if config.grayscale {
            result = Self::apply_grayscale(result);
        }

        if config.sepia {
            result = Self::apply_sepia(result);
        }

        if let Some(radius) = config.blur {
            result = Self::apply_blur(result, radius);
        }

        result
    }

    /// Gaussian blur with the radius as standard deviation
    pub fn apply_blur(img: DynamicImage, radius: f32) -> DynamicImage {
        if radius <= 0.0 {
            return img;
        }
        DynamicImage::ImageRgba8(imageops::blur(&img.to_rgba8(), radius))
    }

    /// Convert image to grayscale, keeping the alpha channel
    pub fn apply_grayscale(img: DynamicImage) -> DynamicImage {
        img.grayscale()
    }

    /// Apply sepia tone effect
    pub fn apply_sepia(img: DynamicImage) -> DynamicImage {
        Self::map_pixels(img, |r, g, b| {
            let tr = 0.393 * r + 0.769 * g + 0.189 * b;
            let tg = 0.349 * r + 0.686 * g + 0.168 * b;
            let tb = 0.272 * r + 0.534 * g + 0.131 * b;
            (tr, tg, tb)
        })
    }

    /// Adjust brightness (-100 to 100, where 0 is no change)
    pub fn adjust_brightness(img: DynamicImage, adjustment: i32) -> DynamicImage {
        let multiplier = 1.0 + (adjustment as f32 / 100.0);
        Self::map_pixels(img, |r, g, b| (r * multiplier, g * multiplier, b * multiplier))
    }

    /// Adjust contrast (-100 to 100, where 0 is no change)
    pub fn adjust_contrast(img: DynamicImage, adjustment: f32) -> DynamicImage {
        let factor = 1.0 + (adjustment / 100.0);
        let intercept = 128.0 * (1.0 - factor);
        Self::map_pixels(img, |r, g, b| {
            (
                r * factor + intercept,
                g * factor + intercept,
                b * factor + intercept,
            )
        })
    }

    /// Adjust saturation (-100 to 100, where 0 is no change)
    pub fn adjust_saturation(img: DynamicImage, adjustment: f32) -> DynamicImage {
        let factor = 1.0 + (adjustment / 100.0);
        Self::map_pixels(img, |r, g, b| {
            let gray = 0.299 * r + 0.587 * g + 0.114 * b;
            (
                gray + (r - gray) * factor,
                gray + (g - gray) * factor,
                gray + (b - gray) * factor,
            )
        })
    }

    /// Apply a per-pixel colour function, clamping results and keeping alpha.
    fn map_pixels<F>(img: DynamicImage, f: F) -> DynamicImage
    where
        F: Fn(f32, f32, f32) -> (f32, f32, f32),
    {
        let (width, height) = img.dimensions();
        let rgba8 = img.to_rgba8();
        let mut adjusted = RgbaImage::new(width, height);

        for (x, y, pixel) in rgba8.enumerate_pixels() {
            let Rgba([r, g, b, a]) = *pixel;
            let (nr, ng, nb) = f(r as f32, g as f32, b as f32);
            adjusted.put_pixel(
                x,
                y,
                Rgba([
                    nr.round().clamp(0.0, 255.0) as u8,
                    ng.round().clamp(0.0, 255.0) as u8,
                    nb.round().clamp(0.0, 255.0) as u8,
                    a,
                ]),
            );
        }

        DynamicImage::ImageRgba8(adjusted)
    }
}
