use folio_core::ResizeBounds;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> FilterType {
        let width_ratio = orig_width as f32 / new_width as f32;
        let height_ratio = orig_height as f32 / new_height as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            FilterType::Triangle
        } else if max_ratio > 1.5 {
            FilterType::CatmullRom
        } else {
            FilterType::Lanczos3
        }
    }

    /// Resize image to exact dimensions
    pub fn resize_image(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }

    /// Shrink the image to fit the bounds, preserving aspect ratio. Images
    /// already inside the bounds are returned unchanged.
    pub fn apply_bounds(img: DynamicImage, bounds: &ResizeBounds) -> DynamicImage {
        if bounds.is_unbounded() {
            return img;
        }

        let (orig_width, orig_height) = img.dimensions();
        let (width, height) = bounds.fit(orig_width, orig_height);
        if (width, height) == (orig_width, orig_height) {
            return img;
        }

        tracing::debug!(
            from_width = orig_width,
            from_height = orig_height,
            to_width = width,
            to_height = height,
            "Resizing to bounds"
        );
        Self::resize_image(&img, width, height)
    }
}
