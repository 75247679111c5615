use image::{imageops, DynamicImage, Rgba};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use std::io::Cursor;

/// Image orientation operations (rotation and flipping)
pub struct ImageOrientation;

impl ImageOrientation {
    /// Read the EXIF orientation tag (1-8). Returns 1 when the image carries
    /// no EXIF block or the tag is missing or out of range.
    pub fn read_exif_orientation(data: &[u8]) -> u8 {
        let mut cursor = Cursor::new(data);
        let Ok(exif) = exif::Reader::new().read_from_container(&mut cursor) else {
            return 1;
        };

        exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .and_then(|value| u8::try_from(value).ok())
            .filter(|value| (1..=8).contains(value))
            .unwrap_or(1)
    }

    /// Get rotation and flip operations needed for a given EXIF orientation
    /// Returns (rotate_angle, flip_horizontal, flip_vertical); the flip is
    /// applied before the rotation.
    pub fn get_orientation_transforms(orientation: u8) -> (Option<u16>, bool, bool) {
        match orientation {
            1 => (None, false, false),      // Normal
            2 => (None, true, false),       // Mirror horizontal
            3 => (Some(180), false, false), // Rotate 180
            4 => (None, false, true),       // Mirror vertical
            5 => (Some(270), true, false),  // Transpose
            6 => (Some(90), false, false),  // Rotate 90 CW
            7 => (Some(90), true, false),   // Transverse
            8 => (Some(270), false, false), // Rotate 270 CW
            _ => (None, false, false),      // Invalid, treat as normal
        }
    }

    /// Apply EXIF orientation correction to an image. Returns the image and
    /// whether any correction was applied.
    pub fn apply_exif_orientation(img: DynamicImage, data: &[u8]) -> (DynamicImage, bool) {
        let orientation = Self::read_exif_orientation(data);
        if orientation == 1 {
            return (img, false);
        }
        (Self::apply_orientation(img, orientation), true)
    }

    pub fn apply_orientation(mut img: DynamicImage, orientation: u8) -> DynamicImage {
        let (rotate, flip_h, flip_v) = Self::get_orientation_transforms(orientation);

        tracing::debug!(
            orientation = orientation,
            rotate = ?rotate,
            flip_horizontal = flip_h,
            flip_vertical = flip_v,
            "Applying EXIF orientation"
        );

        if flip_h {
            img = Self::apply_flip_horizontal(img);
        }
        if flip_v {
            img = Self::apply_flip_vertical(img);
        }
        if let Some(angle) = rotate {
            img = Self::rotate_by_angle(img, angle);
        }

        img
    }

    /// Rotate image by a right angle (90, 180, or 270 degrees clockwise).
    /// The canvas follows the rotation.
    pub fn rotate_by_angle(img: DynamicImage, angle: u16) -> DynamicImage {
        match angle {
            90 => img.rotate90(),
            180 => img.rotate180(),
            270 => img.rotate270(),
            _ => img,
        }
    }

    /// Rotate clockwise about the centre by any angle, keeping the canvas
    /// size. Uncovered corners become transparent and content outside the
    /// canvas is clipped.
    pub fn rotate_about_center(img: DynamicImage, degrees: f32) -> DynamicImage {
        let degrees = degrees.rem_euclid(360.0);
        if degrees == 0.0 {
            return img;
        }
        if degrees == 180.0 {
            return img.rotate180();
        }

        let rgba = img.to_rgba8();
        let rotated = rotate_about_center(
            &rgba,
            degrees.to_radians(),
            Interpolation::Bilinear,
            Rgba([0, 0, 0, 0]),
        );
        DynamicImage::ImageRgba8(rotated)
    }

    /// Apply horizontal flip (mirror)
    pub fn apply_flip_horizontal(img: DynamicImage) -> DynamicImage {
        DynamicImage::ImageRgba8(imageops::flip_horizontal(&img.to_rgba8()))
    }

    /// Apply vertical flip
    pub fn apply_flip_vertical(img: DynamicImage) -> DynamicImage {
        DynamicImage::ImageRgba8(imageops::flip_vertical(&img.to_rgba8()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbaImage};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    /// 3x2 image, red everywhere except a blue top-right pixel.
    fn marked_image() -> DynamicImage {
        let mut img = RgbaImage::from_pixel(3, 2, RED);
        img.put_pixel(2, 0, BLUE);
        DynamicImage::ImageRgba8(img)
    }

    fn pixel(img: &DynamicImage, x: u32, y: u32) -> Rgba<u8> {
        img.get_pixel(x, y)
    }

    #[test]
    fn test_rotation_dimension_changes() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, BLUE));

        let rotated = ImageOrientation::rotate_by_angle(img.clone(), 90);
        assert_eq!(rotated.dimensions(), (2, 4));

        let rotated = ImageOrientation::rotate_by_angle(img.clone(), 180);
        assert_eq!(rotated.dimensions(), (4, 2));

        let rotated = ImageOrientation::rotate_by_angle(img.clone(), 270);
        assert_eq!(rotated.dimensions(), (2, 4));

        let rotated = ImageOrientation::rotate_by_angle(img.clone(), 45);
        assert_eq!(rotated.dimensions(), img.dimensions());
    }

    #[test]
    fn test_orientation_transpose_and_transverse() {
        // Transpose maps (x, y) to (y, x)
        let transposed = ImageOrientation::apply_orientation(marked_image(), 5);
        assert_eq!(transposed.dimensions(), (2, 3));
        assert_eq!(pixel(&transposed, 0, 2), BLUE);

        // Transverse maps (x, y) to (h - 1 - y, w - 1 - x)
        let transversed = ImageOrientation::apply_orientation(marked_image(), 7);
        assert_eq!(transversed.dimensions(), (2, 3));
        assert_eq!(pixel(&transversed, 1, 0), BLUE);
    }

    #[test]
    fn test_orientation_rotate_90() {
        // Rotating 90 CW sends the top-right pixel to the bottom-right
        let rotated = ImageOrientation::apply_orientation(marked_image(), 6);
        assert_eq!(rotated.dimensions(), (2, 3));
        assert_eq!(pixel(&rotated, 1, 2), BLUE);
    }

    #[test]
    fn test_exif_orientation_without_exif() {
        let img = marked_image();
        let (oriented, applied) = ImageOrientation::apply_exif_orientation(img.clone(), b"");
        assert!(!applied);
        assert_eq!(oriented.dimensions(), img.dimensions());
        assert_eq!(ImageOrientation::read_exif_orientation(b"not an image"), 1);
    }

    #[test]
    fn test_rotate_about_center_keeps_canvas() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 20, RED));
        let rotated = ImageOrientation::rotate_about_center(img.clone(), 30.0);
        assert_eq!(rotated.dimensions(), (40, 20));
        // Corner falls outside the rotated content
        assert_eq!(pixel(&rotated, 0, 0)[3], 0);
        // Centre stays covered
        let centre = pixel(&rotated, 20, 10);
        assert!(centre[0] > 250 && centre[3] > 250);
    }

    #[test]
    fn test_rotate_about_center_full_turn_is_identity() {
        let img = marked_image();
        let rotated = ImageOrientation::rotate_about_center(img.clone(), 360.0);
        assert_eq!(rotated.to_rgba8(), img.to_rgba8());

        let rotated = ImageOrientation::rotate_about_center(img, 180.0);
        assert_eq!(pixel(&rotated, 0, 1), BLUE);
    }

    #[test]
    fn test_flip_operations() {
        let flipped = ImageOrientation::apply_flip_horizontal(marked_image());
        assert_eq!(pixel(&flipped, 0, 0), BLUE);

        let flipped = ImageOrientation::apply_flip_vertical(marked_image());
        assert_eq!(pixel(&flipped, 2, 1), BLUE);
    }
}
