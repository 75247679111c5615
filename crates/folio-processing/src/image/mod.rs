//! Image processing module
//!
//! This module provides the image transform used by the compress tool:
//! - EXIF orientation and metadata handling (orientation, metadata)
//! - Geometry (resize, orientation)
//! - Colour filters (filters)
//! - The per-record transformer chaining them together (transformer)

pub mod filters;
pub mod metadata;
pub mod orientation;
pub mod resize;
pub mod transformer;

pub use filters::{FilterConfig, ImageFilters};
pub use metadata::ImageMetadata;
pub use orientation::ImageOrientation;
pub use resize::ImageResize;
pub use transformer::{ImageTransformer, TransformedImage};
