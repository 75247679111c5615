//! Folio Processing Library
//!
//! This crate provides the transforms applied to file records (image
//! compression and editing, image/PDF conversion, PDF merge, split and
//! rotation), ingestion of host files into the store, and the batch
//! processing pipeline that drives a transform over the store.

pub mod compression;
pub mod image;
pub mod ingest;
pub mod pdf;
pub mod pipeline;
pub mod traits;

// Re-export commonly used types
pub use compression::{EncodeFormat, ImageCompressor};
pub use self::image::{
    FilterConfig, ImageFilters, ImageMetadata, ImageOrientation, ImageResize, ImageTransformer,
    TransformedImage,
};
pub use ingest::{ingest_files, IngestReport, RejectedFile};
pub use pdf::{
    ImageToPdfTransform, NoRasterizer, PageRasterizer, PdfMergeTransform, PdfRotateTransform,
    PdfSplitTransform, PdfToImagesTransform,
};
#[cfg(feature = "pdfium")]
pub use pdf::PdfiumRasterizer;
pub use pipeline::{BatchSummary, ProcessingPipeline, ToolTransform};
pub use traits::{CombineTransform, RecordTransform, TransformError, TransformInput};
