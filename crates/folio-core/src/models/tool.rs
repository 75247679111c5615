use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// The active tool. Selects which transform a batch runs and which files
/// ingestion accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolMode {
    #[default]
    Compress,
    ImageToPdf,
    PdfToImage,
    MergePdf,
    SplitPdf,
    RotatePdf,
}

impl ToolMode {
    pub const ALL: [ToolMode; 6] = [
        ToolMode::Compress,
        ToolMode::ImageToPdf,
        ToolMode::PdfToImage,
        ToolMode::MergePdf,
        ToolMode::SplitPdf,
        ToolMode::RotatePdf,
    ];

    /// Tools that consume PDF documents
    pub fn is_pdf_tool(self) -> bool {
        matches!(
            self,
            ToolMode::PdfToImage | ToolMode::MergePdf | ToolMode::SplitPdf | ToolMode::RotatePdf
        )
    }

    /// Whether ingestion accepts a file of this MIME type in this mode.
    pub fn accepts(self, mime_type: &str) -> bool {
        let mime = mime_type.trim().to_lowercase();
        if self.is_pdf_tool() {
            mime == "application/pdf"
        } else {
            mime.starts_with("image/")
        }
    }

    /// Switching between these two modes must clear the store.
    pub fn requires_clear_on_switch(self, next: ToolMode) -> bool {
        self != next && (self.is_pdf_tool() || next.is_pdf_tool())
    }

    /// Tools that combine every record of a batch into one artifact
    pub fn is_combining(self) -> bool {
        matches!(self, ToolMode::ImageToPdf | ToolMode::MergePdf)
    }
}

impl Display for ToolMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ToolMode::Compress => write!(f, "compress"),
            ToolMode::ImageToPdf => write!(f, "image-to-pdf"),
            ToolMode::PdfToImage => write!(f, "pdf-to-image"),
            ToolMode::MergePdf => write!(f, "merge-pdf"),
            ToolMode::SplitPdf => write!(f, "split-pdf"),
            ToolMode::RotatePdf => write!(f, "rotate-pdf"),
        }
    }
}

impl FromStr for ToolMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compress" => Ok(ToolMode::Compress),
            "image-to-pdf" => Ok(ToolMode::ImageToPdf),
            "pdf-to-image" => Ok(ToolMode::PdfToImage),
            "merge-pdf" | "merge" => Ok(ToolMode::MergePdf),
            "split-pdf" | "split" => Ok(ToolMode::SplitPdf),
            "rotate-pdf" | "rotate" => Ok(ToolMode::RotatePdf),
            _ => Err(anyhow::anyhow!("Invalid tool mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_by_mode() {
        assert!(ToolMode::Compress.accepts("image/png"));
        assert!(ToolMode::ImageToPdf.accepts("IMAGE/JPEG"));
        assert!(!ToolMode::Compress.accepts("application/pdf"));
        assert!(ToolMode::MergePdf.accepts("application/pdf"));
        assert!(!ToolMode::PdfToImage.accepts("image/png"));
    }

    #[test]
    fn test_clear_on_switch() {
        assert!(!ToolMode::Compress.requires_clear_on_switch(ToolMode::ImageToPdf));
        assert!(ToolMode::Compress.requires_clear_on_switch(ToolMode::MergePdf));
        assert!(ToolMode::MergePdf.requires_clear_on_switch(ToolMode::SplitPdf));
        assert!(!ToolMode::MergePdf.requires_clear_on_switch(ToolMode::MergePdf));
    }

    #[test]
    fn test_display_parse() {
        for mode in ToolMode::ALL {
            assert_eq!(mode.to_string().parse::<ToolMode>().unwrap(), mode);
        }
        assert_eq!(
            serde_json::to_string(&ToolMode::PdfToImage).unwrap(),
            "\"pdf-to-image\""
        );
    }
}
