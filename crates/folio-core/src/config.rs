//! Configuration module
//!
//! Host-level configuration for Folio, loaded from `FOLIO_*` environment
//! variables (and an optional `.env` file). Per-batch transform parameters are
//! not configuration; they live in [`crate::models::Settings`].

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DEFAULT_QUALITY: u8 = 80;
const MAX_FILE_SIZE_MB: usize = 50;
const EXPORT_STAGGER_MS: u64 = 200;
const PDF_RENDER_SCALE: f32 = 2.0;
const PDF_IMAGE_QUALITY: u8 = 95;
// A4 in PDF points
const PAGE_WIDTH_PT: f32 = 595.28;
const PAGE_HEIGHT_PT: f32 = 841.89;
const OUTPUT_DIR: &str = "./folio-out";
const LOG_FILTER: &str = "folio=info";

#[derive(Clone, Debug)]
pub struct FolioConfig {
    pub environment: String,
    pub default_quality: u8,
    pub max_file_size_bytes: usize,
    pub export_stagger_ms: u64,
    pub pdf_render_scale: f32,
    pub pdf_image_quality: u8,
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pub output_dir: PathBuf,
    pub log_filter: String,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            default_quality: DEFAULT_QUALITY,
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            export_stagger_ms: EXPORT_STAGGER_MS,
            pdf_render_scale: PDF_RENDER_SCALE,
            pdf_image_quality: PDF_IMAGE_QUALITY,
            page_width_pt: PAGE_WIDTH_PT,
            page_height_pt: PAGE_HEIGHT_PT,
            output_dir: PathBuf::from(OUTPUT_DIR),
            log_filter: LOG_FILTER.to_string(),
        }
    }
}

/// Parse an optional variable, falling back to `default` when unset and
/// failing loudly when set to something unparseable.
fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, anyhow::Error> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number, got '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl FolioConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let max_file_size_mb = parse_var("FOLIO_MAX_FILE_SIZE_MB", MAX_FILE_SIZE_MB)?;

        Ok(Self {
            environment,
            default_quality: parse_var("FOLIO_DEFAULT_QUALITY", DEFAULT_QUALITY)?,
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            export_stagger_ms: parse_var("FOLIO_EXPORT_STAGGER_MS", EXPORT_STAGGER_MS)?,
            pdf_render_scale: parse_var("FOLIO_PDF_RENDER_SCALE", PDF_RENDER_SCALE)?,
            pdf_image_quality: parse_var("FOLIO_PDF_IMAGE_QUALITY", PDF_IMAGE_QUALITY)?,
            page_width_pt: parse_var("FOLIO_PAGE_WIDTH_PT", PAGE_WIDTH_PT)?,
            page_height_pt: parse_var("FOLIO_PAGE_HEIGHT_PT", PAGE_HEIGHT_PT)?,
            output_dir: env::var("FOLIO_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(OUTPUT_DIR)),
            log_filter: env::var("FOLIO_LOG_FILTER").unwrap_or_else(|_| LOG_FILTER.to_string()),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.default_quality > 100 {
            anyhow::bail!("FOLIO_DEFAULT_QUALITY must be between 0 and 100");
        }
        if self.pdf_image_quality == 0 || self.pdf_image_quality > 100 {
            anyhow::bail!("FOLIO_PDF_IMAGE_QUALITY must be between 1 and 100");
        }
        if self.max_file_size_bytes == 0 {
            anyhow::bail!("FOLIO_MAX_FILE_SIZE_MB must be greater than 0");
        }
        if !(self.pdf_render_scale.is_finite() && self.pdf_render_scale > 0.0) {
            anyhow::bail!("FOLIO_PDF_RENDER_SCALE must be a positive number");
        }
        if self.pdf_render_scale > 8.0 {
            anyhow::bail!("FOLIO_PDF_RENDER_SCALE must not exceed 8.0");
        }
        for (key, value) in [
            ("FOLIO_PAGE_WIDTH_PT", self.page_width_pt),
            ("FOLIO_PAGE_HEIGHT_PT", self.page_height_pt),
        ] {
            if !(value.is_finite() && value > 0.0) {
                anyhow::bail!("{} must be a positive number", key);
            }
        }
        if self.output_dir.as_os_str().is_empty() {
            anyhow::bail!("FOLIO_OUTPUT_DIR must not be empty");
        }
        Ok(())
    }
}

/// Application configuration.
#[derive(Clone, Debug, Default)]
pub struct Config(pub Box<FolioConfig>);

impl Config {
    fn inner(&self) -> &FolioConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = FolioConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn default_quality(&self) -> u8 {
        self.inner().default_quality
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.inner().max_file_size_bytes
    }

    pub fn export_stagger_ms(&self) -> u64 {
        self.inner().export_stagger_ms
    }

    pub fn pdf_render_scale(&self) -> f32 {
        self.inner().pdf_render_scale
    }

    pub fn pdf_image_quality(&self) -> u8 {
        self.inner().pdf_image_quality
    }

    /// Page size used for image-to-PDF conversion, in points.
    pub fn page_size_pt(&self) -> (f32, f32) {
        (self.inner().page_width_pt, self.inner().page_height_pt)
    }

    pub fn output_dir(&self) -> &Path {
        &self.inner().output_dir
    }

    pub fn log_filter(&self) -> &str {
        &self.inner().log_filter
    }

    /// Override the output directory (CLI `--out`).
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.0.output_dir = dir.into();
        self
    }

    /// Override the export stagger delay. Tests use zero.
    pub fn with_export_stagger_ms(mut self, ms: u64) -> Self {
        self.0.export_stagger_ms = ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_quality(), 80);
        assert_eq!(config.max_file_size_bytes(), 50 * 1024 * 1024);
        assert_eq!(config.export_stagger_ms(), 200);
        assert_eq!(config.pdf_image_quality(), 95);
        assert_eq!(config.page_size_pt(), (595.28, 841.89));
        assert!(!config.is_production());
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut inner = FolioConfig {
            default_quality: 101,
            ..FolioConfig::default()
        };
        assert!(inner.validate().is_err());

        inner.default_quality = 80;
        inner.pdf_render_scale = 0.0;
        assert!(inner.validate().is_err());

        inner.pdf_render_scale = 2.0;
        inner.page_height_pt = -1.0;
        let err = inner.validate().unwrap_err();
        assert!(err.to_string().contains("FOLIO_PAGE_HEIGHT_PT"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::default()
            .with_output_dir("/tmp/out")
            .with_export_stagger_ms(0);
        assert_eq!(config.output_dir(), Path::new("/tmp/out"));
        assert_eq!(config.export_stagger_ms(), 0);
    }

    #[test]
    fn test_is_production() {
        let config = Config(Box::new(FolioConfig {
            environment: "Prod".to_string(),
            ..FolioConfig::default()
        }));
        assert!(config.is_production());
    }
}
