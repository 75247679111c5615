//! Mode and settings controller.
//!
//! A `Session` is shared by reference while a batch runs. Mode and settings
//! changes are refused with `AppError::Busy` until the batch has finished,
//! so a batch always sees the settings it started with.

use std::sync::{Arc, Mutex, MutexGuard};

use folio_core::{
    AggregateStats, AppError, Config, FileRecord, FileStore, InMemoryDisplayRegistry,
    IngestValidator, RecordId, Settings, SourceFile, ToolMode,
};
use folio_processing::{
    ingest_files, BatchSummary, IngestReport, PageRasterizer, ProcessingPipeline, ToolTransform,
};
use folio_storage::{ExportReport, Exporter};

/// Mode, settings and the busy flag change under one lock, so a change
/// either lands before a batch takes its snapshot or is refused.
struct SessionState {
    mode: ToolMode,
    settings: Settings,
    busy: bool,
}

impl SessionState {
    fn ensure_idle(&self, action: &str) -> Result<(), AppError> {
        if self.busy {
            return Err(AppError::Busy(format!(
                "Cannot {} while a batch is running",
                action
            )));
        }
        Ok(())
    }
}

pub struct Session {
    config: Config,
    store: Arc<FileStore>,
    validator: IngestValidator,
    rasterizer: Arc<dyn PageRasterizer>,
    state: Mutex<SessionState>,
}

/// Clears the busy flag when the batch ends, including on early return.
struct BusyGuard<'a>(&'a Session);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.state().busy = false;
    }
}

impl Session {
    pub fn new(config: Config, mode: ToolMode) -> Self {
        Self::with_rasterizer(config, mode, default_rasterizer())
    }

    pub fn with_rasterizer(
        config: Config,
        mode: ToolMode,
        rasterizer: Arc<dyn PageRasterizer>,
    ) -> Self {
        let settings = Settings::with_quality(config.default_quality());
        Self {
            validator: IngestValidator::new(config.max_file_size_bytes()),
            store: Arc::new(FileStore::new(Arc::new(InMemoryDisplayRegistry::new()))),
            rasterizer,
            state: Mutex::new(SessionState {
                mode,
                settings,
                busy: false,
            }),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<FileStore> {
        &self.store
    }

    pub fn mode(&self) -> ToolMode {
        self.state().mode
    }

    pub fn settings(&self) -> Settings {
        self.state().settings.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state().busy
    }

    /// Select another tool. Returns the number of records dropped when the
    /// switch crosses between image and PDF tools.
    pub fn switch_mode(&self, mode: ToolMode) -> Result<usize, AppError> {
        let mut state = self.state();
        state.ensure_idle("switch tool")?;
        if state.mode == mode {
            return Ok(0);
        }

        let cleared = if state.mode.requires_clear_on_switch(mode) {
            self.store.clear()
        } else {
            0
        };
        tracing::info!(from = %state.mode, to = %mode, cleared, "Tool switched");
        state.mode = mode;
        Ok(cleared)
    }

    /// Replace the batch settings. Invalid settings leave the current ones
    /// in place.
    pub fn update_settings(&self, settings: Settings) -> Result<(), AppError> {
        let settings = settings.validated()?;
        let mut state = self.state();
        state.ensure_idle("change settings")?;
        state.settings = settings;
        Ok(())
    }

    /// Add files accepted by the active tool. Other files are skipped.
    pub fn ingest(&self, files: Vec<SourceFile>) -> Result<IngestReport, AppError> {
        let mode = self.mode();
        ingest_files(&self.store, files, mode, &self.validator)
    }

    pub fn remove(&self, id: RecordId) -> Result<FileRecord, AppError> {
        Ok(self.store.remove(id)?)
    }

    pub fn clear(&self) -> usize {
        self.store.clear()
    }

    /// Run the active tool over every pending record.
    pub async fn process(&self) -> Result<BatchSummary, AppError> {
        let (mode, settings) = {
            let mut state = self.state();
            if state.busy {
                return Err(AppError::Busy("A batch is already running".to_string()));
            }
            state.busy = true;
            (state.mode, state.settings.clone())
        };
        let _guard = BusyGuard(self);
        let transform = ToolTransform::for_mode(mode, &self.config, self.rasterizer.clone());

        ProcessingPipeline::new()
            .process_all(&self.store, settings, &transform)
            .await
    }

    pub async fn export(&self, exporter: &Exporter) -> Result<ExportReport, AppError> {
        let records = self.store.snapshot();
        Ok(exporter.export_all(&records).await?)
    }

    pub fn stats(&self) -> AggregateStats {
        self.store.stats()
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(feature = "pdfium")]
fn default_rasterizer() -> Arc<dyn PageRasterizer> {
    Arc::new(folio_processing::PdfiumRasterizer::new(None))
}

#[cfg(not(feature = "pdfium"))]
fn default_rasterizer() -> Arc<dyn PageRasterizer> {
    Arc::new(folio_processing::NoRasterizer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_new_session_uses_configured_quality() {
        let session = Session::new(Config::default(), ToolMode::Compress);
        assert_eq!(session.settings().quality, Config::default().default_quality());
        assert!(!session.is_busy());
    }

    #[test]
    fn test_switch_between_pdf_and_image_tools_clears() {
        let session = Session::new(Config::default(), ToolMode::SplitPdf);
        session
            .ingest(vec![SourceFile::new(
                "doc.pdf",
                Some("application/pdf".to_string()),
                Bytes::from_static(b"%PDF-1.4"),
            )])
            .unwrap();
        assert_eq!(session.store().len(), 1);

        assert_eq!(session.switch_mode(ToolMode::SplitPdf).unwrap(), 0);
        assert_eq!(session.switch_mode(ToolMode::Compress).unwrap(), 1);
        assert!(session.store().is_empty());
        assert_eq!(session.mode(), ToolMode::Compress);
    }

    #[test]
    fn test_busy_session_refuses_changes() {
        let session = Session::new(Config::default(), ToolMode::SplitPdf);
        session
            .ingest(vec![SourceFile::new(
                "doc.pdf",
                Some("application/pdf".to_string()),
                Bytes::from_static(b"%PDF-1.4"),
            )])
            .unwrap();
        session.state().busy = true;

        let result = session.switch_mode(ToolMode::Compress);
        assert!(matches!(result, Err(AppError::Busy(_))));
        assert_eq!(session.mode(), ToolMode::SplitPdf);
        assert_eq!(session.store().len(), 1);

        let before = session.settings();
        let changed = Settings {
            rotation: 90.0,
            ..before.clone()
        };
        assert!(matches!(
            session.update_settings(changed),
            Err(AppError::Busy(_))
        ));
        assert_eq!(session.settings().rotation, before.rotation);
    }

    #[tokio::test]
    async fn test_busy_flag_cleared_after_batch() {
        let session = Session::new(Config::default(), ToolMode::Compress);
        session.process().await.unwrap();
        assert!(!session.is_busy());
        assert!(session.switch_mode(ToolMode::ImageToPdf).is_ok());
    }

    #[test]
    fn test_invalid_settings_keep_previous() {
        let session = Session::new(Config::default(), ToolMode::Compress);
        let before = session.settings();
        let invalid = Settings {
            quality: 101,
            ..Settings::default()
        };
        assert!(session.update_settings(invalid).is_err());
        assert_eq!(session.settings().quality, before.quality);
    }
}
