//! Batch processing pipeline
//!
//! Drives one transform over the store. Records are processed one at a time
//! in store order; each record moves `pending -> processing` and then to
//! `completed` or `error`. A failing record never aborts the batch.

use std::sync::Arc;
use std::time::Instant;

use folio_core::{
    AppError, Config, FileStore, ProcessingStatus, RecordId, RecordResult, Settings, StoreError,
    ToolMode,
};
use serde::Serialize;

use crate::image::ImageTransformer;
use crate::pdf::{
    ImageToPdfTransform, PageRasterizer, PdfMergeTransform, PdfRotateTransform, PdfSplitTransform,
    PdfToImagesTransform,
};
use crate::traits::{CombineTransform, RecordTransform, TransformInput};

/// The transform selected for a tool mode
#[derive(Clone)]
pub enum ToolTransform {
    /// Each record gets its own result
    PerRecord(Arc<dyn RecordTransform>),
    /// All images of the batch become one PDF
    ImagesToPdf(Arc<ImageToPdfTransform>),
    /// All PDFs of the batch become one PDF
    MergePdf(Arc<PdfMergeTransform>),
}

impl ToolTransform {
    pub fn for_mode(mode: ToolMode, config: &Config, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        match mode {
            ToolMode::Compress => ToolTransform::PerRecord(Arc::new(ImageTransformer::new())),
            ToolMode::ImageToPdf => {
                ToolTransform::ImagesToPdf(Arc::new(ImageToPdfTransform::from_config(config)))
            }
            ToolMode::PdfToImage => ToolTransform::PerRecord(Arc::new(PdfToImagesTransform::new(
                rasterizer,
                config.pdf_render_scale(),
            ))),
            ToolMode::MergePdf => ToolTransform::MergePdf(Arc::new(PdfMergeTransform::new())),
            ToolMode::SplitPdf => ToolTransform::PerRecord(Arc::new(PdfSplitTransform::new())),
            ToolMode::RotatePdf => ToolTransform::PerRecord(Arc::new(PdfRotateTransform::new())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolTransform::PerRecord(transform) => transform.name(),
            ToolTransform::ImagesToPdf(transform) => transform.name(),
            ToolTransform::MergePdf(transform) => transform.name(),
        }
    }
}

impl std::fmt::Debug for ToolTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ToolTransform").field(&self.name()).finish()
    }
}

/// Outcome counts of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Records that entered `processing`
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Records already completed, or in flight, when reached
    pub skipped: usize,
    /// Records removed while in flight; their results were dropped
    pub discarded: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessingPipeline;

impl ProcessingPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Process every record that is not completed (pending or failed) with
    /// the given transform. The settings are validated once and used
    /// unchanged for the whole batch.
    pub async fn process_all(
        &self,
        store: &FileStore,
        settings: Settings,
        transform: &ToolTransform,
    ) -> Result<BatchSummary, AppError> {
        let settings = settings.validated()?;
        let start = Instant::now();
        let ids = store.ids();

        tracing::info!(
            transform = transform.name(),
            records = ids.len(),
            "Batch started"
        );

        let mut summary = BatchSummary::default();
        match transform {
            ToolTransform::PerRecord(t) => {
                self.run_per_record(store, &settings, t.as_ref(), &ids, &mut summary)
                    .await
            }
            ToolTransform::ImagesToPdf(t) => {
                self.run_combining(store, &settings, t.as_ref(), &ids, &mut summary)
                    .await
            }
            ToolTransform::MergePdf(t) => {
                self.run_combining(store, &settings, t.as_ref(), &ids, &mut summary)
                    .await
            }
        }
        summary.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            transform = transform.name(),
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            discarded = summary.discarded,
            duration_ms = summary.duration_ms,
            "Batch finished"
        );
        Ok(summary)
    }

    async fn run_per_record(
        &self,
        store: &FileStore,
        settings: &Settings,
        transform: &dyn RecordTransform,
        ids: &[RecordId],
        summary: &mut BatchSummary,
    ) {
        for &id in ids {
            let Some(input) = Self::begin(store, id, summary) else {
                continue;
            };

            match transform.transform(&input, settings).await {
                Ok(result) => {
                    let stored = store.complete(id, result);
                    Self::settle(stored, id, Outcome::Succeeded, summary);
                }
                Err(e) => {
                    tracing::warn!(
                        record_id = %id,
                        name = %input.name,
                        transform = transform.name(),
                        error = %e,
                        "Transform failed"
                    );
                    let stored = store.fail(id, e.to_string());
                    Self::settle(stored, id, Outcome::Failed, summary);
                }
            }
        }
    }

    /// Prepare every record on its own, then combine the parts that made it.
    /// A record whose preparation fails is the only one marked as failed.
    async fn run_combining<C: CombineTransform>(
        &self,
        store: &FileStore,
        settings: &Settings,
        transform: &C,
        ids: &[RecordId],
        summary: &mut BatchSummary,
    ) {
        let mut prepared: Vec<(RecordId, C::Part)> = Vec::new();

        for &id in ids {
            let Some(input) = Self::begin(store, id, summary) else {
                continue;
            };

            match transform.prepare(&input, settings).await {
                Ok(part) => prepared.push((id, part)),
                Err(e) => {
                    tracing::warn!(
                        record_id = %id,
                        name = %input.name,
                        transform = transform.name(),
                        error = %e,
                        "Transform failed"
                    );
                    let stored = store.fail(id, e.to_string());
                    Self::settle(stored, id, Outcome::Failed, summary);
                }
            }
        }

        // Drop parts of records removed while the batch was running
        let before = prepared.len();
        prepared.retain(|(id, _)| store.contains(*id));
        summary.discarded += before - prepared.len();

        if prepared.is_empty() {
            return;
        }

        let (contributors, parts): (Vec<RecordId>, Vec<C::Part>) = prepared.into_iter().unzip();
        match transform.combine(parts, settings).await {
            Ok(artifact) => {
                for id in contributors {
                    let stored = store.complete(id, RecordResult::Single(artifact.clone()));
                    Self::settle(stored, id, Outcome::Succeeded, summary);
                }
            }
            Err(e) => {
                tracing::warn!(
                    transform = transform.name(),
                    contributors = contributors.len(),
                    error = %e,
                    "Combining transform failed"
                );
                let message = e.to_string();
                for id in contributors {
                    let stored = store.fail(id, message.clone());
                    Self::settle(stored, id, Outcome::Failed, summary);
                }
            }
        }
    }

    /// Move an eligible record to `processing` and snapshot its input.
    /// Returns `None` for records that are gone or not eligible.
    fn begin(
        store: &FileStore,
        id: RecordId,
        summary: &mut BatchSummary,
    ) -> Option<TransformInput> {
        let record = store.get(id)?;
        if !record.status.is_eligible() {
            summary.skipped += 1;
            return None;
        }

        match store.update_status(id, ProcessingStatus::Processing, 0) {
            Ok(()) => {
                summary.processed += 1;
                tracing::debug!(record_id = %id, name = %record.name, "Processing record");
                Some(TransformInput::from(&record))
            }
            // Removed or picked up elsewhere between the read and the update
            Err(StoreError::NotFound(_)) => None,
            Err(e) => {
                tracing::debug!(record_id = %id, error = %e, "Record not started");
                summary.skipped += 1;
                None
            }
        }
    }

    fn settle(
        stored: Result<(), StoreError>,
        id: RecordId,
        outcome: Outcome,
        summary: &mut BatchSummary,
    ) {
        match (stored, outcome) {
            (Ok(()), Outcome::Succeeded) => summary.succeeded += 1,
            (Ok(()), Outcome::Failed) => summary.failed += 1,
            (Err(StoreError::NotFound(_)), _) => {
                tracing::debug!(record_id = %id, "Record removed in flight, result discarded");
                summary.discarded += 1;
            }
            (Err(e), _) => {
                tracing::error!(record_id = %id, error = %e, "Could not store transform outcome");
                summary.discarded += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::TransformError;
    use async_trait::async_trait;
    use bytes::Bytes;
    use folio_core::{Artifact, DisplayRegistry, FileRecord, InMemoryDisplayRegistry};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn store() -> (Arc<FileStore>, Arc<InMemoryDisplayRegistry>) {
        let registry = Arc::new(InMemoryDisplayRegistry::new());
        (Arc::new(FileStore::new(registry.clone())), registry)
    }

    fn add(store: &FileStore, names: &[&str]) -> Vec<RecordId> {
        let records = names
            .iter()
            .map(|name| FileRecord::new(*name, "image/png", Bytes::from(name.to_string())))
            .collect();
        store.add(records).unwrap()
    }

    // Mock transform: uppercases the content, fails for names starting with "bad"
    #[derive(Default)]
    struct MockTransform {
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RecordTransform for MockTransform {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn transform(
            &self,
            input: &TransformInput,
            _settings: &Settings,
        ) -> Result<RecordResult, TransformError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(input.name.clone());
            if input.name.starts_with("bad") {
                return Err(TransformError::Decode(input.name.clone()));
            }
            let upper = input.bytes.to_ascii_uppercase();
            Ok(RecordResult::Single(Artifact::new(
                format!("processed_{}", input.name),
                "image/png",
                Bytes::from(upper),
            )))
        }
    }

    // Removes its own record from the store while "in flight"
    struct RemovingTransform {
        store: Arc<FileStore>,
    }

    #[async_trait]
    impl RecordTransform for RemovingTransform {
        fn name(&self) -> &'static str {
            "removing"
        }

        async fn transform(
            &self,
            input: &TransformInput,
            _settings: &Settings,
        ) -> Result<RecordResult, TransformError> {
            self.store.remove(input.id).unwrap();
            tokio::task::yield_now().await;
            Ok(RecordResult::Single(Artifact::new(
                "late.png",
                "image/png",
                Bytes::from_static(b"late"),
            )))
        }
    }

    // Concatenates contents; fails preparation for "bad" names, and the
    // whole combine when told to
    struct ConcatTransform {
        fail_combine: bool,
        remove_on_prepare: Option<(Arc<FileStore>, RecordId)>,
    }

    #[async_trait]
    impl CombineTransform for ConcatTransform {
        type Part = Bytes;

        fn name(&self) -> &'static str {
            "concat"
        }

        async fn prepare(
            &self,
            input: &TransformInput,
            _settings: &Settings,
        ) -> Result<Bytes, TransformError> {
            if let Some((store, victim)) = &self.remove_on_prepare {
                if input.id != *victim {
                    let _ = store.remove(*victim);
                }
            }
            if input.name.starts_with("bad") {
                return Err(TransformError::Decode(input.name.clone()));
            }
            Ok(input.bytes.clone())
        }

        async fn combine(
            &self,
            parts: Vec<Bytes>,
            _settings: &Settings,
        ) -> Result<Artifact, TransformError> {
            if self.fail_combine {
                return Err(TransformError::Encode("combine".to_string()));
            }
            let joined: Vec<u8> = parts.iter().flat_map(|p| p.iter().copied()).collect();
            Ok(Artifact::new("joined.pdf", "application/pdf", Bytes::from(joined)))
        }
    }

    fn per_record(transform: Arc<dyn RecordTransform>) -> ToolTransform {
        ToolTransform::PerRecord(transform)
    }

    #[tokio::test]
    async fn test_process_all_isolates_failures() {
        let (store, _) = store();
        let ids = add(&store, &["a.png", "bad.png", "c.png"]);
        let mock = Arc::new(MockTransform::default());

        let summary = ProcessingPipeline::new()
            .process_all(&store, Settings::default(), &per_record(mock.clone()))
            .await
            .unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);

        let a = store.get(ids[0]).unwrap();
        assert_eq!(a.status, ProcessingStatus::Completed);
        assert_eq!(a.progress, 100);
        assert_eq!(a.artifacts()[0].bytes, Bytes::from_static(b"A.PNG"));

        let bad = store.get(ids[1]).unwrap();
        assert_eq!(bad.status, ProcessingStatus::Error);
        assert_eq!(bad.progress, 0);
        assert!(bad.result.is_none());
        assert!(bad.error.unwrap().contains("bad.png"));

        assert_eq!(store.get(ids[2]).unwrap().status, ProcessingStatus::Completed);
    }

    #[tokio::test]
    async fn test_process_all_follows_store_order() {
        let (store, _) = store();
        add(&store, &["3.png", "1.png", "2.png"]);
        let mock = Arc::new(MockTransform::default());

        ProcessingPipeline::new()
            .process_all(&store, Settings::default(), &per_record(mock.clone()))
            .await
            .unwrap();

        assert_eq!(*mock.seen.lock().unwrap(), vec!["3.png", "1.png", "2.png"]);
    }

    #[tokio::test]
    async fn test_rerun_skips_completed_and_retries_failed() {
        let (store, registry) = store();
        add(&store, &["a.png", "bad.png"]);
        let mock = Arc::new(MockTransform::default());
        let transform = per_record(mock.clone());
        let pipeline = ProcessingPipeline::new();

        pipeline
            .process_all(&store, Settings::default(), &transform)
            .await
            .unwrap();
        let before: Vec<_> = store
            .snapshot()
            .into_iter()
            .map(|r| (r.id, r.status, r.artifacts().len()))
            .collect();
        let live = registry.live_count();

        let summary = pipeline
            .process_all(&store, Settings::default(), &transform)
            .await
            .unwrap();

        // Only the failed record runs again, and fails the same way
        assert_eq!(mock.calls.load(Ordering::SeqCst), 3);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        let after: Vec<_> = store
            .snapshot()
            .into_iter()
            .map(|r| (r.id, r.status, r.artifacts().len()))
            .collect();
        assert_eq!(before, after);
        assert_eq!(registry.live_count(), live);
    }

    #[tokio::test]
    async fn test_removal_mid_transform_discards_result() {
        let (store, registry) = store();
        let ids = add(&store, &["a.png", "b.png"]);
        let transform = per_record(Arc::new(RemovingTransform {
            store: store.clone(),
        }));

        let summary = ProcessingPipeline::new()
            .process_all(&store, Settings::default(), &transform)
            .await
            .unwrap();

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.discarded, 2);
        assert_eq!(summary.succeeded, 0);
        assert!(store.is_empty());
        assert!(!store.contains(ids[0]));
        // No display reference leaked for the dropped results
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_settings_rejected_before_start() {
        let (store, _) = store();
        add(&store, &["a.png"]);
        let mock = Arc::new(MockTransform::default());
        let settings = Settings {
            quality: 101,
            ..Settings::default()
        };

        let result = ProcessingPipeline::new()
            .process_all(&store, settings, &per_record(mock.clone()))
            .await;

        assert!(result.is_err());
        assert_eq!(mock.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.snapshot()[0].status, ProcessingStatus::Pending);
    }

    #[tokio::test]
    async fn test_combining_isolates_bad_input_and_shares_artifact() {
        let (store, registry) = store();
        let ids = add(&store, &["a", "bad", "c"]);
        let transform = ConcatTransform {
            fail_combine: false,
            remove_on_prepare: None,
        };
        let mut summary = BatchSummary::default();

        ProcessingPipeline::new()
            .run_combining(&store, &Settings::default(), &transform, &ids, &mut summary)
            .await;

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);

        let a = store.get(ids[0]).unwrap();
        let c = store.get(ids[2]).unwrap();
        assert_eq!(a.artifacts()[0].bytes, Bytes::from_static(b"ac"));
        assert_eq!(a.artifacts()[0].id, c.artifacts()[0].id);
        assert_ne!(a.artifacts()[0].display, c.artifacts()[0].display);
        assert_eq!(store.get(ids[1]).unwrap().status, ProcessingStatus::Error);

        // Three originals plus the shared artifact once per contributor
        assert_eq!(registry.live_count(), 3 + 2);
    }

    #[tokio::test]
    async fn test_combine_failure_fails_contributors() {
        let (store, _) = store();
        let ids = add(&store, &["a", "b"]);
        let transform = ConcatTransform {
            fail_combine: true,
            remove_on_prepare: None,
        };
        let mut summary = BatchSummary::default();

        ProcessingPipeline::new()
            .run_combining(&store, &Settings::default(), &transform, &ids, &mut summary)
            .await;

        assert_eq!(summary.failed, 2);
        for id in ids {
            assert_eq!(store.get(id).unwrap().status, ProcessingStatus::Error);
        }
    }

    #[tokio::test]
    async fn test_combining_drops_parts_of_removed_records() {
        let (store, _) = store();
        let ids = add(&store, &["a", "b"]);
        let transform = ConcatTransform {
            fail_combine: false,
            remove_on_prepare: Some((store.clone(), ids[0])),
        };
        let mut summary = BatchSummary::default();

        ProcessingPipeline::new()
            .run_combining(&store, &Settings::default(), &transform, &ids, &mut summary)
            .await;

        assert_eq!(summary.discarded, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(store.len(), 1);
        let b = store.get(ids[1]).unwrap();
        assert_eq!(b.artifacts()[0].bytes, Bytes::from_static(b"b"));
    }

    #[test]
    fn test_for_mode_selects_transform() {
        let config = Config::default();
        let rasterizer: Arc<dyn PageRasterizer> = Arc::new(crate::pdf::NoRasterizer);
        for mode in ToolMode::ALL {
            let transform = ToolTransform::for_mode(mode, &config, rasterizer.clone());
            assert_eq!(transform.name(), mode.to_string());
            let combining = !matches!(transform, ToolTransform::PerRecord(_));
            assert_eq!(combining, mode.is_combining());
        }
    }
}
