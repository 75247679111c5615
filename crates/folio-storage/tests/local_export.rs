use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use folio_core::{Artifact, FileRecord, RecordResult};
use folio_storage::{Exporter, LocalSaveTarget};
use tempfile::tempdir;

fn completed(name: &str, artifacts: Vec<Artifact>) -> FileRecord {
    let mut record = FileRecord::new(name, "application/pdf", Bytes::from_static(b"%PDF"));
    record.result = Some(RecordResult::Multiple(artifacts));
    record
}

#[tokio::test]
async fn test_export_all_into_directory() {
    let dir = tempdir().unwrap();
    let target = LocalSaveTarget::new(dir.path()).await.unwrap();
    let exporter = Exporter::new(Arc::new(target), Duration::ZERO);

    let merged = Artifact::new("merged.pdf", "application/pdf", Bytes::from_static(b"merged"));
    let records = vec![
        completed("a.pdf", vec![merged.clone()]),
        completed("b.pdf", vec![merged]),
        completed(
            "deck.pdf",
            vec![
                Artifact::new("deck_page_1.pdf", "application/pdf", Bytes::from_static(b"1")),
                Artifact::new("deck_page_2.pdf", "application/pdf", Bytes::from_static(b"2")),
            ],
        ),
    ];

    let report = exporter.export_all(&records).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.saved.len(), 3);

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["deck_page_1.pdf", "deck_page_2.pdf", "merged.pdf"]);
}

#[tokio::test]
async fn test_repeated_export_keeps_earlier_files() {
    let dir = tempdir().unwrap();
    let target = LocalSaveTarget::new(dir.path()).await.unwrap();
    let exporter = Exporter::new(Arc::new(target), Duration::ZERO);
    let records = vec![completed(
        "a.pdf",
        vec![Artifact::new("rotated_a.pdf", "application/pdf", Bytes::from_static(b"r"))],
    )];

    exporter.export_all(&records).await.unwrap();
    let second = exporter.export_all(&records).await.unwrap();

    assert_eq!(second.saved[0].name, "rotated_a (1).pdf");
    assert!(dir.path().join("rotated_a.pdf").exists());
    assert!(dir.path().join("rotated_a (1).pdf").exists());
}
