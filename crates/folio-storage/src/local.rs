use crate::traits::{
    numbered_name, validate_filename, ExportError, ExportResult, SaveTarget, SavedFile,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Upper bound on ` (n)` suffixes tried before giving up
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Save target writing into a local directory
#[derive(Debug, Clone)]
pub struct LocalSaveTarget {
    base_path: PathBuf,
}

impl LocalSaveTarget {
    /// Create a new LocalSaveTarget, creating the directory if needed
    ///
    /// # Arguments
    /// * `base_path` - Directory receiving exported files (e.g., "./folio-out")
    pub async fn new(base_path: impl Into<PathBuf>) -> ExportResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path)
            .await
            .map_err(|e| ExportError::Write {
                name: base_path.display().to_string(),
                message: format!("Failed to create output directory: {}", e),
            })?;

        Ok(LocalSaveTarget { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Create the file under the first free name. `create_new` makes the
    /// existence check and the creation one step.
    async fn create_unique(&self, filename: &str) -> ExportResult<(String, PathBuf, fs::File)> {
        for n in 0..MAX_NAME_ATTEMPTS {
            let name = numbered_name(filename, n);
            let path = self.base_path.join(&name);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((name, path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(ExportError::Write {
                        name,
                        message: format!("Failed to create {}: {}", path.display(), e),
                    })
                }
            }
        }

        Err(ExportError::Write {
            name: filename.to_string(),
            message: "No free filename left".to_string(),
        })
    }
}

#[async_trait]
impl SaveTarget for LocalSaveTarget {
    async fn save(&self, filename: &str, _mime_type: &str, data: Bytes) -> ExportResult<SavedFile> {
        validate_filename(filename)?;
        let start = std::time::Instant::now();

        let (name, path, mut file) = self.create_unique(filename).await?;
        let write_error = |e: std::io::Error| ExportError::Write {
            name: name.clone(),
            message: format!("Failed to write {}: {}", path.display(), e),
        };

        write_or_discard(&path, &mut file, &data)
            .await
            .map_err(write_error)?;
        if let Err(e) = file.sync_all().await {
            drop(file);
            discard_partial(&path).await;
            return Err(write_error(e));
        }

        tracing::debug!(
            path = %path.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "File saved"
        );

        Ok(SavedFile {
            location: path.display().to_string(),
            name,
            size_bytes: data.len() as u64,
        })
    }

    fn describe(&self) -> String {
        format!("directory {}", self.base_path.display())
    }
}

/// Write `data`, removing the file at `path` if the write fails.
async fn write_or_discard<W>(path: &Path, writer: &mut W, data: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if let Err(e) = writer.write_all(data).await {
        discard_partial(path).await;
        return Err(e);
    }
    Ok(())
}

async fn discard_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        tracing::warn!(
            path = %path.display(),
            error = %e,
            "Failed to remove partially written file"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::tempdir;

    /// Accepts nothing, as a full disk would
    struct FailingWriter;

    impl AsyncWrite for FailingWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::Error::other("no space left")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_local_save_writes_file() {
        let dir = tempdir().unwrap();
        let target = LocalSaveTarget::new(dir.path()).await.unwrap();

        let saved = target
            .save("out.png", "image/png", Bytes::from_static(b"png data"))
            .await
            .unwrap();

        assert_eq!(saved.name, "out.png");
        assert_eq!(saved.size_bytes, 8);
        let written = std::fs::read(dir.path().join("out.png")).unwrap();
        assert_eq!(written, b"png data");
    }

    #[tokio::test]
    async fn test_local_save_never_overwrites() {
        let dir = tempdir().unwrap();
        let target = LocalSaveTarget::new(dir.path()).await.unwrap();

        let first = target
            .save("merged.pdf", "application/pdf", Bytes::from_static(b"one"))
            .await
            .unwrap();
        let second = target
            .save("merged.pdf", "application/pdf", Bytes::from_static(b"two"))
            .await
            .unwrap();

        assert_eq!(first.name, "merged.pdf");
        assert_eq!(second.name, "merged (1).pdf");
        assert_eq!(std::fs::read(dir.path().join("merged.pdf")).unwrap(), b"one");
        assert_eq!(std::fs::read(dir.path().join("merged (1).pdf")).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let target = LocalSaveTarget::new(dir.path()).await.unwrap();

        let result = target
            .save("../escape.png", "image/png", Bytes::from_static(b"x"))
            .await;
        assert!(matches!(result, Err(ExportError::InvalidFilename(_))));

        let result = target
            .save("nested/file.png", "image/png", Bytes::from_static(b"x"))
            .await;
        assert!(matches!(result, Err(ExportError::InvalidFilename(_))));
    }

    #[tokio::test]
    async fn test_dots_inside_name_are_saved() {
        let dir = tempdir().unwrap();
        let target = LocalSaveTarget::new(dir.path()).await.unwrap();

        let saved = target
            .save("processed_v1..final.png", "image/png", Bytes::from_static(b"x"))
            .await
            .unwrap();

        assert_eq!(saved.name, "processed_v1..final.png");
        assert!(dir.path().join("processed_v1..final.png").exists());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("merged.pdf");
        std::fs::write(&path, b"").unwrap();

        let result = write_or_discard(&path, &mut FailingWriter, b"data").await;

        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let target = LocalSaveTarget::new(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert_eq!(target.base_path(), nested.as_path());
    }
}
