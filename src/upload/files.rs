use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{HighlightError, HighlightResult};
use crate::upload::traits::{SharedFile, UploadedFile};

/// File on the local filesystem, read lazily with `tokio::fs`.
#[derive(Debug, Clone)]
pub struct DiskFile {
    path: PathBuf,
    name: String,
}

impl DiskFile {
    pub fn new(path: impl Into<PathBuf>) -> HighlightResult<Self> {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                HighlightError::Upload(format!("{} has no usable file name", path.display()))
            })?;
        Ok(Self { path, name })
    }
}

#[async_trait]
impl UploadedFile for DiskFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_bytes(&self) -> HighlightResult<Vec<u8>> {
        tokio::fs::read(&self.path).await.map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "failed to read upload");
            HighlightError::Upload(format!("{}: {e}", self.path.display()))
        })
    }
}

/// In-memory file; handy for embedding and tests.
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    bytes: Arc<[u8]>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            name: name.into(),
            bytes: Arc::from(bytes),
        }
    }

    pub fn shared(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> SharedFile {
        Arc::new(Self::new(name, bytes))
    }
}

#[async_trait]
impl UploadedFile for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_bytes(&self) -> HighlightResult<Vec<u8>> {
        Ok(self.bytes.to_vec())
    }
}

/// Expand CLI arguments into upload handles. Directories contribute their
/// regular files sorted by name; anything else is taken as a file.
pub fn collect_disk_files(paths: &[PathBuf]) -> HighlightResult<Vec<SharedFile>> {
    let mut out: Vec<SharedFile> = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries = Vec::new();
            for entry in std::fs::read_dir(path)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    entries.push(entry.path());
                }
            }
            entries.sort();
            tracing::debug!(dir = %path.display(), count = entries.len(), "expanded upload directory");
            for file in entries {
                out.push(Arc::new(DiskFile::new(file)?));
            }
        } else {
            out.push(Arc::new(DiskFile::new(path.clone())?));
        }
    }
    Ok(out)
}
