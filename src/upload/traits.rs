use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::HighlightResult;

/// A user-supplied file: a name plus bytes that are read on demand.
/// Implementations must not change either once constructed.
#[async_trait]
pub trait UploadedFile: Send + Sync {
    fn name(&self) -> &str;

    async fn read_bytes(&self) -> HighlightResult<Vec<u8>>;

    /// Decode the content as UTF-8, replacing invalid sequences.
    async fn read_text(&self) -> HighlightResult<String> {
        let bytes = self.read_bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

pub type SharedFile = Arc<dyn UploadedFile>;

impl std::fmt::Debug for dyn UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile").field("name", &self.name()).finish()
    }
}
