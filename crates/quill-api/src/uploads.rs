use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::fs;
use tracing::info;
use uuid::Uuid;

/// On-disk storage for uploaded cover images.
///
/// Files are written once as `{dir}/{uuid}.{original extension}` and served
/// statically; the returned relative path is what gets persisted on the post.
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub async fn store(&self, original_name: &str, data: &[u8]) -> Result<String> {
        let name = match Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
        {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };

        fs::write(self.dir.join(&name), data).await?;
        Ok(format!("uploads/{}", name))
    }
}
