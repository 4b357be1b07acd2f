use log::debug;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs::{create_dir_all, remove_file, rename, write};
use uuid::Uuid;

use crate::core::models::upload_file::UploadedFileCreate;
use crate::core::ports::uploader::AttachmentUploader;
use crate::error::Error;

/// Stores uploads under a directory that is served at `public_base`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_base: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    fn path_of(&self, key: &str) -> Result<PathBuf, Error> {
        let relative = Path::new(key);
        if key.is_empty() || !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(Error::ServerError(format!("invalid object key: {}", key)));
        }
        Ok(self.root.join(relative))
    }

    fn reference_of(&self, key: &str) -> String {
        format!("{}/{}", self.public_base.trim_end_matches('/'), key)
    }
}

impl AttachmentUploader for LocalStorage {
    async fn upload(&self, file: UploadedFileCreate) -> Result<String, Error> {
        let path = self.path_of(&file.key)?;
        let dir = path.parent().unwrap_or(&self.root).to_owned();
        create_dir_all(&dir).await?;
        // written aside first so a reader never sees a partial file
        let staging = dir.join(format!(".{}.part", Uuid::new_v4()));
        write(&staging, &file.content).await?;
        if let Err(e) = rename(&staging, &path).await {
            let _ = remove_file(&staging).await;
            return Err(e.into());
        }
        debug!("stored {} ({}, {} bytes)", file.key, file.content_type, file.content.len());
        Ok(self.reference_of(&file.key))
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        match remove_file(self.path_of(key)?).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}
