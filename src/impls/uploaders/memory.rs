use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::core::models::upload_file::UploadedFileCreate;
use crate::core::ports::uploader::AttachmentUploader;
use crate::error::Error;

/// Keeps objects in memory and records every call.
#[derive(Debug, Default)]
pub struct MemoryUploader {
    pub objects: Mutex<HashMap<String, Bytes>>,
    pub uploads: Mutex<Vec<String>>,
    pub removals: Mutex<Vec<String>>,
    /// Uploads whose key contains this fragment fail.
    pub fail_on: Option<String>,
}

impl MemoryUploader {
    pub fn failing_on(fragment: &str) -> Self {
        Self {
            fail_on: Some(fragment.to_owned()),
            ..Default::default()
        }
    }

    pub fn stored_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn upload_calls(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn removal_calls(&self) -> Vec<String> {
        self.removals.lock().unwrap().clone()
    }
}

impl AttachmentUploader for MemoryUploader {
    async fn upload(&self, file: UploadedFileCreate) -> Result<String, Error> {
        self.uploads.lock().unwrap().push(file.key.clone());
        if self.fail_on.as_ref().map_or(false, |f| file.key.contains(f.as_str())) {
            return Err(Error::ServerError("storage unavailable".into()));
        }
        self.objects.lock().unwrap().insert(file.key.clone(), file.content);
        Ok(format!("/uploads/{}", file.key))
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.removals.lock().unwrap().push(key.to_owned());
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}
