use crate::core::models::upload_file::UploadedFileCreate;
use crate::error::Error;

pub trait AttachmentUploader {
    /// Stores the file, replacing any object under the same key, and returns
    /// its public reference.
    async fn upload(&self, file: UploadedFileCreate) -> Result<String, Error>;
    async fn remove(&self, key: &str) -> Result<(), Error>;
}
