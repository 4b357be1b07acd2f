use bytes::Bytes;

#[derive(Debug, Clone)]
pub struct UploadedFileCreate {
    /// Object path relative to the storage root, e.g. `answers/12_3.pdf`.
    pub key: String,
    pub content_type: &'static str,
    pub content: Bytes,
}
