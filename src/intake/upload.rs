//! Uploaded files and the image handles built from them.

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

/// A raw upload as received at the intake boundary.
#[derive(Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub mime_type: String,
    /// Size as declared by the client.
    pub byte_size: u64,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// An upload whose declared size is the payload length.
    pub fn new(file_name: &str, mime_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            byte_size: bytes.len() as u64,
            bytes,
        }
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("byte_size", &self.byte_size)
            .finish_non_exhaustive()
    }
}

/// Compute the SHA-256 hex digest of a payload.
pub fn compute_content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Accepted image payload handed to the classifier.
#[derive(Clone)]
pub struct ImageHandle {
    /// Preview URI; also the detection's image reference.
    pub uri: String,
    pub file_name: String,
    pub mime_type: String,
    pub content_hash: String,
    pub bytes: Arc<[u8]>,
}

impl ImageHandle {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageHandle")
            .field("uri", &self.uri)
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("content_hash", &self.content_hash)
            .field("len", &self.bytes.len())
            .finish()
    }
}
