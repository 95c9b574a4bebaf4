//! Revocable preview handles for accepted uploads.

use std::collections::HashSet;

use parking_lot::Mutex;
use uuid::Uuid;

const PREVIEW_SCHEME: &str = "preview://";

/// Tracks which preview handles are live.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    active: Mutex<HashSet<String>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new preview URI.
    pub fn create(&self) -> String {
        let uri = format!("{}{}", PREVIEW_SCHEME, Uuid::new_v4());
        self.active.lock().insert(uri.clone());
        uri
    }

    /// Release a preview URI. Returns false if it was not live.
    pub fn revoke(&self, uri: &str) -> bool {
        let revoked = self.active.lock().remove(uri);
        if revoked {
            log::debug!("PREVIEW_REVOKED uri={}", uri);
        }
        revoked
    }

    pub fn is_active(&self, uri: &str) -> bool {
        self.active.lock().contains(uri)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }
}
