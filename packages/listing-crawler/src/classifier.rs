//! Classification collaborator backed by the `detection` crate.

use std::path::Path;

use detection::{detect_purple_blob, DetectConfig};

use crate::traits::PhotoClassifier;

/// Purple-blob classifier over cached photo files.
pub struct BlobClassifier {
    config: DetectConfig,
}

impl BlobClassifier {
    pub fn new(config: DetectConfig) -> Self {
        Self { config }
    }
}

impl PhotoClassifier for BlobClassifier {
    fn classify(&self, path: &Path) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(detect_purple_blob(path, &self.config)?)
    }
}
