//! Decides which filesystem entries belong in a listing.

use std::path::Path;
use std::sync::Arc;
use tivoshare_av::Transcoder;
use tivoshare_common::paths::has_extension_in;

/// Listing eligibility for directory entries.
#[derive(Clone)]
pub struct FormatClassifier {
    extensions: Option<Vec<String>>,
    transcoder: Arc<dyn Transcoder>,
}

impl FormatClassifier {
    /// `extensions` is the normalized static allow-list, if configured.
    pub fn new(extensions: Option<Vec<String>>, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            extensions,
            transcoder,
        }
    }

    pub fn extensions(&self) -> Option<&[String]> {
        self.extensions.as_deref()
    }

    /// Whether `path` should be listed.
    ///
    /// Directories always are. Files match the allow-list when one is
    /// configured; otherwise the transcoder is asked, which may probe.
    pub fn is_eligible(&self, path: &Path) -> bool {
        if path.is_dir() {
            return true;
        }
        match &self.extensions {
            Some(allowed) => has_extension_in(path, allowed),
            None => self.transcoder.supported_format(path),
        }
    }
}
