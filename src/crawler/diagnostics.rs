//! Best-effort HTML snapshots for post-mortem debugging

use chrono::Utc;
use std::path::{Path, PathBuf};

/// Writes page snapshots into a directory
///
/// Failures are logged and swallowed; diagnostics never affect a run.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    dir: PathBuf,
}

impl Diagnostics {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves `html` as `<label>_<timestamp>.html`, returning the path on success
    pub fn save(&self, label: &str, html: &str) -> Option<PathBuf> {
        let name = format!(
            "{}_{}.html",
            sanitize(label),
            Utc::now().format("%Y%m%d_%H%M%S_%3f")
        );
        let path = self.dir.join(name);

        let result = std::fs::create_dir_all(&self.dir).and_then(|_| std::fs::write(&path, html));
        match result {
            Ok(()) => {
                tracing::info!("Saved diagnostic snapshot to {}", path.display());
                Some(path)
            }
            Err(e) => {
                tracing::warn!("Could not save diagnostic snapshot {}: {}", path.display(), e);
                None
            }
        }
    }
}

fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
