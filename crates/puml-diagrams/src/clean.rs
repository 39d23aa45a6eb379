//! Page-level cache housekeeping.

use std::path::{Path, PathBuf};

use crate::consts::{CMAPX_EXTENSION, FILE_PREFIX, MAP_EXTENSION, SOURCE_EXTENSION};
use crate::key::digest_hex;

/// Extensions of every file a render can leave behind.
const ARTIFACT_EXTENSIONS: [&str; 5] = ["svg", "png", CMAPX_EXTENSION, MAP_EXTENSION, SOURCE_EXTENSION];

/// Housekeeping failure.
#[derive(Debug, thiserror::Error)]
pub enum CleanError {
    /// The cache directory path produced an invalid glob pattern.
    #[error("invalid cache pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    /// A file could not be removed.
    #[error("failed to remove {}: {source}", .path.display())]
    Io {
        /// File being removed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Remove every artifact rendered for `page` from `cache_dir`.
///
/// Matches `uml-{page_hash}-*` with any artifact extension, so diagrams whose
/// source has since changed are removed too. Returns the number of files
/// removed; a missing cache directory removes nothing.
///
/// # Errors
///
/// Returns an error if a matching file cannot be removed.
pub fn clean_page(cache_dir: &Path, page: &str) -> Result<usize, CleanError> {
    let dir = glob::Pattern::escape(&cache_dir.to_string_lossy());
    let page_hash = digest_hex(page);

    let mut removed = 0;
    for extension in ARTIFACT_EXTENSIONS {
        let pattern = format!("{dir}/{FILE_PREFIX}-{page_hash}-*.{extension}");
        for entry in glob::glob(&pattern)? {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable cache entry");
                    continue;
                }
            };
            std::fs::remove_file(&path).map_err(|source| CleanError::Io {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(path = %path.display(), "removed cached diagram");
            removed += 1;
        }
    }
    Ok(removed)
}
