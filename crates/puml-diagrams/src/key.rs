//! Diagram cache key computation.
//!
//! Provides [`CacheKey`] for deriving the content-based artifact names used by
//! the render cache.

use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use puml_config::DiagramFormat;

use crate::consts::{CMAPX_EXTENSION, FILE_PREFIX, MAP_EXTENSION, SOURCE_EXTENSION};

/// Identity of one rendered diagram: the page it appears on and its source.
///
/// Both halves are independent 128-bit MD5 digests in lowercase hex. They are
/// never combined, because `source_hash` alone doubles as the public image-map
/// id of the rendered diagram.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Digest of the page identity.
    pub page_hash: String,
    /// Digest of the diagram source.
    pub source_hash: String,
}

impl CacheKey {
    /// Derive the key for a diagram on a page.
    #[must_use]
    pub fn derive(page: &str, source: &str) -> Self {
        Self {
            page_hash: digest_hex(page),
            source_hash: digest_hex(source),
        }
    }

    /// Shared filename stem of every artifact for this key.
    ///
    /// # Format
    ///
    /// `uml-{page_hash}-{source_hash}`
    #[must_use]
    pub fn file_prefix(&self) -> String {
        format!("{FILE_PREFIX}-{}-{}", self.page_hash, self.source_hash)
    }

    /// Id used for the image map and its `usemap` reference.
    #[must_use]
    pub fn map_id(&self) -> &str {
        &self.source_hash
    }

    /// Paths of all artifacts for this key inside `dir`.
    #[must_use]
    pub fn paths(&self, dir: &Path, format: DiagramFormat) -> ArtifactPaths {
        let prefix = self.file_prefix();
        let sibling = |ext: &str| dir.join(format!("{prefix}.{ext}"));
        ArtifactPaths {
            image: sibling(format.as_str()),
            map: sibling(MAP_EXTENSION),
            cmapx: sibling(CMAPX_EXTENSION),
            source: sibling(SOURCE_EXTENSION),
            prefix,
        }
    }
}

/// Canonical on-disk locations derived from a [`CacheKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Filename stem shared by all siblings.
    pub prefix: String,
    /// Rendered image (`.svg` or `.png`).
    pub image: PathBuf,
    /// Raw map payload (`.map`).
    pub map: PathBuf,
    /// HTML-ready client-side map (`.cmapx`).
    pub cmapx: PathBuf,
    /// Temporary renderer input (`.uml`).
    pub source: PathBuf,
}

/// Lowercase hex MD5 of the UTF-8 bytes of `value`.
pub(crate) fn digest_hex(value: &str) -> String {
    hex::encode(Md5::digest(value.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_derive_is_deterministic() {
        let key1 = CacheKey::derive("Main Page", "Alice -> Bob");
        let key2 = CacheKey::derive("Main Page", "Alice -> Bob");
        let key3 = CacheKey::derive("Main Page", "Bob -> Alice");
        let key4 = CacheKey::derive("Other Page", "Alice -> Bob");

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
        assert_ne!(key1, key4);
        // Same source on another page keeps the same map id
        assert_eq!(key1.map_id(), key4.map_id());
    }

    #[test]
    fn test_empty_inputs_hash_like_any_string() {
        let key = CacheKey::derive("", "");
        assert_eq!(key.page_hash, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(key.source_hash, "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_digest_format() {
        let hash = digest_hex("The quick brown fox jumps over the lazy dog");
        assert_eq!(hash, "9e107d9d372bb6826bd81d3542a419d6");
        assert_eq!(hash.len(), 32);
    }

    #[test]
    fn test_halves_are_hashed_independently() {
        // Moving text between page and source must not produce the same key
        let a = CacheKey::derive("ab", "c");
        let b = CacheKey::derive("a", "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn test_paths() {
        let key = CacheKey::derive("", "");
        let paths = key.paths(Path::new("/cache"), DiagramFormat::Svg);
        let stem = "uml-d41d8cd98f00b204e9800998ecf8427e-d41d8cd98f00b204e9800998ecf8427e";

        assert_eq!(paths.prefix, stem);
        assert_eq!(paths.image, PathBuf::from(format!("/cache/{stem}.svg")));
        assert_eq!(paths.map, PathBuf::from(format!("/cache/{stem}.map")));
        assert_eq!(paths.cmapx, PathBuf::from(format!("/cache/{stem}.cmapx")));
        assert_eq!(paths.source, PathBuf::from(format!("/cache/{stem}.uml")));
    }
}
