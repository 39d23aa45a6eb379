//! Cached PlantUML rendering.
//!
//! Turns diagram source embedded in a page into an image file plus the markup
//! that embeds it. Rendered images live in a flat cache directory named after
//! the page and the source, so an unchanged diagram is rendered once.
//!
//! # Architecture
//!
//! The crate is organized into modules:
//! - [`resolver`]: `DiagramCache`, the orchestrator hosts call
//! - [`backend`]: `RenderBackend` with local (jar) and remote (server) implementations
//! - [`encoding`]: the PlantUML server's deflate + 6-bit text encoding
//! - [`postprocess`]: SVG sizing and image-map id rewriting
//! - [`presenter`]: HTML fragments for resolved diagrams
//! - [`clean`]: removal of a page's artifacts
//!
//! # Example
//!
//! ```ignore
//! use puml_config::Config;
//! use puml_diagrams::{DiagramCache, RenderOptions};
//!
//! let config = Config::load(None, None)?;
//! let cache = DiagramCache::from_config(&config)?;
//! let html = cache.render_markup("Alice -> Bob: hi", "Main_Page", &RenderOptions::default());
//! ```

pub mod backend;
pub mod clean;
mod consts;
pub mod encoding;
mod key;
pub mod postprocess;
pub mod presenter;
mod request;
pub mod resolver;
mod source;

pub use backend::{LocalBackend, RemoteBackend, RenderBackend, RenderError};
pub use clean::CleanError;
pub use key::{ArtifactPaths, CacheKey};
pub use puml_config::{BackendKind, DiagramFormat};
pub use request::{DiagramRequest, RenderArtifact, RenderOptions, Resolved};
pub use resolver::DiagramCache;
pub use source::{decode_source, strip_markers, wrap_source};
