//! Post-processing of renderer output for embedding in HTML.
//!
//! - SVG sizing: the `<object>` embedding clips unless it carries the
//!   diagram's intrinsic size, which PlantUML writes as an inline style on the
//!   root element.
//! - Map id rewrite: PlantUML names every image map the same way, so the map
//!   and its first area get a per-diagram id to keep several diagrams on one
//!   page apart.
//!
//! Both transforms are textual; neither parses the markup.

use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use regex::{NoExpand, Regex};

use crate::consts::SVG_HEAD_LEN;

/// Inline size style of the SVG root, e.g. `style="width:120px;height:80px;"`.
static SVG_SIZE_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#".*style="width:(\d+)(?:px)?;height:(\d+)(?:px)?;[^"]*".*"#).unwrap()
});

/// Any double-quoted literal.
static QUOTED_LITERAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""[^"]*""#).unwrap());

/// Substitute an inline size style into `width=N height=N` attribute text.
///
/// The whole line holding the style is replaced. Without a size style the
/// fragment is returned unchanged.
#[must_use]
pub fn rewrite_dimensions(fragment: &str) -> Cow<'_, str> {
    SVG_SIZE_STYLE.replace(fragment, "width=${1} height=${2}")
}

/// Extract `width=N height=N` from the head of an SVG document.
///
/// The head is split at the first `><` and only the second tag is examined.
/// Returns `None` when that tag has no size style.
#[must_use]
pub fn svg_dimensions(head: &str) -> Option<String> {
    let fragment = head.split("><").nth(1)?;
    match rewrite_dimensions(fragment) {
        Cow::Owned(dimensions) => Some(dimensions),
        Cow::Borrowed(_) => None,
    }
}

/// Read the first bytes of an SVG file and extract its dimensions.
///
/// I/O errors degrade to `None`, which embeds the image without sizing.
#[must_use]
pub fn read_svg_dimensions(path: &Path) -> Option<String> {
    let mut head = Vec::new();
    let file = File::open(path).ok()?;
    file.take(SVG_HEAD_LEN).read_to_end(&mut head).ok()?;
    svg_dimensions(&String::from_utf8_lossy(&head))
}

/// Replace the first two double-quoted literals in `map` with `"{id}"`.
///
/// Later literals are left untouched.
#[must_use]
pub fn rewrite_map_ids(map: &str, id: &str) -> String {
    let replacement = format!("\"{id}\"");
    QUOTED_LITERAL
        .replacen(map, 2, NoExpand(&replacement))
        .into_owned()
}

/// Read a map file.
///
/// Missing, unreadable, non-UTF-8 and empty files all yield `None`.
#[must_use]
pub fn read_map(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) if content.trim().is_empty() => {
            tracing::debug!(path = %path.display(), "map file is empty");
            None
        }
        Ok(content) => Some(content),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "map file unreadable");
            None
        }
    }
}
