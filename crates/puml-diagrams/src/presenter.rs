//! HTML fragments for resolved diagrams.

use puml_config::DiagramFormat;

use crate::request::Resolved;

/// Text shown by viewers that cannot embed SVG.
const SVG_FALLBACK: &str = "Your browser has no SVG support. Use a browser with SVG support to view this diagram.";

/// Turn a resolved diagram into markup for the host document.
///
/// - failure: a red inline error message
/// - SVG: `<object>` sized with the extracted dimensions
/// - PNG: `<img>` followed by its image map when there is one
#[must_use]
pub fn present(resolved: &Resolved) -> String {
    let artifact = &resolved.artifact;
    let Some(src) = artifact.source_url.as_deref() else {
        let message = resolved
            .failure
            .as_deref()
            .unwrap_or("no image was produced");
        return error_markup(message);
    };
    let src = escape_html(src);

    match resolved.format {
        DiagramFormat::Svg => {
            let dimensions = artifact
                .dimensions
                .as_deref()
                .map(|d| format!(" {d}"))
                .unwrap_or_default();
            format!(
                r#"<object class="plantuml" type="image/svg+xml" data="{src}"{dimensions}>{SVG_FALLBACK}</object>"#
            )
        }
        DiagramFormat::Png => {
            if artifact.map_fragment.is_empty() {
                format!(r#"<img class="plantuml" src="{src}">"#)
            } else {
                format!(
                    r##"<img class="plantuml" src="{src}" usemap="#{}">{}"##,
                    artifact.map_id, artifact.map_fragment
                )
            }
        }
    }
}

/// Visible inline error for the host document.
#[must_use]
pub fn error_markup(message: &str) -> String {
    format!(
        r#"<span class="plantuml-error" style="color:red">[PlantUML error: {}]</span>"#,
        escape_html(message)
    )
}

fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
