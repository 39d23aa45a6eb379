//! Internal constants for diagram rendering.

/// Prefix of every artifact filename in the cache directory.
pub const FILE_PREFIX: &str = "uml";

/// Opening marker PlantUML requires before the diagram body.
pub const START_MARKER: &str = "@startuml";

/// Closing marker PlantUML requires after the diagram body.
pub const END_MARKER: &str = "@enduml";

/// Number of leading SVG bytes inspected for the root element's size.
pub const SVG_HEAD_LEN: u64 = 200;

/// Extension of the raw map payload sidecar.
pub const MAP_EXTENSION: &str = "map";

/// Extension of the HTML-ready client-side map written by local PNG renders.
pub const CMAPX_EXTENSION: &str = "cmapx";

/// Extension of the temporary source file handed to the local renderer.
pub const SOURCE_EXTENSION: &str = "uml";

/// URL segment selecting map output on the PlantUML server.
pub const MAP_SEGMENT: &str = "map";
