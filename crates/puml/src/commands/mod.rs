//! CLI command implementations.

pub(crate) mod clean;
pub(crate) mod encode;
pub(crate) mod render;

pub(crate) use clean::CleanArgs;
pub(crate) use encode::EncodeArgs;
pub(crate) use render::RenderArgs;
