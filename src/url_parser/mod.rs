//! URL shaping helpers used before a target is probed
//!
//! Targets are normalized to carry a trailing slash, then split into an
//! origin and a path so probe markers can be appended straight after the
//! path.

pub mod decompose;
pub mod normalize;

#[cfg(test)]
mod tests;

pub use decompose::{origin_of, split_origin_and_path};
pub use normalize::{ensure_trailing_slash, PATH_SEPARATOR};
