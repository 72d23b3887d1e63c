//! Buildpack dependency manifest.
//!
//! The manifest lists every dependency the buildpack can install along with its
//! default version patterns.

mod types;

pub use types::*;
