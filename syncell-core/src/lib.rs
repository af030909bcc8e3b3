//! Shared types and errors used across the syncell workspace.
//!
//! This crate has no knowledge of backends, codecs, or the wrapper graph —
//! it exists so those crates (and the top-level `syncell` facade) can agree
//! on `Error`, `Value`, and `Version` without a dependency cycle.

pub mod error;
pub mod value;
pub mod version;

pub use error::{Error, Result};
pub use value::Value;
pub use version::Version;
