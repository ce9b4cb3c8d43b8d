//! Shared plumbing for the RSC asset decoders.
//!
//! Everything in this crate is deliberately boring: an owned decompressed
//! buffer ([`ResourceContainer`]), a bounds-checked little-endian reader over
//! it ([`ReaderContext`]), and the tagged-pointer resolver that every
//! structure reader in the workspace goes through. Reads past the end of the
//! buffer return zero values instead of failing; the input files are
//! community-sourced and routinely imperfect, so the decoders degrade to
//! partial output rather than erroring out mid-structure.

#![warn(missing_docs)]

pub mod container;
pub mod error;
pub mod reader;

pub use container::{
    unpack_container, ResourceContainer, CONTAINER_HEADER_SIZE, RSC7_MAGIC, RSC85_MAGIC,
};
pub use error::{ExtractError, ExtractResult};
pub use reader::{ReaderContext, NULL_OFFSET};
