//! High-level decode entry points for segmented resource containers.
//!
//! This crate ties the low-level pieces together: container decompression,
//! tagged-pointer resolution, drawable location and texture dictionary
//! decode. Both entry points are deterministic pure functions of their
//! input bytes and are safe to call concurrently from any number of worker
//! threads.
//!
//! # Example
//!
//! ```
//! use rage_extract::{decode_drawable, ExtractError, ScanSettings};
//!
//! // A buffer below the minimum header size is a typed failure, never a
//! // bounds panic.
//! let err = decode_drawable(&[0u8; 4], &ScanSettings::default()).unwrap_err();
//! assert!(matches!(err, ExtractError::InputTooShort { .. }));
//! ```

#![warn(missing_docs)]

pub mod cache;

use rage_extract_common::{unpack_container, ReaderContext, CONTAINER_HEADER_SIZE};
use tracing::debug;

pub use cache::PinnedCache;
pub use rage_extract_common::{ExtractError, ExtractResult, ResourceContainer};
pub use rage_extract_drawable::{
    Drawable, DrawableModel, Mesh, ScanSettings, Shader, TextureRefs, TextureRole,
};
pub use rage_extract_textures::{MipLevel, Texture, TextureDictionary, TextureFormat};

/// Decodes a drawable (geometry + shader bindings) from raw file bytes.
///
/// The input may be a compressed RSC container or an already-decompressed
/// buffer; non-container input is used as-is. Location runs the strategy
/// chain configured by `settings`.
pub fn decode_drawable(bytes: &[u8], settings: &ScanSettings) -> ExtractResult<Drawable> {
    if bytes.len() < CONTAINER_HEADER_SIZE {
        return Err(ExtractError::InputTooShort {
            required: CONTAINER_HEADER_SIZE,
            actual: bytes.len(),
        });
    }
    let container = unpack_container(bytes);
    let reader = ReaderContext::of(&container);
    let drawable =
        rage_extract_drawable::locate_drawable(&reader, settings).ok_or(ExtractError::NoGeometryFound)?;
    debug!(
        models = drawable.models.len(),
        vertices = drawable.total_vertices(),
        "drawable decoded"
    );
    Ok(drawable)
}

/// Decodes a texture dictionary from raw file bytes.
///
/// Undecodable entries are skipped; the call fails only when no entry at
/// all could be decoded.
pub fn decode_texture_dictionary(bytes: &[u8]) -> ExtractResult<TextureDictionary> {
    if bytes.len() < CONTAINER_HEADER_SIZE {
        return Err(ExtractError::InputTooShort {
            required: CONTAINER_HEADER_SIZE,
            actual: bytes.len(),
        });
    }
    let container = unpack_container(bytes);
    let reader = ReaderContext::of(&container);
    let dictionary = rage_extract_textures::locate_texture_dictionary(&reader);
    if dictionary.is_empty() {
        return Err(ExtractError::NoTexturesFound);
    }
    debug!(textures = dictionary.len(), "texture dictionary decoded");
    Ok(dictionary)
}
