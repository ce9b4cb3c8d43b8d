//! Texture dictionary location and pixel decode.
//!
//! A texture dictionary is a named collection of block-compressed (or
//! occasionally uncompressed) bitmap entries inside a resource container.
//! [`dictionary::locate_texture_dictionary`] finds and enumerates the
//! entries; this module turns each entry's compressed bytes into RGBA,
//! one independently-decoded mip level at a time. A truncated mip chain is
//! not an error; only the available levels are kept.

#![warn(missing_docs)]

pub mod block;
pub mod dictionary;

use std::collections::BTreeMap;

use tracing::trace;

pub use dictionary::locate_texture_dictionary;

/// Pixel storage formats this codec understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// BC1: 4x4 blocks, 8 bytes, 1-bit punch-through alpha.
    Dxt1,
    /// BC2: 4x4 blocks, 16 bytes, explicit 4-bit alpha.
    Dxt3,
    /// BC3: 4x4 blocks, 16 bytes, interpolated alpha.
    Dxt5,
    /// Single-channel BC4, replicated to RGB as luminance.
    Bc4,
    /// Two-channel BC5, Z reconstructed for normal maps.
    Bc5,
    /// BC7: 4x4 blocks, 16 bytes, 8 mode-dependent layouts.
    Bc7,
    /// Uncompressed 32-bit BGRA.
    Argb8888,
    /// Uncompressed 8-bit luminance.
    L8,
}

impl TextureFormat {
    /// Parses a 4-byte format tag (ASCII FourCC or a known numeric code).
    pub fn from_tag(tag: u32) -> Option<Self> {
        match &tag.to_le_bytes() {
            b"DXT1" => Some(Self::Dxt1),
            b"DXT3" => Some(Self::Dxt3),
            b"DXT5" => Some(Self::Dxt5),
            b"ATI1" | b"BC4U" => Some(Self::Bc4),
            b"ATI2" | b"BC5U" => Some(Self::Bc5),
            b"BC7 " | b"BC7\0" => Some(Self::Bc7),
            _ => match tag {
                21 => Some(Self::Argb8888), // D3DFMT_A8R8G8B8
                50 => Some(Self::L8),       // D3DFMT_L8
                98 => Some(Self::Bc7),      // DXGI_FORMAT_BC7_UNORM
                _ => None,
            },
        }
    }

    /// Compressed byte size of one mip level at the given dimensions.
    pub fn level_size(self, width: usize, height: usize) -> usize {
        match self {
            Self::Dxt1 | Self::Bc4 => width.div_ceil(4) * height.div_ceil(4) * 8,
            Self::Dxt3 | Self::Dxt5 | Self::Bc5 | Self::Bc7 => {
                width.div_ceil(4) * height.div_ceil(4) * 16
            }
            Self::Argb8888 => width * height * 4,
            Self::L8 => width * height,
        }
    }
}

/// One decoded mip level.
#[derive(Debug, Clone)]
pub struct MipLevel {
    /// RGBA pixels, `width * height * 4` bytes.
    pub data: Vec<u8>,
    /// Level width in pixels.
    pub width: usize,
    /// Level height in pixels.
    pub height: usize,
}

/// A fully decoded texture entry.
#[derive(Debug, Clone)]
pub struct Texture {
    /// Entry name from the dictionary.
    pub name: String,
    /// Base level width; always a power of two in `[1, 8192]`.
    pub width: usize,
    /// Base level height; always a power of two in `[1, 8192]`.
    pub height: usize,
    /// Source pixel format.
    pub format: TextureFormat,
    /// Number of decoded mip levels, including the base.
    pub mip_count: usize,
    /// Base level RGBA, `width * height * 4` bytes.
    pub rgba: Vec<u8>,
    /// Decoded levels below the base, largest first.
    pub mipmaps: Vec<MipLevel>,
    /// Whether the consumer should synthesize missing levels. Always left
    /// false; a truncated chain keeps only what decoded.
    pub generate_mipmaps: bool,
}

/// Name-keyed decoded texture collection.
pub type TextureDictionary = BTreeMap<String, Texture>;

/// Decodes a texture's mip chain from its compressed bytes.
///
/// The base level must decode or the texture is rejected. Each further
/// claimed level is decoded independently at halved dimensions (minimum
/// 1x1) until the remaining bytes cannot supply the next level's expected
/// size.
pub fn decode_texture(
    name: &str,
    width: usize,
    height: usize,
    format: TextureFormat,
    claimed_mips: usize,
    data: &[u8],
) -> Option<Texture> {
    let base_size = format.level_size(width, height);
    if data.len() < base_size {
        return None;
    }
    let rgba = decode_surface(format, &data[..base_size], width, height)?;

    let mut mipmaps = Vec::new();
    let mut offset = base_size;
    let mut mip_width = width;
    let mut mip_height = height;
    for _ in 1..claimed_mips.max(1) {
        mip_width = (mip_width / 2).max(1);
        mip_height = (mip_height / 2).max(1);
        let size = format.level_size(mip_width, mip_height);
        if offset + size > data.len() {
            trace!(name, offset, size, "mip chain truncated");
            break;
        }
        match decode_surface(format, &data[offset..offset + size], mip_width, mip_height) {
            Some(level) => mipmaps.push(MipLevel {
                data: level,
                width: mip_width,
                height: mip_height,
            }),
            None => break,
        }
        offset += size;
    }

    Some(Texture {
        name: name.to_string(),
        width,
        height,
        format,
        mip_count: 1 + mipmaps.len(),
        rgba,
        mipmaps,
        generate_mipmaps: false,
    })
}

/// Decodes one complete surface to RGBA.
///
/// Returns `None` when `data` is shorter than the level requires.
pub fn decode_surface(
    format: TextureFormat,
    data: &[u8],
    width: usize,
    height: usize,
) -> Option<Vec<u8>> {
    if width == 0 || height == 0 || data.len() < format.level_size(width, height) {
        return None;
    }
    let out = match format {
        TextureFormat::Argb8888 => {
            let mut out = Vec::with_capacity(width * height * 4);
            for px in data[..width * height * 4].chunks_exact(4) {
                // stored BGRA
                out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
            }
            out
        }
        TextureFormat::L8 => {
            let mut out = Vec::with_capacity(width * height * 4);
            for &l in &data[..width * height] {
                out.extend_from_slice(&[l, l, l, 255]);
            }
            out
        }
        _ => block::decode_blocks(format, data, width, height),
    };
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dxt1_red_block() -> [u8; 8] {
        // color0 = 0xF800 (red), color1 = 0x001F (blue), all indices 0
        [0x00, 0xF8, 0x1F, 0x00, 0, 0, 0, 0]
    }

    #[test]
    fn texture_shape_invariant_holds() {
        let data: Vec<u8> = dxt1_red_block()
            .iter()
            .copied()
            .cycle()
            .take(4 * 8) // 8x8 => 4 blocks
            .collect();
        let tex = decode_texture("t", 8, 8, TextureFormat::Dxt1, 1, &data).unwrap();
        assert_eq!(tex.rgba.len(), 8 * 8 * 4);
        assert_eq!(tex.mip_count, 1);
    }

    #[test]
    fn truncated_mip_chain_keeps_available_levels() {
        // 8x8 DXT1 claims 4 mips; supply base (32 bytes) + 4x4 (8 bytes)
        // only. Levels 2x2 and 1x1 are missing.
        let mut data: Vec<u8> = Vec::new();
        for _ in 0..5 {
            data.extend_from_slice(&dxt1_red_block());
        }
        let tex = decode_texture("t", 8, 8, TextureFormat::Dxt1, 4, &data).unwrap();
        assert_eq!(tex.mip_count, 2);
        assert_eq!(tex.mipmaps.len(), 1);
        assert_eq!(tex.mipmaps[0].width, 4);
        assert_eq!(tex.mipmaps[0].data.len(), 4 * 4 * 4);
        assert!(!tex.generate_mipmaps);
    }

    #[test]
    fn base_level_shortfall_rejects_the_texture() {
        let data = [0u8; 8]; // one block, but 8x8 needs four
        assert!(decode_texture("t", 8, 8, TextureFormat::Dxt1, 1, &data).is_none());
    }

    #[test]
    fn surface_decode_is_deterministic() {
        let mut data = Vec::new();
        for i in 0..64u8 {
            data.push(i.wrapping_mul(37));
        }
        for format in [
            TextureFormat::Dxt1,
            TextureFormat::Dxt3,
            TextureFormat::Dxt5,
            TextureFormat::Bc4,
            TextureFormat::Bc5,
            TextureFormat::Bc7,
        ] {
            let a = decode_surface(format, &data, 4, 4).unwrap();
            let b = decode_surface(format, &data, 4, 4).unwrap();
            assert_eq!(a, b, "{format:?} decode must be deterministic");
        }
    }

    #[test]
    fn uncompressed_bgra_swizzles_to_rgba() {
        let data = [10u8, 20, 30, 40];
        let rgba = decode_surface(TextureFormat::Argb8888, &data, 1, 1).unwrap();
        assert_eq!(rgba, vec![30, 20, 10, 40]);
    }

    #[test]
    fn format_tags_parse() {
        assert_eq!(
            TextureFormat::from_tag(u32::from_le_bytes(*b"DXT1")),
            Some(TextureFormat::Dxt1)
        );
        assert_eq!(
            TextureFormat::from_tag(u32::from_le_bytes(*b"ATI2")),
            Some(TextureFormat::Bc5)
        );
        assert_eq!(TextureFormat::from_tag(98), Some(TextureFormat::Bc7));
        assert_eq!(TextureFormat::from_tag(0xFFFF_FFFF), None);
    }
}
