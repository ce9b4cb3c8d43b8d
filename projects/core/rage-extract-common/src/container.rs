//! RSC7/RSC85 resource container unpacking.
//!
//! A container is a 16-byte header followed by a deflate-compressed payload.
//! The header carries two bit-packed flag words describing the sizes of the
//! "system" and "graphics" segments of the decompressed image. Nothing past
//! the magic is trusted: a payload that fails both raw and zlib inflation is
//! kept as-is, and a buffer without a recognized magic is passed through
//! unchanged so already-decompressed legacy files still load.

use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};
use tracing::debug;

/// `RSC7` magic, little endian.
pub const RSC7_MAGIC: u32 = 0x3743_5352;
/// `RSC\x85` magic used by the older container generation.
pub const RSC85_MAGIC: u32 = 0x8543_5352;

/// Size of the container header preceding the compressed payload.
pub const CONTAINER_HEADER_SIZE: usize = 16;

/// A decompressed resource container.
///
/// Created once per input file and discarded after the drawable or texture
/// dictionary has been produced from it.
#[derive(Debug, Clone)]
pub struct ResourceContainer {
    /// The decompressed image both segments live in.
    pub data: Vec<u8>,
    /// Byte size of the system segment, clamped to the decompressed length.
    pub system_size: usize,
    /// Byte size of the graphics segment.
    pub graphics_size: usize,
    /// Container version word, 0 for pass-through inputs.
    pub version: u32,
}

/// Derives a segment byte size from a bit-packed flag word.
///
/// Low 4 bits are the base shift, bits 8-15 the page count; the size is
/// `page_count << (base_shift + 12)`. A zero page count or an oversized
/// shift yields 0.
#[inline]
pub fn segment_size(flags: u32) -> usize {
    let base_shift = flags & 0xF;
    let page_count = (flags >> 8) & 0xFF;
    if page_count == 0 || base_shift > 30 {
        return 0;
    }
    (page_count as usize) << (base_shift + 12)
}

/// Unpacks a resource container from raw file bytes.
///
/// Inputs without a recognized magic (including inputs shorter than the
/// header) are passed through unchanged with the whole buffer treated as the
/// system segment. This function never fails; a malformed payload degrades
/// to whatever bytes are available.
pub fn unpack_container(bytes: &[u8]) -> ResourceContainer {
    if bytes.len() < CONTAINER_HEADER_SIZE || !is_rsc_magic(read_u32(bytes, 0)) {
        return ResourceContainer {
            system_size: bytes.len(),
            graphics_size: 0,
            version: 0,
            data: bytes.to_vec(),
        };
    }

    let version = read_u32(bytes, 4);
    let system_flags = read_u32(bytes, 8);
    let graphics_flags = read_u32(bytes, 12);
    let payload = &bytes[CONTAINER_HEADER_SIZE..];

    let data = inflate_payload(payload);
    let system_size = segment_size(system_flags).min(data.len());
    let graphics_size = segment_size(graphics_flags);
    debug!(
        version,
        system_size,
        graphics_size,
        decompressed = data.len(),
        "unpacked resource container"
    );

    ResourceContainer {
        data,
        system_size,
        graphics_size,
        version,
    }
}

/// True when `magic` is one of the two accepted container magics.
#[inline]
pub fn is_rsc_magic(magic: u32) -> bool {
    magic == RSC7_MAGIC || magic == RSC85_MAGIC
}

/// Raw inflate, then zlib-wrapped inflate, then the payload verbatim.
fn inflate_payload(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    if DeflateDecoder::new(payload).read_to_end(&mut out).is_ok() && !out.is_empty() {
        return out;
    }

    out.clear();
    if ZlibDecoder::new(payload).read_to_end(&mut out).is_ok() && !out.is_empty() {
        return out;
    }

    debug!(len = payload.len(), "payload not deflate compressed, keeping raw bytes");
    payload.to_vec()
}

#[inline]
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    match bytes.get(at..at + 4) {
        Some(b) => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        None => 0,
    }
}
