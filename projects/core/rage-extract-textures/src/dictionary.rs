//! Texture dictionary location and entry enumeration.
//!
//! Dictionary headers moved between game generations, so the entry array is
//! found by probing a fixed list of candidate base offsets. A candidate is
//! only believed once it yields at least one entry whose dimensions are
//! powers of two in range; that check is the real validity signal, since a
//! wrong base reads garbage counts that rarely survive it.

use rage_extract_common::ReaderContext;
use tracing::{debug, trace};

use crate::{decode_texture, TextureDictionary, TextureFormat};

/// Candidate offsets of the entry array header, probed in order.
const DICTIONARY_BASE_OFFSETS: &[usize] = &[0x20, 0x30, 0x40, 0x50];

/// Header candidate: entry pointer-array field.
const DICT_ENTRIES: usize = 0x00;
/// Header candidate: u16 entry count field.
const DICT_COUNT: usize = 0x08;
/// Upper bound on a believable entry count.
const MAX_TEXTURES: usize = 512;

/// Texture record: name pointer.
const TEXTURE_NAME: usize = 0x28;
/// Texture record: u16 base width.
const TEXTURE_WIDTH: usize = 0x50;
/// Texture record: u16 base height.
const TEXTURE_HEIGHT: usize = 0x52;
/// Texture record: 4-byte format tag.
const TEXTURE_FORMAT: usize = 0x58;
/// Texture record: u8 claimed mip count.
const TEXTURE_MIPS: usize = 0x5E;

/// Candidate offsets of the pixel-data pointer within a texture record.
const PIXEL_PTR_OFFSETS: &[usize] = &[0x70, 0x38, 0x30, 0x60];
/// Where the forward scan for pixel data starts, relative to the record.
const PIXEL_SCAN_START: usize = 0x90;
/// Forward-scan step and window bound.
const PIXEL_SCAN_STRIDE: usize = 16;
const PIXEL_SCAN_LIMIT: usize = 0x1000;
/// A 64-byte window with at least this many non-zero bytes is taken as the
/// start of real compressed data (padding is zero-filled).
const PIXEL_SCAN_MIN_NONZERO: usize = 16;

/// Largest mip chain worth walking (8192 down to 1).
const MAX_MIPS: usize = 14;

/// Finds the texture entry array and decodes every entry it can.
///
/// Returns an empty map when no candidate base yields a believable entry
/// array; individual undecodable entries are skipped, not fatal.
pub fn locate_texture_dictionary(reader: &ReaderContext) -> TextureDictionary {
    for &base in DICTIONARY_BASE_OFFSETS {
        let entries = reader.deref(base + DICT_ENTRIES);
        let count = reader.u16(base + DICT_COUNT) as usize;
        if entries == 0 || count == 0 || count > MAX_TEXTURES {
            continue;
        }
        let dictionary = decode_entries(reader, entries, count);
        if !dictionary.is_empty() {
            debug!(base, count, decoded = dictionary.len(), "texture dictionary located");
            return dictionary;
        }
    }
    TextureDictionary::new()
}

fn decode_entries(reader: &ReaderContext, entries: usize, count: usize) -> TextureDictionary {
    let mut dictionary = TextureDictionary::new();
    for i in 0..count {
        let record = reader.deref(entries + i * 8);
        if record == 0 {
            continue;
        }
        if let Some(texture) = decode_entry(reader, record, i) {
            dictionary.entry(texture.name.clone()).or_insert(texture);
        }
    }
    dictionary
}

fn decode_entry(reader: &ReaderContext, record: usize, index: usize) -> Option<crate::Texture> {
    let width = reader.u16(record + TEXTURE_WIDTH) as usize;
    let height = reader.u16(record + TEXTURE_HEIGHT) as usize;
    if !plausible_dimension(width) || !plausible_dimension(height) {
        return None;
    }
    let format = match TextureFormat::from_tag(reader.u32(record + TEXTURE_FORMAT)) {
        Some(format) => format,
        None => {
            trace!(record, "unsupported texture format tag");
            return None;
        }
    };
    let mips = (reader.u8(record + TEXTURE_MIPS) as usize).clamp(1, MAX_MIPS);

    let mut name = reader.cstr(reader.deref(record + TEXTURE_NAME), 128);
    if name.is_empty() {
        name = format!("texture_{index}");
    }

    let data_offset = locate_pixel_data(reader, record)?;
    decode_texture(&name, width, height, format, mips, &reader.data()[data_offset..])
}

/// True for a power of two in `[1, 8192]`.
fn plausible_dimension(dim: usize) -> bool {
    (1..=8192).contains(&dim) && dim.is_power_of_two()
}

/// Finds where an entry's compressed pixel bytes begin.
///
/// Candidate fields are tried first as 64-bit tagged pointers, then as raw
/// 32-bit offsets; when neither resolves, scan forward from the record for
/// the first window that looks like data rather than padding.
fn locate_pixel_data(reader: &ReaderContext, record: usize) -> Option<usize> {
    for &field in PIXEL_PTR_OFFSETS {
        let tagged = reader.u64(record + field);
        let offset = reader.resolve(tagged);
        if offset > record && offset < reader.len() {
            return Some(offset);
        }
        let raw = reader.u32(record + field) as usize;
        if raw > record && raw < reader.len() {
            return Some(raw);
        }
    }

    let mut at = record + PIXEL_SCAN_START;
    let stop = (record + PIXEL_SCAN_START + PIXEL_SCAN_LIMIT).min(reader.len());
    while at + 64 <= stop {
        let window = reader.bytes(at, 64);
        if window.iter().filter(|&&b| b != 0).count() >= PIXEL_SCAN_MIN_NONZERO {
            trace!(record, at, "pixel data found by scan");
            return Some(at);
        }
        at += PIXEL_SCAN_STRIDE;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEM_TAG: u64 = 0x5000_0000;

    /// Grow-on-write buffer for assembling synthetic dictionaries at the
    /// same offsets the locator reads.
    struct Builder {
        buf: Vec<u8>,
    }

    impl Builder {
        fn new() -> Self {
            Self { buf: Vec::new() }
        }

        fn ensure(&mut self, len: usize) {
            if self.buf.len() < len {
                self.buf.resize(len, 0);
            }
        }

        fn u16(&mut self, at: usize, value: u16) {
            self.ensure(at + 2);
            self.buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
        }

        fn u32(&mut self, at: usize, value: u32) {
            self.ensure(at + 4);
            self.buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
        }

        fn u64(&mut self, at: usize, value: u64) {
            self.ensure(at + 8);
            self.buf[at..at + 8].copy_from_slice(&value.to_le_bytes());
        }

        fn ptr(&mut self, at: usize, target: usize) {
            self.u64(at, SYSTEM_TAG | target as u64);
        }

        fn bytes(&mut self, at: usize, data: &[u8]) {
            self.ensure(at + data.len());
            self.buf[at..at + data.len()].copy_from_slice(data);
        }

        fn cstr(&mut self, at: usize, text: &str) {
            self.bytes(at, text.as_bytes());
            self.ensure(at + text.len() + 1);
        }
    }

    const DXT1_RED: [u8; 8] = [0x00, 0xF8, 0x1F, 0x00, 0, 0, 0, 0];

    /// Lays out one 4x4 DXT1 entry; returns the finished buffer.
    fn one_entry_dictionary(pixel_field: Option<usize>, raw_offset: bool) -> Vec<u8> {
        let base = 0x20;
        let entries = 0x100;
        let record = 0x140;
        let name = 0x240;
        let pixels = 0x280;

        let mut b = Builder::new();
        b.ptr(base + DICT_ENTRIES, entries);
        b.u16(base + DICT_COUNT, 1);
        b.ptr(entries, record);
        b.ptr(record + TEXTURE_NAME, name);
        b.u16(record + TEXTURE_WIDTH, 4);
        b.u16(record + TEXTURE_HEIGHT, 4);
        b.u32(record + TEXTURE_FORMAT, u32::from_le_bytes(*b"DXT1"));
        b.ensure(record + TEXTURE_MIPS + 1);
        b.buf[record + TEXTURE_MIPS] = 1;
        b.cstr(name, "plaster_diff");
        match pixel_field {
            Some(field) if raw_offset => b.u32(record + field, pixels as u32),
            Some(field) => b.ptr(record + field, pixels),
            None => {}
        }
        b.bytes(pixels, &DXT1_RED);
        // pad so the scan window past the record is inside the buffer
        b.ensure(pixels + 64);
        b.buf
    }

    fn reader(buf: &[u8]) -> ReaderContext {
        ReaderContext::new(buf, buf.len(), 0)
    }

    #[test]
    fn tagged_pixel_pointer_entry_decodes() {
        let buf = one_entry_dictionary(Some(0x70), false);
        let dict = locate_texture_dictionary(&reader(&buf));
        let tex = dict.get("plaster_diff").unwrap();
        assert_eq!((tex.width, tex.height), (4, 4));
        assert_eq!(tex.format, TextureFormat::Dxt1);
        assert_eq!(&tex.rgba[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn raw_u32_pixel_offset_is_accepted() {
        let buf = one_entry_dictionary(Some(0x38), true);
        let dict = locate_texture_dictionary(&reader(&buf));
        assert!(dict.contains_key("plaster_diff"));
    }

    #[test]
    fn pixel_data_is_found_by_forward_scan() {
        // No pixel pointer anywhere; the data sits past the record and is
        // dense enough to clear the non-zero threshold.
        let mut buf = one_entry_dictionary(None, false);
        let record = 0x140;
        let scan_target = record + PIXEL_SCAN_START + 2 * PIXEL_SCAN_STRIDE;
        buf.resize(scan_target + 64, 0);
        for (i, slot) in buf[scan_target..scan_target + 64].iter_mut().enumerate() {
            *slot = DXT1_RED[i % 8].max(1);
        }
        let dict = locate_texture_dictionary(&reader(&buf));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn non_power_of_two_dimensions_reject_the_entry() {
        let mut buf = one_entry_dictionary(Some(0x70), false);
        let record = 0x140;
        buf[record + TEXTURE_WIDTH..record + TEXTURE_WIDTH + 2]
            .copy_from_slice(&48u16.to_le_bytes());
        let dict = locate_texture_dictionary(&reader(&buf));
        assert!(dict.is_empty());
    }

    #[test]
    fn unsupported_format_tag_skips_the_entry() {
        let mut buf = one_entry_dictionary(Some(0x70), false);
        let record = 0x140;
        buf[record + TEXTURE_FORMAT..record + TEXTURE_FORMAT + 4]
            .copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        let dict = locate_texture_dictionary(&reader(&buf));
        assert!(dict.is_empty());
    }

    #[test]
    fn implausible_counts_fall_through_all_candidates() {
        let mut b = Builder::new();
        b.ptr(0x20 + DICT_ENTRIES, 0x100);
        b.u16(0x20 + DICT_COUNT, 5000); // over the cap
        b.ensure(0x400);
        let dict = locate_texture_dictionary(&reader(&b.buf));
        assert!(dict.is_empty());
    }

    #[test]
    fn nameless_entry_gets_a_positional_name() {
        let mut buf = one_entry_dictionary(Some(0x70), false);
        let record = 0x140;
        buf[record + TEXTURE_NAME..record + TEXTURE_NAME + 8].fill(0);
        let dict = locate_texture_dictionary(&reader(&buf));
        assert!(dict.contains_key("texture_0"));
    }

    #[test]
    fn random_bytes_terminate_without_panicking() {
        let mut state = 0x2545_F491_4F6C_DD1Du64;
        let mut buf = vec![0u8; 0x800];
        for b in buf.iter_mut() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            *b = state as u8;
        }
        let _ = locate_texture_dictionary(&reader(&buf));
        let _ = locate_texture_dictionary(&reader(&[]));
        let _ = locate_texture_dictionary(&reader(&buf[..7]));
    }
}
