//! Full BC7 block decode.
//!
//! BC7 packs one of eight mode-dependent layouts into each 16-byte block:
//! up to three endpoint subsets chosen by a partition table, per-endpoint
//! or per-subset precision bits, channel rotation and a secondary index
//! stream for the single-subset alpha modes. All eight modes are decoded
//! here; a block with no mode bit in its low byte is undecodable and fills
//! its region with the sentinel color.

use super::{BlockPixels, SENTINEL_PIXEL};

/// Static description of one BC7 mode's field widths.
struct Mode {
    subsets: usize,
    partition_bits: u32,
    rotation_bits: u32,
    selection_bits: u32,
    color_bits: u32,
    alpha_bits: u32,
    endpoint_pbits: bool,
    shared_pbits: bool,
    index_bits: u32,
    index_bits2: u32,
}

const MODES: [Mode; 8] = [
    // mode 0: 3 subsets, RGB 4.4.4 + per-endpoint p-bit, 3-bit indices
    Mode { subsets: 3, partition_bits: 4, rotation_bits: 0, selection_bits: 0, color_bits: 4, alpha_bits: 0, endpoint_pbits: true, shared_pbits: false, index_bits: 3, index_bits2: 0 },
    // mode 1: 2 subsets, RGB 6.6.6 + shared p-bit, 3-bit indices
    Mode { subsets: 2, partition_bits: 6, rotation_bits: 0, selection_bits: 0, color_bits: 6, alpha_bits: 0, endpoint_pbits: false, shared_pbits: true, index_bits: 3, index_bits2: 0 },
    // mode 2: 3 subsets, RGB 5.5.5, 2-bit indices
    Mode { subsets: 3, partition_bits: 6, rotation_bits: 0, selection_bits: 0, color_bits: 5, alpha_bits: 0, endpoint_pbits: false, shared_pbits: false, index_bits: 2, index_bits2: 0 },
    // mode 3: 2 subsets, RGB 7.7.7 + per-endpoint p-bit, 2-bit indices
    Mode { subsets: 2, partition_bits: 6, rotation_bits: 0, selection_bits: 0, color_bits: 7, alpha_bits: 0, endpoint_pbits: true, shared_pbits: false, index_bits: 2, index_bits2: 0 },
    // mode 4: 1 subset, rotation + index swap, RGB 5 / A 6, 2+3-bit indices
    Mode { subsets: 1, partition_bits: 0, rotation_bits: 2, selection_bits: 1, color_bits: 5, alpha_bits: 6, endpoint_pbits: false, shared_pbits: false, index_bits: 2, index_bits2: 3 },
    // mode 5: 1 subset, rotation, RGB 7 / A 8, separate 2-bit index streams
    Mode { subsets: 1, partition_bits: 0, rotation_bits: 2, selection_bits: 0, color_bits: 7, alpha_bits: 8, endpoint_pbits: false, shared_pbits: false, index_bits: 2, index_bits2: 2 },
    // mode 6: 1 subset, RGBA 7.7.7.7 + per-endpoint p-bit, 4-bit indices
    Mode { subsets: 1, partition_bits: 0, rotation_bits: 0, selection_bits: 0, color_bits: 7, alpha_bits: 7, endpoint_pbits: true, shared_pbits: false, index_bits: 4, index_bits2: 0 },
    // mode 7: 2 subsets, RGBA 5.5.5.5 + per-endpoint p-bit, 2-bit indices
    Mode { subsets: 2, partition_bits: 6, rotation_bits: 0, selection_bits: 0, color_bits: 5, alpha_bits: 5, endpoint_pbits: true, shared_pbits: false, index_bits: 2, index_bits2: 0 },
];

const WEIGHTS_2: [u32; 4] = [0, 21, 43, 64];
const WEIGHTS_3: [u32; 8] = [0, 9, 18, 27, 37, 46, 55, 64];
const WEIGHTS_4: [u32; 16] = [0, 4, 9, 13, 17, 21, 26, 30, 34, 38, 43, 47, 51, 55, 60, 64];

#[inline]
fn weights(index_bits: u32) -> &'static [u32] {
    match index_bits {
        2 => &WEIGHTS_2,
        3 => &WEIGHTS_3,
        _ => &WEIGHTS_4,
    }
}

/// Pixel-to-subset assignment for the 64 two-subset partition patterns.
#[rustfmt::skip]
const PARTITION_2: [[u8; 16]; 64] = [
    [0,0,1,1, 0,0,1,1, 0,0,1,1, 0,0,1,1], [0,0,0,1, 0,0,0,1, 0,0,0,1, 0,0,0,1],
    [0,1,1,1, 0,1,1,1, 0,1,1,1, 0,1,1,1], [0,0,0,1, 0,0,1,1, 0,0,1,1, 0,1,1,1],
    [0,0,0,0, 0,0,0,1, 0,0,0,1, 0,0,1,1], [0,0,1,1, 0,1,1,1, 0,1,1,1, 1,1,1,1],
    [0,0,0,1, 0,0,1,1, 0,1,1,1, 1,1,1,1], [0,0,0,0, 0,0,0,1, 0,0,1,1, 0,1,1,1],
    [0,0,0,0, 0,0,0,0, 0,0,0,1, 0,0,1,1], [0,0,1,1, 0,1,1,1, 1,1,1,1, 1,1,1,1],
    [0,0,0,0, 0,0,0,1, 0,1,1,1, 1,1,1,1], [0,0,0,0, 0,0,0,0, 0,0,0,1, 0,1,1,1],
    [0,0,0,1, 0,1,1,1, 1,1,1,1, 1,1,1,1], [0,0,0,0, 0,0,0,0, 1,1,1,1, 1,1,1,1],
    [0,0,0,0, 1,1,1,1, 1,1,1,1, 1,1,1,1], [0,0,0,0, 0,0,0,0, 0,0,0,0, 1,1,1,1],
    [0,0,0,0, 1,0,0,0, 1,1,1,0, 1,1,1,1], [0,1,1,1, 0,0,0,1, 0,0,0,0, 0,0,0,0],
    [0,0,0,0, 0,0,0,0, 1,0,0,0, 1,1,1,0], [0,1,1,1, 0,0,1,1, 0,0,0,1, 0,0,0,0],
    [0,0,1,1, 0,0,0,1, 0,0,0,0, 0,0,0,0], [0,0,0,0, 1,0,0,0, 1,1,0,0, 1,1,1,0],
    [0,0,0,0, 0,0,0,0, 1,0,0,0, 1,1,0,0], [0,1,1,1, 0,0,1,1, 0,0,1,1, 0,0,0,1],
    [0,0,1,1, 0,0,0,1, 0,0,0,1, 0,0,0,0], [0,0,0,0, 1,0,0,0, 1,0,0,0, 1,1,0,0],
    [0,1,1,0, 0,1,1,0, 0,1,1,0, 0,1,1,0], [0,0,1,1, 0,1,1,0, 0,1,1,0, 1,1,0,0],
    [0,0,0,1, 0,1,1,1, 1,1,1,0, 1,0,0,0], [0,0,0,0, 1,1,1,1, 1,1,1,1, 0,0,0,0],
    [0,1,1,1, 0,0,0,1, 1,0,0,0, 1,1,1,0], [0,0,1,1, 1,0,0,1, 1,0,0,1, 1,1,0,0],
    [0,1,0,1, 0,1,0,1, 0,1,0,1, 0,1,0,1], [0,0,0,0, 1,1,1,1, 0,0,0,0, 1,1,1,1],
    [0,1,0,1, 1,0,1,0, 0,1,0,1, 1,0,1,0], [0,0,1,1, 0,0,1,1, 1,1,0,0, 1,1,0,0],
    [0,0,1,1, 1,1,0,0, 0,0,1,1, 1,1,0,0], [0,1,0,1, 0,1,0,1, 1,0,1,0, 1,0,1,0],
    [0,1,1,0, 1,0,0,1, 0,1,1,0, 1,0,0,1], [0,1,0,1, 1,0,1,0, 1,0,1,0, 0,1,0,1],
    [0,1,1,1, 0,0,1,1, 1,1,0,0, 1,1,1,0], [0,0,0,1, 0,0,1,1, 1,1,0,0, 1,0,0,0],
    [0,0,1,1, 0,0,1,0, 0,1,0,0, 1,1,0,0], [0,0,1,1, 1,0,1,1, 1,1,0,1, 1,1,0,0],
    [0,1,1,0, 1,0,0,1, 1,0,0,1, 0,1,1,0], [0,0,1,1, 1,1,0,0, 1,1,0,0, 0,0,1,1],
    [0,1,1,0, 0,1,1,0, 1,0,0,1, 1,0,0,1], [0,0,0,0, 0,1,1,0, 0,1,1,0, 0,0,0,0],
    [0,1,0,0, 1,1,1,0, 0,1,0,0, 0,0,0,0], [0,0,1,0, 0,1,1,1, 0,0,1,0, 0,0,0,0],
    [0,0,0,0, 0,0,1,0, 0,1,1,1, 0,0,1,0], [0,0,0,0, 0,1,0,0, 1,1,1,0, 0,1,0,0],
    [0,1,1,0, 1,1,0,0, 1,0,0,1, 0,0,1,1], [0,0,1,1, 0,1,1,0, 1,1,0,0, 1,0,0,1],
    [0,1,1,0, 0,0,1,1, 1,0,0,1, 1,1,0,0], [0,0,1,1, 1,0,0,1, 1,1,0,0, 0,1,1,0],
    [0,1,1,0, 1,1,0,0, 1,1,0,0, 1,0,0,1], [0,1,1,0, 0,0,1,1, 0,0,1,1, 1,0,0,1],
    [0,1,1,1, 1,1,1,0, 1,0,0,0, 0,0,0,1], [0,0,0,1, 1,0,0,0, 1,1,1,0, 0,1,1,1],
    [0,0,0,0, 1,1,1,1, 0,0,1,1, 0,0,1,1], [0,0,1,1, 0,0,1,1, 1,1,1,1, 0,0,0,0],
    [0,0,1,0, 0,0,1,0, 1,1,1,0, 1,1,1,0], [0,1,0,0, 0,1,0,0, 0,1,1,1, 0,1,1,1],
];

/// Pixel-to-subset assignment for the 64 three-subset partition patterns.
#[rustfmt::skip]
const PARTITION_3: [[u8; 16]; 64] = [
    [0,0,1,1, 0,0,1,1, 0,2,2,1, 2,2,2,2], [0,0,0,1, 0,0,1,1, 2,2,1,1, 2,2,2,1],
    [0,0,0,0, 2,0,0,1, 2,2,1,1, 2,2,1,1], [0,2,2,2, 0,0,2,2, 0,0,1,1, 0,1,1,1],
    [0,0,0,0, 0,0,0,0, 1,1,2,2, 1,1,2,2], [0,0,1,1, 0,0,1,1, 0,0,2,2, 0,0,2,2],
    [0,0,2,2, 0,0,2,2, 1,1,1,1, 1,1,1,1], [0,0,1,1, 0,0,1,1, 2,2,1,1, 2,2,1,1],
    [0,0,0,0, 0,0,0,0, 1,1,1,1, 2,2,2,2], [0,0,0,0, 1,1,1,1, 1,1,1,1, 2,2,2,2],
    [0,0,0,0, 1,1,1,1, 2,2,2,2, 2,2,2,2], [0,0,1,2, 0,0,1,2, 0,0,1,2, 0,0,1,2],
    [0,1,1,2, 0,1,1,2, 0,1,1,2, 0,1,1,2], [0,1,2,2, 0,1,2,2, 0,1,2,2, 0,1,2,2],
    [0,0,1,1, 0,1,1,2, 1,1,2,2, 1,2,2,2], [0,0,1,1, 2,0,0,1, 2,2,0,0, 2,2,2,0],
    [0,0,0,1, 0,0,1,1, 0,1,1,2, 1,1,2,2], [0,1,1,1, 0,0,1,1, 2,0,0,1, 2,2,0,0],
    [0,0,0,0, 1,1,2,2, 1,1,2,2, 1,1,2,2], [0,0,2,2, 0,0,2,2, 0,0,2,2, 1,1,1,1],
    [0,1,1,1, 0,1,1,1, 0,2,2,2, 0,2,2,2], [0,0,0,1, 0,0,0,1, 2,2,2,1, 2,2,2,1],
    [0,0,0,0, 0,0,1,1, 0,1,2,2, 0,1,2,2], [0,0,0,0, 1,1,0,0, 2,2,1,0, 2,2,1,0],
    [0,1,2,2, 0,1,2,2, 0,0,1,1, 0,0,0,0], [0,0,1,2, 0,0,1,2, 1,1,2,2, 2,2,2,2],
    [0,1,1,0, 1,2,2,1, 1,2,2,1, 0,1,1,0], [0,0,0,0, 0,1,1,0, 1,2,2,1, 1,2,2,1],
    [0,0,2,2, 1,1,0,2, 1,1,0,2, 0,0,2,2], [0,1,1,0, 0,1,1,0, 2,0,0,2, 2,2,2,2],
    [0,0,1,1, 0,1,2,2, 0,1,2,2, 0,0,1,1], [0,0,0,0, 2,0,0,0, 2,2,1,1, 2,2,2,1],
    [0,0,0,0, 0,0,0,2, 1,1,2,2, 1,2,2,2], [0,2,2,2, 0,0,2,2, 0,0,1,2, 0,0,1,1],
    [0,0,1,1, 0,0,1,2, 0,0,2,2, 0,2,2,2], [0,1,2,0, 0,1,2,0, 0,1,2,0, 0,1,2,0],
    [0,0,0,0, 1,1,1,1, 2,2,2,2, 0,0,0,0], [0,1,2,0, 1,2,0,1, 2,0,1,2, 0,1,2,0],
    [0,1,2,0, 2,0,1,2, 1,2,0,1, 0,1,2,0], [0,0,1,1, 2,2,0,0, 1,1,2,2, 0,0,1,1],
    [0,0,1,1, 1,1,2,2, 2,2,0,0, 0,0,1,1], [0,1,0,1, 0,1,0,1, 2,2,2,2, 2,2,2,2],
    [0,0,0,0, 0,0,0,0, 2,1,2,1, 2,1,2,1], [0,0,2,2, 1,1,2,2, 0,0,2,2, 1,1,2,2],
    [0,0,2,2, 0,0,1,1, 0,0,2,2, 0,0,1,1], [0,2,2,0, 1,2,2,1, 0,2,2,0, 1,2,2,1],
    [0,1,0,1, 2,2,2,2, 2,2,2,2, 0,1,0,1], [0,0,0,0, 2,1,2,1, 2,1,2,1, 2,1,2,1],
    [0,1,0,1, 0,1,0,1, 0,1,0,1, 2,2,2,2], [0,2,2,2, 0,1,1,1, 0,2,2,2, 0,1,1,1],
    [0,0,0,2, 1,1,1,2, 0,0,0,2, 1,1,1,2], [0,0,0,0, 2,1,1,2, 2,1,1,2, 2,1,1,2],
    [0,2,2,2, 0,1,1,1, 0,1,1,1, 0,2,2,2], [0,0,0,2, 1,1,1,2, 1,1,1,2, 0,0,0,2],
    [0,1,1,0, 0,1,1,0, 0,1,1,0, 2,2,2,2], [0,0,0,0, 0,0,0,0, 2,1,1,2, 2,1,1,2],
    [0,1,1,0, 0,1,1,0, 2,2,2,2, 2,2,2,2], [0,0,2,2, 0,0,1,1, 0,0,1,1, 0,0,2,2],
    [0,0,2,2, 1,1,2,2, 1,1,2,2, 0,0,2,2], [0,0,0,0, 0,0,0,0, 0,0,0,0, 2,1,1,2],
    [0,0,0,2, 0,0,0,1, 0,0,0,2, 0,0,0,1], [0,2,2,2, 1,2,2,2, 0,2,2,2, 1,2,2,2],
    [0,1,0,1, 2,2,2,2, 2,2,2,2, 2,2,2,2], [0,1,1,1, 2,0,1,1, 2,2,0,1, 2,2,2,0],
];

/// Anchor index of the second subset in two-subset partitions.
#[rustfmt::skip]
const ANCHOR_SECOND_OF_2: [u8; 64] = [
    15,15,15,15,15,15,15,15, 15,15,15,15,15,15,15,15,
    15, 2, 8, 2, 2, 8, 8,15,  2, 8, 2, 2, 8, 8, 2, 2,
    15,15, 6, 8, 2, 8,15,15,  2, 8, 2, 2, 2,15,15, 6,
     6, 2, 6, 8,15,15, 2, 2, 15,15,15,15,15, 2, 2,15,
];

/// Anchor index of the second subset in three-subset partitions.
#[rustfmt::skip]
const ANCHOR_SECOND_OF_3: [u8; 64] = [
     3, 3,15,15, 8, 3,15,15,  8, 8, 6, 6, 6, 5, 3, 3,
     3, 3, 8,15, 3, 3, 6,10,  5, 8, 8, 6, 8, 5,15,15,
     8,15, 3, 5, 6,10, 8,15, 15, 3,15, 5,15,15,15,15,
     3,15, 5, 5, 5, 8, 5,10,  5,10, 8,13,15,12, 3, 3,
];

/// Anchor index of the third subset in three-subset partitions.
#[rustfmt::skip]
const ANCHOR_THIRD_OF_3: [u8; 64] = [
    15, 8, 8, 3,15,15, 3, 8, 15,15,15,15,15,15,15, 8,
    15, 8,15, 3,15, 8,15, 8,  3,15, 6,10,15,15,10, 8,
    15, 3,15,10,10, 8, 9,10,  6,15, 8,15, 3, 6, 6, 8,
    15, 3,15,15,15,15,15,15, 15,15,15,15, 3,15,15, 8,
];

/// LSB-first bit cursor over a compressed block.
struct Bits<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Bits<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn take(&mut self, count: u32) -> u32 {
        let mut value = 0u32;
        for i in 0..count {
            let byte = self.data.get(self.pos / 8).copied().unwrap_or(0);
            value |= (((byte >> (self.pos % 8)) & 1) as u32) << i;
            self.pos += 1;
        }
        value
    }
}

#[inline]
fn subset_of(subsets: usize, partition: usize, pixel: usize) -> usize {
    match subsets {
        2 => PARTITION_2[partition & 63][pixel] as usize,
        3 => PARTITION_3[partition & 63][pixel] as usize,
        _ => 0,
    }
}

/// True when `pixel` is its subset's anchor (whose index stores one fewer bit).
#[inline]
fn is_anchor(subsets: usize, partition: usize, pixel: usize) -> bool {
    if pixel == 0 {
        return true;
    }
    let pixel = pixel as u8;
    match subsets {
        2 => ANCHOR_SECOND_OF_2[partition & 63] == pixel,
        3 => {
            ANCHOR_SECOND_OF_3[partition & 63] == pixel
                || ANCHOR_THIRD_OF_3[partition & 63] == pixel
        }
        _ => false,
    }
}

/// Expands an n-bit endpoint value to 8 bits by bit replication.
#[inline]
fn expand(value: u32, bits: u32) -> u32 {
    if bits >= 8 {
        return value;
    }
    let shifted = value << (8 - bits);
    shifted | (shifted >> bits)
}

#[inline]
fn interpolate(a: u32, b: u32, weight: u32) -> u8 {
    (((64 - weight) * a + weight * b + 32) >> 6) as u8
}

/// Decodes one BC7 block to 16 RGBA pixels.
///
/// A block whose low byte carries no mode bit is undecodable and yields
/// the sentinel fill.
pub fn decode_bc7_block(block: &[u8]) -> BlockPixels {
    let first = block.first().copied().unwrap_or(0);
    if block.len() < 16 || first == 0 {
        return [SENTINEL_PIXEL; 16];
    }
    let mode_index = first.trailing_zeros() as usize;
    let mode = &MODES[mode_index];
    let mut bits = Bits::new(block, mode_index + 1);

    let rotation = bits.take(mode.rotation_bits);
    let selection = bits.take(mode.selection_bits);
    let partition = bits.take(mode.partition_bits) as usize;
    let endpoint_count = mode.subsets * 2;

    // Endpoints arrive channel-major: all R, all G, all B, then A.
    let mut endpoints = [[0u32; 4]; 6];
    for channel in 0..3 {
        for endpoint in endpoints.iter_mut().take(endpoint_count) {
            endpoint[channel] = bits.take(mode.color_bits);
        }
    }
    if mode.alpha_bits > 0 {
        for endpoint in endpoints.iter_mut().take(endpoint_count) {
            endpoint[3] = bits.take(mode.alpha_bits);
        }
    }

    let mut color_bits = mode.color_bits;
    let mut alpha_bits = mode.alpha_bits;
    if mode.endpoint_pbits {
        for endpoint in endpoints.iter_mut().take(endpoint_count) {
            let p = bits.take(1);
            for channel in 0..4 {
                endpoint[channel] = (endpoint[channel] << 1) | p;
            }
        }
        color_bits += 1;
        if mode.alpha_bits > 0 {
            alpha_bits += 1;
        }
    }
    if mode.shared_pbits {
        for subset in 0..mode.subsets {
            let p = bits.take(1);
            for e in [subset * 2, subset * 2 + 1] {
                for channel in 0..3 {
                    endpoints[e][channel] = (endpoints[e][channel] << 1) | p;
                }
            }
        }
        color_bits += 1;
    }

    for endpoint in endpoints.iter_mut().take(endpoint_count) {
        for channel in 0..3 {
            endpoint[channel] = expand(endpoint[channel], color_bits);
        }
        endpoint[3] = if mode.alpha_bits > 0 {
            expand(endpoint[3], alpha_bits)
        } else {
            255
        };
    }

    // Primary index stream, anchors store one fewer bit.
    let mut primary = [0u32; 16];
    for (pixel, slot) in primary.iter_mut().enumerate() {
        let reduce = u32::from(is_anchor(mode.subsets, partition, pixel));
        *slot = bits.take(mode.index_bits - reduce);
    }
    // Secondary stream (modes 4 and 5), anchored at pixel 0 only.
    let mut secondary = [0u32; 16];
    if mode.index_bits2 > 0 {
        for (pixel, slot) in secondary.iter_mut().enumerate() {
            *slot = bits.take(mode.index_bits2 - u32::from(pixel == 0));
        }
    }

    let primary_weights = weights(mode.index_bits);
    let secondary_weights = weights(mode.index_bits2.max(2));
    let mut pixels = [[0u8; 4]; 16];
    for (pixel, out) in pixels.iter_mut().enumerate() {
        let subset = subset_of(mode.subsets, partition, pixel);
        let e0 = endpoints[subset * 2];
        let e1 = endpoints[subset * 2 + 1];

        let (color_weight, alpha_weight) = if mode.index_bits2 > 0 {
            let (c, a) = if selection == 1 {
                (
                    secondary_weights[secondary[pixel] as usize],
                    primary_weights[primary[pixel] as usize],
                )
            } else {
                (
                    primary_weights[primary[pixel] as usize],
                    secondary_weights[secondary[pixel] as usize],
                )
            };
            (c, a)
        } else {
            let w = primary_weights[primary[pixel] as usize];
            (w, w)
        };

        let mut rgba = [
            interpolate(e0[0], e1[0], color_weight),
            interpolate(e0[1], e1[1], color_weight),
            interpolate(e0[2], e1[2], color_weight),
            interpolate(e0[3], e1[3], alpha_weight),
        ];
        match rotation {
            1 => rgba.swap(0, 3),
            2 => rgba.swap(1, 3),
            3 => rgba.swap(2, 3),
            _ => {}
        }
        *out = rgba;
    }
    pixels
}
