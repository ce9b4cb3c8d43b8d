//! Block-compressed pixel decode: DXT1/3/5, BC4, BC5, BC7.
//!
//! All formats operate on 4x4 pixel blocks laid out row-major across the
//! surface; blocks extending past the image edge are cropped on write.
//! DXT1/3/5 share the 5:6:5 endpoint ramp; BC4/BC5 reuse the DXT5 alpha
//! ramp construction. BC7 lives in its own module.

pub mod bc7;

use crate::TextureFormat;

/// Fill for blocks that cannot be decoded (for example a BC7 block with no
/// mode bit): opaque magenta, chosen to be loud in previews.
pub const SENTINEL_PIXEL: [u8; 4] = [255, 0, 255, 255];

/// Decoded 4x4 block: 16 RGBA pixels, row-major.
pub type BlockPixels = [[u8; 4]; 16];

/// Decodes a block-compressed surface to RGBA.
///
/// `data` must hold `format.level_size(width, height)` bytes; the caller
/// checks that before dispatching here.
pub fn decode_blocks(format: TextureFormat, data: &[u8], width: usize, height: usize) -> Vec<u8> {
    let block_size = match format {
        TextureFormat::Dxt1 | TextureFormat::Bc4 => 8,
        _ => 16,
    };
    let blocks_w = width.div_ceil(4);
    let blocks_h = height.div_ceil(4);
    let mut out = vec![0u8; width * height * 4];

    for by in 0..blocks_h {
        for bx in 0..blocks_w {
            let at = (by * blocks_w + bx) * block_size;
            let block = data.get(at..at + block_size).unwrap_or(&[]);
            let pixels = match format {
                TextureFormat::Dxt1 => decode_dxt1_block(block),
                TextureFormat::Dxt3 => decode_dxt3_block(block),
                TextureFormat::Dxt5 => decode_dxt5_block(block),
                TextureFormat::Bc4 => decode_bc4_block(block),
                TextureFormat::Bc5 => decode_bc5_block(block),
                TextureFormat::Bc7 => bc7::decode_bc7_block(block),
                _ => [SENTINEL_PIXEL; 16],
            };
            write_block(&mut out, &pixels, bx, by, width, height);
        }
    }
    out
}

/// Copies a decoded block into the surface, cropping at the image edge.
fn write_block(
    out: &mut [u8],
    pixels: &BlockPixels,
    bx: usize,
    by: usize,
    width: usize,
    height: usize,
) {
    for py in 0..4 {
        let y = by * 4 + py;
        if y >= height {
            break;
        }
        for px in 0..4 {
            let x = bx * 4 + px;
            if x >= width {
                break;
            }
            let dst = (y * width + x) * 4;
            out[dst..dst + 4].copy_from_slice(&pixels[py * 4 + px]);
        }
    }
}

#[inline]
fn read_u16(block: &[u8], at: usize) -> u16 {
    match block.get(at..at + 2) {
        Some(b) => u16::from_le_bytes([b[0], b[1]]),
        None => 0,
    }
}

#[inline]
fn read_u32(block: &[u8], at: usize) -> u32 {
    match block.get(at..at + 4) {
        Some(b) => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        None => 0,
    }
}

/// Unpacks a 5:6:5 endpoint color to 8-bit channels.
#[inline]
fn unpack_565(c: u16) -> [u8; 3] {
    let r = ((c >> 11) & 0x1F) as u8;
    let g = ((c >> 5) & 0x3F) as u8;
    let b = (c & 0x1F) as u8;
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}

/// Builds the 4-entry color ramp shared by DXT1/3/5.
///
/// `force_four` disables DXT1's 3-color punch-through mode (DXT3/5 always
/// interpolate four colors regardless of endpoint ordering).
fn color_ramp(c0: u16, c1: u16, force_four: bool) -> [[u8; 4]; 4] {
    let [r0, g0, b0] = unpack_565(c0);
    let [r1, g1, b1] = unpack_565(c1);
    let mut ramp = [[0u8; 4]; 4];
    ramp[0] = [r0, g0, b0, 255];
    ramp[1] = [r1, g1, b1, 255];
    if force_four || c0 > c1 {
        let mix = |a: u8, b: u8| (((2 * a as u32) + b as u32) / 3) as u8;
        ramp[2] = [mix(r0, r1), mix(g0, g1), mix(b0, b1), 255];
        ramp[3] = [mix(r1, r0), mix(g1, g0), mix(b1, b0), 255];
    } else {
        let mid = |a: u8, b: u8| ((a as u32 + b as u32) / 2) as u8;
        ramp[2] = [mid(r0, r1), mid(g0, g1), mid(b0, b1), 255];
        ramp[3] = [0, 0, 0, 0]; // punch-through transparent
    }
    ramp
}

/// Builds the 8-entry alpha/single-channel ramp shared by DXT5, BC4 and BC5.
fn alpha_ramp(a0: u8, a1: u8) -> [u8; 8] {
    let (a0w, a1w) = (a0 as u16, a1 as u16);
    if a0 > a1 {
        [
            a0,
            a1,
            ((6 * a0w + a1w) / 7) as u8,
            ((5 * a0w + 2 * a1w) / 7) as u8,
            ((4 * a0w + 3 * a1w) / 7) as u8,
            ((3 * a0w + 4 * a1w) / 7) as u8,
            ((2 * a0w + 5 * a1w) / 7) as u8,
            ((a0w + 6 * a1w) / 7) as u8,
        ]
    } else {
        [
            a0,
            a1,
            ((4 * a0w + a1w) / 5) as u8,
            ((3 * a0w + 2 * a1w) / 5) as u8,
            ((2 * a0w + 3 * a1w) / 5) as u8,
            ((a0w + 4 * a1w) / 5) as u8,
            0,
            255,
        ]
    }
}

/// 3-bit-per-pixel index word from the 6 bytes following the endpoints.
#[inline]
fn alpha_indices(block: &[u8], at: usize) -> u64 {
    let mut bits = 0u64;
    for i in 0..6 {
        bits |= (block.get(at + i).copied().unwrap_or(0) as u64) << (i * 8);
    }
    bits
}

/// Decodes a DXT1 (BC1) block.
pub fn decode_dxt1_block(block: &[u8]) -> BlockPixels {
    let ramp = color_ramp(read_u16(block, 0), read_u16(block, 2), false);
    let indices = read_u32(block, 4);
    let mut pixels = [[0u8; 4]; 16];
    for (i, pixel) in pixels.iter_mut().enumerate() {
        *pixel = ramp[((indices >> (i * 2)) & 0x3) as usize];
    }
    pixels
}

/// Decodes a DXT3 (BC2) block: explicit 4-bit alpha plus a 4-color ramp.
pub fn decode_dxt3_block(block: &[u8]) -> BlockPixels {
    let ramp = color_ramp(read_u16(block, 8), read_u16(block, 10), true);
    let indices = read_u32(block, 12);
    let mut pixels = [[0u8; 4]; 16];
    for (i, pixel) in pixels.iter_mut().enumerate() {
        *pixel = ramp[((indices >> (i * 2)) & 0x3) as usize];
        let nibble = (block.get(i / 2).copied().unwrap_or(0) >> ((i % 2) * 4)) & 0xF;
        pixel[3] = nibble * 17;
    }
    pixels
}

/// Decodes a DXT5 (BC3) block: interpolated alpha plus a 4-color ramp.
pub fn decode_dxt5_block(block: &[u8]) -> BlockPixels {
    let ramp = color_ramp(read_u16(block, 8), read_u16(block, 10), true);
    let indices = read_u32(block, 12);
    let alphas = alpha_ramp(
        block.first().copied().unwrap_or(0),
        block.get(1).copied().unwrap_or(0),
    );
    let alpha_bits = alpha_indices(block, 2);
    let mut pixels = [[0u8; 4]; 16];
    for (i, pixel) in pixels.iter_mut().enumerate() {
        *pixel = ramp[((indices >> (i * 2)) & 0x3) as usize];
        pixel[3] = alphas[((alpha_bits >> (i * 3)) & 0x7) as usize];
    }
    pixels
}

/// Decodes a BC4 block: one channel replicated to RGB as luminance.
pub fn decode_bc4_block(block: &[u8]) -> BlockPixels {
    let ramp = alpha_ramp(
        block.first().copied().unwrap_or(0),
        block.get(1).copied().unwrap_or(0),
    );
    let bits = alpha_indices(block, 2);
    let mut pixels = [[0u8; 4]; 16];
    for (i, pixel) in pixels.iter_mut().enumerate() {
        let l = ramp[((bits >> (i * 3)) & 0x7) as usize];
        *pixel = [l, l, l, 255];
    }
    pixels
}

/// Decodes a BC5 block: two independent channels as packed X/Y, Z
/// reconstructed as a unit-vector component for normal maps.
pub fn decode_bc5_block(block: &[u8]) -> BlockPixels {
    let red = alpha_ramp(
        block.first().copied().unwrap_or(0),
        block.get(1).copied().unwrap_or(0),
    );
    let red_bits = alpha_indices(block, 2);
    let green = alpha_ramp(
        block.get(8).copied().unwrap_or(0),
        block.get(9).copied().unwrap_or(0),
    );
    let green_bits = alpha_indices(block, 10);

    let mut pixels = [[0u8; 4]; 16];
    for (i, pixel) in pixels.iter_mut().enumerate() {
        let r = red[((red_bits >> (i * 3)) & 0x7) as usize];
        let g = green[((green_bits >> (i * 3)) & 0x7) as usize];
        let x = r as f32 / 255.0 * 2.0 - 1.0;
        let y = g as f32 / 255.0 * 2.0 - 1.0;
        let z = (1.0 - x * x - y * y).max(0.0).sqrt();
        let b = ((z + 1.0) / 2.0 * 255.0).round() as u8;
        *pixel = [r, g, b, 255];
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn dxt1_red_blue_endpoints_all_zero_indices_decode_red() {
        // color0 = 0xF800 (red), color1 = 0x001F (blue), zero index bits
        let block = [0x00u8, 0xF8, 0x1F, 0x00, 0, 0, 0, 0];
        let pixels = decode_dxt1_block(&block);
        for pixel in pixels {
            assert_eq!(pixel, [255, 0, 0, 255]);
        }
    }

    #[test]
    fn dxt1_three_color_mode_has_transparent_index() {
        // c0 <= c1 selects the 3-color + punch-through mode; index 3 is
        // fully transparent.
        let mut block = [0u8; 8];
        block[0..2].copy_from_slice(&0x001Fu16.to_le_bytes());
        block[2..4].copy_from_slice(&0xF800u16.to_le_bytes());
        block[4] = 0b0000_0011; // first pixel uses index 3
        let pixels = decode_dxt1_block(&block);
        assert_eq!(pixels[0], [0, 0, 0, 0]);
        assert_eq!(pixels[1][3], 255);
    }

    #[test]
    fn dxt3_alpha_nibbles_scale_to_full_range() {
        let mut block = [0u8; 16];
        block[0] = 0xF0; // pixel 0 alpha 0, pixel 1 alpha 15
        let pixels = decode_dxt3_block(&block);
        assert_eq!(pixels[0][3], 0);
        assert_eq!(pixels[1][3], 255);
    }

    #[rstest]
    // a0 > a1: 8-value interpolated ramp
    #[case(200, 100, 2, (6 * 200 + 100) / 7)]
    // a0 <= a1: 6-value ramp with constant 0 and 255 tails
    #[case(10, 200, 6, 0)]
    #[case(10, 200, 7, 255)]
    fn alpha_ramp_shape_follows_endpoint_order(
        #[case] a0: u8,
        #[case] a1: u8,
        #[case] index: usize,
        #[case] expected: u16,
    ) {
        assert_eq!(alpha_ramp(a0, a1)[index] as u16, expected);
    }

    #[test]
    fn bc4_replicates_channel_as_luminance() {
        let mut block = [0u8; 8];
        block[0] = 128;
        block[1] = 0;
        let pixels = decode_bc4_block(&block);
        assert_eq!(pixels[0], [128, 128, 128, 255]);
    }

    #[test]
    fn bc5_reconstructs_flat_normal() {
        // x = y = 0 (both channels at 128) gives z ~= 1.
        let mut block = [0u8; 16];
        block[0] = 128;
        block[8] = 128;
        let pixels = decode_bc5_block(&block);
        assert_eq!(pixels[0][0], 128);
        assert_eq!(pixels[0][1], 128);
        assert!(pixels[0][2] >= 254);
    }

    #[test]
    fn edge_blocks_are_cropped() {
        // 5x5 DXT1 surface: 2x2 blocks, edge pixels must stay in bounds.
        let block = [0x00u8, 0xF8, 0x1F, 0x00, 0, 0, 0, 0];
        let data: Vec<u8> = block.iter().copied().cycle().take(4 * 8).collect();
        let out = decode_blocks(TextureFormat::Dxt1, &data, 5, 5);
        assert_eq!(out.len(), 5 * 5 * 4);
        assert_eq!(&out[..4], &[255, 0, 0, 255]);
    }
}
