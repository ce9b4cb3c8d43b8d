//! End-to-end decode tests over synthetic containers.

use std::io::Write;

use rage_extract::{
    decode_drawable, decode_texture_dictionary, ExtractError, ScanSettings, TextureFormat,
    TextureRole,
};
use rage_extract_drawable::synth::{emit_drawable, Synth};

const RSC7_MAGIC: u32 = 0x3743_5352;

fn deflate(raw: &[u8]) -> Vec<u8> {
    let mut enc = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(raw).unwrap();
    enc.finish().unwrap()
}

/// Wraps a decompressed image in an RSC7 container whose system segment
/// covers the whole image.
fn rsc7_wrap(image: &[u8]) -> Vec<u8> {
    let pages = image.len().div_ceil(4096).min(255) as u32;
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&RSC7_MAGIC.to_le_bytes());
    bytes.extend_from_slice(&2u32.to_le_bytes());
    bytes.extend_from_slice(&(pages << 8).to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&deflate(image));
    bytes
}

#[test]
fn drawable_decodes_from_a_compressed_container() {
    let mut synth = Synth::new(0x2000);
    emit_drawable(&mut synth, 0, 0x800, 6);

    let drawable = decode_drawable(&rsc7_wrap(&synth.buf), &ScanSettings::default()).unwrap();
    assert_eq!(drawable.total_vertices(), 6);
    let mesh = &drawable.models[0].meshes[0];
    assert_eq!(mesh.material_name, "normal_spec");
    assert_eq!(
        mesh.texture_refs.get(&TextureRole::Diffuse).map(String::as_str),
        Some("test_diffuse")
    );
}

#[test]
fn drawable_decodes_from_an_already_decompressed_buffer() {
    let mut synth = Synth::new(0x2000);
    emit_drawable(&mut synth, 0, 0x800, 3);

    // no container magic, the buffer is used as-is
    let drawable = decode_drawable(&synth.buf, &ScanSettings::default()).unwrap();
    assert_eq!(drawable.total_vertices(), 3);
}

#[test]
fn tiny_input_is_a_typed_failure() {
    for len in 0..16 {
        let err = decode_drawable(&vec![0u8; len], &ScanSettings::default()).unwrap_err();
        assert!(matches!(err, ExtractError::InputTooShort { .. }));
        let err = decode_texture_dictionary(&vec![0u8; len]).unwrap_err();
        assert!(matches!(err, ExtractError::InputTooShort { .. }));
    }
}

#[test]
fn geometry_free_input_reports_no_geometry() {
    let bytes = vec![0u8; 0x1000];
    assert_eq!(
        decode_drawable(&bytes, &ScanSettings::default()).unwrap_err(),
        ExtractError::NoGeometryFound
    );
}

#[test]
fn texture_dictionary_decodes_end_to_end() {
    // Entry array header at 0x20, one 4x4 DXT1 entry.
    let mut s = Synth::new(0x400);
    let (entries, record, name, pixels) = (0x100, 0x140, 0x240, 0x280);
    s.ptr(0x20, entries);
    s.u16(0x28, 1);
    s.ptr(entries, record);
    s.ptr(record + 0x28, name);
    s.u16(record + 0x50, 4);
    s.u16(record + 0x52, 4);
    s.u32(record + 0x58, u32::from_le_bytes(*b"DXT1"));
    s.bytes(record + 0x5E, &[1]); // one mip
    s.ptr(record + 0x70, pixels);
    s.cstr(name, "wall_diffuse");
    // red/blue endpoints, all-zero indices: solid red
    s.bytes(pixels, &[0x00, 0xF8, 0x1F, 0x00, 0, 0, 0, 0]);

    let dictionary = decode_texture_dictionary(&rsc7_wrap(&s.buf)).unwrap();
    let texture = dictionary.get("wall_diffuse").unwrap();
    assert_eq!(texture.format, TextureFormat::Dxt1);
    assert_eq!((texture.width, texture.height), (4, 4));
    assert_eq!(texture.rgba.len(), 4 * 4 * 4);
    assert_eq!(&texture.rgba[..4], &[255, 0, 0, 255]);
}

#[test]
fn texture_free_input_reports_no_textures() {
    let bytes = vec![0u8; 0x1000];
    assert_eq!(
        decode_texture_dictionary(&bytes).unwrap_err(),
        ExtractError::NoTexturesFound
    );
}
