//! Synthetic container images for tests.
//!
//! Builds in-memory structures using the same `layout` constants the
//! decoders read, so every test exercises the real offsets end to end.
//! Compiled for tests and for dependents that enable the `test-utils`
//! feature.

use crate::layout::*;
use crate::shader::shader_hash;

/// Grow-on-write little-endian buffer builder.
#[derive(Debug, Default)]
pub struct Synth {
    /// The buffer under construction.
    pub buf: Vec<u8>,
}

impl Synth {
    /// Pre-sized zero-filled buffer.
    pub fn new(len: usize) -> Self {
        Self { buf: vec![0u8; len] }
    }

    fn ensure(&mut self, end: usize) {
        if self.buf.len() < end {
            self.buf.resize(end, 0);
        }
    }

    /// Writes raw bytes at `at`.
    pub fn bytes(&mut self, at: usize, bytes: &[u8]) {
        self.ensure(at + bytes.len());
        self.buf[at..at + bytes.len()].copy_from_slice(bytes);
    }

    /// Writes a little-endian u16.
    pub fn u16(&mut self, at: usize, value: u16) {
        self.bytes(at, &value.to_le_bytes());
    }

    /// Writes a little-endian u32.
    pub fn u32(&mut self, at: usize, value: u32) {
        self.bytes(at, &value.to_le_bytes());
    }

    /// Writes a little-endian u64.
    pub fn u64(&mut self, at: usize, value: u64) {
        self.bytes(at, &value.to_le_bytes());
    }

    /// Writes a little-endian f32.
    pub fn f32(&mut self, at: usize, value: f32) {
        self.bytes(at, &value.to_le_bytes());
    }

    /// Writes a system-segment tagged pointer to `target`.
    pub fn ptr(&mut self, at: usize, target: usize) {
        self.u64(at, 0x5000_0000 | target as u64);
    }

    /// Writes a NUL-terminated string.
    pub fn cstr(&mut self, at: usize, s: &str) {
        self.bytes(at, s.as_bytes());
        self.bytes(at + s.len(), &[0]);
    }
}

/// Emits a complete single-model drawable at `base`, with all subsidiary
/// structures placed inside the `scratch` region.
///
/// The drawable has one shader (`normal_spec`, one diffuse texture named
/// `test_diffuse`), one model, one geometry with `vertex_count` vertices
/// of position/normal/uv0 at stride 32, and a sequential index buffer.
pub fn emit_drawable(s: &mut Synth, base: usize, scratch: usize, vertex_count: u32) {
    let shader_group = scratch;
    let shader_ptrs = scratch + 0x40;
    let shader_record = scratch + 0x60;
    let params = scratch + 0x90;
    let hash_array = params + 2 * PARAM_RECORD_SIZE;
    let texture = scratch + 0xC0;
    let texture_name = scratch + 0x100;
    let model_list = scratch + 0x120;
    let model_ptrs = scratch + 0x140;
    let model = scratch + 0x160;
    let geometry_ptrs = scratch + 0x190;
    let shader_mapping = scratch + 0x1A0;
    let geometry = scratch + 0x1C0;
    let vertex_buffer = scratch + 0x210;
    let vertex_info = scratch + 0x250;
    let index_buffer = scratch + 0x270;
    let vertex_data = scratch + 0x290;
    let stride = 32usize;
    let index_data = vertex_data + vertex_count as usize * stride;

    // Drawable fields.
    s.ptr(base + DRAWABLE_SHADER_GROUP, shader_group);
    s.ptr(base + DRAWABLE_MODEL_LODS[0], model_list);

    // Shader group -> one shader record with a texture parameter.
    s.ptr(shader_group + SHADER_GROUP_SHADERS, shader_ptrs);
    s.u16(shader_group + SHADER_GROUP_COUNT, 1);
    s.ptr(shader_ptrs, shader_record);
    s.ptr(shader_record + SHADER_PARAMS, params);
    s.u32(shader_record + SHADER_NAME_HASH, shader_hash("normal_spec"));
    s.bytes(shader_record + SHADER_PARAM_COUNT, &[2]);
    // param 0: texture reference
    s.ptr(params + PARAM_DATA_PTR, texture);
    s.bytes(params + PARAM_DATA_TYPE, &[0]);
    // param 1: one row of inline vector data, skipped by the decoder
    s.bytes(params + PARAM_RECORD_SIZE + PARAM_DATA_TYPE, &[1]);
    s.u32(hash_array, shader_hash("diffusesampler"));
    s.ptr(texture + TEXTURE_NAME_PTR, texture_name);
    s.cstr(texture_name, "test_diffuse");

    // Model list -> one model -> one geometry.
    s.ptr(model_list + PTR_LIST_ENTRIES, model_ptrs);
    s.u16(model_list + PTR_LIST_COUNT, 1);
    s.ptr(model_ptrs, model);
    s.ptr(model + MODEL_GEOMETRIES, geometry_ptrs);
    s.u16(model + MODEL_GEOMETRY_COUNT, 1);
    s.ptr(model + MODEL_SHADER_MAPPING, shader_mapping);
    s.ptr(geometry_ptrs, geometry);
    s.u16(shader_mapping, 0);

    // Geometry -> vertex buffer (legacy A layout) + index buffer.
    s.ptr(geometry + GEOMETRY_VERTEX_BUFFER, vertex_buffer);
    s.ptr(geometry + GEOMETRY_INDEX_BUFFER, index_buffer);
    let vb = VERTEX_BUFFER_LAYOUTS[0];
    s.ptr(vertex_buffer + vb.data_ptr, vertex_data);
    s.u32(vertex_buffer + vb.count, vertex_count);
    s.u16(vertex_buffer + vb.stride, stride as u16);
    s.ptr(vertex_buffer + vb.info_ptr, vertex_info);

    // Declaration: position (Float3), normal (Float3), texcoord 0 (Float2).
    s.u16(vertex_info + VERTEX_INFO_FLAGS, 0b0100_1001);
    s.u64(vertex_info + VERTEX_INFO_TYPES, 4 | (4 << 12) | (3 << 24));

    s.ptr(index_buffer + INDEX_BUFFER_DATA, index_data);
    s.u32(index_buffer + INDEX_BUFFER_COUNT, vertex_count);

    for i in 0..vertex_count as usize {
        let v = vertex_data + i * stride;
        s.f32(v, i as f32);
        s.f32(v + 4, 1.0);
        s.f32(v + 8, 2.0);
        s.f32(v + 12, 0.0);
        s.f32(v + 16, 0.0);
        s.f32(v + 20, 1.0);
        s.f32(v + 24, 0.5);
        s.f32(v + 28, 0.25);
        s.u16(index_data + i * 2, i as u16);
    }
}
