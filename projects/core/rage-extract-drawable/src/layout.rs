//! Reverse-engineered structure offsets.
//!
//! None of these layouts are documented anywhere; they were recovered by
//! diffing real containers across game generations. Offsets that vary per
//! generation are expressed as ordered candidate lists and probed until one
//! validates. Keeping every constant here, and building synthetic test
//! buffers from the same constants, is what keeps the decoders and the
//! tests honest about a single layout.

/// Candidate offsets of the drawable pointer inside a fragment-type root.
pub const FRAG_DRAWABLE_OFFSETS: &[usize] = &[0x30, 0xF0, 0x170];

/// Candidate offsets of the drawable pointer in the alternate container
/// layout (dictionary-style roots).
pub const ALT_DRAWABLE_OFFSETS: &[usize] = &[0x10, 0x20, 0x40];

/// Drawable: shader group pointer.
pub const DRAWABLE_SHADER_GROUP: usize = 0x10;
/// Drawable: LOD model-array pointers, highest detail first.
pub const DRAWABLE_MODEL_LODS: &[usize] = &[0x50, 0x58, 0x60, 0x68];

/// Pointer list: entries-array pointer.
pub const PTR_LIST_ENTRIES: usize = 0x00;
/// Pointer list: u16 entry count.
pub const PTR_LIST_COUNT: usize = 0x08;

/// DrawableModel: geometry pointer-array field.
pub const MODEL_GEOMETRIES: usize = 0x08;
/// DrawableModel: u16 geometry count.
pub const MODEL_GEOMETRY_COUNT: usize = 0x10;
/// DrawableModel: pointer to the per-geometry u16 shader index array.
pub const MODEL_SHADER_MAPPING: usize = 0x20;

/// Geometry: vertex buffer pointer.
pub const GEOMETRY_VERTEX_BUFFER: usize = 0x18;
/// Geometry: index buffer pointer.
pub const GEOMETRY_INDEX_BUFFER: usize = 0x38;

/// One vertex-buffer field layout. Two legacy variants are probed in order,
/// then the newer gen9 variant.
#[derive(Debug, Clone, Copy)]
pub struct VertexBufferLayout {
    /// Offset of the vertex data pointer (u64, tagged).
    pub data_ptr: usize,
    /// Offset of the u32 vertex count.
    pub count: usize,
    /// Offset of the u16 stride.
    pub stride: usize,
    /// Offset of the vertex declaration info pointer (u64, tagged).
    pub info_ptr: usize,
}

/// Probe order: legacy A, legacy B, gen9.
pub const VERTEX_BUFFER_LAYOUTS: &[VertexBufferLayout] = &[
    VertexBufferLayout {
        data_ptr: 0x08,
        count: 0x10,
        stride: 0x14,
        info_ptr: 0x30,
    },
    VertexBufferLayout {
        data_ptr: 0x10,
        count: 0x18,
        stride: 0x1C,
        info_ptr: 0x38,
    },
    VertexBufferLayout {
        data_ptr: 0x08,
        count: 0x0C,
        stride: 0x0A,
        info_ptr: 0x20,
    },
];

/// Index buffer: data pointer.
pub const INDEX_BUFFER_DATA: usize = 0x08;
/// Index buffer: u32 index count.
pub const INDEX_BUFFER_COUNT: usize = 0x10;

/// Vertex declaration record: u16 component bit-flag word.
pub const VERTEX_INFO_FLAGS: usize = 0x00;
/// Vertex declaration record: u64 packed type nibbles (nibble `i` is
/// component `i`'s numeric type).
pub const VERTEX_INFO_TYPES: usize = 0x08;

/// Shader group: pointer to the shader pointer array.
pub const SHADER_GROUP_SHADERS: usize = 0x10;
/// Shader group: u16 shader count.
pub const SHADER_GROUP_COUNT: usize = 0x18;

/// Shader record: parameter block pointer.
pub const SHADER_PARAMS: usize = 0x00;
/// Shader record: u32 name hash.
pub const SHADER_NAME_HASH: usize = 0x08;
/// Shader record: u8 parameter count.
pub const SHADER_PARAM_COUNT: usize = 0x10;

/// Byte stride of one parameter record.
pub const PARAM_RECORD_SIZE: usize = 0x10;
/// Parameter record: data pointer.
pub const PARAM_DATA_PTR: usize = 0x00;
/// Parameter record: u8 data type (0 = texture reference, >= 1 = that many
/// inline 16-byte vector rows).
pub const PARAM_DATA_TYPE: usize = 0x08;

/// Texture record reached through a texture parameter: name pointer offset.
pub const TEXTURE_NAME_PTR: usize = 0x28;

/// Cap on models parsed per drawable on adversarial input.
pub const MAX_MODELS: usize = 0x100;
/// Cap on geometries parsed per model.
pub const MAX_GEOMETRIES: usize = 0x400;
/// Cap on shaders parsed per shader group.
pub const MAX_SHADERS: usize = 0x400;
/// Cap on parameter records walked per shader.
pub const MAX_SHADER_PARAMS: usize = 64;
/// Cap on decoded vertices per geometry.
pub const MAX_VERTICES: usize = 1_000_000;
/// Largest plausible per-vertex byte stride.
pub const MAX_VERTEX_STRIDE: usize = 256;
