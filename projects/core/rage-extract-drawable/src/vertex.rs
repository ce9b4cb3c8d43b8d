//! Vertex declaration and per-geometry attribute decode.
//!
//! A geometry either carries an explicit declaration record (bit-flag word
//! plus packed type nibbles) reachable through its vertex buffer, or it does
//! not, in which case the layout is guessed from the stride using a table of
//! layouts observed in the wild. Per-vertex reads are sanity-checked
//! individually; a bad vertex degrades to defaults instead of failing the
//! mesh.

use rage_extract_common::ReaderContext;
use tracing::trace;

use crate::layout::{
    self, VertexBufferLayout, GEOMETRY_INDEX_BUFFER, GEOMETRY_VERTEX_BUFFER, INDEX_BUFFER_COUNT,
    INDEX_BUFFER_DATA, MAX_VERTEX_STRIDE, MAX_VERTICES, VERTEX_BUFFER_LAYOUTS, VERTEX_INFO_FLAGS,
    VERTEX_INFO_TYPES,
};

/// Positions whose components exceed this magnitude signal half-precision
/// data read as f32.
const POSITION_SANITY_BOUND: f32 = 50_000.0;
/// UV components at or beyond this magnitude are rejected per vertex.
const UV_SANITY_BOUND: f32 = 1000.0;

/// What a component slot feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// Object-space position.
    Position,
    /// Vertex normal.
    Normal,
    /// RGBA vertex color.
    Color,
    /// Texture coordinate channel 0-7 (only 0-3 are decoded).
    TexCoord(u8),
    /// Tangent vector.
    Tangent,
    /// Present in the stride but not decoded.
    Padding,
}

/// Numeric storage of one component, from the declaration's type nibbles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    /// Two half floats (4 bytes).
    Half2,
    /// One f32.
    Float,
    /// Two f32s.
    Float2,
    /// Three f32s.
    Float3,
    /// Four f32s.
    Float4,
    /// Four unsigned bytes, RGBA.
    Color4,
    /// Four signed normalized bytes.
    SByte4,
    /// Packed 3x10-bit signed normalized (4 bytes).
    Dec3N,
    /// Two u16s (4 bytes).
    UShort2,
}

impl ComponentType {
    /// Maps a declaration type nibble; unknown nibbles read as 4-byte slots.
    pub fn from_nibble(nibble: u8) -> Self {
        match nibble {
            1 => Self::Half2,
            2 => Self::Float,
            3 => Self::Float2,
            4 => Self::Float3,
            5 => Self::Float4,
            6 => Self::Color4,
            7 => Self::SByte4,
            8 => Self::Dec3N,
            9 => Self::UShort2,
            _ => Self::Float,
        }
    }

    /// Byte size of the component.
    pub fn size(self) -> usize {
        match self {
            Self::Half2 | Self::Float | Self::Color4 | Self::SByte4 | Self::Dec3N
            | Self::UShort2 => 4,
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
        }
    }
}

/// One attribute slot: where it lives inside the vertex and how to read it.
#[derive(Debug, Clone, Copy)]
pub struct Component {
    /// Attribute fed by this slot.
    pub kind: ComponentKind,
    /// Storage format.
    pub ty: ComponentType,
    /// Byte offset from the start of the vertex.
    pub offset: usize,
}

/// Per-vertex attribute layout, built once per geometry and consumed
/// read-only during decode.
#[derive(Debug, Clone)]
pub struct VertexDeclaration {
    /// Total per-vertex byte size.
    pub stride: usize,
    /// Present components in offset order.
    pub components: Vec<Component>,
}

impl VertexDeclaration {
    /// Builds a declaration from an explicit record: a bit-flag word where
    /// set bit `i` marks slot `i` present, and a packed nibble array giving
    /// each present slot's numeric type. Offsets accumulate in slot order.
    pub fn from_flags(flags: u16, types: u64) -> Self {
        let mut components = Vec::new();
        let mut offset = 0usize;
        for slot in 0..16u32 {
            if flags & (1 << slot) == 0 {
                continue;
            }
            let nibble = ((types >> (slot * 4)) & 0xF) as u8;
            let ty = ComponentType::from_nibble(nibble);
            let kind = match slot {
                0 => ComponentKind::Position,
                3 => ComponentKind::Normal,
                4 => ComponentKind::Color,
                6..=13 => ComponentKind::TexCoord((slot - 6) as u8),
                14 => ComponentKind::Tangent,
                _ => ComponentKind::Padding,
            };
            components.push(Component { kind, ty, offset });
            offset += ty.size();
        }
        Self {
            stride: offset,
            components,
        }
    }

    /// Stride-keyed fallback for geometries without a resolvable
    /// declaration record: layouts seen in practice for the common strides,
    /// plus a conservative guess for everything else.
    pub fn from_stride(stride: usize) -> Self {
        use ComponentKind::*;
        use ComponentType::*;
        let components: Vec<Component> = match stride {
            20 => vec![at(Position, Float3, 0), at(TexCoord(0), Float2, 12)],
            24 => vec![
                at(Position, Float3, 0),
                at(TexCoord(0), Float2, 12),
                at(Color, Color4, 20),
            ],
            28 => vec![
                at(Position, Float3, 0),
                at(Normal, Float3, 12),
                at(TexCoord(0), Half2, 24),
            ],
            32 => vec![
                at(Position, Float3, 0),
                at(Normal, Float3, 12),
                at(TexCoord(0), Float2, 24),
            ],
            36 => vec![
                at(Position, Float3, 0),
                at(Normal, Float3, 12),
                at(Color, Color4, 24),
                at(TexCoord(0), Float2, 28),
            ],
            40 => vec![
                at(Position, Float3, 0),
                at(Normal, Float3, 12),
                at(Color, Color4, 24),
                at(TexCoord(0), Float2, 28),
                at(TexCoord(1), Half2, 36),
            ],
            44 => vec![
                at(Position, Float3, 0),
                at(Normal, Float3, 12),
                at(Color, Color4, 24),
                at(TexCoord(0), Float2, 28),
                at(TexCoord(1), Float2, 36),
            ],
            // Unrecognized stride: assume the usual prefix and take what fits.
            _ => {
                let mut guess = vec![at(Position, Float3, 0)];
                if stride >= 24 {
                    guess.push(at(Normal, Float3, 12));
                }
                if stride >= 28 {
                    guess.push(at(Color, Color4, 24));
                }
                if stride >= 36 {
                    guess.push(at(TexCoord(0), Float2, 28));
                }
                guess
            }
        };
        Self { stride, components }
    }
}

#[inline]
fn at(kind: ComponentKind, ty: ComponentType, offset: usize) -> Component {
    Component { kind, ty, offset }
}

/// Raw attribute arrays decoded from one geometry node.
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    /// xyz interleaved, `3 * vertex_count` entries.
    pub positions: Vec<f32>,
    /// xyz interleaved when any normal survived validation.
    pub normals: Option<Vec<f32>>,
    /// Up to four UV channels.
    pub uv_sets: Vec<Vec<f32>>,
    /// RGBA bytes when a color slot was present.
    pub colors: Option<Vec<u8>>,
    /// xyzw interleaved when a tangent slot was present.
    pub tangents: Option<Vec<f32>>,
    /// Triangle list indices.
    pub indices: Vec<u32>,
}

impl GeometryData {
    /// Number of decoded vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

/// Decodes the geometry node at `geo` into typed attribute arrays.
///
/// Returns `None` when no vertex-buffer layout variant validates or the
/// buffer holds no complete vertex.
pub fn decode_geometry(reader: &ReaderContext<'_>, geo: usize) -> Option<GeometryData> {
    let vb = reader.deref(geo + GEOMETRY_VERTEX_BUFFER);
    if vb == 0 {
        return None;
    }

    let (variant, data, count, stride) = probe_vertex_buffer(reader, vb)?;
    let decl = declaration_for(reader, vb, variant, stride);

    let mut out = decode_vertices(reader, data, count, stride, &decl);
    if out.positions.is_empty() {
        return None;
    }

    out.indices = decode_indices(reader, geo, out.vertex_count());
    Some(out)
}

/// Tries each known vertex-buffer field layout and returns the first one
/// whose pointer, count and stride all validate.
fn probe_vertex_buffer(
    reader: &ReaderContext<'_>,
    vb: usize,
) -> Option<(&'static VertexBufferLayout, usize, usize, usize)> {
    for variant in VERTEX_BUFFER_LAYOUTS {
        let data = reader.deref(vb + variant.data_ptr);
        let count = reader.u32(vb + variant.count) as usize;
        let stride = reader.u16(vb + variant.stride) as usize;
        if data == 0 || count == 0 || count > MAX_VERTICES {
            continue;
        }
        if stride < 12 || stride > MAX_VERTEX_STRIDE {
            continue;
        }
        // At least one whole vertex must be inside the buffer.
        if data + stride > reader.len() {
            continue;
        }
        let available = (reader.len() - data) / stride;
        return Some((variant, data, count.min(available), stride));
    }
    None
}

/// Explicit declaration when resolvable and plausible, stride table otherwise.
fn declaration_for(
    reader: &ReaderContext<'_>,
    vb: usize,
    variant: &VertexBufferLayout,
    stride: usize,
) -> VertexDeclaration {
    let info = reader.deref(vb + variant.info_ptr);
    if info != 0 {
        let flags = reader.u16(info + VERTEX_INFO_FLAGS);
        let types = reader.u64(info + VERTEX_INFO_TYPES);
        let decl = VertexDeclaration::from_flags(flags, types);
        // A declaration wider than the actual stride was misread; fall back.
        if !decl.components.is_empty() && decl.stride <= stride {
            return decl;
        }
        trace!(flags, stride, decl_stride = decl.stride, "declaration rejected");
    }
    VertexDeclaration::from_stride(stride)
}

fn decode_vertices(
    reader: &ReaderContext<'_>,
    data: usize,
    count: usize,
    stride: usize,
    decl: &VertexDeclaration,
) -> GeometryData {
    let mut out = GeometryData::default();
    let uv_channels = decl
        .components
        .iter()
        .filter_map(|c| match c.kind {
            ComponentKind::TexCoord(ch) if ch < 4 => Some(ch as usize + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0);
    out.uv_sets = vec![vec![0.0; count * 2]; uv_channels];

    let has_normals = decl
        .components
        .iter()
        .any(|c| c.kind == ComponentKind::Normal);
    let mut normals = vec![0.0f32; if has_normals { count * 3 } else { 0 }];
    let mut any_normal = false;

    for i in 0..count {
        let base = data + i * stride;
        for component in &decl.components {
            let at = base + component.offset;
            match component.kind {
                ComponentKind::Position => {
                    let [x, y, z] = read_position(reader, at);
                    out.positions.extend_from_slice(&[x, y, z]);
                }
                ComponentKind::Normal => {
                    if let Some(n) = read_normal(reader, at, component.ty) {
                        normals[i * 3..i * 3 + 3].copy_from_slice(&n);
                        any_normal = true;
                    }
                }
                ComponentKind::Color => {
                    let rgba = reader.bytes(at, 4);
                    let colors = out.colors.get_or_insert_with(|| vec![0u8; count * 4]);
                    colors[i * 4..i * 4 + rgba.len()].copy_from_slice(rgba);
                }
                ComponentKind::TexCoord(ch) if (ch as usize) < uv_channels => {
                    if let Some([u, v]) = read_uv(reader, at, component.ty) {
                        let set = &mut out.uv_sets[ch as usize];
                        set[i * 2] = u;
                        set[i * 2 + 1] = v;
                    }
                }
                ComponentKind::Tangent => {
                    let t = read_tangent(reader, at, component.ty);
                    let tangents = out.tangents.get_or_insert_with(|| vec![0.0f32; count * 4]);
                    tangents[i * 4..i * 4 + 4].copy_from_slice(&t);
                }
                _ => {}
            }
        }
    }

    if any_normal {
        out.normals = Some(normals);
    }
    out
}

/// 3x f32, re-read as 3x half when the f32 interpretation is implausible.
fn read_position(reader: &ReaderContext<'_>, at: usize) -> [f32; 3] {
    let wide = [reader.f32(at), reader.f32(at + 4), reader.f32(at + 8)];
    if wide
        .iter()
        .all(|c| c.is_finite() && c.abs() <= POSITION_SANITY_BOUND)
    {
        return wide;
    }
    [reader.f16(at), reader.f16(at + 2), reader.f16(at + 4)]
}

fn read_normal(reader: &ReaderContext<'_>, at: usize, ty: ComponentType) -> Option<[f32; 3]> {
    let raw = match ty {
        ComponentType::Float3 | ComponentType::Float2 | ComponentType::Float => {
            [reader.f32(at), reader.f32(at + 4), reader.f32(at + 8)]
        }
        ComponentType::Float4 => [reader.f32(at), reader.f32(at + 4), reader.f32(at + 8)],
        ComponentType::SByte4 => {
            let b = reader.bytes(at, 4);
            let signed = |i: usize| b.get(i).map_or(0.0, |&v| (v as i8) as f32 / 127.0);
            [signed(0), signed(1), signed(2)]
        }
        ComponentType::Dec3N => unpack_dec3n(reader.u32(at)),
        _ => return None,
    };
    normalize(raw)
}

/// Unpacks a 3x10-bit signed normalized word.
pub fn unpack_dec3n(value: u32) -> [f32; 3] {
    let channel = |shift: u32| {
        let bits = ((value >> shift) & 0x3FF) as i32;
        let signed = if bits > 511 { bits - 1024 } else { bits };
        signed as f32 / 511.0
    };
    [channel(0), channel(10), channel(20)]
}

/// Renormalizes; vectors with degenerate length are dropped.
fn normalize(v: [f32; 3]) -> Option<[f32; 3]> {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if !len.is_finite() || !(0.01..=100.0).contains(&len) {
        return None;
    }
    Some([v[0] / len, v[1] / len, v[2] / len])
}

/// Reads one UV pair, flipping V to bottom-origin. Implausible pairs are
/// rejected and the vertex keeps the zero default.
fn read_uv(reader: &ReaderContext<'_>, at: usize, ty: ComponentType) -> Option<[f32; 2]> {
    let (u, v) = match ty {
        ComponentType::Half2 => (reader.f16(at), reader.f16(at + 2)),
        _ => (reader.f32(at), reader.f32(at + 4)),
    };
    if !u.is_finite() || !v.is_finite() || u.abs() >= UV_SANITY_BOUND || v.abs() >= UV_SANITY_BOUND
    {
        return None;
    }
    Some([u, 1.0 - v])
}

fn read_tangent(reader: &ReaderContext<'_>, at: usize, ty: ComponentType) -> [f32; 4] {
    match ty {
        ComponentType::Float3 => [reader.f32(at), reader.f32(at + 4), reader.f32(at + 8), 1.0],
        _ => [
            reader.f32(at),
            reader.f32(at + 4),
            reader.f32(at + 8),
            reader.f32(at + 12),
        ],
    }
}

/// Reads the 16-bit index buffer, widening to u32 and dropping triangles
/// that reference out-of-range vertices. Missing or empty index data
/// synthesizes a sequential unindexed triangle list.
fn decode_indices(reader: &ReaderContext<'_>, geo: usize, vertex_count: usize) -> Vec<u32> {
    let ib = reader.deref(geo + GEOMETRY_INDEX_BUFFER);
    if ib != 0 {
        let data = reader.deref(ib + INDEX_BUFFER_DATA);
        let count = reader.u32(ib + INDEX_BUFFER_COUNT) as usize;
        if data != 0 && count > 0 {
            let available = (reader.len().saturating_sub(data)) / 2;
            let count = count.min(available);
            let mut indices = Vec::with_capacity(count);
            for i in 0..count {
                indices.push(reader.u16(data + i * 2) as u32);
            }
            indices.truncate(indices.len() - indices.len() % 3);
            let mut filtered = Vec::with_capacity(indices.len());
            for tri in indices.chunks_exact(3) {
                if tri.iter().all(|&idx| (idx as usize) < vertex_count) {
                    filtered.extend_from_slice(tri);
                }
            }
            if !filtered.is_empty() {
                return filtered;
            }
        }
    }
    // Unindexed triangle list.
    let n = vertex_count - vertex_count % 3;
    (0..n as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn declaration_from_flags_accumulates_offsets_in_slot_order() {
        // position (Float3), normal (Dec3N), color, texcoord 0 (Half2)
        let flags = 0b0000_0000_0101_1001u16;
        let mut types = 0u64;
        types |= 4; // slot 0: Float3
        types |= 8 << (3 * 4); // slot 3: Dec3N
        types |= 6 << (4 * 4); // slot 4: Color4
        types |= 1 << (6 * 4); // slot 6: Half2

        let decl = VertexDeclaration::from_flags(flags, types);
        assert_eq!(decl.stride, 12 + 4 + 4 + 4);
        assert_eq!(decl.components.len(), 4);
        assert_eq!(decl.components[0].offset, 0);
        assert_eq!(decl.components[1].offset, 12);
        assert_eq!(decl.components[2].offset, 16);
        assert_eq!(decl.components[3].offset, 20);
        assert_eq!(decl.components[3].kind, ComponentKind::TexCoord(0));
    }

    #[rstest]
    #[case(20)]
    #[case(24)]
    #[case(28)]
    #[case(32)]
    #[case(36)]
    #[case(40)]
    #[case(44)]
    fn stride_table_layouts_fit_their_stride(#[case] stride: usize) {
        let decl = VertexDeclaration::from_stride(stride);
        assert_eq!(decl.stride, stride);
        for component in &decl.components {
            assert!(component.offset + component.ty.size() <= stride);
        }
        assert_eq!(decl.components[0].kind, ComponentKind::Position);
    }

    #[test]
    fn unknown_stride_gets_a_conservative_guess() {
        let decl = VertexDeclaration::from_stride(52);
        assert!(decl.components.len() >= 4);
        for component in &decl.components {
            assert!(component.offset + component.ty.size() <= 52);
        }
    }

    #[test]
    fn dec3n_unpacks_signed_channels() {
        // +511, -512, 0
        let value = 511u32 | (512 << 10);
        let [x, y, z] = unpack_dec3n(value);
        assert!((x - 1.0).abs() < 1e-3);
        assert!(y < -1.0 + 1e-2);
        assert_eq!(z, 0.0);
    }

    #[test]
    fn normalize_drops_degenerate_vectors() {
        assert!(normalize([0.0, 0.0, 0.0]).is_none());
        assert!(normalize([f32::NAN, 0.0, 0.0]).is_none());
        assert!(normalize([500.0, 0.0, 0.0]).is_none());
        let n = normalize([0.0, 3.0, 0.0]).unwrap();
        assert!((n[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn half_positions_are_detected_by_sanity_bound() {
        // Three halves whose f32 reinterpretation of the first word lands
        // around 2^45, far past the sanity bound, forcing the half re-read.
        let mut data = Vec::new();
        for v in [1.5f32, 100.0, 0.25] {
            data.extend_from_slice(&half::f16::from_f32(v).to_le_bytes());
        }
        data.extend_from_slice(&[0u8; 8]);
        let reader = ReaderContext::new(&data, data.len(), 0);
        assert_eq!(read_position(&reader, 0), [1.5, 100.0, 0.25]);
    }

    #[test]
    fn uv_rejection_keeps_zero_default() {
        let mut data = Vec::new();
        data.extend_from_slice(&5000.0f32.to_le_bytes());
        data.extend_from_slice(&0.5f32.to_le_bytes());
        let reader = ReaderContext::new(&data, data.len(), 0);
        assert!(read_uv(&reader, 0, ComponentType::Float2).is_none());
    }

    #[test]
    fn uv_v_component_is_flipped() {
        let mut data = Vec::new();
        data.extend_from_slice(&0.25f32.to_le_bytes());
        data.extend_from_slice(&0.25f32.to_le_bytes());
        let reader = ReaderContext::new(&data, data.len(), 0);
        let [u, v] = read_uv(&reader, 0, ComponentType::Float2).unwrap();
        assert_eq!(u, 0.25);
        assert_eq!(v, 0.75);
    }
}
