//! Drawable location and decoding.
//!
//! The root geometry structure inside a decompressed container is not
//! self-describing, so [`locate_drawable`] runs an ordered chain of
//! speculative strategies (fixed offset tables, then a scored heuristic
//! scan) until one of them parses into geometry with at least one usable
//! vertex. Everything below the entry point is a pure function of the byte
//! buffer: no state, no I/O, safe to run on any worker thread.

#![warn(missing_docs)]

pub mod layout;
pub mod locate;
pub mod shader;
#[cfg(any(test, feature = "test-utils"))]
pub mod synth;
pub mod vertex;

use std::collections::BTreeMap;

pub use locate::{locate_drawable, ScanSettings};
pub use shader::{resolve_shader_name, shader_hash, Shader};
pub use vertex::VertexDeclaration;

/// Sampler roles a mesh texture reference can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TextureRole {
    /// Base color map.
    Diffuse,
    /// Tangent-space normal map.
    Normal,
    /// Specular / reflectivity map.
    Specular,
    /// Self-illumination map.
    Emissive,
}

/// Map from sampler role to texture name, first texture per role wins.
pub type TextureRefs = BTreeMap<TextureRole, String>;

/// The root 3D-geometry structure: shader bindings plus LOD model groups.
///
/// Owns its models and shaders exclusively; produced once by a decode pass
/// and immutable thereafter.
#[derive(Debug, Clone, Default)]
pub struct Drawable {
    /// Display name, positional when the container carries none.
    pub name: String,
    /// Shader bindings referenced by mesh material indices.
    pub shaders: Vec<Shader>,
    /// LOD model groups, highest detail first.
    pub models: Vec<DrawableModel>,
}

impl Drawable {
    /// Total decoded vertex count across all meshes, used to score
    /// speculative parses against each other.
    pub fn total_vertices(&self) -> usize {
        self.models
            .iter()
            .flat_map(|m| m.meshes.iter())
            .map(|mesh| mesh.vertex_count())
            .sum()
    }
}

/// One LOD model group.
#[derive(Debug, Clone, Default)]
pub struct DrawableModel {
    /// Positional name (`model_<n>`).
    pub name: String,
    /// Decoded meshes; never contains a zero-vertex mesh.
    pub meshes: Vec<Mesh>,
}

/// A decoded mesh: typed attribute arrays plus its material binding.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Positional name (`mesh_<model>_<n>`).
    pub name: String,
    /// Resolved shader name of the bound material.
    pub material_name: String,
    /// `3 * vertex_count` floats, xyz interleaved.
    pub positions: Vec<f32>,
    /// `3 * vertex_count` floats when present.
    pub normals: Option<Vec<f32>>,
    /// Up to four UV channels, each `2 * vertex_count` floats.
    pub uv_sets: Vec<Vec<f32>>,
    /// `4 * vertex_count` RGBA bytes when present.
    pub colors: Option<Vec<u8>>,
    /// `4 * vertex_count` floats when present.
    pub tangents: Option<Vec<f32>>,
    /// Triangle list indices, always `< vertex_count`.
    pub indices: Vec<u32>,
    /// Texture names per sampler role, inherited from the bound shader.
    pub texture_refs: TextureRefs,
}

impl Mesh {
    /// Number of decoded vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}
