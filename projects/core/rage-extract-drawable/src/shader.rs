//! Shader records, name-hash resolution and texture-reference extraction.
//!
//! A shader record carries only a 4-byte content hash of its logical name.
//! The bundled catalog of known shader names is hashed once into a
//! process-wide read-only map; anything unresolved degrades to a synthetic
//! `material_*` name. Texture slot roles come primarily from naming
//! conventions in the referenced texture names, because the parameter
//! block's offset arithmetic has proven unreliable across file variants;
//! the per-parameter sampler hash is only a tiebreaker for names that match
//! no convention.

use std::collections::HashMap;
use std::sync::LazyLock;

use rage_extract_common::ReaderContext;
use tracing::trace;

use crate::layout::{
    MAX_SHADERS, MAX_SHADER_PARAMS, PARAM_DATA_PTR, PARAM_DATA_TYPE, PARAM_RECORD_SIZE,
    SHADER_GROUP_COUNT, SHADER_GROUP_SHADERS, SHADER_NAME_HASH, SHADER_PARAMS, SHADER_PARAM_COUNT,
    TEXTURE_NAME_PTR,
};
use crate::{TextureRefs, TextureRole};

/// Newline-delimited catalog of shader names seen in the wild.
const SHADER_NAME_CATALOG: &str = include_str!("shader_names.txt");

/// Hash-to-name table, built once and shared read-only across threads.
static SHADER_NAMES: LazyLock<HashMap<u32, &'static str>> = LazyLock::new(|| {
    SHADER_NAME_CATALOG
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|name| (shader_hash(name), name))
        .collect()
});

/// Sampler-name hashes used to break ties for texture names that match no
/// naming convention.
static SAMPLER_ROLES: LazyLock<HashMap<u32, TextureRole>> = LazyLock::new(|| {
    [
        ("diffusesampler", TextureRole::Diffuse),
        ("texturesampler", TextureRole::Diffuse),
        ("bumpsampler", TextureRole::Normal),
        ("normalsampler", TextureRole::Normal),
        ("specsampler", TextureRole::Specular),
        ("specularsampler", TextureRole::Specular),
        ("emissivesampler", TextureRole::Emissive),
    ]
    .into_iter()
    .map(|(name, role)| (shader_hash(name), role))
    .collect()
});

/// A material binding: hash identity plus the texture names it references.
#[derive(Debug, Clone, Default)]
pub struct Shader {
    /// Position in the shader group, referenced by geometry shader mappings.
    pub index: usize,
    /// Content hash of the shader's logical name.
    pub name_hash: u32,
    /// Resolved name, or a synthetic `material_*` fallback.
    pub name: String,
    /// Texture name per sampler role; first texture per role wins.
    pub texture_refs: TextureRefs,
}

/// Order-sensitive additive-rotate hash over the lowercased name.
pub fn shader_hash(name: &str) -> u32 {
    let mut hash: u32 = 0;
    for byte in name.bytes() {
        hash = hash.wrapping_add(byte.to_ascii_lowercase() as u32);
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash.wrapping_add(hash << 15)
}

/// Resolves a shader name hash against the catalog, falling back to a
/// synthetic name (hex for real-looking hashes, decimal for small values).
pub fn resolve_shader_name(hash: u32) -> String {
    match SHADER_NAMES.get(&hash) {
        Some(name) => (*name).to_string(),
        None if hash >= 0x10000 => format!("material_{hash:08x}"),
        None => format!("material_{hash}"),
    }
}

/// Parses the shader group at `group` into shader records.
pub fn decode_shader_group(reader: &ReaderContext<'_>, group: usize) -> Vec<Shader> {
    let entries = reader.deref(group + SHADER_GROUP_SHADERS);
    let count = (reader.u16(group + SHADER_GROUP_COUNT) as usize).min(MAX_SHADERS);
    if entries == 0 || count == 0 {
        return Vec::new();
    }

    let mut shaders = Vec::with_capacity(count);
    for index in 0..count {
        let record = reader.deref(entries + index * 8);
        if record == 0 {
            continue;
        }
        let name_hash = reader.u32(record + SHADER_NAME_HASH);
        let name = resolve_shader_name(name_hash);
        let texture_refs = decode_texture_refs(reader, record);
        trace!(index, name_hash, name, refs = texture_refs.len(), "decoded shader");
        shaders.push(Shader {
            index,
            name_hash,
            name,
            texture_refs,
        });
    }
    shaders
}

/// Walks a shader's parameter block, pulling out texture references.
///
/// Records with `data_type == 0` are texture parameters whose data pointer
/// chases to a texture struct holding the name string; anything else is
/// inline vector data and is skipped. A parallel u32 hash array after the
/// records names each parameter's sampler.
fn decode_texture_refs(reader: &ReaderContext<'_>, shader: usize) -> TextureRefs {
    let params = reader.deref(shader + SHADER_PARAMS);
    let count = (reader.u8(shader + SHADER_PARAM_COUNT) as usize).min(MAX_SHADER_PARAMS);
    let mut refs = TextureRefs::new();
    if params == 0 || count == 0 {
        return refs;
    }

    let hashes = params + count * PARAM_RECORD_SIZE;
    for i in 0..count {
        let record = params + i * PARAM_RECORD_SIZE;
        let data_type = reader.u8(record + PARAM_DATA_TYPE);
        if data_type != 0 {
            continue; // inline vector rows, nothing to chase
        }
        let Some(name) = texture_param_name(reader, reader.u64(record + PARAM_DATA_PTR)) else {
            continue;
        };
        let sampler_hash = reader.u32(hashes + i * 4);
        let role = role_for(&name, sampler_hash);
        refs.entry(role).or_insert(name);
    }
    refs
}

/// Chases a texture parameter's data pointer to the texture's name string.
fn texture_param_name(reader: &ReaderContext<'_>, ptr: u64) -> Option<String> {
    if !reader.valid_ptr(ptr) {
        return None;
    }
    let texture = reader.resolve(ptr);
    let name_at = reader.deref(texture + TEXTURE_NAME_PTR);
    if name_at != 0 {
        let name = reader.cstr(name_at, 128);
        if is_plausible_name(&name) {
            return Some(name);
        }
    }
    // Some variants point straight at the string.
    let direct = reader.cstr(texture, 128);
    is_plausible_name(&direct).then_some(direct)
}

fn is_plausible_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() >= 2
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() || b == b' ')
}

/// Assigns a sampler role from the texture name's suffix/substring
/// conventions; the sampler hash decides only when no convention matches.
pub fn role_for(texture_name: &str, sampler_hash: u32) -> TextureRole {
    let name = texture_name.to_ascii_lowercase();
    if name.ends_with("_n")
        || name.ends_with("_nrm")
        || name.contains("_normal")
        || name.contains("bump")
    {
        return TextureRole::Normal;
    }
    if name.ends_with("_s") || name.contains("_spec") || name.contains("specmap") {
        return TextureRole::Specular;
    }
    if name.contains("emissive") || name.contains("_emis") {
        return TextureRole::Emissive;
    }
    SAMPLER_ROLES
        .get(&sampler_hash)
        .copied()
        .unwrap_or(TextureRole::Diffuse)
}
