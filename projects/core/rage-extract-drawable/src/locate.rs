//! The drawable locator: an ordered chain of speculative parse strategies.
//!
//! The container's top-level type is not tagged, so each strategy proposes
//! candidate offsets and a full parse is attempted at each one. A parse
//! that yields zero usable vertices counts as a miss and the chain moves
//! on. The final strategy slides a window across the buffer looking for the
//! two pointer fields every drawable carries, collecting candidates instead
//! of stopping at the first hit so a false positive that parses "successfully"
//! but near-empty can lose to a later, denser candidate.

use rage_extract_common::ReaderContext;
use tracing::debug;

use crate::layout::{
    ALT_DRAWABLE_OFFSETS, DRAWABLE_MODEL_LODS, DRAWABLE_SHADER_GROUP, FRAG_DRAWABLE_OFFSETS,
    MAX_GEOMETRIES, MAX_MODELS, MODEL_GEOMETRIES, MODEL_GEOMETRY_COUNT, MODEL_SHADER_MAPPING,
    PTR_LIST_COUNT, PTR_LIST_ENTRIES,
};
use crate::shader::{decode_shader_group, Shader};
use crate::vertex::decode_geometry;
use crate::{Drawable, DrawableModel, Mesh};

/// Heuristic-scan configuration; see the defaults for the usual values.
#[derive(Debug, Clone, Copy)]
pub struct ScanSettings {
    /// Upper bound of the scan window in bytes.
    pub scan_limit: usize,
    /// Candidate offset step in bytes.
    pub scan_stride: usize,
    /// Maximum number of scan candidates to collect.
    pub scan_max_candidates: usize,
    /// Score every candidate by decoded vertex count and keep the best,
    /// instead of accepting the first candidate that parses non-empty.
    pub prefer_best_drawable: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            scan_limit: 0x10000,
            scan_stride: 16,
            scan_max_candidates: 24,
            prefer_best_drawable: false,
        }
    }
}

/// Runs the strategy chain over a decompressed container image.
///
/// Returns `None` when every strategy exhausts without usable geometry;
/// the caller maps that to a typed failure.
pub fn locate_drawable(reader: &ReaderContext<'_>, settings: &ScanSettings) -> Option<Drawable> {
    // Fragment-type roots keep the drawable behind a pointer field.
    for &offset in FRAG_DRAWABLE_OFFSETS {
        let target = reader.deref(offset);
        if target == 0 {
            continue;
        }
        if let Some(drawable) = parse_drawable_at(reader, target) {
            debug!(offset, target, "drawable found via fragment offset table");
            return Some(drawable);
        }
    }

    // The buffer itself may start with the drawable.
    if let Some(drawable) = parse_drawable_at(reader, 0) {
        debug!("drawable found at offset 0");
        return Some(drawable);
    }

    // Dictionary-style containers use a different pointer placement.
    for &offset in ALT_DRAWABLE_OFFSETS {
        let target = reader.deref(offset);
        if target == 0 {
            continue;
        }
        if let Some(drawable) = parse_drawable_at(reader, target) {
            debug!(offset, target, "drawable found via alternate offset table");
            return Some(drawable);
        }
    }

    scan_for_drawable(reader, settings)
}

/// Slides a candidate offset across the buffer testing whether both known
/// sub-structure pointers (shader group, at least one LOD model array)
/// resolve, then parses the collected candidates.
fn scan_for_drawable(reader: &ReaderContext<'_>, settings: &ScanSettings) -> Option<Drawable> {
    let stride = settings.scan_stride.max(1);
    let limit = settings.scan_limit.min(reader.len());

    let mut candidates = Vec::new();
    let mut base = 0usize;
    while base < limit && candidates.len() < settings.scan_max_candidates {
        if looks_like_drawable(reader, base) {
            candidates.push(base);
        }
        base += stride;
    }
    debug!(candidates = candidates.len(), limit, "heuristic scan complete");

    if settings.prefer_best_drawable {
        candidates
            .into_iter()
            .filter_map(|at| parse_drawable_at(reader, at))
            .max_by_key(Drawable::total_vertices)
    } else {
        candidates
            .into_iter()
            .find_map(|at| parse_drawable_at(reader, at))
    }
}

#[inline]
fn looks_like_drawable(reader: &ReaderContext<'_>, base: usize) -> bool {
    reader.valid_ptr(reader.u64(base + DRAWABLE_SHADER_GROUP))
        && DRAWABLE_MODEL_LODS
            .iter()
            .any(|&lod| reader.valid_ptr(reader.u64(base + lod)))
}

/// Attempts a full drawable parse at `at`.
///
/// A structurally valid parse with zero total vertices is a failed attempt;
/// callers try the next candidate.
pub fn parse_drawable_at(reader: &ReaderContext<'_>, at: usize) -> Option<Drawable> {
    let group = reader.deref(at + DRAWABLE_SHADER_GROUP);
    let shaders = if group != 0 {
        decode_shader_group(reader, group)
    } else {
        Vec::new()
    };

    let mut models = Vec::new();
    for &lod in DRAWABLE_MODEL_LODS {
        let list = reader.deref(at + lod);
        if list == 0 {
            continue;
        }
        let entries = reader.deref(list + PTR_LIST_ENTRIES);
        let count = (reader.u16(list + PTR_LIST_COUNT) as usize).min(MAX_MODELS);
        if entries == 0 {
            continue;
        }
        for m in 0..count {
            let model = reader.deref(entries + m * 8);
            if model == 0 {
                continue;
            }
            let decoded = decode_model(reader, model, &shaders, models.len());
            if !decoded.meshes.is_empty() {
                models.push(decoded);
            }
        }
    }

    let drawable = Drawable {
        name: "drawable".to_string(),
        shaders,
        models,
    };
    (drawable.total_vertices() > 0).then_some(drawable)
}

fn decode_model(
    reader: &ReaderContext<'_>,
    model: usize,
    shaders: &[Shader],
    model_index: usize,
) -> DrawableModel {
    let geometries = reader.deref(model + MODEL_GEOMETRIES);
    let count = (reader.u16(model + MODEL_GEOMETRY_COUNT) as usize).min(MAX_GEOMETRIES);
    let mapping = reader.deref(model + MODEL_SHADER_MAPPING);

    let mut meshes = Vec::new();
    if geometries != 0 {
        for g in 0..count {
            let geo = reader.deref(geometries + g * 8);
            if geo == 0 {
                continue;
            }
            let Some(data) = decode_geometry(reader, geo) else {
                continue;
            };
            let shader_index = if mapping != 0 {
                reader.u16(mapping + g * 2) as usize
            } else {
                g
            };
            let shader = shaders.get(shader_index);
            meshes.push(Mesh {
                name: format!("mesh_{model_index}_{g}"),
                material_name: shader.map_or_else(|| "default".to_string(), |s| s.name.clone()),
                positions: data.positions,
                normals: data.normals,
                uv_sets: data.uv_sets,
                colors: data.colors,
                tangents: data.tangents,
                indices: data.indices,
                texture_refs: shader.map(|s| s.texture_refs.clone()).unwrap_or_default(),
            });
        }
    }

    DrawableModel {
        name: format!("model_{model_index}"),
        meshes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::shader_hash;
    use crate::synth::{emit_drawable, Synth};
    use crate::TextureRole;

    fn reader(synth: &Synth) -> ReaderContext<'_> {
        ReaderContext::new(&synth.buf, synth.buf.len(), 0)
    }

    #[test]
    fn direct_strategy_parses_drawable_at_offset_zero() {
        let mut synth = Synth::new(0x2000);
        emit_drawable(&mut synth, 0, 0x800, 6);

        let drawable = locate_drawable(&reader(&synth), &ScanSettings::default()).unwrap();
        assert_eq!(drawable.total_vertices(), 6);
        assert_eq!(drawable.models.len(), 1);

        let mesh = &drawable.models[0].meshes[0];
        assert_eq!(mesh.positions.len(), 18);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);
        // all indices reference decoded vertices
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
        // shader name resolved through the catalog
        assert_eq!(mesh.material_name, "normal_spec");
        assert_eq!(
            mesh.texture_refs.get(&TextureRole::Diffuse).map(String::as_str),
            Some("test_diffuse")
        );
    }

    #[test]
    fn decoded_uvs_are_v_flipped() {
        let mut synth = Synth::new(0x2000);
        emit_drawable(&mut synth, 0, 0x800, 3);

        let drawable = locate_drawable(&reader(&synth), &ScanSettings::default()).unwrap();
        let mesh = &drawable.models[0].meshes[0];
        let uv = &mesh.uv_sets[0];
        // written as (0.5, 0.25), V flips to 0.75
        assert!((uv[0] - 0.5).abs() < 1e-6);
        assert!((uv[1] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn fragment_offset_table_is_tried_first() {
        let mut synth = Synth::new(0x3000);
        emit_drawable(&mut synth, 0x1000, 0x1800, 3);
        synth.ptr(0x30, 0x1000); // fragment drawable pointer

        let drawable = locate_drawable(&reader(&synth), &ScanSettings::default()).unwrap();
        assert_eq!(drawable.total_vertices(), 3);
    }

    #[test]
    fn alternate_offset_table_is_tried_after_direct() {
        let mut synth = Synth::new(0x3000);
        emit_drawable(&mut synth, 0x1000, 0x1800, 3);
        synth.ptr(0x10, 0x1000);

        let drawable = locate_drawable(&reader(&synth), &ScanSettings::default()).unwrap();
        assert_eq!(drawable.total_vertices(), 3);
    }

    #[test]
    fn heuristic_scan_finds_unreferenced_drawable() {
        let mut synth = Synth::new(0x3000);
        // 16-aligned offset not present in any fixed table
        emit_drawable(&mut synth, 0x460, 0x1800, 3);

        let drawable = locate_drawable(&reader(&synth), &ScanSettings::default()).unwrap();
        assert_eq!(drawable.total_vertices(), 3);
    }

    #[test]
    fn scoring_keeps_the_densest_candidate() {
        let mut synth = Synth::new(0x6000);
        emit_drawable(&mut synth, 0x400, 0x1000, 3);
        emit_drawable(&mut synth, 0x800, 0x3000, 12);

        let settings = ScanSettings {
            prefer_best_drawable: true,
            ..ScanSettings::default()
        };
        let drawable = locate_drawable(&reader(&synth), &settings).unwrap();
        assert_eq!(drawable.total_vertices(), 12);
    }

    #[test]
    fn first_hit_wins_without_scoring() {
        let mut synth = Synth::new(0x6000);
        emit_drawable(&mut synth, 0x400, 0x1000, 3);
        emit_drawable(&mut synth, 0x800, 0x3000, 12);

        let drawable = locate_drawable(&reader(&synth), &ScanSettings::default()).unwrap();
        assert_eq!(drawable.total_vertices(), 3);
    }

    #[test]
    fn zero_vertex_parse_falls_through_to_failure() {
        let mut synth = Synth::new(0x2000);
        emit_drawable(&mut synth, 0, 0x800, 0);

        assert!(locate_drawable(&reader(&synth), &ScanSettings::default()).is_none());
    }

    #[test]
    fn empty_and_tiny_buffers_fail_cleanly() {
        for len in [0usize, 1, 15, 64] {
            let data = vec![0u8; len];
            let reader = ReaderContext::new(&data, len, 0);
            assert!(locate_drawable(&reader, &ScanSettings::default()).is_none());
        }
    }

    #[test]
    fn random_bytes_never_panic() {
        // Cheap xorshift; decode must terminate with None or valid output.
        let mut state = 0x12345678u32;
        let mut data = vec![0u8; 0x4000];
        for b in &mut data {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            *b = state as u8;
        }
        let reader = ReaderContext::new(&data, data.len() / 2, data.len() / 2);
        let _ = locate_drawable(&reader, &ScanSettings::default());
    }

    #[test]
    fn shader_mapping_selects_material() {
        let mut synth = Synth::new(0x2000);
        emit_drawable(&mut synth, 0, 0x800, 3);
        // sanity: the synthetic shader hash resolves through the catalog
        assert_eq!(
            crate::shader::resolve_shader_name(shader_hash("normal_spec")),
            "normal_spec"
        );
        let drawable = locate_drawable(&reader(&synth), &ScanSettings::default()).unwrap();
        assert_eq!(drawable.shaders.len(), 1);
        assert_eq!(drawable.shaders[0].index, 0);
    }
}
