#![no_main]

// The drawable locator must terminate with a typed result on any input,
// including truncated containers and pure noise.

use libfuzzer_sys::fuzz_target;
use rage_extract::{decode_drawable, ScanSettings};

fuzz_target!(|data: &[u8]| {
    let settings = ScanSettings {
        prefer_best_drawable: data.first().is_some_and(|b| b & 1 == 1),
        ..ScanSettings::default()
    };
    if let Ok(drawable) = decode_drawable(data, &settings) {
        // every accepted mesh upholds the index invariant
        for mesh in drawable.models.iter().flat_map(|m| m.meshes.iter()) {
            assert_eq!(mesh.positions.len() % 3, 0);
            let vertex_count = mesh.vertex_count() as u32;
            assert!(mesh.indices.iter().all(|&i| i < vertex_count));
        }
    }
});
