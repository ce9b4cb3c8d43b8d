#![no_main]

// Texture dictionary location over arbitrary bytes must either fail with a
// typed error or produce shape-valid textures.

use libfuzzer_sys::fuzz_target;
use rage_extract::decode_texture_dictionary;

fuzz_target!(|data: &[u8]| {
    if let Ok(dictionary) = decode_texture_dictionary(data) {
        for texture in dictionary.values() {
            assert!(texture.width.is_power_of_two());
            assert!(texture.height.is_power_of_two());
            assert_eq!(texture.rgba.len(), texture.width * texture.height * 4);
            assert_eq!(texture.mip_count, 1 + texture.mipmaps.len());
        }
    }
});
