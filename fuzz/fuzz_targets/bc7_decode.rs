#![no_main]

// Every one of the 2^128 possible BC7 blocks must decode deterministically
// without reading past the block.

use libfuzzer_sys::{arbitrary, fuzz_target};
use rage_extract_textures::block::bc7::decode_bc7_block;

#[derive(Clone, Debug, arbitrary::Arbitrary)]
pub struct Bc7Block {
    pub bytes: [u8; 16],
}

fuzz_target!(|block: Bc7Block| {
    let first = decode_bc7_block(&block.bytes);
    let second = decode_bc7_block(&block.bytes);
    assert_eq!(first, second);
});
