#![no_main]
#[macro_use] extern crate libfuzzer_sys;
extern crate rastergif;

use rastergif::gif::{Compression, GifEncoder};
use rastergif::{BitDepth, Raster};

fuzz_target!(|data: (u8, u8, u8, Vec<u8>)| {
    let (width, depth, compression, pixels) = data;
    let width = u32::from(width) + 1;
    let height = pixels.len() as u32 / width;
    if height == 0 {
        return;
    }
    let depth = match depth % 3 {
        0 => BitDepth::One,
        1 => BitDepth::Four,
        _ => BitDepth::Eight,
    };
    let compression = match compression % 3 {
        0 => Compression::None,
        1 => Compression::Lzw,
        _ => Compression::Rle,
    };

    let mut raster = Raster::new(width, height, depth).unwrap();
    for (i, &index) in pixels.iter().take((width * height) as usize).enumerate() {
        raster.set_index(i as u32 % width, i as u32 / width, index);
    }

    let mut encoded = Vec::new();
    let mut encoder = GifEncoder::new(&mut encoded);
    encoder.set_compression(compression);
    encoder.encode(&raster).unwrap();

    let decoded = rastergif::load_from_memory(&encoded).unwrap();
    assert_eq!(decoded.pixels(), raster.pixels());
});
