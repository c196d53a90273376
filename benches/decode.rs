use criterion::{criterion_group, criterion_main, Criterion};
use rastergif::gif::{Compression, GifDecoder, GifEncoder};
use rastergif::{BitDepth, Raster};

fn noise(size: u32) -> Raster {
    let mut raster = Raster::new(size, size, BitDepth::Eight).unwrap();
    let mut state = 0x9E37_79B9_u32;
    for y in 0..size {
        for x in 0..size {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            // mostly short runs, like a dithered photo
            let value = if state >> 28 == 0 { state >> 20 } else { (x + y) / 8 };
            raster.set_index(x, y, value as u8);
        }
    }
    raster
}

fn load_all(c: &mut Criterion) {
    let raster = noise(512);
    for (name, compression) in [
        ("copy", Compression::None),
        ("lzw", Compression::Lzw),
        ("rle", Compression::Rle),
    ] {
        for interlaced in [false, true] {
            let mut bytes = Vec::new();
            let mut encoder = GifEncoder::new(&mut bytes);
            encoder.set_compression(compression);
            encoder.set_interlaced(interlaced);
            encoder.encode(&raster).unwrap();

            let suffix = if interlaced { "-interlaced" } else { "" };
            c.bench_function(&format!("decode-{name}{suffix}"), |b| {
                b.iter(|| {
                    let decoder = GifDecoder::new(&bytes[..]).unwrap();
                    decoder.decode_frame(0).unwrap()
                });
            });
        }
    }
}

criterion_group!(benches, load_all);
criterion_main!(benches);
