#![no_main]
#[macro_use] extern crate libfuzzer_sys;
extern crate rastergif;

fuzz_target!(|data: &[u8]| {
    let _ = decode(data);
});

fn decode(data: &[u8]) -> Result<(), rastergif::ImageError> {
    let mut limits = rastergif::Limits::no_limits();
    limits.max_alloc = Some(4_000_000);
    let mut decoder = rastergif::gif::GifDecoder::new(std::io::Cursor::new(data))?;
    decoder.set_limits(limits)?;
    while decoder.next_frame()?.is_some() {}
    Ok(())
}
