//! Test enforcement of size and memory limits when decoding.
//!
//! We create a raster, encode it, and then decode it with limits that are too low. The decoder
//! has to fail before it allocates the frame.

use rastergif::gif::{GifDecoder, GifEncoder};
use rastergif::{BitDepth, ImageError, LimitErrorKind, Limits, Raster, MAX_RASTER_BYTES};

const WIDTH: u32 = 256;
const HEIGHT: u32 = 256;

fn test_image() -> Vec<u8> {
    let raster = Raster::new(WIDTH, HEIGHT, BitDepth::Eight).unwrap();
    let mut bytes: Vec<u8> = Vec::new();
    GifEncoder::new(&mut bytes).encode(&raster).unwrap();
    bytes
}

/// Returns `Limits` with width/height smaller than the test image
fn width_height_limits() -> Limits {
    let mut limits = Limits::no_limits();
    limits.max_image_width = Some(WIDTH / 2);
    limits.max_image_height = Some(HEIGHT / 2);
    limits
}

/// Returns `Limits` with allocation limit smaller than the test image
fn allocation_limits() -> Limits {
    let mut limits = Limits::no_limits();
    limits.max_alloc = Some(u64::from((WIDTH / 2) * (HEIGHT / 2)));
    limits
}

/// Returns `Limits` that allow decoding this image without issues
fn permissive_limits() -> Limits {
    let mut limits = Limits::no_limits();
    limits.max_image_width = Some(WIDTH);
    limits.max_image_height = Some(HEIGHT);
    // frame, canvas and the saved copy of the canvas
    limits.max_alloc = Some(u64::from(WIDTH * HEIGHT) * 3);
    limits
}

fn limit_kind(err: ImageError) -> LimitErrorKind {
    match err {
        ImageError::Limits(err) => err.kind(),
        other => panic!("expected a limit error, got {other:?}"),
    }
}

#[test]
fn permissive_limits_decode() {
    let bytes = test_image();
    let mut decoder = GifDecoder::new(&bytes[..]).unwrap();
    decoder.set_limits(permissive_limits()).unwrap();
    let raster = decoder.decode_frame(0).unwrap();
    assert_eq!((raster.width(), raster.height()), (WIDTH, HEIGHT));
}

#[test]
fn dimension_limits_are_checked_on_set() {
    let bytes = test_image();
    let mut decoder = GifDecoder::new(&bytes[..]).unwrap();
    let err = decoder.set_limits(width_height_limits()).unwrap_err();
    assert_eq!(limit_kind(err), LimitErrorKind::DimensionError);
}

#[test]
fn allocation_limits_stop_decoding() {
    let bytes = test_image();
    let mut decoder = GifDecoder::new(&bytes[..]).unwrap();
    decoder.set_limits(allocation_limits()).unwrap();
    let err = decoder.next_frame().unwrap_err();
    assert_eq!(limit_kind(err), LimitErrorKind::InsufficientMemory);
}

#[test]
fn hard_ceiling_applies_without_limits() {
    // 65535x65535 at 8 bits is well above the ceiling
    let side = u32::from(u16::MAX);
    assert!(side as usize * side as usize > MAX_RASTER_BYTES);
    let err = Raster::new(side, side, BitDepth::Eight).unwrap_err();
    assert_eq!(limit_kind(err), LimitErrorKind::InsufficientMemory);
}

#[test]
fn oversized_screen_in_stream_is_rejected_before_allocation() {
    let mut bytes = test_image();
    // widen the image descriptor, leaving the pixel data alone
    let descriptor = 13 + 256 * 3;
    assert_eq!(bytes[descriptor], 0x2C);
    bytes[descriptor + 5] = 0xFF;
    bytes[descriptor + 6] = 0xFF;
    bytes[descriptor + 7] = 0xFF;
    bytes[descriptor + 8] = 0xFF;

    let mut decoder = GifDecoder::new(&bytes[..]).unwrap();
    decoder.set_limits(Limits::no_limits()).unwrap();
    let err = decoder.next_frame().unwrap_err();
    assert_eq!(limit_kind(err), LimitErrorKind::InsufficientMemory);
}
