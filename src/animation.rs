use std::iter::Iterator;
use std::time::Duration;

use num_rational::Ratio;

use crate::error::ImageResult;
use crate::gif::DisposalMethod;
use crate::raster::Raster;

/// An implementation dependent iterator, reading the frames as requested
pub struct Frames<'a> {
    iterator: Box<dyn Iterator<Item = ImageResult<Frame>> + 'a>,
}

impl<'a> Frames<'a> {
    /// Creates a new `Frames` from an implementation specific iterator.
    #[must_use]
    pub fn new(iterator: Box<dyn Iterator<Item = ImageResult<Frame>> + 'a>) -> Self {
        Frames { iterator }
    }

    /// Steps through the iterator from the current frame until the end and pushes each frame into
    /// a `Vec`.
    /// If en error is encountered that error is returned instead.
    ///
    /// Note: This is equivalent to `Frames::collect::<ImageResult<Vec<Frame>>>()`
    pub fn collect_frames(self) -> ImageResult<Vec<Frame>> {
        self.collect()
    }
}

impl Iterator for Frames<'_> {
    type Item = ImageResult<Frame>;

    fn next(&mut self) -> Option<ImageResult<Frame>> {
        self.iterator.next()
    }
}

/// A single animation frame
#[derive(Clone, Debug)]
pub struct Frame {
    /// Delay between the frames
    delay: Delay,
    /// x offset
    left: u32,
    /// y offset
    top: u32,
    disposal: DisposalMethod,
    raster: Raster,
}

/// The delay of a frame relative to the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd)]
pub struct Delay {
    ratio: Ratio<u32>,
}

impl Frame {
    /// Contructs a new frame without any delay.
    #[must_use]
    pub fn new(raster: Raster) -> Frame {
        Frame {
            delay: Delay::from_ratio(Ratio::from_integer(0)),
            left: 0,
            top: 0,
            disposal: DisposalMethod::Unspecified,
            raster,
        }
    }

    /// Contructs a new frame
    #[must_use]
    pub fn from_parts(
        raster: Raster,
        left: u32,
        top: u32,
        delay: Delay,
        disposal: DisposalMethod,
    ) -> Frame {
        Frame {
            delay,
            left,
            top,
            disposal,
            raster,
        }
    }

    /// Delay of this frame
    #[must_use]
    pub fn delay(&self) -> Delay {
        self.delay
    }

    /// What happens to this frame's area before the next frame is drawn.
    #[must_use]
    pub fn disposal(&self) -> DisposalMethod {
        self.disposal
    }

    /// Returns the raster
    #[must_use]
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    /// Returns the raster
    #[must_use]
    pub fn into_raster(self) -> Raster {
        self.raster
    }

    /// Returns the x offset
    #[must_use]
    pub fn left(&self) -> u32 {
        self.left
    }

    /// Returns the y offset
    #[must_use]
    pub fn top(&self) -> u32 {
        self.top
    }
}

impl Delay {
    /// Create a delay from a ratio of milliseconds.
    ///
    /// # Examples
    ///
    /// ```
    /// use rastergif::Delay;
    /// let delay_10ms = Delay::from_num_denom_ms(10, 1);
    /// ```
    #[must_use]
    pub fn from_num_denom_ms(numerator: u32, denominator: u32) -> Self {
        let ratio = Ratio::new_raw(numerator, denominator);
        Delay::from_ratio(ratio)
    }

    /// The numerator and denominator of the delay in milliseconds.
    ///
    /// This is guaranteed to be an exact conversion if the `Delay` was previously created with the
    /// `from_num_denom_ms` constructor.
    #[must_use]
    pub fn numer_denom_ms(self) -> (u32, u32) {
        (*self.ratio.numer(), *self.ratio.denom())
    }

    /// Create a delay from the hundredths of a second stored in a GIF stream.
    #[must_use]
    pub fn from_centiseconds(centiseconds: u16) -> Self {
        Delay::from_ratio(Ratio::from_integer(u32::from(centiseconds) * 10))
    }

    /// The delay in hundredths of a second, rounded to the nearest and saturating at
    /// `u16::MAX`.
    #[must_use]
    pub fn to_centiseconds(self) -> u16 {
        let centis = (self.ratio / 10).round().to_integer();
        u16::try_from(centis).unwrap_or(u16::MAX)
    }

    pub(crate) fn from_ratio(ratio: Ratio<u32>) -> Self {
        Delay { ratio }
    }

    pub(crate) fn into_ratio(self) -> Ratio<u32> {
        self.ratio
    }
}

impl From<Delay> for Duration {
    fn from(delay: Delay) -> Self {
        let ratio = delay.into_ratio();
        let ms = ratio.to_integer();
        let rest = ratio.numer() % ratio.denom();
        let nanos = (u64::from(rest) * 1_000_000) / u64::from(*ratio.denom());
        Duration::from_millis(ms.into()) + Duration::from_nanos(nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::{Delay, Duration};

    #[test]
    fn simple() {
        let second = Delay::from_num_denom_ms(1000, 1);
        assert_eq!(Duration::from(second), Duration::from_secs(1));
    }

    #[test]
    fn fps_30() {
        let thirtieth = Delay::from_num_denom_ms(1000, 30);
        let duration = Duration::from(thirtieth);
        assert_eq!(duration.as_secs(), 0);
        assert_eq!(duration.subsec_millis(), 33);
        assert_eq!(duration.subsec_nanos(), 33_333_333);
        assert_eq!(thirtieth.to_centiseconds(), 3);
    }

    #[test]
    fn centiseconds() {
        let delay = Delay::from_centiseconds(7);
        assert_eq!(delay.numer_denom_ms(), (70, 1));
        assert_eq!(Duration::from(delay), Duration::from_millis(70));
        assert_eq!(delay.to_centiseconds(), 7);
        assert_eq!(Delay::from_num_denom_ms(15, 1).to_centiseconds(), 2);
        assert_eq!(
            Delay::from_num_denom_ms(u32::MAX, 1).to_centiseconds(),
            u16::MAX
        );
    }
}
