//! Contains detailed error representation.
//!
//! See the main [`ImageError`] which contains a variant for each specialized error type. The
//! subtypes used in each variant are opaque by design. They can be roughly inspected through their
//! respective `kind` methods which work similar to `std::io::Error::kind`.
//!
//! The error interface makes it possible to inspect the error of the underlying codec stage
//! through the `Error::source` method. Note that this is not part of the stable interface and you
//! may not rely on a particular error value for a particular operation.
//!
//! [`ImageError`]: enum.ImageError.html

use std::error::Error;
use std::{fmt, io};

/// The generic error type for raster and codec operations.
///
/// This high level enum allows, by variant matching, a rough separation of concerns between
/// underlying IO, the caller, format specifications, and the implementation.
#[derive(Debug)]
pub enum ImageError {
    /// An error was encountered while decoding.
    ///
    /// This means that the input data did not conform to the GIF stream format, for example a
    /// bad signature, a truncated sub-block or an LZW stream that could not be recovered.
    Decoding(DecodingError),

    /// An error was encountered while encoding.
    ///
    /// The raster can not be represented in a GIF stream, for example because its dimensions do
    /// not fit into the 16-bit fields of the screen descriptor.
    Encoding(EncodingError),

    /// An error was encountered in input arguments.
    ///
    /// This is a catch-all case for caller misuse such as zero-sized targets or mismatched
    /// buffer lengths.
    Parameter(ParameterError),

    /// Completing the operation would have required more resources than allowed.
    ///
    /// Errors of this type are limits set by the user or the hard allocation ceiling, *not*
    /// inherent in a specific format or operation that was executed. They are always reported
    /// before the allocation is attempted.
    Limits(LimitError),

    /// An operation can not be completed by the chosen abstraction.
    Unsupported(UnsupportedError),

    /// An error occurred while interacting with the environment.
    IoError(io::Error),
}

/// The implementation for an operation was not provided.
///
/// See the variant [`Unsupported`] for more documentation.
///
/// [`Unsupported`]: enum.ImageError.html#variant.Unsupported
#[derive(Debug)]
pub struct UnsupportedError {
    kind: UnsupportedErrorKind,
}

/// Details what feature is not supported.
#[derive(Clone, Debug, Hash, PartialEq)]
#[non_exhaustive]
pub enum UnsupportedErrorKind {
    /// The requested bit depth can not be handled.
    BitDepth(u16),
}

/// An error was encountered while encoding an image.
///
/// This is used as an opaque representation for the [`ImageError::Encoding`] variant. See its
/// documentation for more information.
///
/// [`ImageError::Encoding`]: enum.ImageError.html#variant.Encoding
#[derive(Debug)]
pub struct EncodingError {
    underlying: Box<dyn Error + Send + Sync>,
}

/// An error was encountered in inputs arguments.
///
/// This is used as an opaque representation for the [`ImageError::Parameter`] variant. See its
/// documentation for more information.
///
/// [`ImageError::Parameter`]: enum.ImageError.html#variant.Parameter
#[derive(Debug)]
pub struct ParameterError {
    kind: ParameterErrorKind,
    underlying: Option<Box<dyn Error + Send + Sync>>,
}

/// Details how a parameter is malformed.
#[derive(Clone, Debug, Hash, PartialEq)]
#[non_exhaustive]
pub enum ParameterErrorKind {
    /// The dimensions passed are wrong.
    DimensionMismatch,
    /// A string describing the parameter.
    /// This is discouraged and is likely to get deprecated (but not removed).
    Generic(String),
    /// The requested frame does not exist in the stream.
    NoMoreData,
    /// The escape flag was raised while decoding.
    Cancelled,
}

/// An error was encountered while decoding an image.
///
/// This is used as an opaque representation for the [`ImageError::Decoding`] variant. See its
/// documentation for more information.
///
/// [`ImageError::Decoding`]: enum.ImageError.html#variant.Decoding
#[derive(Debug)]
pub struct DecodingError {
    underlying: Option<Box<dyn Error + Send + Sync>>,
}

/// Completing the operation would have required more resources than allowed.
///
/// This is used as an opaque representation for the [`ImageError::Limits`] variant. See its
/// documentation for more information.
///
/// [`ImageError::Limits`]: enum.ImageError.html#variant.Limits
#[derive(Debug)]
pub struct LimitError {
    kind: LimitErrorKind,
    // do we need an underlying error?
}

/// Indicates the limit that prevented an operation from completing.
///
/// Note that this enumeration is not exhaustive and may in the future be extended to provide more
/// detailed information or to incorporate other resources types.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
#[non_exhaustive]
#[allow(missing_copy_implementations)] // Might be non-Copy in the future.
pub enum LimitErrorKind {
    /// The resulting image exceed dimension limits in either direction.
    DimensionError,
    /// The operation would have performed an allocation larger than allowed.
    InsufficientMemory,
}

impl UnsupportedError {
    /// Create an `UnsupportedError` for the given kind.
    #[must_use]
    pub fn from_kind(kind: UnsupportedErrorKind) -> Self {
        UnsupportedError { kind }
    }

    /// Returns the corresponding `UnsupportedErrorKind` of the error.
    #[must_use]
    pub fn kind(&self) -> UnsupportedErrorKind {
        self.kind.clone()
    }
}

impl DecodingError {
    /// Create a `DecodingError` that stems from an arbitrary error of an underlying decoder.
    pub fn new(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        DecodingError {
            underlying: Some(err.into()),
        }
    }

    /// Create a `DecodingError` for an image format.
    ///
    /// The error will not contain any further information but is very easy to create.
    #[must_use]
    pub fn from_format_hint() -> Self {
        DecodingError { underlying: None }
    }
}

impl EncodingError {
    /// Create an `EncodingError` that stems from an arbitrary error of an underlying encoder.
    pub fn new(err: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        EncodingError {
            underlying: err.into(),
        }
    }
}

impl ParameterError {
    /// Construct a `ParameterError` directly from a corresponding kind.
    #[must_use]
    pub fn from_kind(kind: ParameterErrorKind) -> Self {
        ParameterError {
            kind,
            underlying: None,
        }
    }

    /// Returns the corresponding `ParameterErrorKind` of the error.
    #[must_use]
    pub fn kind(&self) -> ParameterErrorKind {
        self.kind.clone()
    }
}

impl LimitError {
    /// Construct a generic `LimitError` directly from a corresponding kind.
    #[must_use]
    pub fn from_kind(kind: LimitErrorKind) -> Self {
        LimitError { kind }
    }

    /// Returns the corresponding `LimitErrorKind` of the error.
    #[must_use]
    pub fn kind(&self) -> LimitErrorKind {
        self.kind.clone()
    }
}

impl ImageError {
    /// Shorthand for a `Parameter` error of the given kind.
    pub(crate) fn parameter(kind: ParameterErrorKind) -> Self {
        ImageError::Parameter(ParameterError::from_kind(kind))
    }

    /// Shorthand for a `Limits` error of the given kind.
    pub(crate) fn limits(kind: LimitErrorKind) -> Self {
        ImageError::Limits(LimitError::from_kind(kind))
    }
}

impl From<io::Error> for ImageError {
    fn from(err: io::Error) -> ImageError {
        // A stream that ends inside a block is malformed input, not an environment failure.
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ImageError::Decoding(DecodingError::new(err))
        } else {
            ImageError::IoError(err)
        }
    }
}

/// Result of an image decoding/encoding process
pub type ImageResult<T> = Result<T, ImageError>;

impl fmt::Display for ImageError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::IoError(err) => err.fmt(fmt),
            ImageError::Decoding(err) => err.fmt(fmt),
            ImageError::Encoding(err) => err.fmt(fmt),
            ImageError::Parameter(err) => err.fmt(fmt),
            ImageError::Limits(err) => err.fmt(fmt),
            ImageError::Unsupported(err) => err.fmt(fmt),
        }
    }
}

impl Error for ImageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ImageError::IoError(err) => err.source(),
            ImageError::Decoding(err) => err.source(),
            ImageError::Encoding(err) => err.source(),
            ImageError::Parameter(err) => err.source(),
            ImageError::Limits(err) => err.source(),
            ImageError::Unsupported(err) => err.source(),
        }
    }
}

impl fmt::Display for UnsupportedError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            UnsupportedErrorKind::BitDepth(depth) => {
                write!(fmt, "The bit depth {depth} is not supported")
            }
        }
    }
}

impl Error for UnsupportedError {}

impl fmt::Display for ParameterError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParameterErrorKind::DimensionMismatch => write!(
                fmt,
                "The Image's dimensions are either too \
                 small or too large"
            ),
            ParameterErrorKind::Generic(message) => {
                write!(fmt, "The parameter is malformed: {message}")
            }
            ParameterErrorKind::NoMoreData => write!(fmt, "The end of the image has been reached"),
            ParameterErrorKind::Cancelled => write!(fmt, "Decoding was cancelled"),
        }?;

        if let Some(underlying) = &self.underlying {
            write!(fmt, "\n{underlying}")?;
        }

        Ok(())
    }
}

impl Error for ParameterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.underlying {
            None => None,
            Some(source) => Some(&**source),
        }
    }
}

impl fmt::Display for EncodingError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "Format error encoding GIF:\n{}", self.underlying)
    }
}

impl Error for EncodingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.underlying)
    }
}

impl fmt::Display for DecodingError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.underlying {
            None => write!(fmt, "Format error decoding GIF"),
            Some(underlying) => write!(fmt, "Format error decoding GIF: {underlying}"),
        }
    }
}

impl Error for DecodingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.underlying {
            None => None,
            Some(source) => Some(&**source),
        }
    }
}

impl fmt::Display for LimitError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LimitErrorKind::InsufficientMemory => write!(fmt, "Memory limit exceeded"),
            LimitErrorKind::DimensionError => write!(fmt, "Image size exceeds limit"),
        }
    }
}

impl Error for LimitError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[allow(dead_code)]
    // This will fail to compile if the size of this type is large.
    const ASSERT_SMALLISH: usize = [0][(mem::size_of::<ImageError>() >= 200) as usize];

    #[test]
    fn test_send_sync_stability() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<ImageError>();
    }

    #[test]
    fn unexpected_eof_is_a_decoding_error() {
        let err = ImageError::from(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(err, ImageError::Decoding(_)));

        let err = ImageError::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, ImageError::IoError(_)));
    }
}
