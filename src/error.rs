use core::num::TryFromIntError;

/// An error from decoding a CEL, ANIM, or IMAG decode unit.
///
/// Every error is scoped to a single decode unit. The container and animation
/// decoders log the error, count it in their [`DecodeReport`](crate::DecodeReport),
/// and carry on with the next unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CelError {
  /// There weren't enough bytes for even a minimal header.
  InsufficientBytes,

  /// The bits per pixel value isn't one the format defines.
  IllegalBitDepth,

  /// An unpacked format was requested but neither the header, the preamble,
  /// nor the caller gave a width and height.
  UnknownDimensions,

  /// The declared width and/or height of this image is 0.
  WidthOrHeightZero,

  /// The image is too large.
  ///
  /// The decoder limits the width and height of images it processes to be
  /// 17,000 or less to prevent accidental out-of-memory problems.
  DimensionsTooLarge,

  /// A pixel data chunk had no header chunk before it.
  MissingHeader,

  /// The allocator couldn't give us enough space.
  AllocError,

  /// A checked math operation failed.
  CheckedMath,
}

impl core::fmt::Display for CelError {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    let s = match self {
      Self::InsufficientBytes => "not enough bytes for a header",
      Self::IllegalBitDepth => "illegal bits per pixel",
      Self::UnknownDimensions => "unpacked pixel data needs a known width and height",
      Self::WidthOrHeightZero => "width or height is zero",
      Self::DimensionsTooLarge => "width or height is larger than 17,000",
      Self::MissingHeader => "pixel data without a header chunk",
      Self::AllocError => "allocation failed",
      Self::CheckedMath => "checked math overflow",
    };
    f.write_str(s)
  }
}

#[cfg(feature = "alloc")]
impl From<alloc::collections::TryReserveError> for CelError {
  #[inline]
  fn from(_: alloc::collections::TryReserveError) -> Self {
    Self::AllocError
  }
}
impl From<TryFromIntError> for CelError {
  #[inline]
  fn from(_: TryFromIntError) -> Self {
    Self::CheckedMath
  }
}

/// Shorthand for results with a [`CelError`].
pub type CelResult<T> = Result<T, CelError>;
