//! Error types shared by the classifiers and the color definition store

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors reported to the caller instead of being raised as fatal faults
#[derive(Error, Debug)]
pub enum Error {
	/// The image has a zero-sized dimension
	#[error("image has a zero-sized dimension ({width}x{height})")]
	EmptyImage {
		/// Image width in pixels
		width: u32,
		/// Image height in pixels
		height: u32,
	},

	/// A raw component buffer does not hold exactly `width * height` three channel pixels
	#[error("buffer of {len} components does not match a {width}x{height} image with 3 channels")]
	BufferSize {
		/// Number of components in the buffer
		len: usize,
		/// Expected image width
		width: u32,
		/// Expected image height
		height: u32,
	},

	/// The persisted color definitions could not be parsed
	#[error("malformed color definitions: {0}")]
	Json(#[from] serde_json::Error),

	/// The persisted color definitions could not be read or written
	#[error("color definition file I/O failed: {0}")]
	Io(#[from] std::io::Error),

	/// A sphere definition was rejected
	#[error("invalid sphere definition: {0}")]
	InvalidSphere(#[from] InvalidSphere),
}

/// Reasons a raw sphere definition is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidSphere {
	/// The entry is not a `[center, radius]` pair
	#[error("expected a [[r, g, b], radius] pair")]
	Shape,
	/// The center does not have exactly three channels
	#[error("center has {0} channels instead of 3")]
	CenterArity(usize),
	/// A center channel or the radius is not an integer
	#[error("non-integer value {0}")]
	NotAnInteger(String),
	/// A center channel is outside `0..=255`
	#[error("channel value {0} is outside 0..=255")]
	ChannelRange(i64),
	/// The radius is negative or too large
	#[error("radius {0} is not a valid non-negative radius")]
	Radius(i64),
}

/// Returns [`Error::EmptyImage`] if either dimension is zero
pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<()> {
	if width == 0 || height == 0 {
		Err(Error::EmptyImage { width, height })
	} else {
		Ok(())
	}
}
