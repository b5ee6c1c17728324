//! Pixel buffer and color space conversion
//!
//! CIE L\*a\*b\* colors are computed with `palette` through
//! sRGB → linear sRGB → XYZ (D65) → Lab, using single-precision floats.
//! L is in `0.0..=100.0`; a and b fall roughly within `-128.0..=127.0` for 8-bit inputs.

use crate::error::{check_dimensions, Error, Result};
use image::RgbImage;
use palette::{FromColor, Lab, Srgb};

/// Channel order of a raw 8-bit component buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
	/// Red, green, blue
	#[default]
	Rgb,
	/// Blue, green, red
	Bgr,
}

/// Interpret a raw `width * height * 3` component buffer as sRGB pixels
///
/// # Errors
/// Returns [`Error::EmptyImage`] for a zero-sized dimension
/// or [`Error::BufferSize`] if `components` has the wrong length.
pub fn srgb_pixels(components: &[u8], width: u32, height: u32, order: ChannelOrder) -> Result<Vec<Srgb<u8>>> {
	check_dimensions(width, height)?;

	let expected = u64::from(width) * u64::from(height) * 3;
	if u64::try_from(components.len()).ok() != Some(expected) {
		return Err(Error::BufferSize { len: components.len(), width, height });
	}

	let pixels = components.chunks_exact(3);
	Ok(match order {
		ChannelOrder::Rgb => pixels.map(|c| Srgb::new(c[0], c[1], c[2])).collect(),
		ChannelOrder::Bgr => pixels.map(|c| Srgb::new(c[2], c[1], c[0])).collect(),
	})
}

/// Build an [`RgbImage`] from a raw component buffer in the given channel order
///
/// # Errors
/// See [`srgb_pixels`].
pub fn rgb_image(components: &[u8], width: u32, height: u32, order: ChannelOrder) -> Result<RgbImage> {
	let pixels = srgb_pixels(components, width, height, order)?;
	let raw = palette::cast::into_component_vec(pixels);
	RgbImage::from_raw(width, height, raw).ok_or(Error::BufferSize {
		len: components.len(),
		width,
		height,
	})
}

/// The pixels of an image as sRGB colors
#[must_use]
pub fn image_pixels(image: &RgbImage) -> &[Srgb<u8>] {
	palette::cast::from_component_slice(image.as_raw())
}

/// Convert one sRGB color to Lab
///
/// Gives exactly the result [`srgb_to_lab`] gives for the same color in a buffer.
#[must_use]
pub fn rgb_to_lab(color: Srgb<u8>) -> Lab {
	lab_from_srgb(color)
}

/// Convert sRGB colors to Lab
#[must_use]
pub fn srgb_to_lab(pixels: &[Srgb<u8>]) -> Vec<Lab> {
	pixels.iter().copied().map(lab_from_srgb).collect()
}

/// Convert sRGB colors to Lab in parallel
#[cfg(feature = "threads")]
#[must_use]
pub fn srgb_to_lab_par(pixels: &[Srgb<u8>]) -> Vec<Lab> {
	use rayon::prelude::*;

	pixels.par_iter().copied().map(lab_from_srgb).collect()
}

/// Convert every pixel of an image to Lab
///
/// # Errors
/// Returns [`Error::EmptyImage`] if the image has a zero-sized dimension.
pub fn image_to_lab(image: &RgbImage) -> Result<Vec<Lab>> {
	check_dimensions(image.width(), image.height())?;

	#[cfg(feature = "threads")]
	let lab = srgb_to_lab_par(image_pixels(image));
	#[cfg(not(feature = "threads"))]
	let lab = srgb_to_lab(image_pixels(image));

	Ok(lab)
}

/// The sRGB → Lab pipeline for a single color
fn lab_from_srgb(color: Srgb<u8>) -> Lab {
	let color: Srgb<f32> = color.into_format();
	Lab::from_color(color)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;

	fn assert_lab_eq(x: Lab, y: Lab) {
		assert_abs_diff_eq!(x, y, epsilon = 0.01);
	}

	#[test]
	fn reference_vectors() {
		// CIE Lab (D65) of the sRGB primaries and neutrals
		let cases: [(Srgb<u8>, Lab); 6] = [
			(Srgb::new(0, 0, 0), Lab::new(0.0, 0.0, 0.0)),
			(Srgb::new(255, 255, 255), Lab::new(100.0, 0.0, 0.0)),
			(Srgb::new(255, 0, 0), Lab::new(53.24, 80.09, 67.20)),
			(Srgb::new(0, 255, 0), Lab::new(87.73, -86.18, 83.18)),
			(Srgb::new(0, 0, 255), Lab::new(32.30, 79.19, -107.86)),
			(Srgb::new(128, 128, 128), Lab::new(53.59, 0.0, 0.0)),
		];

		for (srgb, expected) in cases {
			assert_abs_diff_eq!(rgb_to_lab(srgb), expected, epsilon = 0.05);
		}
	}

	#[test]
	fn lightness_is_in_range() {
		for v in (0..=255).step_by(15) {
			for color in [Srgb::new(v, 0, 0), Srgb::new(0, v, 0), Srgb::new(0, 0, v), Srgb::new(v, v, v)] {
				let lab = rgb_to_lab(color);
				assert!((0.0..=100.01).contains(&lab.l), "{color:?} -> {lab:?}");
			}
		}
	}

	#[test]
	fn single_color_matches_buffer_conversion() {
		let pixels = [Srgb::new(10, 200, 30), Srgb::new(250, 3, 90)];
		let lab = srgb_to_lab(&pixels);
		for (&srgb, &lab) in pixels.iter().zip(&lab) {
			assert_lab_eq(rgb_to_lab(srgb), lab);
		}
	}

	#[test]
	fn bgr_buffers_are_reordered() {
		let rgb = srgb_pixels(&[1, 2, 3, 4, 5, 6], 2, 1, ChannelOrder::Rgb).unwrap();
		let bgr = srgb_pixels(&[3, 2, 1, 6, 5, 4], 2, 1, ChannelOrder::Bgr).unwrap();
		assert_eq!(rgb, bgr);
		assert_eq!(rgb[1], Srgb::new(4, 5, 6));
	}

	#[test]
	fn buffer_shape_is_validated() {
		assert!(matches!(
			srgb_pixels(&[], 0, 4, ChannelOrder::Rgb),
			Err(Error::EmptyImage { width: 0, height: 4 })
		));
		assert!(matches!(
			srgb_pixels(&[0; 11], 2, 2, ChannelOrder::Rgb),
			Err(Error::BufferSize { len: 11, .. })
		));
	}

	#[test]
	fn rgb_image_from_bgr_buffer() {
		let image = rgb_image(&[0, 0, 255, 255, 0, 0], 1, 2, ChannelOrder::Bgr).unwrap();
		assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0]);
		assert_eq!(image.get_pixel(0, 1).0, [0, 0, 255]);
	}

	#[test]
	fn empty_image_is_rejected() {
		assert!(matches!(
			image_to_lab(&RgbImage::new(3, 0)),
			Err(Error::EmptyImage { width: 3, height: 0 })
		));
	}
}
