//! Sampling picked pixels and previewing a selection

use image::{Rgb, RgbImage};
use palette::Srgb;
use std::collections::HashSet;

/// Color painted over pixels matching a selection
pub const HIGHLIGHT: Rgb<u8> = Rgb([0, 255, 0]);

/// The color at `(x, y)`, or `None` outside the image
#[must_use]
pub fn pixel_at(image: &RgbImage, x: u32, y: u32) -> Option<Srgb<u8>> {
	image.get_pixel_checked(x, y).map(|&Rgb([r, g, b])| Srgb::new(r, g, b))
}

/// The colors at each in-bounds point, in the order given
pub fn sample_points<'a>(image: &'a RgbImage, points: &'a [(u32, u32)]) -> impl Iterator<Item = Srgb<u8>> + 'a {
	points.iter().filter_map(|&(x, y)| pixel_at(image, x, y))
}

/// Paint every pixel whose exact color is in `colors` with [`HIGHLIGHT`]
#[must_use]
pub fn highlight(image: &RgbImage, colors: &[Srgb<u8>]) -> RgbImage {
	let selected = colors
		.iter()
		.map(|color| color.into_u32::<palette::rgb::channels::Rgba>())
		.collect::<HashSet<_>>();

	let mut out = image.clone();
	for pixel in out.pixels_mut() {
		let Rgb([r, g, b]) = *pixel;
		if selected.contains(&Srgb::new(r, g, b).into_u32::<palette::rgb::channels::Rgba>()) {
			*pixel = HIGHLIGHT;
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> RgbImage {
		RgbImage::from_fn(3, 2, |x, y| if x == y { Rgb([10, 20, 30]) } else { Rgb([1, 2, 3]) })
	}

	#[test]
	fn pixel_at_checks_bounds() {
		let image = sample();
		assert_eq!(pixel_at(&image, 1, 1), Some(Srgb::new(10, 20, 30)));
		assert_eq!(pixel_at(&image, 2, 0), Some(Srgb::new(1, 2, 3)));
		assert_eq!(pixel_at(&image, 3, 0), None);
		assert_eq!(pixel_at(&image, 0, 2), None);
	}

	#[test]
	fn sample_points_skips_out_of_bounds() {
		let image = sample();
		let colors = sample_points(&image, &[(0, 0), (9, 9), (1, 0)]).collect::<Vec<_>>();
		assert_eq!(colors, [Srgb::new(10, 20, 30), Srgb::new(1, 2, 3)]);
	}

	#[test]
	fn highlight_paints_exact_matches_only() {
		let image = sample();
		let out = highlight(&image, &[Srgb::new(10, 20, 30), Srgb::new(10, 20, 31)]);
		for (x, y, &pixel) in out.enumerate_pixels() {
			if x == y {
				assert_eq!(pixel, HIGHLIGHT);
			} else {
				assert_eq!(pixel, *image.get_pixel(x, y));
			}
		}
	}
}
