//! Tiled, resolution-adaptive category-priority visualization
//!
//! The image is first reduced so that its longer side is at most [`PixelMapConfig::max_side`].
//! The working image is then split into bands of tile rows, and each band into square tiles.
//! Within a tile, labels are tried in [`Label::PRIORITY`] order and each label's spheres are
//! evaluated [`PixelMapConfig::sphere_chunk`] at a time, so the pixel × sphere work in flight
//! is bounded by `tile_size² × sphere_chunk` regardless of image size or sphere count.
//! Finally the sentinel image is scaled back up with nearest-neighbor sampling,
//! which never produces a color outside the sentinel palette.
//!
//! Bands cover disjoint rows of the output and of the assignment mask,
//! so with the `threads` feature they are processed in parallel without synchronization.

use crate::{
	error::{check_dimensions, Result},
	ColorDefs, Label, UNKNOWN_SENTINEL,
};
use image::{
	imageops::{self, FilterType},
	RgbImage,
};
use std::borrow::Cow;

/// Parameters bounding the cost of [`make_pixel_map`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelMapConfig {
	/// Longest side of the working resolution, `0` to always work at source resolution
	pub max_side: u32,
	/// Width and height of a tile in working pixels
	pub tile_size: u32,
	/// Number of spheres evaluated together against a tile
	pub sphere_chunk: usize,
}

impl Default for PixelMapConfig {
	fn default() -> Self {
		Self { max_side: 256, tile_size: 256, sphere_chunk: 256 }
	}
}

/// The working resolution for an image of the given size
///
/// Returns the source size if its longer side is within `max_side` or `max_side` is `0`.
#[must_use]
pub fn working_size(width: u32, height: u32, max_side: u32) -> (u32, u32) {
	let longest = width.max(height);
	if max_side == 0 || longest <= max_side {
		(width, height)
	} else {
		let scale = f64::from(max_side) / f64::from(longest);

		// multiplying by a positive factor < 1
		#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
		let (w, h) = ((f64::from(width) * scale) as u32, (f64::from(height) * scale) as u32);

		(w.max(1), h.max(1))
	}
}

/// One label's spheres with their squared radii, degenerate spheres removed
struct LabelSpheres {
	/// The label these spheres belong to
	label: Label,
	/// Sphere centers
	centers: Vec<[u8; 3]>,
	/// Squared radius of each sphere
	squared_radii: Vec<u32>,
}

impl LabelSpheres {
	/// Collect the spheres of every label in priority order, skipping labels without spheres
	fn prepare(defs: &ColorDefs) -> Vec<Self> {
		Label::PRIORITY
			.into_iter()
			.map(|label| {
				let (centers, squared_radii) = defs
					.spheres(label)
					.iter()
					.filter(|sphere| sphere.radius > 0)
					.map(|sphere| {
						let center = sphere.center;
						// the largest squared RGB distance is 3 * 255², far below u32::MAX
						([center.red, center.green, center.blue], sphere.radius.saturating_mul(sphere.radius))
					})
					.unzip();

				Self { label, centers, squared_radii }
			})
			.filter(|spheres| !spheres.centers.is_empty())
			.collect()
	}

	/// Mark each pixel that falls within any of these spheres
	fn hits(&self, pixels: &[[u8; 3]], chunk_size: usize, hit: &mut [bool]) {
		for (centers, squared_radii) in self.centers.chunks(chunk_size).zip(self.squared_radii.chunks(chunk_size)) {
			for (hit, &pixel) in hit.iter_mut().zip(pixels) {
				*hit = *hit || chunk_hits(pixel, centers, squared_radii);
			}
		}
	}
}

/// Whether `pixel` is within any sphere of a chunk
fn chunk_hits(pixel: [u8; 3], centers: &[[u8; 3]], squared_radii: &[u32]) -> bool {
	centers.iter().zip(squared_radii).any(|(center, &r2)| {
		let [dr, dg, db] = [0, 1, 2].map(|i| u32::from(pixel[i].abs_diff(center[i])));
		dr * dr + dg * dg + db * db <= r2
	})
}

/// Scratch buffers reused across the tiles of a band
#[derive(Default)]
struct TileScratch {
	/// Band-local indices of the tile's unassigned pixels
	pending: Vec<usize>,
	/// Colors of the pending pixels
	pixels: Vec<[u8; 3]>,
	/// Label assigned to each pending pixel so far
	labels: Vec<Option<Label>>,
	/// Whether each pending pixel is hit by the current label
	hit: Vec<bool>,
}

/// Classify every tile of a band of rows starting at working row `y0`
///
/// `out` holds the band's RGB components and `assigned` its assignment mask.
fn classify_band(
	working: &RgbImage,
	spheres: &[LabelSpheres],
	config: &PixelMapConfig,
	y0: u32,
	out: &mut [u8],
	assigned: &mut [bool],
) {
	let width = working.width();
	let rows = u32::try_from(assigned.len() / width as usize).unwrap_or(u32::MAX);
	let tile = config.tile_size.max(1);
	let chunk = config.sphere_chunk.max(1);
	let mut scratch = TileScratch::default();

	for x0 in (0..width).step_by(tile as usize) {
		let x1 = x0.saturating_add(tile).min(width);

		scratch.pending.clear();
		scratch.pixels.clear();
		for y in 0..rows {
			for x in x0..x1 {
				let i = y as usize * width as usize + x as usize;
				if !assigned[i] {
					scratch.pending.push(i);
					scratch.pixels.push(working.get_pixel(x, y0 + y).0);
				}
			}
		}

		if scratch.pending.is_empty() {
			continue;
		}

		scratch.labels.clear();
		scratch.labels.resize(scratch.pending.len(), None);

		for label_spheres in spheres {
			scratch.hit.clear();
			scratch.hit.resize(scratch.pending.len(), false);
			label_spheres.hits(&scratch.pixels, chunk, &mut scratch.hit);

			let mut remaining = 0;
			for (label, &hit) in scratch.labels.iter_mut().zip(&scratch.hit) {
				if label.is_none() {
					if hit {
						*label = Some(label_spheres.label);
					} else {
						remaining += 1;
					}
				}
			}

			if remaining == 0 {
				break;
			}
		}

		for (&i, &label) in scratch.pending.iter().zip(&scratch.labels) {
			if let Some(label) = label {
				out[i * 3..i * 3 + 3].copy_from_slice(&label.sentinel().0);
				assigned[i] = true;
			}
		}
	}
}

/// Paint each pixel of `image` with the sentinel color of its label
///
/// Labels are assigned by category priority: a pixel inside spheres of several labels takes the first of
/// `product`, `defect`, `background`, regardless of which center is closer.
/// Pixels inside no sphere are painted [`UNKNOWN_SENTINEL`], as is every pixel when the store is empty.
/// The result always has the dimensions of `image`.
///
/// # Errors
/// Returns [`crate::Error::EmptyImage`] if the image has a zero-sized dimension.
pub fn make_pixel_map(image: &RgbImage, defs: &ColorDefs, config: &PixelMapConfig) -> Result<RgbImage> {
	let (width, height) = image.dimensions();
	check_dimensions(width, height)?;

	let spheres = LabelSpheres::prepare(defs);
	if spheres.is_empty() {
		return Ok(RgbImage::from_pixel(width, height, UNKNOWN_SENTINEL));
	}

	let (work_width, work_height) = working_size(width, height, config.max_side);
	let working = if (work_width, work_height) == (width, height) {
		Cow::Borrowed(image)
	} else {
		Cow::Owned(imageops::thumbnail(image, work_width, work_height))
	};

	let tile = config.tile_size.max(1);
	log::debug!(
		"Pixel map of {width}x{height} at {work_width}x{work_height} with {} tiles",
		work_width.div_ceil(tile) * work_height.div_ceil(tile)
	);

	let mut out = RgbImage::from_pixel(work_width, work_height, UNKNOWN_SENTINEL);
	let mut assigned = vec![false; work_width as usize * work_height as usize];
	let band_len = tile as usize * work_width as usize;

	let process = |(band, (out, assigned)): (usize, (&mut [u8], &mut [bool]))| {
		// bands start at or below work_height
		#[allow(clippy::cast_possible_truncation)]
		let y0 = band as u32 * tile;
		classify_band(&working, &spheres, config, y0, out, assigned);
	};

	#[cfg(feature = "threads")]
	{
		use rayon::prelude::*;
		out.par_chunks_mut(band_len * 3)
			.zip(assigned.par_chunks_mut(band_len))
			.enumerate()
			.for_each(process);
	}
	#[cfg(not(feature = "threads"))]
	{
		out.chunks_mut(band_len * 3)
			.zip(assigned.chunks_mut(band_len))
			.enumerate()
			.for_each(process);
	}

	let result = if (work_width, work_height) == (width, height) {
		out
	} else {
		imageops::resize(&out, width, height, FilterType::Nearest)
	};

	debug_assert_eq!(result.dimensions(), (width, height));
	Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;
	use crate::{Classifier, LabelMap, Policy, Space, Sphere};
	use image::Rgb;
	use palette::Srgb;

	/// A deterministic image covering a broad spread of colors
	#[allow(clippy::cast_possible_truncation)]
	fn noise(width: u32, height: u32) -> RgbImage {
		RgbImage::from_fn(width, height, |x, y| {
			Rgb([
				((x * 37 + y * 11) % 256) as u8,
				((x * 5 + y * 53) % 256) as u8,
				((x * y + 7 * x) % 256) as u8,
			])
		})
	}

	fn many_spheres() -> ColorDefs {
		let mut defs = ColorDefs::new();
		for i in 0..40u8 {
			let label = Label::ALL[usize::from(i % 3)];
			let v = i.wrapping_mul(61);
			defs.add(label, Sphere::new(Srgb::new(v, v.wrapping_add(90), 255 - v), 10 + u32::from(i % 7) * 9));
		}
		defs.add(Label::Defect, Sphere::new(Srgb::new(0, 0, 0), 0));
		defs
	}

	fn green() -> RgbImage {
		RgbImage::from_pixel(4, 4, Rgb([0, 255, 0]))
	}

	#[test]
	fn single_product_sphere() {
		let mut defs = ColorDefs::new();
		defs.add(Label::Product, Sphere::new(Srgb::new(0, 255, 0), 5));

		let map = make_pixel_map(&green(), &defs, &PixelMapConfig::default()).unwrap();
		assert!(map.pixels().all(|&p| p == Label::Product.sentinel()));
	}

	#[test]
	fn empty_store_is_unknown() {
		let map = make_pixel_map(&green(), &ColorDefs::new(), &PixelMapConfig::default()).unwrap();
		assert_eq!(map.dimensions(), (4, 4));
		assert!(map.pixels().all(|&p| p == UNKNOWN_SENTINEL));
	}

	#[test]
	fn product_outranks_closer_defect() {
		let mut defs = ColorDefs::new();
		defs.add(Label::Defect, Sphere::new(Srgb::new(100, 100, 100), 30));
		defs.add(Label::Product, Sphere::new(Srgb::new(100, 100, 100), 10));
		defs.add(Label::Background, Sphere::new(Srgb::new(100, 100, 100), 50));

		// (105, 100, 100) is inside the product sphere, and (112, 100, 100) only inside defect and background
		let mut image = RgbImage::from_pixel(2, 1, Rgb([105, 100, 100]));
		image.put_pixel(1, 0, Rgb([112, 100, 100]));

		let map = make_pixel_map(&image, &defs, &PixelMapConfig::default()).unwrap();
		assert_eq!(*map.get_pixel(0, 0), Label::Product.sentinel());
		assert_eq!(*map.get_pixel(1, 0), Label::Defect.sentinel());
	}

	#[test]
	fn product_wins_even_when_defect_center_is_closer() {
		let mut defs = ColorDefs::new();
		defs.add(Label::Product, Sphere::new(Srgb::new(50, 50, 50), 20));
		defs.add(Label::Defect, Sphere::new(Srgb::new(62, 50, 50), 40));

		let image = RgbImage::from_pixel(3, 3, Rgb([60, 50, 50]));
		let map = make_pixel_map(&image, &defs, &PixelMapConfig::default()).unwrap();
		assert!(map.pixels().all(|&p| p == Label::Product.sentinel()));
	}

	#[test]
	fn output_only_contains_sentinels() {
		let image = noise(300, 170);
		for defs in [ColorDefs::new(), many_spheres()] {
			let map = make_pixel_map(&image, &defs, &PixelMapConfig::default()).unwrap();
			assert!(LabelMap::from_visualization(&map).is_some());
		}
	}

	#[test]
	fn output_dimensions_match_input() {
		let defs = many_spheres();
		let config = PixelMapConfig { max_side: 16, tile_size: 5, sphere_chunk: 3 };
		for (width, height) in [(1, 1), (1, 40), (40, 1), (17, 16), (16, 17), (99, 3), (33, 64)] {
			let map = make_pixel_map(&noise(width, height), &defs, &config).unwrap();
			assert_eq!(map.dimensions(), (width, height));
			assert!(LabelMap::from_visualization(&map).is_some());
		}
	}

	#[test]
	fn tiling_and_chunking_do_not_change_result() {
		let image = noise(70, 45);
		let defs = many_spheres();
		let whole = PixelMapConfig { max_side: 0, tile_size: 256, sphere_chunk: 256 };
		let expected = make_pixel_map(&image, &defs, &whole).unwrap();

		for (tile_size, sphere_chunk) in [(1, 1), (7, 2), (16, 5), (64, 13), (0, 0)] {
			let config = PixelMapConfig { max_side: 0, tile_size, sphere_chunk };
			assert_eq!(make_pixel_map(&image, &defs, &config).unwrap(), expected);
		}
	}

	#[test]
	fn matches_category_priority_classifier() {
		let image = noise(50, 40);
		let defs = many_spheres();
		let config = PixelMapConfig { max_side: 0, tile_size: 16, sphere_chunk: 4 };

		let map = make_pixel_map(&image, &defs, &config).unwrap();
		let expected = Classifier::new(&defs, Space::Rgb, Policy::CategoryPriority)
			.classify_image(&image)
			.unwrap()
			.to_visualization();

		assert_eq!(map, expected);
	}

	#[test]
	fn upscaling_keeps_hard_edges() {
		let image = RgbImage::from_fn(64, 40, |x, _| if x < 32 { Rgb([200, 0, 0]) } else { Rgb([0, 0, 200]) });
		let mut defs = ColorDefs::new();
		defs.add(Label::Product, Sphere::new(Srgb::new(200, 0, 0), 10));
		defs.add(Label::Background, Sphere::new(Srgb::new(0, 0, 200), 10));

		let config = PixelMapConfig { max_side: 16, ..PixelMapConfig::default() };
		let map = make_pixel_map(&image, &defs, &config).unwrap();

		assert_eq!(map.dimensions(), (64, 40));
		for y in 0..40 {
			assert_eq!(*map.get_pixel(0, y), Label::Product.sentinel());
			assert_eq!(*map.get_pixel(63, y), Label::Background.sentinel());
		}
		assert!(map
			.pixels()
			.all(|&p| p == Label::Product.sentinel() || p == Label::Background.sentinel()));
	}

	#[test]
	fn working_size_bounds_longer_side() {
		assert_eq!(working_size(100, 50, 256), (100, 50));
		assert_eq!(working_size(256, 10, 256), (256, 10));
		assert_eq!(working_size(1024, 512, 256), (256, 128));
		assert_eq!(working_size(300, 1200, 256), (64, 256));
		assert_eq!(working_size(5000, 3, 256), (256, 1));
		assert_eq!(working_size(5000, 3, 0), (5000, 3));
	}

	#[test]
	fn empty_image_is_rejected() {
		assert!(make_pixel_map(&RgbImage::new(0, 0), &many_spheres(), &PixelMapConfig::default()).is_err());
		assert!(make_pixel_map(&RgbImage::new(4, 0), &ColorDefs::new(), &PixelMapConfig::default()).is_err());
	}
}
