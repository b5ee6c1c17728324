//! Whole-image nearest sphere classification in the Lab color space

use crate::{
	convert::rgb_to_lab,
	error::{check_dimensions, Error, Result},
	ColorDefs, Label, Sphere,
};
use palette::Lab;

/// Index reported for pixels that no sphere contains
pub const UNMATCHED: i32 = -1;

/// A sphere in Lab space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabSphere {
	/// Center color
	pub center: Lab,
	/// Radius in Lab units, a radius `<= 0.0` contains nothing
	pub radius: f32,
}

impl LabSphere {
	/// Create a sphere around `center`
	#[must_use]
	pub const fn new(center: Lab, radius: f32) -> Self {
		Self { center, radius }
	}

	/// Convert an RGB sphere, keeping its radius as a Lab distance
	#[must_use]
	#[allow(clippy::cast_precision_loss)]
	pub fn from_sphere(sphere: &Sphere) -> Self {
		Self::new(rgb_to_lab(sphere.center), sphere.radius as f32)
	}
}

/// Flatten the store into Lab spheres in store order
///
/// The position of each entry is the index reported by [`classify_lab_sphere`].
#[must_use]
pub fn lab_spheres(defs: &ColorDefs) -> Vec<(Label, LabSphere)> {
	defs.iter()
		.map(|(label, sphere)| (label, LabSphere::from_sphere(sphere)))
		.collect()
}

/// Squared Euclidean distance between two Lab colors
pub(crate) fn squared_distance(x: Lab, y: Lab) -> f32 {
	let dl = x.l - y.l;
	let da = x.a - y.a;
	let db = x.b - y.b;
	dl * dl + da * da + db * db
}

/// A `width` by `height` map of sphere indices in row-major order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMap {
	/// Map width
	pub width: u32,
	/// Map height
	pub height: u32,
	/// The index of the matched sphere for each pixel, or [`UNMATCHED`]
	pub indices: Vec<i32>,
}

impl IndexMap {
	/// The index at the given pixel
	#[must_use]
	pub fn get(&self, x: u32, y: u32) -> Option<i32> {
		(x < self.width && y < self.height)
			.then(|| self.indices[y as usize * self.width as usize + x as usize])
	}
}

/// The index of the closest sphere containing `color`, first seen winning ties
// sphere counts are far below i32::MAX
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn nearest(color: Lab, spheres: &[(Lab, f32)]) -> i32 {
	let mut min_dist = f32::INFINITY;
	let mut min_index = UNMATCHED;
	for (i, &(center, r2)) in spheres.iter().enumerate() {
		let dist = squared_distance(color, center);
		if dist <= r2 && dist < min_dist {
			min_dist = dist;
			min_index = i as i32;
		}
	}
	min_index
}

/// Assign each pixel of a Lab image the index of the closest sphere that contains it
///
/// `lab` holds `width * height` pixels in row-major order.
/// Pixels contained by no sphere, including every pixel when `spheres` is empty, are [`UNMATCHED`].
/// Spheres with a radius `<= 0.0` never match.
///
/// # Errors
/// Returns [`Error::EmptyImage`] for a zero-sized dimension
/// or [`Error::BufferSize`] if `lab` does not have `width * height` pixels.
pub fn classify_lab_sphere(lab: &[Lab], width: u32, height: u32, spheres: &[LabSphere]) -> Result<IndexMap> {
	check_dimensions(width, height)?;
	if u64::try_from(lab.len()).ok() != Some(u64::from(width) * u64::from(height)) {
		return Err(Error::BufferSize { len: lab.len() * 3, width, height });
	}

	// Degenerate spheres get a negative squared radius so that they never match
	let spheres = spheres
		.iter()
		.map(|s| (s.center, if s.radius > 0.0 { s.radius * s.radius } else { -1.0 }))
		.collect::<Vec<_>>();

	let indices = if spheres.is_empty() {
		vec![UNMATCHED; lab.len()]
	} else {
		#[cfg(feature = "threads")]
		{
			use rayon::prelude::*;
			lab.par_iter().map(|&color| nearest(color, &spheres)).collect()
		}
		#[cfg(not(feature = "threads"))]
		{
			lab.iter().map(|&color| nearest(color, &spheres)).collect()
		}
	};

	Ok(IndexMap { width, height, indices })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
	use super::*;
	use crate::convert::{image_to_lab, srgb_pixels, srgb_to_lab, ChannelOrder};
	use image::RgbImage;
	use palette::Srgb;

	#[test]
	fn solid_red_bgr_image_matches_its_own_color() {
		let bgr = [0, 0, 255].repeat(4);
		let lab = srgb_to_lab(&srgb_pixels(&bgr, 2, 2, ChannelOrder::Bgr).unwrap());
		let red = LabSphere::new(lab[0], 5.0);

		let map = classify_lab_sphere(&lab, 2, 2, &[red]).unwrap();
		assert!(map.indices.iter().all(|&i| i == 0));
	}

	#[test]
	fn empty_sphere_list_is_unmatched() {
		let lab = vec![Lab::new(50.0, 0.0, 0.0); 6];
		let map = classify_lab_sphere(&lab, 3, 2, &[]).unwrap();
		assert_eq!(map.indices, vec![UNMATCHED; 6]);
	}

	#[test]
	fn closest_containing_sphere_wins() {
		let lab = [Lab::new(50.0, 0.0, 0.0), Lab::new(50.0, 9.0, 0.0), Lab::new(0.0, 0.0, 0.0)];
		let spheres = [
			LabSphere::new(Lab::new(50.0, 10.0, 0.0), 30.0),
			LabSphere::new(Lab::new(50.0, 2.0, 0.0), 5.0),
			LabSphere::new(Lab::new(50.0, 0.0, 0.0), 1.0),
		];

		let map = classify_lab_sphere(&lab, 3, 1, &spheres).unwrap();
		assert_eq!(map.indices, [2, 0, UNMATCHED]);
	}

	#[test]
	fn ties_keep_the_first_sphere() {
		let lab = [Lab::new(50.0, 0.0, 0.0)];
		let spheres = [
			LabSphere::new(Lab::new(50.0, 3.0, 0.0), 4.0),
			LabSphere::new(Lab::new(50.0, -3.0, 0.0), 4.0),
		];
		let map = classify_lab_sphere(&lab, 1, 1, &spheres).unwrap();
		assert_eq!(map.indices, [0]);
	}

	#[test]
	fn degenerate_radius_never_matches() {
		let center = Lab::new(20.0, 5.0, 5.0);
		let spheres = [LabSphere::new(center, 0.0), LabSphere::new(center, -3.0)];
		let map = classify_lab_sphere(&[center], 1, 1, &spheres).unwrap();
		assert_eq!(map.indices, [UNMATCHED]);
	}

	#[test]
	#[allow(clippy::cast_possible_truncation)]
	fn matches_brute_force_definition() {
		let mut image = RgbImage::new(16, 16);
		for (x, y, pixel) in image.enumerate_pixels_mut() {
			pixel.0 = [(x * 16) as u8, (y * 16) as u8, ((x + y) * 8) as u8];
		}
		let lab = image_to_lab(&image).unwrap();
		let spheres = [
			LabSphere::from_sphere(&Sphere::new(Srgb::new(0, 0, 0), 30)),
			LabSphere::from_sphere(&Sphere::new(Srgb::new(128, 128, 128), 25)),
			LabSphere::from_sphere(&Sphere::new(Srgb::new(240, 16, 128), 40)),
			LabSphere::from_sphere(&Sphere::new(Srgb::new(100, 100, 100), 20)),
		];

		let map = classify_lab_sphere(&lab, 16, 16, &spheres).unwrap();

		for (&color, &index) in lab.iter().zip(&map.indices) {
			let hits = spheres
				.iter()
				.map(|s| squared_distance(color, s.center))
				.enumerate()
				.filter(|&(i, d)| d <= spheres[i].radius * spheres[i].radius)
				.collect::<Vec<_>>();

			match hits.iter().min_by(|x, y| f32::total_cmp(&x.1, &y.1)) {
				None => assert_eq!(index, UNMATCHED),
				Some(&(_, best)) => {
					let index = usize::try_from(index).unwrap();
					assert_eq!(squared_distance(color, spheres[index].center), best);
				},
			}
		}
	}

	#[test]
	fn lab_spheres_follow_store_order() {
		let mut defs = ColorDefs::new();
		defs.add(Label::Defect, Sphere::new(Srgb::new(0, 0, 0), 3));
		defs.add(Label::Background, Sphere::new(Srgb::new(255, 255, 255), 7));

		let spheres = lab_spheres(&defs);
		assert_eq!(spheres.len(), 2);
		assert_eq!(spheres[0].0, Label::Background);
		assert_eq!(spheres[1].0, Label::Defect);
		assert!((spheres[0].1.center.l - 100.0).abs() < 0.01);
		assert!((spheres[1].1.radius - 3.0).abs() < f32::EPSILON);
	}

	#[test]
	fn index_map_lookup() {
		let map = IndexMap { width: 2, height: 1, indices: vec![4, UNMATCHED] };
		assert_eq!(map.get(0, 0), Some(4));
		assert_eq!(map.get(1, 0), Some(UNMATCHED));
		assert_eq!(map.get(2, 0), None);
	}

	#[test]
	fn wrong_buffer_length_is_rejected() {
		assert!(classify_lab_sphere(&[Lab::new(0.0, 0.0, 0.0)], 2, 1, &[]).is_err());
		assert!(matches!(
			classify_lab_sphere(&[], 0, 0, &[]),
			Err(Error::EmptyImage { .. })
		));
	}
}
