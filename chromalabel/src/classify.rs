//! Label assignment parameterized by color space and policy
//!
//! Three assignment policies are in use, each by a different caller:
//!
//! | Component                          | Space | Policy                       |
//! |------------------------------------|-------|------------------------------|
//! | [`crate::classify_lab_sphere`]     | Lab   | [`Policy::NearestDistance`]  |
//! | [`crate::make_pixel_map`]          | RGB   | [`Policy::CategoryPriority`] |
//! | [`classify_rgb`]                   | RGB   | [`Policy::FirstMatch`]       |
//!
//! [`Classifier`] exposes every combination so a caller picks one explicitly.

use crate::{
	convert::{image_pixels, rgb_to_lab},
	error::{check_dimensions, Result},
	nearest::squared_distance,
	ColorDefs, Label, LabelMap,
};
use image::RgbImage;
use palette::{Lab, Srgb};

/// The color space spheres and pixels are compared in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Space {
	/// Integer RGB distance
	#[default]
	Rgb,
	/// CIE Lab distance, sphere centers converted from RGB and radii taken as Lab distances
	Lab,
}

/// How a pixel contained by spheres of several labels is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
	/// The label of the closest containing sphere, first sphere in store order winning ties
	NearestDistance,
	/// The first label in [`Label::PRIORITY`] with any containing sphere
	#[default]
	CategoryPriority,
	/// The first label in store order with any containing sphere
	FirstMatch,
}

/// A three channel color space spheres can be evaluated in
trait SphereSpace {
	/// Color representation
	type Color: Copy + Send + Sync;
	/// Squared distance representation
	type Distance: Copy + PartialOrd + Send + Sync;

	/// Convert an sRGB color into this space
	fn color(srgb: Srgb<u8>) -> Self::Color;

	/// Squared distance between two colors
	fn squared_distance(x: Self::Color, y: Self::Color) -> Self::Distance;

	/// Squared radius, `None` for a radius that contains nothing
	fn squared_radius(radius: u32) -> Option<Self::Distance>;
}

/// Integer RGB
struct RgbSpace;

impl SphereSpace for RgbSpace {
	type Color = Srgb<u8>;
	type Distance = u64;

	fn color(srgb: Srgb<u8>) -> Self::Color {
		srgb
	}

	fn squared_distance(x: Self::Color, y: Self::Color) -> Self::Distance {
		let [dr, dg, db] = [
			x.red.abs_diff(y.red),
			x.green.abs_diff(y.green),
			x.blue.abs_diff(y.blue),
		]
		.map(u64::from);
		dr * dr + dg * dg + db * db
	}

	fn squared_radius(radius: u32) -> Option<Self::Distance> {
		(radius > 0).then(|| u64::from(radius) * u64::from(radius))
	}
}

/// CIE Lab
struct LabSpace;

impl SphereSpace for LabSpace {
	type Color = Lab;
	type Distance = f32;

	fn color(srgb: Srgb<u8>) -> Self::Color {
		rgb_to_lab(srgb)
	}

	fn squared_distance(x: Self::Color, y: Self::Color) -> Self::Distance {
		squared_distance(x, y)
	}

	#[allow(clippy::cast_precision_loss)]
	fn squared_radius(radius: u32) -> Option<Self::Distance> {
		let radius = radius as f32;
		(radius > 0.0).then_some(radius * radius)
	}
}

/// A snapshot of the store's spheres converted into a color space
struct Prepared<S: SphereSpace> {
	/// `(center, squared radius)` for each label indexed by [`Label::index`], degenerate spheres removed
	spheres: [Vec<(S::Color, S::Distance)>; 3],
}

impl<S: SphereSpace> Prepared<S> {
	/// Convert the spheres of `defs`
	fn new(defs: &ColorDefs) -> Self {
		let prepare = |label| {
			defs.spheres(label)
				.iter()
				.filter_map(|sphere| Some((S::color(sphere.center), S::squared_radius(sphere.radius)?)))
				.collect()
		};

		Self {
			spheres: [prepare(Label::Background), prepare(Label::Product), prepare(Label::Defect)],
		}
	}

	/// Whether any sphere of `label` contains `color`
	fn hits(&self, label: Label, color: S::Color) -> bool {
		self.spheres[label.index()]
			.iter()
			.any(|&(center, r2)| S::squared_distance(color, center) <= r2)
	}

	/// The first label of `order` with a sphere containing `color`
	fn first_hit(&self, order: [Label; 3], color: S::Color) -> Option<Label> {
		order.into_iter().find(|&label| self.hits(label, color))
	}

	/// The label of the closest sphere containing `color`
	fn nearest_hit(&self, color: S::Color) -> Option<Label> {
		let mut best: Option<(Label, S::Distance)> = None;
		for label in Label::ALL {
			for &(center, r2) in &self.spheres[label.index()] {
				let dist = S::squared_distance(color, center);
				if dist <= r2 && best.is_none_or(|(_, min)| dist < min) {
					best = Some((label, dist));
				}
			}
		}
		best.map(|(label, _)| label)
	}

	/// Assign `color` a label under `policy`
	fn assign(&self, policy: Policy, color: S::Color) -> Option<Label> {
		match policy {
			Policy::NearestDistance => self.nearest_hit(color),
			Policy::CategoryPriority => self.first_hit(Label::PRIORITY, color),
			Policy::FirstMatch => self.first_hit(Label::ALL, color),
		}
	}

	/// Assign every pixel of an image a label under `policy`
	fn assign_all(&self, policy: Policy, pixels: &[Srgb<u8>]) -> Vec<Option<Label>> {
		#[cfg(feature = "threads")]
		{
			use rayon::prelude::*;
			pixels.par_iter().map(|&srgb| self.assign(policy, S::color(srgb))).collect()
		}
		#[cfg(not(feature = "threads"))]
		{
			pixels.iter().map(|&srgb| self.assign(policy, S::color(srgb))).collect()
		}
	}
}

/// Spheres prepared for the chosen space
enum Spheres {
	/// Prepared for [`Space::Rgb`]
	Rgb(Prepared<RgbSpace>),
	/// Prepared for [`Space::Lab`]
	Lab(Prepared<LabSpace>),
}

/// Assigns labels to pixels using a snapshot of a [`ColorDefs`]
///
/// Later changes to the store are not seen by an existing classifier.
pub struct Classifier {
	/// Assignment policy
	policy: Policy,
	/// Spheres converted into the chosen space
	spheres: Spheres,
}

impl Classifier {
	/// Snapshot `defs` for classification in `space` under `policy`
	#[must_use]
	pub fn new(defs: &ColorDefs, space: Space, policy: Policy) -> Self {
		let spheres = match space {
			Space::Rgb => Spheres::Rgb(Prepared::new(defs)),
			Space::Lab => Spheres::Lab(Prepared::new(defs)),
		};
		Self { policy, spheres }
	}

	/// The policy this classifier assigns with
	#[must_use]
	pub const fn policy(&self) -> Policy {
		self.policy
	}

	/// The color space this classifier compares in
	#[must_use]
	pub const fn space(&self) -> Space {
		match self.spheres {
			Spheres::Rgb(_) => Space::Rgb,
			Spheres::Lab(_) => Space::Lab,
		}
	}

	/// The label of a single color, `None` if no sphere contains it
	#[must_use]
	pub fn classify_pixel(&self, color: Srgb<u8>) -> Option<Label> {
		match &self.spheres {
			Spheres::Rgb(spheres) => spheres.assign(self.policy, RgbSpace::color(color)),
			Spheres::Lab(spheres) => spheres.assign(self.policy, LabSpace::color(color)),
		}
	}

	/// The label of every pixel of an image
	///
	/// # Errors
	/// Returns [`crate::Error::EmptyImage`] if the image has a zero-sized dimension.
	pub fn classify_image(&self, image: &RgbImage) -> Result<LabelMap> {
		check_dimensions(image.width(), image.height())?;

		let pixels = image_pixels(image);
		let labels = match &self.spheres {
			Spheres::Rgb(spheres) => spheres.assign_all(self.policy, pixels),
			Spheres::Lab(spheres) => spheres.assign_all(self.policy, pixels),
		};

		Ok(LabelMap { width: image.width(), height: image.height(), labels })
	}
}

/// The first label, in store order, with a sphere containing `color`
///
/// Spheres are scanned in insertion order using widened integer arithmetic.
/// Returns `None` (reported as `"unknown"`) if no sphere contains the color.
#[must_use]
pub fn classify_rgb(color: Srgb<u8>, defs: &ColorDefs) -> Option<Label> {
	defs.iter().find(|(_, sphere)| sphere.contains(color)).map(|(label, _)| label)
}
