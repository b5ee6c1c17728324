//! Labels, spheres, and the sentinel palette

use crate::error::InvalidSphere;
use image::Rgb;
use palette::Srgb;
use std::{fmt, str::FromStr};

/// Radius given to spheres created from picked pixels when none is specified
pub const DEFAULT_SPHERE_RADIUS: u32 = 20;

/// Sentinel color for pixels that matched no sphere
pub const UNKNOWN_SENTINEL: Rgb<u8> = Rgb([255, 0, 255]);

/// Name reported for pixels that matched no sphere
pub const UNKNOWN_NAME: &str = "unknown";

/// The closed set of semantic categories a sphere can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
	/// Anything that is neither product nor defect
	Background,
	/// The inspected item
	Product,
	/// A flaw on the inspected item
	Defect,
}

impl Label {
	/// All labels in store order
	pub const ALL: [Self; 3] = [Self::Background, Self::Product, Self::Defect];

	/// Labels in the fixed precedence used by category-priority assignment
	pub const PRIORITY: [Self; 3] = [Self::Product, Self::Defect, Self::Background];

	/// The key used for this label in persisted definitions
	#[must_use]
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Background => "background",
			Self::Product => "product",
			Self::Defect => "defect",
		}
	}

	/// The visualization color for this label
	#[must_use]
	pub const fn sentinel(self) -> Rgb<u8> {
		match self {
			Self::Background => Rgb([0, 0, 255]),
			Self::Product => Rgb([0, 255, 0]),
			Self::Defect => Rgb([0, 0, 0]),
		}
	}

	/// Position of this label in store order
	#[must_use]
	pub const fn index(self) -> usize {
		self as usize
	}
}

impl fmt::Display for Label {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned when parsing a name outside the closed label set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel(pub String);

impl fmt::Display for UnknownLabel {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "unknown label '{}', expected background, product, or defect", self.0)
	}
}

impl std::error::Error for UnknownLabel {}

impl FromStr for Label {
	type Err = UnknownLabel;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|label| label.as_str() == s)
			.ok_or_else(|| UnknownLabel(s.to_owned()))
	}
}

/// The reported name of a classification result
#[must_use]
pub fn label_name(label: Option<Label>) -> &'static str {
	label.map_or(UNKNOWN_NAME, Label::as_str)
}

/// The visualization color of a classification result
#[must_use]
pub fn sentinel(label: Option<Label>) -> Rgb<u8> {
	label.map_or(UNKNOWN_SENTINEL, Label::sentinel)
}

/// A ball in RGB space: every color within `radius` of `center` is inside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sphere {
	/// Center color
	pub center: Srgb<u8>,
	/// Euclidean radius, a radius of `0` contains nothing
	pub radius: u32,
}

impl Sphere {
	/// Create a sphere around `center`
	#[must_use]
	pub const fn new(center: Srgb<u8>, radius: u32) -> Self {
		Self { center, radius }
	}

	/// Validate raw integer values and build a sphere from them
	///
	/// # Errors
	/// Returns an [`InvalidSphere`] if `center` does not have three channels,
	/// a channel is outside `0..=255`, or `radius` is negative.
	pub fn from_components(center: &[i64], radius: i64) -> Result<Self, InvalidSphere> {
		let &[r, g, b] = center else {
			return Err(InvalidSphere::CenterArity(center.len()));
		};

		let channel = |c: i64| u8::try_from(c).map_err(|_| InvalidSphere::ChannelRange(c));
		let radius = u32::try_from(radius).map_err(|_| InvalidSphere::Radius(radius))?;

		Ok(Self::new(Srgb::new(channel(r)?, channel(g)?, channel(b)?), radius))
	}

	/// Squared RGB distance from the center, widened so it cannot overflow
	#[must_use]
	pub fn squared_distance(&self, color: Srgb<u8>) -> u32 {
		let dr = u32::from(self.center.red.abs_diff(color.red));
		let dg = u32::from(self.center.green.abs_diff(color.green));
		let db = u32::from(self.center.blue.abs_diff(color.blue));
		dr * dr + dg * dg + db * db
	}

	/// The squared radius, or `None` for a degenerate sphere that contains nothing
	#[must_use]
	pub fn squared_radius(&self) -> Option<u64> {
		(self.radius > 0).then(|| u64::from(self.radius) * u64::from(self.radius))
	}

	/// Whether `color` lies inside this sphere
	#[must_use]
	pub fn contains(&self, color: Srgb<u8>) -> bool {
		self.squared_radius()
			.is_some_and(|r2| u64::from(self.squared_distance(color)) <= r2)
	}
}
