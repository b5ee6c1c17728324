//! Per-pixel label maps and their sentinel color visualization

use crate::{sphere::sentinel, Label};
use image::{Rgb, RgbImage};

/// A `width` by `height` map of classification results in row-major order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
	/// Map width
	pub width: u32,
	/// Map height
	pub height: u32,
	/// The label of each pixel, `None` for unknown
	pub labels: Vec<Option<Label>>,
}

/// Number of pixels assigned to each label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelCounts {
	/// Counts indexed by [`Label::index`]
	labeled: [usize; 3],
	/// Pixels that matched no sphere
	pub unknown: usize,
}

impl LabelCounts {
	/// Pixels assigned to `label`
	#[must_use]
	pub const fn get(&self, label: Label) -> usize {
		self.labeled[label.index()]
	}

	/// Total number of pixels counted
	#[must_use]
	pub fn total(&self) -> usize {
		self.labeled.iter().sum::<usize>() + self.unknown
	}

	/// Count one classification result
	fn add(&mut self, label: Option<Label>) {
		match label {
			Some(label) => self.labeled[label.index()] += 1,
			None => self.unknown += 1,
		}
	}
}

/// The label whose sentinel is `color`
fn from_sentinel(color: Rgb<u8>) -> Option<Option<Label>> {
	if color == sentinel(None) {
		Some(None)
	} else {
		Label::ALL.into_iter().find(|label| label.sentinel() == color).map(Some)
	}
}

impl LabelMap {
	/// The label at the given pixel, `None` if out of bounds or past the end of `labels`
	#[must_use]
	pub fn get(&self, x: u32, y: u32) -> Option<Option<Label>> {
		if x < self.width && y < self.height {
			self.labels.get(y as usize * self.width as usize + x as usize).copied()
		} else {
			None
		}
	}

	/// Paint every pixel with the sentinel color of its label
	#[must_use]
	pub fn to_visualization(&self) -> RgbImage {
		let mut image = RgbImage::new(self.width, self.height);
		for (pixel, &label) in image.pixels_mut().zip(&self.labels) {
			*pixel = sentinel(label);
		}
		image
	}

	/// Recover labels from a sentinel visualization
	///
	/// Returns `None` if any pixel is not one of the four sentinel colors.
	#[must_use]
	pub fn from_visualization(image: &RgbImage) -> Option<Self> {
		let labels = image.pixels().map(|&pixel| from_sentinel(pixel)).collect::<Option<Vec<_>>>()?;
		Some(Self { width: image.width(), height: image.height(), labels })
	}

	/// Number of pixels with each label
	#[must_use]
	pub fn counts(&self) -> LabelCounts {
		let mut counts = LabelCounts::default();
		for &label in &self.labels {
			counts.add(label);
		}
		counts
	}

	/// A row-major mask of the pixels assigned `label`
	#[must_use]
	pub fn mask(&self, label: Label) -> Vec<bool> {
		self.labels.iter().map(|&l| l == Some(label)).collect()
	}
}
