//! Region measurements on label maps

use crate::{Label, LabelMap};

/// Size in pixels of the largest 8-connected region of `label`, `0` if the label is absent
///
/// Only the first `width * height` entries of `map.labels` are considered.
#[must_use]
pub fn largest_component(map: &LabelMap, label: Label) -> usize {
	let width = map.width as usize;
	if width == 0 || map.height == 0 {
		return 0;
	}

	let mut visited = map.mask(label).into_iter().map(|m| !m).collect::<Vec<_>>();
	visited.truncate(width.saturating_mul(map.height as usize));
	let height = visited.len().div_ceil(width);
	let mut stack = Vec::new();
	let mut largest = 0;

	for start in 0..visited.len() {
		if visited[start] {
			continue;
		}

		visited[start] = true;
		stack.push(start);
		let mut size = 0;

		while let Some(i) = stack.pop() {
			size += 1;
			let (x, y) = (i % width, i / width);
			for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
				for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
					let j = ny * width + nx;
					if visited.get(j) == Some(&false) {
						visited[j] = true;
						stack.push(j);
					}
				}
			}
		}

		largest = largest.max(size);
	}

	largest
}

/// Physical area covered by `pixels` pixels when each pixel spans `units_per_pixel` in both directions
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pixels_to_area(pixels: usize, units_per_pixel: f64) -> f64 {
	pixels as f64 * units_per_pixel * units_per_pixel
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Build a map from rows of `p` (product), `d` (defect), and `.` (unknown)
	#[allow(clippy::cast_possible_truncation)]
	fn map(rows: &[&str]) -> LabelMap {
		let labels = rows
			.iter()
			.flat_map(|row| {
				row.chars().map(|c| match c {
					'p' => Some(Label::Product),
					'd' => Some(Label::Defect),
					_ => None,
				})
			})
			.collect();

		LabelMap { width: rows[0].len() as u32, height: rows.len() as u32, labels }
	}

	#[test]
	fn diagonal_neighbors_connect() {
		let m = map(&["p..", ".p.", "..p"]);
		assert_eq!(largest_component(&m, Label::Product), 3);
	}

	#[test]
	fn picks_largest_region() {
		let m = map(&["pp..p", "pp..p", "....d", "dd..."]);
		assert_eq!(largest_component(&m, Label::Product), 4);
		assert_eq!(largest_component(&m, Label::Defect), 2);
		assert_eq!(largest_component(&m, Label::Background), 0);
	}

	#[test]
	fn single_row_and_column() {
		assert_eq!(largest_component(&map(&["pp.ppp"]), Label::Product), 3);
		assert_eq!(largest_component(&map(&["p", "p", ".", "p"]), Label::Product), 2);
	}

	#[test]
	fn labels_not_matching_dimensions() {
		let zero_width = LabelMap { width: 0, height: 2, labels: vec![Some(Label::Product); 4] };
		assert_eq!(largest_component(&zero_width, Label::Product), 0);

		let short = LabelMap { width: 3, height: 2, labels: vec![Some(Label::Product); 4] };
		assert_eq!(largest_component(&short, Label::Product), 4);

		let long = LabelMap { width: 2, height: 1, labels: vec![Some(Label::Product); 6] };
		assert_eq!(largest_component(&long, Label::Product), 2);
	}

	#[test]
	fn area_scales_quadratically() {
		assert!((pixels_to_area(100, 0.5) - 25.0).abs() < 1e-12);
		assert!((pixels_to_area(0, 3.0)).abs() < 1e-12);
	}
}
