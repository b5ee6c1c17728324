//! The color definition store and its JSON persistence
//!
//! Persisted definitions are a JSON object with exactly the keys `background`, `product`, and `defect`.
//! Each value is an array of `[[r, g, b], radius]` pairs with integer channels in `0..=255`
//! and a non-negative integer radius.

use crate::{
	error::{InvalidSphere, Result},
	Label, Sphere,
};
use palette::Srgb;
use serde::Serialize;
use serde_json::{Map, Value};
use std::{collections::HashSet, fs, path::Path};

/// Spheres grouped by label, always defined for every label
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorDefs {
	/// Spheres for each label, indexed by [`Label::index`]
	spheres: [Vec<Sphere>; 3],
}

/// Summary of a successful load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
	/// Number of spheres loaded
	pub loaded: usize,
	/// Number of entries dropped because they were malformed or had an unknown label
	pub skipped: usize,
}

/// A sphere in its persisted `[[r, g, b], radius]` form
#[derive(Serialize)]
struct Entry([u8; 3], u32);

impl From<&Sphere> for Entry {
	fn from(sphere: &Sphere) -> Self {
		let Srgb { red, green, blue, .. } = sphere.center;
		Self([red, green, blue], sphere.radius)
	}
}

/// The persisted document, fields in the order they are written
#[derive(Serialize)]
struct Document {
	/// `background` spheres
	background: Vec<Entry>,
	/// `product` spheres
	product: Vec<Entry>,
	/// `defect` spheres
	defect: Vec<Entry>,
}

impl ColorDefs {
	/// Create a store with an empty sphere list for every label
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// The spheres under `label` in insertion order
	#[must_use]
	pub fn spheres(&self, label: Label) -> &[Sphere] {
		&self.spheres[label.index()]
	}

	/// Append a sphere to `label`
	pub fn add(&mut self, label: Label, sphere: Sphere) {
		self.spheres[label.index()].push(sphere);
	}

	/// Append spheres to `label` in the given order
	pub fn add_many(&mut self, label: Label, spheres: impl IntoIterator<Item = Sphere>) {
		self.spheres[label.index()].extend(spheres);
	}

	/// Add one sphere of `radius` for each distinct color of a pixel selection
	///
	/// Colors keep the order of their first occurrence. Returns the number of spheres added.
	pub fn add_selection(&mut self, label: Label, colors: impl IntoIterator<Item = Srgb<u8>>, radius: u32) -> usize {
		let mut seen = HashSet::new();
		let before = self.spheres(label).len();
		self.add_many(
			label,
			colors
				.into_iter()
				.filter(|color| seen.insert(color.into_u32::<palette::rgb::channels::Rgba>()))
				.map(|color| Sphere::new(color, radius)),
		);
		self.spheres(label).len() - before
	}

	/// Remove every sphere from every label
	pub fn clear(&mut self) {
		for spheres in &mut self.spheres {
			spheres.clear();
		}
	}

	/// Total number of spheres across all labels
	#[must_use]
	pub fn len(&self) -> usize {
		self.spheres.iter().map(Vec::len).sum()
	}

	/// Whether no label has any spheres
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.spheres.iter().all(Vec::is_empty)
	}

	/// All spheres in store order: label order, then insertion order
	pub fn iter(&self) -> impl Iterator<Item = (Label, &Sphere)> + '_ {
		Label::ALL
			.into_iter()
			.flat_map(move |label| self.spheres(label).iter().map(move |sphere| (label, sphere)))
	}

	/// Parse persisted definitions
	///
	/// Malformed entries and unknown label keys are skipped and counted in the [`LoadReport`].
	/// Labels missing from the document load as empty lists.
	///
	/// # Errors
	/// Returns [`crate::Error::Json`] if `text` is not a JSON object.
	pub fn from_json(text: &str) -> Result<(Self, LoadReport)> {
		let document: Map<String, Value> = serde_json::from_str(text)?;

		let mut defs = Self::new();
		let mut report = LoadReport::default();

		for (key, value) in &document {
			let Ok(label) = key.parse::<Label>() else {
				let skipped = value.as_array().map_or(1, Vec::len);
				log::warn!("Skipping {skipped} entries under unknown label '{key}'");
				report.skipped += skipped;
				continue;
			};

			let Some(entries) = value.as_array() else {
				log::warn!("Skipping label '{key}' since its value is not an array");
				report.skipped += 1;
				continue;
			};

			for (i, entry) in entries.iter().enumerate() {
				match parse_entry(entry) {
					Ok(sphere) => {
						defs.add(label, sphere);
						report.loaded += 1;
					},
					Err(e) => {
						log::warn!("Skipping {key}[{i}]: {e}");
						report.skipped += 1;
					},
				}
			}
		}

		Ok((defs, report))
	}

	/// Serialize all three labels, including empty ones
	///
	/// # Errors
	/// Returns [`crate::Error::Json`] if serialization fails.
	pub fn to_json(&self) -> Result<String> {
		let entries = |label| self.spheres(label).iter().map(Entry::from).collect();
		let document = Document {
			background: entries(Label::Background),
			product: entries(Label::Product),
			defect: entries(Label::Defect),
		};
		Ok(serde_json::to_string_pretty(&document)?)
	}

	/// Replace this store with the definitions persisted at `path`
	///
	/// # Errors
	/// The store is left unchanged if the file cannot be read or is not a JSON object.
	pub fn load(&mut self, path: impl AsRef<Path>) -> Result<LoadReport> {
		let path = path.as_ref();
		let text = fs::read_to_string(path)?;
		let (defs, report) = Self::from_json(&text)?;
		*self = defs;
		log::info!(
			"Loaded {} spheres from {} ({} skipped)",
			report.loaded,
			path.display(),
			report.skipped
		);
		Ok(report)
	}

	/// Persist every label to `path`, creating parent directories as needed
	///
	/// # Errors
	/// Returns [`crate::Error::Io`] if the file cannot be written.
	pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
		let path = path.as_ref();
		let json = self.to_json()?;
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}
		fs::write(path, json)?;
		log::info!("Saved {} spheres to {}", self.len(), path.display());
		Ok(())
	}

	/// Clear every label and immediately persist the empty store
	///
	/// # Errors
	/// Returns [`crate::Error::Io`] if the file cannot be written. The in-memory store is cleared regardless.
	pub fn reset(&mut self, path: impl AsRef<Path>) -> Result<()> {
		self.clear();
		self.save(path)
	}
}

/// Read an integral JSON number
fn integer(value: &Value) -> Result<i64, InvalidSphere> {
	if let Some(i) = value.as_i64() {
		return Ok(i);
	}

	match value.as_f64() {
		// integral floats such as `20.0` written by other tools
		#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
		Some(f) if f.fract() == 0.0 && f.abs() <= 9.0e15 => Ok(f as i64),
		_ => Err(InvalidSphere::NotAnInteger(value.to_string())),
	}
}

/// Parse one `[[r, g, b], radius]` entry
fn parse_entry(entry: &Value) -> Result<Sphere, InvalidSphere> {
	let Some([center, radius]) = entry.as_array().map(Vec::as_slice) else {
		return Err(InvalidSphere::Shape);
	};

	let center = center
		.as_array()
		.ok_or(InvalidSphere::Shape)?
		.iter()
		.map(integer)
		.collect::<Result<Vec<_>, _>>()?;

	Sphere::from_components(&center, integer(radius)?)
}
