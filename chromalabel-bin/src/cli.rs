//! Specifies the CLI and handles arg parsing

use chromalabel::{Label, Policy, Space, DEFAULT_SPHERE_RADIUS};
use clap::{Parser, Subcommand, ValueEnum};
use palette::Srgb;
use std::{
	fmt::{Debug, Display},
	num::ParseIntError,
	ops::RangeBounds,
	path::PathBuf,
	str::FromStr,
};

/// Color spaces in which sphere membership can be tested
#[derive(Copy, Clone, ValueEnum)]
pub enum SpaceArg {
	/// Integer distance between sRGB triples
	Rgb,
	/// Euclidean distance in CIE Lab
	Lab,
}

impl From<SpaceArg> for Space {
	fn from(space: SpaceArg) -> Self {
		match space {
			SpaceArg::Rgb => Space::Rgb,
			SpaceArg::Lab => Space::Lab,
		}
	}
}

/// Ways to pick a label when spheres of several labels contain a pixel
#[derive(Copy, Clone, ValueEnum)]
pub enum PolicyArg {
	/// The closest containing sphere wins
	Nearest,
	/// Product, then defect, then background
	Priority,
	/// Background, then product, then defect
	First,
}

impl From<PolicyArg> for Policy {
	fn from(policy: PolicyArg) -> Self {
		match policy {
			PolicyArg::Nearest => Policy::NearestDistance,
			PolicyArg::Priority => Policy::CategoryPriority,
			PolicyArg::First => Policy::FirstMatch,
		}
	}
}

/// Label image pixels as background, product, or defect using color spheres.
///
/// Color definitions are read from and written to a JSON file
/// holding a list of `[[r, g, b], radius]` entries for each label.
#[derive(Parser)]
#[command(version)]
pub struct Options {
	/// The operation to perform
	#[command(subcommand)]
	pub command: Command,

	/// The path to the color definitions file
	///
	/// A missing file is treated as an empty set of definitions.
	#[arg(long, global = true, env = "COLOR_DEFS_PATH", default_value = "data/color_defs.json")]
	pub defs: PathBuf,

	/// The longest side, in pixels, an image is reduced to before building a pixel map
	///
	/// A value of 0 keeps the full resolution.
	#[arg(long, global = true, env = "PIXEL_MAP_MAX_SIDE", default_value_t = 256)]
	pub max_side: u32,

	/// The side length, in pixels, of the square tiles a pixel map is built in
	#[arg(long, global = true, default_value_t = 256, value_parser = parse_positive_u32)]
	pub tile_size: u32,

	/// The number of spheres tested against a tile at once
	#[arg(long, global = true, default_value_t = 256, value_parser = parse_positive_usize)]
	pub sphere_chunk: usize,

	/// The number of threads to use
	///
	/// A value of 0 indicates to automatically choose the number of threads.
	#[cfg(feature = "threads")]
	#[arg(short, long, global = true, default_value_t = 0)]
	pub threads: u8,

	/// Print additional information, such as the time taken by each step
	#[arg(short, long, global = true)]
	pub verbose: bool,
}

/// The operations the CLI supports
#[derive(Subcommand)]
pub enum Command {
	/// Write a sentinel color pixel map of an image and print the pixel count of each label
	///
	/// Overlapping spheres are resolved by priority: product, then defect, then background.
	Map {
		/// The path to the input image
		image: PathBuf,

		/// The path to write the pixel map to
		#[arg(short, long, default_value = "pixel_map.png")]
		output: PathBuf,
	},

	/// Classify every pixel of an image and print counts and region sizes for each label
	Classify {
		/// The path to the input image
		image: PathBuf,

		/// The color space sphere membership is tested in
		#[arg(short, long, default_value = "lab")]
		space: SpaceArg,

		/// How to choose between labels whose spheres all contain a pixel
		#[arg(short, long, default_value = "nearest")]
		policy: PolicyArg,

		/// The physical length of one pixel side, used to print areas
		#[arg(short, long)]
		unit: Option<f64>,
	},

	/// Print the label of a single color
	Query {
		/// The color as r,g,b
		#[arg(value_parser = parse_rgb)]
		color: Srgb<u8>,
	},

	/// Add spheres centered at the given colors and save the definitions
	Add {
		/// One of background, product, or defect
		#[arg(value_parser = parse_label)]
		label: Label,

		/// The sphere centers as r,g,b
		#[arg(required = true, value_parser = parse_rgb)]
		colors: Vec<Srgb<u8>>,

		/// The radius of each new sphere
		#[arg(short, long, env = "SPHERE_RADIUS", default_value_t = DEFAULT_SPHERE_RADIUS)]
		radius: u32,
	},

	/// Add spheres centered at the colors of picked image pixels and save the definitions
	Pick {
		/// The path to the input image
		image: PathBuf,

		/// One of background, product, or defect
		#[arg(value_parser = parse_label)]
		label: Label,

		/// The picked pixels as x,y
		#[arg(required = true, value_parser = parse_point)]
		points: Vec<(u32, u32)>,

		/// The radius of each new sphere
		#[arg(short, long, env = "SPHERE_RADIUS", default_value_t = DEFAULT_SPHERE_RADIUS)]
		radius: u32,

		/// Write a copy of the image with the picked colors highlighted to this path
		#[arg(long)]
		highlight: Option<PathBuf>,
	},

	/// Print the color definitions of each label
	Show {
		/// Print each center as a true color swatch
		#[arg(short, long)]
		swatch: bool,
	},

	/// Remove every color definition and save the empty set
	Clear,
}

/// Parse an integer value and ensure it is in the provided, valid range
fn parse_int_in_range<T>(s: &str, range: impl RangeBounds<T> + Debug) -> Result<T, String>
where
	T: FromStr<Err = ParseIntError> + Display + PartialOrd,
{
	let value: T = s.trim().parse().map_err(|e| format!("{e}"))?;
	if range.contains(&value) {
		Ok(value)
	} else {
		Err(format!("{value} is not in {range:?}"))
	}
}

/// Parse a tile size and ensure it is not zero
fn parse_positive_u32(s: &str) -> Result<u32, String> {
	parse_int_in_range(s, 1..)
}

/// Parse a chunk size and ensure it is not zero
fn parse_positive_usize(s: &str) -> Result<usize, String> {
	parse_int_in_range(s, 1..)
}

/// Split `s` on commas and parse exactly `N` values with `parse`
fn parse_tuple<T: Default + Copy, const N: usize>(
	s: &str,
	parse: impl Fn(&str) -> Result<T, String>,
) -> Result<[T; N], String> {
	let parts = s.split(',').collect::<Vec<_>>();
	if parts.len() != N {
		return Err(format!("expected {N} comma separated values, got {}", parts.len()));
	}

	let mut values = [T::default(); N];
	for (value, part) in values.iter_mut().zip(parts) {
		*value = parse(part)?;
	}
	Ok(values)
}

/// Parse an `r,g,b` triple with each component in `0..=255`
fn parse_rgb(s: &str) -> Result<Srgb<u8>, String> {
	let [r, g, b] = parse_tuple(s, |c| parse_int_in_range::<u8>(c, ..))?;
	Ok(Srgb::new(r, g, b))
}

/// Parse an `x,y` pixel coordinate
fn parse_point(s: &str) -> Result<(u32, u32), String> {
	let [x, y] = parse_tuple(s, |c| parse_int_in_range::<u32>(c, ..))?;
	Ok((x, y))
}

/// Parse a label name
fn parse_label(s: &str) -> Result<Label, String> {
	s.parse().map_err(|e| format!("{e}"))
}
