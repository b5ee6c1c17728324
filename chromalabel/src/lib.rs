//! Label image pixels as background, product, or defect using color spheres.
//!
//! A [`ColorDefs`] store holds, for each [`Label`], a list of [`Sphere`]s:
//! a center color and a radius. A pixel inside one of a label's spheres may be given that label.
//! How overlapping spheres of different labels are resolved depends on the caller:
//!
//! - [`make_pixel_map`] paints a sentinel color visualization by category priority
//!   (`product`, then `defect`, then `background`), working on a reduced, tiled copy of the image.
//! - [`classify_lab_sphere`] reports, for each pixel of a Lab image, the closest containing sphere.
//! - [`classify_rgb`] reports the first label, in store order, with a sphere containing a single color.
//! - [`Classifier`] exposes any [`Space`] and [`Policy`] combination explicitly.
//!
//! # Examples
//!
//! ## Visualize an image
//!
//! ```no_run
//! use chromalabel::{ColorDefs, PixelMapConfig};
//!
//! let mut defs = ColorDefs::new();
//! defs.load("data/color_defs.json").unwrap();
//!
//! let image = image::open("some image").unwrap().into_rgb8();
//! let map = chromalabel::make_pixel_map(&image, &defs, &PixelMapConfig::default()).unwrap();
//! ```
//!
//! ## Classify a single color
//!
//! ```
//! use chromalabel::{ColorDefs, Label, Sphere};
//! use palette::Srgb;
//!
//! let mut defs = ColorDefs::new();
//! defs.add(Label::Background, Sphere::new(Srgb::new(0, 0, 0), 20));
//!
//! assert_eq!(chromalabel::classify_rgb(Srgb::new(10, 10, 10), &defs), Some(Label::Background));
//! assert_eq!(chromalabel::classify_rgb(Srgb::new(30, 10, 10), &defs), None);
//! ```
//!
//! ## Nearest sphere in Lab
//!
//! ```no_run
//! use chromalabel::ColorDefs;
//!
//! let defs = ColorDefs::new();
//! let image = image::open("some image").unwrap().into_rgb8();
//! let lab = chromalabel::image_to_lab(&image).unwrap();
//!
//! let spheres = chromalabel::lab_spheres(&defs);
//! let lab_spheres = spheres.iter().map(|&(_, sphere)| sphere).collect::<Vec<_>>();
//! let indices = chromalabel::classify_lab_sphere(&lab, image.width(), image.height(), &lab_spheres).unwrap();
//! ```
//!
//! # Sharing a store
//!
//! Classification borrows the store immutably for its whole duration, so it always sees one consistent set of
//! spheres. Callers that edit the store from another thread should guard it with a lock and classify while holding
//! a read guard, or classify from a [`Classifier`], which keeps its own snapshot.

#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::cargo)]
#![warn(clippy::use_debug, clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
#![warn(clippy::unwrap_used, clippy::unwrap_in_result)]
#![warn(clippy::unneeded_field_pattern, clippy::rest_pat_in_fully_bound_structs)]
#![warn(clippy::unnecessary_self_imports)]
#![warn(clippy::str_to_string, clippy::string_to_string, clippy::string_slice)]
#![warn(missing_docs, clippy::missing_docs_in_private_items, rustdoc::all)]
#![warn(clippy::float_cmp_const, clippy::lossy_float_literal)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::unreadable_literal)]

mod classify;
mod convert;
mod error;
mod map;
mod metrics;
mod nearest;
mod pixel_map;
mod select;
mod sphere;
mod store;

pub use classify::{classify_rgb, Classifier, Policy, Space};
#[cfg(feature = "threads")]
pub use convert::srgb_to_lab_par;
pub use convert::{image_pixels, image_to_lab, rgb_image, rgb_to_lab, srgb_pixels, srgb_to_lab, ChannelOrder};
pub use error::{Error, InvalidSphere, Result};
pub use map::{LabelCounts, LabelMap};
pub use metrics::{largest_component, pixels_to_area};
pub use nearest::{classify_lab_sphere, lab_spheres, IndexMap, LabSphere, UNMATCHED};
pub use pixel_map::{make_pixel_map, working_size, PixelMapConfig};
pub use select::{highlight, pixel_at, sample_points, HIGHLIGHT};
pub use sphere::{label_name, sentinel, Label, Sphere, UnknownLabel, DEFAULT_SPHERE_RADIUS, UNKNOWN_NAME, UNKNOWN_SENTINEL};
pub use store::{ColorDefs, LoadReport};

pub use image::RgbImage;
pub use palette::{Lab, Srgb};
