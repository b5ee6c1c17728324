//! Label image pixels as background, product, or defect using color spheres.

#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::pedantic,
    clippy::cargo,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_to_string,
    clippy::string_slice,
    missing_docs,
    clippy::missing_docs_in_private_items,
    rustdoc::all,
    clippy::float_cmp_const,
    clippy::lossy_float_literal
)]
#![allow(
    clippy::doc_markdown,
    clippy::module_name_repetitions,
    clippy::many_single_char_names,
    clippy::missing_panics_doc,
    clippy::unreadable_literal
)]

mod cli;

#[allow(clippy::wildcard_imports)]
use cli::*;

use std::{
    fmt::{self, Display},
    path::Path,
    process::ExitCode,
    time::Instant,
};

use chromalabel::{
    Classifier, ColorDefs, Label, LabelCounts, LabelMap, PixelMapConfig, RgbImage, Sphere,
};
use clap::Parser;
use colored::Colorize;
use palette::Srgb;

/// Record the running time of a function and print the elapsed time
macro_rules! time {
    ($name: literal, $verbose: expr, $func_call: expr) => {{
        let start = Instant::now();
        let result = $func_call;
        if $verbose {
            println!("{} took {}ms", $name, start.elapsed().as_millis());
        }
        result
    }};
}

/// Error cases for the CLI operations
#[derive(Debug)]
enum CliError {
    /// Failed to read or decode the image file
    ImageLoad(image::ImageError),
    /// Failed to encode or write an output image
    ImageSave(image::ImageError),
    /// Failed to load or save the color definitions
    Defs(chromalabel::Error),
    /// Classification rejected the input image
    Classify(chromalabel::Error),
    /// None of the picked points were inside the image
    NoPixels {
        /// Image width
        width: u32,
        /// Image height
        height: u32,
    },
    /// Failed to build the thread pool
    #[cfg(feature = "threads")]
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CliError::ImageLoad(e) => write!(f, "Failed to load the image file: {e}"),
            CliError::ImageSave(e) => write!(f, "Failed to save the output image: {e}"),
            CliError::Defs(e) => write!(f, "Failed to access the color definitions: {e}"),
            CliError::Classify(e) => write!(f, "Failed to classify the image: {e}"),
            CliError::NoPixels { width, height } => {
                write!(f, "None of the picked points are inside the {width}x{height} image")
            }
            #[cfg(feature = "threads")]
            CliError::ThreadPool(e) => write!(f, "Failed to build the thread pool: {e}"),
        }
    }
}

fn main() -> ExitCode {
    let options = Options::parse();

    let level = if options.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = run_command(&options);

    // Returning Result<_> uses Debug printing instead of Display
    if let Err(e) = result {
        eprintln!("{e}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Builds a thread pool and then runs `command`
#[cfg(feature = "threads")]
fn run_command(options: &Options) -> Result<(), CliError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(usize::from(options.threads))
        .build()
        .map_err(CliError::ThreadPool)?;

    pool.install(|| command(options))
}

/// Runs `command` on a single thread
#[cfg(not(feature = "threads"))]
fn run_command(options: &Options) -> Result<(), CliError> {
    command(options)
}

/// Dispatch the parsed subcommand
fn command(options: &Options) -> Result<(), CliError> {
    // Clearing never reads the existing file, so it also recovers a corrupt one
    if matches!(options.command, Command::Clear) {
        return run_clear(options);
    }

    let defs = time!(
        "Loading definitions",
        options.verbose,
        load_defs(&options.defs)
    )?;

    match &options.command {
        Command::Map { image, output } => run_map(&defs, image, output, options),
        Command::Classify {
            image,
            space,
            policy,
            unit,
        } => {
            let classifier = Classifier::new(&defs, (*space).into(), (*policy).into());
            run_classify(&classifier, image, *unit, options.verbose)
        }
        Command::Query { color } => {
            let label = chromalabel::classify_rgb(*color, &defs);
            println!("{} {}", swatch(*color), label_text(label));
            Ok(())
        }
        Command::Add {
            label,
            colors,
            radius,
        } => run_add(defs, *label, colors, *radius, &options.defs),
        Command::Pick {
            image,
            label,
            points,
            radius,
            highlight,
        } => run_pick(
            defs,
            image,
            *label,
            points,
            *radius,
            highlight.as_deref(),
            options,
        ),
        Command::Show { swatch: show_swatch } => {
            print_defs(&defs, *show_swatch);
            Ok(())
        }
        Command::Clear => run_clear(options),
    }
}

/// Write the pixel map of an image and print the pixel count of each label
fn run_map(
    defs: &ColorDefs,
    image: &Path,
    output: &Path,
    options: &Options,
) -> Result<(), CliError> {
    let verbose = options.verbose;
    let image = time!("Image loading", verbose, load_image(image))?;
    let config = PixelMapConfig {
        max_side: options.max_side,
        tile_size: options.tile_size,
        sphere_chunk: options.sphere_chunk,
    };

    let map = time!(
        "Pixel map",
        verbose,
        chromalabel::make_pixel_map(&image, defs, &config)
    )
    .map_err(CliError::Classify)?;

    map.save(output).map_err(CliError::ImageSave)?;
    println!("Wrote {}", output.display());

    if let Some(labels) = LabelMap::from_visualization(&map) {
        print_counts(&labels.counts());
    }

    Ok(())
}

/// Classify an image and print counts and the largest region of each label
fn run_classify(
    classifier: &Classifier,
    image: &Path,
    unit: Option<f64>,
    verbose: bool,
) -> Result<(), CliError> {
    let image = time!("Image loading", verbose, load_image(image))?;
    let labels = time!("Classification", verbose, classifier.classify_image(&image))
        .map_err(CliError::Classify)?;

    print_counts(&labels.counts());
    for label in Label::ALL {
        let largest = time!(
            "Largest region",
            verbose,
            chromalabel::largest_component(&labels, label)
        );
        match unit {
            Some(unit) => println!(
                "{} largest region: {largest} px ({:.4} units\u{b2})",
                label_text(Some(label)),
                chromalabel::pixels_to_area(largest, unit)
            ),
            None => println!("{} largest region: {largest} px", label_text(Some(label))),
        }
    }

    Ok(())
}

/// Add spheres centered at `colors` and save the definitions
fn run_add(
    mut defs: ColorDefs,
    label: Label,
    colors: &[Srgb<u8>],
    radius: u32,
    path: &Path,
) -> Result<(), CliError> {
    defs.add_many(label, colors.iter().map(|&color| Sphere::new(color, radius)));
    defs.save(path).map_err(CliError::Defs)?;
    println!(
        "Added {} {label} sphere(s), {} in total",
        colors.len(),
        defs.spheres(label).len()
    );
    Ok(())
}

/// Add spheres centered at the colors of picked pixels, save, and optionally write a highlight preview
fn run_pick(
    mut defs: ColorDefs,
    image: &Path,
    label: Label,
    points: &[(u32, u32)],
    radius: u32,
    highlight: Option<&Path>,
    options: &Options,
) -> Result<(), CliError> {
    let verbose = options.verbose;
    let image = time!("Image loading", verbose, load_image(image))?;
    let colors = chromalabel::sample_points(&image, points).collect::<Vec<_>>();
    if colors.is_empty() {
        return Err(CliError::NoPixels {
            width: image.width(),
            height: image.height(),
        });
    }
    if colors.len() < points.len() {
        log::warn!(
            "Skipped {} point(s) outside the image",
            points.len() - colors.len()
        );
    }

    let added = defs.add_selection(label, colors.iter().copied(), radius);
    defs.save(&options.defs).map_err(CliError::Defs)?;
    println!("Added {added} {label} sphere(s) from {} pixel(s)", colors.len());

    if let Some(path) = highlight {
        let preview = time!(
            "Highlight",
            verbose,
            chromalabel::highlight(&image, &colors)
        );
        preview.save(path).map_err(CliError::ImageSave)?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}

/// Remove every definition and save the empty set, ignoring whatever the file held before
fn run_clear(options: &Options) -> Result<(), CliError> {
    ColorDefs::new()
        .reset(&options.defs)
        .map_err(CliError::Defs)?;
    println!("Cleared {}", options.defs.display());
    Ok(())
}

/// Print the definitions of each label
fn print_defs(defs: &ColorDefs, show_swatch: bool) {
    for label in Label::ALL {
        let spheres = defs.spheres(label);
        println!("{} ({})", label_text(Some(label)), spheres.len());
        for sphere in spheres {
            let (red, green, blue) = sphere.center.into_components();
            if show_swatch {
                println!(
                    "  {} ({red},{green},{blue}) r={}",
                    swatch(sphere.center),
                    sphere.radius
                );
            } else {
                println!("  ({red},{green},{blue}) r={}", sphere.radius);
            }
        }
    }
}

/// Load the color definitions at the given path, or an empty set if there is no file
fn load_defs(path: &Path) -> Result<ColorDefs, CliError> {
    let mut defs = ColorDefs::new();
    if path.exists() {
        let report = defs.load(path).map_err(CliError::Defs)?;
        if report.skipped > 0 {
            log::warn!(
                "Skipped {} malformed definition(s) in {}",
                report.skipped,
                path.display()
            );
        }
    } else {
        log::info!("No definitions at {}, starting empty", path.display());
    }
    Ok(defs)
}

/// Load the image at the given path
fn load_image(path: &Path) -> Result<RgbImage, CliError> {
    Ok(image::open(path).map_err(CliError::ImageLoad)?.into_rgb8())
}

/// A true color block of the given color
fn swatch(color: Srgb<u8>) -> String {
    "   "
        .on_truecolor(color.red, color.green, color.blue)
        .to_string()
}

/// The name of a classification result, colored with its sentinel color
fn label_text(label: Option<Label>) -> String {
    let image::Rgb([r, g, b]) = chromalabel::sentinel(label);
    let name = chromalabel::label_name(label);
    if label == Some(Label::Defect) {
        // the defect sentinel is black, so color the background instead
        name.on_truecolor(r, g, b).white().to_string()
    } else {
        name.truecolor(r, g, b).bold().to_string()
    }
}

/// Print the number and share of pixels given each label
// pixel counts are far below f64 precision limits
#[allow(clippy::cast_precision_loss)]
fn print_counts(counts: &LabelCounts) {
    let total = counts.total();
    let share = |n: usize| 100.0 * n as f64 / total.max(1) as f64;

    for label in Label::ALL {
        let n = counts.get(label);
        println!("{}: {n} px ({:.1}%)", label_text(Some(label)), share(n));
    }
    println!(
        "{}: {} px ({:.1}%)",
        label_text(None),
        counts.unknown,
        share(counts.unknown)
    );
}
