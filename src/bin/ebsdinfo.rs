//! Command line summary of an EBSD scan
//!
//! Reads a scan, aggregates it into grains and prints what was found. Useful
//! for a quick sanity check of a file before handing it to a simulation.
//!
//! # Usage
//!
//! ```text
//! Usage: ebsdinfo <ebsd> [options]
//! ```
//!
//! Help is printed with the `-h` flag, and `--help` will show examples, default
//! values, examples, and any important behaviour.
//!
//! ### Summary tables
//!
//! The grid and phases are always printed:
//!
//! ```text
//!                                 Phases
//! phase        name        symmetry   grains
//! -------------------------------------------
//!   0        Ferrite          43         1
//!   1       Austenite         43         1
//! ```
//!
//! The `--grains` flag adds a table of every grain average, and
//! `--fields` adds extra columns by name.
//!
//! ```bash
//! # Include the stored energy custom column and voxel counts
//! ebsdinfo scan.txt --grains --fields custom0 n
//! ```
//!
//! ### JSON output
//!
//! Grain averages can be written out in full with `--json` for use in other
//! tools.
//!
//! ```bash
//! ebsdinfo scan.txt --json grains.json
//! ```

// standard library
use std::fs::File;
use std::io::BufWriter;

// Crate modules
use ebsd::grains::AvgData;
use ebsd::grid::{DataField, AXIS_NAMES};
use ebsd::orientation::EulerAngles;
use ebsd::utils::*;
use ebsd::{Ebsd, EbsdReader, PhaseId};

// External crates
use anyhow::{Context, Result};
use clap::Parser;
use log::*;

#[doc(hidden)]
fn main() -> Result<()> {
    // set up the command line interface and match arguments
    let cli: Cli = Cli::parse();

    // set up logging (+2 to make Info the default)
    let verbosity = cli.verbose + 2;
    logging_init(verbosity, cli.quiet);

    // check the requested fields before bothering with the scan
    let fields = cli
        .fields
        .iter()
        .map(|name| name.parse::<DataField>())
        .collect::<ebsd::Result<Vec<DataField>>>()?;

    info!("Reading {}", &cli.ebsd);
    let reader = EbsdReader::new();
    reader
        .load(&cli.ebsd)
        .with_context(|| f!("Unable to load {}", &cli.ebsd))?;
    let ebsd = reader.snapshot()?;
    info!("Scan read successful");

    if !ebsd.phase_conflicts().is_empty() {
        warn!(
            "{} voxels disagree with the phase of their grain",
            ebsd.phase_conflicts().len()
        );
    }

    println!("\n{}", grid_table(&ebsd));
    println!("\n\n{}", phase_table(&ebsd));
    if cli.grains {
        println!("\n\n{}", grain_table(&ebsd, &fields));
    }

    if let Some(path) = &cli.json {
        info!("Writing grain averages to {path}");
        let f = File::create(path).with_context(|| f!("Unable to create {path}"))?;
        serde_json::to_writer_pretty(BufWriter::new(f), ebsd.avg_data_all())?;
    }

    Ok(())
}

/// Summary of an EBSD scan
///
/// Prints the grid, the phases and optionally every grain average.
///
/// Angles are Bunge Euler angles, reported in degrees. Grain orientations
/// are quaternion averages of the voxel orientations.
///
/// Examples
/// --------
///
///  Typical use:
///     $ ebsdinfo scan.txt
///
///  Every grain with custom columns:
///     $ ebsdinfo scan.txt --grains --fields custom0 custom1
///
///  Grain averages as JSON:
///     $ ebsdinfo scan.txt --json grains.json
///
///     field names:
///         phi1, phi, phi2      = averaged angles (radians)
///         phase, feature_id    = grain identifiers
///         symmetry             = symmetry class
///         n, voxel_count       = number of voxels
///         custom<n>            = n-th custom column
///
#[allow(rustdoc::invalid_rust_codeblocks)]
#[doc(hidden)]
#[derive(Parser, Debug)]
#[command(
    verbatim_doc_comment,
    arg_required_else_help(true),
    before_help(banner()),
    after_help("Typical use: ebsdinfo scan.txt --grains\n\nNOTE: --help shows more detail and examples"),
    term_width(70),
    hide_possible_values(true),
    override_usage("ebsdinfo <ebsd> [options]")
)]
struct Cli {
    // * Positional
    /// Path to input EBSD scan file
    #[arg(name = "ebsd")]
    ebsd: String,

    // * Optional
    /// Print a table of every grain
    #[arg(help_heading("Output options"))]
    #[arg(short, long)]
    grains: bool,

    /// Extra grain columns by name
    ///
    /// e.g. --fields custom0 n
    #[arg(help_heading("Output options"))]
    #[arg(short, long)]
    #[arg(num_args(1..))]
    #[arg(value_name = "name")]
    fields: Vec<String>,

    /// Write grain averages to a JSON file
    #[arg(help_heading("Output options"))]
    #[arg(short, long)]
    #[arg(value_name = "path")]
    json: Option<String>,

    // * Flags
    /// Verbose logging (-v, -vv)
    ///
    /// If specified, the default log level of INFO is increased to DEBUG (-v)
    /// or TRACE (-vv). Errors and Warnings are always logged unless in quiet
    /// (-q) mode.
    #[arg(short, long)]
    #[arg(action = clap::ArgAction::Count)]
    verbose: u8,

    /// Supress all log output (overrules --verbose)
    #[arg(short, long)]
    quiet: bool,
}

/// generates a banner for cli tool consistency
#[doc(hidden)]
fn banner() -> String {
    let mut s = f!("{:-<1$}\n", "", 70);
    s += &f!("{:^70}\n", "EBSD :: Info");
    s += &f!("{:-<1$}", "", 70);
    s
}

#[doc(hidden)]
fn logging_init(verbosity: u8, quiet: bool) {
    let result = stderrlog::new()
        .modules(vec![
            module_path!(),
            "ebsd::reader",
            "ebsd::grains",
            "ebsd::grid",
            "ebsd::readers",
        ])
        .quiet(quiet)
        .verbosity(verbosity as usize)
        .show_level(false)
        .color(stderrlog::ColorChoice::Never)
        .timestamp(stderrlog::Timestamp::Off)
        .init();

    if let Err(e) = result {
        eprintln!("Logging already initialised: {e}");
    }
}

#[doc(hidden)]
fn grid_table(ebsd: &Ebsd) -> String {
    let grid = ebsd.geometry();
    let mut s = f!("{:^52}", "Grid");
    s += &f!("\n{:^6}{:^8}{:^13}{:^13}{:^13}\n", "axis", "voxels", "min", "max", "step");
    s += &"-".repeat(52);
    for (axis, name) in AXIS_NAMES.iter().enumerate() {
        s += &f!("\n{:^6}{:^8}", name, grid.counts[axis]);
        s += &f!("{:^13}", grid.origin[axis].sci(5, 2));
        s += &f!("{:^13}", grid.extent[axis].sci(5, 2));
        s += &f!("{:^13}", grid.spacing[axis].sci(5, 2));
    }
    s += &f!(
        "\n\n{}D, {} voxels, {} custom columns",
        grid.dimension,
        grid.n_voxels(),
        ebsd.custom_columns()
    );
    s
}

#[doc(hidden)]
fn phase_table(ebsd: &Ebsd) -> String {
    let mut s = f!("{:^43}", "Phases");
    s += &f!("\n{:^6}{:^18}{:^10}{:^9}\n", "phase", "name", "symmetry", "grains");
    s += &"-".repeat(43);
    for phase in (0..ebsd.phase_num()).map(PhaseId) {
        let name = ebsd.phase_name(phase).unwrap_or("-");
        let symmetry = ebsd
            .phase_symmetry(phase)
            .map_or("-".to_string(), |n| n.to_string());
        let grains = ebsd.grain_num_in_phase(phase).unwrap_or(0);
        s += &f!("\n{:^6}{:^18}{:^10}{:^9}", phase.index(), name, symmetry, grains);
    }
    s += &f!("\n\n{} grains in total", ebsd.grain_num());
    s
}

#[doc(hidden)]
fn grain_table(ebsd: &Ebsd, fields: &[DataField]) -> String {
    let width = 37 + 30 + 13 * fields.len();
    let mut s = f!("{:^width$}", "Grains");
    s += &f!("\n{}\n", grain_columns(ebsd, fields));
    s += &"-".repeat(width);
    for avg in ebsd.avg_data_all() {
        s += &f!("\n{}", grain_row(avg, fields));
    }
    s
}

#[doc(hidden)]
fn grain_columns(ebsd: &Ebsd, fields: &[DataField]) -> String {
    let mut s = f!("{:^6}", "grain");
    s += &f!("{:^9}", "feature");
    s += &f!("{:^7}", "phase");
    s += &f!("{:^7}", "local");
    s += &f!("{:^8}", "voxels");
    s += &f!("{:^30}", "phi1, Phi, phi2 (deg)");
    let names = ebsd.custom_column_names();
    for field in fields {
        let name = match field {
            DataField::Custom(n) => names.get(*n).cloned().unwrap_or(field.to_string()),
            other => other.to_string(),
        };
        s += &f!("{:^13}", name);
    }
    s
}

#[doc(hidden)]
fn grain_row(avg: &AvgData, fields: &[DataField]) -> String {
    let mut s = f!("{:^6}", avg.global_id.index());
    s += &f!("{:^9}", avg.feature_id.value());
    s += &f!("{:^7}", avg.phase.index());
    s += &f!("{:^7}", avg.local_id.index());
    s += &f!("{:^8}", avg.n);
    s += &f!("{:^30}", EulerAngles::from_radians(avg.angles).to_string());
    for field in fields {
        match avg.field(field) {
            Some(value) => s += &f!("{:^13}", value.sci(5, 2)),
            None => s += &f!("{:^13}", "-"),
        }
    }
    s
}
