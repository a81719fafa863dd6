//! Command line grain and phase weights for query points
//!
//! Provides a quick way of finding which grains and phases surround a set of
//! points, typically the nodes of a simulation mesh that needs initial
//! conditions seeded from an EBSD scan.
//!
//! # Usage
//!
//! ```text
//! Usage: nodeweights <ebsd> [options]
//! ```
//!
//! Help is printed with the `-h` flag, and `--help` will show examples, default
//! values, examples, and any important behaviour.
//!
//! Points can be given in two ways:
//!
//! - Single point via the `-p`/`--point` argument
//! - Multiple points via the `-f`/`--file` argument
//!
//! ### Single point (--point)
//!
//! ```bash
//! # Weights at (x,y,z) = (1.0, 1.0, 0.0)
//! nodeweights scan.txt -p 1.0 1.0 0.0
//! ```
//!
//! ### Multiple points (--file)
//!
//! The input file (default `points.txt`) is interpreted with the following
//! rules for a line:
//!
//! | Example line               | Interpretation           |
//! | -------------------------- | ------------------------ |
//! | Starts with `#`            | comment                  |
//! | 1.0 2.0 3.0                | x, y, z                  |
//! | 12  1.0 2.0 3.0            | node id, x, y, z         |
//!
//! Anything else is ignored. For an example file see `data/points.txt`.
//!
//! ### Weighting policy
//!
//! The neighbourhood and weighting default to `full` and `uniform`, and may be
//! set with `--neighbourhood`/`--weighting` or from a JSON configuration file
//! with `--config`. Command line flags win over the configuration file.
//!
//! ### Result outputs
//!
//! Results are written to `weights.dat` by default, or to the terminal with
//! the `-d`/`--dump` flag.
//!
//! ```text
//!                              Grain weights
//!  node   grain   feature  phase      weight
//! ----------------------------------------------
//!   0       0        1       0     5.00000e-01
//!   0       1        2       1     5.00000e-01
//! ```
//!
//! Points more than one voxel outside of the grid are reported as
//! `Not found in grid` and left out of the weight tables.

// standard library
use std::fs::File;
use std::io::{BufWriter, Write};

// Crate modules
use ebsd::config::ReaderConfig;
use ebsd::readers::parsers;
use ebsd::utils::*;
use ebsd::weights::{Neighbourhood, Weighting};
use ebsd::{Ebsd, EbsdReader, NodeId, NodeWeights, Point, PointSet};

// External crates
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::*;

#[doc(hidden)]
fn main() -> Result<()> {
    // set up the command line interface and match arguments
    let cli: Cli = Cli::parse();

    // set up logging (+2 to make Info the default)
    let verbosity = cli.verbose + 2;
    logging_init(verbosity, cli.quiet);

    // check points from user before bothering with the scan
    debug!("Collecting requested points");
    let points = match cli.point.is_empty() {
        false => parse_cli_point(&cli)?,
        true => {
            let path = cli.file.clone().unwrap_or("points.txt".to_string());
            ebsd::read_points_file(&path).with_context(|| f!("Unable to read {path}"))?
        }
    };
    if points.is_empty() {
        return Err(anyhow!("No valid point input found"));
    }
    info!("Collected {} points", points.len());

    // Get the scan
    let config = reader_config(&cli)?;
    info!("Reading {}", &cli.ebsd);
    let reader = EbsdReader::with_config(config);
    reader
        .load(&cli.ebsd)
        .with_context(|| f!("Unable to load {}", &cli.ebsd))?;
    let ebsd = reader.snapshot()?;
    info!("Scan read successful");

    // only points the grid can resolve get weights
    let (inside, outside): (Vec<_>, Vec<_>) = points
        .nodes()
        .iter()
        .copied()
        .partition(|(_, p)| ebsd.index_from_point(p).is_ok());
    for (id, p) in &outside {
        warn!("Node {id} at {p} is outside of the grid");
    }
    if inside.is_empty() {
        error!("No valid points found in grid");
        return Err(anyhow!("No valid points found in {}", &cli.ebsd));
    }

    let resolved = PointSet::new(inside);
    let weights = reader.node_weights(&resolved)?;
    info!(
        "Built weights with {} neighbourhood and {} weighting",
        config.policy.neighbourhood, config.policy.weighting
    );

    // output to a file and log to console if requested
    let tables = Tables {
        ebsd: &ebsd,
        points: &points,
        weights: &weights,
    };
    match &cli.output {
        Some(path) => results_to_file(path, &tables)?,
        None => results_to_file("./weights.dat", &tables)?,
    }

    if cli.dump {
        results_to_console(&tables)
    }

    Ok(())
}

/// Grain and phase weights for points in an EBSD scan
///
/// Every point gets a normalised distribution over the grains of the
/// voxels around it, and over their phases.
///
/// Points up to one voxel outside of the grid are treated as lying on
/// the boundary. Anything further out is reported and skipped.
///
/// Examples
/// --------
///
///  Typical use:
///     $ nodeweights scan.txt -f points.txt -o weights.dat
///
///  Single point from (x,y,z) coordinates:
///     $ nodeweights scan.txt -p 1.0 2.0 0.0
///
///  Face neighbours with inverse distance weights:
///     $ nodeweights scan.txt --neighbourhood face --weighting inverse-distance
///
///  Policy from a configuration file:
///     $ nodeweights scan.txt --config weights.json
///
///     points.txt interpretation:
///         '#'                  = ignored
///         0.0 0.2 50           = x, y, z
///         12 0.0 0.2 50        = node id, x, y, z
///
#[allow(rustdoc::invalid_rust_codeblocks)]
#[doc(hidden)]
#[derive(Parser, Debug)]
#[command(
    verbatim_doc_comment,
    arg_required_else_help(true),
    before_help(banner()),
    after_help("Typical use: nodeweights scan.txt -f points.txt -o weights.dat\n\nNOTE: --help shows more detail and examples"),
    term_width(70),
    hide_possible_values(true),
    override_usage("nodeweights <ebsd> [options]")
)]
struct Cli {
    // * Positional
    /// Path to input EBSD scan file
    #[arg(name = "ebsd")]
    ebsd: String,

    // * Optional
    /// Quickly find a single point
    ///
    /// Expressed as x y z, e.g. -p 1.0 2.0 3.0
    #[arg(help_heading("Point options"))]
    #[arg(short, long)]
    #[arg(allow_negative_numbers(true), num_args(3))]
    #[clap(required = false)]
    #[arg(value_name = "coords")]
    point: Vec<String>,

    /// File containing multiple points
    ///
    /// If no point is explicitly given using --point, the tool will
    /// automatically search for a file to read points from instead.
    /// Defaults to "points.txt".
    ///
    ///     points.txt interpretation:
    ///         '#'                  = ignored
    ///         0.0 0.2 50           = x, y, z
    ///         12 0.0 0.2 50        = node id, x, y, z
    #[arg(help_heading("Point options"))]
    #[arg(short, long)]
    #[arg(value_name = "path")]
    #[arg(verbatim_doc_comment)]
    file: Option<String>,

    /// Voxels contributing to a point
    ///
    /// Neighbourhoods available:
    ///     > full = face, edge and corner neighbours (default)
    ///     > face = face neighbours only
    #[arg(help_heading("Weight options"))]
    #[arg(short, long, value_enum)]
    #[arg(verbatim_doc_comment)]
    neighbourhood: Option<Neighbourhood>,

    /// Weight of each contributing voxel
    ///
    /// Weightings available:
    ///     > uniform          = every voxel counts the same (default)
    ///     > inverse-distance = by inverse distance to the centroid
    #[arg(help_heading("Weight options"))]
    #[arg(short, long, value_enum)]
    #[arg(verbatim_doc_comment)]
    weighting: Option<Weighting>,

    /// JSON reader configuration
    ///
    /// Any --neighbourhood or --weighting given explicitly takes
    /// priority over the file.
    #[arg(help_heading("Weight options"))]
    #[arg(short, long)]
    #[arg(value_name = "path")]
    config: Option<String>,

    /// Write results to a text file
    ///
    /// Defaults to "weights.dat". Includes points outside of the grid
    /// for user reference.
    #[arg(help_heading("Output options"))]
    #[arg(short, long)]
    #[arg(value_name = "path")]
    output: Option<String>,

    /// Print results to the terminal
    #[arg(help_heading("Output options"))]
    #[arg(short, long)]
    #[clap(required = false)]
    dump: bool,

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

#[doc(hidden)]
fn reader_config(cli: &Cli) -> Result<ReaderConfig> {
    let mut config = match &cli.config {
        Some(path) => ReaderConfig::from_json_file(path)?,
        None => ReaderConfig {
            progress: true,
            ..Default::default()
        },
    };

    if cli.quiet || cli.verbose > 1 {
        config.progress = false;
    }
    if let Some(neighbourhood) = cli.neighbourhood {
        config.policy.neighbourhood = neighbourhood;
    }
    if let Some(weighting) = cli.weighting {
        config.policy.weighting = weighting;
    }

    debug!("Using {config:?}");
    Ok(config)
}

#[doc(hidden)]
fn parse_cli_point(cli: &Cli) -> Result<PointSet> {
    match parsers::point_line(&cli.point.join(" ")) {
        nom::IResult::Ok((_, (None, point))) => Ok(PointSet::from_points(&[point])),
        _ => Err(anyhow!(
            "Failed to parse \"{}\" to a point",
            &cli.point.join(" ")
        )),
    }
}

#[doc(hidden)]
struct Tables<'a> {
    ebsd: &'a Ebsd,
    points: &'a PointSet,
    weights: &'a NodeWeights,
}

/// Write all results to a file
///
/// This will include points outside of the grid for the user's reference.
#[doc(hidden)]
fn results_to_file(path: &str, tables: &Tables) -> Result<()> {
    info!("Writing results to {}", path);
    let f = File::create(path).with_context(|| f!("Unable to create {path}"))?;
    let mut f = BufWriter::new(f);
    f.write_all(points_table(tables).as_bytes())?;
    f.write_all(b"\n\n\n")?;
    f.write_all(grain_table(tables).as_bytes())?;
    f.write_all(b"\n\n\n")?;
    f.write_all(phase_table(tables).as_bytes())?;
    Ok(())
}

/// Log the results to console
///
/// Will be exactly the same as the tables that get dumped to file
#[doc(hidden)]
fn results_to_console(tables: &Tables) {
    println!("\n{}", points_table(tables));
    println!("\n\n{}", grain_table(tables));
    println!("\n\n{}", phase_table(tables));
}

/// generates a banner for cli tool consistency
#[doc(hidden)]
fn banner() -> String {
    let mut s = f!("{:-<1$}\n", "", 70);
    s += &f!("{:^70}\n", "EBSD :: NodeWeights");
    s += &f!("{:-<1$}", "", 70);
    s
}

#[doc(hidden)]
fn logging_init(verbosity: u8, quiet: bool) {
    let result = stderrlog::new()
        .modules(vec![
            module_path!(),
            "ebsd::reader",
            "ebsd::weights",
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
fn points_table(tables: &Tables) -> String {
    let mut s = f!("{:^62}", "Points to search");
    s += &f!("\n{}\n", points_columns());
    s += &"-".repeat(62);
    for (id, p) in tables.points.nodes() {
        s += &f!("\n{:^6}{}", id, points_row(tables.ebsd, p));
    }
    s
}

#[doc(hidden)]
fn points_columns() -> String {
    let mut s = f!("{:^6}", "node");
    s += &f!("{:^13}", "x");
    s += &f!("{:^13}", "y");
    s += &f!("{:^13}", "z");
    s += &f!("{:^17}", "voxel");
    s
}

#[doc(hidden)]
fn points_row(ebsd: &Ebsd, p: &Point) -> String {
    let mut s = f!("{:^13}", p.x.sci(5, 2));
    s += &f!("{:^13}", p.y.sci(5, 2));
    s += &f!("{:^13}", p.z.sci(5, 2));
    match ebsd.index_from_point(p) {
        Ok(index) => s += &f!("{:^17}", index),
        Err(_) => s += &f!("{:^17}", "Not found in grid"),
    }
    s
}

#[doc(hidden)]
fn grain_table(tables: &Tables) -> String {
    let mut s = f!("{:^46}", "Grain weights");
    s += &f!("\n{}\n", grain_columns());
    s += &"-".repeat(46);
    for (node, weights) in tables.weights.grain_map() {
        for (global_id, weight) in weights {
            s += &f!("\n{:^6}{:^8}", node, global_id.index());
            match tables.ebsd.avg_data(*global_id) {
                Ok(avg) => {
                    s += &f!("{:^10}", avg.feature_id.value());
                    s += &f!("{:^7}", avg.phase.index());
                }
                Err(_) => s += &f!("{:^17}", "-"),
            }
            s += &f!("{:>15}", weight.sci(5, 2));
        }
    }
    s
}

#[doc(hidden)]
fn grain_columns() -> String {
    let mut s = f!("{:^6}", "node");
    s += &f!("{:^8}", "grain");
    s += &f!("{:^10}", "feature");
    s += &f!("{:^7}", "phase");
    s += &f!("{:>15}", "weight");
    s
}

#[doc(hidden)]
fn phase_table(tables: &Tables) -> String {
    let phase_num = tables.ebsd.phase_num();
    let width = 6 + 13 * phase_num;
    let mut s = f!("{:^width$}", "Phase weights");

    s += &f!("\n{:^6}", "node");
    for phase in 0..phase_num {
        s += &f!("{:^13}", f!("phase {phase}"));
    }
    s += &f!("\n{}", "-".repeat(width));

    let nodes: Vec<NodeId> = tables.weights.phase_map().keys().copied().collect();
    for node in nodes {
        s += &f!("\n{:^6}", node);
        for weight in tables.weights.dense_phase(node).unwrap_or_default() {
            s += &f!("{:^13}", weight.sci(5, 2));
        }
    }
    s
}
