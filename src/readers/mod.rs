//! Raw record sources for scan and points files
//!
//! The readers only turn text into header values, voxel records and query
//! points. Everything that gives those values meaning is done by the
//! [grid](crate::grid) and [grains](crate::grains) modules.

// internal modules
use crate::error::Result;
use crate::point::PointSet;
use crate::reader::Ebsd;

// standard library
use std::path::Path;

// files under the readers module
mod ebsd_file;
pub mod parsers;
mod points_file;

// inline the readers for a nice API
#[doc(inline)]
pub use crate::readers::ebsd_file::{EbsdFileReader, STANDARD_COLUMNS};

#[doc(inline)]
pub use crate::readers::points_file::PointsFileReader;

/// Read and index an EBSD scan file
///
/// Returns a result containing the fully loaded [Ebsd] data, with grains
/// already aggregated.
///
/// - `path` - Path to the scan file, can be [&str], [String], [Path], etc...
///
/// Example
/// ```rust
/// # use ebsd::readers::read_ebsd;
/// let ebsd = read_ebsd("./data/ebsd/grains_2x2.txt").unwrap();
/// assert_eq!(ebsd.grain_num(), 2);
/// assert_eq!(ebsd.phase_num(), 2);
/// ```
pub fn read_ebsd<P: AsRef<Path>>(path: P) -> Result<Ebsd> {
    let path: &Path = Path::new(path.as_ref());
    let mut reader = EbsdFileReader::new();
    reader.disable_progress();
    let (header, records) = reader.parse(path)?;
    Ebsd::from_parts(header, records)
}

/// Read points file for the node weight tools
///
/// Returns a result containing the [PointSet] extracted from the provided
/// input file.
///
/// - `path` - Path to a points file, can be [&str], [String], [Path], etc...
///
/// The input file is interpreted with the following rules for a line:
///
/// | Example line               | Interpretation           |
/// | -------------------------- | ------------------------ |
/// | Starts with `#`            | comment                  |
/// | 1.0 2.0 3.0                | x, y, z                  |
/// | 12  1.0 2.0 3.0            | node id, x, y, z         |
///
/// Anything else is ignored. For examples see `data/points.txt`.
///
/// Example
/// ```rust
/// # use ebsd::readers::read_points_file;
/// let points = read_points_file("./data/points.txt").unwrap();
/// assert!(!points.is_empty());
/// ```
pub fn read_points_file<P: AsRef<Path>>(path: P) -> Result<PointSet> {
    let path: &Path = Path::new(path.as_ref());
    let mut reader = PointsFileReader::new();
    reader.parse(path)
}
