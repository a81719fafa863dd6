//! Voxel grid of the scan
//!
//! # Overview
//!
//! Module for the regular grid that an EBSD scan is measured on. The grid is
//! described once by a [GridGeometry] derived from the file [EbsdHeader], and
//! the measurements themselves are held in a [PointDataStore] in grid order.
//!
//! ```rust
//! # use ebsd::grid::GridGeometry;
//! # use ebsd::point::Point;
//! let grid = GridGeometry::new(2, [32, 32, 1], [0.0; 3], [32.0, 32.0, 0.0]).unwrap();
//!
//! // find the voxel containing a point
//! let index = grid.index_from_point(&Point::new(3.2, 10.7, 0.0)).unwrap();
//! assert_eq!(grid.ijk(index), [3, 10, 0]);
//! ```
//!
//! Everything in here is immutable once built. Aggregation into grains lives
//! in the [grains](crate::grains) module.

// Split into subfiles for development, but anything important is re-exported
mod geometry;
mod header;
mod voxel;

#[doc(inline)]
pub use crate::grid::geometry::{GridGeometry, AXIS_NAMES};

#[doc(inline)]
pub use crate::grid::header::EbsdHeader;

#[doc(inline)]
pub use crate::grid::voxel::{DataField, PointData, PointDataStore, RecordPosition, VoxelRecord};
