//! # The EBSD crate
//!
//! Reader and spatial indexer for EBSD orientation scans
//!
//! ## Installation
//!
//! Build and install the command line tools from the repository root:
//!
//! ```shell
//! cargo install --path .
//! ```
//!
//! ## Overview
//!
//! An EBSD scan is a regular voxel grid of crystal orientation measurements,
//! where every voxel carries a feature id naming the grain it belongs to. The
//! crate loads a scan, aggregates it into grains, and bridges the grid to an
//! arbitrary set of query points such as the nodes of a simulation mesh.
//!
//! | Command line   | Description                                             |
//! | -------------- | ------------------------------------------------------- |
//! | `ebsdinfo`     | Summary of a scan, its phases and grain averages        |
//! | `nodeweights`  | Grain and phase weights for a file of query points      |
//!
//! All tools are fully documented with detailed `--help` messages, including
//! examples for common use cases.
//!
//! ### Grain identifiers
//!
//! Three id schemes are in play, each with its own type so that they can not
//! be mixed up by accident.
//!
//! | Identifier                     | Meaning                                      |
//! | ------------------------------ | -------------------------------------------- |
//! | [FeatureId](crate::ids::FeatureId) | grain id as written in the scan file     |
//! | [GlobalId](crate::ids::GlobalId)   | dense zero-based renumbering of features |
//! | [PhaseId](crate::ids::PhaseId) + [LocalId](crate::ids::LocalId) | position within a phase |
//!
//! ### Node weights
//!
//! Rather than a hard grain id, every query point gets a normalised
//! distribution over the grains and phases around it. The neighbourhood and
//! weighting are configurable, see [WeightPolicy](crate::weights::WeightPolicy).
//!
//! | Neighbourhood                                  | Weighting                                           |
//! | ---------------------------------------------- | --------------------------------------------------- |
//! | [Full](crate::weights::Neighbourhood::Full) (default) | [Uniform](crate::weights::Weighting::Uniform) (default) |
//! | [Face](crate::weights::Neighbourhood::Face)           | [InverseDistance](crate::weights::Weighting::InverseDistance) |
//!
//! ## Advanced use
//!
//! Reading a scan is a one-liner, and everything derived from it is ready to
//! query straight away.
//!
//! ```rust
//! // import the crate
//! use ebsd::{read_ebsd, FeatureId, PhaseId, Point};
//!
//! // read and aggregate a scan
//! let ebsd = read_ebsd("./data/ebsd/grains_4x4.txt").unwrap();
//!
//! // phases in this file are numbered from 1, phase 0 is left empty
//! assert_eq!(ebsd.phase_num(), 3);
//! assert_eq!(ebsd.grain_num_in_phase(PhaseId(1)).unwrap(), 2);
//!
//! // look grains up by any of their ids
//! let grain = ebsd.avg_data(FeatureId(20)).unwrap();
//! assert_eq!(grain.n, 4);
//!
//! // or by location
//! let voxel = ebsd.data_at(&Point::new(1.9, 1.9, 0.0)).unwrap();
//! assert_eq!(voxel.feature_id, FeatureId(20));
//! ```
//!
//! As an overview:
//! - The [grid] module describes the voxel grid and holds the voxel data.
//! - The [grains] module aggregates voxels into grains and maps between the
//! grain identifiers.
//! - The [weights] module computes node weights for arbitrary query points.
//! - The [reader] module ties it together, with an
//! [EbsdReader](crate::reader::EbsdReader) that owns a loaded scan and caches
//! node weights for repeated queries.
//!
//! In the background, the `nom` parser combinator library handles the text
//! formats, `nalgebra` quaternions average the grain orientations, `rayon`
//! spreads node weight computation over all cores, and `clap` is used for the
//! command line interface.
//!
//! All of the useful functionality from the file readers and core data
//! structures are re-exported for convenience.

// Public facing modules
pub mod config;
pub mod error;
pub mod grains;
pub mod grid;
pub mod ids;
pub mod orientation;
pub mod point;
pub mod reader;
pub mod readers;
pub mod utils;
pub mod weights;

// Re-exports of useful data structures
#[doc(inline)]
pub use crate::readers::{read_ebsd, read_points_file};

#[doc(inline)]
pub use crate::error::{EbsdError, Result};

#[doc(inline)]
pub use crate::ids::{FeatureId, GlobalId, GrainKey, LocalId, PhaseId};

#[doc(inline)]
pub use crate::point::{NodeId, Point, PointSet};

#[doc(inline)]
pub use crate::reader::{Ebsd, EbsdReader};

#[doc(inline)]
pub use crate::weights::{NodeWeights, WeightPolicy};
