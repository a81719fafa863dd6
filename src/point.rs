//! Query points supplied by the consumer of the EBSD data
//!
//! A [Point] is just a location in the same coordinate frame as the scan. A
//! [PointSet] pairs points with the consumer's own node identities, for
//! example mesh node ids, and carries a content-derived
//! [PointSetVersion] used to decide whether cached weights are still valid.
//!
//! ```rust
//! # use ebsd::point::{Point, PointSet};
//! let nodes = PointSet::new(vec![
//!     (10, Point::new(0.5, 0.5, 0.0)),
//!     (11, Point::new(1.0, 1.0, 0.0)),
//! ]);
//!
//! // identical ids and coordinates give an identical version
//! let again = PointSet::new(vec![
//!     (10, Point::new(0.5, 0.5, 0.0)),
//!     (11, Point::new(1.0, 1.0, 0.0)),
//! ]);
//! assert_eq!(nodes.version(), again.version());
//!
//! // positional ids (0, 1) are a different identity
//! let renumbered = PointSet::from_points(&[Point::new(0.5, 0.5, 0.0), Point::new(1.0, 1.0, 0.0)]);
//! assert_ne!(nodes.version(), renumbered.version());
//! ```

// standard library
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

// internal modules
use crate::utils::*;

// external crates
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Identity of a query point as understood by the caller
pub type NodeId = u64;

/// A location in the scan coordinate frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Coordinates as an array, indexed by axis
    pub const fn coords(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Point {
    fn from(c: [f64; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.x.sci(5, 2),
            self.y.sci(5, 2),
            self.z.sci(5, 2)
        )
    }
}

/// Version token identifying the content of a [PointSet]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointSetVersion(pub u64);

impl std::fmt::Display for PointSetVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Ordered collection of query points keyed by the caller's node ids
///
/// The version is a hash over node ids and the exact bit patterns of the
/// coordinates, in order. Two sets built from identical content share a
/// version, anything else is treated as a different set.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    nodes: Vec<(NodeId, Point)>,
    version: PointSetVersion,
}

impl PointSet {
    pub fn new(nodes: Vec<(NodeId, Point)>) -> Self {
        let version = Self::content_hash(&nodes);
        Self { nodes, version }
    }

    /// Use the position in the slice as the node id
    pub fn from_points(points: &[Point]) -> Self {
        Self::new(
            points
                .iter()
                .enumerate()
                .map(|(i, p)| (i as NodeId, *p))
                .collect(),
        )
    }

    pub fn version(&self) -> PointSetVersion {
        self.version
    }

    pub fn nodes(&self) -> &[(NodeId, Point)] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids used by more than one point, ascending
    ///
    /// Weights are keyed by node id, so only the last of these points is kept.
    pub fn repeated_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .map(|(id, _)| *id)
            .duplicates()
            .sorted()
            .collect()
    }

    fn content_hash(nodes: &[(NodeId, Point)]) -> PointSetVersion {
        let mut hasher = DefaultHasher::new();
        nodes.len().hash(&mut hasher);
        for (id, p) in nodes {
            id.hash(&mut hasher);
            p.x.to_bits().hash(&mut hasher);
            p.y.to_bits().hash(&mut hasher);
            p.z.to_bits().hash(&mut hasher);
        }
        PointSetVersion(hasher.finish())
    }
}
