//! Immutable description of the voxel grid
//!
//! Voxels are ordered with x varying fastest, then y, then z, so the linear
//! index of voxel (i, j, k) is always `i + j*nx + k*nx*ny`. Every conversion
//! between coordinates, (i, j, k) triplets and linear indices lives here.

// internal modules
use crate::error::{EbsdError, Result};
use crate::point::Point;
use crate::utils::*;

// external crates
use log::trace;
use serde::Serialize;

/// Axis labels used in messages
pub const AXIS_NAMES: [char; 3] = ['x', 'y', 'z'];

/// Origin, spacing and voxel counts of a regular grid
///
/// Axes beyond the grid `dimension` always have a single voxel and zero
/// spacing. An active axis holding a single voxel is degenerate in the same
/// way, and coordinates along degenerate axes are ignored by every lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridGeometry {
    /// Dimension of the scan, 1, 2 or 3
    pub dimension: usize,
    /// Lower corner of the grid
    pub origin: [f64; 3],
    /// Voxel size along each axis
    pub spacing: [f64; 3],
    /// Number of voxels along each axis
    pub counts: [usize; 3],
    /// Upper corner of the grid
    pub extent: [f64; 3],
}

impl GridGeometry {
    /// Derive the grid from header values
    ///
    /// Spacing is `(max - min) / count` on every axis with more than one
    /// voxel and zero otherwise.
    ///
    /// ```rust
    /// # use ebsd::grid::GridGeometry;
    /// let grid = GridGeometry::new(2, [4, 2, 1], [0.0; 3], [2.0, 1.0, 0.0]).unwrap();
    /// assert_eq!(grid.spacing, [0.5, 0.5, 0.0]);
    /// assert_eq!(grid.n_voxels(), 8);
    /// ```
    pub fn new(dimension: usize, counts: [usize; 3], min: [f64; 3], max: [f64; 3]) -> Result<Self> {
        if !(1..=3).contains(&dimension) {
            return Err(EbsdError::Configuration(f!(
                "dimension must be 1, 2, or 3, found {dimension}"
            )));
        }

        let mut spacing = [0.0; 3];
        for axis in 0..3 {
            let name = AXIS_NAMES[axis];
            let (n, lo, hi) = (counts[axis], min[axis], max[axis]);

            if n == 0 {
                return Err(EbsdError::Configuration(f!("{name} axis has no voxels")));
            }
            if !lo.is_finite() || !hi.is_finite() {
                return Err(EbsdError::Configuration(f!(
                    "{name} extent [{lo}, {hi}] is not finite"
                )));
            }
            if hi < lo {
                return Err(EbsdError::Configuration(f!(
                    "{name} extent is inverted, max {hi} < min {lo}"
                )));
            }
            if axis >= dimension && n > 1 {
                return Err(EbsdError::Configuration(f!(
                    "{name} axis has {n} voxels but the grid is {dimension}D"
                )));
            }
            if n > 1 {
                if hi == lo {
                    return Err(EbsdError::Configuration(f!(
                        "{name} axis has {n} voxels but zero extent"
                    )));
                }
                spacing[axis] = (hi - lo) / n as f64;
            }
        }

        if counts.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n)).is_none() {
            return Err(EbsdError::Configuration(f!(
                "{}x{}x{} voxels overflows the grid size",
                counts[0],
                counts[1],
                counts[2]
            )));
        }

        let geometry = Self {
            dimension,
            origin: min,
            spacing,
            counts,
            extent: max,
        };
        trace!("Grid geometry derived: {geometry}");
        Ok(geometry)
    }

    /// Total number of voxels in the grid
    pub fn n_voxels(&self) -> usize {
        self.counts.iter().product()
    }

    /// Axes with a non-zero spacing
    pub fn is_active(&self, axis: usize) -> bool {
        self.spacing[axis] > 0.0
    }

    pub fn active_axes(&self) -> impl Iterator<Item = usize> + '_ {
        (0..3).filter(|&axis| self.is_active(axis))
    }

    /// Smallest spacing over the active axes, zero for a single voxel grid
    pub fn min_spacing(&self) -> f64 {
        self.active_axes()
            .map(|axis| self.spacing[axis])
            .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.min(d))))
            .unwrap_or(0.0)
    }

    /// Linear voxel index from (i, j, k)
    pub fn linear_index(&self, ijk: [usize; 3]) -> usize {
        let [nx, ny, _] = self.counts;
        ijk[0] + ijk[1] * nx + ijk[2] * nx * ny
    }

    /// (i, j, k) from a linear voxel index
    ///
    /// ```rust
    /// # use ebsd::grid::GridGeometry;
    /// let grid = GridGeometry::new(3, [2, 3, 4], [0.0; 3], [2.0, 3.0, 4.0]).unwrap();
    /// assert_eq!(grid.ijk(grid.linear_index([1, 2, 3])), [1, 2, 3]);
    /// ```
    pub fn ijk(&self, index: usize) -> [usize; 3] {
        let [nx, ny, _] = self.counts;
        [index % nx, (index / nx) % ny, index / (nx * ny)]
    }

    pub fn contains_ijk(&self, ijk: [usize; 3]) -> bool {
        ijk.iter().zip(self.counts.iter()).all(|(i, n)| i < n)
    }

    /// Centre of voxel (i, j, k)
    ///
    /// Degenerate axes report the middle of their extent.
    pub fn centroid(&self, ijk: [usize; 3]) -> Point {
        let mut c = [0.0; 3];
        for (axis, value) in c.iter_mut().enumerate() {
            *value = if self.is_active(axis) {
                self.origin[axis] + (ijk[axis] as f64 + 0.5) * self.spacing[axis]
            } else {
                0.5 * (self.origin[axis] + self.extent[axis])
            };
        }
        Point::from(c)
    }

    /// Strict (i, j, k) for a point that must lie inside the grid
    ///
    /// Used when placing records, where nothing outside the grid is tolerated.
    pub fn ijk_from_centroid(&self, point: &Point) -> Option<[usize; 3]> {
        let coords = point.coords();
        let mut ijk = [0; 3];
        for axis in self.active_axes() {
            let t = (coords[axis] - self.origin[axis]) / self.spacing[axis];
            if !t.is_finite() || t < 0.0 || t >= self.counts[axis] as f64 {
                return None;
            }
            ijk[axis] = t.floor() as usize;
        }
        Some(ijk)
    }

    /// Tolerant (i, j, k) for an arbitrary query point
    ///
    /// Points up to one voxel outside the grid are clamped onto the nearest
    /// boundary voxel, which absorbs points sitting exactly on the upper
    /// faces. Anything further out is a range error.
    pub fn ijk_from_point(&self, point: &Point) -> Result<[usize; 3]> {
        if !point.is_finite() {
            return Err(self.range_error(point, "coordinates are not finite".into()));
        }

        let coords = point.coords();
        let mut ijk = [0; 3];
        for axis in self.active_axes() {
            let n = self.counts[axis];
            let t = ((coords[axis] - self.origin[axis]) / self.spacing[axis]).floor();
            if t < -1.0 || t > n as f64 {
                return Err(self.range_error(
                    point,
                    f!(
                        "more than one voxel beyond the {} bounds [{}, {}]",
                        AXIS_NAMES[axis],
                        self.origin[axis],
                        self.extent[axis]
                    ),
                ));
            }
            ijk[axis] = t.clamp(0.0, (n - 1) as f64) as usize;
        }
        Ok(ijk)
    }

    /// Linear index of the voxel containing a query point
    ///
    /// ```rust
    /// # use ebsd::grid::GridGeometry;
    /// # use ebsd::point::Point;
    /// let grid = GridGeometry::new(2, [2, 2, 1], [0.0; 3], [2.0, 2.0, 0.0]).unwrap();
    /// assert_eq!(grid.index_from_point(&Point::new(1.5, 0.5, 0.0)).unwrap(), 1);
    /// // upper faces belong to the last voxel
    /// assert_eq!(grid.index_from_point(&Point::new(2.0, 2.0, 0.0)).unwrap(), 3);
    /// assert!(grid.index_from_point(&Point::new(9.0, 0.5, 0.0)).is_err());
    /// ```
    pub fn index_from_point(&self, point: &Point) -> Result<usize> {
        Ok(self.linear_index(self.ijk_from_point(point)?))
    }

    fn range_error(&self, point: &Point, reason: String) -> EbsdError {
        EbsdError::Range {
            x: point.x,
            y: point.y,
            z: point.z,
            reason,
        }
    }
}

impl std::fmt::Display for GridGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}D grid {}x{}x{}, origin ({}, {}, {}), spacing ({}, {}, {})",
            self.dimension,
            self.counts[0],
            self.counts[1],
            self.counts[2],
            self.origin[0],
            self.origin[1],
            self.origin[2],
            self.spacing[0],
            self.spacing[1],
            self.spacing[2],
        )
    }
}
