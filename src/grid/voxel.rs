//! Per-voxel measurements and the flat store holding them
//!
//! The store is filled once from a sequence of [VoxelRecord]s. Records may
//! arrive in any order, each one is placed at the linear index implied by
//! its position, so the store always ends up in grid order regardless of
//! how the source was written.

// standard library
use std::str::FromStr;

// internal modules
use crate::error::{EbsdError, Result};
use crate::grid::geometry::GridGeometry;
use crate::ids::{FeatureId, PhaseId};
use crate::point::Point;
use crate::utils::*;

// external crates
use log::{debug, trace};
use serde::Serialize;

/// Where a record belongs in the grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordPosition {
    /// The n-th record is voxel n
    Sequential,
    /// Explicit (i, j, k)
    Index([usize; 3]),
    /// Voxel centroid coordinates, as written in EBSD text files
    Centroid(Point),
}

/// One voxel as produced by a raw record source
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelRecord {
    pub position: RecordPosition,
    /// Bunge Euler angles (phi1, Phi, phi2) in radians
    pub angles: [f64; 3],
    pub phase: PhaseId,
    pub feature_id: FeatureId,
    /// Crystal symmetry class
    pub symmetry: u32,
    /// Values of any additional columns
    pub custom: Vec<f64>,
}

/// Measurements of a single voxel
///
/// The centroid is not stored, it follows from `index` and the grid
/// geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointData {
    /// Linear voxel index
    pub index: usize,
    /// Bunge Euler angles (phi1, Phi, phi2) in radians
    pub angles: [f64; 3],
    pub phase: PhaseId,
    pub feature_id: FeatureId,
    pub symmetry: u32,
    pub custom: Vec<f64>,
}

impl PointData {
    /// Value of a named field
    ///
    /// Returns `None` for a custom column that does not exist and for
    /// [DataField::VoxelCount], which only makes sense for grain averages.
    pub fn field(&self, field: &DataField) -> Option<f64> {
        match field {
            DataField::Phi1 => Some(self.angles[0]),
            DataField::Phi => Some(self.angles[1]),
            DataField::Phi2 => Some(self.angles[2]),
            DataField::Phase => Some(self.phase.index() as f64),
            DataField::FeatureId => Some(self.feature_id.value() as f64),
            DataField::Symmetry => Some(self.symmetry as f64),
            DataField::Custom(n) => self.custom.get(*n).copied(),
            DataField::VoxelCount => None,
        }
    }
}

/// Quantities that can be requested by name from voxels or grain averages
///
/// ```rust
/// # use ebsd::grid::DataField;
/// let field: DataField = "custom1".parse().unwrap();
/// assert_eq!(field, DataField::Custom(1));
/// assert_eq!("PHI1".parse::<DataField>().unwrap(), DataField::Phi1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataField {
    Phi1,
    Phi,
    Phi2,
    Phase,
    FeatureId,
    Symmetry,
    Custom(usize),
    VoxelCount,
}

impl FromStr for DataField {
    type Err = EbsdError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        let field = match name.as_str() {
            "phi1" => Self::Phi1,
            "phi" => Self::Phi,
            "phi2" => Self::Phi2,
            "phase" => Self::Phase,
            "feature_id" | "grain" => Self::FeatureId,
            "symmetry" => Self::Symmetry,
            "n" | "voxel_count" => Self::VoxelCount,
            other => match other.strip_prefix("custom").map(str::parse::<usize>) {
                Some(Ok(n)) => Self::Custom(n),
                _ => return Err(EbsdError::Lookup(f!("unknown data field \"{s}\""))),
            },
        };
        Ok(field)
    }
}

impl std::fmt::Display for DataField {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Phi1 => write!(f, "phi1"),
            Self::Phi => write!(f, "phi"),
            Self::Phi2 => write!(f, "phi2"),
            Self::Phase => write!(f, "phase"),
            Self::FeatureId => write!(f, "feature_id"),
            Self::Symmetry => write!(f, "symmetry"),
            Self::Custom(n) => write!(f, "custom{n}"),
            Self::VoxelCount => write!(f, "n"),
        }
    }
}

/// Grid-ordered voxel measurements
#[derive(Debug, Clone, PartialEq)]
pub struct PointDataStore {
    voxels: Vec<PointData>,
    custom_columns: usize,
}

impl PointDataStore {
    /// Place every record at its grid position
    ///
    /// Fails with a format error if a record lies outside the grid, if a
    /// voxel is filled twice, if the number of custom values varies between
    /// records (or differs from `custom_columns` when given), or if the
    /// record count does not match the number of voxels.
    pub fn from_records<I>(
        geometry: &GridGeometry,
        custom_columns: Option<usize>,
        records: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = VoxelRecord>,
    {
        let n_voxels = geometry.n_voxels();
        let mut expected_custom = custom_columns;
        let mut placed: Vec<(usize, [usize; 3], PointData)> = Vec::new();

        for (n, record) in records.into_iter().enumerate() {
            let ijk = Self::record_ijk(geometry, n, &record.position)?;
            let index = geometry.linear_index(ijk);

            match expected_custom {
                Some(expected) if expected != record.custom.len() => {
                    return Err(EbsdError::Format(f!(
                        "record {n} has {} custom columns, expected {expected}",
                        record.custom.len()
                    )));
                }
                Some(_) => (),
                None => expected_custom = Some(record.custom.len()),
            }

            trace!("Record {n} -> voxel {index}");
            placed.push((
                n,
                ijk,
                PointData {
                    index,
                    angles: record.angles,
                    phase: record.phase,
                    feature_id: record.feature_id,
                    symmetry: record.symmetry,
                    custom: record.custom,
                },
            ));
        }

        // stable, so the later of two records for a voxel comes second
        placed.sort_by_key(|(_, _, voxel)| voxel.index);
        if let Some((n, ijk, voxel)) = placed
            .windows(2)
            .find(|pair| pair[0].2.index == pair[1].2.index)
            .map(|pair| &pair[1])
        {
            return Err(EbsdError::Format(f!(
                "record {n} fills voxel {} {ijk:?} a second time",
                voxel.index
            )));
        }

        // unique indices inside the grid, so a matching count covers it
        if placed.len() != n_voxels {
            return Err(EbsdError::Format(f!(
                "expected {n_voxels} voxel records, found {}",
                placed.len()
            )));
        }

        let voxels: Vec<PointData> = placed.into_iter().map(|(_, _, voxel)| voxel).collect();

        debug!("Loaded {} voxels", voxels.len());
        Ok(Self {
            voxels,
            custom_columns: expected_custom.unwrap_or(0),
        })
    }

    fn record_ijk(geometry: &GridGeometry, n: usize, position: &RecordPosition) -> Result<[usize; 3]> {
        match position {
            RecordPosition::Sequential if n < geometry.n_voxels() => Ok(geometry.ijk(n)),
            RecordPosition::Sequential => Err(EbsdError::Format(f!(
                "record {n} is beyond the {} voxels in the grid",
                geometry.n_voxels()
            ))),
            RecordPosition::Index(ijk) if geometry.contains_ijk(*ijk) => Ok(*ijk),
            RecordPosition::Index(ijk) => Err(EbsdError::Format(f!(
                "record {n} index {ijk:?} is outside of [0, {})x[0, {})x[0, {})",
                geometry.counts[0],
                geometry.counts[1],
                geometry.counts[2]
            ))),
            RecordPosition::Centroid(p) => geometry.ijk_from_centroid(p).ok_or_else(|| {
                EbsdError::Format(f!("record {n} centroid {p} is outside of the grid"))
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PointData> {
        self.voxels.get(index)
    }

    pub fn voxels(&self) -> &[PointData] {
        &self.voxels
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PointData> {
        self.voxels.iter()
    }

    /// Number of custom columns carried by every voxel
    pub fn custom_columns(&self) -> usize {
        self.custom_columns
    }
}
