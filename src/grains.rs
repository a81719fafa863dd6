//! Per-grain averages and the grain identifier maps
//!
//! # Overview
//!
//! Aggregation makes one pass over the voxel store, accumulating every voxel
//! into the grain named by its feature id. On completion the grains are
//! numbered densely in ascending feature-id order, so that the position of a
//! grain in the average data, the Euler angle list, and its [GlobalId] are
//! all the same number.
//!
//! Each grain is then filed under its phase. Local ids count up from zero
//! within each phase in ascending global-id order, and phase 0 always exists
//! even when the file numbers its phases from 1.
//!
//! | Id scheme            | Lookup                                    |
//! | -------------------- | ----------------------------------------- |
//! | feature -> global    | [GrainMap::global_id_of]                  |
//! | global -> feature    | [GrainMap::feature_id_of]                 |
//! | global -> phase/local| [GrainMap::phase_local_of]                |
//! | phase/local -> global| [GrainMap::global_id]                     |
//! | any -> average index | [GrainMap::index_from_index]              |
//!
//! A grain whose voxels disagree on the phase keeps the phase of the first
//! voxel seen in grid order. Every disagreement is logged as a warning and
//! kept as a [PhaseConflict] for diagnostics.

// standard library
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

// internal modules
use crate::error::{EbsdError, Result};
use crate::grid::{DataField, GridGeometry, PointData, PointDataStore};
use crate::ids::{FeatureId, GlobalId, GrainKey, LocalId, PhaseId};
use crate::orientation::{EulerAngles, OrientationAverage};
use crate::point::Point;
use crate::utils::*;

// external crates
use log::{debug, warn};
use serde::Serialize;

/// Averaged data of a single grain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvgData {
    pub feature_id: FeatureId,
    pub global_id: GlobalId,
    pub phase: PhaseId,
    pub local_id: LocalId,
    /// Symmetry class of the first voxel
    pub symmetry: u32,
    /// Mean Bunge angles in radians
    pub angles: [f64; 3],
    /// Mean voxel centroid
    pub centroid: Point,
    /// Arithmetic mean of each custom column
    pub custom: Vec<f64>,
    /// Number of voxels in the grain
    pub n: usize,
}

impl AvgData {
    /// Value of a named field, `None` for a custom column that does not exist
    pub fn field(&self, field: &DataField) -> Option<f64> {
        match field {
            DataField::Phi1 => Some(self.angles[0]),
            DataField::Phi => Some(self.angles[1]),
            DataField::Phi2 => Some(self.angles[2]),
            DataField::Phase => Some(self.phase.index() as f64),
            DataField::FeatureId => Some(self.feature_id.value() as f64),
            DataField::Symmetry => Some(self.symmetry as f64),
            DataField::Custom(n) => self.custom.get(*n).copied(),
            DataField::VoxelCount => Some(self.n as f64),
        }
    }
}

impl std::fmt::Display for AvgData {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{:<6}{:<9}{:<7}{:<7}{:>8}{}",
            self.global_id.index(),
            self.feature_id.value(),
            self.phase.index(),
            self.local_id.index(),
            self.n,
            EulerAngles::from_radians(self.angles)
        )
    }
}

/// A voxel whose phase disagrees with the phase already recorded for its grain
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseConflict {
    pub feature_id: FeatureId,
    /// Phase kept for the grain
    pub kept: PhaseId,
    /// Phase found on the offending voxel
    pub found: PhaseId,
    /// Linear index of the offending voxel
    pub voxel: usize,
}

/// Mappings between feature ids, global ids, and (phase, local id) pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrainMap {
    global_of_feature: BTreeMap<FeatureId, GlobalId>,
    feature_of_global: Vec<FeatureId>,
    phase_local_of_global: Vec<(PhaseId, LocalId)>,
    global_of_phase_local: Vec<Vec<GlobalId>>,
}

impl GrainMap {
    /// Total number of grains
    pub fn grain_num(&self) -> usize {
        self.feature_of_global.len()
    }

    /// Number of phases, one more than the largest phase number seen
    pub fn phase_num(&self) -> usize {
        self.global_of_phase_local.len()
    }

    /// Number of grains in a phase
    pub fn grain_num_in_phase(&self, phase: PhaseId) -> Result<usize> {
        Ok(self.phase_grains(phase)?.len())
    }

    /// Global ids of a phase, indexed by local id
    pub fn phase_grains(&self, phase: PhaseId) -> Result<&[GlobalId]> {
        self.global_of_phase_local
            .get(phase.index())
            .map(Vec::as_slice)
            .ok_or_else(|| {
                EbsdError::Lookup(f!("{phase} not found, {} phases", self.phase_num()))
            })
    }

    pub fn global_id_of(&self, feature_id: FeatureId) -> Result<GlobalId> {
        self.global_of_feature
            .get(&feature_id)
            .copied()
            .ok_or_else(|| EbsdError::Lookup(f!("{feature_id} was never observed")))
    }

    pub fn feature_id_of(&self, global_id: GlobalId) -> Result<FeatureId> {
        self.feature_of_global
            .get(global_id.index())
            .copied()
            .ok_or_else(|| self.unknown_global(global_id))
    }

    pub fn phase_local_of(&self, global_id: GlobalId) -> Result<(PhaseId, LocalId)> {
        self.phase_local_of_global
            .get(global_id.index())
            .copied()
            .ok_or_else(|| self.unknown_global(global_id))
    }

    /// Global id of the `local_id`-th grain of a phase
    pub fn global_id(&self, phase: PhaseId, local_id: LocalId) -> Result<GlobalId> {
        self.phase_grains(phase)?
            .get(local_id.index())
            .copied()
            .ok_or_else(|| EbsdError::Lookup(f!("{phase} has no grain with {local_id}")))
    }

    /// Feature id of the `local_id`-th grain of a phase
    pub fn feature_id(&self, phase: PhaseId, local_id: LocalId) -> Result<FeatureId> {
        self.feature_id_of(self.global_id(phase, local_id)?)
    }

    /// Position in the average data for either kind of grain id
    ///
    /// Feature ids are translated through the feature to global map, global
    /// ids are only range checked.
    pub fn index_from_index<K: Into<GrainKey>>(&self, key: K) -> Result<usize> {
        match key.into() {
            GrainKey::Feature(feature_id) => Ok(self.global_id_of(feature_id)?.index()),
            GrainKey::Global(global_id) if global_id.index() < self.grain_num() => {
                Ok(global_id.index())
            }
            GrainKey::Global(global_id) => Err(self.unknown_global(global_id)),
        }
    }

    fn unknown_global(&self, global_id: GlobalId) -> EbsdError {
        EbsdError::Lookup(f!("{global_id} not found, {} grains", self.grain_num()))
    }
}

/// Everything derived from the voxel store once it is loaded
#[derive(Debug, Clone, PartialEq)]
pub struct Grains {
    avg_data: Vec<AvgData>,
    euler_angles: Vec<EulerAngles>,
    map: GrainMap,
    conflicts: Vec<PhaseConflict>,
}

impl Grains {
    /// Aggregate voxels into grains in a single pass
    pub fn aggregate(geometry: &GridGeometry, store: &PointDataStore) -> Self {
        let mut accumulators: BTreeMap<FeatureId, Accumulator> = BTreeMap::new();
        let mut conflicts = Vec::new();
        let mut max_phase = 0;

        for voxel in store.iter() {
            max_phase = max_phase.max(voxel.phase.index());
            let centroid = geometry.centroid(geometry.ijk(voxel.index)).coords();

            match accumulators.entry(voxel.feature_id) {
                Entry::Vacant(entry) => {
                    entry.insert(Accumulator::new(voxel, centroid));
                }
                Entry::Occupied(mut entry) => {
                    let accumulator = entry.get_mut();
                    if accumulator.phase != voxel.phase {
                        warn!(
                            "Voxel {} of {} is in {}, keeping {}",
                            voxel.index, voxel.feature_id, voxel.phase, accumulator.phase
                        );
                        conflicts.push(PhaseConflict {
                            feature_id: voxel.feature_id,
                            kept: accumulator.phase,
                            found: voxel.phase,
                            voxel: voxel.index,
                        });
                    }
                    accumulator.add(voxel, centroid);
                }
            }
        }

        let mut map = GrainMap {
            global_of_phase_local: vec![Vec::new(); max_phase + 1],
            ..Default::default()
        };
        let mut avg_data = Vec::with_capacity(accumulators.len());
        let mut euler_angles = Vec::with_capacity(accumulators.len());

        for (global, (feature_id, accumulator)) in accumulators.into_iter().enumerate() {
            let global_id = GlobalId(global);
            let phase = accumulator.phase;
            let phase_grains = &mut map.global_of_phase_local[phase.index()];
            let local_id = LocalId(phase_grains.len());
            phase_grains.push(global_id);

            map.global_of_feature.insert(feature_id, global_id);
            map.feature_of_global.push(feature_id);
            map.phase_local_of_global.push((phase, local_id));

            let data = accumulator.finish(feature_id, global_id, local_id);
            euler_angles.push(EulerAngles::from_radians(data.angles));
            avg_data.push(data);
        }

        debug!(
            "Aggregated {} voxels into {} grains over {} phases",
            store.len(),
            map.grain_num(),
            map.phase_num()
        );

        Self {
            avg_data,
            euler_angles,
            map,
            conflicts,
        }
    }

    pub fn map(&self) -> &GrainMap {
        &self.map
    }

    /// All grain averages in global id order
    pub fn avg_data_all(&self) -> &[AvgData] {
        &self.avg_data
    }

    pub fn avg_data<K: Into<GrainKey>>(&self, key: K) -> Result<&AvgData> {
        Ok(&self.avg_data[self.map.index_from_index(key)?])
    }

    pub fn avg_data_local(&self, phase: PhaseId, local_id: LocalId) -> Result<&AvgData> {
        self.avg_data(self.map.global_id(phase, local_id)?)
    }

    /// Averaged orientation in degrees
    pub fn euler_angles<K: Into<GrainKey>>(&self, key: K) -> Result<&EulerAngles> {
        Ok(&self.euler_angles[self.map.index_from_index(key)?])
    }

    pub fn conflicts(&self) -> &[PhaseConflict] {
        &self.conflicts
    }
}

/// Running sums for one grain
#[derive(Debug)]
struct Accumulator {
    phase: PhaseId,
    symmetry: u32,
    orientation: OrientationAverage,
    centroid: [f64; 3],
    custom: Vec<f64>,
    n: usize,
}

impl Accumulator {
    fn new(voxel: &PointData, centroid: [f64; 3]) -> Self {
        let mut orientation = OrientationAverage::new();
        orientation.add(voxel.angles);
        Self {
            phase: voxel.phase,
            symmetry: voxel.symmetry,
            orientation,
            centroid,
            custom: voxel.custom.clone(),
            n: 1,
        }
    }

    fn add(&mut self, voxel: &PointData, centroid: [f64; 3]) {
        self.orientation.add(voxel.angles);
        for (sum, value) in self.centroid.iter_mut().zip(centroid) {
            *sum += value;
        }
        for (sum, value) in self.custom.iter_mut().zip(&voxel.custom) {
            *sum += value;
        }
        self.n += 1;
    }

    fn finish(self, feature_id: FeatureId, global_id: GlobalId, local_id: LocalId) -> AvgData {
        let n = self.n as f64;
        AvgData {
            feature_id,
            global_id,
            phase: self.phase,
            local_id,
            symmetry: self.symmetry,
            angles: self.orientation.mean().unwrap_or_default(),
            centroid: Point::new(
                self.centroid[0] / n,
                self.centroid[1] / n,
                self.centroid[2] / n,
            ),
            custom: self.custom.iter().map(|sum| sum / n).collect(),
            n: self.n,
        }
    }
}
