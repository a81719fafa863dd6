//! Loaded scans and the reader that owns them
//!
//! # Overview
//!
//! An [Ebsd] is one fully loaded and aggregated scan. It is immutable, and
//! every query on it is a plain read.
//!
//! The [EbsdReader] adds the lifecycle around it:
//!
//! - a committed [Ebsd] snapshot, replaced only by a successful load
//! - a cache of [NodeWeights] tagged with the point set and policy it was
//!   built for
//!
//! Both are held as `Arc`s behind locks that are only taken long enough to
//! clone or swap the pointer. New snapshots and weight maps are built first
//! and swapped in whole, so concurrent readers never see a partial state.
//!
//! ```rust
//! # use ebsd::reader::EbsdReader;
//! # use ebsd::ids::PhaseId;
//! let reader = EbsdReader::new();
//! assert!(reader.grain_num().is_err());
//!
//! reader.load("./data/ebsd/grains_4x4.txt").unwrap();
//! assert_eq!(reader.grain_num().unwrap(), 3);
//! assert_eq!(reader.grain_num_in_phase(PhaseId(0)).unwrap(), 0);
//! ```

// standard library
use std::path::Path;
use std::sync::Arc;

// internal modules
use crate::config::ReaderConfig;
use crate::error::{EbsdError, Result};
use crate::grains::{AvgData, Grains, PhaseConflict};
use crate::grid::{EbsdHeader, GridGeometry, PointData, PointDataStore, VoxelRecord};
use crate::ids::{FeatureId, GlobalId, GrainKey, LocalId, PhaseId};
use crate::orientation::EulerAngles;
use crate::point::{Point, PointSet, PointSetVersion};
use crate::readers::EbsdFileReader;
use crate::utils::*;
use crate::weights::{NodeWeights, WeightPolicy};

// external crates
use log::{debug, warn};
use parking_lot::RwLock;

/// A loaded and aggregated EBSD scan
#[derive(Debug, Clone, PartialEq)]
pub struct Ebsd {
    header: EbsdHeader,
    geometry: GridGeometry,
    store: PointDataStore,
    grains: Grains,
}

impl Ebsd {
    /// Build from a header and the raw voxel records of any source
    ///
    /// Derives the grid, places every record and aggregates the grains.
    /// Fails without producing anything if the header or records are bad.
    pub fn from_parts<I>(header: EbsdHeader, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = VoxelRecord>,
    {
        let geometry = header.geometry()?;
        let store =
            PointDataStore::from_records(&geometry, header.declared_custom_columns(), records)?;
        let grains = Grains::aggregate(&geometry, &store);

        if let Some(declared) = header.phases {
            let map = grains.map();
            let populated = (0..map.phase_num())
                .filter(|&p| map.grain_num_in_phase(PhaseId(p)).unwrap_or(0) > 0)
                .count();
            if declared != populated {
                warn!("Header declares {declared} phases, found grains in {populated}");
            }
        }

        Ok(Self {
            header,
            geometry,
            store,
            grains,
        })
    }

    pub fn header(&self) -> &EbsdHeader {
        &self.header
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn store(&self) -> &PointDataStore {
        &self.store
    }

    pub fn grains(&self) -> &Grains {
        &self.grains
    }

    /// Voxel data by linear index
    pub fn data(&self, index: usize) -> Result<&PointData> {
        self.store.get(index).ok_or_else(|| {
            EbsdError::Lookup(f!("voxel {index} not found, {} voxels", self.store.len()))
        })
    }

    /// Voxel data at a spatial coordinate
    pub fn data_at(&self, point: &Point) -> Result<&PointData> {
        self.data(self.index_from_point(point)?)
    }

    /// Grain average by feature or global id
    pub fn avg_data<K: Into<GrainKey>>(&self, key: K) -> Result<&AvgData> {
        self.grains.avg_data(key)
    }

    pub fn avg_data_local(&self, phase: PhaseId, local_id: LocalId) -> Result<&AvgData> {
        self.grains.avg_data_local(phase, local_id)
    }

    /// Every grain average in global id order
    pub fn avg_data_all(&self) -> &[AvgData] {
        self.grains.avg_data_all()
    }

    /// Averaged orientation of a grain in degrees
    pub fn euler_angles<K: Into<GrainKey>>(&self, key: K) -> Result<&EulerAngles> {
        self.grains.euler_angles(key)
    }

    pub fn grain_num(&self) -> usize {
        self.grains.map().grain_num()
    }

    pub fn grain_num_in_phase(&self, phase: PhaseId) -> Result<usize> {
        self.grains.map().grain_num_in_phase(phase)
    }

    pub fn phase_num(&self) -> usize {
        self.grains.map().phase_num()
    }

    pub fn feature_id(&self, phase: PhaseId, local_id: LocalId) -> Result<FeatureId> {
        self.grains.map().feature_id(phase, local_id)
    }

    pub fn global_id(&self, phase: PhaseId, local_id: LocalId) -> Result<GlobalId> {
        self.grains.map().global_id(phase, local_id)
    }

    pub fn global_id_of(&self, feature_id: FeatureId) -> Result<GlobalId> {
        self.grains.map().global_id_of(feature_id)
    }

    pub fn phase_local_of(&self, global_id: GlobalId) -> Result<(PhaseId, LocalId)> {
        self.grains.map().phase_local_of(global_id)
    }

    /// Linear index of the voxel containing a point
    pub fn index_from_point(&self, point: &Point) -> Result<usize> {
        self.geometry.index_from_point(point)
    }

    /// Position in the average data of a feature or global id
    pub fn index_from_index<K: Into<GrainKey>>(&self, key: K) -> Result<usize> {
        self.grains.map().index_from_index(key)
    }

    /// Number of custom columns on every voxel
    pub fn custom_columns(&self) -> usize {
        self.store.custom_columns()
    }

    /// Custom column names, generic names where the header gives none
    pub fn custom_column_names(&self) -> Vec<String> {
        (0..self.custom_columns())
            .map(|n| match self.header.custom_columns.get(n) {
                Some(name) => name.clone(),
                None => f!("Custom{n}"),
            })
            .collect()
    }

    pub fn phase_conflicts(&self) -> &[PhaseConflict] {
        self.grains.conflicts()
    }

    /// Name of a phase as declared in the header
    pub fn phase_name(&self, phase: PhaseId) -> Option<&str> {
        self.header.phase_names.get(&phase.index()).map(String::as_str)
    }

    /// Symmetry class of a phase as declared in the header
    pub fn phase_symmetry(&self, phase: PhaseId) -> Option<u32> {
        self.header.symmetries.get(&phase.index()).copied()
    }

    /// Grain and phase weights for every point in a set
    pub fn node_weights(&self, points: &PointSet, policy: WeightPolicy) -> Result<NodeWeights> {
        NodeWeights::build(&self.geometry, &self.store, &self.grains, points, policy)
    }
}

/// What a cached weight map was built from
#[derive(Debug, Clone, Copy, PartialEq)]
struct WeightsToken {
    generation: u64,
    version: PointSetVersion,
    policy: WeightPolicy,
}

#[derive(Debug)]
struct Committed {
    generation: u64,
    ebsd: Arc<Ebsd>,
}

#[derive(Debug)]
struct CachedWeights {
    token: WeightsToken,
    weights: Arc<NodeWeights>,
}

/// Owner of the committed scan and its node weight cache
///
/// All methods take `&self`, so a reader can be shared between threads
/// behind an `Arc`. Queries before the first successful load fail with
/// [EbsdError::Unloaded].
#[derive(Debug, Default)]
pub struct EbsdReader {
    config: ReaderConfig,
    committed: RwLock<Option<Committed>>,
    weights: RwLock<Option<CachedWeights>>,
}

impl EbsdReader {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_config(config: ReaderConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Load a scan file, replacing any committed data on success
    ///
    /// On failure the reader is left exactly as it was.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file_reader = EbsdFileReader::new();
        if !self.config.progress {
            file_reader.disable_progress();
        }
        let (header, records) = file_reader.parse(path.as_ref())?;
        self.load_records(header, records)
    }

    /// Load from a header and records of any source
    pub fn load_records<I>(&self, header: EbsdHeader, records: I) -> Result<()>
    where
        I: IntoIterator<Item = VoxelRecord>,
    {
        let ebsd = Arc::new(Ebsd::from_parts(header, records)?);

        let mut committed = self.committed.write();
        let generation = committed.as_ref().map_or(1, |c| c.generation + 1);
        *committed = Some(Committed { generation, ebsd });
        *self.weights.write() = None;

        debug!("Committed scan generation {generation}");
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.committed.read().is_some()
    }

    /// The committed scan
    pub fn snapshot(&self) -> Result<Arc<Ebsd>> {
        self.committed
            .read()
            .as_ref()
            .map(|c| Arc::clone(&c.ebsd))
            .ok_or(EbsdError::Unloaded)
    }

    /// Node weights with the configured policy
    pub fn node_weights(&self, points: &PointSet) -> Result<Arc<NodeWeights>> {
        self.node_weights_with(points, self.config.policy)
    }

    /// Node weights for a point set, built on first request
    ///
    /// Asking again with the same point set and policy returns the cached
    /// map. Anything else builds a new map and replaces the cache.
    pub fn node_weights_with(
        &self,
        points: &PointSet,
        policy: WeightPolicy,
    ) -> Result<Arc<NodeWeights>> {
        let (generation, ebsd) = {
            let committed = self.committed.read();
            let c = committed.as_ref().ok_or(EbsdError::Unloaded)?;
            (c.generation, Arc::clone(&c.ebsd))
        };

        let token = WeightsToken {
            generation,
            version: points.version(),
            policy,
        };

        if let Some(cached) = self.weights.read().as_ref() {
            if cached.token == token {
                debug!("Reusing node weights for point set {}", token.version);
                return Ok(Arc::clone(&cached.weights));
            }
        }

        let weights = Arc::new(ebsd.node_weights(points, policy)?);
        *self.weights.write() = Some(CachedWeights {
            token,
            weights: Arc::clone(&weights),
        });
        Ok(weights)
    }

    /// Point set version of the cached node weights, if any
    pub fn grain_weights_version(&self) -> Option<PointSetVersion> {
        self.weights.read().as_ref().map(|c| c.token.version)
    }

    fn with<T>(&self, f: impl FnOnce(&Ebsd) -> Result<T>) -> Result<T> {
        f(&*self.snapshot()?)
    }
}

/// Queries on the committed scan
impl EbsdReader {
    pub fn grain_num(&self) -> Result<usize> {
        self.with(|e| Ok(e.grain_num()))
    }

    pub fn grain_num_in_phase(&self, phase: PhaseId) -> Result<usize> {
        self.with(|e| e.grain_num_in_phase(phase))
    }

    pub fn phase_num(&self) -> Result<usize> {
        self.with(|e| Ok(e.phase_num()))
    }

    pub fn feature_id(&self, phase: PhaseId, local_id: LocalId) -> Result<FeatureId> {
        self.with(|e| e.feature_id(phase, local_id))
    }

    pub fn global_id(&self, phase: PhaseId, local_id: LocalId) -> Result<GlobalId> {
        self.with(|e| e.global_id(phase, local_id))
    }

    pub fn global_id_of(&self, feature_id: FeatureId) -> Result<GlobalId> {
        self.with(|e| e.global_id_of(feature_id))
    }

    pub fn phase_local_of(&self, global_id: GlobalId) -> Result<(PhaseId, LocalId)> {
        self.with(|e| e.phase_local_of(global_id))
    }

    pub fn avg_data<K: Into<GrainKey>>(&self, key: K) -> Result<AvgData> {
        self.with(|e| e.avg_data(key).cloned())
    }

    pub fn avg_data_local(&self, phase: PhaseId, local_id: LocalId) -> Result<AvgData> {
        self.with(|e| e.avg_data_local(phase, local_id).cloned())
    }

    pub fn euler_angles<K: Into<GrainKey>>(&self, key: K) -> Result<EulerAngles> {
        self.with(|e| e.euler_angles(key).copied())
    }

    pub fn data_at(&self, point: &Point) -> Result<PointData> {
        self.with(|e| e.data_at(point).cloned())
    }

    pub fn index_from_point(&self, point: &Point) -> Result<usize> {
        self.with(|e| e.index_from_point(point))
    }

    pub fn index_from_index<K: Into<GrainKey>>(&self, key: K) -> Result<usize> {
        self.with(|e| e.index_from_index(key))
    }
}
