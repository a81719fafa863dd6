//! Grain and phase weights for arbitrary query points
//!
//! Bridges the scan grid to an independent set of points, typically the
//! nodes of a simulation mesh. Rather than a hard grain id per node, every
//! point gets a normalised distribution over the grains around it, so that
//! initial conditions can be blended smoothly across grain boundaries.
//!
//! # Details
//!
//! For each point:
//!
//! 1. find the containing voxel, tolerating points up to one voxel outside
//!    the grid
//! 2. collect the neighbouring voxels allowed by the [Neighbourhood] policy
//! 3. add the [Weighting] of every collected voxel to its grain
//! 4. normalise, then sum grain weights by phase
//!
//! A neighbour is any voxel at most one index step from the containing voxel
//! along every active axis whose centroid is also within one voxel spacing
//! of the point along every active axis. The containing voxel itself is
//! always included. Weights are listed in ascending id order, which also
//! fixes the order in which ties are reported.
//!
//! # Example
//!
//! ```rust
//! # use ebsd::readers::read_ebsd;
//! # use ebsd::point::{Point, PointSet};
//! # use ebsd::weights::WeightPolicy;
//! let ebsd = read_ebsd("./data/ebsd/grains_2x2.txt").unwrap();
//!
//! // a point right between all four voxels
//! let nodes = PointSet::from_points(&[Point::new(1.0, 1.0, 0.0)]);
//! let weights = ebsd.node_weights(&nodes, WeightPolicy::default()).unwrap();
//!
//! assert_eq!(weights.dense_phase(0).unwrap(), vec![0.5, 0.5]);
//! ```

// standard library
use std::collections::BTreeMap;

// internal modules
use crate::error::{EbsdError, Result};
use crate::grains::Grains;
use crate::grid::{GridGeometry, PointDataStore};
use crate::ids::{GlobalId, PhaseId};
use crate::point::{NodeId, Point, PointSet, PointSetVersion};
use crate::utils::*;

// external crates
use clap::ValueEnum;
use itertools::iproduct;
use log::{debug, trace, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Which voxels around a point contribute to its weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Neighbourhood {
    /// Face, edge, and corner neighbours of the containing voxel
    #[default]
    Full,
    /// Face neighbours of the containing voxel only
    Face,
}

/// How much a single contributing voxel counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Weighting {
    /// Every voxel counts the same
    #[default]
    Uniform,
    /// Voxels count by the inverse distance from the point to their centroid
    InverseDistance,
}

impl std::fmt::Display for Neighbourhood {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Face => write!(f, "face"),
        }
    }
}

impl std::fmt::Display for Weighting {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Uniform => write!(f, "uniform"),
            Self::InverseDistance => write!(f, "inverse-distance"),
        }
    }
}

/// Neighbourhood and weighting used to build weight maps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightPolicy {
    pub neighbourhood: Neighbourhood,
    pub weighting: Weighting,
}

/// Normalised weights of a single point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointWeights {
    /// Grain weights in ascending global id order
    pub grains: Vec<(GlobalId, f64)>,
    /// Phase weights in ascending phase order
    pub phases: Vec<(PhaseId, f64)>,
}

/// Weights of a single query point
///
/// A pure function of the grid, the loaded data, and the point, so any point
/// can be checked in isolation against a hand-built grid.
pub fn point_weights(
    geometry: &GridGeometry,
    store: &PointDataStore,
    grains: &Grains,
    point: &Point,
    policy: &WeightPolicy,
) -> Result<PointWeights> {
    let centre = geometry.ijk_from_point(point)?;
    let coords = point.coords();

    let mut ranges = [(0, 0); 3];
    for axis in geometry.active_axes() {
        let n = geometry.counts[axis];
        ranges[axis] = (centre[axis].saturating_sub(1), (centre[axis] + 1).min(n - 1));
    }

    // keeps a point sitting on a centroid finite
    let floor = (1.0e-9 * geometry.min_spacing()).max(f64::MIN_POSITIVE);

    let mut by_grain: BTreeMap<GlobalId, f64> = BTreeMap::new();
    for (k, j, i) in iproduct!(
        ranges[2].0..=ranges[2].1,
        ranges[1].0..=ranges[1].1,
        ranges[0].0..=ranges[0].1
    ) {
        let ijk = [i, j, k];
        if !is_neighbour(geometry, centre, ijk, &coords, policy.neighbourhood) {
            continue;
        }

        let index = geometry.linear_index(ijk);
        let voxel = store
            .get(index)
            .ok_or_else(|| EbsdError::Lookup(f!("voxel {index} missing from the store")))?;
        let global_id = grains.map().global_id_of(voxel.feature_id)?;

        let weight = match policy.weighting {
            Weighting::Uniform => 1.0,
            Weighting::InverseDistance => {
                1.0 / distance(geometry, &coords, &geometry.centroid(ijk).coords()).max(floor)
            }
        };
        *by_grain.entry(global_id).or_insert(0.0) += weight;
    }

    let total: f64 = by_grain.values().sum();
    let mut by_phase: BTreeMap<PhaseId, f64> = BTreeMap::new();
    let mut grain_weights = Vec::with_capacity(by_grain.len());
    for (global_id, weight) in by_grain {
        let weight = weight / total;
        let (phase, _) = grains.map().phase_local_of(global_id)?;
        *by_phase.entry(phase).or_insert(0.0) += weight;
        grain_weights.push((global_id, weight));
    }

    trace!("{point} -> {:?}", grain_weights);
    Ok(PointWeights {
        grains: grain_weights,
        phases: by_phase.into_iter().collect(),
    })
}

/// Whether voxel `ijk` contributes to a point contained in voxel `centre`
fn is_neighbour(
    geometry: &GridGeometry,
    centre: [usize; 3],
    ijk: [usize; 3],
    coords: &[f64; 3],
    neighbourhood: Neighbourhood,
) -> bool {
    if ijk == centre {
        return true;
    }

    let steps = (0..3).filter(|&axis| ijk[axis] != centre[axis]).count();
    if neighbourhood == Neighbourhood::Face && steps > 1 {
        return false;
    }

    let centroid = geometry.centroid(ijk).coords();
    geometry.active_axes().all(|axis| {
        (coords[axis] - centroid[axis]).abs() <= geometry.spacing[axis] * (1.0 + 1.0e-9)
    })
}

/// Euclidean distance over the active axes only
fn distance(geometry: &GridGeometry, a: &[f64; 3], b: &[f64; 3]) -> f64 {
    geometry
        .active_axes()
        .map(|axis| (a[axis] - b[axis]).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Grain and phase weight maps for a whole point set
///
/// Built once for a specific [PointSet] and read-only afterwards. The
/// [PointSetVersion] of the set it was built for is kept alongside so that
/// callers can tell whether the maps still apply. A node id repeated in the
/// point set keeps the weights of its last occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeWeights {
    version: PointSetVersion,
    policy: WeightPolicy,
    grain_num: usize,
    phase_num: usize,
    grain: BTreeMap<NodeId, Vec<(GlobalId, f64)>>,
    phase: BTreeMap<NodeId, Vec<(PhaseId, f64)>>,
}

impl NodeWeights {
    /// Compute weights for every point in the set
    ///
    /// Points are processed in parallel, the result is identical to a
    /// sequential run. Fails on the first point that cannot be resolved.
    pub fn build(
        geometry: &GridGeometry,
        store: &PointDataStore,
        grains: &Grains,
        points: &PointSet,
        policy: WeightPolicy,
    ) -> Result<Self> {
        let repeated = points.repeated_ids();
        if !repeated.is_empty() {
            warn!(
                "{} node ids are used more than once, keeping the last point for each: {:?}",
                repeated.len(),
                repeated
            );
        }

        let weights = points
            .nodes()
            .par_iter()
            .map(|(id, p)| point_weights(geometry, store, grains, p, &policy).map(|w| (*id, w)))
            .collect::<Result<Vec<(NodeId, PointWeights)>>>()?;

        let mut grain = BTreeMap::new();
        let mut phase = BTreeMap::new();
        for (id, w) in weights {
            grain.insert(id, w.grains);
            phase.insert(id, w.phases);
        }

        debug!(
            "Built weights for {} nodes (point set {}, {} neighbourhood, {} weighting)",
            grain.len(),
            points.version(),
            policy.neighbourhood,
            policy.weighting
        );

        Ok(Self {
            version: points.version(),
            policy,
            grain_num: grains.map().grain_num(),
            phase_num: grains.map().phase_num(),
            grain,
            phase,
        })
    }

    /// Version of the point set these weights were built for
    pub fn version(&self) -> PointSetVersion {
        self.version
    }

    pub fn policy(&self) -> WeightPolicy {
        self.policy
    }

    /// Number of nodes with weights
    pub fn len(&self) -> usize {
        self.grain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grain.is_empty()
    }

    /// Sparse grain weights of a node
    pub fn grain_weights(&self, node: NodeId) -> Option<&[(GlobalId, f64)]> {
        self.grain.get(&node).map(Vec::as_slice)
    }

    /// Sparse phase weights of a node
    pub fn phase_weights(&self, node: NodeId) -> Option<&[(PhaseId, f64)]> {
        self.phase.get(&node).map(Vec::as_slice)
    }

    /// Node to grain weight map
    pub fn grain_map(&self) -> &BTreeMap<NodeId, Vec<(GlobalId, f64)>> {
        &self.grain
    }

    /// Node to phase weight map
    pub fn phase_map(&self) -> &BTreeMap<NodeId, Vec<(PhaseId, f64)>> {
        &self.phase
    }

    /// Grain weights of a node as a vector over every grain
    pub fn dense_grain(&self, node: NodeId) -> Option<Vec<f64>> {
        let mut dense = vec![0.0; self.grain_num];
        for (id, w) in self.grain_weights(node)? {
            dense[id.index()] = *w;
        }
        Some(dense)
    }

    /// Phase weights of a node as a vector over every phase
    pub fn dense_phase(&self, node: NodeId) -> Option<Vec<f64>> {
        let mut dense = vec![0.0; self.phase_num];
        for (id, w) in self.phase_weights(node)? {
            dense[id.index()] = *w;
        }
        Some(dense)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{RecordPosition, VoxelRecord};
    use crate::ids::FeatureId;
    use rstest::{fixture, rstest};

    struct Scan {
        geometry: GridGeometry,
        store: PointDataStore,
        grains: Grains,
    }

    impl Scan {
        /// Unit-spaced 2D grid from per-voxel features and phases
        fn new(nx: usize, ny: usize, features: &[u32], phases: &[usize]) -> Self {
            Self::with_counts([nx, ny, 1], features, phases)
        }

        fn with_counts(counts: [usize; 3], features: &[u32], phases: &[usize]) -> Self {
            let dimension = if counts[2] > 1 { 3 } else { 2 };
            let nz = if counts[2] > 1 { counts[2] as f64 } else { 0.0 };
            let max = [counts[0] as f64, counts[1] as f64, nz];
            let geometry = GridGeometry::new(dimension, counts, [0.0; 3], max).unwrap();
            let records = features.iter().zip(phases).map(|(&f, &p)| VoxelRecord {
                position: RecordPosition::Sequential,
                angles: [0.0; 3],
                phase: PhaseId(p),
                feature_id: FeatureId(f),
                symmetry: 43,
                custom: Vec::new(),
            });
            let store = PointDataStore::from_records(&geometry, None, records).unwrap();
            let grains = Grains::aggregate(&geometry, &store);
            Self {
                geometry,
                store,
                grains,
            }
        }

        fn weights(&self, point: Point, policy: WeightPolicy) -> Result<PointWeights> {
            point_weights(&self.geometry, &self.store, &self.grains, &point, &policy)
        }
    }

    #[fixture]
    fn two_by_two() -> Scan {
        Scan::new(2, 2, &[1, 1, 2, 2], &[0, 0, 1, 1])
    }

    /// 4x4, grain 1 (phase 0) in the left half and grain 2 (phase 1) on the right
    #[fixture]
    fn halves() -> Scan {
        let features: Vec<u32> = (0..16).map(|i| if i % 4 < 2 { 1 } else { 2 }).collect();
        let phases: Vec<usize> = features.iter().map(|&f| f as usize - 1).collect();
        Scan::new(4, 4, &features, &phases)
    }

    /// 2x2x2, every voxel its own grain, phase 0 below z = 1 and phase 1 above
    #[fixture]
    fn cube() -> Scan {
        let features: Vec<u32> = (1..=8).collect();
        let phases: Vec<usize> = (0..8).map(|i| i / 4).collect();
        Scan::with_counts([2, 2, 2], &features, &phases)
    }

    fn assert_normalised(weights: &PointWeights) {
        let grain_sum: f64 = weights.grains.iter().map(|(_, w)| w).sum();
        let phase_sum: f64 = weights.phases.iter().map(|(_, w)| w).sum();
        assert!((grain_sum - 1.0).abs() < 1e-12, "{weights:?}");
        assert!((phase_sum - 1.0).abs() < 1e-12, "{weights:?}");
        assert!(weights.grains.iter().all(|(_, w)| *w >= 0.0));
        assert!(weights.phases.iter().all(|(_, w)| *w >= 0.0));
    }

    #[rstest]
    #[case(Neighbourhood::Full, Weighting::Uniform)]
    #[case(Neighbourhood::Full, Weighting::InverseDistance)]
    fn centre_of_two_by_two(
        two_by_two: Scan,
        #[case] neighbourhood: Neighbourhood,
        #[case] weighting: Weighting,
    ) {
        let policy = WeightPolicy {
            neighbourhood,
            weighting,
        };
        let weights = two_by_two.weights(Point::new(1.0, 1.0, 0.0), policy).unwrap();
        assert_normalised(&weights);
        assert_eq!(weights.grains.len(), 2);
        assert!((weights.grains[0].1 - 0.5).abs() < 1e-12);
        assert!((weights.phases[0].1 - 0.5).abs() < 1e-12);
        assert!((weights.phases[1].1 - 0.5).abs() < 1e-12);
    }

    #[rstest]
    #[case(Point::new(0.5, 0.5, 0.0))]
    #[case(Point::new(0.2, 3.9, 0.0))]
    #[case(Point::new(-0.5, 2.0, 0.0))]
    fn single_grain_neighbourhood_is_one_hot(halves: Scan, #[case] point: Point) {
        for weighting in [Weighting::Uniform, Weighting::InverseDistance] {
            let policy = WeightPolicy {
                weighting,
                ..Default::default()
            };
            let weights = halves.weights(point, policy).unwrap();
            assert_eq!(weights.grains, vec![(GlobalId(0), 1.0)]);
            assert_eq!(weights.phases, vec![(PhaseId(0), 1.0)]);
        }
    }

    #[rstest]
    fn boundary_split_is_ordered_by_global_id(halves: Scan) {
        let weights = halves
            .weights(Point::new(2.0, 2.0, 0.0), WeightPolicy::default())
            .unwrap();
        assert_eq!(weights.grains, vec![(GlobalId(0), 0.5), (GlobalId(1), 0.5)]);
        assert_eq!(weights.phases, vec![(PhaseId(0), 0.5), (PhaseId(1), 0.5)]);
    }

    #[rstest]
    fn face_neighbourhood(halves: Scan) {
        let policy = WeightPolicy {
            neighbourhood: Neighbourhood::Face,
            ..Default::default()
        };
        // centre (2,2) and face neighbours (1,2), (2,1) only
        let weights = halves.weights(Point::new(2.0, 2.0, 0.0), policy).unwrap();
        assert_normalised(&weights);
        assert!((weights.grains[0].1 - 1.0 / 3.0).abs() < 1e-12);
        assert!((weights.grains[1].1 - 2.0 / 3.0).abs() < 1e-12);
    }

    #[rstest]
    fn inverse_distance_favours_the_nearer_grain(halves: Scan) {
        let point = Point::new(1.9, 0.5, 0.0);
        let uniform = halves.weights(point, WeightPolicy::default()).unwrap();
        assert_eq!(uniform.grains, vec![(GlobalId(0), 0.5), (GlobalId(1), 0.5)]);

        let policy = WeightPolicy {
            weighting: Weighting::InverseDistance,
            ..Default::default()
        };
        let weighted = halves.weights(point, policy).unwrap();
        assert_normalised(&weighted);
        assert!(weighted.grains[0].1 > 0.5);
    }

    #[rstest]
    fn point_on_a_centroid_stays_finite(halves: Scan) {
        let policy = WeightPolicy {
            weighting: Weighting::InverseDistance,
            ..Default::default()
        };
        let weights = halves.weights(Point::new(1.5, 1.5, 0.0), policy).unwrap();
        assert_normalised(&weights);
        assert!(weights.grains[0].1 > 0.999);
    }

    #[rstest]
    fn weights_always_normalised(halves: Scan) {
        for policy in [
            WeightPolicy::default(),
            WeightPolicy {
                neighbourhood: Neighbourhood::Face,
                weighting: Weighting::InverseDistance,
            },
        ] {
            for step_x in 0..=16 {
                for step_y in 0..=16 {
                    let p = Point::new(step_x as f64 * 0.25, step_y as f64 * 0.25, 0.0);
                    assert_normalised(&halves.weights(p, policy).unwrap());
                }
            }
        }
    }

    #[rstest]
    fn node_weights_for_a_point_set(two_by_two: Scan) {
        let points = PointSet::new(vec![
            (100, Point::new(1.0, 1.0, 0.0)),
            (200, Point::new(0.9, 0.2, 0.0)),
        ]);
        let weights = NodeWeights::build(
            &two_by_two.geometry,
            &two_by_two.store,
            &two_by_two.grains,
            &points,
            WeightPolicy::default(),
        )
        .unwrap();

        assert_eq!(weights.len(), 2);
        assert_eq!(weights.version(), points.version());
        assert_eq!(weights.dense_phase(100).unwrap(), vec![0.5, 0.5]);
        assert_eq!(weights.dense_grain(100).unwrap(), vec![0.5, 0.5]);
        assert_eq!(weights.grain_weights(300), None);

        // only (0,0) and (1,0) are within one spacing of (0.9, 0.2)
        assert_eq!(weights.dense_grain(200).unwrap(), vec![1.0, 0.0]);
        assert_eq!(weights.dense_phase(200).unwrap(), vec![1.0, 0.0]);
    }

    #[rstest]
    fn unresolvable_point_fails_the_build(two_by_two: Scan) {
        let points = PointSet::from_points(&[Point::new(1.0, 1.0, 0.0), Point::new(9.0, 1.0, 0.0)]);
        let error = NodeWeights::build(
            &two_by_two.geometry,
            &two_by_two.store,
            &two_by_two.grains,
            &points,
            WeightPolicy::default(),
        )
        .unwrap_err();
        assert!(error.is_range());
    }

    #[rstest]
    #[case(Weighting::Uniform)]
    #[case(Weighting::InverseDistance)]
    fn centre_of_a_cube(cube: Scan, #[case] weighting: Weighting) {
        let policy = WeightPolicy {
            neighbourhood: Neighbourhood::Full,
            weighting,
        };
        let weights = cube.weights(Point::new(1.0, 1.0, 1.0), policy).unwrap();
        assert_normalised(&weights);
        assert_eq!(weights.grains.len(), 8);
        for (n, (id, w)) in weights.grains.iter().enumerate() {
            assert_eq!(*id, GlobalId(n));
            assert!((w - 0.125).abs() < 1e-12);
        }
        assert_eq!(weights.phases.len(), 2);
        assert!((weights.phases[0].1 - 0.5).abs() < 1e-12);
    }

    #[rstest]
    fn face_neighbours_of_a_cube(cube: Scan) {
        let policy = WeightPolicy {
            neighbourhood: Neighbourhood::Face,
            weighting: Weighting::Uniform,
        };
        // contained in the upper corner voxel (1, 1, 1)
        let weights = cube.weights(Point::new(1.0, 1.0, 1.0), policy).unwrap();
        assert_normalised(&weights);
        let ids: Vec<GlobalId> = weights.grains.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![GlobalId(3), GlobalId(5), GlobalId(6), GlobalId(7)]);
        assert_eq!(
            weights.phases,
            vec![(PhaseId(0), 0.25), (PhaseId(1), 0.75)]
        );
    }

    #[rstest]
    fn repeated_node_ids_keep_the_last_point(two_by_two: Scan) {
        let points = PointSet::new(vec![
            (4, Point::new(0.5, 0.2, 0.0)),
            (4, Point::new(1.5, 1.8, 0.0)),
        ]);
        let weights = NodeWeights::build(
            &two_by_two.geometry,
            &two_by_two.store,
            &two_by_two.grains,
            &points,
            WeightPolicy::default(),
        )
        .unwrap();
        assert_eq!(weights.len(), 1);
        assert_eq!(weights.dense_grain(4).unwrap(), vec![0.0, 1.0]);
    }
}
