//! Strongly typed grain and phase identifiers
//!
//! Grains are addressed through three overlapping schemes:
//!
//! | Identifier          | Meaning                                              |
//! | ------------------- | ---------------------------------------------------- |
//! | [FeatureId]         | grain number as written in the EBSD file             |
//! | [GlobalId]          | dense, zero-based index into the grain averages      |
//! | ([PhaseId], [LocalId]) | position of a grain within its phase's grain list |
//!
//! Keeping these as distinct types stops a feature id from ever being used
//! to index the average data directly, which is only correct by accident
//! when the file numbers grains from zero without gaps.
//!
//! All conversions between the schemes go through the
//! [GrainMap](crate::grains::GrainMap) built during aggregation.

// external crates
use serde::{Deserialize, Serialize};

/// Grain number as it appears in the source scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureId(pub u32);

/// Dense zero-based grain index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GlobalId(pub usize);

/// Phase number as it appears in the source scan
///
/// Phase 0 is always valid, and is simply empty for files that number their
/// phases from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhaseId(pub usize);

/// Position of a grain in its phase's grain list
///
/// Only meaningful together with a [PhaseId].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocalId(pub usize);

impl FeatureId {
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl GlobalId {
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl PhaseId {
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl LocalId {
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "feature {}", self.0)
    }
}

impl std::fmt::Display for GlobalId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "grain {}", self.0)
    }
}

impl std::fmt::Display for PhaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "phase {}", self.0)
    }
}

impl std::fmt::Display for LocalId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "local {}", self.0)
    }
}

/// Either kind of grain identifier accepted by
/// [GrainMap::index_from_index](crate::grains::GrainMap::index_from_index)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrainKey {
    /// Raw grain number from the file, translated through the id map
    Feature(FeatureId),
    /// Already a dense index
    Global(GlobalId),
}

impl From<FeatureId> for GrainKey {
    fn from(id: FeatureId) -> Self {
        Self::Feature(id)
    }
}

impl From<GlobalId> for GrainKey {
    fn from(id: GlobalId) -> Self {
        Self::Global(id)
    }
}

impl std::fmt::Display for GrainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Feature(id) => write!(f, "{id}"),
            Self::Global(id) => write!(f, "{id}"),
        }
    }
}
