//! Header values declared by a raw record source
//!
//! Sources fill in whatever their header declares and leave the rest as
//! `None`. The grid geometry is only derived once the whole header is known,
//! and missing values for active axes are a format error at that point.

// standard library
use std::collections::BTreeMap;

// internal modules
use crate::error::{EbsdError, Result};
use crate::grid::geometry::{GridGeometry, AXIS_NAMES};
use crate::utils::*;

// external crates
use log::{debug, warn};

/// Everything a scan header may declare about the grid and its contents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EbsdHeader {
    /// Declared dimension, inferred from the counts if missing
    pub dimension: Option<usize>,
    /// Voxel counts, `X_Dim` etc. A count of 0 marks an unused axis.
    pub counts: [Option<usize>; 3],
    /// Lower grid bounds, `X_Min` etc.
    pub min: [Option<f64>; 3],
    /// Upper grid bounds, `X_Max` etc.
    pub max: [Option<f64>; 3],
    /// Declared spacing, `X_step` etc. Only used as a cross-check.
    pub step: [Option<f64>; 3],
    /// Declared number of phases. Only used as a cross-check.
    pub phases: Option<usize>,
    /// Phase names, `Phase_<n>`
    pub phase_names: BTreeMap<usize, String>,
    /// Phase symmetry classes, `Symmetry_<n>`
    pub symmetries: BTreeMap<usize, u32>,
    /// Names of the custom columns following the standard ones
    pub custom_columns: Vec<String>,
}

impl EbsdHeader {
    /// Dimension to use for the grid
    ///
    /// An explicit `Dimension` wins, otherwise this is the last axis with more
    /// than one voxel.
    pub fn effective_dimension(&self) -> usize {
        self.dimension.unwrap_or_else(|| {
            self.counts
                .iter()
                .rposition(|n| n.unwrap_or(0) > 1)
                .map_or(1, |axis| axis + 1)
        })
    }

    /// Derive the grid geometry
    ///
    /// Axes within the dimension must declare a count, a minimum and a
    /// maximum. Unused axes default to a single voxel at the declared (or
    /// zero) minimum.
    pub fn geometry(&self) -> Result<GridGeometry> {
        let dimension = self.effective_dimension();
        let mut counts = [1; 3];
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];

        for axis in 0..3 {
            let name = AXIS_NAMES[axis].to_ascii_uppercase();
            if axis < dimension {
                counts[axis] = self.counts[axis]
                    .ok_or_else(|| EbsdError::Format(f!("header is missing {name}_Dim")))?;
                min[axis] = self.min[axis]
                    .ok_or_else(|| EbsdError::Format(f!("header is missing {name}_Min")))?;
                max[axis] = self.max[axis]
                    .ok_or_else(|| EbsdError::Format(f!("header is missing {name}_Max")))?;
            } else {
                // legacy 2D files write Z_Dim: 0
                counts[axis] = self.counts[axis].unwrap_or(1).max(1);
                min[axis] = self.min[axis].unwrap_or(0.0);
                max[axis] = self.max[axis].unwrap_or(min[axis]).max(min[axis]);
            }
        }

        let geometry = GridGeometry::new(dimension, counts, min, max)?;
        self.check_steps(&geometry);
        debug!("Header geometry: {geometry}");
        Ok(geometry)
    }

    /// Number of custom columns declared, if the header names any
    pub fn declared_custom_columns(&self) -> Option<usize> {
        match self.custom_columns.is_empty() {
            true => None,
            false => Some(self.custom_columns.len()),
        }
    }

    /// Declared steps only produce warnings when they disagree
    fn check_steps(&self, geometry: &GridGeometry) {
        for axis in geometry.active_axes() {
            if let Some(step) = self.step[axis] {
                if !is_close(step, geometry.spacing[axis], 1e-6) {
                    warn!(
                        "Declared {} step {} differs from derived spacing {}",
                        AXIS_NAMES[axis], step, geometry.spacing[axis]
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_2d() -> EbsdHeader {
        EbsdHeader {
            counts: [Some(4), Some(2), Some(0)],
            min: [Some(0.0), Some(0.0), Some(0.0)],
            max: [Some(4.0), Some(1.0), Some(0.0)],
            ..Default::default()
        }
    }

    #[test]
    fn dimension_is_inferred() {
        assert_eq!(header_2d().effective_dimension(), 2);

        let mut header = header_2d();
        header.counts[2] = Some(3);
        assert_eq!(header.effective_dimension(), 3);

        header.dimension = Some(2);
        assert_eq!(header.effective_dimension(), 2);
    }

    #[test]
    fn legacy_zero_z_count() {
        let geometry = header_2d().geometry().unwrap();
        assert_eq!(geometry.dimension, 2);
        assert_eq!(geometry.counts, [4, 2, 1]);
        assert_eq!(geometry.spacing, [1.0, 0.5, 0.0]);
    }

    #[test]
    fn missing_active_axis_value() {
        let mut header = header_2d();
        header.max[1] = None;
        let error = header.geometry().unwrap_err();
        assert!(error.is_format());
        assert!(error.to_string().contains("Y_Max"));
    }

    #[test]
    fn invalid_values_are_configuration_errors() {
        let mut header = header_2d();
        header.max[0] = Some(-1.0);
        assert!(header.geometry().unwrap_err().is_configuration());
    }

    #[test]
    fn custom_columns() {
        let mut header = header_2d();
        assert_eq!(header.declared_custom_columns(), None);
        header.custom_columns = vec!["temperature".into(), "ci".into()];
        assert_eq!(header.declared_custom_columns(), Some(2));
    }
}
