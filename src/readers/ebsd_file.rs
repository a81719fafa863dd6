// internal modules
use crate::error::{EbsdError, Result};
use crate::grid::{EbsdHeader, RecordPosition, VoxelRecord};
use crate::ids::{FeatureId, PhaseId};
use crate::point::Point;
use crate::readers::parsers;
use crate::utils::*;

// standard library
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

// external crates
use kdam::{Bar, BarBuilder, BarExt};
use log::{debug, trace};
use nom::IResult;

/// Number of fixed columns before any custom columns
pub const STANDARD_COLUMNS: usize = 9;

/// Reader for EBSD text files
///
/// Collects the header and the raw voxel records of a scan. Nothing is
/// checked against the grid here, placing records is left to the
/// [PointDataStore](crate::grid::PointDataStore) so that every source goes
/// through the same validation.
///
/// Data lines are `phi1 Phi phi2 x y z feature_id phase symmetry [custom...]`
/// with angles in radians and `x y z` the voxel centroid.
///
/// Example:
/// ```ignore
///     let mut reader = EbsdFileReader::new();
///     let (header, records) = reader.parse(Path::new("scan.txt"))?;
/// ```
#[derive(Debug, Default)]
pub struct EbsdFileReader {
    /// Header values seen so far
    header: EbsdHeader,
    /// Voxel records in file order
    records: Vec<VoxelRecord>,
    /// Named custom columns as (column number, name)
    columns: Vec<(usize, String)>,
    /// Disable progress bar?
    disable_progress: bool,
}

impl EbsdFileReader {
    /// Just calls Default::default(), nothing special to be initialised
    pub fn new() -> Self {
        Default::default()
    }

    /// Do not print the kdam progress indicators
    pub fn disable_progress(&mut self) {
        debug!("Progress bar disabled");
        self.disable_progress = true;
    }

    /// Read the header and every voxel record of a scan file
    pub fn parse(&mut self, path: &Path) -> Result<(EbsdHeader, Vec<VoxelRecord>)> {
        let io_error = |source| EbsdError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(io_error)?;
        let reader = BufReader::new(file);
        let mut progress_bar = self.init_progress_bar();

        debug!("Parsing {}", path.display());
        for (n, line) in reader.lines().enumerate() {
            if let Some(bar) = progress_bar.as_mut() {
                bar.update(1).map_err(io_error)?;
            }
            let line = line.map_err(io_error)?;
            self.parse_line(n + 1, line.trim())?;
        }

        // need an extra line for clean spacing if the progress bar is printed
        if progress_bar.is_some() {
            eprintln!()
        }

        self.finish_columns();
        debug!(
            "Found {} voxel records and {} custom columns",
            self.records.len(),
            self.header.custom_columns.len()
        );

        Ok((
            std::mem::take(&mut self.header),
            std::mem::take(&mut self.records),
        ))
    }

    fn init_progress_bar(&self) -> Option<Bar> {
        if self.disable_progress {
            return None;
        }
        BarBuilder::default()
            .delay(0.0)
            .unit(" lines")
            .unit_scale(true)
            .build()
            .ok()
    }

    fn parse_line(&mut self, n: usize, line: &str) -> Result<()> {
        if line.is_empty() {
            return Ok(());
        }

        if parsers::is_comment(line) {
            match parsers::header_entry(line) {
                IResult::Ok((_, (key, value))) => self.parse_header_entry(n, key, value)?,
                _ => trace!("[Comment] {line}"),
            }
            return Ok(());
        }

        let values = match parsers::number_list(line) {
            IResult::Ok((_, values)) => values,
            _ => return Err(Self::parse_error(n, line)),
        };
        self.records.push(Self::voxel_record(n, line, &values)?);
        Ok(())
    }

    /// Interpret a recognised `key: value` header line
    fn parse_header_entry(&mut self, n: usize, key: &str, value: &str) -> Result<()> {
        let h = &mut self.header;
        let bad_value = || Self::parse_error(n, &f!("{key}: {value}"));

        if let Some((axis, field)) = Self::axis_key(key) {
            match field {
                "Dim" => h.counts[axis] = Some(value.parse().map_err(|_| bad_value())?),
                "Min" => h.min[axis] = Some(value.parse().map_err(|_| bad_value())?),
                "Max" => h.max[axis] = Some(value.parse().map_err(|_| bad_value())?),
                _ => h.step[axis] = Some(value.parse().map_err(|_| bad_value())?),
            }
        } else if key == "Dimension" {
            h.dimension = Some(value.parse().map_err(|_| bad_value())?);
        } else if key == "Phases" {
            h.phases = Some(value.parse().map_err(|_| bad_value())?);
        } else if let IResult::Ok((_, phase)) = parsers::indexed_key("Phase_")(key) {
            h.phase_names.insert(phase, value.to_string());
        } else if let IResult::Ok((_, phase)) = parsers::indexed_key("Symmetry_")(key) {
            h.symmetries
                .insert(phase, value.parse().map_err(|_| bad_value())?);
        } else if let IResult::Ok((_, column)) = parsers::column_number(key) {
            if column > STANDARD_COLUMNS {
                self.columns.push((column, value.to_string()));
            }
        } else {
            trace!("[Comment] {key}: {value}");
            return Ok(());
        }

        trace!("[Header ] {key} = {value}");
        Ok(())
    }

    /// Axis and field of keys like `X_Dim`, `Y_Max` or `Z_step`
    fn axis_key(key: &str) -> Option<(usize, &str)> {
        let (axis, field) = key.split_once('_')?;
        let axis = match axis {
            "X" => 0,
            "Y" => 1,
            "Z" => 2,
            _ => return None,
        };
        match field {
            "Dim" | "Min" | "Max" => Some((axis, field)),
            "step" | "Step" => Some((axis, "step")),
            _ => None,
        }
    }

    /// Custom column names in column order
    fn finish_columns(&mut self) {
        self.columns.sort_by_key(|(column, _)| *column);
        self.header.custom_columns = self.columns.drain(..).map(|(_, name)| name).collect();
    }

    fn voxel_record(n: usize, line: &str, values: &[f64]) -> Result<VoxelRecord> {
        if values.len() < STANDARD_COLUMNS || values.iter().any(|v| !v.is_finite()) {
            return Err(Self::parse_error(n, line));
        }

        let integer = |v: f64| match v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 {
            true => Ok(v as u32),
            false => Err(Self::parse_error(n, line)),
        };

        Ok(VoxelRecord {
            position: RecordPosition::Centroid(Point::new(values[3], values[4], values[5])),
            angles: [values[0], values[1], values[2]],
            feature_id: FeatureId(integer(values[6])?),
            phase: PhaseId(integer(values[7])? as usize),
            symmetry: integer(values[8])?,
            custom: values[STANDARD_COLUMNS..].to_vec(),
        })
    }

    fn parse_error(line: usize, content: &str) -> EbsdError {
        EbsdError::Parse {
            line,
            content: content.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn read(lines: &[&str]) -> Result<(EbsdHeader, Vec<VoxelRecord>)> {
        let mut reader = EbsdFileReader::new();
        for (n, line) in lines.iter().enumerate() {
            reader.parse_line(n + 1, line.trim())?;
        }
        reader.finish_columns();
        Ok((reader.header, reader.records))
    }

    #[test]
    fn header_keys() {
        let (header, records) = read(&[
            "# Created by hand",
            "# X_Dim: 2",
            "# Y_Dim: 3",
            "# Z_Dim: 0",
            "# X_Min: 0.0",
            "# X_Max: 2.0",
            "# X_step: 1.0",
            "# Dimension: 2",
            "# Phases: 1",
            "# Phase_1: Ferrite",
            "# Symmetry_1: 43",
            "# Column 1: phi1",
            "# Column 11: Second",
            "# Column 10: First",
        ])
        .unwrap();

        assert!(records.is_empty());
        assert_eq!(header.counts, [Some(2), Some(3), Some(0)]);
        assert_eq!(header.min[0], Some(0.0));
        assert_eq!(header.max, [Some(2.0), None, None]);
        assert_eq!(header.step[0], Some(1.0));
        assert_eq!(header.dimension, Some(2));
        assert_eq!(header.phases, Some(1));
        assert_eq!(header.phase_names[&1], "Ferrite");
        assert_eq!(header.symmetries[&1], 43);
        assert_eq!(header.custom_columns, vec!["First", "Second"]);
    }

    #[test]
    fn data_lines() {
        let (_, records) = read(&["0.1 0.2 0.3 0.5 1.5 0 7 1 43 2.5 -1"]).unwrap();
        let record = &records[0];
        assert_eq!(record.angles, [0.1, 0.2, 0.3]);
        assert_eq!(
            record.position,
            RecordPosition::Centroid(Point::new(0.5, 1.5, 0.0))
        );
        assert_eq!(record.feature_id, FeatureId(7));
        assert_eq!(record.phase, PhaseId(1));
        assert_eq!(record.symmetry, 43);
        assert_eq!(record.custom, vec![2.5, -1.0]);
    }

    #[rstest]
    #[case::too_few_columns("0.1 0.2 0.3 0.5 1.5 0 7 1")]
    #[case::fractional_feature("0.1 0.2 0.3 0.5 1.5 0 7.5 1 43")]
    #[case::negative_phase("0.1 0.2 0.3 0.5 1.5 0 7 -1 43")]
    #[case::not_a_number("0.1 0.2 0.3 0.5 1.5 0 seven 1 43")]
    #[case::non_finite("0.1 nan 0.3 0.5 1.5 0 7 1 43")]
    fn bad_data_lines(#[case] line: &str) {
        let error = read(&["# X_Dim: 1", line]).unwrap_err();
        assert!(matches!(error, EbsdError::Parse { line: 2, .. }), "{error}");
    }

    #[test]
    fn bad_header_value() {
        let error = read(&["# X_Dim: many"]).unwrap_err();
        assert!(error.is_format());
        assert!(error.to_string().contains("X_Dim"));
    }
}
