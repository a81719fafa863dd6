// internal modules
use crate::error::{EbsdError, Result};
use crate::point::{NodeId, Point, PointSet};
use crate::readers::parsers;

// standard library
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

// external crates
use log::{debug, trace, warn};
use nom::IResult;

/// A simple reader for a points file
#[derive(Debug, Default)]
pub struct PointsFileReader;

impl PointsFileReader {
    /// Just calls Default::default(), nothing special to be initialised
    pub fn new() -> Self {
        Default::default()
    }

    /// Parses all query points from a points file
    ///
    /// Any whitespace at the beginning of the line is trimmed. Points without
    /// an explicit id are numbered by their position among the point lines.
    /// Lines that are neither comments nor points are skipped with a warning.
    pub fn parse(&mut self, path: &Path) -> Result<PointSet> {
        let io_error = |source| EbsdError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(io_error)?;
        let reader = BufReader::new(file);

        let mut nodes: Vec<(NodeId, Point)> = Vec::new();

        for (n, line) in reader.lines().enumerate() {
            let line = line.map_err(io_error)?;
            let line = line.trim(); // shadow needed to get around borrow

            // skip empty lines
            if line.is_empty() {
                continue;
            }

            // skip over any comment lines
            if parsers::is_comment(line) {
                trace!("[Comment] {line}");
                continue;
            }

            match parsers::point_line(line) {
                IResult::Ok((_, (id, point))) => {
                    let id = id.unwrap_or(nodes.len() as NodeId);
                    trace!("[ Point ] {id}: {point}");
                    nodes.push((id, point));
                }
                _ => warn!("Line {}: failed to parse \"{line}\" to a point", n + 1),
            }
        }

        let points = PointSet::new(nodes);
        for id in points.repeated_ids() {
            warn!("Node id {id} appears more than once in {}", path.display());
        }

        debug!("Read {} points from {}", points.len(), path.display());
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_and_explicit_ids() {
        let points = PointsFileReader::new()
            .parse(Path::new("./data/points.txt"))
            .unwrap();
        let ids: Vec<NodeId> = points.nodes().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![0, 1, 10, 11]);
        assert!(points.repeated_ids().is_empty());
    }

    #[test]
    fn positional_id_can_clash_with_explicit_id() {
        let points = PointsFileReader::new()
            .parse(Path::new("./data/points_repeated.txt"))
            .unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points.repeated_ids(), vec![1]);
    }
}
