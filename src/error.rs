//! Error types for reading and indexing EBSD data
//!
//! Failures fall into four broad groups:
//!
//! | Group         | Variants                        | Effect                        |
//! | ------------- | ------------------------------- | ----------------------------- |
//! | Configuration | `Configuration`, `InvalidConfig`| load aborted, nothing stored  |
//! | Format        | `Format`, `Parse`, `Io`         | load aborted, nothing stored  |
//! | Lookup        | `Lookup`, `Unloaded`            | single query fails            |
//! | Range         | `Range`                         | single query fails            |
//!
//! Configuration and format errors are fatal to a load. The reader is left
//! exactly as it was before the attempt, so a reader that was never loaded
//! stays unusable. Lookup and range errors only concern the query that raised
//! them.

// standard library
use std::io;
use std::path::PathBuf;

// external crates
use thiserror::Error;

/// Result type for EBSD operations
pub type Result<T> = std::result::Result<T, EbsdError>;

/// Everything that can go wrong while loading or querying EBSD data
#[derive(Debug, Error)]
pub enum EbsdError {
    /// Grid description from the header is unusable
    #[error("invalid grid geometry: {0}")]
    Configuration(String),

    /// A reader configuration file could not be deserialised
    #[error("invalid configuration in {path}")]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The voxel records disagree with the header or with each other
    #[error("malformed EBSD data: {0}")]
    Format(String),

    /// A line that could not be parsed at all
    #[error("line {line}: unable to parse \"{content}\"")]
    Parse { line: usize, content: String },

    /// Underlying file access failed
    #[error("could not read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Unknown feature/global id or an out of range (phase, local id) pair
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// Query made before any data were successfully loaded
    #[error("no EBSD data loaded")]
    Unloaded,

    /// Query point too far outside the grid to resolve
    #[error("point ({x}, {y}, {z}) is outside of the grid: {reason}")]
    Range {
        x: f64,
        y: f64,
        z: f64,
        reason: String,
    },
}

impl EbsdError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::InvalidConfig { .. })
    }

    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_) | Self::Parse { .. } | Self::Io { .. })
    }

    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::Lookup(_) | Self::Unloaded)
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Self::Range { .. })
    }

    /// True for errors that abort a load rather than a single query
    pub fn is_fatal(&self) -> bool {
        self.is_configuration() || self.is_format()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(EbsdError::Configuration("x".into()).is_fatal());
        assert!(EbsdError::Format("x".into()).is_format());
        assert!(EbsdError::Parse {
            line: 3,
            content: "abc".into()
        }
        .is_format());
        assert!(EbsdError::Unloaded.is_lookup());
        assert!(!EbsdError::Unloaded.is_fatal());

        let range = EbsdError::Range {
            x: 1.0,
            y: 2.0,
            z: 3.0,
            reason: "too far".into(),
        };
        assert!(range.is_range());
        assert!(!range.is_fatal());
    }

    #[test]
    fn messages() {
        let error = EbsdError::Parse {
            line: 12,
            content: "1.0 a 2.0".into(),
        };
        assert_eq!(error.to_string(), "line 12: unable to parse \"1.0 a 2.0\"");
        assert_eq!(EbsdError::Unloaded.to_string(), "no EBSD data loaded");
    }
}
