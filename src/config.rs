//! Reader configuration
//!
//! Everything is optional, so an empty JSON object is a valid configuration:
//!
//! ```json
//! {
//!     "policy": {
//!         "neighbourhood": "face",
//!         "weighting": "inverse-distance"
//!     },
//!     "progress": false
//! }
//! ```

// standard library
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// internal modules
use crate::error::{EbsdError, Result};
use crate::weights::WeightPolicy;

// external crates
use log::debug;
use serde::{Deserialize, Serialize};

/// Options for an [EbsdReader](crate::reader::EbsdReader)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Policy used for node weights unless another is requested
    pub policy: WeightPolicy,
    /// Show a progress bar while reading scan files
    pub progress: bool,
}

impl ReaderConfig {
    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| EbsdError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            EbsdError::InvalidConfig {
                path: path.to_path_buf(),
                source,
            }
        })?;

        debug!("Loaded {config:?} from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::{Neighbourhood, Weighting};

    #[test]
    fn partial_json() {
        let config: ReaderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ReaderConfig::default());

        let config: ReaderConfig =
            serde_json::from_str(r#"{"policy": {"neighbourhood": "face"}}"#).unwrap();
        assert_eq!(config.policy.neighbourhood, Neighbourhood::Face);
        assert_eq!(config.policy.weighting, Weighting::Uniform);
        assert!(!config.progress);
    }

    #[test]
    fn unknown_policy_name() {
        let result: std::result::Result<ReaderConfig, _> =
            serde_json::from_str(r#"{"policy": {"weighting": "gaussian"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn from_file() {
        let config = ReaderConfig::from_json_file("./data/config.json").unwrap();
        assert_eq!(config.policy.weighting, Weighting::InverseDistance);
        assert_eq!(config.policy.neighbourhood, Neighbourhood::Full);
    }

    #[test]
    fn file_errors() {
        let error = ReaderConfig::from_json_file("./data/missing.json").unwrap_err();
        assert!(matches!(error, EbsdError::Io { .. }));

        let error = ReaderConfig::from_json_file("./data/points.txt").unwrap_err();
        assert!(error.is_configuration());
    }
}
