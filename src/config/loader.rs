//! Configuration file loading

use super::{validate_spec, RunSpec};
use crate::Result;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load and validate a run description from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunSpec> {
    let path = path.as_ref();
    let yaml = fs::read_to_string(path)?;
    let spec: RunSpec = serde_yaml::from_str(&yaml)?;
    validate_spec(&spec)?;
    debug!(path = %path.display(), "configuration loaded");
    Ok(spec)
}
