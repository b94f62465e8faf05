//! hf-project: vehicle parameter files, validation and resource lookup.

pub mod schema;
pub mod validate;

pub use schema::*;
pub use validate::{Requirement, ValidationError, validate_required};

use std::path::{Path, PathBuf};

/// Environment variable naming the base directory for raster resources.
pub const RESOURCE_DIR_ENV: &str = "HELIFLOW_RESOURCE_DIR";

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Schema error: {what}")]
    Schema { what: String },

    #[error("Parameter not found: {node}.{field}")]
    NotFound { node: String, field: String },

    #[error("Parameter {node}.{field} is not a {expected}")]
    WrongType {
        node: String,
        field: String,
        expected: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn load_yaml(path: &Path) -> ProjectResult<ParamTree> {
    let content = std::fs::read_to_string(path)?;
    let tree = ParamTree::from_yaml_str(&content)?;
    tracing::debug!(path = %path.display(), nodes = tree.len(), "parameter file loaded");
    Ok(tree)
}

/// Load a parameter file and check every required (node, field) pair.
pub fn load_yaml_validated(path: &Path, required: &[Requirement]) -> ProjectResult<ParamTree> {
    let tree = load_yaml(path)?;
    validate_required(&tree, required)?;
    Ok(tree)
}

pub fn to_json(tree: &ParamTree) -> ProjectResult<String> {
    Ok(serde_json::to_string_pretty(tree)?)
}

/// Resolve a resource path relative to `base` when given, else `config_dir`.
pub fn resolve_resource_in(base: Option<&Path>, config_dir: &Path, relative: &str) -> PathBuf {
    let relative = Path::new(relative);
    if relative.is_absolute() {
        return relative.to_path_buf();
    }
    match base {
        Some(base) => base.join(relative),
        None => config_dir.join(relative),
    }
}

/// Resolve a resource path against `HELIFLOW_RESOURCE_DIR` or the directory
/// holding `config_path`.
pub fn resolve_resource(config_path: &Path, relative: &str) -> PathBuf {
    let base = std::env::var_os(RESOURCE_DIR_ENV).map(PathBuf::from);
    let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    resolve_resource_in(base.as_deref(), config_dir, relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_paths() {
        let cfg = Path::new("/etc/heli");
        assert_eq!(
            resolve_resource_in(None, cfg, "terrain/h.png"),
            PathBuf::from("/etc/heli/terrain/h.png")
        );
        assert_eq!(
            resolve_resource_in(Some(Path::new("/res")), cfg, "terrain/h.png"),
            PathBuf::from("/res/terrain/h.png")
        );
        assert_eq!(
            resolve_resource_in(Some(Path::new("/res")), cfg, "/abs/n.png"),
            PathBuf::from("/abs/n.png")
        );
    }
}
