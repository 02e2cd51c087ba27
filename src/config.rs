// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Engine configuration
//!
//! Read from `pipeworks.toml` in the working directory, or from the file
//! given with `--config`:
//!
//! ```toml
//! [library]
//! paths = ["pipelines"]
//! allow_update = false
//!
//! [router]
//! max_call_depth = 20
//!
//! [dry_run]
//! mock_inputs = true
//! nb_list_items = 3
//! max_healing_iterations = 10
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::dry_run::{DryRunOptions, DEFAULT_MAX_HEALING_ITERATIONS, DEFAULT_NB_LIST_ITEMS};
use crate::errors::{PipeworksError, PipeworksResult};
use crate::library::LoadMode;
use crate::router::DEFAULT_MAX_CALL_DEPTH;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "pipeworks.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub dry_run: DryRunConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    /// Directories searched for library files
    #[serde(default = "default_library_paths")]
    pub paths: Vec<PathBuf>,

    /// Let later definitions replace earlier ones instead of failing
    #[serde(default)]
    pub allow_update: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            paths: default_library_paths(),
            allow_update: false,
        }
    }
}

impl LibraryConfig {
    pub fn load_mode(&self) -> LoadMode {
        if self.allow_update {
            LoadMode::AllowUpdate
        } else {
            LoadMode::Strict
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DryRunConfig {
    /// Synthesize inputs missing from memory
    #[serde(default = "default_true")]
    pub mock_inputs: bool,

    /// Items per synthesized list
    #[serde(default = "default_nb_list_items")]
    pub nb_list_items: usize,

    /// Bound of the self-healing loop
    #[serde(default = "default_max_healing_iterations")]
    pub max_healing_iterations: usize,
}

impl Default for DryRunConfig {
    fn default() -> Self {
        Self {
            mock_inputs: true,
            nb_list_items: DEFAULT_NB_LIST_ITEMS,
            max_healing_iterations: DEFAULT_MAX_HEALING_ITERATIONS,
        }
    }
}

fn default_library_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("pipelines")]
}

fn default_max_call_depth() -> usize {
    DEFAULT_MAX_CALL_DEPTH
}

fn default_true() -> bool {
    true
}

fn default_nb_list_items() -> usize {
    DEFAULT_NB_LIST_ITEMS
}

fn default_max_healing_iterations() -> usize {
    DEFAULT_MAX_HEALING_ITERATIONS
}

impl EngineConfig {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> PipeworksResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PipeworksError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml(&content).map_err(|e| PipeworksError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn from_toml(content: &str) -> PipeworksResult<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    /// Load the given file, or `pipeworks.toml` when present, or defaults
    ///
    /// An explicitly given file must exist.
    pub fn load(path: Option<&Path>) -> PipeworksResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(CONFIG_FILE_NAME);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    tracing::debug!("no {} found, using defaults", CONFIG_FILE_NAME);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn dry_run_options(&self) -> DryRunOptions {
        DryRunOptions {
            mock_inputs: self.dry_run.mock_inputs,
            nb_list_items: self.dry_run.nb_list_items,
            max_healing_iterations: self.dry_run.max_healing_iterations,
            max_call_depth: self.router.max_call_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.library.paths, vec![PathBuf::from("pipelines")]);
        assert_eq!(config.router.max_call_depth, 20);
        assert_eq!(config.dry_run_options(), DryRunOptions::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::from_toml(
            "[router]\nmax_call_depth = 5\n\n[dry_run]\nnb_list_items = 2\n",
        )
        .unwrap();
        assert_eq!(config.router.max_call_depth, 5);
        assert_eq!(config.dry_run.nb_list_items, 2);
        assert!(config.dry_run.mock_inputs);
        assert_eq!(config.dry_run_options().max_call_depth, 5);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(EngineConfig::from_toml("[router]\nmax_depth = 5\n").is_err());
        assert!(EngineConfig::from_toml("[cache]\nenabled = true\n").is_err());
    }

    #[test]
    fn test_load_mode() {
        let config = EngineConfig::from_toml("[library]\nallow_update = true\n").unwrap();
        assert_eq!(config.library.load_mode(), LoadMode::AllowUpdate);
        assert_eq!(LibraryConfig::default().load_mode(), LoadMode::Strict);
    }

    #[test]
    fn test_from_file_errors_name_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[router]\nmax_call_depth = \"deep\"\n").unwrap();

        let err = EngineConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, PipeworksError::Config { path: p, .. } if p == path));

        let err = EngineConfig::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, PipeworksError::FileReadError { .. }));
    }
}
