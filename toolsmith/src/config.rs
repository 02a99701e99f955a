//! Where a [`Toolsmith`](crate::Toolsmith) keeps its state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`ToolsmithConfig::tools_dir`].
pub const TOOLS_DIR_ENV: &str = "TOOLSMITH_TOOLS_DIR";
/// Environment variable overriding [`ToolsmithConfig::flows_dir`].
pub const FLOWS_DIR_ENV: &str = "TOOLSMITH_FLOWS_DIR";
/// Environment variable overriding [`ToolsmithConfig::log_dir`].
pub const LOG_DIR_ENV: &str = "TOOLSMITH_LOG_DIR";

/// Directories for tool artifacts, flow specs and audit streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsmithConfig {
    /// Tool artifacts.
    pub tools_dir: PathBuf,
    /// Flow specifications.
    pub flows_dir: PathBuf,
    /// Audit streams.
    pub log_dir: PathBuf,
}

impl Default for ToolsmithConfig {
    fn default() -> Self {
        Self {
            tools_dir: PathBuf::from("tools"),
            flows_dir: PathBuf::from("flows"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl ToolsmithConfig {
    /// The default layout placed under `root`.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let defaults = Self::default();
        Self {
            tools_dir: root.join(defaults.tools_dir),
            flows_dir: root.join(defaults.flows_dir),
            log_dir: root.join(defaults.log_dir),
        }
    }

    /// Defaults, overridden by `TOOLSMITH_TOOLS_DIR`,
    /// `TOOLSMITH_FLOWS_DIR` and `TOOLSMITH_LOG_DIR` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var_os(key).map(PathBuf::from))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<PathBuf>) -> Self {
        let defaults = Self::default();
        let pick = |key: &str, default: PathBuf| {
            lookup(key)
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(default)
        };
        Self {
            tools_dir: pick(TOOLS_DIR_ENV, defaults.tools_dir),
            flows_dir: pick(FLOWS_DIR_ENV, defaults.flows_dir),
            log_dir: pick(LOG_DIR_ENV, defaults.log_dir),
        }
    }
}
