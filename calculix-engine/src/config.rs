//! Solver location and working directories, read from the environment

use std::path::{Path, PathBuf};

/// Where to find `ccx` and where to put its files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculixConfig {
    /// Solver command; made absolute when it names an existing file
    pub ccx_path: PathBuf,
    /// Copy each analysis' `.inp` and `.dat` here when set
    pub debug_export: Option<PathBuf>,
    /// Parent of the per-analysis temporary directories; system temp when unset
    pub work_dir: Option<PathBuf>,
}

impl Default for CalculixConfig {
    fn default() -> Self {
        Self {
            ccx_path: default_ccx_path(),
            debug_export: None,
            work_dir: None,
        }
    }
}

/// Prefer a repo-local solver binary if present
fn default_ccx_path() -> PathBuf {
    let local = Path::new("./bin/ccx");
    if local.exists() {
        local.to_path_buf()
    } else {
        PathBuf::from("ccx")
    }
}

impl CalculixConfig {
    /// Read `CALCULIX_PATH`, `CALCULIX_DEBUG_EXPORT` and `CALCULIX_WORK_DIR`
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty =
            |name: &str| lookup(name).filter(|v| !v.trim().is_empty()).map(PathBuf::from);
        let ccx_path = non_empty("CALCULIX_PATH").unwrap_or_else(default_ccx_path);

        // ccx runs from a temp working directory, so relative paths would break
        let ccx_path = std::fs::canonicalize(&ccx_path).unwrap_or(ccx_path);

        Self {
            ccx_path,
            debug_export: non_empty("CALCULIX_DEBUG_EXPORT"),
            work_dir: non_empty("CALCULIX_WORK_DIR"),
        }
    }

    pub fn with_ccx_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ccx_path = path.into();
        self
    }

    pub fn with_debug_export(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_export = Some(dir.into());
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }
}
