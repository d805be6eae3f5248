//! Canonical filesystem locations for one run.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};

use crate::io::config::PathsConfig;

/// Activity log file name under `log_dir`.
pub const ACTIVITY_LOG_FILE: &str = "cadfetch.log";
/// Telemetry dump file name under `log_dir`.
pub const TELEMETRY_FILE: &str = "telemetry.json";

/// All paths used by a run, resolved against a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub root: PathBuf,
    pub input_path: PathBuf,
    pub pending_path: PathBuf,
    pub stop_flag_path: PathBuf,
    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub log_dir: PathBuf,
    pub activity_log_path: PathBuf,
    pub telemetry_path: PathBuf,
}

impl RunPaths {
    /// Resolve configured paths. Relative entries are joined onto `root`.
    pub fn resolve(root: impl Into<PathBuf>, paths: &PathsConfig) -> Self {
        let root = root.into();
        let log_dir = join_clean(&root, &paths.log_dir);
        Self {
            input_path: join_clean(&root, &paths.input_file),
            pending_path: join_clean(&root, &paths.pending_file),
            stop_flag_path: join_clean(&root, &paths.stop_flag),
            output_dir: join_clean(&root, &paths.output_dir),
            temp_dir: join_clean(&root, &paths.temp_dir),
            activity_log_path: log_dir.join(ACTIVITY_LOG_FILE),
            telemetry_path: log_dir.join(TELEMETRY_FILE),
            log_dir,
            root,
        }
    }

    /// Use `input` instead of the configured input file.
    pub fn with_input(mut self, input: &Path) -> Self {
        self.input_path = join_clean(&self.root, input);
        self
    }

    /// Create output, temp and log directories if absent.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.output_dir, &self.temp_dir, &self.log_dir] {
            fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))?;
        }
        Ok(())
    }
}

/// `base.join(path)` without `.` components, so `log_dir = "."` prints as the root itself.
fn join_clean(base: &Path, path: &Path) -> PathBuf {
    let mut joined = base.to_path_buf();
    for component in path.components() {
        if component != Component::CurDir {
            joined.push(component);
        }
    }
    joined
}
