//! Test-only helpers: scripted fetchers, scripted cancellation and temp workspaces.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use crate::cancel::{CancelReason, CancelSignal};
use crate::core::classifier::ErrorClassifier;
use crate::core::naming::{NESTED_ARTIFACT_DIR, artifact_file_name};
use crate::io::activity_log::ActivityLog;
use crate::io::config::{DownloaderConfig, FetchConfig};
use crate::io::fetch::{FetchExecutor, Fetcher, Invocation};
use crate::io::layout::RunPaths;

/// Owned identifier list from string literals.
pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// One scripted tool behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedAttempt {
    /// Write the artifact directly at the destination path.
    File(String),
    /// Create a directory at the destination with `geojson/<name>` inside.
    Nested(String),
    /// Produce nothing and report this stderr text.
    Stderr(String),
    /// Fail to start.
    SpawnFailure(String),
}

impl ScriptedAttempt {
    pub fn file(body: &str) -> Self {
        Self::File(body.to_string())
    }

    pub fn nested(body: &str) -> Self {
        Self::Nested(body.to_string())
    }

    pub fn stderr(text: &str) -> Self {
        Self::Stderr(text.to_string())
    }

    pub fn spawn_failure(text: &str) -> Self {
        Self::SpawnFailure(text.to_string())
    }
}

/// Fetcher that replays per-identifier scripts.
///
/// Each identifier has a queue of attempts consumed in order; a repeated
/// attempt is used once the queue is empty. Identifiers without a script
/// report a transient error.
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    scripts: RefCell<HashMap<String, VecDeque<ScriptedAttempt>>>,
    repeats: HashMap<String, ScriptedAttempt>,
    calls: RefCell<Vec<String>>,
    on_call: HashMap<String, PathBuf>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, identifier: &str, attempts: impl IntoIterator<Item = ScriptedAttempt>) -> Self {
        self.scripts
            .borrow_mut()
            .entry(identifier.to_string())
            .or_default()
            .extend(attempts);
        self
    }

    pub fn repeat(mut self, identifier: &str, attempt: ScriptedAttempt) -> Self {
        self.repeats.insert(identifier.to_string(), attempt);
        self
    }

    /// Create `path` while `identifier` is being fetched (e.g. a stop flag).
    pub fn touch_during(mut self, identifier: &str, path: impl Into<PathBuf>) -> Self {
        self.on_call.insert(identifier.to_string(), path.into());
        self
    }

    /// Identifiers in the order they were fetched.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn next_attempt(&self, identifier: &str) -> ScriptedAttempt {
        let queued = self
            .scripts
            .borrow_mut()
            .get_mut(identifier)
            .and_then(VecDeque::pop_front);
        queued
            .or_else(|| self.repeats.get(identifier).cloned())
            .unwrap_or_else(|| ScriptedAttempt::stderr("scripted fetcher: no attempt left"))
    }
}

impl Fetcher for ScriptedFetcher {
    fn invoke(&self, identifier: &str, dest: &Path) -> Result<Invocation> {
        self.calls.borrow_mut().push(identifier.to_string());
        if let Some(path) = self.on_call.get(identifier) {
            fs::write(path, "")?;
        }
        match self.next_attempt(identifier) {
            ScriptedAttempt::File(body) => fs::write(dest, body)?,
            ScriptedAttempt::Nested(body) => {
                let dir = dest.join(NESTED_ARTIFACT_DIR);
                fs::create_dir_all(&dir)?;
                fs::write(dir.join(artifact_file_name(identifier)), body)?;
            }
            ScriptedAttempt::Stderr(text) => {
                return Ok(Invocation {
                    stderr: text,
                    exit_code: Some(1),
                    timed_out: false,
                });
            }
            ScriptedAttempt::SpawnFailure(text) => return Err(anyhow!(text)),
        }
        Ok(Invocation {
            stderr: String::new(),
            exit_code: Some(0),
            timed_out: false,
        })
    }
}

/// Cancels on the poll after `allowed` polls have passed.
#[derive(Debug)]
pub struct CancelAfter {
    remaining: Cell<usize>,
}

impl CancelAfter {
    pub fn new(allowed: usize) -> Self {
        Self {
            remaining: Cell::new(allowed),
        }
    }
}

impl CancelSignal for CancelAfter {
    fn poll(&self) -> Option<CancelReason> {
        match self.remaining.get() {
            0 => Some(CancelReason::Requested),
            n => {
                self.remaining.set(n - 1);
                None
            }
        }
    }
}

/// Temp directory with a resolved run layout and a zero-delay config.
pub struct TestWorkspace {
    dir: tempfile::TempDir,
    pub config: FetchConfig,
    pub paths: RunPaths,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let config = FetchConfig {
            downloader: DownloaderConfig {
                delay_seconds: 0.0,
                ..DownloaderConfig::default()
            },
            ..FetchConfig::default()
        };
        let paths = RunPaths::resolve(dir.path(), &config.paths);
        paths.ensure_dirs()?;
        Ok(Self { dir, config, paths })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn with_retry_cycles(mut self, retry_cycles: u32) -> Self {
        self.config.downloader.retry_cycles = retry_cycles;
        self
    }

    /// Write the input file, one identifier per line.
    pub fn write_input(&self, identifiers: &[&str]) -> Result<()> {
        let mut buf = identifiers.join("\n");
        buf.push('\n');
        fs::write(&self.paths.input_path, buf)?;
        Ok(())
    }

    pub fn executor<F: Fetcher>(&self, fetcher: F) -> FetchExecutor<F> {
        FetchExecutor::new(
            fetcher,
            &self.paths.temp_dir,
            &self.paths.output_dir,
            ErrorClassifier::default(),
        )
    }

    pub fn activity_log(&self) -> ActivityLog {
        ActivityLog::new(&self.paths.activity_log_path)
    }

    pub fn read_pending(&self) -> Result<String> {
        fs::read_to_string(&self.paths.pending_path)
            .map_err(|err| anyhow!("read {}: {err}", self.paths.pending_path.display()))
    }
}
