//! Fetching one identifier through the external tool.
//!
//! The [`Fetcher`] trait decouples outcome normalization from the actual tool
//! (`rosreestr2coord` by default). Tests use scripted fetchers that create
//! files at the destination without spawning processes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use crate::core::classifier::ErrorClassifier;
use crate::core::naming::{NESTED_ARTIFACT_DIR, artifact_file_name};
use crate::core::types::{AttemptOutcome, ErrorClass};
use crate::io::config::{CommandConfig, DEST_PLACEHOLDER, ID_PLACEHOLDER};
use crate::io::process::run_command_with_timeout;

/// What the tool reported for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Captured standard error, trimmed. The only classification signal.
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

/// Abstraction over the external fetch tool.
pub trait Fetcher {
    /// Ask the tool to write the artifact for `identifier` to `dest`.
    ///
    /// `Err` means the tool could not be started at all.
    fn invoke(&self, identifier: &str, dest: &Path) -> Result<Invocation>;
}

/// Fetcher that spawns the configured command line.
#[derive(Debug, Clone)]
pub struct CommandFetcher {
    argv: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandFetcher {
    pub fn new(config: &CommandConfig) -> Self {
        Self {
            argv: config.argv.clone(),
            timeout: config.timeout(),
            output_limit_bytes: config.output_limit_bytes,
        }
    }

    /// Expand `{id}` and `{dest}` in every argument.
    pub fn render_argv(&self, identifier: &str, dest: &Path) -> Vec<String> {
        let dest = dest.to_string_lossy();
        self.argv
            .iter()
            .map(|arg| {
                arg.replace(ID_PLACEHOLDER, identifier)
                    .replace(DEST_PLACEHOLDER, &dest)
            })
            .collect()
    }
}

impl Fetcher for CommandFetcher {
    #[instrument(skip_all, fields(identifier = %identifier))]
    fn invoke(&self, identifier: &str, dest: &Path) -> Result<Invocation> {
        let argv = self.render_argv(identifier, dest);
        let (program, args) = argv
            .split_first()
            .context("fetch command is empty")?;
        let mut cmd = Command::new(program);
        cmd.args(args);

        let output = run_command_with_timeout(cmd, self.timeout, self.output_limit_bytes)?;
        debug!(
            stdout_bytes = output.stdout.len(),
            exit_code = ?output.status.code(),
            "fetch command returned"
        );
        let mut stderr = output.stderr_text();
        if output.timed_out && stderr.is_empty() {
            stderr = format!("fetch command timed out after {}s", self.timeout.as_secs());
        }
        Ok(Invocation {
            stderr,
            exit_code: output.status.code(),
            timed_out: output.timed_out,
        })
    }
}

/// Runs one attempt and normalizes it into an [`AttemptOutcome`].
pub struct FetchExecutor<F> {
    fetcher: F,
    temp_dir: PathBuf,
    output_dir: PathBuf,
    classifier: ErrorClassifier,
}

impl<F: Fetcher> FetchExecutor<F> {
    pub fn new(
        fetcher: F,
        temp_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        classifier: ErrorClassifier,
    ) -> Self {
        Self {
            fetcher,
            temp_dir: temp_dir.into(),
            output_dir: output_dir.into(),
            classifier,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn temp_path(&self, identifier: &str) -> PathBuf {
        self.temp_dir.join(artifact_file_name(identifier))
    }

    pub fn output_path(&self, identifier: &str) -> PathBuf {
        self.output_dir.join(artifact_file_name(identifier))
    }

    /// Fetch `identifier`. Never fails: local I/O problems become `Retryable`.
    ///
    /// 1. Remove a stale temp artifact (file or directory).
    /// 2. Invoke the tool; a spawn failure is `Retryable`.
    /// 3. Temp path is a file: copy it to the output dir, `Success`.
    /// 4. Temp path is a directory holding `geojson/<name>`: copy that, `Success`.
    /// 5. Otherwise classify stderr.
    #[instrument(skip_all, fields(identifier = %identifier))]
    pub fn fetch(&self, identifier: &str) -> AttemptOutcome {
        let temp_path = self.temp_path(identifier);
        if let Err(err) = prepare_destination(&self.temp_dir, &temp_path) {
            warn!(err = %err, path = %temp_path.display(), "failed to prepare temp artifact path");
            return AttemptOutcome::Retryable {
                error_text: format!("prepare {}: {err}", temp_path.display()),
            };
        }

        let invocation = match self.fetcher.invoke(identifier, &temp_path) {
            Ok(invocation) => invocation,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "fetch command could not be started");
                return AttemptOutcome::Retryable {
                    error_text: format!("{err:#}"),
                };
            }
        };

        if temp_path.is_file() {
            return self.collect(identifier, &temp_path);
        }
        if temp_path.is_dir() {
            let nested = temp_path
                .join(NESTED_ARTIFACT_DIR)
                .join(artifact_file_name(identifier));
            if nested.is_file() {
                debug!(path = %nested.display(), "artifact found in nested layout");
                return self.collect(identifier, &nested);
            }
        }

        match self.classifier.classify(&invocation.stderr) {
            ErrorClass::NotFound => AttemptOutcome::NotFound,
            ErrorClass::Retryable => AttemptOutcome::Retryable {
                error_text: invocation.stderr,
            },
        }
    }

    fn collect(&self, identifier: &str, source: &Path) -> AttemptOutcome {
        let final_path = self.output_path(identifier);
        match copy_artifact(source, &final_path) {
            Ok(size_bytes) => AttemptOutcome::Success {
                artifact_path: final_path,
                size_bytes,
            },
            Err(err) => {
                warn!(err = %format!("{err:#}"), "failed to copy artifact");
                AttemptOutcome::Retryable {
                    error_text: format!("{err:#}"),
                }
            }
        }
    }
}

fn prepare_destination(temp_dir: &Path, path: &Path) -> io::Result<()> {
    fs::create_dir_all(temp_dir)?;
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        Ok(())
    }
}

fn copy_artifact(source: &Path, dest: &Path) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create output dir {}", parent.display()))?;
    }
    fs::copy(source, dest)
        .with_context(|| format!("copy {} to {}", source.display(), dest.display()))?;
    let size = fs::metadata(dest)
        .with_context(|| format!("stat {}", dest.display()))?
        .len();
    Ok(size)
}
