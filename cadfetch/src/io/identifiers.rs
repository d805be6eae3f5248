//! Identifier list loading.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

/// The input identifier file does not exist. Fatal: there is no work to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputMissingError {
    pub path: PathBuf,
}

impl fmt::Display for InputMissingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input file not found: {}", self.path.display())
    }
}

impl std::error::Error for InputMissingError {}

/// Read identifiers from a line-oriented file.
///
/// Returns trimmed, non-blank lines in file order. No dedup, no shape checks.
pub fn load_identifiers(path: &Path) -> Result<Vec<String>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(InputMissingError {
                path: path.to_path_buf(),
            }
            .into());
        }
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    let identifiers = parse_identifiers(&contents);
    debug!(path = %path.display(), count = identifiers.len(), "identifiers loaded");
    Ok(identifiers)
}

/// Split text into identifiers. A leading byte-order mark is ignored.
pub fn parse_identifiers(contents: &str) -> Vec<String> {
    contents
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
