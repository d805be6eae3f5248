//! Deterministic artifact file names derived from identifiers.

/// Extension appended to every artifact file name.
pub const ARTIFACT_EXTENSION: &str = "geojson";

/// Directory inside a directory-shaped tool output that holds the artifact.
pub const NESTED_ARTIFACT_DIR: &str = "geojson";

/// File name for `identifier`: structural separators become `_`, then `.geojson`.
///
/// `77:01:0001001:1234` becomes `77_01_0001001_1234.geojson`.
pub fn artifact_file_name(identifier: &str) -> String {
    let stem: String = identifier
        .chars()
        .map(|ch| match ch {
            ':' | '/' | '\\' => '_',
            other => other,
        })
        .collect();
    format!("{stem}.{ARTIFACT_EXTENSION}")
}
