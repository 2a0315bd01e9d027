//! Error types for skin compilation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for skin compilation operations.
pub type SkinResult<T> = Result<T, SkinError>;

/// Errors that can occur while compiling a skin.
#[derive(Debug, Error)]
pub enum SkinError {
    /// Skin file could not be located on disk or in the VFS.
    #[error("skin '{skin}': file not found: {path}")]
    FileNotFound {
        /// Name of the skin being compiled.
        skin: String,
        /// Resolved path that was not found.
        path: PathBuf,
    },

    /// Skin file resolved to an empty buffer.
    #[error("skin '{skin}': file is empty: {path}")]
    EmptyFile {
        /// Name of the skin being compiled.
        skin: String,
        /// Resolved path of the empty file.
        path: PathBuf,
    },

    /// File extension is not a supported skin format.
    #[error("skin '{skin}': unknown skin file type '{path}'")]
    UnknownFormat {
        /// Name of the skin being compiled.
        skin: String,
        /// Offending file path.
        path: String,
    },

    /// File content failed a header, bounds, or size check.
    #[error("skin '{skin}': invalid SKN file '{path}': {message}")]
    FormatInvalid {
        /// Name of the skin being compiled.
        skin: String,
        /// Path of the file being decoded.
        path: String,
        /// What was wrong with the content.
        message: String,
    },

    /// An array has the wrong length.
    #[error("skin '{skin}': {message}")]
    SizeMismatch {
        /// Name of the skin being compiled.
        skin: String,
        /// Description of the expected size.
        message: &'static str,
    },

    /// A bone references a vertex outside the mesh.
    #[error("skin '{skin}': vertex id {index} out of range (nvert = {nvert})")]
    IndexOutOfRange {
        /// Name of the skin being compiled.
        skin: String,
        /// The offending vertex id.
        index: i64,
        /// Number of vertices the id was checked against.
        nvert: usize,
    },

    /// Required data is absent after all ingestion paths ran.
    #[error("skin '{skin}': missing data in skin")]
    MissingData {
        /// Name of the skin being compiled.
        skin: String,
    },

    /// Both a file and caller-supplied arrays were provided.
    #[error("skin '{skin}': data already exists, trying to load from skin file '{path}'")]
    RepeatedSpecification {
        /// Name of the skin being compiled.
        skin: String,
        /// The file that was about to be loaded.
        path: String,
    },

    /// A referenced body or material is not defined in the model.
    #[error("skin '{skin}': unknown {kind} '{name}'")]
    UnknownReference {
        /// Name of the skin being compiled.
        skin: String,
        /// What kind of object was referenced ("body" or "material").
        kind: &'static str,
        /// The unresolved name.
        name: String,
    },

    /// A vertex has no positive total bone weight.
    #[error("skin '{skin}': vertex {index} must have positive total weight")]
    UncoveredVertex {
        /// Name of the skin being compiled.
        skin: String,
        /// The uncovered vertex.
        index: usize,
    },
}

impl SkinError {
    /// Create a `FormatInvalid` error.
    pub fn format_invalid(
        skin: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::FormatInvalid {
            skin: skin.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a `SizeMismatch` error.
    pub fn size_mismatch(skin: impl Into<String>, message: &'static str) -> Self {
        Self::SizeMismatch {
            skin: skin.into(),
            message,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_skin_name() {
        let err = SkinError::UnknownReference {
            skin: "cape".to_string(),
            kind: "body",
            name: "missing_torso".to_string(),
        };
        assert!(err.to_string().contains("cape"));
        assert!(err.to_string().contains("missing_torso"));
    }
}
