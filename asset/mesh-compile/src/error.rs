//! Error types for mesh compilation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for mesh compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors that can occur while compiling a mesh.
///
/// Every variant carries the name of the mesh being compiled so that
/// failures deep in a model remain attributable.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Mesh file could not be located on disk or in the VFS.
    #[error("mesh '{mesh}': file not found: {path}")]
    FileNotFound {
        /// Name of the mesh being compiled.
        mesh: String,
        /// Resolved path that was not found.
        path: PathBuf,
    },

    /// Mesh file resolved to an empty buffer.
    #[error("mesh '{mesh}': file is empty: {path}")]
    EmptyFile {
        /// Name of the mesh being compiled.
        mesh: String,
        /// Resolved path of the empty file.
        path: PathBuf,
    },

    /// File extension is not one of the supported mesh formats.
    #[error("mesh '{mesh}': unknown mesh file type '{path}'")]
    UnknownFormat {
        /// Name of the mesh being compiled.
        mesh: String,
        /// Offending file path.
        path: String,
    },

    /// File content failed a header, bounds, or sanity check.
    #[error("mesh '{mesh}': invalid {format} file '{path}': {message}")]
    FormatInvalid {
        /// Name of the mesh being compiled.
        mesh: String,
        /// Format being decoded ("STL", "OBJ", "MSH").
        format: &'static str,
        /// Path of the file being decoded.
        path: String,
        /// What was wrong with the content.
        message: String,
    },

    /// A user-supplied array has the wrong length.
    #[error("mesh '{mesh}': {channel} data has wrong size: {message}")]
    SizeMismatch {
        /// Name of the mesh being compiled.
        mesh: String,
        /// Which channel was mis-sized ("vertex", "face", ...).
        channel: &'static str,
        /// Description of the expected size.
        message: String,
    },

    /// A face index refers outside the vertex array.
    #[error("mesh '{mesh}': face index {index} out of range (nvert = {nvert})")]
    IndexOutOfRange {
        /// Name of the mesh being compiled.
        mesh: String,
        /// The offending index.
        index: i64,
        /// Number of vertices the index was checked against.
        nvert: usize,
    },

    /// Required data is absent after all ingestion paths ran.
    #[error("mesh '{mesh}': {message}")]
    MissingData {
        /// Name of the mesh being compiled.
        mesh: String,
        /// What is missing.
        message: &'static str,
    },

    /// The same channel was populated both from a file and by the caller.
    #[error("mesh '{mesh}': repeated {channel} specification")]
    RepeatedSpecification {
        /// Name of the mesh being compiled.
        mesh: String,
        /// Channel that was specified twice.
        channel: &'static str,
    },

    /// The convex-hull kernel failed.
    #[error("mesh '{mesh}': convex hull failed: {message}")]
    HullFailure {
        /// Name of the mesh being compiled.
        mesh: String,
        /// Kernel error description.
        message: String,
    },

    /// Mass-property computation found degenerate geometry.
    ///
    /// Raised lazily by inertia accessors, not by `compile` itself.
    #[error("mesh '{mesh}': {message}")]
    DegenerateGeometry {
        /// Name of the mesh being compiled.
        mesh: String,
        /// Which validity check failed.
        message: &'static str,
    },

    /// The half-edge audit found a directed edge that appears twice.
    ///
    /// Raised lazily by inertia accessors, not by `compile` itself.
    #[error(
        "mesh '{mesh}': faces have inconsistent orientation; check the faces \
         containing the vertices {vertex_a} and {vertex_b}"
    )]
    InconsistentOrientation {
        /// Name of the mesh being compiled.
        mesh: String,
        /// First endpoint of the duplicated edge, 1-indexed.
        vertex_a: u32,
        /// Second endpoint of the duplicated edge, 1-indexed.
        vertex_b: u32,
    },

    /// An internal invariant was violated. Should not occur.
    #[error("mesh '{mesh}': internal error: {message}")]
    InternalConsistency {
        /// Name of the mesh being compiled.
        mesh: String,
        /// Invariant that was violated.
        message: &'static str,
    },
}

impl CompileError {
    /// Create a `FormatInvalid` error.
    pub fn format_invalid(
        mesh: impl Into<String>,
        format: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::FormatInvalid {
            mesh: mesh.into(),
            format,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a `SizeMismatch` error.
    pub fn size_mismatch(
        mesh: impl Into<String>,
        channel: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::SizeMismatch {
            mesh: mesh.into(),
            channel,
            message: message.into(),
        }
    }

    /// Create a `MissingData` error.
    pub fn missing_data(mesh: impl Into<String>, message: &'static str) -> Self {
        Self::MissingData {
            mesh: mesh.into(),
            message,
        }
    }

    /// Create a `RepeatedSpecification` error.
    pub fn repeated(mesh: impl Into<String>, channel: &'static str) -> Self {
        Self::RepeatedSpecification {
            mesh: mesh.into(),
            channel,
        }
    }

    /// Create an `InternalConsistency` error.
    pub fn internal(mesh: impl Into<String>, message: &'static str) -> Self {
        Self::InternalConsistency {
            mesh: mesh.into(),
            message,
        }
    }
}
