//! Mesh compilation for simulation pipelines.
//!
//! This crate turns raw triangle soup — binary STL, Wavefront OBJ, the MSH
//! binary format, or caller-supplied arrays — into a canonical,
//! simulation-ready mesh:
//!
//! - deduplicated vertices with rewritten face indices
//! - a half-edge orientation audit for inconsistent winding
//! - an optional convex-hull graph (pluggable geometric kernel)
//! - per-vertex normals with crease preservation
//! - rigid-body mass properties (volume, center of mass, equivalent
//!   inertia box, principal orientation) under both volumetric and shell
//!   interpretations, with the geometry re-expressed in its principal frame
//!
//! # Example
//!
//! ```
//! use mesh_compile::{CompileConfig, Mesh, MeshKind};
//!
//! // A 1x2x3 box supplied directly by the caller.
//! let mut mesh = Mesh::new("box");
//! mesh.user_vert = vec![
//!     0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 2.0, 0.0, 0.0, 2.0, 0.0,
//!     0.0, 0.0, 3.0, 1.0, 0.0, 3.0, 1.0, 2.0, 3.0, 0.0, 2.0, 3.0,
//! ];
//! mesh.user_face = vec![
//!     0, 2, 1, 0, 3, 2, 4, 5, 6, 4, 6, 7, 0, 1, 5, 0, 5, 4,
//!     3, 7, 6, 3, 6, 2, 0, 4, 7, 0, 7, 3, 1, 2, 6, 1, 6, 5,
//! ];
//! mesh.compile(None, &CompileConfig::default()).unwrap();
//!
//! let volume = mesh.volume(MeshKind::Volume).unwrap();
//! assert!((volume - 6.0).abs() < 1e-6);
//! ```
//!
//! # Lifecycle
//!
//! A [`Mesh`] is constructed with defaults, mutated through its public
//! staging fields, compiled exactly once with [`Mesh::compile`], and read
//! afterwards. Inertia accessors validate lazily: a mesh that compiled
//! with degenerate geometry or inconsistent orientation reports the
//! failure on first inertia access, not during compilation.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod config;
mod dedup;
mod error;
mod fit;
mod hull;
mod mesh;
mod msh;
mod normal;
mod obj;
mod process;
mod stl;
mod triangle;
mod vfs;

pub use config::CompileConfig;
pub use error::{CompileError, CompileResult};
pub use fit::{FitShape, GeomFit};
pub use hull::{HullError, HullFacet, HullGraph, HullKernel, HullOutput, HullVertex, IncrementalHull};
pub use mesh::{Aabb, Mesh, MeshKind};
pub use vfs::{read_file, FileBuffer, FileReadError, Vfs};

/// Smallest magnitude treated as numerically meaningful.
///
/// Areas, volumes, vector lengths, and accumulated weights below this
/// threshold are considered degenerate.
pub const MINVAL: f64 = 1e-15;
