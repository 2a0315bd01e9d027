//! Skinned-mesh compilation.
//!
//! A [`Skin`] couples a render mesh (vertices, texture coordinates,
//! faces) with a set of bones: named body references, bind poses, and
//! per-vertex influence weights. Compilation validates the data, resolves
//! body and material names against the owning scene graph, checks that
//! every vertex is covered, and normalizes weights so each vertex's
//! influences sum to one.
//!
//! Skins load from the SKN binary format or from caller-supplied arrays;
//! the two sources are mutually exclusive.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod error;
mod skin;
mod skn;

pub use error::{SkinError, SkinResult};
pub use skin::{ObjectLookup, Skin};
