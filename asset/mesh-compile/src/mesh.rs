//! The mesh type and its compile driver.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

use crate::config::CompileConfig;
use crate::error::{CompileError, CompileResult};
use crate::hull::{self, HullGraph, HullKernel, IncrementalHull};
use crate::triangle::triangle_props;
use crate::vfs::Vfs;
use crate::{dedup, msh, normal, obj, process, stl, MINVAL};

/// Which mass-property interpretation to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshKind {
    /// Solid with uniform volumetric density.
    Volume,
    /// Thin surface with uniform surface density.
    Shell,
}

/// Axis-aligned bounding box of the mesh in its principal frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Componentwise minimum corner.
    pub min: Vector3<f64>,
    /// Componentwise maximum corner.
    pub max: Vector3<f64>,
}

impl Aabb {
    /// Box center.
    #[must_use]
    pub fn center(&self) -> Vector3<f64> {
        (self.min + self.max) / 2.0
    }

    /// Grow the box to contain `point`.
    pub(crate) fn expand(&mut self, point: Vector3<f64>) {
        self.min = self.min.inf(&point);
        self.max = self.max.sup(&point);
    }
}

/// A compilable triangle mesh.
///
/// Construct with [`Mesh::new`], populate either `file` or the `user_*`
/// staging arrays, then call [`Mesh::compile`] once. Canonical data and
/// inertial results are read through accessors afterwards.
///
/// Staging arrays are flat, matching the wire formats: vertices and
/// normals as `x y z` triples, texture coordinates as `u v` pairs, faces
/// as vertex-index triples.
#[derive(Debug, Clone)]
pub struct Mesh {
    name: String,

    /// Source file reference; resolved against the model directories.
    pub file: Option<String>,
    /// Reference translation, subtracted from every vertex at compile.
    pub refpos: Vector3<f64>,
    /// Reference rotation (w, x, y, z); the mesh is rotated into this
    /// frame at compile. Normalized before use.
    pub refquat: Quaternion<f64>,
    /// Per-axis scale applied after the reference pose.
    pub scale: Vector3<f64>,
    /// Skip crease preservation when synthesizing normals.
    pub smoothnormal: bool,
    /// Request a convex-hull graph even when faces are present.
    pub needhull: bool,

    /// Caller-supplied vertex positions, `x y z` per vertex.
    pub user_vert: Vec<f32>,
    /// Caller-supplied vertex normals, `x y z` per vertex.
    pub user_normal: Vec<f32>,
    /// Caller-supplied texture coordinates, `u v` per vertex.
    pub user_texcoord: Vec<f32>,
    /// Caller-supplied triangle faces, three vertex indices per face.
    pub user_face: Vec<u32>,
    /// Caller-supplied per-corner normal indices, `3 * nface` entries.
    pub user_facenormal: Vec<u32>,
    /// Caller-supplied per-corner texcoord indices, `3 * nface` entries.
    pub user_facetexcoord: Vec<u32>,

    pub(crate) user_edge: Vec<(u32, u32)>,

    pub(crate) vert: Vec<[f32; 3]>,
    pub(crate) normal: Vec<[f32; 3]>,
    pub(crate) texcoord: Vec<[f32; 2]>,
    pub(crate) face: Vec<[u32; 3]>,
    pub(crate) facenormal: Vec<[u32; 3]>,
    pub(crate) facetexcoord: Vec<[u32; 3]>,
    pub(crate) graph: Option<HullGraph>,

    pub(crate) pos_volume: Vector3<f64>,
    pub(crate) pos_surface: Vector3<f64>,
    pub(crate) quat_volume: UnitQuaternion<f64>,
    pub(crate) quat_surface: UnitQuaternion<f64>,
    pub(crate) boxsz_volume: Vector3<f64>,
    pub(crate) boxsz_surface: Vector3<f64>,
    pub(crate) volume: f64,
    pub(crate) surface: f64,
    pub(crate) aabb: Aabb,

    pub(crate) invalid_orientation: Option<(u32, u32)>,
    pub(crate) valid_area: bool,
    pub(crate) valid_volume: bool,
    pub(crate) valid_eigenvalue: bool,
    pub(crate) valid_inequality: bool,
    pub(crate) processed: bool,
}

impl Mesh {
    /// Create a mesh with default state.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: None,
            refpos: Vector3::zeros(),
            refquat: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            smoothnormal: false,
            needhull: false,
            user_vert: Vec::new(),
            user_normal: Vec::new(),
            user_texcoord: Vec::new(),
            user_face: Vec::new(),
            user_facenormal: Vec::new(),
            user_facetexcoord: Vec::new(),
            user_edge: Vec::new(),
            vert: Vec::new(),
            normal: Vec::new(),
            texcoord: Vec::new(),
            face: Vec::new(),
            facenormal: Vec::new(),
            facetexcoord: Vec::new(),
            graph: None,
            pos_volume: Vector3::zeros(),
            pos_surface: Vector3::zeros(),
            quat_volume: UnitQuaternion::identity(),
            quat_surface: UnitQuaternion::identity(),
            boxsz_volume: Vector3::zeros(),
            boxsz_surface: Vector3::zeros(),
            volume: 0.0,
            surface: 0.0,
            aabb: Aabb {
                min: Vector3::new(1e10, 1e10, 1e10),
                max: Vector3::new(-1e10, -1e10, -1e10),
            },
            invalid_orientation: None,
            valid_area: true,
            valid_volume: true,
            valid_eigenvalue: true,
            valid_inequality: true,
            processed: false,
        }
    }

    /// Mesh name, used in error reporting.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compile the mesh with the built-in convex-hull kernel.
    ///
    /// See [`Mesh::compile_with_kernel`].
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] on any reader, sizing, indexing, or
    /// hull failure. Degenerate-geometry and orientation findings do not
    /// fail compilation; they surface on first inertia access.
    pub fn compile(&mut self, vfs: Option<&Vfs>, config: &CompileConfig) -> CompileResult<()> {
        self.compile_with_kernel(vfs, config, &IncrementalHull)
    }

    /// Compile the mesh: read the source file, ingest staging arrays,
    /// audit orientation, build the hull, synthesize normals, and compute
    /// mass properties.
    ///
    /// `kernel` supplies convex-hull facets when a hull is requested or
    /// when no faces were provided.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] on any reader, sizing, indexing, or
    /// hull failure.
    pub fn compile_with_kernel(
        &mut self,
        vfs: Option<&Vfs>,
        config: &CompileConfig,
        kernel: &dyn HullKernel,
    ) -> CompileResult<()> {
        // load file
        if let Some(file) = self.file.clone() {
            let ext = std::path::Path::new(&file)
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            match ext.as_str() {
                "stl" => stl::load_stl(self, &file, vfs, config)?,
                "obj" => obj::load_obj(self, &file, vfs, config)?,
                "msh" => msh::load_msh(self, &file, vfs, config)?,
                _ => {
                    return Err(CompileError::UnknownFormat {
                        mesh: self.name.clone(),
                        path: file,
                    })
                }
            }
        }

        self.ingest_user_arrays()?;

        // detect inconsistent face orientations
        if !self.user_edge.is_empty() {
            self.user_edge.sort_unstable();
            if let Some(pair) = self.user_edge.windows(2).find(|w| w[0] == w[1]) {
                self.invalid_orientation = Some((pair[0].0 + 1, pair[0].1 + 1));
            }
        }

        if self.vert.is_empty() {
            return Err(CompileError::missing_data(&self.name, "no vertices"));
        }

        // make graph describing the convex hull
        if (config.convexhull && self.needhull) || self.face.is_empty() {
            self.graph = hull::make_graph(&self.name, &self.vert, kernel)?;
        }

        // no faces: copy from the hull
        if self.face.is_empty() {
            let graph = self.graph.as_ref().ok_or_else(|| {
                CompileError::missing_data(&self.name, "no faces and no convex hull to copy from")
            })?;
            self.face = hull::copy_graph_faces(graph);
        }

        // no normals: synthesize
        if self.normal.is_empty() {
            normal::make_normal(self);
        }

        self.ingest_user_indirection()?;

        // facenormal may still be absent if the caller supplied normals
        if self.facenormal.is_empty() {
            self.facenormal = self.face.clone();
        }

        // scale, center, orient, compute mass and inertia
        process::process(self, config)?;
        self.processed = true;
        Ok(())
    }

    /// Copy staging arrays into canonical storage with size and index
    /// checks, and synthesize audit edges for caller-supplied faces.
    fn ingest_user_arrays(&mut self) -> CompileResult<()> {
        if !self.user_vert.is_empty() {
            if !self.vert.is_empty() {
                return Err(CompileError::repeated(&self.name, "vertex"));
            }
            if self.user_vert.len() < 12 {
                return Err(CompileError::size_mismatch(
                    &self.name,
                    "vertex",
                    "at least 4 vertices required",
                ));
            }
            if self.user_vert.len() % 3 != 0 {
                return Err(CompileError::size_mismatch(
                    &self.name,
                    "vertex",
                    "must be a multiple of 3",
                ));
            }
            self.vert = self
                .user_vert
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .collect();
        }

        if !self.user_normal.is_empty() {
            if !self.normal.is_empty() {
                return Err(CompileError::repeated(&self.name, "normal"));
            }
            if self.user_normal.len() % 3 != 0 {
                return Err(CompileError::size_mismatch(
                    &self.name,
                    "normal",
                    "must be a multiple of 3",
                ));
            }
            self.normal = self
                .user_normal
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .collect();
        }

        if !self.user_texcoord.is_empty() {
            if !self.texcoord.is_empty() {
                return Err(CompileError::repeated(&self.name, "texcoord"));
            }
            if self.user_texcoord.len() % 2 != 0 {
                return Err(CompileError::size_mismatch(
                    &self.name,
                    "texcoord",
                    "must be a multiple of 2",
                ));
            }
            self.texcoord = self
                .user_texcoord
                .chunks_exact(2)
                .map(|c| [c[0], c[1]])
                .collect();
        }

        if !self.user_face.is_empty() {
            if !self.face.is_empty() {
                return Err(CompileError::repeated(&self.name, "face"));
            }
            if self.user_face.len() % 3 != 0 {
                return Err(CompileError::size_mismatch(
                    &self.name,
                    "face",
                    "must be a multiple of 3",
                ));
            }
            for &index in &self.user_face {
                if index as usize >= self.vert.len() {
                    return Err(CompileError::IndexOutOfRange {
                        mesh: self.name.clone(),
                        index: i64::from(index),
                        nvert: self.vert.len(),
                    });
                }
            }
            self.face = self
                .user_face
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .collect();

            // faces arrived without edges: synthesize for the audit
            if self.user_edge.is_empty() {
                let mut edges = Vec::new();
                edges_from_faces(&self.vert, &self.face, &mut edges);
                self.user_edge = edges;
            }
        }
        Ok(())
    }

    /// Copy the per-corner indirection arrays, which must match the face
    /// count exactly.
    fn ingest_user_indirection(&mut self) -> CompileResult<()> {
        if !self.user_facenormal.is_empty() {
            if !self.facenormal.is_empty() {
                return Err(CompileError::repeated(&self.name, "facenormal"));
            }
            if self.user_facenormal.len() != 3 * self.face.len() {
                return Err(CompileError::size_mismatch(
                    &self.name,
                    "facenormal",
                    "must have the same size as face data",
                ));
            }
            self.facenormal = self
                .user_facenormal
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .collect();
        }

        if !self.user_facetexcoord.is_empty() {
            if !self.facetexcoord.is_empty() {
                return Err(CompileError::repeated(&self.name, "facetexcoord"));
            }
            if self.user_facetexcoord.len() != 3 * self.face.len() {
                return Err(CompileError::size_mismatch(
                    &self.name,
                    "facetexcoord",
                    "must have the same size as face data",
                ));
            }
            self.facetexcoord = self
                .user_facetexcoord
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .collect();
        }
        Ok(())
    }

    /// Collapse bit-identical vertices and rewrite faces. Used by the STL
    /// reader, whose vertex stream is fully unrolled.
    pub(crate) fn remove_repeated(&mut self) -> CompileResult<()> {
        let removed = dedup::remove_repeated(&self.name, &mut self.vert, &mut self.face)?;
        if removed > 0 {
            tracing::debug!(mesh = %self.name, removed, "collapsed repeated vertices");
        }
        Ok(())
    }

    /// Canonical vertex positions.
    #[must_use]
    pub fn vert(&self) -> &[[f32; 3]] {
        &self.vert
    }

    /// Per-vertex normals.
    #[must_use]
    pub fn normal(&self) -> &[[f32; 3]] {
        &self.normal
    }

    /// Per-vertex texture coordinates.
    #[must_use]
    pub fn texcoord(&self) -> &[[f32; 2]] {
        &self.texcoord
    }

    /// Triangle faces as vertex-index triples.
    #[must_use]
    pub fn face(&self) -> &[[u32; 3]] {
        &self.face
    }

    /// Per-corner normal indices.
    #[must_use]
    pub fn facenormal(&self) -> &[[u32; 3]] {
        &self.facenormal
    }

    /// Per-corner texture-coordinate indices, when present.
    #[must_use]
    pub fn facetexcoord(&self) -> &[[u32; 3]] {
        &self.facetexcoord
    }

    /// Convex-hull graph, when one was built.
    #[must_use]
    pub fn graph(&self) -> Option<&HullGraph> {
        self.graph.as_ref()
    }

    /// Whether [`Mesh::compile`] has completed.
    #[must_use]
    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Endpoints (1-indexed) of the first duplicated directed edge, if
    /// the orientation audit found one.
    #[must_use]
    pub fn invalid_orientation(&self) -> Option<(u32, u32)> {
        self.invalid_orientation
    }

    /// Center of mass under the given interpretation.
    #[must_use]
    pub fn pos(&self, kind: MeshKind) -> Vector3<f64> {
        match kind {
            MeshKind::Volume => self.pos_volume,
            MeshKind::Shell => self.pos_surface,
        }
    }

    /// Principal-axis orientation under the given interpretation.
    #[must_use]
    pub fn quat(&self, kind: MeshKind) -> UnitQuaternion<f64> {
        match kind {
            MeshKind::Volume => self.quat_volume,
            MeshKind::Shell => self.quat_surface,
        }
    }

    /// Half-extents of the equivalent inertia box.
    ///
    /// Before the mesh is processed this returns the default (zeros)
    /// without error; afterwards it validates the compiled geometry and
    /// reports [`CompileError::DegenerateGeometry`] or
    /// [`CompileError::InconsistentOrientation`].
    ///
    /// # Errors
    ///
    /// See above; only post-compile validity failures error.
    pub fn inertia_box(&self, kind: MeshKind) -> CompileResult<Vector3<f64>> {
        self.check_mesh()?;
        Ok(match kind {
            MeshKind::Volume => self.boxsz_volume,
            MeshKind::Shell => self.boxsz_surface,
        })
    }

    /// Total volume (or total surface area for [`MeshKind::Shell`]).
    ///
    /// Pre-processed semantics match [`Mesh::inertia_box`].
    ///
    /// # Errors
    ///
    /// Post-compile validity failures, as for [`Mesh::inertia_box`].
    pub fn volume(&self, kind: MeshKind) -> CompileResult<f64> {
        self.check_mesh()?;
        Ok(match kind {
            MeshKind::Volume => self.volume,
            MeshKind::Shell => self.surface,
        })
    }

    /// Axis-aligned bounding box in the principal frame.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    /// Validate the compiled mesh. A no-op before processing completes.
    pub(crate) fn check_mesh(&self) -> CompileResult<()> {
        if !self.processed {
            return Ok(());
        }
        if let Some((vertex_a, vertex_b)) = self.invalid_orientation {
            return Err(CompileError::InconsistentOrientation {
                mesh: self.name.clone(),
                vertex_a,
                vertex_b,
            });
        }
        if !self.valid_area {
            return Err(CompileError::DegenerateGeometry {
                mesh: self.name.clone(),
                message: "mesh surface area is too small",
            });
        }
        if !self.valid_volume {
            return Err(CompileError::DegenerateGeometry {
                mesh: self.name.clone(),
                message: "mesh volume is too small",
            });
        }
        if !self.valid_eigenvalue {
            return Err(CompileError::DegenerateGeometry {
                mesh: self.name.clone(),
                message: "eigenvalue of mesh inertia must be positive",
            });
        }
        if !self.valid_inequality {
            return Err(CompileError::DegenerateGeometry {
                mesh: self.name.clone(),
                message: "eigenvalues of mesh inertia violate A + B >= C",
            });
        }
        Ok(())
    }
}

/// Emit three directed half-edges for every face whose area is
/// significant. Degenerate faces contribute nothing to the audit.
pub(crate) fn edges_from_faces(
    vert: &[[f32; 3]],
    face: &[[u32; 3]],
    edges: &mut Vec<(u32, u32)>,
) {
    for &[v0, v1, v2] in face {
        let props = triangle_props(
            vert[v0 as usize],
            vert[v1 as usize],
            vert[v2 as usize],
        );
        if props.area > MINVAL.sqrt() {
            edges.push((v0, v1));
            edges.push((v1, v2));
            edges.push((v2, v0));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn box_mesh() -> Mesh {
        let mut mesh = Mesh::new("box");
        mesh.user_vert = vec![
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0,
        ];
        mesh.user_face = vec![
            0, 2, 1, 0, 3, 2, 4, 5, 6, 4, 6, 7, 0, 1, 5, 0, 5, 4, //
            3, 7, 6, 3, 6, 2, 0, 4, 7, 0, 7, 3, 1, 2, 6, 1, 6, 5,
        ];
        mesh
    }

    #[test]
    fn compile_requires_vertices() {
        let mut mesh = Mesh::new("empty");
        let err = mesh.compile(None, &CompileConfig::default()).unwrap_err();
        assert!(matches!(err, CompileError::MissingData { .. }));
    }

    #[test]
    fn user_vert_needs_four_vertices() {
        let mut mesh = Mesh::new("small");
        mesh.user_vert = vec![0.0; 9];
        let err = mesh.compile(None, &CompileConfig::default()).unwrap_err();
        assert!(matches!(err, CompileError::SizeMismatch { .. }));
    }

    #[test]
    fn user_vert_stride_checked() {
        let mut mesh = Mesh::new("ragged");
        mesh.user_vert = vec![0.0; 13];
        let err = mesh.compile(None, &CompileConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CompileError::SizeMismatch {
                channel: "vertex",
                ..
            }
        ));
    }

    #[test]
    fn user_face_index_range_checked() {
        let mut mesh = box_mesh();
        mesh.user_face[0] = 99;
        let err = mesh.compile(None, &CompileConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CompileError::IndexOutOfRange { index: 99, .. }
        ));
    }

    #[test]
    fn facenormal_size_must_match_faces() {
        let mut mesh = box_mesh();
        mesh.user_facenormal = vec![0; 9];
        let err = mesh.compile(None, &CompileConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CompileError::SizeMismatch {
                channel: "facenormal",
                ..
            }
        ));
    }

    #[test]
    fn facenormal_aliases_faces_when_absent() {
        let mut mesh = box_mesh();
        mesh.compile(None, &CompileConfig::default()).unwrap();
        assert_eq!(mesh.facenormal(), mesh.face());
    }

    #[test]
    fn unknown_extension_rejected() {
        let mut mesh = Mesh::new("weird");
        mesh.file = Some("part.ply".to_string());
        let err = mesh.compile(None, &CompileConfig::default()).unwrap_err();
        assert!(matches!(err, CompileError::UnknownFormat { .. }));
    }

    #[test]
    fn consistent_box_passes_orientation_audit() {
        let mut mesh = box_mesh();
        mesh.compile(None, &CompileConfig::default()).unwrap();
        assert_eq!(mesh.invalid_orientation(), None);
        assert!(mesh.volume(MeshKind::Volume).is_ok());
    }

    #[test]
    fn duplicated_directed_edge_flagged_and_raised_lazily() {
        let mut mesh = Mesh::new("flipped");
        mesh.user_vert = vec![
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
        ];
        // both triangles emit the directed edge 0 -> 1
        mesh.user_face = vec![0, 1, 2, 0, 1, 3];
        mesh.compile(None, &CompileConfig::default()).unwrap();

        assert_eq!(mesh.invalid_orientation(), Some((1, 2)));
        let err = mesh.volume(MeshKind::Volume).unwrap_err();
        assert!(matches!(err, CompileError::InconsistentOrientation { .. }));
    }

    #[test]
    fn inertia_queries_silent_before_processing() {
        let mesh = Mesh::new("unprocessed");
        assert_eq!(mesh.inertia_box(MeshKind::Volume).unwrap(), Vector3::zeros());
        assert_eq!(mesh.volume(MeshKind::Shell).unwrap(), 0.0);
    }

    #[test]
    fn degenerate_edges_do_not_enter_audit() {
        let vert = [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]];
        let face = [[0u32, 1, 2]];
        let mut edges = Vec::new();
        edges_from_faces(&vert, &face, &mut edges);
        assert!(edges.is_empty());
    }
}
