//! Convex-hull construction and the packed hull graph.
//!
//! The geometric kernel is pluggable through [`HullKernel`]; the
//! built-in [`IncrementalHull`] implements the classic incremental
//! algorithm. Kernel output is packed into a single contiguous integer
//! block, [`HullGraph`]:
//!
//! ```text
//! offset 0                      numvert
//! offset 1                      numface
//! 2 .. 2+numvert                per-vertex start offset into edge_localid
//! 2+numvert .. 2+2*numvert      per-vertex source-mesh index
//! 2+2*numvert ..                edge_localid: neighbor runs in hull-local
//!                               ids, each run terminated by -1
//! last 3*numface                face triples, hull-local ids
//! ```

use nalgebra::Vector3;
use thiserror::Error;
use tracing::warn;

use crate::error::{CompileError, CompileResult};

/// Error reported by a convex-hull kernel.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HullError(pub String);

/// One triangular hull facet.
#[derive(Debug, Clone, Copy)]
pub struct HullFacet {
    /// Source-point indices of the three corners.
    pub points: [usize; 3],
    /// Set when the facet's stored winding is opposite its topological
    /// orientation; the graph builder swaps the first two corners.
    pub flipped: bool,
}

/// One hull vertex with its facet adjacency.
#[derive(Debug, Clone)]
pub struct HullVertex {
    /// Index of the vertex in the source point set.
    pub point: usize,
    /// Indices into the facet list of every facet incident to this
    /// vertex.
    pub facets: Vec<usize>,
}

/// Kernel output: hull vertices with adjacency, plus triangular facets.
#[derive(Debug, Clone)]
pub struct HullOutput {
    /// Hull vertices in kernel order.
    pub vertices: Vec<HullVertex>,
    /// Triangular facets.
    pub facets: Vec<HullFacet>,
}

/// A convex-hull kernel.
///
/// Implementations must return triangulated output; triangularity is
/// enforced by the facet type.
pub trait HullKernel {
    /// Compute the convex hull of `points`.
    ///
    /// # Errors
    ///
    /// Returns a [`HullError`] when the hull cannot be constructed,
    /// e.g. for degenerate point sets.
    fn hull(&self, points: &[Vector3<f64>]) -> Result<HullOutput, HullError>;
}

/// Built-in incremental convex-hull kernel.
///
/// Seeds a tetrahedron from coordinate extremes, orients it outward,
/// then inserts the remaining points one at a time by deleting visible
/// facets and patching the horizon.
#[derive(Debug, Default, Clone, Copy)]
pub struct IncrementalHull;

impl HullKernel for IncrementalHull {
    fn hull(&self, points: &[Vector3<f64>]) -> Result<HullOutput, HullError> {
        incremental_hull(points)
    }
}

/// The packed convex-hull graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HullGraph {
    data: Vec<i32>,
}

impl HullGraph {
    /// Number of hull vertices.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    // Sign loss: counts are written from usize values during packing
    pub fn nvert(&self) -> usize {
        self.data[0] as usize
    }

    /// Number of hull faces.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    // Sign loss: counts are written from usize values during packing
    pub fn nface(&self) -> usize {
        self.data[1] as usize
    }

    /// The whole packed block.
    #[must_use]
    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }

    /// Per-vertex start offsets into the edge run block.
    #[must_use]
    pub fn vert_edgeadr(&self) -> &[i32] {
        &self.data[2..2 + self.nvert()]
    }

    /// Per-vertex source-mesh indices.
    #[must_use]
    pub fn vert_globalid(&self) -> &[i32] {
        let nvert = self.nvert();
        &self.data[2 + nvert..2 + 2 * nvert]
    }

    /// Neighbor runs in hull-local ids, `-1` terminated per vertex.
    #[must_use]
    pub fn edge_localid(&self) -> &[i32] {
        let nvert = self.nvert();
        let nface = self.nface();
        &self.data[2 + 2 * nvert..2 + 3 * nvert + 3 * nface]
    }

    /// Face triples in hull-local ids.
    #[must_use]
    pub fn face_localid(&self) -> &[i32] {
        let nvert = self.nvert();
        let nface = self.nface();
        &self.data[2 + 3 * nvert + 3 * nface..]
    }
}

/// Build the packed hull graph, or `None` when the mesh is too small or
/// the constructed graph fails its consistency check.
pub(crate) fn make_graph(
    name: &str,
    vert: &[[f32; 3]],
    kernel: &dyn HullKernel,
) -> CompileResult<Option<HullGraph>> {
    // a hull is meaningless below a tetrahedron
    if vert.len() < 4 {
        return Ok(None);
    }

    let points: Vec<Vector3<f64>> = vert.iter().map(|v| crate::triangle::vec3(*v)).collect();
    let output = kernel.hull(&points).map_err(|e| CompileError::HullFailure {
        mesh: name.to_string(),
        message: e.to_string(),
    })?;

    let numvert = output.vertices.len();
    let numface = output.facets.len();
    let szgraph = 2 + 3 * numvert + 6 * numface;
    let mut data = vec![0i32; szgraph];
    let (counts, rest) = data.split_at_mut(2);
    let (vert_edgeadr, rest) = rest.split_at_mut(numvert);
    let (vert_globalid, rest) = rest.split_at_mut(numvert);
    let (edge_localid, face_localid) = rest.split_at_mut(numvert + 3 * numface);

    let to_i32 = |value: usize| {
        i32::try_from(value)
            .map_err(|_| CompileError::internal(name, "hull graph exceeds index range"))
    };
    counts[0] = to_i32(numvert)?;
    counts[1] = to_i32(numface)?;

    // fill edge runs with source-mesh ids first
    let mut adr = 0usize;
    let mut ok = true;
    'vertices: for (i, vertex) in output.vertices.iter().enumerate() {
        if vertex.point >= vert.len() {
            ok = false;
            break;
        }
        vert_edgeadr[i] = to_i32(adr)?;
        vert_globalid[i] = to_i32(vertex.point)?;

        let start = adr;
        for &facet in &vertex.facets {
            let Some(facet) = output.facets.get(facet) else {
                ok = false;
                break 'vertices;
            };
            for pid in facet.points {
                if pid >= vert.len() {
                    ok = false;
                    break 'vertices;
                }
                if pid == vertex.point {
                    continue;
                }
                let pid = to_i32(pid)?;
                if !edge_localid[start..adr].contains(&pid) {
                    if adr >= edge_localid.len() {
                        return Err(CompileError::internal(
                            name,
                            "wrong size in convex hull graph",
                        ));
                    }
                    edge_localid[adr] = pid;
                    adr += 1;
                }
            }
        }

        if adr >= edge_localid.len() {
            return Err(CompileError::internal(name, "wrong size in convex hull graph"));
        }
        edge_localid[adr] = -1;
        adr += 1;
    }

    // bad kernel ids: report and continue without a hull
    if !ok {
        warn!(mesh = name, "could not construct convex hull graph");
        return Ok(None);
    }

    if adr != numvert + 3 * numface {
        return Err(CompileError::internal(name, "wrong size in convex hull graph"));
    }

    // faces, reoriented where the kernel flagged a flipped facet
    for (i, facet) in output.facets.iter().enumerate() {
        let mut slots = [0usize, 1, 2];
        if facet.flipped {
            slots.swap(0, 1);
        }
        for (j, &pid) in facet.points.iter().enumerate() {
            face_localid[3 * i + slots[j]] = to_i32(pid)?;
        }
    }

    // translate source-mesh ids to hull-local ids
    let localize = |entry: &mut i32| -> CompileResult<()> {
        if *entry >= 0 {
            let local = vert_globalid
                .iter()
                .position(|&gid| gid == *entry)
                .ok_or_else(|| {
                    CompileError::internal(name, "vertex id not found in convex hull")
                })?;
            *entry = to_i32(local)?;
        }
        Ok(())
    };
    for entry in edge_localid.iter_mut() {
        localize(entry)?;
    }
    for entry in face_localid.iter_mut() {
        localize(entry)?;
    }

    Ok(Some(HullGraph { data }))
}

/// Copy the hull's faces out of the graph, translating hull-local ids
/// back to source-mesh indices. Used when the mesh came without faces.
#[allow(clippy::cast_sign_loss)]
// Sign loss: face entries are hull-local ids, never the -1 sentinel
pub(crate) fn copy_graph_faces(graph: &HullGraph) -> Vec<[u32; 3]> {
    let globalid = graph.vert_globalid();
    graph
        .face_localid()
        .chunks_exact(3)
        .map(|f| {
            [
                globalid[f[0] as usize] as u32,
                globalid[f[1] as usize] as u32,
                globalid[f[2] as usize] as u32,
            ]
        })
        .collect()
}

/// Incremental convex hull over a point set.
fn incremental_hull(points: &[Vector3<f64>]) -> Result<HullOutput, HullError> {
    if points.len() < 4 {
        return Err(HullError("at least 4 points required".to_string()));
    }

    let (p0, p1, p2, p3) = initial_tetrahedron(points)?;

    // visibility tolerance relative to the point cloud extent
    let mut min = points[0];
    let mut max = points[0];
    for p in points {
        min = min.inf(p);
        max = max.sup(p);
    }
    let tol = 1e-10 * (max - min).norm().max(1.0);

    let mut faces: Vec<[usize; 3]> = vec![[p0, p1, p2], [p0, p2, p3], [p0, p3, p1], [p1, p3, p2]];

    // orient the seed tetrahedron outward
    let center = (points[p0] + points[p1] + points[p2] + points[p3]) / 4.0;
    for face in &mut faces {
        let a = points[face[0]];
        let n = (points[face[1]] - a).cross(&(points[face[2]] - a));
        let face_center = (a + points[face[1]] + points[face[2]]) / 3.0;
        if n.dot(&(face_center - center)) < 0.0 {
            face.swap(1, 2);
        }
    }

    let seed = [p0, p1, p2, p3];
    for (pid, point) in points.iter().enumerate() {
        if seed.contains(&pid) {
            continue;
        }

        // facets that can see the point
        let mut visible = Vec::new();
        for (fi, face) in faces.iter().enumerate() {
            let a = points[face[0]];
            let n = (points[face[1]] - a).cross(&(points[face[2]] - a));
            if n.dot(&(point - a)) > tol {
                visible.push(fi);
            }
        }
        if visible.is_empty() {
            continue;
        }

        // horizon: directed edges of visible facets whose reverse lies
        // on a hidden facet
        let mut horizon: Vec<(usize, usize)> = Vec::new();
        for &fi in &visible {
            let face = faces[fi];
            for k in 0..3 {
                let e0 = face[k];
                let e1 = face[(k + 1) % 3];
                let shared = visible.iter().any(|&fj| {
                    fj != fi && {
                        let other = faces[fj];
                        (0..3).any(|m| other[m] == e1 && other[(m + 1) % 3] == e0)
                    }
                });
                if !shared {
                    horizon.push((e0, e1));
                }
            }
        }

        // drop visible facets from the back so indices stay valid
        let mut doomed = visible;
        doomed.sort_unstable_by(|a, b| b.cmp(a));
        for fi in doomed {
            faces.swap_remove(fi);
        }

        for (e0, e1) in horizon {
            faces.push([e0, e1, pid]);
        }
    }

    // keep only vertices referenced by surviving facets
    let mut on_hull: Vec<usize> = faces.iter().flatten().copied().collect();
    on_hull.sort_unstable();
    on_hull.dedup();

    let mut vertices: Vec<HullVertex> = on_hull
        .into_iter()
        .map(|point| HullVertex {
            point,
            facets: Vec::new(),
        })
        .collect();
    let facets: Vec<HullFacet> = faces
        .iter()
        .map(|&points| HullFacet {
            points,
            flipped: false,
        })
        .collect();

    for (fi, face) in faces.iter().enumerate() {
        for &pid in face {
            // on_hull is sorted, so this lookup cannot fail
            if let Ok(slot) = vertices.binary_search_by_key(&pid, |v| v.point) {
                vertices[slot].facets.push(fi);
            }
        }
    }

    Ok(HullOutput { vertices, facets })
}

/// Pick four non-coplanar seed points: the two x-extremes (falling back
/// to y), the point farthest from their line, and the point farthest
/// from their plane.
fn initial_tetrahedron(points: &[Vector3<f64>]) -> Result<(usize, usize, usize, usize), HullError> {
    let n = points.len();

    let mut p0 = 0;
    let mut p1 = 0;
    for i in 1..n {
        if points[i].x < points[p0].x {
            p0 = i;
        }
        if points[i].x > points[p1].x {
            p1 = i;
        }
    }
    if (points[p0] - points[p1]).norm_squared() < 1e-20 {
        for i in 1..n {
            if points[i].y < points[p0].y {
                p0 = i;
            }
            if points[i].y > points[p1].y {
                p1 = i;
            }
        }
    }
    if (points[p0] - points[p1]).norm_squared() < 1e-20 {
        return Err(HullError("all points coincide".to_string()));
    }

    let line = (points[p1] - points[p0]).normalize();
    let mut p2 = 0;
    let mut best = 0.0;
    for (i, point) in points.iter().enumerate() {
        if i == p0 || i == p1 {
            continue;
        }
        let v = point - points[p0];
        let d = (v - line * v.dot(&line)).norm_squared();
        if d > best {
            best = d;
            p2 = i;
        }
    }
    if best < 1e-20 {
        return Err(HullError("points are collinear".to_string()));
    }

    let normal = (points[p1] - points[p0])
        .cross(&(points[p2] - points[p0]))
        .normalize();
    let mut p3 = 0;
    let mut best = 0.0;
    for (i, point) in points.iter().enumerate() {
        if i == p0 || i == p1 || i == p2 {
            continue;
        }
        let d = (point - points[p0]).dot(&normal).abs();
        if d > best {
            best = d;
            p3 = i;
        }
    }
    if best < 1e-12 {
        return Err(HullError("points are coplanar".to_string()));
    }

    Ok((p0, p1, p2, p3))
}
