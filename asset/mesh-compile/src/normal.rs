//! Vertex-normal synthesis with crease preservation.

use nalgebra::Vector3;

use crate::mesh::Mesh;
use crate::triangle::vec3;
use crate::MINVAL;

/// Faces whose normal dots the accumulated vertex normal below this are
/// treated as crease faces and their contribution is withdrawn.
const CREASE_DOT: f64 = 0.8;

/// Synthesize per-vertex normals by area-weighted averaging of face
/// normals.
///
/// Normals are sized one per vertex, and `facenormal` is filled with the
/// face's own vertex indices; the two arrays stay in one-to-one
/// correspondence through the rest of compilation.
///
/// Unless the mesh requests smooth normals, a second pass subtracts the
/// contribution of faces at a large angle to the accumulated normal,
/// which sharpens creases while leaving smooth regions untouched.
#[allow(clippy::cast_possible_truncation)]
// Truncation: accumulation runs in f64, storage is f32
pub(crate) fn make_normal(mesh: &mut Mesh) {
    if !mesh.normal.is_empty() {
        return;
    }

    let nvert = mesh.vert.len();
    let mut accum = vec![Vector3::<f64>::zeros(); nvert];

    if mesh.facenormal.is_empty() {
        mesh.facenormal = vec![[0; 3]; mesh.face.len()];
    }

    // accumulate face normals weighted by area
    for i in 0..mesh.face.len() {
        let corners = mesh.face[i];
        let (normal, area) = face_normal_area(mesh, corners);
        for (j, &corner) in corners.iter().enumerate() {
            accum[corner as usize] += normal * area;
            mesh.facenormal[i][j] = corner;
        }
    }

    // withdraw contributions from faces at large angles
    if !mesh.smoothnormal {
        let mut remove = vec![Vector3::<f64>::zeros(); nvert];
        for &corners in &mesh.face {
            let (normal, area) = face_normal_area(mesh, corners);
            for &corner in &corners {
                let vertex_normal = accum[corner as usize];
                let len = vertex_normal.norm();
                if len >= MINVAL && normal.dot(&(vertex_normal / len)) < CREASE_DOT {
                    remove[corner as usize] += normal * area;
                }
            }
        }
        for (n, r) in accum.iter_mut().zip(&remove) {
            *n -= r;
        }
    }

    // normalize, snapping degenerate normals to +z
    mesh.normal = accum
        .iter()
        .map(|n| {
            let len = n.norm();
            if len > MINVAL {
                [
                    (n.x / len) as f32,
                    (n.y / len) as f32,
                    (n.z / len) as f32,
                ]
            } else {
                [0.0, 0.0, 1.0]
            }
        })
        .collect();
}

/// Unit normal and area of the face with the given corners.
fn face_normal_area(mesh: &Mesh, corners: [u32; 3]) -> (Vector3<f64>, f64) {
    let a = vec3(mesh.vert[corners[0] as usize]);
    let b = vec3(mesh.vert[corners[1] as usize]);
    let c = vec3(mesh.vert[corners[2] as usize]);
    let cross = (b - a).cross(&(c - a));
    let area = cross.norm();
    if area < MINVAL {
        (Vector3::zeros(), 0.0)
    } else {
        (cross / area, area)
    }
}
