//! Mass-properties engine: reference pose, volume and center of mass,
//! inertia, principal-axis alignment.
//!
//! Runs once per interpretation. The volume pass applies the reference
//! pose, recenters the geometry at its center of mass, and rotates it
//! into the principal frame; the shell pass recomputes mass properties
//! on the already-transformed geometry and reuses the volume pass's
//! orientation.

use nalgebra::{Matrix3, Rotation3, SymmetricEigen, UnitQuaternion, Vector3};

use crate::config::CompileConfig;
use crate::error::{CompileError, CompileResult};
use crate::mesh::{Mesh, MeshKind};
use crate::triangle::{triangle_props, vec3};
use crate::MINVAL;

/// Index pairs of the six products of inertia.
const PAIRS: [[usize; 2]; 6] = [[0, 0], [1, 1], [2, 2], [0, 1], [0, 2], [1, 2]];

/// Apply the reference pose, integrate mass properties for both
/// interpretations, and align the mesh with its principal frame.
pub(crate) fn process(mesh: &mut Mesh, config: &CompileConfig) -> CompileResult<()> {
    for kind in [MeshKind::Volume, MeshKind::Shell] {
        let mut facecen = Vector3::<f64>::zeros();

        if kind == MeshKind::Volume {
            apply_reference_pose(mesh);

            // area-weighted centroid of the faces
            let mut area = 0.0;
            for i in 0..mesh.face.len() {
                for &corner in &mesh.face[i] {
                    if corner as usize >= mesh.vert.len() {
                        return Err(CompileError::IndexOutOfRange {
                            mesh: mesh.name().to_string(),
                            index: i64::from(corner),
                            nvert: mesh.vert.len(),
                        });
                    }
                }
                let props = face_props(mesh, i);
                facecen += props.area * props.center;
                area += props.area;
            }

            if area < MINVAL {
                mesh.valid_area = false;
                return Ok(());
            }
            facecen /= area;
        }

        // volume (or surface area) and center of mass from signed
        // pyramids with their apex at the face centroid
        let mut total = 0.0;
        let mut com = Vector3::<f64>::zeros();
        for i in 0..mesh.face.len() {
            let props = face_props(mesh, i);
            let vol = contribution(kind, config, props.area, props.center - facecen, props.normal);
            total += vol;
            com += vol * (props.center * 3.0 / 4.0 + facecen / 4.0);
        }

        if total < MINVAL {
            mesh.valid_volume = false;
            return Ok(());
        }
        com /= total;
        match kind {
            MeshKind::Volume => mesh.pos_volume = com,
            MeshKind::Shell => mesh.pos_surface = com,
        }

        // re-center the mesh at its center of mass
        if kind == MeshKind::Volume {
            for v in &mut mesh.vert {
                for j in 0..3 {
                    #[allow(clippy::cast_possible_truncation)]
                    {
                        v[j] = (f64::from(v[j]) - com[j]) as f32;
                    }
                }
            }
        }

        // products of inertia on the centered geometry; the pyramids now
        // have their apex at the origin
        let mut products = [0.0f64; 6];
        let mut total = 0.0;
        for i in 0..mesh.face.len() {
            let [a, b, c] = mesh.face[i];
            let d = vec3(mesh.vert[a as usize]);
            let e = vec3(mesh.vert[b as usize]);
            let f = vec3(mesh.vert[c as usize]);

            let props = face_props(mesh, i);
            let vol = contribution(kind, config, props.area, props.center, props.normal);
            total += vol;

            let divisor = match kind {
                MeshKind::Shell => 12.0,
                MeshKind::Volume => 20.0,
            };
            for (slot, &[ki, kj]) in PAIRS.iter().enumerate() {
                products[slot] += config.density * vol / divisor
                    * (2.0 * (d[ki] * d[kj] + e[ki] * e[kj] + f[ki] * f[kj])
                        + d[ki] * e[kj]
                        + d[kj] * e[ki]
                        + d[ki] * f[kj]
                        + d[kj] * f[ki]
                        + e[ki] * f[kj]
                        + e[kj] * f[ki]);
            }
        }
        match kind {
            MeshKind::Volume => mesh.volume = total,
            MeshKind::Shell => mesh.surface = total,
        }

        // products of inertia to moments of inertia
        let inertia = Matrix3::new(
            products[1] + products[2],
            -products[3],
            -products[4],
            -products[3],
            products[0] + products[2],
            -products[5],
            -products[4],
            -products[5],
            products[0] + products[1],
        );

        let (eigval, quat) = eig3(&inertia);
        if eigval[2] <= 0.0 {
            mesh.valid_eigenvalue = false;
            return Ok(());
        }
        if eigval[0] + eigval[1] < eigval[2]
            || eigval[0] + eigval[2] < eigval[1]
            || eigval[1] + eigval[2] < eigval[0]
        {
            mesh.valid_inequality = false;
            return Ok(());
        }

        // equivalent inertia box
        let mass = total * config.density;
        let boxsz = Vector3::new(
            (6.0 * (eigval[1] + eigval[2] - eigval[0]) / mass).sqrt() / 2.0,
            (6.0 * (eigval[0] + eigval[2] - eigval[1]) / mass).sqrt() / 2.0,
            (6.0 * (eigval[0] + eigval[1] - eigval[2]) / mass).sqrt() / 2.0,
        );

        match kind {
            MeshKind::Volume => {
                mesh.boxsz_volume = boxsz;
                mesh.quat_volume = quat;
                reorient(mesh, quat);
            }
            MeshKind::Shell => {
                mesh.boxsz_surface = boxsz;
                // the shell shares the volume pass's principal frame
                mesh.quat_surface = mesh.quat_volume;
            }
        }
    }
    Ok(())
}

/// Translate, rotate, and scale the geometry into the reference pose,
/// then re-normalize the normals.
fn apply_reference_pose(mesh: &mut Mesh) {
    #[allow(clippy::cast_possible_truncation)]
    if mesh.refpos != Vector3::zeros() {
        let rp = [
            mesh.refpos.x as f32,
            mesh.refpos.y as f32,
            mesh.refpos.z as f32,
        ];
        for v in &mut mesh.vert {
            v[0] -= rp[0];
            v[1] -= rp[1];
            v[2] -= rp[2];
        }
    }

    let identity = nalgebra::Quaternion::new(1.0, 0.0, 0.0, 0.0);
    if mesh.refquat != identity {
        let quat = UnitQuaternion::try_new(mesh.refquat, MINVAL)
            .unwrap_or_else(UnitQuaternion::identity);
        // inverse rotation brings the mesh into the canonical frame
        let inverse = quat.to_rotation_matrix().transpose();
        rotate_arrays(&mut mesh.vert, inverse.matrix());
        rotate_arrays(&mut mesh.normal, inverse.matrix());
    }

    #[allow(clippy::cast_possible_truncation)]
    if mesh.scale != Vector3::new(1.0, 1.0, 1.0) {
        for v in &mut mesh.vert {
            for j in 0..3 {
                v[j] = (f64::from(v[j]) * mesh.scale[j]) as f32;
            }
        }
        // normals pick up the nonuniform scale here and are
        // re-normalized immediately below
        for n in &mut mesh.normal {
            for j in 0..3 {
                n[j] = (f64::from(n[j]) * mesh.scale[j]) as f32;
            }
        }
    }

    for n in &mut mesh.normal {
        let len_sq = f64::from(n[0] * n[0] + n[1] * n[1] + n[2] * n[2]);
        if len_sq > MINVAL {
            #[allow(clippy::cast_possible_truncation)]
            let scl = (1.0 / len_sq.sqrt()) as f32;
            n[0] *= scl;
            n[1] *= scl;
            n[2] *= scl;
        } else {
            *n = [0.0, 0.0, 1.0];
        }
    }
}

/// Triangle properties of face `i` on the current geometry.
fn face_props(mesh: &Mesh, i: usize) -> crate::triangle::TriangleProps {
    let [a, b, c] = mesh.face[i];
    triangle_props(
        mesh.vert[a as usize],
        mesh.vert[b as usize],
        mesh.vert[c as usize],
    )
}

/// Per-face contribution: plain area for the shell interpretation,
/// signed pyramid volume for the volume interpretation; absolute value
/// in legacy mode.
fn contribution(
    kind: MeshKind,
    config: &CompileConfig,
    area: f64,
    apex_to_center: Vector3<f64>,
    normal: Vector3<f64>,
) -> f64 {
    let vol = match kind {
        MeshKind::Shell => area,
        MeshKind::Volume => apex_to_center.dot(&normal) * area / 3.0,
    };
    if config.exactmeshinertia {
        vol
    } else {
        vol.abs()
    }
}

/// Rotate an array of packed `f32` triples by `rot`.
#[allow(clippy::cast_possible_truncation)]
fn rotate_arrays(data: &mut [[f32; 3]], rot: &Matrix3<f64>) {
    for v in data.iter_mut() {
        let rotated = rot * vec3(*v);
        v[0] = rotated.x as f32;
        v[1] = rotated.y as f32;
        v[2] = rotated.z as f32;
    }
}

/// Rotate vertices and normals by the inverse of the principal-frame
/// quaternion and track the axis-aligned bounding box.
#[allow(clippy::cast_possible_truncation)]
fn reorient(mesh: &mut Mesh, quat: UnitQuaternion<f64>) {
    let rot = quat.to_rotation_matrix().transpose();
    for v in &mut mesh.vert {
        let rotated = rot * vec3(*v);
        v[0] = rotated.x as f32;
        v[1] = rotated.y as f32;
        v[2] = rotated.z as f32;
        mesh.aabb.expand(rotated);
    }
    rotate_arrays(&mut mesh.normal, rot.matrix());
}

/// Eigendecomposition of a symmetric 3x3 matrix: eigenvalues sorted
/// ascending and the principal-frame rotation as a unit quaternion.
fn eig3(matrix: &Matrix3<f64>) -> ([f64; 3], UnitQuaternion<f64>) {
    let eigen = SymmetricEigen::new(*matrix);

    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

    let eigval = [
        eigen.eigenvalues[order[0]],
        eigen.eigenvalues[order[1]],
        eigen.eigenvalues[order[2]],
    ];

    let mut basis = Matrix3::from_columns(&[
        eigen.eigenvectors.column(order[0]).into_owned(),
        eigen.eigenvectors.column(order[1]).into_owned(),
        eigen.eigenvectors.column(order[2]).into_owned(),
    ]);
    // eigenvectors of a symmetric matrix are orthonormal but may form a
    // left-handed basis; flip one axis so the quaternion is proper
    if basis.determinant() < 0.0 {
        let flipped = -basis.column(2).clone_owned();
        basis.set_column(2, &flipped);
    }

    let quat = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(basis));
    (eigval, quat)
}
