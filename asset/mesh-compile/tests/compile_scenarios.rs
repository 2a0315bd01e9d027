//! End-to-end compilation scenarios across the reader, canonicalizer,
//! hull, normal, and mass-property stages.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

use approx::assert_relative_eq;
use mesh_compile::{CompileConfig, CompileError, Mesh, MeshKind, Vfs};

// ---------------------------------------------------------------------------
// buffer builders
// ---------------------------------------------------------------------------

fn stl_buffer(triangles: &[[[f32; 3]; 3]]) -> Vec<u8> {
    let mut data = vec![0u8; 80];
    data.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
    for triangle in triangles {
        data.extend_from_slice(&[0u8; 12]);
        for vertex in triangle {
            for coord in vertex {
                data.extend_from_slice(&coord.to_le_bytes());
            }
        }
        data.extend_from_slice(&[0u8; 2]);
    }
    data
}

fn msh_buffer(vert: &[[f32; 3]], face: &[[i32; 3]]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&(vert.len() as i32).to_le_bytes());
    data.extend_from_slice(&0i32.to_le_bytes());
    data.extend_from_slice(&0i32.to_le_bytes());
    data.extend_from_slice(&(face.len() as i32).to_le_bytes());
    for v in vert {
        for c in v {
            data.extend_from_slice(&c.to_le_bytes());
        }
    }
    for f in face {
        for c in f {
            data.extend_from_slice(&c.to_le_bytes());
        }
    }
    data
}

const CUBE_VERT: [[f32; 3]; 8] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
    [0.0, 1.0, 1.0],
];

const CUBE_FACE: [[usize; 3]; 12] = [
    [0, 2, 1],
    [0, 3, 2],
    [4, 5, 6],
    [4, 6, 7],
    [0, 1, 5],
    [0, 5, 4],
    [3, 7, 6],
    [3, 6, 2],
    [0, 4, 7],
    [0, 7, 3],
    [1, 2, 6],
    [1, 6, 5],
];

/// Unit cube as an unrolled STL triangle soup, optionally translated.
fn cube_stl(offset: [f32; 3]) -> Vec<u8> {
    let triangles: Vec<[[f32; 3]; 3]> = CUBE_FACE
        .iter()
        .map(|face| {
            let at = |i: usize| {
                let v = CUBE_VERT[face[i]];
                [v[0] + offset[0], v[1] + offset[1], v[2] + offset[2]]
            };
            [at(0), at(1), at(2)]
        })
        .collect();
    stl_buffer(&triangles)
}

fn compile_stl(buffer: Vec<u8>, setup: impl FnOnce(&mut Mesh)) -> Mesh {
    let mut vfs = Vfs::new();
    vfs.add_buffer("mesh.stl", buffer);
    let mut mesh = Mesh::new("mesh");
    mesh.file = Some("mesh.stl".to_string());
    setup(&mut mesh);
    mesh.compile(Some(&vfs), &CompileConfig::default()).unwrap();
    mesh
}

// ---------------------------------------------------------------------------
// scenario: unit cube STL
// ---------------------------------------------------------------------------

#[test]
fn unit_cube_stl_compiles_to_canonical_form() {
    let mesh = compile_stl(cube_stl([0.0; 3]), |_| {});

    // 36 raw vertices collapse to the 8 corners
    assert_eq!(mesh.vert().len(), 8);
    assert_eq!(mesh.face().len(), 12);

    assert_relative_eq!(mesh.volume(MeshKind::Volume).unwrap(), 1.0, epsilon = 1e-6);
    assert_relative_eq!(mesh.volume(MeshKind::Shell).unwrap(), 6.0, epsilon = 1e-6);

    // center of mass before recentering
    let pos = mesh.pos(MeshKind::Volume);
    assert_relative_eq!(pos.x, 0.5, epsilon = 1e-6);
    assert_relative_eq!(pos.y, 0.5, epsilon = 1e-6);
    assert_relative_eq!(pos.z, 0.5, epsilon = 1e-6);

    // homogeneous cube: the equivalent inertia box is the cube itself
    let boxsz = mesh.inertia_box(MeshKind::Volume).unwrap();
    assert_relative_eq!(boxsz.x, 0.5, epsilon = 1e-4);
    assert_relative_eq!(boxsz.y, 0.5, epsilon = 1e-4);
    assert_relative_eq!(boxsz.z, 0.5, epsilon = 1e-4);

    // recentered: the principal-frame bounds enclose every vertex
    let aabb = mesh.aabb();
    for k in 0..3 {
        assert!(aabb.min[k] <= aabb.max[k]);
    }
    for v in mesh.vert() {
        for k in 0..3 {
            assert!(f64::from(v[k]) >= aabb.min[k] - 1e-6);
            assert!(f64::from(v[k]) <= aabb.max[k] + 1e-6);
        }
    }

    assert_relative_eq!(mesh.quat(MeshKind::Volume).norm(), 1.0, epsilon = 1e-9);
    assert_eq!(mesh.quat(MeshKind::Shell), mesh.quat(MeshKind::Volume));
}

#[test]
fn compiling_the_same_input_twice_is_deterministic() {
    let first = compile_stl(cube_stl([0.0; 3]), |_| {});
    let second = compile_stl(cube_stl([0.0; 3]), |_| {});
    assert_eq!(first.vert(), second.vert());
    assert_eq!(first.face(), second.face());
    assert_eq!(first.normal(), second.normal());
}

// ---------------------------------------------------------------------------
// scenario: regular tetrahedron with a reference rotation
// ---------------------------------------------------------------------------

#[test]
fn rotated_tetrahedron_keeps_analytic_volume() {
    // regular tetrahedron with edge length 2*sqrt(2)
    let v = [
        [1.0f32, 1.0, 1.0],
        [1.0, -1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, 1.0],
    ];
    let triangles = [
        [v[0], v[1], v[2]],
        [v[0], v[3], v[1]],
        [v[0], v[2], v[3]],
        [v[1], v[3], v[2]],
    ];

    let mesh = compile_stl(stl_buffer(&triangles), |mesh| {
        // 180 degrees about x
        mesh.refquat = nalgebra::Quaternion::new(0.0, 1.0, 0.0, 0.0);
    });

    // sqrt(2)/12 * a^3 with a = 2*sqrt(2)
    let edge = 2.0f64 * 2.0f64.sqrt();
    let expected = 2.0f64.sqrt() / 12.0 * edge.powi(3);
    assert_relative_eq!(
        mesh.volume(MeshKind::Volume).unwrap(),
        expected,
        epsilon = 1e-5
    );
    assert_relative_eq!(mesh.quat(MeshKind::Volume).norm(), 1.0, epsilon = 1e-9);
}

// ---------------------------------------------------------------------------
// scenario: heavily duplicated vertex stream
// ---------------------------------------------------------------------------

#[test]
fn triangle_fan_collapses_to_distinct_points() {
    // 100 triangles around a shared apex: 300 raw entries, 102 distinct
    let rim: Vec<[f32; 3]> = (0..=100)
        .map(|i| {
            let angle = (i as f32) * 0.05;
            [angle.cos(), angle.sin(), 0.0]
        })
        .collect();
    let apex = [0.0f32, 0.0, 0.0];
    let triangles: Vec<[[f32; 3]; 3]> =
        (0..100).map(|i| [apex, rim[i], rim[i + 1]]).collect();

    let mesh = compile_stl(stl_buffer(&triangles), |_| {});
    assert_eq!(mesh.vert().len(), 102);
    assert_eq!(mesh.face().len(), 100);

    // planar fan: compiles, but volume queries report the degeneracy
    assert!(matches!(
        mesh.volume(MeshKind::Volume),
        Err(CompileError::DegenerateGeometry { .. })
    ));
}

// ---------------------------------------------------------------------------
// scenario: OBJ quad
// ---------------------------------------------------------------------------

#[test]
fn obj_quad_splits_into_fan_triangles() {
    let text = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
";
    let mut vfs = Vfs::new();
    vfs.add_buffer("quad.obj", text.as_bytes().to_vec());
    let mut mesh = Mesh::new("quad");
    mesh.file = Some("quad.obj".to_string());
    mesh.compile(Some(&vfs), &CompileConfig::default()).unwrap();

    assert_eq!(mesh.face(), &[[0, 1, 2], [0, 2, 3]]);
}

// ---------------------------------------------------------------------------
// scenario: MSH with inconsistent winding
// ---------------------------------------------------------------------------

#[test]
fn msh_with_inconsistent_winding_reports_the_edge() {
    let vert = [
        [0.0f32, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ];
    // both faces traverse the directed edge 0 -> 1
    let face = [[0i32, 1, 2], [0, 1, 3]];

    let mut vfs = Vfs::new();
    vfs.add_buffer("bad.msh", msh_buffer(&vert, &face));
    let mut mesh = Mesh::new("bad");
    mesh.file = Some("bad.msh".to_string());
    mesh.compile(Some(&vfs), &CompileConfig::default()).unwrap();

    assert_eq!(mesh.invalid_orientation(), Some((1, 2)));
    assert!(matches!(
        mesh.volume(MeshKind::Volume),
        Err(CompileError::InconsistentOrientation { .. })
    ));
}

#[test]
fn msh_without_normals_gets_synthesized_unit_normals() {
    let vert = [
        [1.0f32, 1.0, 1.0],
        [1.0, -1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, 1.0],
    ];
    let face = [[0i32, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]];

    let mut vfs = Vfs::new();
    vfs.add_buffer("tet.msh", msh_buffer(&vert, &face));
    let mut mesh = Mesh::new("tet");
    mesh.file = Some("tet.msh".to_string());
    mesh.compile(Some(&vfs), &CompileConfig::default()).unwrap();

    assert_eq!(mesh.normal().len(), mesh.vert().len());
    for n in mesh.normal() {
        let len: f32 = n.iter().map(|c| c * c).sum::<f32>().sqrt();
        assert_relative_eq!(f64::from(len), 1.0, epsilon = 1e-5);
    }
}

// ---------------------------------------------------------------------------
// round trips: translation, scale, reflection
// ---------------------------------------------------------------------------

#[test]
fn refpos_matches_preshifted_geometry() {
    let plain = compile_stl(cube_stl([0.0; 3]), |_| {});
    let shifted = compile_stl(cube_stl([1.0, 2.0, 3.0]), |mesh| {
        mesh.refpos = nalgebra::Vector3::new(1.0, 2.0, 3.0);
    });

    assert_eq!(plain.vert(), shifted.vert());
    assert_relative_eq!(
        plain.volume(MeshKind::Volume).unwrap(),
        shifted.volume(MeshKind::Volume).unwrap(),
        epsilon = 1e-9
    );
}

#[test]
fn uniform_scale_cubes_the_volume() {
    let mesh = compile_stl(cube_stl([0.0; 3]), |mesh| {
        mesh.scale = nalgebra::Vector3::new(2.0, 2.0, 2.0);
    });

    assert_relative_eq!(mesh.volume(MeshKind::Volume).unwrap(), 8.0, epsilon = 1e-5);
    let boxsz = mesh.inertia_box(MeshKind::Volume).unwrap();
    assert_relative_eq!(boxsz.x, 1.0, epsilon = 1e-4);
}

#[test]
fn reflection_keeps_volume_positive() {
    let config = CompileConfig {
        exactmeshinertia: true,
        ..Default::default()
    };

    let mut vfs = Vfs::new();
    vfs.add_buffer("mesh.stl", cube_stl([0.0; 3]));
    let mut mesh = Mesh::new("mesh");
    mesh.file = Some("mesh.stl".to_string());
    mesh.scale = nalgebra::Vector3::new(-1.0, 1.0, 1.0);
    mesh.compile(Some(&vfs), &config).unwrap();

    assert!(mesh.volume(MeshKind::Volume).unwrap() > 0.0);
    assert_relative_eq!(mesh.volume(MeshKind::Volume).unwrap(), 1.0, epsilon = 1e-5);
}

// ---------------------------------------------------------------------------
// boundary: single-face STL
// ---------------------------------------------------------------------------

#[test]
fn single_face_stl_compiles_but_volume_is_degenerate() {
    let mesh = compile_stl(
        stl_buffer(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]),
        |_| {},
    );

    assert!(mesh.is_processed());
    let err = mesh.volume(MeshKind::Volume).unwrap_err();
    assert!(err.to_string().contains("volume is too small"));
}

// ---------------------------------------------------------------------------
// convex hull
// ---------------------------------------------------------------------------

#[test]
fn point_cloud_without_faces_gets_hull_faces() {
    let mut mesh = Mesh::new("cloud");
    for v in &CUBE_VERT {
        mesh.user_vert.extend_from_slice(v);
    }
    // an interior point that must not survive onto the hull
    mesh.user_vert.extend_from_slice(&[0.5, 0.5, 0.5]);
    mesh.compile(None, &CompileConfig::default()).unwrap();

    let graph = mesh.graph().expect("hull graph");
    assert_eq!(graph.nvert(), 8);
    assert_eq!(graph.nface(), 12);
    assert_eq!(mesh.face().len(), 12);
    assert_relative_eq!(mesh.volume(MeshKind::Volume).unwrap(), 1.0, epsilon = 1e-5);
}

#[test]
fn needhull_builds_graph_alongside_faces() {
    let mut mesh = Mesh::new("hulled");
    for v in &CUBE_VERT {
        mesh.user_vert.extend_from_slice(v);
    }
    for f in &CUBE_FACE {
        mesh.user_face.extend(f.iter().map(|&i| i as u32));
    }
    mesh.needhull = true;
    mesh.compile(None, &CompileConfig::default()).unwrap();

    assert!(mesh.graph().is_some());
    assert_eq!(mesh.face().len(), 12);
}

#[test]
fn convexhull_disabled_skips_requested_graph() {
    let mut mesh = Mesh::new("nohull");
    for v in &CUBE_VERT {
        mesh.user_vert.extend_from_slice(v);
    }
    for f in &CUBE_FACE {
        mesh.user_face.extend(f.iter().map(|&i| i as u32));
    }
    mesh.needhull = true;
    let config = CompileConfig {
        convexhull: false,
        ..Default::default()
    };
    mesh.compile(None, &config).unwrap();
    assert!(mesh.graph().is_none());
}

// ---------------------------------------------------------------------------
// principal frame
// ---------------------------------------------------------------------------

#[test]
fn inertia_is_diagonal_in_the_output_frame() {
    // 1 x 2 x 3 box: distinct moments, so the frame is unambiguous
    let vert: Vec<[f32; 3]> = CUBE_VERT
        .iter()
        .map(|v| [v[0], v[1] * 2.0, v[2] * 3.0])
        .collect();

    let mut mesh = Mesh::new("box123");
    for v in &vert {
        mesh.user_vert.extend_from_slice(v);
    }
    for f in &CUBE_FACE {
        mesh.user_face.extend(f.iter().map(|&i| i as u32));
    }
    mesh.compile(None, &CompileConfig::default()).unwrap();

    // recompute the inertia tensor on the output geometry
    let pairs = [[0, 0], [1, 1], [2, 2], [0, 1], [0, 2], [1, 2]];
    let mut products = [0.0f64; 6];
    for face in mesh.face() {
        let d: Vec<f64> = mesh.vert()[face[0] as usize].iter().map(|&c| f64::from(c)).collect();
        let e: Vec<f64> = mesh.vert()[face[1] as usize].iter().map(|&c| f64::from(c)).collect();
        let f: Vec<f64> = mesh.vert()[face[2] as usize].iter().map(|&c| f64::from(c)).collect();

        let db = nalgebra::Vector3::new(e[0] - d[0], e[1] - d[1], e[2] - d[2]);
        let dc = nalgebra::Vector3::new(f[0] - d[0], f[1] - d[1], f[2] - d[2]);
        let cross = db.cross(&dc);
        let area = cross.norm() / 2.0;
        let normal = cross / cross.norm();
        let center = nalgebra::Vector3::new(
            (d[0] + e[0] + f[0]) / 3.0,
            (d[1] + e[1] + f[1]) / 3.0,
            (d[2] + e[2] + f[2]) / 3.0,
        );
        let vol = center.dot(&normal) * area / 3.0;

        for (slot, &[ki, kj]) in pairs.iter().enumerate() {
            products[slot] += vol / 20.0
                * (2.0 * (d[ki] * d[kj] + e[ki] * e[kj] + f[ki] * f[kj])
                    + d[ki] * e[kj]
                    + d[kj] * e[ki]
                    + d[ki] * f[kj]
                    + d[kj] * f[ki]
                    + e[ki] * f[kj]
                    + e[kj] * f[ki]);
        }
    }

    let scale = products[0] + products[1] + products[2];
    assert!(scale > 0.0);
    for offdiag in &products[3..] {
        assert!(
            offdiag.abs() / scale < 1e-6,
            "off-diagonal product {offdiag} vs scale {scale}"
        );
    }
}

#[test]
fn principal_box_orders_extents_descending() {
    let vert: Vec<[f32; 3]> = CUBE_VERT
        .iter()
        .map(|v| [v[0], v[1] * 2.0, v[2] * 3.0])
        .collect();

    let mut mesh = Mesh::new("box123");
    for v in &vert {
        mesh.user_vert.extend_from_slice(v);
    }
    for f in &CUBE_FACE {
        mesh.user_face.extend(f.iter().map(|&i| i as u32));
    }
    mesh.compile(None, &CompileConfig::default()).unwrap();

    let boxsz = mesh.inertia_box(MeshKind::Volume).unwrap();
    assert_relative_eq!(boxsz.x, 1.5, epsilon = 1e-3);
    assert_relative_eq!(boxsz.y, 1.0, epsilon = 1e-3);
    assert_relative_eq!(boxsz.z, 0.5, epsilon = 1e-3);

    let aabb = mesh.aabb();
    assert_relative_eq!(aabb.max.x, 1.5, epsilon = 1e-3);
    assert_relative_eq!(aabb.max.y, 1.0, epsilon = 1e-3);
    assert_relative_eq!(aabb.max.z, 0.5, epsilon = 1e-3);
}
