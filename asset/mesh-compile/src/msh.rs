//! MSH binary reader.
//!
//! Layout: little-endian `i32` header `{nvert, nnormal, ntexcoord,
//! nface}`, then `f32 vert[3*nvert]`, `f32 normal[3*nnormal]`,
//! `f32 texcoord[2*ntexcoord]`, `i32 face[3*nface]`. Normals and
//! texcoords, when present, are per-vertex (`nnormal == nvert`). The
//! total size must match exactly.

use crate::config::CompileConfig;
use crate::error::{CompileError, CompileResult};
use crate::mesh::{edges_from_faces, Mesh};
use crate::vfs::{read_source, Vfs};

fn read_i32(buffer: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ])
}

fn read_f32(buffer: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ])
}

/// Load an MSH binary file into `mesh` and emit audit edges.
#[allow(clippy::cast_sign_loss)]
// Sign loss: header counts are rejected when negative before use
pub(crate) fn load_msh(
    mesh: &mut Mesh,
    file: &str,
    vfs: Option<&Vfs>,
    config: &CompileConfig,
) -> CompileResult<()> {
    let righthand = mesh.scale.x * mesh.scale.y * mesh.scale.z > 0.0;
    let path = config.resolve_path(file);
    let path_text = path.to_string_lossy().to_string();
    let buffer = read_source(mesh.name(), &path, vfs)?;

    if buffer.len() < 16 {
        return Err(CompileError::format_invalid(
            mesh.name(),
            "MSH",
            &path_text,
            "missing header",
        ));
    }

    let nvert = read_i32(&buffer, 0);
    let nnormal = read_i32(&buffer, 4);
    let ntexcoord = read_i32(&buffer, 8);
    let nface = read_i32(&buffer, 12);

    if nvert < 4
        || nnormal < 0
        || ntexcoord < 0
        || nface < 0
        || (nnormal > 0 && nnormal != nvert)
        || (ntexcoord > 0 && ntexcoord != nvert)
    {
        return Err(CompileError::format_invalid(
            mesh.name(),
            "MSH",
            &path_text,
            "invalid sizes in header",
        ));
    }

    let nvert = nvert as usize;
    let nnormal = nnormal as usize;
    let ntexcoord = ntexcoord as usize;
    let nface = nface as usize;

    let expected = 16 + 12 * nvert + 12 * nnormal + 8 * ntexcoord + 12 * nface;
    if buffer.len() != expected {
        return Err(CompileError::format_invalid(
            mesh.name(),
            "MSH",
            &path_text,
            "unexpected file size",
        ));
    }

    let mut offset = 16;
    mesh.vert = (0..nvert)
        .map(|i| {
            let base = offset + 12 * i;
            [
                read_f32(&buffer, base),
                read_f32(&buffer, base + 4),
                read_f32(&buffer, base + 8),
            ]
        })
        .collect();
    offset += 12 * nvert;

    if nnormal > 0 {
        mesh.normal = (0..nnormal)
            .map(|i| {
                let base = offset + 12 * i;
                [
                    read_f32(&buffer, base),
                    read_f32(&buffer, base + 4),
                    read_f32(&buffer, base + 8),
                ]
            })
            .collect();
        offset += 12 * nnormal;
    }

    if ntexcoord > 0 {
        mesh.texcoord = (0..ntexcoord)
            .map(|i| {
                let base = offset + 8 * i;
                [read_f32(&buffer, base), read_f32(&buffer, base + 4)]
            })
            .collect();
        offset += 8 * ntexcoord;
    }

    if nface > 0 {
        let mut faces = Vec::with_capacity(nface);
        for i in 0..nface {
            let base = offset + 12 * i;
            let mut corners = [0u32; 3];
            for (j, corner) in corners.iter_mut().enumerate() {
                let index = read_i32(&buffer, base + 4 * j);
                if index < 0 || index as usize >= nvert {
                    return Err(CompileError::IndexOutOfRange {
                        mesh: mesh.name().to_string(),
                        index: i64::from(index),
                        nvert,
                    });
                }
                *corner = index as u32;
            }
            faces.push(corners);
        }
        mesh.face = faces;

        // normal and texcoord indices alias the vertex indices
        mesh.facenormal = mesh.face.clone();
        if ntexcoord > 0 {
            mesh.facetexcoord = mesh.face.clone();
        }

        // swap winding if the scale is lefthanded
        if !righthand {
            for face in &mut mesh.face {
                face.swap(1, 2);
            }
        }

        let mut edges = Vec::new();
        edges_from_faces(&mesh.vert, &mesh.face, &mut edges);
        mesh.user_edge = edges;
    }

    Ok(())
}
