//! Wavefront OBJ reader.
//!
//! Parsing is delegated to `tobj`; this module consumes the first shape,
//! splits quads, applies the lefthanded-scale winding swap, emits audit
//! edges for significant faces, and converts texture coordinates from
//! image space to texture space.

use crate::config::CompileConfig;
use crate::error::{CompileError, CompileResult};
use crate::mesh::Mesh;
use crate::triangle::triangle_props;
use crate::vfs::{read_source, Vfs};
use crate::MINVAL;

/// One corner of a parsed face: vertex index plus optional normal and
/// texcoord indices.
#[derive(Clone, Copy)]
struct Corner {
    vertex: u32,
    normal: Option<u32>,
    texcoord: Option<u32>,
}

/// Load an OBJ file into the mesh's staging arrays.
pub(crate) fn load_obj(
    mesh: &mut Mesh,
    file: &str,
    vfs: Option<&Vfs>,
    config: &CompileConfig,
) -> CompileResult<()> {
    let path = config.resolve_path(file);
    let path_text = path.to_string_lossy().to_string();
    let buffer = read_source(mesh.name(), &path, vfs)?;

    let options = tobj::LoadOptions {
        single_index: false,
        triangulate: false,
        ..Default::default()
    };
    // material libraries are not consumed; the loader callback returns
    // an empty library so missing .mtl files cannot fail the parse
    let (models, _materials) =
        tobj::load_obj_buf(&mut &buffer[..], &options, |_| Ok(Default::default()))
            .map_err(|e| {
                CompileError::format_invalid(mesh.name(), "OBJ", &path_text, e.to_string())
            })?;
    drop(buffer);

    let Some(model) = models.first() else {
        return Ok(());
    };
    let shape = &model.mesh;

    mesh.user_vert = shape.positions.clone();
    mesh.user_normal = shape.normals.clone();
    mesh.user_texcoord = shape.texcoords.clone();

    let righthand = mesh.scale.x * mesh.scale.y * mesh.scale.z > 0.0;
    let corners = collect_corners(mesh.name(), &path_text, shape, righthand)?;

    for corner in &corners {
        mesh.user_face.push(corner.vertex);
        if !mesh.user_normal.is_empty() {
            if let Some(normal) = corner.normal {
                mesh.user_facenormal.push(normal);
            }
        }
        if !mesh.user_texcoord.is_empty() {
            if let Some(texcoord) = corner.texcoord {
                mesh.user_facetexcoord.push(texcoord);
            }
        }
    }

    // edges for the orientation audit, skipping insignificant faces
    for triple in corners.chunks_exact(3) {
        let get = |corner: &Corner| {
            let base = 3 * corner.vertex as usize;
            [
                mesh.user_vert[base],
                mesh.user_vert[base + 1],
                mesh.user_vert[base + 2],
            ]
        };
        let props = triangle_props(get(&triple[0]), get(&triple[1]), get(&triple[2]));
        if props.area > MINVAL.sqrt() {
            mesh.user_edge.push((triple[0].vertex, triple[1].vertex));
            mesh.user_edge.push((triple[1].vertex, triple[2].vertex));
            mesh.user_edge.push((triple[2].vertex, triple[0].vertex));
        }
    }

    // flip v to convert image-space to texture-space coordinates;
    // the first pair is left alone for compatibility with existing assets
    for i in 1..mesh.user_texcoord.len() / 2 {
        mesh.user_texcoord[2 * i + 1] = 1.0 - mesh.user_texcoord[2 * i + 1];
    }

    Ok(())
}

/// Walk the shape's faces, splitting quads and applying the winding
/// swap, and return one corner list with three entries per triangle.
fn collect_corners(
    name: &str,
    path: &str,
    shape: &tobj::Mesh,
    righthand: bool,
) -> CompileResult<Vec<Corner>> {
    let corner_at = |i: usize| Corner {
        vertex: shape.indices[i],
        normal: shape.normal_indices.get(i).copied(),
        texcoord: shape.texcoord_indices.get(i).copied(),
    };

    let mut corners = Vec::new();
    let mut emit = |a: usize, b: usize, c: usize| {
        corners.push(corner_at(a));
        if righthand {
            corners.push(corner_at(b));
            corners.push(corner_at(c));
        } else {
            corners.push(corner_at(c));
            corners.push(corner_at(b));
        }
    };

    if shape.face_arities.is_empty() {
        // already triangulated
        for idx in (0..shape.indices.len()).step_by(3) {
            emit(idx, idx + 1, idx + 2);
        }
        return Ok(corners);
    }

    let mut idx = 0usize;
    for &arity in &shape.face_arities {
        let arity = arity as usize;
        if !(3..=4).contains(&arity) {
            return Err(CompileError::format_invalid(
                name,
                "OBJ",
                path,
                "only tri or quad meshes are supported",
            ));
        }
        emit(idx, idx + 1, idx + 2);
        if arity == 4 {
            emit(idx, idx + 2, idx + 3);
        }
        idx += arity;
    }
    Ok(corners)
}
