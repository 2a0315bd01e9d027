//! Binary STL reader.
//!
//! Layout: 80-byte header (ignored), little-endian `u32` triangle count,
//! then 50 bytes per triangle: `f32` normal (ignored), three `f32`
//! vertices, `u16` attribute (ignored). ASCII STL is not accepted; the
//! face-count and size checks reject it with a pointed message.

use crate::config::CompileConfig;
use crate::error::{CompileError, CompileResult};
use crate::mesh::{edges_from_faces, Mesh};
use crate::vfs::{read_source, Vfs};

/// Header bytes before the triangle records.
const HEADER_SIZE: usize = 84;

/// Size of one triangle record.
const TRIANGLE_SIZE: usize = 50;

/// Largest face count accepted; bigger values are almost certainly an
/// ASCII file read as binary.
const MAX_FACES: u32 = 200_000;

/// Largest coordinate magnitude accepted, so every later cast stays safe.
const MAX_COORD: f32 = 1_073_741_824.0; // 2^30

fn read_f32(buffer: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        buffer[offset],
        buffer[offset + 1],
        buffer[offset + 2],
        buffer[offset + 3],
    ])
}

/// Load a binary STL file into `mesh`, canonicalize its vertex stream,
/// and emit audit edges.
pub(crate) fn load_stl(
    mesh: &mut Mesh,
    file: &str,
    vfs: Option<&Vfs>,
    config: &CompileConfig,
) -> CompileResult<()> {
    let righthand = mesh.scale.x * mesh.scale.y * mesh.scale.z > 0.0;
    let path = config.resolve_path(file);
    let path_text = path.to_string_lossy().to_string();
    let buffer = read_source(mesh.name(), &path, vfs)?;

    if buffer.len() < HEADER_SIZE {
        return Err(CompileError::format_invalid(
            mesh.name(),
            "STL",
            &path_text,
            "invalid header",
        ));
    }

    let nface = u32::from_le_bytes([buffer[80], buffer[81], buffer[82], buffer[83]]);
    if nface < 1 || nface > MAX_FACES {
        return Err(CompileError::format_invalid(
            mesh.name(),
            "STL",
            &path_text,
            format!(
                "number of faces should be between 1 and {MAX_FACES}; \
                 perhaps this is an ASCII file?"
            ),
        ));
    }

    let nface = nface as usize;
    if buffer.len() != HEADER_SIZE + TRIANGLE_SIZE * nface {
        return Err(CompileError::format_invalid(
            mesh.name(),
            "STL",
            &path_text,
            "wrong size; perhaps this is an ASCII file?",
        ));
    }

    mesh.vert.reserve(3 * nface);
    mesh.face.reserve(nface);

    for i in 0..nface {
        let triangle = HEADER_SIZE + TRIANGLE_SIZE * i;
        let mut corners = [0u32; 3];
        for j in 0..3 {
            // 12-byte normal precedes the vertices
            let offset = triangle + 12 * (j + 1);
            let mut v = [0f32; 3];
            for (k, coord) in v.iter_mut().enumerate() {
                let value = read_f32(&buffer, offset + 4 * k);
                if value.is_nan() || value.is_infinite() {
                    return Err(CompileError::format_invalid(
                        mesh.name(),
                        "STL",
                        &path_text,
                        "contains invalid vertices",
                    ));
                }
                if value.abs() > MAX_COORD {
                    return Err(CompileError::format_invalid(
                        mesh.name(),
                        "STL",
                        &path_text,
                        "vertex coordinates exceed maximum bounds",
                    ));
                }
                *coord = value;
            }

            #[allow(clippy::cast_possible_truncation)]
            // Truncation: face count is capped at 200000, so 3*nface fits u32
            let id = mesh.vert.len() as u32;
            mesh.vert.push(v);
            corners[j] = id;
        }

        // swap winding if the scale is lefthanded
        if !righthand {
            corners.swap(1, 2);
        }
        mesh.face.push(corners);
    }

    drop(buffer);

    // STL streams are fully unrolled; collapse shared vertices so the
    // orientation audit can see shared edges at all
    mesh.remove_repeated()?;

    let mut edges = Vec::new();
    edges_from_faces(&mesh.vert, &mesh.face, &mut edges);
    mesh.user_edge = edges;
    Ok(())
}
