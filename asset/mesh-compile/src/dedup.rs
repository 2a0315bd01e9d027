//! Vertex canonicalization: collapse bit-identical vertices and rewrite
//! face indices through a redirect chain.

use crate::error::{CompileError, CompileResult};

/// Sort key: a coarse 1-D projection of the vertex.
///
/// Not a total lexicographic order, and deliberately so — all the sort
/// has to guarantee is that exactly-equal vertices land adjacent, which
/// this projection does.
fn sort_key(v: [f32; 3]) -> f64 {
    f64::from(v[0]) + 1e-2 * f64::from(v[1]) + 1e-4 * f64::from(v[2])
}

/// Remove repeated vertices and rewrite `face` accordingly.
///
/// Equality is exact float comparison; callers wanting tolerance-based
/// welding must quantize first. Redirect chains are path-compressed
/// before compaction so long runs of coincident vertices stay linear.
///
/// Returns the number of vertices removed.
pub(crate) fn remove_repeated(
    name: &str,
    vert: &mut Vec<[f32; 3]>,
    face: &mut [[u32; 3]],
) -> CompileResult<usize> {
    let nvert = vert.len();
    let mut index: Vec<usize> = (0..nvert).collect();
    let mut redirect: Vec<usize> = (0..nvert).collect();

    index.sort_by(|&a, &b| sort_key(vert[a]).total_cmp(&sort_key(vert[b])));

    // find repeated vertices, set redirect
    let mut repeated = 0usize;
    for i in 1..nvert {
        if vert[index[i]] == vert[index[i - 1]] {
            redirect[index[i]] = index[i - 1];
            repeated += 1;
        }
    }

    if repeated > 0 {
        // follow redirections to the root, then compress
        for i in 0..nvert {
            let mut j = i;
            while redirect[j] != j {
                j = redirect[j];
            }
            redirect[i] = j;
        }

        // compact survivors in place, reusing index for compressed positions
        let mut next = 0usize;
        for i in 0..nvert {
            if redirect[i] == i {
                index[i] = next;
                vert[next] = vert[i];
                next += 1;
            } else {
                index[i] = usize::MAX;
            }
        }

        let remaining = nvert - repeated;
        for corner in face.iter_mut().flat_map(|f| f.iter_mut()) {
            let target = index[redirect[*corner as usize]];
            if target >= remaining {
                return Err(CompileError::internal(
                    name,
                    "face index out of range after vertex compaction",
                ));
            }
            *corner = u32::try_from(target)
                .map_err(|_| CompileError::internal(name, "vertex count exceeds index range"))?;
        }

        vert.truncate(remaining);
    }

    Ok(repeated)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn no_duplicates_is_identity() {
        let mut vert = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let mut face = [[0u32, 1, 2]];

        let removed = remove_repeated("t", &mut vert, &mut face).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(vert.len(), 3);
        assert_eq!(face[0], [0, 1, 2]);
    }

    #[test]
    fn duplicates_collapse_and_faces_rewrite() {
        // two triangles sharing an edge, vertices fully unrolled
        let mut vert = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let mut face = [[0u32, 1, 2], [3, 4, 5]];

        let removed = remove_repeated("t", &mut vert, &mut face).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(vert.len(), 4);
        // survivors keep their original order
        assert_eq!(vert[0], [0.0, 0.0, 0.0]);
        assert_eq!(vert[3], [1.0, 1.0, 0.0]);
        assert_eq!(face[0], [0, 1, 2]);
        assert_eq!(face[1], [1, 3, 2]);
    }

    #[test]
    fn long_chain_of_coincident_vertices() {
        let mut vert = vec![[2.5, -1.0, 0.25]; 64];
        vert.push([0.0, 0.0, 0.0]);
        let mut face: [[u32; 3]; 1] = [[7, 31, 64]];

        let removed = remove_repeated("t", &mut vert, &mut face).unwrap();
        assert_eq!(removed, 63);
        assert_eq!(vert.len(), 2);
        assert_eq!(face[0], [0, 0, 1]);
    }

    #[test]
    fn near_but_not_equal_vertices_survive() {
        let mut vert = vec![[0.0, 0.0, 0.0], [1e-7, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let mut face = [[0u32, 1, 2]];

        let removed = remove_repeated("t", &mut vert, &mut face).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(vert.len(), 3);
    }

    #[test]
    fn idempotent() {
        let mut vert = vec![
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let mut face = [[1u32, 2, 3]];
        remove_repeated("t", &mut vert, &mut face).unwrap();

        let before_vert = vert.clone();
        let before_face = face;
        let removed = remove_repeated("t", &mut vert, &mut face).unwrap();
        assert_eq!(removed, 0);
        assert_eq!(vert, before_vert);
        assert_eq!(face, before_face);
    }
}
