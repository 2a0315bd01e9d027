//! SKN binary reader.
//!
//! Layout: little-endian `i32` header `{nvert, ntexcoord, nface, nbone}`,
//! then `f32 vert[3*nvert]`, `f32 texcoord[2*ntexcoord]`,
//! `i32 face[3*nface]`, then per bone: a 40-byte null-padded name,
//! `f32 bindpos[3]`, `f32 bindquat[4]`, `i32 vcount`, `i32 vertid[vcount]`,
//! `f32 vertweight[vcount]`. The total size must match exactly.

use mesh_compile::{read_file, CompileConfig, FileReadError, Vfs};

use crate::error::{SkinError, SkinResult};
use crate::skin::Skin;

/// Cursor over the 4-byte words of an SKN buffer.
struct Words<'a> {
    buffer: &'a [u8],
    /// Next word index, counted from the start of the buffer.
    cursor: usize,
}

impl<'a> Words<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Words left in the buffer.
    fn remaining(&self) -> usize {
        self.buffer.len() / 4 - self.cursor
    }

    fn read_i32(&mut self) -> i32 {
        let base = 4 * self.cursor;
        self.cursor += 1;
        i32::from_le_bytes([
            self.buffer[base],
            self.buffer[base + 1],
            self.buffer[base + 2],
            self.buffer[base + 3],
        ])
    }

    fn read_f32(&mut self) -> f32 {
        let base = 4 * self.cursor;
        self.cursor += 1;
        f32::from_le_bytes([
            self.buffer[base],
            self.buffer[base + 1],
            self.buffer[base + 2],
            self.buffer[base + 3],
        ])
    }

    /// Read a 40-byte null-padded name (10 words, 39 usable bytes).
    fn read_name(&mut self) -> String {
        let base = 4 * self.cursor;
        self.cursor += 10;
        let raw = &self.buffer[base..base + 39];
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        String::from_utf8_lossy(&raw[..end]).to_string()
    }
}

/// Load an SKN binary file into `skin`.
#[allow(clippy::cast_sign_loss)]
// Sign loss: header counts are rejected when negative before use
pub(crate) fn load_skn(
    skin: &mut Skin,
    file: &str,
    vfs: Option<&Vfs>,
    config: &CompileConfig,
) -> SkinResult<()> {
    let path = config.resolve_path(file);
    let path_text = path.to_string_lossy().to_string();
    let buffer = read_file(&path, vfs).map_err(|e| match e {
        FileReadError::NotFound => SkinError::FileNotFound {
            skin: skin.name().to_string(),
            path: path.clone(),
        },
        FileReadError::Empty => SkinError::EmptyFile {
            skin: skin.name().to_string(),
            path: path.clone(),
        },
    })?;
    let buffer: &[u8] = &buffer;

    if buffer.len() < 16 {
        return Err(SkinError::format_invalid(
            skin.name(),
            &path_text,
            "missing header",
        ));
    }

    let mut words = Words::new(buffer);
    let nvert = words.read_i32();
    let ntexcoord = words.read_i32();
    let nface = words.read_i32();
    let nbone = words.read_i32();

    if nvert < 0 || ntexcoord < 0 || nface < 0 || nbone < 0 {
        return Err(SkinError::format_invalid(
            skin.name(),
            &path_text,
            "negative size in header",
        ));
    }

    let nvert = nvert as usize;
    let ntexcoord = ntexcoord as usize;
    let nface = nface as usize;
    let nbone = nbone as usize;

    if buffer.len() < 16 + 12 * nvert + 8 * ntexcoord + 12 * nface {
        return Err(SkinError::format_invalid(
            skin.name(),
            &path_text,
            "insufficient data",
        ));
    }

    skin.vert = (0..3 * nvert).map(|_| words.read_f32()).collect();
    skin.texcoord = (0..2 * ntexcoord).map(|_| words.read_f32()).collect();
    for _ in 0..3 * nface {
        let index = words.read_i32();
        let index = u32::try_from(index).map_err(|_| SkinError::IndexOutOfRange {
            skin: skin.name().to_string(),
            index: i64::from(index),
            nvert,
        })?;
        skin.face.push(index);
    }

    for bone in 0..nbone {
        // name, bind pose, and count take 18 words
        if words.remaining() < 18 {
            return Err(SkinError::format_invalid(
                skin.name(),
                &path_text,
                format!("insufficient data for bone {bone}"),
            ));
        }

        skin.bodyname.push(words.read_name());
        for _ in 0..3 {
            skin.bindpos.push(words.read_f32());
        }
        for _ in 0..4 {
            skin.bindquat.push(words.read_f32());
        }

        let vcount = words.read_i32();
        if vcount < 1 {
            return Err(SkinError::format_invalid(
                skin.name(),
                &path_text,
                format!("vertex count must be positive for bone {bone}"),
            ));
        }
        let vcount = vcount as usize;

        if words.remaining() < 2 * vcount {
            return Err(SkinError::format_invalid(
                skin.name(),
                &path_text,
                format!("insufficient vertex data for bone {bone}"),
            ));
        }

        let mut ids = Vec::with_capacity(vcount);
        for _ in 0..vcount {
            let id = words.read_i32();
            let id = u32::try_from(id).map_err(|_| SkinError::IndexOutOfRange {
                skin: skin.name().to_string(),
                index: i64::from(id),
                nvert,
            })?;
            ids.push(id);
        }
        skin.vertid.push(ids);

        let weights = (0..vcount).map(|_| words.read_f32()).collect();
        skin.vertweight.push(weights);
    }

    // nothing may trail the last bone
    if buffer.len() != 4 * words.cursor {
        return Err(SkinError::format_invalid(
            skin.name(),
            &path_text,
            "unexpected buffer size",
        ));
    }

    Ok(())
}
