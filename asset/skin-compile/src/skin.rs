//! The skin type and its compiler.

use nalgebra::Quaternion;

use mesh_compile::{CompileConfig, Vfs, MINVAL};

use crate::error::{SkinError, SkinResult};
use crate::skn;

/// Scene-graph surface the skin compiler resolves names against.
pub trait ObjectLookup {
    /// Resolve a body name to its id.
    fn find_body(&self, name: &str) -> Option<usize>;

    /// Resolve a material name to its id.
    fn find_material(&self, name: &str) -> Option<usize>;
}

/// A compilable skinned mesh.
///
/// Populate either `file` or the data arrays, then call
/// [`Skin::compile`] once. After compilation every vertex's influence
/// weights sum to one and all bind quaternions are unit length.
#[derive(Debug, Clone, Default)]
pub struct Skin {
    name: String,

    /// Source file reference; resolved against the model directories.
    pub file: Option<String>,
    /// Material name; empty means no material.
    pub material: String,

    /// Vertex positions, `x y z` per vertex.
    pub vert: Vec<f32>,
    /// Texture coordinates, `u v` per vertex.
    pub texcoord: Vec<f32>,
    /// Triangle faces, three vertex indices per face.
    pub face: Vec<u32>,

    /// Per-bone body names.
    pub bodyname: Vec<String>,
    /// Per-bone bind translation, `x y z` per bone.
    pub bindpos: Vec<f32>,
    /// Per-bone bind rotation, `w x y z` per bone.
    pub bindquat: Vec<f32>,
    /// Per-bone influenced vertex ids.
    pub vertid: Vec<Vec<u32>>,
    /// Per-bone influence weights, parallel to `vertid`.
    pub vertweight: Vec<Vec<f32>>,

    bodyid: Vec<usize>,
    matid: Option<usize>,
}

impl Skin {
    /// Create an empty skin.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Skin name, used in error reporting.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved body ids, one per bone. Empty before compilation.
    #[must_use]
    pub fn bodyid(&self) -> &[usize] {
        &self.bodyid
    }

    /// Resolved material id, if a material was named.
    #[must_use]
    pub fn matid(&self) -> Option<usize> {
        self.matid
    }

    /// Compile the skin: load the file if any, validate sizes, resolve
    /// names, and normalize weights and bind quaternions.
    ///
    /// # Errors
    ///
    /// Returns a [`SkinError`] when data is missing or mis-sized, a
    /// referenced body or material is undefined, a vertex id is out of
    /// range, or a vertex has no positive total weight.
    pub fn compile(
        &mut self,
        vfs: Option<&Vfs>,
        config: &CompileConfig,
        objects: &dyn ObjectLookup,
    ) -> SkinResult<()> {
        if let Some(file) = self.file.clone() {
            // loading over caller-supplied data is an error
            if !self.vert.is_empty()
                || !self.texcoord.is_empty()
                || !self.face.is_empty()
                || !self.bodyname.is_empty()
                || !self.bindpos.is_empty()
                || !self.bindquat.is_empty()
                || !self.vertid.is_empty()
                || !self.vertweight.is_empty()
            {
                return Err(SkinError::RepeatedSpecification {
                    skin: self.name.clone(),
                    path: file,
                });
            }

            let ext = std::path::Path::new(&file)
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if ext != "skn" {
                return Err(SkinError::UnknownFormat {
                    skin: self.name.clone(),
                    path: file,
                });
            }
            skn::load_skn(self, &file, vfs, config)?;
        }

        if self.vert.is_empty()
            || self.face.is_empty()
            || self.bodyname.is_empty()
            || self.bindpos.is_empty()
            || self.bindquat.is_empty()
            || self.vertid.is_empty()
            || self.vertweight.is_empty()
        {
            return Err(SkinError::MissingData {
                skin: self.name.clone(),
            });
        }

        // mesh sizes
        if self.vert.len() % 3 != 0 {
            return Err(SkinError::size_mismatch(
                &self.name,
                "vertex data must be a multiple of 3",
            ));
        }
        let nvert = self.vert.len() / 3;
        if !self.texcoord.is_empty() && self.texcoord.len() != 2 * nvert {
            return Err(SkinError::size_mismatch(
                &self.name,
                "vertex and texcoord data have incompatible sizes",
            ));
        }
        if self.face.len() % 3 != 0 {
            return Err(SkinError::size_mismatch(
                &self.name,
                "face data must be a multiple of 3",
            ));
        }

        // bone sizes
        let nbone = self.bodyname.len();
        if self.bindpos.len() != 3 * nbone {
            return Err(SkinError::size_mismatch(&self.name, "unexpected bindpos size"));
        }
        if self.bindquat.len() != 4 * nbone {
            return Err(SkinError::size_mismatch(&self.name, "unexpected bindquat size"));
        }
        if self.vertid.len() != nbone {
            return Err(SkinError::size_mismatch(&self.name, "unexpected vertid size"));
        }
        if self.vertweight.len() != nbone {
            return Err(SkinError::size_mismatch(
                &self.name,
                "unexpected vertweight size",
            ));
        }

        // resolve body names
        self.bodyid = self
            .bodyname
            .iter()
            .map(|name| {
                objects.find_body(name).ok_or_else(|| SkinError::UnknownReference {
                    skin: self.name.clone(),
                    kind: "body",
                    name: name.clone(),
                })
            })
            .collect::<SkinResult<_>>()?;

        // resolve material name; empty means none
        self.matid = match objects.find_material(&self.material) {
            Some(id) => Some(id),
            None if self.material.is_empty() => None,
            None => {
                return Err(SkinError::UnknownReference {
                    skin: self.name.clone(),
                    kind: "material",
                    name: self.material.clone(),
                })
            }
        };

        // accumulate per-vertex weight totals across all bones
        let mut totals = vec![0.0f32; nvert];
        for bone in 0..nbone {
            let influenced = self.vertid[bone].len();
            if influenced == 0 || self.vertweight[bone].len() != influenced {
                return Err(SkinError::size_mismatch(
                    &self.name,
                    "vertid and vertweight must have the same non-zero size",
                ));
            }
            for (slot, &id) in self.vertid[bone].iter().enumerate() {
                let id = id as usize;
                if id >= nvert {
                    return Err(SkinError::IndexOutOfRange {
                        skin: self.name.clone(),
                        index: i64::try_from(id).unwrap_or(i64::MAX),
                        nvert,
                    });
                }
                totals[id] += self.vertweight[bone][slot];
            }
        }

        // every vertex must be covered
        for (index, &total) in totals.iter().enumerate() {
            if f64::from(total) <= MINVAL {
                return Err(SkinError::UncoveredVertex {
                    skin: self.name.clone(),
                    index,
                });
            }
        }

        // normalize weights so each vertex's influences sum to one
        for bone in 0..nbone {
            for slot in 0..self.vertid[bone].len() {
                let id = self.vertid[bone][slot] as usize;
                self.vertweight[bone][slot] /= totals[id];
            }
        }

        // normalize bind quaternions
        for bone in 0..nbone {
            let base = 4 * bone;
            let quat = Quaternion::new(
                f64::from(self.bindquat[base]),
                f64::from(self.bindquat[base + 1]),
                f64::from(self.bindquat[base + 2]),
                f64::from(self.bindquat[base + 3]),
            );
            let unit = nalgebra::UnitQuaternion::try_new(quat, MINVAL)
                .unwrap_or_else(nalgebra::UnitQuaternion::identity);
            #[allow(clippy::cast_possible_truncation)]
            {
                self.bindquat[base] = unit.w as f32;
                self.bindquat[base + 1] = unit.i as f32;
                self.bindquat[base + 2] = unit.j as f32;
                self.bindquat[base + 3] = unit.k as f32;
            }
        }

        Ok(())
    }
}
