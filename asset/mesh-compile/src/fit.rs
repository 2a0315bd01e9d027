//! Fitting primitive geoms to a compiled mesh.

use nalgebra::Vector3;

use crate::config::CompileConfig;
use crate::error::CompileResult;
use crate::mesh::{Mesh, MeshKind};
use crate::triangle::vec3;

/// Primitive shapes a mesh can be fitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitShape {
    /// Sphere: `size[0]` is the radius.
    Sphere,
    /// Capsule: `size[0]` radius, `size[1]` cylinder half-height.
    Capsule,
    /// Cylinder: `size[0]` radius, `size[1]` half-height.
    Cylinder,
    /// Ellipsoid: per-axis radii.
    Ellipsoid,
    /// Box: per-axis half-extents.
    Box,
}

/// A primitive geom being sized from a mesh.
#[derive(Debug, Clone)]
pub struct GeomFit {
    /// Shape to fit.
    pub shape: FitShape,
    /// Which mass-property interpretation the geom uses.
    pub kind: MeshKind,
    /// Rescale factor applied to the fitted size.
    pub fitscale: f64,
    /// Fitted size, written by [`Mesh::fit_geom`].
    pub size: [f64; 3],
}

impl GeomFit {
    /// A volume-based fit with unit scale.
    #[must_use]
    pub fn new(shape: FitShape) -> Self {
        Self {
            shape,
            kind: MeshKind::Volume,
            fitscale: 1.0,
            size: [0.0; 3],
        }
    }
}

impl Mesh {
    /// Size `geom` to match this mesh and return the position the geom
    /// should be placed at.
    ///
    /// With `config.fitaabb` unset the equivalent inertia box drives the
    /// fit; otherwise the axis-aligned bounding box in the principal
    /// frame does.
    ///
    /// # Errors
    ///
    /// Propagates validity errors from the inertia accessors.
    pub fn fit_geom(
        &self,
        geom: &mut GeomFit,
        config: &CompileConfig,
    ) -> CompileResult<Vector3<f64>> {
        let mut meshpos = self.pos(geom.kind);

        if config.fitaabb {
            let aabb = self.aabb();
            let center = aabb.center();
            meshpos += center;

            match geom.shape {
                FitShape::Sphere => {
                    let mut radius: f64 = 0.0;
                    for v in self.vert() {
                        radius = radius.max((vec3(*v) - center).norm());
                    }
                    geom.size[0] = radius;
                }
                FitShape::Capsule | FitShape::Cylinder => {
                    let mut radius: f64 = 0.0;
                    let mut half_height: f64 = 0.0;
                    for v in self.vert() {
                        let v = vec3(*v);
                        let horizontal = (v.xy() - center.xy()).norm();
                        radius = radius.max(horizontal);
                        half_height = half_height.max((v.z - center.z).abs());
                    }
                    geom.size[0] = radius;
                    geom.size[1] = half_height;

                    // the capsule's spherical caps absorb part of the
                    // height at each horizontal distance
                    if geom.shape == FitShape::Capsule {
                        let mut cylinder_half: f64 = 0.0;
                        for v in self.vert() {
                            let v = vec3(*v);
                            let horizontal = (v.xy() - center.xy()).norm();
                            let vertical = (v.z - center.z).abs();
                            let ratio = (horizontal / radius).clamp(-1.0, 1.0);
                            let cap = radius * (1.0 - ratio * ratio).sqrt();
                            cylinder_half = cylinder_half.max(vertical - cap);
                        }
                        geom.size[1] = cylinder_half;
                    }
                }
                FitShape::Ellipsoid | FitShape::Box => {
                    let extent = aabb.max - center;
                    geom.size = [extent.x, extent.y, extent.z];
                }
            }
        } else {
            let boxsz = self.inertia_box(geom.kind)?;
            match geom.shape {
                FitShape::Sphere => {
                    geom.size[0] = (boxsz.x + boxsz.y + boxsz.z) / 3.0;
                }
                FitShape::Capsule => {
                    let radius = (boxsz.x + boxsz.y) / 2.0;
                    geom.size[0] = radius;
                    geom.size[1] = (boxsz.z - radius / 2.0).max(0.0);
                }
                FitShape::Cylinder => {
                    geom.size[0] = (boxsz.x + boxsz.y) / 2.0;
                    geom.size[1] = boxsz.z;
                }
                FitShape::Ellipsoid | FitShape::Box => {
                    geom.size = [boxsz.x, boxsz.y, boxsz.z];
                }
            }
        }

        for s in &mut geom.size {
            *s *= geom.fitscale;
        }
        Ok(meshpos)
    }
}
