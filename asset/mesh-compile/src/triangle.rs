//! Triangle primitive shared by edge synthesis, normal synthesis, and
//! the mass-properties engine.

use nalgebra::Vector3;

use crate::MINVAL;

/// Area, centroid, and unit normal of one triangle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TriangleProps {
    /// Triangle area. Zero for degenerate triangles.
    pub area: f64,
    /// Centroid of the three vertices.
    pub center: Vector3<f64>,
    /// Unit normal by the right-hand rule, or zero when degenerate.
    pub normal: Vector3<f64>,
}

/// Widen a stored vertex to the computation precision.
#[inline]
pub(crate) fn vec3(v: [f32; 3]) -> Vector3<f64> {
    Vector3::new(f64::from(v[0]), f64::from(v[1]), f64::from(v[2]))
}

/// Compute area, centroid, and unit normal of the triangle `(a, b, c)`.
///
/// Faces whose cross product has length below [`MINVAL`] report zero
/// area and a zero normal; they contribute nothing downstream.
pub(crate) fn triangle_props(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> TriangleProps {
    let a = vec3(a);
    let b = vec3(b);
    let c = vec3(c);

    let center = (a + b + c) / 3.0;
    let normal = (b - a).cross(&(c - a));
    let len = normal.norm();

    if len < MINVAL {
        return TriangleProps {
            area: 0.0,
            center,
            normal: Vector3::zeros(),
        };
    }

    TriangleProps {
        area: len / 2.0,
        center,
        normal: normal / len,
    }
}
