//! Point-in-solid classification by even-odd ray parity.

use glam::Vec3;

use crate::constants::{RAY_MIN_T, RAY_PARALLEL_EPSILON};
use crate::mesh::{Mesh, Triangle};

/// Fixed probe direction: +x with a small irrational-looking tilt so the ray
/// misses the shared edges and vertices of axis-aligned meshes.
pub const PROBE_DIRECTION: Vec3 = Vec3::new(1.0, 0.000_173_2, 0.000_271_8);

/// Möller–Trumbore ray/triangle test. Returns the hit distance `t` along
/// `dir`, or `None` for parallel rays, misses, and hits at or behind `origin`.
pub fn ray_triangle_intersection(origin: Vec3, dir: Vec3, tri: &Triangle) -> Option<f32> {
    let e1 = tri.v1 - tri.v0;
    let e2 = tri.v2 - tri.v0;
    let pvec = dir.cross(e2);
    let det = e1.dot(pvec);
    if det.abs() < RAY_PARALLEL_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = origin - tri.v0;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(e1);
    let v = dir.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(qvec) * inv_det;
    (t > RAY_MIN_T).then_some(t)
}

/// Number of triangles crossed by the ray `origin + t*dir`, `t > 0`.
pub fn count_crossings(origin: Vec3, dir: Vec3, triangles: &[Triangle]) -> usize {
    triangles
        .iter()
        .filter(|tri| !tri.is_degenerate())
        .filter(|tri| ray_triangle_intersection(origin, dir, tri).is_some())
        .count()
}

/// Parity test along an arbitrary direction.
pub fn is_inside_along(point: Vec3, dir: Vec3, triangles: &[Triangle]) -> bool {
    count_crossings(point, dir, triangles) % 2 == 1
}

/// Parity test against pre-resolved triangles along [`PROBE_DIRECTION`].
pub fn is_inside_triangles(point: Vec3, triangles: &[Triangle]) -> bool {
    is_inside_along(point, PROBE_DIRECTION, triangles)
}

/// Whether `point` lies inside the closed surface `mesh`.
///
/// Open meshes give an undefined (but deterministic) answer. Faces with
/// invalid indices are ignored.
pub fn is_inside(point: Vec3, mesh: &Mesh) -> bool {
    let crossings = mesh
        .faces
        .iter()
        .filter_map(|&f| mesh.face(f))
        .filter(|tri| !tri.is_degenerate())
        .filter(|tri| ray_triangle_intersection(point, PROBE_DIRECTION, tri).is_some())
        .count();
    crossings % 2 == 1
}
