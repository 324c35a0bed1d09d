use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// One triangle in world (or model) space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
}

impl Triangle {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Zero-area triangles never produce a hit.
    pub fn is_degenerate(&self) -> bool {
        (self.v1 - self.v0).cross(self.v2 - self.v0).length_squared() == 0.0
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Tight bounds of a point set. `None` for an empty set.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let (min, max) = iter.fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        Some(Self { min, max })
    }

    pub fn from_triangles(triangles: &[Triangle]) -> Option<Self> {
        Self::from_points(triangles.iter().flat_map(|t| [&t.v0, &t.v1, &t.v2]))
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// Placement of a model-space mesh in world space:
/// `world = rot_y(yaw) * (v * scale) + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelTransform {
    pub scale: f32,
    pub offset: [f32; 3],
    /// Rotation about +y in radians.
    pub yaw: f32,
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: [0.0; 3],
            yaw: 0.0,
        }
    }
}

impl ModelTransform {
    pub fn apply(&self, v: Vec3) -> Vec3 {
        Quat::from_rotation_y(self.yaw) * (v * self.scale) + Vec3::from_array(self.offset)
    }
}

/// Indexed triangle mesh. Face indices are 1-based.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vec3>, faces: Vec<[u32; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Resolve a face to its three vertices. `None` if any index is zero or
    /// past the end of the vertex list.
    pub fn face(&self, face: [u32; 3]) -> Option<Triangle> {
        let get = |i: u32| -> Option<Vec3> {
            let i = (i as usize).checked_sub(1)?;
            self.vertices.get(i).copied()
        };
        Some(Triangle::new(get(face[0])?, get(face[1])?, get(face[2])?))
    }

    /// All well-formed faces as model-space triangles.
    pub fn triangles(&self) -> Vec<Triangle> {
        let tris: Vec<Triangle> = self.faces.iter().filter_map(|&f| self.face(f)).collect();
        let skipped = self.faces.len() - tris.len();
        if skipped > 0 {
            log::warn!("Mesh: skipped {} faces with out-of-range indices", skipped);
        }
        tris
    }

    /// Closed axis-aligned box spanning `[-h, h]` on each axis.
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents;
        let vertices = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        let faces = vec![
            // -z
            [1, 3, 2],
            [1, 4, 3],
            // +z
            [5, 6, 7],
            [5, 7, 8],
            // -y
            [1, 2, 6],
            [1, 6, 5],
            // +y
            [4, 8, 7],
            [4, 7, 3],
            // -x
            [1, 5, 8],
            [1, 8, 4],
            // +x
            [2, 3, 7],
            [2, 7, 6],
        ];
        Self { vertices, faces }
    }
}

/// A mesh together with its world placement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolidShape {
    pub mesh: Mesh,
    pub transform: ModelTransform,
}

impl SolidShape {
    pub fn new(mesh: Mesh, transform: ModelTransform) -> Self {
        Self { mesh, transform }
    }

    /// Triangles in model space, ignoring the transform.
    pub fn model_triangles(&self) -> Vec<Triangle> {
        self.mesh.triangles()
    }

    /// Triangles after applying the transform.
    pub fn world_triangles(&self) -> Vec<Triangle> {
        let t = &self.transform;
        self.mesh
            .triangles()
            .into_iter()
            .map(|tri| Triangle::new(t.apply(tri.v0), t.apply(tri.v1), t.apply(tri.v2)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_faces_skipped() {
        let mesh = Mesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![[1, 2, 3], [0, 1, 2], [1, 2, 4]],
        );
        let tris = mesh.triangles();
        assert_eq!(tris.len(), 1);
        assert_eq!(tris[0].v1, Vec3::X);
    }

    #[test]
    fn test_cuboid_has_twelve_faces() {
        let mesh = Mesh::cuboid(Vec3::splat(0.5));
        assert_eq!(mesh.triangles().len(), 12);
        let bounds = Aabb::from_points(&mesh.vertices).unwrap();
        assert_eq!(bounds.min, Vec3::splat(-0.5));
        assert_eq!(bounds.max, Vec3::splat(0.5));
    }

    #[test]
    fn test_transform_scale_offset_yaw() {
        let t = ModelTransform {
            scale: 2.0,
            offset: [1.0, 0.0, 0.0],
            yaw: std::f32::consts::FRAC_PI_2,
        };
        // +x rotated a quarter turn about +y lands on -z.
        let p = t.apply(Vec3::X);
        assert!((p - Vec3::new(1.0, 0.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn test_degenerate_triangle() {
        let t = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::X * 2.0);
        assert!(t.is_degenerate());
    }

    #[test]
    fn test_aabb_new_orders_corners() {
        let b = Aabb::new(Vec3::ONE, -Vec3::ONE);
        assert_eq!(b.min, -Vec3::ONE);
        assert!(b.contains(Vec3::ZERO));
        assert!(b.contains(Vec3::ONE));
        assert!(!b.contains(Vec3::new(1.1, 0.0, 0.0)));
    }
}
