use glam::{IVec3, UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::classifier::is_inside_triangles;
use crate::constants::{DOMAIN_MAX, DOMAIN_MIN};
use crate::grid::GridDims;
use crate::mesh::{Aabb, SolidShape, Triangle};

/// World-space box mapped onto a lattice grid. Cell `(i,j,k)` covers
/// `min + [i, i+1) * (max - min) / size` on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldDomain {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Default for WorldDomain {
    fn default() -> Self {
        Self {
            min: DOMAIN_MIN,
            max: DOMAIN_MAX,
        }
    }
}

impl WorldDomain {
    pub fn min(&self) -> Vec3 {
        Vec3::from_array(self.min)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::from_array(self.max)
    }

    pub fn extent(&self) -> Vec3 {
        self.max() - self.min()
    }

    /// Grid cells per world unit on each axis.
    pub fn scale(&self, dims: GridDims) -> Vec3 {
        dims.as_uvec3().as_vec3() / self.extent()
    }

    /// World position of the centre of cell `c`.
    pub fn cell_center(&self, dims: GridDims, c: UVec3) -> Vec3 {
        (c.as_vec3() + Vec3::splat(0.5)) / self.scale(dims) + self.min()
    }

    /// Unclamped grid coordinate containing world point `p`.
    pub fn world_to_grid(&self, dims: GridDims, p: Vec3) -> IVec3 {
        ((p - self.min()) * self.scale(dims)).floor().as_ivec3()
    }
}

/// Per-cell solid flags, `1` = solid. Shares the grid's linear indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolidMask {
    dims: GridDims,
    cells: Vec<u32>,
}

impl SolidMask {
    /// All-fluid mask.
    pub fn empty(dims: GridDims) -> Self {
        Self {
            dims,
            cells: vec![0; dims.cells()],
        }
    }

    /// Wrap raw per-cell flags. `None` if the length does not match `dims`.
    pub fn from_cells(dims: GridDims, cells: Vec<u32>) -> Option<Self> {
        (cells.len() == dims.cells()).then_some(Self { dims, cells })
    }

    /// Rasterize a world-space box: corners floored to grid coordinates,
    /// clamped into the grid, filled inclusively. A box entirely outside the
    /// domain marks nothing.
    pub fn from_aabb(dims: GridDims, domain: &WorldDomain, aabb: Aabb) -> Self {
        let mut mask = Self::empty(dims);
        let lo = domain.world_to_grid(dims, aabb.min);
        let hi = domain.world_to_grid(dims, aabb.max);
        let size = dims.as_uvec3().as_ivec3();
        if hi.cmplt(IVec3::ZERO).any() || lo.cmpge(size).any() {
            log::warn!("SolidMask: AABB {:?} lies outside the domain", aabb);
            return mask;
        }
        let lo = lo.max(IVec3::ZERO);
        let hi = hi.min(size - IVec3::ONE);
        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    mask.set(x as u32, y as u32, z as u32, true);
                }
            }
        }
        log::info!(
            "SolidMask: AABB -> grid [{}-{}, {}-{}, {}-{}]",
            lo.x,
            hi.x,
            lo.y,
            hi.y,
            lo.z,
            hi.z
        );
        mask
    }

    /// Rasterize world-space triangles: every cell centre inside the surface
    /// is solid. Centres outside the triangles' bounding box are rejected
    /// before ray casting.
    pub fn from_triangles(dims: GridDims, domain: &WorldDomain, triangles: &[Triangle]) -> Self {
        Self::from_point_test(dims, triangles, |c| domain.cell_center(dims, c))
    }

    /// Rasterize a shape for a grid spanning normalized model space `[-1, 1]`:
    /// cell `(i,j,k)` samples `(i/sx*2-1, j/sy*2-1, k/sz*2-1)`.
    pub fn from_normalized_shape(dims: GridDims, shape: &SolidShape) -> Self {
        let size = dims.as_uvec3().as_vec3();
        let triangles = shape.world_triangles();
        Self::from_point_test(dims, &triangles, |c| c.as_vec3() / size * 2.0 - Vec3::ONE)
    }

    fn from_point_test(
        dims: GridDims,
        triangles: &[Triangle],
        sample: impl Fn(UVec3) -> Vec3,
    ) -> Self {
        let mut mask = Self::empty(dims);
        let Some(bounds) = Aabb::from_triangles(triangles) else {
            return mask;
        };
        for z in 0..dims.z {
            for y in 0..dims.y {
                for x in 0..dims.x {
                    let p = sample(UVec3::new(x, y, z));
                    if bounds.contains(p) && is_inside_triangles(p, triangles) {
                        mask.set(x, y, z, true);
                    }
                }
            }
        }
        log::info!(
            "SolidMask: {} of {} cells solid ({} triangles)",
            mask.solid_count(),
            dims.cells(),
            triangles.len()
        );
        mask
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn is_solid(&self, x: u32, y: u32, z: u32) -> bool {
        self.cells[self.dims.idx(x, y, z)] != 0
    }

    #[inline]
    pub fn is_solid_index(&self, index: usize) -> bool {
        self.cells.get(index).is_some_and(|&c| c != 0)
    }

    pub fn set(&mut self, x: u32, y: u32, z: u32, solid: bool) {
        let i = self.dims.idx(x, y, z);
        self.cells[i] = solid as u32;
    }

    pub fn solid_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    /// Linear indices of all solid cells.
    pub fn solid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, &c)| (c != 0).then_some(i))
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.cells
    }

    /// Number of `(y, z)` columns holding at least one solid cell: the
    /// obstacle's frontal area in cells for flow along x.
    pub fn frontal_area_x(&self) -> usize {
        let sx = self.dims.x as usize;
        self.cells
            .chunks_exact(sx)
            .filter(|row| row.iter().any(|&c| c != 0))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Mesh, ModelTransform};

    #[test]
    fn test_domain_cell_center() {
        let domain = WorldDomain::default();
        let dims = GridDims::new(8, 4, 4);
        // One world unit per cell.
        let c = domain.cell_center(dims, UVec3::new(0, 0, 0));
        assert!((c - Vec3::new(-3.5, -1.5, -1.5)).length() < 1e-6);
        let g = domain.world_to_grid(dims, Vec3::new(0.2, 0.0, -0.1));
        assert_eq!(g, IVec3::new(4, 2, 1));
    }

    #[test]
    fn test_aabb_mask_mapping() {
        let domain = WorldDomain::default();
        let dims = GridDims::new(16, 8, 8);
        // scale = 2 cells per unit; [-0.5, 0.5] -> [7, 9] on x, [3, 5] on y/z.
        let aabb = Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));
        let mask = SolidMask::from_aabb(dims, &domain, aabb);
        assert_eq!(mask.solid_count(), 27);
        assert!(mask.is_solid(7, 3, 3));
        assert!(mask.is_solid(9, 5, 5));
        assert!(!mask.is_solid(6, 4, 4));
        assert!(!mask.is_solid(10, 4, 4));
    }

    #[test]
    fn test_aabb_clamped_to_grid() {
        let domain = WorldDomain::default();
        let dims = GridDims::new(8, 4, 4);
        let aabb = Aabb::new(Vec3::new(3.5, -10.0, -10.0), Vec3::new(10.0, 10.0, 10.0));
        let mask = SolidMask::from_aabb(dims, &domain, aabb);
        // x = 7 only, full y/z.
        assert_eq!(mask.solid_count(), 16);
        assert!(mask.is_solid(7, 0, 3));
    }

    #[test]
    fn test_aabb_outside_domain_marks_nothing() {
        let domain = WorldDomain::default();
        let mask = SolidMask::from_aabb(
            GridDims::new(8, 4, 4),
            &domain,
            Aabb::new(Vec3::splat(5.0), Vec3::splat(6.0)),
        );
        assert_eq!(mask.solid_count(), 0);
    }

    #[test]
    fn test_mesh_mask_matches_aabb_for_box() {
        let domain = WorldDomain::default();
        let dims = GridDims::new(16, 8, 8);
        // Box boundaries sit between cell centres so both rasterizations agree.
        // Centres at +-0.25 and +-0.75 fall inside, +-1.25 outside.
        let shape = SolidShape::new(Mesh::cuboid(Vec3::ONE), ModelTransform::default());
        let tris = shape.world_triangles();
        let mesh_mask = SolidMask::from_triangles(dims, &domain, &tris);
        let aabb_mask = SolidMask::from_aabb(
            dims,
            &domain,
            Aabb::new(Vec3::splat(-0.74), Vec3::splat(0.74)),
        );
        assert_eq!(mesh_mask.solid_count(), 64);
        assert_eq!(mesh_mask, aabb_mask);
    }

    #[test]
    fn test_normalized_shape_mask() {
        let dims = GridDims::cube(8);
        // Samples land on -1, -0.75, ..., 0.75; box half-extent 0.4 covers -0.25, 0, 0.25.
        let shape = SolidShape::new(Mesh::cuboid(Vec3::splat(0.4)), ModelTransform::default());
        let mask = SolidMask::from_normalized_shape(dims, &shape);
        assert_eq!(mask.solid_count(), 27);
        assert!(mask.is_solid(4, 4, 4));
        assert!(mask.is_solid(3, 5, 3));
        assert!(!mask.is_solid(2, 4, 4));
    }

    #[test]
    fn test_frontal_area_counts_columns() {
        let dims = GridDims::new(6, 4, 4);
        let mut mask = SolidMask::empty(dims);
        mask.set(1, 1, 1, true);
        mask.set(2, 1, 1, true);
        mask.set(4, 2, 3, true);
        assert_eq!(mask.frontal_area_x(), 2);
        assert_eq!(SolidMask::empty(dims).frontal_area_x(), 0);
    }

    #[test]
    fn test_from_cells_length_check() {
        let dims = GridDims::cube(3);
        assert!(SolidMask::from_cells(dims, vec![0; 27]).is_some());
        assert!(SolidMask::from_cells(dims, vec![0; 26]).is_none());
    }
}
