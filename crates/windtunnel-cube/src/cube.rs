use glam::Vec3;

use windtunnel_core::config::CubeConfig;
use windtunnel_core::error::SimError;
use windtunnel_core::field::{FieldSnapshot, FlowField};
use windtunnel_core::grid::GridDims;
use windtunnel_core::mesh::SolidShape;
use windtunnel_core::solid::SolidMask;

use crate::boundary::Boundary;
use crate::stages::{advect, diffuse, project};

/// Smallest axis length with a non-empty interior.
pub const MIN_CUBE_AXIS: u32 = 3;

fn alloc_field(what: &'static str, cells: usize) -> Result<Vec<f32>, SimError> {
    let mut field = Vec::new();
    field
        .try_reserve_exact(cells)
        .map_err(|_| SimError::AllocationFailed { what, cells })?;
    field.resize(cells, 0.0);
    Ok(field)
}

/// Sequential stable-fluids Navier–Stokes solver on a fixed box grid.
pub struct FluidCube {
    dims: GridDims,
    diffusion: f32,
    viscosity: f32,
    dt: f32,
    iterations: u32,

    density: Vec<f32>,
    density_prev: Vec<f32>,
    pressure: Vec<f32>,
    divergence: Vec<f32>,

    vx: Vec<f32>,
    vy: Vec<f32>,
    vz: Vec<f32>,
    vx0: Vec<f32>,
    vy0: Vec<f32>,
    vz0: Vec<f32>,

    solid: Option<SolidMask>,
    step_count: u64,
}

impl FluidCube {
    /// Allocate every field up front. `solid` is rasterized once into a mask.
    pub fn new(config: &CubeConfig, solid: Option<&SolidShape>) -> Result<Self, SimError> {
        let dims = config.dims.validate(MIN_CUBE_AXIS)?;
        let cells = dims.cells();

        let cube = Self {
            dims,
            diffusion: config.diffusion,
            viscosity: config.viscosity,
            dt: config.dt,
            iterations: config.iterations,
            density: alloc_field("density", cells)?,
            density_prev: alloc_field("density_prev", cells)?,
            pressure: alloc_field("pressure", cells)?,
            divergence: alloc_field("divergence", cells)?,
            vx: alloc_field("vx", cells)?,
            vy: alloc_field("vy", cells)?,
            vz: alloc_field("vz", cells)?,
            vx0: alloc_field("vx0", cells)?,
            vy0: alloc_field("vy0", cells)?,
            vz0: alloc_field("vz0", cells)?,
            solid: solid.map(|shape| SolidMask::from_normalized_shape(dims, shape)),
            step_count: 0,
        };

        log::info!(
            "FluidCube: {}x{}x{} ({} cells), diffusion={}, viscosity={}, dt={}, solid={}",
            dims.x,
            dims.y,
            dims.z,
            cells,
            cube.diffusion,
            cube.viscosity,
            cube.dt,
            cube.solid.as_ref().map_or(0, SolidMask::solid_count),
        );
        Ok(cube)
    }

    fn index_of(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        self.dims
            .contains(x as i64, y as i64, z as i64)
            .then(|| self.dims.idx(x as u32, y as u32, z as u32))
    }

    /// Add `amount` to the density at `(x, y, z)`. Out-of-range cells are ignored.
    pub fn add_density(&mut self, x: i32, y: i32, z: i32, amount: f32) {
        match self.index_of(x, y, z) {
            Some(i) => self.density[i] += amount,
            None => log::warn!("FluidCube: add_density ignored at ({x}, {y}, {z})"),
        }
    }

    /// Add `(dx, dy, dz)` to the velocity at `(x, y, z)`. Out-of-range cells are ignored.
    pub fn add_velocity(&mut self, x: i32, y: i32, z: i32, dx: f32, dy: f32, dz: f32) {
        match self.index_of(x, y, z) {
            Some(i) => {
                self.vx[i] += dx;
                self.vy[i] += dy;
                self.vz[i] += dz;
            }
            None => log::warn!("FluidCube: add_velocity ignored at ({x}, {y}, {z})"),
        }
    }

    /// Advance one timestep: diffuse, project, advect and project velocity,
    /// then diffuse and advect density.
    pub fn step(&mut self) {
        let dims = self.dims;
        let iter = self.iterations;
        let dt = self.dt;
        let solid = self.solid.as_ref();

        diffuse(
            dims,
            Boundary::VelocityX,
            &mut self.vx0,
            &self.vx,
            self.viscosity,
            dt,
            iter,
            solid,
        );
        diffuse(
            dims,
            Boundary::VelocityY,
            &mut self.vy0,
            &self.vy,
            self.viscosity,
            dt,
            iter,
            solid,
        );
        diffuse(
            dims,
            Boundary::VelocityZ,
            &mut self.vz0,
            &self.vz,
            self.viscosity,
            dt,
            iter,
            solid,
        );

        project(
            dims,
            &mut self.vx0,
            &mut self.vy0,
            &mut self.vz0,
            &mut self.pressure,
            &mut self.divergence,
            iter,
            solid,
        );

        advect(
            dims,
            Boundary::VelocityX,
            &mut self.vx,
            &self.vx0,
            &self.vx0,
            &self.vy0,
            &self.vz0,
            dt,
            solid,
        );
        advect(
            dims,
            Boundary::VelocityY,
            &mut self.vy,
            &self.vy0,
            &self.vx0,
            &self.vy0,
            &self.vz0,
            dt,
            solid,
        );
        advect(
            dims,
            Boundary::VelocityZ,
            &mut self.vz,
            &self.vz0,
            &self.vx0,
            &self.vy0,
            &self.vz0,
            dt,
            solid,
        );

        project(
            dims,
            &mut self.vx,
            &mut self.vy,
            &mut self.vz,
            &mut self.pressure,
            &mut self.divergence,
            iter,
            solid,
        );

        diffuse(
            dims,
            Boundary::Scalar,
            &mut self.density_prev,
            &self.density,
            self.diffusion,
            dt,
            iter,
            solid,
        );
        advect(
            dims,
            Boundary::Scalar,
            &mut self.density,
            &self.density_prev,
            &self.vx,
            &self.vy,
            &self.vz,
            dt,
            solid,
        );

        self.step_count += 1;
        log::debug!("FluidCube: step {}", self.step_count);
    }

    /// Replace the obstacle. `None` removes it.
    pub fn set_solid_shape(&mut self, shape: Option<&SolidShape>) {
        self.solid = shape.map(|s| SolidMask::from_normalized_shape(self.dims, s));
    }

    pub fn solid_mask(&self) -> Option<&SolidMask> {
        self.solid.as_ref()
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn density(&self) -> &[f32] {
        &self.density
    }

    /// Velocity component slices `(vx, vy, vz)`.
    pub fn velocity(&self) -> (&[f32], &[f32], &[f32]) {
        (&self.vx, &self.vy, &self.vz)
    }

    pub fn velocity_at(&self, x: u32, y: u32, z: u32) -> Vec3 {
        let i = self.dims.idx(x, y, z);
        Vec3::new(self.vx[i], self.vy[i], self.vz[i])
    }

    /// Sum of density over interior cells.
    pub fn total_density(&self) -> f32 {
        let d = self.dims;
        let mut total = 0.0;
        for k in 1..d.z - 1 {
            for j in 1..d.y - 1 {
                for i in 1..d.x - 1 {
                    total += self.density[d.idx(i, j, k)];
                }
            }
        }
        total
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Zero every field. The solid mask is kept.
    pub fn reset(&mut self) {
        for field in [
            &mut self.density,
            &mut self.density_prev,
            &mut self.pressure,
            &mut self.divergence,
            &mut self.vx,
            &mut self.vy,
            &mut self.vz,
            &mut self.vx0,
            &mut self.vy0,
            &mut self.vz0,
        ] {
            field.fill(0.0);
        }
        self.step_count = 0;
    }
}

impl FlowField for FluidCube {
    fn name(&self) -> &'static str {
        "navier-stokes"
    }

    fn dims(&self) -> GridDims {
        self.dims
    }

    fn advance(&mut self) -> Result<(), SimError> {
        self.step();
        Ok(())
    }

    fn snapshot(&mut self) -> Result<FieldSnapshot, SimError> {
        let cells = (0..self.dims.cells())
            .map(|i| [self.vx[i], self.vy[i], self.vz[i], self.density[i]])
            .collect();
        FieldSnapshot::new(self.dims, cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use windtunnel_core::mesh::{Mesh, ModelTransform};

    fn config(n: u32, diffusion: f32, viscosity: f32, dt: f32) -> CubeConfig {
        CubeConfig {
            dims: GridDims::cube(n),
            diffusion,
            viscosity,
            dt,
            ..CubeConfig::default()
        }
    }

    #[test]
    fn test_rejects_tiny_grid() {
        let cfg = CubeConfig {
            dims: GridDims::new(8, 2, 8),
            ..CubeConfig::default()
        };
        assert!(matches!(
            FluidCube::new(&cfg, None),
            Err(SimError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_out_of_range_sources_ignored() {
        let mut cube = FluidCube::new(&config(4, 0.0, 0.0, 0.1), None).unwrap();
        cube.add_density(-1, 0, 0, 5.0);
        cube.add_density(4, 0, 0, 5.0);
        cube.add_velocity(0, 0, 9, 1.0, 1.0, 1.0);
        assert!(cube.density().iter().all(|&d| d == 0.0));
        assert!(cube.velocity().0.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_density_conserved_without_diffusion() {
        let mut cube = FluidCube::new(&config(8, 0.0, 0.0, 0.1), None).unwrap();
        cube.add_density(3, 3, 3, 10.0);
        cube.add_density(4, 5, 2, 7.5);
        cube.add_density(6, 1, 4, 2.5);
        let before = cube.total_density();
        cube.step();
        let after = cube.total_density();
        assert!((after - before).abs() < 1e-3 * before, "{before} -> {after}");
    }

    #[test]
    fn test_boundary_parity_after_step() {
        let mut cube = FluidCube::new(&config(8, 0.0001, 0.0001, 0.1), None).unwrap();
        for i in 2..6 {
            cube.add_velocity(i, 4, 4, 1.0, 0.5, -0.25);
            cube.add_velocity(1, i, 3, 2.0, -1.0, 0.75);
            cube.add_density(i, 1, i, 3.0);
        }
        cube.step();

        let d = cube.dims();
        let (vx, vy, vz) = cube.velocity();
        let density = cube.density();
        for a in 1..d.x - 1 {
            for b in 1..d.y - 1 {
                let last = d.x - 1;
                assert_eq!(vx[d.idx(0, a, b)], -vx[d.idx(1, a, b)]);
                assert_eq!(vx[d.idx(last, a, b)], -vx[d.idx(last - 1, a, b)]);
                assert_eq!(vy[d.idx(a, 0, b)], -vy[d.idx(a, 1, b)]);
                assert_eq!(vz[d.idx(a, b, 0)], -vz[d.idx(a, b, 1)]);
                // Tangential components and scalars copy.
                assert_eq!(vy[d.idx(0, a, b)], vy[d.idx(1, a, b)]);
                assert_eq!(density[d.idx(0, a, b)], density[d.idx(1, a, b)]);
                assert_eq!(density[d.idx(a, b, last)], density[d.idx(a, b, last - 1)]);
            }
        }
    }

    #[test]
    fn test_single_source_diffuses_to_neighbours() {
        let mut cube = FluidCube::new(&config(8, 0.001, 0.0, 0.001), None).unwrap();
        cube.add_density(4, 4, 4, 100.0);
        cube.step();

        let d = cube.dims();
        let density = cube.density();
        assert!(density[d.idx(3, 4, 4)] > 0.0);
        assert!(density[d.idx(5, 4, 4)] > 0.0);
        let total = cube.total_density();
        assert!((total - 100.0).abs() < 1.0, "total density {total}");
    }

    #[test]
    fn test_solid_cells_stay_empty() {
        let shape = SolidShape::new(Mesh::cuboid(Vec3::splat(0.3)), ModelTransform::default());
        let mut cube = FluidCube::new(&config(8, 0.01, 0.001, 0.1), Some(&shape)).unwrap();
        let mask = cube.solid_mask().unwrap().clone();
        assert!(mask.is_solid(4, 4, 4));

        // Push dense fluid straight at the obstacle.
        for j in 2..6 {
            for k in 2..6 {
                cube.add_density(2, j, k, 10.0);
                cube.add_velocity(2, j, k, 5.0, 0.0, 0.0);
            }
        }
        for _ in 0..3 {
            cube.step();
        }
        let (vx, vy, vz) = cube.velocity();
        for i in mask.solid_indices() {
            assert_eq!(cube.density()[i], 0.0);
            assert_eq!(vx[i], 0.0);
            assert_eq!(vy[i], 0.0);
            assert_eq!(vz[i], 0.0);
        }
    }

    #[test]
    fn test_reset_and_snapshot() {
        let mut cube = FluidCube::new(&config(5, 0.0, 0.0, 0.1), None).unwrap();
        cube.add_density(2, 2, 2, 4.0);
        cube.add_velocity(2, 2, 2, 1.0, 0.0, 0.0);
        let snap = cube.snapshot().unwrap();
        assert_eq!(snap.velocity(2, 2, 2), Vec3::X);
        assert!((snap.density(2, 2, 2) - 4.0).abs() < 1e-6);

        cube.step();
        cube.reset();
        assert_eq!(cube.step_count(), 0);
        assert_eq!(cube.total_density(), 0.0);
    }
}
