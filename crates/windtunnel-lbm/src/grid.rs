use std::sync::Arc;

use glam::Vec3;

use windtunnel_core::config::LbmConfig;
use windtunnel_core::constants::{
    DRAG_DENOMINATOR_EPSILON, FORCE_FIXED_POINT_SCALE, LATTICE_RHO, Q,
};
use windtunnel_core::error::SimError;
use windtunnel_core::field::{FieldSnapshot, FlowField};
use windtunnel_core::grid::GridDims;
use windtunnel_core::lattice::{equilibrium_set, relaxation_time};
use windtunnel_core::mesh::{Aabb, Triangle};
use windtunnel_core::solid::SolidMask;

use crate::cpu::CpuKernels;
use crate::gpu::GpuKernels;
use crate::kernels::{LatticeKernels, LbmUniforms};

const MIN_LBM_AXIS: u32 = 2;

/// `|fx| / (0.5 * rho * U^2 * A)` with rho = 1. Zero when the denominator is
/// below epsilon or not a number.
pub fn drag_coefficient(fx: f32, inlet_speed: f32, ref_area: f32) -> f32 {
    let denom = 0.5 * LATTICE_RHO * inlet_speed * inlet_speed * ref_area;
    if !(denom >= DRAG_DENOMINATOR_EPSILON) {
        return 0.0;
    }
    fx.abs() / denom
}

/// D3Q19 lattice around a solid obstacle, generic over the kernel executor.
pub struct LbmGrid<K: LatticeKernels> {
    kernels: K,
    config: LbmConfig,
    tau: f32,
    solid: SolidMask,
    step_count: u64,
}

impl LbmGrid<CpuKernels> {
    pub fn new_cpu(config: &LbmConfig) -> Result<Self, SimError> {
        let dims = config.dims.validate(MIN_LBM_AXIS)?;
        Self::with_kernels(CpuKernels::new(dims)?, config)
    }

    /// Packed `[ux, uy, uz, rho]` from the last collision.
    pub fn velocity_field(&self) -> &[[f32; 4]] {
        self.kernels.velocity()
    }
}

impl LbmGrid<GpuKernels> {
    pub fn new_gpu(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        config: &LbmConfig,
    ) -> Result<Self, SimError> {
        let dims = config.dims.validate(MIN_LBM_AXIS)?;
        Self::with_kernels(GpuKernels::new(device, queue, dims)?, config)
    }

    /// Device-resident packed velocity, for renderers that bind it directly.
    pub fn velocity_field(&self) -> &wgpu::Buffer {
        self.kernels.velocity_buffer()
    }
}

impl<K: LatticeKernels> LbmGrid<K> {
    /// Wrap an executor. The lattice starts at rest with unit density and no
    /// solid cells.
    pub fn with_kernels(kernels: K, config: &LbmConfig) -> Result<Self, SimError> {
        let dims = kernels.dims();
        let tau = relaxation_time(config.viscosity);
        let mut grid = Self {
            kernels,
            config: config.clone(),
            tau,
            solid: SolidMask::empty(dims),
            step_count: 0,
        };
        grid.kernels.write_solid(grid.solid.as_slice())?;
        grid.initialize_flow(Vec3::ZERO)?;

        log::info!(
            "LbmGrid: {}x{}x{} cells, tau {:.4}, {:?} streamwise",
            dims.x,
            dims.y,
            dims.z,
            tau,
            config.streamwise
        );
        Ok(grid)
    }

    pub fn dims(&self) -> GridDims {
        self.kernels.dims()
    }

    pub fn config(&self) -> &LbmConfig {
        &self.config
    }

    pub fn tau(&self) -> f32 {
        self.tau
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn solid_mask(&self) -> &SolidMask {
        &self.solid
    }

    pub fn kernels(&self) -> &K {
        &self.kernels
    }

    /// Replace the solid mask with the cells covered by a world-space box.
    pub fn set_solid_aabb(&mut self, aabb: Aabb) -> Result<(), SimError> {
        let mask = SolidMask::from_aabb(self.dims(), &self.config.domain, aabb);
        self.set_solid_mask(mask)
    }

    /// Replace the solid mask with the cells whose centres lie inside the
    /// world-space triangle soup.
    pub fn set_solid_from_mesh(&mut self, triangles: &[Triangle]) -> Result<(), SimError> {
        let mask = SolidMask::from_triangles(self.dims(), &self.config.domain, triangles);
        self.set_solid_mask(mask)
    }

    pub fn set_solid_mask(&mut self, mask: SolidMask) -> Result<(), SimError> {
        let dims = self.dims();
        if mask.dims() != dims {
            return Err(SimError::FieldLengthMismatch {
                expected: dims.cells(),
                actual: mask.dims().cells(),
            });
        }
        self.kernels.write_solid(mask.as_slice())?;
        self.solid = mask;
        Ok(())
    }

    /// Seed every cell with `feq(1, u)` in both buffers.
    pub fn initialize_flow(&mut self, u: Vec3) -> Result<(), SimError> {
        let cells = self.dims().cells();
        let mut cell_f = [0.0f32; Q];
        equilibrium_set(LATTICE_RHO, u, &mut cell_f);

        let mut f = Vec::new();
        f.try_reserve_exact(cells * Q)
            .map_err(|_| SimError::AllocationFailed {
                what: "initial distributions",
                cells,
            })?;
        for _ in 0..cells {
            f.extend_from_slice(&cell_f);
        }
        self.kernels.write_distributions(&f)?;
        self.kernels
            .write_velocity(&vec![[u.x, u.y, u.z, LATTICE_RHO]; cells])?;
        Ok(())
    }

    fn uniforms(&self, inlet: Vec3) -> LbmUniforms {
        LbmUniforms::new(self.dims(), self.tau, inlet.to_array(), self.config.streamwise)
    }

    /// One collide / stream / swap cycle.
    pub fn step(&mut self, inlet: Vec3) {
        let uniforms = self.uniforms(inlet);
        self.kernels.step(&uniforms);
        self.step_count += 1;
    }

    /// `substeps` lattice steps.
    pub fn advance_frame(&mut self, inlet: Vec3) {
        for _ in 0..self.config.substeps {
            self.step(inlet);
        }
        log::debug!("LbmGrid: step {}", self.step_count);
    }

    pub fn read_velocity(&mut self) -> Result<Vec<[f32; 4]>, SimError> {
        self.kernels.read_velocity()
    }

    pub fn read_distributions(&mut self) -> Result<Vec<f32>, SimError> {
        self.kernels.read_distributions()
    }

    /// Sum of every population, accumulated in f64.
    pub fn total_mass(&mut self) -> Result<f64, SimError> {
        let f = self.kernels.read_distributions()?;
        Ok(f.iter().map(|&v| v as f64).sum())
    }

    /// Momentum-exchange force on the solid cells, in lattice units.
    pub fn compute_drag_force(&mut self) -> Result<Vec3, SimError> {
        let inlet = Vec3::from_array(self.config.inlet_velocity);
        let acc = self.kernels.momentum_exchange(&self.uniforms(inlet))?;
        log::debug!("LbmGrid: {} fluid-solid links", acc[3]);
        Ok(Vec3::new(
            acc[0] as f32 / FORCE_FIXED_POINT_SCALE,
            acc[1] as f32 / FORCE_FIXED_POINT_SCALE,
            acc[2] as f32 / FORCE_FIXED_POINT_SCALE,
        ))
    }

    pub fn compute_drag_coefficient(
        &mut self,
        inlet_speed: f32,
        ref_area: f32,
    ) -> Result<f32, SimError> {
        let force = self.compute_drag_force()?;
        Ok(drag_coefficient(force.x, inlet_speed, ref_area))
    }
}

impl<K: LatticeKernels> FlowField for LbmGrid<K> {
    fn name(&self) -> &'static str {
        "lattice-boltzmann"
    }

    fn dims(&self) -> GridDims {
        self.kernels.dims()
    }

    fn advance(&mut self) -> Result<(), SimError> {
        let inlet = Vec3::from_array(self.config.inlet_velocity);
        self.advance_frame(inlet);
        Ok(())
    }

    fn snapshot(&mut self) -> Result<FieldSnapshot, SimError> {
        let cells = self.kernels.read_velocity()?;
        FieldSnapshot::new(self.kernels.dims(), cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use windtunnel_core::config::StreamwiseBoundary;

    fn periodic_config(dims: GridDims) -> LbmConfig {
        LbmConfig {
            dims,
            viscosity: 0.02,
            substeps: 2,
            streamwise: StreamwiseBoundary::Periodic,
            inlet_velocity: [0.05, 0.0, 0.0],
            ..Default::default()
        }
    }

    /// Box around the domain centre covering a few cells on each axis.
    fn centre_box() -> Aabb {
        Aabb::new(Vec3::splat(-0.9), Vec3::splat(0.9))
    }

    #[test]
    fn test_tau_follows_viscosity_clamp() {
        let mut config = periodic_config(GridDims::cube(4));
        config.viscosity = 0.0;
        assert_eq!(LbmGrid::new_cpu(&config).unwrap().tau(), 0.51);
        config.viscosity = 100.0;
        assert_eq!(LbmGrid::new_cpu(&config).unwrap().tau(), 2.0);
        config.viscosity = 0.1 / 3.0;
        assert!((LbmGrid::new_cpu(&config).unwrap().tau() - 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_rejects_flat_grid() {
        let config = periodic_config(GridDims::new(8, 1, 8));
        assert!(matches!(
            LbmGrid::new_cpu(&config),
            Err(SimError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_zero_velocity_seeding() {
        let mut grid = LbmGrid::new_cpu(&periodic_config(GridDims::new(6, 4, 4))).unwrap();
        grid.initialize_flow(Vec3::ZERO).unwrap();
        let f = grid.read_distributions().unwrap();
        for cell in f.chunks_exact(Q) {
            let sum: f32 = cell.iter().sum();
            assert!((sum - 1.0).abs() < 1e-6);
        }
        for v in grid.read_velocity().unwrap() {
            assert_eq!(&v[..3], &[0.0, 0.0, 0.0]);
        }

        grid.step(Vec3::ZERO);
        for v in grid.velocity_field() {
            assert!(v[0].abs() < 1e-6 && v[1].abs() < 1e-6 && v[2].abs() < 1e-6);
            assert!((v[3] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_periodic_mass_conservation() {
        let dims = GridDims::new(10, 6, 6);
        let mut grid = LbmGrid::new_cpu(&periodic_config(dims)).unwrap();
        grid.initialize_flow(Vec3::new(0.05, 0.01, 0.0)).unwrap();
        let before = grid.total_mass().unwrap();
        for _ in 0..20 {
            grid.step(Vec3::new(0.05, 0.0, 0.0));
        }
        let after = grid.total_mass().unwrap();
        assert!(((after - before) / before).abs() < 1e-4);
        assert_eq!(grid.step_count(), 20);
    }

    #[test]
    fn test_periodic_mass_conservation_with_obstacle() {
        let dims = GridDims::new(16, 8, 8);
        let mut grid = LbmGrid::new_cpu(&periodic_config(dims)).unwrap();
        grid.set_solid_aabb(centre_box()).unwrap();
        assert!(grid.solid_mask().solid_count() > 0);
        grid.initialize_flow(Vec3::new(0.05, 0.0, 0.0)).unwrap();
        let before = grid.total_mass().unwrap();
        for _ in 0..20 {
            grid.step(Vec3::new(0.05, 0.0, 0.0));
        }
        let after = grid.total_mass().unwrap();
        assert!(((after - before) / before).abs() < 1e-4);
    }

    #[test]
    fn test_drag_coefficient_degenerate_inputs() {
        assert_eq!(drag_coefficient(1.0, 0.0, 1.0), 0.0);
        assert_eq!(drag_coefficient(1.0, 0.05, 0.0), 0.0);
        assert_eq!(drag_coefficient(1.0, f32::NAN, 1.0), 0.0);
        assert!((drag_coefficient(-0.5, 1.0, 1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_drag_without_obstacle_is_zero() {
        let mut grid = LbmGrid::new_cpu(&periodic_config(GridDims::new(8, 4, 4))).unwrap();
        grid.initialize_flow(Vec3::new(0.05, 0.0, 0.0)).unwrap();
        assert_eq!(grid.compute_drag_force().unwrap(), Vec3::ZERO);
        assert_eq!(grid.compute_drag_coefficient(0.05, 4.0).unwrap(), 0.0);
    }

    #[test]
    fn test_drag_points_downstream() {
        let dims = GridDims::new(16, 8, 8);
        let mut grid = LbmGrid::new_cpu(&periodic_config(dims)).unwrap();
        grid.set_solid_aabb(centre_box()).unwrap();
        let inlet = Vec3::new(0.05, 0.0, 0.0);
        grid.initialize_flow(inlet).unwrap();

        let force = grid.compute_drag_force().unwrap();
        assert!(force.x > 0.0);
        assert!(force.y.abs() < 1e-3 && force.z.abs() < 1e-3);

        grid.step(inlet);
        let force = grid.compute_drag_force().unwrap();
        assert!(force.x > 0.0);
        assert!(grid.compute_drag_coefficient(0.05, 4.0).unwrap() > 0.0);
    }

    #[test]
    fn test_mesh_mask_replaces_aabb_mask() {
        use windtunnel_core::mesh::Mesh;

        let dims = GridDims::new(16, 8, 8);
        let mut grid = LbmGrid::new_cpu(&periodic_config(dims)).unwrap();
        grid.set_solid_aabb(centre_box()).unwrap();
        let box_count = grid.solid_mask().solid_count();
        assert_eq!(box_count, 64);

        let mesh = Mesh::cuboid(Vec3::splat(0.9));
        let triangles = mesh.triangles();
        grid.set_solid_from_mesh(&triangles).unwrap();
        assert_eq!(grid.solid_mask().solid_count(), box_count);

        grid.set_solid_from_mesh(&[]).unwrap();
        assert_eq!(grid.solid_mask().solid_count(), 0);
    }

    #[test]
    fn test_mask_dims_checked() {
        let mut grid = LbmGrid::new_cpu(&periodic_config(GridDims::new(8, 4, 4))).unwrap();
        let err = grid.set_solid_mask(SolidMask::empty(GridDims::cube(4)));
        assert!(matches!(err, Err(SimError::FieldLengthMismatch { .. })));
    }

    #[test]
    fn test_inlet_outlet_frames_stay_finite() {
        let config = LbmConfig {
            dims: GridDims::new(16, 8, 8),
            substeps: 3,
            ..Default::default()
        };
        let mut grid = LbmGrid::new_cpu(&config).unwrap();
        grid.set_solid_aabb(centre_box()).unwrap();
        for _ in 0..4 {
            grid.advance().unwrap();
        }
        assert_eq!(grid.step_count(), 12);

        let snapshot = grid.snapshot().unwrap();
        assert_eq!(snapshot.dims(), config.dims);
        assert!(snapshot.cells().iter().flatten().all(|v| v.is_finite()));
        // Inlet column reports the configured inlet velocity.
        assert!((snapshot.velocity(0, 3, 3).x - 0.05).abs() < 1e-6);
        assert!(grid.compute_drag_force().unwrap().x.is_finite());
    }

    #[cfg(feature = "gpu_tests")]
    mod gpu {
        use super::*;
        use crate::gpu::request_device;

        fn grids(config: &LbmConfig) -> (LbmGrid<CpuKernels>, LbmGrid<GpuKernels>) {
            let (device, queue) = request_device().unwrap();
            (
                LbmGrid::new_cpu(config).unwrap(),
                LbmGrid::new_gpu(device, queue, config).unwrap(),
            )
        }

        #[test]
        fn test_gpu_matches_cpu_distributions() {
            let config = LbmConfig {
                dims: GridDims::new(16, 8, 8),
                ..Default::default()
            };
            let (mut cpu, mut gpu) = grids(&config);
            let inlet = Vec3::new(0.05, 0.0, 0.0);
            cpu.set_solid_aabb(centre_box()).unwrap();
            gpu.set_solid_aabb(centre_box()).unwrap();
            cpu.initialize_flow(inlet).unwrap();
            gpu.initialize_flow(inlet).unwrap();
            for _ in 0..10 {
                cpu.step(inlet);
                gpu.step(inlet);
            }
            let a = cpu.read_distributions().unwrap();
            let b = gpu.read_distributions().unwrap();
            assert_eq!(a.len(), b.len());
            for (x, y) in a.iter().zip(&b) {
                assert!((x - y).abs() < 1e-4, "{x} vs {y}");
            }

            let va = cpu.read_velocity().unwrap();
            let vb = gpu.read_velocity().unwrap();
            for (x, y) in va.iter().flatten().zip(vb.iter().flatten()) {
                assert!((x - y).abs() < 1e-4);
            }
        }

        #[test]
        fn test_gpu_drag_matches_cpu() {
            let config = periodic_config(GridDims::new(16, 8, 8));
            let (mut cpu, mut gpu) = grids(&config);
            let inlet = Vec3::new(0.05, 0.0, 0.0);
            cpu.set_solid_aabb(centre_box()).unwrap();
            gpu.set_solid_aabb(centre_box()).unwrap();
            cpu.initialize_flow(inlet).unwrap();
            gpu.initialize_flow(inlet).unwrap();
            cpu.step(inlet);
            gpu.step(inlet);

            let fa = cpu.compute_drag_force().unwrap();
            let fb = gpu.compute_drag_force().unwrap();
            assert!(fb.x > 0.0);
            assert!((fa - fb).abs().max_element() < 1e-2);
        }

        #[test]
        fn test_gpu_periodic_mass_conservation() {
            let config = periodic_config(GridDims::new(16, 8, 8));
            let (_, mut gpu) = grids(&config);
            gpu.set_solid_aabb(centre_box()).unwrap();
            gpu.initialize_flow(Vec3::new(0.05, 0.0, 0.0)).unwrap();
            let before = gpu.total_mass().unwrap();
            for _ in 0..5 {
                gpu.advance().unwrap();
            }
            let after = gpu.total_mass().unwrap();
            assert!(((after - before) / before).abs() < 1e-4);
        }
    }
}
