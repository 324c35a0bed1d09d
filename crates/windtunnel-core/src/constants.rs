//! Single source of truth for shared constants.
//! Values used by both Rust and WGSL are injected into the shader preamble
//! by `windtunnel-lbm` at pipeline creation.

/// Number of discrete velocities in the D3Q19 lattice.
pub const Q: usize = 19;

/// Lattice speed of sound squared (c_s^2 = 1/3).
pub const CS2: f32 = 1.0 / 3.0;

/// Lower τ bound. τ must stay strictly above 0.5 for BGK stability.
pub const TAU_MIN: f32 = 0.51;

/// Upper τ bound. Larger τ gives excessive numerical diffusion.
pub const TAU_MAX: f32 = 2.0;

/// Reference density in lattice units.
pub const LATTICE_RHO: f32 = 1.0;

/// Möller–Trumbore parallel-ray threshold on |e1 · (d × e2)|.
pub const RAY_PARALLEL_EPSILON: f32 = 1e-5;

/// Hits at or behind the ray origin (t <= this) are discarded.
pub const RAY_MIN_T: f32 = 1e-5;

/// Default Gauss-Seidel passes per diffusion/projection solve.
pub const DEFAULT_SOLVER_ITERATIONS: u32 = 4;

/// Default LBM sub-steps per outer frame.
pub const DEFAULT_LBM_SUBSTEPS: u32 = 4;

/// Fixed-point scale for the momentum-exchange reduction.
/// Each link contribution is rounded to `value * FORCE_FIXED_POINT_SCALE`
/// and summed as an integer so the reduction is order independent.
pub const FORCE_FIXED_POINT_SCALE: f32 = 10_000.0;

/// Dynamic pressure × area below this yields a drag coefficient of 0.
pub const DRAG_DENOMINATOR_EPSILON: f32 = 1e-10;

/// World-space extents of the wind-tunnel domain mapped onto the LBM grid.
/// x ∈ [-4, 4] (streamwise), y, z ∈ [-2, 2].
pub const DOMAIN_MIN: [f32; 3] = [-4.0, -2.0, -2.0];
pub const DOMAIN_MAX: [f32; 3] = [4.0, 2.0, 2.0];

/// Workgroup edge length of the LBM compute kernels (4×4×4 = 64 invocations).
pub const LBM_WORKGROUP_SIZE: u32 = 4;
