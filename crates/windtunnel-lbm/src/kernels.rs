use windtunnel_core::config::StreamwiseBoundary;
use windtunnel_core::error::SimError;
use windtunnel_core::grid::GridDims;

/// `flags` bit: x wraps around instead of using the inlet/outlet treatment.
pub const FLAG_PERIODIC_X: u32 = 1;

/// Per-dispatch parameters. Must match `LbmParams` in `shaders/lbm/common.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LbmUniforms {
    pub size: [u32; 3],
    pub tau: f32,
    pub inlet: [f32; 3],
    pub flags: u32,
}

impl LbmUniforms {
    pub fn new(dims: GridDims, tau: f32, inlet: [f32; 3], streamwise: StreamwiseBoundary) -> Self {
        let flags = match streamwise {
            StreamwiseBoundary::Periodic => FLAG_PERIODIC_X,
            StreamwiseBoundary::InletOutlet => 0,
        };
        Self {
            size: [dims.x, dims.y, dims.z],
            tau,
            inlet,
            flags,
        }
    }

    pub fn periodic_x(&self) -> bool {
        self.flags & FLAG_PERIODIC_X != 0
    }
}

/// Raw momentum-exchange accumulator: fixed-point `[fx, fy, fz]` plus the
/// number of fluid→solid links that contributed.
pub type ForceAccumulator = [i32; 4];

/// Executor for the lattice kernels. Every kernel covers the whole grid and
/// completes before the next call observes its output.
pub trait LatticeKernels {
    fn dims(&self) -> GridDims;

    /// Upload 19 populations per cell into both the current and next buffer.
    fn write_distributions(&mut self, f: &[f32]) -> Result<(), SimError>;

    fn write_velocity(&mut self, velocity: &[[f32; 4]]) -> Result<(), SimError>;

    fn write_solid(&mut self, solid: &[u32]) -> Result<(), SimError>;

    /// BGK relaxation in place on the current buffer; writes packed velocity.
    fn collide(&mut self, uniforms: &LbmUniforms);

    /// Pull streaming with bounce-back from the current buffer into the next.
    fn stream(&mut self, uniforms: &LbmUniforms);

    /// Exchange current and next buffers.
    fn swap(&mut self);

    /// One full lattice step: collide, stream, swap.
    fn step(&mut self, uniforms: &LbmUniforms) {
        self.collide(uniforms);
        self.stream(uniforms);
        self.swap();
    }

    fn momentum_exchange(&mut self, uniforms: &LbmUniforms) -> Result<ForceAccumulator, SimError>;

    fn read_distributions(&mut self) -> Result<Vec<f32>, SimError>;

    fn read_velocity(&mut self) -> Result<Vec<[f32; 4]>, SimError>;
}

pub(crate) fn check_len(expected: usize, actual: usize) -> Result<(), SimError> {
    if expected != actual {
        return Err(SimError::FieldLengthMismatch { expected, actual });
    }
    Ok(())
}
