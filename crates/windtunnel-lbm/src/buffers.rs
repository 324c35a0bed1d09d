use windtunnel_core::constants::Q;
use windtunnel_core::error::SimError;
use windtunnel_core::grid::GridDims;

use crate::kernels::LbmUniforms;

/// Four i32 accumulators: fixed-point force xyz plus link count.
pub const FORCE_BUFFER_SIZE: u64 = 16;

pub const UNIFORM_BUFFER_SIZE: u64 = std::mem::size_of::<LbmUniforms>() as u64;

/// Byte size of one distribution buffer (19 f32 per cell).
pub fn distribution_bytes(dims: GridDims) -> u64 {
    dims.cells() as u64 * Q as u64 * 4
}

/// Byte size of the packed `vec4<f32>` velocity buffer.
pub fn velocity_bytes(dims: GridDims) -> u64 {
    dims.cells() as u64 * 16
}

/// Device-resident lattice state.
///
/// The two distribution buffers alternate roles every step: one is streamed
/// from, the other streamed into. `swap()` flips them once streaming is done.
/// Staging buffers for readback are created here too, so nothing is
/// allocated per step.
pub struct LatticeBuffers {
    distributions: [wgpu::Buffer; 2],
    /// 0 or 1: index of the distribution buffer holding the current state.
    read_index: usize,
    velocity: wgpu::Buffer,
    solid: wgpu::Buffer,
    uniforms: wgpu::Buffer,
    force: wgpu::Buffer,
    /// Large enough for either a distribution or a velocity readback.
    staging: wgpu::Buffer,
    force_staging: wgpu::Buffer,
    distribution_bytes: u64,
    velocity_bytes: u64,
}

impl LatticeBuffers {
    pub fn new(device: &wgpu::Device, dims: GridDims) -> Result<Self, SimError> {
        let distribution_bytes = distribution_bytes(dims);
        let velocity_bytes = velocity_bytes(dims);

        let limits = device.limits();
        let binding_limit = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
        if distribution_bytes > binding_limit {
            log::error!(
                "LatticeBuffers: {} bytes per distribution buffer exceeds device limit {}",
                distribution_bytes,
                binding_limit
            );
            return Err(SimError::AllocationFailed {
                what: "distribution buffer",
                cells: dims.cells(),
            });
        }

        let storage = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST;

        let buffer = |label: &str, size: u64, usage: wgpu::BufferUsages| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            })
        };

        let f_a = buffer("lbm-f-a", distribution_bytes, storage);
        let f_b = buffer("lbm-f-b", distribution_bytes, storage);
        let velocity = buffer("lbm-velocity", velocity_bytes, storage);
        let solid = buffer(
            "lbm-solid",
            dims.cells() as u64 * 4,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        );
        let uniforms = buffer(
            "lbm-uniforms",
            UNIFORM_BUFFER_SIZE,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );
        let force = buffer("lbm-force", FORCE_BUFFER_SIZE, storage);
        let readback = wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST;
        let staging = buffer("lbm-staging", distribution_bytes.max(velocity_bytes), readback);
        let force_staging = buffer("lbm-force-staging", FORCE_BUFFER_SIZE, readback);

        log::info!(
            "LatticeBuffers: {}x{}x{} cells, {} KB per distribution buffer",
            dims.x,
            dims.y,
            dims.z,
            distribution_bytes / 1024
        );

        Ok(Self {
            distributions: [f_a, f_b],
            read_index: 0,
            velocity,
            solid,
            uniforms,
            force,
            staging,
            force_staging,
            distribution_bytes,
            velocity_bytes,
        })
    }

    pub fn distributions(&self, index: usize) -> &wgpu::Buffer {
        &self.distributions[index]
    }

    /// Buffer holding the current populations.
    pub fn current(&self) -> &wgpu::Buffer {
        &self.distributions[self.read_index]
    }

    /// Buffer the next stream writes into.
    pub fn next(&self) -> &wgpu::Buffer {
        &self.distributions[1 - self.read_index]
    }

    pub fn swap(&mut self) {
        self.read_index = 1 - self.read_index;
    }

    pub fn read_index(&self) -> usize {
        self.read_index
    }

    pub fn velocity(&self) -> &wgpu::Buffer {
        &self.velocity
    }

    pub fn solid(&self) -> &wgpu::Buffer {
        &self.solid
    }

    pub fn uniforms(&self) -> &wgpu::Buffer {
        &self.uniforms
    }

    pub fn force(&self) -> &wgpu::Buffer {
        &self.force
    }

    pub fn staging(&self) -> &wgpu::Buffer {
        &self.staging
    }

    pub fn force_staging(&self) -> &wgpu::Buffer {
        &self.force_staging
    }

    pub fn distribution_bytes(&self) -> u64 {
        self.distribution_bytes
    }

    pub fn velocity_bytes(&self) -> u64 {
        self.velocity_bytes
    }
}
