//! wgpu executor. One compute pass per kernel, two ping-pong bind groups
//! created up front and picked by the current read index.

use std::sync::Arc;

use windtunnel_core::constants::{FORCE_FIXED_POINT_SCALE, LBM_WORKGROUP_SIZE, Q};
use windtunnel_core::error::SimError;
use windtunnel_core::grid::GridDims;

use crate::buffers::{LatticeBuffers, FORCE_BUFFER_SIZE};
use crate::kernels::{check_len, ForceAccumulator, LatticeKernels, LbmUniforms, FLAG_PERIODIC_X};
use crate::passes::{collide, force, stream};
use crate::readback::read_staging;

/// Request a compute device on the best available adapter.
pub fn request_device() -> Result<(Arc<wgpu::Device>, Arc<wgpu::Queue>), SimError> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .ok_or_else(|| SimError::AdapterNotFound("no compute-capable adapter".to_string()))?;

    let info = adapter.get_info();
    log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

    // Adapter limits so larger lattices fit in one storage binding.
    let mut limits = wgpu::Limits::default();
    let adapter_limits = adapter.limits();
    limits.max_buffer_size = adapter_limits.max_buffer_size;
    limits.max_storage_buffer_binding_size = adapter_limits.max_storage_buffer_binding_size;

    let (device, queue) = pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("windtunnel-device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: Default::default(),
        },
        None,
    ))
    .map_err(|e| SimError::DeviceRequestFailed(e.to_string()))?;

    Ok((Arc::new(device), Arc::new(queue)))
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn compose_shader(kernel: &str) -> String {
    let constants_preamble = format!(
        "const Q: u32 = {}u;\nconst WORKGROUP_SIZE: u32 = {}u;\nconst FORCE_SCALE: f32 = {:.1};\nconst FLAG_PERIODIC_X: u32 = {}u;\n",
        Q, LBM_WORKGROUP_SIZE, FORCE_FIXED_POINT_SCALE, FLAG_PERIODIC_X,
    );
    let common_wgsl = include_str!("../../../shaders/lbm/common.wgsl");
    format!("{constants_preamble}\n{common_wgsl}\n{kernel}")
}

pub struct GpuKernels {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    dims: GridDims,
    buffers: LatticeBuffers,
    /// Indexed by read index: binding 0 is the current buffer, binding 1 the next.
    bind_groups: [wgpu::BindGroup; 2],
    collide_pipeline: wgpu::ComputePipeline,
    stream_pipeline: wgpu::ComputePipeline,
    force_pipeline: wgpu::ComputePipeline,
}

impl GpuKernels {
    /// Create every buffer, pipeline and bind group for a `dims` lattice.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        dims: GridDims,
    ) -> Result<Self, SimError> {
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffers = LatticeBuffers::new(&device, dims);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            log::error!("GpuKernels: buffer allocation failed: {err}");
            return Err(SimError::AllocationFailed {
                what: "lattice buffers",
                cells: dims.cells(),
            });
        }
        let buffers = buffers?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        // binding 0: f (current), 1: f_new (next), 2: velocity, 3: solid,
        // 4: uniforms, 5: force accumulators.
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lbm-bind-group-layout"),
            entries: &[
                storage_entry(0, false),
                storage_entry(1, false),
                storage_entry(2, false),
                storage_entry(3, true),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_entry(5, false),
            ],
        });

        let collide_pipeline = collide::create_collide_pipeline(
            &device,
            &bind_group_layout,
            &compose_shader(include_str!("../../../shaders/lbm/collide.wgsl")),
        );
        let stream_pipeline = stream::create_stream_pipeline(
            &device,
            &bind_group_layout,
            &compose_shader(include_str!("../../../shaders/lbm/stream.wgsl")),
        );
        let force_pipeline = force::create_force_pipeline(
            &device,
            &bind_group_layout,
            &compose_shader(include_str!("../../../shaders/lbm/force.wgsl")),
        );

        let make_bind_group = |read: usize| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(if read == 0 { "lbm-bind-group-a" } else { "lbm-bind-group-b" }),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffers.distributions(read).as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: buffers.distributions(1 - read).as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: buffers.velocity().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: buffers.solid().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: buffers.uniforms().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: buffers.force().as_entire_binding(),
                    },
                ],
            })
        };
        let bind_groups = [make_bind_group(0), make_bind_group(1)];

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            log::error!("GpuKernels: pipeline creation failed: {err}");
            return Err(SimError::ShaderCompilationFailed(err.to_string()));
        }

        log::info!("GpuKernels: pipelines ready for {}x{}x{}", dims.x, dims.y, dims.z);

        Ok(Self {
            device,
            queue,
            dims,
            buffers,
            bind_groups,
            collide_pipeline,
            stream_pipeline,
            force_pipeline,
        })
    }

    /// Packed `vec4<f32>` velocity, laid out `[ux, uy, uz, rho]` per cell.
    pub fn velocity_buffer(&self) -> &wgpu::Buffer {
        self.buffers.velocity()
    }

    pub fn distribution_buffer(&self) -> &wgpu::Buffer {
        self.buffers.current()
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    fn write_uniforms(&self, uniforms: &LbmUniforms) {
        self.queue
            .write_buffer(self.buffers.uniforms(), 0, bytemuck::bytes_of(uniforms));
    }

    fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_groups[self.buffers.read_index()]
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    fn encode_collide(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("lbm-collide-pass"),
            timestamp_writes: None,
        });
        collide::dispatch_collide(&mut pass, &self.collide_pipeline, self.bind_group(), self.dims);
    }

    fn encode_stream(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("lbm-stream-pass"),
            timestamp_writes: None,
        });
        stream::dispatch_stream(&mut pass, &self.stream_pipeline, self.bind_group(), self.dims);
    }

    fn copy_to_staging(&self, source: &wgpu::Buffer, size: u64) {
        let mut encoder = self.encoder("lbm-readback-encoder");
        encoder.copy_buffer_to_buffer(source, 0, self.buffers.staging(), 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl LatticeKernels for GpuKernels {
    fn dims(&self) -> GridDims {
        self.dims
    }

    fn write_distributions(&mut self, f: &[f32]) -> Result<(), SimError> {
        check_len(self.dims.cells() * Q, f.len())?;
        let bytes: &[u8] = bytemuck::cast_slice(f);
        self.queue.write_buffer(self.buffers.current(), 0, bytes);
        self.queue.write_buffer(self.buffers.next(), 0, bytes);
        Ok(())
    }

    fn write_velocity(&mut self, velocity: &[[f32; 4]]) -> Result<(), SimError> {
        check_len(self.dims.cells(), velocity.len())?;
        self.queue
            .write_buffer(self.buffers.velocity(), 0, bytemuck::cast_slice(velocity));
        Ok(())
    }

    fn write_solid(&mut self, solid: &[u32]) -> Result<(), SimError> {
        check_len(self.dims.cells(), solid.len())?;
        self.queue
            .write_buffer(self.buffers.solid(), 0, bytemuck::cast_slice(solid));
        Ok(())
    }

    fn collide(&mut self, uniforms: &LbmUniforms) {
        self.write_uniforms(uniforms);
        let mut encoder = self.encoder("lbm-collide-encoder");
        self.encode_collide(&mut encoder);
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn stream(&mut self, uniforms: &LbmUniforms) {
        self.write_uniforms(uniforms);
        let mut encoder = self.encoder("lbm-stream-encoder");
        self.encode_stream(&mut encoder);
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn swap(&mut self) {
        self.buffers.swap();
    }

    /// Collide and stream in one submission, each in its own compute pass.
    fn step(&mut self, uniforms: &LbmUniforms) {
        self.write_uniforms(uniforms);
        let mut encoder = self.encoder("lbm-step-encoder");
        self.encode_collide(&mut encoder);
        self.encode_stream(&mut encoder);
        self.queue.submit(std::iter::once(encoder.finish()));
        self.buffers.swap();
    }

    fn momentum_exchange(&mut self, uniforms: &LbmUniforms) -> Result<ForceAccumulator, SimError> {
        self.write_uniforms(uniforms);
        let mut encoder = self.encoder("lbm-force-encoder");
        encoder.clear_buffer(self.buffers.force(), 0, None);
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("lbm-force-pass"),
                timestamp_writes: None,
            });
            force::dispatch_force(&mut pass, &self.force_pipeline, self.bind_group(), self.dims);
        }
        encoder.copy_buffer_to_buffer(
            self.buffers.force(),
            0,
            self.buffers.force_staging(),
            0,
            FORCE_BUFFER_SIZE,
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let values: Vec<i32> =
            read_staging(&self.device, self.buffers.force_staging(), FORCE_BUFFER_SIZE)?;
        let mut acc: ForceAccumulator = [0; 4];
        if values.len() != acc.len() {
            return Err(SimError::ReadbackFailed(format!(
                "force readback returned {} words",
                values.len()
            )));
        }
        acc.copy_from_slice(&values);
        Ok(acc)
    }

    fn read_distributions(&mut self) -> Result<Vec<f32>, SimError> {
        let size = self.buffers.distribution_bytes();
        self.copy_to_staging(self.buffers.current(), size);
        read_staging(&self.device, self.buffers.staging(), size)
    }

    fn read_velocity(&mut self) -> Result<Vec<[f32; 4]>, SimError> {
        let size = self.buffers.velocity_bytes();
        self.copy_to_staging(self.buffers.velocity(), size);
        read_staging(&self.device, self.buffers.staging(), size)
    }
}
