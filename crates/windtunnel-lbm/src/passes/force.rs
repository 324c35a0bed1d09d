use windtunnel_core::grid::GridDims;

use super::{create_pipeline, dispatch_grid};

/// Create the momentum-exchange pipeline.
pub fn create_force_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    shader_source: &str,
) -> wgpu::ComputePipeline {
    create_pipeline(device, bind_group_layout, shader_source, "force")
}

/// Accumulate fluid->solid link momentum into the force buffer.
/// The force buffer must be cleared in the same encoder beforehand.
pub fn dispatch_force(
    pass: &mut wgpu::ComputePass,
    pipeline: &wgpu::ComputePipeline,
    bind_group: &wgpu::BindGroup,
    dims: GridDims,
) {
    dispatch_grid(pass, pipeline, bind_group, dims);
}
