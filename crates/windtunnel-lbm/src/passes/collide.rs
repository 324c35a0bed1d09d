use windtunnel_core::grid::GridDims;

use super::{create_pipeline, dispatch_grid};

/// Create the BGK collision pipeline.
pub fn create_collide_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    shader_source: &str,
) -> wgpu::ComputePipeline {
    create_pipeline(device, bind_group_layout, shader_source, "collide")
}

/// Collide every cell in place on the bound `f` buffer.
pub fn dispatch_collide(
    pass: &mut wgpu::ComputePass,
    pipeline: &wgpu::ComputePipeline,
    bind_group: &wgpu::BindGroup,
    dims: GridDims,
) {
    dispatch_grid(pass, pipeline, bind_group, dims);
}
