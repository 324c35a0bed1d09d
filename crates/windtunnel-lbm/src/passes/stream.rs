use windtunnel_core::grid::GridDims;

use super::{create_pipeline, dispatch_grid};

/// Create the pull-streaming pipeline.
pub fn create_stream_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    shader_source: &str,
) -> wgpu::ComputePipeline {
    create_pipeline(device, bind_group_layout, shader_source, "stream")
}

/// Stream `f` into `f_new`. The caller swaps buffers afterwards.
pub fn dispatch_stream(
    pass: &mut wgpu::ComputePass,
    pipeline: &wgpu::ComputePipeline,
    bind_group: &wgpu::BindGroup,
    dims: GridDims,
) {
    dispatch_grid(pass, pipeline, bind_group, dims);
}
