pub mod collide;
pub mod force;
pub mod stream;

use windtunnel_core::constants::LBM_WORKGROUP_SIZE;
use windtunnel_core::grid::GridDims;

/// Workgroups per axis so that every cell gets one invocation.
pub fn workgroup_counts(dims: GridDims) -> [u32; 3] {
    [
        dims.x.div_ceil(LBM_WORKGROUP_SIZE),
        dims.y.div_ceil(LBM_WORKGROUP_SIZE),
        dims.z.div_ceil(LBM_WORKGROUP_SIZE),
    ]
}

pub(crate) fn create_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    shader_source: &str,
    name: &str,
) -> wgpu::ComputePipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("lbm-{name}-shader")),
        source: wgpu::ShaderSource::Wgsl(shader_source.into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("lbm-{name}-pipeline-layout")),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(&format!("lbm-{name}-pipeline")),
        layout: Some(&layout),
        module: &module,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    })
}

pub(crate) fn dispatch_grid(
    pass: &mut wgpu::ComputePass,
    pipeline: &wgpu::ComputePipeline,
    bind_group: &wgpu::BindGroup,
    dims: GridDims,
) {
    let [x, y, z] = workgroup_counts(dims);
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.dispatch_workgroups(x, y, z);
}
