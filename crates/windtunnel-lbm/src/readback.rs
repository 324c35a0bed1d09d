use std::sync::mpsc;

use windtunnel_core::error::SimError;

/// Map the first `size` bytes of a `MAP_READ` staging buffer, copy them out
/// and unmap. The copy into `staging` must already be submitted.
pub fn read_staging<T: bytemuck::Pod>(
    device: &wgpu::Device,
    staging: &wgpu::Buffer,
    size: u64,
) -> Result<Vec<T>, SimError> {
    let slice = staging.slice(..size);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);

    match rx.recv() {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(SimError::ReadbackFailed(e.to_string())),
        Err(e) => return Err(SimError::ReadbackFailed(e.to_string())),
    }

    let values = {
        let data = slice.get_mapped_range();
        bytemuck::cast_slice::<u8, T>(&data).to_vec()
    };
    staging.unmap();
    Ok(values)
}
