use glam::Vec3;

use crate::error::SimError;
use crate::grid::GridDims;

/// Host copy of a solver's velocity + density, packed `[vx, vy, vz, density]`
/// per cell in grid order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSnapshot {
    dims: GridDims,
    cells: Vec<[f32; 4]>,
}

impl FieldSnapshot {
    pub fn new(dims: GridDims, cells: Vec<[f32; 4]>) -> Result<Self, SimError> {
        if cells.len() != dims.cells() {
            return Err(SimError::FieldLengthMismatch {
                expected: dims.cells(),
                actual: cells.len(),
            });
        }
        Ok(Self { dims, cells })
    }

    pub fn dims(&self) -> GridDims {
        self.dims
    }

    pub fn velocity(&self, x: u32, y: u32, z: u32) -> Vec3 {
        let c = self.cells[self.dims.idx(x, y, z)];
        Vec3::new(c[0], c[1], c[2])
    }

    pub fn density(&self, x: u32, y: u32, z: u32) -> f32 {
        self.cells[self.dims.idx(x, y, z)][3]
    }

    pub fn cells(&self) -> &[[f32; 4]] {
        &self.cells
    }

    pub fn max_speed(&self) -> f32 {
        self.cells
            .iter()
            .map(|c| Vec3::new(c[0], c[1], c[2]).length())
            .fold(0.0, f32::max)
    }

    pub fn mean_density(&self) -> f32 {
        if self.cells.is_empty() {
            return 0.0;
        }
        self.cells.iter().map(|c| c[3]).sum::<f32>() / self.cells.len() as f32
    }
}

/// A flow solver that can be advanced one outer frame and sampled.
pub trait FlowField {
    /// Short human-readable solver name.
    fn name(&self) -> &'static str;

    fn dims(&self) -> GridDims;

    /// Advance one outer frame.
    fn advance(&mut self) -> Result<(), SimError>;

    fn snapshot(&mut self) -> Result<FieldSnapshot, SimError>;
}
