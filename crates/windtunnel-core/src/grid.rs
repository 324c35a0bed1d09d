use glam::UVec3;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Dimensions of a regular 3D grid. Linear index is `x + y*sx + z*sx*sy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDims {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl GridDims {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    pub const fn cube(n: u32) -> Self {
        Self { x: n, y: n, z: n }
    }

    /// Reject any axis smaller than `min`.
    pub fn validate(self, min: u32) -> Result<Self, SimError> {
        if self.x < min || self.y < min || self.z < min {
            return Err(SimError::InvalidDimensions {
                x: self.x,
                y: self.y,
                z: self.z,
                min,
            });
        }
        Ok(self)
    }

    /// Total cell count.
    pub fn cells(self) -> usize {
        self.x as usize * self.y as usize * self.z as usize
    }

    #[inline]
    pub fn idx(self, x: u32, y: u32, z: u32) -> usize {
        x as usize + y as usize * self.x as usize + z as usize * self.x as usize * self.y as usize
    }

    /// Inverse of [`GridDims::idx`].
    pub fn coords(self, index: usize) -> UVec3 {
        let sx = self.x as usize;
        let sxy = sx * self.y as usize;
        UVec3::new(
            (index % sx) as u32,
            ((index % sxy) / sx) as u32,
            (index / sxy) as u32,
        )
    }

    pub fn contains(self, x: i64, y: i64, z: i64) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && x < self.x as i64
            && y < self.y as i64
            && z < self.z as i64
    }

    pub fn as_uvec3(self) -> UVec3 {
        UVec3::new(self.x, self.y, self.z)
    }
}

impl From<UVec3> for GridDims {
    fn from(v: UVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}
