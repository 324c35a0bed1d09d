//! Host reference executor. Same arithmetic as the WGSL kernels, one
//! full-grid loop per kernel.

use glam::Vec3;

use windtunnel_core::constants::{FORCE_FIXED_POINT_SCALE, Q};
use windtunnel_core::error::SimError;
use windtunnel_core::grid::GridDims;
use windtunnel_core::lattice::{equilibrium, moments, OPPOSITE, VELOCITIES};

use crate::kernels::{check_len, ForceAccumulator, LatticeKernels, LbmUniforms};

pub struct CpuKernels {
    dims: GridDims,
    f: Vec<f32>,
    f_new: Vec<f32>,
    velocity: Vec<[f32; 4]>,
    solid: Vec<u32>,
}

impl CpuKernels {
    pub fn new(dims: GridDims) -> Result<Self, SimError> {
        let cells = dims.cells();
        Ok(Self {
            dims,
            f: alloc("distributions", cells * Q, 0.0)?,
            f_new: alloc("distributions", cells * Q, 0.0)?,
            velocity: alloc("velocity", cells, [0.0; 4])?,
            solid: alloc("solid mask", cells, 0)?,
        })
    }

    /// Packed `[ux, uy, uz, rho]` from the last collision.
    pub fn velocity(&self) -> &[[f32; 4]] {
        &self.velocity
    }

    pub fn distributions(&self) -> &[f32] {
        &self.f
    }

    /// Source coordinate `coord - e` on one axis. `None` when it leaves a
    /// non-periodic axis.
    #[inline]
    fn wrap(coord: u32, e: i32, size: u32, periodic: bool) -> Option<u32> {
        let s = coord as i64 - e as i64;
        let n = size as i64;
        if (0..n).contains(&s) {
            Some(s as u32)
        } else if periodic {
            Some(s.rem_euclid(n) as u32)
        } else {
            None
        }
    }

    #[inline]
    fn neighbour(&self, x: u32, y: u32, z: u32, e: [i32; 3], periodic_x: bool) -> Option<usize> {
        let d = self.dims;
        let sx = Self::wrap(x, e[0], d.x, periodic_x)?;
        let sy = Self::wrap(y, e[1], d.y, true)?;
        let sz = Self::wrap(z, e[2], d.z, true)?;
        Some(d.idx(sx, sy, sz))
    }
}

fn alloc<T: Clone>(what: &'static str, len: usize, value: T) -> Result<Vec<T>, SimError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| SimError::AllocationFailed { what, cells: len })?;
    v.resize(len, value);
    Ok(v)
}

impl LatticeKernels for CpuKernels {
    fn dims(&self) -> GridDims {
        self.dims
    }

    fn write_distributions(&mut self, f: &[f32]) -> Result<(), SimError> {
        check_len(self.f.len(), f.len())?;
        self.f.copy_from_slice(f);
        self.f_new.copy_from_slice(f);
        Ok(())
    }

    fn write_velocity(&mut self, velocity: &[[f32; 4]]) -> Result<(), SimError> {
        check_len(self.velocity.len(), velocity.len())?;
        self.velocity.copy_from_slice(velocity);
        Ok(())
    }

    fn write_solid(&mut self, solid: &[u32]) -> Result<(), SimError> {
        check_len(self.solid.len(), solid.len())?;
        self.solid.copy_from_slice(solid);
        Ok(())
    }

    fn collide(&mut self, uniforms: &LbmUniforms) {
        let sx = self.dims.x as usize;
        let inlet = Vec3::from_array(uniforms.inlet);
        let inlet_active = !uniforms.periodic_x();
        let omega = 1.0 / uniforms.tau;

        for (cell, fc) in self.f.chunks_exact_mut(Q).enumerate() {
            let (rho, u) = moments(fc);
            if self.solid[cell] != 0 {
                self.velocity[cell] = [0.0, 0.0, 0.0, rho];
                continue;
            }
            if inlet_active && cell % sx == 0 {
                for (i, fi) in fc.iter_mut().enumerate() {
                    *fi = equilibrium(i, 1.0, inlet);
                }
                self.velocity[cell] = [inlet.x, inlet.y, inlet.z, 1.0];
                continue;
            }
            for (i, fi) in fc.iter_mut().enumerate() {
                *fi -= (*fi - equilibrium(i, rho, u)) * omega;
            }
            self.velocity[cell] = [u.x, u.y, u.z, rho];
        }
    }

    fn stream(&mut self, uniforms: &LbmUniforms) {
        let periodic_x = uniforms.periodic_x();
        for cell in 0..self.dims.cells() {
            let base = cell * Q;
            if self.solid[cell] != 0 {
                self.f_new[base..base + Q].copy_from_slice(&self.f[base..base + Q]);
                continue;
            }
            let c = self.dims.coords(cell);
            for (i, &e) in VELOCITIES.iter().enumerate() {
                self.f_new[base + i] = match self.neighbour(c.x, c.y, c.z, e, periodic_x) {
                    None => self.f[base + i],
                    Some(src) if self.solid[src] != 0 => self.f[base + OPPOSITE[i]],
                    Some(src) => self.f[src * Q + i],
                };
            }
        }
    }

    fn swap(&mut self) {
        std::mem::swap(&mut self.f, &mut self.f_new);
    }

    fn momentum_exchange(&mut self, uniforms: &LbmUniforms) -> Result<ForceAccumulator, SimError> {
        let periodic_x = uniforms.periodic_x();
        let mut acc: ForceAccumulator = [0; 4];
        for cell in 0..self.dims.cells() {
            if self.solid[cell] != 0 {
                continue;
            }
            let c = self.dims.coords(cell);
            for (i, &e) in VELOCITIES.iter().enumerate().skip(1) {
                // Target of the outgoing link is c + e, i.e. a pull from -e.
                let target = self.neighbour(c.x, c.y, c.z, [-e[0], -e[1], -e[2]], periodic_x);
                let Some(n) = target else { continue };
                if self.solid[n] == 0 {
                    continue;
                }
                let fi = self.f[cell * Q + i];
                for axis in 0..3 {
                    let q = (2.0 * fi * e[axis] as f32 * FORCE_FIXED_POINT_SCALE).round() as i32;
                    acc[axis] = acc[axis].wrapping_add(q);
                }
                acc[3] = acc[3].wrapping_add(1);
            }
        }
        Ok(acc)
    }

    fn read_distributions(&mut self) -> Result<Vec<f32>, SimError> {
        Ok(self.f.clone())
    }

    fn read_velocity(&mut self) -> Result<Vec<[f32; 4]>, SimError> {
        Ok(self.velocity.clone())
    }
}
