//! Stable-fluids operators over flat `f32` fields sharing one [`GridDims`].

use windtunnel_core::grid::GridDims;
use windtunnel_core::solid::SolidMask;

use crate::boundary::{set_bnd, Boundary};

/// Gauss-Seidel relaxation of `x = (x0 + a * sum(6 neighbours)) / c` over the
/// interior, `iterations` full passes with a boundary pass after each.
#[allow(clippy::too_many_arguments)]
pub fn lin_solve(
    dims: GridDims,
    b: Boundary,
    x: &mut [f32],
    x0: &[f32],
    a: f32,
    c: f32,
    iterations: u32,
    solid: Option<&SolidMask>,
) {
    let c_recip = 1.0 / c;
    let sx = dims.x as usize;
    let sxy = sx * dims.y as usize;
    for _ in 0..iterations {
        for k in 1..dims.z - 1 {
            for j in 1..dims.y - 1 {
                for i in 1..dims.x - 1 {
                    let n = dims.idx(i, j, k);
                    x[n] = (x0[n]
                        + a * (x[n + 1]
                            + x[n - 1]
                            + x[n + sx]
                            + x[n - sx]
                            + x[n + sxy]
                            + x[n - sxy]))
                        * c_recip;
                }
            }
        }
        set_bnd(dims, b, x, solid);
    }
}

/// Implicit diffusion of `x0` into `x`. `x` holds the initial guess.
#[allow(clippy::too_many_arguments)]
pub fn diffuse(
    dims: GridDims,
    b: Boundary,
    x: &mut [f32],
    x0: &[f32],
    diff: f32,
    dt: f32,
    iterations: u32,
    solid: Option<&SolidMask>,
) {
    let a = dt * diff * (dims.x - 2) as f32 * (dims.y - 2) as f32 * (dims.z - 2) as f32;
    lin_solve(dims, b, x, x0, a, 1.0 + 6.0 * a, iterations, solid);
    set_bnd(dims, b, x, solid);
}

/// Remove the divergent part of `(vx, vy, vz)` using `p` and `div` as scratch.
#[allow(clippy::too_many_arguments)]
pub fn project(
    dims: GridDims,
    vx: &mut [f32],
    vy: &mut [f32],
    vz: &mut [f32],
    p: &mut [f32],
    div: &mut [f32],
    iterations: u32,
    solid: Option<&SolidMask>,
) {
    let sx = dims.x as usize;
    let sxy = sx * dims.y as usize;
    let size_sum = (dims.x + dims.y + dims.z) as f32;

    for k in 1..dims.z - 1 {
        for j in 1..dims.y - 1 {
            for i in 1..dims.x - 1 {
                let n = dims.idx(i, j, k);
                div[n] = -0.5
                    * (vx[n + 1] - vx[n - 1] + vy[n + sx] - vy[n - sx] + vz[n + sxy]
                        - vz[n - sxy])
                    / size_sum;
                p[n] = 0.0;
            }
        }
    }
    set_bnd(dims, Boundary::Scalar, div, solid);
    set_bnd(dims, Boundary::Scalar, p, solid);

    lin_solve(dims, Boundary::Scalar, p, div, 1.0, 6.0, iterations, solid);

    let (fx, fy, fz) = (dims.x as f32, dims.y as f32, dims.z as f32);
    for k in 1..dims.z - 1 {
        for j in 1..dims.y - 1 {
            for i in 1..dims.x - 1 {
                let n = dims.idx(i, j, k);
                vx[n] -= 0.5 * (p[n + 1] - p[n - 1]) * fx;
                vy[n] -= 0.5 * (p[n + sx] - p[n - sx]) * fy;
                vz[n] -= 0.5 * (p[n + sxy] - p[n - sxy]) * fz;
            }
        }
    }
    set_bnd(dims, Boundary::VelocityX, vx, solid);
    set_bnd(dims, Boundary::VelocityY, vy, solid);
    set_bnd(dims, Boundary::VelocityZ, vz, solid);
}

/// Semi-Lagrangian transport of `d0` into `d` along `(vx, vy, vz)`.
///
/// Backtraced positions are clamped to `[0.5, size - 1.5]` per axis so both
/// trilinear taps stay inside the grid.
#[allow(clippy::too_many_arguments)]
pub fn advect(
    dims: GridDims,
    b: Boundary,
    d: &mut [f32],
    d0: &[f32],
    vx: &[f32],
    vy: &[f32],
    vz: &[f32],
    dt: f32,
    solid: Option<&SolidMask>,
) {
    let dtx = dt * (dims.x - 2) as f32;
    let dty = dt * (dims.y - 2) as f32;
    let dtz = dt * (dims.z - 2) as f32;
    let max_x = dims.x as f32 - 1.5;
    let max_y = dims.y as f32 - 1.5;
    let max_z = dims.z as f32 - 1.5;

    for k in 1..dims.z - 1 {
        for j in 1..dims.y - 1 {
            for i in 1..dims.x - 1 {
                let n = dims.idx(i, j, k);
                let x = (i as f32 - dtx * vx[n]).clamp(0.5, max_x);
                let y = (j as f32 - dty * vy[n]).clamp(0.5, max_y);
                let z = (k as f32 - dtz * vz[n]).clamp(0.5, max_z);

                let (i0, j0, k0) = (x.floor(), y.floor(), z.floor());
                let (s1, t1, u1) = (x - i0, y - j0, z - k0);
                let (s0, t0, u0) = (1.0 - s1, 1.0 - t1, 1.0 - u1);
                let (i0, j0, k0) = (i0 as u32, j0 as u32, k0 as u32);
                let (i1, j1, k1) = (i0 + 1, j0 + 1, k0 + 1);

                let at = |a: u32, b: u32, c: u32| d0[dims.idx(a, b, c)];
                d[n] = s0
                    * (t0 * (u0 * at(i0, j0, k0) + u1 * at(i0, j0, k1))
                        + t1 * (u0 * at(i0, j1, k0) + u1 * at(i0, j1, k1)))
                    + s1 * (t0 * (u0 * at(i1, j0, k0) + u1 * at(i1, j0, k1))
                        + t1 * (u0 * at(i1, j1, k0) + u1 * at(i1, j1, k1)));
            }
        }
    }
    set_bnd(dims, b, d, solid);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lin_solve_zero_coupling_copies_source() {
        let dims = GridDims::cube(5);
        let x0: Vec<f32> = (0..dims.cells()).map(|i| (i % 7) as f32).collect();
        let mut x = vec![0.0; dims.cells()];
        lin_solve(dims, Boundary::Scalar, &mut x, &x0, 0.0, 1.0, 4, None);
        let n = dims.idx(2, 2, 2);
        assert_eq!(x[n], x0[n]);
    }

    #[test]
    fn test_advect_zero_velocity_is_identity() {
        let dims = GridDims::cube(6);
        let d0: Vec<f32> = (0..dims.cells()).map(|i| (i % 11) as f32 * 0.5).collect();
        let zero = vec![0.0; dims.cells()];
        let mut d = vec![0.0; dims.cells()];
        advect(dims, Boundary::Scalar, &mut d, &d0, &zero, &zero, &zero, 0.1, None);
        for k in 1..5 {
            for j in 1..5 {
                for i in 1..5 {
                    let n = dims.idx(i, j, k);
                    assert_eq!(d[n], d0[n]);
                }
            }
        }
    }

    #[test]
    fn test_advect_clamps_backtrace() {
        let dims = GridDims::cube(5);
        let d0 = vec![2.0; dims.cells()];
        // Huge velocity pushes every backtrace far outside the grid.
        let v = vec![1.0e6; dims.cells()];
        let neg = vec![-1.0e6; dims.cells()];
        let mut d = vec![0.0; dims.cells()];
        advect(dims, Boundary::Scalar, &mut d, &d0, &v, &neg, &v, 1.0, None);
        for k in 1..4 {
            for j in 1..4 {
                for i in 1..4 {
                    assert!((d[dims.idx(i, j, k)] - 2.0).abs() < 1e-5);
                }
            }
        }
        assert!((d[dims.idx(0, 2, 2)] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_project_corrects_divergent_field() {
        let dims = GridDims::cube(8);
        let n = dims.cells();
        let mut vx = vec![0.0; n];
        let mut vy = vec![0.0; n];
        let mut vz = vec![0.0; n];
        vx[dims.idx(4, 4, 4)] = 1.0;
        vx[dims.idx(3, 4, 4)] = -1.0;
        let original = vx.clone();
        let mut p = vec![0.0; n];
        let mut div = vec![0.0; n];
        project(dims, &mut vx, &mut vy, &mut vz, &mut p, &mut div, 4, None);

        assert!(p.iter().any(|&v| v != 0.0));
        assert!(vx.iter().zip(&original).any(|(a, b)| a != b));
        assert!(vx.iter().chain(&vy).chain(&vz).all(|v| v.is_finite()));
        // Walls normal to x negate the x component.
        assert_eq!(vx[dims.idx(0, 4, 4)], -vx[dims.idx(1, 4, 4)]);
    }
}
