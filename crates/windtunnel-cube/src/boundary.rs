use windtunnel_core::grid::GridDims;
use windtunnel_core::solid::SolidMask;

/// Which field a boundary pass is applied to. Velocity components are
/// negated across the walls normal to their axis; everything else is copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Boundary {
    Scalar = 0,
    VelocityX = 1,
    VelocityY = 2,
    VelocityZ = 3,
}

impl Boundary {
    #[inline]
    fn sign_across(self, wall: Boundary) -> f32 {
        if self == wall {
            -1.0
        } else {
            1.0
        }
    }
}

/// Enforce wall conditions on `x`: z faces, then y faces, then x faces
/// (face interiors only), then the eight corners, then zero every solid cell.
pub fn set_bnd(dims: GridDims, b: Boundary, x: &mut [f32], solid: Option<&SolidMask>) {
    let (sx, sy, sz) = (dims.x, dims.y, dims.z);
    let ix = |i: u32, j: u32, k: u32| dims.idx(i, j, k);

    let sz_sign = b.sign_across(Boundary::VelocityZ);
    for j in 1..sy - 1 {
        for i in 1..sx - 1 {
            x[ix(i, j, 0)] = sz_sign * x[ix(i, j, 1)];
            x[ix(i, j, sz - 1)] = sz_sign * x[ix(i, j, sz - 2)];
        }
    }

    let sy_sign = b.sign_across(Boundary::VelocityY);
    for k in 1..sz - 1 {
        for i in 1..sx - 1 {
            x[ix(i, 0, k)] = sy_sign * x[ix(i, 1, k)];
            x[ix(i, sy - 1, k)] = sy_sign * x[ix(i, sy - 2, k)];
        }
    }

    let sx_sign = b.sign_across(Boundary::VelocityX);
    for k in 1..sz - 1 {
        for j in 1..sy - 1 {
            x[ix(0, j, k)] = sx_sign * x[ix(1, j, k)];
            x[ix(sx - 1, j, k)] = sx_sign * x[ix(sx - 2, j, k)];
        }
    }

    // Each corner takes the mean of its three axis neighbours.
    for &(cx, nx) in &[(0, 1), (sx - 1, sx - 2)] {
        for &(cy, ny) in &[(0, 1), (sy - 1, sy - 2)] {
            for &(cz, nz) in &[(0, 1), (sz - 1, sz - 2)] {
                x[ix(cx, cy, cz)] =
                    (x[ix(nx, cy, cz)] + x[ix(cx, ny, cz)] + x[ix(cx, cy, nz)]) / 3.0;
            }
        }
    }

    if let Some(mask) = solid {
        for i in mask.solid_indices() {
            x[i] = 0.0;
        }
    }
}
