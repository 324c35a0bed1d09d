use glam::{IVec3, Vec3};

use crate::constants::{Q, TAU_MAX, TAU_MIN};

/// D3Q19 discrete velocities. Index order is fixed and shared with the WGSL
/// kernels: rest, the 6 faces, then the 12 edges.
pub const VELOCITIES: [[i32; 3]; Q] = [
    [0, 0, 0],
    // faces
    [1, 0, 0],
    [-1, 0, 0],
    [0, 1, 0],
    [0, -1, 0],
    [0, 0, 1],
    [0, 0, -1],
    // xy edges
    [1, 1, 0],
    [-1, 1, 0],
    [1, -1, 0],
    [-1, -1, 0],
    // xz edges
    [1, 0, 1],
    [-1, 0, 1],
    [1, 0, -1],
    [-1, 0, -1],
    // yz edges
    [0, 1, 1],
    [0, -1, 1],
    [0, 1, -1],
    [0, -1, -1],
];

const W0: f32 = 1.0 / 3.0;
const W1: f32 = 1.0 / 18.0;
const W2: f32 = 1.0 / 36.0;

/// Lattice weights. Sum to 1.
pub const WEIGHTS: [f32; Q] = [
    W0, W1, W1, W1, W1, W1, W1, W2, W2, W2, W2, W2, W2, W2, W2, W2, W2, W2, W2,
];

/// `OPPOSITE[i]` is the direction with `e = -e_i`. Used for bounce-back.
pub const OPPOSITE: [usize; Q] = [0, 2, 1, 4, 3, 6, 5, 10, 9, 8, 7, 14, 13, 12, 11, 18, 17, 16, 15];

/// Velocity `i` as an integer offset.
pub fn offset(i: usize) -> IVec3 {
    IVec3::from_array(VELOCITIES[i])
}

/// Velocity `i` as a float vector.
pub fn velocity(i: usize) -> Vec3 {
    offset(i).as_vec3()
}

/// `f_eq_i = w_i ρ (1 + 3 e·u + 4.5 (e·u)² − 1.5 |u|²)`
#[inline]
pub fn equilibrium(i: usize, rho: f32, u: Vec3) -> f32 {
    let eu = velocity(i).dot(u);
    let uu = u.length_squared();
    WEIGHTS[i] * rho * (1.0 + 3.0 * eu + 4.5 * eu * eu - 1.5 * uu)
}

/// Fill `out` with the 19 equilibrium populations for `(rho, u)`.
pub fn equilibrium_set(rho: f32, u: Vec3, out: &mut [f32]) {
    for (i, slot) in out.iter_mut().take(Q).enumerate() {
        *slot = equilibrium(i, rho, u);
    }
}

/// Density and velocity moments of one cell's populations.
/// Returns `u = 0` when `rho` is not positive.
pub fn moments(f: &[f32]) -> (f32, Vec3) {
    let mut rho = 0.0f32;
    let mut mom = Vec3::ZERO;
    for (i, &fi) in f.iter().take(Q).enumerate() {
        rho += fi;
        mom += velocity(i) * fi;
    }
    if rho > 0.0 {
        (rho, mom / rho)
    } else {
        (rho, Vec3::ZERO)
    }
}

/// BGK relaxation time for kinematic viscosity `nu`: `clamp(0.5 + 3ν, 0.51, 2.0)`.
pub fn relaxation_time(nu: f32) -> f32 {
    let tau = 0.5 + 3.0 * nu;
    if tau.is_nan() {
        return TAU_MIN;
    }
    tau.clamp(TAU_MIN, TAU_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let s: f32 = WEIGHTS.iter().sum();
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_opposite_negates() {
        for i in 0..Q {
            assert_eq!(offset(OPPOSITE[i]), -offset(i), "direction {i}");
            assert_eq!(OPPOSITE[OPPOSITE[i]], i);
        }
    }

    #[test]
    fn test_velocities_unique() {
        for i in 0..Q {
            for j in (i + 1)..Q {
                assert_ne!(VELOCITIES[i], VELOCITIES[j], "directions {i} and {j}");
            }
        }
    }

    #[test]
    fn test_equilibrium_moments() {
        let u = Vec3::new(0.05, -0.02, 0.01);
        let mut f = [0.0; Q];
        equilibrium_set(1.2, u, &mut f);
        let (rho, v) = moments(&f);
        assert!((rho - 1.2).abs() < 1e-5);
        assert!((v - u).length() < 1e-5);
    }

    #[test]
    fn test_rest_equilibrium_is_weights() {
        let mut f = [0.0; Q];
        equilibrium_set(1.0, Vec3::ZERO, &mut f);
        for i in 0..Q {
            assert!((f[i] - WEIGHTS[i]).abs() < 1e-7);
        }
    }

    #[test]
    fn test_relaxation_time_clamp() {
        assert!((relaxation_time(0.0) - 0.51).abs() < 1e-6);
        assert!((relaxation_time(100.0) - 2.0).abs() < 1e-6);
        assert!((relaxation_time(0.1 / 3.0) - 0.6).abs() < 1e-5);
        assert!((relaxation_time(f32::NAN) - 0.51).abs() < 1e-6);
    }
}
