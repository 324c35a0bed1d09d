use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_LBM_SUBSTEPS, DEFAULT_SOLVER_ITERATIONS};
use crate::error::SimError;
use crate::grid::GridDims;
use crate::mesh::ModelTransform;
use crate::solid::WorldDomain;

/// Navier–Stokes cube parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeConfig {
    pub dims: GridDims,
    pub diffusion: f32,
    pub viscosity: f32,
    pub dt: f32,
    /// Gauss-Seidel passes per linear solve.
    pub iterations: u32,
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            dims: GridDims::cube(32),
            diffusion: 0.0,
            viscosity: 0.0000001,
            dt: 0.2,
            iterations: DEFAULT_SOLVER_ITERATIONS,
        }
    }
}

/// Treatment of the x (streamwise) boundary of the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StreamwiseBoundary {
    /// Wrap around like y and z.
    Periodic,
    /// Equilibrium inlet at x = 0, zero-gradient outlet at x = size_x - 1.
    #[default]
    InletOutlet,
}

/// Lattice-Boltzmann grid parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LbmConfig {
    pub dims: GridDims,
    /// Kinematic viscosity in lattice units.
    pub viscosity: f32,
    /// LBM steps per outer frame.
    pub substeps: u32,
    pub streamwise: StreamwiseBoundary,
    /// Inlet velocity in lattice units.
    pub inlet_velocity: [f32; 3],
    pub domain: WorldDomain,
}

impl Default for LbmConfig {
    fn default() -> Self {
        Self {
            dims: GridDims::new(64, 32, 32),
            viscosity: 0.02,
            substeps: DEFAULT_LBM_SUBSTEPS,
            streamwise: StreamwiseBoundary::default(),
            inlet_velocity: [0.05, 0.0, 0.0],
            domain: WorldDomain::default(),
        }
    }
}

/// Obstacle placement shared by both solvers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    pub transform: ModelTransform,
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub cube: CubeConfig,
    pub lbm: LbmConfig,
    pub obstacle: ObstacleConfig,
}

impl SimConfig {
    /// Parse a RON document. Missing fields take their defaults.
    pub fn from_ron_str(ron_str: &str) -> Result<Self, SimError> {
        let options = ron::Options::default();
        options
            .from_str(ron_str)
            .map_err(|e| SimError::ConfigParse(e.to_string()))
    }

    pub fn to_ron_string(&self) -> Result<String, SimError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SimError::ConfigParse(e.to_string()))
    }
}
