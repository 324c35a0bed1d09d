use glam::Vec3;

use windtunnel_core::config::StreamwiseBoundary;
use windtunnel_core::grid::GridDims;
use windtunnel_core::mesh::Mesh;

/// Which solver (and executor) a scene drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    NavierStokes,
    LbmCpu,
    LbmGpu,
}

impl SolverKind {
    pub fn label(self) -> &'static str {
        match self {
            SolverKind::NavierStokes => "navier-stokes",
            SolverKind::LbmCpu => "lbm-cpu",
            SolverKind::LbmGpu => "lbm-gpu",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Obstacle {
    None,
    /// Axis-aligned box centred on the origin.
    Box { half_extents: Vec3 },
    /// Procedural car built from [`box_car_mesh`].
    Car,
}

/// Configuration for a single benchmark scene.
#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub name: &'static str,
    pub solver: SolverKind,
    pub dims: GridDims,
    pub obstacle: Obstacle,
    /// LBM only.
    pub streamwise: StreamwiseBoundary,
}

/// The standard suite. GPU scenes are included only when requested.
pub fn standard_scenes(include_gpu: bool) -> Vec<SceneConfig> {
    let mut scenes = vec![
        SceneConfig {
            name: "ns-empty-32",
            solver: SolverKind::NavierStokes,
            dims: GridDims::cube(32),
            obstacle: Obstacle::None,
            streamwise: StreamwiseBoundary::InletOutlet,
        },
        SceneConfig {
            name: "ns-car-32",
            solver: SolverKind::NavierStokes,
            dims: GridDims::cube(32),
            obstacle: Obstacle::Car,
            streamwise: StreamwiseBoundary::InletOutlet,
        },
        SceneConfig {
            name: "lbm-cpu-box-64",
            solver: SolverKind::LbmCpu,
            dims: GridDims::new(64, 32, 32),
            obstacle: Obstacle::Box {
                half_extents: Vec3::new(0.5, 0.5, 0.5),
            },
            streamwise: StreamwiseBoundary::InletOutlet,
        },
        SceneConfig {
            name: "lbm-cpu-car-periodic-64",
            solver: SolverKind::LbmCpu,
            dims: GridDims::new(64, 32, 32),
            obstacle: Obstacle::Car,
            streamwise: StreamwiseBoundary::Periodic,
        },
    ];

    if include_gpu {
        scenes.extend([
            SceneConfig {
                name: "lbm-gpu-car-64",
                solver: SolverKind::LbmGpu,
                dims: GridDims::new(64, 32, 32),
                obstacle: Obstacle::Car,
                streamwise: StreamwiseBoundary::InletOutlet,
            },
            SceneConfig {
                name: "lbm-gpu-car-128",
                solver: SolverKind::LbmGpu,
                dims: GridDims::new(128, 64, 64),
                obstacle: Obstacle::Car,
                streamwise: StreamwiseBoundary::InletOutlet,
            },
        ]);
    }

    scenes
}

/// Append an axis-aligned cuboid as 8 vertices and 12 outward-wound faces.
fn push_cuboid(mesh: &mut Mesh, center: Vec3, half: Vec3) {
    let part = Mesh::cuboid(half);
    let base = mesh.vertices.len() as u32;
    mesh.vertices
        .extend(part.vertices.iter().map(|&v| v + center));
    mesh.faces
        .extend(part.faces.iter().map(|f| [f[0] + base, f[1] + base, f[2] + base]));
}

/// A closed two-box car in normalized model space: a long low body with a
/// shorter cabin resting on top. The boxes touch but do not overlap, so
/// crossing parity stays valid.
pub fn box_car_mesh() -> Mesh {
    let mut mesh = Mesh::default();
    push_cuboid(&mut mesh, Vec3::new(0.0, -0.3, 0.0), Vec3::new(0.9, 0.25, 0.4));
    push_cuboid(&mut mesh, Vec3::new(-0.1, 0.15, 0.0), Vec3::new(0.45, 0.2, 0.35));
    mesh
}
