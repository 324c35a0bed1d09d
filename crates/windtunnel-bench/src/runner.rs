use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;

use windtunnel_core::config::{LbmConfig, SimConfig};
use windtunnel_core::error::SimError;
use windtunnel_core::field::FlowField;
use windtunnel_core::mesh::{Aabb, Mesh, SolidShape};
use windtunnel_cube::FluidCube;
use windtunnel_lbm::{request_device, LatticeKernels, LbmGrid};

use crate::scenes::{box_car_mesh, Obstacle, SceneConfig, SolverKind};

/// Density injected per upstream cell per frame in Navier-Stokes scenes.
const NS_INFLOW_DENSITY: f32 = 10.0;
/// Streamwise velocity injected alongside it.
const NS_INFLOW_SPEED: f32 = 0.5;

/// Timing data for a single benchmark run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TimingSeries {
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Result of a single scene benchmark.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BenchmarkResult {
    pub scene_name: String,
    pub solver: String,
    pub dims: [u32; 3],
    pub solid_cells: usize,
    pub tick_count: u32,
    pub timings: TimingSeries,
    /// LBM scenes only.
    pub drag_coefficient: Option<f32>,
    /// Relative change of total mass over the run (NS: against injected mass).
    pub mass_drift: f64,
    pub max_speed: f32,
}

/// Runs every scene with the same configuration. Holds a GPU device only when
/// GPU scenes were requested.
pub struct BenchmarkRunner {
    gpu: Option<(Arc<wgpu::Device>, Arc<wgpu::Queue>)>,
    config: SimConfig,
    tick_count: u32,
}

impl BenchmarkRunner {
    pub fn new(tick_count: u32, config: SimConfig, use_gpu: bool) -> Result<Self, SimError> {
        let gpu = if use_gpu {
            Some(request_device()?)
        } else {
            None
        };
        Ok(Self {
            gpu,
            config,
            tick_count,
        })
    }

    fn solid_shape(&self, obstacle: Obstacle) -> Option<SolidShape> {
        let transform = self.config.obstacle.transform;
        match obstacle {
            Obstacle::None => None,
            Obstacle::Box { half_extents } => {
                Some(SolidShape::new(Mesh::cuboid(half_extents), transform))
            }
            Obstacle::Car => Some(SolidShape::new(box_car_mesh(), transform)),
        }
    }

    /// Run a single benchmark scene and return timing results.
    pub fn run_scene(&self, scene: &SceneConfig) -> Result<BenchmarkResult, SimError> {
        log::info!(
            "Running scene '{}' ({}, {}x{}x{})...",
            scene.name,
            scene.solver.label(),
            scene.dims.x,
            scene.dims.y,
            scene.dims.z
        );

        let result = match scene.solver {
            SolverKind::NavierStokes => self.run_cube(scene)?,
            SolverKind::LbmCpu => {
                let config = self.lbm_config(scene);
                let grid = LbmGrid::new_cpu(&config)?;
                self.run_lbm(scene, grid, |_| {})?
            }
            SolverKind::LbmGpu => {
                let (device, queue) = self.gpu.clone().ok_or_else(|| {
                    SimError::AdapterNotFound("GPU scene requested without a device".to_string())
                })?;
                let config = self.lbm_config(scene);
                let grid = LbmGrid::new_gpu(device, queue, &config)?;
                // Submissions are asynchronous; wait so frame times cover the work.
                self.run_lbm(scene, grid, |g| {
                    g.kernels().device().poll(wgpu::Maintain::Wait);
                })?
            }
        };

        log::info!(
            "  Done: mean={:.2}ms, p95={:.2}ms, p99={:.2}ms",
            result.timings.mean_ms,
            result.timings.p95_ms,
            result.timings.p99_ms
        );
        Ok(result)
    }

    fn lbm_config(&self, scene: &SceneConfig) -> LbmConfig {
        LbmConfig {
            dims: scene.dims,
            streamwise: scene.streamwise,
            ..self.config.lbm.clone()
        }
    }

    fn run_cube(&self, scene: &SceneConfig) -> Result<BenchmarkResult, SimError> {
        let mut cube_config = self.config.cube.clone();
        cube_config.dims = scene.dims;
        let shape = self.solid_shape(scene.obstacle);
        let mut cube = FluidCube::new(&cube_config, shape.as_ref())?;
        let solid_cells = cube.solid_mask().map_or(0, |m| m.solid_count());

        let dims = scene.dims;
        let (y0, y1) = (dims.y / 4, dims.y * 3 / 4);
        let (z0, z1) = (dims.z / 4, dims.z * 3 / 4);
        let mut injected = 0.0f64;

        let frame_times = time_frames(
            &mut cube,
            self.tick_count,
            |c| {
                for k in z0..z1 {
                    for j in y0..y1 {
                        c.add_density(1, j as i32, k as i32, NS_INFLOW_DENSITY);
                        c.add_velocity(1, j as i32, k as i32, NS_INFLOW_SPEED, 0.0, 0.0);
                        injected += NS_INFLOW_DENSITY as f64;
                    }
                }
            },
            |_| {},
        )?;

        let total = cube.total_density() as f64;
        let mass_drift = if injected > 0.0 {
            (total - injected) / injected
        } else {
            0.0
        };
        let snapshot = cube.snapshot()?;

        Ok(BenchmarkResult {
            scene_name: scene.name.to_string(),
            solver: scene.solver.label().to_string(),
            dims: [dims.x, dims.y, dims.z],
            solid_cells,
            tick_count: self.tick_count,
            timings: compute_timings(&frame_times),
            drag_coefficient: None,
            mass_drift,
            max_speed: snapshot.max_speed(),
        })
    }

    fn run_lbm<K: LatticeKernels>(
        &self,
        scene: &SceneConfig,
        mut grid: LbmGrid<K>,
        sync: impl FnMut(&LbmGrid<K>),
    ) -> Result<BenchmarkResult, SimError> {
        match scene.obstacle {
            Obstacle::None => {}
            Obstacle::Box { half_extents } => {
                grid.set_solid_aabb(Aabb::new(-half_extents, half_extents))?;
            }
            Obstacle::Car => {
                if let Some(shape) = self.solid_shape(scene.obstacle) {
                    grid.set_solid_from_mesh(&shape.world_triangles())?;
                }
            }
        }
        let solid_cells = grid.solid_mask().solid_count();
        let frontal_area = grid.solid_mask().frontal_area_x() as f32;

        let inlet = Vec3::from_array(grid.config().inlet_velocity);
        grid.initialize_flow(inlet)?;
        let mass_before = grid.total_mass()?;

        let frame_times = time_frames(&mut grid, self.tick_count, |_| {}, sync)?;

        let mass_after = grid.total_mass()?;
        let mass_drift = if mass_before > 0.0 {
            (mass_after - mass_before) / mass_before
        } else {
            0.0
        };
        let cd = grid.compute_drag_coefficient(inlet.length(), frontal_area)?;
        let snapshot = grid.snapshot()?;
        let dims = grid.dims();

        log::info!(
            "  Cd={:.4} (frontal area {} cells), mass drift {:.3e}",
            cd,
            frontal_area,
            mass_drift
        );

        Ok(BenchmarkResult {
            scene_name: scene.name.to_string(),
            solver: scene.solver.label().to_string(),
            dims: [dims.x, dims.y, dims.z],
            solid_cells,
            tick_count: self.tick_count,
            timings: compute_timings(&frame_times),
            drag_coefficient: Some(cd),
            mass_drift,
            max_speed: snapshot.max_speed(),
        })
    }
}

/// Advance `field` for `ticks` frames. `before` runs untimed ahead of each
/// frame; `sync` runs inside the timed window after it.
fn time_frames<F: FlowField>(
    field: &mut F,
    ticks: u32,
    mut before: impl FnMut(&mut F),
    mut sync: impl FnMut(&F),
) -> Result<Vec<f64>, SimError> {
    let mut frame_times = Vec::with_capacity(ticks as usize);
    for _ in 0..ticks {
        before(field);
        let frame_start = Instant::now();
        field.advance()?;
        sync(field);
        frame_times.push(frame_start.elapsed().as_secs_f64() * 1000.0);
    }
    Ok(frame_times)
}

/// Compute timing statistics from a list of frame times in milliseconds.
pub fn compute_timings(times: &[f64]) -> TimingSeries {
    if times.is_empty() {
        return TimingSeries {
            mean_ms: 0.0,
            median_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
        };
    }

    let mut sorted = times.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };
    let p95_idx = ((n as f64) * 0.95).ceil() as usize;
    let p99_idx = ((n as f64) * 0.99).ceil() as usize;

    TimingSeries {
        mean_ms: mean,
        median_ms: median,
        p95_ms: sorted[p95_idx.min(n - 1)],
        p99_ms: sorted[p99_idx.min(n - 1)],
        min_ms: sorted[0],
        max_ms: sorted[n - 1],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use windtunnel_core::config::StreamwiseBoundary;
    use windtunnel_core::grid::GridDims;

    fn small_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.lbm.substeps = 1;
        config
    }

    #[test]
    fn test_compute_timings_empty() {
        let t = compute_timings(&[]);
        assert_eq!(t.mean_ms, 0.0);
        assert_eq!(t.max_ms, 0.0);
    }

    #[test]
    fn test_compute_timings_stats() {
        let t = compute_timings(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(t.mean_ms, 2.5);
        assert_eq!(t.median_ms, 2.5);
        assert_eq!(t.min_ms, 1.0);
        assert_eq!(t.max_ms, 4.0);
        assert_eq!(t.p99_ms, 4.0);
    }

    #[test]
    fn test_cube_scene_runs() {
        let runner = BenchmarkRunner::new(3, small_config(), false).unwrap();
        let scene = SceneConfig {
            name: "ns-test",
            solver: SolverKind::NavierStokes,
            dims: GridDims::cube(12),
            obstacle: Obstacle::Car,
            streamwise: StreamwiseBoundary::InletOutlet,
        };
        let result = runner.run_scene(&scene).unwrap();
        assert_eq!(result.tick_count, 3);
        assert_eq!(result.dims, [12, 12, 12]);
        assert!(result.solid_cells > 0);
        assert!(result.drag_coefficient.is_none());
        assert!(result.max_speed.is_finite());
    }

    #[test]
    fn test_lbm_scene_reports_drag() {
        let runner = BenchmarkRunner::new(2, small_config(), false).unwrap();
        let scene = SceneConfig {
            name: "lbm-test",
            solver: SolverKind::LbmCpu,
            dims: GridDims::new(24, 12, 12),
            obstacle: Obstacle::Box {
                half_extents: Vec3::splat(0.6),
            },
            streamwise: StreamwiseBoundary::Periodic,
        };
        let result = runner.run_scene(&scene).unwrap();
        assert!(result.solid_cells > 0);
        assert!(result.drag_coefficient.unwrap() > 0.0);
        assert!(result.mass_drift.abs() < 1e-4);
    }

    #[test]
    fn test_gpu_scene_without_device_fails() {
        let runner = BenchmarkRunner::new(1, small_config(), false).unwrap();
        let scene = SceneConfig {
            name: "gpu",
            solver: SolverKind::LbmGpu,
            dims: GridDims::new(8, 4, 4),
            obstacle: Obstacle::None,
            streamwise: StreamwiseBoundary::Periodic,
        };
        assert!(matches!(
            runner.run_scene(&scene),
            Err(SimError::AdapterNotFound(_))
        ));
    }
}
