pub mod classifier;
pub mod config;
pub mod constants;
pub mod error;
pub mod field;
pub mod grid;
pub mod lattice;
pub mod mesh;
pub mod solid;

pub use config::{CubeConfig, LbmConfig, ObstacleConfig, SimConfig, StreamwiseBoundary};
pub use error::SimError;
pub use field::{FieldSnapshot, FlowField};
pub use grid::GridDims;
pub use mesh::{Aabb, Mesh, ModelTransform, SolidShape, Triangle};
pub use solid::{SolidMask, WorldDomain};
