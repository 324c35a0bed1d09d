pub mod boundary;
pub mod cube;
pub mod stages;

pub use boundary::Boundary;
pub use cube::FluidCube;
