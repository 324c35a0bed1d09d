//! D3Q19 lattice-Boltzmann solver with interchangeable kernel executors.

pub mod buffers;
pub mod cpu;
pub mod gpu;
pub mod grid;
pub mod kernels;
pub mod passes;
pub mod readback;

pub use cpu::CpuKernels;
pub use gpu::{request_device, GpuKernels};
pub use grid::{drag_coefficient, LbmGrid};
pub use kernels::{ForceAccumulator, LatticeKernels, LbmUniforms};
