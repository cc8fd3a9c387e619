//! Reference stencil kernels.
//!
//! Each kernel is a pure function of (grid, input fields, scalar parameters)
//! evaluated independently per cell, with rows processed in parallel. The GPU
//! backend runs the same per-cell rules from `fdm.wgsl`, so these double as the
//! ground truth for backend agreement tests.

pub mod edit;
pub mod momentum;
pub mod projection;

pub use momentum::MomentumParams;
pub use projection::{Color, RelaxParams, RelaxScratch};
