//! Compute device abstraction.
//!
//! A device owns the five fields (two `u` arenas, two `v` arenas, pressure,
//! mask) and the ping-pong index, and runs the stencil kernels over them. The
//! orchestrator, editor and session only talk to this trait, so the solver
//! sequence is identical on the rayon CPU device and the wgpu device.
//!
//! Every method takes `&mut self` (or `&self` for reads): one logical stream,
//! and no edit can interleave with an in-flight tick.

use glam::Vec2;

use crate::error::DeviceError;
use crate::grid::{CellKind, FieldState, GridSize};
use crate::kernels::{MomentumParams, RelaxParams};
use crate::stroke::Stroke;

pub trait FieldDevice {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    fn grid(&self) -> GridSize;

    /// Index of the authoritative velocity arena (0 or 1).
    fn current_buffer(&self) -> usize;

    /// Flip the velocity arenas. Pressure and mask are single-buffered.
    fn swap(&mut self);

    /// Snapshot of the current velocity arena, pressure and mask.
    fn read_all(&self) -> Result<FieldState, DeviceError>;

    /// Upload a full state; velocity goes into both arenas.
    fn write_all(&mut self, state: &FieldState) -> Result<(), DeviceError>;

    /// Read one specific velocity arena as `(u, v)`.
    fn read_velocity(&self, buffer: usize) -> Result<(Vec<f32>, Vec<f32>), DeviceError>;

    fn read_mask(&self) -> Result<Vec<i32>, DeviceError>;

    /// `p *= factor` over the whole grid.
    fn damp_pressure(&mut self, factor: f32) -> Result<(), DeviceError>;

    /// Momentum pass: current arena in, next arena out. Caller swaps.
    fn advance(&mut self, params: &MomentumParams) -> Result<(), DeviceError>;

    /// One relaxation sweep: current arena in, next arena out. Caller swaps.
    fn relax(&mut self, params: &RelaxParams) -> Result<(), DeviceError>;

    /// Force injection into the current arena, in place.
    fn apply_velocity(&mut self, stroke: &Stroke, velocity: Vec2) -> Result<(), DeviceError>;

    /// Mask painting, in place.
    fn paint_mask(&mut self, stroke: &Stroke, kind: CellKind) -> Result<(), DeviceError>;
}

/// Check an upload against the device grid before touching any buffer.
pub fn check_upload(grid: GridSize, state: &FieldState) -> Result<(), DeviceError> {
    if state.grid != grid {
        return Err(DeviceError::GridMismatch {
            expected: grid,
            actual: state.grid,
        });
    }
    let n = grid.cell_count();
    for len in [state.u.len(), state.v.len(), state.pressure.len(), state.mask.len()] {
        if len != n {
            return Err(DeviceError::UploadSize {
                expected: n,
                actual: len,
            });
        }
    }
    Ok(())
}
