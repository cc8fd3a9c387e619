//! One simulation tick: damp, advance, swap, then N relaxation sweeps each
//! followed by a swap.

use crate::device::FieldDevice;
use crate::error::DeviceError;
use crate::kernels::{MomentumParams, RelaxParams};

/// Solver parameters that stay fixed across ticks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickParams {
    pub pressure_relaxation: f32,
    pub over_relaxation: f32,
    pub projection_iterations: u32,
    pub viscosity: f32,
    pub cell_size: f32,
}

impl TickParams {
    pub fn momentum(&self, dt: f32) -> MomentumParams {
        MomentumParams {
            dt,
            viscosity: self.viscosity,
            cell_size: self.cell_size,
        }
    }

    pub fn relax(&self, dt: f32) -> RelaxParams {
        RelaxParams {
            dt,
            omega: self.over_relaxation,
            cell_size: self.cell_size,
        }
    }
}

/// Advance the device by one tick of length `dt`.
///
/// The sequence is fixed; sub-stepping is done by calling this repeatedly with
/// a smaller `dt`.
pub fn tick<D: FieldDevice + ?Sized>(
    device: &mut D,
    params: &TickParams,
    dt: f32,
) -> Result<(), DeviceError> {
    device.damp_pressure(params.pressure_relaxation)?;

    device.advance(&params.momentum(dt))?;
    device.swap();

    let relax = params.relax(dt);
    for _ in 0..params.projection_iterations {
        device.relax(&relax)?;
        device.swap();
    }
    Ok(())
}
