//! Read-only field statistics and per-cell probes for logging and debugging.

use glam::Vec2;
use rayon::prelude::*;

use crate::grid::FieldState;
use crate::kernels::projection::total_abs_divergence;

/// Mask, velocity and pressure stored at one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellProbe {
    pub i: usize,
    pub j: usize,
    pub mask: i32,
    pub velocity: Vec2,
    pub pressure: f32,
}

impl CellProbe {
    pub fn read(state: &FieldState, i: usize, j: usize) -> Option<Self> {
        if i >= state.grid.width || j >= state.grid.height {
            return None;
        }
        let idx = state.grid.idx(i, j);
        Some(Self {
            i,
            j,
            mask: state.mask[idx],
            velocity: Vec2::new(state.u[idx], state.v[idx]),
            pressure: state.pressure[idx],
        })
    }
}

impl std::fmt::Display for CellProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cell ({}, {}) | mask: {} | u: ({}, {}) | p: {}",
            self.i, self.j, self.mask, self.velocity.x, self.velocity.y, self.pressure
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldStats {
    pub fluid_cells: usize,
    /// Sum of |divergence| over fluid cells, in velocity units.
    pub total_divergence: f32,
    /// Largest stored face speed `sqrt(u^2 + v^2)` over fluid cells.
    pub max_speed: f32,
    pub min_pressure: f32,
    pub max_pressure: f32,
    pub mean_pressure: f32,
}

impl FieldStats {
    pub fn compute(state: &FieldState) -> Self {
        let view = state.view();
        let fluid: Vec<usize> = (0..state.grid.cell_count())
            .into_par_iter()
            .filter(|&idx| state.mask[idx] == crate::grid::FLUID)
            .collect();
        if fluid.is_empty() {
            return Self::default();
        }

        let max_speed = fluid
            .par_iter()
            .map(|&idx| Vec2::new(state.u[idx], state.v[idx]).length())
            .reduce(|| 0.0, f32::max);
        let (min_pressure, max_pressure, sum) = fluid
            .par_iter()
            .map(|&idx| {
                let p = state.pressure[idx];
                (p, p, p as f64)
            })
            .reduce(
                || (f32::INFINITY, f32::NEG_INFINITY, 0.0),
                |a, b| (a.0.min(b.0), a.1.max(b.1), a.2 + b.2),
            );

        Self {
            fluid_cells: fluid.len(),
            total_divergence: total_abs_divergence(&view),
            max_speed,
            min_pressure,
            max_pressure,
            mean_pressure: (sum / fluid.len() as f64) as f32,
        }
    }
}

impl std::fmt::Display for FieldStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fluid={} div={:.4} max_speed={:.3} p=[{:.3}, {:.3}] mean={:.3}",
            self.fluid_cells,
            self.total_divergence,
            self.max_speed,
            self.min_pressure,
            self.max_pressure,
            self.mean_pressure
        )
    }
}
