//! Boundary predicates shared by every stencil.
//!
//! Momentum, projection, injection and repair all decide "is this face free
//! to change" through the functions here; `shaders/fdm.wgsl` in the GPU crate
//! mirrors them line for line.
//!
//! Face classes for `u(i,j)` (and symmetrically `v(i,j)`):
//! - storing cell `(i,j)` solid: pinned to zero
//! - storing cell fluid, left neighbour solid or missing: fixed, carried through
//!   unchanged (wall = 0, scenario inflow = prescribed speed)
//! - both sides fluid: live, updated by the solvers

use crate::grid::{GridSize, FLUID};

/// Read-only view over one velocity buffer plus the mask.
#[derive(Clone, Copy)]
pub struct FieldView<'a> {
    pub grid: GridSize,
    pub u: &'a [f32],
    pub v: &'a [f32],
    pub mask: &'a [i32],
}

impl<'a> FieldView<'a> {
    pub fn new(grid: GridSize, u: &'a [f32], v: &'a [f32], mask: &'a [i32]) -> Self {
        debug_assert_eq!(u.len(), grid.cell_count());
        debug_assert_eq!(v.len(), grid.cell_count());
        debug_assert_eq!(mask.len(), grid.cell_count());
        Self { grid, u, v, mask }
    }

    #[inline]
    pub fn is_fluid(&self, i: i64, j: i64) -> bool {
        is_fluid(self.grid, self.mask, i, j)
    }

    #[inline]
    pub fn u_live(&self, i: usize, j: usize) -> bool {
        u_face_live(self.grid, self.mask, i, j)
    }

    #[inline]
    pub fn v_live(&self, i: usize, j: usize) -> bool {
        v_face_live(self.grid, self.mask, i, j)
    }

    /// `u` at a face, reading zero outside the grid or inside a solid cell.
    #[inline]
    pub fn u_sample(&self, i: i64, j: i64) -> f32 {
        if self.is_fluid(i, j) {
            self.u[self.grid.idx(i as usize, j as usize)]
        } else {
            0.0
        }
    }

    /// `v` at a face, reading zero outside the grid or inside a solid cell.
    #[inline]
    pub fn v_sample(&self, i: i64, j: i64) -> f32 {
        if self.is_fluid(i, j) {
            self.v[self.grid.idx(i as usize, j as usize)]
        } else {
            0.0
        }
    }
}

#[inline]
pub fn is_fluid(grid: GridSize, mask: &[i32], i: i64, j: i64) -> bool {
    grid.contains(i, j) && mask[grid.idx(i as usize, j as usize)] == FLUID
}

/// Both cells sharing the left face of `(i,j)` are fluid.
#[inline]
pub fn u_face_live(grid: GridSize, mask: &[i32], i: usize, j: usize) -> bool {
    i >= 1 && is_fluid(grid, mask, i as i64 - 1, j as i64) && is_fluid(grid, mask, i as i64, j as i64)
}

/// Both cells sharing the bottom face of `(i,j)` are fluid.
#[inline]
pub fn v_face_live(grid: GridSize, mask: &[i32], i: usize, j: usize) -> bool {
    j >= 1 && is_fluid(grid, mask, i as i64, j as i64 - 1) && is_fluid(grid, mask, i as i64, j as i64)
}

/// Net outflow of cell `(i,j)` in velocity units (no `1/h`).
///
/// Faces past the grid edge read as zero.
#[inline]
pub fn divergence(view: &FieldView<'_>, i: usize, j: usize) -> f32 {
    let grid = view.grid;
    let at = |field: &[f32], a: usize, b: usize| {
        if a < grid.width && b < grid.height {
            field[grid.idx(a, b)]
        } else {
            0.0
        }
    };
    at(view.u, i + 1, j) - at(view.u, i, j) + at(view.v, i, j + 1) - at(view.v, i, j)
}

/// Number of live faces around cell `(i,j)` (0..=4).
#[inline]
pub fn live_face_count(grid: GridSize, mask: &[i32], i: usize, j: usize) -> u32 {
    u_face_live(grid, mask, i, j) as u32
        + u_face_live(grid, mask, i + 1, j) as u32
        + v_face_live(grid, mask, i, j) as u32
        + v_face_live(grid, mask, i, j + 1) as u32
}
