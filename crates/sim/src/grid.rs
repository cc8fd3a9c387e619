//! Grid geometry and the host-side field snapshot.
//!
//! Staggered layout on a `width * height` lattice, row-major:
//! - `u(i,j)` sits on the left face of cell `(i,j)`
//! - `v(i,j)` sits on the bottom face of cell `(i,j)`
//! - pressure and mask sit at cell centers
//!
//! All five fields share the same `width * height` length, so a solid cell
//! `(i,j)` touches `u(i,j)`, `u(i+1,j)`, `v(i,j)` and `v(i,j+1)`.

use serde::{Deserialize, Serialize};

/// Mask value for obstacle cells.
pub const SOLID: i32 = 0;
/// Mask value for open cells.
pub const FLUID: i32 = 1;

/// Kernel dispatch tile edge. Grid dimensions must be multiples of this.
pub const TILE_SIZE: usize = 8;

/// Binary cell classification used by painting and scenario setup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Solid,
    Fluid,
}

impl CellKind {
    #[inline]
    pub fn mask_value(self) -> i32 {
        match self {
            CellKind::Solid => SOLID,
            CellKind::Fluid => FLUID,
        }
    }

    /// Interpret a stored mask value. Anything other than 0/1 is rejected.
    pub fn from_mask(value: i32) -> Option<Self> {
        match value {
            SOLID => Some(CellKind::Solid),
            FLUID => Some(CellKind::Fluid),
            _ => None,
        }
    }

    /// The other kind (paint toggle).
    pub fn toggled(self) -> Self {
        match self {
            CellKind::Solid => CellKind::Fluid,
            CellKind::Fluid => CellKind::Solid,
        }
    }
}

/// Immutable lattice dimensions for a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub width: usize,
    pub height: usize,
}

impl GridSize {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn idx(&self, i: usize, j: usize) -> usize {
        i + j * self.width
    }

    #[inline]
    pub fn contains(&self, i: i64, j: i64) -> bool {
        i >= 0 && j >= 0 && (i as usize) < self.width && (j as usize) < self.height
    }

    /// Outermost ring: `i ∈ {0, w-1}` or `j ∈ {0, h-1}`.
    #[inline]
    pub fn is_ring(&self, i: usize, j: usize) -> bool {
        i == 0 || j == 0 || i + 1 == self.width || j + 1 == self.height
    }

    /// Number of 8x8 workgroups along each axis.
    pub fn dispatch_size(&self) -> (u32, u32) {
        (
            (self.width / TILE_SIZE) as u32,
            (self.height / TILE_SIZE) as u32,
        )
    }
}

/// Which of the two velocity arenas is authoritative.
///
/// Flipping is an index change only; no data moves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PingPong {
    current: usize,
}

impl PingPong {
    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn next(&self) -> usize {
        (self.current + 1) % 2
    }

    #[inline]
    pub fn swap(&mut self) {
        self.current = self.next();
    }
}

/// Host-side copy of the full simulation state.
///
/// Velocity is one buffer's worth; uploading writes it into both arenas.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldState {
    pub grid: GridSize,
    pub u: Vec<f32>,
    pub v: Vec<f32>,
    pub pressure: Vec<f32>,
    pub mask: Vec<i32>,
}

impl FieldState {
    /// Zero velocity and pressure, every cell fluid.
    pub fn open(grid: GridSize) -> Self {
        let n = grid.cell_count();
        Self {
            grid,
            u: vec![0.0; n],
            v: vec![0.0; n],
            pressure: vec![0.0; n],
            mask: vec![FLUID; n],
        }
    }

    /// All-zero state, including the mask. Matches freshly allocated buffers.
    pub fn zeroed(grid: GridSize) -> Self {
        let n = grid.cell_count();
        Self {
            grid,
            u: vec![0.0; n],
            v: vec![0.0; n],
            pressure: vec![0.0; n],
            mask: vec![SOLID; n],
        }
    }

    /// Force the outer ring solid.
    pub fn close_ring(&mut self) {
        let GridSize { width, height } = self.grid;
        for i in 0..width {
            self.mask[i] = SOLID;
            self.mask[i + (height - 1) * width] = SOLID;
        }
        for j in 0..height {
            self.mask[j * width] = SOLID;
            self.mask[width - 1 + j * width] = SOLID;
        }
    }

    #[inline]
    pub fn mask_at(&self, i: usize, j: usize) -> i32 {
        self.mask[self.grid.idx(i, j)]
    }

    /// Borrow the velocity/mask slices as a read-only stencil view.
    pub fn view(&self) -> crate::mask::FieldView<'_> {
        crate::mask::FieldView::new(self.grid, &self.u, &self.v, &self.mask)
    }
}
