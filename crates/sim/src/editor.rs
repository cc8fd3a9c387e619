//! Domain editing on top of the device: boundary repair and the two pointer
//! gestures (velocity drag and mask paint).

use glam::Vec2;

use crate::device::FieldDevice;
use crate::error::DeviceError;
use crate::grid::{CellKind, FieldState, GridSize, SOLID};
use crate::stroke::Stroke;

/// Zero the velocity owned by every solid interior cell.
///
/// For solid `(i,j)` this clears `u(i,j)`, `v(i,j)`, `u(i+1,j)` and `v(i,j+1)`.
/// Only the forward neighbours are touched; the backward faces of a solid cell
/// are its own `u(i,j)`/`v(i,j)`.
pub fn repair_boundary(state: &mut FieldState) -> usize {
    let grid = state.grid;
    let mut repaired = 0;
    for j in 1..grid.height.saturating_sub(1) {
        for i in 1..grid.width.saturating_sub(1) {
            if state.mask[grid.idx(i, j)] != SOLID {
                continue;
            }
            state.u[grid.idx(i, j)] = 0.0;
            state.v[grid.idx(i, j)] = 0.0;
            state.u[grid.idx(i + 1, j)] = 0.0;
            state.v[grid.idx(i, j + 1)] = 0.0;
            repaired += 1;
        }
    }
    repaired
}

/// Download, repair on the host, upload into both velocity arenas.
pub fn repair_device<D: FieldDevice + ?Sized>(device: &mut D) -> Result<usize, DeviceError> {
    let mut state = device.read_all()?;
    let repaired = repair_boundary(&mut state);
    device.write_all(&state)?;
    log::debug!("repaired {} solid cells on {}", repaired, device.name());
    Ok(repaired)
}

/// Pointer positions are accepted on the closed rectangle `[0,w] x [0,h]`.
#[inline]
pub fn in_domain(grid: GridSize, pos: Vec2) -> bool {
    pos.x >= 0.0 && pos.y >= 0.0 && pos.x <= grid.width as f32 && pos.y <= grid.height as f32
}

/// Cell under a domain-space position, if any.
#[inline]
pub fn cell_at(grid: GridSize, pos: Vec2) -> Option<(usize, usize)> {
    let (i, j) = (pos.x.floor() as i64, pos.y.floor() as i64);
    grid.contains(i, j).then(|| (i as usize, j as usize))
}

/// Velocity drag: two consecutive pointer samples become a velocity stroke.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragGesture {
    pub radius: f32,
    pub cell_size: f32,
}

impl DragGesture {
    /// `(p1 - p0) / dt * h`: cursor speed in domain units scaled by spacing.
    pub fn velocity(&self, p0: Vec2, p1: Vec2, dt: f32) -> Vec2 {
        if dt <= 0.0 {
            return Vec2::ZERO;
        }
        (p1 - p0) / dt * self.cell_size
    }

    /// Inject along `p0 -> p1`. Returns `false` when the start point is outside
    /// the domain.
    pub fn apply<D: FieldDevice + ?Sized>(
        &self,
        device: &mut D,
        p0: Vec2,
        p1: Vec2,
        dt: f32,
    ) -> Result<bool, DeviceError> {
        if !in_domain(device.grid(), p0) {
            return Ok(false);
        }
        let velocity = self.velocity(p0, p1, dt);
        device.apply_velocity(&Stroke::new(p0, p1, self.radius), velocity)?;
        Ok(true)
    }
}

/// Mask paint with the toggle rule: the first sample of a gesture decides the
/// value, which is then held until [`PaintGesture::release`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaintGesture {
    pub radius: f32,
    holding: Option<CellKind>,
}

impl PaintGesture {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            holding: None,
        }
    }

    /// Value currently being painted, if a gesture is active.
    pub fn holding(&self) -> Option<CellKind> {
        self.holding
    }

    pub fn release(&mut self) {
        self.holding = None;
    }

    /// Paint along `p0 -> p1`.
    ///
    /// On the first sample the mask under `floor(p1)` is read and its
    /// complement is held. Returns `false` (and paints nothing) when `p0` is
    /// outside the domain or the first sample has no cell under it.
    pub fn apply<D: FieldDevice + ?Sized>(
        &mut self,
        device: &mut D,
        p0: Vec2,
        p1: Vec2,
    ) -> Result<bool, DeviceError> {
        let grid = device.grid();
        if !in_domain(grid, p0) {
            return Ok(false);
        }
        let kind = match self.holding {
            Some(kind) => kind,
            None => {
                let Some((i, j)) = cell_at(grid, p1) else {
                    return Ok(false);
                };
                let mask = device.read_mask()?;
                let Some(under) = CellKind::from_mask(mask[grid.idx(i, j)]) else {
                    log::warn!("cell ({}, {}) holds non-binary mask value", i, j);
                    return Ok(false);
                };
                let kind = under.toggled();
                log::debug!("paint gesture started at ({}, {}): {:?}", i, j, kind);
                self.holding = Some(kind);
                kind
            }
        };
        device.paint_mask(&Stroke::new(p0, p1, self.radius), kind)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuDevice;
    use crate::grid::FLUID;
    use approx::assert_relative_eq;

    fn boxed_device(w: usize, h: usize) -> CpuDevice {
        let grid = GridSize::new(w, h);
        let mut state = FieldState::open(grid);
        state.close_ring();
        let mut device = CpuDevice::new(grid);
        device.write_all(&state).unwrap();
        device
    }

    #[test]
    fn test_repair_zeroes_forward_faces_only() {
        let grid = GridSize::new(8, 8);
        let mut state = FieldState::open(grid);
        state.close_ring();
        state.u.fill(1.0);
        state.v.fill(1.0);
        state.mask[grid.idx(3, 3)] = SOLID;
        repair_boundary(&mut state);

        assert_eq!(state.u[grid.idx(3, 3)], 0.0);
        assert_eq!(state.v[grid.idx(3, 3)], 0.0);
        assert_eq!(state.u[grid.idx(4, 3)], 0.0);
        assert_eq!(state.v[grid.idx(3, 4)], 0.0);
        // Backward neighbours keep their stored values
        assert_eq!(state.u[grid.idx(2, 3)], 1.0);
        assert_eq!(state.v[grid.idx(3, 2)], 1.0);
        // The v of the right neighbour is not a face of (3,3)
        assert_eq!(state.v[grid.idx(4, 3)], 1.0);
    }

    #[test]
    fn test_drag_velocity_scales_by_cell_size() {
        let drag = DragGesture {
            radius: 5.0,
            cell_size: 0.1,
        };
        let vel = drag.velocity(Vec2::new(10.0, 10.0), Vec2::new(12.0, 9.0), 0.02);
        assert_relative_eq!(vel.x, 10.0, epsilon = 1e-5);
        assert_relative_eq!(vel.y, -5.0, epsilon = 1e-5);
        assert_eq!(drag.velocity(Vec2::ZERO, Vec2::ONE, 0.0), Vec2::ZERO);
    }

    #[test]
    fn test_drag_outside_domain_is_noop() {
        let mut device = boxed_device(16, 16);
        let drag = DragGesture {
            radius: 5.0,
            cell_size: 0.1,
        };
        let before = device.read_all().unwrap();
        let applied = drag
            .apply(&mut device, Vec2::new(-3.0, 4.0), Vec2::new(5.0, 5.0), 0.02)
            .unwrap();
        assert!(!applied);
        assert_eq!(device.read_all().unwrap(), before);
    }

    #[test]
    fn test_paint_gesture_holds_first_value() {
        let mut device = boxed_device(16, 16);
        let grid = device.grid();
        let mut gesture = PaintGesture::new(0.0);

        // Starts over fluid: paints solid for the whole gesture
        let p = Vec2::new(5.5, 5.5);
        assert!(gesture.apply(&mut device, p, p).unwrap());
        assert_eq!(gesture.holding(), Some(CellKind::Solid));
        // Re-crossing the painted cell keeps painting solid
        let q = Vec2::new(6.5, 5.5);
        assert!(gesture.apply(&mut device, p, q).unwrap());
        let mask = device.read_mask().unwrap();
        assert_eq!(mask[grid.idx(5, 5)], SOLID);
        assert_eq!(mask[grid.idx(6, 5)], SOLID);

        gesture.release();
        // New gesture over a solid cell paints fluid
        assert!(gesture.apply(&mut device, p, p).unwrap());
        assert_eq!(gesture.holding(), Some(CellKind::Fluid));
        assert_eq!(device.read_mask().unwrap()[grid.idx(5, 5)], FLUID);
    }

    #[test]
    fn test_cell_at_bounds() {
        let grid = GridSize::new(16, 16);
        assert_eq!(cell_at(grid, Vec2::new(0.0, 15.9)), Some((0, 15)));
        assert_eq!(cell_at(grid, Vec2::new(16.0, 3.0)), None);
        assert!(in_domain(grid, Vec2::new(16.0, 3.0)));
        assert!(!in_domain(grid, Vec2::new(-0.1, 3.0)));
    }
}
