//! Host-memory device running the reference kernels with rayon.

use glam::Vec2;

use crate::device::{check_upload, FieldDevice};
use crate::error::DeviceError;
use crate::grid::{CellKind, FieldState, GridSize, PingPong};
use crate::kernels::{edit, momentum, projection, MomentumParams, RelaxParams, RelaxScratch};
use crate::mask::FieldView;
use crate::stroke::Stroke;

/// Five host-resident fields plus the ping-pong index.
pub struct CpuDevice {
    grid: GridSize,
    u: [Vec<f32>; 2],
    v: [Vec<f32>; 2],
    pressure: Vec<f32>,
    mask: Vec<i32>,
    scratch: RelaxScratch,
    buffers: PingPong,
}

impl CpuDevice {
    /// Allocate zeroed fields for `grid`.
    pub fn new(grid: GridSize) -> Self {
        let FieldState { u, v, pressure, mask, .. } = FieldState::zeroed(grid);
        Self {
            grid,
            u: [u.clone(), u],
            v: [v.clone(), v],
            pressure,
            mask,
            scratch: RelaxScratch::new(grid),
            buffers: PingPong::default(),
        }
    }
}

/// Split borrow of the arenas: (current u, current v, next u, next v).
fn split_arenas<'a>(
    u: &'a mut [Vec<f32>; 2],
    v: &'a mut [Vec<f32>; 2],
    current: usize,
) -> (&'a [f32], &'a [f32], &'a mut [f32], &'a mut [f32]) {
    let [u0, u1] = u;
    let [v0, v1] = v;
    if current == 0 {
        (u0.as_slice(), v0.as_slice(), u1.as_mut_slice(), v1.as_mut_slice())
    } else {
        (u1.as_slice(), v1.as_slice(), u0.as_mut_slice(), v0.as_mut_slice())
    }
}

impl FieldDevice for CpuDevice {
    fn name(&self) -> &str {
        "cpu"
    }

    fn grid(&self) -> GridSize {
        self.grid
    }

    fn current_buffer(&self) -> usize {
        self.buffers.current()
    }

    fn swap(&mut self) {
        self.buffers.swap();
    }

    fn read_all(&self) -> Result<FieldState, DeviceError> {
        let cur = self.buffers.current();
        Ok(FieldState {
            grid: self.grid,
            u: self.u[cur].clone(),
            v: self.v[cur].clone(),
            pressure: self.pressure.clone(),
            mask: self.mask.clone(),
        })
    }

    fn write_all(&mut self, state: &FieldState) -> Result<(), DeviceError> {
        check_upload(self.grid, state)?;
        for buffer in 0..2 {
            self.u[buffer].copy_from_slice(&state.u);
            self.v[buffer].copy_from_slice(&state.v);
        }
        self.pressure.copy_from_slice(&state.pressure);
        self.mask.copy_from_slice(&state.mask);
        Ok(())
    }

    fn read_velocity(&self, buffer: usize) -> Result<(Vec<f32>, Vec<f32>), DeviceError> {
        if buffer > 1 {
            return Err(DeviceError::Backend(format!("no velocity buffer {}", buffer)));
        }
        Ok((self.u[buffer].clone(), self.v[buffer].clone()))
    }

    fn read_mask(&self) -> Result<Vec<i32>, DeviceError> {
        Ok(self.mask.clone())
    }

    fn damp_pressure(&mut self, factor: f32) -> Result<(), DeviceError> {
        projection::damp_pressure(&mut self.pressure, factor);
        Ok(())
    }

    fn advance(&mut self, params: &MomentumParams) -> Result<(), DeviceError> {
        let (u, v, u_next, v_next) =
            split_arenas(&mut self.u, &mut self.v, self.buffers.current());
        momentum::advance(
            FieldView::new(self.grid, u, v, &self.mask),
            u_next,
            v_next,
            params,
        );
        Ok(())
    }

    fn relax(&mut self, params: &RelaxParams) -> Result<(), DeviceError> {
        let (u, v, u_next, v_next) =
            split_arenas(&mut self.u, &mut self.v, self.buffers.current());
        u_next.copy_from_slice(u);
        v_next.copy_from_slice(v);
        projection::relax_in_place(
            self.grid,
            &self.mask,
            u_next,
            v_next,
            &mut self.pressure,
            &mut self.scratch,
            params,
        );
        Ok(())
    }

    fn apply_velocity(&mut self, stroke: &Stroke, velocity: Vec2) -> Result<(), DeviceError> {
        let cur = self.buffers.current();
        edit::apply_velocity(
            self.grid,
            &self.mask,
            &mut self.u[cur],
            &mut self.v[cur],
            stroke,
            velocity,
        );
        Ok(())
    }

    fn paint_mask(&mut self, stroke: &Stroke, kind: CellKind) -> Result<(), DeviceError> {
        let cur = self.buffers.current();
        edit::paint_mask(
            self.grid,
            &mut self.mask,
            &mut self.u[cur],
            &mut self.v[cur],
            stroke,
            kind,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_device_is_zeroed() {
        let device = CpuDevice::new(GridSize::new(8, 8));
        let state = device.read_all().unwrap();
        assert_eq!(state, FieldState::zeroed(GridSize::new(8, 8)));
        assert_eq!(device.current_buffer(), 0);
    }

    #[test]
    fn test_write_all_fills_both_buffers() {
        let grid = GridSize::new(8, 8);
        let mut device = CpuDevice::new(grid);
        let mut state = FieldState::open(grid);
        state.u.fill(1.5);
        state.v.fill(-0.5);
        device.write_all(&state).unwrap();
        for buffer in 0..2 {
            let (u, v) = device.read_velocity(buffer).unwrap();
            assert!(u.iter().all(|&x| x == 1.5));
            assert!(v.iter().all(|&x| x == -0.5));
        }
    }

    #[test]
    fn test_write_all_rejects_wrong_grid() {
        let mut device = CpuDevice::new(GridSize::new(8, 8));
        let state = FieldState::open(GridSize::new(16, 8));
        assert!(matches!(
            device.write_all(&state),
            Err(DeviceError::GridMismatch { .. })
        ));
    }

    #[test]
    fn test_advance_writes_next_buffer_only() {
        let grid = GridSize::new(16, 16);
        let mut device = CpuDevice::new(grid);
        let mut state = FieldState::open(grid);
        state.close_ring();
        state.u[grid.idx(8, 8)] = 1.0;
        device.write_all(&state).unwrap();

        let params = MomentumParams {
            dt: 0.002,
            viscosity: 0.5,
            cell_size: 0.1,
        };
        device.advance(&params).unwrap();
        let (u_cur, _) = device.read_velocity(0).unwrap();
        let (u_next, _) = device.read_velocity(1).unwrap();
        assert_eq!(u_cur, state.u);
        assert_ne!(u_next, state.u);

        device.swap();
        assert_eq!(device.current_buffer(), 1);
        assert_eq!(device.read_all().unwrap().u, u_next);
    }
}
