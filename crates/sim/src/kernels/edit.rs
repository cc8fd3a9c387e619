//! In-place brush kernels: velocity injection and mask painting.

use glam::Vec2;
use rayon::prelude::*;

use crate::grid::{CellKind, GridSize};
use crate::mask::{u_face_live, v_face_live};
use crate::stroke::Stroke;

/// Set (not add) `velocity` on every live face stored in a covered cell.
///
/// Faces touching solid cells are skipped so injected momentum can never leak
/// out of an obstacle on the next momentum pass.
pub fn apply_velocity(
    grid: GridSize,
    mask: &[i32],
    u: &mut [f32],
    v: &mut [f32],
    stroke: &Stroke,
    velocity: Vec2,
) {
    let Some((i0, i1, j0, j1)) = stroke.cell_bounds(grid) else {
        return;
    };
    let width = grid.width;
    u.par_chunks_mut(width)
        .zip(v.par_chunks_mut(width))
        .enumerate()
        .skip(j0)
        .take(j1 - j0 + 1)
        .for_each(|(j, (u_row, v_row))| {
            for i in i0..=i1 {
                if !stroke.covers(i, j) {
                    continue;
                }
                if u_face_live(grid, mask, i, j) {
                    u_row[i] = velocity.x;
                }
                if v_face_live(grid, mask, i, j) {
                    v_row[i] = velocity.y;
                }
            }
        });
}

/// Paint covered interior cells with `kind`. The outer ring is never touched.
///
/// Cells turned solid lose their own stored `u`/`v`; the neighbouring faces are
/// left to the repair pass.
pub fn paint_mask(
    grid: GridSize,
    mask: &mut [i32],
    u: &mut [f32],
    v: &mut [f32],
    stroke: &Stroke,
    kind: CellKind,
) {
    let Some((i0, i1, j0, j1)) = stroke.cell_bounds(grid) else {
        return;
    };
    let i0 = i0.max(1);
    let i1 = i1.min(grid.width - 2);
    let j0 = j0.max(1);
    let j1 = j1.min(grid.height - 2);
    if i0 > i1 || j0 > j1 {
        return;
    }
    let width = grid.width;
    let value = kind.mask_value();
    mask.par_chunks_mut(width)
        .zip(u.par_chunks_mut(width))
        .zip(v.par_chunks_mut(width))
        .enumerate()
        .skip(j0)
        .take(j1 - j0 + 1)
        .for_each(|(j, ((m_row, u_row), v_row))| {
            for i in i0..=i1 {
                if !stroke.covers(i, j) {
                    continue;
                }
                m_row[i] = value;
                if kind == CellKind::Solid {
                    u_row[i] = 0.0;
                    v_row[i] = 0.0;
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{FieldState, FLUID, SOLID};

    fn boxed(w: usize, h: usize) -> FieldState {
        let mut state = FieldState::open(GridSize::new(w, h));
        state.close_ring();
        state
    }

    #[test]
    fn test_apply_velocity_sets_live_faces() {
        let mut state = boxed(16, 16);
        let grid = state.grid;
        let stroke = Stroke::dab(Vec2::new(8.5, 8.5), 1.0);
        apply_velocity(grid, &state.mask, &mut state.u, &mut state.v, &stroke, Vec2::new(3.0, -1.0));
        assert_eq!(state.u[grid.idx(8, 8)], 3.0);
        assert_eq!(state.v[grid.idx(8, 8)], -1.0);
        assert_eq!(state.u[grid.idx(9, 9)], 3.0);
        assert_eq!(state.u[grid.idx(12, 8)], 0.0);
    }

    #[test]
    fn test_apply_velocity_skips_solid_and_wall_faces() {
        let mut state = boxed(16, 16);
        let grid = state.grid;
        let stroke = Stroke::dab(Vec2::new(1.5, 1.5), 2.0);
        apply_velocity(grid, &state.mask, &mut state.u, &mut state.v, &stroke, Vec2::new(5.0, 5.0));
        assert_eq!(state.u[grid.idx(0, 1)], 0.0);
        assert_eq!(state.u[grid.idx(1, 1)], 0.0);
        assert_eq!(state.v[grid.idx(1, 1)], 0.0);
        assert_eq!(state.u[grid.idx(2, 2)], 5.0);
        assert_eq!(state.v[grid.idx(2, 2)], 5.0);
    }

    #[test]
    fn test_paint_toggles_single_cell() {
        let mut state = boxed(16, 16);
        let grid = state.grid;
        let stroke = Stroke::dab(Vec2::new(6.5, 7.5), 0.0);
        state.u[grid.idx(6, 7)] = 2.0;
        paint_mask(grid, &mut state.mask, &mut state.u, &mut state.v, &stroke, CellKind::Solid);
        assert_eq!(state.mask_at(6, 7), SOLID);
        assert_eq!(state.u[grid.idx(6, 7)], 0.0);
        assert_eq!(state.mask_at(7, 7), FLUID);

        paint_mask(grid, &mut state.mask, &mut state.u, &mut state.v, &stroke, CellKind::Fluid);
        assert_eq!(state.mask_at(6, 7), FLUID);
    }

    #[test]
    fn test_paint_never_opens_outer_ring() {
        let mut state = boxed(16, 16);
        let grid = state.grid;
        let stroke = Stroke::new(Vec2::new(0.0, 0.0), Vec2::new(16.0, 16.0), 3.0);
        paint_mask(grid, &mut state.mask, &mut state.u, &mut state.v, &stroke, CellKind::Fluid);
        for k in 0..16 {
            assert_eq!(state.mask_at(k, 0), SOLID);
            assert_eq!(state.mask_at(0, k), SOLID);
            assert_eq!(state.mask_at(k, 15), SOLID);
            assert_eq!(state.mask_at(15, k), SOLID);
        }
    }
}
