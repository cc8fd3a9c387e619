//! Incompressibility projector: pressure damping and one red-black SOR sweep.
//!
//! Each colour runs three data-parallel phases on the *next* arena:
//!
//! 1. corrections: a fluid cell of the colour with `s` live faces and outflow
//!    `d` proposes the Gauss-Seidel correction `c = -d / s`;
//! 2. limiters: every fluid cell of the other colour works out how much of the
//!    over-relaxed remainder `(omega - 1) * c` its neighbours may push into it;
//! 3. apply: each live face moves by `c` times its gain in `[1, omega]`, and
//!    the corrected cell's pressure grows by the applied correction times `h / dt`.
//!
//! A neighbour only accepts extra flux that shrinks its own residual, and never
//! more than that residual, so total |divergence| cannot rise across a phase
//! for any `omega` in `[1, 2)`. Cells of one colour never share a face, which
//! keeps every phase a pure per-cell function.

use rayon::prelude::*;

use crate::grid::GridSize;
use crate::mask::{divergence, live_face_count, u_face_live, v_face_live, FieldView};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelaxParams {
    pub dt: f32,
    /// Over-relaxation factor in `[1, 1.99]`.
    pub omega: f32,
    pub cell_size: f32,
}

impl RelaxParams {
    /// Converts a velocity correction into accumulated pressure.
    ///
    /// Zero for a zero-length step, which then leaves pressure untouched.
    #[inline]
    pub fn pressure_scale(&self) -> f32 {
        if self.dt > 0.0 {
            self.cell_size / self.dt
        } else {
            0.0
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red = 0,
    Black = 1,
}

impl Color {
    #[inline]
    pub fn of(i: usize, j: usize) -> Self {
        if (i + j) % 2 == 0 {
            Color::Red
        } else {
            Color::Black
        }
    }
}

/// Per-cell work fields for one sweep, reused across sweeps.
#[derive(Clone, Debug, Default)]
pub struct RelaxScratch {
    pub correction: Vec<f32>,
    /// Signed acceptance of over-relaxed inflow: the sign is the cell's
    /// residual after plain Gauss-Seidel inflow, the magnitude the accepted share.
    pub limiter: Vec<f32>,
}

impl RelaxScratch {
    pub fn new(grid: GridSize) -> Self {
        let n = grid.cell_count();
        Self {
            correction: vec![0.0; n],
            limiter: vec![0.0; n],
        }
    }
}

/// `p *= factor` everywhere.
pub fn damp_pressure(pressure: &mut [f32], factor: f32) {
    pressure.par_iter_mut().for_each(|p| *p *= factor);
}

/// Cells sharing a live face with `(i,j)`: left, right, below, above.
#[inline]
fn live_neighbours(grid: GridSize, mask: &[i32], i: usize, j: usize) -> [Option<usize>; 4] {
    [
        u_face_live(grid, mask, i, j).then(|| grid.idx(i - 1, j)),
        u_face_live(grid, mask, i + 1, j).then(|| grid.idx(i + 1, j)),
        v_face_live(grid, mask, i, j).then(|| grid.idx(i, j - 1)),
        v_face_live(grid, mask, i, j + 1).then(|| grid.idx(i, j + 1)),
    ]
}

/// Plain Gauss-Seidel correction for cell `(i,j)`; zero for solid cells and
/// cells without live faces.
#[inline]
pub fn cell_correction(view: &FieldView<'_>, i: usize, j: usize) -> f32 {
    if !view.is_fluid(i as i64, j as i64) {
        return 0.0;
    }
    let s = live_face_count(view.grid, view.mask, i, j);
    if s == 0 {
        return 0.0;
    }
    -divergence(view, i, j) / s as f32
}

/// Limiter of a fluid cell whose neighbours were just given `correction`.
///
/// A neighbour with correction `c` pushes `-c` into this cell, plus an
/// over-relaxed remainder `-(omega - 1) * c`. Remainders are accepted only when
/// they point against the residual `q` left by the plain inflow, scaled so that
/// together they can at most cancel `q`.
#[inline]
pub fn cell_limiter(
    view: &FieldView<'_>,
    correction: &[f32],
    i: usize,
    j: usize,
    omega: f32,
) -> f32 {
    let neighbours = live_neighbours(view.grid, view.mask, i, j);
    let inflow: f32 = neighbours.iter().flatten().map(|&n| -correction[n]).sum();
    let q = divergence(view, i, j) + inflow;
    let extra: f32 = neighbours
        .iter()
        .flatten()
        .map(|&n| correction[n])
        .filter(|&c| -c * q < 0.0)
        .map(|c| (omega - 1.0) * c.abs())
        .sum();
    if q == 0.0 || extra <= 0.0 {
        return 0.0;
    }
    q.signum() * (q.abs() / extra).min(1.0)
}

/// Factor on correction `c` crossing a face into a cell with limiter `limiter`.
#[inline]
pub fn face_gain(omega: f32, c: f32, limiter: f32) -> f32 {
    if -c * limiter < 0.0 {
        1.0 + (omega - 1.0) * limiter.abs()
    } else {
        1.0
    }
}

/// Phase 1: corrections for every cell of `color`, zero elsewhere.
pub fn compute_corrections(view: FieldView<'_>, color: Color, correction: &mut [f32]) {
    let width = view.grid.width;
    correction
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(j, c_row)| {
            for (i, c) in c_row.iter_mut().enumerate() {
                *c = if Color::of(i, j) == color {
                    cell_correction(&view, i, j)
                } else {
                    0.0
                };
            }
        });
}

/// Phase 2: limiters for every fluid cell not of `color`, zero elsewhere.
pub fn compute_limiters(
    view: FieldView<'_>,
    color: Color,
    omega: f32,
    correction: &[f32],
    limiter: &mut [f32],
) {
    let width = view.grid.width;
    limiter
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(j, l_row)| {
            for (i, l) in l_row.iter_mut().enumerate() {
                *l = if Color::of(i, j) != color && view.is_fluid(i as i64, j as i64) {
                    cell_limiter(&view, correction, i, j, omega)
                } else {
                    0.0
                };
            }
        });
}

/// Phase 3: each live face gathers the gained corrections of its two cells,
/// and corrected cells accumulate pressure.
pub fn apply_corrections(
    grid: GridSize,
    mask: &[i32],
    scratch: &RelaxScratch,
    u: &mut [f32],
    v: &mut [f32],
    pressure: &mut [f32],
    params: &RelaxParams,
) {
    let width = grid.width;
    let omega = params.omega;
    let scale = params.pressure_scale();
    let c = scratch.correction.as_slice();
    let l = scratch.limiter.as_slice();
    // Flux across the face between `a` (left/below) and `b`
    let flux = |a: usize, b: usize| {
        c[a] * face_gain(omega, c[a], l[b]) - c[b] * face_gain(omega, c[b], l[a])
    };
    u.par_chunks_mut(width)
        .zip(v.par_chunks_mut(width))
        .zip(pressure.par_chunks_mut(width))
        .enumerate()
        .for_each(|(j, ((u_row, v_row), p_row))| {
            for i in 0..width {
                let k = grid.idx(i, j);
                if u_face_live(grid, mask, i, j) {
                    u_row[i] += flux(grid.idx(i - 1, j), k);
                }
                if v_face_live(grid, mask, i, j) {
                    v_row[i] += flux(grid.idx(i, j - 1), k);
                }
                if c[k] != 0.0 && scale != 0.0 {
                    let neighbours = live_neighbours(grid, mask, i, j);
                    let (gain, s) = neighbours
                        .iter()
                        .flatten()
                        .fold((0.0f32, 0.0f32), |(g, s), &n| {
                            (g + face_gain(omega, c[k], l[n]), s + 1.0)
                        });
                    p_row[i] += c[k] * (gain / s) * scale;
                }
            }
        });
}

/// One full red-black sweep, in place on `u`/`v`.
pub fn relax_in_place(
    grid: GridSize,
    mask: &[i32],
    u: &mut [f32],
    v: &mut [f32],
    pressure: &mut [f32],
    scratch: &mut RelaxScratch,
    params: &RelaxParams,
) {
    for color in [Color::Red, Color::Black] {
        let view = FieldView::new(grid, u, v, mask);
        compute_corrections(view, color, &mut scratch.correction);
        compute_limiters(view, color, params.omega, &scratch.correction, &mut scratch.limiter);
        apply_corrections(grid, mask, scratch, u, v, pressure, params);
    }
}

/// Sum of |divergence| over fluid cells.
pub fn total_abs_divergence(view: &FieldView<'_>) -> f32 {
    let grid = view.grid;
    (0..grid.height)
        .into_par_iter()
        .map(|j| {
            (0..grid.width)
                .filter(|&i| view.is_fluid(i as i64, j as i64))
                .map(|i| divergence(view, i, j).abs())
                .sum::<f32>()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::FieldState;
    use approx::assert_relative_eq;

    const PARAMS: RelaxParams = RelaxParams {
        dt: 0.002,
        omega: 1.0,
        cell_size: 0.1,
    };

    fn boxed(w: usize, h: usize) -> FieldState {
        let mut state = FieldState::open(GridSize::new(w, h));
        state.close_ring();
        state
    }

    fn sweep(state: &mut FieldState, params: &RelaxParams) {
        let mut scratch = RelaxScratch::new(state.grid);
        relax_in_place(
            state.grid,
            &state.mask,
            &mut state.u,
            &mut state.v,
            &mut state.pressure,
            &mut scratch,
            params,
        );
    }

    /// One colour phase of a sweep.
    fn phase(state: &mut FieldState, color: Color, params: &RelaxParams) {
        let grid = state.grid;
        let mut scratch = RelaxScratch::new(grid);
        let view = FieldView::new(grid, &state.u, &state.v, &state.mask);
        compute_corrections(view, color, &mut scratch.correction);
        compute_limiters(view, color, params.omega, &scratch.correction, &mut scratch.limiter);
        apply_corrections(
            grid,
            &state.mask,
            &scratch,
            &mut state.u,
            &mut state.v,
            &mut state.pressure,
            params,
        );
    }

    fn stirred(w: usize, h: usize) -> FieldState {
        let mut state = boxed(w, h);
        let grid = state.grid;
        for j in 2..h - 1 {
            for i in 2..w - 1 {
                state.u[grid.idx(i, j)] = ((i * 7 + j * 3) % 5) as f32 - 2.0;
                state.v[grid.idx(i, j)] = ((i * 2 + j * 5) % 3) as f32 - 1.0;
            }
        }
        state
    }

    #[test]
    fn test_damp_pressure_scales_everything() {
        let mut p = vec![2.0, -4.0, 0.0, 10.0];
        damp_pressure(&mut p, 0.5);
        assert_eq!(p, vec![1.0, -2.0, 0.0, 5.0]);
    }

    #[test]
    fn test_red_cell_divergence_removed_with_unit_omega() {
        let mut state = boxed(8, 8);
        let grid = state.grid;
        // Source in red cell (4,4): push its right face outward
        state.u[grid.idx(5, 4)] = 1.0;
        assert_relative_eq!(divergence(&state.view(), 4, 4), 1.0);

        phase(&mut state, Color::Red, &PARAMS);

        assert_relative_eq!(divergence(&state.view(), 4, 4), 0.0, epsilon = 1e-6);
        // Correction -0.25, accumulated as pressure with scale h/dt = 50
        assert_relative_eq!(state.pressure[grid.idx(4, 4)], -12.5, epsilon = 1e-4);
    }

    #[test]
    fn test_over_relaxation_only_crosses_into_opposing_residual() {
        let mut state = boxed(8, 8);
        let grid = state.grid;
        // Red (4,4) gains +1, black (5,4) loses 1
        state.u[grid.idx(5, 4)] = 1.0;
        let params = RelaxParams {
            omega: 1.5,
            ..PARAMS
        };

        phase(&mut state, Color::Red, &params);

        let view = state.view();
        // Only the face into (5,4) carries the extra half correction
        assert_relative_eq!(divergence(&view, 4, 4), -0.125, epsilon = 1e-6);
        assert_relative_eq!(divergence(&view, 5, 4), -0.625, epsilon = 1e-6);
        for (i, j) in [(3, 4), (4, 3), (4, 5)] {
            assert_relative_eq!(divergence(&view, i, j), 0.25, epsilon = 1e-6);
        }
        assert_relative_eq!(state.pressure[grid.idx(4, 4)], -0.25 * 1.125 * 50.0, epsilon = 1e-4);
        assert_relative_eq!(total_abs_divergence(&view), 1.5, epsilon = 1e-5);
    }

    #[test]
    fn test_phases_never_raise_divergence_at_high_omega() {
        for omega in [1.5, 1.95, 1.99] {
            let mut state = stirred(16, 16);
            let params = RelaxParams { omega, ..PARAMS };
            let mut prev = total_abs_divergence(&state.view());
            for step in 0..40 {
                for color in [Color::Red, Color::Black] {
                    phase(&mut state, color, &params);
                    let after = total_abs_divergence(&state.view());
                    assert!(
                        after <= prev * 1.0001 + 1e-5,
                        "omega {} step {} {:?}: {} -> {}",
                        omega,
                        step,
                        color,
                        prev,
                        after
                    );
                    prev = after;
                }
            }
        }
    }

    #[test]
    fn test_zero_dt_leaves_pressure_untouched() {
        let mut state = stirred(8, 8);
        let params = RelaxParams { dt: 0.0, ..PARAMS };
        assert_eq!(params.pressure_scale(), 0.0);
        sweep(&mut state, &params);
        assert!(state.pressure.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_sweep_never_touches_wall_faces() {
        let mut state = boxed(8, 8);
        let grid = state.grid;
        state.u[grid.idx(2, 3)] = 4.0;
        state.v[grid.idx(5, 2)] = -1.0;
        for _ in 0..5 {
            sweep(&mut state, &PARAMS);
        }
        for j in 0..8 {
            assert_eq!(state.u[grid.idx(1, j)], 0.0);
            assert_eq!(state.u[grid.idx(7, j)], 0.0);
        }
        for i in 0..8 {
            assert_eq!(state.v[grid.idx(i, 1)], 0.0);
            assert_eq!(state.v[grid.idx(i, 7)], 0.0);
        }
    }

    #[test]
    fn test_sweeps_reduce_total_divergence() {
        let mut state = boxed(16, 16);
        let grid = state.grid;
        for j in 4..12 {
            for i in 4..12 {
                state.u[grid.idx(i, j)] = ((i * 7 + j * 3) % 5) as f32 - 2.0;
                state.v[grid.idx(i, j)] = ((i * 2 + j * 5) % 3) as f32 - 1.0;
            }
        }
        let initial = total_abs_divergence(&state.view());
        assert!(initial > 0.0);

        let params = RelaxParams {
            omega: 1.5,
            ..PARAMS
        };
        for _ in 0..200 {
            sweep(&mut state, &params);
        }
        let after = total_abs_divergence(&state.view());
        assert!(after < initial * 0.1, "initial {} after {}", initial, after);
    }
}
