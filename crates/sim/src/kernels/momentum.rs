//! Momentum step: semi-Lagrangian advection plus explicit viscous diffusion.
//!
//! Reads the current velocity arena and writes the next one. Pressure is not
//! consulted; incompressibility is restored afterwards by the projector.

use rayon::prelude::*;

use crate::mask::FieldView;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MomentumParams {
    pub dt: f32,
    /// Kinematic viscosity.
    pub viscosity: f32,
    /// Grid spacing `h`.
    pub cell_size: f32,
}

/// Bilinear lookup on the u lattice, where sample `(a,b)` is `u(a,b)`.
fn lerp_u(view: &FieldView<'_>, x: f32, y: f32) -> f32 {
    bilinear(view, x, y, |a, b| view.u_sample(a, b))
}

/// Bilinear lookup on the v lattice, where sample `(a,b)` is `v(a,b)`.
fn lerp_v(view: &FieldView<'_>, x: f32, y: f32) -> f32 {
    bilinear(view, x, y, |a, b| view.v_sample(a, b))
}

#[inline]
fn bilinear(view: &FieldView<'_>, x: f32, y: f32, sample: impl Fn(i64, i64) -> f32) -> f32 {
    let max_x = (view.grid.width - 1) as f32;
    let max_y = (view.grid.height - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let i0 = (x.floor() as i64).min(view.grid.width as i64 - 2).max(0);
    let j0 = (y.floor() as i64).min(view.grid.height as i64 - 2).max(0);
    let tx = x - i0 as f32;
    let ty = y - j0 as f32;

    let s00 = sample(i0, j0);
    let s10 = sample(i0 + 1, j0);
    let s01 = sample(i0, j0 + 1);
    let s11 = sample(i0 + 1, j0 + 1);

    let bottom = s00 + (s10 - s00) * tx;
    let top = s01 + (s11 - s01) * tx;
    bottom + (top - bottom) * ty
}

/// Average of the four `v` faces around the `u` face `(i,j)`.
#[inline]
fn v_at_u_face(view: &FieldView<'_>, i: i64, j: i64) -> f32 {
    0.25 * (view.v_sample(i - 1, j)
        + view.v_sample(i, j)
        + view.v_sample(i - 1, j + 1)
        + view.v_sample(i, j + 1))
}

/// Average of the four `u` faces around the `v` face `(i,j)`.
#[inline]
fn u_at_v_face(view: &FieldView<'_>, i: i64, j: i64) -> f32 {
    0.25 * (view.u_sample(i, j - 1)
        + view.u_sample(i + 1, j - 1)
        + view.u_sample(i, j)
        + view.u_sample(i + 1, j))
}

/// New `u(i,j)` for a live face.
pub fn advance_u_face(view: &FieldView<'_>, i: usize, j: usize, params: &MomentumParams) -> f32 {
    let (fi, fj) = (i as i64, j as i64);
    let h = params.cell_size;
    let u = view.u[view.grid.idx(i, j)];
    let v = v_at_u_face(view, fi, fj);

    let advected = lerp_u(
        view,
        i as f32 - params.dt * u / h,
        j as f32 - params.dt * v / h,
    );

    let laplacian = view.u_sample(fi - 1, fj)
        + view.u_sample(fi + 1, fj)
        + view.u_sample(fi, fj - 1)
        + view.u_sample(fi, fj + 1)
        - 4.0 * u;

    advected + params.dt * params.viscosity * laplacian / (h * h)
}

/// New `v(i,j)` for a live face.
pub fn advance_v_face(view: &FieldView<'_>, i: usize, j: usize, params: &MomentumParams) -> f32 {
    let (fi, fj) = (i as i64, j as i64);
    let h = params.cell_size;
    let u = u_at_v_face(view, fi, fj);
    let v = view.v[view.grid.idx(i, j)];

    let advected = lerp_v(
        view,
        i as f32 - params.dt * u / h,
        j as f32 - params.dt * v / h,
    );

    let laplacian = view.v_sample(fi - 1, fj)
        + view.v_sample(fi + 1, fj)
        + view.v_sample(fi, fj - 1)
        + view.v_sample(fi, fj + 1)
        - 4.0 * v;

    advected + params.dt * params.viscosity * laplacian / (h * h)
}

/// Output `(u, v)` for cell `(i,j)`: pinned, carried through, or advanced.
#[inline]
pub fn advance_cell(
    view: &FieldView<'_>,
    i: usize,
    j: usize,
    params: &MomentumParams,
) -> (f32, f32) {
    if !view.is_fluid(i as i64, j as i64) {
        return (0.0, 0.0);
    }
    let idx = view.grid.idx(i, j);
    let u = if view.u_live(i, j) {
        advance_u_face(view, i, j, params)
    } else {
        view.u[idx]
    };
    let v = if view.v_live(i, j) {
        advance_v_face(view, i, j, params)
    } else {
        view.v[idx]
    };
    (u, v)
}

/// Full-grid momentum pass from `view` into `u_out`/`v_out`.
pub fn advance(view: FieldView<'_>, u_out: &mut [f32], v_out: &mut [f32], params: &MomentumParams) {
    let width = view.grid.width;
    u_out
        .par_chunks_mut(width)
        .zip(v_out.par_chunks_mut(width))
        .enumerate()
        .for_each(|(j, (u_row, v_row))| {
            for i in 0..width {
                let (u, v) = advance_cell(&view, i, j, params);
                u_row[i] = u;
                v_row[i] = v;
            }
        });
}
