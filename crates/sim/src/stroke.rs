//! Brush strokes: a line segment swept by a radius, in cell units.
//!
//! Domain coordinates put cell `(i,j)` on the unit box `[i,i+1] x [j,j+1]`, so a
//! cursor mapped to `[0,width] x [0,height]` lands in cell `floor(pos)`. A cell
//! is covered when the distance between its box and the segment is at most
//! `radius`; a zero-radius stroke still covers every cell the segment touches.

use glam::Vec2;

use crate::grid::GridSize;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub from: Vec2,
    pub to: Vec2,
    pub radius: f32,
}

impl Stroke {
    pub fn new(from: Vec2, to: Vec2, radius: f32) -> Self {
        Self {
            from,
            to,
            radius: radius.max(0.0),
        }
    }

    /// Single-point dab.
    pub fn dab(at: Vec2, radius: f32) -> Self {
        Self::new(at, at, radius)
    }

    #[inline]
    pub fn covers(&self, i: usize, j: usize) -> bool {
        let lo = Vec2::new(i as f32, j as f32);
        segment_box_distance(self.from, self.to, lo, lo + Vec2::ONE) <= self.radius
    }

    /// Inclusive cell range that can possibly be covered, clipped to the grid.
    pub fn cell_bounds(&self, grid: GridSize) -> Option<(usize, usize, usize, usize)> {
        let lo = self.from.min(self.to) - Vec2::splat(self.radius + 1.0);
        let hi = self.from.max(self.to) + Vec2::splat(self.radius + 1.0);
        if hi.x < 0.0 || hi.y < 0.0 || lo.x >= grid.width as f32 || lo.y >= grid.height as f32 {
            return None;
        }
        let i0 = lo.x.floor().max(0.0) as usize;
        let j0 = lo.y.floor().max(0.0) as usize;
        let i1 = (hi.x.floor() as usize).min(grid.width - 1);
        let j1 = (hi.y.floor() as usize).min(grid.height - 1);
        Some((i0, i1, j0, j1))
    }
}

/// Distance from a point to a closed axis-aligned box.
#[inline]
pub fn point_box_distance(p: Vec2, lo: Vec2, hi: Vec2) -> f32 {
    (lo - p).max(p - hi).max(Vec2::ZERO).length()
}

/// Distance from a point to the segment `[a,b]`.
#[inline]
pub fn point_segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    let t = if len_sq > 0.0 {
        ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (p - (a + ab * t)).length()
}

/// Slab test: does the segment `[a,b]` touch the closed box?
fn segment_hits_box(a: Vec2, b: Vec2, lo: Vec2, hi: Vec2) -> bool {
    let d = b - a;
    let mut t_min = 0.0f32;
    let mut t_max = 1.0f32;
    for axis in 0..2 {
        let (p, dir, l, h) = (a[axis], d[axis], lo[axis], hi[axis]);
        if dir.abs() < 1e-12 {
            if p < l || p > h {
                return false;
            }
        } else {
            let t1 = (l - p) / dir;
            let t2 = (h - p) / dir;
            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
            if t_min > t_max {
                return false;
            }
        }
    }
    true
}

/// Distance between the segment `[a,b]` and a closed box.
///
/// Zero when they touch; otherwise the minimum is reached at a segment
/// endpoint or a box corner.
pub fn segment_box_distance(a: Vec2, b: Vec2, lo: Vec2, hi: Vec2) -> f32 {
    if segment_hits_box(a, b, lo, hi) {
        return 0.0;
    }
    let corners = [lo, Vec2::new(hi.x, lo.y), Vec2::new(lo.x, hi.y), hi];
    corners
        .iter()
        .map(|&c| point_segment_distance(c, a, b))
        .fold(
            point_box_distance(a, lo, hi).min(point_box_distance(b, lo, hi)),
            f32::min,
        )
}
