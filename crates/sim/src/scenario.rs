//! Preset initial states.
//!
//! Every preset starts from zero velocity and pressure, an all-fluid mask and a
//! solid outer ring, then adds its own inflow or walls. Generation depends on
//! the grid dimensions only.

use serde::{Deserialize, Serialize};

use crate::grid::{FieldState, GridSize, SOLID};

/// Half-width of each scenario 4 inlet ribbon, in normalised row units.
pub const RIBBON_HALF_WIDTH: f32 = 0.1225;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    /// Closed empty box.
    Empty,
    /// Uniform horizontal flow `u = 10`.
    WindTunnel,
    /// Horizontal jet `u = 15` through the middle fifth of the rows.
    WindPipe,
    /// Fast and slow inlet ribbons separated by a thin wall.
    LaminarVsTurbulent,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Empty,
        Scenario::WindTunnel,
        Scenario::WindPipe,
        Scenario::LaminarVsTurbulent,
    ];

    /// Look up a preset by its number key. Unknown ids fall back to the
    /// empty box.
    pub fn from_id(id: u32) -> Self {
        match id {
            2 => Scenario::WindTunnel,
            3 => Scenario::WindPipe,
            4 => Scenario::LaminarVsTurbulent,
            _ => Scenario::Empty,
        }
    }

    pub fn id(self) -> u32 {
        match self {
            Scenario::Empty => 1,
            Scenario::WindTunnel => 2,
            Scenario::WindPipe => 3,
            Scenario::LaminarVsTurbulent => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Scenario::Empty => "empty",
            Scenario::WindTunnel => "wind tunnel",
            Scenario::WindPipe => "wind pipe",
            Scenario::LaminarVsTurbulent => "laminar vs turbulent",
        }
    }

    pub fn generate(self, grid: GridSize) -> ScenarioState {
        let mut state = FieldState::open(grid);
        state.close_ring();
        let mut base_render_speed = 0.0;

        match self {
            Scenario::Empty => {}
            Scenario::WindTunnel => {
                state.u.fill(10.0);
                base_render_speed = 10.0;
            }
            Scenario::WindPipe => {
                let (lo, hi) = (grid.height as f32 * 0.4, grid.height as f32 * 0.6);
                for j in 0..grid.height {
                    let y = j as f32;
                    if y > lo && y < hi {
                        let row = j * grid.width;
                        state.u[row..row + grid.width].fill(15.0);
                    }
                }
            }
            Scenario::LaminarVsTurbulent => laminar_vs_turbulent(&mut state),
        }

        ScenarioState {
            scenario: self,
            state,
            base_render_speed,
        }
    }
}

fn laminar_vs_turbulent(state: &mut FieldState) {
    let grid = state.grid;
    let height = grid.height as f32;
    for j in 0..grid.height {
        let y = (j as f32 + 0.5) / height;
        let inflow = if (y - 0.755).abs() <= RIBBON_HALF_WIDTH {
            Some(25.0)
        } else if (y - 0.245).abs() <= RIBBON_HALF_WIDTH {
            Some(5.0)
        } else {
            None
        };
        match inflow {
            Some(speed) => {
                state.u[grid.idx(1, j)] = speed;
                state.u[grid.idx(grid.width - 1, j)] = speed;
            }
            None => {
                let row = j as f32;
                if row > height * 0.49 && row < height * 0.51 {
                    let start = j * grid.width;
                    state.mask[start..start + grid.width].fill(SOLID);
                }
            }
        }
    }
}

/// Generated fields plus the visualisation reference speed.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioState {
    pub scenario: Scenario,
    pub state: FieldState,
    pub base_render_speed: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::FLUID;

    #[test]
    fn test_ids_round_trip_and_unknown_falls_back() {
        for scenario in Scenario::ALL {
            assert_eq!(Scenario::from_id(scenario.id()), scenario);
        }
        assert_eq!(Scenario::from_id(0), Scenario::Empty);
        assert_eq!(Scenario::from_id(9), Scenario::Empty);
    }

    #[test]
    fn test_wind_tunnel_sets_render_speed() {
        let generated = Scenario::WindTunnel.generate(GridSize::new(16, 16));
        assert_eq!(generated.base_render_speed, 10.0);
        assert!(generated.state.u.iter().all(|&u| u == 10.0));
        assert!(generated.state.v.iter().all(|&v| v == 0.0));
        assert_eq!(Scenario::WindPipe.generate(GridSize::new(16, 16)).base_render_speed, 0.0);
    }

    #[test]
    fn test_wind_pipe_rows() {
        let grid = GridSize::new(16, 40);
        let state = Scenario::WindPipe.generate(grid).state;
        // 0.4 * 40 = 16 and 0.6 * 40 = 24 are both excluded
        assert_eq!(state.u[grid.idx(3, 16)], 0.0);
        assert_eq!(state.u[grid.idx(3, 17)], 15.0);
        assert_eq!(state.u[grid.idx(3, 23)], 15.0);
        assert_eq!(state.u[grid.idx(3, 24)], 0.0);
    }

    #[test]
    fn test_laminar_vs_turbulent_layout() {
        let grid = GridSize::new(64, 64);
        let state = Scenario::LaminarVsTurbulent.generate(grid).state;
        // y = (48.5)/64 ~ 0.758: fast ribbon
        assert_eq!(state.u[grid.idx(1, 48)], 25.0);
        assert_eq!(state.u[grid.idx(63, 48)], 25.0);
        // y = (15.5)/64 ~ 0.242: slow ribbon
        assert_eq!(state.u[grid.idx(1, 15)], 5.0);
        // Interior faces start at rest
        assert_eq!(state.u[grid.idx(10, 48)], 0.0);
        // Midline wall: 0.49 * 64 = 31.36 < 32 < 32.64
        for i in 0..64 {
            assert_eq!(state.mask_at(i, 32), SOLID);
        }
        assert_eq!(state.mask_at(10, 31), FLUID);
        assert_eq!(state.mask_at(10, 33), FLUID);
    }
}
