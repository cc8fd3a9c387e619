//! Session configuration, loadable from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::{GridSize, TILE_SIZE};
use crate::stepper::TickParams;

/// Visualisation parameters. None of these affect the simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Renderer colour mode (number keys in the interactive front end).
    pub mode: u32,
    /// When false the renderer receives a zero reference speed.
    pub velocity_enabled: bool,
    pub gradient_tightness: f32,
    pub gradient_range_mult: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            mode: 1,
            velocity_enabled: true,
            gradient_tightness: 1.0,
            gradient_range_mult: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub width: usize,
    pub height: usize,
    /// SOR factor for the projector, `[1, 1.99]`.
    pub over_relaxation: f32,
    /// Per-tick pressure damping factor, `[0, 1]`.
    pub pressure_relaxation: f32,
    /// Ticks per frame.
    pub substeps: u32,
    /// Relaxation sweeps per tick.
    pub projection_iterations: u32,
    /// Kinematic viscosity.
    pub viscosity: f32,
    /// Grid spacing `h`.
    pub cell_size: f32,
    /// Frame time split across `substeps` ticks.
    pub frame_dt: f32,
    /// Tick length for single stepping.
    pub single_step_dt: f32,
    pub drag_radius: f32,
    pub paint_radius: f32,
    pub autoplay: bool,
    pub render: RenderSettings,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            over_relaxation: 1.8,
            pressure_relaxation: 0.99,
            substeps: 10,
            projection_iterations: 10,
            viscosity: 0.5,
            cell_size: 0.1,
            frame_dt: 0.02,
            single_step_dt: 0.001,
            drag_radius: 5.0,
            paint_radius: 5.0,
            autoplay: true,
            render: RenderSettings::default(),
        }
    }
}

impl SimConfig {
    pub fn grid(&self) -> GridSize {
        GridSize::new(self.width, self.height)
    }

    pub fn tick_params(&self) -> TickParams {
        TickParams {
            pressure_relaxation: self.pressure_relaxation,
            over_relaxation: self.over_relaxation,
            projection_iterations: self.projection_iterations,
            viscosity: self.viscosity,
            cell_size: self.cell_size,
        }
    }

    /// Tick length used by [`crate::Session::advance_frame`].
    pub fn substep_dt(&self) -> f32 {
        self.frame_dt / self.substeps.max(1) as f32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let tiled = |n: usize| n >= TILE_SIZE && n % TILE_SIZE == 0;
        if !tiled(self.width) || !tiled(self.height) {
            return Err(ConfigError::GridSize {
                width: self.width,
                height: self.height,
            });
        }
        if !(1.0..=1.99).contains(&self.over_relaxation) {
            return Err(ConfigError::OverRelaxation(self.over_relaxation));
        }
        if !(0.0..=1.0).contains(&self.pressure_relaxation) {
            return Err(ConfigError::PressureRelaxation(self.pressure_relaxation));
        }
        if self.substeps == 0 {
            return Err(ConfigError::ZeroCount { name: "substeps" });
        }
        for (name, value) in [
            ("cell_size", self.cell_size),
            ("frame_dt", self.frame_dt),
            ("single_step_dt", self.single_step_dt),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        for (name, value) in [
            ("viscosity", self.viscosity),
            ("drag_radius", self.drag_radius),
            ("paint_radius", self.paint_radius),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Negative { name, value });
            }
        }
        let diffusion = self.diffusion_number();
        if diffusion > 0.25 {
            log::warn!(
                "explicit diffusion may blow up: viscosity * dt / h^2 = {:.3} exceeds 0.25",
                diffusion
            );
        }
        Ok(())
    }

    /// `viscosity * dt / h^2` for the longer of the substep and single-step dt.
    pub fn diffusion_number(&self) -> f32 {
        let dt = self.substep_dt().max(self.single_step_dt);
        self.viscosity * dt / (self.cell_size * self.cell_size)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_json(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
