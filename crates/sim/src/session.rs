//! Session context: the device plus everything the interactive loop tracks
//! between frames (active scenario, elapsed time, gesture state, play state).
//!
//! Loading a scenario resets elapsed time and gestures. All edits go through
//! `&mut self`, so they are always sequenced between whole ticks.

use std::path::Path;

use glam::Vec2;

use crate::config::SimConfig;
use crate::device::FieldDevice;
use crate::diagnostics::{CellProbe, FieldStats};
use crate::editor::{self, DragGesture, PaintGesture};
use crate::error::{DeviceError, Result};
use crate::grid::FieldState;
use crate::persistence;
use crate::scenario::Scenario;
use crate::stepper::{self, TickParams};

/// One pointer sample in domain coordinates (`[0,w] x [0,h]`).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointerInput {
    pub position: Vec2,
    /// Primary button: inject velocity.
    pub drag: bool,
    /// Secondary button: toggle-paint the mask.
    pub paint: bool,
}

/// Everything a renderer needs for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderView {
    pub state: FieldState,
    /// Reference speed for colour scaling; zero when velocity rendering is off.
    pub base_speed: f32,
    pub gradient_tightness: f32,
    pub gradient_range_mult: f32,
    pub mode: u32,
}

pub struct Session<D: FieldDevice> {
    device: D,
    config: SimConfig,
    params: TickParams,
    scenario: Scenario,
    base_render_speed: f32,
    elapsed: f32,
    autoplay: bool,
    play_held: bool,
    last_pointer: Option<Vec2>,
    drag: DragGesture,
    paint: PaintGesture,
}

impl<D: FieldDevice> Session<D> {
    /// Validate `config`, check it against the device grid and load the empty
    /// scenario. Nothing is written to the device if validation fails.
    pub fn new(device: D, config: SimConfig) -> Result<Self> {
        config.validate()?;
        if device.grid() != config.grid() {
            return Err(DeviceError::GridMismatch {
                expected: config.grid(),
                actual: device.grid(),
            }
            .into());
        }
        log::info!(
            "session {}x{} on {} device",
            config.width,
            config.height,
            device.name()
        );

        let mut session = Self {
            params: config.tick_params(),
            scenario: Scenario::Empty,
            base_render_speed: 0.0,
            elapsed: 0.0,
            autoplay: config.autoplay,
            play_held: false,
            last_pointer: None,
            drag: DragGesture {
                radius: config.drag_radius,
                cell_size: config.cell_size,
            },
            paint: PaintGesture::new(config.paint_radius),
            device,
            config,
        };
        session.load_scenario(Scenario::Empty)?;
        Ok(session)
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    /// Simulated seconds since the last scenario load.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_running(&self) -> bool {
        self.autoplay || self.play_held
    }

    pub fn set_autoplay(&mut self, autoplay: bool) {
        self.autoplay = autoplay;
    }

    pub fn toggle_autoplay(&mut self) -> bool {
        self.autoplay = !self.autoplay;
        self.autoplay
    }

    /// Run frames while paused, for as long as the play key is held.
    pub fn set_play_held(&mut self, held: bool) {
        self.play_held = held;
    }

    pub fn load_scenario(&mut self, scenario: Scenario) -> Result<()> {
        let generated = scenario.generate(self.device.grid());
        self.device.write_all(&generated.state)?;
        self.scenario = scenario;
        self.base_render_speed = generated.base_render_speed;
        self.elapsed = 0.0;
        self.last_pointer = None;
        self.paint.release();
        log::info!("loaded scenario {} ({})", scenario.id(), scenario.name());
        Ok(())
    }

    pub fn reload_scenario(&mut self) -> Result<()> {
        self.load_scenario(self.scenario)
    }

    /// One tick of length `dt`. Elapsed time is left to the caller.
    pub fn tick(&mut self, dt: f32) -> Result<()> {
        stepper::tick(&mut self.device, &self.params, dt)?;
        Ok(())
    }

    /// Advance one frame of `frame_dt` split into `substeps` ticks, if running.
    /// Returns whether any tick ran.
    pub fn advance_frame(&mut self, frame_dt: f32) -> Result<bool> {
        if !self.is_running() {
            return Ok(false);
        }
        self.elapsed += frame_dt;
        let substeps = self.config.substeps;
        let dt = frame_dt / substeps as f32;
        for _ in 0..substeps {
            self.tick(dt)?;
        }
        Ok(true)
    }

    /// Single tick of `single_step_dt`, regardless of play state.
    pub fn step_once(&mut self) -> Result<()> {
        let dt = self.config.single_step_dt;
        self.elapsed += dt;
        self.tick(dt)?;
        log::info!("stepping scenario to {} ms", (1000.0 * self.elapsed).round() as i64);
        Ok(())
    }

    /// Feed one pointer sample taken `dt` after the previous one.
    ///
    /// Strokes run from the previous sample to this one and are skipped while
    /// the previous sample lies outside the domain. Dragging only injects while
    /// the simulation is running. Returns whether the fields were edited.
    pub fn pointer(&mut self, input: PointerInput, dt: f32) -> Result<bool> {
        let previous = self.last_pointer.replace(input.position);
        let Some(previous) = previous else {
            if !input.paint {
                self.paint.release();
            }
            return Ok(false);
        };
        if !editor::in_domain(self.device.grid(), previous) {
            return Ok(false);
        }

        let mut edited = false;
        if input.drag && self.is_running() {
            edited |= self
                .drag
                .apply(&mut self.device, previous, input.position, dt)?;
        }
        if input.paint {
            edited |= self
                .paint
                .apply(&mut self.device, previous, input.position)?;
        } else {
            self.paint.release();
        }
        Ok(edited)
    }

    /// Zero stale velocity at solid cells in both arenas.
    pub fn repair_boundary(&mut self) -> Result<usize> {
        Ok(editor::repair_device(&mut self.device)?)
    }

    pub fn save_domain(&self) -> Result<Vec<u8>> {
        Ok(persistence::save_mask(&self.device.read_mask()?)?)
    }

    /// Replace the mask with a saved one and repair velocity against it.
    ///
    /// The bytes are fully validated first; on any error the session is left
    /// untouched.
    pub fn load_domain(&mut self, bytes: &[u8]) -> Result<()> {
        let mask = persistence::load_mask(bytes, self.device.grid())?;
        self.apply_domain(mask)
    }

    pub fn save_domain_file(&self, path: &Path) -> Result<()> {
        persistence::save_mask_file(path, &self.device.read_mask()?)?;
        Ok(())
    }

    pub fn load_domain_file(&mut self, path: &Path) -> Result<()> {
        let mask = persistence::load_mask_file(path, self.device.grid())?;
        self.apply_domain(mask)
    }

    fn apply_domain(&mut self, mask: Vec<i32>) -> Result<()> {
        let mut state = self.device.read_all()?;
        state.mask = mask;
        let repaired = editor::repair_boundary(&mut state);
        self.device.write_all(&state)?;
        log::debug!("domain applied, {} solid interior cells", repaired);
        Ok(())
    }

    pub fn snapshot(&self) -> Result<FieldState> {
        Ok(self.device.read_all()?)
    }

    pub fn probe(&self, i: usize, j: usize) -> Result<Option<CellProbe>> {
        let state = self.device.read_all()?;
        Ok(CellProbe::read(&state, i, j))
    }

    /// Probe the cell under a domain-space position, logging it.
    pub fn probe_at(&self, position: Vec2) -> Result<Option<CellProbe>> {
        let grid = self.device.grid();
        if !editor::in_domain(grid, position) {
            return Ok(None);
        }
        let Some((i, j)) = editor::cell_at(grid, position) else {
            return Ok(None);
        };
        let probe = self.probe(i, j)?;
        if let Some(probe) = &probe {
            log::info!("{}", probe);
        }
        Ok(probe)
    }

    pub fn stats(&self) -> Result<FieldStats> {
        Ok(FieldStats::compute(&self.device.read_all()?))
    }

    pub fn set_render_mode(&mut self, mode: u32) {
        self.config.render.mode = mode;
    }

    pub fn set_velocity_rendering(&mut self, enabled: bool) {
        self.config.render.velocity_enabled = enabled;
    }

    pub fn render_view(&self) -> Result<RenderView> {
        let render = &self.config.render;
        Ok(RenderView {
            state: self.device.read_all()?,
            base_speed: if render.velocity_enabled {
                self.base_render_speed
            } else {
                0.0
            },
            gradient_tightness: render.gradient_tightness,
            gradient_range_mult: render.gradient_range_mult,
            mode: render.mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuDevice;
    use crate::error::{PersistenceError, SimError};
    use crate::grid::{GridSize, FLUID, SOLID};

    fn small_config() -> SimConfig {
        SimConfig {
            width: 32,
            height: 32,
            ..SimConfig::default()
        }
    }

    fn session() -> Session<CpuDevice> {
        Session::new(CpuDevice::new(GridSize::new(32, 32)), small_config()).unwrap()
    }

    #[test]
    fn test_new_rejects_grid_mismatch() {
        let result = Session::new(CpuDevice::new(GridSize::new(16, 16)), small_config());
        assert!(matches!(
            result,
            Err(SimError::Device(DeviceError::GridMismatch { .. }))
        ));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = SimConfig {
            over_relaxation: 0.5,
            ..small_config()
        };
        let result = Session::new(CpuDevice::new(GridSize::new(32, 32)), config);
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn test_elapsed_resets_on_scenario_load() {
        let mut session = session();
        session.advance_frame(0.02).unwrap();
        session.step_once().unwrap();
        assert!((session.elapsed() - 0.021).abs() < 1e-6);
        session.load_scenario(Scenario::WindPipe).unwrap();
        assert_eq!(session.elapsed(), 0.0);
        assert_eq!(session.scenario(), Scenario::WindPipe);
    }

    #[test]
    fn test_paused_frame_does_nothing() {
        let mut session = session();
        session.set_autoplay(false);
        assert!(!session.advance_frame(0.02).unwrap());
        assert_eq!(session.elapsed(), 0.0);
        session.set_play_held(true);
        assert!(session.advance_frame(0.02).unwrap());
    }

    #[test]
    fn test_render_view_hides_speed_when_disabled() {
        let mut session = session();
        session.load_scenario(Scenario::WindTunnel).unwrap();
        assert_eq!(session.render_view().unwrap().base_speed, 10.0);
        session.set_velocity_rendering(false);
        session.set_render_mode(4);
        let view = session.render_view().unwrap();
        assert_eq!(view.base_speed, 0.0);
        assert_eq!(view.mode, 4);
    }

    #[test]
    fn test_pointer_paint_gesture() {
        let mut session = session();
        let grid = session.device().grid();
        let at = |x: f32, y: f32, paint: bool| PointerInput {
            position: Vec2::new(x, y),
            drag: false,
            paint,
        };
        // First sample only records the position
        assert!(!session.pointer(at(10.5, 10.5, true), 0.02).unwrap());
        assert!(session.pointer(at(12.5, 10.5, true), 0.02).unwrap());
        let mask = session.device().read_mask().unwrap();
        assert_eq!(mask[grid.idx(11, 10)], SOLID);
        assert!(!session.pointer(at(12.5, 10.5, false), 0.02).unwrap());
    }

    #[test]
    fn test_pointer_from_outside_is_ignored() {
        let mut session = session();
        let before = session.snapshot().unwrap();
        let outside = PointerInput {
            position: Vec2::new(-5.0, 3.0),
            drag: true,
            paint: true,
        };
        session.pointer(outside, 0.02).unwrap();
        let inside = PointerInput {
            position: Vec2::new(8.0, 8.0),
            ..outside
        };
        assert!(!session.pointer(inside, 0.02).unwrap());
        assert_eq!(session.snapshot().unwrap(), before);
    }

    #[test]
    fn test_failed_domain_load_leaves_state() {
        let mut session = session();
        session.load_scenario(Scenario::WindPipe).unwrap();
        let before = session.snapshot().unwrap();
        assert!(matches!(
            session.load_domain(br#"{"myArray":[1,0,1]}"#),
            Err(SimError::Persistence(_))
        ));
        assert_eq!(session.snapshot().unwrap(), before);
    }

    #[test]
    fn test_open_ring_domain_is_rejected() {
        let mut session = session();
        session.load_scenario(Scenario::WindTunnel).unwrap();
        let before = session.snapshot().unwrap();
        let open = persistence::save_mask(&vec![FLUID; before.grid.cell_count()]).unwrap();
        assert!(matches!(
            session.load_domain(&open),
            Err(SimError::Persistence(PersistenceError::OpenBoundary { i: 0, j: 0 }))
        ));
        assert_eq!(session.snapshot().unwrap(), before);
    }

    #[test]
    fn test_probe_reports_cell() {
        let mut session = session();
        session.load_scenario(Scenario::WindTunnel).unwrap();
        let probe = session.probe_at(Vec2::new(5.2, 7.9)).unwrap().unwrap();
        assert_eq!((probe.i, probe.j), (5, 7));
        assert_eq!(probe.velocity.x, 10.0);
        assert!(session.probe(40, 0).unwrap().is_none());
    }
}
