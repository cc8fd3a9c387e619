//! FDM Sim - 2D incompressible flow on an editable domain
//!
//! Staggered MAC-style grid with:
//! - Double-buffered velocity (ping-pong arenas), single pressure and mask fields
//! - Semi-Lagrangian advection + explicit viscosity
//! - Red-black SOR relaxation with accumulated, damped pressure
//! - Solid/fluid mask painting, velocity drag and boundary repair
//!
//! Kernels run on a [`FieldDevice`]. This crate ships the rayon CPU device;
//! `fdm-gpu` provides the wgpu one. Rendering is left to the caller through
//! [`Session::render_view`].

pub mod config;
pub mod cpu;
pub mod device;
pub mod diagnostics;
pub mod editor;
pub mod error;
pub mod grid;
pub mod kernels;
pub mod mask;
pub mod persistence;
pub mod scenario;
pub mod session;
pub mod stepper;
pub mod stroke;

pub use config::{RenderSettings, SimConfig};
pub use cpu::CpuDevice;
pub use device::FieldDevice;
pub use diagnostics::{CellProbe, FieldStats};
pub use error::{ConfigError, DeviceError, PersistenceError, Result, SimError};
pub use grid::{CellKind, FieldState, GridSize, PingPong, FLUID, SOLID, TILE_SIZE};
pub use scenario::{Scenario, ScenarioState};
pub use session::{PointerInput, RenderView, Session};
pub use stepper::{tick, TickParams};
pub use stroke::Stroke;
