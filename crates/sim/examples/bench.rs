//! Quick benchmark for the CPU device
//!
//! Run with: cargo run --release --example bench -p fdm-sim
//! Profile with: cargo flamegraph --example bench -p fdm-sim

use fdm_sim::{CpuDevice, FieldDevice, Scenario, Session, SimConfig};
use std::time::Instant;

fn main() {
    const FRAMES: usize = 100;

    let config = SimConfig::default();
    let grid = config.grid();
    println!(
        "Setting up {}x{} grid, {} substeps x {} sweeps per frame",
        grid.width, grid.height, config.substeps, config.projection_iterations
    );

    let mut session = match Session::new(CpuDevice::new(grid), config) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("{}", err);
            return;
        }
    };
    if let Err(err) = session.load_scenario(Scenario::LaminarVsTurbulent) {
        eprintln!("{}", err);
        return;
    }
    let frame_dt = session.config().frame_dt;

    // Warm up
    println!("Warming up (10 frames)...");
    for _ in 0..10 {
        session.advance_frame(frame_dt).ok();
    }

    println!("Running {} frames on {}...", FRAMES, session.device().name());
    let start = Instant::now();
    for frame in 0..FRAMES {
        session.advance_frame(frame_dt).ok();
        if frame % 25 == 0 {
            if let Ok(stats) = session.stats() {
                println!("  Frame {}: {}", frame, stats);
            }
        }
    }

    let elapsed = start.elapsed();
    let avg_frame_time = elapsed.as_secs_f64() / FRAMES as f64;

    println!("\n=== Results ===");
    println!("Total time: {:.2?}", elapsed);
    println!("Avg frame time: {:.2}ms", avg_frame_time * 1000.0);
    println!("Effective FPS: {:.1}", 1.0 / avg_frame_time);
}
