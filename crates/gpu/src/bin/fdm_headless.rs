use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use fdm_gpu::{GpuContext, GpuDevice};
use fdm_sim::{CpuDevice, FieldDevice, Scenario, Session, SimConfig};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    #[value(name = "cpu")]
    Cpu,
    #[value(name = "gpu")]
    Gpu,
}

/// FDM headless - run a flow scenario without a window and report field stats
#[derive(Parser, Debug)]
#[command(name = "fdm-headless", version, about)]
struct Cli {
    /// Scenario id: 1 empty, 2 wind tunnel, 3 wind pipe, 4 laminar vs turbulent
    #[arg(long, default_value_t = 2)]
    scenario: u32,

    /// Number of frames to simulate
    #[arg(long, default_value_t = 100)]
    frames: u32,

    /// Compute device
    #[arg(long, value_enum, default_value_t = Backend::Gpu)]
    backend: Backend,

    /// JSON config file; missing keys take their defaults
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<usize>,

    #[arg(long)]
    height: Option<usize>,

    /// Domain file to load after the scenario
    #[arg(long, value_name = "FILE")]
    load_domain: Option<PathBuf>,

    /// Write the final domain to this file
    #[arg(long, value_name = "FILE")]
    save_domain: Option<PathBuf>,

    /// Log field stats every N frames (0 = only at the end)
    #[arg(long, default_value_t = 10)]
    log_every: u32,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::load_json(path)?,
        None => SimConfig::default(),
    };
    if let Some(width) = cli.width {
        config.width = width;
    }
    if let Some(height) = cli.height {
        config.height = height;
    }
    config.validate()?;

    match cli.backend {
        Backend::Cpu => {
            let device = CpuDevice::new(config.grid());
            simulate(Session::new(device, config)?, cli)
        }
        Backend::Gpu => {
            let gpu = GpuContext::new_blocking()?;
            let device = GpuDevice::new(&gpu, config.grid())?;
            simulate(Session::new(device, config)?, cli)
        }
    }
}

fn simulate<D: FieldDevice>(
    mut session: Session<D>,
    cli: &Cli,
) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = Scenario::from_id(cli.scenario);
    session.load_scenario(scenario)?;
    if let Some(path) = &cli.load_domain {
        session.load_domain_file(path)?;
    }
    session.set_autoplay(true);

    println!(
        "Headless run: scenario={} ({}), grid={}x{}, frames={}, device={}",
        scenario.id(),
        scenario.name(),
        session.config().width,
        session.config().height,
        cli.frames,
        session.device().name()
    );

    let frame_dt = session.config().frame_dt;
    let start = Instant::now();
    for frame in 1..=cli.frames {
        session.advance_frame(frame_dt)?;
        if cli.log_every > 0 && frame % cli.log_every == 0 {
            log::info!("frame {}: {}", frame, session.stats()?);
        }
    }
    let elapsed = start.elapsed().as_secs_f64();

    println!(
        "Simulated {:.3} s in {:.1} ms ({:.2} ms/frame)",
        session.elapsed(),
        elapsed * 1000.0,
        elapsed * 1000.0 / cli.frames.max(1) as f64
    );
    println!("{}", session.stats()?);

    if let Some(path) = &cli.save_domain {
        session.save_domain_file(path)?;
        println!("Domain written to {}", path.display());
    }
    Ok(())
}
