mod config;
mod core;
mod error;
mod preset;
mod render;
mod types;
mod ui;

use clap::Parser;

use crate::{
    core::ParticleField,
    preset::{Preset, Settings},
    render::LineColorMode,
    types::Dimension,
};

#[derive(Parser, Debug)]
#[command(name = "plexus")]
#[command(about = "Particles bouncing in a cube, joined by lines when close", long_about = None)]
struct Cli {
    /// Start from a named preset; other flags override it
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Number of particles [default: 500]
    #[arg(short = 'n', long)]
    particles: Option<usize>,

    /// Pairs closer than this are connected, 10 to 1000 [default: 150]
    #[arg(short = 'd', long)]
    min_distance: Option<f32>,

    /// Cap connections per particle, at most 30 (turns the limit on)
    #[arg(short = 'm', long)]
    max_connections: Option<u32>,

    /// Largest initial velocity component, in units per tick [default: 1]
    #[arg(short = 's', long)]
    speed: Option<f32>,

    /// Keep every particle on the z = 0 plane
    #[arg(long)]
    flat: bool,

    /// Colour lines by position instead of by opacity
    #[arg(long)]
    rainbow: bool,

    /// Seed for reproducible spawning
    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    /// Defaults, then the preset, then any explicit flag.
    fn settings(&self) -> Settings {
        let mut settings = Settings::default();
        if let Some(preset) = self.preset {
            preset.apply(&mut settings);
        }
        if let Some(count) = self.particles {
            settings.spawn.count = count;
        }
        if let Some(min_distance) = self.min_distance {
            settings.sim.min_distance = min_distance;
        }
        if let Some(max_connections) = self.max_connections {
            settings.sim.limit_connections = true;
            settings.sim.max_connections = max_connections;
        }
        if let Some(speed) = self.speed {
            settings.spawn.speed = speed;
        }
        if self.flat {
            settings.spawn.dimension = Dimension::Flat;
        }
        if self.rainbow {
            settings.line_colors = LineColorMode::Rainbow;
        }
        settings.spawn.seed = self.seed;
        settings
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let mut settings = cli.settings();
    settings.sim = settings.sim.validate()?;
    let field = ParticleField::spawn(&settings.spawn, settings.sim.bounds)?;
    log::info!("starting with {:?}", settings);

    ui::run(field, settings, cli.preset)
}
