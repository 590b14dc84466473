use clap::ValueEnum;

use crate::{
    config::{self, SimulationConfig},
    render::{Layers, LineColorMode},
    types::{Dimension, SpawnOptions},
};

/// Everything the keyboard and the CLI can change, gathered so a preset can
/// rewrite it in one go.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settings {
    pub sim: SimulationConfig,
    pub spawn: SpawnOptions,
    pub layers: Layers,
    pub auto_rotate: bool,
    pub rotate_speed: f32,
    pub line_colors: LineColorMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sim: SimulationConfig::default(),
            spawn: SpawnOptions {
                count: config::DEFAULT_PARTICLE_COUNT,
                speed: config::DEFAULT_SPEED,
                dimension: Dimension::Volume,
                seed: None,
            },
            layers: Layers::default(),
            auto_rotate: true,
            rotate_speed: config::DEFAULT_ROTATE_SPEED,
            line_colors: LineColorMode::default(),
        }
    }
}

impl Settings {
    pub fn adjust_speed(&mut self, delta: f32) {
        self.spawn.speed = (self.spawn.speed + delta).clamp(0.0, config::MAX_SPEED);
    }

    pub fn adjust_rotate_speed(&mut self, delta: f32) {
        self.rotate_speed = (self.rotate_speed + delta).clamp(
            *config::ROTATE_SPEED_RANGE.start(),
            *config::ROTATE_SPEED_RANGE.end(),
        );
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    OortCloud,
    ParticlesJs,
    Whirlpool,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::OortCloud, Preset::ParticlesJs, Preset::Whirlpool];

    pub fn label(self) -> &'static str {
        match self {
            Preset::OortCloud => "Oort Cloud Stress Test",
            Preset::ParticlesJs => "ParticlesJS",
            Preset::Whirlpool => "Whirlpool",
        }
    }

    pub fn next(self) -> Self {
        let idx = Preset::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Preset::ALL[(idx + 1) % Preset::ALL.len()]
    }

    /// Overwrites the settings this preset cares about and leaves the rest.
    /// Returns true when the camera should go back to its starting pose.
    pub fn apply(self, settings: &mut Settings) -> bool {
        match self {
            Preset::OortCloud => {
                settings.sim.min_distance = 300.0;
                settings.layers.lines = true;
                settings.spawn.count = 1000;
                settings.auto_rotate = true;
                false
            }
            Preset::ParticlesJs => {
                settings.spawn.dimension = Dimension::Flat;
                settings.layers.cube = false;
                settings.sim.min_distance = 110.0;
                settings.layers.lines = true;
                settings.spawn.count = 300;
                settings.layers.points = true;
                settings.auto_rotate = false;
                true
            }
            Preset::Whirlpool => {
                settings.spawn.speed = 10.0;
                settings.layers.lines = false;
                settings.spawn.count = 1500;
                settings.auto_rotate = true;
                settings.rotate_speed = 3.0;
                false
            }
        }
    }
}
