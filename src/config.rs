use std::ops::RangeInclusive;

use crate::error::ConfigError;

pub const SIM_HZ: f32 = 60.0;
pub const RENDER_HZ: f32 = 30.0;
pub const TICK: f32 = 1.0 / SIM_HZ;
pub const MAX_CATCHUP_TICKS: u32 = 4;

pub const CUBE_SIZE: f32 = 700.0;
pub const BOUNDS: f32 = CUBE_SIZE / 2.0;

pub const DEFAULT_PARTICLE_COUNT: usize = 500;
pub const MAX_PARTICLE_COUNT: usize = 1500;

pub const DEFAULT_SPEED: f32 = 1.0;
pub const MAX_SPEED: f32 = 30.0;
pub const SPEED_STEP: f32 = 0.5;

pub const DEFAULT_MIN_DISTANCE: f32 = 150.0;
pub const MIN_DISTANCE_RANGE: RangeInclusive<f32> = 10.0..=1000.0;
pub const MIN_DISTANCE_STEP: f32 = 10.0;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;
pub const MAX_CONNECTIONS_CEILING: u32 = 30;

// Weakest opacity a drawn connection can have.
pub const ALPHA_FLOOR: f32 = 0.17;

pub const DEFAULT_ROTATE_SPEED: f32 = 2.0;
pub const ROTATE_SPEED_RANGE: RangeInclusive<f32> = 0.0..=10.0;
pub const ROTATE_SPEED_STEP: f32 = 0.5;
pub const ROTATE_STEP: f32 = 0.1;
pub const ZOOM_STEP: f32 = 0.1;
pub const ZOOM_RANGE: RangeInclusive<f32> = 0.3..=4.0;

/// Auto-rotation in radians per second. At speed 1 an orbit takes a minute.
pub fn rotation_rate(rotate_speed: f32) -> f32 {
    rotate_speed * std::f32::consts::TAU / 60.0
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
    pub min_distance: f32,
    pub limit_connections: bool,
    pub max_connections: u32,
    pub bounds: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            min_distance: DEFAULT_MIN_DISTANCE,
            limit_connections: false,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            bounds: BOUNDS,
        }
    }
}

impl SimulationConfig {
    /// Rejects values the stepper has no defined behavior for. Run once when
    /// the config is built, not every tick.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if !self.min_distance.is_finite() || self.min_distance <= 0.0 {
            return Err(ConfigError::InvalidMinDistance(self.min_distance));
        }
        if !MIN_DISTANCE_RANGE.contains(&self.min_distance) {
            return Err(ConfigError::MinDistanceOutOfRange {
                value: self.min_distance,
                min: *MIN_DISTANCE_RANGE.start(),
                max: *MIN_DISTANCE_RANGE.end(),
            });
        }
        if self.max_connections > MAX_CONNECTIONS_CEILING {
            return Err(ConfigError::TooManyConnections {
                value: self.max_connections,
                max: MAX_CONNECTIONS_CEILING,
            });
        }
        if !self.bounds.is_finite() || self.bounds <= 0.0 {
            return Err(ConfigError::InvalidBounds(self.bounds));
        }
        Ok(self)
    }

    pub fn adjust_min_distance(&mut self, delta: f32) {
        self.min_distance = (self.min_distance + delta)
            .clamp(*MIN_DISTANCE_RANGE.start(), *MIN_DISTANCE_RANGE.end());
    }

    pub fn adjust_max_connections(&mut self, delta: i32) {
        self.max_connections = self
            .max_connections
            .saturating_add_signed(delta)
            .min(MAX_CONNECTIONS_CEILING);
    }
}
