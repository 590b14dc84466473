use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("min distance must be finite and positive, got {0}")]
    InvalidMinDistance(f32),
    #[error("min distance must be within {min}..={max}, got {value}")]
    MinDistanceOutOfRange { value: f32, min: f32, max: f32 },
    #[error("max connections must be at most {max}, got {value}")]
    TooManyConnections { value: u32, max: u32 },
    #[error("bounds must be finite and positive, got {0}")]
    InvalidBounds(f32),
    #[error("speed must be within 0..={max}, got {value}")]
    InvalidSpeed { value: f32, max: f32 },
    #[error("particle count {count} exceeds the maximum of {max}")]
    TooManyParticles { count: usize, max: usize },
    #[error("position buffer holds {actual} floats, expected {expected} (3 per particle)")]
    BufferSizeMismatch { expected: usize, actual: usize },
}
