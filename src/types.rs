use glam::Vec3;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Particle {
    pub velocity: Vec3,
    pub num_connections: u32,
}

impl Particle {
    pub fn new(velocity: Vec3) -> Self {
        Self {
            velocity,
            num_connections: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Dimension {
    Flat,
    #[default]
    Volume,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnOptions {
    pub count: usize,
    pub speed: f32,
    pub dimension: Dimension,
    pub seed: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorId {
    White,
    Cyan,
    Blue,
    Yellow,
    Gray,
    Red,
    Green,
    Magenta,
    Frame,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldStats {
    pub particle_count: usize,
    pub pair_count: usize,
    pub max_connections_seen: u32,
    pub mean_connections: f32,
}
