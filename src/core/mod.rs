use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    config::{self, SimulationConfig},
    error::ConfigError,
    types::{Dimension, FieldStats, Particle, SpawnOptions},
};

const FLOATS_PER_SEGMENT: usize = 6;

/// Particle positions (xyz interleaved) plus per-particle velocity and
/// connection count. The particle count is fixed once built.
#[derive(Clone, Debug)]
pub struct ParticleField {
    positions: Vec<f32>,
    particles: Vec<Particle>,
    speed: f32,
    dimension: Dimension,
    rng: StdRng,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrawRange {
    pub start: usize,
    pub count: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirtyFlags {
    pub positions: bool,
    pub lines: bool,
}

impl DirtyFlags {
    pub fn any(self) -> bool {
        self.positions || self.lines
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub a: Vec3,
    pub b: Vec3,
    pub alpha: f32,
}

/// Line vertex and color storage reused across ticks. Sized for the worst
/// case of every pair connecting; only the leading `pair_count` segments are
/// meaningful after a tick.
#[derive(Clone, Debug)]
pub struct RenderBuffers {
    line_positions: Vec<f32>,
    line_colors: Vec<f32>,
    max_pairs: usize,
    pair_count: usize,
    dirty: DirtyFlags,
}

pub fn max_pairs(particle_count: usize) -> usize {
    particle_count * particle_count.saturating_sub(1) / 2
}

pub fn connection_alpha(distance: f32, min_distance: f32) -> f32 {
    (1.0 - distance / min_distance).max(config::ALPHA_FLOOR)
}

fn check_speed(speed: f32) -> Result<(), ConfigError> {
    if !speed.is_finite() || !(0.0..=config::MAX_SPEED).contains(&speed) {
        return Err(ConfigError::InvalidSpeed {
            value: speed,
            max: config::MAX_SPEED,
        });
    }
    Ok(())
}

fn random_velocity(rng: &mut StdRng, speed: f32, dimension: Dimension) -> Vec3 {
    let mut vel = Vec3::new(
        rng.gen_range(-speed..=speed),
        rng.gen_range(-speed..=speed),
        rng.gen_range(-speed..=speed),
    );
    if dimension == Dimension::Flat {
        vel.z = 0.0;
    }
    vel
}

impl RenderBuffers {
    pub fn new(particle_count: usize) -> Self {
        let max_pairs = max_pairs(particle_count);
        Self {
            line_positions: vec![0.0; max_pairs * FLOATS_PER_SEGMENT],
            line_colors: vec![0.0; max_pairs * FLOATS_PER_SEGMENT],
            max_pairs,
            pair_count: 0,
            dirty: DirtyFlags::default(),
        }
    }

    pub fn fits(&self, particle_count: usize) -> bool {
        max_pairs(particle_count) <= self.max_pairs
    }

    pub fn pair_count(&self) -> usize {
        self.pair_count
    }

    pub fn draw_range(&self) -> DrawRange {
        DrawRange {
            start: 0,
            count: self.pair_count * 2,
        }
    }

    pub fn line_positions(&self) -> &[f32] {
        &self.line_positions[..self.pair_count * FLOATS_PER_SEGMENT]
    }

    pub fn line_colors(&self) -> &[f32] {
        &self.line_colors[..self.pair_count * FLOATS_PER_SEGMENT]
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.line_positions()
            .chunks_exact(FLOATS_PER_SEGMENT)
            .zip(self.line_colors().chunks_exact(FLOATS_PER_SEGMENT))
            .map(|(pos, color)| Segment {
                a: Vec3::from_slice(&pos[0..3]),
                b: Vec3::from_slice(&pos[3..6]),
                alpha: color[0],
            })
    }

    /// Returns what changed since the last call and clears the flags.
    pub fn take_dirty(&mut self) -> DirtyFlags {
        std::mem::take(&mut self.dirty)
    }

    fn write_segment(&mut self, slot: usize, a: Vec3, b: Vec3, alpha: f32) {
        let offset = slot * FLOATS_PER_SEGMENT;
        a.write_to_slice(&mut self.line_positions[offset..offset + 3]);
        b.write_to_slice(&mut self.line_positions[offset + 3..offset + 6]);
        self.line_colors[offset..offset + FLOATS_PER_SEGMENT].fill(alpha);
    }
}

impl ParticleField {
    pub fn from_parts(positions: Vec<f32>, velocities: Vec<Vec3>) -> Result<Self, ConfigError> {
        let expected = velocities.len() * 3;
        if positions.len() != expected {
            return Err(ConfigError::BufferSizeMismatch {
                expected,
                actual: positions.len(),
            });
        }
        let speed = velocities
            .iter()
            .fold(0.0_f32, |max, v| max.max(v.abs().max_element()));
        let flat = !velocities.is_empty()
            && velocities.iter().all(|v| v.z == 0.0)
            && positions.chunks_exact(3).all(|p| p[2] == 0.0);
        let dimension = if flat { Dimension::Flat } else { Dimension::Volume };
        Ok(Self {
            positions,
            particles: velocities.into_iter().map(Particle::new).collect(),
            speed,
            dimension,
            rng: StdRng::seed_from_u64(0),
        })
    }

    /// Scatters particles uniformly through the cube `[-bounds, bounds]^3`
    /// with each velocity component drawn from `[-speed, speed]`.
    pub fn spawn(options: &SpawnOptions, bounds: f32) -> Result<Self, ConfigError> {
        if !bounds.is_finite() || bounds <= 0.0 {
            return Err(ConfigError::InvalidBounds(bounds));
        }
        if options.count > config::MAX_PARTICLE_COUNT {
            return Err(ConfigError::TooManyParticles {
                count: options.count,
                max: config::MAX_PARTICLE_COUNT,
            });
        }
        check_speed(options.speed)?;

        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut positions = Vec::with_capacity(options.count * 3);
        let mut particles = Vec::with_capacity(options.count);
        for _ in 0..options.count {
            let mut pos = Vec3::new(
                rng.gen_range(-bounds..bounds),
                rng.gen_range(-bounds..bounds),
                rng.gen_range(-bounds..bounds),
            );
            if options.dimension == Dimension::Flat {
                pos.z = 0.0;
            }
            positions.extend_from_slice(&pos.to_array());
            let vel = random_velocity(&mut rng, options.speed, options.dimension);
            particles.push(Particle::new(vel));
        }

        log::info!(
            "spawned {} particles ({:?}, speed {:.1}, seed {:?})",
            options.count,
            options.dimension,
            options.speed,
            options.seed
        );
        Ok(Self {
            positions,
            particles,
            speed: options.speed,
            dimension: options.dimension,
            rng,
        })
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Rescales every velocity so the largest component bound becomes
    /// `speed`. Headings are kept; a field at rest gets fresh random ones.
    pub fn set_speed(&mut self, speed: f32) -> Result<(), ConfigError> {
        check_speed(speed)?;
        if self.speed > 0.0 {
            let factor = speed / self.speed;
            for particle in &mut self.particles {
                particle.velocity *= factor;
            }
        } else {
            for particle in &mut self.particles {
                particle.velocity = random_velocity(&mut self.rng, speed, self.dimension);
            }
        }
        log::debug!("speed {:.1} -> {:.1}", self.speed, speed);
        self.speed = speed;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn position(&self, index: usize) -> Vec3 {
        Vec3::from_slice(&self.positions[index * 3..index * 3 + 3])
    }

    pub fn points(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.positions.chunks_exact(3).map(Vec3::from_slice)
    }

    pub fn connections(&self) -> impl Iterator<Item = u32> + '_ {
        self.particles().iter().map(|p| p.num_connections)
    }

    /// Advances the field by one tick and refills the line buffers.
    ///
    /// Particles are moved in index order, so when pair `(i, j)` is tested
    /// `i` already sits at its new position while `j` has not moved yet.
    /// The cap of `i` is only checked before its pair pass; later pairs can
    /// push it past `max_connections`.
    ///
    /// Panics if `buffers` were sized for fewer particles than the field holds.
    pub fn step(&mut self, config: &SimulationConfig, buffers: &mut RenderBuffers) -> DrawRange {
        assert!(
            buffers.fits(self.len()),
            "render buffers sized for fewer particles than the field"
        );

        for particle in &mut self.particles {
            particle.num_connections = 0;
        }

        let bounds = config.bounds;
        let capped = |count: u32| config.limit_connections && count >= config.max_connections;
        let mut pairs = 0;

        for i in 0..self.particles.len() {
            let pos = self.position(i) + self.particles[i].velocity;
            pos.write_to_slice(&mut self.positions[i * 3..i * 3 + 3]);

            let vel = &mut self.particles[i].velocity;
            if pos.x < -bounds || pos.x > bounds {
                vel.x = -vel.x;
            }
            if pos.y < -bounds || pos.y > bounds {
                vel.y = -vel.y;
            }
            if pos.z < -bounds || pos.z > bounds {
                vel.z = -vel.z;
            }

            if capped(self.particles[i].num_connections) {
                continue;
            }

            for j in (i + 1)..self.particles.len() {
                if capped(self.particles[j].num_connections) {
                    continue;
                }
                let other = self.position(j);
                let dist = pos.distance(other);
                if dist < config.min_distance {
                    self.particles[i].num_connections += 1;
                    self.particles[j].num_connections += 1;
                    let alpha = connection_alpha(dist, config.min_distance);
                    buffers.write_segment(pairs, pos, other, alpha);
                    pairs += 1;
                }
            }
        }

        buffers.pair_count = pairs;
        buffers.dirty = DirtyFlags {
            positions: true,
            lines: true,
        };
        buffers.draw_range()
    }

    pub fn stats(&self, buffers: &RenderBuffers) -> FieldStats {
        let mut stats = FieldStats {
            particle_count: self.len(),
            pair_count: buffers.pair_count(),
            ..FieldStats::default()
        };
        let mut total = 0_u64;
        for count in self.connections() {
            stats.max_connections_seen = stats.max_connections_seen.max(count);
            total += u64::from(count);
        }
        if !self.is_empty() {
            stats.mean_connections = total as f32 / self.len() as f32;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(points: &[[f32; 3]], velocities: &[[f32; 3]]) -> ParticleField {
        let positions = points.iter().flatten().copied().collect();
        let velocities = velocities.iter().map(|v| Vec3::from_array(*v)).collect();
        ParticleField::from_parts(positions, velocities).unwrap()
    }

    fn still(points: &[[f32; 3]]) -> ParticleField {
        field(points, &vec![[0.0; 3]; points.len()])
    }

    fn config(min_distance: f32) -> SimulationConfig {
        SimulationConfig {
            min_distance,
            ..SimulationConfig::default()
        }
    }

    fn limited(min_distance: f32, max_connections: u32) -> SimulationConfig {
        SimulationConfig {
            min_distance,
            limit_connections: true,
            max_connections,
            ..SimulationConfig::default()
        }
    }

    mod from_parts {
        use super::*;

        #[test]
        fn accepts_matching_lengths() {
            let f = still(&[[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]]);
            assert_eq!(f.len(), 2);
            assert_eq!(f.position(1), Vec3::new(3.0, 4.0, 5.0));
        }

        #[test]
        fn rejects_mismatched_lengths() {
            let result = ParticleField::from_parts(vec![0.0; 5], vec![Vec3::ZERO; 2]);
            assert_eq!(
                result.unwrap_err(),
                ConfigError::BufferSizeMismatch {
                    expected: 6,
                    actual: 5
                }
            );
        }

        #[test]
        fn empty_field_is_allowed() {
            let f = ParticleField::from_parts(Vec::new(), Vec::new()).unwrap();
            assert!(f.is_empty());
        }
    }

    mod spawn {
        use super::*;

        fn options(count: usize, dimension: Dimension, seed: u64) -> SpawnOptions {
            SpawnOptions {
                count,
                speed: 2.0,
                dimension,
                seed: Some(seed),
            }
        }

        #[test]
        fn places_particles_inside_the_cube() {
            let f = ParticleField::spawn(&options(200, Dimension::Volume, 7), 350.0).unwrap();
            assert_eq!(f.len(), 200);
            for p in f.points() {
                assert!(p.abs().max_element() <= 350.0);
            }
            for particle in f.particles() {
                assert!(particle.velocity.abs().max_element() <= 2.0);
            }
        }

        #[test]
        fn flat_dimension_zeroes_depth() {
            let f = ParticleField::spawn(&options(50, Dimension::Flat, 3), 350.0).unwrap();
            assert!(f.points().all(|p| p.z == 0.0));
            assert!(f.particles().iter().all(|p| p.velocity.z == 0.0));
        }

        #[test]
        fn same_seed_gives_same_field() {
            let a = ParticleField::spawn(&options(30, Dimension::Volume, 42), 350.0).unwrap();
            let b = ParticleField::spawn(&options(30, Dimension::Volume, 42), 350.0).unwrap();
            assert!(a.points().eq(b.points()));
            assert_eq!(a.particles(), b.particles());
        }

        #[test]
        fn zero_speed_gives_still_particles() {
            let opts = SpawnOptions {
                speed: 0.0,
                ..options(10, Dimension::Volume, 1)
            };
            let f = ParticleField::spawn(&opts, 350.0).unwrap();
            assert!(f.particles().iter().all(|p| p.velocity == Vec3::ZERO));
        }

        #[test]
        fn rejects_too_many_particles() {
            let opts = options(config::MAX_PARTICLE_COUNT + 1, Dimension::Volume, 1);
            assert!(matches!(
                ParticleField::spawn(&opts, 350.0),
                Err(ConfigError::TooManyParticles { .. })
            ));
        }

        #[test]
        fn rejects_out_of_range_speed() {
            let opts = SpawnOptions {
                speed: 31.0,
                ..options(10, Dimension::Volume, 1)
            };
            assert!(matches!(
                ParticleField::spawn(&opts, 350.0),
                Err(ConfigError::InvalidSpeed { .. })
            ));
        }

        #[test]
        fn rejects_non_positive_bounds() {
            let opts = options(10, Dimension::Volume, 1);
            assert_eq!(
                ParticleField::spawn(&opts, 0.0).unwrap_err(),
                ConfigError::InvalidBounds(0.0)
            );
        }
    }

    mod render_buffers {
        use super::*;

        #[test]
        fn sized_for_every_pair() {
            assert_eq!(max_pairs(0), 0);
            assert_eq!(max_pairs(1), 0);
            assert_eq!(max_pairs(4), 6);
            let buffers = RenderBuffers::new(4);
            assert!(buffers.fits(4));
            assert!(!buffers.fits(5));
            assert_eq!(buffers.pair_count(), 0);
            assert!(buffers.line_positions().is_empty());
        }

        #[test]
        fn take_dirty_clears_flags() {
            let mut f = still(&[[0.0; 3]]);
            let mut buffers = RenderBuffers::new(1);
            f.step(&config(10.0), &mut buffers);
            assert!(buffers.take_dirty().any());
            assert!(!buffers.take_dirty().any());
        }
    }

    mod step {
        use super::*;

        #[test]
        fn two_close_particles_connect() {
            let mut f = still(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
            let mut buffers = RenderBuffers::new(f.len());
            let range = f.step(&config(2.0), &mut buffers);

            assert_eq!(range, DrawRange { start: 0, count: 2 });
            assert_eq!(buffers.pair_count(), 1);
            assert_eq!(f.connections().collect::<Vec<_>>(), vec![1, 1]);
            assert_eq!(buffers.line_positions(), &[0.0_f32, 0.0, 0.0, 1.0, 0.0, 0.0]);
            assert_eq!(buffers.line_colors(), &[0.5_f32; 6]);
        }

        #[test]
        fn distant_particles_do_not_connect() {
            let mut f = still(&[[0.0, 0.0, 0.0], [5.0, 0.0, 0.0]]);
            let mut buffers = RenderBuffers::new(f.len());
            let range = f.step(&config(5.0), &mut buffers);
            assert_eq!(range.count, 0);
            assert_eq!(f.connections().collect::<Vec<_>>(), vec![0, 0]);
        }

        #[test]
        fn advances_by_velocity() {
            let mut f = field(&[[1.0, 2.0, 3.0]], &[[0.5, -1.0, 2.0]]);
            let mut buffers = RenderBuffers::new(1);
            f.step(&config(10.0), &mut buffers);
            assert_eq!(f.position(0), Vec3::new(1.5, 1.0, 5.0));
        }

        #[test]
        fn reflects_without_clamping() {
            let mut f = field(&[[349.5, 0.0, 0.0]], &[[1.0, 0.0, 0.0]]);
            let mut buffers = RenderBuffers::new(1);
            f.step(&config(10.0), &mut buffers);
            assert_eq!(f.position(0).x, 350.5);
            assert_eq!(f.particles()[0].velocity.x, -1.0);

            f.step(&config(10.0), &mut buffers);
            assert_eq!(f.position(0).x, 349.5);
            assert_eq!(f.particles()[0].velocity.x, -1.0);
        }

        #[test]
        fn reflects_each_axis_independently() {
            let mut f = field(&[[0.0, -349.0, 349.0]], &[[3.0, -2.0, 2.0]]);
            let mut buffers = RenderBuffers::new(1);
            f.step(&config(10.0), &mut buffers);
            assert_eq!(f.particles()[0].velocity, Vec3::new(3.0, 2.0, -2.0));
        }

        #[test]
        fn exactly_on_bounds_does_not_reflect() {
            let mut f = field(&[[349.0, 0.0, 0.0]], &[[1.0, 0.0, 0.0]]);
            let mut buffers = RenderBuffers::new(1);
            f.step(&config(10.0), &mut buffers);
            assert_eq!(f.particles()[0].velocity.x, 1.0);
        }

        #[test]
        fn pair_uses_moved_first_and_unmoved_second() {
            let mut f = field(
                &[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]],
                &[[4.0, 0.0, 0.0], [4.0, 0.0, 0.0]],
            );
            let mut buffers = RenderBuffers::new(f.len());
            f.step(&config(7.0), &mut buffers);
            let segment = buffers.segments().next().unwrap();
            assert_eq!(segment.a, Vec3::new(4.0, 0.0, 0.0));
            assert_eq!(segment.b, Vec3::new(10.0, 0.0, 0.0));
            assert_eq!(f.position(1), Vec3::new(14.0, 0.0, 0.0));
        }

        #[test]
        fn coincident_particles_have_full_alpha() {
            let mut f = still(&[[5.0, 5.0, 5.0], [5.0, 5.0, 5.0]]);
            let mut buffers = RenderBuffers::new(f.len());
            f.step(&config(10.0), &mut buffers);
            assert_eq!(buffers.line_colors(), &[1.0_f32; 6]);
        }

        #[test]
        fn alpha_has_a_floor() {
            let mut f = still(&[[0.0, 0.0, 0.0], [9.9, 0.0, 0.0]]);
            let mut buffers = RenderBuffers::new(f.len());
            f.step(&config(10.0), &mut buffers);
            assert_eq!(buffers.line_colors(), &[config::ALPHA_FLOOR; 6]);
        }

        #[test]
        fn alpha_stays_in_range_for_a_random_field() {
            let opts = SpawnOptions {
                count: 120,
                speed: 3.0,
                dimension: Dimension::Volume,
                seed: Some(11),
            };
            let mut f = ParticleField::spawn(&opts, 350.0).unwrap();
            let mut buffers = RenderBuffers::new(f.len());
            for _ in 0..5 {
                f.step(&config(150.0), &mut buffers);
                for segment in buffers.segments() {
                    assert!((config::ALPHA_FLOOR..=1.0).contains(&segment.alpha));
                }
            }
        }

        #[test]
        fn counts_match_drawn_segments_without_limit() {
            let opts = SpawnOptions {
                count: 80,
                speed: 0.0,
                dimension: Dimension::Volume,
                seed: Some(5),
            };
            let mut f = ParticleField::spawn(&opts, 350.0).unwrap();
            let mut buffers = RenderBuffers::new(f.len());
            let range = f.step(&config(200.0), &mut buffers);

            let mut expected = vec![0_u32; f.len()];
            for i in 0..f.len() {
                for j in 0..f.len() {
                    if i != j && f.position(i).distance(f.position(j)) < 200.0 {
                        expected[i] += 1;
                    }
                }
            }
            assert_eq!(f.connections().collect::<Vec<_>>(), expected);
            let total: u32 = expected.iter().sum();
            assert_eq!(buffers.pair_count() * 2, total as usize);
            assert_eq!(range.count, 2 * buffers.pair_count());
            assert!(buffers.pair_count() <= max_pairs(f.len()));
        }

        #[test]
        fn zero_cap_draws_nothing_but_still_moves() {
            let mut f = field(
                &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
                &[[0.0, 0.0, 0.0], [0.0, 2.0, 0.0]],
            );
            let mut buffers = RenderBuffers::new(f.len());
            f.step(&config(100.0), &mut buffers);
            let before = buffers.line_positions.clone();
            let colors_before = buffers.line_colors.clone();

            let range = f.step(&limited(100.0, 0), &mut buffers);
            assert_eq!(range.count, 0);
            assert_eq!(buffers.line_positions, before);
            assert_eq!(buffers.line_colors, colors_before);
            assert_eq!(f.position(1), Vec3::new(1.0, 4.0, 0.0));
        }

        #[test]
        fn first_member_can_exceed_cap() {
            let mut f = still(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
            let mut buffers = RenderBuffers::new(f.len());
            let range = f.step(&limited(5.0, 1), &mut buffers);
            assert_eq!(f.connections().collect::<Vec<_>>(), vec![2, 1, 1]);
            assert_eq!(range.count, 4);
        }

        #[test]
        fn capped_second_member_is_skipped() {
            let mut f = still(&[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [2.0, 0.0, 0.0],
                [3.0, 0.0, 0.0],
            ]);
            let mut buffers = RenderBuffers::new(f.len());
            f.step(&limited(1.5, 1), &mut buffers);
            // 0-1 connects, 1 is then capped so 1-2 is skipped; 2-3 connects.
            assert_eq!(f.connections().collect::<Vec<_>>(), vec![1, 1, 1, 1]);
            assert_eq!(buffers.pair_count(), 2);
        }

        #[test]
        fn connection_counts_reset_every_tick() {
            let mut f = still(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
            let mut buffers = RenderBuffers::new(f.len());
            f.step(&config(2.0), &mut buffers);
            f.step(&config(2.0), &mut buffers);
            assert_eq!(f.connections().collect::<Vec<_>>(), vec![1, 1]);
            f.step(&config(0.5), &mut buffers);
            assert_eq!(f.connections().collect::<Vec<_>>(), vec![0, 0]);
            assert_eq!(buffers.pair_count(), 0);
        }

        #[test]
        fn is_deterministic() {
            let opts = SpawnOptions {
                count: 60,
                speed: 4.0,
                dimension: Dimension::Volume,
                seed: Some(9),
            };
            let mut a = ParticleField::spawn(&opts, 350.0).unwrap();
            let mut b = a.clone();
            let mut buf_a = RenderBuffers::new(a.len());
            let mut buf_b = RenderBuffers::new(b.len());
            for _ in 0..10 {
                a.step(&config(120.0), &mut buf_a);
                b.step(&config(120.0), &mut buf_b);
            }
            assert!(a.points().eq(b.points()));
            assert_eq!(buf_a.line_positions(), buf_b.line_positions());
        }

        #[test]
        #[should_panic(expected = "render buffers sized for fewer particles than the field")]
        fn panics_with_undersized_buffers() {
            let mut f = still(&[[0.0; 3], [1.0; 3], [2.0; 3]]);
            let mut buffers = RenderBuffers::new(2);
            f.step(&config(10.0), &mut buffers);
        }
    }

    mod set_speed {
        use super::*;

        #[test]
        fn from_parts_takes_largest_component_as_speed() {
            let f = field(&[[0.0; 3], [1.0; 3]], &[[0.5, -2.0, 0.0], [1.0, 0.0, 0.0]]);
            assert_eq!(f.speed(), 2.0);
        }

        #[test]
        fn rescales_keeping_headings() {
            let mut f = field(&[[0.0; 3], [1.0; 3]], &[[0.5, -2.0, 0.0], [1.0, 0.0, 1.0]]);
            f.set_speed(4.0).unwrap();
            assert_eq!(f.speed(), 4.0);
            assert_eq!(f.particles()[0].velocity, Vec3::new(1.0, -4.0, 0.0));
            assert_eq!(f.particles()[1].velocity, Vec3::new(2.0, 0.0, 2.0));
        }

        #[test]
        fn zero_speed_stops_everything() {
            let mut f = field(&[[0.0; 3]], &[[3.0, 1.0, -1.0]]);
            f.set_speed(0.0).unwrap();
            assert_eq!(f.particles()[0].velocity, Vec3::ZERO);
        }

        #[test]
        fn field_at_rest_gets_new_headings() {
            let mut f = still(&[[0.0; 3], [1.0; 3], [2.0; 3]]);
            f.set_speed(5.0).unwrap();
            assert_eq!(f.speed(), 5.0);
            assert!(f.particles().iter().any(|p| p.velocity != Vec3::ZERO));
            for p in f.particles() {
                assert!(p.velocity.abs().max_element() <= 5.0);
            }
        }

        #[test]
        fn flat_field_stays_flat_when_restarted() {
            let mut f = still(&[[0.0, 0.0, 0.0], [4.0, 1.0, 0.0]]);
            f.set_speed(3.0).unwrap();
            assert!(f.particles().iter().all(|p| p.velocity.z == 0.0));
        }

        #[test]
        fn rejects_out_of_range_speed() {
            let mut f = field(&[[0.0; 3]], &[[1.0, 0.0, 0.0]]);
            assert!(matches!(f.set_speed(-1.0), Err(ConfigError::InvalidSpeed { .. })));
            assert!(f.set_speed(f32::NAN).is_err());
            assert_eq!(f.speed(), 1.0);
        }
    }

    mod stats {
        use super::*;

        #[test]
        fn summarizes_connections() {
            let mut f = still(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [90.0, 0.0, 0.0]]);
            let mut buffers = RenderBuffers::new(f.len());
            f.step(&config(5.0), &mut buffers);
            let stats = f.stats(&buffers);
            assert_eq!(stats.particle_count, 4);
            assert_eq!(stats.pair_count, 3);
            assert_eq!(stats.max_connections_seen, 2);
            assert_eq!(stats.mean_connections, 1.5);
        }

        #[test]
        fn empty_field_has_zero_mean() {
            let f = ParticleField::from_parts(Vec::new(), Vec::new()).unwrap();
            let buffers = RenderBuffers::new(0);
            assert_eq!(f.stats(&buffers), FieldStats::default());
        }
    }
}
