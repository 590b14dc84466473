use std::f32::consts::TAU;

use glam::Vec3;

use crate::{
    core::{ParticleField, RenderBuffers},
    types::ColorId,
};

const POINT_WEIGHT: f32 = 2.0;
const CUBE_WEIGHT: f32 = 0.0;
// Line cells carry their coverage as weight, which never exceeds this.
const LINE_WEIGHT_MAX: f32 = 1.0;
// Terminal cells are roughly twice as tall as they are wide.
const CELL_ASPECT: f32 = 0.5;
// Leaves room for the cube's corners once it is rotated.
const FIT_MARGIN: f32 = 1.8;
const RAINBOW: [ColorId; 6] = [
    ColorId::Red,
    ColorId::Yellow,
    ColorId::Green,
    ColorId::Cyan,
    ColorId::Blue,
    ColorId::Magenta,
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub yaw: f32,
    pub pitch: f32,
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            zoom: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layers {
    pub points: bool,
    pub lines: bool,
    pub cube: bool,
}

impl Default for Layers {
    fn default() -> Self {
        Self {
            points: true,
            lines: true,
            cube: true,
        }
    }
}

/// How connection lines are coloured. `Solid` shades by how much line
/// covers a cell, `Rainbow` picks a hue from where the segment sits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineColorMode {
    #[default]
    Solid,
    Rainbow,
}

impl LineColorMode {
    pub fn toggle(self) -> Self {
        match self {
            Self::Solid => Self::Rainbow,
            Self::Rainbow => Self::Solid,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Rainbow => "rainbow",
        }
    }
}

pub struct Scene<'a> {
    pub field: &'a ParticleField,
    pub buffers: &'a RenderBuffers,
    pub bounds: f32,
    pub layers: Layers,
    pub line_colors: LineColorMode,
}

#[derive(Clone, Copy, Debug)]
pub struct RenderCell {
    pub ch: char,
    pub weight: f32,
    pub coverage: f32,
    pub color: ColorId,
}

const EMPTY_CELL: RenderCell = RenderCell {
    ch: ' ',
    weight: f32::NEG_INFINITY,
    coverage: 0.0,
    color: ColorId::White,
};

#[derive(Debug)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<RenderCell>,
}

impl FrameBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        let mut buffer = Self {
            width,
            height,
            cells: Vec::new(),
        };
        buffer.resize(width, height);
        buffer
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        let len = (width as usize).saturating_mul(height as usize);
        if self.cells.len() != len {
            self.cells.resize(len, EMPTY_CELL);
        }
        self.clear();
    }

    pub fn clear(&mut self) {
        self.cells.fill(EMPTY_CELL);
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn get(&self, x: u16, y: u16) -> RenderCell {
        debug_assert!(x < self.width && y < self.height, "get() out of bounds");
        let idx = (y as usize) * (self.width as usize) + (x as usize);
        self.cells[idx]
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some((y as usize) * (self.width as usize) + (x as usize))
    }

    fn set(&mut self, x: i32, y: i32, ch: char, weight: f32, color: ColorId) {
        let Some(idx) = self.index(x, y) else {
            return;
        };
        let cell = &mut self.cells[idx];
        if weight >= cell.weight {
            cell.weight = weight;
            cell.ch = ch;
            cell.color = color;
        }
    }

    /// Accumulates line opacity in a cell, so crossing faint lines read
    /// brighter than either alone. Coverage saturates at 1. Points are never
    /// covered. Without a `hue` the colour follows the accumulated coverage.
    fn blend(&mut self, x: i32, y: i32, ch: char, alpha: f32, hue: Option<ColorId>) {
        let Some(idx) = self.index(x, y) else {
            return;
        };
        let cell = &mut self.cells[idx];
        if cell.weight > LINE_WEIGHT_MAX {
            return;
        }
        cell.coverage = (cell.coverage + alpha).min(1.0);
        cell.weight = cell.coverage;
        cell.ch = ch;
        cell.color = hue.unwrap_or_else(|| alpha_color(cell.coverage));
    }
}

/// Maps a world position to a terminal cell. Orthographic: the cube of
/// half-width `bounds` fits the viewport at zoom 1.
pub fn project(pos: Vec3, camera: &Camera, viewport: Viewport, bounds: f32) -> (i32, i32) {
    let (sin_yaw, cos_yaw) = camera.yaw.sin_cos();
    let (sin_pitch, cos_pitch) = camera.pitch.sin_cos();
    let x = pos.x * cos_yaw - pos.z * sin_yaw;
    let z = pos.x * sin_yaw + pos.z * cos_yaw;
    let y = pos.y * cos_pitch - z * sin_pitch;

    let fit = (viewport.width as f32).min(viewport.height as f32 / CELL_ASPECT);
    let scale = camera.zoom * fit / (2.0 * bounds * FIT_MARGIN);
    let half_w = viewport.width as f32 / 2.0;
    let half_h = viewport.height as f32 / 2.0;
    let sx = (x * scale + half_w).round() as i32;
    let sy = (-y * scale * CELL_ASPECT + half_h).round() as i32;
    (sx, sy)
}

pub fn draw(scene: &Scene<'_>, camera: &Camera, viewport: Viewport, frame: &mut FrameBuffer) {
    if frame.width() != viewport.width || frame.height() != viewport.height {
        frame.resize(viewport.width, viewport.height);
    } else {
        frame.clear();
    }
    if viewport.width == 0 || viewport.height == 0 {
        return;
    }

    let to_screen = |pos: Vec3| project(pos, camera, viewport, scene.bounds);
    // Keeps a zoomed-in segment cheap to walk.
    let limit = 4 * (viewport.width as usize + viewport.height as usize);

    if scene.layers.cube {
        for (a, b) in cube_edges(scene.bounds) {
            for (x, y) in line_cells(to_screen(a), to_screen(b), limit) {
                frame.set(x, y, '.', CUBE_WEIGHT, ColorId::Frame);
            }
        }
    }

    if scene.layers.lines {
        for segment in scene.buffers.segments() {
            let from = to_screen(segment.a);
            let to = to_screen(segment.b);
            let ch = line_glyph(to.0 - from.0, to.1 - from.1);
            let hue = match scene.line_colors {
                LineColorMode::Solid => None,
                LineColorMode::Rainbow => Some(rainbow_color((segment.a + segment.b) / 2.0)),
            };
            for (x, y) in line_cells(from, to, limit) {
                frame.blend(x, y, ch, segment.alpha, hue);
            }
        }
    }

    if scene.layers.points {
        for point in scene.field.points() {
            let (sx, sy) = to_screen(point);
            frame.set(sx, sy, 'o', POINT_WEIGHT, ColorId::Yellow);
        }
    }
}

/// Cells on the DDA walk from `from` to `to`, each visited once, in at most
/// `limit` steps.
fn line_cells(from: (i32, i32), to: (i32, i32), limit: usize) -> impl Iterator<Item = (i32, i32)> {
    let dx = (to.0 - from.0) as f32;
    let dy = (to.1 - from.1) as f32;
    let steps = (dx.abs().max(dy.abs()) as usize).min(limit);
    (0..=steps).map(move |i| {
        let t = if steps == 0 { 0.0 } else { i as f32 / steps as f32 };
        (
            (from.0 as f32 + dx * t).round() as i32,
            (from.1 as f32 + dy * t).round() as i32,
        )
    })
}

fn line_glyph(dx: i32, dy: i32) -> char {
    let (ax, ay) = (dx.abs(), dy.abs());
    if ay * 2 <= ax {
        '-'
    } else if ax * 2 <= ay {
        '|'
    } else if (dx > 0) == (dy > 0) {
        '\\'
    } else {
        '/'
    }
}

fn alpha_color(alpha: f32) -> ColorId {
    if alpha > 0.66 {
        ColorId::White
    } else if alpha > 0.33 {
        ColorId::Cyan
    } else if alpha > 0.2 {
        ColorId::Blue
    } else {
        ColorId::Gray
    }
}

// Hue by the segment's angle around the z axis, so the colours wheel as the
// field turns.
fn rainbow_color(midpoint: Vec3) -> ColorId {
    let turn = (midpoint.y.atan2(midpoint.x) / TAU).rem_euclid(1.0);
    let idx = (turn * RAINBOW.len() as f32) as usize;
    RAINBOW[idx.min(RAINBOW.len() - 1)]
}

fn cube_edges(bounds: f32) -> impl Iterator<Item = (Vec3, Vec3)> {
    let corner = move |i: usize| {
        Vec3::new(
            if i & 1 == 0 { -bounds } else { bounds },
            if i & 2 == 0 { -bounds } else { bounds },
            if i & 4 == 0 { -bounds } else { bounds },
        )
    };
    (0..8_usize).flat_map(move |i| {
        [1_usize, 2, 4]
            .into_iter()
            .filter(move |bit| i & bit == 0)
            .map(move |bit| (corner(i), corner(i | bit)))
    })
}
