use std::{error::Error, io, time::Duration};

use crossterm::{
    event::{self, Event as CrosstermEvent, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};

use crate::{
    config,
    core::{ParticleField, RenderBuffers},
    preset::{Preset, Settings},
    render,
    types::ColorId,
};

type Term = Terminal<CrosstermBackend<io::Stdout>>;

pub fn run(field: ParticleField, settings: Settings, preset: Option<Preset>) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, field, UiState::new(settings, preset));
    shutdown_terminal(&mut terminal)?;
    result
}

fn event_loop(terminal: &mut Term, mut field: ParticleField, mut ui_state: UiState) -> Result<(), Box<dyn Error>> {
    let mut buffers = RenderBuffers::new(field.len());
    let mut last_range = buffers.draw_range();

    let mut accumulator = 0.0_f32;
    let mut last_tick = std::time::Instant::now();
    let mut last_render = std::time::Instant::now();
    let render_interval = Duration::from_secs_f32(1.0 / config::RENDER_HZ);
    let mut sim_counter = 0_u32;
    let mut render_counter = 0_u32;
    let mut last_fps_sample = std::time::Instant::now();
    let mut sim_fps = 0.0_f32;
    let mut render_fps = 0.0_f32;

    loop {
        let now = std::time::Instant::now();
        let dt = (now - last_tick).as_secs_f32();
        last_tick = now;
        if ui_state.paused {
            accumulator = 0.0;
        } else {
            accumulator += dt;
        }

        let mut ticks = 0;
        while accumulator >= config::TICK {
            if ticks == config::MAX_CATCHUP_TICKS {
                accumulator = 0.0;
                break;
            }
            last_range = field.step(&ui_state.settings.sim, &mut buffers);
            accumulator -= config::TICK;
            ticks += 1;
            sim_counter += 1;
        }

        if ui_state.settings.auto_rotate {
            ui_state.camera.yaw += config::rotation_rate(ui_state.settings.rotate_speed) * dt;
            ui_state.view_changed = true;
        }

        while event::poll(Duration::from_millis(0))? {
            if let CrosstermEvent::Key(key) = event::read()? {
                match handle_key(key.code, &mut ui_state) {
                    KeyAction::Continue => {}
                    KeyAction::Quit => {
                        log::info!("stopped after {} pairs on the last tick", buffers.pair_count());
                        return Ok(());
                    }
                    KeyAction::Respawn => {
                        let settings = &ui_state.settings;
                        match ParticleField::spawn(&settings.spawn, settings.sim.bounds) {
                            Ok(spawned) => {
                                field = spawned;
                                buffers = RenderBuffers::new(field.len());
                                last_range = buffers.draw_range();
                            }
                            Err(err) => log::warn!("keeping the current field: {err}"),
                        }
                    }
                    KeyAction::Rescale => {
                        if let Err(err) = field.set_speed(ui_state.settings.spawn.speed) {
                            log::warn!("velocity unchanged: {err}");
                        }
                    }
                }
            }
        }

        if last_render.elapsed() >= render_interval {
            let stats = field.stats(&buffers);
            if last_fps_sample.elapsed() >= Duration::from_secs(1) {
                let secs = last_fps_sample.elapsed().as_secs_f32();
                sim_fps = sim_counter as f32 / secs;
                render_fps = render_counter as f32 / secs;
                sim_counter = 0;
                render_counter = 0;
                last_fps_sample = std::time::Instant::now();
            }
            let dirty = buffers.take_dirty();
            terminal.draw(|frame| {
                let size = frame.size();
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(3),
                        Constraint::Min(3),
                        Constraint::Length(3),
                    ])
                    .split(size);

                let settings = &ui_state.settings;
                let limit = if settings.sim.limit_connections {
                    format!("on ({})", settings.sim.max_connections)
                } else {
                    "off".to_string()
                };
                let title = match ui_state.preset {
                    Some(preset) => format!("plexus: {}", preset.label()),
                    None => "plexus".to_string(),
                };
                let header = Paragraph::new(format!(
                    "particles: {} | pairs: {} ({} verts) | max conn: {} | mean conn: {:.2} | min dist: {:.0} | limit: {} | velocity: {:.1} | spin: {:.1} | lines: {} | tick fps: {:.1} | render fps: {:.1}{}",
                    stats.particle_count,
                    stats.pair_count,
                    last_range.count,
                    stats.max_connections_seen,
                    stats.mean_connections,
                    settings.sim.min_distance,
                    limit,
                    field.speed(),
                    settings.rotate_speed,
                    settings.line_colors.label(),
                    sim_fps,
                    render_fps,
                    if ui_state.paused { " | PAUSED" } else { "" }
                ))
                .block(Block::default().borders(Borders::ALL).title(title));
                frame.render_widget(header, chunks[0]);

                // Inside the block borders.
                let viewport = render::Viewport {
                    width: chunks[1].width.saturating_sub(2),
                    height: chunks[1].height.saturating_sub(2),
                };
                if ui_state.needs_redraw(viewport, dirty.any()) {
                    let scene = render::Scene {
                        field: &field,
                        buffers: &buffers,
                        bounds: ui_state.settings.sim.bounds,
                        layers: ui_state.settings.layers,
                        line_colors: ui_state.settings.line_colors,
                    };
                    render::draw(&scene, &ui_state.camera, viewport, &mut ui_state.framebuf);
                    ui_state.view_changed = false;
                }

                let framebuf = &ui_state.framebuf;
                let lines: Vec<Line> = (0..framebuf.height())
                    .map(|y| {
                        let spans: Vec<Span> = (0..framebuf.width())
                            .map(|x| {
                                let cell = framebuf.get(x, y);
                                Span::styled(cell.ch.to_string(), Style::default().fg(color_for(cell.color)))
                            })
                            .collect();
                        Line::from(spans)
                    })
                    .collect();

                let view = Paragraph::new(lines)
                    .block(Block::default().borders(Borders::ALL).title("Field"));
                frame.render_widget(view, chunks[1]);

                let footer = Paragraph::new(
                    "n: preset | +/-: min dist | l: limit | [ ]: max conn | , .: velocity | p/k/c: points/lines/cube | m: line colors | r: rotate | < >: spin | 0: reset view | arrows: orbit | PgUp/PgDn: zoom | space: pause | q: quit",
                )
                .block(Block::default().borders(Borders::ALL).title("Controls"));
                frame.render_widget(footer, chunks[2]);
            })?;

            last_render = std::time::Instant::now();
            render_counter += 1;
        }

        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Leaves raw mode and the alternate screen. Runs whether the loop ended
/// cleanly or with an error.
fn shutdown_terminal(terminal: &mut Term) -> Result<(), Box<dyn Error>> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KeyAction {
    Continue,
    Quit,
    /// Particle count, dimension or velocity changed wholesale: build a new field.
    Respawn,
    /// Only the velocity changed: rescale the live field.
    Rescale,
}

struct UiState {
    camera: render::Camera,
    framebuf: render::FrameBuffer,
    settings: Settings,
    preset: Option<Preset>,
    paused: bool,
    view_changed: bool,
}

impl UiState {
    fn new(settings: Settings, preset: Option<Preset>) -> Self {
        Self {
            camera: render::Camera::default(),
            framebuf: render::FrameBuffer::new(0, 0),
            settings,
            preset,
            paused: false,
            view_changed: true,
        }
    }

    fn needs_redraw(&self, viewport: render::Viewport, data_dirty: bool) -> bool {
        data_dirty
            || self.view_changed
            || self.framebuf.width() != viewport.width
            || self.framebuf.height() != viewport.height
    }
}

fn handle_key(code: KeyCode, state: &mut UiState) -> KeyAction {
    let settings = &mut state.settings;
    let mut action = KeyAction::Continue;
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return KeyAction::Quit,
        KeyCode::Char(' ') => state.paused = !state.paused,
        KeyCode::Char('n') => {
            let preset = state.preset.map_or(Preset::OortCloud, Preset::next);
            if preset.apply(settings) {
                state.camera = render::Camera::default();
            }
            state.preset = Some(preset);
            log::debug!("preset -> {}", preset.label());
            action = KeyAction::Respawn;
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            settings.sim.adjust_min_distance(config::MIN_DISTANCE_STEP);
            log::debug!("min distance -> {}", settings.sim.min_distance);
        }
        KeyCode::Char('-') => {
            settings.sim.adjust_min_distance(-config::MIN_DISTANCE_STEP);
            log::debug!("min distance -> {}", settings.sim.min_distance);
        }
        KeyCode::Char('l') => {
            settings.sim.limit_connections = !settings.sim.limit_connections;
            log::debug!("limit connections -> {}", settings.sim.limit_connections);
        }
        KeyCode::Char(']') => {
            settings.sim.adjust_max_connections(1);
            log::debug!("max connections -> {}", settings.sim.max_connections);
        }
        KeyCode::Char('[') => {
            settings.sim.adjust_max_connections(-1);
            log::debug!("max connections -> {}", settings.sim.max_connections);
        }
        KeyCode::Char('.') => {
            settings.adjust_speed(config::SPEED_STEP);
            action = KeyAction::Rescale;
        }
        KeyCode::Char(',') => {
            settings.adjust_speed(-config::SPEED_STEP);
            action = KeyAction::Rescale;
        }
        KeyCode::Char('p') => settings.layers.points = !settings.layers.points,
        KeyCode::Char('k') => settings.layers.lines = !settings.layers.lines,
        KeyCode::Char('c') => settings.layers.cube = !settings.layers.cube,
        KeyCode::Char('m') => settings.line_colors = settings.line_colors.toggle(),
        KeyCode::Char('r') => settings.auto_rotate = !settings.auto_rotate,
        KeyCode::Char('>') => settings.adjust_rotate_speed(config::ROTATE_SPEED_STEP),
        KeyCode::Char('<') => settings.adjust_rotate_speed(-config::ROTATE_SPEED_STEP),
        KeyCode::Char('0') => state.camera = render::Camera::default(),
        KeyCode::Left => state.camera.yaw -= config::ROTATE_STEP,
        KeyCode::Right => state.camera.yaw += config::ROTATE_STEP,
        KeyCode::Up => state.camera.pitch -= config::ROTATE_STEP,
        KeyCode::Down => state.camera.pitch += config::ROTATE_STEP,
        KeyCode::PageUp => {
            state.camera.zoom = (state.camera.zoom + config::ZOOM_STEP)
                .clamp(*config::ZOOM_RANGE.start(), *config::ZOOM_RANGE.end());
        }
        KeyCode::PageDown => {
            state.camera.zoom = (state.camera.zoom - config::ZOOM_STEP)
                .clamp(*config::ZOOM_RANGE.start(), *config::ZOOM_RANGE.end());
        }
        _ => return KeyAction::Continue,
    }
    state.view_changed = true;
    action
}

fn color_for(color: ColorId) -> Color {
    match color {
        ColorId::White => Color::White,
        ColorId::Cyan => Color::Cyan,
        ColorId::Blue => Color::Blue,
        ColorId::Yellow => Color::Yellow,
        ColorId::Gray => Color::Gray,
        ColorId::Red => Color::Red,
        ColorId::Green => Color::Green,
        ColorId::Magenta => Color::Magenta,
        ColorId::Frame => Color::DarkGray,
    }
}
