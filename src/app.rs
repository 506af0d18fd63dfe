use crate::audio::{AudioLink, AudioStatus};
use crate::canvas::PixelCanvas;
use crate::capability::probe_renderer;
use crate::color::step_named_scheme;
use crate::config::Config;
use crate::grid::{FrameOutcome, GridRenderer, RedrawGate};
use crate::render::{Frame, make_renderer, pixels_per_cell};
use crate::settings::{ExportedSettings, settings_storage_path};
use crate::sink::{FrameSink, RawVideoSink};
use crate::terminal::TerminalGuard;
use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::{Duration, Instant};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const STATUS_TTL: Duration = Duration::from_secs(3);

/// Interactive state that lives outside the pattern parameters.
struct Controls {
    show_hud: bool,
    show_help: bool,
    export_path: Option<PathBuf>,
    status: Option<(String, Instant)>,
}

impl Controls {
    fn flash(&mut self, message: impl Into<String>, now: Instant) {
        self.status = Some((message.into(), now));
    }

    fn status_text(&self, now: Instant) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|(_, at)| now.saturating_duration_since(*at) < STATUS_TTL)
            .map(|(text, _)| text.as_str())
    }
}

pub fn run(cfg: Config) -> anyhow::Result<()> {
    let report = probe_renderer(cfg.renderer, cfg.auto_probe);
    for note in report.notes() {
        tracing::info!(probe = %report.status_label(), "{note}");
    }
    let mode = report.renderer;

    let start = Instant::now();
    let mut grid = GridRenderer::new(cfg.initial_params(), start, cfg.seed);
    grid.set_random_dimensions(cfg.random_dimensions());
    if let Some(path) = cfg.settings.as_deref() {
        let settings =
            ExportedSettings::load(path).with_context(|| format!("load settings {}", path.display()))?;
        grid.apply_settings(&settings);
        tracing::info!(path = %path.display(), "applied settings");
    }
    if cfg.paused {
        grid.toggle_running(start);
    }
    if cfg.randomize_on_start {
        grid.request_randomize(start);
    }

    let mut sink = cfg.record.as_deref().map(RawVideoSink::create).transpose()?;

    let mut audio = AudioLink::new(cfg.device.clone());
    if grid.params().audio_enabled {
        audio.enable();
    }

    let _term = TerminalGuard::new()?;
    let mut out = BufWriter::new(TerminalGuard::stdout());
    let mut renderer = make_renderer(mode);
    let (px_w_mul, px_h_mul) = pixels_per_cell(mode);

    let mut last_size = TerminalGuard::size()?;
    let mut canvas = PixelCanvas::new(0, 0);
    let mut redraw = RedrawGate::default();
    let mut controls = Controls {
        show_hud: true,
        show_help: false,
        export_path: cfg.export.clone().or_else(settings_storage_path),
        status: None,
    };
    let mut fps = FpsCounter::new();

    tracing::info!(
        renderer = renderer.name(),
        pattern = %grid.params().pattern,
        style = %grid.params().style,
        "render loop started"
    );

    'frames: loop {
        let now = Instant::now();

        // Drain input events (non-blocking).
        while event::poll(Duration::from_millis(0))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    if handle_key(k.code, k.modifiers, now, &mut grid, &mut audio, &mut controls) {
                        break 'frames;
                    }
                }
                Event::Resize(c, r) => last_size = (c, r),
                _ => {}
            }
        }

        // Resize events can be missed in some terminals.
        let sz = crossterm::terminal::size()?;
        if sz != last_size {
            last_size = sz;
        }

        if audio.poll() == AudioStatus::Unavailable && grid.params().audio_enabled {
            grid.set_audio_enabled(false);
            let reason = audio.unavailable_reason().unwrap_or("unknown error").to_string();
            controls.flash(format!("audio unavailable: {reason}"), now);
        }

        let tick = grid.tick(now, audio.energy());

        let (term_cols, term_rows) = last_size;
        let hud = if controls.show_hud {
            build_wrapped_hud(term_cols as usize, &grid, &audio, renderer.name(), fps.fps(), controls.status_text(now))
        } else {
            String::new()
        };
        let hud_rows = hud_rows_for_text(term_rows, controls.show_hud, &hud);
        let visual_rows = term_rows.saturating_sub(hud_rows).max(1);
        let w = (term_cols as usize).saturating_mul(px_w_mul);
        let h = (visual_rows as usize).saturating_mul(px_h_mul);
        canvas.resize(w, h);

        if let Some(FrameOutcome::Abandoned) = redraw.render_if_changed(&grid, &mut canvas, now) {
            tracing::debug!(w, h, "canvas too small for the grid; frame skipped");
        }

        if let Some(sink) = sink.as_mut() {
            if tick.advanced || tick.randomized {
                sink.accept(w, h, canvas.pixels_rgba())?;
            }
        }

        let frame = Frame {
            term_cols,
            term_rows,
            visual_rows,
            pixel_width: w,
            pixel_height: h,
            pixels_rgba: canvas.pixels_rgba(),
            hud: &hud,
            hud_rows,
            overlay: controls.show_help.then(help_popup_text),
            sync_updates: cfg.sync_updates,
        };
        renderer.render(&frame, &mut out)?;
        fps.tick();

        // Sleep until the next frame, waking early for a clock tick.
        let mut wait = FRAME_INTERVAL.saturating_sub(now.elapsed());
        if let Some(due) = grid.clock().time_until_due(Instant::now()) {
            wait = wait.min(due);
        }
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }

    grid.stop();
    audio.disable();
    if let Some(mut sink) = sink.take() {
        sink.finish()?;
    }
    tracing::info!(t = grid.time(), "render loop stopped");
    Ok(())
}

/// Apply one key press. Returns true when the app should quit.
fn handle_key(
    code: KeyCode,
    mods: KeyModifiers,
    now: Instant,
    grid: &mut GridRenderer,
    audio: &mut AudioLink,
    controls: &mut Controls,
) -> bool {
    if mods.contains(KeyModifiers::CONTROL) && matches!(code, KeyCode::Char('c')) {
        return true;
    }

    let params = grid.params().clone();
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => return true,
        KeyCode::Char(' ') => {
            let running = grid.toggle_running(now);
            controls.flash(if running { "playing" } else { "paused" }, now);
        }
        KeyCode::Left => grid.step_backward(),
        KeyCode::Right => grid.step_forward(),
        KeyCode::Char('p') => grid.set_pattern(params.pattern.next()),
        KeyCode::Char('P') => grid.set_pattern(params.pattern.prev()),
        KeyCode::Char('s') => grid.set_style(params.style.next()),
        KeyCode::Char('S') => grid.set_style(params.style.prev()),
        KeyCode::Char('c') => grid.set_scheme(step_named_scheme(&params.scheme.name, true)),
        KeyCode::Char('C') => grid.set_scheme(step_named_scheme(&params.scheme.name, false)),
        KeyCode::Char('g') => grid.set_grid(params.grid_size.step(true)),
        KeyCode::Char('G') => grid.set_grid(params.grid_size.step(false)),
        KeyCode::Char(']') => grid.set_p(params.p.step(true)),
        KeyCode::Char('[') => grid.set_p(params.p.step(false)),
        KeyCode::Char('r') | KeyCode::Char('R') => {
            if !grid.request_randomize(now) {
                controls.flash("randomize settling", now);
            }
        }
        KeyCode::Char('a') | KeyCode::Char('A') => {
            if params.audio_enabled {
                grid.set_audio_enabled(false);
                audio.disable();
            } else {
                grid.set_audio_enabled(true);
                audio.enable();
            }
        }
        KeyCode::Char('y') | KeyCode::Char('Y') => grid.set_cycle_colors(!params.cycle_colors),
        KeyCode::Char('f') | KeyCode::Char('F') => grid.set_fullscreen(!params.fullscreen),
        KeyCode::Char('e') | KeyCode::Char('E') => export_settings(grid, controls, now),
        KeyCode::Char('h') | KeyCode::Char('H') => controls.show_hud = !controls.show_hud,
        KeyCode::Char('?') | KeyCode::F(1) => controls.show_help = !controls.show_help,
        _ => {}
    }
    false
}

fn export_settings(grid: &GridRenderer, controls: &mut Controls, now: Instant) {
    let Some(path) = controls.export_path.clone() else {
        controls.flash("export failed: no config directory; pass --export", now);
        return;
    };
    match grid.export_settings().save(&path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "exported settings");
            controls.flash(format!("exported {}", path.display()), now);
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "settings export failed");
            controls.flash(format!("export failed: {err}"), now);
        }
    }
}

fn hud_rows_for_text(term_rows: u16, show_hud: bool, hud: &str) -> u16 {
    if !show_hud {
        return 0;
    }
    let max_rows = term_rows.saturating_sub(1);
    let wanted = hud.lines().count() as u16;
    wanted.min(max_rows)
}

fn build_wrapped_hud(
    cols: usize,
    grid: &GridRenderer,
    audio: &AudioLink,
    renderer_name: &str,
    fps: f32,
    status: Option<&str>,
) -> String {
    let params = grid.params();
    let n = params.grid_size.get();
    let scheme = grid.active_scheme();
    let mut logical_lines = vec![
        format!(
            "Pattern: {} | p: {} | Grid: {n}x{n} | Style: {} | Scheme: {}{}",
            params.pattern.label(),
            params.p,
            params.style.label(),
            scheme.name,
            if params.cycle_colors { " (cycling)" } else { "" },
        ),
        format!(
            "{} t={:>7.2} | Audio: {} | Canvas: {} | Renderer: {} | FPS: {:>4.1}",
            if grid.clock().is_running() { "Playing" } else { "Paused" },
            grid.time(),
            audio.hud_label(),
            if params.fullscreen { "fullscreen" } else { "square" },
            renderer_name,
            fps,
        ),
    ];
    if let Some(status) = status {
        logical_lines.push(status.to_string());
    }
    logical_lines.push("Keys: space play | ←/→ step | p/s/c pattern/style/scheme | g grid | [/] p | r random | ? help | q quit".to_string());

    wrap_hud_lines(cols, &logical_lines).join("\n")
}

fn wrap_hud_lines(cols: usize, lines: &[String]) -> Vec<String> {
    let width = cols.max(1);
    lines.iter().flat_map(|line| hard_wrap_line(line, width)).collect()
}

fn hard_wrap_line(line: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars.chunks(width.max(1)).map(|chunk| chunk.iter().collect()).collect()
}

fn help_popup_text() -> &'static str {
    "Minkowski Grid Hotkeys\n\
space  play / pause\n\
←/→  step time backward / forward\n\
p / P  next / previous pattern\n\
s / S  next / previous render style\n\
c / C  next / previous color scheme\n\
g / G  grid size up / down\n\
] / [  shape exponent up / down\n\
r  randomize (debounced)\n\
a  toggle audio reactivity\n\
y  toggle color cycling\n\
f  toggle fullscreen canvas\n\
e  export settings\n\
h  show/hide HUD\n\
? or F1  toggle this help\n\
q or esc  quit"
}

struct FpsCounter {
    last: Instant,
    frames: u32,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            last: Instant::now(),
            frames: 0,
            fps: 0.0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        let now = Instant::now();
        let dt = now.duration_since(self.last).as_secs_f32();
        if dt >= 0.5 {
            self.fps = (self.frames as f32) / dt;
            self.frames = 0;
            self.last = now;
        }
    }

    fn fps(&self) -> f32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::PatternId;
    use crate::grid::PatternParams;

    fn renderer() -> GridRenderer {
        GridRenderer::new(PatternParams::default(), Instant::now(), Some(7))
    }

    fn controls() -> Controls {
        Controls {
            show_hud: true,
            show_help: false,
            export_path: None,
            status: None,
        }
    }

    #[test]
    fn hard_wrap_splits_on_char_boundaries() {
        assert_eq!(hard_wrap_line("ab←/→cd", 3), vec!["ab←", "/→c", "d"]);
        assert_eq!(hard_wrap_line("", 5), vec![String::new()]);
    }

    #[test]
    fn hud_never_takes_the_last_row() {
        assert_eq!(hud_rows_for_text(3, true, "a\nb\nc\nd"), 2);
        assert_eq!(hud_rows_for_text(40, false, "a\nb"), 0);
    }

    #[test]
    fn pattern_keys_cycle_and_quit_keys_quit() {
        let mut grid = renderer();
        let mut audio = AudioLink::new(None);
        let mut c = controls();
        let now = Instant::now();
        let before = grid.params().pattern;
        assert!(!handle_key(KeyCode::Char('p'), KeyModifiers::NONE, now, &mut grid, &mut audio, &mut c));
        assert_eq!(grid.params().pattern, before.next());
        assert!(!handle_key(KeyCode::Char('P'), KeyModifiers::NONE, now, &mut grid, &mut audio, &mut c));
        assert_eq!(grid.params().pattern, before);
        assert!(handle_key(KeyCode::Char('q'), KeyModifiers::NONE, now, &mut grid, &mut audio, &mut c));
        assert!(handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL, now, &mut grid, &mut audio, &mut c));
    }

    #[test]
    fn export_without_a_path_reports_failure() {
        let grid = renderer();
        let mut c = controls();
        let now = Instant::now();
        export_settings(&grid, &mut c, now);
        assert!(c.status_text(now).is_some_and(|s| s.starts_with("export failed")));
    }

    #[test]
    fn space_pauses_the_clock() {
        let mut grid = renderer();
        let mut audio = AudioLink::new(None);
        let mut c = controls();
        grid.set_pattern(PatternId::Ripple);
        handle_key(KeyCode::Char(' '), KeyModifiers::NONE, Instant::now(), &mut grid, &mut audio, &mut c);
        assert!(!grid.clock().is_running());
    }
}
