//! Frame orchestration: parameter ownership, ticking, and per-cell dispatch.

use crate::clock::{AnimationClock, TICK_INTERVAL};
use crate::color::{ColorScheme, HueCycle, named_scheme};
use crate::debounce::Debouncer;
use crate::error::ConfigError;
use crate::field::{GridSize, PatternId, ShapeExponent, Viewport, evaluate_on};
use crate::randomize::{RandomDimensions, RandomPick, pick_random};
use crate::settings::ExportedSettings;
use crate::style::{CellRect, RenderStyle};
use crate::surface::Surface;
use std::time::Instant;

/// The parameter tuple a frame is rendered from.
#[derive(Clone, Debug, PartialEq)]
pub struct PatternParams {
    pub pattern: PatternId,
    pub p: ShapeExponent,
    pub grid_size: GridSize,
    pub style: RenderStyle,
    pub scheme: ColorScheme,
    pub audio_enabled: bool,
    pub cycle_colors: bool,
    pub fullscreen: bool,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            pattern: PatternId::Wave,
            p: ShapeExponent::default(),
            grid_size: GridSize::default(),
            style: RenderStyle::Ascii,
            scheme: ColorScheme::default(),
            audio_enabled: false,
            cycle_colors: false,
            fullscreen: false,
        }
    }
}

/// Cell placement for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridLayout {
    pub grid: usize,
    pub cell_w: f32,
    pub cell_h: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub viewport: Viewport,
}

impl GridLayout {
    /// `None` when the surface has no area.
    pub fn compute(width: usize, height: usize, grid: usize, fullscreen: bool) -> Option<Self> {
        if width == 0 || height == 0 || grid == 0 {
            return None;
        }
        let (w, h, n) = (width as f32, height as f32, grid as f32);
        if fullscreen {
            return Some(Self {
                grid,
                cell_w: w / n,
                cell_h: h / n,
                offset_x: 0.0,
                offset_y: 0.0,
                viewport: Viewport::stretched(grid, width, height),
            });
        }
        let cell = w.min(h) / n;
        Some(Self {
            grid,
            cell_w: cell,
            cell_h: cell,
            offset_x: (w - cell * n) * 0.5,
            offset_y: (h - cell * n) * 0.5,
            viewport: Viewport::square(grid),
        })
    }

    pub fn cell(&self, col: usize, row: usize) -> CellRect {
        CellRect {
            col,
            row,
            x: self.offset_x + col as f32 * self.cell_w,
            y: self.offset_y + row as f32 * self.cell_h,
            w: self.cell_w,
            h: self.cell_h,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Drawn { cells: usize },
    /// The surface had no drawable area; nothing was painted.
    Abandoned,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub advanced: bool,
    pub randomized: bool,
}

/// Everything a drawn frame depends on.
#[derive(Clone, Debug, PartialEq)]
struct FrameKey {
    params: PatternParams,
    time_bits: u64,
    scheme: ColorScheme,
    width: usize,
    height: usize,
}

/// Remembers what the canvas last showed so unchanged frames skip the field pass.
///
/// The canvas only changes when the clock advances, a parameter changes, the
/// cycling hue moves, or the surface is resized. Hue-only changes redraw at most
/// once per clock interval. Every other frame re-presents the cached pixels.
#[derive(Debug, Default)]
pub struct RedrawGate {
    last: Option<(FrameKey, Instant)>,
}

impl RedrawGate {
    /// Render only when needed. Returns `None` when the cached frame is still current.
    pub fn render_if_changed(
        &mut self,
        grid: &GridRenderer,
        surface: &mut dyn Surface,
        now: Instant,
    ) -> Option<FrameOutcome> {
        let key = grid.frame_key(surface.width(), surface.height());
        if let Some((last, drawn_at)) = &self.last {
            if *last == key {
                return None;
            }
            let hue_only = FrameKey {
                scheme: last.scheme.clone(),
                ..key.clone()
            } == *last;
            if hue_only && now.saturating_duration_since(*drawn_at) < TICK_INTERVAL {
                return None;
            }
        }
        let outcome = grid.render(surface);
        self.last = Some((key, now));
        Some(outcome)
    }
}

pub struct GridRenderer {
    params: PatternParams,
    clock: AnimationClock,
    hue: HueCycle,
    randomizer: Debouncer,
    dims: RandomDimensions,
    rng: fastrand::Rng,
    last_tick: Option<Instant>,
}

impl GridRenderer {
    pub fn new(params: PatternParams, now: Instant, seed: Option<u64>) -> Self {
        let mut clock = AnimationClock::new(now);
        clock.set_audio_reactive(params.audio_enabled);
        Self {
            params,
            clock,
            hue: HueCycle::new(0.0),
            randomizer: Debouncer::for_randomize(),
            dims: RandomDimensions::default(),
            rng: seed.map(fastrand::Rng::with_seed).unwrap_or_else(fastrand::Rng::new),
            last_tick: None,
        }
    }

    pub fn params(&self) -> &PatternParams {
        &self.params
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    pub fn toggle_running(&mut self, now: Instant) -> bool {
        self.clock.toggle(now)
    }

    pub fn stop(&mut self) {
        self.clock.stop();
        self.randomizer.cancel();
    }

    pub fn step_forward(&mut self) {
        self.clock.step_forward();
    }

    pub fn step_backward(&mut self) {
        self.clock.step_backward();
    }

    pub fn set_pattern(&mut self, pattern: PatternId) {
        self.params.pattern = pattern;
    }

    pub fn set_pattern_by_name(&mut self, name: &str) -> Result<(), ConfigError> {
        self.params.pattern = name.parse()?;
        Ok(())
    }

    pub fn set_p(&mut self, p: ShapeExponent) {
        self.params.p = p;
    }

    pub fn set_shape_exponent(&mut self, p: f32) -> Result<(), ConfigError> {
        self.params.p = ShapeExponent::new(p)?;
        Ok(())
    }

    pub fn set_grid_size(&mut self, n: usize) -> Result<(), ConfigError> {
        self.params.grid_size = GridSize::new(n)?;
        Ok(())
    }

    pub fn set_grid(&mut self, grid: GridSize) {
        self.params.grid_size = grid;
    }

    pub fn set_style(&mut self, style: RenderStyle) {
        self.params.style = style;
    }

    pub fn set_style_by_name(&mut self, name: &str) -> Result<(), ConfigError> {
        self.params.style = name.parse()?;
        Ok(())
    }

    pub fn set_scheme(&mut self, scheme: ColorScheme) {
        self.params.scheme = scheme;
    }

    pub fn set_named_scheme(&mut self, name: &str) -> Result<(), ConfigError> {
        self.params.scheme = named_scheme(name)?;
        Ok(())
    }

    pub fn set_custom_colors(&mut self, primary_hex: &str, secondary_hex: &str) -> Result<(), ConfigError> {
        self.params.scheme = ColorScheme::custom(primary_hex, secondary_hex)?;
        Ok(())
    }

    pub fn set_audio_enabled(&mut self, on: bool) {
        self.params.audio_enabled = on;
        self.clock.set_audio_reactive(on);
    }

    pub fn set_cycle_colors(&mut self, on: bool) {
        self.params.cycle_colors = on;
    }

    pub fn set_fullscreen(&mut self, on: bool) {
        self.params.fullscreen = on;
    }

    pub fn set_random_dimensions(&mut self, dims: RandomDimensions) {
        self.dims = dims;
    }

    /// Scheme used for drawing: the cycling hue scheme when cycling, else the selected one.
    pub fn active_scheme(&self) -> ColorScheme {
        if self.params.cycle_colors {
            self.hue.scheme()
        } else {
            self.params.scheme.clone()
        }
    }

    /// Queue a debounced randomize. Returns false while a previous one is settling.
    pub fn request_randomize(&mut self, now: Instant) -> bool {
        self.randomizer.trigger(now)
    }

    pub fn randomize_pending(&self) -> bool {
        self.randomizer.is_pending()
    }

    /// Advance color cycling, the clock, and any due randomize.
    pub fn tick(&mut self, now: Instant, energy: Option<f32>) -> TickOutcome {
        if let Some(last) = self.last_tick {
            if self.params.cycle_colors {
                self.hue.advance(now.saturating_duration_since(last));
            }
        }
        self.last_tick = Some(now);

        let energy = if self.params.audio_enabled { energy } else { None };
        let advanced = self.clock.poll(now, energy);
        let randomized = if self.randomizer.poll(now) {
            let pick = pick_random(self.params.grid_size, self.dims, &mut self.rng);
            self.apply_random(pick);
            true
        } else {
            false
        };
        TickOutcome { advanced, randomized }
    }

    /// Apply every field of `pick` at once.
    pub fn apply_random(&mut self, pick: RandomPick) {
        let RandomPick {
            grid_size,
            pattern,
            p,
            style,
            scheme,
        } = pick;
        let mut next = self.params.clone();
        if let Some(g) = grid_size {
            next.grid_size = g;
        }
        if let Some(pat) = pattern {
            next.pattern = pat;
        }
        if let Some(p) = p {
            next.p = p;
        }
        if let Some(s) = style {
            next.style = s;
        }
        if let Some(s) = scheme {
            next.scheme = s;
        }
        tracing::info!(
            pattern = %next.pattern,
            p = %next.p,
            grid = %next.grid_size,
            style = %next.style,
            scheme = %next.scheme.name,
            "randomized parameters"
        );
        self.params = next;
    }

    /// Clear and repaint the whole surface from the current parameters.
    ///
    /// Surface dimensions are read fresh on every call, so a resize between
    /// frames is picked up by the next one.
    pub fn render(&self, surface: &mut dyn Surface) -> FrameOutcome {
        let grid = self.params.grid_size.get();
        let Some(layout) = GridLayout::compute(surface.width(), surface.height(), grid, self.params.fullscreen)
        else {
            return FrameOutcome::Abandoned;
        };
        surface.clear();

        let t = self.clock.time() as f32;
        let scheme = self.active_scheme();
        let (pattern, p, style) = (self.params.pattern, self.params.p, self.params.style);
        for col in 0..grid {
            for row in 0..grid {
                let value = evaluate_on(pattern, col, row, t, p, &layout.viewport);
                style.draw(surface, &layout.cell(col, row), value, &scheme);
            }
        }
        FrameOutcome::Drawn { cells: grid * grid }
    }

    fn frame_key(&self, width: usize, height: usize) -> FrameKey {
        FrameKey {
            params: self.params.clone(),
            time_bits: self.clock.time().to_bits(),
            scheme: self.active_scheme(),
            width,
            height,
        }
    }

    pub fn export_settings(&self) -> ExportedSettings {
        ExportedSettings {
            p: self.params.p,
            grid_size: self.params.grid_size,
            pattern: self.params.pattern,
            render_style: self.params.style,
            color_scheme: self.active_scheme(),
            audio_enabled: self.params.audio_enabled,
            cycle_colors: self.params.cycle_colors,
        }
    }

    pub fn apply_settings(&mut self, s: &ExportedSettings) {
        self.params.p = s.p;
        self.params.grid_size = s.grid_size;
        self.params.pattern = s.pattern;
        self.params.style = s.render_style;
        self.params.scheme = s.color_scheme.clone();
        self.params.cycle_colors = s.cycle_colors;
        self.set_audio_enabled(s.audio_enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_layout_centers_the_grid() {
        let l = GridLayout::compute(120, 80, 20, false).unwrap();
        assert_eq!(l.cell_w, 4.0);
        assert_eq!(l.offset_x, 20.0);
        assert_eq!(l.offset_y, 0.0);
        let last = l.cell(19, 19);
        assert_eq!(last.x + last.w, 100.0);
    }

    #[test]
    fn fullscreen_layout_stretches_cells() {
        let l = GridLayout::compute(200, 100, 20, true).unwrap();
        assert_eq!((l.cell_w, l.cell_h), (10.0, 5.0));
        assert_eq!(l.viewport.aspect, 2.0);
        assert!(GridLayout::compute(0, 100, 20, true).is_none());
    }
}
