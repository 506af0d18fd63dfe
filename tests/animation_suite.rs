use minkowski_grid::clock::{AnimationClock, FrameTimer, TICK_INTERVAL};
use minkowski_grid::color::ANIMATED_SCHEME_NAME;
use minkowski_grid::debounce::{Debouncer, RANDOMIZE_SETTLE, RANDOMIZE_WINDOW};
use minkowski_grid::field::GridSize;
use minkowski_grid::canvas::PixelCanvas;
use minkowski_grid::grid::{GridRenderer, PatternParams, RedrawGate};
use minkowski_grid::randomize::{LARGE_GRID_THRESHOLD, MAX_RANDOM_GRID, RandomDimensions, pick_random};
use std::time::{Duration, Instant};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn renderer_at(t0: Instant) -> GridRenderer {
    GridRenderer::new(PatternParams::default(), t0, Some(11))
}

// ── Clock ───────────────────────────────────────────────────────────────────

#[test]
fn stepping_forward_then_back_restores_time() {
    let mut grid = renderer_at(Instant::now());
    let before = grid.time();
    for _ in 0..7 {
        grid.step_forward();
    }
    assert_eq!(grid.time(), before + 7.0);
    for _ in 0..7 {
        grid.step_backward();
    }
    assert_eq!(grid.time(), before);
    grid.step_backward();
    assert_eq!(grid.time(), before - 1.0);
}

#[test]
fn running_clock_advances_once_per_interval() {
    let t0 = Instant::now();
    let mut clock = AnimationClock::new(t0);
    assert!(!clock.poll(t0 + ms(10), None));
    assert!(clock.poll(t0 + TICK_INTERVAL, None));
    assert_eq!(clock.time(), 1.0);
    assert!(!clock.poll(t0 + TICK_INTERVAL + ms(1), None));
    assert!(clock.poll(t0 + TICK_INTERVAL * 2, None));
    assert_eq!(clock.time(), 2.0);
}

#[test]
fn stopped_clock_delivers_no_ticks() {
    let t0 = Instant::now();
    let mut grid = renderer_at(t0);
    grid.stop();
    for i in 1..40 {
        let out = grid.tick(t0 + TICK_INTERVAL * i, None);
        assert!(!out.advanced);
    }
    assert_eq!(grid.time(), 0.0);
    assert!(!grid.clock().is_running());
    assert_eq!(grid.clock().time_until_due(t0), None);
}

#[test]
fn cancelled_timer_stays_silent_until_restarted() {
    let t0 = Instant::now();
    let mut timer = FrameTimer::new(ms(50));
    timer.start(t0);
    timer.cancel();
    assert!(!timer.is_armed());
    assert!(!timer.poll(t0 + ms(500)));
    timer.start(t0 + ms(500));
    assert!(timer.poll(t0 + ms(550)));
}

#[test]
fn pause_and_resume_reschedules_from_resume_time() {
    let t0 = Instant::now();
    let mut grid = renderer_at(t0);
    assert!(!grid.toggle_running(t0));
    assert!(!grid.tick(t0 + ms(200), None).advanced);
    assert!(grid.toggle_running(t0 + ms(300)));
    assert!(!grid.tick(t0 + ms(340), None).advanced);
    assert!(grid.tick(t0 + ms(350), None).advanced);
    assert_eq!(grid.time(), 1.0);
}

#[test]
fn audio_energy_scales_the_increment_only_when_enabled() {
    let t0 = Instant::now();
    let mut grid = renderer_at(t0);
    grid.tick(t0 + TICK_INTERVAL, Some(0.5));
    assert_eq!(grid.time(), 1.0, "energy must be ignored with audio off");

    grid.set_audio_enabled(true);
    grid.tick(t0 + TICK_INTERVAL * 2, Some(0.5));
    assert_eq!(grid.time(), 1.5);
    grid.tick(t0 + TICK_INTERVAL * 3, Some(9.0));
    assert_eq!(grid.time(), 3.5);
    grid.tick(t0 + TICK_INTERVAL * 4, None);
    assert_eq!(grid.time(), 4.5);
}

#[test]
fn color_cycling_moves_the_hue_with_wall_time() {
    let t0 = Instant::now();
    let mut grid = renderer_at(t0);
    grid.set_cycle_colors(true);
    grid.tick(t0, None);
    let before = grid.active_scheme();
    assert_eq!(before.name, ANIMATED_SCHEME_NAME);
    grid.tick(t0 + ms(1600), None);
    assert_ne!(grid.active_scheme().primary, before.primary);

    grid.set_cycle_colors(false);
    assert_eq!(grid.active_scheme(), grid.params().scheme);
}

// ── Redraw pacing ───────────────────────────────────────────────────────────

const DISPLAY_FRAME: Duration = Duration::from_millis(16);

/// Drive one simulated second of 16 ms display frames; returns (renders, clock advances).
fn simulate_second(grid: &mut GridRenderer, gate: &mut RedrawGate, canvas: &mut PixelCanvas, t0: Instant) -> (usize, usize) {
    let (mut renders, mut advances) = (0, 0);
    for frame in 0..63u32 {
        let now = t0 + DISPLAY_FRAME * frame;
        if grid.tick(now, None).advanced {
            advances += 1;
        }
        if gate.render_if_changed(grid, canvas, now).is_some() {
            renders += 1;
        }
    }
    (renders, advances)
}

fn small_renderer(t0: Instant) -> GridRenderer {
    let params = PatternParams {
        grid_size: GridSize::new(20).unwrap(),
        ..PatternParams::default()
    };
    GridRenderer::new(params, t0, Some(3))
}

#[test]
fn fields_are_reevaluated_only_when_the_clock_advances() {
    let t0 = Instant::now();
    let mut grid = small_renderer(t0);
    let mut gate = RedrawGate::default();
    let mut canvas = PixelCanvas::new(40, 40);
    let (renders, advances) = simulate_second(&mut grid, &mut gate, &mut canvas, t0);
    assert_eq!(renders, advances + 1, "one initial draw plus one per tick");
    assert!(renders <= 1 + (1000 / TICK_INTERVAL.as_millis() as usize));
    assert!(advances >= 10);
}

#[test]
fn paused_grid_draws_once_until_something_changes() {
    let t0 = Instant::now();
    let mut grid = small_renderer(t0);
    grid.toggle_running(t0);
    let mut gate = RedrawGate::default();
    let mut canvas = PixelCanvas::new(40, 40);
    assert_eq!(simulate_second(&mut grid, &mut gate, &mut canvas, t0), (1, 0));

    let later = t0 + ms(2000);
    grid.set_pattern(grid.params().pattern.next());
    assert!(gate.render_if_changed(&grid, &mut canvas, later).is_some());
    assert!(gate.render_if_changed(&grid, &mut canvas, later).is_none());

    grid.step_forward();
    assert!(gate.render_if_changed(&grid, &mut canvas, later).is_some());

    canvas.resize(60, 40);
    assert!(gate.render_if_changed(&grid, &mut canvas, later).is_some());
    assert!(gate.render_if_changed(&grid, &mut canvas, later + ms(16)).is_none());
}

#[test]
fn color_cycling_redraws_at_most_once_per_tick_interval() {
    let t0 = Instant::now();
    let mut grid = small_renderer(t0);
    grid.toggle_running(t0);
    grid.set_cycle_colors(true);
    let mut gate = RedrawGate::default();
    let mut canvas = PixelCanvas::new(40, 40);
    let (renders, _) = simulate_second(&mut grid, &mut gate, &mut canvas, t0);
    assert!(renders > 1, "cycling should keep repainting");
    assert!(renders <= 1 + (1000 / TICK_INTERVAL.as_millis() as usize), "{renders} renders");
}

// ── Debounce ────────────────────────────────────────────────────────────────

#[test]
fn burst_of_triggers_fires_once_after_the_quiet_window() {
    let t0 = Instant::now();
    let mut d = Debouncer::for_randomize();
    for i in 0..5 {
        assert!(d.trigger(t0 + ms(i * 25)));
    }
    let last = t0 + ms(100);
    assert!(!d.poll(last + RANDOMIZE_WINDOW - ms(1)));
    assert!(d.poll(last + RANDOMIZE_WINDOW));
    assert!(!d.poll(last + RANDOMIZE_WINDOW + ms(5)));
    assert!(!d.is_pending());
}

#[test]
fn triggers_are_ignored_while_settling() {
    let t0 = Instant::now();
    let mut d = Debouncer::for_randomize();
    d.trigger(t0);
    let fired = t0 + RANDOMIZE_WINDOW;
    assert!(d.poll(fired));
    assert!(d.in_flight(fired + ms(10)));
    assert!(!d.trigger(fired + ms(10)));
    assert!(!d.is_pending());
    assert!(d.trigger(fired + RANDOMIZE_SETTLE));
}

#[test]
fn renderer_applies_one_randomize_per_burst() {
    let t0 = Instant::now();
    let mut grid = renderer_at(t0);
    grid.stop();
    for i in 0..5 {
        grid.request_randomize(t0 + ms(i * 20));
    }
    assert!(grid.randomize_pending());

    let mut applied = 0;
    let mut now = t0;
    while now < t0 + ms(3000) {
        if grid.tick(now, None).randomized {
            applied += 1;
        }
        now += ms(10);
    }
    assert_eq!(applied, 1);
    assert!(!grid.randomize_pending());
}

#[test]
fn randomize_keeps_untouched_dimensions() {
    let t0 = Instant::now();
    let mut grid = renderer_at(t0);
    let before = grid.params().clone();
    grid.set_random_dimensions(RandomDimensions {
        grid_size: false,
        pattern: false,
        shape_exponent: false,
        style: true,
        scheme: false,
    });
    grid.request_randomize(t0);
    assert!(grid.tick(t0 + RANDOMIZE_WINDOW, None).randomized);
    let after = grid.params();
    assert_eq!(after.pattern, before.pattern);
    assert_eq!(after.p, before.p);
    assert_eq!(after.grid_size, before.grid_size);
    assert_eq!(after.scheme, before.scheme);
}

// ── Randomize exclusions ────────────────────────────────────────────────────

#[test]
fn large_grid_excludes_expensive_choices() {
    let dims = RandomDimensions {
        grid_size: false,
        ..RandomDimensions::default()
    };
    for seed in 0..2_000u64 {
        let mut rng = fastrand::Rng::with_seed(seed);
        let pick = pick_random(GridSize::new(50).unwrap(), dims, &mut rng);
        assert!(pick.grid_size.is_none());
        let pattern = pick.pattern.unwrap();
        assert!(!pattern.is_iterative(), "seed {seed}: {pattern}");
        let p = pick.p.unwrap();
        assert!(!p.is_infinite() && p.order() <= 4.0, "seed {seed}: p={p}");
        let style = pick.style.unwrap();
        assert!(!style.is_heavy_at_large_grid(), "seed {seed}: {style}");
        assert!(pick.scheme.is_some());
    }
}

#[test]
fn random_grid_sizes_respect_the_cap_and_drive_exclusions() {
    let mut saw_small_iterative = false;
    for seed in 0..2_000u64 {
        let mut rng = fastrand::Rng::with_seed(seed);
        let pick = pick_random(GridSize::new(80).unwrap(), RandomDimensions::default(), &mut rng);
        let grid = pick.grid_size.unwrap().get();
        assert!(grid <= MAX_RANDOM_GRID);
        let p = pick.p.unwrap();
        assert!(!p.is_infinite());
        if grid > LARGE_GRID_THRESHOLD {
            assert!(!pick.pattern.unwrap().is_iterative());
            assert!(p.order() <= 4.0);
            assert!(!pick.style.unwrap().is_heavy_at_large_grid());
        } else {
            assert!(p.order() <= 6.0);
            saw_small_iterative |= pick.pattern.unwrap().is_iterative();
        }
    }
    assert!(saw_small_iterative, "small grids should still allow iterative patterns");
}

#[test]
fn same_seed_gives_same_pick() {
    let a = pick_random(GridSize::default(), RandomDimensions::default(), &mut fastrand::Rng::with_seed(5));
    let b = pick_random(GridSize::default(), RandomDimensions::default(), &mut fastrand::Rng::with_seed(5));
    assert_eq!(a, b);
}
