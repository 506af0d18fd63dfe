use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use minkowski_grid::canvas::PixelCanvas;
use minkowski_grid::field::{GridSize, PatternId, ShapeExponent, evaluate};
use minkowski_grid::grid::{FrameOutcome, GridRenderer, PatternParams};
use minkowski_grid::style::RenderStyle;

/// Offscreen frame timing for every style and pattern.
#[derive(Parser, Debug)]
#[command(name = "benchmark")]
struct Args {
    #[arg(long, default_value_t = 24)]
    frames: usize,

    #[arg(long, default_value_t = 320)]
    w: usize,

    #[arg(long, default_value_t = 320)]
    h: usize,

    #[arg(long, default_value_t = GridSize::default())]
    grid_size: GridSize,

    /// Only time this style.
    #[arg(long)]
    style: Option<RenderStyle>,

    /// Fail on blank output, non-finite field values, or slow pairs.
    #[arg(long, default_value_t = false)]
    ci_smoke: bool,

    #[arg(long, default_value_t = false)]
    quick: bool,

    /// Per-frame budget used by --ci-smoke.
    #[arg(long, default_value_t = 50.0)]
    max_ms: f64,
}

/// Every field over the whole grid for every catalog exponent, a few time steps apart.
fn check_field_values(grid: usize) -> Vec<String> {
    let mut bad = Vec::new();
    for pattern in PatternId::all() {
        for p in ShapeExponent::CATALOG {
            let finite = [0.0f32, 1.7, 250.0].iter().all(|&t| {
                (0..grid).all(|x| (0..grid).all(|y| evaluate(pattern, x, y, t, p, grid).is_finite()))
            });
            if !finite {
                bad.push(format!("{pattern} p={p}"));
            }
        }
    }
    bad
}

fn lit(canvas: &PixelCanvas) -> bool {
    let bg = canvas.background();
    canvas
        .pixels_rgba()
        .chunks_exact(4)
        .any(|px| px[0] != bg.r || px[1] != bg.g || px[2] != bg.b)
}

struct StyleRun {
    elapsed: Duration,
    frames: usize,
    blank: Vec<String>,
    slowest: Option<(PatternId, f64)>,
}

fn bench_style(args: &Args, style: RenderStyle, canvas: &mut PixelCanvas) -> StyleRun {
    let mut run = StyleRun {
        elapsed: Duration::ZERO,
        frames: 0,
        blank: Vec::new(),
        slowest: None,
    };

    for pattern in PatternId::all() {
        let params = PatternParams {
            pattern,
            style,
            grid_size: args.grid_size,
            ..PatternParams::default()
        };
        let mut grid = GridRenderer::new(params, Instant::now(), Some(1));
        let mut any_lit = false;

        let start = Instant::now();
        for _ in 0..args.frames {
            grid.step_forward();
            if let FrameOutcome::Drawn { .. } = grid.render(canvas) {
                any_lit |= lit(canvas);
            }
        }
        let elapsed = start.elapsed();
        run.elapsed += elapsed;
        run.frames += args.frames;

        let ms = elapsed.as_secs_f64() * 1000.0 / args.frames as f64;
        if run.slowest.is_none_or(|(_, worst)| ms > worst) {
            run.slowest = Some((pattern, ms));
        }
        if !any_lit {
            run.blank.push(format!("{}/{}", style.key(), pattern.key()));
        }
    }
    run
}

fn main() -> Result<()> {
    let mut args = Args::parse();
    if args.quick {
        args.frames = args.frames.min(4);
    }
    args.frames = args.frames.max(1);

    let styles: Vec<RenderStyle> = match args.style {
        Some(style) => vec![style],
        None => RenderStyle::all().to_vec(),
    };
    let mut canvas = PixelCanvas::new(args.w, args.h);

    println!(
        "Benchmark: styles={} patterns={} frames/pattern={} size={}x{} grid={}",
        styles.len(),
        PatternId::all().len(),
        args.frames,
        args.w,
        args.h,
        args.grid_size
    );

    let mut total_time = Duration::ZERO;
    let mut total_frames = 0usize;
    let mut blank = Vec::<String>::new();
    let mut slow = Vec::<(RenderStyle, PatternId, f64)>::new();

    for (idx, style) in styles.iter().copied().enumerate() {
        let mut run = bench_style(&args, style, &mut canvas);
        total_time += run.elapsed;
        total_frames += run.frames;
        let ms = run.elapsed.as_secs_f64() * 1000.0 / run.frames.max(1) as f64;
        let (worst_pattern, worst_ms) = run.slowest.unwrap_or((PatternId::Wave, 0.0));
        println!(
            "{:>2}. {:<18} {:>8.3} ms/frame  worst={} {:.3}  blank={}",
            idx,
            style.label(),
            ms,
            worst_pattern,
            worst_ms,
            run.blank.len()
        );
        blank.append(&mut run.blank);
        if args.ci_smoke && worst_ms > args.max_ms {
            slow.push((style, worst_pattern, worst_ms));
        }
    }

    let avg_ms = total_time.as_secs_f64() * 1000.0 / total_frames.max(1) as f64;
    let fps = if avg_ms > 0.0 { 1000.0 / avg_ms } else { 0.0 };
    println!("Summary: {:>8.3} ms/frame avg  {:>7.2} FPS", avg_ms, fps);

    if args.ci_smoke {
        let non_finite = check_field_values(args.grid_size.get());
        if !blank.is_empty() || !slow.is_empty() || !non_finite.is_empty() {
            eprintln!("CI smoke: FAIL");
            if !blank.is_empty() {
                eprintln!("  blank output: {}", blank.join(", "));
            }
            if !non_finite.is_empty() {
                eprintln!("  non-finite fields: {}", non_finite.join(", "));
            }
            for (style, pattern, ms) in slow {
                eprintln!(
                    "  slow pair: {}/{} ({:.3} ms/frame > {:.3})",
                    style.key(),
                    pattern.key(),
                    ms,
                    args.max_ms
                );
            }
            anyhow::bail!("ci smoke failed");
        }
        println!("CI smoke: PASS (max_ms={:.3})", args.max_ms);
    }

    Ok(())
}
