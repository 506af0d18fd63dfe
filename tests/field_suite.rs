use minkowski_grid::error::ConfigError;
use minkowski_grid::field::{GridSize, PatternId, ShapeExponent, Viewport, evaluate, evaluate_on};

fn random_exponent(rng: &mut fastrand::Rng) -> ShapeExponent {
    if rng.bool() {
        ShapeExponent::CATALOG[rng.usize(..ShapeExponent::CATALOG.len())]
    } else {
        let p = ShapeExponent::MIN + rng.f32() * (ShapeExponent::MAX - ShapeExponent::MIN);
        ShapeExponent::new(p).unwrap()
    }
}

#[test]
fn every_field_is_finite_over_random_inputs() {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    let patterns = PatternId::all();
    for _ in 0..20_000 {
        let pattern = patterns[rng.usize(..patterns.len())];
        let grid = GridSize::ALLOWED[rng.usize(..GridSize::ALLOWED.len())];
        let p = random_exponent(&mut rng);
        let (x, y) = (rng.usize(..grid), rng.usize(..grid));
        let t = (rng.f32() - 0.5) * 20_000.0;
        let v = evaluate(pattern, x, y, t, p, grid);
        assert!(v.is_finite(), "{pattern} p={p} grid={grid} ({x},{y}) t={t} gave {v}");
    }
}

#[test]
fn fields_are_deterministic() {
    let mut rng = fastrand::Rng::with_seed(42);
    for pattern in PatternId::all() {
        for _ in 0..200 {
            let p = random_exponent(&mut rng);
            let (x, y) = (rng.usize(..50), rng.usize(..50));
            let t = rng.f32() * 500.0;
            let a = evaluate(pattern, x, y, t, p, 50);
            let b = evaluate(pattern, x, y, t, p, 50);
            assert_eq!(a.to_bits(), b.to_bits(), "{pattern} not reproducible");
        }
    }
}

#[test]
fn chebyshev_exponent_evaluates_every_field() {
    for pattern in PatternId::all() {
        for (x, y) in [(0, 0), (24, 25), (49, 49)] {
            let v = evaluate(pattern, x, y, 3.0, ShapeExponent::Infinite, 50);
            assert!(v.is_finite(), "{pattern} at ({x},{y})");
        }
    }
}

#[test]
fn wave_is_symmetric_about_the_center() {
    let a = evaluate(PatternId::Wave, 0, 0, 0.0, ShapeExponent::Finite(2.0), 4);
    let b = evaluate(PatternId::Wave, 3, 3, 0.0, ShapeExponent::Finite(2.0), 4);
    assert!((a.abs() - b.abs()).abs() < 1e-5, "corners differ: {a} vs {b}");
}

#[test]
fn square_viewport_matches_plain_evaluate() {
    let view = Viewport::square(30);
    for pattern in PatternId::all() {
        let a = evaluate(pattern, 7, 19, 12.0, ShapeExponent::Finite(3.5), 30);
        let b = evaluate_on(pattern, 7, 19, 12.0, ShapeExponent::Finite(3.5), &view);
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn stretched_viewport_stays_finite() {
    let view = Viewport::stretched(40, 300, 90);
    for pattern in PatternId::all() {
        for x in 0..40 {
            assert!(evaluate_on(pattern, x, 39 - x, 1.0, ShapeExponent::Finite(2.0), &view).is_finite());
        }
    }
}

#[test]
fn out_of_range_exponents_are_rejected() {
    for bad in [0.0, 0.99, 8.01, -3.0, f32::NAN, f32::NEG_INFINITY] {
        assert!(
            matches!(ShapeExponent::new(bad), Err(ConfigError::InvalidShapeExponent { .. })),
            "{bad} accepted"
        );
    }
    assert_eq!(ShapeExponent::new(f32::INFINITY).unwrap(), ShapeExponent::Infinite);
    assert_eq!("inf".parse::<ShapeExponent>().unwrap(), ShapeExponent::Infinite);
    assert_eq!("4.5".parse::<ShapeExponent>().unwrap(), ShapeExponent::Finite(4.5));
    assert!(matches!(
        "steep".parse::<ShapeExponent>(),
        Err(ConfigError::UnparsableShapeExponent(_))
    ));
    assert!(matches!("12".parse::<ShapeExponent>(), Err(ConfigError::InvalidShapeExponent { .. })));
}

#[test]
fn grid_sizes_and_pattern_ids_validate() {
    assert_eq!(GridSize::new(30).unwrap().get(), 30);
    assert!(matches!(GridSize::new(45), Err(ConfigError::InvalidGridSize(45))));
    assert_eq!(GridSize::new(80).unwrap().step(true).get(), 80);
    assert_eq!(GridSize::new(20).unwrap().step(false).get(), 20);
    assert_eq!(GridSize::default().step(true).get(), 60);

    assert_eq!(PatternId::from_id(10).unwrap(), PatternId::Mandelbrot);
    assert!(PatternId::from_id(13).is_err());
    assert_eq!("voronoi".parse::<PatternId>().unwrap(), PatternId::Voronoi);
    assert!(matches!("plasma".parse::<PatternId>(), Err(ConfigError::UnknownPattern(_))));
    assert_eq!(PatternId::Kaleidoscope.next(), PatternId::Wave);
    assert_eq!(PatternId::Wave.prev(), PatternId::Kaleidoscope);
}
