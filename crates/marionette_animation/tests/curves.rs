//! Round-trip tests for every built-in curve
//!
//! For each raw progress r in [0, 1], r must be among the raw values that map back from
//! the curve's adjusted progress at r.

use marionette_animation::{CubicBezier, Curve, SpringCurve};

fn round_trip_error(curve: &Curve, raw: f64) -> f64 {
    let adjusted = curve.adjusted_progress(raw);
    curve
        .raw_progress(adjusted)
        .iter()
        .map(|candidate| (candidate - raw).abs())
        .fold(f64::INFINITY, f64::min)
}

fn assert_round_trips(curve: &Curve, tolerance: f64) {
    for step in 0..=100 {
        let raw = step as f64 / 100.0;
        let error = round_trip_error(curve, raw);
        assert!(error <= tolerance, "{curve:?} at {raw}: off by {error}");
    }
}

#[test]
fn test_exact_curves_round_trip() {
    for curve in [
        Curve::Linear,
        Curve::ParabolicEaseIn,
        Curve::ParabolicEaseOut,
        Curve::SinusoidalEaseInEaseOut,
    ] {
        assert_round_trips(&curve, 1e-9);
    }
}

#[test]
fn test_bezier_curves_round_trip() {
    for bezier in [
        CubicBezier::EASE_IN,
        CubicBezier::EASE_OUT,
        CubicBezier::EASE_IN_EASE_OUT,
        CubicBezier::new(0.3, 0.1, 0.2, 1.0),
    ] {
        assert_round_trips(&Curve::from(bezier), 1e-2);
    }
}

#[test]
fn test_spring_curves_round_trip() {
    for spring in [
        SpringCurve::critically_damped(),
        SpringCurve::new(0.5, 0.0),
        SpringCurve::new(0.3, 1.5),
        SpringCurve::new(0.0, -1.0),
    ] {
        assert_round_trips(&Curve::from(spring), 1e-2);
    }
}
