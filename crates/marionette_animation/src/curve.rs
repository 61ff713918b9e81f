//! Animation curves
//!
//! A curve shapes linear progress (forward) and maps shaped progress back onto every raw
//! progress value that produces it (reverse). The reverse direction is multi-valued
//! because curves like springs overshoot and cross the same height several times.

use crate::spring::SpringCurve;
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};
use std::f64::consts::PI;
use std::fmt;
use std::rc::Rc;

/// Raw progress values mapping to one adjusted value. Almost always a single entry.
pub type RawProgress = SmallVec<[f64; 2]>;

/// A user-supplied curve.
pub trait AnimationCurve {
    fn adjusted_progress(&self, progress: f64) -> f64;

    fn raw_progress(&self, adjusted_progress: f64) -> RawProgress;
}

/// Curve applied to an animation's timeline
#[derive(Clone, Default)]
pub enum Curve {
    #[default]
    Linear,
    /// t²
    ParabolicEaseIn,
    /// 1 − (1 − t)²
    ParabolicEaseOut,
    /// (1 − cos πt) / 2
    SinusoidalEaseInEaseOut,
    CubicBezier(CubicBezier),
    Spring(SpringCurve),
    /// Compared by identity.
    Custom(Rc<dyn AnimationCurve>),
}

impl Curve {
    pub fn custom(curve: impl AnimationCurve + 'static) -> Self {
        Curve::Custom(Rc::new(curve))
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, Curve::Linear)
    }

    pub fn adjusted_progress(&self, progress: f64) -> f64 {
        match self {
            Curve::Linear => progress,
            Curve::ParabolicEaseIn => progress * progress,
            Curve::ParabolicEaseOut => 1.0 - (1.0 - progress) * (1.0 - progress),
            Curve::SinusoidalEaseInEaseOut => (1.0 - (PI * progress).cos()) / 2.0,
            Curve::CubicBezier(bezier) => bezier.adjusted_progress(progress),
            Curve::Spring(spring) => spring.adjusted_progress(progress),
            Curve::Custom(curve) => curve.adjusted_progress(progress),
        }
    }

    pub fn raw_progress(&self, adjusted_progress: f64) -> RawProgress {
        let value = adjusted_progress;
        match self {
            Curve::Linear => smallvec![value],
            Curve::ParabolicEaseIn => closed_form(value, f64::sqrt),
            Curve::ParabolicEaseOut => closed_form(value, |v| 1.0 - (1.0 - v).sqrt()),
            Curve::SinusoidalEaseInEaseOut => closed_form(value, |v| (1.0 - 2.0 * v).acos() / PI),
            Curve::CubicBezier(bezier) => bezier.raw_progress(value),
            Curve::Spring(spring) => spring.raw_progress(value),
            Curve::Custom(curve) => curve.raw_progress(value),
        }
    }
}

/// Inverse of a monotonic curve on [0, 1] that pins the endpoints.
fn closed_form(value: f64, invert: impl Fn(f64) -> f64) -> RawProgress {
    if value <= 0.0 {
        smallvec![0.0]
    } else if value >= 1.0 {
        smallvec![1.0]
    } else {
        smallvec![invert(value)]
    }
}

impl PartialEq for Curve {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Curve::Linear, Curve::Linear)
            | (Curve::ParabolicEaseIn, Curve::ParabolicEaseIn)
            | (Curve::ParabolicEaseOut, Curve::ParabolicEaseOut)
            | (Curve::SinusoidalEaseInEaseOut, Curve::SinusoidalEaseInEaseOut) => true,
            (Curve::CubicBezier(a), Curve::CubicBezier(b)) => a == b,
            (Curve::Spring(a), Curve::Spring(b)) => a == b,
            (Curve::Custom(a), Curve::Custom(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Curve::Linear => f.write_str("Linear"),
            Curve::ParabolicEaseIn => f.write_str("ParabolicEaseIn"),
            Curve::ParabolicEaseOut => f.write_str("ParabolicEaseOut"),
            Curve::SinusoidalEaseInEaseOut => f.write_str("SinusoidalEaseInEaseOut"),
            Curve::CubicBezier(bezier) => f.debug_tuple("CubicBezier").field(bezier).finish(),
            Curve::Spring(spring) => f.debug_tuple("Spring").field(spring).finish(),
            Curve::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<CubicBezier> for Curve {
    fn from(bezier: CubicBezier) -> Self {
        Curve::CubicBezier(bezier)
    }
}

impl From<SpringCurve> for Curve {
    fn from(spring: SpringCurve) -> Self {
        Curve::Spring(spring)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cubic Bézier
// ─────────────────────────────────────────────────────────────────────────────

/// Cubic Bézier timing curve with endpoints pinned at (0, 0) and (1, 1).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Crossing samples when inverting the y polynomial.
const BEZIER_INVERSE_SAMPLES: usize = 100;

impl CubicBezier {
    pub const EASE_IN: CubicBezier = CubicBezier::new(0.42, 0.0, 1.0, 1.0);
    pub const EASE_OUT: CubicBezier = CubicBezier::new(0.0, 0.0, 0.58, 1.0);
    pub const EASE_IN_EASE_OUT: CubicBezier = CubicBezier::new(0.42, 0.0, 0.58, 1.0);

    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Solve `x(s) = progress` and return `y(s)`.
    ///
    /// Newton-Raphson converges in a handful of steps for typical control points; a
    /// bisection pass takes over when the slope flattens out.
    pub fn adjusted_progress(&self, progress: f64) -> f64 {
        if progress <= 0.0 {
            return 0.0;
        }
        if progress >= 1.0 {
            return 1.0;
        }
        let s = solve_parameter(progress, self.x1, self.x2);
        bezier_sample(s, self.y1, self.y2)
    }

    /// Every `x(s)` whose `y(s)` equals `adjusted_progress`.
    pub fn raw_progress(&self, adjusted_progress: f64) -> RawProgress {
        let target = adjusted_progress;
        let offset = |s: f64| bezier_sample(s, self.y1, self.y2) - target;

        let mut parameters: RawProgress = SmallVec::new();
        let push_unique = |s: f64, parameters: &mut RawProgress| {
            if parameters.iter().all(|existing| (existing - s).abs() > 1e-6) {
                parameters.push(s);
            }
        };

        let step = 1.0 / BEZIER_INVERSE_SAMPLES as f64;
        let mut previous = offset(0.0);
        if previous == 0.0 {
            push_unique(0.0, &mut parameters);
        }
        for i in 1..=BEZIER_INVERSE_SAMPLES {
            let s = i as f64 / BEZIER_INVERSE_SAMPLES as f64;
            let current = offset(s);
            if current == 0.0 {
                push_unique(s, &mut parameters);
            } else if previous != 0.0 && previous.signum() != current.signum() {
                push_unique(bisect(&offset, s - step, s), &mut parameters);
            }
            previous = current;
        }

        if parameters.is_empty() {
            let closest = (0..=BEZIER_INVERSE_SAMPLES)
                .map(|i| i as f64 / BEZIER_INVERSE_SAMPLES as f64)
                .min_by(|a, b| offset(*a).abs().total_cmp(&offset(*b).abs()))
                .unwrap_or(0.0);
            parameters.push(closest);
        }

        parameters
            .into_iter()
            .map(|s| bezier_sample(s, self.x1, self.x2))
            .collect()
    }
}

/// Root of `f` in `[lo, hi]`, given a sign change across the bracket.
pub(crate) fn bisect(f: &impl Fn(f64) -> f64, mut lo: f64, mut hi: f64) -> f64 {
    let lo_sign = f(lo).signum();
    for _ in 0..48 {
        let mid = (lo + hi) * 0.5;
        let value = f(mid);
        if value == 0.0 {
            return mid;
        }
        if value.signum() == lo_sign {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (lo + hi) * 0.5
}

/// Parameter `s` where the x polynomial equals `x`.
fn solve_parameter(x: f64, x1: f64, x2: f64) -> f64 {
    let mut s = x;
    for _ in 0..8 {
        let error = bezier_sample(s, x1, x2) - x;
        if error.abs() < 1e-7 {
            return s;
        }
        let slope = bezier_slope(s, x1, x2);
        if slope.abs() < 1e-7 {
            break;
        }
        s -= error / slope;
    }

    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    s = x;
    for _ in 0..32 {
        let value = bezier_sample(s, x1, x2);
        if (value - x).abs() < 1e-9 {
            break;
        }
        if value < x {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) * 0.5;
    }
    s
}

/// One axis of the curve at parameter `s`, for control coordinates `a` and `b`.
#[inline]
fn bezier_sample(s: f64, a: f64, b: f64) -> f64 {
    // 3a(1-s)²s + 3b(1-s)s² + s³ in Horner form.
    ((1.0 - 3.0 * b + 3.0 * a) * s + (3.0 * b - 6.0 * a)) * s * s + 3.0 * a * s
}

#[inline]
fn bezier_slope(s: f64, a: f64, b: f64) -> f64 {
    3.0 * (1.0 - 3.0 * b + 3.0 * a) * s * s + 2.0 * (3.0 * b - 6.0 * a) * s + 3.0 * a
}
