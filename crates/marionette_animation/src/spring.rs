//! Spring curve
//!
//! A damped harmonic oscillator evaluated in closed form over a unit timeline. The raw
//! oscillator never settles exactly, so the last 30% of the timeline blends towards 1.0
//! with a smoothstep, landing on exactly 1.0 at t = 1.

use crate::curve::{bisect, RawProgress};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Angular frequency of the undamped oscillator, in radians per unit of progress.
const NATURAL_FREQUENCY: f64 = 10.0;

/// Progress at which the blend towards the resting value begins.
const SETTLE_START: f64 = 0.7;

/// Forward samples used to invert the curve.
const INVERSE_SAMPLES: usize = 1000;

/// Crossings closer than this are treated as the same crossing.
const CROSSING_SEPARATION: f64 = 1e-6;

/// Spring-shaped timing curve
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpringCurve {
    /// Damping ratio in `[0, 1]`; 1 is critically damped.
    pub damping: f64,
    /// Initial velocity in units of the total distance per unit of progress.
    pub initial_velocity: f64,
}

impl SpringCurve {
    pub fn new(damping: f64, initial_velocity: f64) -> Self {
        Self {
            damping: damping.clamp(0.0, 1.0),
            initial_velocity,
        }
    }

    /// Critically damped spring starting at rest.
    pub fn critically_damped() -> Self {
        Self::new(1.0, 0.0)
    }

    pub fn adjusted_progress(&self, progress: f64) -> f64 {
        let t = progress.clamp(0.0, 1.0);
        if t >= 1.0 {
            return 1.0;
        }

        let zeta = self.damping.clamp(0.0, 1.0);
        // Positive initial velocity moves towards the target.
        let velocity = -self.initial_velocity * NATURAL_FREQUENCY;
        let decay = (-zeta * NATURAL_FREQUENCY * t).exp();

        let spring = if zeta >= 1.0 {
            1.0 - decay * (1.0 + (zeta * NATURAL_FREQUENCY + velocity) * t)
        } else {
            let damped_frequency = NATURAL_FREQUENCY * (1.0 - zeta * zeta).sqrt();
            let sin_coefficient =
                velocity / damped_frequency + (zeta * NATURAL_FREQUENCY) / damped_frequency;
            1.0 - decay
                * ((damped_frequency * t).cos() + sin_coefficient * (damped_frequency * t).sin())
        };

        if t <= SETTLE_START {
            return spring;
        }
        let blend = (t - SETTLE_START) / (1.0 - SETTLE_START);
        let smooth = blend * blend * (3.0 - 2.0 * blend);
        spring * (1.0 - smooth) + smooth
    }

    /// Sample-based inverse.
    ///
    /// Returns every crossing of `adjusted_progress` in ascending order, or the closest
    /// sample when the curve never reaches it. Values at or past 1 are searched like any
    /// other, since an underdamped spring crosses them while overshooting. A crossing pair
    /// that fits between two samples is found by locating the extremum between them.
    pub fn raw_progress(&self, adjusted_progress: f64) -> RawProgress {
        let offset = |t: f64| self.adjusted_progress(t) - adjusted_progress;
        let step = 1.0 / INVERSE_SAMPLES as f64;
        let mut crossings: RawProgress = SmallVec::new();
        let mut push_unique = |raw: f64| {
            if crossings
                .iter()
                .all(|existing| (existing - raw).abs() > CROSSING_SEPARATION)
            {
                crossings.push(raw);
            }
        };

        let mut before_previous: Option<f64> = None;
        let mut previous = offset(0.0);
        if previous == 0.0 {
            push_unique(0.0);
        }

        for i in 1..=INVERSE_SAMPLES {
            let t = i as f64 / INVERSE_SAMPLES as f64;
            let current = offset(t);

            if current == 0.0 {
                push_unique(t);
            } else if previous != 0.0 && previous.signum() != current.signum() {
                push_unique(bisect(&offset, t - step, t));
            } else if let Some(earlier) = before_previous {
                // The previous sample is an extremum that turns back towards the target.
                let turns_back = if previous > 0.0 {
                    previous < earlier && previous < current
                } else {
                    previous > earlier && previous > current
                };
                if previous != 0.0 && turns_back {
                    let lo = t - 2.0 * step;
                    let extremum = locate_extremum(&offset, lo, t, previous > 0.0);
                    let value = offset(extremum);
                    if value == 0.0 {
                        push_unique(extremum);
                    } else if value.signum() != previous.signum() {
                        push_unique(bisect(&offset, lo, extremum));
                        push_unique(bisect(&offset, extremum, t));
                    }
                }
            }

            before_previous = Some(previous);
            previous = current;
        }

        if crossings.is_empty() {
            let closest = (0..=INVERSE_SAMPLES)
                .map(|i| i as f64 / INVERSE_SAMPLES as f64)
                .min_by(|a, b| offset(*a).abs().total_cmp(&offset(*b).abs()))
                .unwrap_or(0.0);
            crossings.push(closest);
        }

        crossings.sort_by(f64::total_cmp);
        crossings
    }
}

/// Ternary search for the minimum (or maximum) of `f` on `[lo, hi]`.
fn locate_extremum(f: &impl Fn(f64) -> f64, mut lo: f64, mut hi: f64, minimum: bool) -> f64 {
    let sign = if minimum { 1.0 } else { -1.0 };
    for _ in 0..60 {
        let a = lo + (hi - lo) / 3.0;
        let b = hi - (hi - lo) / 3.0;
        if sign * f(a) < sign * f(b) {
            hi = b;
        } else {
            lo = a;
        }
    }
    (lo + hi) * 0.5
}

impl Default for SpringCurve {
    fn default() -> Self {
        Self::new(0.5, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spring_lands_exactly_on_one() {
        for damping in [0.0, 0.3, 0.7, 1.0] {
            let spring = SpringCurve::new(damping, 0.0);
            assert_eq!(spring.adjusted_progress(1.0), 1.0);
            assert_eq!(spring.adjusted_progress(0.0), 0.0);
        }
    }

    #[test]
    fn test_damping_is_clamped() {
        assert_eq!(SpringCurve::new(3.0, 0.0).damping, 1.0);
        assert_eq!(SpringCurve::new(-1.0, 0.0).damping, 0.0);
    }

    #[test]
    fn test_underdamped_spring_overshoots() {
        let spring = SpringCurve::new(0.2, 0.0);
        let peak = (0..=100)
            .map(|i| spring.adjusted_progress(i as f64 / 100.0))
            .fold(f64::MIN, f64::max);
        assert!(peak > 1.0, "peak {peak}");
    }

    #[test]
    fn test_critically_damped_is_monotonic() {
        let spring = SpringCurve::critically_damped();
        let mut previous = 0.0;
        for i in 1..=100 {
            let value = spring.adjusted_progress(i as f64 / 100.0);
            assert!(value >= previous);
            previous = value;
        }
    }

    #[test]
    fn test_reverse_finds_every_crossing() {
        let spring = SpringCurve::new(0.2, 0.0);
        let crossings = spring.raw_progress(1.0 - 1e-9);
        assert!(crossings.len() >= 2, "{crossings:?}");
        for raw in crossings {
            assert!((spring.adjusted_progress(raw) - 1.0).abs() < 1e-2);
        }
    }

    #[test]
    fn test_reverse_round_trip() {
        for damping in [0.0, 0.3, 1.0] {
            for velocity in [-1.0, 2.0] {
                let spring = SpringCurve::new(damping, velocity);
                // Off-grid samples land between inverse samples, including the settle blend.
                for offset in [0.0, 0.37] {
                    for i in 0..=100 {
                        let raw = ((i as f64 + offset) / 100.0).min(1.0);
                        let adjusted = spring.adjusted_progress(raw);
                        let candidates = spring.raw_progress(adjusted);
                        assert!(
                            candidates.iter().any(|c| (c - raw).abs() < 1e-6),
                            "{spring:?}: {raw} -> {adjusted} -> {candidates:?}"
                        );
                        assert!(candidates.windows(2).all(|pair| pair[0] < pair[1]));
                    }
                }
            }
        }
    }

    #[test]
    fn test_reverse_finds_crossings_around_a_shallow_dip() {
        // Near t = 0.993 this spring dips and recovers within one inverse sample.
        let spring = SpringCurve::new(0.0, 2.0);
        let raw = 0.99274;
        let candidates = spring.raw_progress(spring.adjusted_progress(raw));
        assert!(candidates.iter().any(|c| (c - raw).abs() < 1e-6), "{candidates:?}");
    }

    #[test]
    fn test_reverse_boundaries() {
        let spring = SpringCurve::default();
        assert_eq!(spring.raw_progress(0.0).as_slice(), &[0.0]);

        let at_rest = spring.raw_progress(1.0);
        assert!(at_rest.len() > 1, "{at_rest:?}");
        assert!(at_rest.contains(&1.0));

        // Past the peak: the closest sample.
        let beyond = spring.raw_progress(5.0);
        assert_eq!(beyond.len(), 1);
        assert!(spring.adjusted_progress(beyond[0]) > 1.0);
    }
}
