//! Piecewise-linear mapping from employment rate to happiness change.

use serde::{Deserialize, Serialize};

/// Single control point of a [`HappinessCurve`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Employment rate in `0.0..=1.0`.
    pub rate: f32,
    /// Happiness change at that rate.
    pub delta: f32,
}

/// Happiness change as a function of the global employment rate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HappinessCurve {
    keyframes: Vec<Keyframe>,
}

impl Default for HappinessCurve {
    fn default() -> Self {
        Self::new(vec![
            Keyframe { rate: 0.0, delta: -8.0 },
            Keyframe { rate: 0.4, delta: -3.0 },
            Keyframe { rate: 0.7, delta: 0.0 },
            Keyframe { rate: 0.85, delta: 2.0 },
            Keyframe { rate: 0.95, delta: 3.0 },
        ])
    }
}

impl HappinessCurve {
    /// Creates a curve from keyframes; they are sorted by rate.
    #[must_use]
    pub fn new(mut keyframes: Vec<Keyframe>) -> Self {
        keyframes.sort_by(|left, right| left.rate.total_cmp(&right.rate));
        Self { keyframes }
    }

    /// Interpolated change at the provided rate, flat beyond the outer keyframes.
    #[must_use]
    pub fn evaluate(&self, rate: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keyframes.first(), self.keyframes.last()) else {
            return 0.0;
        };
        if rate <= first.rate {
            return first.delta;
        }
        if rate >= last.rate {
            return last.delta;
        }
        for pair in self.keyframes.windows(2) {
            let (low, high) = (pair[0], pair[1]);
            if rate <= high.rate {
                let span = high.rate - low.rate;
                if span <= f32::EPSILON {
                    return high.delta;
                }
                let t = (rate - low.rate) / span;
                return low.delta + (high.delta - low.delta) * t;
            }
        }
        last.delta
    }

    /// Rounded happiness adjustment at the provided rate.
    #[must_use]
    pub fn happiness_delta(&self, rate: f32) -> i32 {
        self.evaluate(rate).round() as i32
    }
}
