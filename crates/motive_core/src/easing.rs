//! Easing functions for keyframe segments
//!
//! Mirrors the CSS timing-function keywords. Every keyword is a named
//! cubic bezier; `cubic-bezier(x1, y1, x2, y2)` covers everything else.

use crate::error::MotionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Easing function type
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Easing {
    #[default]
    Linear,
    Ease,
    EaseIn,
    EaseOut,
    EaseInOut,
    CubicBezier(f32, f32, f32, f32),
}

impl Easing {
    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f32) -> f32 {
        match self.control_points() {
            None => t,
            Some(_) if t <= 0.0 => 0.0,
            Some(_) if t >= 1.0 => 1.0,
            Some(points) => UnitBezier::new(points).solve(t as f64) as f32,
        }
    }

    /// Control points of the curve; `None` for linear
    pub fn control_points(&self) -> Option<[f32; 4]> {
        match *self {
            Easing::Linear => None,
            Easing::Ease => Some([0.25, 0.1, 0.25, 1.0]),
            Easing::EaseIn => Some([0.42, 0.0, 1.0, 1.0]),
            Easing::EaseOut => Some([0.0, 0.0, 0.58, 1.0]),
            Easing::EaseInOut => Some([0.42, 0.0, 0.58, 1.0]),
            Easing::CubicBezier(x1, y1, x2, y2) => Some([x1, y1, x2, y2]),
        }
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Linear => f.write_str("linear"),
            Easing::Ease => f.write_str("ease"),
            Easing::EaseIn => f.write_str("ease-in"),
            Easing::EaseOut => f.write_str("ease-out"),
            Easing::EaseInOut => f.write_str("ease-in-out"),
            Easing::CubicBezier(x1, y1, x2, y2) => {
                write!(f, "cubic-bezier({x1}, {y1}, {x2}, {y2})")
            }
        }
    }
}

impl FromStr for Easing {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "linear" => return Ok(Easing::Linear),
            "ease" => return Ok(Easing::Ease),
            "ease-in" => return Ok(Easing::EaseIn),
            "ease-out" => return Ok(Easing::EaseOut),
            "ease-in-out" => return Ok(Easing::EaseInOut),
            _ => {}
        }

        let args = s
            .strip_prefix("cubic-bezier(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| MotionError::configuration(format!("unknown easing `{s}`")))?;

        let points = args
            .split(',')
            .map(|part| part.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MotionError::configuration(format!("bad cubic-bezier `{s}`: {e}")))?;

        let [x1, y1, x2, y2] = points[..] else {
            return Err(MotionError::configuration(format!(
                "cubic-bezier needs 4 control values, got {} in `{s}`",
                points.len()
            )));
        };

        // x control points stay inside the unit interval so the curve is a function of time
        if !(0.0..=1.0).contains(&x1) || !(0.0..=1.0).contains(&x2) {
            return Err(MotionError::configuration(format!(
                "cubic-bezier x values must be within [0, 1] in `{s}`"
            )));
        }

        Ok(Easing::CubicBezier(x1, y1, x2, y2))
    }
}

impl TryFrom<String> for Easing {
    type Error = MotionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Easing> for String {
    fn from(easing: Easing) -> Self {
        easing.to_string()
    }
}

/// One axis of a unit bezier (end points 0 and 1), as polynomial
/// coefficients so that B(t) = ((a·t + b)·t + c)·t
#[derive(Clone, Copy, Debug)]
struct BezierAxis {
    a: f64,
    b: f64,
    c: f64,
}

impl BezierAxis {
    fn new(p1: f32, p2: f32) -> Self {
        let (p1, p2) = (p1 as f64, p2 as f64);
        let c = 3.0 * p1;
        let b = 3.0 * (p2 - p1) - c;
        Self {
            a: 1.0 - c - b,
            b,
            c,
        }
    }

    fn sample(&self, t: f64) -> f64 {
        ((self.a * t + self.b) * t + self.c) * t
    }

    fn slope(&self, t: f64) -> f64 {
        (3.0 * self.a * t + 2.0 * self.b) * t + self.c
    }
}

/// CSS timing curve. Progress maps to the curve parameter through `x`,
/// and the eased value is `y` at that parameter. Computed in f64.
#[derive(Clone, Copy, Debug)]
struct UnitBezier {
    x: BezierAxis,
    y: BezierAxis,
}

impl UnitBezier {
    const EPSILON: f64 = 1e-7;

    fn new([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self {
            x: BezierAxis::new(x1, x2),
            y: BezierAxis::new(y1, y2),
        }
    }

    fn solve(&self, progress: f64) -> f64 {
        self.y.sample(self.parameter_for(progress))
    }

    /// Curve parameter whose x equals `progress`: Newton-Raphson first,
    /// bisection when the slope flattens out
    fn parameter_for(&self, progress: f64) -> f64 {
        let mut t = progress;
        for _ in 0..8 {
            let err = self.x.sample(t) - progress;
            if err.abs() < Self::EPSILON {
                return t;
            }
            let slope = self.x.slope(t);
            if slope.abs() < Self::EPSILON {
                break;
            }
            t -= err / slope;
        }

        let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
        t = progress;
        for _ in 0..20 {
            let x = self.x.sample(t);
            if (x - progress).abs() < Self::EPSILON {
                break;
            }
            if x < progress {
                lo = t;
            } else {
                hi = t;
            }
            t = (lo + hi) * 0.5;
        }
        t
    }
}
