use kurbo::{CubicBez, ParamCurve, ParamCurveDeriv, Point, QuadBez};

use crate::settings::value::{Mapping, Value};

/// Named timing curves as `[p1x, p1y, p2x, p2y]`.
pub const TIMING_PRESETS: [(&str, [f64; 4]); 5] = [
    ("ease", [0.25, 0.1, 0.25, 1.0]),
    ("linear", [0.0, 0.0, 1.0, 1.0]),
    ("ease-in", [0.42, 0.0, 1.0, 1.0]),
    ("ease-out", [0.0, 0.0, 0.58, 1.0]),
    ("ease-in-out", [0.42, 0.0, 0.58, 1.0]),
];

const NEWTON_ITERATIONS: usize = 8;
const BISECTION_LIMIT: usize = 64;

/// Cubic timing curve from (0,0) to (1,1), evaluated as y for a given x.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubicTiming {
    curve: CubicBez,
    deriv: QuadBez,
}

impl CubicTiming {
    /// Curve with control points `(p1x, p1y)` and `(p2x, p2y)`.
    pub fn new(p1x: f64, p1y: f64, p2x: f64, p2y: f64) -> Self {
        let curve = CubicBez::new(
            Point::ORIGIN,
            Point::new(p1x, p1y),
            Point::new(p2x, p2y),
            Point::new(1.0, 1.0),
        );
        Self {
            curve,
            deriv: curve.deriv(),
        }
    }

    /// Curve from `[p1x, p1y, p2x, p2y]`.
    pub fn from_points(p: [f64; 4]) -> Self {
        Self::new(p[0], p[1], p[2], p[3])
    }

    /// Named preset (`ease`, `linear`, `ease-in`, `ease-out`, `ease-in-out`).
    pub fn preset(name: &str) -> Option<Self> {
        TIMING_PRESETS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, p)| Self::from_points(*p))
    }

    /// Eased progress for linear progress `x` of a transition lasting `duration`.
    pub fn at_time(&self, x: f64, duration: f64) -> f64 {
        self.solve(x, solve_epsilon(duration))
    }

    /// y on the curve where x is `x`, to within `epsilon` in x.
    pub fn solve(&self, x: f64, epsilon: f64) -> f64 {
        self.curve.eval(self.solve_t_for_x(x, epsilon)).y
    }

    fn solve_t_for_x(&self, x: f64, epsilon: f64) -> f64 {
        let mut t = x;
        for _ in 0..NEWTON_ITERATIONS {
            let err = self.curve.eval(t).x - x;
            if err.abs() < epsilon {
                return t;
            }
            let slope = self.deriv.eval(t).x;
            if slope.abs() < 1e-6 {
                break;
            }
            t -= err / slope;
        }

        let (mut lo, mut hi) = (0.0, 1.0);
        t = x;
        if t < lo {
            return lo;
        }
        if t > hi {
            return hi;
        }
        for _ in 0..BISECTION_LIMIT {
            if lo >= hi {
                break;
            }
            let cur = self.curve.eval(t).x;
            if (cur - x).abs() < epsilon {
                return t;
            }
            if x > cur {
                lo = t;
            } else {
                hi = t;
            }
            t = (hi - lo) * 0.5 + lo;
        }
        t
    }
}

/// Solver tolerance for a transition lasting `duration` time units.
pub fn solve_epsilon(duration: f64) -> f64 {
    1.0 / (200.0 * duration)
}

/// Preset table as a settings mapping of name to four numbers.
pub fn presets_value() -> Value {
    let mut m = Mapping::new();
    for (name, points) in TIMING_PRESETS {
        m.insert(
            name.to_owned(),
            Value::Sequence(points.iter().map(|p| Value::Number(*p)).collect()),
        );
    }
    Value::Mapping(m)
}

/// Curve named by a preset string or given as four numbers.
pub fn timing_from_value(v: &Value) -> Option<CubicTiming> {
    match v {
        Value::Text(name) => CubicTiming::preset(name),
        Value::Sequence(items) if items.len() == 4 => {
            let mut p = [0.0; 4];
            for (slot, item) in p.iter_mut().zip(items) {
                *slot = item.coerce_f64()?;
            }
            Some(CubicTiming::from_points(p))
        }
        _ => None,
    }
}
