//! Easing functions for tweens
//!
//! An easing remaps normalized time `[0, 1]` onto normalized progress.

/// Easing function type
#[derive(Clone, Copy, Debug, Default)]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    CubicBezier(f64, f64, f64, f64),
    Custom(fn(f64) -> f64),
}

impl Easing {
    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::EaseIn | Easing::EaseInCubic => t * t * t,
            Easing::EaseOut | Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOut | Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::EaseInQuart => t * t * t * t,
            Easing::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Easing::EaseInOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            Easing::EaseInSine => 1.0 - (t * std::f64::consts::FRAC_PI_2).cos(),
            Easing::EaseOutSine => (t * std::f64::consts::FRAC_PI_2).sin(),
            Easing::EaseInOutSine => -((std::f64::consts::PI * t).cos() - 1.0) / 2.0,
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, *x1, *y1, *x2, *y2),
            Easing::Custom(f) => f(t),
        }
    }

    /// Look up an easing by its kebab-case name (`"ease-out-cubic"`)
    pub fn from_name(name: &str) -> Option<Self> {
        let easing = match name {
            "linear" => Easing::Linear,
            "ease-in" => Easing::EaseIn,
            "ease-out" => Easing::EaseOut,
            "ease-in-out" => Easing::EaseInOut,
            "ease-in-quad" => Easing::EaseInQuad,
            "ease-out-quad" => Easing::EaseOutQuad,
            "ease-in-out-quad" => Easing::EaseInOutQuad,
            "ease-in-cubic" => Easing::EaseInCubic,
            "ease-out-cubic" => Easing::EaseOutCubic,
            "ease-in-out-cubic" => Easing::EaseInOutCubic,
            "ease-in-quart" => Easing::EaseInQuart,
            "ease-out-quart" => Easing::EaseOutQuart,
            "ease-in-out-quart" => Easing::EaseInOutQuart,
            "ease-in-sine" => Easing::EaseInSine,
            "ease-out-sine" => Easing::EaseOutSine,
            "ease-in-out-sine" => Easing::EaseInOutSine,
            _ => return None,
        };
        Some(easing)
    }
}

/// One axis of a unit cubic bezier whose end points are 0 and 1, kept as
/// polynomial coefficients `a s^3 + b s^2 + c s`.
#[derive(Clone, Copy)]
struct BezierAxis {
    a: f64,
    b: f64,
    c: f64,
}

impl BezierAxis {
    fn new(p1: f64, p2: f64) -> Self {
        let c = 3.0 * p1;
        let b = 3.0 * (p2 - p1) - c;
        Self { a: 1.0 - c - b, b, c }
    }

    #[inline]
    fn at(self, s: f64) -> f64 {
        ((self.a * s + self.b) * s + self.c) * s
    }

    #[inline]
    fn slope(self, s: f64) -> f64 {
        (3.0 * self.a * s + 2.0 * self.b) * s + self.c
    }

    /// Curve parameter at which this axis reaches `x`. Newton steps first;
    /// bisection when the curve flattens out or Newton has not converged.
    fn solve(self, x: f64) -> f64 {
        const EPSILON: f64 = 1e-7;

        let mut s = x;
        for _ in 0..8 {
            let error = self.at(s) - x;
            if error.abs() < EPSILON {
                return s;
            }
            let slope = self.slope(s);
            if slope.abs() < EPSILON {
                break;
            }
            s -= error / slope;
        }

        let (mut lo, mut hi) = (0.0, 1.0);
        s = x;
        for _ in 0..20 {
            let error = self.at(s) - x;
            if error.abs() < EPSILON {
                break;
            }
            if error < 0.0 {
                lo = s;
            } else {
                hi = s;
            }
            s = (lo + hi) * 0.5;
        }
        s
    }
}

/// CSS `cubic-bezier(x1, y1, x2, y2)` evaluated at progress `t`
fn cubic_bezier_ease(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let s = BezierAxis::new(x1, x2).solve(t);
    BezierAxis::new(y1, y2).at(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 16] = [
        Easing::Linear,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
        Easing::EaseInQuad,
        Easing::EaseOutQuad,
        Easing::EaseInOutQuad,
        Easing::EaseInCubic,
        Easing::EaseOutCubic,
        Easing::EaseInOutCubic,
        Easing::EaseInQuart,
        Easing::EaseOutQuart,
        Easing::EaseInOutQuart,
        Easing::EaseInSine,
        Easing::EaseOutSine,
        Easing::EaseInOutSine,
    ];

    #[test]
    fn test_endpoints_are_fixed() {
        for easing in ALL {
            assert!(easing.apply(0.0).abs() < 1e-9, "{easing:?} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-9, "{easing:?} at 1");
        }
    }

    #[test]
    fn test_symmetric_curves_pass_through_half() {
        for easing in [Easing::Linear, Easing::EaseInOutQuad, Easing::EaseInOutSine] {
            assert!((easing.apply(0.5) - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_css_ease_bezier() {
        let ease = Easing::CubicBezier(0.25, 0.1, 0.25, 1.0);
        let mid = ease.apply(0.5);
        assert!((mid - 0.8024).abs() < 1e-3, "got {mid}");
    }

    #[test]
    fn test_bezier_axis_solve_inverts() {
        // (0.9, 0.1) is nearly flat mid-curve, which pushes the solver into bisection
        for (p1, p2) in [(0.42, 0.58), (0.25, 0.25), (0.9, 0.1)] {
            let axis = BezierAxis::new(p1, p2);
            for i in 1..10 {
                let x = f64::from(i) / 10.0;
                let s = axis.solve(x);
                assert!((axis.at(s) - x).abs() < 1e-5, "({p1}, {p2}) at {x}");
            }
        }
    }

    #[test]
    fn test_custom_easing() {
        fn step(t: f64) -> f64 {
            if t < 1.0 {
                0.0
            } else {
                1.0
            }
        }
        assert_eq!(Easing::Custom(step).apply(0.7), 0.0);
    }

    #[test]
    fn test_from_name() {
        assert!(matches!(
            Easing::from_name("ease-out-cubic"),
            Some(Easing::EaseOutCubic)
        ));
        assert!(Easing::from_name("bouncy").is_none());
    }
}
