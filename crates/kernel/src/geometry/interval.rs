use serde::{Deserialize, Serialize};

/// A closed parameter interval `[t0, t1]`.
///
/// Curve and surface domains are always increasing; proxies may carry a
/// decreasing interval only transiently while being built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub t0: f64,
    pub t1: f64,
}

impl Interval {
    pub const UNIT: Self = Self { t0: 0.0, t1: 1.0 };

    pub fn new(t0: f64, t1: f64) -> Self {
        Self { t0, t1 }
    }

    pub fn length(&self) -> f64 {
        self.t1 - self.t0
    }

    pub fn is_increasing(&self) -> bool {
        self.t0 < self.t1 && self.t0.is_finite() && self.t1.is_finite()
    }

    pub fn mid(&self) -> f64 {
        0.5 * (self.t0 + self.t1)
    }

    /// Parameter at normalized position `s` (0 -> t0, 1 -> t1).
    pub fn param_at(&self, s: f64) -> f64 {
        if s == 0.0 {
            self.t0
        } else if s == 1.0 {
            self.t1
        } else {
            (1.0 - s) * self.t0 + s * self.t1
        }
    }

    /// Normalized position of `t` within the interval.
    pub fn normalized_param(&self, t: f64) -> f64 {
        if t == self.t0 {
            0.0
        } else if t == self.t1 {
            1.0
        } else if self.t0 == self.t1 {
            0.0
        } else {
            (t - self.t0) / (self.t1 - self.t0)
        }
    }

    /// Map `t` from this interval onto `target`.
    pub fn map_to(&self, t: f64, target: &Interval) -> f64 {
        target.param_at(self.normalized_param(t))
    }

    pub fn reversed(&self) -> Self {
        Self::new(-self.t1, -self.t0)
    }

    pub fn includes(&self, t: f64, tolerance: f64) -> bool {
        let (lo, hi) = self.min_max();
        t >= lo - tolerance && t <= hi + tolerance
    }

    /// True when `other` lies inside this interval, with slack `tolerance`.
    pub fn includes_interval(&self, other: &Interval, tolerance: f64) -> bool {
        self.includes(other.t0, tolerance) && self.includes(other.t1, tolerance)
    }

    pub fn min_max(&self) -> (f64, f64) {
        if self.t0 <= self.t1 {
            (self.t0, self.t1)
        } else {
            (self.t1, self.t0)
        }
    }

    /// Largest endpoint magnitude, for relative tolerances.
    pub fn magnitude(&self) -> f64 {
        self.t0.abs().max(self.t1.abs())
    }

    /// Equality up to a tolerance scaled by the endpoint magnitudes.
    pub fn approx_eq(&self, other: &Interval, relative: f64) -> bool {
        let tol = relative * self.magnitude().max(other.magnitude()).max(1.0);
        (self.t0 - other.t0).abs() <= tol && (self.t1 - other.t1).abs() <= tol
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::UNIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_round_trip_endpoints_exact() {
        let d = Interval::new(0.1, 0.7);
        assert_eq!(d.param_at(0.0), 0.1);
        assert_eq!(d.param_at(1.0), 0.7);
        assert_eq!(d.normalized_param(0.7), 1.0);
    }

    #[test]
    fn test_map_to() {
        let a = Interval::new(0.0, 2.0);
        let b = Interval::new(10.0, 20.0);
        assert!((a.map_to(0.5, &b) - 12.5).abs() < 1e-12);
    }

    #[test]
    fn test_includes_interval() {
        let a = Interval::new(0.0, 1.0);
        assert!(a.includes_interval(&Interval::new(0.25, 0.5), 0.0));
        assert!(!a.includes_interval(&Interval::new(0.5, 1.5), 1e-9));
        assert!(a.includes_interval(&Interval::new(0.0, 1.0 + 1e-12), 1e-9));
    }
}
