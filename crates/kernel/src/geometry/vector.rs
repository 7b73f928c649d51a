use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A vector in 3D Euclidean space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const X: Self = Self::new(1.0, 0.0, 0.0);
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector, or `None` when the length is too small to normalize.
    pub fn normalized(&self) -> Option<Self> {
        let len = self.length();
        if len <= f64::MIN_POSITIVE.sqrt() || !len.is_finite() {
            None
        } else {
            Some(*self / len)
        }
    }

    pub fn is_tiny(&self, tolerance: f64) -> bool {
        self.x.abs() <= tolerance && self.y.abs() <= tolerance && self.z.abs() <= tolerance
    }

    /// Angle in radians between two vectors; zero if either is degenerate.
    pub fn angle_to(&self, other: &Self) -> f64 {
        if self.length() * other.length() <= f64::MIN_POSITIVE {
            return 0.0;
        }
        self.cross(other).length().atan2(self.dot(other))
    }

    /// Any unit vector perpendicular to `self`.
    pub fn perpendicular(&self) -> Option<Self> {
        let seed = if self.x.abs() <= self.y.abs() && self.x.abs() <= self.z.abs() {
            Vec3::X
        } else if self.y.abs() <= self.z.abs() {
            Vec3::Y
        } else {
            Vec3::Z
        };
        self.cross(&seed).normalized()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Self) -> Self::Output {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Self) -> Self::Output {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f64) -> Self::Output {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Div<f64> for Vec3 {
    type Output = Vec3;
    fn div(self, s: f64) -> Self::Output {
        Vec3::new(self.x / s, self.y / s, self.z / s)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Self::Output {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_right_handed() {
        assert_eq!(Vec3::X.cross(&Vec3::Y), Vec3::Z);
        assert_eq!(Vec3::Y.cross(&Vec3::X), -Vec3::Z);
    }

    #[test]
    fn test_normalized_zero() {
        assert!(Vec3::ZERO.normalized().is_none());
        let n = Vec3::new(3.0, 4.0, 0.0).normalized().unwrap();
        assert!((n.length() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_perpendicular() {
        let v = Vec3::new(0.3, -2.0, 5.0);
        let p = v.perpendicular().unwrap();
        assert!(p.dot(&v).abs() < 1e-12);
    }

    #[test]
    fn test_angle_opposite() {
        let a = Vec3::new(1.0, 1.0, 0.0);
        assert!((a.angle_to(&-a) - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn test_angle_resolves_tiny_deviation() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(1.0, 1e-10, 0.0);
        assert!((a.angle_to(&b) - 1e-10).abs() < 1e-20);
        assert_eq!(a.angle_to(&(a * 3.0)), 0.0);
        assert_eq!(a.angle_to(&Vec3::ZERO), 0.0);
    }
}
