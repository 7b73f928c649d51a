use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

use super::vector::Vec3;

/// A point in 3D Euclidean space.
///
/// Parameter-space (2D) curves store their points here with `z == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3d {
    pub const ORIGIN: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Self) -> f64 {
        (*self - *other).length()
    }

    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self {
            x: self.x + t * (other.x - self.x),
            y: self.y + t * (other.y - self.y),
            z: self.z + t * (other.z - self.z),
        }
    }

    pub fn midpoint(&self, other: &Self) -> Self {
        self.lerp(other, 0.5)
    }

    /// Largest coordinate magnitude; used to scale relative tolerances.
    pub fn max_abs_coordinate(&self) -> f64 {
        self.x.abs().max(self.y.abs()).max(self.z.abs())
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn to_vec3(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Drop the z coordinate.
    pub fn xy(&self) -> Point2d {
        Point2d::new(self.x, self.y)
    }

    /// Average of a non-empty set of points.
    pub fn centroid(points: &[Point3d]) -> Option<Point3d> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f64;
        let sum = points
            .iter()
            .fold(Vec3::ZERO, |acc, p| acc + p.to_vec3());
        Some(Point3d::new(sum.x / n, sum.y / n, sum.z / n))
    }
}

impl Add<Vec3> for Point3d {
    type Output = Point3d;
    fn add(self, rhs: Vec3) -> Self::Output {
        Point3d::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3d {
    type Output = Vec3;
    fn sub(self, rhs: Self) -> Self::Output {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Sub<Vec3> for Point3d {
    type Output = Point3d;
    fn sub(self, rhs: Vec3) -> Self::Output {
        Point3d::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

/// A point in a surface's (u, v) parameter space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2d {
    pub x: f64,
    pub y: f64,
}

impl Point2d {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn max_abs_coordinate(&self) -> f64 {
        self.x.abs().max(self.y.abs())
    }

    /// Lift into the z = 0 plane.
    pub fn to_3d(&self) -> Point3d {
        Point3d::new(self.x, self.y, 0.0)
    }
}

impl From<Point2d> for Point3d {
    fn from(p: Point2d) -> Self {
        p.to_3d()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centroid() {
        let c = Point3d::centroid(&[
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(2.0, 0.0, 0.0),
            Point3d::new(2.0, 4.0, 0.0),
            Point3d::new(0.0, 4.0, 0.0),
        ])
        .unwrap();
        assert!((c.x - 1.0).abs() < 1e-12);
        assert!((c.y - 2.0).abs() < 1e-12);
        assert!(Point3d::centroid(&[]).is_none());
    }

    #[test]
    fn test_max_abs_coordinate() {
        let p = Point3d::new(-7.0, 2.0, 3.0);
        assert_eq!(p.max_abs_coordinate(), 7.0);
        assert_eq!(p.xy(), Point2d::new(-7.0, 2.0));
    }

    #[test]
    fn test_point2d_lift() {
        let p: Point3d = Point2d::new(1.5, -2.0).into();
        assert_eq!(p, Point3d::new(1.5, -2.0, 0.0));
    }
}
