use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::point::{Point2d, Point3d};
use super::transform::Transform;
use super::vector::Vec3;

/// Axis-aligned bounding box.
///
/// The empty box has `min > max`; 2D boxes keep `z == 0`. A box with
/// non-finite corners serializes as `null` and reads back as empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3d,
    pub max: Point3d,
}

impl Serialize for BoundingBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let corners = (self.min.is_finite() && self.max.is_finite()).then_some((self.min, self.max));
        corners.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BoundingBox {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<(Point3d, Point3d)>::deserialize(deserializer)? {
            Some((min, max)) => Self { min, max },
            None => Self::empty(),
        })
    }
}

impl BoundingBox {
    pub fn new(min: Point3d, max: Point3d) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Point3d::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3d::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Degenerate box holding one point.
    pub fn point(p: Point3d) -> Self {
        Self { min: p, max: p }
    }

    pub fn from_points(points: &[Point3d]) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.expand_to_include(p);
        }
        bb
    }

    pub fn from_points_2d(points: &[Point2d]) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.expand_to_include(&p.to_3d());
        }
        bb
    }

    pub fn expand_to_include(&mut self, p: &Point3d) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Union; an invalid operand is ignored.
    pub fn union(&self, other: &Self) -> Self {
        if !other.is_valid() {
            return *self;
        }
        if !self.is_valid() {
            return *other;
        }
        Self {
            min: Point3d::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3d::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    pub fn contains_point(&self, p: &Point3d, tolerance: f64) -> bool {
        p.x >= self.min.x - tolerance
            && p.x <= self.max.x + tolerance
            && p.y >= self.min.y - tolerance
            && p.y <= self.max.y + tolerance
            && p.z >= self.min.z - tolerance
            && p.z <= self.max.z + tolerance
    }

    pub fn contains_box(&self, other: &Self, tolerance: f64) -> bool {
        !other.is_valid()
            || (self.contains_point(&other.min, tolerance) && self.contains_point(&other.max, tolerance))
    }

    pub fn center(&self) -> Point3d {
        self.min.midpoint(&self.max)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn diagonal(&self) -> f64 {
        if self.is_valid() { self.size().length() } else { 0.0 }
    }

    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x
            && self.min.y <= self.max.y
            && self.min.z <= self.max.z
            && self.min.is_finite()
            && self.max.is_finite()
    }

    /// Largest coordinate magnitude of either corner.
    pub fn max_abs_coordinate(&self) -> f64 {
        if self.is_valid() {
            self.min.max_abs_coordinate().max(self.max.max_abs_coordinate())
        } else {
            0.0
        }
    }

    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vec3::new(margin, margin, margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Box scaled by `factor` about its center.
    pub fn scaled(&self, factor: f64) -> Self {
        let c = self.center();
        let half = self.size() * (0.5 * factor);
        Self {
            min: c - half,
            max: c + half,
        }
    }

    pub fn corners(&self) -> [Point3d; 8] {
        let (a, b) = (self.min, self.max);
        [
            Point3d::new(a.x, a.y, a.z),
            Point3d::new(b.x, a.y, a.z),
            Point3d::new(a.x, b.y, a.z),
            Point3d::new(b.x, b.y, a.z),
            Point3d::new(a.x, a.y, b.z),
            Point3d::new(b.x, a.y, b.z),
            Point3d::new(a.x, b.y, b.z),
            Point3d::new(b.x, b.y, b.z),
        ]
    }

    /// Box of the transformed corners; exact for affine maps of boxes only
    /// in the sense of containing the image.
    pub fn transformed(&self, xform: &Transform) -> Self {
        if !self.is_valid() {
            return *self;
        }
        let pts: Vec<Point3d> = self.corners().iter().map(|p| xform.transform_point(p)).collect();
        Self::from_points(&pts)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box() {
        let bb = BoundingBox::from_points(&[
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 2.0, 3.0),
            Point3d::new(-1.0, 0.5, 1.0),
        ]);
        assert!((bb.min.x - (-1.0)).abs() < 1e-12);
        assert!((bb.max.y - 2.0).abs() < 1e-12);
        assert!(bb.contains_point(&Point3d::new(0.0, 1.0, 1.0), 0.0));
    }

    #[test]
    fn test_union_with_empty() {
        let a = BoundingBox::point(Point3d::new(1.0, 1.0, 1.0));
        assert_eq!(a.union(&BoundingBox::empty()), a);
        assert_eq!(BoundingBox::empty().union(&a), a);
        assert!(!BoundingBox::empty().is_valid());
    }

    #[test]
    fn test_scaled_about_center() {
        let b = BoundingBox::new(Point3d::ORIGIN, Point3d::new(2.0, 2.0, 2.0)).scaled(3.0);
        assert!((b.min.x + 2.0).abs() < 1e-12);
        assert!((b.max.z - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_transformed_box_contains_image() {
        let b = BoundingBox::new(Point3d::ORIGIN, Point3d::new(1.0, 1.0, 1.0));
        let t = Transform::rotation_z(0.5);
        let tb = b.transformed(&t);
        for c in b.corners() {
            assert!(tb.contains_point(&t.transform_point(&c), 1e-12));
        }
    }

    #[test]
    fn test_empty_box_serializes_as_null() {
        let json = serde_json::to_string(&BoundingBox::empty()).unwrap();
        assert_eq!(json, "null");
        let back: BoundingBox = serde_json::from_str(&json).unwrap();
        assert!(!back.is_valid());
        assert_eq!(back.union(&BoundingBox::point(Point3d::ORIGIN)), BoundingBox::point(Point3d::ORIGIN));

        let b = BoundingBox::new(Point3d::ORIGIN, Point3d::new(1.0, 2.0, 3.0));
        let back: BoundingBox = serde_json::from_str(&serde_json::to_string(&b).unwrap()).unwrap();
        assert_eq!(back, b);
    }
}
