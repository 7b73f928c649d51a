use nalgebra::{Matrix3, Matrix4};
use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::vector::Vec3;

/// How a transform relates to rigid motions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Similarity {
    /// Rotation, translation and uniform scale.
    Preserving,
    /// As above composed with a reflection.
    Reversing,
    /// Shear, non-uniform scale, projection or singular.
    None,
}

/// A 4x4 affine transformation matrix stored in column-major order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Column-major 4x4 matrix entries.
    pub m: [f64; 16],
}

impl Transform {
    pub fn identity() -> Self {
        Self::from_matrix(&Matrix4::identity())
    }

    pub fn from_matrix(matrix: &Matrix4<f64>) -> Self {
        let mut m = [0.0; 16];
        m.copy_from_slice(matrix.as_slice());
        Self { m }
    }

    pub fn matrix(&self) -> Matrix4<f64> {
        Matrix4::from_column_slice(&self.m)
    }

    fn linear(&self) -> Matrix3<f64> {
        self.matrix().fixed_view::<3, 3>(0, 0).into_owned()
    }

    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        Self::from_matrix(&Matrix4::new_translation(&nalgebra::Vector3::new(dx, dy, dz)))
    }

    pub fn scaling(sx: f64, sy: f64, sz: f64) -> Self {
        Self::from_matrix(&Matrix4::new_nonuniform_scaling(&nalgebra::Vector3::new(sx, sy, sz)))
    }

    pub fn uniform_scaling(s: f64) -> Self {
        Self::from_matrix(&Matrix4::new_scaling(s))
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        Self::rotation_axis_angle(Vec3::Z, angle)
    }

    /// Rotation about an arbitrary axis through the origin.
    pub fn rotation_axis_angle(axis: Vec3, angle: f64) -> Self {
        let axis = nalgebra::Vector3::new(axis.x, axis.y, axis.z);
        match nalgebra::Unit::try_new(axis, f64::EPSILON) {
            Some(unit) => Self::from_matrix(&nalgebra::Rotation3::from_axis_angle(&unit, angle).to_homogeneous()),
            None => Self::identity(),
        }
    }

    /// Mirror through the plane with the given normal passing through the origin.
    pub fn mirror(normal: Vec3) -> Self {
        let Some(n) = normal.normalized() else {
            return Self::identity();
        };
        let n = nalgebra::Vector3::new(n.x, n.y, n.z);
        let linear = Matrix3::identity() - 2.0 * n * n.transpose();
        Self::from_matrix(&linear.to_homogeneous())
    }

    /// Shear that adds `factor * y` to x.
    pub fn shear_xy(factor: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 1)] = factor;
        Self::from_matrix(&m)
    }

    pub fn transform_point(&self, p: &Point3d) -> Point3d {
        let h = self.matrix() * nalgebra::Vector4::new(p.x, p.y, p.z, 1.0);
        if h.w != 1.0 && h.w.abs() > f64::EPSILON {
            Point3d::new(h.x / h.w, h.y / h.w, h.z / h.w)
        } else {
            Point3d::new(h.x, h.y, h.z)
        }
    }

    /// Transform a homogeneous point `(x*w, y*w, z*w, w)`.
    pub fn transform_homogeneous(&self, p: &Point3d, w: f64) -> (Point3d, f64) {
        let h = self.matrix() * nalgebra::Vector4::new(p.x, p.y, p.z, w);
        (Point3d::new(h.x, h.y, h.z), h.w)
    }

    /// Transform a vector (no translation).
    pub fn transform_vector(&self, v: &Vec3) -> Vec3 {
        let r = self.linear() * nalgebra::Vector3::new(v.x, v.y, v.z);
        Vec3::new(r.x, r.y, r.z)
    }

    /// Transform a surface normal using the inverse transpose.
    pub fn transform_normal(&self, n: &Vec3) -> Option<Vec3> {
        let inv_t = self.linear().try_inverse()?.transpose();
        let r = inv_t * nalgebra::Vector3::new(n.x, n.y, n.z);
        Vec3::new(r.x, r.y, r.z).normalized()
    }

    /// Compose: apply `self` first, then `other`.
    pub fn then(&self, other: &Transform) -> Transform {
        Self::from_matrix(&(other.matrix() * self.matrix()))
    }

    pub fn inverse(&self) -> Option<Self> {
        let m = self.matrix();
        if m.determinant().abs() < 1e-15 {
            return None;
        }
        m.try_inverse().map(|inv| Self::from_matrix(&inv))
    }

    /// Determinant of the linear 3x3 part.
    pub fn determinant(&self) -> f64 {
        self.linear().determinant()
    }

    pub fn is_identity(&self, tolerance: f64) -> bool {
        self.matrix()
            .iter()
            .zip(Matrix4::<f64>::identity().iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    pub fn is_affine(&self) -> bool {
        let m = self.matrix();
        m[(3, 0)] == 0.0 && m[(3, 1)] == 0.0 && m[(3, 2)] == 0.0 && m[(3, 3)] == 1.0
    }

    /// Classify the map; similarities send planes, circles and spheres to
    /// shapes of the same kind.
    pub fn similarity(&self, tolerance: f64) -> Similarity {
        if !self.is_affine() {
            return Similarity::None;
        }
        let l = self.linear();
        let det = l.determinant();
        if det.abs() <= tolerance {
            return Similarity::None;
        }
        let gram = l.transpose() * l;
        let s2 = (gram[(0, 0)] + gram[(1, 1)] + gram[(2, 2)]) / 3.0;
        let scaled_tol = tolerance * s2.max(1.0);
        for r in 0..3 {
            for c in 0..3 {
                let expected = if r == c { s2 } else { 0.0 };
                if (gram[(r, c)] - expected).abs() > scaled_tol {
                    return Similarity::None;
                }
            }
        }
        if det > 0.0 {
            Similarity::Preserving
        } else {
            Similarity::Reversing
        }
    }

    /// Uniform scale factor of a similarity; `None` for other maps.
    pub fn similarity_scale(&self, tolerance: f64) -> Option<f64> {
        match self.similarity(tolerance) {
            Similarity::None => None,
            _ => Some(self.determinant().abs().cbrt()),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_identity_transform() {
        let t = Transform::identity();
        let p = Point3d::new(1.0, 2.0, 3.0);
        let result = t.transform_point(&p);
        assert!((result.x - 1.0).abs() < 1e-12);
        assert!((result.y - 2.0).abs() < 1e-12);
        assert!((result.z - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_translation_column_major() {
        let t = Transform::translation(10.0, 20.0, 30.0);
        assert_eq!(t.m[12], 10.0);
        let result = t.transform_point(&Point3d::new(1.0, 2.0, 3.0));
        assert!((result.x - 11.0).abs() < 1e-12);
        assert!((result.z - 33.0).abs() < 1e-12);
        let v = t.transform_vector(&Vec3::X);
        assert_eq!(v, Vec3::X);
    }

    #[test]
    fn test_rotation_z_90() {
        let t = Transform::rotation_z(FRAC_PI_2);
        let result = t.transform_point(&Point3d::new(1.0, 0.0, 0.0));
        assert!(result.x.abs() < 1e-12);
        assert!((result.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_compose_order() {
        let scale = Transform::uniform_scaling(2.0);
        let shift = Transform::translation(1.0, 0.0, 0.0);
        let p = scale.then(&shift).transform_point(&Point3d::new(1.0, 0.0, 0.0));
        assert!((p.x - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = Transform::rotation_axis_angle(Vec3::new(1.0, 1.0, 0.0), 0.7)
            .then(&Transform::translation(5.0, -3.0, 7.0));
        let inv = t.inverse().unwrap();
        let p = Point3d::new(1.0, 2.0, 3.0);
        let back = inv.transform_point(&t.transform_point(&p));
        assert!(back.distance_to(&p) < 1e-12);
        assert!(Transform::scaling(1.0, 0.0, 1.0).inverse().is_none());
    }

    #[test]
    fn test_similarity_classification() {
        let tol = 1e-12;
        assert_eq!(Transform::rotation_z(0.3).similarity(tol), Similarity::Preserving);
        assert_eq!(Transform::uniform_scaling(4.0).similarity(tol), Similarity::Preserving);
        assert_eq!(Transform::mirror(Vec3::X).similarity(tol), Similarity::Reversing);
        assert_eq!(Transform::shear_xy(0.5).similarity(tol), Similarity::None);
        assert_eq!(Transform::scaling(1.0, 2.0, 1.0).similarity(tol), Similarity::None);
        let s = Transform::uniform_scaling(2.0).similarity_scale(tol).unwrap();
        assert!((s - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_normal_under_shear() {
        let t = Transform::shear_xy(1.0);
        let n = t.transform_normal(&Vec3::Y).unwrap();
        let tangent = t.transform_vector(&Vec3::X);
        assert!(n.dot(&tangent).abs() < 1e-12);
    }
}
