//! Topological kernel of a boundary-representation model.
//!
//! A [`Brep`] owns flat arrays of vertices, edges, trims, loops and faces
//! plus the curve and surface tables they reference. Every cross reference
//! is a plain index newtype; records are soft-deleted in place and only
//! renumbered by [`Brep::compact`].

pub mod edit;
pub mod error;
pub mod geometry;
pub mod topology;
pub mod validation;

pub use error::BrepError;
pub use geometry::{BoundingBox, Curve, Interval, Mesh, Point2d, Point3d, Surface, Transform, Vec3};
pub use topology::brep::{Brep, BrepId};
pub use topology::index::*;
pub use topology::records::*;
pub use validation::{RepairMode, TextLog, ValidationConfig, ValidationReport};

/// 2^-32. Values closer than this to zero are treated as zero.
pub const ZERO_TOLERANCE: f64 = 2.328_306_436_538_696_3e-10;

/// 2^-26, the square root of double precision epsilon.
pub const SQRT_EPSILON: f64 = 1.490_116_119_384_765_6e-8;

/// Numeric policy shared by construction and edit operations.
///
/// The validator carries its own overridable copy in
/// [`ValidationConfig`]; these values are the defaults for both.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Absolute zero for distances and parameter gaps.
    pub zero: f64,
    /// Relative tolerance, scaled by coordinate magnitude.
    pub relative: f64,
    /// Angles smaller than this (radians) are considered zero.
    pub angular: f64,
    /// How far a cached overall bounding box may exceed the computed one
    /// before a warning is raised.
    pub bbox_leniency: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            zero: ZERO_TOLERANCE,
            relative: SQRT_EPSILON,
            angular: std::f64::consts::PI / 180.0,
            bbox_leniency: 3.0,
        }
    }
}

impl Tolerance {
    /// Distance below which two points of magnitude around `scale` coincide.
    pub fn distance(&self, scale: f64) -> f64 {
        (self.relative * scale.abs()).max(self.zero)
    }

    pub fn points_coincident(&self, a: &Point3d, b: &Point3d) -> bool {
        let scale = a.max_abs_coordinate().max(b.max_abs_coordinate());
        a.distance_to(b) <= self.distance(scale)
    }

    pub fn is_zero_angle(&self, angle: f64) -> bool {
        angle.abs() <= self.angular
    }
}

/// The process-wide default tolerance policy.
pub fn default_tolerance() -> Tolerance {
    Tolerance::default()
}
