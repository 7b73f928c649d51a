//! Geometry collaborators consumed by the topology layer.
//!
//! Curves, surfaces and meshes are value objects; the kernel only relies on
//! the narrow evaluation / duplication / transform contract they expose.

pub mod bbox;
pub mod curves;
pub mod interval;
pub mod mesh;
pub mod nurbs;
pub mod point;
pub mod surfaces;
pub mod transform;
pub mod vector;

pub use bbox::BoundingBox;
pub use curves::{ArcCurve, Curve, CurveKind, LineCurve, PolyCurve};
pub use interval::Interval;
pub use mesh::Mesh;
pub use nurbs::{NurbsCurve, NurbsSurface};
pub use point::{Point2d, Point3d};
pub use surfaces::{CylinderSurface, IsoType, Plane, PlaneSurface, SphereSurface, Surface};
pub use transform::{Similarity, Transform};
pub use vector::Vec3;
