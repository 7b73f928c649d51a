//! Topology records stored in the arrays of a [`Brep`](super::brep::Brep).
//!
//! Records never own each other. They reference their neighbours and the
//! shared geometry tables by index, and carry the [`BrepId`] of the Brep
//! whose array holds them. A record whose `index` is `None` has been
//! soft-deleted; its slot stays allocated until compaction.

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use super::brep::BrepId;
use super::index::*;
use crate::geometry::{BoundingBox, Curve, Interval, IsoType, Mesh, Point2d, Point3d, Vec3};

/// Classification of a trim relative to the other uses of its edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrimType {
    #[default]
    Unknown,
    /// The only trim on its edge.
    Boundary,
    /// Shares its edge with trims of other loops.
    Mated,
    /// Shares its edge with exactly one other trim of the same loop.
    Seam,
    /// No edge; collapses to one vertex on a surface pole.
    Singular,
    /// Interior curve-on-surface trim.
    CurveOnSurface,
    /// Degenerate point record; no edge and no 2D curve.
    PointOnSurface,
    /// Never valid on a trim; kept so stored values round-trip.
    Slit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LoopType {
    #[default]
    Unknown,
    Outer,
    Inner,
    Slit,
    CurveOnSurface,
    PointOnSurface,
}

/// A record's view of a shared curve: its own parameter `domain`, the
/// `curve_domain` it covers on the underlying curve, and whether it runs
/// against the curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveProxy {
    pub domain: Interval,
    pub curve_domain: Interval,
    pub reversed: bool,
}

impl CurveProxy {
    /// Identity view of a curve with the given domain.
    pub fn new(curve_domain: Interval) -> Self {
        Self {
            domain: curve_domain,
            curve_domain,
            reversed: false,
        }
    }

    /// Underlying curve parameter for proxy parameter `t`.
    pub fn curve_parameter(&self, t: f64) -> f64 {
        let s = self.domain.normalized_param(t);
        let s = if self.reversed { 1.0 - s } else { s };
        self.curve_domain.param_at(s)
    }

    /// Proxy parameter for underlying curve parameter `c`.
    pub fn proxy_parameter(&self, c: f64) -> f64 {
        let s = self.curve_domain.normalized_param(c);
        let s = if self.reversed { 1.0 - s } else { s };
        self.domain.param_at(s)
    }

    pub fn point_at(&self, curve: &Curve, t: f64) -> Point3d {
        curve.point_at(self.curve_parameter(t))
    }

    pub fn derivative(&self, curve: &Curve, t: f64) -> Vec3 {
        let d = curve.derivative(self.curve_parameter(t));
        let len = self.domain.length();
        let scale = if len != 0.0 { self.curve_domain.length() / len } else { 1.0 };
        if self.reversed { d * -scale } else { d * scale }
    }

    pub fn start_point(&self, curve: &Curve) -> Point3d {
        self.point_at(curve, self.domain.t0)
    }

    pub fn end_point(&self, curve: &Curve) -> Point3d {
        self.point_at(curve, self.domain.t1)
    }

    /// The proxy spans the whole underlying curve without reversal or
    /// reparameterization.
    pub fn is_identity(&self, curve_full_domain: &Interval) -> bool {
        !self.reversed && self.curve_domain == *curve_full_domain && self.domain == self.curve_domain
    }
}

impl Default for CurveProxy {
    fn default() -> Self {
        Self::new(Interval::UNIT)
    }
}

/// Common bookkeeping every record carries.
pub trait Record {
    const KIND: &'static str;

    /// Stored index, `None` once deleted.
    fn slot(&self) -> Option<usize>;

    fn owner(&self) -> BrepId;

    fn set_owner(&mut self, id: BrepId);

    fn is_live(&self) -> bool {
        self.slot().is_some()
    }
}

macro_rules! impl_record {
    ($ty:ty, $kind:literal) => {
        impl Record for $ty {
            const KIND: &'static str = $kind;

            fn slot(&self) -> Option<usize> {
                self.index.map(|i| i.0)
            }

            fn owner(&self) -> BrepId {
                self.brep
            }

            fn set_owner(&mut self, id: BrepId) {
                self.brep = id;
            }
        }
    };
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vertex {
    pub index: Option<VertexIndex>,
    #[serde(skip)]
    pub brep: BrepId,
    pub point: Point3d,
    /// Radius of positional uncertainty; `None` until computed.
    pub tolerance: Option<f64>,
    /// Incident edges; a closed edge appears twice.
    pub edges: Vec<EdgeIndex>,
}

impl Vertex {
    /// Number of edge ends meeting here.
    pub fn degree(&self) -> usize {
        self.edges.len()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Edge {
    pub index: Option<EdgeIndex>,
    #[serde(skip)]
    pub brep: BrepId,
    pub curve: Option<Curve3Index>,
    pub proxy: CurveProxy,
    pub vertices: [Option<VertexIndex>; 2],
    pub trims: Vec<TrimIndex>,
    /// Maximum deviation of curves claiming to lie on this edge.
    pub tolerance: Option<f64>,
}

impl Edge {
    pub fn domain(&self) -> Interval {
        self.proxy.domain
    }

    /// Both ends share one vertex.
    pub fn is_closed_topologically(&self) -> bool {
        self.vertices[0].is_some() && self.vertices[0] == self.vertices[1]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trim {
    pub index: Option<TrimIndex>,
    #[serde(skip)]
    pub brep: BrepId,
    pub loop_index: Option<LoopIndex>,
    pub curve: Option<Curve2Index>,
    pub proxy: CurveProxy,
    pub edge: Option<EdgeIndex>,
    pub vertices: [Option<VertexIndex>; 2],
    /// Runs against its edge's direction.
    pub reversed: bool,
    pub trim_type: TrimType,
    pub iso: IsoType,
    /// Per surface parameter direction.
    pub tolerance: [Option<f64>; 2],
    pub bbox: BoundingBox,
    #[serde(skip)]
    pub polyline: OnceLock<Vec<Point2d>>,
}

impl Trim {
    pub fn domain(&self) -> Interval {
        self.proxy.domain
    }

    /// Trims that carry no edge by construction.
    pub fn is_edgeless(&self) -> bool {
        matches!(self.trim_type, TrimType::Singular | TrimType::PointOnSurface)
    }

    /// Edge end (0 or 1) that this trim's `end` lands on.
    pub fn edge_end(&self, end: usize) -> usize {
        if self.reversed { 1 - end } else { end }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Loop {
    pub index: Option<LoopIndex>,
    #[serde(skip)]
    pub brep: BrepId,
    pub face: Option<FaceIndex>,
    pub trims: Vec<TrimIndex>,
    pub loop_type: LoopType,
    /// Parameter-space box of the trims.
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeshKind {
    Render,
    Analysis,
    Preview,
}

/// Cached meshes, shared between copies of a face until one is edited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaceMeshes {
    pub render: Option<Arc<Mesh>>,
    pub analysis: Option<Arc<Mesh>>,
    pub preview: Option<Arc<Mesh>>,
}

impl FaceMeshes {
    pub fn get(&self, kind: MeshKind) -> Option<&Arc<Mesh>> {
        match kind {
            MeshKind::Render => self.render.as_ref(),
            MeshKind::Analysis => self.analysis.as_ref(),
            MeshKind::Preview => self.preview.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, kind: MeshKind) -> &mut Option<Arc<Mesh>> {
        match kind {
            MeshKind::Render => &mut self.render,
            MeshKind::Analysis => &mut self.analysis,
            MeshKind::Preview => &mut self.preview,
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Arc<Mesh>> {
        [&mut self.render, &mut self.analysis, &mut self.preview]
            .into_iter()
            .flatten()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Per-face display overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceAppearance {
    /// RGBA.
    pub color: Option<[u8; 4]>,
    pub material: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Face {
    pub index: Option<FaceIndex>,
    #[serde(skip)]
    pub brep: BrepId,
    pub surface: Option<SurfaceIndex>,
    /// Loop 0 is the outer loop.
    pub loops: Vec<LoopIndex>,
    /// Orientation is opposite to the surface normal.
    pub reversed: bool,
    pub meshes: FaceMeshes,
    #[serde(skip)]
    pub bbox: OnceLock<BoundingBox>,
    pub pack_id: u32,
    pub appearance: FaceAppearance,
}

impl_record!(Vertex, "vertex");
impl_record!(Edge, "edge");
impl_record!(Trim, "trim");
impl_record!(Loop, "loop");
impl_record!(Face, "face");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_reversed_maps_ends() {
        let curve = Curve::line_2d(Point2d::new(0.0, 0.0), Point2d::new(2.0, 0.0));
        let proxy = CurveProxy {
            domain: Interval::new(10.0, 20.0),
            curve_domain: Interval::UNIT,
            reversed: true,
        };
        assert!((proxy.curve_parameter(10.0) - 1.0).abs() < 1e-12);
        assert!((proxy.start_point(&curve).x - 2.0).abs() < 1e-12);
        assert!(proxy.end_point(&curve).x.abs() < 1e-12);
        assert!((proxy.proxy_parameter(0.25) - 17.5).abs() < 1e-12);
        // d/dt of the image runs toward -x at 0.2 per unit.
        assert!((proxy.derivative(&curve, 15.0).x + 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_deleted_record_is_not_live() {
        let mut v = Vertex {
            index: Some(VertexIndex(0)),
            ..Default::default()
        };
        assert!(v.is_live());
        v.index = None;
        assert!(!v.is_live());
    }

    #[test]
    fn test_trim_edge_end() {
        let t = Trim {
            reversed: true,
            ..Default::default()
        };
        assert_eq!(t.edge_end(0), 1);
        assert_eq!(t.edge_end(1), 0);
    }

    #[test]
    fn test_default_vertex_is_tombstone_at_origin() {
        let v = Vertex::default();
        assert!(v.index.is_none());
        assert_eq!(v.point, Point3d::ORIGIN);
        assert!(v.edges.is_empty());
    }
}
