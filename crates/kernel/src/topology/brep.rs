use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::index::*;
use super::records::*;
use crate::error::{BrepError, Result};
use crate::geometry::{BoundingBox, Curve, Point2d, Point3d, Surface, Vec3};

/// Process-unique identity of a [`Brep`]; records store the id of the
/// Brep whose arrays hold them. `BrepId(0)` means "not owned".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrepId(pub u64);

impl BrepId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        BrepId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

// ─── Container ──────────────────────────────────────────────────────────────

/// Arena of topology records over shared geometry tables.
///
/// The arrays are public so persistence and algorithm layers can read and
/// write them directly; every edit that keeps the graph consistent goes
/// through the methods in `build`, `vertices` and `edit`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(from = "BrepTables")]
pub struct Brep {
    #[serde(skip)]
    id: BrepId,
    pub vertices: Vec<Vertex>,
    pub edges: Vec<Edge>,
    pub trims: Vec<Trim>,
    pub loops: Vec<Loop>,
    pub faces: Vec<Face>,
    pub curves2: Vec<Option<Curve>>,
    pub curves3: Vec<Option<Curve>>,
    pub surfaces: Vec<Option<Surface>>,
    #[serde(skip)]
    pub(crate) bbox: OnceLock<BoundingBox>,
    #[serde(skip)]
    pub(crate) solid: OnceLock<bool>,
}

/// Serialized shape of a [`Brep`]; deserializing issues a fresh id.
#[derive(Deserialize)]
struct BrepTables {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    trims: Vec<Trim>,
    loops: Vec<Loop>,
    faces: Vec<Face>,
    curves2: Vec<Option<Curve>>,
    curves3: Vec<Option<Curve>>,
    surfaces: Vec<Option<Surface>>,
}

impl From<BrepTables> for Brep {
    fn from(t: BrepTables) -> Self {
        let mut brep = Brep {
            id: BrepId::next(),
            vertices: t.vertices,
            edges: t.edges,
            trims: t.trims,
            loops: t.loops,
            faces: t.faces,
            curves2: t.curves2,
            curves3: t.curves3,
            surfaces: t.surfaces,
            bbox: OnceLock::new(),
            solid: OnceLock::new(),
        };
        brep.stamp_records();
        brep
    }
}

impl Clone for Brep {
    fn clone(&self) -> Self {
        let mut brep = Brep {
            id: BrepId::next(),
            vertices: self.vertices.clone(),
            edges: self.edges.clone(),
            trims: self.trims.clone(),
            loops: self.loops.clone(),
            faces: self.faces.clone(),
            curves2: self.curves2.clone(),
            curves3: self.curves3.clone(),
            surfaces: self.surfaces.clone(),
            bbox: self.bbox.clone(),
            solid: self.solid.clone(),
        };
        brep.stamp_records();
        brep
    }
}

impl Default for Brep {
    fn default() -> Self {
        Self::new()
    }
}

/// Live record at `i`, or the reason there is none.
pub(crate) fn checked<R: Record>(items: &[R], i: usize) -> Result<&R> {
    match items.get(i) {
        None => Err(BrepError::IndexOutOfRange { kind: R::KIND, index: i }),
        Some(r) if r.slot() != Some(i) => Err(BrepError::Deleted { kind: R::KIND, index: i }),
        Some(r) => Ok(r),
    }
}

fn live<R: Record>(items: &[R], i: usize) -> Option<&R> {
    items.get(i).filter(|r| r.slot() == Some(i))
}

impl Brep {
    pub fn new() -> Self {
        Self {
            id: BrepId::next(),
            vertices: Vec::new(),
            edges: Vec::new(),
            trims: Vec::new(),
            loops: Vec::new(),
            faces: Vec::new(),
            curves2: Vec::new(),
            curves3: Vec::new(),
            surfaces: Vec::new(),
            bbox: OnceLock::new(),
            solid: OnceLock::new(),
        }
    }

    pub fn id(&self) -> BrepId {
        self.id
    }

    /// Point every record's back-reference at this Brep.
    pub(crate) fn stamp_records(&mut self) {
        let id = self.id;
        self.vertices.iter_mut().for_each(|r| r.set_owner(id));
        self.edges.iter_mut().for_each(|r| r.set_owner(id));
        self.trims.iter_mut().for_each(|r| r.set_owner(id));
        self.loops.iter_mut().for_each(|r| r.set_owner(id));
        self.faces.iter_mut().for_each(|r| r.set_owner(id));
    }

    /// Drop every lazily computed cache.
    pub fn invalidate_caches(&mut self) {
        self.bbox = OnceLock::new();
        self.solid = OnceLock::new();
        for f in &mut self.faces {
            f.bbox = OnceLock::new();
        }
        for t in &mut self.trims {
            t.polyline = OnceLock::new();
        }
    }

    // ── Geometry tables ──

    /// Append a parameter-space curve. A curve of another dimension is
    /// coerced to 2D.
    pub fn add_curve2d(&mut self, mut curve: Curve) -> Curve2Index {
        if curve.dimension() != 2 {
            warn!(found = curve.dimension(), "2d curve table given a curve of another dimension; coercing");
            curve.change_dimension(2);
        }
        self.curves2.push(Some(curve));
        Curve2Index(self.curves2.len() - 1)
    }

    pub fn add_curve3d(&mut self, mut curve: Curve) -> Curve3Index {
        if curve.dimension() != 3 {
            warn!(found = curve.dimension(), "3d curve table given a curve of another dimension; coercing");
            curve.change_dimension(3);
        }
        self.curves3.push(Some(curve));
        Curve3Index(self.curves3.len() - 1)
    }

    pub fn add_surface(&mut self, surface: Surface) -> SurfaceIndex {
        self.surfaces.push(Some(surface));
        SurfaceIndex(self.surfaces.len() - 1)
    }

    pub fn curve2(&self, i: Curve2Index) -> Option<&Curve> {
        self.curves2.get(i.0)?.as_ref()
    }

    pub fn curve3(&self, i: Curve3Index) -> Option<&Curve> {
        self.curves3.get(i.0)?.as_ref()
    }

    pub fn surface(&self, i: SurfaceIndex) -> Option<&Surface> {
        self.surfaces.get(i.0)?.as_ref()
    }

    // ── Live record lookup ──

    pub fn vertex(&self, i: VertexIndex) -> Option<&Vertex> {
        live(&self.vertices, i.0)
    }

    pub fn edge(&self, i: EdgeIndex) -> Option<&Edge> {
        live(&self.edges, i.0)
    }

    pub fn trim(&self, i: TrimIndex) -> Option<&Trim> {
        live(&self.trims, i.0)
    }

    /// `loop` is a keyword, hence the suffix.
    pub fn loop_at(&self, i: LoopIndex) -> Option<&Loop> {
        live(&self.loops, i.0)
    }

    pub fn face(&self, i: FaceIndex) -> Option<&Face> {
        live(&self.faces, i.0)
    }

    pub(crate) fn live_vertex(&self, i: VertexIndex) -> Result<&Vertex> {
        checked(&self.vertices, i.0)
    }

    pub(crate) fn live_edge(&self, i: EdgeIndex) -> Result<&Edge> {
        checked(&self.edges, i.0)
    }

    pub(crate) fn live_trim(&self, i: TrimIndex) -> Result<&Trim> {
        checked(&self.trims, i.0)
    }

    pub(crate) fn live_loop(&self, i: LoopIndex) -> Result<&Loop> {
        checked(&self.loops, i.0)
    }

    pub(crate) fn live_face(&self, i: FaceIndex) -> Result<&Face> {
        checked(&self.faces, i.0)
    }

    pub fn vertex_indices(&self) -> impl Iterator<Item = VertexIndex> + '_ {
        self.vertices.iter().filter_map(|r| r.index)
    }

    pub fn edge_indices(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.edges.iter().filter_map(|r| r.index)
    }

    pub fn trim_indices(&self) -> impl Iterator<Item = TrimIndex> + '_ {
        self.trims.iter().filter_map(|r| r.index)
    }

    pub fn loop_indices(&self) -> impl Iterator<Item = LoopIndex> + '_ {
        self.loops.iter().filter_map(|r| r.index)
    }

    pub fn face_indices(&self) -> impl Iterator<Item = FaceIndex> + '_ {
        self.faces.iter().filter_map(|r| r.index)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.iter().filter(|r| r.is_live()).count()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|r| r.is_live()).count()
    }

    pub fn trim_count(&self) -> usize {
        self.trims.iter().filter(|r| r.is_live()).count()
    }

    pub fn loop_count(&self) -> usize {
        self.loops.iter().filter(|r| r.is_live()).count()
    }

    pub fn face_count(&self) -> usize {
        self.faces.iter().filter(|r| r.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.face_count() == 0 && self.edge_count() == 0 && self.vertex_count() == 0
    }

    // ── Geometry through records ──

    pub fn edge_curve(&self, e: EdgeIndex) -> Option<&Curve> {
        self.curve3(self.edge(e)?.curve?)
    }

    pub fn trim_curve(&self, t: TrimIndex) -> Option<&Curve> {
        self.curve2(self.trim(t)?.curve?)
    }

    pub fn face_surface(&self, f: FaceIndex) -> Option<&Surface> {
        self.surface(self.face(f)?.surface?)
    }

    /// Point on the edge at edge parameter `t`.
    pub fn edge_point_at(&self, e: EdgeIndex, t: f64) -> Option<Point3d> {
        let edge = self.edge(e)?;
        Some(edge.proxy.point_at(self.curve3(edge.curve?)?, t))
    }

    pub fn edge_derivative(&self, e: EdgeIndex, t: f64) -> Option<Vec3> {
        let edge = self.edge(e)?;
        Some(edge.proxy.derivative(self.curve3(edge.curve?)?, t))
    }

    /// Start (`end == 0`) or end point of the edge.
    pub fn edge_end_point(&self, e: EdgeIndex, end: usize) -> Option<Point3d> {
        let d = self.edge(e)?.domain();
        self.edge_point_at(e, if end == 0 { d.t0 } else { d.t1 })
    }

    /// Parameter-space point of the trim at trim parameter `t`.
    ///
    /// Point-on-surface trims have no curve; their location is the
    /// collapsed box.
    pub fn trim_point_at(&self, t: TrimIndex, param: f64) -> Option<Point2d> {
        let trim = self.trim(t)?;
        match trim.curve {
            Some(c) => Some(trim.proxy.point_at(self.curve2(c)?, param).xy()),
            None if trim.trim_type == TrimType::PointOnSurface => Some(trim.bbox.min.xy()),
            None => None,
        }
    }

    pub fn trim_derivative(&self, t: TrimIndex, param: f64) -> Option<Vec3> {
        let trim = self.trim(t)?;
        Some(trim.proxy.derivative(self.curve2(trim.curve?)?, param))
    }

    pub fn trim_end_point(&self, t: TrimIndex, end: usize) -> Option<Point2d> {
        let d = self.trim(t)?.domain();
        self.trim_point_at(t, if end == 0 { d.t0 } else { d.t1 })
    }

    /// The 3D point a trim end maps to through its face's surface.
    pub fn trim_end_point_3d(&self, t: TrimIndex, end: usize) -> Option<Point3d> {
        let uv = self.trim_end_point(t, end)?;
        let face = self.face_of_trim(t)?;
        Some(self.face_surface(face)?.point_at(uv.x, uv.y))
    }

    // ── Accounting ──

    /// Approximate heap plus inline footprint in bytes.
    pub fn size_of(&self) -> usize {
        use std::mem::size_of;
        let mut n = size_of::<Self>();
        n += self.vertices.capacity() * size_of::<Vertex>();
        n += self.edges.capacity() * size_of::<Edge>();
        n += self.trims.capacity() * size_of::<Trim>();
        n += self.loops.capacity() * size_of::<Loop>();
        n += self.faces.capacity() * size_of::<Face>();
        n += self.vertices.iter().map(|v| v.edges.capacity() * size_of::<EdgeIndex>()).sum::<usize>();
        n += self.edges.iter().map(|e| e.trims.capacity() * size_of::<TrimIndex>()).sum::<usize>();
        n += self.loops.iter().map(|l| l.trims.capacity() * size_of::<TrimIndex>()).sum::<usize>();
        n += self.faces.iter().map(|f| f.loops.capacity() * size_of::<LoopIndex>()).sum::<usize>();
        for c in self.curves2.iter().chain(&self.curves3).flatten() {
            n += size_of::<Curve>() + c.complexity() * size_of::<Point3d>();
        }
        n += self.surfaces.len() * size_of::<Option<Surface>>();
        for s in self.surfaces.iter().flatten() {
            if let Surface::Nurbs(ns) = s {
                n += ns.complexity() * size_of::<Point3d>();
            }
        }
        n
    }

    /// Hash of the serialized structure. Identical structures hash equal
    /// regardless of their ids or cached data.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        match serde_json::to_vec(self) {
            Ok(bytes) => hasher.write(&bytes),
            Err(e) => warn!(error = %e, "brep could not be serialized for hashing"),
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2d;

    #[test]
    fn test_ids_are_unique_and_clone_restamps() {
        let mut a = Brep::new();
        a.new_vertex(Point3d::ORIGIN, None);
        let b = a.clone();
        assert_ne!(a.id(), b.id());
        assert_eq!(b.vertices[0].brep, b.id());
        assert_eq!(a.vertices[0].brep, a.id());
    }

    #[test]
    fn test_add_curve2d_coerces_dimension() {
        let mut b = Brep::new();
        let c = b.add_curve2d(Curve::line(Point3d::new(0.0, 0.0, 5.0), Point3d::new(1.0, 0.0, 5.0)));
        let curve = b.curve2(c).unwrap();
        assert_eq!(curve.dimension(), 2);
        assert!(curve.start_point().z.abs() < 1e-12);
    }

    #[test]
    fn test_checked_lookup_distinguishes_deleted() {
        let mut b = Brep::new();
        let v = b.new_vertex(Point3d::ORIGIN, None);
        assert!(b.live_vertex(v).is_ok());
        b.vertices[0].index = None;
        assert_eq!(b.live_vertex(v).unwrap_err(), BrepError::Deleted { kind: "vertex", index: 0 });
        assert!(matches!(b.live_vertex(VertexIndex(9)), Err(BrepError::IndexOutOfRange { .. })));
    }

    #[test]
    fn test_serde_round_trip_issues_new_id() {
        let mut b = Brep::new();
        let c = b.add_curve2d(Curve::line_2d(Point2d::new(0.0, 0.0), Point2d::new(1.0, 0.0)));
        b.new_trim(c).unwrap();
        let json = serde_json::to_string(&b).unwrap();
        let back: Brep = serde_json::from_str(&json).unwrap();
        assert_ne!(back.id(), b.id());
        assert_eq!(back.trims[0].brep, back.id());
        assert_eq!(back.content_hash(), b.content_hash());
    }

    #[test]
    fn test_serde_round_trip_after_delete() {
        let mut b = crate::topology::primitives::make_box(1.0, 1.0, 1.0).unwrap();
        let gone = b.faces[0].loops[0];
        let kept = b.faces[1].loops[0];
        b.delete_face(FaceIndex(0), false).unwrap();
        let json = serde_json::to_string(&b).unwrap();
        let back: Brep = serde_json::from_str(&json).unwrap();
        assert_eq!(back.face_count(), 5);
        assert!(back.faces[0].index.is_none());
        assert!(!back.loops[gone.0].bbox.is_valid());
        assert_eq!(back.loops[kept.0].bbox, b.loops[kept.0].bbox);
        assert_eq!(back.content_hash(), b.content_hash());
        assert!(back.is_valid(None));
    }
}
