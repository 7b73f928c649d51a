//! Construction API: every record enters a [`Brep`] through one of these.

use tracing::{debug, instrument};

use super::brep::Brep;
use super::index::*;
use super::records::*;
use crate::error::{BrepError, Result};
use crate::geometry::{BoundingBox, Curve, Interval, IsoType, Point2d, Point3d};

impl Brep {
    pub fn new_vertex(&mut self, point: Point3d, tolerance: Option<f64>) -> VertexIndex {
        let index = VertexIndex(self.vertices.len());
        self.vertices.push(Vertex {
            index: Some(index),
            brep: self.id(),
            point,
            tolerance,
            edges: Vec::new(),
        });
        self.invalidate_caches();
        index
    }

    /// Edge over the full domain of a 3D curve.
    pub fn new_edge(&mut self, curve: Curve3Index, vertices: [Option<VertexIndex>; 2]) -> Result<EdgeIndex> {
        let domain = self.checked_curve3(curve)?.domain();
        self.new_edge_with_domain(curve, vertices, domain, None)
    }

    /// Edge over `sub_domain` of a 3D curve. Vertices may be left unset
    /// and assigned later with [`Brep::set_vertices`].
    pub fn new_edge_with_domain(
        &mut self,
        curve: Curve3Index,
        vertices: [Option<VertexIndex>; 2],
        sub_domain: Interval,
        tolerance: Option<f64>,
    ) -> Result<EdgeIndex> {
        let full = self.checked_curve3(curve)?.domain();
        check_sub_domain(&full, &sub_domain)?;
        for v in vertices.iter().flatten() {
            self.live_vertex(*v)?;
        }
        let index = EdgeIndex(self.edges.len());
        self.edges.push(Edge {
            index: Some(index),
            brep: self.id(),
            curve: Some(curve),
            proxy: CurveProxy::new(sub_domain),
            vertices: [None, None],
            trims: Vec::new(),
            tolerance,
        });
        for (end, v) in vertices.into_iter().enumerate() {
            if let Some(v) = v {
                self.set_edge_vertex(index, end, Some(v));
            }
        }
        self.invalidate_caches();
        Ok(index)
    }

    /// Trim on a parameter-space curve, attached to nothing yet.
    pub fn new_trim(&mut self, curve: Curve2Index) -> Result<TrimIndex> {
        let domain = self.checked_curve2(curve)?.domain();
        let index = TrimIndex(self.trims.len());
        self.trims.push(Trim {
            index: Some(index),
            brep: self.id(),
            curve: Some(curve),
            proxy: CurveProxy::new(domain),
            ..Default::default()
        });
        Ok(index)
    }

    /// Trim that uses `edge`; its vertices follow the edge, swapped when
    /// `reversed`.
    pub fn new_trim_on_edge(&mut self, edge: EdgeIndex, reversed: bool, curve: Curve2Index) -> Result<TrimIndex> {
        self.live_edge(edge)?;
        let t = self.new_trim(curve)?;
        self.attach_trim_to_edge(t, edge, reversed);
        Ok(t)
    }

    /// Trim appended to `loop_index` with no edge.
    pub fn new_trim_in_loop(&mut self, loop_index: LoopIndex, curve: Curve2Index) -> Result<TrimIndex> {
        self.live_loop(loop_index)?;
        let t = self.new_trim(curve)?;
        self.attach_trim_to_loop(t, loop_index);
        Ok(t)
    }

    /// Trim that uses `edge` and closes part of `loop_index`. Its type is
    /// derived from the edge's other trims, which may be updated too.
    #[instrument(skip(self))]
    pub fn new_trim_on_edge_in_loop(
        &mut self,
        edge: EdgeIndex,
        reversed: bool,
        loop_index: LoopIndex,
        curve: Curve2Index,
    ) -> Result<TrimIndex> {
        self.live_edge(edge)?;
        self.live_loop(loop_index)?;
        self.checked_curve2(curve)?;
        let t = self.new_trim(curve)?;
        self.attach_trim_to_loop(t, loop_index);
        self.attach_trim_to_edge(t, edge, reversed);
        self.derive_trim_type(t);
        debug!(trim = %t, trim_type = ?self.trims[t.0].trim_type, "trim added");
        Ok(t)
    }

    /// Degenerate trim on a surface pole: no edge, both ends at `vertex`,
    /// zero tolerances.
    pub fn new_singular_trim(
        &mut self,
        vertex: VertexIndex,
        loop_index: LoopIndex,
        iso: IsoType,
        curve: Curve2Index,
    ) -> Result<TrimIndex> {
        self.live_vertex(vertex)?;
        self.live_loop(loop_index)?;
        let t = self.new_trim(curve)?;
        {
            let trim = &mut self.trims[t.0];
            trim.vertices = [Some(vertex), Some(vertex)];
            trim.trim_type = TrimType::Singular;
            trim.tolerance = [Some(0.0), Some(0.0)];
        }
        self.attach_trim_to_loop(t, loop_index);
        self.trims[t.0].iso = iso;
        Ok(t)
    }

    pub fn new_loop(&mut self, loop_type: LoopType, face: Option<FaceIndex>) -> Result<LoopIndex> {
        if let Some(f) = face {
            self.live_face(f)?;
        }
        let index = LoopIndex(self.loops.len());
        self.loops.push(Loop {
            index: Some(index),
            brep: self.id(),
            face,
            trims: Vec::new(),
            loop_type,
            bbox: BoundingBox::empty(),
        });
        if let Some(f) = face {
            self.faces[f.0].loops.push(index);
        }
        self.invalidate_caches();
        Ok(index)
    }

    pub fn new_face(&mut self, surface: SurfaceIndex) -> Result<FaceIndex> {
        if self.surface(surface).is_none() {
            return Err(self.missing_surface(surface));
        }
        let index = FaceIndex(self.faces.len());
        self.faces.push(Face {
            index: Some(index),
            brep: self.id(),
            surface: Some(surface),
            ..Default::default()
        });
        self.invalidate_caches();
        Ok(index)
    }

    /// Face whose outer loop runs around the whole surface domain.
    ///
    /// Sides that collapse to a point get singular trims; a closed
    /// direction is joined by a single seam edge; every other side gets a
    /// boundary edge on the surface iso-curve.
    #[instrument(skip(self))]
    pub fn new_face_from_surface(&mut self, surface: SurfaceIndex) -> Result<FaceIndex> {
        let srf = self.surface(surface).cloned().ok_or_else(|| self.missing_surface(surface))?;
        let (du, dv) = (srf.domain(0), srf.domain(1));
        let corners = [
            Point2d::new(du.t0, dv.t0),
            Point2d::new(du.t1, dv.t0),
            Point2d::new(du.t1, dv.t1),
            Point2d::new(du.t0, dv.t1),
        ];
        // Side s runs from corner s to corner s + 1 (S, E, N, W).
        let iso_of_side = |s: usize| -> (usize, f64, bool) {
            match s {
                0 => (0, dv.t0, false),
                1 => (1, du.t1, false),
                2 => (0, dv.t1, true),
                _ => (1, du.t0, true),
            }
        };
        let closed = [srf.is_closed(0), srf.is_closed(1)];
        let singular: Vec<bool> = (0..4).map(|s| srf.is_singular(s)).collect();

        // Build side edges before touching the brep so a failure leaves it unchanged.
        let mut side_curves: Vec<Option<(Curve, bool)>> = Vec::with_capacity(4);
        for s in 0..4 {
            if singular[s] {
                side_curves.push(None);
                continue;
            }
            let (dir, c, rev) = iso_of_side(s);
            // Shared seam: E and W on a u-closed surface, S and N on a v-closed one.
            let seam = (dir == 1 && closed[0]) || (dir == 0 && closed[1]);
            let (c, rev) = if seam {
                let base = if dir == 1 { du.t0 } else { dv.t0 };
                (base, s >= 2)
            } else {
                (c, rev)
            };
            let curve = srf
                .iso_curve(dir, c)
                .ok_or_else(|| BrepError::Geometry(format!("no iso-curve for side {s}")))?;
            side_curves.push(Some((curve, rev)));
        }

        let face = self.new_face(surface)?;
        let lp = self.new_loop(LoopType::Outer, Some(face))?;
        let mut seam_edges: [Option<EdgeIndex>; 2] = [None, None];
        for s in 0..4 {
            let mut c2 = Curve::line_2d(corners[s], corners[(s + 1) % 4]);
            let (dir, _, _) = iso_of_side(s);
            c2.set_domain(if dir == 0 { du } else { dv });
            let c2 = self.add_curve2d(c2);
            match side_curves[s].take() {
                None => {
                    // The pole vertex is assigned with the rest of the loop.
                    let t = self.new_trim(c2)?;
                    self.trims[t.0].trim_type = TrimType::Singular;
                    self.trims[t.0].tolerance = [Some(0.0), Some(0.0)];
                    self.attach_trim_to_loop(t, lp);
                    self.trims[t.0].iso = IsoType::from_side(s);
                }
                Some((curve, rev)) => {
                    let seam = (dir == 1 && closed[0]) || (dir == 0 && closed[1]);
                    let edge = match (seam, seam_edges[dir]) {
                        (true, Some(e)) => e,
                        _ => {
                            let c3 = self.add_curve3d(curve);
                            let e = self.new_edge(c3, [None, None])?;
                            self.edges[e.0].tolerance = Some(0.0);
                            if seam {
                                seam_edges[dir] = Some(e);
                            }
                            e
                        }
                    };
                    let t = self.new_trim_on_edge_in_loop(edge, rev, lp, c2)?;
                    self.trims[t.0].tolerance = [Some(0.0), Some(0.0)];
                    self.trims[t.0].iso = IsoType::from_side(s);
                }
            }
        }
        self.set_loop_vertices(lp)?;
        debug!(face = %face, trims = self.loops[lp.0].trims.len(), "face from surface");
        Ok(face)
    }

    /// Isolated point on a face, held by a point-on-surface loop.
    pub fn new_point_on_face(&mut self, face: FaceIndex, s: f64, t: f64) -> Result<VertexIndex> {
        let srf = self.face_surface(face).ok_or(BrepError::MissingGeometry { kind: FaceIndex::KIND, index: face.0 })?;
        let point = srf.point_at(s, t);
        let v = self.new_vertex(point, Some(0.0));
        let lp = self.new_loop(LoopType::PointOnSurface, Some(face))?;
        let ti = TrimIndex(self.trims.len());
        let uv = Point3d::new(s, t, 0.0);
        self.trims.push(Trim {
            index: Some(ti),
            brep: self.id(),
            loop_index: Some(lp),
            vertices: [Some(v), Some(v)],
            trim_type: TrimType::PointOnSurface,
            tolerance: [Some(0.0), Some(0.0)],
            bbox: BoundingBox::point(uv),
            ..Default::default()
        });
        let l = &mut self.loops[lp.0];
        l.trims.push(ti);
        l.bbox = BoundingBox::point(uv);
        Ok(v)
    }

    /// Interior curve lying on a face, held by a curve-on-surface loop.
    pub fn new_curve_on_face(
        &mut self,
        face: FaceIndex,
        edge: EdgeIndex,
        reversed: bool,
        curve: Curve2Index,
    ) -> Result<TrimIndex> {
        self.live_face(face)?;
        self.live_edge(edge)?;
        self.checked_curve2(curve)?;
        let lp = self.new_loop(LoopType::CurveOnSurface, Some(face))?;
        let t = self.new_trim(curve)?;
        self.attach_trim_to_loop(t, lp);
        self.attach_trim_to_edge(t, edge, reversed);
        self.trims[t.0].trim_type = TrimType::CurveOnSurface;
        Ok(t)
    }

    // ── Classification ──

    /// Recompute boundary/mated/seam tags from the graph for every trim that
    /// has an edge.
    pub fn set_trim_type_flags(&mut self) {
        for t in self.trim_indices().collect::<Vec<_>>() {
            self.rederive_trim_type(t);
        }
        self.invalidate_caches();
    }

    /// Tag from the current sibling set, without the insertion-order rules.
    pub(crate) fn rederive_trim_type(&mut self, t: TrimIndex) {
        let trim = &self.trims[t.0];
        if matches!(
            trim.trim_type,
            TrimType::Singular | TrimType::PointOnSurface | TrimType::CurveOnSurface
        ) {
            return;
        }
        let Some(e) = trim.edge.filter(|e| self.edge(*e).is_some()) else {
            return;
        };
        let my_loop = trim.loop_index;
        let my_face = self.face_of_trim(t);
        let others: Vec<TrimIndex> = self.edges[e.0]
            .trims
            .iter()
            .copied()
            .filter(|o| *o != t && self.trim(*o).is_some())
            .collect();
        let same_loop = others.iter().filter(|o| self.trims[o.0].loop_index == my_loop).count();
        let ty = if others.is_empty() {
            TrimType::Boundary
        } else if same_loop == 1 {
            TrimType::Seam
        } else if same_loop > 1 {
            TrimType::Unknown
        } else if others.len() == 1 && my_face.is_some() && self.face_of_trim(others[0]) == my_face {
            TrimType::Unknown
        } else {
            TrimType::Mated
        };
        self.trims[t.0].trim_type = ty;
    }

    /// Insertion-time rule: classify a newly attached trim and update the
    /// siblings it pairs with.
    fn derive_trim_type(&mut self, t: TrimIndex) {
        let Some(e) = self.trims[t.0].edge else { return };
        let my_loop = self.trims[t.0].loop_index;
        let my_face = self.face_of_trim(t);
        let prior: Vec<TrimIndex> = self.edges[e.0]
            .trims
            .iter()
            .copied()
            .filter(|o| *o != t && self.trim(*o).is_some())
            .collect();
        match prior.len() {
            0 => self.trims[t.0].trim_type = TrimType::Boundary,
            1 => {
                let o = prior[0];
                let (ty, other) = if self.trims[o.0].loop_index == my_loop {
                    (TrimType::Seam, Some(TrimType::Seam))
                } else if my_face.is_some() && self.face_of_trim(o) == my_face {
                    (TrimType::Unknown, None)
                } else {
                    (TrimType::Mated, Some(TrimType::Mated))
                };
                self.trims[t.0].trim_type = ty;
                if let Some(other) = other {
                    self.trims[o.0].trim_type = other;
                }
            }
            _ => {
                let same_loop: Vec<TrimIndex> = prior
                    .iter()
                    .copied()
                    .filter(|o| self.trims[o.0].loop_index == my_loop)
                    .collect();
                match same_loop.as_slice() {
                    [] => {
                        self.trims[t.0].trim_type = TrimType::Mated;
                        for o in prior {
                            if self.trims[o.0].trim_type == TrimType::Boundary {
                                self.trims[o.0].trim_type = TrimType::Mated;
                            }
                        }
                    }
                    [o] if self.trims[o.0].trim_type != TrimType::Seam => {
                        self.trims[t.0].trim_type = TrimType::Seam;
                        self.trims[o.0].trim_type = TrimType::Seam;
                    }
                    _ => self.trims[t.0].trim_type = TrimType::Unknown,
                }
            }
        }
    }

    /// Classify one trim against its face's surface sides.
    pub fn set_trim_iso_flag(&mut self, t: TrimIndex) {
        let Some(trim) = self.trim(t) else { return };
        let sub = trim.proxy.curve_domain;
        let iso = match (self.trim_curve(t), self.face_of_trim(t).and_then(|f| self.face_surface(f))) {
            (Some(c), Some(s)) => s.is_isoparametric(c, sub),
            _ => IsoType::NotIso,
        };
        self.trims[t.0].iso = iso;
    }

    pub fn set_trim_iso_flags(&mut self) {
        for t in self.trim_indices().collect::<Vec<_>>() {
            if self.trims[t.0].curve.is_some() {
                self.set_trim_iso_flag(t);
            }
        }
    }

    /// Recompute a trim's parameter-space box from its curve.
    pub fn set_trim_bounding_box(&mut self, t: TrimIndex) {
        let Some(trim) = self.trim(t) else { return };
        if trim.curve.is_none() {
            return;
        }
        let sub = trim.proxy.curve_domain;
        let bbox = match self.trim_curve(t) {
            Some(c) => {
                let mut piece = c.clone();
                if sub != c.domain() && !piece.trim(sub) {
                    piece = c.clone();
                }
                piece.bounding_box()
            }
            None => BoundingBox::empty(),
        };
        let trim = &mut self.trims[t.0];
        trim.bbox = bbox;
        trim.polyline = Default::default();
    }

    /// Recompute a loop's box as the union of its trims' boxes.
    pub fn set_loop_bounding_box(&mut self, l: LoopIndex) {
        let Some(lp) = self.loop_at(l) else { return };
        let bbox = lp
            .trims
            .iter()
            .filter_map(|t| self.trim(*t))
            .fold(BoundingBox::empty(), |acc, t| acc.union(&t.bbox));
        self.loops[l.0].bbox = bbox;
    }

    // ── Wiring helpers ──

    fn attach_trim_to_loop(&mut self, t: TrimIndex, l: LoopIndex) {
        self.trims[t.0].loop_index = Some(l);
        self.loops[l.0].trims.push(t);
        self.set_trim_bounding_box(t);
        let tb = self.trims[t.0].bbox;
        let lb = &mut self.loops[l.0].bbox;
        *lb = lb.union(&tb);
        if self.trims[t.0].iso == IsoType::NotIso && self.trims[t.0].curve.is_some() {
            self.set_trim_iso_flag(t);
        }
        self.invalidate_caches();
    }

    pub(crate) fn attach_trim_to_edge(&mut self, t: TrimIndex, e: EdgeIndex, reversed: bool) {
        let ev = self.edges[e.0].vertices;
        let trim = &mut self.trims[t.0];
        trim.edge = Some(e);
        trim.reversed = reversed;
        trim.vertices = if reversed { [ev[1], ev[0]] } else { ev };
        self.edges[e.0].trims.push(t);
        self.invalidate_caches();
    }

    /// Set edge end `end` to `v`, keeping vertex incidence lists symmetric.
    pub(crate) fn set_edge_vertex(&mut self, e: EdgeIndex, end: usize, v: Option<VertexIndex>) {
        let old = self.edges[e.0].vertices[end];
        if old == v {
            return;
        }
        if let Some(old) = old {
            let edges = &mut self.vertices[old.0].edges;
            if let Some(pos) = edges.iter().position(|x| *x == e) {
                edges.remove(pos);
            }
        }
        self.edges[e.0].vertices[end] = v;
        if let Some(v) = v {
            self.vertices[v.0].edges.push(e);
        }
    }

    fn checked_curve2(&self, c: Curve2Index) -> Result<&Curve> {
        let curve = self
            .curve2(c)
            .ok_or(BrepError::MissingGeometry { kind: Curve2Index::KIND, index: c.0 })?;
        if curve.dimension() != 2 {
            return Err(BrepError::WrongDimension { expected: 2, found: curve.dimension() });
        }
        Ok(curve)
    }

    fn checked_curve3(&self, c: Curve3Index) -> Result<&Curve> {
        let curve = self
            .curve3(c)
            .ok_or(BrepError::MissingGeometry { kind: Curve3Index::KIND, index: c.0 })?;
        if curve.dimension() != 3 {
            return Err(BrepError::WrongDimension { expected: 3, found: curve.dimension() });
        }
        Ok(curve)
    }

    fn missing_surface(&self, s: SurfaceIndex) -> BrepError {
        if s.0 >= self.surfaces.len() {
            BrepError::IndexOutOfRange { kind: SurfaceIndex::KIND, index: s.0 }
        } else {
            BrepError::MissingGeometry { kind: SurfaceIndex::KIND, index: s.0 }
        }
    }
}

fn check_sub_domain(full: &Interval, sub: &Interval) -> Result<()> {
    let tol = crate::SQRT_EPSILON * full.magnitude().max(1.0);
    if !sub.is_increasing() || !full.includes_interval(sub, tol) {
        return Err(BrepError::BadInterval { t0: sub.t0, t1: sub.t1 });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Interval, Plane, Surface};

    fn unit_plane(b: &mut Brep) -> SurfaceIndex {
        b.add_surface(Surface::plane(Plane::xy(), Interval::UNIT, Interval::UNIT))
    }

    #[test]
    fn test_new_edge_links_vertices() {
        let mut b = Brep::new();
        let v0 = b.new_vertex(Point3d::ORIGIN, None);
        let v1 = b.new_vertex(Point3d::new(1.0, 0.0, 0.0), None);
        let c = b.add_curve3d(Curve::line(Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0)));
        let e = b.new_edge(c, [Some(v0), Some(v1)]).unwrap();
        assert_eq!(b.vertices[v0.0].edges, vec![e]);
        assert_eq!(b.vertices[v1.0].edges, vec![e]);
    }

    #[test]
    fn test_new_edge_rejects_2d_curve_index_and_bad_domain() {
        let mut b = Brep::new();
        let c = b.add_curve3d(Curve::line(Point3d::ORIGIN, Point3d::new(2.0, 0.0, 0.0)));
        let err = b.new_edge_with_domain(c, [None, None], Interval::new(1.0, 3.0), None);
        assert!(matches!(err, Err(BrepError::BadInterval { .. })));
        assert!(b.new_edge(Curve3Index(7), [None, None]).is_err());
        assert_eq!(b.edge_count(), 0);
    }

    #[test]
    fn test_trim_type_derivation_mated_and_seam() {
        let mut b = Brep::new();
        let s = unit_plane(&mut b);
        let c3 = b.add_curve3d(Curve::line(Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0)));
        let e = b.new_edge(c3, [None, None]).unwrap();
        let c2 = b.add_curve2d(Curve::line_2d(Point2d::new(0.0, 0.0), Point2d::new(1.0, 0.0)));

        let f0 = b.new_face(s).unwrap();
        let l0 = b.new_loop(LoopType::Outer, Some(f0)).unwrap();
        let t0 = b.new_trim_on_edge_in_loop(e, false, l0, c2).unwrap();
        assert_eq!(b.trims[t0.0].trim_type, TrimType::Boundary);

        let f1 = b.new_face(s).unwrap();
        let l1 = b.new_loop(LoopType::Outer, Some(f1)).unwrap();
        let t1 = b.new_trim_on_edge_in_loop(e, true, l1, c2).unwrap();
        assert_eq!(b.trims[t0.0].trim_type, TrimType::Mated);
        assert_eq!(b.trims[t1.0].trim_type, TrimType::Mated);

        let t2 = b.new_trim_on_edge_in_loop(e, false, l1, c2).unwrap();
        assert_eq!(b.trims[t2.0].trim_type, TrimType::Seam);
        assert_eq!(b.trims[t1.0].trim_type, TrimType::Seam);

        // A third trim in the same loop cannot be a seam.
        let t3 = b.new_trim_on_edge_in_loop(e, false, l1, c2).unwrap();
        assert_eq!(b.trims[t3.0].trim_type, TrimType::Unknown);
    }

    #[test]
    fn test_same_face_different_loop_is_unknown() {
        let mut b = Brep::new();
        let s = unit_plane(&mut b);
        let c3 = b.add_curve3d(Curve::line(Point3d::ORIGIN, Point3d::new(1.0, 0.0, 0.0)));
        let e = b.new_edge(c3, [None, None]).unwrap();
        let c2 = b.add_curve2d(Curve::line_2d(Point2d::new(0.0, 0.0), Point2d::new(1.0, 0.0)));
        let f = b.new_face(s).unwrap();
        let l0 = b.new_loop(LoopType::Outer, Some(f)).unwrap();
        let l1 = b.new_loop(LoopType::Inner, Some(f)).unwrap();
        b.new_trim_on_edge_in_loop(e, false, l0, c2).unwrap();
        let t = b.new_trim_on_edge_in_loop(e, true, l1, c2).unwrap();
        assert_eq!(b.trims[t.0].trim_type, TrimType::Unknown);
    }

    #[test]
    fn test_face_from_plane_has_four_boundary_trims() {
        let mut b = Brep::new();
        let s = unit_plane(&mut b);
        let f = b.new_face_from_surface(s).unwrap();
        let lp = b.faces[f.0].loops[0];
        let trims = &b.loops[lp.0].trims;
        assert_eq!(trims.len(), 4);
        assert!(trims.iter().all(|t| b.trims[t.0].trim_type == TrimType::Boundary));
        assert_eq!(b.vertex_count(), 4);
        assert_eq!(b.edge_count(), 4);
        assert_eq!(b.trims[trims[0].0].iso, IsoType::South);
        assert_eq!(b.trims[trims[3].0].iso, IsoType::West);
    }

    #[test]
    fn test_point_on_face_collapses_box() {
        let mut b = Brep::new();
        let s = unit_plane(&mut b);
        let f = b.new_face_from_surface(s).unwrap();
        let v = b.new_point_on_face(f, 0.25, 0.5).unwrap();
        assert!((b.vertices[v.0].point.y - 0.5).abs() < 1e-12);
        let t = b.trims.last().unwrap();
        assert_eq!(t.trim_type, TrimType::PointOnSurface);
        assert_eq!(t.bbox.min, t.bbox.max);
        assert!(t.curve.is_none());
    }

    #[test]
    fn test_face_box_follows_new_outer_loop() {
        let mut b = Brep::new();
        let ten = Interval::new(0.0, 10.0);
        let s = b.add_surface(Surface::plane(Plane::xy(), ten, ten));
        let f = b.new_face(s).unwrap();
        assert!((b.face_bounding_box(f).max.x - 10.0).abs() < 1e-9);

        let l = b.new_loop(LoopType::Outer, Some(f)).unwrap();
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
        for i in 0..4 {
            let (a, c) = (corners[i], corners[(i + 1) % 4]);
            let c2 = b.add_curve2d(Curve::line_2d(Point2d::new(a.0, a.1), Point2d::new(c.0, c.1)));
            b.new_trim_in_loop(l, c2).unwrap();
        }
        let cached = b.face_bounding_box(f);
        assert!((cached.max.x - 1.0).abs() < 1e-9);
        assert!((cached.max.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_retagging_trims_resets_solid_flag() {
        let mut b = crate::topology::primitives::make_box(1.0, 1.0, 1.0).unwrap();
        for t in &mut b.trims {
            t.trim_type = TrimType::Boundary;
        }
        b.invalidate_caches();
        assert!(!b.is_solid());
        b.set_trim_type_flags();
        assert!(b.is_solid());
    }
}
