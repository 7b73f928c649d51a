//! Merging coincident vertices and edges.

use tracing::{debug, instrument};

use crate::error::{BrepError, Result};
use crate::topology::brep::Brep;
use crate::topology::index::*;
use crate::topology::records::*;

/// Samples used to measure how far two edge curves drift apart.
const EDGE_DEVIATION_SAMPLES: usize = 8;

impl Brep {
    /// Merge vertex `gone` into `keep`. Every edge and trim end at `gone`
    /// moves to `keep`; the tolerance grows to cover both points.
    #[instrument(skip(self))]
    pub fn combine_coincident_vertices(&mut self, keep: VertexIndex, gone: VertexIndex) -> Result<VertexIndex> {
        let (a, b) = (self.live_vertex(keep)?, self.live_vertex(gone)?);
        if keep == gone {
            return Ok(keep);
        }
        let gap = a.point.distance_to(&b.point);
        let tolerance = match (a.tolerance, b.tolerance) {
            (Some(ta), Some(tb)) => Some(ta.max(tb).max(gap)),
            _ => None,
        };

        for e in self.vertices[gone.0].edges.clone() {
            for end in 0..2 {
                if self.edges[e.0].vertices[end] == Some(gone) {
                    self.set_edge_vertex(e, end, Some(keep));
                }
            }
        }
        for trim in self.trims.iter_mut().filter(|t| t.is_live()) {
            for v in &mut trim.vertices {
                if *v == Some(gone) {
                    *v = Some(keep);
                }
            }
        }
        self.vertices[keep.0].tolerance = tolerance;
        self.vertices[gone.0] = Vertex {
            brep: self.id(),
            ..Default::default()
        };
        self.invalidate_caches();
        debug!(keep = %keep, gone = %gone, gap, "vertices combined");
        Ok(keep)
    }

    /// Merge two edges with the same end vertices. The edge with the lower
    /// tolerance (then the simpler curve) survives and takes over the other's
    /// trims; boundary trims that now share an edge become mated.
    #[instrument(skip(self))]
    pub fn combine_coincident_edges(&mut self, a: EdgeIndex, b: EdgeIndex) -> Result<EdgeIndex> {
        let (ea, eb) = (self.live_edge(a)?, self.live_edge(b)?);
        if a == b {
            return Err(BrepError::Precondition("an edge cannot be combined with itself".into()));
        }
        let same = ea.vertices == eb.vertices;
        let swapped = ea.vertices == [eb.vertices[1], eb.vertices[0]];
        if ea.vertices.contains(&None) || !(same || swapped) {
            return Err(BrepError::Precondition(format!("edges {a} and {b} do not share both end vertices")));
        }

        let rank = |e: EdgeIndex| {
            let edge = &self.edges[e.0];
            let tol = edge.tolerance.unwrap_or(f64::INFINITY);
            let complexity = self.edge_curve(e).map_or(usize::MAX, |c| c.complexity());
            (tol, complexity)
        };
        let (keep, gone) = if rank(b) < rank(a) { (b, a) } else { (a, b) };

        // Closed edges share both vertices either way; compare directions.
        let opposite = if self.edges[a.0].is_closed_topologically() {
            let mid = |e: EdgeIndex| self.edges[e.0].domain().mid();
            match (self.edge_derivative(keep, mid(keep)), self.edge_derivative(gone, mid(gone))) {
                (Some(dk), Some(dg)) => dk.dot(&dg) < 0.0,
                _ => false,
            }
        } else {
            swapped
        };
        let deviation = self.edge_deviation(keep, gone, opposite);
        let tolerance = match (self.edges[keep.0].tolerance, self.edges[gone.0].tolerance) {
            (Some(tk), Some(tg)) => Some(tk.max(tg).max(deviation)),
            _ => None,
        };

        let moved = std::mem::take(&mut self.edges[gone.0].trims);
        for &t in &moved {
            let trim = &mut self.trims[t.0];
            trim.edge = Some(keep);
            if opposite {
                trim.reversed = !trim.reversed;
            }
        }
        self.edges[keep.0].trims.extend(moved);
        self.edges[keep.0].tolerance = tolerance;
        self.set_edge_vertex(gone, 0, None);
        self.set_edge_vertex(gone, 1, None);
        self.edges[gone.0] = Edge {
            brep: self.id(),
            ..Default::default()
        };
        for t in self.edges[keep.0].trims.clone() {
            if self.trim(t).is_some() {
                self.rederive_trim_type(t);
            }
        }
        self.invalidate_caches();
        debug!(keep = %keep, gone = %gone, trims = self.edges[keep.0].trims.len(), "edges combined");
        Ok(keep)
    }

    /// Largest distance between matching samples of two edges.
    fn edge_deviation(&self, a: EdgeIndex, b: EdgeIndex, opposite: bool) -> f64 {
        let (da, db) = (self.edges[a.0].domain(), self.edges[b.0].domain());
        (0..=EDGE_DEVIATION_SAMPLES)
            .filter_map(|i| {
                let s = i as f64 / EDGE_DEVIATION_SAMPLES as f64;
                let sb = if opposite { 1.0 - s } else { s };
                let pa = self.edge_point_at(a, da.param_at(s))?;
                let pb = self.edge_point_at(b, db.param_at(sb))?;
                Some(pa.distance_to(&pb))
            })
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::geometry::{Curve, Interval, Plane, Point2d, Point3d, Surface};
    use crate::topology::primitives::unit_square_face;
    use crate::*;

    /// Two unit squares side by side, each with its own copy of the shared
    /// side at x == 1.
    fn two_squares() -> (Brep, EdgeIndex, EdgeIndex) {
        let mut b = unit_square_face().unwrap();
        let srf = b.add_surface(Surface::plane(Plane::xy(), Interval::new(1.0, 2.0), Interval::UNIT));
        let uv = [
            Point2d::new(1.0, 0.0),
            Point2d::new(2.0, 0.0),
            Point2d::new(2.0, 1.0),
            Point2d::new(1.0, 1.0),
        ];
        let mut verts: Vec<VertexIndex> = vec![VertexIndex(1)];
        verts.push(b.new_vertex(uv[1].to_3d(), Some(0.0)));
        verts.push(b.new_vertex(uv[2].to_3d(), Some(0.0)));
        verts.push(VertexIndex(2));
        let f = b.new_face(srf).unwrap();
        let lp = b.new_loop(LoopType::Outer, Some(f)).unwrap();
        let mut shared = None;
        for i in 0..4 {
            let j = (i + 1) % 4;
            let c3 = b.add_curve3d(Curve::line(uv[i].to_3d(), uv[j].to_3d()));
            let e = b.new_edge(c3, [Some(verts[i]), Some(verts[j])]).unwrap();
            b.edges[e.0].tolerance = Some(0.0);
            let c2 = b.add_curve2d(Curve::line_2d(uv[i], uv[j]));
            let t = b.new_trim_on_edge_in_loop(e, false, lp, c2).unwrap();
            b.trims[t.0].tolerance = [Some(0.0), Some(0.0)];
            if i == 3 {
                shared = Some(e);
            }
        }
        (b, EdgeIndex(1), shared.unwrap())
    }

    #[test]
    fn test_combine_vertices_repoints_everything() {
        let mut b = unit_square_face().unwrap();
        let extra = b.new_vertex(Point3d::new(1.0, 1e-9, 0.0), Some(0.0));
        b.set_edge_vertex(EdgeIndex(0), 1, Some(extra));
        b.trims[0].vertices[1] = Some(extra);
        b.combine_coincident_vertices(VertexIndex(1), extra).unwrap();
        assert!(b.vertex(extra).is_none());
        assert_eq!(b.edges[0].vertices[1], Some(VertexIndex(1)));
        assert_eq!(b.trims[0].vertices[1], Some(VertexIndex(1)));
        assert_eq!(b.vertices[1].degree(), 2);
        assert_relative_eq!(b.vertices[1].tolerance.unwrap(), 1e-9, epsilon = 1e-15);
        assert!(b.is_valid(None));
    }

    #[test]
    fn test_combine_edges_mates_boundary_trims() {
        let (mut b, left, right) = two_squares();
        assert_eq!(b.edge_count(), 8);
        let keep = b.combine_coincident_edges(left, right).unwrap();
        assert_eq!(keep, left);
        assert!(b.edge(right).is_none());
        let trims = &b.edges[keep.0].trims;
        assert_eq!(trims.len(), 2);
        for t in trims {
            assert_eq!(b.trims[t.0].trim_type, TrimType::Mated);
        }
        assert_ne!(b.trims[trims[0].0].reversed, b.trims[trims[1].0].reversed);
        let mut log = TextLog::new();
        assert!(b.is_valid(Some(&mut log)), "{log}");
    }

    #[test]
    fn test_combine_edges_needs_shared_vertices() {
        let mut b = unit_square_face().unwrap();
        let err = b.combine_coincident_edges(EdgeIndex(0), EdgeIndex(2)).unwrap_err();
        assert!(matches!(err, BrepError::Precondition(_)));
        assert_eq!(b.edge_count(), 4);
    }
}
