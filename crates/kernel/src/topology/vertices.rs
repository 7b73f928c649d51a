//! Vertex assignment: share one vertex among every trim end and edge end
//! that meet at the same corner.

use std::collections::{BTreeMap, HashSet, VecDeque};

use tracing::{debug, instrument, warn};

use super::brep::Brep;
use super::index::*;
use super::records::*;
use crate::error::{BrepError, Result};
use crate::geometry::Point3d;

impl Brep {
    /// Trim ends that are the same corner as `(t, end)`: the neighbour in the
    /// loop, the other end of a singular trim, and the matching end of every
    /// other trim on the same edge.
    fn coincident_trim_ends(&self, t: TrimIndex, end: usize) -> Vec<(TrimIndex, usize)> {
        let mut out = Vec::new();
        let Some(trim) = self.trim(t) else { return out };
        // An open curve-on-surface trim does not meet itself.
        if trim.trim_type != TrimType::CurveOnSurface {
            let neighbour = if end == 0 { self.prev_trim(t) } else { self.next_trim(t) };
            if let Some(n) = neighbour {
                out.push((n, 1 - end));
            }
        }
        if trim.trim_type == TrimType::Singular {
            out.push((t, 1 - end));
        }
        if let Some(edge) = trim.edge.and_then(|e| self.edge(e)) {
            let edge_end = trim.edge_end(end);
            for &o in &edge.trims {
                if let Some(other) = self.trim(o).filter(|_| o != t) {
                    out.push((o, other.edge_end(edge_end)));
                }
            }
        }
        out
    }

    /// Assign `v` to trim end `(t, end)` and every end reachable from it,
    /// updating the edges those trims use.
    fn propagate_vertex(&mut self, t: TrimIndex, end: usize, v: VertexIndex) -> Result<()> {
        self.live_trim(t)?;
        self.live_vertex(v)?;
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([(t, end)]);
        // Each trim end is visited once; the guard only protects against a
        // corrupt graph whose neighbours are not live records.
        let guard = 2 * self.trims.len() + 2;
        while let Some((ti, e)) = queue.pop_front() {
            if !visited.insert((ti, e)) {
                continue;
            }
            if visited.len() > guard {
                warn!(trim = %t, "vertex propagation did not terminate");
                break;
            }
            self.trims[ti.0].vertices[e] = Some(v);
            if let Some(edge) = self.trims[ti.0].edge.filter(|x| self.edge(*x).is_some()) {
                let edge_end = self.trims[ti.0].edge_end(e);
                self.set_edge_vertex(edge, edge_end, Some(v));
            }
            queue.extend(self.coincident_trim_ends(ti, e));
        }
        Ok(())
    }

    /// Make `v` the start vertex of `t` and of every trim end that meets it.
    pub fn set_trim_start_vertex(&mut self, t: TrimIndex, v: VertexIndex) -> Result<()> {
        self.propagate_vertex(t, 0, v)
    }

    /// Create and propagate vertices for every unassigned trim end of the loop.
    pub fn set_loop_vertices(&mut self, l: LoopIndex) -> Result<()> {
        let trims = self.live_loop(l)?.trims.clone();
        for t in trims {
            if self.trim(t).is_none() {
                continue;
            }
            for end in 0..2 {
                if self.trims[t.0].vertices[end].is_some() {
                    continue;
                }
                let point = self.trim_corner_point(t, end).ok_or(BrepError::MissingGeometry {
                    kind: TrimIndex::KIND,
                    index: t.0,
                })?;
                let v = self.new_vertex(point, None);
                self.propagate_vertex(t, end, v)?;
            }
        }
        Ok(())
    }

    /// 3D location of a trim end: the edge end when there is an edge, the
    /// surface point otherwise.
    fn trim_corner_point(&self, t: TrimIndex, end: usize) -> Option<Point3d> {
        let trim = self.trim(t)?;
        match trim.edge {
            Some(e) => self.edge_end_point(e, trim.edge_end(end)),
            None => self.trim_end_point_3d(t, end),
        }
    }

    /// Rebuild every vertex from scratch.
    ///
    /// Loops are walked first; edges with no trims get their own vertices.
    /// New vertices sit at the mean of the incident edge ends. Distinct
    /// vertices at the two ends of a closed edge are merged, and vertices
    /// left with no use are culled.
    #[instrument(skip(self))]
    pub fn set_vertices(&mut self) -> Result<()> {
        let keep: HashSet<VertexIndex> = self
            .trims
            .iter()
            .filter(|t| t.is_live() && t.trim_type == TrimType::PointOnSurface)
            .filter_map(|t| t.vertices[0])
            .collect();
        for v in &mut self.vertices {
            v.edges.clear();
            if v.index.is_some_and(|i| !keep.contains(&i)) {
                v.index = None;
            }
        }
        for e in &mut self.edges {
            e.vertices = [None, None];
        }
        for t in &mut self.trims {
            if t.trim_type != TrimType::PointOnSurface {
                t.vertices = [None, None];
            }
        }

        let first_new = self.vertices.len();
        let loops: Vec<LoopIndex> = self
            .loop_indices()
            .filter(|l| self.loops[l.0].loop_type != LoopType::PointOnSurface)
            .collect();
        for l in loops {
            self.set_loop_vertices(l)?;
        }
        for e in self.edge_indices().collect::<Vec<_>>() {
            for end in 0..2 {
                if self.edges[e.0].vertices[end].is_some() {
                    continue;
                }
                let Some(p) = self.edge_end_point(e, end) else { continue };
                let v = self.new_vertex(p, None);
                self.set_edge_vertex(e, end, Some(v));
            }
        }

        self.average_vertex_points(first_new);
        self.join_closed_edge_ends()?;
        let culled = self.cull_unused_vertices();
        debug!(vertices = self.vertex_count(), culled, "vertices rebuilt");
        Ok(())
    }

    /// Move vertices created since `first` to the mean of their edge ends.
    fn average_vertex_points(&mut self, first: usize) {
        for vi in first..self.vertices.len() {
            let v = VertexIndex(vi);
            let Some(vertex) = self.vertex(v) else { continue };
            let mut ends = Vec::new();
            for (k, &e) in vertex.edges.iter().enumerate() {
                let Some(edge) = self.edge(e) else { continue };
                let end = if edge.vertices[0] == edge.vertices[1] {
                    // A closed edge contributes both of its ends.
                    vertex.edges[..k].iter().filter(|x| **x == e).count().min(1)
                } else if edge.vertices[0] == Some(v) {
                    0
                } else {
                    1
                };
                ends.extend(self.edge_end_point(e, end));
            }
            if let Some(p) = Point3d::centroid(&ends) {
                self.vertices[vi].point = p;
            }
        }
    }

    /// Edges whose 3D curve closes but whose ends got different vertices
    /// chain those vertices together; each chain collapses onto its lowest
    /// index.
    fn join_closed_edge_ends(&mut self) -> Result<()> {
        let mut parent: BTreeMap<VertexIndex, VertexIndex> = BTreeMap::new();
        fn root(parent: &BTreeMap<VertexIndex, VertexIndex>, mut v: VertexIndex) -> VertexIndex {
            while let Some(&p) = parent.get(&v) {
                if p == v {
                    break;
                }
                v = p;
            }
            v
        }
        let mut pairs: Vec<(VertexIndex, VertexIndex)> = Vec::new();
        for e in self.edge_indices() {
            let edge = &self.edges[e.0];
            let (Some(a), Some(b)) = (edge.vertices[0], edge.vertices[1]) else { continue };
            if a == b {
                continue;
            }
            let closed = match self.edge_curve(e) {
                Some(c) => c.is_closed() && edge.proxy.curve_domain.approx_eq(&c.domain(), crate::SQRT_EPSILON),
                None => false,
            };
            if closed {
                pairs.push((a.min(b), a.max(b)));
            }
        }
        pairs.sort();
        for (a, b) in pairs {
            let (ra, rb) = (root(&parent, a), root(&parent, b));
            if ra != rb {
                parent.insert(ra.max(rb), ra.min(rb));
            }
        }
        let merges: Vec<(VertexIndex, VertexIndex)> = parent
            .keys()
            .map(|&v| (root(&parent, v), v))
            .filter(|(r, v)| r != v)
            .collect();
        for (keep, gone) in merges {
            self.combine_coincident_vertices(keep, gone)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::geometry::{Interval, Plane, Point3d, Surface};
    use crate::topology::primitives::{make_box, make_cylinder_face};
    use crate::Brep;

    #[test]
    fn test_set_vertices_rebuilds_box_corners() {
        let mut b = make_box(1.0, 2.0, 3.0).unwrap();
        b.set_vertices().unwrap();
        assert_eq!(b.vertex_count(), 8);
        for v in b.vertex_indices() {
            assert_eq!(b.vertices[v.0].edges.len(), 3);
        }
        for e in b.edge_indices() {
            let edge = &b.edges[e.0];
            for end in 0..2 {
                let p = b.edge_end_point(e, end).unwrap();
                let v = edge.vertices[end].unwrap();
                assert!(b.vertices[v.0].point.distance_to(&p) < 1e-12);
            }
        }
    }

    #[test]
    fn test_cylinder_face_shares_seam_corners() {
        let b = make_cylinder_face(1.0, 2.0).unwrap();
        // Two circles and one seam: one vertex at each end of the seam.
        assert_eq!(b.vertex_count(), 2);
        assert_eq!(b.edge_count(), 3);
    }

    #[test]
    fn test_set_trim_start_vertex_reaches_neighbours() {
        let mut b = Brep::new();
        let s = b.add_surface(Surface::plane(Plane::xy(), Interval::UNIT, Interval::UNIT));
        let f = b.new_face_from_surface(s).unwrap();
        let lp = b.faces[f.0].loops[0];
        let t0 = b.loops[lp.0].trims[0];
        let v = b.new_vertex(Point3d::ORIGIN, None);
        b.set_trim_start_vertex(t0, v).unwrap();
        let last = *b.loops[lp.0].trims.last().unwrap();
        assert_eq!(b.trims[last.0].vertices[1], Some(v));
        let e = b.trims[t0.0].edge.unwrap();
        assert_eq!(b.edges[e.0].vertices[0], Some(v));
    }
}
