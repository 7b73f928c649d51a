//! Joining two edges that meet end to end at a vertex nothing else uses.

use tracing::{debug, instrument};

use super::proxy_piece;
use crate::error::{BrepError, Result};
use crate::geometry::{Curve, Interval, Vec3};
use crate::topology::brep::Brep;
use crate::topology::index::*;
use crate::topology::records::*;

/// One trim of each edge, both in the same loop, both running the same
/// way along the joined edge.
struct TrimPair {
    /// The trim that comes first in the loop; its slot is reused.
    first: TrimIndex,
    second: TrimIndex,
    loop_index: LoopIndex,
    reversed: bool,
    curve: Curve,
    trim_type: TrimType,
    tolerance: [Option<f64>; 2],
}

fn max_tolerance(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        _ => None,
    }
}

impl Brep {
    /// Replace `e0` and `e1`, which share a vertex of degree two, with one
    /// edge running from the far end of `e0` to the far end of `e1`.
    ///
    /// Each trim of `e0` must pair with a trim of `e1` that follows it in
    /// the same loop, and the edges must leave the shared vertex within
    /// `angle_tolerance` radians of each other. Nothing changes unless
    /// every check passes.
    #[instrument(skip(self))]
    pub fn combine_contiguous_edges(&mut self, e0: EdgeIndex, e1: EdgeIndex, angle_tolerance: f64) -> Result<EdgeIndex> {
        let (a, b) = (self.live_edge(e0)?, self.live_edge(e1)?);
        if e0 == e1 {
            return Err(BrepError::Precondition("an edge cannot be joined to itself".into()));
        }
        if a.is_closed_topologically() || b.is_closed_topologically() {
            return Err(BrepError::Precondition("closed edges have no free end to join".into()));
        }
        let shared: Vec<VertexIndex> = a
            .vertices
            .iter()
            .flatten()
            .filter(|v| b.vertices.contains(&Some(**v)))
            .copied()
            .collect();
        let v = match shared.as_slice() {
            [v] => *v,
            [] => return Err(BrepError::Precondition(format!("edges {e0} and {e1} do not meet"))),
            _ => return Err(BrepError::Precondition(format!("edges {e0} and {e1} meet at both ends"))),
        };
        let degree = self.live_vertex(v)?.degree();
        if degree != 2 || self.vertex_has_point_trim(v) {
            return Err(BrepError::Precondition(format!("vertex {v} has degree {degree}, not 2")));
        }
        if a.trims.len() != b.trims.len() {
            return Err(BrepError::Precondition(format!(
                "edge {e0} has {} trims but edge {e1} has {}",
                a.trims.len(),
                b.trims.len()
            )));
        }

        // Orient both edges so the joined edge runs e0 -> v -> e1.
        let flip0 = a.vertices[0] == Some(v);
        let flip1 = b.vertices[1] == Some(v);
        let far0 = a.vertices[if flip0 { 1 } else { 0 }];
        let far1 = b.vertices[if flip1 { 0 } else { 1 }];

        let into_v = self.oriented_tangent(e0, if flip0 { 0 } else { 1 }, flip0)?;
        let out_of_v = self.oriented_tangent(e1, if flip1 { 1 } else { 0 }, flip1)?;
        let angle = into_v.angle_to(&out_of_v);
        if angle > angle_tolerance {
            return Err(BrepError::Precondition(format!(
                "edges turn by {angle:.6} radians at vertex {v}, more than {angle_tolerance}"
            )));
        }

        let vertex = &self.vertices[v.0];
        let scale = vertex.point.max_abs_coordinate();
        let join_tol = crate::default_tolerance().distance(scale).max(vertex.tolerance.unwrap_or(0.0));
        let curve = self.joined_edge_curve(e0, flip0, e1, flip1, join_tol)?;
        let pairs = self.pair_trims(e0, flip0, e1, flip1)?;

        // Every check has passed; from here on the structure changes.
        let edge_tolerance = max_tolerance(self.edges[e0.0].tolerance, self.edges[e1.0].tolerance);
        let c3 = self.add_curve3d(curve);
        let domain = self.curve3(c3).map_or(Interval::UNIT, Curve::domain);
        let joined = self.new_edge_with_domain(c3, [far0, far1], domain, edge_tolerance)?;
        for pair in pairs {
            self.replace_trim_pair(pair, joined)?;
        }
        for e in [e0, e1] {
            self.edges[e.0].trims.clear();
            self.set_edge_vertex(e, 0, None);
            self.set_edge_vertex(e, 1, None);
            self.edges[e.0] = Edge {
                brep: self.id(),
                ..Default::default()
            };
        }
        self.vertices[v.0] = Vertex {
            brep: self.id(),
            ..Default::default()
        };
        for t in self.edges[joined.0].trims.clone() {
            self.rederive_trim_type(t);
        }
        self.invalidate_caches();
        debug!(edge = %joined, trims = self.edges[joined.0].trims.len(), "edges joined");
        Ok(joined)
    }

    /// Derivative at edge end `end`, negated when the edge is
    /// traversed backwards.
    fn oriented_tangent(&self, e: EdgeIndex, end: usize, flip: bool) -> Result<Vec3> {
        let d = self.edges[e.0].domain();
        let t = if end == 0 { d.t0 } else { d.t1 };
        let tangent = self
            .edge_derivative(e, t)
            .ok_or(BrepError::MissingGeometry { kind: EdgeIndex::KIND, index: e.0 })?;
        if tangent.is_tiny(crate::ZERO_TOLERANCE) {
            return Err(BrepError::Geometry(format!("edge {e} has no tangent at end {end}")));
        }
        Ok(if flip { -tangent } else { tangent })
    }

    fn joined_edge_curve(&self, e0: EdgeIndex, flip0: bool, e1: EdgeIndex, flip1: bool, tol: f64) -> Result<Curve> {
        let piece = |e: EdgeIndex, flip: bool| -> Result<Curve> {
            let edge = &self.edges[e.0];
            let curve = self
                .edge_curve(e)
                .ok_or(BrepError::MissingGeometry { kind: EdgeIndex::KIND, index: e.0 })?;
            proxy_piece(curve, &edge.proxy, flip)
                .ok_or_else(|| BrepError::Geometry(format!("edge {e} curve could not be cut to its domain")))
        };
        let (first, second) = (piece(e0, flip0)?, piece(e1, flip1)?);
        first
            .concatenate(&second, tol)
            .ok_or_else(|| BrepError::Geometry(format!("edge curves of {e0} and {e1} do not meet")))
    }

    /// Match every trim of `e0` with the trim of `e1` next to it in the
    /// same loop, and build the joined parameter-space curve for each pair.
    fn pair_trims(&self, e0: EdgeIndex, flip0: bool, e1: EdgeIndex, flip1: bool) -> Result<Vec<TrimPair>> {
        let mut free: Vec<TrimIndex> = self.edges[e1.0].trims.clone();
        let mut pairs = Vec::new();
        for &t0 in &self.edges[e0.0].trims {
            let trim0 = self.live_trim(t0)?;
            let Some(l) = trim0.loop_index else {
                return Err(BrepError::Precondition(format!("trim {t0} is not in a loop")));
            };
            // Whether the trim runs against the joined edge.
            let against = trim0.reversed != flip0;
            let found = free.iter().position(|&t1| {
                self.trim(t1).is_some_and(|trim1| {
                    trim1.loop_index == Some(l)
                        && (trim1.reversed != flip1) == against
                        && if against {
                            self.next_trim(t1) == Some(t0)
                        } else {
                            self.next_trim(t0) == Some(t1)
                        }
                })
            });
            let Some(pos) = found else {
                return Err(BrepError::Precondition(format!("trim {t0} has no partner on edge {e1}")));
            };
            let t1 = free.swap_remove(pos);
            let trim1 = &self.trims[t1.0];
            let (first, second) = if against { (t1, t0) } else { (t0, t1) };

            let piece = |t: TrimIndex| -> Result<Curve> {
                let curve = self
                    .trim_curve(t)
                    .ok_or(BrepError::MissingGeometry { kind: TrimIndex::KIND, index: t.0 })?;
                proxy_piece(curve, &self.trims[t.0].proxy, false)
                    .ok_or_else(|| BrepError::Geometry(format!("trim {t} curve could not be cut to its domain")))
            };
            let (p0, p1) = (piece(first)?, piece(second)?);
            let gap_tol = [0, 1]
                .into_iter()
                .filter_map(|k| max_tolerance(trim0.tolerance[k], trim1.tolerance[k]))
                .fold(crate::default_tolerance().distance(p0.end_point().max_abs_coordinate()), f64::max);
            let curve = p0
                .concatenate(&p1, gap_tol)
                .ok_or_else(|| BrepError::Geometry(format!("trims {first} and {second} do not meet")))?;
            pairs.push(TrimPair {
                first,
                second,
                loop_index: l,
                reversed: against,
                curve,
                trim_type: trim0.trim_type,
                tolerance: [
                    max_tolerance(trim0.tolerance[0], trim1.tolerance[0]),
                    max_tolerance(trim0.tolerance[1], trim1.tolerance[1]),
                ],
            });
        }
        Ok(pairs)
    }

    /// Put one trim on `edge` where `pair.first` sat in its loop and retire
    /// both old trims.
    fn replace_trim_pair(&mut self, pair: TrimPair, edge: EdgeIndex) -> Result<()> {
        let c2 = self.add_curve2d(pair.curve);
        let t = self.new_trim(c2)?;
        let l = pair.loop_index;
        {
            let trim = &mut self.trims[t.0];
            trim.loop_index = Some(l);
            trim.trim_type = pair.trim_type;
            trim.tolerance = pair.tolerance;
        }
        let trims = &mut self.loops[l.0].trims;
        if let Some(pos) = trims.iter().position(|x| *x == pair.first) {
            trims[pos] = t;
        }
        trims.retain(|x| *x != pair.second);
        self.attach_trim_to_edge(t, edge, pair.reversed);
        self.set_trim_bounding_box(t);
        self.set_trim_iso_flag(t);
        for old in [pair.first, pair.second] {
            self.trims[old.0] = Trim {
                brep: self.id(),
                ..Default::default()
            };
        }
        self.set_loop_bounding_box(l);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::geometry::{Curve, Interval, IsoType, Plane, Point2d, Point3d, Surface};
    use crate::topology::primitives::{make_box, unit_square_face};
    use crate::*;

    /// Unit square whose bottom side is split at x == 0.5.
    fn split_square() -> Brep {
        let mut b = Brep::new();
        let srf = b.add_surface(Surface::plane(Plane::xy(), Interval::UNIT, Interval::UNIT));
        let uv = [
            Point2d::new(0.0, 0.0),
            Point2d::new(0.5, 0.0),
            Point2d::new(1.0, 0.0),
            Point2d::new(1.0, 1.0),
            Point2d::new(0.0, 1.0),
        ];
        let verts: Vec<VertexIndex> = uv.iter().map(|p| b.new_vertex(p.to_3d(), Some(0.0))).collect();
        let f = b.new_face(srf).unwrap();
        let lp = b.new_loop(LoopType::Outer, Some(f)).unwrap();
        for i in 0..5 {
            let j = (i + 1) % 5;
            let c3 = b.add_curve3d(Curve::line(uv[i].to_3d(), uv[j].to_3d()));
            let e = b.new_edge(c3, [Some(verts[i]), Some(verts[j])]).unwrap();
            b.edges[e.0].tolerance = Some(0.0);
            let c2 = b.add_curve2d(Curve::line_2d(uv[i], uv[j]));
            let t = b.new_trim_on_edge_in_loop(e, false, lp, c2).unwrap();
            b.trims[t.0].tolerance = [Some(0.0), Some(0.0)];
        }
        b
    }

    #[test]
    fn test_join_collinear_edges() {
        let mut b = split_square();
        let joined = b.combine_contiguous_edges(EdgeIndex(0), EdgeIndex(1), 1e-6).unwrap();
        assert_eq!(b.edge_count(), 4);
        assert_eq!(b.vertex_count(), 4);
        assert_eq!(b.trim_count(), 4);
        assert!(b.vertex(VertexIndex(1)).is_none());

        let edge = &b.edges[joined.0];
        assert_eq!(edge.vertices, [Some(VertexIndex(0)), Some(VertexIndex(2))]);
        assert!(b.edge_end_point(joined, 0).unwrap().distance_to(&Point3d::ORIGIN) < 1e-12);
        assert!(b.edge_end_point(joined, 1).unwrap().distance_to(&Point3d::new(1.0, 0.0, 0.0)) < 1e-12);

        let first = b.loops[0].trims[0];
        assert_eq!(b.trims[first.0].edge, Some(joined));
        assert_eq!(b.trims[first.0].trim_type, TrimType::Boundary);
        assert_eq!(b.trims[first.0].iso, IsoType::South);
        let mut log = TextLog::new();
        assert!(b.is_valid(Some(&mut log)), "{log}");
    }

    #[test]
    fn test_join_reversed_edge() {
        let mut b = split_square();
        // Run edge 1 backwards; its trim now runs against it.
        let e = EdgeIndex(1);
        assert!(b.curves3[1].as_mut().unwrap().reverse());
        b.edges[e.0].proxy = CurveProxy::new(b.curves3[1].as_ref().unwrap().domain());
        b.set_edge_vertex(e, 0, None);
        b.set_edge_vertex(e, 1, None);
        b.set_edge_vertex(e, 0, Some(VertexIndex(2)));
        b.set_edge_vertex(e, 1, Some(VertexIndex(1)));
        b.trims[1].reversed = true;
        assert!(b.is_valid(None));

        let joined = b.combine_contiguous_edges(EdgeIndex(0), e, 1e-6).unwrap();
        assert_eq!(b.edges[joined.0].vertices, [Some(VertexIndex(0)), Some(VertexIndex(2))]);
        assert!(b.is_valid(None));
    }

    #[test]
    fn test_join_refuses_corner() {
        let mut b = unit_square_face().unwrap();
        let before = b.curves3.len();
        let err = b.combine_contiguous_edges(EdgeIndex(0), EdgeIndex(1), 0.01).unwrap_err();
        assert!(matches!(err, BrepError::Precondition(_)));
        assert_eq!(b.curves3.len(), before);
        assert_eq!(b.edge_count(), 4);
    }

    #[test]
    fn test_join_refuses_degree_three_vertex() {
        let mut b = make_box(1.0, 1.0, 1.0).unwrap();
        let at = b.vertices[0].edges.clone();
        let err = b.combine_contiguous_edges(at[0], at[1], std::f64::consts::PI).unwrap_err();
        assert!(matches!(err, BrepError::Precondition(_)));
        assert_eq!(b.edge_count(), 12);
        assert_eq!(b.vertices[0].edges, at);
        assert!(b.is_valid(None));
    }
}
