//! Read-only walks over trim and edge adjacency.

use crate::geometry::Point2d;

use super::brep::Brep;
use super::index::*;

impl Brep {
    /// Face owning the trim's loop.
    pub fn face_of_trim(&self, t: TrimIndex) -> Option<FaceIndex> {
        let l = self.trim(t)?.loop_index?;
        let f = self.loop_at(l)?.face?;
        self.face(f).map(|_| f)
    }

    fn cyclic_neighbour(&self, t: TrimIndex, step: isize) -> Option<TrimIndex> {
        let l = self.trim(t)?.loop_index?;
        let trims = &self.loop_at(l)?.trims;
        let n = trims.len() as isize;
        let pos = trims.iter().position(|x| *x == t)? as isize;
        Some(trims[(pos + step).rem_euclid(n) as usize])
    }

    /// Trim after `t` in its loop, wrapping around.
    pub fn next_trim(&self, t: TrimIndex) -> Option<TrimIndex> {
        self.cyclic_neighbour(t, 1)
    }

    pub fn prev_trim(&self, t: TrimIndex) -> Option<TrimIndex> {
        self.cyclic_neighbour(t, -1)
    }

    /// Which list position at vertex `v` belongs to end `end` of `e`.
    ///
    /// A closed edge sits in the list twice; its first occurrence is end 0.
    fn incidence_position(&self, edges: &[EdgeIndex], e: EdgeIndex, end: usize) -> Option<usize> {
        let edge = self.edge(e)?;
        let mut hits = edges.iter().enumerate().filter(|(_, x)| **x == e).map(|(i, _)| i);
        if edge.vertices[0] == edge.vertices[1] {
            hits.nth(end)
        } else {
            hits.next()
        }
    }

    /// End of the edge stored at list position `pos`.
    fn end_at_position(&self, edges: &[EdgeIndex], pos: usize, v: VertexIndex) -> Option<usize> {
        let e = edges[pos];
        let edge = self.edge(e)?;
        if edge.vertices[0] == Some(v) && edge.vertices[1] == Some(v) {
            Some(edges[..pos].iter().filter(|x| **x == e).count().min(1))
        } else if edge.vertices[0] == Some(v) {
            Some(0)
        } else if edge.vertices[1] == Some(v) {
            Some(1)
        } else {
            None
        }
    }

    fn rotate_at_vertex(&self, e: EdgeIndex, end: usize, step: isize) -> Option<(EdgeIndex, usize)> {
        let v = self.edge(e)?.vertices[end.min(1)]?;
        let edges = &self.vertex(v)?.edges;
        let pos = self.incidence_position(edges, e, end.min(1))? as isize;
        let n = edges.len() as isize;
        let next = (pos + step).rem_euclid(n) as usize;
        let next_end = self.end_at_position(edges, next, v)?;
        Some((edges[next], next_end))
    }

    /// Next edge around the vertex at `end` of `e`, with the end of that
    /// edge touching the vertex.
    pub fn next_edge(&self, e: EdgeIndex, end: usize) -> Option<(EdgeIndex, usize)> {
        self.rotate_at_vertex(e, end, 1)
    }

    pub fn prev_edge(&self, e: EdgeIndex, end: usize) -> Option<(EdgeIndex, usize)> {
        self.rotate_at_vertex(e, end, -1)
    }

    /// The other trim of a manifold edge and its end at the same vertex.
    /// `None` for boundary and non-manifold edges.
    pub fn hop_across_edge(&self, t: TrimIndex, end: usize) -> Option<(TrimIndex, usize)> {
        let trim = self.trim(t)?;
        let edge = self.edge(trim.edge?)?;
        if edge.trims.len() != 2 {
            return None;
        }
        let other = if edge.trims[0] == t { edge.trims[1] } else { edge.trims[0] };
        if other == t {
            return None;
        }
        let edge_end = trim.edge_end(end.min(1));
        let other_end = self.trim(other)?.edge_end(edge_end);
        Some((other, other_end))
    }

    /// +1 for a counter-clockwise loop in parameter space, -1 clockwise,
    /// 0 when the area vanishes or the loop cannot be sampled.
    pub fn loop_direction(&self, l: LoopIndex) -> i32 {
        let Some(lp) = self.loop_at(l) else { return 0 };
        let mut points: Vec<Point2d> = Vec::new();
        for &t in &lp.trims {
            match self.trim_polyline(t) {
                Some(poly) => points.extend(poly.iter().take(poly.len().saturating_sub(1))),
                None => return 0,
            }
        }
        if points.len() < 3 {
            return 0;
        }
        let n = points.len();
        let twice_area: f64 = (0..n)
            .map(|i| {
                let (a, b) = (points[i], points[(i + 1) % n]);
                a.x * b.y - b.x * a.y
            })
            .sum();
        let scale = lp.bbox.max_abs_coordinate().max(1.0);
        if twice_area.abs() <= crate::ZERO_TOLERANCE * scale * scale {
            0
        } else if twice_area > 0.0 {
            1
        } else {
            -1
        }
    }

    pub fn edge_curve_use_count(&self, c: Curve3Index) -> usize {
        self.edges.iter().filter(|e| e.index.is_some() && e.curve == Some(c)).count()
    }

    pub fn trim_curve_use_count(&self, c: Curve2Index) -> usize {
        self.trims.iter().filter(|t| t.index.is_some() && t.curve == Some(c)).count()
    }

    pub fn surface_use_count(&self, s: SurfaceIndex) -> usize {
        self.faces.iter().filter(|f| f.index.is_some() && f.surface == Some(s)).count()
    }
}

#[cfg(test)]
mod tests {
    use crate::topology::primitives::{make_box, unit_square_face};
    use crate::{Brep, TrimIndex};

    #[test]
    fn test_next_prev_trim_wrap() {
        let b = unit_square_face().unwrap();
        let lp = &b.loops[0];
        let first = lp.trims[0];
        let last = *lp.trims.last().unwrap();
        assert_eq!(b.next_trim(last), Some(first));
        assert_eq!(b.prev_trim(first), Some(last));
        assert_eq!(b.next_trim(TrimIndex(99)), None);
    }

    #[test]
    fn test_hop_across_box_edge_lands_on_same_vertex() {
        let b = make_box(1.0, 1.0, 1.0).unwrap();
        for t in b.trim_indices() {
            for end in 0..2 {
                let (other, other_end) = b.hop_across_edge(t, end).unwrap();
                assert_ne!(other, t);
                assert_eq!(b.trims[t.0].vertices[end], b.trims[other.0].vertices[other_end]);
            }
        }
    }

    #[test]
    fn test_boundary_edge_has_no_hop() {
        let b = unit_square_face().unwrap();
        assert!(b.hop_across_edge(b.loops[0].trims[0], 0).is_none());
    }

    #[test]
    fn test_next_edge_cycles_box_corner() {
        let b = make_box(1.0, 1.0, 1.0).unwrap();
        let e0 = b.edge_indices().next().unwrap();
        let mut seen = vec![e0];
        let (mut e, mut end) = (e0, 0);
        let v = b.edges[e0.0].vertices[0];
        loop {
            let (n, n_end) = b.next_edge(e, end).unwrap();
            assert_eq!(b.edges[n.0].vertices[n_end], v);
            if n == e0 {
                break;
            }
            seen.push(n);
            e = n;
            end = n_end;
        }
        assert_eq!(seen.len(), 3);
        assert_eq!(b.prev_edge(seen[1], b.edges[seen[1].0].vertices.iter().position(|x| *x == v).unwrap()).unwrap().0, e0);
    }

    #[test]
    fn test_square_loop_is_counter_clockwise() {
        let b: Brep = unit_square_face().unwrap();
        assert_eq!(b.loop_direction(crate::LoopIndex(0)), 1);
    }
}
