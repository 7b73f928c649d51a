//! Soft deletion with cascade.
//!
//! A deleted record keeps its slot with `index == None` and every outgoing
//! reference cleared. Siblings drop the deleted index from their lists and
//! re-derive their tags; [`Brep::compact`] reclaims the slots later.

use std::collections::BTreeSet;

use tracing::{debug, instrument};

use crate::error::Result;
use crate::topology::brep::Brep;
use crate::topology::index::*;
use crate::topology::records::*;

impl Brep {
    /// Delete a trim. With `delete_edge`, its edge goes too once no other
    /// trim uses it.
    #[instrument(skip(self))]
    pub fn delete_trim(&mut self, t: TrimIndex, delete_edge: bool) -> Result<()> {
        let trim = self.live_trim(t)?;
        let (lp, edge) = (trim.loop_index, trim.edge);

        if let Some(l) = lp.filter(|l| self.loop_at(*l).is_some()) {
            self.loops[l.0].trims.retain(|x| *x != t);
            self.set_loop_bounding_box(l);
        }
        if let Some(e) = edge.filter(|e| self.edge(*e).is_some()) {
            self.edges[e.0].trims.retain(|x| *x != t);
            let siblings = self.edges[e.0].trims.clone();
            self.trims[t.0] = Trim {
                brep: self.id(),
                ..Default::default()
            };
            for s in siblings {
                if self.trim(s).is_some() {
                    self.rederive_trim_type(s);
                }
            }
            if delete_edge && self.edges[e.0].trims.is_empty() {
                self.delete_edge(e, true)?;
            }
        } else {
            self.trims[t.0] = Trim {
                brep: self.id(),
                ..Default::default()
            };
        }
        self.invalidate_caches();
        debug!(trim = %t, "trim deleted");
        Ok(())
    }

    /// Delete an edge and every face that uses it. With `delete_vertices`,
    /// end vertices left without edges are deleted as well.
    #[instrument(skip(self))]
    pub fn delete_edge(&mut self, e: EdgeIndex, delete_vertices: bool) -> Result<()> {
        let edge = self.live_edge(e)?;
        let trims = edge.trims.clone();
        let ends = edge.vertices;

        let faces: BTreeSet<FaceIndex> = trims.iter().filter_map(|t| self.face_of_trim(*t)).collect();
        for f in faces {
            if self.face(f).is_some() {
                self.delete_face(f, false)?;
            }
        }
        // Trims outside any face.
        for t in self.edges[e.0].trims.clone() {
            if self.trim(t).is_some() {
                self.delete_trim(t, false)?;
            }
        }

        self.set_edge_vertex(e, 0, None);
        self.set_edge_vertex(e, 1, None);
        self.edges[e.0] = Edge {
            brep: self.id(),
            ..Default::default()
        };
        if delete_vertices {
            for v in ends.into_iter().flatten().collect::<BTreeSet<_>>() {
                if self.vertex(v).is_some_and(|x| x.edges.is_empty()) && !self.vertex_has_point_trim(v) {
                    self.delete_vertex(v)?;
                }
            }
        }
        self.invalidate_caches();
        debug!(edge = %e, "edge deleted");
        Ok(())
    }

    /// Delete a loop and its trims, detaching it from its face.
    #[instrument(skip(self))]
    pub fn delete_loop(&mut self, l: LoopIndex, delete_edges: bool) -> Result<()> {
        let lp = self.live_loop(l)?;
        let (trims, face) = (lp.trims.clone(), lp.face);
        for t in trims {
            if self.trim(t).is_some() {
                self.delete_trim(t, delete_edges)?;
            }
        }
        if let Some(f) = face.filter(|f| self.face(*f).is_some()) {
            self.faces[f.0].loops.retain(|x| *x != l);
        }
        self.loops[l.0] = Loop {
            brep: self.id(),
            ..Default::default()
        };
        self.invalidate_caches();
        Ok(())
    }

    /// Delete a face with its loops and trims. With `delete_edges`, edges
    /// left without trims are deleted too.
    #[instrument(skip(self))]
    pub fn delete_face(&mut self, f: FaceIndex, delete_edges: bool) -> Result<()> {
        let loops = self.live_face(f)?.loops.clone();
        for l in loops {
            if self.loop_at(l).is_some() {
                self.delete_loop(l, delete_edges)?;
            }
        }
        self.faces[f.0] = Face {
            brep: self.id(),
            ..Default::default()
        };
        self.invalidate_caches();
        debug!(face = %f, "face deleted");
        Ok(())
    }

    /// Delete a vertex, every edge that ends at it and the trims that sit on it.
    #[instrument(skip(self))]
    pub fn delete_vertex(&mut self, v: VertexIndex) -> Result<()> {
        let edges: BTreeSet<EdgeIndex> = self.live_vertex(v)?.edges.iter().copied().collect();
        for e in edges {
            if self.edge(e).is_some() {
                self.delete_edge(e, false)?;
            }
        }
        let on_vertex: Vec<TrimIndex> = self
            .trim_indices()
            .filter(|t| self.trims[t.0].edge.is_none() && self.trims[t.0].vertices.contains(&Some(v)))
            .collect();
        for t in on_vertex {
            let Some(trim) = self.trim(t) else { continue };
            match (trim.trim_type, trim.loop_index) {
                (TrimType::PointOnSurface, Some(l)) if self.loop_at(l).is_some() => self.delete_loop(l, false)?,
                _ => self.delete_trim(t, false)?,
            }
        }
        self.vertices[v.0] = Vertex {
            brep: self.id(),
            ..Default::default()
        };
        self.invalidate_caches();
        Ok(())
    }

    pub(crate) fn vertex_has_point_trim(&self, v: VertexIndex) -> bool {
        self.trims
            .iter()
            .any(|t| t.is_live() && t.edge.is_none() && t.vertices.contains(&Some(v)))
    }
}

#[cfg(test)]
mod tests {
    use crate::topology::primitives::{make_box, unit_square_face};
    use crate::*;

    #[test]
    fn test_delete_mated_trim_leaves_boundary() {
        let mut b = make_box(1.0, 1.0, 1.0).unwrap();
        let t = TrimIndex(0);
        let e = b.trims[t.0].edge.unwrap();
        b.delete_trim(t, false).unwrap();
        assert_eq!(b.edges[e.0].trims.len(), 1);
        let other = b.edges[e.0].trims[0];
        assert_eq!(b.trims[other.0].trim_type, TrimType::Boundary);
        assert!(b.trim(t).is_none());
    }

    #[test]
    fn test_delete_edge_cascades_to_faces() {
        let mut b = make_box(1.0, 1.0, 1.0).unwrap();
        b.delete_edge(EdgeIndex(0), true).unwrap();
        assert_eq!(b.face_count(), 4);
        assert_eq!(b.edge_count(), 11);
        assert_eq!(b.trim_count(), 16);
        assert_eq!(b.vertex_count(), 8);
        assert!(b.is_valid(None));
    }

    #[test]
    fn test_delete_face_with_edges_cleans_square() {
        let mut b = unit_square_face().unwrap();
        b.delete_face(FaceIndex(0), true).unwrap();
        assert!(b.is_empty());
        assert_eq!(b.loop_count(), 0);
        assert_eq!(b.trim_count(), 0);
        // Slots stay until compaction.
        assert_eq!(b.vertices.len(), 4);
    }

    #[test]
    fn test_delete_vertex_removes_incident_edges() {
        let mut b = make_box(1.0, 1.0, 1.0).unwrap();
        b.delete_vertex(VertexIndex(0)).unwrap();
        assert_eq!(b.face_count(), 3);
        assert_eq!(b.edge_count(), 9);
        assert!(b.vertex(VertexIndex(0)).is_none());
        assert!(b.is_valid(None));
    }
}
