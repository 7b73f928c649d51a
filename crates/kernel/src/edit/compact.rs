//! Physical removal of deleted records and unused geometry.
//!
//! Each cull pass drops dead slots from one array, renumbers the survivors
//! contiguously and rewrites every reference into that array. Geometry
//! tables are reordered by first use, so when each curve or surface has a
//! single owner the table order matches the owner order.

use std::collections::HashSet;

use tracing::{debug, info, instrument};

use crate::topology::brep::Brep;
use crate::topology::index::*;
use crate::topology::records::*;

/// Old slot to new slot; `None` where the old slot was dropped.
struct Renumbering(Vec<Option<usize>>);

impl Renumbering {
    fn get(&self, old: usize) -> Option<usize> {
        self.0.get(old).copied().flatten()
    }

    fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(i, n)| *n == Some(i))
    }
}

/// Drop records whose stored index does not match their slot.
fn cull_records<R: Record>(items: &mut Vec<R>) -> Renumbering {
    let mut map = Vec::with_capacity(items.len());
    let mut next = 0;
    for (slot, r) in items.iter().enumerate() {
        if r.slot() == Some(slot) {
            map.push(Some(next));
            next += 1;
        } else {
            map.push(None);
        }
    }
    let mut slot = 0;
    items.retain(|_| {
        let keep = map[slot].is_some();
        slot += 1;
        keep
    });
    items.shrink_to_fit();
    Renumbering(map)
}

/// Keep the entries named by `uses`, in order of first use.
fn cull_table<T>(table: &mut Vec<Option<T>>, uses: impl IntoIterator<Item = usize>) -> Renumbering {
    let mut map = vec![None; table.len()];
    let mut order = Vec::new();
    for old in uses {
        if old < table.len() && map[old].is_none() {
            map[old] = Some(order.len());
            order.push(old);
        }
    }
    let mut old = std::mem::take(table);
    *table = order.into_iter().map(|i| old[i].take()).collect();
    Renumbering(map)
}

fn remap_list<I: Copy>(list: &mut Vec<I>, map: &Renumbering, slot: impl Fn(I) -> usize, make: impl Fn(usize) -> I) {
    *list = list.iter().filter_map(|i| map.get(slot(*i))).map(make).collect();
}

impl Brep {
    /// Remove every deleted record and every unreferenced curve and
    /// surface, renumbering what remains. Running it twice in a row leaves
    /// the second call with nothing to do.
    #[instrument(skip(self))]
    pub fn compact(&mut self) {
        self.cull_unused_faces();
        self.cull_unused_edges();
        self.cull_deleted_vertices();
        self.cull_unused_loops();
        self.cull_unused_trims();
        self.cull_unused_surfaces();
        self.cull_unused_curves3d();
        self.cull_unused_curves2d();
        info!(
            vertices = self.vertices.len(),
            edges = self.edges.len(),
            trims = self.trims.len(),
            loops = self.loops.len(),
            faces = self.faces.len(),
            "brep compacted"
        );
    }

    /// Soft-delete live vertices that no edge or trim uses. Returns how many
    /// were deleted.
    pub fn cull_unused_vertices(&mut self) -> usize {
        let used: HashSet<VertexIndex> = self
            .trims
            .iter()
            .filter(|t| t.is_live())
            .flat_map(|t| t.vertices.into_iter().flatten())
            .collect();
        let mut culled = 0;
        for v in self.vertex_indices().collect::<Vec<_>>() {
            if self.vertices[v.0].edges.is_empty() && !used.contains(&v) {
                self.vertices[v.0] = Vertex {
                    brep: self.id(),
                    ..Default::default()
                };
                culled += 1;
            }
        }
        culled
    }

    fn cull_unused_faces(&mut self) {
        let map = cull_records(&mut self.faces);
        if map.is_identity() {
            return;
        }
        for (i, f) in self.faces.iter_mut().enumerate() {
            f.index = Some(FaceIndex(i));
        }
        for l in &mut self.loops {
            l.face = l.face.and_then(|f| map.get(f.0)).map(FaceIndex);
        }
        debug!(faces = self.faces.len(), "faces culled");
    }

    fn cull_unused_edges(&mut self) {
        let map = cull_records(&mut self.edges);
        if map.is_identity() {
            return;
        }
        for (i, e) in self.edges.iter_mut().enumerate() {
            e.index = Some(EdgeIndex(i));
        }
        for v in &mut self.vertices {
            remap_list(&mut v.edges, &map, |e| e.0, EdgeIndex);
        }
        for t in &mut self.trims {
            t.edge = t.edge.and_then(|e| map.get(e.0)).map(EdgeIndex);
        }
        debug!(edges = self.edges.len(), "edges culled");
    }

    fn cull_deleted_vertices(&mut self) {
        self.cull_unused_vertices();
        let map = cull_records(&mut self.vertices);
        if map.is_identity() {
            return;
        }
        for (i, v) in self.vertices.iter_mut().enumerate() {
            v.index = Some(VertexIndex(i));
        }
        for e in &mut self.edges {
            for v in &mut e.vertices {
                *v = v.and_then(|v| map.get(v.0)).map(VertexIndex);
            }
        }
        for t in &mut self.trims {
            for v in &mut t.vertices {
                *v = v.and_then(|v| map.get(v.0)).map(VertexIndex);
            }
        }
        debug!(vertices = self.vertices.len(), "vertices culled");
    }

    fn cull_unused_loops(&mut self) {
        let map = cull_records(&mut self.loops);
        if map.is_identity() {
            return;
        }
        for (i, l) in self.loops.iter_mut().enumerate() {
            l.index = Some(LoopIndex(i));
        }
        for f in &mut self.faces {
            remap_list(&mut f.loops, &map, |l| l.0, LoopIndex);
        }
        for t in &mut self.trims {
            t.loop_index = t.loop_index.and_then(|l| map.get(l.0)).map(LoopIndex);
        }
        debug!(loops = self.loops.len(), "loops culled");
    }

    fn cull_unused_trims(&mut self) {
        let map = cull_records(&mut self.trims);
        if map.is_identity() {
            return;
        }
        for (i, t) in self.trims.iter_mut().enumerate() {
            t.index = Some(TrimIndex(i));
        }
        for l in &mut self.loops {
            remap_list(&mut l.trims, &map, |t| t.0, TrimIndex);
        }
        for e in &mut self.edges {
            remap_list(&mut e.trims, &map, |t| t.0, TrimIndex);
        }
        debug!(trims = self.trims.len(), "trims culled");
    }

    fn cull_unused_surfaces(&mut self) {
        let uses: Vec<usize> = self.faces.iter().filter_map(|f| f.surface).map(|s| s.0).collect();
        let map = cull_table(&mut self.surfaces, uses);
        for f in &mut self.faces {
            f.surface = f.surface.and_then(|s| map.get(s.0)).map(SurfaceIndex);
        }
    }

    fn cull_unused_curves3d(&mut self) {
        let uses: Vec<usize> = self.edges.iter().filter_map(|e| e.curve).map(|c| c.0).collect();
        let map = cull_table(&mut self.curves3, uses);
        for e in &mut self.edges {
            e.curve = e.curve.and_then(|c| map.get(c.0)).map(Curve3Index);
        }
    }

    fn cull_unused_curves2d(&mut self) {
        let uses: Vec<usize> = self.trims.iter().filter_map(|t| t.curve).map(|c| c.0).collect();
        let map = cull_table(&mut self.curves2, uses);
        for t in &mut self.trims {
            t.curve = t.curve.and_then(|c| map.get(c.0)).map(Curve2Index);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::geometry::{Curve, Point3d};
    use crate::topology::primitives::{make_box, unit_square_face};
    use crate::*;

    #[test]
    fn test_compact_renumbers_after_delete() {
        let mut b = make_box(1.0, 1.0, 1.0).unwrap();
        b.delete_face(FaceIndex(2), false).unwrap();
        b.compact();
        assert_eq!(b.faces.len(), 5);
        assert_eq!(b.loops.len(), 5);
        assert_eq!(b.trims.len(), 20);
        assert_eq!(b.edges.len(), 12);
        assert_eq!(b.surfaces.len(), 5);
        assert_eq!(b.curves2.len(), 20);
        for (i, t) in b.trims.iter().enumerate() {
            assert_eq!(t.index, Some(TrimIndex(i)));
            assert_eq!(t.curve, Some(Curve2Index(i)));
        }
        let mut log = TextLog::new();
        assert!(b.is_valid(Some(&mut log)), "{log}");
    }

    #[test]
    fn test_compact_is_idempotent() {
        let mut b = make_box(1.0, 2.0, 3.0).unwrap();
        b.delete_edge(EdgeIndex(5), true).unwrap();
        b.compact();
        let once = serde_json::to_string(&b).unwrap();
        b.compact();
        assert_eq!(serde_json::to_string(&b).unwrap(), once);
    }

    #[test]
    fn test_compact_empties_deleted_square() {
        let mut b = unit_square_face().unwrap();
        b.delete_face(FaceIndex(0), true).unwrap();
        b.compact();
        assert!(b.vertices.is_empty());
        assert!(b.edges.is_empty());
        assert!(b.trims.is_empty());
        assert!(b.curves2.is_empty());
        assert!(b.curves3.is_empty());
        assert!(b.surfaces.is_empty());
    }

    #[test]
    fn test_unused_vertex_and_curve_dropped() {
        let mut b = unit_square_face().unwrap();
        b.new_vertex(Point3d::new(5.0, 5.0, 5.0), None);
        b.add_curve3d(Curve::line(Point3d::ORIGIN, Point3d::new(0.0, 0.0, 1.0)));
        assert_eq!(b.cull_unused_vertices(), 1);
        assert_eq!(b.vertex_count(), 4);
        assert_eq!(b.vertices.len(), 5);
        b.compact();
        assert_eq!(b.vertices.len(), 4);
        assert_eq!(b.curves3.len(), 4);
        assert!(b.is_valid(None));
    }
}
