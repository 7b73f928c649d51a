//! Splicing one Brep's records and geometry onto the end of another.

use tracing::{debug, instrument, warn};

use crate::error::{BrepError, Result};
use crate::topology::brep::Brep;
use crate::topology::index::*;

/// Array lengths of the receiving Brep before the splice.
#[derive(Debug, Clone, Copy)]
struct Offsets {
    vertices: usize,
    edges: usize,
    trims: usize,
    loops: usize,
    faces: usize,
    curves2: usize,
    curves3: usize,
    surfaces: usize,
}

impl Offsets {
    fn of(brep: &Brep) -> Self {
        Self {
            vertices: brep.vertices.len(),
            edges: brep.edges.len(),
            trims: brep.trims.len(),
            loops: brep.loops.len(),
            faces: brep.faces.len(),
            curves2: brep.curves2.len(),
            curves3: brep.curves3.len(),
            surfaces: brep.surfaces.len(),
        }
    }
}

fn shift<I>(index: Option<I>, by: usize, slot: impl Fn(I) -> usize, make: impl Fn(usize) -> I) -> Option<I> {
    index.map(|i| make(slot(i) + by))
}

impl Brep {
    /// Copy every record and geometry entry of `other` into this Brep.
    ///
    /// Indices of the copies are offset by this Brep's array lengths, so
    /// deleted slots are carried over as deleted slots. A corrupt source is
    /// refused before anything is copied.
    #[instrument(skip(self, other))]
    pub fn append(&mut self, other: &Brep) -> Result<()> {
        let corruption = other.check_corruption();
        if !corruption.is_empty() {
            warn!(findings = corruption.len(), "refusing to append a corrupt brep");
            return Err(BrepError::CorruptSource);
        }
        let off = Offsets::of(self);
        let id = self.id();
        let bbox = match (self.bbox.get(), other.bbox.get()) {
            (Some(a), Some(b)) if a.is_valid() && b.is_valid() => Some(a.union(b)),
            _ => None,
        };

        self.curves2.extend(other.curves2.iter().cloned());
        self.curves3.extend(other.curves3.iter().cloned());
        self.surfaces.extend(other.surfaces.iter().cloned());

        self.vertices.extend(other.vertices.iter().map(|v| {
            let mut v = v.clone();
            v.brep = id;
            v.index = shift(v.index, off.vertices, |i| i.0, VertexIndex);
            v.edges.iter_mut().for_each(|e| e.0 += off.edges);
            v
        }));
        self.edges.extend(other.edges.iter().map(|e| {
            let mut e = e.clone();
            e.brep = id;
            e.index = shift(e.index, off.edges, |i| i.0, EdgeIndex);
            e.curve = shift(e.curve, off.curves3, |c| c.0, Curve3Index);
            for v in &mut e.vertices {
                *v = shift(*v, off.vertices, |i| i.0, VertexIndex);
            }
            e.trims.iter_mut().for_each(|t| t.0 += off.trims);
            e
        }));
        self.trims.extend(other.trims.iter().map(|t| {
            let mut t = t.clone();
            t.brep = id;
            t.index = shift(t.index, off.trims, |i| i.0, TrimIndex);
            t.loop_index = shift(t.loop_index, off.loops, |l| l.0, LoopIndex);
            t.curve = shift(t.curve, off.curves2, |c| c.0, Curve2Index);
            t.edge = shift(t.edge, off.edges, |e| e.0, EdgeIndex);
            for v in &mut t.vertices {
                *v = shift(*v, off.vertices, |i| i.0, VertexIndex);
            }
            t
        }));
        self.loops.extend(other.loops.iter().map(|l| {
            let mut l = l.clone();
            l.brep = id;
            l.index = shift(l.index, off.loops, |i| i.0, LoopIndex);
            l.face = shift(l.face, off.faces, |f| f.0, FaceIndex);
            l.trims.iter_mut().for_each(|t| t.0 += off.trims);
            l
        }));
        self.faces.extend(other.faces.iter().map(|f| {
            let mut f = f.clone();
            f.brep = id;
            f.index = shift(f.index, off.faces, |i| i.0, FaceIndex);
            f.surface = shift(f.surface, off.surfaces, |s| s.0, SurfaceIndex);
            f.loops.iter_mut().for_each(|l| l.0 += off.loops);
            f
        }));

        self.invalidate_caches();
        if let Some(bbox) = bbox {
            // Freshly reset, so the cell is empty.
            let _ = self.bbox.set(bbox);
        }
        debug!(
            vertices = self.vertex_count(),
            edges = self.edge_count(),
            trims = self.trim_count(),
            faces = self.face_count(),
            "brep appended"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::topology::primitives::{make_box, unit_square_face};
    use crate::*;

    #[test]
    fn test_append_offsets_every_reference() {
        let mut a = unit_square_face().unwrap();
        let b = make_box(1.0, 1.0, 1.0).unwrap();
        a.append(&b).unwrap();
        assert_eq!(a.vertex_count(), 12);
        assert_eq!(a.edge_count(), 16);
        assert_eq!(a.trim_count(), 28);
        assert_eq!(a.loop_count(), 7);
        assert_eq!(a.face_count(), 7);

        let t = &a.trims[4];
        assert_eq!(t.index, Some(TrimIndex(4)));
        assert_eq!(t.edge, b.trims[0].edge.map(|e| EdgeIndex(e.0 + 4)));
        assert_eq!(t.loop_index, Some(LoopIndex(1)));
        assert_eq!(t.curve, Some(Curve2Index(4)));
        assert_eq!(a.faces[1].surface, Some(SurfaceIndex(1)));
        assert!(a.trims.iter().all(|t| t.brep == a.id()));
        let mut log = TextLog::new();
        assert!(a.is_valid(Some(&mut log)), "{log}");
    }

    #[test]
    fn test_append_carries_deleted_slots() {
        let mut a = make_box(1.0, 1.0, 1.0).unwrap();
        a.delete_face(FaceIndex(0), false).unwrap();
        let mut b = unit_square_face().unwrap();
        b.append(&a).unwrap();
        assert_eq!(b.faces.len(), 7);
        assert_eq!(b.face_count(), 6);
        assert!(b.face(FaceIndex(1)).is_none());
        assert_eq!(b.faces[2].index, Some(FaceIndex(2)));
        assert!(b.is_valid(None));
    }

    #[test]
    fn test_append_refuses_corrupt_source() {
        let mut a = unit_square_face().unwrap();
        let mut bad = unit_square_face().unwrap();
        bad.edges[0].trims.push(TrimIndex(50));
        assert_eq!(a.append(&bad), Err(BrepError::CorruptSource));
        assert_eq!(a.vertices.len(), 4);
        assert_eq!(a.curves3.len(), 4);
    }

    #[test]
    fn test_append_unions_cached_boxes() {
        let mut a = make_box(1.0, 1.0, 1.0).unwrap();
        let mut b = make_box(1.0, 1.0, 1.0).unwrap();
        b.transform(&Transform::translation(3.0, 0.0, 0.0));
        a.bounding_box();
        b.bounding_box();
        a.append(&b).unwrap();
        let cached = a.cached_bounding_box().unwrap();
        assert!((cached.max.x - 4.0).abs() < 1e-9);
        assert!(cached.min.x.abs() < 1e-9);
    }
}
