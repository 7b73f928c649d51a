//! Lazily computed bounding boxes, solid classification, trim polylines and
//! the per-face mesh cache.

use std::sync::Arc;

use tracing::debug;

use super::brep::Brep;
use super::index::*;
use super::records::*;
use crate::geometry::{BoundingBox, Interval, Mesh, Point2d};

/// Samples per trim when building a polyline.
const POLYLINE_SEGMENTS: usize = 16;

/// Grid resolution of the preview mesh.
const PREVIEW_GRID: usize = 8;

impl Brep {
    /// 3D box of a face, cached until the next structural change.
    pub fn face_bounding_box(&self, f: FaceIndex) -> BoundingBox {
        let Some(face) = self.face(f) else {
            return BoundingBox::empty();
        };
        *face.bbox.get_or_init(|| self.compute_face_bbox(f))
    }

    fn compute_face_bbox(&self, f: FaceIndex) -> BoundingBox {
        let Some(face) = self.face(f) else {
            return BoundingBox::empty();
        };
        let Some(srf) = self.face_surface(f) else {
            return BoundingBox::empty();
        };
        let mut bb = BoundingBox::empty();
        // Sample the surface over the parameter box of the outer loop.
        let outer = face.loops.first().and_then(|l| self.loop_at(*l));
        let (du, dv) = match outer.filter(|l| l.bbox.is_valid()) {
            Some(l) => (
                Interval::new(l.bbox.min.x, l.bbox.max.x),
                Interval::new(l.bbox.min.y, l.bbox.max.y),
            ),
            None => (srf.domain(0), srf.domain(1)),
        };
        for i in 0..=PREVIEW_GRID {
            for j in 0..=PREVIEW_GRID {
                let u = du.param_at(i as f64 / PREVIEW_GRID as f64);
                let v = dv.param_at(j as f64 / PREVIEW_GRID as f64);
                bb.expand_to_include(&srf.point_at(u, v));
            }
        }
        for l in face.loops.iter().filter_map(|l| self.loop_at(*l)) {
            for t in l.trims.iter().filter_map(|t| self.trim(*t)) {
                if let Some(e) = t.edge.filter(|e| self.edge(*e).is_some()) {
                    bb = bb.union(&self.edge_bounding_box(e));
                }
            }
        }
        bb
    }

    pub fn edge_bounding_box(&self, e: EdgeIndex) -> BoundingBox {
        let Some(edge) = self.edge(e) else {
            return BoundingBox::empty();
        };
        let Some(curve) = edge.curve.and_then(|c| self.curve3(c)) else {
            return BoundingBox::empty();
        };
        let mut piece = curve.clone();
        if edge.proxy.curve_domain != curve.domain() && !piece.trim(edge.proxy.curve_domain) {
            return curve.bounding_box();
        }
        piece.bounding_box()
    }

    /// Box around every face, wire edge and vertex.
    pub fn bounding_box(&self) -> BoundingBox {
        *self.bbox.get_or_init(|| {
            let mut bb = self
                .face_indices()
                .fold(BoundingBox::empty(), |acc, f| acc.union(&self.face_bounding_box(f)));
            for e in self.edge_indices() {
                if self.edges[e.0].trims.is_empty() {
                    bb = bb.union(&self.edge_bounding_box(e));
                }
            }
            for v in self.vertex_indices() {
                bb.expand_to_include(&self.vertices[v.0].point);
            }
            bb
        })
    }

    /// Cached overall box, if one has been computed or set.
    pub fn cached_bounding_box(&self) -> Option<BoundingBox> {
        self.bbox.get().copied()
    }

    /// Every edge is used by exactly two mated trims that run along it in
    /// opposite directions.
    pub fn is_solid(&self) -> bool {
        *self.solid.get_or_init(|| {
            self.face_count() > 0
                && self.edge_indices().all(|e| {
                    let live: Vec<&Trim> = self.edges[e.0].trims.iter().filter_map(|t| self.trim(*t)).collect();
                    live.len() == 2
                        && live.iter().all(|t| t.trim_type == TrimType::Mated)
                        && live[0].reversed != live[1].reversed
                })
        })
    }

    /// Parameter-space polyline of a trim, sampled once and cached.
    pub fn trim_polyline(&self, t: TrimIndex) -> Option<&[Point2d]> {
        let trim = self.trim(t)?;
        if let Some(p) = trim.polyline.get() {
            return Some(p.as_slice());
        }
        let d = trim.domain();
        let points = match trim.curve {
            Some(_) => (0..=POLYLINE_SEGMENTS)
                .map(|i| self.trim_point_at(t, d.param_at(i as f64 / POLYLINE_SEGMENTS as f64)))
                .collect::<Option<Vec<_>>>()?,
            None => vec![self.trim_point_at(t, d.t0)?],
        };
        Some(trim.polyline.get_or_init(|| points).as_slice())
    }

    // ── Meshes ──

    pub fn mesh(&self, f: FaceIndex, kind: MeshKind) -> Option<&Arc<Mesh>> {
        self.face(f)?.meshes.get(kind)
    }

    /// Share `mesh` as the face's cached mesh of `kind`.
    pub fn set_mesh(&mut self, f: FaceIndex, kind: MeshKind, mesh: Arc<Mesh>) -> bool {
        if self.face(f).is_none() {
            return false;
        }
        *self.faces[f.0].meshes.slot_mut(kind) = Some(mesh);
        true
    }

    /// Mutable access to a cached mesh; copies it first if anyone else
    /// holds it.
    pub fn mesh_mut(&mut self, f: FaceIndex, kind: MeshKind) -> Option<&mut Mesh> {
        self.face(f)?;
        self.faces[f.0].meshes.slot_mut(kind).as_mut().map(Arc::make_mut)
    }

    /// Drop cached meshes on every face.
    pub fn destroy_meshes(&mut self) {
        for face in &mut self.faces {
            face.meshes.clear();
        }
    }

    /// Build a coarse preview mesh for a face that has none.
    pub fn ensure_preview_mesh(&mut self, f: FaceIndex) -> Option<Arc<Mesh>> {
        if let Some(m) = self.mesh(f, MeshKind::Preview) {
            return Some(Arc::clone(m));
        }
        let face = self.face(f)?;
        let reversed = face.reversed;
        let mut mesh = Mesh::from_surface_grid(self.face_surface(f)?, PREVIEW_GRID, PREVIEW_GRID);
        if reversed {
            mesh.flip();
        }
        let mesh = Arc::new(mesh);
        self.set_mesh(f, MeshKind::Preview, Arc::clone(&mesh));
        debug!(face = %f, triangles = mesh.triangle_count(), "preview mesh built");
        Some(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::primitives::{make_box, unit_square_face};

    #[test]
    fn test_box_is_solid_and_bounded() {
        let b = make_box(1.0, 2.0, 3.0).unwrap();
        assert!(b.is_solid());
        let bb = b.bounding_box();
        assert!((bb.max.z - 3.0).abs() < 1e-9);
        assert!(bb.min.x.abs() < 1e-9);
    }

    #[test]
    fn test_single_face_is_not_solid() {
        let b = unit_square_face().unwrap();
        assert!(!b.is_solid());
    }

    #[test]
    fn test_mesh_copy_on_write() {
        let mut b = unit_square_face().unwrap();
        let f = FaceIndex(0);
        let shared = b.ensure_preview_mesh(f).unwrap();
        let before = shared.positions.clone();
        b.mesh_mut(f, MeshKind::Preview).unwrap().positions[0] += 1.0;
        assert_eq!(shared.positions, before);
        assert_ne!(b.mesh(f, MeshKind::Preview).unwrap().positions, before);
    }

    #[test]
    fn test_trim_polyline_is_cached() {
        let b = unit_square_face().unwrap();
        let t = b.loops[0].trims[0];
        let first = b.trim_polyline(t).unwrap().as_ptr();
        assert_eq!(b.trim_polyline(t).unwrap().as_ptr(), first);
        assert_eq!(b.trim_polyline(t).unwrap().len(), POLYLINE_SEGMENTS + 1);
    }
}
