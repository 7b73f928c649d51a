//! Spatial maps applied to the whole Brep, and face orientation flips.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::geometry::{Similarity, Surface, Transform};
use crate::topology::brep::Brep;
use crate::topology::index::*;

/// Exact image of a plane under a map that does not keep it a plane with
/// the same parameterization: its bilinear NURBS form, transformed, kept
/// only if the corners land where the transformed plane's corners do.
fn plane_substitute(surface: &Surface, xform: &Transform) -> Option<Surface> {
    let mut nurbs = Surface::Nurbs(surface.nurbs_form()?);
    if !nurbs.transform(xform) {
        return None;
    }
    let (du, dv) = (surface.domain(0), surface.domain(1));
    for u in [du.t0, du.t1] {
        for v in [dv.t0, dv.t1] {
            let expected = xform.transform_point(&surface.point_at(u, v));
            let scale = expected.max_abs_coordinate().max(1.0);
            if nurbs.point_at(u, v).distance_to(&expected) > crate::ZERO_TOLERANCE * scale {
                return None;
            }
        }
    }
    Some(nurbs)
}

impl Brep {
    /// Apply `xform` to every 3D curve, surface, vertex and cached mesh.
    ///
    /// Returns false if any piece of geometry could only be approximated;
    /// the rest is still transformed. A map that reverses orientation also
    /// flips every face so outward sides stay outward.
    #[instrument(skip(self))]
    pub fn transform(&mut self, xform: &Transform) -> bool {
        let similarity = xform.similarity(crate::SQRT_EPSILON);
        let mut ok = true;
        let mut substituted = 0;

        for entry in self.surfaces.iter_mut() {
            let Some(surface) = entry.as_mut() else { continue };
            if similarity == Similarity::None && matches!(surface, Surface::Plane(_)) {
                if let Some(nurbs) = plane_substitute(surface, xform) {
                    *surface = nurbs;
                    substituted += 1;
                    continue;
                }
                warn!("plane could not be replaced by an exact nurbs surface");
            }
            ok &= surface.transform(xform);
        }
        for curve in self.curves3.iter_mut().flatten() {
            ok &= curve.transform(xform);
        }

        let scale = xform.similarity_scale(crate::SQRT_EPSILON).map(f64::abs);
        for v in &mut self.vertices {
            v.point = xform.transform_point(&v.point);
            if let (Some(s), Some(tol)) = (scale, v.tolerance.as_mut()) {
                *tol *= s;
            }
        }
        if let Some(s) = scale {
            for tol in self.edges.iter_mut().filter_map(|e| e.tolerance.as_mut()) {
                *tol *= s;
            }
        }

        let reverses = xform.determinant() < 0.0;
        for face in &mut self.faces {
            for mesh in face.meshes.iter_mut() {
                Arc::make_mut(mesh).transform(xform);
            }
            if reverses && face.index.is_some() {
                face.reversed = !face.reversed;
            }
        }
        self.invalidate_caches();
        debug!(ok, substituted, reverses, "brep transformed");
        ok
    }

    /// Reverse the orientation of face `f` and its cached meshes.
    #[instrument(skip(self))]
    pub fn flip_face(&mut self, f: FaceIndex) -> Result<()> {
        self.live_face(f)?;
        let face = &mut self.faces[f.0];
        face.reversed = !face.reversed;
        for mesh in face.meshes.iter_mut() {
            Arc::make_mut(mesh).flip();
        }
        self.invalidate_caches();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;

    use crate::geometry::{Mesh, Point3d, Surface, Vec3};
    use crate::topology::primitives::{make_box, unit_square_face};
    use crate::*;

    #[test]
    fn test_translation_moves_everything() {
        let mut b = make_box(1.0, 1.0, 1.0).unwrap();
        assert!(b.transform(&Transform::translation(0.0, 0.0, 5.0)));
        let bb = b.bounding_box();
        assert_relative_eq!(bb.min.z, 5.0, epsilon = 1e-9);
        assert_relative_eq!(bb.max.z, 6.0, epsilon = 1e-9);
        assert!(matches!(b.surfaces[0], Some(Surface::Plane(_))));
        assert!(b.is_valid(None));
    }

    #[test]
    fn test_shear_replaces_plane_with_nurbs() {
        let mut b = unit_square_face().unwrap();
        let original = b.surfaces[0].clone().unwrap();
        let shear = Transform::shear_xy(0.5);
        assert!(b.transform(&shear));
        let surface = b.surfaces[0].as_ref().unwrap();
        assert!(matches!(surface, Surface::Nurbs(_)));
        for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            let expected = shear.transform_point(&original.point_at(u, v));
            assert!(surface.point_at(u, v).distance_to(&expected) <= ZERO_TOLERANCE);
        }
        let mut log = TextLog::new();
        assert!(b.is_valid(Some(&mut log)), "{log}");
    }

    #[test]
    fn test_mirror_flips_faces_and_keeps_solid() {
        let mut b = make_box(1.0, 1.0, 1.0).unwrap();
        assert!(b.transform(&Transform::mirror(Vec3::new(1.0, 0.0, 0.0))));
        assert!(b.faces.iter().all(|f| f.reversed));
        assert!(b.is_solid());
        assert!(b.is_valid(None));
    }

    #[test]
    fn test_uniform_scale_grows_tolerances() {
        let mut b = unit_square_face().unwrap();
        b.vertices[0].tolerance = Some(0.001);
        assert!(b.transform(&Transform::uniform_scaling(2.0)));
        assert_relative_eq!(b.vertices[0].tolerance.unwrap(), 0.002, epsilon = 1e-12);
        assert_relative_eq!(b.vertices[2].point.x, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_and_flip_copy_shared_meshes() {
        let mut b = unit_square_face().unwrap();
        let mut mesh = Mesh::new();
        let n = Vec3::new(0.0, 0.0, 1.0);
        mesh.add_vertex(Point3d::ORIGIN, n);
        mesh.add_vertex(Point3d::new(1.0, 0.0, 0.0), n);
        mesh.add_vertex(Point3d::new(0.0, 1.0, 0.0), n);
        mesh.add_triangle(0, 1, 2);
        let shared = Arc::new(mesh);
        assert!(b.set_mesh(FaceIndex(0), MeshKind::Render, Arc::clone(&shared)));
        let snapshot = b.clone();

        assert!(b.transform(&Transform::translation(1.0, 0.0, 0.0)));
        let moved = b.mesh(FaceIndex(0), MeshKind::Render).unwrap();
        assert_relative_eq!(moved.position(0).x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(shared.position(0).x, 0.0, epsilon = 1e-6);
        let kept = snapshot.mesh(FaceIndex(0), MeshKind::Render).unwrap();
        assert!(Arc::ptr_eq(kept, &shared));

        b.flip_face(FaceIndex(0)).unwrap();
        assert!(b.faces[0].reversed);
        assert!(b.flip_face(FaceIndex(3)).is_err());
    }
}
