use std::collections::HashMap;

use tracing::{info, instrument};

use super::brep::Brep;
use super::index::*;
use super::records::LoopType;
use crate::error::{BrepError, Result};
use crate::geometry::{Curve, Interval, Plane, Point2d, Point3d, Surface};

/// One planar face over the unit square with four boundary edges, built
/// record by record.
pub fn unit_square_face() -> Result<Brep> {
    let mut brep = Brep::new();
    let srf = brep.add_surface(Surface::plane(Plane::xy(), Interval::UNIT, Interval::UNIT));
    let uv = [
        Point2d::new(0.0, 0.0),
        Point2d::new(1.0, 0.0),
        Point2d::new(1.0, 1.0),
        Point2d::new(0.0, 1.0),
    ];
    let verts: Vec<VertexIndex> = uv.iter().map(|p| brep.new_vertex(p.to_3d(), Some(0.0))).collect();
    let face = brep.new_face(srf)?;
    let lp = brep.new_loop(LoopType::Outer, Some(face))?;
    for i in 0..4 {
        let j = (i + 1) % 4;
        let c3 = brep.add_curve3d(Curve::line(uv[i].to_3d(), uv[j].to_3d()));
        let e = brep.new_edge_with_domain(c3, [Some(verts[i]), Some(verts[j])], Interval::UNIT, Some(0.0))?;
        let c2 = brep.add_curve2d(Curve::line_2d(uv[i], uv[j]));
        let t = brep.new_trim_on_edge_in_loop(e, false, lp, c2)?;
        brep.trims[t.0].tolerance = [Some(0.0), Some(0.0)];
    }
    Ok(brep)
}

/// Axis-aligned box from the origin to `(dx, dy, dz)`.
///
/// Corner `i` has x set when bit 0 is set, y for bit 1 and z for bit 2.
/// Every face is a plane whose normal points out of the box.
#[instrument]
pub fn make_box(dx: f64, dy: f64, dz: f64) -> Result<Brep> {
    let mut brep = Brep::new();
    let corner = |i: usize| {
        Point3d::new(
            if i & 1 != 0 { dx } else { 0.0 },
            if i & 2 != 0 { dy } else { 0.0 },
            if i & 4 != 0 { dz } else { 0.0 },
        )
    };
    let verts: Vec<VertexIndex> = (0..8).map(|i| brep.new_vertex(corner(i), Some(0.0))).collect();

    // Counter-clockwise seen from outside; the first side is the plane x axis.
    let faces: [[usize; 4]; 6] = [
        [0, 2, 3, 1], // bottom
        [4, 5, 7, 6], // top
        [0, 1, 5, 4], // front
        [2, 6, 7, 3], // back
        [0, 4, 6, 2], // left
        [1, 3, 7, 5], // right
    ];

    let mut edges: HashMap<(usize, usize), EdgeIndex> = HashMap::new();
    for quad in &faces {
        let origin = corner(quad[0]);
        let x = corner(quad[1]) - origin;
        let y = corner(quad[3]) - origin;
        let (w, h) = (x.length(), y.length());
        let plane = Plane::from_axes(origin, x, y)
            .ok_or_else(|| BrepError::Geometry(format!("degenerate box side {quad:?}")))?;
        let srf = brep.add_surface(Surface::plane(plane, Interval::new(0.0, w), Interval::new(0.0, h)));
        let face = brep.new_face(srf)?;
        let lp = brep.new_loop(LoopType::Outer, Some(face))?;
        let uv = [
            Point2d::new(0.0, 0.0),
            Point2d::new(w, 0.0),
            Point2d::new(w, h),
            Point2d::new(0.0, h),
        ];
        for k in 0..4 {
            let (a, b) = (quad[k], quad[(k + 1) % 4]);
            let key = (a.min(b), a.max(b));
            let edge = match edges.get(&key) {
                Some(e) => *e,
                None => {
                    let c3 = brep.add_curve3d(Curve::line(corner(key.0), corner(key.1)));
                    let e = brep.new_edge(c3, [Some(verts[key.0]), Some(verts[key.1])])?;
                    brep.edges[e.0].tolerance = Some(0.0);
                    edges.insert(key, e);
                    e
                }
            };
            let c2 = brep.add_curve2d(Curve::line_2d(uv[k], uv[(k + 1) % 4]));
            let t = brep.new_trim_on_edge_in_loop(edge, a != key.0, lp, c2)?;
            brep.trims[t.0].tolerance = [Some(0.0), Some(0.0)];
        }
    }
    info!(faces = brep.face_count(), edges = brep.edge_count(), "box created");
    Ok(brep)
}

/// Open cylinder about the z axis: two circular boundary edges and one seam.
#[instrument]
pub fn make_cylinder_face(radius: f64, height: f64) -> Result<Brep> {
    let mut brep = Brep::new();
    let srf = brep.add_surface(Surface::cylinder(Plane::xy(), radius, Interval::new(0.0, height)));
    brep.new_face_from_surface(srf)?;
    Ok(brep)
}

/// Sphere about the origin: one seam edge and a singular trim at each pole.
#[instrument]
pub fn make_sphere(radius: f64) -> Result<Brep> {
    let mut brep = Brep::new();
    let srf = brep.add_surface(Surface::sphere(Plane::xy(), radius));
    brep.new_face_from_surface(srf)?;
    Ok(brep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::records::TrimType;

    #[test]
    fn test_box_counts() {
        let b = make_box(1.0, 1.0, 1.0).unwrap();
        assert_eq!(b.vertex_count(), 8);
        assert_eq!(b.edge_count(), 12);
        assert_eq!(b.trim_count(), 24);
        assert_eq!(b.face_count(), 6);
        assert!(b.trims.iter().all(|t| t.trim_type == TrimType::Mated));
    }

    #[test]
    fn test_box_face_normals_point_out() {
        let b = make_box(2.0, 2.0, 2.0).unwrap();
        let center = Point3d::new(1.0, 1.0, 1.0);
        for f in b.face_indices() {
            let s = b.face_surface(f).unwrap();
            let (du, dv) = (s.domain(0), s.domain(1));
            let p = s.point_at(du.mid(), dv.mid());
            let n = s.normal_at(du.mid(), dv.mid()).unwrap();
            assert!(n.dot(&(p - center)) > 0.0);
        }
    }

    #[test]
    fn test_sphere_has_singular_poles() {
        let b = make_sphere(1.0).unwrap();
        let singular = b.trims.iter().filter(|t| t.trim_type == TrimType::Singular).count();
        let seam = b.trims.iter().filter(|t| t.trim_type == TrimType::Seam).count();
        assert_eq!(singular, 2);
        assert_eq!(seam, 2);
        assert_eq!(b.vertex_count(), 2);
        assert_eq!(b.edge_count(), 1);
    }
}
