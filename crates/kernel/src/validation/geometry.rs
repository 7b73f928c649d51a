//! Geometric law checks.
//!
//! Loop closure in parameter space, trim images against their edge curves,
//! vertex positions, cached parameter-space boxes and iso flags. Every
//! distance threshold comes from [`ToleranceConfig`](super::config::ToleranceConfig)
//! and is widened by any larger tolerance stored on the records involved.

use super::config::ValidationConfig;
use super::types::*;
use crate::geometry::{BoundingBox, IsoType, Point3d, Vec3};
use crate::topology::brep::Brep;
use crate::topology::index::*;
use crate::topology::records::{LoopType, TrimType};

fn max_tol(tols: impl IntoIterator<Item = Option<f64>>) -> f64 {
    tols.into_iter().flatten().filter(|t| t.is_finite()).fold(0.0, f64::max)
}

/// Run every geometric check on the live records of `brep`.
pub fn check_geometry(
    brep: &Brep,
    config: &ValidationConfig,
    errors: &mut Vec<ValidationError>,
    warnings: &mut Vec<ValidationError>,
) {
    for e in brep.edge_indices() {
        check_edge_geometry(brep, e, config, errors);
    }
    for t in brep.trim_indices() {
        check_trim_geometry(brep, t, config, errors);
    }
    for l in brep.loop_indices() {
        check_loop_geometry(brep, l, config, errors);
    }
    for f in brep.face_indices() {
        check_face_geometry(brep, f, config, errors);
    }
    check_overall_box(brep, config, warnings);
}

/// Closed-curve/closed-topology agreement and vertex positions at both ends.
pub fn check_edge_geometry(brep: &Brep, e: EdgeIndex, config: &ValidationConfig, errors: &mut Vec<ValidationError>) {
    let Some(edge) = brep.edge(e) else { return };
    let ent = EntityRef::Edge(e);
    let (Some(p0), Some(p1)) = (brep.edge_end_point(e, 0), brep.edge_end_point(e, 1)) else {
        return;
    };
    let scale = p0.max_abs_coordinate().max(p1.max_abs_coordinate());
    let tol = config.tolerance.distance(scale).max(max_tol([edge.tolerance]));

    let gap = p0.distance_to(&p1);
    let geometric = gap <= tol;
    let topological = edge.is_closed_topologically();
    if geometric != topological {
        let msg = if geometric {
            "curve is closed but the two ends have different vertices"
        } else {
            "both ends share one vertex but the curve is open"
        };
        errors.push(ValidationError::error(ent, ErrorCode::EdgeClosure, msg).with_values(gap, tol));
    }

    for (end, p) in [p0, p1].into_iter().enumerate() {
        let Some(v) = edge.vertices[end] else { continue };
        let Some(vertex) = brep.vertex(v) else { continue };
        let d = vertex.point.distance_to(&p);
        let vtol = tol.max(max_tol([vertex.tolerance]));
        if d > vtol {
            errors.push(
                ValidationError::error(
                    EntityRef::Vertex(v),
                    ErrorCode::VertexDeviation,
                    format!("point is off end {end} of edge {e}"),
                )
                .with_parent(ent)
                .with_values(d, vtol),
            );
        }
    }
}

/// Iso flag, cached box, singular side and agreement with the edge curve.
pub fn check_trim_geometry(brep: &Brep, t: TrimIndex, config: &ValidationConfig, errors: &mut Vec<ValidationError>) {
    let Some(trim) = brep.trim(t) else { return };
    if trim.trim_type == TrimType::PointOnSurface {
        return;
    }
    let ent = EntityRef::Trim(t);
    let Some(curve) = brep.trim_curve(t) else { return };
    let surface = brep.face_of_trim(t).and_then(|f| brep.face_surface(f));

    // Cached box must hold the curve's start, middle and end.
    let d = trim.domain();
    let samples: Vec<Point3d> = [d.t0, d.mid(), d.t1]
        .into_iter()
        .filter_map(|s| brep.trim_point_at(t, s))
        .map(|p| p.to_3d())
        .collect();
    let scale = trim.bbox.max_abs_coordinate().max(curve.bounding_box().max_abs_coordinate());
    let btol = config.tolerance.distance(scale);
    if !trim.bbox.is_valid() || samples.iter().any(|p| !trim.bbox.contains_point(p, btol)) {
        errors.push(ValidationError::error(
            ent,
            ErrorCode::BoundingBox,
            "bbox must contain the start, middle and end of the 2d curve",
        ));
    }

    if let Some(srf) = surface {
        if trim.iso != IsoType::NotIso {
            let actual = srf.is_isoparametric(curve, trim.proxy.curve_domain);
            let compatible = actual == trim.iso
                || (trim.iso == IsoType::X && matches!(actual, IsoType::West | IsoType::East))
                || (trim.iso == IsoType::Y && matches!(actual, IsoType::South | IsoType::North));
            if !compatible {
                errors.push(ValidationError::error(
                    ent,
                    ErrorCode::IsoFlag,
                    format!("iso = {:?} but the curve classifies as {actual:?}", trim.iso),
                ));
            }
        }
        if trim.trim_type == TrimType::Singular {
            if let Some(side) = trim.iso.side() {
                if !srf.is_singular(side) {
                    errors.push(ValidationError::error(
                        ent,
                        ErrorCode::SingularTrim,
                        format!("singular trim lies on side {side}, which does not collapse"),
                    ));
                }
            }
        }
    }

    let (Some(e), Some(srf)) = (trim.edge, surface) else { return };
    let Some(edge) = brep.edge(e) else { return };
    if brep.edge_curve(e).is_none() {
        return;
    }

    for end in 0..2 {
        let (Some(image), Some(on_edge)) = (brep.trim_end_point_3d(t, end), brep.edge_end_point(e, trim.edge_end(end)))
        else {
            continue;
        };
        let scale = image.max_abs_coordinate().max(on_edge.max_abs_coordinate());
        let tol = config
            .tolerance
            .distance(scale)
            .max(config.tolerance.edge_floor)
            .max(max_tol([edge.tolerance, trim.tolerance[0], trim.tolerance[1]]));
        let gap = image.distance_to(&on_edge);
        if gap > tol {
            errors.push(
                ValidationError::error(
                    ent,
                    ErrorCode::TrimEdgeDeviation,
                    format!("end {end} maps to a point off edge end {}", trim.edge_end(end)),
                )
                .with_parent(EntityRef::Edge(e))
                .with_values(gap, tol),
            );
        }
    }

    // Tangent directions at interior samples; endpoints may sit on poles.
    let n = config.sampling_density.max(2) as usize;
    let ed = edge.domain();
    for k in 1..n {
        let s = k as f64 / n as f64;
        let tp = d.param_at(s);
        let (Some(uv), Some(duv)) = (brep.trim_point_at(t, tp), brep.trim_derivative(t, tp)) else {
            continue;
        };
        let (su, sv) = srf.derivatives(uv.x, uv.y);
        let image: Vec3 = su * duv.x + sv * duv.y;
        let ep = ed.param_at(if trim.reversed { 1.0 - s } else { s });
        let Some(mut along) = brep.edge_derivative(e, ep) else { continue };
        if trim.reversed {
            along = -along;
        }
        if image.is_tiny(config.tolerance.zero) || along.is_tiny(config.tolerance.zero) {
            continue;
        }
        let angle = image.angle_to(&along);
        if angle > config.tolerance.reversal_angle {
            errors.push(
                ValidationError::error(
                    ent,
                    ErrorCode::TrimEdgeDirection,
                    format!("image runs against the edge near trim parameter {tp}; reversed = {}", trim.reversed),
                )
                .with_parent(EntityRef::Edge(e))
                .with_values(angle, config.tolerance.reversal_angle),
            );
            break;
        }
    }
}

/// Parameter-space closure, box containment and orientation of a loop.
pub fn check_loop_geometry(brep: &Brep, l: LoopIndex, config: &ValidationConfig, errors: &mut Vec<ValidationError>) {
    let Some(lp) = brep.loop_at(l) else { return };
    let ent = EntityRef::Loop(l);
    if matches!(lp.loop_type, LoopType::CurveOnSurface | LoopType::PointOnSurface) {
        return;
    }
    let live: Vec<TrimIndex> = lp.trims.iter().copied().filter(|t| brep.trim(*t).is_some()).collect();
    if live.is_empty() {
        return;
    }

    let scale = lp.bbox.max_abs_coordinate();
    let btol = config.tolerance.distance(scale);
    for &t in &live {
        let tb = &brep.trims[t.0].bbox;
        if !lp.bbox.contains_box(tb, btol) {
            errors.push(
                ValidationError::error(ent, ErrorCode::BoundingBox, format!("bbox must contain the box of trim {t}"))
                    .with_parent(EntityRef::Trim(t)),
            );
        }
    }

    for (k, &t) in live.iter().enumerate() {
        let next = live[(k + 1) % live.len()];
        let (Some(a), Some(b)) = (brep.trim_end_point(t, 1), brep.trim_end_point(next, 0)) else {
            continue;
        };
        let (ta, tb) = (&brep.trims[t.0], &brep.trims[next.0]);
        let tol = config
            .tolerance
            .distance(a.max_abs_coordinate().max(b.max_abs_coordinate()))
            .max(max_tol([ta.tolerance[0], ta.tolerance[1], tb.tolerance[0], tb.tolerance[1]]));
        let gap = a.distance_to(&b);
        if gap > tol {
            errors.push(
                ValidationError::error(
                    ent,
                    ErrorCode::LoopNotClosed,
                    format!("end of trim {t} does not meet the start of trim {next}"),
                )
                .with_values(gap, tol),
            );
        }
    }

    if config.check_loop_direction {
        let expected = match lp.loop_type {
            LoopType::Outer => 1,
            LoopType::Inner => -1,
            _ => 0,
        };
        let dir = brep.loop_direction(l);
        if expected != 0 && dir != 0 && dir != expected {
            errors.push(ValidationError::error(
                ent,
                ErrorCode::LoopDirection,
                format!("{:?} loop runs {}", lp.loop_type, if dir > 0 { "counter-clockwise" } else { "clockwise" }),
            ));
        }
    }
}

/// Boundary trims on opposite sides of a closed direction whose 3D images
/// coincide belong on one seam edge.
pub fn check_face_geometry(brep: &Brep, f: FaceIndex, config: &ValidationConfig, errors: &mut Vec<ValidationError>) {
    let Some(face) = brep.face(f) else { return };
    let Some(srf) = brep.face_surface(f) else { return };
    for (dir, (lo, hi)) in [(0, (IsoType::West, IsoType::East)), (1, (IsoType::South, IsoType::North))] {
        if !srf.is_closed(dir) {
            continue;
        }
        for l in face.loops.iter().filter_map(|l| brep.loop_at(*l)) {
            let side = |iso: IsoType| -> Vec<TrimIndex> {
                l.trims
                    .iter()
                    .copied()
                    .filter(|t| {
                        brep.trim(*t)
                            .is_some_and(|tr| tr.trim_type == TrimType::Boundary && tr.iso == iso)
                    })
                    .collect()
            };
            for a in side(lo) {
                for b in side(hi) {
                    let ends = (
                        brep.trim_end_point_3d(a, 0),
                        brep.trim_end_point_3d(a, 1),
                        brep.trim_end_point_3d(b, 0),
                        brep.trim_end_point_3d(b, 1),
                    );
                    let (Some(a0), Some(a1), Some(b0), Some(b1)) = ends else { continue };
                    let scale = a0.max_abs_coordinate().max(a1.max_abs_coordinate());
                    let tol = config.tolerance.distance(scale);
                    if a0.distance_to(&b1) <= tol && a1.distance_to(&b0) <= tol {
                        errors.push(
                            ValidationError::error(
                                EntityRef::Trim(a),
                                ErrorCode::SeamShouldBeJoined,
                                format!("boundary trims {a} and {b} lie on the closed seam and should share one edge"),
                            )
                            .with_parent(EntityRef::Face(f)),
                        );
                    }
                }
            }
        }
    }
}

/// Warn when the cached overall box is far larger than what the records
/// need. The check is deliberately loose.
pub fn check_overall_box(brep: &Brep, config: &ValidationConfig, warnings: &mut Vec<ValidationError>) {
    let Some(cached) = brep.cached_bounding_box() else { return };
    let mut fresh = BoundingBox::empty();
    for f in brep.face_indices() {
        fresh = fresh.union(&brep.face_bounding_box(f));
    }
    for e in brep.edge_indices() {
        fresh = fresh.union(&brep.edge_bounding_box(e));
    }
    for v in brep.vertex_indices() {
        fresh.expand_to_include(&brep.vertices[v.0].point);
    }
    if !fresh.is_valid() || !cached.is_valid() {
        return;
    }
    let limit = config.tolerance.bbox_leniency * fresh.diagonal() + config.tolerance.zero;
    if cached.diagonal() > limit {
        warnings.push(
            ValidationError::warning(
                EntityRef::Brep,
                ErrorCode::LooseBoundingBox,
                "cached bounding box is much larger than the geometry",
            )
            .with_values(cached.diagonal(), limit),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2d;
    use crate::topology::primitives::{make_box, make_cylinder_face, make_sphere, unit_square_face};

    fn all_errors(brep: &Brep) -> (Vec<ValidationError>, Vec<ValidationError>) {
        let (mut errors, mut warnings) = (Vec::new(), Vec::new());
        check_geometry(brep, &ValidationConfig::full(), &mut errors, &mut warnings);
        (errors, warnings)
    }

    #[test]
    fn test_primitives_are_geometrically_sound() {
        for b in [
            unit_square_face().unwrap(),
            make_box(2.0, 1.0, 0.5).unwrap(),
            make_cylinder_face(1.0, 3.0).unwrap(),
            make_sphere(2.0).unwrap(),
        ] {
            let (errors, _) = all_errors(&b);
            assert!(errors.is_empty(), "{errors:?}");
        }
    }

    #[test]
    fn test_moved_vertex_is_reported() {
        let mut b = unit_square_face().unwrap();
        b.vertices[1].point = Point3d::new(1.0, 0.5, 0.0);
        let (errors, _) = all_errors(&b);
        assert!(errors.iter().any(|e| e.code == ErrorCode::VertexDeviation));
    }

    #[test]
    fn test_open_loop_is_reported() {
        let mut b = unit_square_face().unwrap();
        let c = b.trims[2].curve.unwrap();
        b.curves2[c.0] = Some(crate::geometry::Curve::line_2d(Point2d::new(1.0, 1.0), Point2d::new(0.2, 1.0)));
        let mut errors = Vec::new();
        check_loop_geometry(&b, LoopIndex(0), &ValidationConfig::full(), &mut errors);
        assert!(errors.iter().any(|e| e.code == ErrorCode::LoopNotClosed));
    }

    #[test]
    fn test_loose_cached_box_only_warns() {
        let b = unit_square_face().unwrap();
        let huge = BoundingBox::new(Point3d::new(-10.0, -10.0, -10.0), Point3d::new(10.0, 10.0, 10.0));
        assert!(b.bbox.set(huge).is_ok());
        let (errors, warnings) = all_errors(&b);
        assert!(errors.is_empty());
        assert_eq!(warnings[0].code, ErrorCode::LooseBoundingBox);
    }
}
