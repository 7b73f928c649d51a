//! Per-record structural checks: index links, tags and incidence symmetry.
//!
//! These run only on a Brep that passed the corruption scan, so every
//! stored index is known to land inside its array. Nothing here evaluates
//! geometry beyond fetching table entries and their domains.

use std::collections::HashSet;

use super::types::*;
use crate::geometry::Interval;
use crate::topology::brep::Brep;
use crate::topology::index::*;
use crate::topology::records::{LoopType, TrimType};

fn check_tolerance(entity: EntityRef, field: &str, tol: Option<f64>, errors: &mut Vec<ValidationError>) {
    let Some(t) = tol else { return };
    if !(t.is_finite() && t >= 0.0) {
        errors.push(ValidationError::error(
            entity,
            ErrorCode::BadTolerance,
            format!("{field} = {t} must be finite and >= 0"),
        ));
    }
}

fn check_domain(
    entity: EntityRef,
    own: &Interval,
    sub: &Interval,
    full: &Interval,
    errors: &mut Vec<ValidationError>,
) {
    if !own.is_increasing() {
        errors.push(ValidationError::error(
            entity,
            ErrorCode::DomainNotContained,
            format!("domain [{}, {}] must be increasing", own.t0, own.t1),
        ));
    }
    let slack = crate::SQRT_EPSILON * full.magnitude().max(1.0);
    if !sub.is_increasing() || !full.includes_interval(sub, slack) {
        errors.push(ValidationError::error(
            entity,
            ErrorCode::DomainNotContained,
            format!(
                "curve sub-domain [{}, {}] must lie inside the curve domain [{}, {}]",
                sub.t0, sub.t1, full.t0, full.t1
            ),
        ));
    }
}

/// Vertex tolerance and the vertex side of vertex/edge incidence.
pub fn check_vertex(brep: &Brep, v: VertexIndex, errors: &mut Vec<ValidationError>) {
    let Some(vertex) = brep.vertex(v) else { return };
    let ent = EntityRef::Vertex(v);
    check_tolerance(ent, "tolerance", vertex.tolerance, errors);
    if !vertex.point.is_finite() {
        errors.push(ValidationError::error(ent, ErrorCode::MissingGeometry, "point is not finite"));
    }

    let mut seen = HashSet::new();
    for &e in &vertex.edges {
        if !seen.insert(e) {
            continue;
        }
        let Some(edge) = brep.edge(e) else {
            errors.push(ValidationError::error(
                ent,
                ErrorCode::VertexEdgeMismatch,
                format!("edges[] lists deleted edge {e}"),
            ));
            continue;
        };
        let listed = vertex.edges.iter().filter(|x| **x == e).count();
        let ends = edge.vertices.iter().filter(|x| **x == Some(v)).count();
        if listed != ends {
            errors.push(
                ValidationError::error(
                    ent,
                    ErrorCode::VertexEdgeMismatch,
                    format!("edges[] lists edge {e} {listed} times but the edge has {ends} ends here"),
                )
                .with_parent(EntityRef::Edge(e)),
            );
        }
    }
}

/// Edge curve reference, domain, endpoints and trim list.
pub fn check_edge(brep: &Brep, e: EdgeIndex, errors: &mut Vec<ValidationError>) {
    let Some(edge) = brep.edge(e) else { return };
    let ent = EntityRef::Edge(e);
    check_tolerance(ent, "tolerance", edge.tolerance, errors);

    match edge.curve.and_then(|c| brep.curve3(c)) {
        None => errors.push(ValidationError::error(
            ent,
            ErrorCode::MissingGeometry,
            format!("curve = {:?} must name a 3d curve", edge.curve.map(|c| c.0)),
        )),
        Some(curve) if curve.dimension() != 3 => errors.push(ValidationError::error(
            ent,
            ErrorCode::WrongDimension,
            format!("3d curve has dimension {}", curve.dimension()),
        )),
        Some(curve) => check_domain(ent, &edge.proxy.domain, &edge.proxy.curve_domain, &curve.domain(), errors),
    }

    for (end, v) in edge.vertices.iter().enumerate() {
        let Some(v) = *v else {
            errors.push(ValidationError::error(
                ent,
                ErrorCode::VertexEdgeMismatch,
                format!("vertices[{end}] is unset"),
            ));
            continue;
        };
        match brep.vertex(v) {
            None => errors.push(ValidationError::error(
                ent,
                ErrorCode::VertexEdgeMismatch,
                format!("vertices[{end}] = {v} is deleted"),
            )),
            Some(vertex) if !vertex.edges.contains(&e) => errors.push(
                ValidationError::error(
                    ent,
                    ErrorCode::VertexEdgeMismatch,
                    format!("vertices[{end}] = {v} does not list this edge"),
                )
                .with_parent(EntityRef::Vertex(v)),
            ),
            Some(_) => {}
        }
    }

    let mut seen = HashSet::new();
    for &t in &edge.trims {
        if !seen.insert(t) {
            errors.push(ValidationError::error(
                ent,
                ErrorCode::EdgeTrimMismatch,
                format!("trims[] lists trim {t} twice"),
            ));
            continue;
        }
        match brep.trim(t) {
            None => errors.push(ValidationError::error(
                ent,
                ErrorCode::EdgeTrimMismatch,
                format!("trims[] lists deleted trim {t}"),
            )),
            Some(trim) if trim.edge != Some(e) => errors.push(ValidationError::error(
                ent,
                ErrorCode::EdgeTrimMismatch,
                format!("trims[] lists trim {t} whose edge is {:?}", trim.edge.map(|x| x.0)),
            )),
            Some(_) => {}
        }
    }
}

/// Trim links, geometry reference and type tag against its edge siblings.
pub fn check_trim(brep: &Brep, t: TrimIndex, errors: &mut Vec<ValidationError>) {
    let Some(trim) = brep.trim(t) else { return };
    let ent = EntityRef::Trim(t);
    check_tolerance(ent, "tolerance[0]", trim.tolerance[0], errors);
    check_tolerance(ent, "tolerance[1]", trim.tolerance[1], errors);

    let lp = match trim.loop_index {
        None => {
            errors.push(ValidationError::error(ent, ErrorCode::LoopTrimMismatch, "loop is unset"));
            None
        }
        Some(l) => match brep.loop_at(l) {
            None => {
                errors.push(ValidationError::error(
                    ent,
                    ErrorCode::LoopTrimMismatch,
                    format!("loop = {l} is deleted"),
                ));
                None
            }
            Some(lp) => {
                if !lp.trims.contains(&t) {
                    errors.push(
                        ValidationError::error(
                            ent,
                            ErrorCode::LoopTrimMismatch,
                            format!("loop {l} does not list this trim"),
                        )
                        .with_parent(EntityRef::Loop(l)),
                    );
                }
                Some(lp)
            }
        },
    };

    match trim.trim_type {
        TrimType::Unknown => {
            errors.push(ValidationError::error(ent, ErrorCode::TrimType, "trim_type is unknown"));
        }
        TrimType::Slit => {
            errors.push(ValidationError::error(ent, ErrorCode::TrimType, "trim_type slit is never valid on a trim"));
        }
        _ => {}
    }

    if trim.trim_type == TrimType::PointOnSurface {
        if trim.curve.is_some() || trim.edge.is_some() {
            errors.push(ValidationError::error(
                ent,
                ErrorCode::TrimType,
                "point-on-surface trim must have no curve and no edge",
            ));
        }
        if lp.is_some_and(|lp| lp.loop_type != LoopType::PointOnSurface) {
            errors.push(ValidationError::error(
                ent,
                ErrorCode::TrimType,
                "point-on-surface trim must sit in a point-on-surface loop",
            ));
        }
        if trim.vertices[0].is_none() || trim.vertices[0] != trim.vertices[1] {
            errors.push(ValidationError::error(
                ent,
                ErrorCode::TrimVertexMismatch,
                "point-on-surface trim must have one vertex at both ends",
            ));
        }
        return;
    }

    match trim.curve.and_then(|c| brep.curve2(c)) {
        None => errors.push(ValidationError::error(
            ent,
            ErrorCode::MissingGeometry,
            format!("curve = {:?} must name a 2d curve", trim.curve.map(|c| c.0)),
        )),
        Some(curve) if curve.dimension() != 2 => errors.push(ValidationError::error(
            ent,
            ErrorCode::WrongDimension,
            format!("2d curve has dimension {}", curve.dimension()),
        )),
        Some(curve) => check_domain(ent, &trim.proxy.domain, &trim.proxy.curve_domain, &curve.domain(), errors),
    }

    for (end, v) in trim.vertices.iter().enumerate() {
        if let Some(v) = *v {
            if brep.vertex(v).is_none() {
                errors.push(ValidationError::error(
                    ent,
                    ErrorCode::TrimVertexMismatch,
                    format!("vertices[{end}] = {v} is deleted"),
                ));
            }
        }
    }

    let in_crvonsrf_loop = lp.is_some_and(|lp| lp.loop_type == LoopType::CurveOnSurface);
    if (trim.trim_type == TrimType::CurveOnSurface) != in_crvonsrf_loop {
        errors.push(ValidationError::error(
            ent,
            ErrorCode::TrimType,
            "curve-on-surface trims and curve-on-surface loops go together",
        ));
    }

    let Some(e) = trim.edge else {
        if trim.trim_type != TrimType::Singular
            || trim.vertices[0].is_none()
            || trim.vertices[0] != trim.vertices[1]
        {
            errors.push(ValidationError::error(
                ent,
                ErrorCode::SingularTrim,
                "trim has no edge, so it must be singular with matching endpoint vertices",
            ));
        } else if !trim.iso.is_boundary() {
            errors.push(ValidationError::error(
                ent,
                ErrorCode::SingularTrim,
                format!("singular trim iso = {:?} must name a surface side", trim.iso),
            ));
        }
        return;
    };

    if trim.trim_type == TrimType::Singular {
        errors.push(ValidationError::error(ent, ErrorCode::SingularTrim, "singular trim must not have an edge"));
    }
    let Some(edge) = brep.edge(e) else {
        errors.push(ValidationError::error(
            ent,
            ErrorCode::EdgeTrimMismatch,
            format!("edge = {e} is deleted"),
        ));
        return;
    };
    if !edge.trims.contains(&t) {
        errors.push(
            ValidationError::error(ent, ErrorCode::EdgeTrimMismatch, format!("edge {e} does not list this trim"))
                .with_parent(EntityRef::Edge(e)),
        );
    }
    for end in 0..2 {
        let expected = edge.vertices[trim.edge_end(end)];
        if trim.vertices[end] != expected {
            errors.push(
                ValidationError::error(
                    ent,
                    ErrorCode::TrimVertexMismatch,
                    format!(
                        "vertices[{end}] = {:?} but the edge end it lands on has {:?}",
                        trim.vertices[end].map(|v| v.0),
                        expected.map(|v| v.0)
                    ),
                )
                .with_parent(EntityRef::Edge(e)),
            );
        }
    }

    let others: Vec<TrimIndex> = edge
        .trims
        .iter()
        .copied()
        .filter(|o| *o != t && brep.trim(*o).is_some())
        .collect();
    let same_loop: Vec<TrimIndex> = others
        .iter()
        .copied()
        .filter(|o| brep.trims[o.0].loop_index == trim.loop_index)
        .collect();
    let type_error = |msg: String| ValidationError::error(ent, ErrorCode::TrimType, msg).with_parent(EntityRef::Edge(e));
    match trim.trim_type {
        TrimType::Boundary if !others.is_empty() => {
            errors.push(type_error(format!("boundary trim shares its edge with {} other trims", others.len())));
        }
        TrimType::Mated if others.is_empty() => {
            errors.push(type_error("mated trim is the only trim on its edge".into()));
        }
        TrimType::Mated if !same_loop.is_empty() => {
            errors.push(type_error("mated trim has a sibling in its own loop".into()));
        }
        TrimType::Seam => {
            if same_loop.len() != 1 {
                errors.push(type_error(format!(
                    "seam trim must have exactly one sibling in its loop, found {}",
                    same_loop.len()
                )));
            } else if brep.trims[same_loop[0].0].trim_type != TrimType::Seam {
                errors.push(type_error(format!("seam partner {} is not tagged seam", same_loop[0])));
            }
        }
        _ => {}
    }
    let seams_here = same_loop
        .iter()
        .filter(|o| brep.trims[o.0].trim_type == TrimType::Seam)
        .count()
        + usize::from(trim.trim_type == TrimType::Seam);
    if seams_here > 2 {
        errors.push(
            ValidationError::error(
                ent,
                ErrorCode::SeamPairing,
                format!("edge {e} carries {seams_here} seam trims in one loop"),
            )
            .with_parent(EntityRef::Edge(e)),
        );
    }
}

/// Loop membership, type rules and vertex continuity around the cycle.
pub fn check_loop(brep: &Brep, l: LoopIndex, errors: &mut Vec<ValidationError>) {
    let Some(lp) = brep.loop_at(l) else { return };
    let ent = EntityRef::Loop(l);

    match lp.face {
        None => errors.push(ValidationError::error(ent, ErrorCode::FaceLoopMismatch, "face is unset")),
        Some(f) => match brep.face(f) {
            None => errors.push(ValidationError::error(
                ent,
                ErrorCode::FaceLoopMismatch,
                format!("face = {f} is deleted"),
            )),
            Some(face) if !face.loops.contains(&l) => errors.push(
                ValidationError::error(ent, ErrorCode::FaceLoopMismatch, format!("face {f} does not list this loop"))
                    .with_parent(EntityRef::Face(f)),
            ),
            Some(_) => {}
        },
    }

    if lp.trims.is_empty() {
        errors.push(ValidationError::error(ent, ErrorCode::LoopTrimMismatch, "loop has no trims"));
        return;
    }
    let mut seen = HashSet::new();
    for &t in &lp.trims {
        if !seen.insert(t) {
            errors.push(ValidationError::error(
                ent,
                ErrorCode::LoopTrimMismatch,
                format!("trims[] lists trim {t} twice"),
            ));
        } else if brep.trim(t).is_none_or(|tr| tr.loop_index != Some(l)) {
            errors.push(ValidationError::error(
                ent,
                ErrorCode::LoopTrimMismatch,
                format!("trims[] lists trim {t} that does not point back to this loop"),
            ));
        }
    }
    let live: Vec<TrimIndex> = lp.trims.iter().copied().filter(|t| brep.trim(*t).is_some()).collect();

    match lp.loop_type {
        LoopType::Unknown => {
            errors.push(ValidationError::error(ent, ErrorCode::LoopType, "loop_type is unknown"));
        }
        LoopType::PointOnSurface => {
            if live.len() != 1 || brep.trims[live[0].0].trim_type != TrimType::PointOnSurface {
                errors.push(ValidationError::error(
                    ent,
                    ErrorCode::LoopType,
                    "point-on-surface loop must hold exactly one point-on-surface trim",
                ));
            }
        }
        LoopType::Slit => {
            let all_seam_interior = live.iter().all(|t| {
                let tr = &brep.trims[t.0];
                tr.trim_type == TrimType::Seam && !tr.iso.is_boundary()
            });
            if live.len() < 2 || live.len() % 2 != 0 || !all_seam_interior {
                errors.push(ValidationError::error(
                    ent,
                    ErrorCode::SlitLoop,
                    format!(
                        "slit loop needs an even count >= 2 of interior seam trims, has {} trims",
                        live.len()
                    ),
                ));
            }
        }
        _ => {}
    }

    if matches!(lp.loop_type, LoopType::CurveOnSurface | LoopType::PointOnSurface) {
        return;
    }
    for (k, &t) in live.iter().enumerate() {
        let next = live[(k + 1) % live.len()];
        let end = brep.trims[t.0].vertices[1];
        let start = brep.trims[next.0].vertices[0];
        if end.is_none() || end != start {
            errors.push(
                ValidationError::error(
                    EntityRef::Trim(t),
                    ErrorCode::LoopVertexGap,
                    format!(
                        "vertices[1] = {:?} but next trim {next} starts at {:?}",
                        end.map(|v| v.0),
                        start.map(|v| v.0)
                    ),
                )
                .with_parent(ent),
            );
        }
    }
}

/// Face surface reference and loop ordering.
pub fn check_face(brep: &Brep, f: FaceIndex, errors: &mut Vec<ValidationError>) {
    let Some(face) = brep.face(f) else { return };
    let ent = EntityRef::Face(f);

    match face.surface.and_then(|s| brep.surface(s)) {
        None => errors.push(ValidationError::error(
            ent,
            ErrorCode::MissingGeometry,
            format!("surface = {:?} must name a surface", face.surface.map(|s| s.0)),
        )),
        Some(s) if s.dimension() != 3 => errors.push(ValidationError::error(
            ent,
            ErrorCode::WrongDimension,
            format!("surface has dimension {}", s.dimension()),
        )),
        Some(_) => {}
    }

    if face.loops.is_empty() {
        errors.push(ValidationError::error(ent, ErrorCode::EmptyFace, "face has no loops"));
        return;
    }
    for (k, &l) in face.loops.iter().enumerate() {
        let Some(lp) = brep.loop_at(l) else {
            errors.push(ValidationError::error(
                ent,
                ErrorCode::FaceLoopMismatch,
                format!("loops[{k}] = {l} is deleted"),
            ));
            continue;
        };
        if lp.face != Some(f) {
            errors.push(ValidationError::error(
                ent,
                ErrorCode::FaceLoopMismatch,
                format!("loops[{k}] = {l} points back to face {:?}", lp.face.map(|x| x.0)),
            ));
        }
        let ok = match (k, lp.loop_type) {
            (0, ty) => ty == LoopType::Outer,
            (_, ty) => matches!(
                ty,
                LoopType::Inner | LoopType::Slit | LoopType::CurveOnSurface | LoopType::PointOnSurface
            ),
        };
        if !ok {
            let expected = if k == 0 { "outer" } else { "inner, slit, curve-on-surface or point-on-surface" };
            errors.push(
                ValidationError::error(
                    ent,
                    ErrorCode::FaceLoopOrder,
                    format!("loops[{k}] has type {:?}, expected {expected}", lp.loop_type),
                )
                .with_parent(EntityRef::Loop(l)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::primitives::{make_box, unit_square_face};

    fn errors_for(brep: &Brep, f: impl Fn(&Brep, &mut Vec<ValidationError>)) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        f(brep, &mut errors);
        errors
    }

    #[test]
    fn test_box_records_have_no_errors() {
        let b = make_box(1.0, 2.0, 3.0).unwrap();
        let errors = errors_for(&b, |b, errs| {
            b.vertex_indices().for_each(|v| check_vertex(b, v, errs));
            b.edge_indices().for_each(|e| check_edge(b, e, errs));
            b.trim_indices().for_each(|t| check_trim(b, t, errs));
            b.loop_indices().for_each(|l| check_loop(b, l, errs));
            b.face_indices().for_each(|f| check_face(b, f, errs));
        });
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let mut b = unit_square_face().unwrap();
        b.vertices[2].tolerance = Some(-1.0);
        let errors = errors_for(&b, |b, errs| check_vertex(b, VertexIndex(2), errs));
        assert_eq!(errors[0].code, ErrorCode::BadTolerance);
    }

    #[test]
    fn test_asymmetric_incidence_detected() {
        let mut b = unit_square_face().unwrap();
        b.vertices[0].edges.clear();
        let errors = errors_for(&b, |b, errs| check_edge(b, EdgeIndex(0), errs));
        assert!(errors.iter().any(|e| e.code == ErrorCode::VertexEdgeMismatch));
    }

    #[test]
    fn test_second_outer_loop_rejected() {
        let mut b = unit_square_face().unwrap();
        let extra = b.new_loop(LoopType::Outer, Some(FaceIndex(0))).unwrap();
        let errors = errors_for(&b, |b, errs| check_face(b, FaceIndex(0), errs));
        assert!(errors.iter().any(|e| e.code == ErrorCode::FaceLoopOrder && e.parent == Some(EntityRef::Loop(extra))));
    }

    #[test]
    fn test_boundary_trim_with_sibling_is_mistagged() {
        let mut b = make_box(1.0, 1.0, 1.0).unwrap();
        b.trims[0].trim_type = TrimType::Boundary;
        let errors = errors_for(&b, |b, errs| check_trim(b, TrimIndex(0), errs));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::TrimType);
    }

    #[test]
    fn test_slit_tag_on_trim_is_invalid() {
        let mut b = unit_square_face().unwrap();
        b.trims[3].trim_type = TrimType::Slit;
        let errors = errors_for(&b, |b, errs| check_trim(b, TrimIndex(3), errs));
        assert!(errors.iter().any(|e| e.code == ErrorCode::TrimType));
    }
}
