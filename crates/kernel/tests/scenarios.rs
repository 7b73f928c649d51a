//! End-to-end checks of the kernel's structural guarantees.

use brep_kernel::geometry::{Curve, Point2d, Surface};
use brep_kernel::topology::primitives::{make_box, make_cylinder_face, make_sphere, unit_square_face};
use brep_kernel::validation::{BrepValidator, ErrorCode};
use brep_kernel::*;

fn fixtures() -> Vec<Brep> {
    vec![
        unit_square_face().unwrap(),
        make_box(1.0, 2.0, 3.0).unwrap(),
        make_cylinder_face(0.5, 2.0).unwrap(),
        make_sphere(1.0).unwrap(),
    ]
}

fn assert_incidence_symmetric(b: &Brep) {
    for v in b.vertex_indices() {
        for e in &b.vertices[v.0].edges {
            assert!(b.edges[e.0].vertices.contains(&Some(v)), "vertex {v} lists edge {e}");
        }
    }
    for e in b.edge_indices() {
        for v in b.edges[e.0].vertices.iter().flatten() {
            assert!(b.vertices[v.0].edges.contains(&e), "edge {e} ends at vertex {v}");
        }
    }
}

#[test]
fn incidence_is_symmetric_through_edits() {
    for b in fixtures() {
        assert_incidence_symmetric(&b);
    }
    let mut b = make_box(1.0, 1.0, 1.0).unwrap();
    b.delete_edge(EdgeIndex(3), true).unwrap();
    assert_incidence_symmetric(&b);
    b.compact();
    assert_incidence_symmetric(&b);
}

#[test]
fn loops_close_in_parameter_space() {
    for b in fixtures() {
        for l in b.loop_indices() {
            let trims = &b.loops[l.0].trims;
            for (i, &t) in trims.iter().enumerate() {
                let next = trims[(i + 1) % trims.len()];
                let end = b.trim_end_point(t, 1).unwrap();
                let start = b.trim_end_point(next, 0).unwrap();
                let scale = end.max_abs_coordinate().max(start.max_abs_coordinate());
                let tol = (SQRT_EPSILON * scale).max(ZERO_TOLERANCE);
                assert!(end.distance_to(&start) <= tol, "gap after trim {t} in loop {l}");
            }
        }
    }
}

#[test]
fn compaction_is_idempotent() {
    let mut b = make_box(2.0, 2.0, 2.0).unwrap();
    b.delete_face(FaceIndex(4), true).unwrap();
    b.delete_trim(TrimIndex(0), false).unwrap();
    b.compact();
    let first = serde_json::to_vec(&b).unwrap();
    b.compact();
    assert_eq!(serde_json::to_vec(&b).unwrap(), first);
}

#[test]
fn three_seams_in_one_loop_are_invalid() {
    let mut b = make_cylinder_face(1.0, 2.0).unwrap();
    let seam = b.edge_indices().find(|e| b.edges[e.0].trims.len() == 2).unwrap();
    let lp = b.loops[0].index.unwrap();
    let u = std::f64::consts::TAU;
    let c2 = b.add_curve2d(Curve::line_2d(Point2d::new(u, 0.0), Point2d::new(u, 2.0)));
    let t = b.new_trim_on_edge_in_loop(seam, false, lp, c2).unwrap();
    b.trims[t.0].trim_type = TrimType::Seam;

    let mut log = TextLog::new();
    assert!(!b.is_valid(Some(&mut log)));
    let report = BrepValidator::default().validate(&b);
    assert!(!report.no_errors_of(ErrorCode::SeamPairing), "{log}");
}

#[test]
fn append_offsets_by_prior_counts() {
    let mut a = make_box(1.0, 1.0, 1.0).unwrap();
    let b = make_cylinder_face(1.0, 1.0).unwrap();
    let before = (a.vertices.len(), a.edges.len(), a.trims.len(), a.loops.len(), a.faces.len());
    a.append(&b).unwrap();

    for (i, t) in b.trims.iter().enumerate() {
        let copy = &a.trims[before.2 + i];
        assert_eq!(copy.edge.map(|e| e.0), t.edge.map(|e| e.0 + before.1));
        assert_eq!(copy.loop_index.map(|l| l.0), t.loop_index.map(|l| l.0 + before.3));
        let ends: Vec<_> = t.vertices.iter().map(|v| v.map(|v| v.0 + before.0)).collect();
        assert_eq!(copy.vertices.iter().map(|v| v.map(|v| v.0)).collect::<Vec<_>>(), ends);
    }
    assert_eq!(a.faces[before.4].loops, vec![LoopIndex(before.3)]);
    assert_eq!(a.vertex_count(), 8 + b.vertex_count());
    assert_eq!(a.edge_count(), 12 + b.edge_count());
    assert_eq!(a.trim_count(), 24 + b.trim_count());
    assert_eq!(a.loop_count(), 6 + b.loop_count());
    assert_eq!(a.face_count(), 6 + b.face_count());
    assert!(a.is_valid(None));
}

#[test]
fn contiguous_merge_refuses_degree_three_vertex() {
    let mut b = make_box(1.0, 1.0, 1.0).unwrap();
    let v = VertexIndex(7);
    let edges = b.vertices[v.0].edges.clone();
    assert_eq!(edges.len(), 3);
    let snapshot = serde_json::to_string(&b).unwrap();
    assert!(b.combine_contiguous_edges(edges[0], edges[1], 1.0).is_err());
    assert_eq!(serde_json::to_string(&b).unwrap(), snapshot);
}

#[test]
fn minimal_square_face_is_valid() {
    let b = unit_square_face().unwrap();
    assert_eq!(b.vertex_count(), 4);
    assert_eq!(b.edge_count(), 4);
    assert!(b.edge_indices().all(|e| b.edges[e.0].trims.len() == 1));
    assert!(b.trim_indices().all(|t| b.trims[t.0].trim_type == TrimType::Boundary));
    assert!(b.is_valid(None));
}

#[test]
fn deleting_one_mated_trim_leaves_a_boundary() {
    let mut b = make_box(1.0, 1.0, 1.0).unwrap();
    let t = TrimIndex(6);
    let e = b.trims[t.0].edge.unwrap();
    let other = b.edges[e.0].trims.iter().copied().find(|o| *o != t).unwrap();
    assert_eq!(b.trims[other.0].trim_type, TrimType::Mated);

    b.delete_trim(t, false).unwrap();
    assert_eq!(b.edges[e.0].trims, vec![other]);
    assert_eq!(b.trims[other.0].trim_type, TrimType::Boundary);
}

#[test]
fn shear_substitutes_exact_nurbs_plane() {
    let mut b = unit_square_face().unwrap();
    let plane = b.surfaces[0].clone().unwrap();
    let shear = Transform::shear_xy(0.75);
    b.transform(&shear);

    let f = FaceIndex(0);
    let surface = b.face_surface(f).unwrap();
    assert!(matches!(surface, Surface::Nurbs(_)));
    for (u, v) in [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)] {
        let direct = shear.transform_point(&plane.point_at(u, v));
        assert!(surface.point_at(u, v).distance_to(&direct) <= ZERO_TOLERANCE);
    }
}

#[test]
fn repaired_edge_index_reports_singular_rule() {
    let mut b = unit_square_face().unwrap();
    let t = TrimIndex(1);
    b.trims[t.0].edge = Some(EdgeIndex(99));
    assert!(!b.is_valid(None));

    let mut repair_log = TextLog::new();
    assert!(b.is_corrupt(RepairMode::Repair, Some(&mut repair_log)));
    assert_eq!(b.trims[t.0].edge, None);
    assert!(!b.is_corrupt(RepairMode::ReportOnly, None));

    let mut log = TextLog::new();
    assert!(!b.is_valid_trim(t, Some(&mut log)));
    assert!(
        log.as_str()
            .contains("trim has no edge, so it must be singular with matching endpoint vertices"),
        "{log}"
    );
}
