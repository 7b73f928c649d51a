//! Property-based tests for B-rep invariants using the `proptest` crate.

use proptest::prelude::*;

use brep_kernel::geometry::Point3d;
use brep_kernel::topology::primitives::{make_box, unit_square_face};
use brep_kernel::{Brep, EdgeIndex, FaceIndex, Transform};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

/// Arbitrary positive dimension suitable for box extents (avoids degenerate zero-size).
fn arb_positive_dim() -> impl Strategy<Value = f64> {
    0.1f64..1000.0
}

/// Arbitrary translation offsets.
fn arb_translation() -> impl Strategy<Value = (f64, f64, f64)> {
    (-1000.0f64..1000.0, -1000.0f64..1000.0, -1000.0f64..1000.0)
}

const TOL: f64 = 1e-6;

fn incidence_symmetric(b: &Brep) -> bool {
    b.vertex_indices().all(|v| {
        b.vertices[v.0]
            .edges
            .iter()
            .all(|e| b.edges[e.0].vertices.contains(&Some(v)))
    }) && b.edge_indices().all(|e| {
        b.edges[e.0]
            .vertices
            .iter()
            .flatten()
            .all(|v| b.vertices[v.0].edges.contains(&e))
    })
}

// ---------------------------------------------------------------------------
// 1. Boxes of any size are valid and have box counts
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn box_is_valid_for_any_size(
        dx in arb_positive_dim(),
        dy in arb_positive_dim(),
        dz in arb_positive_dim(),
    ) {
        let b = make_box(dx, dy, dz).unwrap();
        prop_assert_eq!(b.vertex_count(), 8);
        prop_assert_eq!(b.edge_count(), 12);
        prop_assert_eq!(b.face_count(), 6);
        prop_assert!(b.is_valid(None), "box {} x {} x {} reported invalid", dx, dy, dz);
        prop_assert!(b.is_solid());
    }
}

// ---------------------------------------------------------------------------
// 2. The overall box holds every vertex
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn bounding_box_contains_own_vertices(
        dx in arb_positive_dim(),
        dy in arb_positive_dim(),
        dz in arb_positive_dim(),
    ) {
        let b = make_box(dx, dy, dz).unwrap();
        let bb = b.bounding_box();
        for v in b.vertex_indices() {
            let p = b.vertices[v.0].point;
            prop_assert!(bb.contains_point(&p, TOL), "vertex {} at {:?} outside {:?}", v, p, bb);
        }
        prop_assert!((bb.max.x - dx).abs() < TOL * dx.max(1.0));
    }
}

// ---------------------------------------------------------------------------
// 3. Translation keeps validity and moves the box by the offset
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn translation_preserves_validity(
        dim in arb_positive_dim(),
        (tx, ty, tz) in arb_translation(),
    ) {
        let mut b = make_box(dim, dim, dim).unwrap();
        let before = b.bounding_box();
        prop_assert!(b.transform(&Transform::translation(tx, ty, tz)));
        let after = b.bounding_box();
        let moved = Point3d::new(before.min.x + tx, before.min.y + ty, before.min.z + tz);
        prop_assert!(after.min.distance_to(&moved) < TOL * (dim + 2000.0));
        prop_assert!(b.is_valid(None));
    }
}

// ---------------------------------------------------------------------------
// 4. Appending n copies multiplies every live count
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn append_adds_counts(copies in 1usize..5) {
        let source = make_box(1.0, 1.0, 1.0).unwrap();
        let mut b = unit_square_face().unwrap();
        for _ in 0..copies {
            b.append(&source).unwrap();
        }
        prop_assert_eq!(b.vertex_count(), 4 + 8 * copies);
        prop_assert_eq!(b.edge_count(), 4 + 12 * copies);
        prop_assert_eq!(b.trim_count(), 4 + 24 * copies);
        prop_assert_eq!(b.face_count(), 1 + 6 * copies);
        prop_assert!(incidence_symmetric(&b));
        prop_assert!(b.is_valid(None));
    }
}

// ---------------------------------------------------------------------------
// 5. Delete then compact: still consistent, and compaction is idempotent
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn delete_and_compact_stay_consistent(
        face in 0usize..6,
        edge in 0usize..12,
        delete_edges in any::<bool>(),
    ) {
        let mut b = make_box(1.0, 2.0, 3.0).unwrap();
        b.delete_face(FaceIndex(face), delete_edges).unwrap();
        if b.edge(EdgeIndex(edge)).is_some() {
            b.delete_edge(EdgeIndex(edge), true).unwrap();
        }
        prop_assert!(incidence_symmetric(&b));
        prop_assert!(b.is_valid(None));

        b.compact();
        prop_assert!(b.is_valid(None));
        prop_assert_eq!(b.faces.len(), b.face_count());
        let once = serde_json::to_string(&b).unwrap();
        b.compact();
        prop_assert_eq!(serde_json::to_string(&b).unwrap(), once);
    }
}
