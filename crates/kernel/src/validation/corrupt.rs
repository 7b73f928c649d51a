//! Corruption scan: every stored index must land inside its target array
//! and every record must belong to this Brep. No geometry is evaluated.

use tracing::{instrument, warn};

use super::config::RepairMode;
use super::log::TextLog;
use super::types::{EntityRef, ErrorCode, ValidationError};
use crate::topology::brep::Brep;
use crate::topology::index::*;
use crate::topology::records::Record;

/// Where a bad reference sits, so a repair can reset it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fix {
    VertexEdge(usize, usize),
    EdgeCurve(usize),
    EdgeVertex(usize, usize),
    EdgeTrim(usize, usize),
    TrimLoop(usize),
    TrimCurve(usize),
    TrimEdge(usize),
    TrimVertex(usize, usize),
    LoopFace(usize),
    LoopTrim(usize, usize),
    FaceSurface(usize),
    FaceLoop(usize, usize),
    SelfIndex(&'static str, usize),
    Owner,
}

struct Scan<'a> {
    brep: &'a Brep,
    found: Vec<(ValidationError, Fix)>,
}

impl Scan<'_> {
    fn range(&mut self, entity: EntityRef, field: &str, target: &'static str, index: usize, len: usize, fix: Fix) {
        if index >= len {
            let e = ValidationError::error(
                entity,
                ErrorCode::IndexOutOfRange,
                format!("{field} = {index} but there are only {len} {target} slots"),
            );
            self.found.push((e, fix));
        }
    }

    fn header<R: Record>(&mut self, r: &R, slot: usize, entity: EntityRef) {
        if r.slot() != Some(slot) {
            let e = ValidationError::error(
                entity,
                ErrorCode::IndexMismatch,
                format!("stored index {:?} does not equal slot {slot}", r.slot()),
            );
            self.found.push((e, Fix::SelfIndex(R::KIND, slot)));
        }
        if r.owner() != self.brep.id() {
            let e = ValidationError::error(
                entity,
                ErrorCode::WrongOwner,
                format!("back-reference is brep {} instead of {}", r.owner().0, self.brep.id().0),
            );
            self.found.push((e, Fix::Owner));
        }
    }

    fn run(&mut self) {
        let b = self.brep;
        let (nv, ne, nt, nl, nf) = (b.vertices.len(), b.edges.len(), b.trims.len(), b.loops.len(), b.faces.len());

        for (i, v) in b.vertices.iter().enumerate() {
            // A stored index that differs from the slot still counts as live.
            if v.index.is_none() {
                continue;
            }
            let ent = EntityRef::Vertex(VertexIndex(i));
            self.header(v, i, ent);
            for (k, e) in v.edges.iter().enumerate() {
                self.range(ent, "edges[]", "edge", e.0, ne, Fix::VertexEdge(i, k));
            }
        }
        for (i, e) in b.edges.iter().enumerate() {
            if e.index.is_none() {
                continue;
            }
            let ent = EntityRef::Edge(EdgeIndex(i));
            self.header(e, i, ent);
            if let Some(c) = e.curve {
                self.range(ent, "curve", "3d curve", c.0, b.curves3.len(), Fix::EdgeCurve(i));
            }
            for (end, v) in e.vertices.iter().enumerate() {
                if let Some(v) = v {
                    self.range(ent, "vertices[]", "vertex", v.0, nv, Fix::EdgeVertex(i, end));
                }
            }
            for (k, t) in e.trims.iter().enumerate() {
                self.range(ent, "trims[]", "trim", t.0, nt, Fix::EdgeTrim(i, k));
            }
        }
        for (i, t) in b.trims.iter().enumerate() {
            if t.index.is_none() {
                continue;
            }
            let ent = EntityRef::Trim(TrimIndex(i));
            self.header(t, i, ent);
            if let Some(l) = t.loop_index {
                self.range(ent, "loop", "loop", l.0, nl, Fix::TrimLoop(i));
            }
            if let Some(c) = t.curve {
                self.range(ent, "curve", "2d curve", c.0, b.curves2.len(), Fix::TrimCurve(i));
            }
            if let Some(e) = t.edge {
                self.range(ent, "edge", "edge", e.0, ne, Fix::TrimEdge(i));
            }
            for (end, v) in t.vertices.iter().enumerate() {
                if let Some(v) = v {
                    self.range(ent, "vertices[]", "vertex", v.0, nv, Fix::TrimVertex(i, end));
                }
            }
        }
        for (i, l) in b.loops.iter().enumerate() {
            if l.index.is_none() {
                continue;
            }
            let ent = EntityRef::Loop(LoopIndex(i));
            self.header(l, i, ent);
            if let Some(f) = l.face {
                self.range(ent, "face", "face", f.0, nf, Fix::LoopFace(i));
            }
            for (k, t) in l.trims.iter().enumerate() {
                self.range(ent, "trims[]", "trim", t.0, nt, Fix::LoopTrim(i, k));
            }
        }
        for (i, f) in b.faces.iter().enumerate() {
            if f.index.is_none() {
                continue;
            }
            let ent = EntityRef::Face(FaceIndex(i));
            self.header(f, i, ent);
            if let Some(s) = f.surface {
                self.range(ent, "surface", "surface", s.0, b.surfaces.len(), Fix::FaceSurface(i));
            }
            for (k, l) in f.loops.iter().enumerate() {
                self.range(ent, "loops[]", "loop", l.0, nl, Fix::FaceLoop(i, k));
            }
        }
    }
}

impl Brep {
    fn scan_corruption(&self) -> Vec<(ValidationError, Fix)> {
        let mut scan = Scan {
            brep: self,
            found: Vec::new(),
        };
        scan.run();
        scan.found
    }

    /// Findings of the corruption scan, without repairing anything.
    pub fn check_corruption(&self) -> Vec<ValidationError> {
        self.scan_corruption().into_iter().map(|(e, _)| e).collect()
    }

    /// True when some reference could index out of bounds.
    ///
    /// With a repairing `mode` each bad index is reset to "none" (or
    /// dropped from its list) so later traversal cannot fail; this is the
    /// only validation entry point that mutates.
    #[instrument(skip(self, log))]
    pub fn is_corrupt(&mut self, mode: RepairMode, log: Option<&mut TextLog>) -> bool {
        let found = self.scan_corruption();
        if found.is_empty() {
            return false;
        }
        if let (true, Some(log)) = (mode.logs(), log) {
            for (e, _) in &found {
                log.line(e.to_string());
            }
        }
        if mode.repairs() {
            // Later list positions first so earlier ones stay valid.
            for (_, fix) in found.iter().rev() {
                self.apply_fix(*fix);
            }
            self.invalidate_caches();
            warn!(count = found.len(), "repaired corrupt references");
        }
        true
    }

    fn apply_fix(&mut self, fix: Fix) {
        match fix {
            Fix::VertexEdge(i, k) => {
                self.vertices[i].edges.remove(k);
            }
            Fix::EdgeCurve(i) => self.edges[i].curve = None,
            Fix::EdgeVertex(i, end) => self.edges[i].vertices[end] = None,
            Fix::EdgeTrim(i, k) => {
                self.edges[i].trims.remove(k);
            }
            Fix::TrimLoop(i) => self.trims[i].loop_index = None,
            Fix::TrimCurve(i) => self.trims[i].curve = None,
            Fix::TrimEdge(i) => self.trims[i].edge = None,
            Fix::TrimVertex(i, end) => self.trims[i].vertices[end] = None,
            Fix::LoopFace(i) => self.loops[i].face = None,
            Fix::LoopTrim(i, k) => {
                self.loops[i].trims.remove(k);
            }
            Fix::FaceSurface(i) => self.faces[i].surface = None,
            Fix::FaceLoop(i, k) => {
                self.faces[i].loops.remove(k);
            }
            Fix::SelfIndex(kind, i) => match kind {
                "vertex" => self.vertices[i].index = Some(VertexIndex(i)),
                "edge" => self.edges[i].index = Some(EdgeIndex(i)),
                "trim" => self.trims[i].index = Some(TrimIndex(i)),
                "loop" => self.loops[i].index = Some(LoopIndex(i)),
                _ => self.faces[i].index = Some(FaceIndex(i)),
            },
            Fix::Owner => self.stamp_records(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::primitives::unit_square_face;

    #[test]
    fn test_clean_brep_is_not_corrupt() {
        let mut b = unit_square_face().unwrap();
        assert!(!b.is_corrupt(RepairMode::ReportOnly, None));
    }

    #[test]
    fn test_report_only_leaves_bad_index() {
        let mut b = unit_square_face().unwrap();
        b.trims[1].edge = Some(EdgeIndex(40));
        let mut log = TextLog::new();
        assert!(b.is_corrupt(RepairMode::ReportOnly, Some(&mut log)));
        assert_eq!(b.trims[1].edge, Some(EdgeIndex(40)));
        assert!(log.as_str().contains("edge = 40"));
    }

    #[test]
    fn test_repair_drops_list_entries() {
        let mut b = unit_square_face().unwrap();
        b.loops[0].trims.push(TrimIndex(77));
        b.vertices[0].edges.insert(0, EdgeIndex(99));
        assert!(b.is_corrupt(RepairMode::Silent, None));
        assert_eq!(b.loops[0].trims.len(), 4);
        assert!(!b.vertices[0].edges.contains(&EdgeIndex(99)));
        assert!(!b.is_corrupt(RepairMode::ReportOnly, None));
    }

    #[test]
    fn test_foreign_owner_is_restamped() {
        let mut b = unit_square_face().unwrap();
        let other = crate::Brep::new();
        b.edges[2].brep = other.id();
        assert_eq!(b.check_corruption()[0].code, ErrorCode::WrongOwner);
        assert!(b.is_corrupt(RepairMode::Repair, None));
        assert_eq!(b.edges[2].brep, b.id());
    }
}
