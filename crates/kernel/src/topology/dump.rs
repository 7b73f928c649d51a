use std::fmt::Write;

use super::brep::Brep;
use crate::validation::TextLog;

fn opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map_or_else(|| "-".to_string(), |x| x.to_string())
}

impl Brep {
    /// Human-readable report of counts and every record.
    pub fn dump(&self, log: &mut TextLog) {
        // TextLog never fails to accept text.
        let _ = self.write_dump(log);
    }

    fn write_dump(&self, log: &mut TextLog) -> std::fmt::Result {
        writeln!(
            log,
            "brep {}: {} vertices, {} edges, {} trims, {} loops, {} faces",
            self.id().0,
            self.vertex_count(),
            self.edge_count(),
            self.trim_count(),
            self.loop_count(),
            self.face_count()
        )?;
        writeln!(
            log,
            "geometry: {} 2d curves, {} 3d curves, {} surfaces",
            self.curves2.len(),
            self.curves3.len(),
            self.surfaces.len()
        )?;
        if let Some(bb) = self.cached_bounding_box() {
            writeln!(log, "bbox: {:?} .. {:?}", bb.min, bb.max)?;
        }

        writeln!(log, "vertices:")?;
        log.push_indent();
        for v in self.vertex_indices() {
            let r = &self.vertices[v.0];
            let edges: Vec<String> = r.edges.iter().map(|e| e.to_string()).collect();
            writeln!(
                log,
                "v[{v}] ({:.6}, {:.6}, {:.6}) tol={} edges=[{}]",
                r.point.x,
                r.point.y,
                r.point.z,
                opt(r.tolerance),
                edges.join(", ")
            )?;
        }
        log.pop_indent();

        writeln!(log, "edges:")?;
        log.push_indent();
        for e in self.edge_indices() {
            let r = &self.edges[e.0];
            let trims: Vec<String> = r.trims.iter().map(|t| t.to_string()).collect();
            writeln!(
                log,
                "e[{e}] curve={} domain=[{}, {}] v=({}, {}) tol={} trims=[{}]",
                opt(r.curve),
                r.proxy.domain.t0,
                r.proxy.domain.t1,
                opt(r.vertices[0]),
                opt(r.vertices[1]),
                opt(r.tolerance),
                trims.join(", ")
            )?;
        }
        log.pop_indent();

        writeln!(log, "faces:")?;
        log.push_indent();
        for f in self.face_indices() {
            let face = &self.faces[f.0];
            writeln!(
                log,
                "f[{f}] surface={} reversed={} loops={}",
                opt(face.surface),
                face.reversed,
                face.loops.len()
            )?;
            log.push_indent();
            for &l in &face.loops {
                let Some(lp) = self.loop_at(l) else {
                    writeln!(log, "loop {l} (deleted)")?;
                    continue;
                };
                writeln!(log, "l[{l}] {:?} trims={}", lp.loop_type, lp.trims.len())?;
                log.push_indent();
                for &t in &lp.trims {
                    let Some(tr) = self.trim(t) else {
                        writeln!(log, "trim {t} (deleted)")?;
                        continue;
                    };
                    writeln!(
                        log,
                        "t[{t}] {:?} edge={} rev={} v=({}, {}) iso={:?} curve={}",
                        tr.trim_type,
                        opt(tr.edge),
                        tr.reversed,
                        opt(tr.vertices[0]),
                        opt(tr.vertices[1]),
                        tr.iso,
                        opt(tr.curve)
                    )?;
                }
                log.pop_indent();
            }
            log.pop_indent();
        }
        log.pop_indent();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::primitives::unit_square_face;

    #[test]
    fn test_dump_mentions_every_trim() {
        let b = unit_square_face().unwrap();
        let mut log = TextLog::new();
        b.dump(&mut log);
        let text = log.as_str();
        assert!(text.contains("4 vertices, 4 edges, 4 trims, 1 loops, 1 faces"));
        assert_eq!(text.matches("Boundary").count(), 4);
        assert!(text.contains("      t[3]"));
    }
}
