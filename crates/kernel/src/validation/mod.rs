pub mod types;
pub mod config;
pub mod log;
pub mod corrupt;
pub mod checks;
pub mod geometry;

pub use types::*;
pub use config::*;
pub use log::TextLog;

use tracing::{info, instrument};

use crate::topology::brep::Brep;
use crate::topology::index::*;

/// Two-tier B-rep validator.
///
/// The corruption scan runs first and is the only thing that runs when it
/// finds unsafe indices. Otherwise:
/// - **Topology**: index links, tags, incidence symmetry, loop ordering.
/// - **Full**: topology plus loop closure, trim/edge agreement, vertex
///   positions, cached boxes and iso flags.
///
/// Validation never mutates the Brep; see [`Brep::is_corrupt`] for repair.
#[derive(Debug, Clone, Default)]
pub struct BrepValidator {
    config: ValidationConfig,
}

impl BrepValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate every live record, returning a unified report.
    #[instrument(skip(self, brep))]
    pub fn validate(&self, brep: &Brep) -> ValidationReport {
        let mut report = self.start(brep);
        if report.corrupt {
            return self.finish(report);
        }
        let errors = &mut report.errors;
        for v in brep.vertex_indices() {
            checks::check_vertex(brep, v, errors);
        }
        for e in brep.edge_indices() {
            checks::check_edge(brep, e, errors);
        }
        for t in brep.trim_indices() {
            checks::check_trim(brep, t, errors);
        }
        for l in brep.loop_indices() {
            checks::check_loop(brep, l, errors);
        }
        for f in brep.face_indices() {
            checks::check_face(brep, f, errors);
        }
        if self.config.level >= ValidationLevel::Full {
            geometry::check_geometry(brep, &self.config, &mut report.errors, &mut report.warnings);
        }
        self.finish(report)
    }

    /// Validate one record. Faces and loops include the loops and trims
    /// they own.
    #[instrument(skip(self, brep))]
    pub fn validate_entity(&self, brep: &Brep, entity: EntityRef) -> ValidationReport {
        let mut report = self.start(brep);
        if report.corrupt {
            return self.finish(report);
        }
        let full = self.config.level >= ValidationLevel::Full;
        let cfg = &self.config;
        let errors = &mut report.errors;
        match entity {
            EntityRef::Vertex(v) if live(brep.vertices.len(), v.0, brep.vertex(v).is_some(), entity, errors) => {
                checks::check_vertex(brep, v, errors);
            }
            EntityRef::Edge(e) if live(brep.edges.len(), e.0, brep.edge(e).is_some(), entity, errors) => {
                checks::check_edge(brep, e, errors);
                if full {
                    geometry::check_edge_geometry(brep, e, cfg, errors);
                }
            }
            EntityRef::Trim(t) if live(brep.trims.len(), t.0, brep.trim(t).is_some(), entity, errors) => {
                checks::check_trim(brep, t, errors);
                if full {
                    geometry::check_trim_geometry(brep, t, cfg, errors);
                }
            }
            EntityRef::Loop(l) if live(brep.loops.len(), l.0, brep.loop_at(l).is_some(), entity, errors) => {
                validate_loop(brep, l, cfg, errors);
            }
            EntityRef::Face(f) if live(brep.faces.len(), f.0, brep.face(f).is_some(), entity, errors) => {
                checks::check_face(brep, f, errors);
                for l in brep.faces[f.0].loops.clone() {
                    if brep.loop_at(l).is_some() {
                        validate_loop(brep, l, cfg, errors);
                    }
                }
                if full {
                    geometry::check_face_geometry(brep, f, cfg, errors);
                }
            }
            _ => {}
        }
        self.finish(report)
    }

    fn start(&self, brep: &Brep) -> ValidationReport {
        let corruption = brep.check_corruption();
        ValidationReport {
            valid: false,
            corrupt: !corruption.is_empty(),
            errors: corruption,
            warnings: Vec::new(),
            counts: EntityCounts {
                vertices: brep.vertex_count(),
                edges: brep.edge_count(),
                trims: brep.trim_count(),
                loops: brep.loop_count(),
                faces: brep.face_count(),
            },
        }
    }

    fn finish(&self, mut report: ValidationReport) -> ValidationReport {
        report.valid = report.errors.is_empty();
        info!(
            valid = report.valid,
            corrupt = report.corrupt,
            level = ?self.config.level,
            error_count = report.errors.len(),
            warning_count = report.warnings.len(),
            "validation complete"
        );
        report
    }
}

fn live(len: usize, index: usize, is_live: bool, entity: EntityRef, errors: &mut Vec<ValidationError>) -> bool {
    if index >= len {
        errors.push(ValidationError::error(
            entity,
            ErrorCode::IndexOutOfRange,
            format!("index {index} is past the {len} allocated slots"),
        ));
    } else if !is_live {
        errors.push(ValidationError::error(entity, ErrorCode::IndexMismatch, "record is deleted"));
    }
    index < len && is_live
}

fn validate_loop(brep: &Brep, l: LoopIndex, cfg: &ValidationConfig, errors: &mut Vec<ValidationError>) {
    checks::check_loop(brep, l, errors);
    let full = cfg.level >= ValidationLevel::Full;
    for t in brep.loops[l.0].trims.clone() {
        if brep.trim(t).is_some() {
            checks::check_trim(brep, t, errors);
            if full {
                geometry::check_trim_geometry(brep, t, cfg, errors);
            }
        }
    }
    if full {
        geometry::check_loop_geometry(brep, l, cfg, errors);
    }
}

/// Write the report's findings to `log`, if one was supplied.
fn render(report: &ValidationReport, log: Option<&mut TextLog>) -> bool {
    if let Some(log) = log {
        for e in report.errors.iter().chain(&report.warnings) {
            log.line(e.to_string());
        }
    }
    report.valid
}

impl Brep {
    /// Full validity scan with default tolerances.
    pub fn is_valid(&self, log: Option<&mut TextLog>) -> bool {
        render(&BrepValidator::default().validate(self), log)
    }

    pub fn is_valid_vertex(&self, v: VertexIndex, log: Option<&mut TextLog>) -> bool {
        render(&BrepValidator::default().validate_entity(self, EntityRef::Vertex(v)), log)
    }

    pub fn is_valid_edge(&self, e: EdgeIndex, log: Option<&mut TextLog>) -> bool {
        render(&BrepValidator::default().validate_entity(self, EntityRef::Edge(e)), log)
    }

    pub fn is_valid_trim(&self, t: TrimIndex, log: Option<&mut TextLog>) -> bool {
        render(&BrepValidator::default().validate_entity(self, EntityRef::Trim(t)), log)
    }

    pub fn is_valid_loop(&self, l: LoopIndex, log: Option<&mut TextLog>) -> bool {
        render(&BrepValidator::default().validate_entity(self, EntityRef::Loop(l)), log)
    }

    pub fn is_valid_face(&self, f: FaceIndex, log: Option<&mut TextLog>) -> bool {
        render(&BrepValidator::default().validate_entity(self, EntityRef::Face(f)), log)
    }
}
