//! Shared types for the B-rep validation system.
//!
//! Defines error codes, severity levels, entity references, validation
//! errors and the unified `ValidationReport`.

use std::fmt;

use crate::topology::index::*;

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The structure is invalid.
    Error,
    /// Informational; the structure is still valid.
    Warning,
}

/// The record or table entry a finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Brep,
    Vertex(VertexIndex),
    Edge(EdgeIndex),
    Trim(TrimIndex),
    Loop(LoopIndex),
    Face(FaceIndex),
    Curve2(Curve2Index),
    Curve3(Curve3Index),
    Surface(SurfaceIndex),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Brep => write!(f, "brep"),
            EntityRef::Vertex(i) => write!(f, "vertex[{i}]"),
            EntityRef::Edge(i) => write!(f, "edge[{i}]"),
            EntityRef::Trim(i) => write!(f, "trim[{i}]"),
            EntityRef::Loop(i) => write!(f, "loop[{i}]"),
            EntityRef::Face(i) => write!(f, "face[{i}]"),
            EntityRef::Curve2(i) => write!(f, "curve2[{i}]"),
            EntityRef::Curve3(i) => write!(f, "curve3[{i}]"),
            EntityRef::Surface(i) => write!(f, "surface[{i}]"),
        }
    }
}

/// Enumeration of all validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // --- Corruption ---
    /// A stored index is outside its target array.
    IndexOutOfRange,
    /// A record's own index does not equal its slot.
    IndexMismatch,
    /// A record's back-reference names another Brep.
    WrongOwner,
    // --- Geometry references ---
    /// A live record references a missing table entry.
    MissingGeometry,
    /// Referenced geometry has the wrong dimension.
    WrongDimension,
    /// A record's domain is not inside its geometry's domain.
    DomainNotContained,
    /// A tolerance is negative or not finite.
    BadTolerance,
    // --- Topology ---
    /// Vertex incidence list and edge endpoints disagree.
    VertexEdgeMismatch,
    /// Edge trim list and trim edge references disagree.
    EdgeTrimMismatch,
    /// Closed curve with distinct vertices, or the reverse.
    EdgeClosure,
    /// Trim vertices differ from the edge's.
    TrimVertexMismatch,
    /// Trim type tag contradicts the graph.
    TrimType,
    /// Singular trim without matching vertices or on a non-singular side.
    SingularTrim,
    /// Seam trims are not paired one to one.
    SeamPairing,
    /// Two boundary trims on a closed surface seam should share one edge.
    SeamShouldBeJoined,
    /// Loop trim list and trim loop references disagree.
    LoopTrimMismatch,
    /// Loop type tag is not allowed where the loop is.
    LoopType,
    /// Consecutive trims do not meet in parameter space.
    LoopNotClosed,
    /// Consecutive trims do not share a vertex.
    LoopVertexGap,
    /// Slit loop violates its trim rules.
    SlitLoop,
    /// Outer loop is clockwise or inner loop counter-clockwise.
    LoopDirection,
    /// Face loop list and loop face references disagree.
    FaceLoopMismatch,
    /// Loop 0 is not outer, or a later loop is outer.
    FaceLoopOrder,
    /// Face without loops.
    EmptyFace,
    // --- Geometric law ---
    /// Cached parameter-space box misses the curve it bounds.
    BoundingBox,
    /// Iso flag does not match the trim's curve.
    IsoFlag,
    /// Trim image and edge curve are too far apart.
    TrimEdgeDeviation,
    /// Trim image runs against the direction implied by its reversal flag.
    TrimEdgeDirection,
    /// Vertex is too far from an edge end.
    VertexDeviation,
    /// Cached overall box is much larger than the computed one.
    LooseBoundingBox,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single validation finding (error or warning).
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Which record.
    pub entity: EntityRef,
    /// Parent record (e.g. the loop that owns a trim), if applicable.
    pub parent: Option<EntityRef>,
    pub code: ErrorCode,
    /// Names the offending field and the expected condition.
    pub message: String,
    pub severity: Severity,
    /// Measured numeric value (e.g. a gap distance).
    pub numeric_value: Option<f64>,
    /// The tolerance threshold that was exceeded.
    pub tolerance: Option<f64>,
}

impl ValidationError {
    pub fn error(entity: EntityRef, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            entity,
            parent: None,
            code,
            message: message.into(),
            severity: Severity::Error,
            numeric_value: None,
            tolerance: None,
        }
    }

    pub fn warning(entity: EntityRef, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(entity, code, message)
        }
    }

    pub fn with_parent(mut self, parent: EntityRef) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_values(mut self, value: f64, tolerance: f64) -> Self {
        self.numeric_value = Some(value);
        self.tolerance = Some(tolerance);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sev = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
        };
        write!(f, "[{}] {}: {} (code: {})", sev, self.entity, self.message, self.code)?;
        if let Some(parent) = self.parent {
            write!(f, " in {parent}")?;
        }
        if let Some(val) = self.numeric_value {
            write!(f, " value={val:.2e}")?;
        }
        if let Some(tol) = self.tolerance {
            write!(f, " tol={tol:.2e}")?;
        }
        Ok(())
    }
}

/// Which records a validation run covered.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityCounts {
    pub vertices: usize,
    pub edges: usize,
    pub trims: usize,
    pub loops: usize,
    pub faces: usize,
}

/// The unified validation report produced by `BrepValidator`.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub valid: bool,
    /// The corruption scan found unsafe references; deeper checks were
    /// skipped.
    pub corrupt: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
    pub counts: EntityCounts,
}

impl ValidationReport {
    /// Filter errors by a specific error code.
    pub fn errors_of(&self, code: ErrorCode) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.code == code).collect()
    }

    /// Check that no errors of a specific code exist.
    pub fn no_errors_of(&self, code: ErrorCode) -> bool {
        !self.errors.iter().any(|e| e.code == code)
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "ValidationReport: valid={}, corrupt={}, errors={}, warnings={}",
            self.valid,
            self.corrupt,
            self.errors.len(),
            self.warnings.len()
        )?;
        for e in &self.errors {
            writeln!(f, "  {e}")?;
        }
        for w in &self.warnings {
            writeln!(f, "  {w}")?;
        }
        Ok(())
    }
}
