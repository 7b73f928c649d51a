/// Failure outcomes of structural edit operations.
///
/// Operations documented as all-or-nothing leave the `Brep` untouched when
/// they return one of these.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BrepError {
    #[error("{kind} index {index} is out of range")]
    IndexOutOfRange { kind: &'static str, index: usize },

    #[error("{kind} {index} has been deleted")]
    Deleted { kind: &'static str, index: usize },

    #[error("{kind} {index} references missing geometry")]
    MissingGeometry { kind: &'static str, index: usize },

    #[error("geometry has dimension {found}, expected {expected}")]
    WrongDimension { expected: usize, found: usize },

    #[error("invalid parameter interval [{t0}, {t1}]")]
    BadInterval { t0: f64, t1: f64 },

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("geometry operation failed: {0}")]
    Geometry(String),

    #[error("source brep is corrupt")]
    CorruptSource,
}

pub type Result<T> = std::result::Result<T, BrepError>;
