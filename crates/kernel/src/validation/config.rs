//! Configuration for the B-rep validation system.

/// Which checks to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationLevel {
    /// Indices, back-references, tags and incidence symmetry.
    Topology,
    /// Topology plus loop closure, trim/edge deviation and cached boxes.
    Full,
}

/// What the corruption scan does with an out-of-range index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepairMode {
    /// Report only; leave the structure untouched.
    #[default]
    ReportOnly,
    /// Reset the bad index to "none" and report it.
    Repair,
    /// Reset the bad index without writing diagnostics.
    Silent,
}

impl RepairMode {
    pub fn repairs(self) -> bool {
        matches!(self, RepairMode::Repair | RepairMode::Silent)
    }

    pub fn logs(self) -> bool {
        !matches!(self, RepairMode::Silent)
    }
}

/// Tolerance thresholds for validation checks.
#[derive(Debug, Clone, Copy)]
pub struct ToleranceConfig {
    /// Absolute zero for distances and parameter gaps.
    pub zero: f64,
    /// Relative tolerance for loop closure and domain containment.
    pub relative: f64,
    /// Smallest distance allowed between a trim image and its edge.
    pub edge_floor: f64,
    /// Angle (radians) beyond which a trim tangent counts as reversed.
    pub reversal_angle: f64,
    /// How much larger a cached overall box may be before a warning.
    pub bbox_leniency: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        let t = crate::Tolerance::default();
        Self {
            zero: t.zero,
            relative: t.relative,
            edge_floor: 1e-6,
            reversal_angle: std::f64::consts::FRAC_PI_2,
            bbox_leniency: t.bbox_leniency,
        }
    }
}

impl ToleranceConfig {
    /// Closure distance for points of magnitude around `scale`.
    pub fn distance(&self, scale: f64) -> f64 {
        (self.relative * scale.abs()).max(self.zero)
    }
}

/// Configuration controlling which checks are run and their parameters.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub level: ValidationLevel,
    pub tolerance: ToleranceConfig,
    /// Sample points along each trim for deviation checks.
    pub sampling_density: u32,
    /// Check loop orientation from the signed parameter-space area.
    pub check_loop_direction: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            level: ValidationLevel::Full,
            tolerance: ToleranceConfig::default(),
            sampling_density: 8,
            check_loop_direction: true,
        }
    }
}

impl ValidationConfig {
    /// Structural checks only; no geometry is evaluated.
    pub fn topology() -> Self {
        Self {
            level: ValidationLevel::Topology,
            check_loop_direction: false,
            ..Self::default()
        }
    }

    pub fn full() -> Self {
        Self::default()
    }
}
