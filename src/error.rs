//! Error types.
//!
//! - [`FitError`]: structured failure of the estimation core, one variant per
//!   fatal category, each attributable to a pipeline stage.
//! - [`AppError`]: what the binary reports (a message plus a process exit code).

/// Pipeline stage at which a fit failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStage {
    Configuring,
    Validating,
    Trimming,
    Seeding,
    Optimizing,
    Projecting,
}

impl FitStage {
    pub fn name(self) -> &'static str {
        match self {
            FitStage::Configuring => "configuring",
            FitStage::Validating => "validating",
            FitStage::Trimming => "trimming",
            FitStage::Seeding => "seeding",
            FitStage::Optimizing => "optimizing",
            FitStage::Projecting => "projecting",
        }
    }
}

/// Fatal error of a single `fit` call.
///
/// No partial result accompanies any of these: the caller either gets a full
/// `FitResult` or one of the variants below.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    /// The cumulative series decreases somewhere.
    #[error("invalid input: cases decrease at day {index} ({current} < {previous})")]
    NonMonotonic {
        index: usize,
        previous: f64,
        current: f64,
    },

    /// Fewer usable points than the estimator needs after trimming the flat start.
    #[error("insufficient data: {remaining} usable points after trimming, need at least {required}")]
    InsufficientData { remaining: usize, required: usize },

    /// No index triple produced a valid logistic seed.
    #[error("seed estimation failed: no valid logistic triple in a series of {len} points")]
    SeedEstimation { len: usize },

    /// Every weight configuration failed to converge.
    #[error("optimization failed: none of {attempted} weight configurations converged")]
    Optimization { attempted: usize },

    /// The winning parameters could not be integrated over the forecast grid.
    #[error("projection failed: {reason}")]
    Projection { reason: String },

    /// A configuration value is out of range.
    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

impl FitError {
    /// Stage of the fit state machine that raised the error.
    pub fn stage(&self) -> FitStage {
        match self {
            FitError::NonMonotonic { .. } => FitStage::Validating,
            FitError::InsufficientData { .. } => FitStage::Trimming,
            FitError::SeedEstimation { .. } => FitStage::Seeding,
            FitError::Optimization { .. } => FitStage::Optimizing,
            FitError::Projection { .. } => FitStage::Projecting,
            FitError::InvalidConfig { .. } => FitStage::Configuring,
        }
    }

    /// Process exit code used when the error reaches the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            FitError::NonMonotonic { .. } | FitError::InvalidConfig { .. } => 2,
            FitError::InsufficientData { .. } => 3,
            FitError::SeedEstimation { .. }
            | FitError::Optimization { .. }
            | FitError::Projection { .. } => 4,
        }
    }

    pub(crate) fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        FitError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        AppError::new(
            err.exit_code(),
            format!("Fit failed while {}: {err}", err.stage().name()),
        )
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
