use crate::domain::ModelParams;

/// Application-level error carrying the process exit code.
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

/// Failures raised by the estimation core.
///
/// `InvalidParameters` and `QueueUnstable` come from the performance model and
/// are absorbed by the loss aggregator as an infinite loss. Only
/// `OptimizerFailure` ever reaches the caller of `Optimizer::optimize`.
#[derive(Debug, Clone, PartialEq)]
pub enum EstimationError {
    /// A candidate parameter vector has a negative component.
    InvalidParameters { params: ModelParams },
    /// The analytic stability condition fails at this request rate (req/s).
    QueueUnstable { request_rate: f64 },
    /// The minimizer terminated abnormally or ran out of iterations.
    OptimizerFailure { reason: String },
}

impl EstimationError {
    pub fn optimizer(reason: impl Into<String>) -> Self {
        EstimationError::OptimizerFailure {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for EstimationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimationError::InvalidParameters { params } => write!(
                f,
                "invalid parameters: alpha={}, beta={}, gamma={}, delta={} (all must be >= 0)",
                params.alpha, params.beta, params.gamma, params.delta
            ),
            EstimationError::QueueUnstable { request_rate } => {
                write!(f, "system unstable at rate={request_rate} req/s")
            }
            EstimationError::OptimizerFailure { reason } => write!(f, "optimization error: {reason}"),
        }
    }
}

impl std::error::Error for EstimationError {}

impl From<EstimationError> for AppError {
    fn from(err: EstimationError) -> Self {
        AppError::new(4, err.to_string())
    }
}
