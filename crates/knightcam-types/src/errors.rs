use thiserror::Error;

pub type Result<T, E = KnightcamError> = std::result::Result<T, E>;

/// Unified error type covering common failure scenarios across subsystems.
#[derive(Debug, Error)]
pub enum KnightcamError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("camera error: {0}")]
    Camera(String),
    #[error("vision error: {0}")]
    Vision(String),
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error(
        "frame dimension mismatch: previous {}x{}, current {}x{}",
        previous.0,
        previous.1,
        current.0,
        current.1
    )]
    DimensionMismatch {
        previous: (u32, u32),
        current: (u32, u32),
    },
    #[error("layout error: {0}")]
    Layout(String),
    #[error("orchestrator error: {0}")]
    Orchestrator(String),
    #[error("operational error: {0}")]
    Ops(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
