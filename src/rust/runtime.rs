use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use std::sync::OnceLock;

use crate::classifier::ClassifierError;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Graph optimization applied when a session is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationLevel {
    Disable,
    Basic,
    Extended,
    #[default]
    All,
}

impl OptimizationLevel {
    /// Parses `disable`, `basic`, `extended` or `all` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "disable" | "none" | "0" => Some(Self::Disable),
            "basic" | "1" => Some(Self::Basic),
            "extended" | "2" => Some(Self::Extended),
            "all" | "3" => Some(Self::All),
            _ => None,
        }
    }

    fn to_ort(self) -> GraphOptimizationLevel {
        match self {
            Self::Disable => GraphOptimizationLevel::Disable,
            Self::Basic => GraphOptimizationLevel::Level1,
            Self::Extended => GraphOptimizationLevel::Level2,
            Self::All => GraphOptimizationLevel::Level3,
        }
    }
}

/// ONNX Runtime settings for the classifier session.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Threads used across operators. 0 lets ONNX Runtime decide.
    pub inter_threads: usize,
    /// Threads used inside an operator. 0 lets ONNX Runtime decide.
    pub intra_threads: usize,
    pub optimization_level: OptimizationLevel,
}

fn init_onnx_environment() -> ort::Result<()> {
    ort::init()
        .with_name("toxiscore")
        .commit()?;
    Ok(())
}

/// Initializes the process-wide ONNX Runtime environment on first use.
pub fn ensure_initialized() -> Result<(), ClassifierError> {
    INIT.get_or_init(|| init_onnx_environment().map_err(|e| e.to_string()))
        .clone()
        .map_err(|e| ClassifierError::ModelError(format!("Failed to initialize ONNX Runtime: {}", e)))
}

pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ClassifierError> {
    ensure_initialized()?;
    let mut builder = Session::builder()?;

    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }
    builder = builder.with_optimization_level(config.optimization_level.to_ort())?;

    Ok(builder)
}
