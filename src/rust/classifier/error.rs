use ort::Error as OrtError;
use std::fmt;

/// Errors raised while loading a toxicity classifier or scoring text.
#[derive(Debug)]
pub enum ClassifierError {
    /// Error occurred while loading or using the tokenizer
    TokenizerError(String),
    /// Error occurred while loading or running the ONNX model
    ModelError(String),
    /// Error occurred during the build phase
    BuildError(String),
    /// Error occurred while turning logits into a verdict
    PredictionError(String),
    /// Error occurred due to invalid input parameters
    ValidationError(String),
    /// The label schema is internally inconsistent
    SchemaError(String),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenizerError(msg) => write!(f, "Tokenizer error: {}", msg),
            Self::ModelError(msg) => write!(f, "Model error: {}", msg),
            Self::BuildError(msg) => write!(f, "Build error: {}", msg),
            Self::PredictionError(msg) => write!(f, "Prediction error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::SchemaError(msg) => write!(f, "Label schema error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ModelError(err.to_string())
    }
}

impl From<serde_json::Error> for ClassifierError {
    fn from(err: serde_json::Error) -> Self {
        ClassifierError::SchemaError(format!("invalid config.json: {}", err))
    }
}

impl From<crate::model_manager::ModelError> for ClassifierError {
    fn from(err: crate::model_manager::ModelError) -> Self {
        ClassifierError::BuildError(err.to_string())
    }
}
