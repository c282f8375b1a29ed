mod error;
mod inference;
mod classifier;
pub mod builder;
pub mod labels;
pub mod scoring;
mod utils;

pub use error::ClassifierError;
pub use classifier::{Classify, ToxicityClassifier};
pub use builder::ClassifierBuilder;
pub use labels::{ClassificationMode, LabelSchema, resolve_label_names};
pub use scoring::{ScoringBranch, ToxicityLabel, Verdict, score};

/// Information about the configuration of a loaded classifier
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    /// Path to the ONNX model file
    pub model_path: String,
    /// Path to the tokenizer file
    pub tokenizer_path: String,
    /// Width of the classification head
    pub num_labels: usize,
    /// Classification mode declared by the checkpoint
    pub mode: ClassificationMode,
    /// How logits are turned into a verdict
    pub branch: ScoringBranch,
    /// Resolved category names, empty when none resolve
    pub category_names: Vec<String>,
    /// Token count at which input is truncated
    pub max_sequence_length: usize,
}
