//! Toxicity scoring for short comments with pretrained transformer
//! sequence classifiers exported to ONNX.
//!
//! Checkpoints come in several shapes: a single logit, a binary
//! toxic/non-toxic head, or a multi-label head such as the six Jigsaw
//! categories. Whatever the shape, [`ToxicityClassifier::classify`] returns
//! the same [`Verdict`]: a toxic/non-toxic label, a toxicity score, its
//! complement and per-category flags.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use toxiscore::ToxicityClassifier;
//!
//! let classifier = ToxicityClassifier::builder()
//!     .with_model_dir("best_twitter_roberta")?
//!     .build()?;
//!
//! let verdict = classifier.classify("Have a great day!")?;
//! println!("{} ({:.1}%)", verdict.label, verdict.toxicity_score * 100.0);
//! # Ok(())
//! # }
//! ```
//!
//! # Scoring without a model
//!
//! The label interpretation is available on its own:
//!
//! ```
//! use toxiscore::{score, ClassificationMode, LabelSchema, resolve_label_names};
//!
//! let schema = LabelSchema::new(Some(6), None, ClassificationMode::MultiLabel).unwrap();
//! let names = resolve_label_names(&schema);
//! let verdict = score(&[3.0, -3.0, -3.0, -3.0, -3.0, -3.0], &schema, names.as_deref()).unwrap();
//! assert!(verdict.is_toxic());
//! assert!(verdict.categories["toxic"]);
//! assert!(!verdict.categories["threat"]);
//! ```

pub mod classifier;
mod runtime;
pub mod config;
pub mod interactive;
pub mod loader;
pub mod model_manager;
pub mod models;
pub mod server;

pub use classifier::{
    ClassificationMode, ClassifierBuilder, ClassifierError, ClassifierInfo, Classify, LabelSchema,
    ScoringBranch, ToxicityClassifier, ToxicityLabel, Verdict, resolve_label_names, score,
};
pub use config::{Config, ConfigError};
pub use runtime::{OptimizationLevel, RuntimeConfig, create_session_builder};
pub use model_manager::{ModelManager, ModelError};
pub use models::{BuiltinModel, ModelInfo};

/// Initializes `env_logger`, defaulting to `info` when `RUST_LOG` is unset.
pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
