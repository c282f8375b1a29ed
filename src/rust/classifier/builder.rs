use std::path::Path;
use std::sync::Arc;
use tokenizers::{Tokenizer, TruncationParams};
use ort::session::Session;
use log::{info, error};

use super::error::ClassifierError;
use super::inference::SequenceLogits;
use super::classifier::ToxicityClassifier;
use super::labels::{resolve_label_names, LabelSchema};
use crate::models::{CONFIG_FILE, MODEL_FILE, TOKENIZER_FILE};
use crate::runtime::{RuntimeConfig, create_session_builder};

/// Truncation length used when none is configured (RoBERTa/BERT limit).
pub const DEFAULT_MAX_SEQUENCE_LENGTH: usize = 512;

const SAMPLE_TEXT: &str = "Test input to infer the label count";

/// A builder for constructing a [`ToxicityClassifier`] with a fluent interface.
#[derive(Default, Debug)]
pub struct ClassifierBuilder {
    model_path: Option<String>,
    tokenizer_path: Option<String>,
    tokenizer: Option<Tokenizer>,
    session: Option<Session>,
    schema: Option<LabelSchema>,
    max_sequence_length: Option<usize>,
    runtime_config: RuntimeConfig,
}

impl SequenceLogits for ClassifierBuilder {
    fn tokenizer(&self) -> Option<&Tokenizer> {
        self.tokenizer.as_ref()
    }

    fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}

impl ClassifierBuilder {
    /// Creates a new empty ClassifierBuilder instance with default configuration
    ///
    /// # Example
    /// ```
    /// use toxiscore::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the runtime configuration for ONNX model execution.
    /// Must be called before the model is loaded to take effect.
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Sets the token count at which input is truncated.
    /// Must be called before the model is loaded to take effect.
    pub fn with_max_sequence_length(mut self, max_sequence_length: usize) -> Self {
        self.max_sequence_length = Some(max_sequence_length);
        self
    }

    /// Overrides the label schema read from `config.json`.
    pub fn with_label_schema(mut self, schema: LabelSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Loads `model.onnx`, `tokenizer.json` and, when present, `config.json`
    /// from a model directory.
    ///
    /// # Example
    /// ```no_run
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use toxiscore::ClassifierBuilder;
    ///
    /// let classifier = ClassifierBuilder::new()
    ///     .with_model_dir("best_twitter_roberta")?
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_model_dir(self, dir: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ClassifierError::BuildError(format!("Model directory not found: {}", dir.display())));
        }
        let config_path = dir.join(CONFIG_FILE);
        let config_path = config_path.is_file().then_some(config_path);

        self.with_custom_model(
            &dir.join(MODEL_FILE).to_string_lossy(),
            &dir.join(TOKENIZER_FILE).to_string_lossy(),
            config_path.as_deref(),
        )
    }

    /// Sets a custom model, tokenizer and optional `config.json` path.
    ///
    /// # Returns
    /// The builder instance if successful, or an error if:
    ///   - The model or tokenizer paths are empty
    ///   - The paths are already set
    ///   - The files don't exist
    ///   - The model, tokenizer or config failed to load
    ///   - The model structure is invalid
    pub fn with_custom_model(
        mut self,
        model_path: &str,
        tokenizer_path: &str,
        config_path: Option<&Path>,
    ) -> Result<Self, ClassifierError> {
        if model_path.is_empty() || tokenizer_path.is_empty() {
            return Err(ClassifierError::BuildError("Model and tokenizer paths cannot be empty".to_string()));
        }
        if self.model_path.is_some() || self.tokenizer_path.is_some() {
            return Err(ClassifierError::BuildError("Model and tokenizer paths already set".to_string()));
        }

        if !Path::new(model_path).exists() {
            return Err(ClassifierError::BuildError(format!("Model file not found: {}", model_path)));
        }
        if !Path::new(tokenizer_path).exists() {
            return Err(ClassifierError::BuildError(format!("Tokenizer file not found: {}", tokenizer_path)));
        }

        let max_length = self.max_sequence_length.unwrap_or(DEFAULT_MAX_SEQUENCE_LENGTH);
        let mut tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| {
                error!("Failed to load tokenizer: {}", e);
                ClassifierError::BuildError(format!("Failed to load tokenizer: {}", e))
            })?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| ClassifierError::TokenizerError(format!("Failed to set truncation: {}", e)))?;
        info!("Tokenizer loaded from {} (truncating at {} tokens)", tokenizer_path, max_length);

        if self.schema.is_none() {
            if let Some(config_path) = config_path {
                let schema = LabelSchema::from_config_file(config_path)?;
                info!("Label schema read from {}: {:?}", config_path.display(), schema);
                self.schema = Some(schema);
            }
        }

        let session = create_session_builder(&self.runtime_config)?
            .commit_from_file(model_path)?;
        Self::validate_model(&session)?;
        info!("Model structure validated successfully");

        self.max_sequence_length = Some(max_length);
        self.tokenizer = Some(tokenizer);
        self.session = Some(session);
        self.model_path = Some(model_path.to_string());
        self.tokenizer_path = Some(tokenizer_path.to_string());
        Ok(self)
    }

    /// Builds and returns the final classifier.
    ///
    /// Runs one sample input through the model to learn the width of its
    /// classification head. That width fills in a missing label count and
    /// must agree with a count the schema already has.
    pub fn build(mut self) -> Result<ToxicityClassifier, ClassifierError> {
        if self.model_path.is_none() || self.tokenizer_path.is_none() {
            return Err(ClassifierError::BuildError("Model and tokenizer paths must be set".to_string()));
        }

        let head_width = self.logits(SAMPLE_TEXT)?.len();
        let schema = Self::fit_schema(self.schema.take(), head_width)?;
        let category_names = resolve_label_names(&schema);
        info!("Classifier has {} labels, categories {:?}", head_width, category_names);

        let tokenizer = Arc::new(self.tokenizer.take()
            .ok_or_else(|| ClassifierError::BuildError("No tokenizer loaded".into()))?);
        let session = Arc::new(self.session.take()
            .ok_or_else(|| ClassifierError::BuildError("No ONNX model loaded".into()))?);

        Ok(ToxicityClassifier {
            model_path: self.model_path.take().unwrap_or_default(),
            tokenizer_path: self.tokenizer_path.take().unwrap_or_default(),
            tokenizer,
            session,
            schema,
            category_names,
            max_sequence_length: self.max_sequence_length.unwrap_or(DEFAULT_MAX_SEQUENCE_LENGTH),
        })
    }

    /// Reconciles the declared schema with the width of the model's head.
    fn fit_schema(schema: Option<LabelSchema>, head_width: usize) -> Result<LabelSchema, ClassifierError> {
        match schema {
            Some(schema) => match schema.num_labels() {
                Some(count) if count != head_width => Err(ClassifierError::SchemaError(format!(
                    "Schema declares {} labels but the model outputs {}",
                    count, head_width
                ))),
                Some(_) => Ok(schema),
                None => LabelSchema::new(Some(head_width), None, schema.mode()),
            },
            None => LabelSchema::with_num_labels(head_width),
        }
    }

    /// Validates that the model has the expected input/output structure
    fn validate_model(session: &Session) -> Result<(), ClassifierError> {
        let inputs = &session.inputs;
        for required in ["input_ids", "attention_mask"] {
            if !inputs.iter().any(|input| input.name == required) {
                return Err(ClassifierError::ModelError(format!(
                    "Model is missing the '{}' input, found {:?}",
                    required,
                    inputs.iter().map(|input| input.name.as_str()).collect::<Vec<_>>()
                )));
            }
        }

        if session.outputs.is_empty() {
            return Err(ClassifierError::ModelError(
                "Model must have at least 1 output for logits".to_string()
            ));
        }

        Ok(())
    }
}
