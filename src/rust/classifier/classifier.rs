use std::sync::Arc;
use ort::session::Session;
use tokenizers::Tokenizer;

use super::error::ClassifierError;
use super::inference::SequenceLogits;
use super::labels::LabelSchema;
use super::scoring::{score, ScoringBranch, Verdict};

/// A read-only toxicity classifier: tokenizer, ONNX session and the label
/// schema they were trained with.
///
/// Build it once at startup and share it; it is `Send + Sync`, so an
/// `Arc<ToxicityClassifier>` can serve any number of threads.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use toxiscore::ToxicityClassifier;
/// use std::sync::Arc;
/// use std::thread;
///
/// let classifier = Arc::new(
///     ToxicityClassifier::builder()
///         .with_model_dir("best_twitter_roberta")?
///         .build()?,
/// );
///
/// let worker = Arc::clone(&classifier);
/// thread::spawn(move || {
///     let verdict = worker.classify("you are wonderful").unwrap();
///     println!("{} ({:.3})", verdict.label, verdict.toxicity_score);
/// });
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ToxicityClassifier {
    pub model_path: String,
    pub tokenizer_path: String,
    pub tokenizer: Arc<Tokenizer>,
    pub session: Arc<Session>,
    pub schema: LabelSchema,
    pub category_names: Option<Vec<String>>,
    pub max_sequence_length: usize,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<ToxicityClassifier>();
    }
};

impl SequenceLogits for ToxicityClassifier {
    fn tokenizer(&self) -> Option<&Tokenizer> {
        Some(&*self.tokenizer)
    }

    fn session(&self) -> Option<&Session> {
        Some(&*self.session)
    }
}

impl ToxicityClassifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Returns information about the classifier's configuration
    pub fn info(&self) -> super::ClassifierInfo {
        let num_labels = self.schema.num_labels().unwrap_or(0);
        super::ClassifierInfo {
            model_path: self.model_path.clone(),
            tokenizer_path: self.tokenizer_path.clone(),
            num_labels,
            mode: self.schema.mode(),
            branch: ScoringBranch::select(num_labels, self.schema.mode()),
            category_names: self.category_names.clone().unwrap_or_default(),
            max_sequence_length: self.max_sequence_length,
        }
    }

    /// Classifies one comment.
    ///
    /// Input longer than the model's maximum length is truncated.
    ///
    /// # Errors
    /// Tokenizer and model failures, or logits that don't fit the schema.
    pub fn classify(&self, text: &str) -> Result<Verdict, ClassifierError> {
        let logits = self.logits(text)?;
        score(&logits, &self.schema, self.category_names.as_deref())
    }

    /// Number of tokens the model sees for `text`, after truncation.
    pub fn count_tokens(&self, text: &str) -> Result<usize, ClassifierError> {
        SequenceLogits::count_tokens(self, text)
    }
}

/// Anything that can turn a comment into a [`Verdict`].
///
/// The HTTP server and the interactive front end depend on this rather than
/// on [`ToxicityClassifier`] directly.
pub trait Classify: Send + Sync {
    fn classify(&self, text: &str) -> Result<Verdict, ClassifierError>;
}

impl Classify for ToxicityClassifier {
    fn classify(&self, text: &str) -> Result<Verdict, ClassifierError> {
        ToxicityClassifier::classify(self, text)
    }
}
