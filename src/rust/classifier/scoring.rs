//! Turns raw classifier logits into a [`Verdict`].
//!
//! Three output shapes are supported and selected in this order:
//!
//! 1. a single logit, squashed with a sigmoid;
//! 2. multi-label heads (explicit multi-label mode, or more than two labels
//!    whatever the mode says), one independent sigmoid per label;
//! 3. binary single-label heads, softmax across both logits.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use super::error::ClassifierError;
use super::labels::{ClassificationMode, LabelSchema};
use super::utils::{sigmoid, softmax};

/// Probability above which a class counts as present. The comparison is strict.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Index of the toxic class in a binary head whose names say nothing useful.
const DEFAULT_TOXIC_INDEX: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToxicityLabel {
    Toxic,
    NonToxic,
}

impl ToxicityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Toxic => "toxic",
            Self::NonToxic => "non-toxic",
        }
    }
}

impl fmt::Display for ToxicityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of scoring one comment.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub label: ToxicityLabel,
    /// Probability that the comment is toxic, in `[0, 1]`.
    pub toxicity_score: f64,
    /// Always `1 - toxicity_score`.
    pub non_toxic_confidence: f64,
    /// Category name to presence. Empty when no names could be resolved.
    pub categories: BTreeMap<String, bool>,
}

impl Verdict {
    fn new(is_toxic: bool, toxicity_score: f64, categories: BTreeMap<String, bool>) -> Self {
        Self {
            label: if is_toxic { ToxicityLabel::Toxic } else { ToxicityLabel::NonToxic },
            toxicity_score,
            non_toxic_confidence: 1.0 - toxicity_score,
            categories,
        }
    }

    pub fn is_toxic(&self) -> bool {
        self.label == ToxicityLabel::Toxic
    }

    /// Names of the categories flagged as present, in name order.
    pub fn present_categories(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .filter(|(_, present)| **present)
            .map(|(name, _)| name.as_str())
    }
}

// `probability` is kept next to `toxicity_score` for older clients.
impl Serialize for Verdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Verdict", 5)?;
        state.serialize_field("label", self.label.as_str())?;
        state.serialize_field("probability", &self.toxicity_score)?;
        state.serialize_field("toxicity_score", &self.toxicity_score)?;
        state.serialize_field("non_toxic_confidence", &self.non_toxic_confidence)?;
        state.serialize_field("categories", &self.categories)?;
        state.end()
    }
}

/// Which interpretation applies to a classifier head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringBranch {
    SingleLogit,
    MultiLabel,
    Binary,
}

impl ScoringBranch {
    /// A label count above two always selects [`ScoringBranch::MultiLabel`],
    /// even when the schema claims single-label classification.
    pub fn select(num_labels: usize, mode: ClassificationMode) -> Self {
        if num_labels == 1 {
            Self::SingleLogit
        } else if mode == ClassificationMode::MultiLabel || num_labels > 2 {
            Self::MultiLabel
        } else {
            Self::Binary
        }
    }
}

/// Scores one set of logits against the classifier's schema and resolved
/// category names.
///
/// The label count comes from the schema, or from the logits when the schema
/// has none. Logits and names must both match that count.
pub fn score(
    logits: &[f32],
    schema: &LabelSchema,
    names: Option<&[String]>,
) -> Result<Verdict, ClassifierError> {
    if logits.is_empty() {
        return Err(ClassifierError::ValidationError("classifier produced no logits".into()));
    }
    let num_labels = schema.num_labels().unwrap_or(logits.len());
    if logits.len() != num_labels {
        return Err(ClassifierError::ValidationError(format!(
            "expected {} logits, got {}",
            num_labels,
            logits.len()
        )));
    }
    if let Some(names) = names {
        if names.len() != num_labels {
            return Err(ClassifierError::ValidationError(format!(
                "{} category names for {} labels",
                names.len(),
                num_labels
            )));
        }
    }
    if let Some(bad) = logits.iter().find(|x| !x.is_finite()) {
        return Err(ClassifierError::PredictionError(format!("non-finite logit {}", bad)));
    }

    let logits: Vec<f64> = logits.iter().map(|&x| f64::from(x)).collect();
    let names = names.unwrap_or(&[]);

    let verdict = match ScoringBranch::select(num_labels, schema.mode()) {
        ScoringBranch::SingleLogit => score_single(logits[0], names),
        ScoringBranch::MultiLabel => score_multi_label(&logits, names),
        ScoringBranch::Binary => score_binary(&logits, names),
    };
    Ok(verdict)
}

fn score_single(logit: f64, names: &[String]) -> Verdict {
    let toxicity = sigmoid(logit);
    let is_toxic = toxicity > DECISION_THRESHOLD;
    let categories = names.first().map(|name| (name.clone(), is_toxic)).into_iter().collect();
    Verdict::new(is_toxic, toxicity, categories)
}

fn score_multi_label(logits: &[f64], names: &[String]) -> Verdict {
    let probs: Vec<f64> = logits.iter().map(|&x| sigmoid(x)).collect();
    let toxicity = probs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let is_toxic = probs.iter().any(|&p| p > DECISION_THRESHOLD);
    let categories = names
        .iter()
        .zip(&probs)
        .map(|(name, &p)| (name.clone(), p > DECISION_THRESHOLD))
        .collect();
    Verdict::new(is_toxic, toxicity, categories)
}

fn score_binary(logits: &[f64], names: &[String]) -> Verdict {
    let probs = softmax(logits);
    let toxic_idx = toxic_index(names);
    let toxicity = probs[toxic_idx];
    let is_toxic = toxicity > DECISION_THRESHOLD;
    // Only the toxic class can be flagged; the other one stays false even
    // when it wins.
    let categories = names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i == toxic_idx && is_toxic))
        .collect();
    Verdict::new(is_toxic, toxicity, categories)
}

/// Picks the index of the toxic class in a binary head.
///
/// The first name mentioning "toxic" without a negation in front of it wins,
/// then the first name mentioning "toxic" at all, then index 1.
pub fn toxic_index(names: &[String]) -> usize {
    let lowered: Vec<String> = names.iter().map(|name| name.to_lowercase()).collect();
    lowered
        .iter()
        .position(|name| name.contains("toxic") && !is_negated_toxic(name))
        .or_else(|| lowered.iter().position(|name| name.contains("toxic")))
        .unwrap_or(DEFAULT_TOXIC_INDEX)
}

fn is_negated_toxic(lowered: &str) -> bool {
    let Some(pos) = lowered.find("toxic") else {
        return false;
    };
    let prefix = lowered[..pos].trim_end_matches(|c: char| c == '_' || c == '-' || c.is_whitespace());
    ["non", "not", "no"].iter().any(|neg| prefix.ends_with(neg))
}
