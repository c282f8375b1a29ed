//! Label schema of a sequence classification checkpoint and the rules that
//! turn it into human-readable category names.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::error::ClassifierError;

/// The six categories of the Jigsaw toxic comment taxonomy, in id order.
pub const JIGSAW_LABELS: [&str; 6] = [
    "toxic",
    "severe_toxic",
    "obscene",
    "threat",
    "insult",
    "identity_hate",
];

/// Names used for a two-way checkpoint that ships no meaningful labels.
pub const BINARY_LABELS: [&str; 2] = ["non_toxic", "toxic"];

/// How the checkpoint was trained to interpret its outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassificationMode {
    /// Every label is independent (sigmoid per label).
    MultiLabel,
    /// Exactly one label applies (softmax across labels).
    SingleLabel,
    /// The checkpoint does not say.
    #[default]
    Unspecified,
}

impl ClassificationMode {
    /// Maps a Hugging Face `problem_type` string onto a mode.
    pub fn from_problem_type(problem_type: Option<&str>) -> Self {
        match problem_type {
            Some("multi_label_classification") => Self::MultiLabel,
            Some("single_label_classification") => Self::SingleLabel,
            _ => Self::Unspecified,
        }
    }
}

/// Label metadata of a classifier, fixed at load time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelSchema {
    num_labels: Option<usize>,
    id2label: Option<Vec<String>>,
    mode: ClassificationMode,
}

#[derive(Deserialize)]
struct RawModelConfig {
    #[serde(default)]
    id2label: Option<BTreeMap<String, String>>,
    #[serde(default)]
    num_labels: Option<usize>,
    #[serde(default)]
    problem_type: Option<String>,
}

impl LabelSchema {
    /// Builds a schema, checking that the label count and names agree.
    ///
    /// When only names are given the count is taken from them.
    pub fn new(
        num_labels: Option<usize>,
        id2label: Option<Vec<String>>,
        mode: ClassificationMode,
    ) -> Result<Self, ClassifierError> {
        if num_labels == Some(0) {
            return Err(ClassifierError::SchemaError("label count must be positive".into()));
        }
        let id2label = id2label.filter(|names| !names.is_empty());
        let num_labels = match (num_labels, &id2label) {
            (Some(count), Some(names)) if count != names.len() => {
                return Err(ClassifierError::SchemaError(format!(
                    "label count {} does not match {} label names",
                    count,
                    names.len()
                )));
            }
            (Some(count), _) => Some(count),
            (None, Some(names)) => Some(names.len()),
            (None, None) => None,
        };
        Ok(Self { num_labels, id2label, mode })
    }

    /// Schema for a model whose only known property is its output width.
    pub fn with_num_labels(num_labels: usize) -> Result<Self, ClassifierError> {
        Self::new(Some(num_labels), None, ClassificationMode::Unspecified)
    }

    /// Parses the label section of a Hugging Face `config.json`.
    ///
    /// `id2label` keys are numeric ids serialized as strings; they are ordered
    /// numerically, so `"10"` sorts after `"9"`.
    pub fn from_config_json(json: &str) -> Result<Self, ClassifierError> {
        let raw: RawModelConfig = serde_json::from_str(json)?;

        let id2label = match raw.id2label {
            Some(map) => {
                let mut entries = Vec::with_capacity(map.len());
                for (key, name) in map {
                    let id: usize = key.parse().map_err(|_| {
                        ClassifierError::SchemaError(format!("id2label key '{}' is not an integer", key))
                    })?;
                    entries.push((id, name));
                }
                entries.sort_by_key(|(id, _)| *id);
                Some(entries.into_iter().map(|(_, name)| name).collect::<Vec<_>>())
            }
            None => None,
        };

        Self::new(
            raw.num_labels,
            id2label,
            ClassificationMode::from_problem_type(raw.problem_type.as_deref()),
        )
    }

    /// Reads and parses a `config.json` file.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::SchemaError(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_config_json(&json)
    }

    pub fn num_labels(&self) -> Option<usize> {
        self.num_labels
    }

    pub fn id2label(&self) -> Option<&[String]> {
        self.id2label.as_deref()
    }

    pub fn mode(&self) -> ClassificationMode {
        self.mode
    }
}

/// True for generic `LABEL_<n>` names that carry no meaning.
pub fn is_placeholder(name: &str) -> bool {
    name.to_lowercase().starts_with("label_")
}

/// Derives category names from the schema.
///
/// Precedence:
/// 1. six placeholder names are replaced by [`JIGSAW_LABELS`];
/// 2. names that are not all placeholders are used verbatim;
/// 3. otherwise the label count decides (2 binary, 1 toxic, 6 Jigsaw,
///    anything else `LABEL_<n>`).
///
/// Returns `None` when the schema has neither names nor a count.
pub fn resolve_label_names(schema: &LabelSchema) -> Option<Vec<String>> {
    if let Some(names) = schema.id2label() {
        let all_placeholders = names.iter().all(|name| is_placeholder(name));
        if names.len() == JIGSAW_LABELS.len() && all_placeholders {
            return Some(owned(&JIGSAW_LABELS));
        }
        if !all_placeholders {
            return Some(names.to_vec());
        }
    }

    let names = match schema.num_labels()? {
        1 => vec!["toxic".to_string()],
        2 => owned(&BINARY_LABELS),
        6 => owned(&JIGSAW_LABELS),
        n => (0..n).map(|i| format!("LABEL_{}", i)).collect(),
    };
    Some(names)
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}
