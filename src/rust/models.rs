//! Catalogue of remote checkpoints used when no local model is available.

/// File names every model directory is expected to contain.
pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
/// Optional; carries `id2label`, `num_labels` and `problem_type`.
pub const CONFIG_FILE: &str = "config.json";

/// Represents the built-in fallback models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuiltinModel {
    /// ONNX export of `cardiffnlp/twitter-roberta-base-offensive`
    ///
    /// Binary head (not-offensive / offensive), 512 tokens, about 500MB.
    #[default]
    TwitterRobertaOffensive,
}

/// Where to fetch a model from and how to check what was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    pub model_url: String,
    pub tokenizer_url: String,
    pub config_url: Option<String>,
    /// Expected SHA-256 of the model file, when pinned.
    pub model_hash: Option<String>,
    /// Expected SHA-256 of the tokenizer file, when pinned.
    pub tokenizer_hash: Option<String>,
}

impl ModelInfo {
    /// Describes a Hugging Face repository laid out with an `onnx/` export
    /// next to the tokenizer and config.
    pub fn from_hub(name: impl Into<String>, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            name: name.into(),
            model_url: format!("{}/onnx/{}", base, MODEL_FILE),
            tokenizer_url: format!("{}/{}", base, TOKENIZER_FILE),
            config_url: Some(format!("{}/{}", base, CONFIG_FILE)),
            model_hash: None,
            tokenizer_hash: None,
        }
    }
}

impl BuiltinModel {
    pub fn repo_id(&self) -> &'static str {
        match self {
            Self::TwitterRobertaOffensive => "cardiffnlp/twitter-roberta-base-offensive",
        }
    }

    /// Download information, fetched from the Hugging Face hub unless
    /// `base_url` points somewhere else.
    pub fn get_model_info(&self, base_url: Option<&str>) -> ModelInfo {
        let default_base = format!("https://huggingface.co/{}/resolve/main", self.repo_id());
        let name = self.repo_id().replace('/', "--");
        ModelInfo::from_hub(name, base_url.unwrap_or(&default_base))
    }
}
