//! Picks the model a process serves with.
//!
//! Sources are tried in order: the configured directory, the default local
//! directory (working directory, then beside the executable), then the fallback model from the download cache (fetched on
//! first use unless running offline). A local directory that fails to load
//! is logged and skipped.

use std::path::Path;

use log::{info, warn};

use crate::classifier::{ClassifierBuilder, ClassifierError, ToxicityClassifier};
use crate::config::Config;
use crate::model_manager::{is_model_dir, local_model_candidates, ModelManager};
use crate::models::BuiltinModel;

/// Builds a classifier from a model directory using the configured runtime
/// and truncation settings.
pub fn load_from_dir(dir: &Path, config: &Config) -> Result<ToxicityClassifier, ClassifierError> {
    ClassifierBuilder::new()
        .with_runtime_config(config.runtime.clone())
        .with_max_sequence_length(config.max_sequence_length)
        .with_model_dir(dir)?
        .build()
}

/// Loads the first local model that works, if any.
pub fn load_local(config: &Config) -> Option<ToxicityClassifier> {
    for dir in local_model_candidates(config.model_dir.as_deref()) {
        if !is_model_dir(&dir) {
            info!("No model found in {:?}", dir);
            continue;
        }
        match load_from_dir(&dir, config) {
            Ok(classifier) => {
                info!("Loaded local model from {:?}", dir);
                return Some(classifier);
            }
            Err(e) => warn!("Could not load model from {:?}: {}", dir, e),
        }
    }
    None
}

pub fn model_manager(config: &Config) -> Result<ModelManager, ClassifierError> {
    let manager = match &config.cache_dir {
        Some(dir) => ModelManager::new(dir),
        None => ModelManager::new_default(),
    };
    manager.map_err(|e| ClassifierError::BuildError(format!("Failed to create model manager: {}", e)))
}

/// Resolves and loads the classifier for this process.
pub async fn load_classifier(config: &Config) -> Result<ToxicityClassifier, ClassifierError> {
    if let Some(classifier) = load_local(config) {
        return Ok(classifier);
    }

    let model = BuiltinModel::default();
    let info = model.get_model_info(config.fallback_url.as_deref());
    let manager = model_manager(config)?;
    let dir = if config.offline {
        manager.downloaded_model_dir(&info.name)?
    } else {
        info!("Falling back to {}", model.repo_id());
        manager.ensure_model_downloaded(&info).await.map_err(|e| {
            ClassifierError::BuildError(format!(
                "Failed to fetch fallback model from {}: {}. Set TOXISCORE_FALLBACK_URL to a \
                 location serving onnx/model.onnx and tokenizer.json, or TOXIC_MODEL_LOCAL_DIR \
                 to a local export",
                info.model_url, e
            ))
        })?
    };
    load_from_dir(&dir, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_without_models_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config {
            model_dir: Some(tmp.path().join("missing")),
            cache_dir: Some(tmp.path().join("cache")),
            offline: true,
            ..Config::default()
        };
        let result = load_classifier(&config).await;
        assert!(matches!(result, Err(ClassifierError::BuildError(msg)) if msg.contains("not downloaded")));
    }

    #[tokio::test]
    async fn test_failed_fallback_names_the_override() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config {
            model_dir: Some(tmp.path().join("missing")),
            cache_dir: Some(tmp.path().join("cache")),
            fallback_url: Some("http://127.0.0.1:9/unreachable".to_string()),
            ..Config::default()
        };
        let result = load_classifier(&config).await;
        assert!(matches!(
            result,
            Err(ClassifierError::BuildError(msg))
                if msg.contains("http://127.0.0.1:9/unreachable/onnx/model.onnx")
                    && msg.contains("TOXISCORE_FALLBACK_URL")
        ));
    }

    #[test]
    fn test_broken_local_model_is_skipped() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("model.onnx"), b"garbage").unwrap();
        std::fs::write(tmp.path().join("tokenizer.json"), b"garbage").unwrap();
        let config = Config {
            model_dir: Some(tmp.path().to_path_buf()),
            ..Config::default()
        };
        assert!(load_local(&config).is_none());
    }
}
