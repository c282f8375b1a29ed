use std::path::{Path, PathBuf};
use std::fs;
use std::io::{self, Write};
use std::sync::Arc;
use std::env;
use tokio::sync::Mutex;
use sha2::{Sha256, Digest};

use crate::models::{ModelInfo, CONFIG_FILE, MODEL_FILE, TOKENIZER_FILE};

/// Directory searched after the configured one, first in the working
/// directory and then next to the executable.
pub const DEFAULT_LOCAL_DIR: &str = "best_twitter_roberta";

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model not downloaded: {0}")]
    NotDownloaded(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("Download of {url} failed with HTTP status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// Keeps downloaded models under a cache directory, one sub-directory per
/// model name, and locates local model directories.
#[derive(Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

/// True when `dir` holds the files needed to build a classifier.
pub fn is_model_dir(dir: &Path) -> bool {
    dir.is_dir() && dir.join(MODEL_FILE).is_file() && dir.join(TOKENIZER_FILE).is_file()
}

/// Local directories to try, in priority order: the configured one, then
/// [`DEFAULT_LOCAL_DIR`] in the working directory, then [`DEFAULT_LOCAL_DIR`]
/// next to the running executable. Duplicates are dropped.
pub fn local_model_candidates(configured: Option<&Path>) -> Vec<PathBuf> {
    let program_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    candidates_from(configured, program_dir.as_deref())
}

fn candidates_from(configured: Option<&Path>, program_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    let defaults = [
        Some(PathBuf::from(DEFAULT_LOCAL_DIR)),
        program_dir.map(|dir| dir.join(DEFAULT_LOCAL_DIR)),
    ];
    for dir in configured.map(Path::to_path_buf).into_iter().chain(defaults.into_iter().flatten()) {
        if !candidates.contains(&dir) {
            candidates.push(dir);
        }
    }
    candidates
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        if let Ok(path) = env::var("TOXISCORE_CACHE") {
            return PathBuf::from(path).join("models");
        }

        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("toxiscore").join("models");
        }

        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("toxiscore").join("models");
        }

        env::temp_dir().join("toxiscore").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn get_model_dir(&self, name: &str) -> PathBuf {
        self.models_dir.join(name)
    }

    pub fn get_model_path(&self, name: &str) -> PathBuf {
        self.get_model_dir(name).join(MODEL_FILE)
    }

    pub fn get_tokenizer_path(&self, name: &str) -> PathBuf {
        self.get_model_dir(name).join(TOKENIZER_FILE)
    }

    pub fn get_config_path(&self, name: &str) -> PathBuf {
        self.get_model_dir(name).join(CONFIG_FILE)
    }

    pub fn is_model_downloaded(&self, name: &str) -> bool {
        let downloaded = is_model_dir(&self.get_model_dir(name));
        log::debug!("Model '{}' downloaded: {}", name, downloaded);
        downloaded
    }

    /// Returns the cached model directory, or `NotDownloaded`.
    pub fn downloaded_model_dir(&self, name: &str) -> Result<PathBuf, ModelError> {
        if self.is_model_downloaded(name) {
            Ok(self.get_model_dir(name))
        } else {
            Err(ModelError::NotDownloaded(name.to_string()))
        }
    }

    /// Fetches the model, tokenizer and (if listed) config files.
    ///
    /// Each file lands in a temporary `.part` file and is renamed into place
    /// once complete. Files already present are kept only when they match a
    /// pinned hash. Any failure removes what was fetched so a half-downloaded
    /// model is never picked up.
    pub async fn download_model(&self, info: &ModelInfo) -> Result<(), ModelError> {
        let _lock = self.download_lock.lock().await;

        let model_dir = self.get_model_dir(&info.name);
        log::info!("Preparing model directory at {:?}", model_dir);
        fs::create_dir_all(&model_dir)?;

        let result = self.fetch_all(info).await;
        match &result {
            Ok(()) => log::info!("Model '{}' ready to use", info.name),
            Err(e) => {
                log::error!("Failed to set up model '{}': {}", info.name, e);
                if let Err(cleanup) = self.remove_download(&info.name) {
                    log::warn!("Cleanup after failed download also failed: {}", cleanup);
                }
            }
        }
        result
    }

    async fn fetch_all(&self, info: &ModelInfo) -> Result<(), ModelError> {
        let model_path = self.get_model_path(&info.name);
        self.fetch_if_needed(&info.model_url, &model_path, info.model_hash.as_deref(), "model").await?;

        let tokenizer_path = self.get_tokenizer_path(&info.name);
        self.fetch_if_needed(&info.tokenizer_url, &tokenizer_path, info.tokenizer_hash.as_deref(), "tokenizer").await?;

        if let Some(config_url) = &info.config_url {
            let config_path = self.get_config_path(&info.name);
            self.fetch_if_needed(config_url, &config_path, None, "config").await?;
        }
        Ok(())
    }

    async fn fetch_if_needed(
        &self,
        url: &str,
        path: &Path,
        expected_hash: Option<&str>,
        file_type: &str,
    ) -> Result<(), ModelError> {
        // Without a pinned hash an existing file may be a leftover from an
        // interrupted download, so it is always fetched again.
        if let Some(hash) = expected_hash {
            if path.exists() {
                if self.verify_file(path, hash)? {
                    log::info!("Existing {} file at {:?} kept", file_type, path);
                    return Ok(());
                }
                log::warn!("{} file at {:?} failed verification, redownloading", file_type, path);
            }
        }
        self.download_and_verify_file(url, path, expected_hash, file_type).await
    }

    fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        let bytes = fs::read(path)?;
        let hash = sha256_hex(&bytes);
        log::debug!("Hash of {:?}: {} (expected {})", path, hash, expected_hash);
        Ok(hash == expected_hash)
    }

    /// Checks that the model files exist and match their pinned hashes.
    /// Files without a pinned hash only need to exist.
    pub fn verify_model(&self, info: &ModelInfo) -> Result<bool, ModelError> {
        let model_path = self.get_model_path(&info.name);
        let tokenizer_path = self.get_tokenizer_path(&info.name);

        if !model_path.exists() || !tokenizer_path.exists() {
            log::info!("Model '{}' is missing files", info.name);
            return Ok(false);
        }

        let model_ok = match &info.model_hash {
            Some(hash) => self.verify_file(&model_path, hash)?,
            None => true,
        };
        let tokenizer_ok = match &info.tokenizer_hash {
            Some(hash) => self.verify_file(&tokenizer_path, hash)?,
            None => true,
        };

        log::info!(
            "Verification of '{}': model {}, tokenizer {}",
            info.name, model_ok, tokenizer_ok
        );
        Ok(model_ok && tokenizer_ok)
    }

    async fn download_and_verify_file(
        &self,
        url: &str,
        path: &Path,
        expected_hash: Option<&str>,
        file_type: &str,
    ) -> Result<(), ModelError> {
        log::info!("Downloading {} file from {} to {:?}", file_type, url, path);
        let response = reqwest::get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ModelError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        let hash = sha256_hex(&bytes);
        match expected_hash {
            Some(expected) if hash != expected => {
                log::error!("{} hash mismatch: expected {}, got {}", file_type, expected, hash);
                return Err(ModelError::HashMismatch {
                    file_type: file_type.to_string(),
                    expected: expected.to_string(),
                    actual: hash,
                });
            }
            Some(_) => {}
            None => log::info!("{} file sha256: {}", file_type, hash),
        }

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        let mut part = tempfile::Builder::new()
            .prefix(&format!(".{}", file_type))
            .suffix(".part")
            .tempfile_in(parent)?;
        part.write_all(&bytes)?;
        part.as_file().sync_all()?;

        if let Some(expected) = expected_hash {
            if !self.verify_file(part.path(), expected)? {
                return Err(ModelError::VerificationFailed);
            }
        }
        part.persist(path).map_err(|e| ModelError::IoError(e.error))?;

        log::info!("{} file saved to {:?}", file_type, path);
        Ok(())
    }

    pub fn remove_download(&self, name: &str) -> Result<(), ModelError> {
        for path in [
            self.get_model_path(name),
            self.get_tokenizer_path(name),
            self.get_config_path(name),
        ] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Ensures that a model is downloaded and verified, returning its directory.
    /// If the model doesn't exist, it will be downloaded.
    /// If verification fails, it will be re-downloaded.
    pub async fn ensure_model_downloaded(&self, info: &ModelInfo) -> Result<PathBuf, ModelError> {
        if !self.is_model_downloaded(&info.name) {
            log::info!("Model '{}' not found in cache, downloading...", info.name);
            self.download_model(info).await?;
        } else if !self.verify_model(info)? {
            log::info!("Model '{}' failed verification, re-downloading...", info.name);
            self.remove_download(&info.name)?;
            self.download_model(info).await?;
        }
        self.downloaded_model_dir(&info.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BuiltinModel;

    fn touch_model(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(MODEL_FILE), b"onnx").unwrap();
        fs::write(dir.join(TOKENIZER_FILE), b"{}").unwrap();
    }

    #[test]
    fn test_model_paths() {
        let tmp = tempfile::TempDir::new().unwrap();
        let manager = ModelManager::new(tmp.path()).unwrap();
        assert!(manager.get_model_path("roberta").ends_with("roberta/model.onnx"));
        assert!(manager.get_tokenizer_path("roberta").ends_with("roberta/tokenizer.json"));
        assert!(manager.get_config_path("roberta").ends_with("roberta/config.json"));
    }

    #[test]
    fn test_download_detection_and_removal() {
        let tmp = tempfile::TempDir::new().unwrap();
        let manager = ModelManager::new(tmp.path()).unwrap();
        assert!(!manager.is_model_downloaded("roberta"));
        assert!(matches!(
            manager.downloaded_model_dir("roberta"),
            Err(ModelError::NotDownloaded(_))
        ));

        touch_model(&manager.get_model_dir("roberta"));
        assert!(manager.is_model_downloaded("roberta"));

        manager.remove_download("roberta").unwrap();
        assert!(!manager.is_model_downloaded("roberta"));
    }

    #[test]
    fn test_verify_model_with_pinned_hash() {
        let tmp = tempfile::TempDir::new().unwrap();
        let manager = ModelManager::new(tmp.path()).unwrap();
        let mut info = ModelInfo::from_hub("pinned", "http://localhost");
        assert!(!manager.verify_model(&info).unwrap());

        touch_model(&manager.get_model_dir("pinned"));
        assert!(manager.verify_model(&info).unwrap());

        info.model_hash = Some(sha256_hex(b"onnx"));
        assert!(manager.verify_model(&info).unwrap());

        info.tokenizer_hash = Some(sha256_hex(b"corrupted"));
        assert!(!manager.verify_model(&info).unwrap());
    }

    #[test]
    fn test_local_candidates_order() {
        let program_dir = Path::new("/usr/local/bin");
        let candidates = candidates_from(Some(Path::new("/opt/models/toxic")), Some(program_dir));
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/opt/models/toxic"),
                PathBuf::from(DEFAULT_LOCAL_DIR),
                program_dir.join(DEFAULT_LOCAL_DIR),
            ]
        );
        assert_eq!(candidates_from(None, None), vec![PathBuf::from(DEFAULT_LOCAL_DIR)]);
        assert_eq!(
            candidates_from(Some(Path::new(DEFAULT_LOCAL_DIR)), None),
            vec![PathBuf::from(DEFAULT_LOCAL_DIR)]
        );
    }

    #[test]
    fn test_local_candidates_include_program_dir() {
        let candidates = local_model_candidates(None);
        assert_eq!(candidates[0], PathBuf::from(DEFAULT_LOCAL_DIR));
        let exe = env::current_exe().unwrap();
        let beside_exe = exe.parent().unwrap().join(DEFAULT_LOCAL_DIR);
        assert_eq!(candidates.last(), Some(&beside_exe));
    }

    #[test]
    fn test_is_model_dir_requires_both_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(!is_model_dir(tmp.path()));
        fs::write(tmp.path().join(MODEL_FILE), b"onnx").unwrap();
        assert!(!is_model_dir(tmp.path()));
        fs::write(tmp.path().join(TOKENIZER_FILE), b"{}").unwrap();
        assert!(is_model_dir(tmp.path()));
    }

    #[tokio::test]
    #[ignore = "downloads the fallback model from the network"]
    async fn test_fallback_download() -> Result<(), ModelError> {
        let tmp = tempfile::TempDir::new()?;
        let manager = ModelManager::new(tmp.path())?;
        let info = BuiltinModel::TwitterRobertaOffensive.get_model_info(None);

        let dir = manager.ensure_model_downloaded(&info).await?;
        assert!(is_model_dir(&dir));
        Ok(())
    }
}
