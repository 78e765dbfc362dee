//! Fetching of model artifacts from the Hugging Face Hub.
//!
//! A model is identified by a repository id plus two filenames: the ONNX
//! model binary and the tag-label CSV. Artifacts are materialized under a
//! local `models/` root and fetched at most once; a file that is already
//! present on disk is never downloaded again.

use std::{
    fs,
    path::{Path, PathBuf},
};

use hf_hub::api::tokio::Api;

use crate::error::{Result, TaggerError};

const MODEL_ROOT: &str = "models";

fn get_file_path(repo_id: &str, file_name: &str) -> PathBuf {
    PathBuf::from(MODEL_ROOT).join(repo_id).join(file_name)
}

/// Downloads `file_name` from `repo_id` into the local model root,
/// skipping the download when the file already exists.
pub async fn get(repo_id: &str, file_name: &str) -> Result<PathBuf> {
    let dest_path = get_file_path(repo_id, file_name);
    if dest_path.exists() {
        return Ok(dest_path);
    }

    if let Some(parent) = dest_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let api = Api::new().map_err(|e| TaggerError::ModelUnavailable(e.to_string()))?;
    let cached = api
        .model(repo_id.to_string())
        .get(file_name)
        .await
        .map_err(|e| {
            TaggerError::ModelUnavailable(format!(
                "failed to download {} from {}: {}",
                file_name, repo_id, e
            ))
        })?;

    fs::copy(&cached, &dest_path)?;
    tracing::info!("fetched {} from {}", file_name, repo_id);

    Ok(dest_path)
}

/// The ONNX model file for tagging.
pub struct TaggerModelFile {
    repo_id: String,
    model_path: String,
}

impl TaggerModelFile {
    pub fn new(repo_id: &str) -> Self {
        Self {
            repo_id: repo_id.to_string(),
            model_path: "model.onnx".to_string(),
        }
    }

    pub async fn get(&self) -> Result<PathBuf> {
        get(&self.repo_id, &self.model_path).await
    }
}

/// CSV file that has the list of tags and their categories.
pub struct TagCSVFile {
    repo_id: String,
    csv_path: String,
}

impl TagCSVFile {
    pub fn new(repo_id: &str) -> Self {
        Self {
            repo_id: repo_id.to_string(),
            csv_path: "selected_tags.csv".to_string(),
        }
    }

    pub async fn get(&self) -> Result<PathBuf> {
        get(&self.repo_id, &self.csv_path).await
    }
}

/// Checks whether a path carries one of the accepted extensions
/// (case-insensitive).
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
