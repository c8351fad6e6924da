//! Artifact loading: the seam between the reload machinery and whatever
//! deserializes the model.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default name of the feature-list file that sits next to the artifact.
pub const DEFAULT_FEATURES_FILENAME: &str = "model_features.json";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Model file not found: {0}")]
    NotFound(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Invalid model format: {0}")]
    Corrupt(String),

    #[error("Invalid feature schema: {0}")]
    Schema(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl LoadError {
    /// Classify an I/O failure on `path`.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(err),
        }
    }
}

/// What a loader hands back: the model and the features it expects.
#[derive(Debug)]
pub struct LoadedArtifact<M> {
    pub model: M,
    pub features: Vec<String>,
}

/// Deserializes a model artifact from disk.
///
/// Called on a blocking thread, possibly many times over the process
/// lifetime. Must not leave global state behind on failure.
pub trait ArtifactLoader<M>: Send + Sync {
    fn load(&self, path: &Path) -> Result<LoadedArtifact<M>, LoadError>;
}

impl<M, F> ArtifactLoader<M> for F
where
    F: Fn(&Path) -> Result<LoadedArtifact<M>, LoadError> + Send + Sync,
{
    fn load(&self, path: &Path) -> Result<LoadedArtifact<M>, LoadError> {
        self(path)
    }
}

/// Linear regression model stored as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    /// Predict from a row ordered like the feature schema.
    /// Returns `None` when the row width does not match.
    pub fn predict(&self, row: &[f64]) -> Option<f64> {
        if row.len() != self.coefficients.len() {
            return None;
        }
        let dot: f64 = self.coefficients.iter().zip(row).map(|(c, x)| c * x).sum();
        Some(self.intercept + dot)
    }
}

/// Loads a [`LinearModel`] and its sibling feature-list file.
#[derive(Debug, Clone)]
pub struct JsonModelLoader {
    features_filename: String,
}

impl JsonModelLoader {
    pub fn new(features_filename: impl Into<String>) -> Self {
        Self { features_filename: features_filename.into() }
    }

    fn features_path(&self, model_path: &Path) -> PathBuf {
        model_path.with_file_name(&self.features_filename)
    }
}

impl Default for JsonModelLoader {
    fn default() -> Self {
        Self::new(DEFAULT_FEATURES_FILENAME)
    }
}

impl ArtifactLoader<LinearModel> for JsonModelLoader {
    fn load(&self, path: &Path) -> Result<LoadedArtifact<LinearModel>, LoadError> {
        let bytes = std::fs::read(path).map_err(|e| LoadError::from_io(path, e))?;
        let model: LinearModel =
            serde_json::from_slice(&bytes).map_err(|e| LoadError::Corrupt(e.to_string()))?;

        let features_path = self.features_path(path);
        let raw = std::fs::read(&features_path).map_err(|e| LoadError::from_io(&features_path, e))?;
        let features: Vec<String> = serde_json::from_slice(&raw)
            .map_err(|e| LoadError::Schema(format!("{}: {}", features_path.display(), e)))?;

        if model.coefficients.len() != features.len() {
            return Err(LoadError::Schema(format!(
                "model has {} coefficients but {} features are listed",
                model.coefficients.len(),
                features.len()
            )));
        }

        Ok(LoadedArtifact { model, features })
    }
}
