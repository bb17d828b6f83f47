//! Name -> predictor snapshot, built once from a model directory at startup and
//! shared read-only afterwards.

use crate::error::GatewayError;
use crate::predictor::{ModelLoader, Predictor};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct SkippedModel {
    pub file: PathBuf,
    pub reason: String,
}

/// Outcome of a directory scan: loaded model names in load order, and the files that were skipped.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub skipped: Vec<SkippedModel>,
}

#[derive(Default)]
pub struct ModelRegistry {
    models: HashMap<String, Arc<dyn Predictor>>,
}

impl ModelRegistry {
    pub fn empty() -> Self { Self::default() }

    /// Best-effort scan of `dir`. A missing or unreadable directory yields an empty registry;
    /// a file that fails to load is logged and skipped.
    pub fn populate(dir: &Path, loader: &dyn ModelLoader) -> (Self, LoadReport) {
        let entries = match list_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "model directory unavailable, serving no models");
                return (Self::empty(), LoadReport::default());
            }
        };
        info!(dir = %dir.display(), "loading models from directory");

        let (models, report) = entries.into_iter().fold(
            (HashMap::new(), LoadReport::default()),
            |(mut models, mut report), path| {
                let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                info!(file = %file_name, "checking file");
                if !has_extension(&path, loader.extension()) { return (models, report); }
                match load_one(&path, loader, &models) {
                    Ok((name, predictor)) => {
                        info!(model = %name, path = %path.display(), "loaded model");
                        models.insert(name.clone(), predictor);
                        report.loaded.push(name);
                    }
                    Err(e) => {
                        error!(error = %e, "skipping model file");
                        let reason = match e { GatewayError::Load { reason, .. } => reason, other => other.to_string() };
                        report.skipped.push(SkippedModel { file: path, reason });
                    }
                }
                (models, report)
            },
        );
        if !report.skipped.is_empty() {
            warn!(loaded = report.loaded.len(), skipped = report.skipped.len(), "some model files were not loaded");
        }
        (Self { models }, report)
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Predictor>, GatewayError> {
        self.models.get(name).cloned().ok_or_else(|| GatewayError::NotFound(name.to_string()))
    }

    /// Registered model names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize { self.models.len() }
    pub fn is_empty(&self) -> bool { self.models.is_empty() }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry").field("models", &self.names()).finish()
    }
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, GatewayError> {
    if !dir.is_dir() { return Err(GatewayError::ModelDirMissing(dir.to_path_buf())); }
    let read = std::fs::read_dir(dir).map_err(|e| GatewayError::ModelDirUnreadable { dir: dir.to_path_buf(), source: e })?;
    let mut entries = readable_entries(dir, read.map(|e| e.map(|e| e.path())));
    entries.sort();
    Ok(entries)
}

/// Drops entries that failed to read, logging each one.
fn readable_entries<I>(dir: &Path, entries: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = std::io::Result<PathBuf>>,
{
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory entry");
                None
            }
        })
        .collect()
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.is_file() && path.extension() == Some(OsStr::new(ext))
}

fn load_one(
    path: &Path,
    loader: &dyn ModelLoader,
    loaded: &HashMap<String, Arc<dyn Predictor>>,
) -> Result<(String, Arc<dyn Predictor>), GatewayError> {
    let load_err = |reason: String| GatewayError::Load { file: path.to_path_buf(), reason };
    let name = path
        .file_stem()
        .and_then(OsStr::to_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| load_err("file name is not a valid model name".into()))?
        .to_string();
    if loaded.contains_key(&name) {
        return Err(load_err(format!("duplicate model name '{name}'")));
    }
    let predictor = loader.load(path).map_err(|e| load_err(format!("{e:#}")))?;
    Ok((name, predictor))
}
