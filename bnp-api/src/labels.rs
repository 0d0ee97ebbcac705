//! Installed classifier models and localized species labels
//!
//! Layout under the model directory:
//! - `<model>.tflite` for each installed model
//! - `<model>_Labels.txt` with one `Sci_Name` or `Sci_Name_Common Name` per line
//! - `l18n/labels_<lang>.json` mapping scientific to common names

use bnp_common::{Error, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::artifacts::is_safe_component;

const MODEL_EXTENSION: &str = ".tflite";
const LANGUAGE_PREFIX: &str = "labels_";
const LANGUAGE_SUFFIX: &str = ".json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelEntry {
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelList {
    pub models: Vec<ModelEntry>,
    pub current: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageEntry {
    pub code: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageList {
    pub languages: Vec<LanguageEntry>,
    pub current: String,
}

/// Every label of a model, translated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSet {
    pub language: String,
    pub count: usize,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesLabel {
    pub sci_name: String,
    pub com_name: String,
    pub language: String,
}

/// Read-only view over the model directory
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    dir: PathBuf,
}

impl ModelCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn l18n_dir(&self) -> PathBuf {
        self.dir.join("l18n")
    }

    /// Installed `.tflite` models by name, flagging `current`
    pub async fn models(&self, current: &str) -> Result<ModelList> {
        let mut names: Vec<String> = file_names(&self.dir)
            .await?
            .into_iter()
            .filter_map(|name| name.strip_suffix(MODEL_EXTENSION).map(str::to_string))
            .collect();
        names.sort();

        Ok(ModelList {
            models: names
                .into_iter()
                .map(|name| ModelEntry {
                    active: name == current,
                    name,
                })
                .collect(),
            current: current.to_string(),
        })
    }

    /// Label languages available under `l18n/`, sorted by code
    pub async fn languages(&self, current: &str) -> Result<LanguageList> {
        let mut codes: Vec<String> = file_names(&self.l18n_dir())
            .await?
            .into_iter()
            .filter_map(|name| {
                name.strip_prefix(LANGUAGE_PREFIX)
                    .and_then(|rest| rest.strip_suffix(LANGUAGE_SUFFIX))
                    .filter(|code| !code.is_empty())
                    .map(str::to_string)
            })
            .collect();
        codes.sort();

        Ok(LanguageList {
            languages: codes
                .into_iter()
                .map(|code| LanguageEntry {
                    active: code == current,
                    code,
                })
                .collect(),
            current: current.to_string(),
        })
    }

    /// Scientific → common name table for `language`
    pub async fn translations(&self, language: &str) -> Result<HashMap<String, String>> {
        let file = format!("{}{}{}", LANGUAGE_PREFIX, language, LANGUAGE_SUFFIX);
        if !is_safe_component(&file) {
            return Err(Error::InvalidInput(format!("Invalid language code: {}", language)));
        }

        let path = self.l18n_dir().join(file);
        let content = read_or_not_found(&path, &format!("No labels for language: {}", language)).await?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Internal(format!("Invalid label file {}: {}", path.display(), e)))
    }

    /// Scientific names the model can report, in file order
    pub async fn model_labels(&self, model: &str) -> Result<Vec<String>> {
        let file = format!("{}_Labels.txt", model);
        if !is_safe_component(&file) {
            return Err(Error::InvalidInput(format!("Invalid model name: {}", model)));
        }

        let path = self.dir.join(file);
        let content = read_or_not_found(&path, &format!("No labels for model: {}", model)).await?;
        Ok(parse_model_labels(&content))
    }

    /// Every model label with its common name in `language`
    ///
    /// Names missing from the translation table fall back to the scientific name.
    pub async fn label_set(&self, model: &str, language: &str) -> Result<LabelSet> {
        let translations = self.translations(language).await?;
        let labels: BTreeMap<String, String> = self
            .model_labels(model)
            .await?
            .into_iter()
            .map(|sci_name| {
                let com_name = translations
                    .get(&sci_name)
                    .cloned()
                    .unwrap_or_else(|| sci_name.clone());
                (sci_name, com_name)
            })
            .collect();

        debug!(model = %model, language = %language, count = labels.len(), "Built label set");
        Ok(LabelSet {
            language: language.to_string(),
            count: labels.len(),
            labels,
        })
    }

    /// Common name of one species in `language`
    pub async fn label(&self, sci_name: &str, language: &str) -> Result<SpeciesLabel> {
        let translations = self.translations(language).await?;
        Ok(SpeciesLabel {
            sci_name: sci_name.to_string(),
            com_name: translations
                .get(sci_name)
                .cloned()
                .unwrap_or_else(|| sci_name.to_string()),
            language: language.to_string(),
        })
    }
}

/// Model label lines, reduced to the scientific name
///
/// Files whose first line has exactly one `_` use `Sci_Name_Common Name`
/// lines; the suffix from the `_` on is dropped.
fn parse_model_labels(content: &str) -> Vec<String> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let combined = lines.first().is_some_and(|line| line.matches('_').count() == 1);
    lines
        .into_iter()
        .map(|line| match line.split_once('_') {
            Some((sci_name, _)) if combined => sci_name.to_string(),
            _ => line.to_string(),
        })
        .collect()
}

async fn file_names(dir: &Path) -> Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::Unavailable(format!(
                "Model directory not found: {}",
                dir.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

async fn read_or_not_found(path: &Path, message: &str) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(message.to_string())),
        Err(e) => Err(e.into()),
    }
}
