//! Curated species lists persisted as newline-delimited files
//!
//! Each list lives at `<scripts>/<type>_species_list.txt`. Read-modify-write
//! cycles on one list are serialised by a per-list async mutex; writes
//! replace the file atomically through a sibling temp file.

use bnp_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::info;

/// The four curated lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    Include,
    Exclude,
    Whitelist,
    Confirmed,
}

impl ListType {
    pub const ALL: [ListType; 4] = [
        ListType::Include,
        ListType::Exclude,
        ListType::Whitelist,
        ListType::Confirmed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ListType::Include => "include",
            ListType::Exclude => "exclude",
            ListType::Whitelist => "whitelist",
            ListType::Confirmed => "confirmed",
        }
    }

    fn index(self) -> usize {
        match self {
            ListType::Include => 0,
            ListType::Exclude => 1,
            ListType::Whitelist => 2,
            ListType::Confirmed => 3,
        }
    }

    pub fn file_name(self) -> String {
        format!("{}_species_list.txt", self.as_str())
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ListType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "Invalid list type '{}', expected one of: include, exclude, whitelist, confirmed",
                    s
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListAction {
    Add,
    Remove,
}

/// Body of a list update request
#[derive(Debug, Clone, Deserialize)]
pub struct ListUpdate {
    pub species: String,
    pub action: ListAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListChange {
    pub species: String,
    pub list_type: ListType,
    pub action: ListAction,
    /// False when the list already was in the requested state
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesList {
    pub list_type: ListType,
    pub species: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListMembership {
    pub species: String,
    pub lists: BTreeMap<ListType, bool>,
}

/// The four species lists under one directory
#[derive(Debug)]
pub struct SpeciesLists {
    dir: PathBuf,
    locks: [Mutex<()>; 4],
}

impl SpeciesLists {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Default::default(),
        }
    }

    pub fn path(&self, list_type: ListType) -> PathBuf {
        self.dir.join(list_type.file_name())
    }

    /// Names in file order; a missing file is an empty list
    pub async fn read(&self, list_type: ListType) -> Result<SpeciesList> {
        let species = read_names(&self.path(list_type)).await?;
        Ok(SpeciesList {
            list_type,
            count: species.len(),
            species,
        })
    }

    /// Replace a list's contents
    pub async fn write(&self, list_type: ListType, species: &[String]) -> Result<()> {
        let _guard = self.locks[list_type.index()].lock().await;
        write_names(&self.path(list_type), species).await
    }

    /// Add a name (idempotent); the list is re-sorted ascending
    pub async fn add(&self, list_type: ListType, species: &str) -> Result<ListChange> {
        let species = validate_name(species)?;
        let _guard = self.locks[list_type.index()].lock().await;

        let path = self.path(list_type);
        let mut names = read_names(&path).await?;
        let changed = !names.iter().any(|n| n == species);
        if changed {
            names.push(species.to_string());
            names.sort();
            names.dedup();
            write_names(&path, &names).await?;
            info!(list = %list_type, species = %species, "Added species to list");
        }

        Ok(ListChange {
            species: species.to_string(),
            list_type,
            action: ListAction::Add,
            changed,
        })
    }

    /// Remove a name (idempotent)
    pub async fn remove(&self, list_type: ListType, species: &str) -> Result<ListChange> {
        let species = validate_name(species)?;
        let _guard = self.locks[list_type.index()].lock().await;

        let path = self.path(list_type);
        let mut names = read_names(&path).await?;
        let before = names.len();
        names.retain(|n| n != species);
        let changed = names.len() != before;
        if changed {
            write_names(&path, &names).await?;
            info!(list = %list_type, species = %species, "Removed species from list");
        }

        Ok(ListChange {
            species: species.to_string(),
            list_type,
            action: ListAction::Remove,
            changed,
        })
    }

    pub async fn update(&self, list_type: ListType, update: &ListUpdate) -> Result<ListChange> {
        match update.action {
            ListAction::Add => self.add(list_type, &update.species).await,
            ListAction::Remove => self.remove(list_type, &update.species).await,
        }
    }

    /// Which lists contain `species`
    pub async fn membership(&self, species: &str) -> Result<ListMembership> {
        let mut lists = BTreeMap::new();
        for list_type in ListType::ALL {
            let names = read_names(&self.path(list_type)).await?;
            lists.insert(list_type, names.iter().any(|n| n == species));
        }
        Ok(ListMembership {
            species: species.to_string(),
            lists,
        })
    }
}

fn validate_name(species: &str) -> Result<&str> {
    let trimmed = species.trim();
    if trimmed.is_empty() || trimmed.contains(['\n', '\r']) {
        return Err(Error::InvalidInput("Species name must be a non-empty single line".to_string()));
    }
    Ok(trimmed)
}

async fn read_names(path: &Path) -> Result<Vec<String>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

async fn write_names(path: &Path, names: &[String]) -> Result<()> {
    let mut content = names.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    tokio::fs::write(&temp, content).await?;
    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e.into());
    }
    Ok(())
}
