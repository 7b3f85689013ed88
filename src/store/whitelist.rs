use crate::error::StoreError;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One authorized identity, persisted as `{"id", "name", "username"}`.
///
/// `id` may appear on disk as a JSON string or number (the file is sometimes
/// hand-edited); it is normalized to a string on load so membership checks
/// never miss on a type mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub username: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Persisted set of authorized identities.
///
/// The on-disk file is authoritative after the first run; the configured
/// admin list only seeds it when no file exists yet. Every mutation rewrites
/// the full set via temp-file-then-rename so a crash mid-write can never
/// leave a half-written file observable as valid.
#[derive(Debug)]
pub struct WhitelistStore {
    path: PathBuf,
    entries: Vec<WhitelistEntry>,
}

impl WhitelistStore {
    /// Load the whitelist from `path`, or seed it with one entry per admin
    /// on first run. An unreadable or corrupt file is a startup error.
    pub fn load_or_seed(path: impl Into<PathBuf>, admin_ids: &[String]) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| StoreError::Load(format!("{}: {e}", path.display())))?;
            let entries: Vec<WhitelistEntry> = serde_json::from_str(&raw)
                .map_err(|e| StoreError::Load(format!("{}: {e}", path.display())))?;
            return Ok(Self { path, entries });
        }

        let entries: Vec<WhitelistEntry> = admin_ids
            .iter()
            .map(|id| WhitelistEntry {
                id: id.clone(),
                name: "Admin".to_string(),
                username: "Admin".to_string(),
            })
            .collect();
        let store = Self { path, entries };
        store.persist()?;
        Ok(store)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.iter().any(|entry| entry.id == identity)
    }

    /// Append `entry` unless an entry with the same identity already exists,
    /// then persist the full set.
    pub fn add(&mut self, entry: WhitelistEntry) -> Result<()> {
        if self.contains(&entry.id) {
            return Ok(());
        }
        self.entries.push(entry);
        self.persist()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed creating whitelist dir: {}", parent.display()))?;
        }

        let serialized = serde_json::to_string_pretty(&self.entries)?;
        write_atomic(&self.path, &serialized)
    }
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content)
        .with_context(|| format!("failed writing whitelist temp file: {}", temp_path.display()))?;

    if let Err(rename_error) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(rename_error).with_context(|| {
            format!(
                "failed replacing whitelist file atomically: {}",
                path.display()
            )
        });
    }

    Ok(())
}
