//! # Tab Templates
//!
//! Custom detail-view tabs are liquid files named either `<Type>.<Tab>.liquid`
//! (only for instances of that orchestrator or entity type) or `<Tab>.liquid`
//! (for every type). They come from `<folder>/tab-templates` when a local
//! folder is configured, otherwise from the storage template listing.
//!
//! The catalog is loaded on first use and kept for the life of the
//! [`TabTemplates`] handle. A failed load logs a warning and leaves the
//! catalog empty; templates are never required to display an instance.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::{MonitorError, Result};
use crate::storage::DurableStorage;

pub const TEMPLATE_EXTENSION: &str = ".liquid";
pub const TEMPLATE_SUBFOLDER: &str = "tab-templates";

#[derive(Clone)]
pub enum TemplateSource {
    Folder(PathBuf),
    Storage(Arc<dyn DurableStorage>),
    None,
}

impl std::fmt::Debug for TemplateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateSource::Folder(path) => f.debug_tuple("Folder").field(path).finish(),
            TemplateSource::Storage(_) => f.write_str("Storage"),
            TemplateSource::None => f.write_str("None"),
        }
    }
}

/// Tab names by type, plus the tabs shared by all types
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateCatalog {
    by_type: HashMap<String, BTreeSet<String>>,
    global: BTreeSet<String>,
}

impl TemplateCatalog {
    pub fn from_file_names<I, S>(file_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut catalog = Self::default();
        for file_name in file_names {
            catalog.insert(file_name.as_ref());
        }
        catalog
    }

    fn insert(&mut self, file_name: &str) {
        let file_name = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_name);
        let Some(stem) = strip_extension(file_name) else {
            return;
        };

        match stem.split_once('.') {
            Some((type_name, tab_name)) if !type_name.is_empty() && !tab_name.is_empty() => {
                self.by_type
                    .entry(type_name.to_string())
                    .or_default()
                    .insert(tab_name.to_string());
            }
            Some(_) => {}
            None if !stem.is_empty() => {
                self.global.insert(stem.to_string());
            }
            None => {}
        }
    }

    /// Shared tabs plus those of `type_name`, sorted and without duplicates
    pub fn names_for(&self, type_name: &str) -> Vec<String> {
        let mut names: BTreeSet<&String> = self.global.iter().collect();
        if let Some(specific) = self.by_type.get(type_name) {
            names.extend(specific.iter());
        }
        names.into_iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty() && self.global.is_empty()
    }
}

fn strip_extension(file_name: &str) -> Option<&str> {
    let split = file_name.len().checked_sub(TEMPLATE_EXTENSION.len())?;
    let (stem, extension) = (file_name.get(..split)?, file_name.get(split..)?);
    extension
        .eq_ignore_ascii_case(TEMPLATE_EXTENSION)
        .then_some(stem)
}

#[derive(Debug)]
pub struct TabTemplates {
    source: TemplateSource,
    catalog: OnceCell<TemplateCatalog>,
}

impl TabTemplates {
    pub fn new(source: TemplateSource) -> Self {
        Self {
            source,
            catalog: OnceCell::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::new(TemplateSource::None)
    }

    pub async fn catalog(&self) -> &TemplateCatalog {
        self.catalog
            .get_or_init(|| async {
                match self.load().await {
                    Ok(catalog) => {
                        debug!(source = ?self.source, empty = catalog.is_empty(), "Loaded tab templates");
                        catalog
                    }
                    Err(e) => {
                        warn!(source = ?self.source, error = %e, "Failed to load tab templates");
                        TemplateCatalog::default()
                    }
                }
            })
            .await
    }

    pub async fn names_for(&self, type_name: &str) -> Vec<String> {
        self.catalog().await.names_for(type_name)
    }

    async fn load(&self) -> Result<TemplateCatalog> {
        match &self.source {
            TemplateSource::Folder(folder) => {
                let directory = folder.join(TEMPLATE_SUBFOLDER);
                if !tokio::fs::try_exists(&directory).await.unwrap_or(false) {
                    return Ok(TemplateCatalog::default());
                }

                let mut entries = tokio::fs::read_dir(&directory).await.map_err(|e| {
                    MonitorError::storage(format!("Cannot read {}: {e}", directory.display()))
                })?;
                let mut file_names = Vec::new();
                while let Some(entry) = entries
                    .next_entry()
                    .await
                    .map_err(|e| MonitorError::storage(e.to_string()))?
                {
                    if let Some(name) = entry.file_name().to_str() {
                        file_names.push(name.to_string());
                    }
                }
                Ok(TemplateCatalog::from_file_names(file_names))
            }
            TemplateSource::Storage(storage) => Ok(TemplateCatalog::from_file_names(
                storage.list_template_blobs().await?,
            )),
            TemplateSource::None => Ok(TemplateCatalog::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;

    #[test]
    fn test_catalog_merges_specific_and_global() {
        let catalog = TemplateCatalog::from_file_names([
            "Orders.Summary.liquid",
            "Orders.Audit.LIQUID",
            "Details.liquid",
            "Audit.liquid",
            "notes.txt",
            ".liquid",
        ]);

        assert_eq!(catalog.names_for("Orders"), vec!["Audit", "Details", "Summary"]);
        assert_eq!(catalog.names_for("Billing"), vec!["Audit", "Details"]);
        assert!(!catalog.is_empty());
    }

    #[tokio::test]
    async fn test_loads_from_folder_once() {
        let dir = tempfile::tempdir().unwrap();
        let templates_dir = dir.path().join(TEMPLATE_SUBFOLDER);
        std::fs::create_dir(&templates_dir).unwrap();
        std::fs::write(templates_dir.join("counter.State.liquid"), "{{ input }}").unwrap();

        let templates = TabTemplates::new(TemplateSource::Folder(dir.path().to_path_buf()));
        assert_eq!(templates.names_for("counter").await, vec!["State"]);

        // Cached for the life of the handle
        std::fs::write(templates_dir.join("Late.liquid"), "").unwrap();
        assert_eq!(templates.names_for("counter").await, vec!["State"]);
    }

    #[tokio::test]
    async fn test_storage_failure_yields_empty_catalog() {
        let storage = Arc::new(InMemoryStorage::new());
        storage.add_template("Orch.Graph.liquid");
        storage.set_template_failure(true);

        let templates = TabTemplates::new(TemplateSource::Storage(storage));
        assert!(templates.names_for("Orch").await.is_empty());
    }

    #[tokio::test]
    async fn test_loads_from_storage() {
        let storage = Arc::new(InMemoryStorage::new());
        storage.add_template("Orch.Graph.liquid");
        let templates = TabTemplates::new(TemplateSource::Storage(storage));
        assert_eq!(templates.names_for("Orch").await, vec!["Graph"]);
        assert!(TabTemplates::disabled().names_for("Orch").await.is_empty());
    }
}
