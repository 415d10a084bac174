//! # Template Persistence
//!
//! Templates are saved whole; the last write wins. A template gets its id
//! the first time it is saved.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::document::Template;
use crate::error::ReportCardError;

/// Storage for report card templates.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// All templates, sorted by name.
    async fn list(&self) -> Result<Vec<Template>, ReportCardError>;

    async fn load(&self, id: &str) -> Result<Template, ReportCardError>;

    /// Insert or replace. Returns the stored template with its id set.
    async fn save(&self, template: Template) -> Result<Template, ReportCardError>;

    async fn delete(&self, id: &str) -> Result<(), ReportCardError>;
}

fn assign_id(template: &mut Template) -> String {
    let id = template
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    template.id = Some(id.clone());
    id
}

fn sort_by_name(templates: &mut [Template]) {
    templates.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
}

fn not_found(id: &str) -> ReportCardError {
    ReportCardError::NotFound(format!("template '{}'", id))
}

// ============================================================================
// MEMORY
// ============================================================================

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    templates: RwLock<BTreeMap<String, Template>>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn list(&self) -> Result<Vec<Template>, ReportCardError> {
        let mut templates: Vec<Template> = self.templates.read().await.values().cloned().collect();
        sort_by_name(&mut templates);
        Ok(templates)
    }

    async fn load(&self, id: &str) -> Result<Template, ReportCardError> {
        self.templates
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn save(&self, mut template: Template) -> Result<Template, ReportCardError> {
        let id = assign_id(&mut template);
        self.templates.write().await.insert(id, template.clone());
        Ok(template)
    }

    async fn delete(&self, id: &str) -> Result<(), ReportCardError> {
        self.templates
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }
}

// ============================================================================
// FILES
// ============================================================================

/// One `<id>.json` file per template in a directory.
#[derive(Debug, Clone)]
pub struct FileTemplateStore {
    dir: PathBuf,
}

impl FileTemplateStore {
    /// Open a store, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, ReportCardError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, ReportCardError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ReportCardError::Template(format!("invalid template id '{}'", id)));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }
}

#[async_trait]
impl TemplateStore for FileTemplateStore {
    async fn list(&self) -> Result<Vec<Template>, ReportCardError> {
        let mut templates = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<Template>(&text) {
                Ok(template) => templates.push(template),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable template"),
            }
        }
        sort_by_name(&mut templates);
        Ok(templates)
    }

    async fn load(&self, id: &str) -> Result<Template, ReportCardError> {
        let path = self.path_for(id)?;
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found(id)),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&text)?)
    }

    async fn save(&self, mut template: Template) -> Result<Template, ReportCardError> {
        let id = assign_id(&mut template);
        let path = self.path_for(&id)?;
        let json = serde_json::to_string_pretty(&template)?;
        // Readers never observe a partial file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!(%id, name = %template.name, "template saved");
        Ok(template)
    }

    async fn delete(&self, id: &str) -> Result<(), ReportCardError> {
        let path = self.path_for(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found(id)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn exercise(store: &dyn TemplateStore) {
        let saved = store.save(Template::new("Zeta")).await.unwrap();
        let id = saved.id.clone().unwrap();
        assert!(!id.is_empty());

        let mut other = Template::new("Alpha");
        other.add_element("student_name").unwrap();
        let other = store.save(other).await.unwrap();

        let names: Vec<String> = store.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);

        // resaving keeps the id, last write wins
        let mut renamed = store.load(&id).await.unwrap();
        renamed.name = "Omega".into();
        let renamed = store.save(renamed).await.unwrap();
        assert_eq!(renamed.id.as_deref(), Some(id.as_str()));
        assert_eq!(store.load(&id).await.unwrap().name, "Omega");
        assert_eq!(store.list().await.unwrap().len(), 2);

        let loaded = store.load(other.id.as_deref().unwrap()).await.unwrap();
        assert_eq!(loaded, other);

        store.delete(&id).await.unwrap();
        assert!(matches!(store.load(&id).await, Err(ReportCardError::NotFound(_))));
        assert!(matches!(store.delete(&id).await, Err(ReportCardError::NotFound(_))));
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        exercise(&MemoryTemplateStore::new()).await;
    }

    #[tokio::test]
    async fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTemplateStore::open(dir.path().join("templates")).await.unwrap();
        exercise(&store).await;
    }

    #[tokio::test]
    async fn file_store_rejects_path_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTemplateStore::open(dir.path()).await.unwrap();
        assert!(matches!(
            store.load("../etc/passwd").await,
            Err(ReportCardError::Template(_))
        ));
    }

    #[tokio::test]
    async fn file_store_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        let store = FileTemplateStore::open(dir.path()).await.unwrap();
        store.save(Template::new("Only")).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
