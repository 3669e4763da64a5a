//! # vitals-store
//!
//! Asynchronous key-value storage for vitals templates, saved text snippets and
//! snippet categories. Values live under three named collections and are read
//! and written whole; a `set` replaces the collection atomically.
//!
//! ```rust,no_run
//! use vitals_store::{JsonFileStore, Store};
//!
//! # #[tokio::main]
//! # async fn main() -> vitals_store::Result<()> {
//! let store = JsonFileStore::open("vitals.json").await?;
//! for template in vitals_store::load_templates(&store).await? {
//!     println!("{}", template.name);
//! }
//! # Ok(())
//! # }
//! ```

mod file;
mod memory;
mod models;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use vitals_engine::Template;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use models::{
    default_categories, search_snippets, Categories, Category, Snippet, SnippetBook, SnippetHit,
};

/// Collection holding the vitals templates.
pub const TEMPLATES_KEY: &str = "formTemplates";
/// Collection holding saved snippets, grouped by category key.
pub const SNIPPETS_KEY: &str = "savedTexts";
/// Collection holding category definitions.
pub const CATEGORIES_KEY: &str = "customCategories";

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A keyed store of JSON collections.
#[async_trait]
pub trait Store: Send + Sync {
    /// Value stored under `key`, or `None` if it was never set.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the value under `key`.
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Typed read of a collection, falling back to `default` when it is unset.
pub async fn get_or<S, T>(store: &S, key: &str, default: T) -> Result<T>
where
    S: Store + ?Sized,
    T: DeserializeOwned,
{
    match store.get(key).await? {
        Some(Value::Null) | None => Ok(default),
        Some(value) => Ok(serde_json::from_value(value)?),
    }
}

/// Typed write of a collection.
pub async fn put<S, T>(store: &S, key: &str, value: &T) -> Result<()>
where
    S: Store + ?Sized,
    T: Serialize + Sync,
{
    store.set(key, serde_json::to_value(value)?).await
}

pub async fn load_templates<S: Store + ?Sized>(store: &S) -> Result<Vec<Template>> {
    get_or(store, TEMPLATES_KEY, Vec::new()).await
}

pub async fn load_snippets<S: Store + ?Sized>(store: &S) -> Result<SnippetBook> {
    get_or(store, SNIPPETS_KEY, SnippetBook::new()).await
}

/// Stored categories, or the built-in set when none were saved.
pub async fn load_categories<S: Store + ?Sized>(store: &S) -> Result<Categories> {
    get_or(store, CATEGORIES_KEY, default_categories()).await
}

/// Template with the given name, matched exactly, then case-insensitively.
pub async fn find_template<S: Store + ?Sized>(store: &S, name: &str) -> Result<Option<Template>> {
    let templates = load_templates(store).await?;
    let exact = templates.iter().position(|t| t.name == name);
    let index = exact.or_else(|| {
        templates
            .iter()
            .position(|t| t.name.eq_ignore_ascii_case(name))
    });
    Ok(index.map(|i| templates[i].clone()))
}

/// Replace the template with the same id, or append it.
///
/// Reads and writes the whole collection without a lock held in between, so
/// callers must be the store's only writer.
pub async fn upsert_template<S: Store + ?Sized>(store: &S, template: Template) -> Result<()> {
    let mut templates = load_templates(store).await?;
    match templates.iter_mut().find(|t| t.id == template.id) {
        Some(existing) => {
            debug!("updating template {} ({})", template.id, template.name);
            *existing = template;
        }
        None => {
            debug!("adding template {} ({})", template.id, template.name);
            templates.push(template);
        }
    }
    put(store, TEMPLATES_KEY, &templates).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitals_engine::VitalField;

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let store = MemoryStore::new();
        assert!(load_templates(&store).await.unwrap().is_empty());
        assert!(load_snippets(&store).await.unwrap().is_empty());
        let categories = load_categories(&store).await.unwrap();
        assert_eq!(categories.len(), 4);
        assert_eq!(categories["notas"].label, "Notas de Progreso");
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = MemoryStore::new();
        let template = Template::new(7, "Baseline").with(VitalField::Temperature, "98.6");
        upsert_template(&store, template.clone()).await.unwrap();
        upsert_template(&store, Template::new(8, "Other")).await.unwrap();

        let edited = template.with(VitalField::Temperature, "99.1");
        upsert_template(&store, edited).await.unwrap();

        let templates = load_templates(&store).await.unwrap();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].value(VitalField::Temperature), "99.1");
    }

    #[tokio::test]
    async fn test_find_template_by_name() {
        let store = MemoryStore::new();
        upsert_template(&store, Template::new(1, "Morning")).await.unwrap();
        upsert_template(&store, Template::new(2, "morning")).await.unwrap();
        let found = find_template(&store, "morning").await.unwrap().unwrap();
        assert_eq!(found.id, 2);
        let found = find_template(&store, "MORNING").await.unwrap().unwrap();
        assert_eq!(found.id, 1);
        assert!(find_template(&store, "evening").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_null_reads_as_default() {
        let store = MemoryStore::new();
        store.set(TEMPLATES_KEY, Value::Null).await.unwrap();
        assert!(load_templates(&store).await.unwrap().is_empty());
    }
}
