use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A saved text snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    #[serde(default)]
    pub id: u64,
    pub title: String,
    pub text: String,
}

impl Snippet {
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term) || self.text.to_lowercase().contains(&term)
    }
}

/// Display data for a snippet category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub label: String,
    pub color: String,
}

impl Category {
    fn new(label: &str, color: &str) -> Self {
        Self {
            label: label.to_string(),
            color: color.to_string(),
        }
    }
}

/// Snippets keyed by category key.
pub type SnippetBook = BTreeMap<String, Vec<Snippet>>;

/// Categories keyed by category key.
pub type Categories = BTreeMap<String, Category>;

pub fn default_categories() -> Categories {
    [
        ("evaluaciones", "Evaluaciones de Pacientes", "#4CAF50"),
        ("notas", "Notas de Progreso", "#2196F3"),
        ("diagnosticos", "Diagnósticos Comunes", "#FF9800"),
        ("instrucciones", "Instrucciones de Cuidado", "#9C27B0"),
    ]
    .into_iter()
    .map(|(key, label, color)| (key.to_string(), Category::new(label, color)))
    .collect()
}

/// A snippet found by [`search_snippets`], with its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnippetHit {
    pub category: String,
    pub category_label: String,
    pub snippet: Snippet,
}

/// Snippets of known categories whose title or text contains `term`
/// (case-insensitive). An empty term lists everything.
pub fn search_snippets(book: &SnippetBook, categories: &Categories, term: &str) -> Vec<SnippetHit> {
    let term = term.trim();
    categories
        .iter()
        .flat_map(|(key, category)| {
            book.get(key)
                .into_iter()
                .flatten()
                .filter(move |s| term.is_empty() || s.matches(term))
                .map(move |s| SnippetHit {
                    category: key.clone(),
                    category_label: category.label.clone(),
                    snippet: s.clone(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> SnippetBook {
        let json = r#"{
            "notas": [
                {"id": 1, "title": "Stable", "text": "Patient stable, vitals within normal limits."},
                {"id": 2, "title": "Wound", "text": "Dressing changed, no signs of infection."}
            ],
            "orphan": [{"id": 3, "title": "Stable too", "text": "x"}]
        }"#;
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_search_title_and_text() {
        let categories = default_categories();
        let hits = search_snippets(&book(), &categories, "VITALS");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].snippet.id, 1);
        assert_eq!(hits[0].category_label, "Notas de Progreso");

        let hits = search_snippets(&book(), &categories, "wound");
        assert_eq!(hits[0].snippet.title, "Wound");
    }

    #[test]
    fn test_unknown_categories_are_not_listed() {
        let hits = search_snippets(&book(), &default_categories(), "");
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.category == "notas"));
    }
}
