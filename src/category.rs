//! Category model and referential-integrity rules.
//!
//! Tasks reference categories by name, not by id. Deleting a category never
//! cascades: orphaned tasks keep their stale category string and resolve as
//! [`UNCATEGORIZED`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::Document;

/// Display name for tasks whose category reference is empty or dangling.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Color used when a category reference cannot be resolved.
pub const DEFAULT_COLOR: &str = "#6b7280";

/// A category as mirrored from the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(skip)]
    pub id: String,
    /// Trimmed, case-insensitively unique within the owning user's set.
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    /// Slug derived from `name`; recomputed on every rename.
    #[serde(default)]
    pub link: String,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl Category {
    pub fn from_document(doc: &Document) -> Result<Self> {
        let mut category: Category =
            serde_json::from_value(doc.fields.clone()).map_err(|source| {
                Error::MalformedDocument {
                    id: doc.id.clone(),
                    source,
                }
            })?;
        category.id = doc.id.clone();
        Ok(category)
    }

    pub fn to_fields(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Resolve a task's category reference against a snapshot. Empty and
/// dangling references both come back `None`.
pub fn resolve<'a>(categories: &'a [Category], reference: &str) -> Option<&'a Category> {
    if reference.is_empty() {
        return None;
    }
    categories.iter().find(|category| category.name == reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str, name: &str) -> Category {
        Category {
            id: id.to_string(),
            name: name.to_string(),
            color: "#ff0000".to_string(),
            link: crate::slug::slugify(name),
        }
    }

    #[test]
    fn resolve_finds_by_exact_name() {
        let categories = vec![category("1", "Work"), category("2", "Home")];
        assert_eq!(resolve(&categories, "Home").map(|c| c.id.as_str()), Some("2"));
    }

    #[test]
    fn resolve_misses_dangling_and_empty() {
        let categories = vec![category("1", "Work")];
        assert!(resolve(&categories, "Errands").is_none());
        assert!(resolve(&categories, "").is_none());
    }

    #[test]
    fn missing_color_defaults() {
        let doc = Document {
            id: "c1".to_string(),
            fields: serde_json::json!({ "name": "Work", "link": "work" }),
        };
        let parsed = Category::from_document(&doc).expect("parse");
        assert_eq!(parsed.color, DEFAULT_COLOR);
    }
}
