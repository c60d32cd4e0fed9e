//! Documents with gold stance labels.

use serde::{Deserialize, Serialize};

/// An abstract with its gold stance score. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Gold stance in [-1, 1].
    pub stance: f64,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        abstract_text: impl Into<String>,
        stance: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            abstract_text: abstract_text.into(),
            stance,
        }
    }

    /// Title and abstract joined for feature extraction.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }

    /// Whether the document has no usable text at all.
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.abstract_text.trim().is_empty()
    }

    /// Normalized content key, independent of the id.
    ///
    /// Ids are positional per input file, so overlap between splits is
    /// detected on content: lower-cased alphanumeric words of title and
    /// abstract.
    pub fn content_key(&self) -> String {
        let normalize = |s: &str| {
            s.to_lowercase()
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| !w.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        };
        format!(
            "{}\u{1f}{}",
            normalize(&self.title),
            normalize(&self.abstract_text)
        )
    }
}

/// One record of an input split file.
///
/// `id` is optional; the loader falls back to the record's position.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentRecord {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub stance: Option<f64>,
}
