//! Document store: loads labelled abstracts from split files.
//!
//! A split file is a JSON array of `{id?, title, abstract, stance}` records.
//! Records without an `id` are identified by their zero-based position.

mod exemplar;

pub use exemplar::{EXEMPLAR_SIZES, ExemplarSet};

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::types::{Document, DocumentRecord, in_stance_range};
use crate::{Result, StanceError};

/// Load a split file, failing on a missing file, an empty split, or
/// records that cannot be turned into a [`Document`].
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    if !path.exists() {
        return Err(StanceError::Configuration(format!(
            "input file not found: {path:?}"
        )));
    }
    let content = fs::read_to_string(path)?;
    let documents = parse_documents(&content).map_err(|e| match e {
        StanceError::Json(err) => {
            StanceError::Configuration(format!("invalid split file {path:?}: {err}"))
        }
        other => other,
    })?;
    debug!(path = %path.display(), count = documents.len(), "loaded documents");
    Ok(documents)
}

/// Parse a split from JSON text.
pub fn parse_documents(content: &str) -> Result<Vec<Document>> {
    let records: Vec<DocumentRecord> = serde_json::from_str(content)?;
    if records.is_empty() {
        return Err(StanceError::Configuration("input split is empty".into()));
    }

    let documents = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| into_document(index, record))
        .collect::<Result<Vec<_>>>()?;

    ensure_unique_ids(&documents)?;
    Ok(documents)
}

fn into_document(index: usize, record: DocumentRecord) -> Result<Document> {
    let id = match record.id {
        None | Some(serde_json::Value::Null) => index.to_string(),
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(StanceError::Configuration(format!(
                "record {index}: unsupported id {other}"
            )));
        }
    };

    let stance = record.stance.ok_or_else(|| {
        StanceError::Configuration(format!("record {id}: missing gold stance"))
    })?;
    if !in_stance_range(stance) {
        return Err(StanceError::Configuration(format!(
            "record {id}: stance {stance} outside [-1, 1]"
        )));
    }

    let title = record.title.unwrap_or_default();
    let abstract_text = record.abstract_text.unwrap_or_default();
    if title.trim().is_empty() && abstract_text.trim().is_empty() {
        warn!(id = %id, "record has neither title nor abstract");
    }

    Ok(Document {
        id,
        title,
        abstract_text,
        stance,
    })
}

/// Duplicate ids make metrics meaningless.
pub fn ensure_unique_ids(documents: &[Document]) -> Result<()> {
    let mut seen = HashSet::with_capacity(documents.len());
    for doc in documents {
        if !seen.insert(doc.id.as_str()) {
            return Err(StanceError::DataIntegrity(format!(
                "duplicate document id {:?}",
                doc.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_ids_when_absent() {
        let docs = parse_documents(
            r#"[{"title":"a","abstract":"x","stance":0.4},
                {"title":"b","abstract":"y","stance":-0.2}]"#,
        )
        .unwrap();
        assert_eq!(docs[0].id, "0");
        assert_eq!(docs[1].id, "1");
        assert_eq!(docs[1].stance, -0.2);
    }

    #[test]
    fn explicit_ids_kept() {
        let docs = parse_documents(
            r#"[{"id":17,"title":"a","abstract":"x","stance":0.0},
                {"id":"w-3","title":"b","abstract":"y","stance":1.0}]"#,
        )
        .unwrap();
        assert_eq!(docs[0].id, "17");
        assert_eq!(docs[1].id, "w-3");
    }

    #[test]
    fn empty_split_is_configuration_error() {
        assert!(matches!(
            parse_documents("[]"),
            Err(StanceError::Configuration(_))
        ));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let err = parse_documents(
            r#"[{"id":1,"title":"a","abstract":"x","stance":0.1},
                {"id":1,"title":"b","abstract":"y","stance":0.2}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, StanceError::DataIntegrity(_)));
    }

    #[test]
    fn out_of_range_stance_rejected() {
        assert!(parse_documents(r#"[{"title":"a","abstract":"x","stance":1.5}]"#).is_err());
        assert!(parse_documents(r#"[{"title":"a","abstract":"x"}]"#).is_err());
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let err = load_documents(Path::new("/nonexistent/split.json")).unwrap_err();
        assert!(matches!(err, StanceError::Configuration(_)));
    }
}
