//! Document corpus loading and seeding
//!
//! The same corpus is pushed identically into every configured index. Nothing
//! is diffed against what an index already holds; the engine upserts by
//! primary key.

use crate::engine::SearchEngine;
use crate::error::{AppError, Result};
use crate::search::{ConfigurationRegistry, SearchResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Read a JSON array of document objects
///
/// A missing file yields an empty corpus; malformed content is an error.
pub async fn load_documents(path: impl AsRef<Path>) -> Result<Vec<Value>> {
    let path = path.as_ref();

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "Corpus file not found, starting with no documents");
            return Ok(Vec::new());
        }
        Err(e) => return Err(AppError::Io(e)),
    };

    let documents: Vec<Value> = serde_json::from_slice(&bytes)?;

    if let Some(position) = documents.iter().position(|d| !d.is_object()) {
        return Err(AppError::Validation(format!(
            "{}: entry {} is not a JSON object",
            path.display(),
            position
        )));
    }

    info!(path = %path.display(), count = documents.len(), "Loaded corpus");
    Ok(documents)
}

/// Push `documents` into every configured index in batches
///
/// Returns the number of documents sent per index uid.
pub async fn seed(
    engine: &dyn SearchEngine,
    registry: &ConfigurationRegistry,
    documents: &[Value],
    batch_size: usize,
) -> SearchResult<BTreeMap<String, usize>> {
    let batch_size = batch_size.max(1);
    let mut seeded = BTreeMap::new();

    for configuration in registry.configured() {
        for batch in documents.chunks(batch_size) {
            engine
                .add_documents(&configuration.index_uid, &configuration.primary_key, batch)
                .await?;
        }

        info!(
            index_uid = %configuration.index_uid,
            count = documents.len(),
            "Seeded index"
        );
        seeded.insert(configuration.index_uid.clone(), documents.len());
    }

    Ok(seeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemoryEngine;
    use crate::search::{IndexConfiguration, IndexSettings};
    use serde_json::json;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_missing_file_is_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let documents = load_documents(dir.path().join("absent.json")).await.unwrap();
        assert!(documents.is_empty());
    }

    #[tokio::test]
    async fn test_load_array_of_objects() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": 1, "title": "Hail"}}, {{"id": 2}}]"#).unwrap();

        let documents = load_documents(file.path()).await.unwrap();
        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0]["title"], "Hail");
    }

    #[tokio::test]
    async fn test_malformed_json_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[{{\"id\": 1,").unwrap();
        assert!(matches!(
            load_documents(file.path()).await,
            Err(AppError::Serialization(_))
        ));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[1, 2]").unwrap();
        assert!(matches!(
            load_documents(file.path()).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_seed_every_configured_index_in_batches() {
        let engine = Arc::new(InMemoryEngine::new());
        let registry = ConfigurationRegistry::new(engine.clone());
        for name in ["v1", "v2"] {
            registry.register(IndexConfiguration::new(
                name,
                format!("idx_{}", name),
                "id",
                IndexSettings::default(),
            ));
        }
        registry.register(IndexConfiguration::new("v3", "idx_v3", "id", IndexSettings::default()));
        registry.apply("v1").await.unwrap();
        registry.apply("v2").await.unwrap();

        let documents: Vec<Value> = (0..7).map(|i| json!({ "id": i })).collect();
        let seeded = seed(engine.as_ref(), &registry, &documents, 3).await.unwrap();

        assert_eq!(seeded.len(), 2);
        assert_eq!(seeded["idx_v1"], 7);
        assert_eq!(engine.document_count("idx_v1"), 7);
        assert_eq!(engine.document_count("idx_v2"), 7);
        assert_eq!(engine.document_count("idx_v3"), 0);
    }
}
