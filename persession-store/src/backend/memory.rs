//! In-process document store

use async_trait::async_trait;
use persession_core::{
    document_id, Document, DocumentStore, ErrorContext, SessionError, SessionResult, SessionToken,
    UpdateOp, PRIMARY_KEY,
};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

type Collection = HashMap<String, Document>;

/// Document store keeping every collection in memory.
///
/// Records disappear with the process; intended for single-node deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn prepare_collection(&self, collection: &str) -> SessionResult<()> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default();
        Ok(())
    }

    async fn find(&self, collection: &str, id: &SessionToken) -> SessionResult<Option<Document>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|documents| documents.get(id.as_str()))
            .cloned())
    }

    async fn insert(&self, collection: &str, document: Document) -> SessionResult<()> {
        let id = document_id(&document)?;
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        if documents.contains_key(id.as_str()) {
            return Err(SessionError::Conflict {
                message: format!("Duplicate primary key in collection '{}'", collection),
                context: ErrorContext::new("memory_store")
                    .with_operation("insert")
                    .with_metadata("collection", collection),
            });
        }

        documents.insert(id.into_inner(), document);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &SessionToken,
        op: UpdateOp,
    ) -> SessionResult<u64> {
        let mut collections = self.collections.write().await;
        match collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(id.as_str()))
        {
            Some(document) => {
                op.apply(document);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, collection: &str, id: &SessionToken) -> SessionResult<u64> {
        let mut collections = self.collections.write().await;
        let removed = collections
            .get_mut(collection)
            .and_then(|documents| documents.remove(id.as_str()));
        Ok(u64::from(removed.is_some()))
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &SessionToken,
        fields: Document,
    ) -> SessionResult<()> {
        let mut collections = self.collections.write().await;
        let document = collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.as_str().to_string())
            .or_insert_with(|| {
                let mut document = Document::new();
                document.insert(PRIMARY_KEY.to_string(), Value::String(id.as_str().to_string()));
                document
            });

        UpdateOp::Set(fields).apply(document);
        Ok(())
    }

    fn atomic_upsert(&self) -> bool {
        true
    }
}
