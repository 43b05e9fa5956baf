//! Record store - session records in the document database
//!
//! Stateless facade over a [`DocumentStore`]: every operation is addressed by the
//! token it is given and maps onto sparse document updates (field set, field unset,
//! whole-document delete).

use persession_core::{
    validation_error, Document, DocumentStore, SessionRecord, SessionResult, SessionToken,
    UpdateOp, PRIMARY_KEY,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct RecordStore {
    store: Arc<dyn DocumentStore>,
    collection: String,
    atomic_upsert: bool,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("backend", &self.store.name())
            .field("collection", &self.collection)
            .field("atomic_upsert", &self.atomic_upsert)
            .finish()
    }
}

impl RecordStore {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            atomic_upsert: true,
        }
    }

    /// Choose between the backend upsert and the find-then-insert sequence for `set`
    pub fn with_atomic_upsert(mut self, atomic_upsert: bool) -> Self {
        self.atomic_upsert = atomic_upsert;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn backend(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Value of `key`, or `None` when the record or the field is absent
    pub async fn get(&self, token: &SessionToken, key: &str) -> SessionResult<Option<Value>> {
        Ok(self
            .fetch_record(token)
            .await?
            .and_then(|mut record| record.fields.remove(key)))
    }

    pub async fn has(&self, token: &SessionToken, key: &str) -> SessionResult<bool> {
        Ok(self
            .fetch_record(token)
            .await?
            .is_some_and(|record| record.contains(key)))
    }

    /// Number of user fields, 0 when no record exists
    pub async fn count(&self, token: &SessionToken) -> SessionResult<usize> {
        Ok(self
            .fetch_record(token)
            .await?
            .map_or(0, |record| record.len()))
    }

    /// All user fields of the record
    pub async fn entries(&self, token: &SessionToken) -> SessionResult<Document> {
        Ok(self
            .fetch_record(token)
            .await?
            .map(|record| record.fields)
            .unwrap_or_default())
    }

    /// Set `key`, creating the record when it does not exist yet
    pub async fn set(&self, token: &SessionToken, key: &str, value: Value) -> SessionResult<()> {
        validate_key(key)?;

        let mut fields = Document::new();
        fields.insert(key.to_string(), value);

        if self.atomic_upsert && self.store.atomic_upsert() {
            debug!(collection = %self.collection, key, "Upserting session field");
            return self.store.upsert(&self.collection, token, fields).await;
        }

        // Check-then-act: a concurrent first write for the same token can make the
        // insert fail with a conflict.
        if self.fetch_record(token).await?.is_some() {
            self.update_record(token, fields).await
        } else {
            self.insert_record(token, fields).await.inspect_err(|e| {
                if e.is_conflict() {
                    warn!(collection = %self.collection, "Session record created concurrently");
                }
            })
        }
    }

    /// Unset `key`, returning the value the record held before.
    ///
    /// The read and the unset are separate round trips.
    pub async fn remove(&self, token: &SessionToken, key: &str) -> SessionResult<Option<Value>> {
        validate_key(key)?;

        let previous = self.get(token, key).await?;
        let matched = self
            .store
            .update(&self.collection, token, UpdateOp::Unset(vec![key.to_string()]))
            .await?;

        debug!(collection = %self.collection, key, matched, "Removed session field");
        Ok(previous)
    }

    /// Drop every user field, keeping an empty record in place
    pub async fn remove_all(&self, token: &SessionToken) -> SessionResult<()> {
        self.delete_record(token).await?;
        self.insert_record(token, Document::new()).await
    }

    /// Delete the record. Returns whether one existed.
    pub async fn destroy(&self, token: &SessionToken) -> SessionResult<bool> {
        let deleted = self.delete_record(token).await?;
        info!(collection = %self.collection, deleted, "Destroyed session record");
        Ok(deleted)
    }

    /// Move the record of `from` under the token `to`
    pub async fn rename(&self, from: &SessionToken, to: &SessionToken) -> SessionResult<bool> {
        let Some(record) = self.fetch_record(from).await? else {
            return Ok(false);
        };

        self.insert_record(to, record.fields).await?;

        // Keep a single record: undo the copy when the old one cannot be dropped
        if let Err(e) = self.delete_record(from).await {
            if let Err(undo) = self.delete_record(to).await {
                warn!(collection = %self.collection, error = %undo, "Failed to undo record copy");
            }
            return Err(e);
        }
        Ok(true)
    }

    pub(crate) async fn fetch_record(
        &self,
        token: &SessionToken,
    ) -> SessionResult<Option<SessionRecord>> {
        let document = self.store.find(&self.collection, token).await?;
        Ok(document.and_then(SessionRecord::from_document))
    }

    pub(crate) async fn insert_record(
        &self,
        token: &SessionToken,
        fields: Document,
    ) -> SessionResult<()> {
        let record = SessionRecord {
            id: token.clone(),
            fields,
        };
        debug!(collection = %self.collection, fields = record.len(), "Inserting session record");
        self.store
            .insert(&self.collection, record.into_document())
            .await
    }

    /// Partial merge of `fields` into the existing record
    pub(crate) async fn update_record(
        &self,
        token: &SessionToken,
        fields: Document,
    ) -> SessionResult<()> {
        let matched = self
            .store
            .update(&self.collection, token, UpdateOp::Set(fields))
            .await?;
        debug!(collection = %self.collection, matched, "Updated session record");
        Ok(())
    }

    pub(crate) async fn delete_record(&self, token: &SessionToken) -> SessionResult<bool> {
        Ok(self.store.delete(&self.collection, token).await? > 0)
    }
}

/// User keys must be non-empty and may not address the primary key
fn validate_key(key: &str) -> SessionResult<()> {
    if key.is_empty() {
        return Err(validation_error!(
            "Session keys must not be empty",
            key,
            "record_store"
        ));
    }
    if key == PRIMARY_KEY {
        return Err(validation_error!(
            format!("'{}' is reserved for the session token", PRIMARY_KEY),
            key,
            "record_store"
        ));
    }
    Ok(())
}
