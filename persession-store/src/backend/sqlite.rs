//! SQLite document store
//!
//! Each collection is a table `(id TEXT PRIMARY KEY, document TEXT)` whose
//! `document` column holds the user fields as JSON. The primary key lives only in
//! the `id` column and is folded back into documents on read.

use async_trait::async_trait;
use persession_core::{
    config_error, document_id, is_valid_collection_name, storage_error, Document, DocumentStore,
    ErrorContext, SessionError, SessionResult, SessionToken, UpdateOp, PRIMARY_KEY,
};
use serde_json::Value;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqliteConnection, SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Document store backed by a SQLite database
#[derive(Debug, Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Connect to `database_url`, creating the database file if missing.
    ///
    /// In-memory databases are private to one connection, so they get a pool of one.
    pub async fn connect(database_url: &str) -> SessionResult<Self> {
        info!("Connecting to session database: {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| config_error!(format!("Invalid database URL: {}", e), "sqlite_store", e))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
        };

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            config_error!(
                format!("Failed to connect to database: {}", e),
                "sqlite_store",
                e
            )
        })?;

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Read, modify and write one document inside an immediate transaction.
    ///
    /// The transaction rolls back when dropped uncommitted, so a cancelled call
    /// never leaves the pooled connection inside an open transaction.
    async fn modify(
        &self,
        collection: &str,
        id: &SessionToken,
        op: UpdateOp,
        create_missing: bool,
    ) -> SessionResult<u64> {
        let table = table_name(collection)?;
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| storage_failure("Failed to begin transaction", "begin", &table, e))?;

        let matched = Self::modify_in_transaction(&mut *tx, &table, id, op, create_missing).await?;

        tx.commit()
            .await
            .map_err(|e| storage_failure("Failed to commit transaction", "commit", &table, e))?;
        Ok(matched)
    }

    async fn modify_in_transaction(
        conn: &mut SqliteConnection,
        table: &str,
        id: &SessionToken,
        op: UpdateOp,
        create_missing: bool,
    ) -> SessionResult<u64> {
        let current: Option<(String,)> =
            sqlx::query_as(&format!(r#"SELECT document FROM "{}" WHERE id = ?"#, table))
                .bind(id.as_str())
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| storage_failure("Failed to read session record", "read", table, e))?;

        match current {
            Some((json,)) => {
                let mut document = decode(&json)?;
                op.apply(&mut document);
                sqlx::query(&format!(r#"UPDATE "{}" SET document = ? WHERE id = ?"#, table))
                    .bind(encode(&document)?)
                    .bind(id.as_str())
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| {
                        storage_failure("Failed to update session record", "update", table, e)
                    })?;
                Ok(1)
            }
            None if create_missing => {
                let mut document = Document::new();
                op.apply(&mut document);
                sqlx::query(&format!(
                    r#"INSERT INTO "{}" (id, document) VALUES (?, ?)"#,
                    table
                ))
                .bind(id.as_str())
                .bind(encode(&document)?)
                .execute(&mut *conn)
                .await
                .map_err(|e| map_write_error(e, table))?;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn prepare_collection(&self, collection: &str) -> SessionResult<()> {
        let table = table_name(collection)?;
        sqlx::query(&format!(
            r#"CREATE TABLE IF NOT EXISTS "{}" (
                id TEXT PRIMARY KEY NOT NULL,
                document TEXT NOT NULL
            )"#,
            table
        ))
        .execute(&self.pool)
        .await
        .map_err(|e| storage_failure("Failed to create collection", "prepare", &table, e))?;

        debug!(collection, "Session collection ready");
        Ok(())
    }

    async fn find(&self, collection: &str, id: &SessionToken) -> SessionResult<Option<Document>> {
        let table = table_name(collection)?;
        let row: Option<(String,)> =
            sqlx::query_as(&format!(r#"SELECT document FROM "{}" WHERE id = ?"#, table))
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| storage_failure("Failed to find session record", "find", &table, e))?;

        let Some((json,)) = row else {
            return Ok(None);
        };

        let mut document = Document::new();
        document.insert(PRIMARY_KEY.to_string(), Value::String(id.as_str().to_string()));
        document.extend(decode(&json)?);
        Ok(Some(document))
    }

    async fn insert(&self, collection: &str, mut document: Document) -> SessionResult<()> {
        let table = table_name(collection)?;
        let id = document_id(&document)?;
        document.remove(PRIMARY_KEY);

        sqlx::query(&format!(
            r#"INSERT INTO "{}" (id, document) VALUES (?, ?)"#,
            table
        ))
        .bind(id.as_str())
        .bind(encode(&document)?)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, collection))?;

        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &SessionToken,
        op: UpdateOp,
    ) -> SessionResult<u64> {
        self.modify(collection, id, op, false).await
    }

    async fn delete(&self, collection: &str, id: &SessionToken) -> SessionResult<u64> {
        let table = table_name(collection)?;
        let result = sqlx::query(&format!(r#"DELETE FROM "{}" WHERE id = ?"#, table))
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| storage_failure("Failed to delete session record", "delete", &table, e))?;

        Ok(result.rows_affected())
    }

    async fn upsert(
        &self,
        collection: &str,
        id: &SessionToken,
        fields: Document,
    ) -> SessionResult<()> {
        self.modify(collection, id, UpdateOp::Set(fields), true)
            .await
            .map(|_| ())
    }

    fn atomic_upsert(&self) -> bool {
        true
    }
}

fn table_name(collection: &str) -> SessionResult<String> {
    if !is_valid_collection_name(collection) {
        return Err(config_error!(
            format!("Invalid collection name: '{}'", collection),
            "sqlite_store"
        ));
    }
    Ok(collection.to_string())
}

fn storage_failure(
    message: &str,
    operation: &str,
    collection: &str,
    error: sqlx::Error,
) -> SessionError {
    SessionError::Storage {
        message: message.to_string(),
        source: Some(Box::new(error)),
        context: ErrorContext::new("sqlite_store")
            .with_operation(operation)
            .with_metadata("collection", collection),
    }
}

fn map_write_error(error: sqlx::Error, collection: &str) -> SessionError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => SessionError::Conflict {
            message: format!("Duplicate primary key in collection '{}'", collection),
            context: ErrorContext::new("sqlite_store")
                .with_operation("insert")
                .with_metadata("collection", collection),
        },
        _ => storage_failure("Failed to insert session record", "insert", collection, error),
    }
}

fn encode(document: &Document) -> SessionResult<String> {
    Ok(serde_json::to_string(document)?)
}

fn decode(json: &str) -> SessionResult<Document> {
    serde_json::from_str(json).map_err(|e| {
        storage_error!(
            format!("Corrupt session document: {}", e),
            "sqlite_store",
            e
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    async fn store() -> SqliteDocumentStore {
        let store = SqliteDocumentStore::connect("sqlite::memory:").await.unwrap();
        store.prepare_collection("sessions").await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_insert_find_roundtrip_keeps_primary_key() {
        let store = store().await;
        let id = SessionToken::new("abc");

        store
            .insert("sessions", doc(json!({"_id": "abc", "cart": [1, 2, 3]})))
            .await
            .unwrap();

        assert_eq!(
            store.find("sessions", &id).await.unwrap(),
            Some(doc(json!({"_id": "abc", "cart": [1, 2, 3]})))
        );
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let store = store().await;
        let document = doc(json!({"_id": "abc"}));

        store.insert("sessions", document.clone()).await.unwrap();
        let error = store.insert("sessions", document).await.unwrap_err();

        assert!(error.is_conflict());
    }

    #[tokio::test]
    async fn test_update_sets_and_unsets_fields() {
        let store = store().await;
        let id = SessionToken::new("abc");

        store
            .insert("sessions", doc(json!({"_id": "abc", "a": 1, "b": 2})))
            .await
            .unwrap();

        let matched = store
            .update("sessions", &id, UpdateOp::Set(doc(json!({"b": null, "c": 3}))))
            .await
            .unwrap();
        assert_eq!(matched, 1);

        store
            .update("sessions", &id, UpdateOp::Unset(vec!["a".to_string()]))
            .await
            .unwrap();

        assert_eq!(
            store.find("sessions", &id).await.unwrap(),
            Some(doc(json!({"_id": "abc", "b": null, "c": 3})))
        );
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_document() {
        let store = store().await;
        let id = SessionToken::new("ghost");

        let matched = store
            .update("sessions", &id, UpdateOp::Set(doc(json!({"a": 1}))))
            .await
            .unwrap();
        assert_eq!(matched, 0);
        assert_eq!(store.delete("sessions", &id).await.unwrap(), 0);
        assert_eq!(store.find("sessions", &id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_creates_and_merges() {
        let store = store().await;
        let id = SessionToken::new("abc");

        store
            .upsert("sessions", &id, doc(json!({"a": 1})))
            .await
            .unwrap();
        store
            .upsert("sessions", &id, doc(json!({"b": [true]})))
            .await
            .unwrap();

        assert_eq!(
            store.find("sessions", &id).await.unwrap(),
            Some(doc(json!({"_id": "abc", "a": 1, "b": [true]})))
        );
    }

    #[tokio::test]
    async fn test_file_database_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("sessions.db").display());
        let id = SessionToken::new("abc");

        {
            let store = SqliteDocumentStore::connect(&url).await.unwrap();
            store.prepare_collection("sessions").await.unwrap();
            store
                .upsert("sessions", &id, doc(json!({"theme": "dark"})))
                .await
                .unwrap();
            store.pool().close().await;
        }

        let store = SqliteDocumentStore::connect(&url).await.unwrap();
        assert_eq!(
            store.find("sessions", &id).await.unwrap(),
            Some(doc(json!({"_id": "abc", "theme": "dark"})))
        );
    }

    #[tokio::test]
    async fn test_cancelled_upsert_leaves_connection_usable() {
        let store = store().await;
        let id = SessionToken::new("abc");

        // Cancel at increasing points so some attempts land inside the transaction
        for micros in 0..64 {
            let _ = tokio::time::timeout(
                Duration::from_micros(micros),
                store.upsert("sessions", &id, doc(json!({"a": micros}))),
            )
            .await;

            store
                .upsert("sessions", &id, doc(json!({"b": micros})))
                .await
                .unwrap();
        }

        let document = store.find("sessions", &id).await.unwrap().unwrap();
        assert_eq!(document.get("b"), Some(&json!(63)));
    }

    #[tokio::test]
    async fn test_storage_errors_name_the_collection() {
        let store = store().await;
        let id = SessionToken::new("abc");

        let error = store.find("missing_table", &id).await.unwrap_err();

        match error {
            SessionError::Storage { context, .. } => {
                assert_eq!(context.operation.as_deref(), Some("find"));
                assert_eq!(
                    context.metadata.get("collection").map(String::as_str),
                    Some("missing_table")
                );
            }
            other => panic!("Expected Storage error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_collection_is_rejected() {
        let store = store().await;
        let id = SessionToken::new("abc");

        assert!(matches!(
            store.find("sessions\"; --", &id).await,
            Err(SessionError::Config { .. })
        ));
    }
}
