//! `sources` collection repository (§6, persisted-collection shape).
//!
//! Grounded on `original_source/scraper/app/db/sources_repo.py`. Like the original,
//! this operates on loose JSON documents rather than a strongly-typed [`crate::core::types::Source`]
//! — the persisted shape is a flat bag of optional fields (`extractionType`, `endpoint`,
//! `htmlSelector`, ...) that doesn't line up one-to-one with this crate's closed-variant
//! `ExtractionConfig`/`SchemaMapping` in-memory model, the same way Python's `dict[str, Any]`
//! never needed to line up with a Pydantic model either.

use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::Collection;

use crate::core::error::AgentError;
use crate::url_utils::normalize_url;

pub struct MongoSourcesRepo {
    col: Collection<Document>,
}

impl MongoSourcesRepo {
    pub fn new(db: &mongodb::Database) -> Self {
        Self { col: db.collection("sources") }
    }

    pub async fn find_all(&self) -> Result<Vec<Document>, AgentError> {
        let cursor = self.col.find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    /// Sources whose `healthStatus` isn't `BROKEN`.
    pub async fn find_active(&self) -> Result<Vec<Document>, AgentError> {
        let cursor = self.col.find(doc! { "healthStatus": { "$ne": "BROKEN" } }).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn find_by_url(&self, url: &str) -> Result<Option<Document>, AgentError> {
        let normalized = normalize_url(url).unwrap_or_else(|| url.to_string());
        let filter = doc! {
            "$or": [
                { "entryUrl": &normalized },
                { "entryUrl": url },
                { "baseUrl": &normalized },
            ]
        };
        Ok(self.col.find_one(filter).await?)
    }

    /// Insert or update a source by `entryUrl`. Returns the document's `_id` as a string.
    pub async fn upsert(&self, source: &Document) -> Result<String, AgentError> {
        let entry_url = source.get_str("entryUrl").unwrap_or_default().to_string();
        let now = mongodb::bson::DateTime::now();

        let mut set_doc = source.clone();
        set_doc.insert("updatedAt", now);

        let update = doc! {
            "$set": set_doc,
            "$setOnInsert": { "createdAt": now },
        };

        let result = self
            .col
            .update_one(doc! { "entryUrl": &entry_url }, update)
            .upsert(true)
            .await?;

        if let Some(id) = result.upserted_id {
            return Ok(id.to_string());
        }

        let doc = self.col.find_one(doc! { "entryUrl": &entry_url }).await?;
        Ok(doc.and_then(|d| d.get_object_id("_id").ok().map(|id| id.to_string())).unwrap_or_default())
    }

    pub async fn update_health(
        &self,
        source_id: &str,
        status: &str,
        last_success: Option<mongodb::bson::DateTime>,
        error_message: Option<&str>,
    ) -> Result<(), AgentError> {
        let object_id = mongodb::bson::oid::ObjectId::parse_str(source_id)
            .map_err(|e| AgentError::Parse(e.to_string()))?;

        let mut set_doc = doc! {
            "healthStatus": status,
            "healthUpdatedAt": mongodb::bson::DateTime::now(),
        };
        if let Some(ts) = last_success {
            set_doc.insert("lastSuccessAt", ts);
        }
        if let Some(msg) = error_message {
            set_doc.insert("lastError", msg);
        }

        self.col.update_one(doc! { "_id": object_id }, doc! { "$set": set_doc }).await?;
        Ok(())
    }

    /// Save discovery results (extraction config fields) onto a source.
    pub async fn update_extraction_config(
        &self,
        source_id: &str,
        extraction_type: &str,
        config_fields: Document,
    ) -> Result<(), AgentError> {
        let object_id = mongodb::bson::oid::ObjectId::parse_str(source_id)
            .map_err(|e| AgentError::Parse(e.to_string()))?;

        let mut set_doc = config_fields;
        set_doc.insert("extractionType", extraction_type);
        set_doc.insert("discoveredAt", mongodb::bson::DateTime::now());
        set_doc.insert("updatedAt", mongodb::bson::DateTime::now());

        self.col.update_one(doc! { "_id": object_id }, doc! { "$set": set_doc }).await?;
        Ok(())
    }
}
