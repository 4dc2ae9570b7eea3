//! `scrape_runs` collection repository (§6, §4.16).
//!
//! Grounded on `original_source/scraper/app/db/runs_repo.py`. Used both for plain run
//! logging and as the source of facts [`crate::health::evaluate_health`] needs
//! (`recent_failure_count`, `has_prior_success`).

use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use mongodb::Collection;

use crate::core::error::AgentError;
use crate::core::types::RunLog;

pub struct MongoRunsRepo {
    col: Collection<Document>,
}

impl MongoRunsRepo {
    pub fn new(db: &mongodb::Database) -> Self {
        Self { col: db.collection("scrape_runs") }
    }

    pub async fn insert_run(&self, run_log: &RunLog) -> Result<String, AgentError> {
        let mut doc = mongodb::bson::to_document(&run_log.to_json())?;
        doc.insert("createdAt", mongodb::bson::DateTime::now());
        let result = self.col.insert_one(&doc).await?;
        Ok(result.inserted_id.to_string())
    }

    pub async fn find_latest_successful(&self, source_id: &str) -> Result<Option<Document>, AgentError> {
        let opts = FindOptions::builder().sort(doc! { "createdAt": -1 }).limit(1).build();
        let mut cursor =
            self.col.find(doc! { "sourceId": source_id, "success": true }).with_options(opts).await?;
        Ok(cursor.try_next().await?)
    }

    /// Count failures among the most recent `last_n` runs for `source_id` (§4.16: `last_n=5`).
    pub async fn count_recent_failures(&self, source_id: &str, last_n: i64) -> Result<usize, AgentError> {
        let opts = FindOptions::builder().sort(doc! { "createdAt": -1 }).limit(last_n).build();
        let cursor = self.col.find(doc! { "sourceId": source_id }).with_options(opts).await?;
        let runs: Vec<Document> = cursor.try_collect().await?;
        Ok(runs.iter().filter(|r| !r.get_bool("success").unwrap_or(false)).count())
    }

    pub async fn has_any_success(&self, source_id: &str) -> Result<bool, AgentError> {
        Ok(self.find_latest_successful(source_id).await?.is_some())
    }
}
