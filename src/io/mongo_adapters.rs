//! MongoDB connection bootstrapping and the combined input/output facades the runner
//! dispatches to (§6, §11.4).
//!
//! Grounded on `original_source/scraper/app/db/mongo.py` (connection + ping check) and
//! `app/inputs/db_input.py` / `app/outputs/db_output.py` (the facades composing the
//! three repos behind one call site).

use mongodb::bson::{doc, Document};

use crate::core::error::AgentError;
use crate::core::types::{RunLog, UnifiedPriceRecord};
use crate::io::prices_repo::MongoPricesRepo;
use crate::io::runs_repo::MongoRunsRepo;
use crate::io::sources_repo::MongoSourcesRepo;

/// Connect to `mongo_uri` and verify connectivity with a ping, mirroring the original's
/// `connect()`.
pub async fn connect(mongo_uri: &str, db_name: &str) -> Result<mongodb::Database, AgentError> {
    if mongo_uri.is_empty() {
        return Err(AgentError::Fatal("MONGO_URI is not set — cannot connect to MongoDB".to_string()));
    }
    let client = mongodb::Client::with_uri_str(mongo_uri).await?;
    client.database("admin").run_command(doc! { "ping": 1 }).await?;
    Ok(client.database(db_name))
}

/// Source input backed by MongoDB (§6 `InputMode::Mongo`).
pub struct MongoInput {
    sources: MongoSourcesRepo,
}

impl MongoInput {
    pub fn new(db: &mongodb::Database) -> Self {
        Self { sources: MongoSourcesRepo::new(db) }
    }

    /// Active (non-BROKEN) sources only, matching the original's default load path.
    pub async fn load_sources(&self) -> Result<Vec<Document>, AgentError> {
        self.sources.find_active().await
    }

    pub async fn load_all_sources(&self) -> Result<Vec<Document>, AgentError> {
        self.sources.find_all().await
    }
}

/// Output adapter backed by MongoDB (§6 `LogMode`/default storage), composing the three
/// repos the way `db_output.py`'s `DbOutput` does.
pub struct MongoOutput {
    pub prices: MongoPricesRepo,
    pub runs: MongoRunsRepo,
    pub sources: MongoSourcesRepo,
}

impl MongoOutput {
    pub fn new(db: &mongodb::Database) -> Self {
        Self { prices: MongoPricesRepo::new(db), runs: MongoRunsRepo::new(db), sources: MongoSourcesRepo::new(db) }
    }

    pub async fn save_prices(&self, records: &[UnifiedPriceRecord]) -> Result<usize, AgentError> {
        if records.is_empty() {
            return Ok(0);
        }
        self.prices.ensure_indexes().await?;
        let inserted = self.prices.bulk_insert(records).await?;
        let counts = self.prices.upsert_entities_from_prices(records).await?;
        tracing::info!(
            inserted,
            crops = counts.crops,
            states = counts.states,
            mandis = counts.mandis,
            "saved price records and upserted derived entities"
        );
        Ok(inserted)
    }

    pub async fn save_source_config(&self, source: &Document) -> Result<String, AgentError> {
        self.sources.upsert(source).await
    }

    pub async fn save_run(&self, run_log: &RunLog) -> Result<String, AgentError> {
        self.runs.insert_run(run_log).await
    }
}
