//! Input/output adapters (C18, §6, §11.4).
//!
//! Two backends — MongoDB and CSV/JSON files — behind the same narrow surface the
//! runner needs. Matching the Open Question decision in DESIGN.md, this is a plain enum
//! dispatch rather than `dyn`/`async-trait` object dispatch: exactly two concrete
//! backends exist and the choice is made once at startup from `InputMode`, so there's
//! no dynamic set of implementations that would justify the object-safety machinery.

pub mod csv_adapters;
pub mod mongo_adapters;
pub mod prices_repo;
pub mod runs_repo;
pub mod sources_repo;

use mongodb::bson::Document;

use crate::core::error::AgentError;
use crate::core::types::{RunLog, UnifiedPriceRecord};
use csv_adapters::{CsvInput, CsvOutput};
use mongo_adapters::{MongoInput, MongoOutput};

pub enum SourceInput {
    Mongo(MongoInput),
    Csv(CsvInput),
}

impl SourceInput {
    pub async fn load_sources(&self) -> Result<Vec<Document>, AgentError> {
        match self {
            SourceInput::Mongo(m) => m.load_sources().await,
            SourceInput::Csv(c) => c.load_sources(),
        }
    }
}

pub enum OutputAdapter {
    Mongo(MongoOutput),
    Csv(CsvOutput),
}

impl OutputAdapter {
    pub async fn save_prices(&self, records: &[UnifiedPriceRecord]) -> Result<usize, AgentError> {
        match self {
            OutputAdapter::Mongo(m) => m.save_prices(records).await,
            OutputAdapter::Csv(c) => c.save_prices(records),
        }
    }

    pub async fn save_source_config(&self, source: &Document) -> Result<String, AgentError> {
        match self {
            OutputAdapter::Mongo(m) => m.save_source_config(source).await,
            OutputAdapter::Csv(c) => c.save_source_config(source),
        }
    }

    pub async fn save_run(&self, run_log: &RunLog) -> Result<(), AgentError> {
        match self {
            OutputAdapter::Mongo(m) => {
                m.save_run(run_log).await?;
                Ok(())
            }
            OutputAdapter::Csv(c) => c.save_run(run_log),
        }
    }
}
