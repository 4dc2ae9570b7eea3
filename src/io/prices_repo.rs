//! `prices` collection repository plus the derived `crops`/`states`/`mandis` entity
//! collections the rest of the platform serves from (§6).
//!
//! Grounded on `original_source/scraper/app/db/prices_repo.py`.

use std::collections::HashMap;

use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};

use crate::core::error::AgentError;
use crate::core::types::UnifiedPriceRecord;

pub struct MongoPricesRepo {
    prices: Collection<Document>,
    crops: Collection<Document>,
    states: Collection<Document>,
    mandis: Collection<Document>,
}

#[derive(Debug, Default)]
pub struct EntityUpsertCounts {
    pub crops: usize,
    pub states: usize,
    pub mandis: usize,
}

impl MongoPricesRepo {
    pub fn new(db: &mongodb::Database) -> Self {
        Self {
            prices: db.collection("prices"),
            crops: db.collection("crops"),
            states: db.collection("states"),
            mandis: db.collection("mandis"),
        }
    }

    /// Insert all records, tolerating individual duplicate-key failures the way
    /// `insert_many(..., ordered=False)` does in the original — a failed batch insert
    /// falls back to inserting one at a time and counting successes.
    pub async fn bulk_insert(&self, records: &[UnifiedPriceRecord]) -> Result<usize, AgentError> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = mongodb::bson::DateTime::now();
        let docs: Vec<Document> = records
            .iter()
            .map(|r| {
                let mut d = mongodb::bson::to_document(&r.to_json()).unwrap_or_default();
                d.insert("createdAt", now);
                d.insert("updatedAt", now);
                d
            })
            .collect();

        match self.prices.insert_many(&docs).ordered(false).await {
            Ok(result) => Ok(result.inserted_ids.len()),
            Err(_) => {
                let mut inserted = 0usize;
                for d in &docs {
                    if self.prices.insert_one(d).await.is_ok() {
                        inserted += 1;
                    }
                }
                Ok(inserted)
            }
        }
    }

    /// Extract unique crops/states/mandis from `records` and upsert them.
    pub async fn upsert_entities_from_prices(
        &self,
        records: &[UnifiedPriceRecord],
    ) -> Result<EntityUpsertCounts, AgentError> {
        let mut crops_seen: HashMap<String, Document> = HashMap::new();
        let mut states_seen: HashMap<String, Document> = HashMap::new();
        let mut mandis_seen: HashMap<String, Document> = HashMap::new();

        for rec in records {
            if !rec.crop_name.is_empty() {
                crops_seen.entry(rec.crop_name.clone()).or_insert_with(|| doc! { "name": &rec.crop_name });
            }
            if !rec.state_name.is_empty() {
                states_seen.entry(rec.state_name.clone()).or_insert_with(|| doc! { "name": &rec.state_name });
            }
            if !rec.mandi_name.is_empty() {
                mandis_seen
                    .entry(rec.mandi_name.clone())
                    .or_insert_with(|| doc! { "name": &rec.mandi_name, "stateName": &rec.state_name });
            }
        }

        let now = mongodb::bson::DateTime::now();
        let mut counts = EntityUpsertCounts::default();

        for (name, data) in crops_seen {
            let mut set_doc = data;
            set_doc.insert("updatedAt", now);
            let result = self
                .crops
                .update_one(doc! { "name": &name }, doc! { "$set": set_doc, "$setOnInsert": { "createdAt": now } })
                .upsert(true)
                .await?;
            if result.upserted_id.is_some() {
                counts.crops += 1;
            }
        }
        for (name, data) in states_seen {
            let mut set_doc = data;
            set_doc.insert("updatedAt", now);
            let result = self
                .states
                .update_one(doc! { "name": &name }, doc! { "$set": set_doc, "$setOnInsert": { "createdAt": now } })
                .upsert(true)
                .await?;
            if result.upserted_id.is_some() {
                counts.states += 1;
            }
        }
        for (name, data) in mandis_seen {
            let state_name = data.get_str("stateName").unwrap_or_default().to_string();
            let mut set_doc = data;
            set_doc.insert("updatedAt", now);
            let result = self
                .mandis
                .update_one(
                    doc! { "name": &name, "stateName": &state_name },
                    doc! { "$set": set_doc, "$setOnInsert": { "createdAt": now } },
                )
                .upsert(true)
                .await?;
            if result.upserted_id.is_some() {
                counts.mandis += 1;
            }
        }

        Ok(counts)
    }

    pub async fn find_latest_date(&self, source_id: Option<&str>) -> Result<Option<String>, AgentError> {
        let filter = match source_id {
            Some(id) => doc! { "sourceId": id },
            None => doc! {},
        };
        let opts = mongodb::options::FindOneOptions::builder().sort(doc! { "date": -1 }).build();
        let doc = self.prices.find_one(filter).with_options(opts).await?;
        Ok(doc.and_then(|d| d.get_str("date").ok().map(str::to_string)))
    }

    /// Create the indexes the original's `ensure_indexes` sets up, idempotently.
    pub async fn ensure_indexes(&self) -> Result<(), AgentError> {
        self.prices.create_index(IndexModel::builder().keys(doc! { "date": -1 }).build()).await?;
        self.prices
            .create_index(IndexModel::builder().keys(doc! { "cropName": 1, "mandiName": 1, "date": -1 }).build())
            .await?;
        self.prices.create_index(IndexModel::builder().keys(doc! { "stateName": 1 }).build()).await?;
        self.prices.create_index(IndexModel::builder().keys(doc! { "source": 1 }).build()).await?;

        let unique = IndexOptions::builder().unique(true).build();
        self.crops
            .create_index(IndexModel::builder().keys(doc! { "name": 1 }).options(unique.clone()).build())
            .await?;
        self.states
            .create_index(IndexModel::builder().keys(doc! { "name": 1 }).options(unique.clone()).build())
            .await?;
        self.mandis
            .create_index(IndexModel::builder().keys(doc! { "name": 1, "stateName": 1 }).options(unique).build())
            .await?;
        Ok(())
    }
}
