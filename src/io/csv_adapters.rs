//! CSV input/output adapters for offline/demo runs without a MongoDB connection (§6).
//!
//! Grounded on `original_source/scraper/app/inputs/csv_input.py` and
//! `app/outputs/csv_output.py`. Returns the same loose [`Document`] shape
//! [`crate::io::mongo_adapters::MongoInput`] does, so `runner.rs` can treat both input
//! modes identically.

use std::path::{Path, PathBuf};

use chrono::Utc;
use mongodb::bson::{doc, Document};

use crate::core::error::AgentError;
use crate::core::types::{RunLog, UnifiedPriceRecord, UNIFIED_PRICE_FIELDS};

pub struct CsvInput {
    path: PathBuf,
}

impl CsvInput {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self { path: csv_path.into() }
    }

    /// Load source configs from a CSV file. Expected columns: `entryUrl, baseUrl?,
    /// name?, extractionType?, endpoint?`.
    pub fn load_sources(&self) -> Result<Vec<Document>, AgentError> {
        if !self.path.exists() {
            return Err(AgentError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("CSV sources file not found: {}", self.path.display()),
            )));
        }

        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(&self.path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut sources = Vec::new();
        for row in reader.records() {
            let row = row?;
            let mut fields = std::collections::HashMap::new();
            for (i, h) in headers.iter().enumerate() {
                fields.insert(h.clone(), row.get(i).unwrap_or("").trim().to_string());
            }

            let entry_url = fields.get("entryUrl").cloned().unwrap_or_default();
            if entry_url.is_empty() {
                continue;
            }

            let base_url = fields.get("baseUrl").filter(|s| !s.is_empty()).cloned().unwrap_or_else(|| entry_url.clone());
            let mut source = doc! {
                "entryUrl": &entry_url,
                "baseUrl": base_url,
                "name": fields.get("name").cloned().unwrap_or_default(),
            };
            if let Some(ext) = fields.get("extractionType").filter(|s| !s.is_empty()) {
                source.insert("extractionType", ext.clone());
            }
            if let Some(endpoint) = fields.get("endpoint").filter(|s| !s.is_empty()) {
                source.insert("endpoint", endpoint.clone());
            }
            sources.push(source);
        }
        Ok(sources)
    }
}

pub struct CsvOutput {
    dir: PathBuf,
}

impl CsvOutput {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, AgentError> {
        let dir: PathBuf = output_dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Write both a CSV and a JSON file for `records`, returning the count written.
    pub fn save_prices(&self, records: &[UnifiedPriceRecord]) -> Result<usize, AgentError> {
        if records.is_empty() {
            return Ok(0);
        }
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();

        let csv_path = self.dir.join(format!("prices_{timestamp}.csv"));
        self.write_prices_csv(&csv_path, records)?;
        tracing::info!(count = records.len(), path = %csv_path.display(), "wrote price records");

        let json_path = self.dir.join(format!("prices_{timestamp}.json"));
        let json: Vec<serde_json::Value> = records.iter().map(UnifiedPriceRecord::to_json).collect();
        self.write_json(&json_path, &json)?;

        Ok(records.len())
    }

    pub fn save_source_config(&self, source: &Document) -> Result<String, AgentError> {
        let name = source
            .get_str("name")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| source.get_str("entryUrl").ok())
            .unwrap_or("source");
        let safe_name: String =
            name.chars().map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' }).collect();
        let path = self.dir.join(format!("source_{safe_name}.json"));
        self.write_json(&path, source)?;
        Ok(String::new())
    }

    pub fn save_run(&self, run_log: &RunLog) -> Result<(), AgentError> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
        let path = self.dir.join(format!("run_{timestamp}.json"));
        self.write_json(&path, &run_log.to_json())
    }

    fn write_prices_csv(&self, path: &Path, records: &[UnifiedPriceRecord]) -> Result<(), AgentError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(UNIFIED_PRICE_FIELDS)?;
        for record in records {
            let row: Vec<String> = record.to_ordered_map().into_iter().map(|(_, v)| v).collect();
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_json(&self, path: &Path, value: &impl serde::Serialize) -> Result<(), AgentError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, value)?;
        Ok(())
    }
}
