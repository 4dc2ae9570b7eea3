//! Mode controller (C17, §4.15).
//!
//! Grounded on `original_source/scraper/app/core/runner.py` (mode dispatch) and
//! `app/scraping/scrape_engine.py` (per-source scrape dispatch + normalize). Each
//! source gets its own fresh [`RunContext`] rather than one shared context threaded
//! across every source in the run — the original reuses one `RunContext` for the whole
//! `run()` call, which means a later source's run log would otherwise inherit an
//! earlier source's accumulated errors/visited URLs. That's not a behavior worth
//! reproducing; see the Open Question note in DESIGN.md.

use mongodb::bson::Document;

use crate::ai::discovery_mode::{extraction_config_to_source_update, run_discovery_ai};
use crate::ai::mapping_mode::{run_mapping_ai, schema_mapping_to_source_update};
use crate::ai::oracle::Oracle;
use crate::core::config::{AgentMode, AppConfig};
use crate::core::context::RunContext;
use crate::core::types::{DiscoveryResult, ExtractionConfig, HttpMethod, PaginationMode, PostContentType, SchemaMapping};
use crate::discovery::run_discovery;
use crate::health::{evaluate_health, HealthInputs};
use crate::io::csv_adapters::{CsvInput, CsvOutput};
use crate::io::mongo_adapters::{self, MongoInput, MongoOutput};
use crate::io::{OutputAdapter, SourceInput};
use crate::normalizer::normalize_records;
use crate::scrapers::{scrape_api, scrape_file, scrape_html_table};

/// Top-level dispatch: execute the configured agent mode (§4.15).
pub async fn run(config: &AppConfig, oracle: Option<&Oracle>, client: &reqwest::Client) -> anyhow::Result<()> {
    tracing::info!(mode = %config.agent_mode, "runner dispatching mode");

    let db = if !config.mongo_uri.is_empty() {
        Some(mongo_adapters::connect(&config.mongo_uri, &config.db_name).await?)
    } else {
        None
    };

    let input = build_input(config, db.as_ref())?;
    let output = build_output(config, db.as_ref())?;

    match config.agent_mode {
        AgentMode::Scrape => run_scrape_mode(config, oracle, client, &input, &output).await,
        AgentMode::Discover => run_discover_mode(config, oracle, client, &input, &output).await,
        AgentMode::DiscoverAndScrape => run_discover_and_scrape_mode(config, oracle, client, &input, &output).await,
        AgentMode::SingleUrl => run_single_url_mode(config, oracle, client, &output).await,
    }
}

fn build_input(config: &AppConfig, db: Option<&mongodb::Database>) -> anyhow::Result<SourceInput> {
    use crate::core::config::InputMode;
    Ok(match config.input_mode {
        InputMode::Csv => SourceInput::Csv(CsvInput::new(&config.csv_input_path)),
        InputMode::Mongo => match db {
            Some(db) => SourceInput::Mongo(MongoInput::new(db)),
            None => {
                tracing::warn!("INPUT_MODE=mongo but MONGO_URI is unset — falling back to CSV input");
                SourceInput::Csv(CsvInput::new(&config.csv_input_path))
            }
        },
    })
}

fn build_output(config: &AppConfig, db: Option<&mongodb::Database>) -> anyhow::Result<OutputAdapter> {
    Ok(match db {
        Some(db) => OutputAdapter::Mongo(MongoOutput::new(db)),
        None => OutputAdapter::Csv(CsvOutput::new(&config.csv_output_dir)?),
    })
}

// ── Mode implementations ─────────────────────────────────────────────────────

async fn run_scrape_mode(
    config: &AppConfig,
    oracle: Option<&Oracle>,
    client: &reqwest::Client,
    input: &SourceInput,
    output: &OutputAdapter,
) -> anyhow::Result<()> {
    let sources = input.load_sources().await?;
    if sources.is_empty() {
        tracing::warn!("no sources to scrape");
        return Ok(());
    }

    for (i, source) in sources.iter().enumerate() {
        let source_url = source.get_str("entryUrl").unwrap_or("unknown").to_string();
        tracing::info!(index = i + 1, total = sources.len(), source_url, "scraping source");

        let mut ctx = RunContext::new(source_id_of(source), source_url.clone());
        let records = run_scrape(&mut ctx, client, config, source).await;

        if !records.is_empty() {
            let saved = output.save_prices(&records).await?;
            ctx.records_saved += saved;
        }

        let run_log = ctx.to_run_log();
        output.save_run(&run_log).await?;
        let _ = oracle; // not needed for plain scrape mode
        update_health(output, &ctx, !records.is_empty(), records.len()).await?;
    }
    Ok(())
}

async fn run_discover_mode(
    config: &AppConfig,
    oracle: Option<&Oracle>,
    client: &reqwest::Client,
    input: &SourceInput,
    output: &OutputAdapter,
) -> anyhow::Result<()> {
    let sources = input.load_sources().await?;
    if sources.is_empty() {
        tracing::warn!("no sources to discover");
        return Ok(());
    }

    for (i, source) in sources.iter().enumerate() {
        let source_url = source.get_str("entryUrl").unwrap_or("unknown").to_string();
        tracing::info!(index = i + 1, total = sources.len(), source_url, "discovering source");

        let mut ctx = RunContext::new(source_id_of(source), source_url.clone());

        if let Some(oracle) = oracle {
            if let Some(config_enum) = discover_source(&mut ctx, config, client, oracle, &source_url).await {
                let update = extraction_config_to_source_update(&config_enum);
                let mut merged = source.clone();
                merged.extend(update);
                if let Ok(new_id) = output.save_source_config(&merged).await {
                    if !new_id.is_empty() {
                        ctx.source_id = new_id;
                    }
                }
                run_mapping_for_source(&mut ctx, config, client, oracle, &merged, &config_enum, output).await;
            }
        } else {
            ctx.add_error(source_url.clone(), "no LLM oracle configured — cannot run discovery".to_string(), true);
        }

        let run_log = ctx.to_run_log();
        output.save_run(&run_log).await?;
    }
    Ok(())
}

async fn run_discover_and_scrape_mode(
    config: &AppConfig,
    oracle: Option<&Oracle>,
    client: &reqwest::Client,
    input: &SourceInput,
    output: &OutputAdapter,
) -> anyhow::Result<()> {
    let sources = input.load_sources().await?;
    if sources.is_empty() {
        tracing::warn!("no sources to process");
        return Ok(());
    }

    for (i, source) in sources.iter().enumerate() {
        let source_url = source.get_str("entryUrl").unwrap_or("unknown").to_string();
        tracing::info!(index = i + 1, total = sources.len(), source_url, "discover+scrape source");

        let mut ctx = RunContext::new(source_id_of(source), source_url.clone());
        let mut source = source.clone();

        if source.get_str("extractionType").unwrap_or("").is_empty() {
            let Some(oracle) = oracle else {
                ctx.add_error(source_url.clone(), "no LLM oracle configured — cannot run discovery".to_string(), true);
                output.save_run(&ctx.to_run_log()).await?;
                continue;
            };

            match discover_source(&mut ctx, config, client, oracle, &source_url).await {
                Some(config_enum) => {
                    let update = extraction_config_to_source_update(&config_enum);
                    source.extend(update);
                    if let Ok(new_id) = output.save_source_config(&source).await {
                        if !new_id.is_empty() {
                            ctx.source_id = new_id;
                        }
                    }
                    run_mapping_for_source(&mut ctx, config, client, oracle, &source, &config_enum, output).await;
                }
                None => {
                    tracing::warn!(source_url, "discovery failed — skipping scrape");
                    output.save_run(&ctx.to_run_log()).await?;
                    continue;
                }
            }
        }

        let records = run_scrape(&mut ctx, client, config, &source).await;
        if !records.is_empty() {
            let saved = output.save_prices(&records).await?;
            ctx.records_saved += saved;
        }
        output.save_run(&ctx.to_run_log()).await?;
        update_health(output, &ctx, !records.is_empty(), records.len()).await?;
    }
    Ok(())
}

async fn run_single_url_mode(
    config: &AppConfig,
    oracle: Option<&Oracle>,
    client: &reqwest::Client,
    output: &OutputAdapter,
) -> anyhow::Result<()> {
    let Some(target_url) = &config.target_url else {
        anyhow::bail!("--url is required for single_url mode");
    };
    tracing::info!(target_url, "single url mode");

    let mut ctx = RunContext::new("", target_url.clone());
    let mut source = load_single_url_source(config, target_url).await?;
    let needs_discovery = source.get_bool("_needsDiscovery").unwrap_or(true);
    source.remove("_needsDiscovery");
    if let Some(id) = source.get_str("_sourceId").ok().map(str::to_string) {
        ctx.source_id = id;
        source.remove("_sourceId");
    }

    if needs_discovery {
        let Some(oracle) = oracle else {
            ctx.add_error(target_url.clone(), "no LLM oracle configured — cannot run discovery".to_string(), true);
            output.save_run(&ctx.to_run_log()).await?;
            return Ok(());
        };

        let Some(config_enum) = discover_source(&mut ctx, config, client, oracle, target_url).await else {
            ctx.add_error(target_url.clone(), "discovery failed — cannot scrape".to_string(), true);
            update_health(output, &ctx, false, 0).await?;
            output.save_run(&ctx.to_run_log()).await?;
            return Ok(());
        };

        let update = extraction_config_to_source_update(&config_enum);
        source.extend(update);
        if let Ok(new_id) = output.save_source_config(&source).await {
            if !new_id.is_empty() {
                ctx.source_id = new_id;
            }
        }
        run_mapping_for_source(&mut ctx, config, client, oracle, &source, &config_enum, output).await;
    }

    let records = run_scrape(&mut ctx, client, config, &source).await;
    if !records.is_empty() {
        let saved = output.save_prices(&records).await?;
        ctx.records_saved += saved;
    }
    output.save_run(&ctx.to_run_log()).await?;
    update_health(output, &ctx, !records.is_empty(), records.len()).await?;
    Ok(())
}

/// Resolve `target_url` into a source document: look it up in Mongo if configured,
/// else build a bare document flagged for discovery (§4.15 `single_url`).
async fn load_single_url_source(config: &AppConfig, target_url: &str) -> anyhow::Result<Document> {
    if !config.mongo_uri.is_empty() {
        let db = mongo_adapters::connect(&config.mongo_uri, &config.db_name).await?;
        let repo = crate::io::sources_repo::MongoSourcesRepo::new(&db);
        if let Some(mut existing) = repo.find_by_url(target_url).await? {
            if let Ok(id) = existing.get_object_id("_id") {
                existing.insert("_sourceId", id.to_string());
            }
            existing.insert("_needsDiscovery", false);
            return Ok(existing);
        }
    }

    let base_url = crate::url_utils::extract_base_url(target_url).unwrap_or_else(|| target_url.to_string());
    Ok(mongodb::bson::doc! {
        "entryUrl": target_url,
        "baseUrl": base_url,
        "_needsDiscovery": true,
    })
}

// ── Shared helpers ────────────────────────────────────────────────────────────

fn source_id_of(source: &Document) -> String {
    source.get_object_id("_id").map(|id| id.to_string()).unwrap_or_default()
}

/// Run discovery + AI analysis for a single source URL (mirrors `_discover_source`).
async fn discover_source(
    ctx: &mut RunContext,
    config: &AppConfig,
    client: &reqwest::Client,
    oracle: &Oracle,
    entry_url: &str,
) -> Option<ExtractionConfig> {
    let _ = client; // discovery drives its own chromiumoxide browser session, not the replay HTTP client
    let discovery_result: DiscoveryResult = run_discovery(
        ctx,
        entry_url,
        config.max_pages_per_source,
        config.discovery_timeout_seconds,
        config.request_delay_ms,
        config.headless,
    )
    .await
    .ok()?;

    if !discovery_result.has_candidates() {
        tracing::warn!(entry_url, "discovery found no candidates");
        return None;
    }

    run_discovery_ai(ctx, oracle, &discovery_result).await
}

/// Quick-scrape a freshly-discovered source for sample data, then run AI mapping
/// (mirrors `_run_mapping_for_source`).
async fn run_mapping_for_source(
    ctx: &mut RunContext,
    config: &AppConfig,
    client: &reqwest::Client,
    oracle: &Oracle,
    source: &Document,
    extraction_config: &ExtractionConfig,
    output: &OutputAdapter,
) {
    if source.get("schemaMapping").is_some() {
        tracing::debug!("source already has schemaMapping — skipping AI mapping");
        return;
    }

    let raw_records = scrape_by_config(ctx, client, config, extraction_config).await;
    if raw_records.is_empty() {
        tracing::warn!("no sample data for mapping — skipping");
        return;
    }

    let Some(first) = raw_records[0].as_object() else { return };
    let raw_fields: Vec<String> = first.keys().cloned().collect();
    let sample: Vec<serde_json::Value> = raw_records.iter().take(5).cloned().collect();

    let source_url = source.get_str("entryUrl").unwrap_or_default();
    let extraction_type = extraction_config.extraction_type();

    if let Some(mapping) = run_mapping_ai(ctx, oracle, &raw_fields, &sample, source_url, extraction_type).await {
        let update = schema_mapping_to_source_update(&mapping);
        let mut merged = source.clone();
        merged.extend(update);
        if output.save_source_config(&merged).await.is_ok() {
            tracing::info!(source_url, "schema mapping saved");
        }
    }
}

async fn update_health(output: &OutputAdapter, ctx: &RunContext, success: bool, records_saved: usize) -> anyhow::Result<()> {
    let OutputAdapter::Mongo(mongo) = output else { return Ok(()) };
    if ctx.source_id.is_empty() {
        return Ok(());
    }

    let recent_failure_count = mongo.runs.count_recent_failures(&ctx.source_id, 5).await.unwrap_or(0);
    let has_prior_success = mongo.runs.has_any_success(&ctx.source_id).await.unwrap_or(false);

    let outcome = evaluate_health(&HealthInputs { success, records_saved, recent_failure_count, has_prior_success });
    let last_success = if matches!(outcome.status, crate::core::types::HealthStatus::Ok) {
        Some(mongodb::bson::DateTime::now())
    } else {
        None
    };

    mongo
        .sources
        .update_health(&ctx.source_id, &outcome.status.to_string(), last_success, outcome.message.as_deref())
        .await?;
    tracing::info!(source_id = %ctx.source_id, status = %outcome.status, "health updated");
    Ok(())
}

/// Dispatch to the correct scraper based on `source.extractionType`, then normalize
/// (mirrors `scrape_engine.run_scrape`).
async fn run_scrape(
    ctx: &mut RunContext,
    client: &reqwest::Client,
    config: &AppConfig,
    source: &Document,
) -> Vec<crate::core::types::UnifiedPriceRecord> {
    let source_url = source.get_str("entryUrl").unwrap_or_default().to_string();
    let extraction_type = source.get_str("extractionType").unwrap_or_default().to_string();

    if extraction_type.is_empty() {
        ctx.add_error(source_url, "no extractionType configured — needs discovery".to_string(), true);
        return Vec::new();
    }

    tracing::info!(source_url, extraction_type, "scraping source");

    let Some(extraction_config) = document_to_extraction_config(source) else {
        ctx.add_error(source_url, format!("unrecognized extractionType: {extraction_type}"), true);
        return Vec::new();
    };

    let raw_records = scrape_by_config(ctx, client, config, &extraction_config).await;
    ctx.records_extracted = raw_records.len();

    if raw_records.is_empty() {
        ctx.add_error(source_url, "scraper returned 0 records".to_string(), false);
        return Vec::new();
    }

    let Some(schema_mapping) = document_to_schema_mapping(source) else {
        tracing::warn!(source_url, "no schemaMapping — cannot normalize, returning no records");
        return Vec::new();
    };

    let source_name = source.get_str("name").ok().filter(|s| !s.is_empty()).unwrap_or("other");
    let normalized = normalize_records(&raw_records, &schema_mapping, &ctx.source_id, source_name);
    tracing::info!(raw = raw_records.len(), normalized = normalized.len(), "scrape complete");
    normalized
}

async fn scrape_by_config(
    ctx: &mut RunContext,
    client: &reqwest::Client,
    config: &AppConfig,
    extraction_config: &ExtractionConfig,
) -> Vec<serde_json::Value> {
    match extraction_config {
        ExtractionConfig::Api { .. } => scrape_api(ctx, client, extraction_config, config.request_delay_ms).await,
        ExtractionConfig::HtmlTable { page_url, selector, .. } => {
            scrape_html_table(ctx, client, page_url, selector).await
        }
        ExtractionConfig::PdfExcel { file_url, file_type, .. } => {
            scrape_file(ctx, client, file_url, file_type).await
        }
    }
}

fn document_to_extraction_config(source: &Document) -> Option<ExtractionConfig> {
    match source.get_str("extractionType").ok()? {
        "api" => Some(ExtractionConfig::Api {
            endpoint: source.get_str("endpoint").unwrap_or_default().to_string(),
            method: if source.get_str("endpointMethod").unwrap_or("GET").eq_ignore_ascii_case("post") {
                HttpMethod::Post
            } else {
                HttpMethod::Get
            },
            params: document_to_string_map(source.get("endpointParams")),
            headers: document_to_string_map(source.get("endpointHeaders")),
            post_body: source.get_str("endpointPostData").ok().map(str::to_string),
            post_content_type: if source.get_str("postContentType").unwrap_or("json").eq_ignore_ascii_case("form-urlencoded")
            {
                Some(PostContentType::FormUrlencoded)
            } else {
                Some(PostContentType::Json)
            },
            paginate: match source.get_str("paginate") {
                Ok("offset") => PaginationMode::Offset,
                Ok("none") => PaginationMode::None,
                Ok("page") => PaginationMode::Page,
                // Legacy documents stored a bare bool; treat both `true` and an
                // unrecognized/missing value as the prior default of page pagination.
                _ => if source.get_bool("paginate").unwrap_or(true) { PaginationMode::Page } else { PaginationMode::None },
            },
            confidence: source.get_f64("aiConfidence").unwrap_or(0.0),
            reasoning: source.get_str("aiReasoning").unwrap_or_default().to_string(),
        }),
        "html_table" => Some(ExtractionConfig::HtmlTable {
            page_url: source
                .get_str("htmlPageUrl")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| source.get_str("entryUrl").unwrap_or_default())
                .to_string(),
            selector: source.get_str("htmlSelector").unwrap_or_default().to_string(),
            expected_headers: source
                .get_array("htmlTableHeaders")
                .ok()
                .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
            confidence: source.get_f64("aiConfidence").unwrap_or(0.0),
            reasoning: source.get_str("aiReasoning").unwrap_or_default().to_string(),
        }),
        "pdf_excel" => Some(ExtractionConfig::PdfExcel {
            file_url: source.get_str("fileUrl").unwrap_or_default().to_string(),
            file_type: source.get_str("fileType").unwrap_or_default().to_string(),
            confidence: source.get_f64("aiConfidence").unwrap_or(0.0),
            reasoning: source.get_str("aiReasoning").unwrap_or_default().to_string(),
        }),
        _ => None,
    }
}

fn document_to_string_map(value: Option<&mongodb::bson::Bson>) -> std::collections::HashMap<String, String> {
    let Some(mongodb::bson::Bson::Document(doc)) = value else { return Default::default() };
    doc.iter().filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string()))).collect()
}

fn document_to_schema_mapping(source: &Document) -> Option<SchemaMapping> {
    let mapping_doc = source.get_document("schemaMapping").ok()?;
    if mapping_doc.is_empty() {
        return None;
    }
    let schema_mapping = document_to_string_map(source.get("schemaMapping"));
    let conversions = source
        .get_document("conversions")
        .ok()
        .map(|d| mongodb::bson::from_document(d.clone()).unwrap_or_default())
        .unwrap_or_default();

    Some(SchemaMapping {
        schema_mapping,
        conversions,
        confidence: source.get_f64("mappingConfidence").unwrap_or(0.0),
        unmapped_fields: source
            .get_array("unmappedFields")
            .ok()
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default(),
        notes: source.get_str("mappingNotes").ok().map(str::to_string),
    })
}
