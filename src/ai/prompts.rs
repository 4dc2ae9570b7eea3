//! Prompt text for the two oracle-backed modes (C10/C11/C12, §4.9/§4.10).
//!
//! Paraphrased from `original_source/app/ai/prompts.py`'s system/user prompt pair for
//! each mode — not translated verbatim, since the original prose is LangChain
//! `ChatPromptTemplate` copy rather than code to port.

pub const DISCOVERY_SYSTEM_PROMPT: &str = "\
You are an expert at reading crawled website data for Indian agricultural market \
(mandi) portals and deciding how best to extract commodity price information from \
them. You will be given a summary of a crawl: pages visited, JSON API endpoints seen \
on the wire, HTML tables with their headers and sample rows, and downloadable files. \
Pick exactly one extraction strategy, in this order of preference: an API endpoint \
first (most reliable for repeat scraping), then an HTML table, then a PDF or Excel \
file as a last resort. Respond with structured JSON only.";

pub fn discovery_user_prompt(discovery_context_json: &str) -> String {
    format!(
        "Here is the discovery crawl result:\n\n{discovery_context_json}\n\n\
         Evaluate every candidate (APIs, tables, files), choose the single best \
         extraction strategy, provide concrete configuration for it, and give a \
         confidence score from 0.0 to 1.0."
    )
}

pub const MAPPING_SYSTEM_PROMPT: &str = "\
You are a data mapping specialist. You map raw field names from Indian agricultural \
market (mandi) data sources onto a fixed unified schema: cropName, mandiName, \
stateName, date, minPrice, maxPrice, modalPrice, unit (normalize to \"quintal\"), \
arrival, source, plus derivable identifiers cropId/mandiId/stateId. Identify any unit \
conversions (e.g. kg to quintal means multiply by 100) and the source's date format. \
Respond with structured JSON only.";

pub fn mapping_user_prompt(
    raw_fields_json: &str,
    sample_data_json: &str,
    source_url: &str,
    extraction_type: &str,
) -> String {
    format!(
        "Raw field names:\n{raw_fields_json}\n\n\
         Sample data (first few records):\n{sample_data_json}\n\n\
         Source URL: {source_url}\n\
         Extraction type: {extraction_type}\n\n\
         Map each raw field to a unified schema field, flag any that need conversion, \
         list fields with no mapping, and give a confidence score from 0.0 to 1.0."
    )
}
