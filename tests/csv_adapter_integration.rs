//! File-backed round-trip tests for the CSV input/output adapters (C18, §10.4).

use mandi_agent::io::csv_adapters::{CsvInput, CsvOutput};
use mandi_agent::core::types::UnifiedPriceRecord;

fn sample_record() -> UnifiedPriceRecord {
    UnifiedPriceRecord {
        crop_id: "onion".to_string(),
        crop_name: "Onion".to_string(),
        mandi_id: "pune".to_string(),
        mandi_name: "Pune".to_string(),
        state_id: "maharashtra".to_string(),
        state_name: "Maharashtra".to_string(),
        date: "2026-07-29".to_string(),
        min_price: 900.0,
        max_price: 1300.0,
        modal_price: 1100.0,
        unit: "quintal".to_string(),
        arrival: Some(42.0),
        source: "other".to_string(),
    }
}

#[test]
fn csv_input_skips_rows_with_no_entry_url() {
    let dir = std::env::temp_dir().join(format!("mandi_agent_csv_input_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("sources.csv");
    std::fs::write(&path, "entryUrl,name,extractionType\nhttps://example.com/mandi,Example,api\n,Blank,html_table\n")
        .unwrap();

    let input = CsvInput::new(&path);
    let sources = input.load_sources().unwrap();

    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].get_str("entryUrl").unwrap(), "https://example.com/mandi");
    assert_eq!(sources[0].get_str("extractionType").unwrap(), "api");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn csv_input_errors_when_file_missing() {
    let input = CsvInput::new("/nonexistent/path/sources.csv");
    assert!(input.load_sources().is_err());
}

#[test]
fn csv_output_writes_prices_csv_and_json() {
    let dir = std::env::temp_dir().join(format!("mandi_agent_csv_output_{}", std::process::id()));
    let output = CsvOutput::new(&dir).unwrap();

    let records = vec![sample_record()];
    let written = output.save_prices(&records).unwrap();
    assert_eq!(written, 1);

    let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().filter_map(|e| e.ok()).collect();
    let has_csv = entries.iter().any(|e| e.path().extension().map(|x| x == "csv").unwrap_or(false));
    let has_json = entries.iter().any(|e| e.path().extension().map(|x| x == "json").unwrap_or(false));
    assert!(has_csv, "expected a prices_*.csv file to be written");
    assert!(has_json, "expected a prices_*.json file to be written");

    std::fs::remove_dir_all(&dir).ok();
}
