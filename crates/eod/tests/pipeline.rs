//! End-to-end runs from delimited text to rendered rows.

use std::sync::Arc;

use chrono::NaiveDate;
use minuteup_calendar::{TradingDateIndex, WeekdayCalendar};
use minuteup_core::{Config, Error};
use minuteup_eod::{MemorySink, PseudoEodConverter};
use minuteup_ingestion::{BarAggregator, MinuteBarReader};

const INPUT: &str = "\
20240313,1530,9,9.5,8.5,9.2,300
20240314,1500,10,10.5,9.9,10.2,1000,1,0,0
20240314,1501,10.2,10.8,10.1,10.6,1550.5,1,0,0.1
20240314,1531,10.6,10.7,10.3,10.4,800,0.5,0,0
20240314,1559,10.4,10.9,10.4,10.9,1.2E+3,0.5,0,0
20240314,1600,10.9,11,10.9,11,50,0.5,0,0
";

fn make_config() -> Config {
    Config::from_json_str(
        r#"{
            "instrument": { "id": 42, "symbol": "TEST" },
            "aggregation": { "width_minutes": 30, "session_start": "09:30:00", "session_end": "16:00:00" },
            "attribution": { "anchor_date": "2024-03-15", "calendar_start": "2024-01-01" }
        }"#,
    )
    .unwrap()
}

fn rows_of(sink: &MemorySink) -> Vec<Vec<String>> {
    sink.rows().iter().map(|row| row.csv_record()).collect()
}

#[test]
fn test_aggregation_mode_rows() {
    let config = make_config();
    let bars: Vec<_> = MinuteBarReader::new(INPUT.as_bytes()).collect::<Result<_, _>>().unwrap();

    let mut aggregator = BarAggregator::new(config.aggregation.width_minutes, config.aggregation.session());
    let rows: Vec<Vec<String>> = aggregator.aggregate(&bars).iter().map(|b| b.csv_record()).collect();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], vec!["20240313", "1530", "9", "9.5", "8.5", "9.2", "300", "1", "0", "0"]);
    assert_eq!(
        rows[1],
        vec!["20240314", "1500", "10", "10.8", "9.9", "10.6", "2550.5", "1", "0", "0.1"]
    );
    assert_eq!(rows[2][..2], ["20240314".to_string(), "1530".to_string()]);
    assert_eq!(rows[2][6], "2000");
    assert_eq!(aggregator.stats().bars_out_of_session, 1);
}

#[test]
fn test_attribution_mode_rows() {
    let config = make_config();
    let index = Arc::new(TradingDateIndex::from_config(&config, &WeekdayCalendar::new()).unwrap());
    let mut converter = PseudoEodConverter::from_config(&config, index);
    let mut sink = MemorySink::new();

    let summary = converter.run(MinuteBarReader::new(INPUT.as_bytes()), &mut sink).unwrap();
    assert_eq!(summary.eod_records, 3);
    assert_eq!(summary.splits, 1);
    assert_eq!(summary.dividends, 1);

    let rows = rows_of(&sink);
    // Wednesday's last bucket sits thirteen steps back from the anchor.
    assert_eq!(rows[0], vec!["2024-02-27", "1600", "9", "9.5", "8.5", "9.2", "3", "NA", "NA"]);
    // The ratio change is reported against the bucket before the change.
    assert_eq!(rows[1], vec!["2024-03-14", "1600", "10", "10.8", "9.9", "10.6", "25", "2/1", "0.1"]);
    assert_eq!(rows[2], vec!["2024-03-15", "1600", "10.6", "10.9", "10.3", "10.9", "20", "NA", "NA"]);
    assert!(sink.eod.iter().all(|e| e.instrument_id == 42));
}

#[test]
fn test_holiday_shifts_attribution() {
    let config = make_config();
    let holiday = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
    let calendar = WeekdayCalendar::with_holidays([holiday]);
    let index = Arc::new(TradingDateIndex::from_config(&config, &calendar).unwrap());
    let mut converter = PseudoEodConverter::from_config(&config, index);
    let mut sink = MemorySink::new();

    converter.run(MinuteBarReader::new(INPUT.as_bytes()), &mut sink).unwrap();

    let rows = rows_of(&sink);
    assert_eq!(rows[1][0], "2024-03-13");
    assert_eq!(rows[2][0], "2024-03-15");
}

#[test]
fn test_malformed_record_aborts_run() {
    let config = make_config();
    let index = Arc::new(TradingDateIndex::from_config(&config, &WeekdayCalendar::new()).unwrap());
    let mut converter = PseudoEodConverter::from_config(&config, index);
    let mut sink = MemorySink::new();

    let input = "20240314,1500,10,10.5,9.9,10.2,1000\n2024031,1501,10,10,10,10,1\n";
    let result = converter.run(MinuteBarReader::new(input.as_bytes()), &mut sink);

    assert!(matches!(result, Err(Error::Parse { line: 2, .. })));
    assert!(sink.eod.is_empty());
}

#[test]
fn test_bucket_outside_index_fails() {
    // Bars on the anchor date are never indexed.
    let config = make_config();
    let index = Arc::new(TradingDateIndex::from_config(&config, &WeekdayCalendar::new()).unwrap());
    let mut converter = PseudoEodConverter::from_config(&config, index);
    let mut sink = MemorySink::new();

    let input = "20240315,1000,10,10,10,10,100\n";
    let result = converter.run(MinuteBarReader::new(input.as_bytes()), &mut sink);

    assert!(matches!(result, Err(Error::TradingDateNotFound { .. })));
}
