use std::fs::File;

use chrono::NaiveDate;
use polars::prelude::*;

use oeecal_core::aggregate::{AggregateResult, GroupKey, MetricSummary};
use oeecal_core::calibration::{calibrate, KnownReference};
use oeecal_core::config::{CalibrationSettings, ReconSettings};
use oeecal_core::frames::{aggregates_dataframe, candidates_dataframe, write_parquet};
use oeecal_core::pipeline::Dataset;
use oeecal_parser::{HourlyRecord, Shift};

#[test]
fn aggregates_frame_keeps_no_data_as_null() -> PolarsResult<()> {
    let results = vec![
        AggregateResult {
            key: GroupKey::Shift(Shift::A),
            oee: MetricSummary {
                mean: Some(0.5),
                count: 4,
            },
            teep: MetricSummary {
                mean: Some(0.0),
                count: 1,
            },
        },
        AggregateResult {
            key: GroupKey::Shift(Shift::B),
            oee: MetricSummary::no_data(),
            teep: MetricSummary {
                mean: Some(0.25),
                count: 2,
            },
        },
    ];

    let df = aggregates_dataframe(&results)?;
    assert_eq!(df.height(), 2);

    let group = df.column("group")?.str()?;
    assert_eq!(group.get(0), Some("Shift A"));
    let oee = df.column("oee_mean")?.f64()?;
    assert_eq!(oee.get(0), Some(0.5));
    assert_eq!(oee.get(1), None);
    let teep = df.column("teep_mean")?.f64()?;
    assert_eq!(teep.get(0), Some(0.0));
    let oee_count = df.column("oee_count")?.u64()?;
    assert_eq!(oee_count.get(1), Some(0));
    Ok(())
}

#[test]
fn candidates_frame_round_trips_through_parquet() -> Result<(), Box<dyn std::error::Error>> {
    let day = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
    let records: Vec<HourlyRecord> = (6u8..=21)
        .map(|hour| HourlyRecord {
            machine_id: "M01".to_string(),
            date: day,
            shift: if hour < 14 { Shift::A } else { Shift::B },
            hour,
            availability: None,
            performance: None,
            quality: None,
            oee: 0.6,
            teep: 0.4,
        })
        .collect();
    let dataset = Dataset::new(records, None);
    let references: Vec<KnownReference> = vec!["overall:teep=40".parse()?];
    let outcome = calibrate(
        &dataset,
        &references,
        &ReconSettings::default().rule_set(),
        &CalibrationSettings::default(),
    )?;
    let report = outcome.report().ok_or("calibration did not run")?;

    let df = candidates_dataframe(&report.candidates)?;
    assert_eq!(df.height(), 90);
    let rank = df.column("rank")?.u32()?;
    assert_eq!(rank.get(0), Some(1));
    let day_scope = df.column("day_scope")?.str()?;
    assert!(day_scope.get(0).is_some());

    let path = std::env::temp_dir()
        .join(format!("oeecal-candidates-{}.parquet", std::process::id()));
    write_parquet(&df, &path)?;
    let read_back = ParquetReader::new(File::open(&path)?).finish()?;
    std::fs::remove_file(&path)?;

    assert_eq!(read_back.height(), 90);
    assert_eq!(read_back.get_column_names(), df.get_column_names());
    Ok(())
}
