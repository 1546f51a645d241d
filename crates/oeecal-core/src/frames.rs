use std::fs::File;
use std::path::Path;

use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::*;

use crate::aggregate::AggregateResult;
use crate::calibration::CandidateEvaluation;
use crate::error::Result;

pub fn aggregates_dataframe(results: &[AggregateResult]) -> PolarsResult<DataFrame> {
    let group: Vec<String> = results.iter().map(|r| r.key.to_string()).collect();
    let oee_mean: Vec<Option<f64>> = results.iter().map(|r| r.oee.mean).collect();
    let oee_count: Vec<u64> = results.iter().map(|r| r.oee.count as u64).collect();
    let teep_mean: Vec<Option<f64>> = results.iter().map(|r| r.teep.mean).collect();
    let teep_count: Vec<u64> = results.iter().map(|r| r.teep.count as u64).collect();

    DataFrame::new(vec![
        Series::new("group".into(), group).into(),
        Series::new("oee_mean".into(), oee_mean).into(),
        Series::new("oee_count".into(), oee_count).into(),
        Series::new("teep_mean".into(), teep_mean).into(),
        Series::new("teep_count".into(), teep_count).into(),
    ])
}

/// One row per candidate in ranked order. Incomplete candidates have a null
/// total deviation.
pub fn candidates_dataframe(candidates: &[CandidateEvaluation]) -> PolarsResult<DataFrame> {
    let rank: Vec<u32> = candidates.iter().map(|c| c.rank as u32).collect();
    let index: Vec<u32> = candidates.iter().map(|c| c.index as u32).collect();
    let hour_min: Vec<u32> = candidates
        .iter()
        .map(|c| u32::from(c.rules.eligibility.hour_window.min))
        .collect();
    let hour_max: Vec<u32> = candidates
        .iter()
        .map(|c| u32::from(c.rules.eligibility.hour_window.max))
        .collect();
    let day_scope: Vec<&str> = candidates.iter().map(|c| c.day_scope.as_str()).collect();
    let activity: Vec<&str> = candidates
        .iter()
        .map(|c| c.activity_rule.as_str())
        .collect();
    let stoppage_exclusion: Vec<bool> = candidates
        .iter()
        .map(|c| c.rules.eligibility.apply_scheduled_stoppage_exclusion)
        .collect();
    let averaging: Vec<&str> = candidates
        .iter()
        .map(|c| c.rules.averaging.as_str())
        .collect();
    let total_pp: Vec<Option<f64>> = candidates
        .iter()
        .map(|c| c.is_complete().then(|| c.total_deviation_pp()))
        .collect();
    let fingerprint: Vec<&str> = candidates.iter().map(|c| c.fingerprint.as_str()).collect();

    DataFrame::new(vec![
        Series::new("rank".into(), rank).into(),
        Series::new("grid_index".into(), index).into(),
        Series::new("hour_min".into(), hour_min).into(),
        Series::new("hour_max".into(), hour_max).into(),
        Series::new("day_scope".into(), day_scope).into(),
        Series::new("activity_rule".into(), activity).into(),
        Series::new("stoppage_exclusion".into(), stoppage_exclusion).into(),
        Series::new("averaging".into(), averaging).into(),
        Series::new("total_deviation_pp".into(), total_pp).into(),
        Series::new("fingerprint".into(), fingerprint).into(),
    ])
}

pub fn write_parquet(df: &DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    let mut clone = df.clone();
    ParquetWriter::new(&mut file)
        .with_compression(ParquetCompression::Zstd(None))
        .with_statistics(StatisticsOptions::default())
        .finish(&mut clone)?;
    Ok(())
}
