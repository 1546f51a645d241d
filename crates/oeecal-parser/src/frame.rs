use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use crate::model::HourlyRecord;

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub(crate) fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Polars `Date` series from calendar dates.
pub fn date_series(name: &str, dates: &[NaiveDate]) -> PolarsResult<Series> {
    let days: Vec<i32> = dates.iter().copied().map(days_since_epoch).collect();
    Series::new(name.into(), days).cast(&DataType::Date)
}

/// One row per loaded record, in load order, for the reporting layer.
pub fn records_dataframe(records: &[HourlyRecord]) -> PolarsResult<DataFrame> {
    let machine: Vec<&str> = records.iter().map(|r| r.machine_id.as_str()).collect();
    let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
    let shift: Vec<&str> = records.iter().map(|r| r.shift.as_str()).collect();
    let hour: Vec<i32> = records.iter().map(|r| i32::from(r.hour)).collect();
    let availability: Vec<Option<f64>> = records.iter().map(|r| r.availability).collect();
    let performance: Vec<Option<f64>> = records.iter().map(|r| r.performance).collect();
    let quality: Vec<Option<f64>> = records.iter().map(|r| r.quality).collect();
    let oee: Vec<f64> = records.iter().map(|r| r.oee).collect();
    let teep: Vec<f64> = records.iter().map(|r| r.teep).collect();

    DataFrame::new(vec![
        Series::new("machine_id".into(), machine).into(),
        date_series("date", &dates)?.into(),
        Series::new("shift".into(), shift).into(),
        Series::new("hour".into(), hour).into(),
        Series::new("availability".into(), availability).into(),
        Series::new("performance".into(), performance).into(),
        Series::new("quality".into(), quality).into(),
        Series::new("oee".into(), oee).into(),
        Series::new("teep".into(), teep).into(),
    ])
}
