use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Shift {
    A,
    B,
    C,
}

impl Shift {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shift::A => "A",
            Shift::B => "B",
            Shift::C => "C",
        }
    }

    /// Only shifts A and B ever take part in aggregation.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Shift::A | Shift::B)
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shift {}", self.as_str())
    }
}

impl TryFrom<&str> for Shift {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Shift::A),
            "B" => Ok(Shift::B),
            "C" => Ok(Shift::C),
            other => Err(format!("unknown shift '{other}'")),
        }
    }
}

/// One machine's telemetry for one hour of one shift.
///
/// `oee` and `teep` are the values the export reports, not products of the
/// component ratios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyRecord {
    pub machine_id: String,
    pub date: NaiveDate,
    pub shift: Shift,
    pub hour: u8,
    pub availability: Option<f64>,
    pub performance: Option<f64>,
    pub quality: Option<f64>,
    pub oee: f64,
    pub teep: f64,
}

/// One line of the production log that may describe a stoppage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoppageRecord {
    pub machine_id: String,
    pub date: NaiveDate,
    pub hour: u8,
    pub category: String,
    pub duration_secs: f64,
}

/// Why a source row was skipped. Skips are expected (banner rows, subtotal lines)
/// and are only counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    ShortRow,
    MissingMachine,
    BannerRow,
    InvalidDate,
    UnknownShift,
    ShiftCExcluded,
    InvalidHour,
    InvalidMetric,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::ShortRow => "short_row",
            DropReason::MissingMachine => "missing_machine",
            DropReason::BannerRow => "banner_row",
            DropReason::InvalidDate => "invalid_date",
            DropReason::UnknownShift => "unknown_shift",
            DropReason::ShiftCExcluded => "shift_c_excluded",
            DropReason::InvalidHour => "invalid_hour",
            DropReason::InvalidMetric => "invalid_metric",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_loaded: usize,
    pub dropped: BTreeMap<DropReason, usize>,
}

impl LoadReport {
    pub(crate) fn record_drop(&mut self, reason: DropReason) {
        *self.dropped.entry(reason).or_insert(0) += 1;
    }

    pub fn total_dropped(&self) -> usize {
        self.dropped.values().sum()
    }

    pub fn dropped_for(&self, reason: DropReason) -> usize {
        self.dropped.get(&reason).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParsedOeeTable {
    pub parser: &'static str,
    pub content_hash: String,
    pub records: Vec<HourlyRecord>,
    pub report: LoadReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParsedStoppageLog {
    pub parser: &'static str,
    pub content_hash: String,
    pub stoppages: Vec<StoppageRecord>,
    pub report: LoadReport,
}

/// Interpretation of a numeric cell that carries no `%` sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BareNumberScale {
    /// `72,5` means 72.5 %.
    #[default]
    Percent,
    /// `0,725` means 72.5 %.
    Fraction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoadOptions {
    /// Keep shift C rows in the loaded set. Aggregation still ignores them.
    pub keep_shift_c: bool,
    pub bare_numbers: BareNumberScale,
    /// Machine cells containing any of these (case-insensitive) are banner rows.
    pub banner_markers: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            keep_shift_c: false,
            bare_numbers: BareNumberScale::Percent,
            banner_markers: vec!["turno".to_string()],
        }
    }
}
