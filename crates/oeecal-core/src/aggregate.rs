use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use oeecal_parser::{HourlyRecord, Shift};
use serde::{Deserialize, Serialize};

use crate::config::EligibilityConfig;
use crate::eligibility::{calendar_scope, EligibleRecordSet, FilterReport, MetricSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    None,
    Shift,
    Machine,
    Day,
    Hour,
    Month,
    DayHour,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GroupKey {
    All,
    Shift(Shift),
    Machine(String),
    Day(NaiveDate),
    Hour(u8),
    Month { year: i32, month: u32 },
    DayHour(NaiveDate, u8),
}

impl GroupKey {
    pub fn of(group_by: GroupBy, sample: &MetricSample) -> Self {
        match group_by {
            GroupBy::None => GroupKey::All,
            GroupBy::Shift => GroupKey::Shift(sample.shift),
            GroupBy::Machine => GroupKey::Machine(sample.machine_id.clone()),
            GroupBy::Day => GroupKey::Day(sample.date),
            GroupBy::Hour => GroupKey::Hour(sample.hour),
            GroupBy::Month => GroupKey::Month {
                year: sample.date.year(),
                month: sample.date.month(),
            },
            GroupBy::DayHour => GroupKey::DayHour(sample.date, sample.hour),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::All => f.write_str("All"),
            GroupKey::Shift(shift) => write!(f, "{shift}"),
            GroupKey::Machine(machine) => f.write_str(machine),
            GroupKey::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            GroupKey::Hour(hour) => write!(f, "{hour:02}:00"),
            GroupKey::Month { year, month } => write!(f, "{year}-{month:02}"),
            GroupKey::DayHour(date, hour) => {
                write!(f, "{} {hour:02}:00", date.format("%Y-%m-%d"))
            }
        }
    }
}

/// How eligible samples inside one group are reduced to a mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AveragingMethod {
    /// Unweighted mean of every eligible sample.
    #[default]
    Flat,
    /// Mean per calendar day, then mean of the daily means.
    DailyFirst,
    /// Mean per machine, then mean of the machine means.
    MachineFirst,
}

impl AveragingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AveragingMethod::Flat => "flat",
            AveragingMethod::DailyFirst => "daily_first",
            AveragingMethod::MachineFirst => "machine_first",
        }
    }
}

/// `mean` is `None` when the group had no eligible samples, which is not the
/// same thing as a mean of zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricSummary {
    pub mean: Option<f64>,
    pub count: usize,
}

impl MetricSummary {
    pub fn no_data() -> Self {
        Self::default()
    }

    pub fn mean_pct(&self) -> Option<f64> {
        self.mean.map(|m| m * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub key: GroupKey,
    pub oee: MetricSummary,
    pub teep: MetricSummary,
}

/// Groups the two eligible sets independently and summarises each group.
/// Output is ordered by key; `GroupBy::None` always yields exactly one row.
pub fn aggregate(
    oee: &[MetricSample],
    teep: &[MetricSample],
    group_by: GroupBy,
    method: AveragingMethod,
) -> Vec<AggregateResult> {
    let mut groups: BTreeMap<GroupKey, (Vec<&MetricSample>, Vec<&MetricSample>)> =
        BTreeMap::new();
    if group_by == GroupBy::None {
        groups.entry(GroupKey::All).or_default();
    }
    for sample in oee {
        groups
            .entry(GroupKey::of(group_by, sample))
            .or_default()
            .0
            .push(sample);
    }
    for sample in teep {
        groups
            .entry(GroupKey::of(group_by, sample))
            .or_default()
            .1
            .push(sample);
    }

    groups
        .into_iter()
        .map(|(key, (oee_samples, teep_samples))| AggregateResult {
            key,
            oee: summarize(&oee_samples, method),
            teep: summarize(&teep_samples, method),
        })
        .collect()
}

impl EligibleRecordSet {
    pub fn aggregate(&self, group_by: GroupBy, method: AveragingMethod) -> Vec<AggregateResult> {
        aggregate(&self.oee, &self.teep, group_by, method)
    }
}

pub fn summarize(samples: &[&MetricSample], method: AveragingMethod) -> MetricSummary {
    let mean = match method {
        AveragingMethod::Flat => mean(samples.iter().map(|s| s.value)),
        AveragingMethod::DailyFirst => two_stage_mean(samples, |s| s.date),
        AveragingMethod::MachineFirst => two_stage_mean(samples, |s| s.machine_id.as_str()),
    };
    MetricSummary {
        mean,
        count: samples.len(),
    }
}

fn two_stage_mean<'a, K, F>(samples: &[&'a MetricSample], key: F) -> Option<f64>
where
    K: Ord,
    F: Fn(&'a MetricSample) -> K,
{
    let mut buckets: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for sample in samples {
        buckets.entry(key(*sample)).or_default().push(sample.value);
    }
    mean(
        buckets
            .values()
            .filter_map(|values| mean(values.iter().copied())),
    )
}

pub(crate) fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Informational component ratios over records admitted by the shift, hour and
/// calendar rules. Performance and quality skip zero readings, which only mean
/// the machine was idle. OEE and TEEP are never derived from these.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ComponentMeans {
    pub availability: MetricSummary,
    pub performance: MetricSummary,
    pub quality: MetricSummary,
}

pub fn component_means(records: &[HourlyRecord], config: &EligibilityConfig) -> ComponentMeans {
    let mut report = FilterReport::default();
    let scoped = calendar_scope(records, config, &mut report);

    let summary = |values: Vec<f64>| MetricSummary {
        mean: mean(values.iter().copied()),
        count: values.len(),
    };
    let availability: Vec<f64> = scoped.iter().filter_map(|r| r.availability).collect();
    let performance: Vec<f64> = scoped
        .iter()
        .filter_map(|r| r.performance)
        .filter(|v| *v > 0.0)
        .collect();
    let quality: Vec<f64> = scoped
        .iter()
        .filter_map(|r| r.quality)
        .filter(|v| *v > 0.0)
        .collect();

    ComponentMeans {
        availability: summary(availability),
        performance: summary(performance),
        quality: summary(quality),
    }
}
