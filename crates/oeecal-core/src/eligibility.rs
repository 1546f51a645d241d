use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use oeecal_parser::{HourlyRecord, Shift};
use serde::Serialize;
use tracing::debug;

use crate::config::{ActivityGrouping, DayScope, EligibilityConfig};
use crate::stoppage::{SlotFlags, StoppageIndex};

/// One record's contribution to one metric. TEEP samples may carry a forced zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub machine_id: String,
    pub date: NaiveDate,
    pub shift: Shift,
    pub hour: u8,
    pub value: f64,
}

impl MetricSample {
    fn from_record(record: &HourlyRecord, value: f64) -> Self {
        Self {
            machine_id: record.machine_id.clone(),
            date: record.date,
            shift: record.shift,
            hour: record.hour,
            value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    pub input: usize,
    pub dropped_shift: usize,
    pub dropped_hour_window: usize,
    /// Weekend (per day scope) or outside the configured period.
    pub dropped_calendar: usize,
    pub dropped_inactive: usize,
    pub oee_excluded_stoppage: usize,
    pub teep_zeroed_end_of_production: usize,
}

/// OEE and TEEP inputs after filtering. The two sets can differ: a scheduled
/// stoppage removes a record from `oee` only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EligibleRecordSet {
    pub oee: Vec<MetricSample>,
    pub teep: Vec<MetricSample>,
    pub report: FilterReport,
}

/// Runs the eligibility rules in order: shift, hour window, calendar, plant
/// activity, stoppage policy. Pure; safe to call repeatedly with different configs.
pub fn filter(
    records: &[HourlyRecord],
    stoppages: Option<&StoppageIndex>,
    config: &EligibilityConfig,
) -> EligibleRecordSet {
    let mut report = FilterReport {
        input: records.len(),
        ..FilterReport::default()
    };

    let scoped = calendar_scope(records, config, &mut report);
    let active = if config.require_global_activity {
        drop_inactive_slots(scoped, config.activity_grouping, &mut report)
    } else {
        scoped
    };

    let mut oee = Vec::with_capacity(active.len());
    let mut teep = Vec::with_capacity(active.len());
    for record in active {
        let flags = match stoppages {
            Some(index) if config.apply_scheduled_stoppage_exclusion => {
                index.flags(&record.machine_id, record.date, record.hour)
            }
            _ => SlotFlags::default(),
        };

        if flags.scheduled {
            report.oee_excluded_stoppage += 1;
        } else {
            oee.push(MetricSample::from_record(record, record.oee));
        }

        let teep_value = if flags.end_of_production {
            report.teep_zeroed_end_of_production += 1;
            0.0
        } else {
            record.teep
        };
        teep.push(MetricSample::from_record(record, teep_value));
    }

    debug!(
        input = report.input,
        dropped_shift = report.dropped_shift,
        dropped_hour_window = report.dropped_hour_window,
        dropped_calendar = report.dropped_calendar,
        dropped_inactive = report.dropped_inactive,
        oee_eligible = oee.len(),
        teep_eligible = teep.len(),
        "eligibility filter applied"
    );

    EligibleRecordSet { oee, teep, report }
}

/// Records surviving the shift, hour, calendar and activity rules, before any
/// stoppage policy is applied.
pub fn eligible_records<'a>(
    records: &'a [HourlyRecord],
    config: &EligibilityConfig,
) -> Vec<&'a HourlyRecord> {
    let mut report = FilterReport::default();
    let scoped = calendar_scope(records, config, &mut report);
    if config.require_global_activity {
        drop_inactive_slots(scoped, config.activity_grouping, &mut report)
    } else {
        scoped
    }
}

pub(crate) fn calendar_scope<'a>(
    records: &'a [HourlyRecord],
    config: &EligibilityConfig,
    report: &mut FilterReport,
) -> Vec<&'a HourlyRecord> {
    let days = DayScope::of(config);
    records
        .iter()
        .filter(|record| {
            if !record.shift.is_admitted() {
                report.dropped_shift += 1;
                return false;
            }
            if !config.hour_window.contains(record.hour) {
                report.dropped_hour_window += 1;
                return false;
            }
            let in_period = config
                .period
                .map_or(true, |period| period.contains(record.date));
            if !in_period || !days.admits(record.date.weekday()) {
                report.dropped_calendar += 1;
                return false;
            }
            true
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ActivitySlot {
    date: NaiveDate,
    shift: Option<Shift>,
    hour: u8,
}

impl ActivitySlot {
    fn of(record: &HourlyRecord, grouping: ActivityGrouping) -> Self {
        Self {
            date: record.date,
            shift: match grouping {
                ActivityGrouping::Global => None,
                ActivityGrouping::PerShift => Some(record.shift),
            },
            hour: record.hour,
        }
    }
}

/// Sums are taken over `records` as given, so the earlier steps decide who is summed.
fn drop_inactive_slots<'a>(
    records: Vec<&'a HourlyRecord>,
    grouping: ActivityGrouping,
    report: &mut FilterReport,
) -> Vec<&'a HourlyRecord> {
    let mut oee_sums: HashMap<ActivitySlot, f64> = HashMap::new();
    for record in &records {
        *oee_sums
            .entry(ActivitySlot::of(record, grouping))
            .or_insert(0.0) += record.oee;
    }

    let before = records.len();
    let kept: Vec<&HourlyRecord> = records
        .into_iter()
        .filter(|record| {
            oee_sums
                .get(&ActivitySlot::of(record, grouping))
                .is_some_and(|sum| *sum > 0.0)
        })
        .collect();
    report.dropped_inactive += before - kept.len();
    kept
}
