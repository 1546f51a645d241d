use std::collections::HashMap;

use chrono::NaiveDate;
use oeecal_parser::{fold_label, StoppageRecord};
use serde::Serialize;
use tracing::debug;

use crate::config::StoppagePolicy;

type SlotKey = (String, NaiveDate, u8);
type MachineSlots = HashMap<(NaiveDate, u8), SlotFlags>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SlotFlags {
    /// Planned stoppage time in the slot exceeds the threshold.
    pub scheduled: bool,
    /// The slot carries an end-of-production / no-operator label.
    pub end_of_production: bool,
}

#[derive(Debug, Default)]
struct SlotTotals {
    scheduled_secs: f64,
    end_of_production: bool,
}

/// Per `(machine, date, hour)` stoppage flags derived once from the production log.
/// Read-only after construction; lookups for unknown slots return no flags.
/// Keyed by machine first so lookups borrow the record's id.
#[derive(Debug, Clone, Default)]
pub struct StoppageIndex {
    slots: HashMap<String, MachineSlots>,
}

impl StoppageIndex {
    pub fn build(stoppages: &[StoppageRecord], policy: &StoppagePolicy) -> Self {
        let scheduled_keywords = folded(&policy.scheduled_keywords);
        let end_keywords = folded(&policy.end_of_production_keywords);

        let mut totals: HashMap<SlotKey, SlotTotals> = HashMap::new();
        for stoppage in stoppages {
            let label = fold_label(&stoppage.category);
            let is_scheduled = matches_any(&label, &scheduled_keywords);
            let is_end = matches_any(&label, &end_keywords);
            if !is_scheduled && !is_end {
                continue;
            }

            let entry = totals
                .entry((stoppage.machine_id.clone(), stoppage.date, stoppage.hour))
                .or_default();
            if is_scheduled {
                entry.scheduled_secs += stoppage.duration_secs;
            }
            entry.end_of_production |= is_end;
        }

        let mut slots: HashMap<String, MachineSlots> = HashMap::new();
        for ((machine_id, date, hour), total) in totals {
            let flags = SlotFlags {
                scheduled: total.scheduled_secs > policy.scheduled_threshold_secs,
                end_of_production: total.end_of_production,
            };
            if flags.scheduled || flags.end_of_production {
                slots.entry(machine_id).or_default().insert((date, hour), flags);
            }
        }

        let index = Self { slots };
        debug!(
            stoppage_rows = stoppages.len(),
            scheduled_slots = index.scheduled_slots(),
            end_of_production_slots = index.end_of_production_slots(),
            "stoppage index built"
        );
        index
    }

    pub fn flags(&self, machine_id: &str, date: NaiveDate, hour: u8) -> SlotFlags {
        self.slots
            .get(machine_id)
            .and_then(|machine| machine.get(&(date, hour)))
            .copied()
            .unwrap_or_default()
    }

    pub fn scheduled_slots(&self) -> usize {
        self.all_flags().filter(|f| f.scheduled).count()
    }

    pub fn end_of_production_slots(&self) -> usize {
        self.all_flags().filter(|f| f.end_of_production).count()
    }

    fn all_flags(&self) -> impl Iterator<Item = &SlotFlags> {
        self.slots.values().flat_map(HashMap::values)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

fn folded(keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| fold_label(k.trim()))
        .filter(|k| !k.is_empty())
        .collect()
}

fn matches_any(label: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|keyword| label.contains(keyword.as_str()))
}
