use comfy_table::presets::UTF8_FULL;
use comfy_table::{CellAlignment, ContentArrangement, Table};
use oeecal_core::{
    AggregateResult, CalibrationReport, CalibrationStatus, CandidateEvaluation, ComponentMeans,
    FilterReport, MetricSummary, ReferenceDelta, RuleSet,
};
use oeecal_parser::LoadReport;

const NO_DATA: &str = "—";

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn align_right(table: &mut Table, from_column: usize) {
    let columns = table.column_count();
    for index in from_column..columns {
        if let Some(column) = table.column_mut(index) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
}

pub fn pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => NO_DATA.to_string(),
    }
}

fn pp(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.2}"),
        _ => NO_DATA.to_string(),
    }
}

fn summary_row(label: &str, summary: &MetricSummary) -> Vec<String> {
    vec![label.to_string(), pct(summary.mean), summary.count.to_string()]
}

pub fn load_table(parser: &str, content_hash: &str, report: &LoadReport) -> Table {
    let mut table = new_table(&["Load", "Value"]);
    table.add_row(vec!["parser".to_string(), parser.to_string()]);
    table.add_row(vec!["blake3".to_string(), content_hash.to_string()]);
    table.add_row(vec!["rows read".to_string(), report.rows_read.to_string()]);
    table.add_row(vec!["rows loaded".to_string(), report.rows_loaded.to_string()]);
    for (reason, count) in &report.dropped {
        table.add_row(vec![format!("dropped: {reason}"), count.to_string()]);
    }
    table
}

pub fn components_table(components: &ComponentMeans) -> Table {
    let mut table = new_table(&["Component", "Mean", "Samples"]);
    table.add_row(summary_row("availability", &components.availability));
    table.add_row(summary_row("performance", &components.performance));
    table.add_row(summary_row("quality", &components.quality));
    align_right(&mut table, 1);
    table
}

pub fn aggregates_table(results: &[AggregateResult]) -> Table {
    let mut table = new_table(&["Group", "OEE", "OEE n", "TEEP", "TEEP n"]);
    for result in results {
        table.add_row(vec![
            result.key.to_string(),
            pct(result.oee.mean),
            result.oee.count.to_string(),
            pct(result.teep.mean),
            result.teep.count.to_string(),
        ]);
    }
    align_right(&mut table, 1);
    table
}

pub fn filter_table(report: &FilterReport) -> Table {
    let mut table = new_table(&["Filter", "Records"]);
    let rows = [
        ("input", report.input),
        ("dropped: shift", report.dropped_shift),
        ("dropped: hour window", report.dropped_hour_window),
        ("dropped: calendar", report.dropped_calendar),
        ("dropped: inactive slot", report.dropped_inactive),
        ("OEE excluded: scheduled stoppage", report.oee_excluded_stoppage),
        ("TEEP zeroed: end of production", report.teep_zeroed_end_of_production),
    ];
    for (label, count) in rows {
        table.add_row(vec![label.to_string(), count.to_string()]);
    }
    align_right(&mut table, 1);
    table
}

pub fn rules_table(rules: &RuleSet) -> Table {
    let eligibility = &rules.eligibility;
    let period = eligibility
        .period
        .map(|p| format!("{} .. {}", p.from, p.to))
        .unwrap_or_else(|| "all dates".to_string());

    let mut table = new_table(&["Rule", "Setting"]);
    table.add_row(vec!["hour window".to_string(), eligibility.hour_window.to_string()]);
    table.add_row(vec![
        "day scope".to_string(),
        oeecal_core::DayScope::of(eligibility).as_str().to_string(),
    ]);
    table.add_row(vec![
        "activity".to_string(),
        oeecal_core::ActivityRule::of(eligibility).as_str().to_string(),
    ]);
    table.add_row(vec![
        "scheduled stoppage exclusion".to_string(),
        on_off(eligibility.apply_scheduled_stoppage_exclusion).to_string(),
    ]);
    table.add_row(vec!["averaging".to_string(), rules.averaging.as_str().to_string()]);
    table.add_row(vec!["period".to_string(), period]);
    table
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

pub fn candidates_table(candidates: &[CandidateEvaluation], top: usize) -> Table {
    let mut table = new_table(&[
        "#",
        "Window",
        "Days",
        "Activity",
        "Stoppages",
        "Averaging",
        "Total Δ pp",
        "Worst Δ pp",
    ]);
    for candidate in candidates.iter().take(top) {
        let eligibility = &candidate.rules.eligibility;
        table.add_row(vec![
            candidate.rank.to_string(),
            eligibility.hour_window.to_string(),
            candidate.day_scope.as_str().to_string(),
            candidate.activity_rule.as_str().to_string(),
            on_off(eligibility.apply_scheduled_stoppage_exclusion).to_string(),
            candidate.rules.averaging.as_str().to_string(),
            pp(Some(candidate.total_deviation_pp())),
            pp(Some(candidate.worst_deviation_pp())),
        ]);
    }
    align_right(&mut table, 6);
    table
}

pub fn deltas_table(deltas: &[ReferenceDelta]) -> Table {
    let mut table = new_table(&["Reference", "Expected", "Achieved", "Δ pp", "Samples"]);
    for delta in deltas {
        table.add_row(vec![
            format!("{} {}", delta.reference.scope, delta.reference.metric.as_str()),
            pct(Some(delta.reference.expected)),
            pct(delta.achieved),
            pp(delta.deviation_pp()),
            delta.count.to_string(),
        ]);
    }
    align_right(&mut table, 1);
    table
}

pub fn status_line(report: &CalibrationReport) -> String {
    match report.status {
        CalibrationStatus::Resolved => format!(
            "resolved: every reference within {:.2} pp",
            report.tolerance_pp
        ),
        CalibrationStatus::UnresolvedDiscrepancy { worst_delta_pp } => format!(
            "UNRESOLVED: worst reference off by {} pp (tolerance {:.2} pp)",
            pp(Some(worst_delta_pp)),
            report.tolerance_pp
        ),
    }
}
