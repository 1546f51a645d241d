use chrono::NaiveDate;
use oeecal_core::calibration::{
    calibrate, evaluate_candidate, CalibrationOutcome, CalibrationStatus, KnownReference, Metric,
    ReferenceScope,
};
use oeecal_core::config::{
    CalibrationGrid, CalibrationSettings, DayScope, HourWindow, RuleSet, StoppagePolicy,
};
use oeecal_core::pipeline::Dataset;
use oeecal_core::stoppage::StoppageIndex;
use oeecal_core::ReconSettings;
use oeecal_parser::{HourlyRecord, Shift, StoppageRecord};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn record(
    machine: &str,
    day: NaiveDate,
    shift: Shift,
    hour: u8,
    oee: f64,
    teep: f64,
) -> HourlyRecord {
    HourlyRecord {
        machine_id: machine.to_string(),
        date: day,
        shift,
        hour,
        availability: None,
        performance: None,
        quality: None,
        oee,
        teep,
    }
}

fn reference(input: &str) -> KnownReference {
    input.parse().expect("reference should parse")
}

/// Two machines over 2026-02-02 (Mon) .. 2026-02-08 (Sun). Weekday shift A hours
/// carry TEEP 40.23 %, weekday shift B hours 42.19 %. Weekend, early-morning and
/// late-evening hours carry values far from either, so only a weekday scope with
/// a 6/7..21 window reproduces both references.
fn reference_period() -> Dataset {
    let mut records = Vec::new();
    for day in 2..=8 {
        let d = date(2026, 2, day);
        let weekend = day >= 7;
        for machine in ["M01", "M02"] {
            for hour in 5u8..=22 {
                let shift = if hour < 14 { Shift::A } else { Shift::B };
                let teep = match (weekend, hour, shift) {
                    (true, _, _) => 0.05,
                    (false, 5, _) | (false, 22, _) => 0.95,
                    (false, _, Shift::A) => 0.4023,
                    (false, _, _) => 0.4219,
                };
                records.push(record(machine, d, shift, hour, 0.55, teep));
            }
        }
    }
    Dataset::new(records, None)
}

fn base_rules() -> RuleSet {
    ReconSettings::default().rule_set()
}

#[test]
fn empty_references_return_base_rules_unchanged() {
    let dataset = reference_period();
    let base = base_rules();
    let outcome = calibrate(&dataset, &[], &base, &CalibrationSettings::default())
        .expect("calibration");

    match &outcome {
        CalibrationOutcome::NotPerformed { rules } => assert_eq!(rules, &base),
        other => panic!("expected NotPerformed, got {other:?}"),
    }
    assert!(outcome.report().is_none());
    assert_eq!(outcome.rules(), &base);
}

#[test]
fn shift_teep_references_pick_the_argmin_candidate() {
    let dataset = reference_period();
    let references = vec![reference("shift:A:teep=40.23"), reference("shift:B:teep=42.19")];
    let settings = CalibrationSettings::default();
    let outcome = calibrate(&dataset, &references, &base_rules(), &settings).expect("calibration");
    let report = outcome.report().expect("calibration should run");

    assert_eq!(report.candidates.len(), 90);
    assert_eq!(report.status, CalibrationStatus::Resolved);

    let best = &report.best;
    assert!(best.total_deviation < 1e-9, "best deviation {}", best.total_deviation);
    assert_eq!(best.day_scope, DayScope::Weekdays);
    let window = best.rules.eligibility.hour_window;
    assert!(
        window == HourWindow::new(6, 21).unwrap() || window == HourWindow::new(7, 21).unwrap(),
        "unexpected window {window}"
    );
    let achieved: Vec<f64> = best.deltas.iter().filter_map(|d| d.achieved).collect();
    assert!((achieved[0] - 0.4023).abs() < 1e-9);
    assert!((achieved[1] - 0.4219).abs() < 1e-9);

    // Brute force: re-score every grid candidate independently.
    let min = settings
        .grid
        .candidates(&base_rules().eligibility)
        .iter()
        .enumerate()
        .map(|(idx, rules)| {
            evaluate_candidate(&dataset, idx, rules, &references)
                .expect("candidate")
                .total_deviation
        })
        .fold(f64::INFINITY, f64::min);
    assert_eq!(best.total_deviation, min);
}

#[test]
fn single_reference_best_beats_every_candidate() {
    let dataset = reference_period();
    let references = vec![reference("overall:teep=30")];
    let settings = CalibrationSettings::default();
    let outcome = calibrate(&dataset, &references, &base_rules(), &settings).expect("calibration");
    let report = outcome.report().expect("calibration should run");

    for candidate in &report.candidates {
        let rescored = evaluate_candidate(&dataset, candidate.index, &candidate.rules, &references)
            .expect("candidate");
        assert_eq!(rescored.total_deviation, candidate.total_deviation);
        assert!(report.best.total_deviation <= rescored.total_deviation);
    }

    let ranks: Vec<usize> = report.candidates.iter().map(|c| c.rank).collect();
    assert_eq!(ranks, (1..=90).collect::<Vec<_>>());
    assert!(report
        .candidates
        .windows(2)
        .all(|w| w[0].total_deviation <= w[1].total_deviation));
}

#[test]
fn unreachable_reference_is_flagged_unresolved() {
    let dataset = reference_period();
    let references = vec![reference("shift:A:teep=90")];
    let outcome = calibrate(
        &dataset,
        &references,
        &base_rules(),
        &CalibrationSettings::default(),
    )
    .expect("calibration");
    let report = outcome.report().expect("calibration should run");

    match report.status {
        CalibrationStatus::UnresolvedDiscrepancy { worst_delta_pp } => {
            assert!(worst_delta_pp > report.tolerance_pp);
            assert!((worst_delta_pp - report.best.worst_deviation_pp()).abs() < 1e-12);
        }
        CalibrationStatus::Resolved => panic!("expected an unresolved discrepancy"),
    }
}

#[test]
fn no_data_candidates_rank_last() {
    let dataset = reference_period();
    let saturday = date(2026, 2, 7);
    let references = vec![KnownReference {
        scope: ReferenceScope::Day(saturday),
        metric: Metric::Oee,
        expected: 0.55,
    }];
    let outcome = calibrate(
        &dataset,
        &references,
        &base_rules(),
        &CalibrationSettings::default(),
    )
    .expect("calibration");
    let report = outcome.report().expect("calibration should run");

    // Weekday-only candidates see no Saturday records at all.
    let incomplete = report.candidates.iter().filter(|c| !c.is_complete()).count();
    assert_eq!(incomplete, 30);
    let first_incomplete = report
        .candidates
        .iter()
        .position(|c| !c.is_complete())
        .unwrap();
    assert_eq!(first_incomplete, 60);
    assert!(report.candidates[60..]
        .iter()
        .all(|c| c.day_scope == DayScope::Weekdays && c.deltas[0].achieved.is_none()));
    assert!(report.best.is_complete());
}

#[test]
fn ties_keep_enumeration_order() {
    let records = vec![record("M01", date(2026, 2, 3), Shift::A, 10, 0.5, 0.5)];
    let dataset = Dataset::new(records, None);
    let references = vec![reference("overall:oee=50")];
    let outcome = calibrate(
        &dataset,
        &references,
        &base_rules(),
        &CalibrationSettings::default(),
    )
    .expect("calibration");
    let report = outcome.report().expect("calibration should run");

    assert_eq!(report.best.index, 0);
    let order: Vec<usize> = report.candidates.iter().map(|c| c.index).collect();
    assert_eq!(order, (0..90).collect::<Vec<_>>());
}

#[test]
fn stoppage_exclusion_dimension_changes_oee() {
    let day = date(2026, 2, 3);
    let records = vec![
        record("M01", day, Shift::A, 8, 0.2, 0.2),
        record("M02", day, Shift::A, 8, 0.8, 0.8),
    ];
    let stoppages = vec![StoppageRecord {
        machine_id: "M01".to_string(),
        date: day,
        hour: 8,
        category: "PARADA PREVISTA - MANUTENÇÃO".to_string(),
        duration_secs: 3600.0,
    }];
    let index = StoppageIndex::build(&stoppages, &StoppagePolicy::default());
    let dataset = Dataset::new(records, Some(index));

    let settings = CalibrationSettings {
        grid: CalibrationGrid {
            hour_windows: vec![HourWindow::new(6, 21).unwrap()],
            day_scopes: vec![DayScope::Weekdays],
            stoppage_exclusion: vec![false, true],
            ..CalibrationGrid::default()
        },
        ..CalibrationSettings::default()
    };
    let references = vec![reference("overall:oee=80")];
    let outcome =
        calibrate(&dataset, &references, &base_rules(), &settings).expect("calibration");
    let report = outcome.report().expect("calibration should run");

    assert_eq!(report.candidates.len(), 6);
    assert!(report.best.rules.eligibility.apply_scheduled_stoppage_exclusion);
    assert!(report.best.total_deviation < 1e-9);
    assert_eq!(report.status, CalibrationStatus::Resolved);
}

#[test]
fn fingerprints_identify_rules_and_inputs() {
    let mut dataset = reference_period();
    dataset.input_hashes = vec!["abc".to_string()];
    let references = vec![reference("overall:teep=40")];
    let outcome = calibrate(
        &dataset,
        &references,
        &base_rules(),
        &CalibrationSettings::default(),
    )
    .expect("calibration");
    let report = outcome.report().expect("calibration should run");

    let mut fingerprints: Vec<&str> = report
        .candidates
        .iter()
        .map(|c| c.fingerprint.as_str())
        .collect();
    fingerprints.sort_unstable();
    fingerprints.dedup();
    assert_eq!(fingerprints.len(), 90);

    let rules = &report.best.rules;
    assert_eq!(dataset.fingerprint(rules).unwrap(), report.best.fingerprint);

    dataset.input_hashes = vec!["abd".to_string()];
    assert_ne!(dataset.fingerprint(rules).unwrap(), report.best.fingerprint);
}

#[test]
fn references_parse_from_command_line_form() {
    let r = reference("shift:B:teep=42,19");
    assert_eq!(r.scope, ReferenceScope::Shift(Shift::B));
    assert_eq!(r.metric, Metric::Teep);
    assert!((r.expected - 0.4219).abs() < 1e-12);

    let r = reference("machine:29:oee=61.5%");
    assert_eq!(r.scope, ReferenceScope::Machine("29".to_string()));
    assert_eq!(r.metric, Metric::Oee);

    let r = reference("day:2026-02-03:oee=50");
    assert_eq!(r.scope, ReferenceScope::Day(date(2026, 2, 3)));
    assert_eq!(r.to_string(), "day:2026-02-03 OEE = 50.00%");

    for bad in [
        "shift:A:teep",
        "shift:C:teep=40",
        "week:5:oee=1",
        "overall:mtbf=3",
        "overall:oee=abc",
    ] {
        assert!(bad.parse::<KnownReference>().is_err(), "{bad} should not parse");
    }
}
