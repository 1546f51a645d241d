use chrono::NaiveDate;
use oeecal_core::aggregate::{GroupBy, GroupKey};
use oeecal_core::config::HourWindow;
use oeecal_core::error::{ConfigError, CoreError};
use oeecal_core::pipeline::Dataset;
use oeecal_core::ReconSettings;
use oeecal_parser::{HourlyRecord, Shift};

fn record(hour: u8, shift: Shift, oee: f64, teep: f64) -> HourlyRecord {
    HourlyRecord {
        machine_id: "M01".to_string(),
        date: NaiveDate::from_ymd_opt(2026, 2, 3).unwrap(),
        shift,
        hour,
        availability: None,
        performance: None,
        quality: None,
        oee,
        teep,
    }
}

#[test]
fn evaluate_groups_under_configured_rules() {
    let dataset = Dataset::new(
        vec![
            record(8, Shift::A, 0.6, 0.4),
            record(15, Shift::B, 0.8, 0.2),
        ],
        None,
    );
    let rules = ReconSettings::default().rule_set();
    let evaluation = dataset.evaluate(&rules, GroupBy::Shift).expect("evaluation");

    assert_eq!(evaluation.results.len(), 2);
    assert_eq!(evaluation.results[0].key, GroupKey::Shift(Shift::A));
    assert_eq!(evaluation.results[0].oee.mean, Some(0.6));
    assert_eq!(evaluation.filter.input, 2);
    assert_eq!(evaluation.fingerprint, dataset.fingerprint(&rules).unwrap());
}

#[test]
fn evaluate_rejects_a_hand_built_inverted_window() {
    let dataset = Dataset::new(vec![record(8, Shift::A, 0.6, 0.4)], None);
    let mut rules = ReconSettings::default().rule_set();
    rules.eligibility.hour_window = HourWindow { min: 22, max: 5 };

    match dataset.evaluate(&rules, GroupBy::None) {
        Err(CoreError::Config(ConfigError::InvalidHourWindow { min: 22, max: 5 })) => {}
        other => panic!("expected an hour window error, got {other:?}"),
    }
}
