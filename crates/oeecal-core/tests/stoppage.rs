use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use oeecal_core::config::StoppagePolicy;
use oeecal_core::stoppage::{SlotFlags, StoppageIndex};
use oeecal_parser::{parse_stoppage_log, StoppageRecord};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn stoppage(machine: &str, hour: u8, category: &str, secs: f64) -> StoppageRecord {
    StoppageRecord {
        machine_id: machine.to_string(),
        date: date(2026, 2, 2),
        hour,
        category: category.to_string(),
        duration_secs: secs,
    }
}

#[test]
fn scheduled_durations_are_summed_within_a_slot() {
    let stoppages = vec![
        stoppage("M01", 6, "PARADA PREVISTA - SETUP", 1000.0),
        stoppage("M01", 6, "Parada Prevista - Limpeza", 900.0),
        stoppage("M01", 7, "PARADA PREVISTA - SETUP", 1000.0),
    ];
    let index = StoppageIndex::build(&stoppages, &StoppagePolicy::default());

    assert!(index.flags("M01", date(2026, 2, 2), 6).scheduled);
    assert!(!index.flags("M01", date(2026, 2, 2), 7).scheduled);
    assert_eq!(index.scheduled_slots(), 1);
}

#[test]
fn threshold_is_strict() {
    let stoppages = vec![stoppage("M01", 6, "PARADA PREVISTA - REFEIÇÃO", 1800.0)];
    let index = StoppageIndex::build(&stoppages, &StoppagePolicy::default());
    assert_eq!(index.flags("M01", date(2026, 2, 2), 6), SlotFlags::default());
    assert!(index.is_empty());

    let policy = StoppagePolicy {
        scheduled_threshold_secs: 1799.0,
        ..StoppagePolicy::default()
    };
    let index = StoppageIndex::build(&stoppages, &policy);
    assert!(index.flags("M01", date(2026, 2, 2), 6).scheduled);
}

#[test]
fn unplanned_stoppages_never_flag() {
    let stoppages = vec![
        stoppage("M01", 6, "PARADA NÃO PREVISTA - QUEBRA", 3600.0),
        stoppage("M01", 6, "LIBERADO PRODUCAO (0002)", 3600.0),
    ];
    let index = StoppageIndex::build(&stoppages, &StoppagePolicy::default());
    assert!(index.is_empty());
}

#[test]
fn end_of_production_ignores_duration_and_accents() {
    let stoppages = vec![
        stoppage("M01", 21, "FIM DE PRODUÇÃO", 0.0),
        stoppage("M02", 21, "PARADA PREVISTA - FIM DE EXPEDIENTE", 1200.0),
        stoppage("M03", 21, "PARADA PREVISTA - FIM DE EXPEDIENTE", 2400.0),
    ];
    let index = StoppageIndex::build(&stoppages, &StoppagePolicy::default());
    let day = date(2026, 2, 2);

    assert_eq!(
        index.flags("M01", day, 21),
        SlotFlags {
            scheduled: false,
            end_of_production: true
        }
    );
    assert_eq!(
        index.flags("M02", day, 21),
        SlotFlags {
            scheduled: false,
            end_of_production: true
        }
    );
    assert_eq!(
        index.flags("M03", day, 21),
        SlotFlags {
            scheduled: true,
            end_of_production: true
        }
    );
    assert_eq!(index.end_of_production_slots(), 3);
    assert_eq!(index.flags("M01", day, 20), SlotFlags::default());
}

#[test]
fn keywords_are_configurable() {
    let stoppages = vec![stoppage("M01", 9, "Planned maintenance", 3000.0)];
    let policy = StoppagePolicy {
        scheduled_keywords: vec!["PLANNED".to_string()],
        end_of_production_keywords: vec![],
        ..StoppagePolicy::default()
    };
    let index = StoppageIndex::build(&stoppages, &policy);
    assert!(index.flags("M01", date(2026, 2, 2), 9).scheduled);
}

#[test]
fn index_built_from_exported_log() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../oeecal-parser/tests/data/stoppage_log.csv");
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", path.display(), err));
    let log = parse_stoppage_log(&content).expect("stoppage parse failed");
    let index = StoppageIndex::build(&log.stoppages, &StoppagePolicy::default());

    // 2400 s meal break.
    assert!(index.flags("M01", date(2026, 2, 2), 6).scheduled);
    // 1200 s end-of-shift stoppage.
    let flags = index.flags("M02", date(2026, 2, 2), 21);
    assert!(!flags.scheduled);
    assert!(flags.end_of_production);
    // 1000.5 s + 900 s logged under "29.0" and "29".
    assert!(index.flags("29", date(2026, 2, 3), 14).scheduled);
}

#[test]
fn lookups_are_isolated_per_machine_and_slot() {
    let stoppages = vec![
        stoppage("M01", 6, "PARADA PREVISTA - SETUP", 2400.0),
        stoppage("M02", 7, "FIM DE EXPEDIENTE", 60.0),
        stoppage("M02", 6, "PARADA PREVISTA - SETUP", 2400.0),
    ];
    let index = StoppageIndex::build(&stoppages, &StoppagePolicy::default());
    let day = date(2026, 2, 2);

    assert!(index.flags("M01", day, 6).scheduled);
    assert_eq!(index.flags("M01", day, 7), SlotFlags::default());
    assert!(index.flags("M02", day, 6).scheduled);
    assert!(index.flags("M02", day, 7).end_of_production);
    assert!(!index.flags("M02", day, 7).scheduled);
    assert_eq!(index.flags("M03", day, 6), SlotFlags::default());
    assert_eq!(index.flags("M01", date(2026, 2, 3), 6), SlotFlags::default());
    assert_eq!(index.scheduled_slots(), 2);
    assert_eq!(index.end_of_production_slots(), 1);
}
