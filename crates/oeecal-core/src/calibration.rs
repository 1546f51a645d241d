//! Enumerate-and-compare search for the rule set that best reproduces a plant's
//! own dashboard figures. Every candidate is kept and ranked, not just the winner,
//! so an analyst can audit how close the alternatives came.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use oeecal_parser::Shift;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::summarize;
use crate::config::{ActivityRule, CalibrationSettings, DayScope, RuleSet};
use crate::eligibility::MetricSample;
use crate::error::{ConfigError, Result};
use crate::pipeline::Dataset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Oee,
    Teep,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Oee => "OEE",
            Metric::Teep => "TEEP",
        }
    }
}

impl FromStr for Metric {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oee" => Ok(Metric::Oee),
            "teep" => Ok(Metric::Teep),
            other => Err(ConfigError::InvalidReference {
                input: s.to_string(),
                reason: format!("unknown metric '{other}', expected oee or teep"),
            }),
        }
    }
}

/// Which slice of the eligible records a reference value describes.
/// Written as `overall`, `shift:A`, `machine:M01` or `day:2026-02-03`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReferenceScope {
    Overall,
    Shift(Shift),
    Machine(String),
    Day(NaiveDate),
}

impl ReferenceScope {
    pub fn matches(&self, sample: &MetricSample) -> bool {
        match self {
            ReferenceScope::Overall => true,
            ReferenceScope::Shift(shift) => sample.shift == *shift,
            ReferenceScope::Machine(machine) => sample.machine_id == *machine,
            ReferenceScope::Day(date) => sample.date == *date,
        }
    }
}

impl fmt::Display for ReferenceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceScope::Overall => f.write_str("overall"),
            ReferenceScope::Shift(shift) => write!(f, "shift:{}", shift.as_str()),
            ReferenceScope::Machine(machine) => write!(f, "machine:{machine}"),
            ReferenceScope::Day(date) => write!(f, "day:{}", date.format("%Y-%m-%d")),
        }
    }
}

impl FromStr for ReferenceScope {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = |reason: String| ConfigError::InvalidReference {
            input: s.to_string(),
            reason,
        };

        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("overall") {
            return Ok(ReferenceScope::Overall);
        }
        let (kind, value) = trimmed.split_once(':').ok_or_else(|| {
            invalid("expected overall, shift:<A|B>, machine:<id> or day:<yyyy-mm-dd>".to_string())
        })?;
        let value = value.trim();
        match kind.trim().to_ascii_lowercase().as_str() {
            "shift" => {
                let shift = Shift::try_from(value).map_err(invalid)?;
                if !shift.is_admitted() {
                    return Err(invalid("only shifts A and B are aggregated".to_string()));
                }
                Ok(ReferenceScope::Shift(shift))
            }
            "machine" if !value.is_empty() => Ok(ReferenceScope::Machine(value.to_string())),
            "day" => NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(ReferenceScope::Day)
                .map_err(|err| invalid(format!("bad date '{value}': {err}"))),
            other => Err(invalid(format!("unknown scope '{other}'"))),
        }
    }
}

impl TryFrom<String> for ReferenceScope {
    type Error = ConfigError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReferenceScope> for String {
    fn from(scope: ReferenceScope) -> Self {
        scope.to_string()
    }
}

/// A figure reported by the plant's dashboard. `expected` is a fraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnownReference {
    pub scope: ReferenceScope,
    pub metric: Metric,
    pub expected: f64,
}

impl fmt::Display for KnownReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} = {:.2}%",
            self.scope,
            self.metric.as_str(),
            self.expected * 100.0
        )
    }
}

/// Parses `<scope>:<metric>=<percent>`, e.g. `shift:A:teep=40.23`.
impl FromStr for KnownReference {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidReference {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let (lhs, pct) = s
            .split_once('=')
            .ok_or_else(|| invalid("expected <scope>:<metric>=<percent>"))?;
        let (scope, metric) = lhs
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected <scope>:<metric>=<percent>"))?;
        let pct: f64 = pct
            .trim()
            .trim_end_matches('%')
            .replace(',', ".")
            .parse()
            .map_err(|_| invalid("percentage is not a number"))?;
        if !pct.is_finite() {
            return Err(invalid("percentage must be finite"));
        }

        Ok(KnownReference {
            scope: scope.parse()?,
            metric: metric.parse()?,
            expected: pct / 100.0,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceDelta {
    pub reference: KnownReference,
    /// `None` when the candidate left no eligible samples in the reference's scope.
    pub achieved: Option<f64>,
    pub count: usize,
}

impl ReferenceDelta {
    /// Absolute deviation as a fraction, `None` for "no data".
    pub fn deviation(&self) -> Option<f64> {
        self.achieved.map(|a| (a - self.reference.expected).abs())
    }

    pub fn deviation_pp(&self) -> Option<f64> {
        self.deviation().map(|d| d * 100.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateEvaluation {
    /// 1-based position after ranking.
    pub rank: usize,
    /// Position in grid enumeration order.
    pub index: usize,
    pub rules: RuleSet,
    pub day_scope: DayScope,
    pub activity_rule: ActivityRule,
    /// Sum of absolute deviations as a fraction; infinite when any reference had no data.
    pub total_deviation: f64,
    pub deltas: Vec<ReferenceDelta>,
    pub fingerprint: String,
}

impl CandidateEvaluation {
    pub fn total_deviation_pp(&self) -> f64 {
        self.total_deviation * 100.0
    }

    pub fn worst_deviation_pp(&self) -> f64 {
        self.deltas
            .iter()
            .map(|d| d.deviation_pp().unwrap_or(f64::INFINITY))
            .fold(0.0, f64::max)
    }

    pub fn is_complete(&self) -> bool {
        self.total_deviation.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CalibrationStatus {
    Resolved,
    /// Even the best candidate misses at least one reference by more than the tolerance.
    UnresolvedDiscrepancy { worst_delta_pp: f64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct CalibrationReport {
    pub best: CandidateEvaluation,
    /// Every candidate, best first.
    pub candidates: Vec<CandidateEvaluation>,
    pub tolerance_pp: f64,
    pub status: CalibrationStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CalibrationOutcome {
    /// No references were supplied; the base rule set is returned untouched.
    NotPerformed { rules: RuleSet },
    Calibrated(CalibrationReport),
}

impl CalibrationOutcome {
    pub fn rules(&self) -> &RuleSet {
        match self {
            CalibrationOutcome::NotPerformed { rules } => rules,
            CalibrationOutcome::Calibrated(report) => &report.best.rules,
        }
    }

    pub fn report(&self) -> Option<&CalibrationReport> {
        match self {
            CalibrationOutcome::NotPerformed { .. } => None,
            CalibrationOutcome::Calibrated(report) => Some(report),
        }
    }
}

/// Scores one rule set against the references. Independent of every other candidate.
pub fn evaluate_candidate(
    dataset: &Dataset,
    index: usize,
    rules: &RuleSet,
    references: &[KnownReference],
) -> Result<CandidateEvaluation> {
    let eligible = dataset.filter(&rules.eligibility);

    let deltas: Vec<ReferenceDelta> = references
        .iter()
        .map(|reference| {
            let samples = match reference.metric {
                Metric::Oee => &eligible.oee,
                Metric::Teep => &eligible.teep,
            };
            let in_scope: Vec<&MetricSample> = samples
                .iter()
                .filter(|sample| reference.scope.matches(sample))
                .collect();
            let summary = summarize(&in_scope, rules.averaging);
            ReferenceDelta {
                reference: reference.clone(),
                achieved: summary.mean,
                count: summary.count,
            }
        })
        .collect();

    let total_deviation = deltas
        .iter()
        .map(|d| d.deviation().unwrap_or(f64::INFINITY))
        .sum();

    Ok(CandidateEvaluation {
        rank: 0,
        index,
        day_scope: DayScope::of(&rules.eligibility),
        activity_rule: ActivityRule::of(&rules.eligibility),
        fingerprint: dataset.fingerprint(rules)?,
        rules: rules.clone(),
        total_deviation,
        deltas,
    })
}

/// Sweeps the configured grid around `base` and ranks every candidate by total
/// absolute deviation. Ties keep enumeration order.
pub fn calibrate(
    dataset: &Dataset,
    references: &[KnownReference],
    base: &RuleSet,
    settings: &CalibrationSettings,
) -> Result<CalibrationOutcome> {
    if references.is_empty() {
        info!("no reference values supplied; calibration not performed");
        return Ok(CalibrationOutcome::NotPerformed {
            rules: base.clone(),
        });
    }

    settings.validate()?;
    base.eligibility.validate()?;

    let rule_sets = settings.grid.candidates(&base.eligibility);
    let mut candidates = rule_sets
        .iter()
        .enumerate()
        .map(|(index, rules)| evaluate_candidate(dataset, index, rules, references))
        .collect::<Result<Vec<_>>>()?;

    candidates.sort_by(|a, b| a.total_deviation.total_cmp(&b.total_deviation));
    for (position, candidate) in candidates.iter_mut().enumerate() {
        candidate.rank = position + 1;
    }

    let best = candidates
        .first()
        .cloned()
        .ok_or(ConfigError::EmptyGridDimension("grid"))?;

    let worst_delta_pp = best.worst_deviation_pp();
    let status = if worst_delta_pp > settings.tolerance_pp {
        warn!(
            worst_delta_pp,
            tolerance_pp = settings.tolerance_pp,
            best_fingerprint = %best.fingerprint,
            "best candidate still misses a reference beyond tolerance"
        );
        CalibrationStatus::UnresolvedDiscrepancy { worst_delta_pp }
    } else {
        CalibrationStatus::Resolved
    };

    info!(
        candidates = candidates.len(),
        references = references.len(),
        best_total_deviation_pp = best.total_deviation_pp(),
        best_index = best.index,
        "calibration complete"
    );

    Ok(CalibrationOutcome::Calibrated(CalibrationReport {
        best,
        candidates,
        tolerance_pp: settings.tolerance_pp,
        status,
    }))
}
