//! Every recognised reconciliation option, its default, and the checks that run
//! before any record is touched. Settings files are TOML; unknown keys are errors.

use std::fmt;
use std::path::Path;

use chrono::{NaiveDate, Weekday};
use oeecal_parser::LoadOptions;
use serde::{Deserialize, Serialize};

use crate::aggregate::AveragingMethod;
use crate::calibration::{KnownReference, Metric, ReferenceScope};
use crate::error::{ConfigError, CoreError};

/// Inclusive range of hours of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[u8; 2]", into = "[u8; 2]")]
pub struct HourWindow {
    pub min: u8,
    pub max: u8,
}

impl HourWindow {
    pub fn new(min: u8, max: u8) -> Result<Self, ConfigError> {
        let window = Self { min, max };
        window.validate()?;
        Ok(window)
    }

    pub fn contains(&self, hour: u8) -> bool {
        (self.min..=self.max).contains(&hour)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min > self.max || self.max > 23 {
            return Err(ConfigError::InvalidHourWindow {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl Default for HourWindow {
    fn default() -> Self {
        Self { min: 6, max: 21 }
    }
}

impl TryFrom<[u8; 2]> for HourWindow {
    type Error = ConfigError;

    fn try_from([min, max]: [u8; 2]) -> Result<Self, Self::Error> {
        Self::new(min, max)
    }
}

impl From<HourWindow> for [u8; 2] {
    fn from(window: HourWindow) -> Self {
        [window.min, window.max]
    }
}

impl fmt::Display for HourWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}h", self.min, self.max)
    }
}

/// Inclusive calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, ConfigError> {
        let range = Self { from, to };
        range.validate()?;
        Ok(range)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.from > self.to {
            return Err(ConfigError::InvertedPeriod {
                from: self.from,
                to: self.to,
            });
        }
        Ok(())
    }
}

/// Slot used to decide whether the plant was active in an hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityGrouping {
    /// `(date, hour)` across both shifts.
    #[default]
    Global,
    /// `(date, shift, hour)`.
    PerShift,
}

/// One value of the activity dimension of the calibration grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityRule {
    Off,
    Global,
    PerShift,
}

impl ActivityRule {
    pub fn of(config: &EligibilityConfig) -> Self {
        match (config.require_global_activity, config.activity_grouping) {
            (false, _) => ActivityRule::Off,
            (true, ActivityGrouping::Global) => ActivityRule::Global,
            (true, ActivityGrouping::PerShift) => ActivityRule::PerShift,
        }
    }

    pub fn apply(self, config: &mut EligibilityConfig) {
        match self {
            ActivityRule::Off => config.require_global_activity = false,
            ActivityRule::Global => {
                config.require_global_activity = true;
                config.activity_grouping = ActivityGrouping::Global;
            }
            ActivityRule::PerShift => {
                config.require_global_activity = true;
                config.activity_grouping = ActivityGrouping::PerShift;
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityRule::Off => "off",
            ActivityRule::Global => "global",
            ActivityRule::PerShift => "per_shift",
        }
    }
}

/// One value of the day dimension of the calibration grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayScope {
    AllDays,
    Weekdays,
    MondayToSaturday,
}

impl DayScope {
    pub fn of(config: &EligibilityConfig) -> Self {
        match (config.weekday_only, config.count_saturday) {
            (false, _) => DayScope::AllDays,
            (true, false) => DayScope::Weekdays,
            (true, true) => DayScope::MondayToSaturday,
        }
    }

    pub fn apply(self, config: &mut EligibilityConfig) {
        match self {
            DayScope::AllDays => config.weekday_only = false,
            DayScope::Weekdays => {
                config.weekday_only = true;
                config.count_saturday = false;
            }
            DayScope::MondayToSaturday => {
                config.weekday_only = true;
                config.count_saturday = true;
            }
        }
    }

    pub fn admits(self, weekday: Weekday) -> bool {
        match self {
            DayScope::AllDays => true,
            DayScope::Weekdays => !matches!(weekday, Weekday::Sat | Weekday::Sun),
            DayScope::MondayToSaturday => weekday != Weekday::Sun,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayScope::AllDays => "all_days",
            DayScope::Weekdays => "weekdays",
            DayScope::MondayToSaturday => "monday_to_saturday",
        }
    }
}

/// How stoppage-log labels and durations turn into slot flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoppagePolicy {
    /// Label fragments (case and accent insensitive) marking a planned stoppage.
    pub scheduled_keywords: Vec<String>,
    /// A slot is a significant scheduled stoppage when its summed planned
    /// duration is strictly greater than this.
    pub scheduled_threshold_secs: f64,
    /// Label fragments marking end of production / no operator.
    pub end_of_production_keywords: Vec<String>,
}

impl Default for StoppagePolicy {
    fn default() -> Self {
        Self {
            scheduled_keywords: vec!["parada prevista".to_string()],
            scheduled_threshold_secs: 1800.0,
            end_of_production_keywords: vec![
                "expediente".to_string(),
                "fim de producao".to_string(),
            ],
        }
    }
}

impl StoppagePolicy {
    fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.scheduled_threshold_secs;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EligibilityConfig {
    pub hour_window: HourWindow,
    pub weekday_only: bool,
    /// With `weekday_only`, keep Saturdays too.
    pub count_saturday: bool,
    pub require_global_activity: bool,
    pub activity_grouping: ActivityGrouping,
    pub apply_scheduled_stoppage_exclusion: bool,
    pub period: Option<DateRange>,
    pub stoppage_policy: StoppagePolicy,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            hour_window: HourWindow::default(),
            weekday_only: true,
            count_saturday: false,
            require_global_activity: true,
            activity_grouping: ActivityGrouping::Global,
            apply_scheduled_stoppage_exclusion: true,
            period: None,
            stoppage_policy: StoppagePolicy::default(),
        }
    }
}

impl EligibilityConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.hour_window.validate()?;
        if let Some(period) = &self.period {
            period.validate()?;
        }
        self.stoppage_policy.validate()
    }
}

/// A complete rule combination: which records count, and how they are averaged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub eligibility: EligibilityConfig,
    pub averaging: AveragingMethod,
}

/// Discrete hypothesis space swept by the calibration harness. Every combination
/// of the listed values is one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalibrationGrid {
    pub hour_windows: Vec<HourWindow>,
    pub day_scopes: Vec<DayScope>,
    pub activity_rules: Vec<ActivityRule>,
    pub stoppage_exclusion: Vec<bool>,
    pub averaging: Vec<AveragingMethod>,
}

impl Default for CalibrationGrid {
    fn default() -> Self {
        Self {
            hour_windows: vec![
                HourWindow { min: 6, max: 21 },
                HourWindow { min: 6, max: 22 },
                HourWindow { min: 7, max: 21 },
                HourWindow { min: 5, max: 22 },
                HourWindow { min: 0, max: 23 },
            ],
            day_scopes: vec![
                DayScope::AllDays,
                DayScope::Weekdays,
                DayScope::MondayToSaturday,
            ],
            activity_rules: vec![ActivityRule::Off, ActivityRule::Global, ActivityRule::PerShift],
            stoppage_exclusion: vec![true, false],
            averaging: vec![AveragingMethod::Flat],
        }
    }
}

impl CalibrationGrid {
    pub fn len(&self) -> usize {
        self.hour_windows.len()
            * self.day_scopes.len()
            * self.activity_rules.len()
            * self.stoppage_exclusion.len()
            * self.averaging.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expands the grid in a fixed order (hour window outermost, averaging innermost).
    /// Options the grid does not vary (period, stoppage policy) come from `base`.
    pub fn candidates(&self, base: &EligibilityConfig) -> Vec<RuleSet> {
        let mut out = Vec::with_capacity(self.len());
        for window in &self.hour_windows {
            for scope in &self.day_scopes {
                for rule in &self.activity_rules {
                    for &exclusion in &self.stoppage_exclusion {
                        for &averaging in &self.averaging {
                            let mut eligibility = base.clone();
                            eligibility.hour_window = *window;
                            scope.apply(&mut eligibility);
                            rule.apply(&mut eligibility);
                            eligibility.apply_scheduled_stoppage_exclusion = exclusion;
                            out.push(RuleSet {
                                eligibility,
                                averaging,
                            });
                        }
                    }
                }
            }
        }
        out
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let dimensions = [
            ("hour_windows", self.hour_windows.len()),
            ("day_scopes", self.day_scopes.len()),
            ("activity_rules", self.activity_rules.len()),
            ("stoppage_exclusion", self.stoppage_exclusion.len()),
            ("averaging", self.averaging.len()),
        ];
        for (name, len) in dimensions {
            if len == 0 {
                return Err(ConfigError::EmptyGridDimension(name));
            }
        }
        for window in &self.hour_windows {
            window.validate()?;
        }
        Ok(())
    }
}

/// A reference value as written in a settings file, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferenceEntry {
    pub scope: ReferenceScope,
    pub metric: Metric,
    pub expected_pct: f64,
}

impl ReferenceEntry {
    pub fn to_reference(&self) -> KnownReference {
        KnownReference {
            scope: self.scope.clone(),
            metric: self.metric,
            expected: self.expected_pct / 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalibrationSettings {
    /// Largest acceptable per-reference deviation, in percentage points.
    pub tolerance_pp: f64,
    pub grid: CalibrationGrid,
    pub references: Vec<ReferenceEntry>,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            tolerance_pp: 1.5,
            grid: CalibrationGrid::default(),
            references: Vec::new(),
        }
    }
}

impl CalibrationSettings {
    pub fn known_references(&self) -> Vec<KnownReference> {
        self.references
            .iter()
            .map(ReferenceEntry::to_reference)
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tolerance_pp.is_finite() || self.tolerance_pp < 0.0 {
            return Err(ConfigError::InvalidTolerance(self.tolerance_pp));
        }
        self.grid.validate()?;
        for entry in &self.references {
            if !entry.expected_pct.is_finite() {
                return Err(ConfigError::InvalidReference {
                    input: entry.scope.to_string(),
                    reason: "expected value must be a finite percentage".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Top-level settings file.
///
/// ```toml
/// averaging = "flat"
///
/// [eligibility]
/// hour_window = [6, 21]
/// period = { from = "2026-02-01", to = "2026-02-11" }
///
/// [calibration]
/// tolerance_pp = 1.5
/// references = [{ scope = "shift:A", metric = "teep", expected_pct = 40.23 }]
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconSettings {
    pub averaging: AveragingMethod,
    pub load: LoadOptions,
    pub eligibility: EligibilityConfig,
    pub calibration: CalibrationSettings,
}

impl ReconSettings {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_path(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.eligibility.validate()?;
        self.calibration.validate()
    }

    /// The configured rule set, used whenever no calibration is run.
    pub fn rule_set(&self) -> RuleSet {
        RuleSet {
            eligibility: self.eligibility.clone(),
            averaging: self.averaging,
        }
    }
}
