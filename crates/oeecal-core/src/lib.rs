pub mod aggregate;
pub mod calibration;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod frames;
pub mod pipeline;
pub mod stoppage;

pub use aggregate::{
    aggregate, component_means, AggregateResult, AveragingMethod, ComponentMeans, GroupBy,
    GroupKey, MetricSummary,
};
pub use calibration::{
    calibrate, evaluate_candidate, CalibrationOutcome, CalibrationReport, CalibrationStatus,
    CandidateEvaluation, KnownReference, Metric, ReferenceDelta, ReferenceScope,
};
pub use config::{
    ActivityGrouping, ActivityRule, CalibrationGrid, CalibrationSettings, DateRange, DayScope,
    EligibilityConfig, HourWindow, ReconSettings, ReferenceEntry, RuleSet, StoppagePolicy,
};
pub use eligibility::{eligible_records, filter, EligibleRecordSet, FilterReport, MetricSample};
pub use error::{ConfigError, CoreError};
pub use pipeline::{Dataset, Evaluation};
pub use stoppage::{SlotFlags, StoppageIndex};
