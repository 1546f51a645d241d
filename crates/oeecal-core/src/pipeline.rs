use oeecal_parser::{HourlyRecord, ParsedOeeTable, ParsedStoppageLog};
use serde::Serialize;
use tracing::info;

use crate::aggregate::{AggregateResult, GroupBy};
use crate::config::{EligibilityConfig, RuleSet, StoppagePolicy};
use crate::eligibility::{filter, EligibleRecordSet, FilterReport};
use crate::error::Result;
use crate::stoppage::StoppageIndex;

/// Loaded inputs for one reporting cycle. Nothing derived from them is cached;
/// every evaluation recomputes from these records.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<HourlyRecord>,
    pub stoppages: Option<StoppageIndex>,
    /// Content hashes of the raw sources, in load order.
    pub input_hashes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub fingerprint: String,
    pub rules: RuleSet,
    pub filter: FilterReport,
    pub results: Vec<AggregateResult>,
}

impl Dataset {
    pub fn new(records: Vec<HourlyRecord>, stoppages: Option<StoppageIndex>) -> Self {
        Self {
            records,
            stoppages,
            input_hashes: Vec::new(),
        }
    }

    pub fn from_sources(
        table: ParsedOeeTable,
        log: Option<ParsedStoppageLog>,
        policy: &StoppagePolicy,
    ) -> Self {
        let mut input_hashes = vec![table.content_hash];
        let stoppages = log.map(|log| {
            input_hashes.push(log.content_hash);
            StoppageIndex::build(&log.stoppages, policy)
        });
        Self {
            records: table.records,
            stoppages,
            input_hashes,
        }
    }

    pub fn filter(&self, config: &EligibilityConfig) -> EligibleRecordSet {
        filter(&self.records, self.stoppages.as_ref(), config)
    }

    /// Key for any external cache of results: the raw inputs plus the full rule set.
    pub fn fingerprint(&self, rules: &RuleSet) -> Result<String> {
        let mut hasher = blake3::Hasher::new();
        for hash in &self.input_hashes {
            hasher.update(hash.as_bytes());
            hasher.update(b"\n");
        }
        hasher.update(&serde_json::to_vec(rules)?);
        Ok(hasher.finalize().to_hex().to_string())
    }

    /// Fails on an invalid rule set instead of reporting every group as empty.
    pub fn evaluate(&self, rules: &RuleSet, group_by: GroupBy) -> Result<Evaluation> {
        rules.eligibility.validate()?;
        let eligible = self.filter(&rules.eligibility);
        let results = eligible.aggregate(group_by, rules.averaging);
        let fingerprint = self.fingerprint(rules)?;
        info!(
            groups = results.len(),
            oee_eligible = eligible.oee.len(),
            teep_eligible = eligible.teep.len(),
            %fingerprint,
            "aggregation complete"
        );
        Ok(Evaluation {
            fingerprint,
            rules: rules.clone(),
            filter: eligible.report,
            results,
        })
    }
}
