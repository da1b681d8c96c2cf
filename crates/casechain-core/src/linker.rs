//! Cross-instance case linking.
//!
//! Groups decision records into cases keyed by the leading digits of their
//! process number, then orders each case's decisions by instance rank.
//! Built once per run from the full collection; nothing is cached between
//! runs and nothing here performs I/O.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::normalize::{CORE_KEY_LEN, core_key_with_len, normalize};
use crate::record::{DecisionRecord, Instance};
use crate::tally::FrequencyTable;

/// Grouping key of a case.
///
/// `Core` is the normal path. `Exact` is the degraded fallback for numbers
/// too short to yield a core key: only records with the very same digits
/// (or, for digitless numbers, the same trimmed text) share a case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CaseKey {
    Core(String),
    Exact(String),
}

impl CaseKey {
    /// Derive the key for a raw process number, or `None` when it is blank.
    pub fn derive(raw: &str, core_key_len: usize) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(core) = core_key_with_len(trimmed, core_key_len) {
            return Some(Self::Core(core));
        }
        let digits = normalize(trimmed);
        if digits.is_empty() {
            Some(Self::Exact(trimmed.to_string()))
        } else {
            Some(Self::Exact(digits))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Core(k) | Self::Exact(k) => k,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Exact(_))
    }
}

impl fmt::Display for CaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Core(k) => write!(f, "core:{k}"),
            Self::Exact(k) => write!(f, "exact:{k}"),
        }
    }
}

/// How strongly the decisions of a case are tied together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    /// Every decision carries the same process-number text.
    ExactMatch,
    /// Spellings differ; the decisions were joined through the case key.
    CoreKeyMatch,
    /// A single decision: nothing was linked.
    Unlinked,
}

impl MatchConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExactMatch => "exact_match",
            Self::CoreKeyMatch => "core_key_match",
            Self::Unlinked => "unlinked",
        }
    }
}

/// Decisions about one underlying dispute.
#[derive(Debug, Clone)]
pub struct Case<'a> {
    key: CaseKey,
    decisions: Vec<&'a DecisionRecord>,
}

impl<'a> Case<'a> {
    pub fn key(&self) -> &CaseKey {
        &self.key
    }

    /// Decisions ordered by instance rank, load order within a rank.
    pub fn decisions(&self) -> &[&'a DecisionRecord] {
        &self.decisions
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// Distinct recognised instances. `Unknown` never counts.
    pub fn instance_coverage(&self) -> BTreeSet<Instance> {
        self.decisions
            .iter()
            .map(|d| d.instance)
            .filter(Instance::is_known)
            .collect()
    }

    /// First instance, second instance, and superior court all present.
    pub fn is_complete(&self) -> bool {
        let coverage = self.instance_coverage();
        Instance::LINKABLE.iter().all(|i| coverage.contains(i))
    }

    /// At least two distinct recognised instances.
    pub fn is_multi_instance(&self) -> bool {
        self.instance_coverage().len() >= 2
    }

    pub fn confidence(&self) -> MatchConfidence {
        if self.decisions.len() < 2 {
            return MatchConfidence::Unlinked;
        }
        let first = self.decisions[0].process_number.trim();
        if self.decisions[1..]
            .iter()
            .all(|d| d.process_number.trim() == first)
        {
            MatchConfidence::ExactMatch
        } else {
            MatchConfidence::CoreKeyMatch
        }
    }

    /// Decisions issued at one instance, in case order.
    pub fn at(&self, instance: Instance) -> impl Iterator<Item = &'a DecisionRecord> + '_ {
        self.decisions
            .iter()
            .copied()
            .filter(move |d| d.instance == instance)
    }

    /// Covered instances joined in rank order, e.g.
    /// `first_instance -> second_instance`. A case with no recognised
    /// instance reads `unknown`.
    pub fn chain_pattern(&self) -> String {
        let coverage = self.instance_coverage();
        if coverage.is_empty() {
            return Instance::Unknown.as_str().to_string();
        }
        coverage
            .iter()
            .map(Instance::as_str)
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub fn describe(&self) -> CaseSummary {
        CaseSummary {
            key: self.key.clone(),
            process_numbers: self
                .decisions
                .iter()
                .map(|d| d.process_number.clone())
                .collect(),
            instances: self.decisions.iter().map(|d| d.instance).collect(),
            results: self.decisions.iter().map(|d| d.result.clone()).collect(),
            coverage: self.instance_coverage().into_iter().collect(),
            is_complete: self.is_complete(),
            confidence: self.confidence(),
        }
    }
}

/// Owned, serialisable snapshot of a [`Case`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseSummary {
    pub key: CaseKey,
    pub process_numbers: Vec<String>,
    pub instances: Vec<Instance>,
    pub results: Vec<String>,
    pub coverage: Vec<Instance>,
    pub is_complete: bool,
    pub confidence: MatchConfidence,
}

/// Result of one linking run.
#[derive(Debug, Clone)]
pub struct Linkage<'a> {
    cases: BTreeMap<CaseKey, Case<'a>>,
    unlinkable: Vec<&'a DecisionRecord>,
    core_key_len: usize,
    total_records: usize,
}

/// Headline counts of a [`Linkage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkSummary {
    pub total_records: usize,
    pub linked_records: usize,
    pub unlinkable_records: usize,
    pub degraded_key_records: usize,
    pub total_cases: usize,
    pub multi_instance_cases: usize,
    pub complete_chains: usize,
    pub exact_match_cases: usize,
    pub core_key_match_cases: usize,
    pub unlinked_cases: usize,
    /// Linked records per instance, `unknown` included.
    pub per_instance: BTreeMap<Instance, usize>,
    /// Cases per [`Case::chain_pattern`], e.g. how many run
    /// `first_instance -> second_instance -> superior_court`.
    pub flow_patterns: FrequencyTable,
}

impl<'a> Linkage<'a> {
    /// Cases in key order.
    pub fn cases(&self) -> impl Iterator<Item = &Case<'a>> {
        self.cases.values()
    }

    pub fn get(&self, key: &CaseKey) -> Option<&Case<'a>> {
        self.cases.get(key)
    }

    /// The case a raw process number would link into, if any.
    pub fn case_for(&self, raw: &str) -> Option<&Case<'a>> {
        CaseKey::derive(raw, self.core_key_len).and_then(|k| self.cases.get(&k))
    }

    /// Number of cases.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Records with a blank process number, in load order.
    pub fn unlinkable(&self) -> &[&'a DecisionRecord] {
        &self.unlinkable
    }

    pub fn complete_cases(&self) -> impl Iterator<Item = &Case<'a>> {
        self.cases.values().filter(|c| c.is_complete())
    }

    pub fn multi_instance_cases(&self) -> impl Iterator<Item = &Case<'a>> {
        self.cases.values().filter(|c| c.is_multi_instance())
    }

    pub fn summary(&self) -> LinkSummary {
        let mut per_instance: BTreeMap<Instance, usize> = BTreeMap::new();
        let mut linked_records = 0;
        let mut degraded_key_records = 0;
        let mut multi_instance_cases = 0;
        let mut complete_chains = 0;
        let mut by_confidence: BTreeMap<MatchConfidence, usize> = BTreeMap::new();
        let mut flow_patterns = FrequencyTable::new();

        for case in self.cases.values() {
            linked_records += case.len();
            if case.key.is_degraded() {
                degraded_key_records += case.len();
            }
            for d in &case.decisions {
                *per_instance.entry(d.instance).or_insert(0) += 1;
            }
            if case.is_multi_instance() {
                multi_instance_cases += 1;
            }
            if case.is_complete() {
                complete_chains += 1;
            }
            *by_confidence.entry(case.confidence()).or_insert(0) += 1;
            flow_patterns.add(case.chain_pattern());
        }

        let confidence = |c: MatchConfidence| by_confidence.get(&c).copied().unwrap_or(0);
        LinkSummary {
            total_records: self.total_records,
            linked_records,
            unlinkable_records: self.unlinkable.len(),
            degraded_key_records,
            total_cases: self.cases.len(),
            multi_instance_cases,
            complete_chains,
            exact_match_cases: confidence(MatchConfidence::ExactMatch),
            core_key_match_cases: confidence(MatchConfidence::CoreKeyMatch),
            unlinked_cases: confidence(MatchConfidence::Unlinked),
            per_instance,
            flow_patterns,
        }
    }
}

/// Link records using the default 14-digit core key.
pub fn link(records: &[DecisionRecord]) -> Linkage<'_> {
    link_with_key_len(records, CORE_KEY_LEN)
}

/// Link records using the key length from `config`.
pub fn link_with_config<'a>(records: &'a [DecisionRecord], config: &AnalysisConfig) -> Linkage<'a> {
    link_with_key_len(records, config.core_key_len)
}

fn link_with_key_len(records: &[DecisionRecord], core_key_len: usize) -> Linkage<'_> {
    let mut cases: BTreeMap<CaseKey, Case<'_>> = BTreeMap::new();
    let mut unlinkable = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let Some(key) = CaseKey::derive(&record.process_number, core_key_len) else {
            debug!(index, "blank process number, record is unlinkable");
            unlinkable.push(record);
            continue;
        };
        if key.is_degraded() {
            debug!(
                index,
                process_number = %record.process_number,
                "too few digits for a core key, grouping by exact number"
            );
        }
        cases
            .entry(key.clone())
            .or_insert_with(|| Case {
                key,
                decisions: Vec::new(),
            })
            .decisions
            .push(record);
    }

    // Stable: equal ranks keep load order.
    for case in cases.values_mut() {
        case.decisions.sort_by_key(|d| d.instance.rank());
    }

    let linkage = Linkage {
        cases,
        unlinkable,
        core_key_len,
        total_records: records.len(),
    };
    info!(
        records = records.len(),
        cases = linkage.len(),
        unlinkable = linkage.unlinkable.len(),
        "linked decisions into cases"
    );
    linkage
}
