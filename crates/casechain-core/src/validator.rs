//! Pattern audit of process numbers across instances.
//!
//! Read-only statistics that measure how much signal exact-string matching
//! captures compared to core-key matching. When core-key overlaps between
//! two instances far exceed exact overlaps, the raw strings differ only in
//! instance-specific formatting and the core key is doing real work.
//!
//! Nothing here feeds back into [`crate::linker`]; keys are recomputed
//! independently from the raw records.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::info;

use crate::config::AnalysisConfig;
use crate::normalize::{CnjNumber, core_key_with_len, digit_prefix, first_four_digit_run, normalize};
use crate::record::{DecisionRecord, Instance};
use crate::tally::FrequencyTable;

/// An unordered pair of recognised instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstancePair {
    FirstSecond,
    SecondSuperior,
    FirstSuperior,
}

impl InstancePair {
    pub const ALL: [InstancePair; 3] = [
        InstancePair::FirstSecond,
        InstancePair::SecondSuperior,
        InstancePair::FirstSuperior,
    ];

    pub fn instances(&self) -> (Instance, Instance) {
        match self {
            Self::FirstSecond => (Instance::FirstInstance, Instance::SecondInstance),
            Self::SecondSuperior => (Instance::SecondInstance, Instance::SuperiorCourt),
            Self::FirstSuperior => (Instance::FirstInstance, Instance::SuperiorCourt),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstSecond => "first_second",
            Self::SecondSuperior => "second_superior",
            Self::FirstSuperior => "first_superior",
        }
    }
}

/// Distinct identifiers shared by both instances of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PairOverlap {
    pub pair: InstancePair,
    /// Raw process-number strings present in both instances.
    pub exact: usize,
    /// Core keys present in both instances.
    pub core_key: usize,
}

impl PairOverlap {
    /// Core-key overlaps per exact overlap; `None` when there are no exact
    /// overlaps to compare against.
    pub fn core_gain(&self) -> Option<f64> {
        if self.exact == 0 {
            None
        } else {
            Some(self.core_key as f64 / self.exact as f64)
        }
    }
}

/// Diagnostic statistics over a record collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatternReport {
    /// Records per instance, `unknown` included.
    pub records_by_instance: BTreeMap<Instance, usize>,
    /// Leading-digit prefixes per recognised instance.
    pub prefix_frequency: BTreeMap<Instance, FrequencyTable>,
    /// First four-digit run of the raw string per recognised instance.
    pub year_frequency: BTreeMap<Instance, FrequencyTable>,
    /// Year field of parseable CNJ numbers per recognised instance.
    pub cnj_year_frequency: BTreeMap<Instance, FrequencyTable>,
    /// One entry per [`InstancePair`], in [`InstancePair::ALL`] order.
    pub overlaps: Vec<PairOverlap>,
    /// Records whose number is too short for a core key.
    pub records_without_core_key: usize,
    /// Normalised ids seen under more than one raw spelling.
    pub number_variations: usize,
    /// Core-key groups whose CNJ origin code differs between records.
    pub origin_divergent_groups: usize,
}

impl PatternReport {
    pub fn overlap(&self, pair: InstancePair) -> Option<&PairOverlap> {
        self.overlaps.iter().find(|o| o.pair == pair)
    }

    /// True when, for every pair with any overlap at all, core-key matching
    /// finds at least as many shared cases as exact matching.
    pub fn core_key_dominates(&self) -> bool {
        self.overlaps
            .iter()
            .filter(|o| o.exact > 0 || o.core_key > 0)
            .all(|o| o.core_key >= o.exact)
    }
}

/// Audit records with the default key and prefix lengths.
pub fn validate(records: &[DecisionRecord]) -> PatternReport {
    validate_with_config(records, &AnalysisConfig::default())
}

pub fn validate_with_config(records: &[DecisionRecord], config: &AnalysisConfig) -> PatternReport {
    let mut report = PatternReport::default();

    let mut raw_sets: BTreeMap<Instance, BTreeSet<&str>> = BTreeMap::new();
    let mut core_sets: BTreeMap<Instance, BTreeSet<String>> = BTreeMap::new();
    let mut spellings: HashMap<String, BTreeSet<&str>> = HashMap::new();
    let mut origins: HashMap<String, BTreeSet<String>> = HashMap::new();

    for record in records {
        *report.records_by_instance.entry(record.instance).or_insert(0) += 1;

        let raw = record.process_number.as_str();
        if raw.trim().is_empty() {
            continue;
        }

        let core = core_key_with_len(raw, config.core_key_len);
        if core.is_none() {
            report.records_without_core_key += 1;
        }

        let digits = normalize(raw);
        if !digits.is_empty() {
            spellings.entry(digits).or_default().insert(raw);
        }

        if let Some(core) = &core
            && let Some(cnj) = CnjNumber::parse(raw)
        {
            origins.entry(core.clone()).or_default().insert(cnj.origin);
        }

        if !record.instance.is_known() {
            continue;
        }
        let instance = record.instance;

        if let Some(prefix) = digit_prefix(raw, config.prefix_len) {
            report.prefix_frequency.entry(instance).or_default().add(prefix);
        }
        if let Some(year) = first_four_digit_run(raw) {
            report.year_frequency.entry(instance).or_default().add(year);
        }
        if let Some(cnj) = CnjNumber::parse(raw) {
            report
                .cnj_year_frequency
                .entry(instance)
                .or_default()
                .add(cnj.year.to_string());
        }

        raw_sets.entry(instance).or_default().insert(raw.trim());
        if let Some(core) = core {
            core_sets.entry(instance).or_default().insert(core);
        }
    }

    report.overlaps = InstancePair::ALL
        .iter()
        .map(|&pair| {
            let (a, b) = pair.instances();
            PairOverlap {
                pair,
                exact: intersection_len(raw_sets.get(&a), raw_sets.get(&b)),
                core_key: intersection_len(core_sets.get(&a), core_sets.get(&b)),
            }
        })
        .collect();

    report.number_variations = spellings.values().filter(|s| s.len() > 1).count();
    report.origin_divergent_groups = origins.values().filter(|o| o.len() > 1).count();

    info!(
        records = records.len(),
        without_core_key = report.records_without_core_key,
        variations = report.number_variations,
        "validated process-number patterns"
    );
    report
}

fn intersection_len<T: Ord>(a: Option<&BTreeSet<T>>, b: Option<&BTreeSet<T>>) -> usize {
    match (a, b) {
        (Some(a), Some(b)) => a.intersection(b).count(),
        _ => 0,
    }
}
