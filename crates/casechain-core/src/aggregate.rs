//! Outcome distributions over decisions.
//!
//! Groups decisions by instance, or by tribunal and instance, and counts
//! the outcome labels in each group. Labels are taken verbatim, so the
//! `N/A` sentinel shows up as an outcome like any other.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::linker::Case;
use crate::record::{DecisionRecord, Instance, NOT_AVAILABLE};
use crate::tally::{FrequencyTable, percent};

/// One outcome row of a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeRow {
    pub outcome: String,
    pub count: usize,
    /// `count / total * 100`.
    pub percent: f64,
}

/// Outcome counts of one group, most frequent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutcomeTable {
    pub total: usize,
    pub rows: Vec<OutcomeRow>,
}

impl OutcomeTable {
    fn from_tally(tally: &FrequencyTable) -> Self {
        let total = tally.total();
        let rows = tally
            .ranked()
            .into_iter()
            .map(|(outcome, count)| OutcomeRow {
                outcome: outcome.to_string(),
                count,
                percent: percent(count, total),
            })
            .collect();
        Self { total, rows }
    }

    pub fn count(&self, outcome: &str) -> usize {
        self.rows
            .iter()
            .find(|r| r.outcome == outcome)
            .map_or(0, |r| r.count)
    }

    pub fn percent(&self, outcome: &str) -> f64 {
        self.rows
            .iter()
            .find(|r| r.outcome == outcome)
            .map_or(0.0, |r| r.percent)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceGroup {
    pub instance: Instance,
    pub outcomes: OutcomeTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TribunalInstanceGroup {
    pub tribunal: String,
    pub instance: Instance,
    pub outcomes: OutcomeTable,
}

/// Both grouping modes over the same decisions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutcomeDistribution {
    pub by_instance: Vec<InstanceGroup>,
    pub by_tribunal_instance: Vec<TribunalInstanceGroup>,
}

impl OutcomeDistribution {
    pub fn instance(&self, instance: Instance) -> Option<&OutcomeTable> {
        self.by_instance
            .iter()
            .find(|g| g.instance == instance)
            .map(|g| &g.outcomes)
    }

    pub fn tribunal_instance(&self, tribunal: &str, instance: Instance) -> Option<&OutcomeTable> {
        self.by_tribunal_instance
            .iter()
            .find(|g| g.tribunal == tribunal && g.instance == instance)
            .map(|g| &g.outcomes)
    }
}

/// Outcomes grouped by instance.
///
/// Groups are ordered by descending size, ties by instance rank.
pub fn by_instance<'r>(records: impl IntoIterator<Item = &'r DecisionRecord>) -> Vec<InstanceGroup> {
    let mut tallies: BTreeMap<Instance, FrequencyTable> = BTreeMap::new();
    for r in records {
        tallies.entry(r.instance).or_default().add(r.result.as_str());
    }
    let mut groups: Vec<InstanceGroup> = tallies
        .into_iter()
        .map(|(instance, tally)| InstanceGroup {
            instance,
            outcomes: OutcomeTable::from_tally(&tally),
        })
        .collect();
    groups.sort_by(|a, b| {
        b.outcomes
            .total
            .cmp(&a.outcomes.total)
            .then_with(|| a.instance.cmp(&b.instance))
    });
    groups
}

/// Outcomes grouped by tribunal and instance.
///
/// Groups are ordered by descending size, ties by tribunal name then
/// instance rank.
pub fn by_tribunal_instance<'r>(
    records: impl IntoIterator<Item = &'r DecisionRecord>,
) -> Vec<TribunalInstanceGroup> {
    let mut tallies: BTreeMap<(&str, Instance), FrequencyTable> = BTreeMap::new();
    for r in records {
        tallies
            .entry((r.tribunal.as_str(), r.instance))
            .or_default()
            .add(r.result.as_str());
    }
    let mut groups: Vec<TribunalInstanceGroup> = tallies
        .into_iter()
        .map(|((tribunal, instance), tally)| TribunalInstanceGroup {
            tribunal: tribunal.to_string(),
            instance,
            outcomes: OutcomeTable::from_tally(&tally),
        })
        .collect();
    groups.sort_by(|a, b| {
        b.outcomes
            .total
            .cmp(&a.outcomes.total)
            .then_with(|| a.tribunal.cmp(&b.tribunal))
            .then_with(|| a.instance.cmp(&b.instance))
    });
    groups
}

/// Both distributions over raw records.
pub fn aggregate(records: &[DecisionRecord]) -> OutcomeDistribution {
    aggregate_iter(records.iter())
}

/// Both distributions over the decisions of the given cases, e.g. only the
/// complete chains of a linkage.
pub fn aggregate_cases<'c, 'r: 'c>(cases: impl IntoIterator<Item = &'c Case<'r>>) -> OutcomeDistribution {
    let decisions: Vec<&'r DecisionRecord> = cases
        .into_iter()
        .flat_map(|c| c.decisions().iter().copied())
        .collect();
    aggregate_iter(decisions)
}

fn aggregate_iter<'r>(records: impl IntoIterator<Item = &'r DecisionRecord>) -> OutcomeDistribution {
    let records: Vec<&DecisionRecord> = records.into_iter().collect();
    let distribution = OutcomeDistribution {
        by_instance: by_instance(records.iter().copied()),
        by_tribunal_instance: by_tribunal_instance(records.iter().copied()),
    };
    info!(
        decisions = records.len(),
        instance_groups = distribution.by_instance.len(),
        tribunal_groups = distribution.by_tribunal_instance.len(),
        "aggregated outcomes"
    );
    distribution
}

// ── Dataset profile ──

/// Field frequency tables over a record collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub total_records: usize,
    pub tribunals: FrequencyTable,
    pub subjects: FrequencyTable,
    pub classes: FrequencyTable,
    pub judging_bodies: FrequencyTable,
    /// Filing year, `N/A` when the date has no usable year.
    pub filing_years: FrequencyTable,
}

pub fn profile(records: &[DecisionRecord]) -> DatasetProfile {
    let mut p = DatasetProfile {
        total_records: records.len(),
        ..Default::default()
    };
    for r in records {
        p.tribunals.add(r.tribunal.as_str());
        p.subjects.add(r.subject.as_str());
        p.classes.add(r.class.as_str());
        p.judging_bodies.add(r.judging_body.as_str());
        match r.filing_year() {
            Some(year) => p.filing_years.add(year.to_string()),
            None => p.filing_years.add(NOT_AVAILABLE),
        }
    }
    p
}
