//! Appeal-chain analysis over linked cases.
//!
//! # Steps
//!
//! A multi-instance case is read as up to two appeal steps, each between
//! the first decision issued at consecutive instances:
//!
//! 1. **Regional**: first instance to second instance.
//! 2. **Superior**: second instance to the superior court.
//!
//! For each step the appellant is inferred from the decision appealed
//! against (the losing party appeals) and the step counts as a success when
//! the reviewing court grants the appeal (`Provido`).
//!
//! # Reversals
//!
//! - Second instance: `Improcedente` below, `Provido` on appeal.
//! - Superior court: the worker lost at the second instance (and at the
//!   first, when present) and the superior court granted the appeal.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::linker::Case;
use crate::record::{DecisionRecord, Instance, fold_label};
use crate::tally::{FrequencyTable, percent};

/// A decision outcome folded onto the four labels the appeal rules read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Claim upheld at first instance.
    Procedente,
    /// Claim rejected at first instance.
    Improcedente,
    /// Appeal granted.
    Provido,
    /// Appeal denied.
    Desprovido,
    /// Anything else, trimmed label kept.
    Other(String),
}

impl Outcome {
    /// Fold a free-text outcome label.
    ///
    /// Negative forms are tested before the positive substrings they
    /// contain, so `Improcedente` never reads as `Procedente` and
    /// `Negado provimento` never reads as `Provido`.
    pub fn canonical(label: &str) -> Self {
        let folded = fold_label(label);
        let has = |needle: &str| folded.contains(needle);
        if has("improced") {
            Self::Improcedente
        } else if has("desprov") || has("nao provido") || has("negad") || has("negacao") {
            Self::Desprovido
        } else if has("proced") {
            Self::Procedente
        } else if has("provid") || has("proviment") {
            Self::Provido
        } else {
            Self::Other(label.trim().to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Procedente => "Procedente",
            Self::Improcedente => "Improcedente",
            Self::Provido => "Provido",
            Self::Desprovido => "Desprovido",
            Self::Other(label) => label,
        }
    }

    /// The worker lost this decision.
    fn against_worker(&self) -> bool {
        matches!(self, Self::Improcedente | Self::Desprovido)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Appellant {
    Worker,
    Employer,
    Undetermined,
}

impl Appellant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Worker => "worker",
            Self::Employer => "employer",
            Self::Undetermined => "undetermined",
        }
    }
}

/// Who appealed `current`, given the decision `prev` it reviewed (if any).
///
/// With no `prev`, `current` is a first-instance ruling: `Improcedente`
/// means the worker lost and appealed, `Procedente` means the employer did.
/// Otherwise `current` is an appellate ruling and `prev` tells whose appeal
/// it granted or denied.
pub fn infer_appellant(prev: Option<&Outcome>, current: &Outcome) -> Appellant {
    use Outcome::*;
    match (prev, current) {
        (None, Improcedente) => Appellant::Worker,
        (None, Procedente) => Appellant::Employer,
        // Worker won on appeal; the employer takes it further.
        (Some(Improcedente), Provido) => Appellant::Employer,
        (Some(Improcedente), Desprovido) => Appellant::Worker,
        // Employer won on appeal; the worker takes it further.
        (Some(Procedente), Provido) => Appellant::Worker,
        (Some(Procedente), Desprovido) => Appellant::Employer,
        _ => Appellant::Undetermined,
    }
}

/// Granted and denied appeals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppealTally {
    pub success: usize,
    pub failure: usize,
}

impl AppealTally {
    pub fn total(&self) -> usize {
        self.success + self.failure
    }

    pub fn success_rate(&self) -> f64 {
        percent(self.success, self.total())
    }

    pub fn merge(self, other: AppealTally) -> Self {
        Self {
            success: self.success + other.success,
            failure: self.failure + other.failure,
        }
    }
}

/// Appeal statistics over a set of cases.
///
/// Built once by [`analyze_appeals`]; combine partial reports with
/// [`merge`](Self::merge).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppealReport {
    /// Multi-instance cases examined.
    pub cases: usize,
    /// First to second instance, by appellant.
    pub regional: BTreeMap<Appellant, AppealTally>,
    /// Second instance to superior court, by appellant.
    pub superior: BTreeMap<Appellant, AppealTally>,
    /// Regional step keyed by the second-instance tribunal.
    pub regional_by_tribunal: BTreeMap<String, BTreeMap<Appellant, AppealTally>>,
    /// Steps whose appellate outcome was neither granted nor denied.
    pub unresolved_steps: usize,
    pub second_instance_reversals: usize,
    pub superior_reversals: usize,
    /// Canonical outcomes in case order, e.g. `Improcedente -> Provido`.
    pub outcome_chains: FrequencyTable,
}

impl AppealReport {
    pub fn regional_for(&self, appellant: Appellant) -> AppealTally {
        self.regional.get(&appellant).copied().unwrap_or_default()
    }

    pub fn superior_for(&self, appellant: Appellant) -> AppealTally {
        self.superior.get(&appellant).copied().unwrap_or_default()
    }

    pub fn second_instance_reversal_rate(&self) -> f64 {
        percent(self.second_instance_reversals, self.cases)
    }

    pub fn superior_reversal_rate(&self) -> f64 {
        percent(self.superior_reversals, self.cases)
    }

    pub fn merge(self, other: &AppealReport) -> Self {
        let mut regional_by_tribunal = self.regional_by_tribunal;
        for (tribunal, tallies) in &other.regional_by_tribunal {
            let merged = merge_tallies(
                regional_by_tribunal.remove(tribunal).unwrap_or_default(),
                tallies,
            );
            regional_by_tribunal.insert(tribunal.clone(), merged);
        }
        Self {
            cases: self.cases + other.cases,
            regional: merge_tallies(self.regional, &other.regional),
            superior: merge_tallies(self.superior, &other.superior),
            regional_by_tribunal,
            unresolved_steps: self.unresolved_steps + other.unresolved_steps,
            second_instance_reversals: self.second_instance_reversals
                + other.second_instance_reversals,
            superior_reversals: self.superior_reversals + other.superior_reversals,
            outcome_chains: self.outcome_chains.merge(&other.outcome_chains),
        }
    }
}

fn merge_tallies(
    mut into: BTreeMap<Appellant, AppealTally>,
    from: &BTreeMap<Appellant, AppealTally>,
) -> BTreeMap<Appellant, AppealTally> {
    for (&appellant, &tally) in from {
        let current = into.remove(&appellant).unwrap_or_default();
        into.insert(appellant, current.merge(tally));
    }
    into
}

// ── Per-case analysis ──

/// What a single appeal step contributed.
struct StepResult {
    appellant: Appellant,
    granted: Option<bool>,
}

fn step(prev: Option<&Outcome>, appealed: &Outcome, review: &Outcome) -> StepResult {
    let granted = match review {
        Outcome::Provido => Some(true),
        Outcome::Desprovido => Some(false),
        _ => None,
    };
    StepResult {
        appellant: infer_appellant(prev, appealed),
        granted,
    }
}

fn record_step(
    tallies: &mut BTreeMap<Appellant, AppealTally>,
    unresolved: &mut usize,
    result: &StepResult,
) {
    match result.granted {
        Some(granted) => {
            let tally = tallies.entry(result.appellant).or_default();
            if granted {
                tally.success += 1;
            } else {
                tally.failure += 1;
            }
        }
        None => *unresolved += 1,
    }
}

fn first_outcome<'r>(case: &Case<'r>, instance: Instance) -> Option<(Outcome, &'r DecisionRecord)> {
    case.at(instance)
        .next()
        .map(|d| (Outcome::canonical(&d.result), d))
}

/// Walk the appeal steps of every multi-instance case.
pub fn analyze_appeals<'c, 'r: 'c>(cases: impl IntoIterator<Item = &'c Case<'r>>) -> AppealReport {
    let mut report = AppealReport::default();

    for case in cases.into_iter().filter(|c| c.is_multi_instance()) {
        report.cases += 1;

        let chain = case
            .decisions()
            .iter()
            .map(|d| Outcome::canonical(&d.result).to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        report.outcome_chains.add(chain);

        let first = first_outcome(case, Instance::FirstInstance);
        let second = first_outcome(case, Instance::SecondInstance);
        let superior = first_outcome(case, Instance::SuperiorCourt);

        if let (Some((first, _)), Some((second, second_record))) = (&first, &second) {
            let result = step(None, first, second);
            record_step(&mut report.regional, &mut report.unresolved_steps, &result);
            if result.granted.is_some() {
                let by_tribunal = report
                    .regional_by_tribunal
                    .entry(second_record.tribunal.clone())
                    .or_default();
                let mut ignored = 0;
                record_step(by_tribunal, &mut ignored, &result);
            }
            if *first == Outcome::Improcedente && *second == Outcome::Provido {
                report.second_instance_reversals += 1;
            }
        }

        if let (Some((second, _)), Some((superior, _))) = (&second, &superior) {
            let below = first.as_ref().map(|(o, _)| o);
            let result = step(below, second, superior);
            record_step(&mut report.superior, &mut report.unresolved_steps, &result);

            let lost_below = second.against_worker()
                && below.is_none_or(|o| *o == Outcome::Improcedente);
            if lost_below && *superior == Outcome::Provido {
                report.superior_reversals += 1;
            }
        }
    }

    info!(
        cases = report.cases,
        second_instance_reversals = report.second_instance_reversals,
        superior_reversals = report.superior_reversals,
        "analyzed appeal chains"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linker::link;

    fn rec(proc: &str, instance: &str, result: &str) -> DecisionRecord {
        DecisionRecord::new(proc, instance)
            .with_tribunal("TRT2")
            .with_result(result)
    }

    #[test]
    fn canonical_checks_negatives_first() {
        assert_eq!(Outcome::canonical("Improcedente"), Outcome::Improcedente);
        assert_eq!(Outcome::canonical("Improcedência"), Outcome::Improcedente);
        assert_eq!(Outcome::canonical("Parcialmente Procedente"), Outcome::Procedente);
        assert_eq!(Outcome::canonical("Não Provido"), Outcome::Desprovido);
        assert_eq!(Outcome::canonical("Negado provimento"), Outcome::Desprovido);
        assert_eq!(Outcome::canonical("Desprovimento"), Outcome::Desprovido);
        assert_eq!(Outcome::canonical("Provimento"), Outcome::Provido);
        assert_eq!(Outcome::canonical("provido em parte"), Outcome::Provido);
        assert_eq!(
            Outcome::canonical(" Homologação de Acordo "),
            Outcome::Other("Homologação de Acordo".into())
        );
        assert_eq!(Outcome::canonical("N/A").as_str(), "N/A");
    }

    #[test]
    fn appellant_inference() {
        use Outcome::*;
        assert_eq!(infer_appellant(None, &Improcedente), Appellant::Worker);
        assert_eq!(infer_appellant(None, &Procedente), Appellant::Employer);
        assert_eq!(infer_appellant(None, &Provido), Appellant::Undetermined);
        assert_eq!(infer_appellant(Some(&Improcedente), &Provido), Appellant::Employer);
        assert_eq!(infer_appellant(Some(&Improcedente), &Desprovido), Appellant::Worker);
        assert_eq!(infer_appellant(Some(&Procedente), &Provido), Appellant::Worker);
        assert_eq!(infer_appellant(Some(&Procedente), &Desprovido), Appellant::Employer);
        assert_eq!(
            infer_appellant(Some(&Other("x".into())), &Provido),
            Appellant::Undetermined
        );
    }

    #[test]
    fn regional_reversal_counts_worker_success() {
        let records = vec![
            rec("0010715-58.2016.5.02.0511", "G1", "Improcedente"),
            rec("0010715-58.2016.5.02.0000", "G2", "Provido"),
        ];
        let linkage = link(&records);
        let report = analyze_appeals(linkage.cases());

        assert_eq!(report.cases, 1);
        assert_eq!(report.second_instance_reversals, 1);
        assert_eq!(report.regional_for(Appellant::Worker).success, 1);
        assert_eq!(report.regional_for(Appellant::Employer).total(), 0);
        assert_eq!(report.outcome_chains.get("Improcedente -> Provido"), 1);
        assert_eq!(report.regional_by_tribunal["TRT2"][&Appellant::Worker].success, 1);
        assert!((report.second_instance_reversal_rate() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn superior_reversal_after_losing_twice() {
        let records = vec![
            rec("0020000-10.2018.5.04.0001", "G1", "Improcedente"),
            rec("0020000-10.2018.5.04.0001", "G2", "Desprovido"),
            rec("0020000-10.2018.5.04.0000", "TST", "Provido"),
        ];
        let linkage = link(&records);
        let report = analyze_appeals(linkage.cases());

        assert_eq!(report.superior_reversals, 1);
        assert_eq!(report.second_instance_reversals, 0);
        assert_eq!(report.regional_for(Appellant::Worker).failure, 1);
        assert_eq!(report.superior_for(Appellant::Worker).success, 1);
    }

    #[test]
    fn superior_reversal_without_first_instance() {
        let records = vec![
            rec("0030000-10.2018.5.04.0001", "G2", "Negado provimento"),
            rec("0030000-10.2018.5.04.0000", "TST", "Provido"),
        ];
        let linkage = link(&records);
        let report = analyze_appeals(linkage.cases());

        assert_eq!(report.superior_reversals, 1);
        // No first-instance ruling, so the appellant is unknown.
        assert_eq!(report.superior_for(Appellant::Undetermined).success, 1);
    }

    #[test]
    fn employer_loses_at_superior_court() {
        let records = vec![
            rec("0040000-10.2018.5.04.0001", "G1", "Improcedente"),
            rec("0040000-10.2018.5.04.0001", "G2", "Provido"),
            rec("0040000-10.2018.5.04.0000", "TST", "Desprovido"),
        ];
        let linkage = link(&records);
        let report = analyze_appeals(linkage.cases());

        assert_eq!(report.superior_for(Appellant::Employer).failure, 1);
        assert_eq!(report.superior_reversals, 0);
    }

    #[test]
    fn worker_wins_back_at_superior_court() {
        let records = vec![
            rec("0080000-10.2018.5.04.0001", "G1", "Procedente"),
            rec("0080000-10.2018.5.04.0001", "G2", "Provido"),
            rec("0080000-10.2018.5.04.0000", "TST", "Provido"),
        ];
        let linkage = link(&records);
        let report = analyze_appeals(linkage.cases());

        assert_eq!(report.regional_for(Appellant::Employer).success, 1);
        assert_eq!(report.superior_for(Appellant::Worker).success, 1);
        assert_eq!(report.superior_for(Appellant::Worker).failure, 0);
    }

    #[test]
    fn single_instance_cases_are_skipped() {
        let records = vec![
            rec("0050000-10.2018.5.04.0001", "G1", "Improcedente"),
            rec("0050000-10.2018.5.04.0001", "G1", "Procedente"),
        ];
        let linkage = link(&records);
        let report = analyze_appeals(linkage.cases());
        assert_eq!(report, AppealReport::default());
    }

    #[test]
    fn unresolved_steps_are_counted_apart() {
        let records = vec![
            rec("0060000-10.2018.5.04.0001", "G1", "Procedente"),
            rec("0060000-10.2018.5.04.0001", "G2", "Homologação de Acordo"),
        ];
        let linkage = link(&records);
        let report = analyze_appeals(linkage.cases());
        assert_eq!(report.unresolved_steps, 1);
        assert!(report.regional.is_empty());
        assert!(report.regional_by_tribunal.is_empty());
    }

    #[test]
    fn merge_is_additive() {
        let a_records = vec![
            rec("0010715-58.2016.5.02.0511", "G1", "Improcedente"),
            rec("0010715-58.2016.5.02.0000", "G2", "Provido"),
        ];
        let b_records = vec![
            rec("0070000-10.2018.5.04.0001", "G1", "Procedente"),
            rec("0070000-10.2018.5.04.0001", "G2", "Provido"),
        ];
        let a_link = link(&a_records);
        let b_link = link(&b_records);
        let a = analyze_appeals(a_link.cases());
        let b = analyze_appeals(b_link.cases());

        let merged = a.clone().merge(&b);
        assert_eq!(merged.cases, 2);
        assert_eq!(merged.regional_for(Appellant::Worker).success, 1);
        assert_eq!(merged.regional_for(Appellant::Employer).success, 1);
        assert_eq!(merged.regional_by_tribunal["TRT2"].len(), 2);
        assert_eq!(merged.outcome_chains.total(), 2);
        // Inputs are untouched.
        assert_eq!(a.cases, 1);

        let mut all = a_records;
        all.extend(b_records);
        assert_eq!(analyze_appeals(link(&all).cases()), merged);
    }

    #[test]
    fn tally_rates() {
        let t = AppealTally {
            success: 1,
            failure: 3,
        };
        assert_eq!(t.total(), 4);
        assert!((t.success_rate() - 25.0).abs() < 1e-9);
        assert_eq!(AppealTally::default().success_rate(), 0.0);
    }
}
