//! Plain-text rendering of analysis reports.
//!
//! Each report prints as titled sections of `label  value` rows. The
//! `--json` path bypasses this module entirely.

use casechain_core::aggregate::OutcomeTable;
use casechain_core::appeal::{AppealTally, Appellant};
use casechain_core::tally::percent;
use casechain_core::validator::InstancePair;
use casechain_core::{
    AppealReport, CaseSummary, DatasetProfile, FrequencyTable, Instance, LinkSummary,
    OutcomeDistribution, PatternReport,
};

// ── Linking ──

pub fn print_link_summary(summary: &LinkSummary, largest: &[CaseSummary]) {
    println!("=== Case linking ===");
    println!();

    println!("Records");
    row("total", summary.total_records);
    row("linked", summary.linked_records);
    row("unlinkable", summary.unlinkable_records);
    row("degraded key", summary.degraded_key_records);
    println!();

    println!("Cases");
    row("total", summary.total_cases);
    row_pct(
        "multi-instance",
        summary.multi_instance_cases,
        summary.total_cases,
    );
    row_pct("complete chains", summary.complete_chains, summary.total_cases);
    row("exact match", summary.exact_match_cases);
    row("core-key match", summary.core_key_match_cases);
    row("unlinked", summary.unlinked_cases);
    println!();

    println!("Linked records per instance");
    for (instance, count) in &summary.per_instance {
        row(instance.as_str(), count);
    }
    println!();

    // At most eight flow shapes exist, so nothing is truncated.
    print_table("Case flows", &summary.flow_patterns, summary.flow_patterns.len());

    if largest.is_empty() {
        return;
    }
    println!("Largest multi-instance cases");
    for case in largest {
        println!("  {}  [{}]", case.key, case.confidence.as_str());
        for ((number, instance), result) in case
            .process_numbers
            .iter()
            .zip(&case.instances)
            .zip(&case.results)
        {
            println!("    {:<16} {:<28} {}", instance.as_str(), number, result);
        }
    }
    println!();
}

// ── Pattern validation ──

pub fn print_pattern_report(report: &PatternReport, top_n: usize) {
    println!("=== Process-number patterns ===");
    println!();

    println!("Records per instance");
    for (instance, count) in &report.records_by_instance {
        row(instance.as_str(), count);
    }
    row("without core key", report.records_without_core_key);
    row("spelling variations", report.number_variations);
    row("origin divergent cases", report.origin_divergent_groups);
    println!();

    println!("Shared identifiers (exact / core key)");
    for pair in InstancePair::ALL {
        let Some(o) = report.overlap(pair) else {
            continue;
        };
        let gain = o
            .core_gain()
            .map_or_else(|| "-".to_string(), |g| format!("x{g:.2}"));
        println!(
            "  {:<26} {} / {}  {}",
            pair.as_str(),
            o.exact,
            o.core_key,
            gain
        );
    }
    let verdict = if report.core_key_dominates() {
        "core key finds at least as many links as exact matching"
    } else {
        "exact matching finds more links than the core key"
    };
    println!("  {verdict}");
    println!();

    for instance in Instance::LINKABLE {
        if let Some(t) = report.prefix_frequency.get(&instance) {
            print_table(&format!("Top prefixes: {instance}"), t, top_n);
        }
        if let Some(t) = report.year_frequency.get(&instance) {
            print_table(&format!("Top year fragments: {instance}"), t, top_n);
        }
        if let Some(t) = report.cnj_year_frequency.get(&instance) {
            print_table(&format!("CNJ years: {instance}"), t, top_n);
        }
    }
}

// ── Outcomes ──

pub fn print_outcomes(dist: &OutcomeDistribution) {
    println!("=== Outcomes by instance ===");
    println!();
    for group in &dist.by_instance {
        print_outcome_table(group.instance.as_str(), &group.outcomes);
    }

    println!("=== Outcomes by tribunal and instance ===");
    println!();
    for group in &dist.by_tribunal_instance {
        let header = format!("{} / {}", group.tribunal, group.instance);
        print_outcome_table(&header, &group.outcomes);
    }
}

fn print_outcome_table(header: &str, table: &OutcomeTable) {
    println!("{header} ({} decisions)", table.total);
    for r in &table.rows {
        println!("  {:<26} {:>6}  {:>5.1}%", r.outcome, r.count, r.percent);
    }
    println!();
}

// ── Appeals ──

pub fn print_appeals(report: &AppealReport, top_n: usize) {
    println!("=== Appeal chains ===");
    println!();
    row("multi-instance cases", report.cases);
    row_pct(
        "reversed at 2nd instance",
        report.second_instance_reversals,
        report.cases,
    );
    row_pct(
        "reversed at superior court",
        report.superior_reversals,
        report.cases,
    );
    row("unresolved steps", report.unresolved_steps);
    println!();

    println!("Regional appeals (1st -> 2nd)");
    for appellant in [Appellant::Worker, Appellant::Employer, Appellant::Undetermined] {
        tally_row(appellant.as_str(), report.regional_for(appellant));
    }
    println!();

    println!("Superior appeals (2nd -> TST)");
    for appellant in [Appellant::Worker, Appellant::Employer, Appellant::Undetermined] {
        tally_row(appellant.as_str(), report.superior_for(appellant));
    }
    println!();

    if !report.regional_by_tribunal.is_empty() {
        println!("Regional appeals by tribunal");
        for (tribunal, tallies) in &report.regional_by_tribunal {
            for (appellant, tally) in tallies {
                tally_row(&format!("{tribunal} {}", appellant.as_str()), *tally);
            }
        }
        println!();
    }

    print_table("Outcome chains", &report.outcome_chains, top_n);
}

fn tally_row(label: &str, tally: AppealTally) {
    if tally.total() == 0 {
        return;
    }
    println!(
        "  {:<26} {} granted / {} denied  ({:.1}%)",
        label,
        tally.success,
        tally.failure,
        tally.success_rate()
    );
}

// ── Profile ──

pub fn print_profile(profile: &DatasetProfile, top_n: usize) {
    println!("=== Dataset profile ===");
    println!();
    row("records", profile.total_records);
    println!();
    print_table("Tribunals", &profile.tribunals, top_n);
    print_table("Subjects", &profile.subjects, top_n);
    print_table("Classes", &profile.classes, top_n);
    print_table("Judging bodies", &profile.judging_bodies, top_n);
    print_table("Filing years", &profile.filing_years, top_n);
}

// ── Rows ──

fn row(label: &str, value: impl std::fmt::Display) {
    println!("  {:<26} {}", label, value);
}

fn row_pct(label: &str, part: usize, whole: usize) {
    println!("  {:<26} {}  ({:.1}%)", label, part, percent(part, whole));
}

fn print_table(header: &str, table: &FrequencyTable, top_n: usize) {
    if table.is_empty() {
        return;
    }
    let total = table.total();
    println!("{header}");
    for (key, count) in table.top(top_n) {
        row_pct(key, count, total);
    }
    if table.len() > top_n {
        println!("  ... {} more", table.len() - top_n);
    }
    println!();
}
