//! Decision records and the instance hierarchy.
//!
//! Records arrive as loosely-typed JSON objects keyed in Portuguese
//! (`numero_processo`, `instancia`, `resultado`, ...). Absent fields fall
//! back to [`NOT_AVAILABLE`] so they flow through every table as their own
//! category instead of failing the load.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::CoreError;

/// Sentinel for absent optional fields.
pub const NOT_AVAILABLE: &str = "N/A";

/// Keys under which an object-shaped document may carry its decision array.
const WRAPPER_KEYS: &[&str] = &["decisions", "data", "records"];

/// Tier of the judicial hierarchy a decision was issued at.
///
/// Variant order is instance rank, so the derived `Ord` sorts a case
/// chronologically with unrecognised labels last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instance {
    FirstInstance,
    SecondInstance,
    SuperiorCourt,
    Unknown,
}

// ── Label table ──
// Labels are compared after `fold_label`: lowercase, accents removed,
// whitespace collapsed.

const FIRST_LABELS: &[&str] = &[
    "primeira instancia",
    "1a instancia",
    "g1",
    "grau_1",
];

const SECOND_LABELS: &[&str] = &[
    "segunda instancia",
    "2a instancia",
    "g2",
    "grau_2",
];

const SUPERIOR_LABELS: &[&str] = &["tst", "gs", "sup", "tribunal superior do trabalho"];

impl Instance {
    /// The three instances that count toward chain completeness.
    pub const LINKABLE: [Instance; 3] = [
        Instance::FirstInstance,
        Instance::SecondInstance,
        Instance::SuperiorCourt,
    ];

    /// Classify a raw instance label against the closed label table.
    pub fn classify(label: &str) -> Self {
        let folded = fold_label(label);
        if FIRST_LABELS.contains(&folded.as_str()) {
            Self::FirstInstance
        } else if SECOND_LABELS.contains(&folded.as_str()) {
            Self::SecondInstance
        } else if SUPERIOR_LABELS.contains(&folded.as_str()) {
            Self::SuperiorCourt
        } else {
            Self::Unknown
        }
    }

    /// Classify a label, treating an unrecognised label from the `TST`
    /// tribunal as a superior-court decision.
    pub fn resolve(label: &str, tribunal: &str) -> Self {
        match Self::classify(label) {
            Self::Unknown if tribunal.trim().eq_ignore_ascii_case("tst") => Self::SuperiorCourt,
            other => other,
        }
    }

    /// 1 for first instance through 3 for the superior court; 4 for unknown.
    pub fn rank(&self) -> u8 {
        match self {
            Self::FirstInstance => 1,
            Self::SecondInstance => 2,
            Self::SuperiorCourt => 3,
            Self::Unknown => 4,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstInstance => "first_instance",
            Self::SecondInstance => "second_instance",
            Self::SuperiorCourt => "superior_court",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn fold_label(label: &str) -> String {
    let folded: String = label
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ª' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' | 'º' => 'o',
            'ú' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One judicial decision as supplied by the loader.
///
/// Read-only once built; the linker and every report borrow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct DecisionRecord {
    #[serde(rename = "numero_processo")]
    pub process_number: String,
    pub tribunal: String,
    #[serde(rename = "instancia")]
    pub instance_label: String,
    /// Resolved from `instance_label` and `tribunal` at construction.
    pub instance: Instance,
    #[serde(rename = "assunto")]
    pub subject: String,
    #[serde(rename = "classe")]
    pub class: String,
    #[serde(rename = "orgao_julgador")]
    pub judging_body: String,
    /// ISO-prefixed date string, e.g. `2016-03-14T00:00:00`.
    #[serde(rename = "data_ajuizamento")]
    pub filing_date: String,
    #[serde(rename = "resultado")]
    pub result: String,
}

impl DecisionRecord {
    /// Build a record from a process number and raw instance label; every
    /// other field starts as [`NOT_AVAILABLE`].
    pub fn new(process_number: impl Into<String>, instance_label: impl Into<String>) -> Self {
        let instance_label = instance_label.into();
        Self {
            process_number: process_number.into(),
            tribunal: NOT_AVAILABLE.to_string(),
            instance: Instance::resolve(&instance_label, NOT_AVAILABLE),
            instance_label,
            subject: NOT_AVAILABLE.to_string(),
            class: NOT_AVAILABLE.to_string(),
            judging_body: NOT_AVAILABLE.to_string(),
            filing_date: NOT_AVAILABLE.to_string(),
            result: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn with_tribunal(mut self, tribunal: impl Into<String>) -> Self {
        self.tribunal = tribunal.into();
        self.instance = Instance::resolve(&self.instance_label, &self.tribunal);
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = result.into();
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    pub fn with_judging_body(mut self, judging_body: impl Into<String>) -> Self {
        self.judging_body = judging_body.into();
        self
    }

    pub fn with_filing_date(mut self, filing_date: impl Into<String>) -> Self {
        self.filing_date = filing_date.into();
        self
    }

    /// Whether the record carries any process number at all.
    pub fn has_identifier(&self) -> bool {
        !self.process_number.trim().is_empty()
    }

    /// Filing year from the ISO prefix of `filing_date`.
    ///
    /// Falls back to the first four characters when they are digits but the
    /// full date does not parse (e.g. `2016-13-40`).
    pub fn filing_year(&self) -> Option<i32> {
        let s = self.filing_date.trim();
        if let Some(prefix) = s.get(..10)
            && let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
        {
            return Some(date.year());
        }
        let head = s.get(..4)?;
        if head.bytes().all(|b| b.is_ascii_digit()) {
            head.parse().ok()
        } else {
            None
        }
    }
}

impl TryFrom<Map<String, Value>> for DecisionRecord {
    type Error = String;

    fn try_from(obj: Map<String, Value>) -> Result<Self, Self::Error> {
        let process_number =
            field(&obj, &["numero_processo", "numeroProcesso"])?.unwrap_or_default();
        let tribunal = field_or_na(&obj, &["tribunal"])?;
        let instance_label = field_or_na(&obj, &["instancia", "grau"])?;
        Ok(Self {
            instance: Instance::resolve(&instance_label, &tribunal),
            process_number,
            tribunal,
            instance_label,
            subject: field_or_na(&obj, &["assunto"])?,
            class: field_or_na(&obj, &["classe"])?,
            judging_body: field_or_na(&obj, &["orgao_julgador"])?,
            filing_date: field_or_na(&obj, &["data_ajuizamento"])?,
            result: field_or_na(&obj, &["resultado"])?,
        })
    }
}

/// Read the first present, non-null key as a string. Numbers and booleans
/// are stringified; arrays and objects are rejected.
fn field(obj: &Map<String, Value>, keys: &[&str]) -> Result<Option<String>, String> {
    for key in keys {
        match obj.get(*key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) => return Ok(Some(s.clone())),
            Some(Value::Number(n)) => return Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => return Ok(Some(b.to_string())),
            Some(_) => return Err(format!("field `{key}` is not a scalar")),
        }
    }
    Ok(None)
}

fn field_or_na(obj: &Map<String, Value>, keys: &[&str]) -> Result<String, String> {
    Ok(field(obj, keys)?
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string()))
}

// ── Loading ──

/// Parse a JSON document into decision records.
pub fn records_from_json(text: &str) -> Result<Vec<DecisionRecord>, CoreError> {
    let value: Value = serde_json::from_str(text)?;
    records_from_value(value)
}

/// Convert an already-parsed JSON document into decision records.
///
/// Accepts a top-level array, or an object wrapping one under `decisions`,
/// `data`, or `records`. Any entry that is not an object fails the whole
/// load.
pub fn records_from_value(value: Value) -> Result<Vec<DecisionRecord>, CoreError> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut obj) => {
            let key = WRAPPER_KEYS
                .iter()
                .find(|k| matches!(obj.get(**k), Some(Value::Array(_))))
                .ok_or(CoreError::NotASequence("object without a decision array"))?;
            match obj.remove(*key) {
                Some(Value::Array(entries)) => entries,
                _ => return Err(CoreError::NotASequence("object without a decision array")),
            }
        }
        Value::Null => return Err(CoreError::NotASequence("null")),
        Value::Bool(_) => return Err(CoreError::NotASequence("boolean")),
        Value::Number(_) => return Err(CoreError::NotASequence("number")),
        Value::String(_) => return Err(CoreError::NotASequence("string")),
    };

    let mut records = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        if !entry.is_object() {
            return Err(CoreError::MalformedInput {
                index,
                reason: format!("expected an object, found {}", json_kind(&entry)),
            });
        }
        let record: DecisionRecord =
            serde_json::from_value(entry).map_err(|e| CoreError::MalformedInput {
                index,
                reason: e.to_string(),
            })?;
        records.push(record);
    }

    info!(count = records.len(), "loaded decision records");
    Ok(records)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_portuguese_labels() {
        assert_eq!(Instance::classify("Primeira Instância"), Instance::FirstInstance);
        assert_eq!(Instance::classify("Segunda Instância"), Instance::SecondInstance);
        assert_eq!(Instance::classify("TST"), Instance::SuperiorCourt);
    }

    #[test]
    fn classify_grau_codes() {
        assert_eq!(Instance::classify("G1"), Instance::FirstInstance);
        assert_eq!(Instance::classify("GRAU_2"), Instance::SecondInstance);
        assert_eq!(Instance::classify("SUP"), Instance::SuperiorCourt);
        assert_eq!(Instance::classify("gs"), Instance::SuperiorCourt);
    }

    #[test]
    fn classify_tolerates_case_accents_and_spacing() {
        assert_eq!(Instance::classify("  primeira   instancia "), Instance::FirstInstance);
        assert_eq!(Instance::classify("2ª Instância"), Instance::SecondInstance);
        assert_eq!(
            Instance::classify("Tribunal Superior do Trabalho"),
            Instance::SuperiorCourt
        );
    }

    #[test]
    fn classify_rejects_substring_matches() {
        assert_eq!(Instance::classify("TST-RR"), Instance::Unknown);
        assert_eq!(Instance::classify("Terceira Instância"), Instance::Unknown);
        assert_eq!(Instance::classify(""), Instance::Unknown);
        assert_eq!(Instance::classify(NOT_AVAILABLE), Instance::Unknown);
    }

    #[test]
    fn resolve_falls_back_to_tst_tribunal() {
        assert_eq!(Instance::resolve("N/A", "TST"), Instance::SuperiorCourt);
        assert_eq!(Instance::resolve("N/A", "TRT2"), Instance::Unknown);
        assert_eq!(Instance::resolve("G1", "TST"), Instance::FirstInstance);
    }

    #[test]
    fn instance_order_is_rank_order() {
        let mut v = vec![
            Instance::Unknown,
            Instance::SuperiorCourt,
            Instance::FirstInstance,
            Instance::SecondInstance,
        ];
        v.sort();
        assert_eq!(
            v,
            vec![
                Instance::FirstInstance,
                Instance::SecondInstance,
                Instance::SuperiorCourt,
                Instance::Unknown,
            ]
        );
        assert_eq!(Instance::Unknown.rank(), 4);
    }

    #[test]
    fn loads_array_with_defaults() {
        let json = r#"[
            {"numero_processo": "0010715-58.2016.5.02.0511", "tribunal": "TRT2",
             "instancia": "Primeira Instância", "resultado": "Procedente"},
            {"numero_processo": "RO-0010715-58.2016.5.02.0000"}
        ]"#;
        let records = records_from_json(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].instance, Instance::FirstInstance);
        assert_eq!(records[0].tribunal, "TRT2");
        assert_eq!(records[1].tribunal, NOT_AVAILABLE);
        assert_eq!(records[1].result, NOT_AVAILABLE);
        assert_eq!(records[1].instance, Instance::Unknown);
    }

    #[test]
    fn null_and_blank_fields_become_sentinel() {
        let json = r#"[{"numero_processo": "1", "tribunal": null, "resultado": "  "}]"#;
        let records = records_from_json(json).unwrap();
        assert_eq!(records[0].tribunal, NOT_AVAILABLE);
        assert_eq!(records[0].result, NOT_AVAILABLE);
    }

    #[test]
    fn missing_process_number_is_empty_not_sentinel() {
        let records = records_from_json(r#"[{"tribunal": "TRT4"}]"#).unwrap();
        assert_eq!(records[0].process_number, "");
        assert!(!records[0].has_identifier());
    }

    #[test]
    fn numeric_fields_are_stringified() {
        let json = r#"[{"numero_processo": 10715582016, "tribunal": "TRT15", "classe": 1009}]"#;
        let records = records_from_json(json).unwrap();
        assert_eq!(records[0].process_number, "10715582016");
        assert_eq!(records[0].class, "1009");
    }

    #[test]
    fn accepts_datajud_key_aliases() {
        let json = r#"[{"numeroProcesso": "00107155820165020511", "grau": "G2", "tribunal": "TRT2"}]"#;
        let records = records_from_json(json).unwrap();
        assert_eq!(records[0].process_number, "00107155820165020511");
        assert_eq!(records[0].instance, Instance::SecondInstance);
    }

    #[test]
    fn accepts_wrapped_array() {
        let json = r#"{"decisions": [{"numero_processo": "1"}]}"#;
        assert_eq!(records_from_json(json).unwrap().len(), 1);
    }

    #[test]
    fn rejects_non_object_entry() {
        let err = records_from_json(r#"[{"numero_processo": "1"}, 42]"#).unwrap_err();
        match err {
            CoreError::MalformedInput { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_nested_field_value() {
        let err = records_from_json(r#"[{"tribunal": ["TRT2"]}]"#).unwrap_err();
        assert!(matches!(err, CoreError::MalformedInput { index: 0, .. }));
    }

    #[test]
    fn rejects_non_sequence_document() {
        assert!(matches!(
            records_from_json(r#""hello""#),
            Err(CoreError::NotASequence(_))
        ));
        assert!(matches!(
            records_from_json(r#"{"other": 1}"#),
            Err(CoreError::NotASequence(_))
        ));
        assert!(matches!(records_from_json("not json"), Err(CoreError::Json(_))));
    }

    #[test]
    fn empty_array_loads_nothing() {
        assert!(records_from_json("[]").unwrap().is_empty());
    }

    #[test]
    fn filing_year_from_iso_prefix() {
        let r = DecisionRecord::new("1", "G1").with_filing_date("2016-03-14T00:00:00");
        assert_eq!(r.filing_year(), Some(2016));
        let r = DecisionRecord::new("1", "G1").with_filing_date("2019-13-40");
        assert_eq!(r.filing_year(), Some(2019));
        let r = DecisionRecord::new("1", "G1");
        assert_eq!(r.filing_year(), None);
    }

    #[test]
    fn serialised_record_reloads() {
        let r = DecisionRecord::new("0010715-58.2016.5.02.0511", "Primeira Instância")
            .with_tribunal("TRT2")
            .with_result("Procedente");
        let json = serde_json::to_string(&vec![r.clone()]).unwrap();
        let back = records_from_json(&json).unwrap();
        assert_eq!(back, vec![r]);
    }
}
