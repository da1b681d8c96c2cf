//! Process-number normalisation.
//!
//! Each court instance formats the same case number differently: the
//! first instance writes `0010715-58.2016.5.02.0511`, the appellate court
//! `RO-0010715-58.2016.5.02.0000`, the superior court may add its own
//! class prefix or drop the punctuation entirely. Stripping everything
//! but the digits recovers a string whose leading digits are stable
//! across instances.
//!
//! # CNJ numbering
//!
//! A full CNJ number has 20 digits, `NNNNNNN-DD.AAAA.J.TR.OOOO`:
//!
//! - `NNNNNNN` sequential number
//! - `DD` check digits
//! - `AAAA` filing year
//! - `J` justice segment (5 = labour)
//! - `TR` tribunal code
//! - `OOOO` origin unit, which changes as the case moves between courts
//!
//! The first 14 digits (sequential, check digits, year and segment) form
//! the [`core_key`]. Linking never interprets the fields; [`CnjNumber`]
//! exists for diagnostics only.

use serde::Serialize;

/// Digits kept by [`core_key`].
pub const CORE_KEY_LEN: usize = 14;

/// Digits kept by [`digit_prefix`] in the pattern frequency tables.
pub const PREFIX_LEN: usize = 7;

/// Length of a complete CNJ number once normalised.
pub const CNJ_LEN: usize = 20;

/// Remove every non-digit character.
///
/// Never fails: empty input gives an empty string. Idempotent.
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// First [`CORE_KEY_LEN`] digits of the normalised form, or `None` when the
/// number carries fewer digits than that.
pub fn core_key(raw: &str) -> Option<String> {
    core_key_with_len(raw, CORE_KEY_LEN)
}

/// [`core_key`] with an explicit key length.
pub fn core_key_with_len(raw: &str, len: usize) -> Option<String> {
    digit_prefix(raw, len)
}

/// First `len` digits of the normalised form, if there are that many.
pub fn digit_prefix(raw: &str, len: usize) -> Option<String> {
    let digits = normalize(raw);
    if len == 0 || digits.len() < len {
        return None;
    }
    Some(digits[..len].to_string())
}

/// The first run of four consecutive digits in the raw string.
///
/// Scans the raw text, not the normalised form, so punctuation breaks runs:
/// in `0010715-58.2016.5.02.0511` the first match is `0010`, while in
/// `58.2016` alone it is `2016`.
pub fn first_four_digit_run(raw: &str) -> Option<&str> {
    let bytes = raw.as_bytes();
    let mut run = 0usize;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            run += 1;
            if run == 4 {
                return Some(&raw[i - 3..=i]);
            }
        } else {
            run = 0;
        }
    }
    None
}

/// Structured view of a 20-digit CNJ number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CnjNumber {
    pub sequential: String,
    pub check_digits: String,
    pub year: u16,
    pub segment: u8,
    pub tribunal: String,
    pub origin: String,
}

impl CnjNumber {
    /// Parse the first 20 digits of a process number.
    ///
    /// Returns `None` when fewer than 20 digits are present. Digits past the
    /// twentieth are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let digits = normalize(raw);
        if digits.len() < CNJ_LEN {
            return None;
        }
        let d = &digits[..CNJ_LEN];
        Some(Self {
            sequential: d[0..7].to_string(),
            check_digits: d[7..9].to_string(),
            year: d[9..13].parse().ok()?,
            segment: d[13..14].parse().ok()?,
            tribunal: d[14..16].to_string(),
            origin: d[16..20].to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_prefixes() {
        assert_eq!(
            normalize("0010715-58.2016.5.02.0511"),
            "00107155820165020511"
        );
        assert_eq!(
            normalize("RO-0010715-58.2016.5.02.0000"),
            "00107155820165020000"
        );
        assert_eq!(normalize("AIRR - 1000-12.2019.5.15.0001"), "10001220195150001");
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "",
            "abc",
            "0010715-58.2016.5.02.0511",
            "RR-1234 / 2020",
            "  42  ",
            "Nº 1.2.3",
            "٣٤٥ 12",
        ];
        for s in inputs {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn empty_and_digitless_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("sem número"), "");
        assert_eq!(core_key(""), None);
    }

    #[test]
    fn core_key_requires_fourteen_digits() {
        assert_eq!(core_key("1234567890123"), None);
        assert_eq!(
            core_key("12345678901234").as_deref(),
            Some("12345678901234")
        );
        assert_eq!(
            core_key("1234567-89.0123.4.56.7890").as_deref(),
            Some("12345678901234")
        );
    }

    #[test]
    fn core_key_shared_across_instance_formats() {
        let first = core_key("0010715-58.2016.5.02.0511");
        let second = core_key("RO-0010715-58.2016.5.02.0000");
        assert_eq!(first.as_deref(), Some("00107155820165"));
        assert_eq!(first, second);
    }

    #[test]
    fn custom_key_length() {
        assert_eq!(
            core_key_with_len("0010715-58.2016.5.02.0511", 16).as_deref(),
            Some("0010715582016502")
        );
        assert_eq!(core_key_with_len("123", 0), None);
    }

    #[test]
    fn digit_prefix_seven() {
        assert_eq!(
            digit_prefix("RO-0010715-58.2016.5.02.0000", PREFIX_LEN).as_deref(),
            Some("0010715")
        );
        assert_eq!(digit_prefix("12-34", PREFIX_LEN), None);
    }

    #[test]
    fn four_digit_run_scans_raw_text() {
        assert_eq!(first_four_digit_run("0010715-58.2016.5.02.0511"), Some("0010"));
        assert_eq!(first_four_digit_run("RO-58.2016"), Some("2016"));
        assert_eq!(first_four_digit_run("12.345.6"), None);
        assert_eq!(first_four_digit_run(""), None);
    }

    #[test]
    fn four_digit_run_after_multibyte_chars() {
        assert_eq!(first_four_digit_run("nº 2019/5"), Some("2019"));
    }

    #[test]
    fn cnj_parse_fields() {
        let cnj = CnjNumber::parse("0010715-58.2016.5.02.0511").unwrap();
        assert_eq!(cnj.sequential, "0010715");
        assert_eq!(cnj.check_digits, "58");
        assert_eq!(cnj.year, 2016);
        assert_eq!(cnj.segment, 5);
        assert_eq!(cnj.tribunal, "02");
        assert_eq!(cnj.origin, "0511");
    }

    #[test]
    fn cnj_parse_rejects_short_numbers() {
        assert!(CnjNumber::parse("0010715-58.2016.5.02").is_none());
        assert!(CnjNumber::parse("").is_none());
    }

    #[test]
    fn cnj_origin_differs_between_instances() {
        let first = CnjNumber::parse("0010715-58.2016.5.02.0511").unwrap();
        let second = CnjNumber::parse("RO-0010715-58.2016.5.02.0000").unwrap();
        assert_eq!(first.year, second.year);
        assert_ne!(first.origin, second.origin);
    }
}
