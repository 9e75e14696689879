//! Field Normalisation Module
//! Turns the free-text Dove fields into canonical values.
//!
//! Every parser here is total: unrecognised input is logged and mapped to a
//! sentinel so a single bad record never aborts a batch load.

use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::model::{Accidental, BellRole, Chime};

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new($re).ok());
    };
}

pattern!(PLAIN_NUMBER, r"^(\d+)$");
pattern!(NUMBER_CHIME, r"^(\d+)c(\d+)$");
pattern!(CHIME, r"^c(\d+)([b#])?$");
pattern!(NAME, r"^[A-Za-z]+$");
pattern!(ACCIDENTAL_CHIME, r"^(\d+)([b#])c(\d+)$");
pattern!(ACCIDENTAL, r"^(\d+)([b#])$");

pattern!(YEAR, r"^(\d+)$");
pattern!(CIRCA_YEAR, r"^c(\d+)$");
pattern!(BRACKETED_YEAR, r"^\((\d+)\)$");

/// Markers Dove uses for an unknown founding date.
const UNKNOWN_DATES: [&str; 3] = ["", "nan", "(n/d)"];

fn captures<'t>(re: &LazyLock<Option<Regex>>, text: &'t str) -> Option<Captures<'t>> {
    let re: &Option<Regex> = re;
    re.as_ref()?.captures(text)
}

fn number(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group)?.as_str().parse().ok()
}

fn accidental(caps: &Captures<'_>, group: usize) -> Option<Accidental> {
    match caps.get(group)?.as_str() {
        "b" => Some(Accidental::Flat),
        "#" => Some(Accidental::Sharp),
        _ => None,
    }
}

/// A parsed bell designation: position in the ring and/or chime number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Designation {
    pub role: Option<BellRole>,
    pub chime: Option<Chime>,
}

impl Designation {
    pub const EXTRA: Designation = Designation {
        role: Some(BellRole::Extra),
        chime: None,
    };

    fn role(role: BellRole) -> Self {
        Self {
            role: Some(role),
            chime: None,
        }
    }

    fn with_chime(mut self, number: u32, accidental: Option<Accidental>) -> Self {
        self.chime = Some(Chime { number, accidental });
        self
    }
}

fn match_designation(text: &str) -> Option<Designation> {
    if let Some(caps) = captures(&PLAIN_NUMBER, text) {
        return Some(Designation::role(BellRole::Numbered(number(&caps, 1)?)));
    }
    if let Some(caps) = captures(&NUMBER_CHIME, text) {
        return Some(
            Designation::role(BellRole::Numbered(number(&caps, 1)?))
                .with_chime(number(&caps, 2)?, None),
        );
    }
    if let Some(caps) = captures(&CHIME, text) {
        let chime = Designation {
            role: None,
            chime: None,
        };
        return Some(chime.with_chime(number(&caps, 1)?, accidental(&caps, 2)));
    }
    if captures(&NAME, text).is_some() {
        return Some(Designation::role(BellRole::Named(text.to_string())));
    }
    if let Some(caps) = captures(&ACCIDENTAL_CHIME, text) {
        let role = BellRole::Accidental(number(&caps, 1)?, accidental(&caps, 2)?);
        return Some(Designation::role(role).with_chime(number(&caps, 3)?, None));
    }
    if let Some(caps) = captures(&ACCIDENTAL, text) {
        let role = BellRole::Accidental(number(&caps, 1)?, accidental(&caps, 2)?);
        return Some(Designation::role(role));
    }
    None
}

/// Parse a Dove `Bell Role` such as `6`, `3c2`, `c4#`, `2b` or `Sanctus`.
///
/// Anything unrecognised becomes [`Designation::EXTRA`] with a warning.
pub fn parse_bell_designation(input: &str) -> Designation {
    let text = input.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("nan") {
        log::warn!("Bell designation missing, recorded as Extra");
        return Designation::EXTRA;
    }
    match_designation(text).unwrap_or_else(|| {
        log::warn!("Unrecognised bell designation '{text}', recorded as Extra");
        Designation::EXTRA
    })
}

/// Parse a Dove `Cast Date` such as `1887`, `c1700` or `(1650)`.
pub fn parse_cast_date(input: &str) -> Option<i32> {
    let text = input.trim();
    if UNKNOWN_DATES.iter().any(|m| text.eq_ignore_ascii_case(m)) {
        return None;
    }
    let year = captures(&YEAR, text)
        .or_else(|| captures(&CIRCA_YEAR, text))
        .or_else(|| captures(&BRACKETED_YEAR, text))
        .and_then(|caps| caps.get(1)?.as_str().parse::<i32>().ok());
    if year.is_none() {
        log::warn!("Unrecognised cast date '{text}', recorded as unknown");
    }
    year
}

/// Trimmed text, or `default` when missing or blank.
pub fn text_or_default(value: Option<&str>, default: &str) -> String {
    optional_text(value).unwrap_or_else(|| default.to_string())
}

/// Trimmed text; blank and `nan` become `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    let text = value?.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(text.to_string())
    }
}

/// A finite float, or `None` for missing and non-numeric text.
pub fn parse_float(value: Option<&str>) -> Option<f64> {
    value?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// An integer, accepting integral floats such as `1234.0`.
pub fn parse_int(value: Option<&str>) -> Option<i64> {
    let text = value?.trim();
    text.parse::<i64>().ok().or_else(|| {
        parse_float(Some(text))
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role_and_chime(input: &str) -> (Option<String>, Option<String>) {
        let d = parse_bell_designation(input);
        (
            d.role.map(|r| r.to_string()),
            d.chime.map(|c| c.to_string()),
        )
    }

    fn pair(role: Option<&str>, chime: Option<&str>) -> (Option<String>, Option<String>) {
        (role.map(String::from), chime.map(String::from))
    }

    #[test]
    fn test_known_designations() {
        let cases = [
            ("6", pair(Some("6"), None)),
            ("12", pair(Some("12"), None)),
            ("3c2", pair(Some("3"), Some("2"))),
            ("c4", pair(None, Some("4"))),
            ("c4b", pair(None, Some("4b"))),
            ("c4#", pair(None, Some("4#"))),
            ("Sanctus", pair(Some("Sanctus"), None)),
            ("2bc5", pair(Some("2b"), Some("5"))),
            ("6#c1", pair(Some("6#"), Some("1"))),
            ("2b", pair(Some("2b"), None)),
            ("6#", pair(Some("6#"), None)),
        ];
        for (input, expected) in cases {
            assert_eq!(role_and_chime(input), expected, "input {input}");
        }
    }

    #[test]
    fn test_plain_number_is_numbered() {
        assert_eq!(
            parse_bell_designation(" 8 ").role,
            Some(BellRole::Numbered(8))
        );
        assert_eq!(
            parse_bell_designation("3c2").role,
            Some(BellRole::Numbered(3))
        );
        assert_eq!(
            parse_bell_designation("2b").role,
            Some(BellRole::Accidental(2, Accidental::Flat))
        );
    }

    #[test]
    fn test_unrecognised_designations_fall_back() {
        for input in ["", "nan", "3c2b", "6-7", "1a", "99999999999", "#"] {
            assert_eq!(parse_bell_designation(input), Designation::EXTRA, "input {input}");
        }
    }

    #[test]
    fn test_cast_dates() {
        assert_eq!(parse_cast_date("1887"), Some(1887));
        assert_eq!(parse_cast_date("c1700"), Some(1700));
        assert_eq!(parse_cast_date("(1650)"), Some(1650));
        assert_eq!(parse_cast_date(" 1999 "), Some(1999));
    }

    #[test]
    fn test_unknown_cast_dates() {
        for input in ["", "nan", "(n/d)", "1700s", "about 1650", "c.1700"] {
            assert_eq!(parse_cast_date(input), None, "input {input}");
        }
    }

    #[test]
    fn test_field_coercions() {
        assert_eq!(text_or_default(None, ""), "");
        assert_eq!(text_or_default(Some("  "), "-"), "-");
        assert_eq!(text_or_default(Some(" Kent "), ""), "Kent");
        assert_eq!(optional_text(Some("NaN")), None);
        assert_eq!(parse_float(Some("12.5")), Some(12.5));
        assert_eq!(parse_float(Some("n/a")), None);
        assert_eq!(parse_float(Some("nan")), None);
        assert_eq!(parse_int(Some("1234")), Some(1234));
        assert_eq!(parse_int(Some("1234.0")), Some(1234));
        assert_eq!(parse_int(Some("12.5")), None);
    }
}
