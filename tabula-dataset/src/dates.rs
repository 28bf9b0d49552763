//! Date format tokens and pattern-based date parsing.
//!
//! Formats are written with tokens such as `YYYY-MM-DD` or `DD Month YYYY`
//! and translated to chrono `strftime` specifiers before parsing. Components
//! missing from a format (month, day, time) default to their first value.
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use tabula_common::Value;

/// Canonical date format recognised during type inference
pub const CANONICAL_DATE_FORMAT: &str = "YYYY-MM-DD";

/// Canonical date-time format recognised during type inference
pub const CANONICAL_DATETIME_FORMAT: &str = "YYYY-MM-DDTHH:mm:ss";

const DATE_TOKENS: [(&str, &str); 8] = [
    ("YYYY", "%Y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("YY", "%y"),
    ("Month", "%B"),
    ("HH", "%H"),
    ("mm", "%M"),
    ("ss", "%S"),
];

const FORMAT_LABELS: [&str; 10] = [
    "YYYY-MM-DD",
    "DD/MM/YYYY",
    "YYYY-MM",
    "YY-MM",
    "MM/YY",
    "MM/YYYY",
    "DD Month YYYY",
    "YYYY",
    "YYYY-MM-DD HH:mm:ss",
    "YYYY-MM-DDTHH:mm:ss",
];

const ENGLISH_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

lazy_static! {
    /// Supported date format labels mapped to their chrono format strings
    pub static ref DATE_FORMATS: IndexMap<&'static str, String> = FORMAT_LABELS
        .iter()
        .map(|label| (*label, translate_date_format(label)))
        .collect();

    static ref CANONICAL_DATE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    static ref CANONICAL_DATETIME: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}$").unwrap();

    static ref LOCALE_MONTHS: HashMap<&'static str, [&'static str; 12]> = {
        let mut m = HashMap::new();
        m.insert("it", [
            "gennaio", "febbraio", "marzo", "aprile", "maggio", "giugno",
            "luglio", "agosto", "settembre", "ottobre", "novembre", "dicembre",
        ]);
        m.insert("fr", [
            "janvier", "février", "mars", "avril", "mai", "juin",
            "juillet", "août", "septembre", "octobre", "novembre", "décembre",
        ]);
        m.insert("de", [
            "januar", "februar", "märz", "april", "mai", "juni",
            "juli", "august", "september", "oktober", "november", "dezember",
        ]);
        m.insert("es", [
            "enero", "febrero", "marzo", "abril", "mayo", "junio",
            "julio", "agosto", "septiembre", "octubre", "noviembre", "diciembre",
        ]);
        m.insert("pt", [
            "janeiro", "fevereiro", "março", "abril", "maio", "junho",
            "julho", "agosto", "setembro", "outubro", "novembro", "dezembro",
        ]);
        m.insert("nl", [
            "januari", "februari", "maart", "april", "mei", "juni",
            "juli", "augustus", "september", "oktober", "november", "december",
        ]);
        m
    };
}

/// Translate a token date format (`DD/MM/YYYY`) into a chrono format (`%d/%m/%Y`)
pub fn translate_date_format(format: &str) -> String {
    DATE_TOKENS
        .iter()
        .fold(format.to_string(), |acc, (token, spec)| acc.replace(token, spec))
}

/// Name of the canonical pattern a string matches, if any
pub fn canonical_date_pattern(value: &str) -> Option<&'static str> {
    if CANONICAL_DATE.is_match(value) && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
        Some(CANONICAL_DATE_FORMAT)
    } else if CANONICAL_DATETIME.is_match(value)
        && NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
    {
        Some(CANONICAL_DATETIME_FORMAT)
    } else {
        None
    }
}

/// Parses strings with one date format into UTC timestamps.
///
/// Empty or missing input maps to [`Value::Null`], the empty-date marker,
/// while input that does not match the format is returned unchanged so the
/// caller's type check reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct DateParser {
    format: String,
    chrono_format: String,
    month_names: Option<[&'static str; 12]>,
}

impl DateParser {
    pub fn new(format: &str) -> Self {
        Self {
            format: format.to_string(),
            chrono_format: translate_date_format(format),
            month_names: None,
        }
    }

    /// Parser that also accepts month names of `locale` (e.g. `it-IT`).
    ///
    /// Locales without a month table fall back to English names.
    pub fn with_locale(format: &str, locale: &str) -> Self {
        let language = locale
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_lowercase();
        Self {
            month_names: LOCALE_MONTHS.get(language.as_str()).copied(),
            ..Self::new(format)
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn chrono_format(&self) -> &str {
        &self.chrono_format
    }

    pub fn parse(&self, value: &Value) -> Value {
        match value {
            Value::Null => Value::Null,
            Value::Date(_) => value.clone(),
            Value::String(s) if s.trim().is_empty() => Value::Null,
            Value::String(s) => self
                .parse_str(s)
                .map(Value::Date)
                .unwrap_or_else(|| value.clone()),
            Value::Number(n) => self
                .parse_str(&n.to_string())
                .map(Value::Date)
                .unwrap_or_else(|| value.clone()),
            _ => value.clone(),
        }
    }

    pub fn parse_str(&self, input: &str) -> Option<DateTime<Utc>> {
        let mut format = self.chrono_format.clone();
        let mut input = self.localize_months(input.trim());

        let has_month = ["%m", "%B", "%b"].iter().any(|s| format.contains(s));
        if !has_month {
            format.push_str(" %m");
            input.push_str(" 01");
        }
        if !format.contains("%d") {
            format.push_str(" %d");
            input.push_str(" 01");
        }

        let naive = if format.contains("%H") {
            NaiveDateTime::parse_from_str(&input, &format).ok()?
        } else {
            NaiveDate::parse_from_str(&input, &format)
                .ok()?
                .and_hms_opt(0, 0, 0)?
        };
        Some(naive.and_utc())
    }

    fn localize_months(&self, input: &str) -> String {
        let Some(names) = &self.month_names else {
            return input.to_string();
        };
        input
            .split(' ')
            .map(|word| {
                let lower = word.to_lowercase();
                names
                    .iter()
                    .position(|name| *name == lower)
                    .map(|i| ENGLISH_MONTHS[i].to_string())
                    .unwrap_or_else(|| word.to_string())
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parse a date written in one of the canonical or RFC 3339 forms
pub fn parse_canonical_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(input) {
        return Some(d.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(input, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}
