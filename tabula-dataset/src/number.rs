//! Locale-aware parsing of numbers written with arbitrary decimal symbols,
//! group delimiters and numeral alphabets.
//!
//! ```
//! use tabula_common::{NumberFormatOptions, Value};
//! use tabula_dataset::number::NumberParser;
//!
//! let parser = NumberParser::new(&NumberFormatOptions {
//!     locale: Some("it-IT".to_string()),
//!     ..Default::default()
//! })
//! .unwrap();
//! assert_eq!(parser.parse(&Value::from("1.234,5")), 1234.5);
//! assert!(parser.parse(&Value::from("abc")).is_nan());
//! ```
use crate::error::TabulaDatasetError;
use lazy_static::lazy_static;
use std::collections::HashMap;
use tabula_common::{NumberFormatOptions, Value};

const ARABIC_INDIC: [char; 10] = ['٠', '١', '٢', '٣', '٤', '٥', '٦', '٧', '٨', '٩'];
const PERSIAN: [char; 10] = ['۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷', '۸', '۹'];
const DEVANAGARI: [char; 10] = ['०', '१', '२', '३', '४', '५', '६', '७', '८', '९'];

/// Separator conventions of a locale
#[derive(Debug, Clone, Copy)]
struct LocaleNumberSymbols {
    decimal: char,
    group: char,
    numerals: Option<[char; 10]>,
}

impl LocaleNumberSymbols {
    const fn new(decimal: char, group: char) -> Self {
        Self {
            decimal,
            group,
            numerals: None,
        }
    }

    const fn with_numerals(decimal: char, group: char, numerals: [char; 10]) -> Self {
        Self {
            decimal,
            group,
            numerals: Some(numerals),
        }
    }
}

lazy_static! {
    static ref LOCALE_SYMBOLS: HashMap<&'static str, LocaleNumberSymbols> = {
        let mut m = HashMap::new();
        m.insert("en", LocaleNumberSymbols::new('.', ','));
        m.insert("en-us", LocaleNumberSymbols::new('.', ','));
        m.insert("en-gb", LocaleNumberSymbols::new('.', ','));
        m.insert("en-in", LocaleNumberSymbols::new('.', ','));
        m.insert("ja-jp", LocaleNumberSymbols::new('.', ','));
        m.insert("zh-cn", LocaleNumberSymbols::new('.', ','));
        m.insert("it", LocaleNumberSymbols::new(',', '.'));
        m.insert("it-it", LocaleNumberSymbols::new(',', '.'));
        m.insert("de", LocaleNumberSymbols::new(',', '.'));
        m.insert("de-de", LocaleNumberSymbols::new(',', '.'));
        m.insert("de-ch", LocaleNumberSymbols::new('.', '\''));
        m.insert("es", LocaleNumberSymbols::new(',', '.'));
        m.insert("es-es", LocaleNumberSymbols::new(',', '.'));
        m.insert("pt-br", LocaleNumberSymbols::new(',', '.'));
        m.insert("nl-nl", LocaleNumberSymbols::new(',', '.'));
        m.insert("fr", LocaleNumberSymbols::new(',', '\u{202f}'));
        m.insert("fr-fr", LocaleNumberSymbols::new(',', '\u{202f}'));
        m.insert("ru-ru", LocaleNumberSymbols::new(',', '\u{a0}'));
        m.insert("sv-se", LocaleNumberSymbols::new(',', '\u{a0}'));
        m.insert("ar-eg", LocaleNumberSymbols::with_numerals('٫', '٬', ARABIC_INDIC));
        m.insert("fa-ir", LocaleNumberSymbols::with_numerals('٫', '٬', PERSIAN));
        m.insert("hi-in", LocaleNumberSymbols::with_numerals('.', ',', DEVANAGARI));
        m
    };
}

/// Parses numbers according to a decimal symbol, a group delimiter and an
/// optional numeral alphabet.
///
/// Explicit `decimal`, `group` and `numerals` options override the symbols of
/// the configured locale.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberParser {
    locale: Option<String>,
    decimal: char,
    group: char,
    numerals: Option<Vec<char>>,
}

impl Default for NumberParser {
    fn default() -> Self {
        Self {
            locale: None,
            decimal: '.',
            group: ',',
            numerals: None,
        }
    }
}

impl NumberParser {
    pub fn new(options: &NumberFormatOptions) -> Result<Self, TabulaDatasetError> {
        let base = match &options.locale {
            Some(locale) => *LOCALE_SYMBOLS
                .get(locale.to_lowercase().as_str())
                .ok_or_else(|| TabulaDatasetError::UnknownLocale(locale.clone()))?,
            None => LocaleNumberSymbols::new('.', ','),
        };

        let decimal = options.decimal.unwrap_or(base.decimal);
        // A decimal override taking the base group symbol swaps the pair
        let group = match options.group {
            Some(group) => group,
            None if decimal == base.group => base.decimal,
            None => base.group,
        };
        if decimal == group {
            return Err(TabulaDatasetError::AmbiguousSeparators(decimal));
        }

        let numerals = match &options.numerals {
            Some(numerals) if numerals.len() != 10 => {
                return Err(TabulaDatasetError::InvalidNumerals(numerals.len()))
            }
            Some(numerals) => Some(numerals.clone()),
            None => base.numerals.map(|n| n.to_vec()),
        };

        Ok(Self {
            locale: options.locale.clone(),
            decimal,
            group,
            numerals,
        })
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn decimal(&self) -> char {
        self.decimal
    }

    pub fn group(&self) -> char {
        self.group
    }

    pub fn numerals(&self) -> Option<&[char]> {
        self.numerals.as_deref()
    }

    /// The resolved options, suitable for attaching to an inferred data type
    pub fn number_format(&self) -> NumberFormatOptions {
        NumberFormatOptions {
            locale: self.locale.clone(),
            decimal: Some(self.decimal),
            group: Some(self.group),
            numerals: self.numerals.clone(),
        }
    }

    /// Parse a value, returning `NaN` when it is not a number in this format
    pub fn parse(&self, value: &Value) -> f64 {
        match value {
            Value::Number(n) => *n,
            Value::String(s) => self.parse_str(s),
            _ => f64::NAN,
        }
    }

    pub fn parse_str(&self, input: &str) -> f64 {
        let mut normalized = String::with_capacity(input.len());
        let mut has_digit = false;
        for c in input.trim().chars() {
            if c == self.group || (is_space_like(self.group) && is_space_like(c)) {
                continue;
            }
            if c == self.decimal {
                normalized.push('.');
                continue;
            }
            let c = self.map_numeral(c);
            has_digit |= c.is_ascii_digit();
            normalized.push(c);
        }
        if !has_digit {
            return f64::NAN;
        }
        normalized.parse::<f64>().unwrap_or(f64::NAN)
    }

    fn map_numeral(&self, c: char) -> char {
        match &self.numerals {
            Some(numerals) => numerals
                .iter()
                .position(|n| *n == c)
                .and_then(|i| char::from_digit(i as u32, 10))
                .unwrap_or(c),
            None => c,
        }
    }
}

fn is_space_like(c: char) -> bool {
    c == ' ' || c == '\u{a0}' || c == '\u{202f}'
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(None, None, None, "1,234.5", 1234.5)]
    #[case(Some("it-IT"), None, None, "1.234,5", 1234.5)]
    #[case(Some("de-DE"), None, None, "-12,25", -12.25)]
    #[case(Some("fr-FR"), None, None, "1 234,5", 1234.5)]
    #[case(None, Some(','), Some('.'), "9.999.999,01", 9999999.01)]
    #[case(None, Some(','), None, "1.234,5", 1234.5)]
    #[case(Some("it-IT"), Some('.'), None, "1,234.5", 1234.5)]
    #[case(Some("ar-EG"), None, None, "١٢٣٫٥", 123.5)]
    fn test_parse_localized(
        #[case] locale: Option<&str>,
        #[case] decimal: Option<char>,
        #[case] group: Option<char>,
        #[case] input: &str,
        #[case] expected: f64,
    ) {
        let parser = NumberParser::new(&NumberFormatOptions {
            locale: locale.map(str::to_string),
            decimal,
            group,
            numerals: None,
        })
        .unwrap();
        assert_approx_eq!(f64, parser.parse(&Value::from(input)), expected);
    }

    #[test]
    fn test_rejects_non_numbers() {
        let parser = NumberParser::default();
        assert!(parser.parse(&Value::from("")).is_nan());
        assert!(parser.parse(&Value::from("inf")).is_nan());
        assert!(parser.parse(&Value::from("12 apples")).is_nan());
        assert!(parser.parse(&Value::Bool(true)).is_nan());
        assert_eq!(parser.parse(&Value::Number(3.0)), 3.0);
    }

    #[test]
    fn test_custom_numerals() {
        let parser = NumberParser::new(&NumberFormatOptions {
            numerals: Some(DEVANAGARI.to_vec()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(parser.parse_str("४२"), 42.0);
    }

    #[test]
    fn test_invalid_options() {
        let bad_numerals = NumberParser::new(&NumberFormatOptions {
            numerals: Some(vec!['a', 'b']),
            ..Default::default()
        });
        assert_eq!(bad_numerals, Err(TabulaDatasetError::InvalidNumerals(2)));

        let same = NumberParser::new(&NumberFormatOptions {
            decimal: Some(','),
            group: Some(','),
            ..Default::default()
        });
        assert_eq!(same, Err(TabulaDatasetError::AmbiguousSeparators(',')));

        let unknown = NumberParser::new(&NumberFormatOptions {
            locale: Some("xx-XX".to_string()),
            ..Default::default()
        });
        assert!(matches!(unknown, Err(TabulaDatasetError::UnknownLocale(_))));
    }
}
