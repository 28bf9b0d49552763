use serde::{Deserialize, Serialize};
use tabula_common::NumberFormatOptions;

/// Options controlling type inference and row parsing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsingOptions {
    /// When false, string cells are first read as JSON so that `"42"` and
    /// `"true"` count as a number and a boolean
    pub strict: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimal: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numerals: Option<Vec<char>>,
    /// Locale used for month names in date formats, defaults to `locale`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_locale: Option<String>,
}

impl ParsingOptions {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Default::default()
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_decimal(mut self, decimal: char) -> Self {
        self.decimal = Some(decimal);
        self
    }

    pub fn with_group(mut self, group: char) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_numerals(mut self, numerals: Vec<char>) -> Self {
        self.numerals = Some(numerals);
        self
    }

    pub fn with_date_locale(mut self, locale: impl Into<String>) -> Self {
        self.date_locale = Some(locale.into());
        self
    }

    pub fn number_format(&self) -> NumberFormatOptions {
        NumberFormatOptions {
            locale: self.locale.clone(),
            decimal: self.decimal,
            group: self.group,
            numerals: self.numerals.clone(),
        }
    }

    pub fn effective_date_locale(&self) -> Option<&str> {
        self.date_locale.as_deref().or(self.locale.as_deref())
    }
}
