use tabula_common::TypeName;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TabulaDatasetError {
    #[error("Numerals must list exactly 10 digits, got {0}")]
    InvalidNumerals(usize),

    #[error("Decimal and group separators must differ, both are '{0}'")]
    AmbiguousSeparators(char),

    #[error("Unknown locale: `{0}`")]
    UnknownLocale(String),
}

/// Failure to coerce a single cell to its declared type.
///
/// These are collected per row in `ParseResult::errors` and never abort parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoercionError {
    #[error("invalid type {expected} for value {value}")]
    InvalidType { expected: TypeName, value: String },
}
