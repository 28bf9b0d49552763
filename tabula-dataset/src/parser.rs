use crate::dates::{parse_canonical_date, DateParser};
use crate::error::{CoercionError, TabulaDatasetError};
use crate::inference::infer_types;
use crate::number::NumberParser;
use crate::options::ParsingOptions;
use chrono::DateTime;
use indexmap::IndexMap;
use serde::Serialize;
use tabula_common::path::get_path;
use tabula_common::{DataType, DataTypes, Decoder, Row, TypeName, Value};

/// Coercion failures of one row, keyed by column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    /// Index of the row in the input, before empty rows are dropped
    pub row: usize,
    #[serde(serialize_with = "serialize_errors")]
    pub errors: IndexMap<String, CoercionError>,
}

fn serialize_errors<S: serde::Serializer>(
    errors: &IndexMap<String, CoercionError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(errors.iter().map(|(k, v)| (k, v.to_string())))
}

/// Outcome of parsing a dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    pub dataset: Vec<Row>,
    #[serde(rename = "dataTypes")]
    pub data_types: DataTypes,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Clone)]
enum Formatter {
    Decode(Decoder),
    Date(DateParser),
    Number(NumberParser),
}

impl Formatter {
    fn apply(&self, value: &Value) -> Value {
        match self {
            Formatter::Decode(decoder) => decoder.decode(value),
            Formatter::Date(parser) => parser.parse(value),
            Formatter::Number(parser) => {
                if value.is_empty() {
                    Value::Null
                } else {
                    Value::Number(parser.parse(value))
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
struct ColumnParser {
    column: String,
    kind: TypeName,
    formatter: Option<Formatter>,
}

impl ColumnParser {
    fn new(
        column: &str,
        data_type: &DataType,
        options: &ParsingOptions,
    ) -> Result<Self, TabulaDatasetError> {
        let formatter = if let Some(decoder) = data_type.decoder() {
            Some(Formatter::Decode(decoder.clone()))
        } else {
            match data_type.kind() {
                TypeName::Date => data_type.date_format().map(|format| {
                    Formatter::Date(match options.effective_date_locale() {
                        Some(locale) => DateParser::with_locale(format, locale),
                        None => DateParser::new(format),
                    })
                }),
                TypeName::Number => {
                    let own = data_type.number_format();
                    let number_format = if own.is_configured() {
                        own.clone()
                    } else {
                        options.number_format()
                    };
                    if number_format.is_configured() {
                        Some(Formatter::Number(NumberParser::new(&number_format)?))
                    } else {
                        None
                    }
                }
                _ => None,
            }
        };

        Ok(Self {
            column: column.to_string(),
            kind: data_type.kind(),
            formatter,
        })
    }

    fn coerce(&self, row: &Row) -> Result<Value, CoercionError> {
        let raw = get_path(row, &self.column).unwrap_or(&Value::Null);
        let value = match &self.formatter {
            Some(formatter) => formatter.apply(raw),
            None => cast(raw, self.kind),
        };
        check_type(value, self.kind)
    }
}

/// Loose cast used when a column has no formatter
fn cast(value: &Value, kind: TypeName) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match kind {
        TypeName::String => match value {
            Value::String(_) => value.clone(),
            other => Value::String(other.to_string()),
        },
        _ if value.is_empty() => Value::Null,
        TypeName::Number => match value {
            Value::Number(_) => value.clone(),
            Value::Array(_) | Value::Object(_) => value.clone(),
            other => Value::Number(other.to_number().unwrap_or(f64::NAN)),
        },
        TypeName::Boolean => match value {
            Value::Bool(_) => value.clone(),
            Value::Number(n) => Value::Bool(*n != 0.0 && !n.is_nan()),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => value.clone(),
            },
            _ => value.clone(),
        },
        TypeName::Date => match value {
            Value::String(s) => parse_canonical_date(s)
                .map(Value::Date)
                .unwrap_or_else(|| value.clone()),
            Value::Number(n) if n.is_finite() => DateTime::from_timestamp_millis(*n as i64)
                .map(Value::Date)
                .unwrap_or_else(|| value.clone()),
            _ => value.clone(),
        },
    }
}

fn check_type(value: Value, kind: TypeName) -> Result<Value, CoercionError> {
    let valid = match (&value, kind) {
        (Value::Null, _) => true,
        (Value::Number(n), TypeName::Number) => !n.is_nan(),
        (_, TypeName::Number) => false,
        (Value::Date(_), TypeName::Date) => true,
        (_, TypeName::Date) => false,
        (Value::Bool(_), TypeName::Boolean) => true,
        (_, TypeName::Boolean) => false,
        (_, TypeName::String) => true,
    };
    if valid {
        Ok(value)
    } else {
        Err(CoercionError::InvalidType {
            expected: kind,
            value: value.to_string(),
        })
    }
}

/// Coerces raw rows to a fixed set of typed columns
#[derive(Debug, Clone)]
pub struct RowParser {
    columns: Vec<ColumnParser>,
}

impl RowParser {
    /// Parse a single row.
    ///
    /// Cells that fail coercion hold `Null` in the output and are reported
    /// in the returned error map.
    pub fn parse_row(&self, row: &Row) -> (Row, IndexMap<String, CoercionError>) {
        let mut out = Row::with_capacity(self.columns.len());
        let mut errors = IndexMap::new();
        for column in &self.columns {
            match column.coerce(row) {
                Ok(value) => {
                    out.insert(column.column.clone(), value);
                }
                Err(err) => {
                    out.insert(column.column.clone(), Value::Null);
                    errors.insert(column.column.clone(), err);
                }
            }
        }
        (out, errors)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.column.as_str())
    }
}

/// Build a row parser for the given column types
pub fn build_row_parser(
    types: &DataTypes,
    options: &ParsingOptions,
) -> Result<RowParser, TabulaDatasetError> {
    let columns = types
        .iter()
        .map(|(column, data_type)| ColumnParser::new(column, data_type, options))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RowParser { columns })
}

/// Parse a dataset, inferring column types first when none are given.
///
/// Rows whose every column ends up empty are dropped, unless one of their
/// cells failed coercion.
#[tracing::instrument(skip_all, fields(rows = rows.len()))]
pub fn parse_dataset(
    rows: &[Row],
    types: Option<&DataTypes>,
    options: &ParsingOptions,
) -> Result<ParseResult, TabulaDatasetError> {
    let data_types = match types {
        Some(types) => types.clone(),
        None => infer_types(rows, options)?,
    };
    let parser = build_row_parser(&data_types, options)?;

    let mut dataset = Vec::with_capacity(rows.len());
    let mut errors = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        let (parsed, row_errors) = parser.parse_row(row);
        if row_errors.is_empty() {
            if parsed.values().all(Value::is_empty) {
                continue;
            }
        } else {
            errors.push(RowError {
                row: index,
                errors: row_errors,
            });
        }
        dataset.push(parsed);
    }

    if !errors.is_empty() {
        tracing::warn!(rows_with_errors = errors.len(), "dataset parsed with coercion errors");
    }

    Ok(ParseResult {
        dataset,
        data_types,
        errors,
    })
}
