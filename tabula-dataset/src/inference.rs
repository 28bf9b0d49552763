//! Column type inference by majority vote.
//!
//! Every cell votes for the type it looks like; each column takes the type
//! with the most votes, ties going to the candidate seen first while scanning
//! rows top to bottom and columns left to right.
use crate::dates::canonical_date_pattern;
use crate::error::TabulaDatasetError;
use crate::number::NumberParser;
use crate::options::ParsingOptions;
use indexmap::IndexMap;
use tabula_common::{DataType, DataTypes, Row, TypeName, Value};

/// Classifies single values according to a set of parsing options
#[derive(Debug, Clone, Default)]
pub struct TypeInferrer {
    strict: bool,
    number_parser: Option<NumberParser>,
}

impl TypeInferrer {
    pub fn new(options: &ParsingOptions) -> Result<Self, TabulaDatasetError> {
        let number_format = options.number_format();
        let number_parser = if number_format.is_configured() {
            Some(NumberParser::new(&number_format)?)
        } else {
            None
        };
        Ok(Self {
            strict: options.strict,
            number_parser,
        })
    }

    /// Guess the type of a single value
    pub fn infer_value(&self, value: &Value) -> DataType {
        let loose = match value {
            Value::String(s) if !self.strict => serde_json::from_str::<serde_json::Value>(s)
                .map(Value::from)
                .unwrap_or_else(|_| value.clone()),
            _ => value.clone(),
        };

        if let Some(parser) = &self.number_parser {
            if !parser.parse(&loose).is_nan() {
                return DataType::number().with_number_format(parser.number_format());
            }
        }

        match (&loose, value) {
            (Value::Number(_), _) => DataType::number(),
            (Value::Bool(_), _) => DataType::boolean(),
            (_, Value::Date(_)) => DataType::date(),
            (_, Value::String(s)) => match canonical_date_pattern(s) {
                Some(pattern) => DataType::date_with_format(pattern),
                None => DataType::string(),
            },
            _ => DataType::string(),
        }
    }

    /// Infer one type per column by majority vote.
    ///
    /// Votes are counted per type kind; the winning kind keeps the metadata
    /// (date pattern, number format) of its first vote.
    #[tracing::instrument(skip_all)]
    pub fn infer(&self, rows: &[Row]) -> DataTypes {
        let mut votes: IndexMap<&str, IndexMap<TypeName, (DataType, usize)>> = IndexMap::new();
        for row in rows {
            for (column, value) in row {
                let data_type = self.infer_value(value);
                votes
                    .entry(column.as_str())
                    .or_default()
                    .entry(data_type.kind())
                    .or_insert((data_type, 0))
                    .1 += 1;
            }
        }

        votes
            .into_iter()
            .filter_map(|(column, counts)| {
                let mut winner: Option<(DataType, usize)> = None;
                for (candidate, count) in counts.into_values() {
                    if winner.as_ref().map_or(true, |(_, best)| count > *best) {
                        winner = Some((candidate, count));
                    }
                }
                let (data_type, count) = winner?;
                tracing::debug!(column, %data_type, votes = count, "inferred column type");
                Some((column.to_string(), data_type))
            })
            .collect()
    }
}

/// Guess the type of a single value
pub fn infer_value_type(
    value: &Value,
    options: &ParsingOptions,
) -> Result<DataType, TabulaDatasetError> {
    Ok(TypeInferrer::new(options)?.infer_value(value))
}

/// Infer column types for a set of rows
pub fn infer_types(rows: &[Row], options: &ParsingOptions) -> Result<DataTypes, TabulaDatasetError> {
    Ok(TypeInferrer::new(options)?.infer(rows))
}

/// Infer column types for a JSON document.
///
/// Anything but an array of objects yields an empty type map.
pub fn infer_types_from_json(
    data: &serde_json::Value,
    options: &ParsingOptions,
) -> Result<DataTypes, TabulaDatasetError> {
    match data {
        serde_json::Value::Array(_) => {
            infer_types(&tabula_common::value::rows_from_json(data.clone()), options)
        }
        _ => Ok(DataTypes::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use serde_json::json;
    use tabula_common::value::rows_from_json;
    use tabula_common::TypeName;

    fn infer(data: serde_json::Value) -> DataTypes {
        infer_types(&rows_from_json(data), &ParsingOptions::default()).unwrap()
    }

    #[rstest]
    #[case(json!("42"), TypeName::Number)]
    #[case(json!(42), TypeName::Number)]
    #[case(json!("true"), TypeName::Boolean)]
    #[case(json!("hello"), TypeName::String)]
    #[case(json!("2020-01-01"), TypeName::Date)]
    #[case(json!("2020-01-01T12:30:00"), TypeName::Date)]
    #[case(json!(""), TypeName::String)]
    #[case(json!(null), TypeName::String)]
    fn test_infer_value(#[case] value: serde_json::Value, #[case] expected: TypeName) {
        let data_type = infer_value_type(&Value::from(value), &ParsingOptions::default()).unwrap();
        assert_eq!(data_type.kind(), expected);
    }

    #[test]
    fn test_strict_mode_keeps_strings() {
        let strict = ParsingOptions::strict();
        let data_type = infer_value_type(&Value::from("42"), &strict).unwrap();
        assert_eq!(data_type, DataType::string());
        let data_type = infer_value_type(&Value::from(42), &strict).unwrap();
        assert_eq!(data_type, DataType::number());
    }

    #[test]
    fn test_date_patterns_are_recorded() {
        let options = ParsingOptions::default();
        let date = infer_value_type(&Value::from("2020-01-01"), &options).unwrap();
        assert_eq!(date.date_format(), Some("YYYY-MM-DD"));
        let datetime = infer_value_type(&Value::from("2020-01-01T01:02:03"), &options).unwrap();
        assert_eq!(datetime.date_format(), Some("YYYY-MM-DDTHH:mm:ss"));
        let instance = Value::Date(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(infer_value_type(&instance, &options).unwrap(), DataType::date());
    }

    #[test]
    fn test_majority_vote() {
        let types = infer(json!([{"x": "1"}, {"x": "2"}, {"x": "a"}]));
        assert_eq!(types["x"], DataType::number());
    }

    #[test]
    fn test_tie_goes_to_first_seen() {
        let types = infer(json!([{"x": "a"}, {"x": "1"}, {"x": "2"}, {"x": "b"}]));
        assert_eq!(types["x"], DataType::string());
        let types = infer(json!([{"x": "1"}, {"x": "a"}]));
        assert_eq!(types["x"], DataType::number());
    }

    #[test]
    fn test_date_votes_across_patterns() {
        let types = infer(json!([
            {"d": "2020-01-01"},
            {"d": "2020-01-02T10:00:00"},
            {"d": "x"},
            {"d": "y"},
        ]));
        assert_eq!(types["d"], DataType::date_with_format("YYYY-MM-DD"));
    }

    #[test]
    fn test_columns_in_first_seen_order() {
        let types = infer(json!([
            {"x": 1, "c": "M"},
            {"y": 2, "x": 3},
        ]));
        let columns: Vec<&str> = types.keys().map(String::as_str).collect();
        assert_eq!(columns, vec!["x", "c", "y"]);
    }

    #[test]
    fn test_deterministic() {
        let data = json!([
            {"a": "1", "b": "x", "c": "2020-01-01"},
            {"a": "q", "b": "true", "c": "2020-01-02"},
            {"a": "3", "b": "false", "c": "nope"},
        ]);
        assert_eq!(infer(data.clone()), infer(data));
    }

    #[test]
    fn test_locale_number_inference() {
        let options = ParsingOptions::default().with_decimal(',').with_group('.');
        let rows = rows_from_json(json!([{"n": "1.234,5"}, {"n": "7,25"}]));
        let types = infer_types(&rows, &options).unwrap();
        assert_eq!(types["n"].kind(), TypeName::Number);
        assert_eq!(types["n"].number_format().decimal, Some(','));
    }

    #[test]
    fn test_non_array_json_yields_empty_types() {
        let options = ParsingOptions::default();
        assert!(infer_types_from_json(&json!({"a": 1}), &options).unwrap().is_empty());
        let types = infer_types_from_json(&json!([{"a": 1}]), &options).unwrap();
        assert_eq!(types["a"], DataType::number());
    }
}
