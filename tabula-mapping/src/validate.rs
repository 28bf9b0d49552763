//! Structural checks on dimension schemas and the mappings made against them.
use crate::dimension::{Dimension, Mapping, Operation};
use crate::error::{TabulaMappingError, ValidationErrors};
use itertools::Itertools;
use std::collections::HashSet;
use tabula_common::DataTypes;

/// Check that a schema is usable by the compiler.
///
/// A schema either declares `get` dimensions or exactly one `rollup`/`rollups`
/// dimension, never both.
pub fn validate_schema(dimensions: &[Dimension]) -> Result<(), TabulaMappingError> {
    if dimensions.is_empty() {
        return Err(TabulaMappingError::Schema("empty dimensions".to_string()));
    }

    let mut seen = HashSet::new();
    if let Some(duplicate) = dimensions.iter().find(|d| !seen.insert(d.id.as_str())) {
        return Err(TabulaMappingError::Schema(format!(
            "duplicate dimension id '{}'",
            duplicate.id
        )));
    }

    let getters = dimensions
        .iter()
        .filter(|d| d.operation == Operation::Get)
        .count();
    let rollups: Vec<&Dimension> = dimensions
        .iter()
        .filter(|d| d.operation.is_rollup())
        .collect();

    if rollups.len() > 1 {
        return Err(TabulaMappingError::Schema(
            "only one operation among rollup,rollups is allowed".to_string(),
        ));
    }
    match (getters, rollups.first()) {
        (0, None) => Err(TabulaMappingError::Schema(
            "at least one get operation must be present in a dimension set, \
             or an operation among rollup,rollups must be specified"
                .to_string(),
        )),
        (n, Some(rollup)) if n > 0 => Err(TabulaMappingError::Schema(format!(
            "'{}' operation was specified, you cannot define other get operations",
            rollup.operation
        ))),
        _ => Ok(()),
    }
}

/// Check a mapping against its schema, reporting every violation at once.
///
/// Column types are only checked when `types` is given.
pub fn validate_mapping(
    dimensions: &[Dimension],
    mapping: &Mapping,
    types: Option<&DataTypes>,
) -> Result<(), TabulaMappingError> {
    let mut errors = ValidationErrors::new();

    let provided: Vec<&str> = mapping
        .iter()
        .filter(|(_, mapped)| mapped.is_mapped())
        .map(|(id, _)| id.as_str())
        .sorted()
        .collect();

    let missing: Vec<&str> = dimensions
        .iter()
        .filter(|d| d.required && !provided.contains(&d.id.as_str()))
        .map(|d| d.id.as_str())
        .sorted()
        .collect();
    if !missing.is_empty() {
        errors.push(format!(
            "Some required dimensions were not mapped. Missing ids are: {}",
            missing.join(", ")
        ));
    }

    for id in provided {
        let Some(dimension) = dimensions.iter().find(|d| d.id == id) else {
            tracing::debug!(dimension = id, "mapping refers to a dimension outside the schema");
            continue;
        };
        let columns = &mapping[id].value;

        if let (Some(valid_types), Some(types)) = (&dimension.valid_types, types) {
            let accepted = valid_types.iter().join(", ");
            for column in columns {
                match types.get(column) {
                    Some(data_type) if valid_types.contains(&data_type.kind()) => {}
                    Some(data_type) => errors.push(format!(
                        "Invalid type: column {column} of type {data_type} cannot be used on \
                         dimension with id {id}, accepting {accepted}"
                    )),
                    None => errors.push(format!(
                        "Invalid type: column {column} has no known type and cannot be used on \
                         dimension with id {id}, accepting {accepted}"
                    )),
                }
            }
        }

        if !dimension.multiple && columns.len() > 1 {
            errors.push(format!(
                "dimension {id} does not support multiple columns in mapping"
            ));
        }
        if let Some(min_values) = dimension.min_values {
            if columns.len() < min_values {
                errors.push(format!(
                    "dimension {id} requires at least {min_values} columns in mapping"
                ));
            }
        }
        if let Some(max_values) = dimension.max_values {
            if columns.len() > max_values {
                errors.push(format!(
                    "dimension {id} accepts at most {max_values} columns in mapping"
                ));
            }
        }
    }

    errors.into_result()
}
