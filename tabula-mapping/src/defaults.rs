//! Default aggregations of aggregable dimensions.
use crate::aggregators::Aggregation;
use crate::dimension::{AggregationDefault, Dimension, Mapping};
use crate::error::TabulaMappingError;
use tabula_common::{DataType, DataTypes, TypeName};

/// Aggregator name used for a column type when a dimension gives no default
pub fn builtin_default_aggregation(kind: TypeName) -> &'static str {
    match kind {
        TypeName::Number => "sum",
        TypeName::String | TypeName::Date => "csvDistinct",
        TypeName::Boolean => "count",
    }
}

/// Default aggregator name of an aggregable dimension for a column type
pub fn default_dimension_aggregation(
    dimension: &Dimension,
    data_type: &DataType,
) -> Result<String, TabulaMappingError> {
    if !dimension.aggregation {
        return Err(TabulaMappingError::InvalidConfig(format!(
            "dimension {} does not support aggregation",
            dimension.id
        )));
    }
    let kind = data_type.kind();
    let name = match &dimension.aggregation_default {
        Some(AggregationDefault::Name(name)) => name.clone(),
        Some(AggregationDefault::ByType(by_type)) => by_type
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| builtin_default_aggregation(kind).to_string()),
        None => builtin_default_aggregation(kind).to_string(),
    };
    Ok(name)
}

/// Aggregation of a mapped dimension.
///
/// `config.aggregation` wins when present, either for every column or, when
/// it is a list, per column; remaining columns use the dimension default for
/// their type. Several columns yield an [`Aggregation::Many`].
pub fn dimension_aggregator(
    dimension_id: &str,
    mapping: &Mapping,
    data_types: &DataTypes,
    dimensions: &[Dimension],
) -> Result<Aggregation, TabulaMappingError> {
    let dimension = dimensions
        .iter()
        .find(|d| d.id == dimension_id)
        .ok_or_else(|| {
            TabulaMappingError::InvalidConfig(format!("unknown dimension {dimension_id}"))
        })?;
    let mapped = mapping
        .get(dimension_id)
        .filter(|m| m.is_mapped())
        .ok_or_else(|| {
            TabulaMappingError::InvalidConfig(format!("dimension {dimension_id} is not mapped"))
        })?;

    let mut per_column = mapped
        .value
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let explicit = match &mapped.config.aggregation {
                Some(Aggregation::Many(items)) => items.get(i).cloned(),
                other => other.clone(),
            };
            match explicit {
                Some(aggregation) => Ok(aggregation),
                None => {
                    let data_type = data_types.get(column).ok_or_else(|| {
                        TabulaMappingError::InvalidConfig(format!(
                            "column {column} has no known type"
                        ))
                    })?;
                    default_dimension_aggregation(dimension, data_type).map(Aggregation::Name)
                }
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(if per_column.len() == 1 {
        per_column.remove(0)
    } else {
        Aggregation::Many(per_column)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::MappedDimension;
    use indexmap::IndexMap;
    use rstest::rstest;

    fn types() -> DataTypes {
        let mut types = DataTypes::new();
        types.insert("Fare".to_string(), DataType::number());
        types.insert("Port".to_string(), DataType::string());
        types.insert("Boarded".to_string(), DataType::date());
        types.insert("Survived".to_string(), DataType::boolean());
        types
    }

    #[rstest]
    #[case(DataType::number(), "sum")]
    #[case(DataType::string(), "csvDistinct")]
    #[case(DataType::date(), "csvDistinct")]
    #[case(DataType::boolean(), "count")]
    fn test_builtin_defaults(#[case] data_type: DataType, #[case] expected: &str) {
        let dimension = Dimension::get("size").aggregable();
        assert_eq!(
            default_dimension_aggregation(&dimension, &data_type).unwrap(),
            expected
        );
    }

    #[test]
    fn test_declared_defaults() {
        let named = Dimension::get("size")
            .with_aggregation_default(AggregationDefault::Name("mean".to_string()));
        assert_eq!(
            default_dimension_aggregation(&named, &DataType::string()).unwrap(),
            "mean"
        );

        let mut by_type = IndexMap::new();
        by_type.insert(TypeName::Number, "max".to_string());
        let typed =
            Dimension::get("size").with_aggregation_default(AggregationDefault::ByType(by_type));
        assert_eq!(
            default_dimension_aggregation(&typed, &DataType::number()).unwrap(),
            "max"
        );
        assert_eq!(
            default_dimension_aggregation(&typed, &DataType::boolean()).unwrap(),
            "count"
        );
    }

    #[test]
    fn test_not_aggregable() {
        let plain = Dimension::get("x");
        assert!(matches!(
            default_dimension_aggregation(&plain, &DataType::number()),
            Err(TabulaMappingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_dimension_aggregator() {
        let dimensions = vec![Dimension::get("size").aggregable().multiple()];
        let mut mapping = Mapping::new();

        mapping.insert("size".to_string(), MappedDimension::column("Fare"));
        assert_eq!(
            dimension_aggregator("size", &mapping, &types(), &dimensions).unwrap(),
            Aggregation::from("sum")
        );

        mapping.insert(
            "size".to_string(),
            MappedDimension::columns(["Fare", "Port", "Survived"])
                .with_aggregation(Aggregation::many(["mean"])),
        );
        assert_eq!(
            dimension_aggregator("size", &mapping, &types(), &dimensions).unwrap(),
            Aggregation::many(["mean", "csvDistinct", "count"])
        );

        mapping.insert(
            "size".to_string(),
            MappedDimension::columns(["Fare", "Boarded"]).with_aggregation("max"),
        );
        assert_eq!(
            dimension_aggregator("size", &mapping, &types(), &dimensions).unwrap(),
            Aggregation::many(["max", "max"])
        );

        assert!(dimension_aggregator("color", &mapping, &types(), &dimensions).is_err());
    }
}
