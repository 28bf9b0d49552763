use crate::aggregators::Aggregation;
use crate::error::TabulaMappingError;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, Display, EnumString, VariantNames};
use tabula_common::path::{get_path, set_path};
use tabula_common::{TypeName, Value};

/// What a dimension does with the columns mapped to it
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    VariantNames,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Get,
    Group,
    Groups,
    GroupBy,
    Rollup,
    Rollups,
    GroupAggregate,
    Proxy,
    RollupLeaf,
}

impl Operation {
    /// Whether the operation partitions rows, at most one may be active
    pub fn is_grouper(&self) -> bool {
        matches!(
            self,
            Operation::GroupBy
                | Operation::Group
                | Operation::Groups
                | Operation::Rollup
                | Operation::Rollups
        )
    }

    pub fn is_rollup(&self) -> bool {
        matches!(self, Operation::Rollup | Operation::Rollups)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<OneOrMany<T>>::deserialize(deserializer)?
        .map(Vec::from)
        .unwrap_or_default())
}

fn optional_one_or_many<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<OneOrMany<T>>::deserialize(deserializer)?.map(Vec::from))
}

/// Default aggregation of an aggregable dimension, either one name for every
/// column type or a table by type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregationDefault {
    Name(String),
    ByType(IndexMap<TypeName, String>),
}

/// Proxy targets: target dimension id, then target path to source path
pub type ProxyTargets = IndexMap<String, IndexMap<String, String>>;

/// A slot of a chart schema that receives one or more dataset columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimension {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_values: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_values: Option<usize>,
    #[serde(
        default,
        deserialize_with = "optional_one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub valid_types: Option<Vec<TypeName>>,
    pub operation: Operation,
    #[serde(default)]
    pub aggregation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation_default: Option<AggregationDefault>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<ProxyTargets>,
}

impl Dimension {
    pub fn new(id: impl Into<String>, operation: Operation) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            required: false,
            multiple: false,
            min_values: None,
            max_values: None,
            valid_types: None,
            operation,
            aggregation: false,
            aggregation_default: None,
            targets: None,
        }
    }

    pub fn get(id: impl Into<String>) -> Self {
        Self::new(id, Operation::Get)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn with_min_values(mut self, min_values: usize) -> Self {
        self.min_values = Some(min_values);
        self
    }

    pub fn with_max_values(mut self, max_values: usize) -> Self {
        self.max_values = Some(max_values);
        self
    }

    pub fn with_valid_types(mut self, valid_types: impl IntoIterator<Item = TypeName>) -> Self {
        self.valid_types = Some(valid_types.into_iter().collect());
        self
    }

    pub fn aggregable(mut self) -> Self {
        self.aggregation = true;
        self
    }

    pub fn with_aggregation_default(mut self, default: AggregationDefault) -> Self {
        self.aggregation = true;
        self.aggregation_default = Some(default);
        self
    }

    /// Copy `source_path` of this proxy's mapping into `target_path` of
    /// dimension `target` before validation
    pub fn with_target(
        mut self,
        target: impl Into<String>,
        target_path: impl Into<String>,
        source_path: impl Into<String>,
    ) -> Self {
        self.targets
            .get_or_insert_with(IndexMap::new)
            .entry(target.into())
            .or_default()
            .insert(target_path.into(), source_path.into());
        self
    }
}

/// Per-dimension configuration of a mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
    /// `[aggregatorName, targetColumn]`, checked when the mapping is compiled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_aggregation: Option<Value>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl DimensionConfig {
    pub fn is_empty(&self) -> bool {
        self.aggregation.is_none() && self.leaf_aggregation.is_none() && self.extra.is_empty()
    }
}

/// Columns assigned to one dimension, plus its configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappedDimension {
    #[serde(default, deserialize_with = "one_or_many")]
    pub value: Vec<String>,
    #[serde(default, skip_serializing_if = "DimensionConfig::is_empty")]
    pub config: DimensionConfig,
}

impl MappedDimension {
    pub fn column(column: impl Into<String>) -> Self {
        Self {
            value: vec![column.into()],
            config: DimensionConfig::default(),
        }
    }

    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            value: columns.into_iter().map(Into::into).collect(),
            config: DimensionConfig::default(),
        }
    }

    pub fn with_aggregation(mut self, aggregation: impl Into<Aggregation>) -> Self {
        self.config.aggregation = Some(aggregation.into());
        self
    }

    pub fn with_leaf_aggregation(
        mut self,
        aggregation: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.config.leaf_aggregation = Some(Value::Array(vec![
            Value::String(aggregation.into()),
            Value::String(target.into()),
        ]));
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.extra.insert(key.into(), value.into());
        self
    }

    /// Whether at least one column is mapped
    pub fn is_mapped(&self) -> bool {
        !self.value.is_empty()
    }

    /// Read a dotted path such as `value`, `config.aggregation` or
    /// `config.someOption`
    pub fn get_path(&self, path: &str) -> Option<Value> {
        match path.split_once('.') {
            None if path == "value" => Some(Value::Array(
                self.value.iter().map(|c| Value::from(c.as_str())).collect(),
            )),
            None if path == "config" => serde_json::to_value(&self.config)
                .ok()
                .map(Value::from),
            Some(("config", "aggregation")) => {
                self.config.aggregation.as_ref().and_then(Aggregation::to_value)
            }
            Some(("config", "leafAggregation")) => self.config.leaf_aggregation.clone(),
            Some(("config", rest)) => get_path(&self.config.extra, rest).cloned(),
            _ => None,
        }
    }

    /// Write a dotted path, the counterpart of [`MappedDimension::get_path`]
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<(), TabulaMappingError> {
        match path.split_once('.') {
            None if path == "value" => {
                self.value = match &value {
                    Value::Null => Vec::new(),
                    Value::String(column) => vec![column.clone()],
                    Value::Array(items) => items
                        .iter()
                        .map(|item| match item {
                            Value::String(column) => Ok(column.clone()),
                            other => Err(invalid_value(path, other)),
                        })
                        .collect::<Result<_, _>>()?,
                    other => return Err(invalid_value(path, other)),
                };
            }
            None if path == "config" => {
                self.config = match value {
                    Value::Null => DimensionConfig::default(),
                    other => serde_json::from_value(other.to_json())
                        .map_err(|e| TabulaMappingError::InvalidConfig(e.to_string()))?,
                };
            }
            Some(("config", "aggregation")) => {
                self.config.aggregation = match &value {
                    Value::Null => None,
                    other => Some(Aggregation::try_from(other)?),
                };
            }
            Some(("config", "leafAggregation")) => {
                self.config.leaf_aggregation = Some(value).filter(|v| !v.is_null());
            }
            Some(("config", rest)) => set_path(&mut self.config.extra, rest, value),
            _ => {
                return Err(TabulaMappingError::InvalidConfig(format!(
                    "cannot assign mapping path '{path}'"
                )))
            }
        }
        Ok(())
    }
}

fn invalid_value(path: &str, value: &Value) -> TabulaMappingError {
    TabulaMappingError::InvalidConfig(format!(
        "mapping path '{path}' expects column names, got {}",
        value.kind()
    ))
}

/// Dimension id to its mapped columns and configuration
pub type Mapping = IndexMap<String, MappedDimension>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use std::str::FromStr;

    #[rstest]
    #[case("get", Operation::Get)]
    #[case("groupBy", Operation::GroupBy)]
    #[case("groupAggregate", Operation::GroupAggregate)]
    #[case("rollupLeaf", Operation::RollupLeaf)]
    fn test_operation_names(#[case] name: &str, #[case] expected: Operation) {
        assert_eq!(Operation::from_str(name).unwrap(), expected);
        assert_eq!(expected.to_string(), name);
        let parsed: Operation = serde_json::from_value(json!(name)).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_dimension_from_json() {
        let dimension: Dimension = serde_json::from_value(json!({
            "id": "size",
            "name": "Size",
            "validTypes": "number",
            "required": true,
            "operation": "get",
            "aggregation": true,
            "aggregationDefault": {"number": "mean", "string": "count"}
        }))
        .unwrap();
        assert_eq!(dimension.valid_types, Some(vec![TypeName::Number]));
        assert!(dimension.required);
        assert!(!dimension.multiple);
        let mut defaults = IndexMap::new();
        defaults.insert(TypeName::Number, "mean".to_string());
        defaults.insert(TypeName::String, "count".to_string());
        assert_eq!(
            dimension.aggregation_default,
            Some(AggregationDefault::ByType(defaults))
        );
    }

    #[rstest]
    #[case(json!({"id": "x", "operation": "pivot"}))]
    #[case(json!({"id": "x", "operation": "get", "validTypes": ["number", "integer"]}))]
    fn test_unknown_names_are_rejected(#[case] data: serde_json::Value) {
        assert!(serde_json::from_value::<Dimension>(data).is_err());
    }

    #[test]
    fn test_mapping_from_json() {
        let mapping: Mapping = serde_json::from_value(json!({
            "x": {"value": "Age"},
            "groups": {"value": ["Gender", "Destination"], "config": {"aggregation": ["sum", "count"]}},
            "bars": {"value": "Age", "config": {"leafAggregation": ["sum", "Fare"], "sortBy": "name"}}
        }))
        .unwrap();
        assert_eq!(mapping["x"], MappedDimension::column("Age"));
        assert_eq!(
            mapping["groups"].config.aggregation,
            Some(Aggregation::many(["sum", "count"]))
        );
        assert_eq!(
            mapping["bars"],
            MappedDimension::column("Age")
                .with_leaf_aggregation("sum", "Fare")
                .with_config("sortBy", "name")
        );
    }

    #[test]
    fn test_mapping_paths() {
        let mut mapped = MappedDimension::columns(["a", "b"]).with_aggregation("sum");
        assert_eq!(
            mapped.get_path("value"),
            Some(Value::Array(vec![Value::from("a"), Value::from("b")]))
        );
        assert_eq!(mapped.get_path("config.aggregation"), Some(Value::from("sum")));

        mapped.set_path("config.sort.order", Value::from("desc")).unwrap();
        assert_eq!(mapped.get_path("config.sort.order"), Some(Value::from("desc")));

        mapped.set_path("value", Value::from("c")).unwrap();
        assert_eq!(mapped.value, vec!["c".to_string()]);

        assert!(mapped.set_path("value", Value::from(3)).is_err());
        assert!(mapped.set_path("label", Value::from("x")).is_err());
    }
}
