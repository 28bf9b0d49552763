//! Compilation of a validated mapping into a row transform.
//!
//! A [`Mapper`] shapes every row into an item holding one entry per mapped
//! `get` dimension, then optionally partitions items by the single active
//! grouper (`groupBy`, `group`, `groups`, `rollup` or `rollups`). When a
//! `groupAggregate` dimension is mapped, rows sharing its columns' values are
//! first collapsed into one item whose getters are aggregated.
use crate::aggregators::{default_registry, Aggregation, Aggregator, AggregatorRegistry};
use crate::dimension::{Dimension, Mapping, MappedDimension, Operation};
use crate::error::TabulaMappingError;
use crate::grouping::{GroupNode, MappedData};
use crate::proxy::hydrate_proxies;
use crate::validate::{validate_mapping, validate_schema};
use indexmap::IndexMap;
use tabula_common::path::get_path;
use tabula_common::{DataTypes, Row, Value};

const LEAF_AGGREGATION_ERROR: &str =
    "Rollup aggregation should be an array with aggregation function and target column";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GrouperKind {
    GroupBy,
    Group,
    Groups,
    Rollup,
    Rollups,
}

impl GrouperKind {
    fn from_operation(operation: Operation) -> Option<Self> {
        match operation {
            Operation::GroupBy => Some(GrouperKind::GroupBy),
            Operation::Group => Some(GrouperKind::Group),
            Operation::Groups => Some(GrouperKind::Groups),
            Operation::Rollup => Some(GrouperKind::Rollup),
            Operation::Rollups => Some(GrouperKind::Rollups),
            Operation::Get
            | Operation::GroupAggregate
            | Operation::Proxy
            | Operation::RollupLeaf => None,
        }
    }

    fn is_rollup(&self) -> bool {
        matches!(self, GrouperKind::Rollup | GrouperKind::Rollups)
    }
}

#[derive(Debug, Clone)]
struct Getter {
    id: String,
    columns: Vec<String>,
    aggregation: Option<Aggregation>,
}

#[derive(Debug, Clone)]
struct Grouper {
    id: String,
    kind: GrouperKind,
    columns: Vec<String>,
}

#[derive(Debug, Clone)]
struct GroupAggregate {
    id: String,
    identifiers: Vec<String>,
}

/// Where rollup leaves come from and how they are reduced
#[derive(Debug, Clone)]
struct Leaf {
    columns: Vec<String>,
    aggregation: Option<Aggregation>,
}

/// A row shaped by the getters, with the values it is grouped by.
///
/// `leaves` holds one rollup leaf per source row, so an item aggregated from
/// a `groupAggregate` bucket still rolls up row by row.
struct ShapedItem {
    item: Row,
    keys: Vec<Value>,
    leaves: Vec<Value>,
}

fn pick(row: &Row, columns: &[String]) -> Value {
    match columns {
        [column] => get_path(row, column).cloned().unwrap_or_default(),
        _ => Value::Array(
            columns
                .iter()
                .map(|column| get_path(row, column).cloned().unwrap_or_default())
                .collect(),
        ),
    }
}

fn pick_keys(row: &Row, columns: &[String]) -> Vec<Value> {
    columns
        .iter()
        .map(|column| get_path(row, column).cloned().unwrap_or_default())
        .collect()
}

/// A single key stays scalar, several keys form an array
fn collapse(mut keys: Vec<Value>) -> Value {
    if keys.len() == 1 {
        keys.remove(0)
    } else {
        Value::Array(keys)
    }
}

fn mapped_dimension<'a>(
    mapping: &'a Mapping,
    dimension: &Dimension,
) -> Option<&'a MappedDimension> {
    mapping.get(&dimension.id).filter(|m| m.is_mapped())
}

fn parse_leaf_aggregation(config: &Value) -> Result<Leaf, TabulaMappingError> {
    let invalid = || TabulaMappingError::Compile(LEAF_AGGREGATION_ERROR.to_string());
    let Some([aggregation, target]) = config.as_array() else {
        return Err(invalid());
    };
    let aggregation = Aggregation::try_from(aggregation).map_err(|_| invalid())?;
    let columns = match target {
        Value::String(column) => vec![column.clone()],
        Value::Array(items) if !items.is_empty() => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
            .collect::<Result<_, _>>()?,
        _ => return Err(invalid()),
    };
    Ok(Leaf {
        columns,
        aggregation: Some(aggregation),
    })
}

/// Compiles mappings against the aggregators of one registry
#[derive(Debug, Clone)]
pub struct MappingCompiler {
    registry: AggregatorRegistry,
}

impl Default for MappingCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingCompiler {
    /// Compiler backed by the process-wide registry
    pub fn new() -> Self {
        Self::with_registry(default_registry())
    }

    pub fn with_registry(registry: AggregatorRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AggregatorRegistry {
        &self.registry
    }

    /// Validate `mapping` against `dimensions` and build its transform.
    ///
    /// Schema and mapping errors are reported here; unknown aggregator names
    /// are only reported when the returned mapper runs.
    #[tracing::instrument(skip_all)]
    pub fn compile(
        &self,
        dimensions: &[Dimension],
        mapping: &Mapping,
        types: Option<&DataTypes>,
    ) -> Result<Mapper, TabulaMappingError> {
        validate_schema(dimensions)?;
        let mapping = hydrate_proxies(dimensions, mapping)?;
        validate_mapping(dimensions, &mapping, types)?;

        let mapping = &mapping;
        let mapped = |dimension: &Dimension| mapped_dimension(mapping, dimension);
        let first_mapped = |operation: Operation| {
            dimensions
                .iter()
                .filter(|d| d.operation == operation)
                .find_map(|d| mapped_dimension(mapping, d).map(|m| (d, m)))
        };

        let getters: Vec<Getter> = dimensions
            .iter()
            .filter(|d| d.operation == Operation::Get)
            .filter_map(|d| {
                mapped(d).map(|m| Getter {
                    id: d.id.clone(),
                    columns: m.value.clone(),
                    aggregation: m.config.aggregation.clone(),
                })
            })
            .collect();

        let group_aggregate =
            first_mapped(Operation::GroupAggregate).map(|(d, m)| GroupAggregate {
                id: d.id.clone(),
                identifiers: m.value.clone(),
            });

        let mut groupers = dimensions.iter().filter_map(|d| {
            let kind = GrouperKind::from_operation(d.operation)?;
            mapped(d).map(|m| (kind, d, m))
        });
        let active = groupers.next();
        if groupers.next().is_some() {
            return Err(TabulaMappingError::Compile(
                "only one of these operations is allowed in a mapper definition: \
                 'group', 'groups', 'groupBy', 'rollup', 'rollups'"
                    .to_string(),
            ));
        }

        let leaf = match active {
            Some((kind, _, grouper_mapping)) if kind.is_rollup() => {
                match first_mapped(Operation::RollupLeaf) {
                    Some((_, leaf_mapping)) => Some(Leaf {
                        columns: leaf_mapping.value.clone(),
                        aggregation: leaf_mapping.config.aggregation.clone(),
                    }),
                    None => grouper_mapping
                        .config
                        .leaf_aggregation
                        .as_ref()
                        .map(parse_leaf_aggregation)
                        .transpose()?,
                }
            }
            _ => None,
        };

        let grouper = active.map(|(kind, d, m)| Grouper {
            id: d.id.clone(),
            kind,
            columns: m.value.clone(),
        });

        tracing::debug!(
            getters = getters.len(),
            group_aggregate = ?group_aggregate.as_ref().map(|g| &g.id),
            grouper = ?grouper.as_ref().map(|g| (&g.id, g.kind)),
            "compiled mapping"
        );

        Ok(Mapper {
            registry: self.registry.clone(),
            getters,
            group_aggregate,
            grouper,
            leaf,
        })
    }
}

/// Compile a mapping against the process-wide aggregator registry
pub fn compile(
    dimensions: &[Dimension],
    mapping: &Mapping,
    types: Option<&DataTypes>,
) -> Result<Mapper, TabulaMappingError> {
    MappingCompiler::new().compile(dimensions, mapping, types)
}

/// A compiled mapping, ready to run over datasets
#[derive(Debug, Clone)]
pub struct Mapper {
    registry: AggregatorRegistry,
    getters: Vec<Getter>,
    group_aggregate: Option<GroupAggregate>,
    grouper: Option<Grouper>,
    leaf: Option<Leaf>,
}

impl Mapper {
    /// Id and operation of the active grouper, if any
    pub fn grouper(&self) -> Option<(&str, Operation)> {
        self.grouper.as_ref().map(|g| {
            let operation = match g.kind {
                GrouperKind::GroupBy => Operation::GroupBy,
                GrouperKind::Group => Operation::Group,
                GrouperKind::Groups => Operation::Groups,
                GrouperKind::Rollup => Operation::Rollup,
                GrouperKind::Rollups => Operation::Rollups,
            };
            (g.id.as_str(), operation)
        })
    }

    /// Run the mapping over a dataset
    #[tracing::instrument(skip_all, fields(rows = rows.len()))]
    pub fn map(&self, rows: &[Row]) -> Result<MappedData, TabulaMappingError> {
        let shaped = match &self.group_aggregate {
            Some(group_aggregate) => self.aggregate_groups(group_aggregate, rows)?,
            None => rows.iter().map(|row| self.shape(row)).collect(),
        };

        let Some(grouper) = &self.grouper else {
            return Ok(MappedData::Items(shaped.into_iter().map(|s| s.item).collect()));
        };

        Ok(match grouper.kind {
            GrouperKind::GroupBy => {
                let mut groups: IndexMap<Value, Vec<Row>> = IndexMap::new();
                for shaped_item in shaped {
                    groups
                        .entry(collapse(shaped_item.keys))
                        .or_default()
                        .push(shaped_item.item);
                }
                MappedData::GroupBy(groups)
            }
            GrouperKind::Group => MappedData::Group(partition_flat(shaped, &item_leaf)),
            GrouperKind::Groups => MappedData::Groups(partition_nested(shaped, 0, &item_leaf)),
            GrouperKind::Rollup | GrouperKind::Rollups => {
                let reducer = self.leaf_reducer()?;
                let reduce = |items: Vec<ShapedItem>| {
                    let leaves: Vec<Value> = items.into_iter().flat_map(|s| s.leaves).collect();
                    match &reducer {
                        Some(aggregator) => GroupNode::Value(aggregator.apply(&leaves)),
                        None => GroupNode::Value(Value::from(leaves.len())),
                    }
                };
                if grouper.kind == GrouperKind::Rollup {
                    MappedData::Rollup(partition_flat(shaped, &reduce))
                } else {
                    MappedData::Rollups(partition_nested(shaped, 0, &reduce))
                }
            }
        })
    }

    fn shape(&self, row: &Row) -> ShapedItem {
        let mut item: Row = self
            .getters
            .iter()
            .map(|getter| (getter.id.clone(), pick(row, &getter.columns)))
            .collect();
        self.finish(&mut item, row, &[row])
    }

    /// Attach grouper keys taken from `row` and rollup leaves of `sources`
    fn finish(&self, item: &mut Row, row: &Row, sources: &[&Row]) -> ShapedItem {
        let keys = match &self.grouper {
            Some(grouper) => {
                let keys = pick_keys(row, &grouper.columns);
                item.insert(grouper.id.clone(), collapse(keys.clone()));
                keys
            }
            None => Vec::new(),
        };
        let leaves = sources
            .iter()
            .map(|source| {
                self.leaf
                    .as_ref()
                    .map(|leaf| pick(source, &leaf.columns))
                    .unwrap_or_default()
            })
            .collect();
        ShapedItem {
            item: std::mem::take(item),
            keys,
            leaves,
        }
    }

    fn aggregate_groups(
        &self,
        group_aggregate: &GroupAggregate,
        rows: &[Row],
    ) -> Result<Vec<ShapedItem>, TabulaMappingError> {
        let identifiers = &group_aggregate.identifiers;
        let aggregators = self
            .getters
            .iter()
            .map(|getter| self.getter_aggregator(getter, identifiers))
            .collect::<Result<Vec<_>, _>>()?;

        let mut buckets: IndexMap<Vec<Value>, Vec<&Row>> = IndexMap::new();
        for row in rows {
            buckets.entry(pick_keys(row, identifiers)).or_default().push(row);
        }

        Ok(buckets
            .into_iter()
            .map(|(key, bucket)| {
                let mut item = Row::new();
                item.insert(group_aggregate.id.clone(), collapse(key));
                for (getter, aggregator) in self.getters.iter().zip(&aggregators) {
                    let values: Vec<Value> =
                        bucket.iter().map(|row| pick(row, &getter.columns)).collect();
                    item.insert(getter.id.clone(), aggregator.apply(&values));
                }
                self.finish(&mut item, bucket[0], &bucket)
            })
            .collect())
    }

    /// Aggregator of a getter inside a `groupAggregate` bucket.
    ///
    /// Without an explicit aggregation, a column that is also an identifier is
    /// constant within the bucket and keeps its first value, any other column
    /// is counted.
    fn getter_aggregator(
        &self,
        getter: &Getter,
        identifiers: &[String],
    ) -> Result<Aggregator, TabulaMappingError> {
        let implicit = |column: &String| {
            if identifiers.contains(column) {
                Aggregation::Func(Aggregator::first())
            } else {
                Aggregation::Func(Aggregator::count())
            }
        };
        match (&getter.aggregation, getter.columns.as_slice()) {
            (Some(expr), [_]) => self.registry.resolve(expr),
            (Some(expr), columns) => self.registry.resolve_tuple(expr, columns.len()),
            (None, [column]) => self.registry.resolve(&implicit(column)),
            (None, columns) => self.registry.resolve_tuple(
                &Aggregation::Many(columns.iter().map(implicit).collect()),
                columns.len(),
            ),
        }
    }

    fn leaf_reducer(&self) -> Result<Option<Aggregator>, TabulaMappingError> {
        let Some(Leaf {
            columns,
            aggregation: Some(expr),
        }) = &self.leaf
        else {
            return Ok(None);
        };
        if columns.len() > 1 {
            self.registry.resolve_tuple(expr, columns.len()).map(Some)
        } else {
            self.registry.resolve(expr).map(Some)
        }
    }
}

fn item_leaf(items: Vec<ShapedItem>) -> GroupNode {
    GroupNode::Items(items.into_iter().map(|s| s.item).collect())
}

/// One level keyed by the full composite key
fn partition_flat(
    items: Vec<ShapedItem>,
    leaf: &dyn Fn(Vec<ShapedItem>) -> GroupNode,
) -> GroupNode {
    let mut buckets: IndexMap<Value, Vec<ShapedItem>> = IndexMap::new();
    for item in items {
        buckets.entry(collapse(item.keys.clone())).or_default().push(item);
    }
    GroupNode::Branch(
        buckets
            .into_iter()
            .map(|(key, bucket)| (key, leaf(bucket)))
            .collect(),
    )
}

/// One level per key column, in mapped order
fn partition_nested(
    items: Vec<ShapedItem>,
    depth: usize,
    leaf: &dyn Fn(Vec<ShapedItem>) -> GroupNode,
) -> GroupNode {
    let mut buckets: IndexMap<Value, Vec<ShapedItem>> = IndexMap::new();
    for item in items {
        let key = item.keys.get(depth).cloned().unwrap_or_default();
        buckets.entry(key).or_default().push(item);
    }
    GroupNode::Branch(
        buckets
            .into_iter()
            .map(|(key, bucket)| {
                let last_level = bucket.first().map_or(true, |item| depth + 1 >= item.keys.len());
                let child = if last_level {
                    leaf(bucket)
                } else {
                    partition_nested(bucket, depth + 1, leaf)
                };
                (key, child)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tabula_common::value::rows_from_json;

    fn rows() -> Vec<Row> {
        rows_from_json(json!([
            {"Gender": "male", "Port": "S", "Age": 22, "Fare": 7.25},
            {"Gender": "female", "Port": "C", "Age": 38, "Fare": 71.25},
            {"Gender": "female", "Port": "S", "Age": 26, "Fare": 8},
            {"Gender": "male", "Port": "S", "Age": 35, "Fare": 8},
        ]))
    }

    fn mapping(entries: Vec<(&str, MappedDimension)>) -> Mapping {
        entries
            .into_iter()
            .map(|(id, mapped)| (id.to_string(), mapped))
            .collect()
    }

    #[test]
    fn test_get_only() {
        let dimensions = [Dimension::get("x").required(), Dimension::get("y").required()];
        let mapper = compile(
            &dimensions,
            &mapping(vec![
                ("x", MappedDimension::column("Age")),
                ("y", MappedDimension::column("Fare")),
            ]),
            None,
        )
        .unwrap();
        let data = rows_from_json(json!([{"Age": 10, "Fare": 5}, {"Age": 20, "Fare": 7}]));
        assert_eq!(
            mapper.map(&data).unwrap().to_json(),
            json!([{"x": 10, "y": 5}, {"x": 20, "y": 7}])
        );
        assert_eq!(mapper.grouper(), None);
    }

    #[test]
    fn test_multi_column_getter() {
        let dimensions = [Dimension::get("xy").multiple()];
        let mapper = compile(
            &dimensions,
            &mapping(vec![("xy", MappedDimension::columns(["Age", "Port"]))]),
            None,
        )
        .unwrap();
        let result = mapper.map(&rows()).unwrap();
        assert_eq!(result.to_json()[0], json!({"xy": [22, "S"]}));
    }

    #[test]
    fn test_group_aggregate_defaults() {
        let dimensions = [
            Dimension::new("groupAgg", Operation::GroupAggregate).multiple(),
            Dimension::get("x"),
            Dimension::get("label"),
        ];
        let mapper = compile(
            &dimensions,
            &mapping(vec![
                ("groupAgg", MappedDimension::column("Gender")),
                ("x", MappedDimension::column("Fare")),
                ("label", MappedDimension::column("Gender")),
            ]),
            None,
        )
        .unwrap();
        assert_eq!(
            mapper.map(&rows()).unwrap().to_json(),
            json!([
                {"groupAgg": "male", "x": 2, "label": "male"},
                {"groupAgg": "female", "x": 2, "label": "female"},
            ])
        );
    }

    #[test]
    fn test_group_aggregate_multi_column_defaults() {
        let dimensions = [
            Dimension::new("groupAgg", Operation::GroupAggregate).multiple(),
            Dimension::get("pair").multiple(),
        ];
        let mapper = compile(
            &dimensions,
            &mapping(vec![
                ("groupAgg", MappedDimension::columns(["Gender", "Port"])),
                ("pair", MappedDimension::columns(["Port", "Age"])),
            ]),
            None,
        )
        .unwrap();
        let json = mapper.map(&rows()).unwrap().to_json();
        assert_eq!(json[0], json!({"groupAgg": ["male", "S"], "pair": ["S", 2]}));
        assert_eq!(json.as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn test_rollup_default_count() {
        let dimensions = [Dimension::new("group", Operation::Rollup).required().multiple()];
        let mapper = compile(
            &dimensions,
            &mapping(vec![("group", MappedDimension::column("Gender"))]),
            None,
        )
        .unwrap();
        let result = mapper.map(&rows()).unwrap();
        assert_eq!(result.to_json(), json!({"male": 2, "female": 2}));
        assert_eq!(mapper.grouper(), Some(("group", Operation::Rollup)));
    }

    #[test]
    fn test_group_aggregate_rolls_up_rows() {
        let dimensions = [
            Dimension::new("groupAgg", Operation::GroupAggregate),
            Dimension::new("group", Operation::Rollup),
        ];
        let counted = compile(
            &dimensions,
            &mapping(vec![
                ("groupAgg", MappedDimension::column("Port")),
                ("group", MappedDimension::column("Gender")),
            ]),
            None,
        )
        .unwrap();
        // Buckets S and C take Gender from their first row: male and female
        assert_eq!(
            counted.map(&rows()).unwrap().to_json(),
            json!({"male": 3, "female": 1})
        );

        let summed = compile(
            &dimensions,
            &mapping(vec![
                ("groupAgg", MappedDimension::column("Port")),
                (
                    "group",
                    MappedDimension::column("Gender").with_leaf_aggregation("sum", "Age"),
                ),
            ]),
            None,
        )
        .unwrap();
        assert_eq!(
            summed.map(&rows()).unwrap().to_json(),
            json!({"male": 83, "female": 38})
        );
    }

    #[test]
    fn test_malformed_leaf_aggregation() {
        let dimensions = [Dimension::new("group", Operation::Rollup).multiple()];
        let mut grouped = MappedDimension::column("Gender");
        grouped.config.leaf_aggregation = Some(Value::Array(vec![Value::from("sum")]));
        let err = compile(&dimensions, &mapping(vec![("group", grouped)]), None).unwrap_err();
        assert_eq!(err, TabulaMappingError::Compile(LEAF_AGGREGATION_ERROR.to_string()));
    }

    #[test]
    fn test_unknown_aggregator_fails_when_run() {
        let dimensions = [Dimension::new("group", Operation::Rollup).multiple()];
        let mapper = compile(
            &dimensions,
            &mapping(vec![(
                "group",
                MappedDimension::column("Gender").with_leaf_aggregation("nope", "Fare"),
            )]),
            None,
        )
        .unwrap();
        assert_eq!(
            mapper.map(&rows()),
            Err(TabulaMappingError::UnknownAggregator("nope".to_string()))
        );
    }

    #[test]
    fn test_two_groupers_are_rejected() {
        let dimensions = [
            Dimension::get("x"),
            Dimension::new("a", Operation::Group),
            Dimension::new("b", Operation::GroupBy),
        ];
        let result = compile(
            &dimensions,
            &mapping(vec![
                ("x", MappedDimension::column("Age")),
                ("a", MappedDimension::column("Gender")),
                ("b", MappedDimension::column("Port")),
            ]),
            None,
        );
        assert!(matches!(result, Err(TabulaMappingError::Compile(_))));
    }

    #[test]
    fn test_unmapped_grouper_is_inactive() {
        let dimensions = [Dimension::get("x"), Dimension::new("a", Operation::Group)];
        let mapper = compile(
            &dimensions,
            &mapping(vec![
                ("x", MappedDimension::column("Age")),
                ("a", MappedDimension::default()),
            ]),
            None,
        )
        .unwrap();
        assert!(mapper.map(&rows()).unwrap().as_items().is_some());
    }
}
