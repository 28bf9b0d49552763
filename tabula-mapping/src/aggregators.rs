//! Named aggregation functions.
//!
//! An [`AggregatorRegistry`] maps names such as `"sum"` or `"csvDistinct"` to
//! reducing functions over a list of values. Registries are cheap handles:
//! clones share one table, [`AggregatorRegistry::fork`] makes an independent
//! copy. A process-wide registry preloaded with the built-in aggregators backs
//! [`register_aggregation`], [`unregister_aggregation`] and [`aggregator_names`].
use crate::error::TabulaMappingError;
use indexmap::IndexMap;
use itertools::Itertools;
use lazy_static::lazy_static;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tabula_common::Value;

pub type AggregateFn = dyn Fn(&[Value]) -> Value + Send + Sync;

/// A reduction from a list of values to a single value
#[derive(Clone)]
pub struct Aggregator(Arc<AggregateFn>);

impl Aggregator {
    pub fn new(f: impl Fn(&[Value]) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, values: &[Value]) -> Value {
        (self.0)(values)
    }

    /// First value of the list
    pub fn first() -> Self {
        Self::new(first)
    }

    /// Number of values in the list
    pub fn count() -> Self {
        Self::new(count)
    }
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Aggregator(..)")
    }
}

impl PartialEq for Aggregator {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// How a list of values is reduced: a registered name, a function, or one
/// expression per column of a multi-column dimension
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    Name(String),
    Func(Aggregator),
    Many(Vec<Aggregation>),
}

impl Aggregation {
    pub fn many<I, A>(items: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Aggregation>,
    {
        Aggregation::Many(items.into_iter().map(Into::into).collect())
    }

    /// Configuration form of the expression, `None` when it holds a function
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Aggregation::Name(name) => Some(Value::from(name.as_str())),
            Aggregation::Func(_) => None,
            Aggregation::Many(items) => items
                .iter()
                .map(Aggregation::to_value)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
        }
    }
}

impl From<&str> for Aggregation {
    fn from(name: &str) -> Self {
        Aggregation::Name(name.to_string())
    }
}

impl From<String> for Aggregation {
    fn from(name: String) -> Self {
        Aggregation::Name(name)
    }
}

impl From<Aggregator> for Aggregation {
    fn from(aggregator: Aggregator) -> Self {
        Aggregation::Func(aggregator)
    }
}

impl TryFrom<&Value> for Aggregation {
    type Error = TabulaMappingError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(name) => Ok(Aggregation::Name(name.clone())),
            Value::Array(items) => Ok(Aggregation::Many(
                items
                    .iter()
                    .map(Aggregation::try_from)
                    .collect::<Result<_, _>>()?,
            )),
            other => Err(TabulaMappingError::InvalidConfig(format!(
                "aggregation must be a name or a list of names, got {}",
                other.kind()
            ))),
        }
    }
}

impl Serialize for Aggregation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_value() {
            Some(value) => value.serialize(serializer),
            None => Err(serde::ser::Error::custom(
                "aggregation functions cannot be serialized",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Aggregation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Aggregation::try_from(&value).map_err(serde::de::Error::custom)
    }
}

fn numbers(values: &[Value]) -> Vec<f64> {
    values
        .iter()
        .filter_map(|v| match v {
            Value::Number(n) if !n.is_nan() => Some(*n),
            _ => None,
        })
        .collect()
}

fn first(values: &[Value]) -> Value {
    values.first().cloned().unwrap_or_default()
}

fn last(values: &[Value]) -> Value {
    values.last().cloned().unwrap_or_default()
}

fn count(values: &[Value]) -> Value {
    Value::from(values.len())
}

fn count_distinct(values: &[Value]) -> Value {
    Value::from(values.iter().unique().count())
}

fn sum(values: &[Value]) -> Value {
    Value::Number(numbers(values).iter().sum())
}

fn mean(values: &[Value]) -> Value {
    let nums = numbers(values);
    if nums.is_empty() {
        Value::Null
    } else {
        Value::Number(nums.iter().sum::<f64>() / nums.len() as f64)
    }
}

fn median(values: &[Value]) -> Value {
    let mut nums = numbers(values);
    if nums.is_empty() {
        return Value::Null;
    }
    nums.sort_unstable_by_key(|n| OrderedFloat(*n));
    let mid = nums.len() / 2;
    if nums.len() % 2 == 0 {
        Value::Number((nums[mid - 1] + nums[mid]) / 2.0)
    } else {
        Value::Number(nums[mid])
    }
}

/// Extreme value among the values comparable with the first usable one
fn extreme(values: &[Value], wanted: Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for value in values {
        match value {
            Value::Null => continue,
            Value::Number(n) if n.is_nan() => continue,
            _ => {}
        }
        match best {
            None => best = Some(value),
            Some(current) if value.partial_cmp(current) == Some(wanted) => best = Some(value),
            Some(_) => {}
        }
    }
    best.cloned().unwrap_or_default()
}

fn max(values: &[Value]) -> Value {
    extreme(values, Ordering::Greater)
}

fn min(values: &[Value]) -> Value {
    extreme(values, Ordering::Less)
}

fn joined(values: &[Value], separator: &str) -> Value {
    Value::String(values.iter().join(separator))
}

fn joined_distinct(values: &[Value], separator: &str) -> Value {
    Value::String(values.iter().unique().join(separator))
}

fn builtins() -> Vec<(&'static str, Aggregator)> {
    vec![
        ("last", Aggregator::new(last)),
        ("first", Aggregator::new(first)),
        ("count", Aggregator::new(count)),
        ("countDistinct", Aggregator::new(count_distinct)),
        ("mean", Aggregator::new(mean)),
        ("max", Aggregator::new(max)),
        ("min", Aggregator::new(min)),
        ("sum", Aggregator::new(sum)),
        ("median", Aggregator::new(median)),
        ("csv", Aggregator::new(|v| joined(v, ","))),
        ("csvDistinct", Aggregator::new(|v| joined_distinct(v, ","))),
        ("commaSeparated", Aggregator::new(|v| joined(v, ","))),
        ("tsv", Aggregator::new(|v| joined(v, "\t"))),
        ("tsvDistinct", Aggregator::new(|v| joined_distinct(v, "\t"))),
        ("tabSeparated", Aggregator::new(|v| joined(v, "\t"))),
        ("newLineSeparated", Aggregator::new(|v| joined(v, "\n"))),
    ]
}

/// A shared table of named aggregators.
///
/// Registration overwrites silently. Reads may happen from any thread; writers
/// take an exclusive lock for the duration of the insert or removal.
#[derive(Clone, Default)]
pub struct AggregatorRegistry {
    aggregators: Arc<RwLock<IndexMap<String, Aggregator>>>,
}

impl fmt::Debug for AggregatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregatorRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl AggregatorRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in aggregators
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for (name, aggregator) in builtins() {
            registry.register_aggregator(name, aggregator);
        }
        registry
    }

    /// An independent copy of this registry
    pub fn fork(&self) -> Self {
        let table = self
            .aggregators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Self {
            aggregators: Arc::new(RwLock::new(table)),
        }
    }

    pub fn register(
        &self,
        name: impl Into<String>,
        f: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) {
        self.register_aggregator(name, Aggregator::new(f));
    }

    pub fn register_aggregator(&self, name: impl Into<String>, aggregator: Aggregator) {
        self.aggregators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), aggregator);
    }

    pub fn unregister(&self, name: &str) -> Option<Aggregator> {
        self.aggregators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Aggregator> {
        self.aggregators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.aggregators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, in registration order
    pub fn names(&self) -> Vec<String> {
        self.aggregators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Resolve an expression reducing a single column
    pub fn resolve(&self, expr: &Aggregation) -> Result<Aggregator, TabulaMappingError> {
        match expr {
            Aggregation::Name(name) => self
                .get(name)
                .ok_or_else(|| TabulaMappingError::UnknownAggregator(name.clone())),
            Aggregation::Func(aggregator) => Ok(aggregator.clone()),
            Aggregation::Many(items) if items.len() == 1 => self.resolve(&items[0]),
            Aggregation::Many(items) => Err(TabulaMappingError::Compile(format!(
                "{} aggregations given for a single column",
                items.len()
            ))),
        }
    }

    /// Resolve an expression reducing tuples of `arity` values.
    ///
    /// The returned aggregator expects a list of arrays and reduces each
    /// position separately, either with the same aggregator or, when `expr`
    /// lists one expression per position, with its own.
    pub fn resolve_tuple(
        &self,
        expr: &Aggregation,
        arity: usize,
    ) -> Result<Aggregator, TabulaMappingError> {
        let per_index = match expr {
            Aggregation::Many(items) if items.len() != arity => {
                return Err(TabulaMappingError::Compile(format!(
                    "expected {} aggregations, one per column, got {}",
                    arity,
                    items.len()
                )))
            }
            Aggregation::Many(items) => items
                .iter()
                .map(|item| self.resolve(item))
                .collect::<Result<Vec<_>, _>>()?,
            single => vec![self.resolve(single)?; arity],
        };

        Ok(Aggregator::new(move |tuples| {
            Value::Array(
                per_index
                    .iter()
                    .enumerate()
                    .map(|(i, aggregator)| {
                        let column: Vec<Value> = tuples
                            .iter()
                            .map(|tuple| {
                                tuple
                                    .as_array()
                                    .and_then(|values| values.get(i))
                                    .cloned()
                                    .unwrap_or_default()
                            })
                            .collect();
                        aggregator.apply(&column)
                    })
                    .collect(),
            )
        }))
    }
}

lazy_static! {
    static ref DEFAULT_REGISTRY: AggregatorRegistry = AggregatorRegistry::with_builtins();
}

/// Handle to the process-wide registry
pub fn default_registry() -> AggregatorRegistry {
    DEFAULT_REGISTRY.clone()
}

/// Register an aggregator in the process-wide registry
pub fn register_aggregation(
    name: impl Into<String>,
    f: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
) {
    DEFAULT_REGISTRY.register(name, f);
}

pub fn unregister_aggregation(name: &str) -> Option<Aggregator> {
    DEFAULT_REGISTRY.unregister(name)
}

/// Names in the process-wide registry
pub fn aggregator_names() -> Vec<String> {
    DEFAULT_REGISTRY.names()
}
