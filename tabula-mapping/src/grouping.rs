//! Output shapes of a compiled mapping.
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use tabula_common::{Row, Value};

/// One level of a grouped result
#[derive(Debug, Clone, PartialEq)]
pub enum GroupNode {
    /// Nested level keyed by group value, in first-occurrence order
    Branch(IndexMap<Value, GroupNode>),
    /// Items of a leaf group
    Items(Vec<Row>),
    /// Aggregated value of a rolled-up leaf group
    Value(Value),
}

impl GroupNode {
    pub fn get(&self, key: &Value) -> Option<&GroupNode> {
        match self {
            GroupNode::Branch(children) => children.get(key),
            _ => None,
        }
    }

    /// Follow a sequence of keys down the tree
    pub fn get_path(&self, keys: &[Value]) -> Option<&GroupNode> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    pub fn keys(&self) -> Vec<&Value> {
        match self {
            GroupNode::Branch(children) => children.keys().collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_items(&self) -> Option<&[Row]> {
        match self {
            GroupNode::Items(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            GroupNode::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Number of children of a branch or items of a leaf
    pub fn len(&self) -> usize {
        match self {
            GroupNode::Branch(children) => children.len(),
            GroupNode::Items(items) => items.len(),
            GroupNode::Value(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// JSON object keyed by the string form of each group value
    pub fn to_map_json(&self) -> serde_json::Value {
        match self {
            GroupNode::Branch(children) => serde_json::Value::Object(
                children
                    .iter()
                    .map(|(key, child)| (key.to_string(), child.to_map_json()))
                    .collect(),
            ),
            leaf => leaf_json(leaf),
        }
    }

    /// Nested `[key, children]` pairs, keeping group values typed
    pub fn to_entries_json(&self) -> serde_json::Value {
        match self {
            GroupNode::Branch(children) => serde_json::Value::Array(
                children
                    .iter()
                    .map(|(key, child)| {
                        serde_json::Value::Array(vec![key.to_json(), child.to_entries_json()])
                    })
                    .collect(),
            ),
            leaf => leaf_json(leaf),
        }
    }
}

fn leaf_json(node: &GroupNode) -> serde_json::Value {
    match node {
        GroupNode::Items(items) => rows_json(items),
        GroupNode::Value(value) => value.to_json(),
        GroupNode::Branch(_) => node.to_map_json(),
    }
}

fn rows_json(rows: &[Row]) -> serde_json::Value {
    serde_json::Value::Array(
        rows.iter()
            .map(|row| {
                serde_json::Value::Object(
                    row.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
                )
            })
            .collect(),
    )
}

/// Result of running a compiled mapping; the variant names the grouper that
/// produced it
#[derive(Debug, Clone, PartialEq)]
pub enum MappedData {
    Items(Vec<Row>),
    GroupBy(IndexMap<Value, Vec<Row>>),
    Group(GroupNode),
    Groups(GroupNode),
    Rollup(GroupNode),
    Rollups(GroupNode),
}

impl MappedData {
    pub fn as_items(&self) -> Option<&[Row]> {
        match self {
            MappedData::Items(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_group_by(&self) -> Option<&IndexMap<Value, Vec<Row>>> {
        match self {
            MappedData::GroupBy(groups) => Some(groups),
            _ => None,
        }
    }

    /// Root of the tree built by `group`, `groups`, `rollup` or `rollups`
    pub fn root(&self) -> Option<&GroupNode> {
        match self {
            MappedData::Group(node)
            | MappedData::Groups(node)
            | MappedData::Rollup(node)
            | MappedData::Rollups(node) => Some(node),
            _ => None,
        }
    }

    /// JSON form: item arrays, objects for map-shaped groupings and
    /// `[key, children]` entries for `groups`/`rollups`
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            MappedData::Items(items) => rows_json(items),
            MappedData::GroupBy(groups) => serde_json::Value::Object(
                groups
                    .iter()
                    .map(|(key, items)| (key.to_string(), rows_json(items)))
                    .collect(),
            ),
            MappedData::Group(node) | MappedData::Rollup(node) => node.to_map_json(),
            MappedData::Groups(node) | MappedData::Rollups(node) => node.to_entries_json(),
        }
    }
}

impl Serialize for MappedData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
