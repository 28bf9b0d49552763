//! Dotted-path access into rows and nested values.
//!
//! A path is first tried as a literal key, so column names containing dots
//! (or spaces) resolve directly. Otherwise the path is split on `.` and each
//! segment indexes into an object by key or into an array by position.

use crate::value::{Row, Value};
use indexmap::IndexMap;

/// Look up a path in a row
pub fn get_path<'a>(row: &'a Row, path: &str) -> Option<&'a Value> {
    if let Some(value) = row.get(path) {
        return Some(value);
    }
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = row.get(first)?;
    for segment in segments {
        current = step(current, segment)?;
    }
    Some(current)
}

/// Look up a path in a value
pub fn get_value_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    if let Value::Object(map) = value {
        return get_path(map, path);
    }
    let mut current = value;
    for segment in path.split('.') {
        current = step(current, segment)?;
    }
    Some(current)
}

fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(values) => segment.parse::<usize>().ok().and_then(|i| values.get(i)),
        _ => None,
    }
}

/// Assign `new_value` at `path`, creating intermediate objects as needed.
///
/// Intermediate values that are not objects are replaced by objects.
pub fn set_path(target: &mut Row, path: &str, new_value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    set_segments(target, &segments, new_value);
}

fn set_segments(target: &mut Row, segments: &[&str], new_value: Value) {
    match segments {
        [] => {}
        [last] => {
            target.insert((*last).to_string(), new_value);
        }
        [head, rest @ ..] => {
            let entry = target
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(IndexMap::new()));
            if !matches!(entry, Value::Object(_)) {
                *entry = Value::Object(IndexMap::new());
            }
            if let Value::Object(child) = entry {
                set_segments(child, rest, new_value);
            }
        }
    }
}
