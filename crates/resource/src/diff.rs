//! Name-keyed set operations over object lists.

use kube::Resource;
use serde::Serialize;
use serde_json::Value;

pub fn name_of<K: Resource>(obj: &K) -> &str {
    obj.meta().name.as_deref().unwrap_or_default()
}

pub fn find<'a, K: Resource>(objects: &'a [K], name: &str) -> Option<&'a K> {
    objects.iter().find(|o| name_of(*o) == name)
}

/// Objects of `objects` whose name does not appear in `other`.
pub fn absent_from<K: Resource + Clone>(objects: &[K], other: &[K]) -> Vec<K> {
    objects.iter().filter(|o| find(other, name_of(*o)).is_none()).cloned().collect()
}

/// Objects of `objects` whose name also appears in `other`.
pub fn present_in<K: Resource + Clone>(objects: &[K], other: &[K]) -> Vec<K> {
    objects.iter().filter(|o| find(other, name_of(*o)).is_some()).cloned().collect()
}

/// Desired objects whose current counterpart differs according to `modified(desired, current)`.
pub fn changed<K, F>(current: &[K], desired: &[K], modified: F) -> Vec<K>
where
    K: Resource + Clone,
    F: Fn(&K, &K) -> bool,
{
    desired
        .iter()
        .filter(|d| find(current, name_of(*d)).is_some_and(|c| modified(*d, c)))
        .cloned()
        .collect()
}

/// Whether every field set in `desired` is present and equal in `current`.
///
/// Fields the API server fills in on its own (defaults, allocated values)
/// appear only on the live object and do not count as a difference. Lists
/// must match in length and element order.
pub fn covers<T: Serialize>(current: &T, desired: &T) -> bool {
    match (serde_json::to_value(current), serde_json::to_value(desired)) {
        (Ok(c), Ok(d)) => contains(&c, &d),
        _ => false,
    }
}

fn contains(current: &Value, desired: &Value) -> bool {
    match (current, desired) {
        (Value::Object(c), Value::Object(d)) => d.iter().all(|(k, dv)| c.get(k).is_some_and(|cv| contains(cv, dv))),
        (Value::Array(c), Value::Array(d)) => c.len() == d.len() && c.iter().zip(d).all(|(cv, dv)| contains(cv, dv)),
        _ => current == desired,
    }
}
