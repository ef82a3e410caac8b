//! Turn backend items into plain JSON for reports.
//!
//! Every serialized item carries the default attributes of its kind followed
//! by the requested extra fields. Relations are flattened: people and other
//! generic assets collapse to their display name, referenced epics expand
//! into a nested mapping of their own default attributes.

use crate::error::{AuditError, Result};
use crate::schema::default_fields;
use crate::types::{AttributeValue, EntityKind, Item};
use indexmap::IndexSet;
use serde_json::{Map, Value};

/// Serialize one item with its default attributes plus `extra_fields`.
///
/// A field the item does not carry is a configuration error: the query that
/// produced the item was expected to select it.
pub fn to_json(item: &Item, extra_fields: &[String]) -> Result<Value> {
    let fields: IndexSet<&str> = default_fields(item.kind())
        .iter()
        .copied()
        .chain(extra_fields.iter().map(String::as_str))
        .collect();

    let mut map = Map::new();
    for field in fields {
        let value = item
            .attribute(field)
            .ok_or_else(|| AuditError::missing_attribute(item.oid(), field))?;
        map.insert(field.to_string(), resolve(value)?);
    }
    Ok(Value::Object(map))
}

/// Serialize a group of items with the same field set.
pub fn to_json_list(items: &[Item], extra_fields: &[String]) -> Result<Value> {
    items
        .iter()
        .map(|item| to_json(item, extra_fields))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

fn resolve(value: &AttributeValue) -> Result<Value> {
    Ok(match value {
        AttributeValue::Null => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Number(n) => Value::Number(n.clone()),
        AttributeValue::Text(s) => Value::String(s.clone()),
        AttributeValue::List(values) => Value::Array(
            values.iter().map(resolve).collect::<Result<Vec<_>>>()?,
        ),
        AttributeValue::Reference(target) => match target.kind() {
            EntityKind::Epic => to_json(target, &[])?,
            EntityKind::Person | EntityKind::Generic => {
                let name = target
                    .attribute("Name")
                    .ok_or_else(|| AuditError::missing_attribute(target.oid(), "Name"))?;
                resolve(name)?
            }
        },
    })
}
