//! Core value types for backend records.
//!
//! Records arrive from the backend in the VersionOne JSON wire form: an
//! object carrying `_oid` is an entity, arrays are multi-value relations and
//! anything else is a plain scalar. [`Item::from_wire`] turns that shape into
//! typed [`AttributeValue`]s so nothing downstream has to probe raw JSON.

use crate::error::BackendError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Wire key holding an entity's identifier.
pub const OID_KEY: &str = "_oid";

/// Opaque backend identifier, e.g. `Scope:1234`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Oid(String);

impl Oid {
    pub fn new(oid: impl Into<String>) -> Self {
        Self(oid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The asset type prefix (`Epic` for `Epic:1001`).
    pub fn asset_type(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Oid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Oid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Entity kinds that serialize differently when referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Epic-like items, expanded into a nested mapping
    Epic,
    /// Members, collapsed to their display name
    Person,
    /// Any other asset (scopes, statuses, categories, custom list values)
    Generic,
}

impl EntityKind {
    pub fn from_asset_type(asset_type: &str) -> Self {
        match asset_type {
            "Epic" => EntityKind::Epic,
            "Member" => EntityKind::Person,
            _ => EntityKind::Generic,
        }
    }
}

/// A single attribute value on an [`Item`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<AttributeValue>),
    Reference(Box<Item>),
}

impl AttributeValue {
    pub fn text(s: impl Into<String>) -> Self {
        AttributeValue::Text(s.into())
    }

    pub fn reference(item: Item) -> Self {
        AttributeValue::Reference(Box::new(item))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Length for values that have one (text and lists).
    pub fn len(&self) -> Option<usize> {
        match self {
            AttributeValue::Text(s) => Some(s.chars().count()),
            AttributeValue::List(values) => Some(values.len()),
            _ => None,
        }
    }

    /// Emptiness for values that have a length.
    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }

    /// Decode one wire value.
    pub fn from_wire(value: &Value) -> Result<Self, BackendError> {
        Ok(match value {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Bool(*b),
            Value::Number(n) => AttributeValue::Number(n.clone()),
            Value::String(s) => AttributeValue::Text(s.clone()),
            Value::Array(values) => AttributeValue::List(
                values
                    .iter()
                    .map(AttributeValue::from_wire)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(_) => AttributeValue::reference(Item::from_wire(value)?),
        })
    }

    /// True when this value points at the entity with `oid`.
    pub fn refers_to(&self, oid: &Oid) -> bool {
        match self {
            AttributeValue::Reference(item) => item.oid() == oid,
            AttributeValue::Text(s) => s == oid.as_str(),
            _ => false,
        }
    }
}

/// A record read from the backend: identity, kind and the projected attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    oid: Oid,
    kind: EntityKind,
    attributes: IndexMap<String, AttributeValue>,
}

impl Item {
    /// Create an item whose kind follows from the oid's asset type.
    pub fn new(oid: impl Into<Oid>) -> Self {
        let oid = oid.into();
        let kind = EntityKind::from_asset_type(oid.asset_type());
        Self {
            oid,
            kind,
            attributes: IndexMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn set(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.attributes.insert(name.into(), value);
    }

    /// The display name, when present as text.
    pub fn name(&self) -> Option<&str> {
        match self.attribute("Name") {
            Some(AttributeValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Copy of this item restricted to `fields`. Fields the item lacks stay absent.
    pub fn project<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> Item {
        let attributes = fields
            .into_iter()
            .filter_map(|f| self.attributes.get(f).map(|v| (f.to_string(), v.clone())))
            .collect();
        Item {
            oid: self.oid.clone(),
            kind: self.kind,
            attributes,
        }
    }

    /// Decode an entity object in wire form.
    pub fn from_wire(value: &Value) -> Result<Self, BackendError> {
        let object = value
            .as_object()
            .ok_or_else(|| BackendError::decode(format!("expected an entity object, got {value}")))?;
        let oid = object
            .get(OID_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| BackendError::decode(format!("entity without {OID_KEY}: {value}")))?;

        let mut item = Item::new(oid);
        for (key, value) in object {
            if key == OID_KEY {
                continue;
            }
            item.set(key.as_str(), AttributeValue::from_wire(value)?);
        }
        Ok(item)
    }
}
