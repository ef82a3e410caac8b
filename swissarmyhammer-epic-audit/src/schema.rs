//! Entity schema: which attributes exist on an epic and what shape they have.
//!
//! Field names used by rules are checked against the schema when a rule set
//! is loaded, so a typo fails before the first request goes out.

use crate::error::{AuditError, Result};
use crate::types::EntityKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Attributes every serialized entity carries.
pub const DEFAULT_ITEM_FIELDS: &[&str] = &["Name"];

/// Attributes every serialized epic carries.
pub const DEFAULT_EPIC_FIELDS: &[&str] = &["Name", "Number", "Category"];

/// Default attributes for an entity kind.
pub fn default_fields(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Epic => DEFAULT_EPIC_FIELDS,
        EntityKind::Person | EntityKind::Generic => DEFAULT_ITEM_FIELDS,
    }
}

/// Shape of a single attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Text, number, boolean or null
    Scalar,
    /// Multi-value relation to entities of the given kind
    List(EntityKind),
    /// Single-value relation to an entity of the given kind
    Reference(EntityKind),
}

impl FieldKind {
    /// Kind of the entity on the other end of a relation.
    pub fn target(&self) -> Option<EntityKind> {
        match self {
            FieldKind::Scalar => None,
            FieldKind::List(kind) | FieldKind::Reference(kind) => Some(*kind),
        }
    }
}

/// Field registry for the audited asset type.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySchema {
    asset_type: String,
    fields: IndexMap<String, FieldKind>,
}

impl EntitySchema {
    /// The built-in Epic schema.
    pub fn epic() -> Self {
        let fields = [
            ("Name", FieldKind::Scalar),
            ("Number", FieldKind::Scalar),
            ("Category", FieldKind::Reference(EntityKind::Generic)),
            ("Scope", FieldKind::Reference(EntityKind::Generic)),
            ("Status", FieldKind::Reference(EntityKind::Generic)),
            ("Owners", FieldKind::List(EntityKind::Person)),
            ("Description", FieldKind::Scalar),
            ("Wsjf", FieldKind::Scalar),
            ("Super", FieldKind::Reference(EntityKind::Epic)),
            ("Subs", FieldKind::List(EntityKind::Epic)),
        ];
        Self {
            asset_type: "Epic".to_string(),
            fields: fields
                .into_iter()
                .map(|(name, kind)| (name.to_string(), kind))
                .collect(),
        }
    }

    /// Add or override field definitions.
    pub fn with_fields(mut self, fields: &IndexMap<String, FieldKind>) -> Self {
        for (name, kind) in fields {
            self.fields.insert(name.clone(), *kind);
        }
        self
    }

    pub fn asset_type(&self) -> &str {
        &self.asset_type
    }

    pub fn field(&self, name: &str) -> Option<FieldKind> {
        self.fields.get(name).copied()
    }

    /// Look up a field, failing with a configuration error when it is not defined.
    pub fn require(&self, name: &str) -> Result<FieldKind> {
        self.field(name)
            .ok_or_else(|| AuditError::unknown_field(&self.asset_type, name))
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldKind)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl Default for EntitySchema {
    fn default() -> Self {
        Self::epic()
    }
}
