//! Field validators and the registry of validator kinds.

use crate::error::{AuditError, Result};
use crate::serialize;
use crate::types::{AttributeValue, Item};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A stateless check applied to every fetched item.
pub trait Validator: fmt::Debug + Send + Sync {
    /// Attributes this validator reads. Drives query projection.
    fn fields(&self) -> BTreeSet<String>;

    /// Fixed description of the failure, independent of the item.
    fn message(&self) -> String;

    /// True when the item satisfies the check.
    fn validate_item(&self, item: &Item) -> bool;

    /// Items failing the check, in input order.
    fn invalid<'a>(&self, items: &'a [Item]) -> Vec<&'a Item> {
        items.iter().filter(|item| !self.validate_item(item)).collect()
    }

    /// Items failing the check, serialized with `return_fields`.
    fn validate(&self, items: &[Item], return_fields: &[String]) -> Result<Vec<serde_json::Value>> {
        self.invalid(items)
            .into_iter()
            .map(|item| serialize::to_json(item, return_fields))
            .collect()
    }
}

/// Registered validator kinds, parsed from the keys of a rule's `validations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidatorKind {
    NotEmpty,
}

impl ValidatorKind {
    /// Build a validator of this kind for `field`.
    pub fn build(self, field: &str) -> Box<dyn Validator> {
        match self {
            ValidatorKind::NotEmpty => Box::new(NotEmptyValidator::new(field)),
        }
    }
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorKind::NotEmpty => write!(f, "NotEmpty"),
        }
    }
}

impl FromStr for ValidatorKind {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NotEmpty" => Ok(ValidatorKind::NotEmpty),
            _ => Err(AuditError::UnknownValidator { kind: s.to_string() }),
        }
    }
}

/// Fails items whose field is absent, null, or has zero length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotEmptyValidator {
    field: String,
}

impl NotEmptyValidator {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Validator for NotEmptyValidator {
    fn fields(&self) -> BTreeSet<String> {
        BTreeSet::from([self.field.clone()])
    }

    fn message(&self) -> String {
        format!("{} is empty", self.field)
    }

    fn validate_item(&self, item: &Item) -> bool {
        match item.attribute(&self.field) {
            None | Some(AttributeValue::Null) => false,
            Some(value) => value.is_empty() != Some(true),
        }
    }
}
