//! Declarative rule sets.
//!
//! # File Format Example
//!
//! ```yaml
//! fields:
//!   Custom_TSAStatus2:
//!     reference: generic
//! rules:
//!   - scope: B1Platform - ART
//!     status: Reviewing
//!     validations:
//!       NotEmpty: [Wsjf, Description, Custom_TSAStatus2]
//! ```
//!
//! Loading checks every validator kind and field name up front, so a broken
//! rule set never reaches the backend.

use crate::error::{AuditError, Result};
use crate::kanban_status::KanbanStatus;
use crate::schema::{EntitySchema, FieldKind};
use crate::validator::{Validator, ValidatorKind};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

const BUILTIN_RULES: &str = include_str!("../builtin/rules.yaml");

/// One scope/status column and the checks to run on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub scope: String,
    pub status: String,
    pub validations: IndexMap<ValidatorKind, Vec<String>>,
}

impl Rule {
    /// One validator per (kind, field) pair, in declaration order.
    pub fn validators(&self) -> Vec<Box<dyn Validator>> {
        self.validations
            .iter()
            .flat_map(|(kind, fields)| fields.iter().map(move |field| kind.build(field)))
            .collect()
    }

    pub fn stage(&self) -> KanbanStatus {
        KanbanStatus::new(&self.scope, &self.status, self.validators())
    }

    fn fields(&self) -> impl Iterator<Item = &str> {
        self.validations.values().flatten().map(String::as_str)
    }
}

/// A rule set as written on disk, before validator kinds are resolved.
#[derive(Debug, Deserialize)]
struct RuleSetFile {
    /// Relations are written as `{reference: person}` in YAML as well as JSON.
    #[serde(
        default,
        deserialize_with = "serde_yaml_ng::with::singleton_map_recursive::deserialize"
    )]
    fields: IndexMap<String, FieldKind>,
    rules: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    scope: String,
    status: String,
    #[serde(default)]
    validations: IndexMap<String, Vec<String>>,
}

impl RuleEntry {
    fn into_rule(self) -> Result<Rule> {
        let validations = self
            .validations
            .into_iter()
            .map(|(kind, fields)| -> Result<(ValidatorKind, Vec<String>)> {
                Ok((kind.parse()?, fields))
            })
            .collect::<Result<_>>()?;
        Ok(Rule {
            scope: self.scope,
            status: self.status,
            validations,
        })
    }
}

/// An ordered list of rules plus the custom fields they may reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    pub fields: IndexMap<String, FieldKind>,
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// The rules shipped with the tool.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_RULES)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: RuleSetFile = serde_yaml_ng::from_str(yaml)
            .map_err(|e| AuditError::invalid_rule_set(e.to_string()))?;
        Self::from_file(file)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: RuleSetFile = serde_json::from_str(json)
            .map_err(|e| AuditError::invalid_rule_set(e.to_string()))?;
        Self::from_file(file)
    }

    fn from_file(file: RuleSetFile) -> Result<Self> {
        let rule_set = RuleSet {
            fields: file.fields,
            rules: file
                .rules
                .into_iter()
                .map(RuleEntry::into_rule)
                .collect::<Result<_>>()?,
        };
        rule_set.check()?;
        Ok(rule_set)
    }

    /// Load a rule set file; `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading rule set");
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text),
            _ => Self::from_yaml(&text),
        }
    }

    /// The epic schema extended with this rule set's custom fields.
    pub fn schema(&self) -> EntitySchema {
        EntitySchema::epic().with_fields(&self.fields)
    }

    /// Fail on redeclared built-in fields and on any rule field the schema
    /// does not define.
    pub fn check(&self) -> Result<()> {
        let builtin = EntitySchema::epic();
        if let Some(name) = self.fields.keys().find(|name| builtin.field(name).is_some()) {
            return Err(AuditError::invalid_rule_set(format!(
                "field '{name}' is built in and cannot be redeclared"
            )));
        }

        let schema = self.schema();
        for rule in &self.rules {
            for field in rule.fields() {
                schema.require(field)?;
            }
        }
        Ok(())
    }

    /// Keep only rules for the given scopes, preserving order.
    pub fn only_scopes<S: AsRef<str>>(mut self, scopes: &[S]) -> Self {
        self.rules
            .retain(|rule| scopes.iter().any(|scope| scope.as_ref() == rule.scope));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
