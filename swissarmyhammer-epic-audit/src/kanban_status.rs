//! Evaluate validators against the epics sitting in one scope/status column.

use crate::backend::{Backend, LookupKind};
use crate::error::{AuditError, Result};
use crate::query::Query;
use crate::report::Report;
use crate::schema::DEFAULT_EPIC_FIELDS;
use crate::types::Oid;
use crate::validator::Validator;
use indexmap::IndexMap;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// A kanban column (scope + status) and the validators its epics must pass.
#[derive(Debug)]
pub struct KanbanStatus {
    scope: String,
    status: String,
    validators: Vec<Box<dyn Validator>>,
}

impl KanbanStatus {
    pub fn new(
        scope: impl Into<String>,
        status: impl Into<String>,
        validators: Vec<Box<dyn Validator>>,
    ) -> Self {
        Self {
            scope: scope.into(),
            status: status.into(),
            validators,
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Union of every validator's fields.
    pub fn extra_fields(&self) -> BTreeSet<String> {
        self.validators.iter().flat_map(|v| v.fields()).collect()
    }

    /// The epic query for already-resolved scope and status identifiers.
    pub fn query(&self, scope: Oid, status: Oid) -> Query {
        Query::epics(
            self.extra_fields(),
            IndexMap::from([("Scope".to_string(), scope), ("Status".to_string(), status)]),
        )
    }

    /// Resolve names, fetch the column's epics once and collect failures.
    ///
    /// The status name is resolved against every epic status in the
    /// instance, not only the ones used by this scope's workflow.
    pub async fn evaluate(&self, backend: &dyn Backend) -> Result<Report> {
        let scope = backend
            .lookup(LookupKind::Scope, &self.scope)
            .await?
            .ok_or_else(|| AuditError::ScopeNotFound {
                name: self.scope.clone(),
            })?;
        let status = backend
            .lookup(LookupKind::Status, &self.status)
            .await?
            .ok_or_else(|| AuditError::StatusNotFound {
                name: self.status.clone(),
            })?;
        debug!(scope = %scope, status = %status, "resolved kanban column");

        let items = self.query(scope, status).fetch(backend).await?;

        let return_fields: Vec<String> = DEFAULT_EPIC_FIELDS.iter().map(|f| f.to_string()).collect();
        let mut report = Report::new();
        for validator in &self.validators {
            let invalid = validator.validate(&items, &return_fields)?;
            if !invalid.is_empty() {
                report.record(validator.message(), invalid);
            }
        }

        info!(
            scope = %self.scope,
            status = %self.status,
            items = items.len(),
            violations = report.violation_count(),
            "evaluated kanban column"
        );
        Ok(report)
    }

    /// [`evaluate`](Self::evaluate), returning the report as a JSON string.
    pub async fn evaluate_json(&self, backend: &dyn Backend) -> Result<String> {
        Ok(self.evaluate(backend).await?.to_json()?)
    }
}
