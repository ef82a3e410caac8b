//! Declarative field checks for VersionOne epics
//!
//! This crate checks the epics sitting in a given scope and workflow status
//! against simple field rules ("Owners must not be empty") and reports the
//! offenders as JSON, one line per rule.
//!
//! ## Overview
//!
//! - **Declarative rules** - A [`RuleSet`] lists (scope, status, validations)
//!   triples, loaded from YAML or JSON and checked before any request is sent
//! - **Minimal fetches** - Each rule issues a single epic query selecting only
//!   the default attributes plus what its validators read
//! - **Pluggable backends** - [`VersionOneBackend`] for a live instance,
//!   [`MemoryBackend`] for snapshots and tests
//! - **Streaming output** - [`RuleSetRunner`] writes and flushes one JSON
//!   object per rule
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use swissarmyhammer_epic_audit::{RuleSet, RuleSetRunner, VersionOneBackend};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let rules = RuleSet::builtin()?;
//! let backend = VersionOneBackend::new("https://www1.v1host.com/Acme", "token", rules.schema());
//!
//! let mut stdout = std::io::stdout();
//! RuleSetRunner::new(&rules).run(&backend, &mut stdout).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Output
//!
//! ```text
//! {"scope":"B1Platform - ART","status":"Funnel","results":{"Owners is empty":[{"Name":"Search","Number":"E-01042","Category":"Feature"}]}}
//! ```

pub mod backend;
mod error;
pub mod kanban_status;
pub mod query;
pub mod report;
pub mod rules;
pub mod runner;
pub mod schema;
pub mod serialize;
pub mod types;
pub mod validator;

pub use backend::{Backend, LookupKind, MemoryBackend, VersionOneBackend};
pub use error::{AuditError, BackendError, Result};
pub use kanban_status::KanbanStatus;
pub use query::Query;
pub use report::Report;
pub use rules::{Rule, RuleSet};
pub use runner::{LookupMissPolicy, RuleOutcome, RuleSetRunner, RunSummary};
pub use schema::{EntitySchema, FieldKind, DEFAULT_EPIC_FIELDS, DEFAULT_ITEM_FIELDS};
pub use types::{AttributeValue, EntityKind, Item, Oid};
pub use validator::{NotEmptyValidator, Validator, ValidatorKind};
