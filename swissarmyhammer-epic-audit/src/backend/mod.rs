//! Backend capabilities consumed by the audit.
//!
//! # Backends
//!
//! ## MemoryBackend
//!
//! Scopes, statuses and epics held in memory, optionally loaded from a JSON
//! snapshot. Records every query it answers. Used for tests and offline runs.
//!
//! ## VersionOneBackend
//!
//! Talks to the VersionOne `query.v1` endpoint over HTTPS with a bearer token.

use crate::error::Result;
use crate::query::Query;
use crate::types::{Item, Oid};
use async_trait::async_trait;

mod memory;
mod version_one;

pub use memory::MemoryBackend;
pub use version_one::VersionOneBackend;

/// Named reference entities resolved before querying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Scope,
    /// Epic statuses. Resolved across all workflows, not per scope.
    Status,
}

impl LookupKind {
    pub fn asset_type(&self) -> &'static str {
        match self {
            LookupKind::Scope => "Scope",
            LookupKind::Status => "EpicStatus",
        }
    }
}

/// Read-only access to the project-tracking backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Identifier of the first entity of `kind` named exactly `name`.
    async fn lookup(&self, kind: LookupKind, name: &str) -> Result<Option<Oid>>;

    /// Run a query and return the matching items with the selected attributes.
    async fn query(&self, query: &Query) -> Result<Vec<Item>>;
}
