//! In-memory backend

use super::{Backend, LookupKind};
use crate::error::{AuditError, BackendError, Result};
use crate::query::Query;
use crate::types::{Item, Oid};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;

/// Snapshot file layout: entities in VersionOne wire form.
#[derive(Debug, Default, Deserialize)]
struct Snapshot {
    #[serde(default)]
    scopes: Vec<Value>,
    #[serde(default)]
    statuses: Vec<Value>,
    #[serde(default)]
    epics: Vec<Value>,
}

/// Backend answering lookups and queries from memory.
///
/// Queries apply the equality filters against the epics' reference
/// attributes and project each match down to the selected attributes, so a
/// field the query did not select is absent on the returned item.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    scopes: Vec<(String, Oid)>,
    statuses: Vec<(String, Oid)>,
    epics: Vec<Item>,
    queries: Mutex<Vec<Query>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(mut self, name: impl Into<String>, oid: impl Into<Oid>) -> Self {
        self.scopes.push((name.into(), oid.into()));
        self
    }

    pub fn with_status(mut self, name: impl Into<String>, oid: impl Into<Oid>) -> Self {
        self.statuses.push((name.into(), oid.into()));
        self
    }

    pub fn with_epic(mut self, epic: Item) -> Self {
        self.epics.push(epic);
        self
    }

    /// Build a backend from a snapshot document.
    pub fn from_snapshot(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        let named = |values: &[Value]| -> Result<Vec<(String, Oid)>> {
            values
                .iter()
                .map(|value| -> Result<(String, Oid)> {
                    let item = Item::from_wire(value)?;
                    let name = item
                        .name()
                        .ok_or_else(|| AuditError::missing_attribute(item.oid(), "Name"))?
                        .to_string();
                    Ok((name, item.oid().clone()))
                })
                .collect()
        };

        Ok(Self {
            scopes: named(&snapshot.scopes)?,
            statuses: named(&snapshot.statuses)?,
            epics: snapshot
                .epics
                .iter()
                .map(Item::from_wire)
                .collect::<std::result::Result<_, BackendError>>()?,
            queries: Mutex::new(Vec::new()),
        })
    }

    /// Load a snapshot file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading backend snapshot");
        let json = std::fs::read_to_string(path)?;
        Self::from_snapshot(&json)
    }

    /// Every query answered so far, oldest first.
    pub fn queries(&self) -> Vec<Query> {
        self.queries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn lookup(&self, kind: LookupKind, name: &str) -> Result<Option<Oid>> {
        let entities = match kind {
            LookupKind::Scope => &self.scopes,
            LookupKind::Status => &self.statuses,
        };
        Ok(entities
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, oid)| oid.clone()))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Item>> {
        self.queries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(query.clone());

        Ok(self
            .epics
            .iter()
            .filter(|epic| epic.oid().asset_type() == query.asset_type())
            .filter(|epic| {
                query.filters().all(|(field, oid)| {
                    epic.attribute(field)
                        .map(|value| value.refers_to(oid))
                        .unwrap_or(false)
                })
            })
            .map(|epic| epic.project(query.select()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributeValue;
    use indexmap::IndexMap;
    use std::io::Write;

    const SNAPSHOT: &str = r#"{
        "scopes": [{"_oid": "Scope:1", "Name": "B1Platform - ART"}],
        "statuses": [
            {"_oid": "EpicStatus:10", "Name": "Funnel"},
            {"_oid": "EpicStatus:11", "Name": "Funnel"}
        ],
        "epics": [
            {
                "_oid": "Epic:100",
                "Name": "Search",
                "Number": "E-100",
                "Category": {"_oid": "EpicCategory:1", "Name": "Feature"},
                "Scope": {"_oid": "Scope:1", "Name": "B1Platform - ART"},
                "Status": {"_oid": "EpicStatus:10", "Name": "Funnel"},
                "Wsjf": "4"
            },
            {
                "_oid": "Epic:101",
                "Name": "Billing",
                "Number": "E-101",
                "Category": null,
                "Scope": {"_oid": "Scope:2", "Name": "Other"},
                "Status": {"_oid": "EpicStatus:10", "Name": "Funnel"}
            }
        ]
    }"#;

    fn filters(scope: &str, status: &str) -> IndexMap<String, Oid> {
        IndexMap::from([
            ("Scope".to_string(), Oid::from(scope)),
            ("Status".to_string(), Oid::from(status)),
        ])
    }

    #[tokio::test]
    async fn test_lookup_first_match_wins() {
        let backend = MemoryBackend::from_snapshot(SNAPSHOT).unwrap();
        assert_eq!(
            backend.lookup(LookupKind::Status, "Funnel").await.unwrap(),
            Some(Oid::from("EpicStatus:10"))
        );
        assert_eq!(
            backend.lookup(LookupKind::Scope, "b1platform - art").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_query_filters_and_projects() {
        let backend = MemoryBackend::from_snapshot(SNAPSHOT).unwrap();
        let query = Query::epics(Vec::<String>::new(), filters("Scope:1", "EpicStatus:10"));
        let items = backend.query(&query).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].oid().as_str(), "Epic:100");
        assert!(items[0].attribute("Wsjf").is_none());
        assert!(items[0].attribute("Scope").is_some());
        assert_eq!(backend.queries(), vec![query]);
    }

    #[tokio::test]
    async fn test_query_selects_extra_fields() {
        let backend = MemoryBackend::from_snapshot(SNAPSHOT).unwrap();
        let query = Query::epics(["Wsjf"], filters("Scope:1", "EpicStatus:10"));
        let items = query.fetch(&backend).await.unwrap();
        assert_eq!(items[0].attribute("Wsjf"), Some(&AttributeValue::text("4")));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SNAPSHOT.as_bytes()).unwrap();
        let backend = MemoryBackend::load(file.path()).unwrap();
        assert_eq!(backend.epics.len(), 2);
        assert_eq!(backend.scopes[0].0, "B1Platform - ART");
    }

    #[test]
    fn test_snapshot_entity_without_name() {
        let err = MemoryBackend::from_snapshot(r#"{"scopes": [{"_oid": "Scope:1"}]}"#).unwrap_err();
        assert!(matches!(err, AuditError::MissingAttribute { .. }));
    }
}
