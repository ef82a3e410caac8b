//! Query descriptions against the epic collection.
//!
//! A [`Query`] is plain data: the asset type, the projected attributes and
//! the equality filters. Nothing is sent until it is handed to a
//! [`Backend`](crate::backend::Backend).

use crate::backend::Backend;
use crate::error::Result;
use crate::schema::DEFAULT_EPIC_FIELDS;
use crate::types::{Item, Oid};
use indexmap::{IndexMap, IndexSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    asset_type: String,
    select: IndexSet<String>,
    filters: IndexMap<String, Oid>,
}

impl Query {
    /// Epics matching every filter, selecting the default epic attributes,
    /// the filter keys and `extra_fields`.
    pub fn epics<I, S>(extra_fields: I, filters: IndexMap<String, Oid>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let select = DEFAULT_EPIC_FIELDS
            .iter()
            .map(|f| f.to_string())
            .chain(filters.keys().cloned())
            .chain(extra_fields.into_iter().map(Into::into))
            .collect();
        Self {
            asset_type: "Epic".to_string(),
            select,
            filters,
        }
    }

    pub fn asset_type(&self) -> &str {
        &self.asset_type
    }

    pub fn select(&self) -> impl Iterator<Item = &str> {
        self.select.iter().map(String::as_str)
    }

    pub fn selects(&self, field: &str) -> bool {
        self.select.contains(field)
    }

    pub fn filters(&self) -> impl Iterator<Item = (&str, &Oid)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Materialize the query.
    pub async fn fetch(&self, backend: &dyn Backend) -> Result<Vec<Item>> {
        backend.query(self).await
    }
}
