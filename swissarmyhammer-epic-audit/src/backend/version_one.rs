//! HTTP backend for the VersionOne `query.v1` API.

use super::{Backend, LookupKind};
use crate::error::{BackendError, Result};
use crate::query::Query;
use crate::schema::{default_fields, EntitySchema, FieldKind};
use crate::types::{AttributeValue, EntityKind, Item, Oid, OID_KEY};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, instrument};

/// Extract a human-readable message from an error body.
fn extract_error_description(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["error_description", "message", "error"] {
            if let Some(msg) = json.get(key).and_then(Value::as_str) {
                return msg.to_string();
            }
        }
    }
    body.to_string()
}

/// Client for a VersionOne instance.
#[derive(Debug, Clone)]
pub struct VersionOneBackend {
    client: Client,
    endpoint: String,
    token: String,
    schema: EntitySchema,
}

impl VersionOneBackend {
    /// `endpoint` is the instance URL, e.g. `https://www1.v1host.com/Acme`.
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>, schema: EntitySchema) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token: token.into(),
            schema,
        }
    }

    fn query_url(&self) -> String {
        format!("{}/query.v1", self.endpoint)
    }

    async fn check_response(
        &self,
        response: reqwest::Response,
    ) -> std::result::Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let status_code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_description(&body);

        match status_code {
            401 => Err(BackendError::Unauthorized(message)),
            404 => Err(BackendError::NotFound(message)),
            _ => Err(BackendError::Api {
                status: status_code,
                body: message,
            }),
        }
    }

    /// Post one query and return the rows of its single result set.
    async fn post(&self, body: &Value) -> std::result::Result<Vec<Value>, BackendError> {
        debug!(body = %body, "posting query.v1 request");
        let response = self
            .client
            .post(self.query_url())
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;
        let response = self.check_response(response).await?;
        let result_sets: Vec<Vec<Value>> = response
            .json()
            .await
            .map_err(|e| BackendError::decode(e.to_string()))?;
        Ok(result_sets.into_iter().next().unwrap_or_default())
    }

    /// Select clause for one attribute. Relations become sub-selects of the
    /// target kind's default attributes so they can be serialized later.
    fn select_clause(&self, field: &str) -> Value {
        match self.schema.field(field).and_then(|kind| kind.target()) {
            Some(target) => json!({ "from": field, "select": self.default_select(target) }),
            None => Value::String(field.to_string()),
        }
    }

    fn default_select(&self, kind: EntityKind) -> Vec<Value> {
        default_fields(kind)
            .iter()
            .map(|field| match kind {
                EntityKind::Epic => self.select_clause(field),
                EntityKind::Person | EntityKind::Generic => Value::String(field.to_string()),
            })
            .collect()
    }

    /// Sub-selects come back as arrays even for single-value relations.
    fn normalize(&self, item: Item) -> Item {
        let mut normalized = Item::new(item.oid().clone());
        for (name, value) in item.attributes() {
            let value = match self.schema.field(name) {
                Some(FieldKind::Reference(kind)) => self.single(value.clone(), kind),
                Some(FieldKind::List(EntityKind::Epic)) => match value {
                    AttributeValue::List(values) => AttributeValue::List(
                        values
                            .iter()
                            .map(|v| self.single(v.clone(), EntityKind::Epic))
                            .collect(),
                    ),
                    other => other.clone(),
                },
                _ => value.clone(),
            };
            normalized.set(name, value);
        }
        normalized
    }

    fn single(&self, value: AttributeValue, kind: EntityKind) -> AttributeValue {
        let value = match value {
            AttributeValue::List(values) => values.into_iter().next().unwrap_or(AttributeValue::Null),
            other => other,
        };
        match value {
            AttributeValue::Reference(target) if kind == EntityKind::Epic => {
                AttributeValue::reference(self.normalize(*target))
            }
            other => other,
        }
    }
}

#[async_trait]
impl Backend for VersionOneBackend {
    #[instrument(skip(self))]
    async fn lookup(&self, kind: LookupKind, name: &str) -> Result<Option<Oid>> {
        let body = json!({
            "from": kind.asset_type(),
            "select": ["Name"],
            "where": { "Name": name },
        });
        let rows = self.post(&body).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get(OID_KEY))
            .and_then(Value::as_str)
            .map(Oid::from))
    }

    #[instrument(skip(self, query), fields(asset_type = %query.asset_type()))]
    async fn query(&self, query: &Query) -> Result<Vec<Item>> {
        let select: Vec<Value> = query.select().map(|f| self.select_clause(f)).collect();
        let filters: serde_json::Map<String, Value> = query
            .filters()
            .map(|(field, oid)| (field.to_string(), Value::String(oid.to_string())))
            .collect();
        let body = json!({
            "from": query.asset_type(),
            "select": select,
            "where": filters,
        });

        let rows = self.post(&body).await?;
        debug!(rows = rows.len(), "query.v1 returned");
        rows.iter()
            .map(|row| -> Result<Item> { Ok(self.normalize(Item::from_wire(row)?)) })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuditError;
    use indexmap::IndexMap;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> VersionOneBackend {
        VersionOneBackend::new(format!("{}/", server.uri()), "secret", EntitySchema::epic())
    }

    #[test]
    fn test_custom_epic_relation_selects_epic_defaults() {
        let rules = crate::rules::RuleSet::from_json(
            r#"{"fields": {"Custom_Parent": {"reference": "epic"}}, "rules": []}"#,
        )
        .unwrap();
        let backend = VersionOneBackend::new("https://v1.example.com", "secret", rules.schema());
        assert_eq!(
            backend.select_clause("Custom_Parent"),
            json!({
                "from": "Custom_Parent",
                "select": ["Name", "Number", {"from": "Category", "select": ["Name"]}]
            })
        );
    }

    #[tokio::test]
    async fn test_lookup_scope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query.v1"))
            .and(header("Authorization", "Bearer secret"))
            .and(body_partial_json(json!({"from": "Scope", "where": {"Name": "B1Platform - ART"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([[
                {"_oid": "Scope:1005", "Name": "B1Platform - ART"},
                {"_oid": "Scope:1006", "Name": "B1Platform - ART"}
            ]])))
            .mount(&server)
            .await;

        let oid = backend(&server)
            .lookup(LookupKind::Scope, "B1Platform - ART")
            .await
            .unwrap();
        assert_eq!(oid, Some(Oid::from("Scope:1005")));
    }

    #[tokio::test]
    async fn test_lookup_status_miss() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"from": "EpicStatus"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([[]])))
            .mount(&server)
            .await;

        let oid = backend(&server).lookup(LookupKind::Status, "Nope").await.unwrap();
        assert_eq!(oid, None);
    }

    #[tokio::test]
    async fn test_query_sends_subselects_and_normalizes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query.v1"))
            .and(body_partial_json(json!({
                "from": "Epic",
                "select": [
                    "Name",
                    "Number",
                    {"from": "Category", "select": ["Name"]},
                    {"from": "Scope", "select": ["Name"]},
                    {"from": "Status", "select": ["Name"]},
                    {"from": "Owners", "select": ["Name"]}
                ],
                "where": {"Scope": "Scope:1005", "Status": "EpicStatus:1"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([[{
                "_oid": "Epic:42",
                "Name": "Search",
                "Number": "E-42",
                "Category": [{"_oid": "EpicCategory:1", "Name": "Feature"}],
                "Scope": [{"_oid": "Scope:1005", "Name": "B1Platform - ART"}],
                "Status": [{"_oid": "EpicStatus:1", "Name": "Funnel"}],
                "Owners": []
            }]])))
            .mount(&server)
            .await;

        let query = Query::epics(
            ["Owners"],
            IndexMap::from([
                ("Scope".to_string(), Oid::from("Scope:1005")),
                ("Status".to_string(), Oid::from("EpicStatus:1")),
            ]),
        );
        let items = backend(&server).query(&query).await.unwrap();

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.attribute("Owners"), Some(&AttributeValue::List(vec![])));
        match item.attribute("Category") {
            Some(AttributeValue::Reference(category)) => assert_eq!(category.name(), Some("Feature")),
            other => panic!("expected a single reference, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_single_relation_becomes_null() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([[{
                "_oid": "Epic:42",
                "Name": "Search",
                "Number": "E-42",
                "Category": []
            }]])))
            .mount(&server)
            .await;

        let query = Query::epics(Vec::<String>::new(), IndexMap::new());
        let items = backend(&server).query(&query).await.unwrap();
        assert_eq!(items[0].attribute("Category"), Some(&AttributeValue::Null));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid token"})),
            )
            .mount(&server)
            .await;

        let err = backend(&server)
            .lookup(LookupKind::Scope, "S")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuditError::Backend(BackendError::Unauthorized(ref msg)) if msg == "Invalid token"
        ));
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = backend(&server)
            .lookup(LookupKind::Scope, "S")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "API error (503): maintenance");
    }

    #[test]
    fn test_select_clause_for_epic_relation() {
        let backend = VersionOneBackend::new("http://v1", "t", EntitySchema::epic());
        assert_eq!(
            backend.select_clause("Super"),
            json!({"from": "Super", "select": [
                "Name",
                "Number",
                {"from": "Category", "select": ["Name"]}
            ]})
        );
        assert_eq!(backend.select_clause("Wsjf"), json!("Wsjf"));
    }

    #[test]
    fn test_extract_error_description() {
        assert_eq!(extract_error_description(r#"{"message": "bad"}"#), "bad");
        assert_eq!(extract_error_description("plain"), "plain");
    }
}
