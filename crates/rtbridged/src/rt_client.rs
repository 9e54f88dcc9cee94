//! RT REST 2.0 client.
//!
//! Thin, stateless wrapper over reqwest: every method is one request,
//! errors are mapped to the `BridgeError` taxonomy, nothing is cached.

use crate::gateway::{AssetRecord, FieldMap, Gateway, TicketRecord};
use crate::query;
use async_trait::async_trait;
use rtbridge_common::BridgeError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Request timeout for all RT calls.
const HTTP_TIMEOUT_SECS: u64 = 30;

pub struct RtClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

/// Search responses wrap their hits in an `items` array.
#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<Value>,
}

/// Full asset bodies carry custom fields as a list of name/values pairs.
#[derive(Debug, Deserialize)]
struct AssetBody {
    #[serde(rename = "CustomFields", default)]
    custom_fields: Vec<CustomField>,
}

#[derive(Debug, Deserialize)]
struct CustomField {
    #[serde(default)]
    name: String,
    #[serde(default)]
    values: Vec<String>,
}

/// RT serializes ids as strings in some payloads and numbers in others.
fn parse_id(value: &Value) -> Option<u64> {
    match value.get("id") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}

impl RtClient {
    pub fn new(url: &str, token: &str) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| BridgeError::Connection(e.to_string()))?;

        Ok(Self {
            http,
            base_url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/REST/2.0/{path}", self.base_url)
    }

    fn auth_header(&self) -> String {
        format!("token {}", self.token)
    }

    /// Map status codes onto the error taxonomy; 2xx passes through.
    async fn check(
        response: reqwest::Response,
        what: &str,
    ) -> Result<reqwest::Response, BridgeError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(BridgeError::Auth(format!("{what}: HTTP {status}")));
        }
        let body = response.text().await.unwrap_or_default();
        Err(BridgeError::Api {
            status: status.as_u16(),
            message: format!("{what}: {body}"),
        })
    }

    async fn search(&self, path: &str, ticketsql: &str) -> Result<Vec<Value>, BridgeError> {
        let response = self
            .http
            .get(self.endpoint(path))
            .header("Authorization", self.auth_header())
            .query(&[("query", ticketsql)])
            .send()
            .await
            .map_err(|e| BridgeError::Connection(e.to_string()))?;
        let page: SearchPage = Self::check(response, "search")
            .await?
            .json()
            .await
            .map_err(|e| BridgeError::Connection(e.to_string()))?;
        Ok(page.items)
    }

    async fn post_json(&self, path: &str, payload: Value, what: &str) -> Result<Value, BridgeError> {
        let response = self
            .http
            .post(self.endpoint(path))
            .header("Authorization", self.auth_header())
            .json(&payload)
            .send()
            .await
            .map_err(|e| BridgeError::Connection(e.to_string()))?;
        Self::check(response, what)
            .await?
            .json()
            .await
            .map_err(|e| BridgeError::Connection(e.to_string()))
    }

    async fn put_json(&self, path: &str, payload: Value, what: &str) -> Result<(), BridgeError> {
        let response = self
            .http
            .put(self.endpoint(path))
            .header("Authorization", self.auth_header())
            .json(&payload)
            .send()
            .await
            .map_err(|e| BridgeError::Connection(e.to_string()))?;
        Self::check(response, what).await?;
        Ok(())
    }
}

#[async_trait]
impl Gateway for RtClient {
    async fn search_tickets(
        &self,
        queue: &str,
        device_id: &str,
    ) -> Result<Vec<TicketRecord>, BridgeError> {
        let items = self
            .search("tickets", &query::open_ticket_query(queue, device_id))
            .await?;
        let mut tickets: Vec<TicketRecord> = items
            .iter()
            .filter_map(|item| {
                Some(TicketRecord {
                    id: parse_id(item)?,
                    status: item
                        .get("Status")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
            })
            .collect();
        // Remote ordering is unspecified; sort so "first" is deterministic.
        tickets.sort_by_key(|t| t.id);
        Ok(tickets)
    }

    async fn create_ticket(
        &self,
        queue: &str,
        subject: &str,
        content: &str,
        custom_fields: &FieldMap,
    ) -> Result<TicketRecord, BridgeError> {
        let payload = json!({
            "Queue": queue,
            "Subject": subject,
            "Content": content,
            "ContentType": "text/plain",
            "CustomFields": custom_fields,
        });
        let body = self.post_json("ticket", payload, "create ticket").await?;
        let id = parse_id(&body).ok_or_else(|| BridgeError::Api {
            status: 200,
            message: "create ticket: response without id".to_string(),
        })?;
        debug!("created ticket {id} in queue {queue}");
        Ok(TicketRecord {
            id,
            status: "new".to_string(),
        })
    }

    async fn add_comment(&self, ticket_id: u64, text: &str) -> Result<(), BridgeError> {
        let response = self
            .http
            .post(self.endpoint(&format!("ticket/{ticket_id}/comment")))
            .header("Authorization", self.auth_header())
            .header("Content-Type", "text/plain")
            .body(text.to_string())
            .send()
            .await
            .map_err(|e| BridgeError::Connection(e.to_string()))?;
        Self::check(response, "add comment").await?;
        Ok(())
    }

    async fn search_asset(
        &self,
        catalog: &str,
        device_id: &str,
    ) -> Result<Option<AssetRecord>, BridgeError> {
        let items = self
            .search("assets", &query::asset_query(catalog, device_id))
            .await?;
        Ok(items.first().and_then(parse_id).map(|id| AssetRecord { id }))
    }

    async fn create_asset(
        &self,
        catalog: &str,
        name: &str,
        custom_fields: &FieldMap,
    ) -> Result<AssetRecord, BridgeError> {
        let payload = json!({
            "Name": name,
            "Catalog": catalog,
            "CustomFields": custom_fields,
        });
        let body = self.post_json("asset", payload, "create asset").await?;
        let id = parse_id(&body).ok_or_else(|| BridgeError::Api {
            status: 200,
            message: "create asset: response without id".to_string(),
        })?;
        debug!("created asset {id} in catalog {catalog}");
        Ok(AssetRecord { id })
    }

    async fn update_asset(
        &self,
        asset_id: u64,
        name: &str,
        custom_fields: &FieldMap,
    ) -> Result<(), BridgeError> {
        let payload = json!({
            "Name": name,
            "CustomFields": custom_fields,
        });
        self.put_json(&format!("asset/{asset_id}"), payload, "update asset")
            .await
    }

    async fn retire_asset(&self, asset_id: u64) -> Result<(), BridgeError> {
        self.put_json(
            &format!("asset/{asset_id}"),
            json!({ "Status": "deleted" }),
            "retire asset",
        )
        .await
    }

    async fn link_ticket_to_asset(
        &self,
        ticket_id: u64,
        asset_id: u64,
    ) -> Result<(), BridgeError> {
        self.put_json(
            &format!("ticket/{ticket_id}"),
            json!({ "RefersTo": format!("asset:{asset_id}") }),
            "link ticket",
        )
        .await
    }

    async fn list_assets(&self, catalog: &str) -> Result<Vec<AssetRecord>, BridgeError> {
        let items = self
            .search("assets", &query::active_assets_query(catalog))
            .await?;
        Ok(items
            .iter()
            .filter_map(parse_id)
            .map(|id| AssetRecord { id })
            .collect())
    }

    async fn asset_device_id(&self, asset_id: u64) -> Result<Option<String>, BridgeError> {
        let response = self
            .http
            .get(self.endpoint(&format!("asset/{asset_id}")))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| BridgeError::Connection(e.to_string()))?;
        let body: AssetBody = Self::check(response, "get asset")
            .await?
            .json()
            .await
            .map_err(|e| BridgeError::Connection(e.to_string()))?;
        Ok(body
            .custom_fields
            .into_iter()
            .find(|cf| cf.name == query::DEVICE_ID_FIELD)
            .and_then(|cf| cf.values.into_iter().next())
            .filter(|v| !v.is_empty()))
    }

    fn ticket_url(&self, ticket_id: u64) -> String {
        format!("{}/Ticket/Display.html?id={ticket_id}", self.base_url)
    }

    async fn test_connection(&self) -> Result<(), BridgeError> {
        let response = self
            .http
            .get(self.endpoint("rt"))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| BridgeError::Connection(e.to_string()))?;
        Self::check(response, "connection test").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_accepts_string_and_number() {
        assert_eq!(parse_id(&json!({"id": 42})), Some(42));
        assert_eq!(parse_id(&json!({"id": "42"})), Some(42));
        assert_eq!(parse_id(&json!({"id": "x"})), None);
        assert_eq!(parse_id(&json!({})), None);
    }

    #[test]
    fn test_ticket_url() {
        let client = RtClient::new("https://rt.example.org/", "secret").unwrap();
        assert_eq!(
            client.ticket_url(77),
            "https://rt.example.org/Ticket/Display.html?id=77"
        );
    }

    #[test]
    fn test_search_page_parses_items() {
        let page: SearchPage =
            serde_json::from_str(r#"{"total": 2, "items": [{"id": "9"}, {"id": "4"}]}"#).unwrap();
        assert_eq!(page.items.len(), 2);
    }

    #[test]
    fn test_asset_body_extracts_custom_fields() {
        let body: AssetBody = serde_json::from_str(
            r#"{"CustomFields": [{"name": "DeviceId", "values": ["dev-7"]}]}"#,
        )
        .unwrap();
        assert_eq!(body.custom_fields[0].values[0], "dev-7");
    }
}
