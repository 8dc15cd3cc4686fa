//! Warranty lookup against the Dell asset-warranty endpoint.

use crate::config::{ApiConfig, HttpMethod};
use crate::domain::model::{ServiceProvider, WarrantyEntry};
use crate::domain::ports::WarrantyLookup;
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub struct DellWarrantyClient {
    client: Client,
    config: ApiConfig,
}

impl DellWarrantyClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl WarrantyLookup for DellWarrantyClient {
    async fn lookup(&self, serial_number: &str) -> Result<Vec<WarrantyEntry>> {
        let mut params = vec![(self.config.service_tag_param.as_str(), serial_number)];
        if let Some(api_key) = &self.config.api_key {
            params.push((self.config.api_key_param.as_str(), api_key.as_str()));
        }

        let mut request = match self.config.method {
            HttpMethod::Get => self.client.get(&self.config.endpoint).query(&params),
            HttpMethod::Post => self.client.post(&self.config.endpoint).form(&params),
        };
        for (key, value) in &self.config.headers {
            request = request.header(key, value);
        }

        tracing::debug!("Looking up warranty for {}", serial_number);
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("Warranty API response status for {}: {}", serial_number, status);

        if !status.is_success() {
            return Err(SyncError::LookupStatusError {
                serial_number: serial_number.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_warranty_response(&body)
    }
}

/// Extracts the warranty entries from a lookup response body.
///
/// Walks `…WarrantyResponse → …WarrantyResult → Response → DellAsset →
/// Warranties → Warranty`. A missing or null `Response`, `DellAsset`,
/// `Warranties` or `Warranty` means the vendor has nothing on file and yields
/// no entries. A single `Warranty` object is treated as a one-element list.
/// Entries without an item number or a readable end date are dropped.
pub fn parse_warranty_response(body: &str) -> Result<Vec<WarrantyEntry>> {
    let root: Value = serde_json::from_str(body)?;

    let result = field(&root, &["GetAssetWarrantyResponse", "AssetWarrantyResponse"])
        .and_then(|envelope| field(envelope, &["GetAssetWarrantyResult", "AssetWarrantyResult"]))
        .ok_or_else(|| SyncError::MalformedResponseError {
            message: "missing AssetWarrantyResponse/AssetWarrantyResult envelope".to_string(),
        })?;

    let Some(response) = field(result, &["Response"]) else {
        return Ok(Vec::new());
    };

    let asset = match field(response, &["DellAsset"]) {
        Some(Value::Array(assets)) => assets.first(),
        other => other,
    };
    let warranty = asset
        .and_then(|asset| field(asset, &["Warranties"]))
        .and_then(|warranties| field(warranties, &["Warranty"]));

    let raw_entries: Vec<&Value> = match warranty {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item) => vec![item],
    };

    let mut entries = Vec::with_capacity(raw_entries.len());
    for (index, raw) in raw_entries.into_iter().enumerate() {
        match parse_entry(raw) {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::warn!("Skipping warranty entry #{}: {}", index, e),
        }
    }
    Ok(entries)
}

/// First non-null value under any of `names`.
fn field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| value.get(name))
        .find(|v| !v.is_null())
}

fn scalar_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn classify_provider(value: Option<&Value>) -> ServiceProvider {
    match value {
        None | Some(Value::Null) => ServiceProvider::Absent,
        Some(Value::Object(_)) | Some(Value::Array(_)) => ServiceProvider::NonScalar,
        Some(other) => scalar_text(Some(other))
            .map(ServiceProvider::Text)
            .unwrap_or(ServiceProvider::Absent),
    }
}

fn parse_entry(raw: &Value) -> Result<WarrantyEntry> {
    let item_number = scalar_text(raw.get("ItemNumber"))
        .filter(|item| !item.trim().is_empty())
        .ok_or_else(|| SyncError::InvalidEntryError {
            message: "missing ItemNumber".to_string(),
        })?;

    let end_raw = scalar_text(raw.get("EndDate")).ok_or_else(|| SyncError::InvalidEntryError {
        message: format!("{}: missing EndDate", item_number),
    })?;
    let end_date = parse_api_date(&end_raw).ok_or_else(|| SyncError::InvalidEntryError {
        message: format!("{}: unreadable EndDate {:?}", item_number, end_raw),
    })?;

    Ok(WarrantyEntry {
        entitlement_type: scalar_text(raw.get("EntitlementType")),
        service_provider: classify_provider(raw.get("ServiceProvider")),
        service_level_group: scalar_text(raw.get("ServiceLevelGroup")),
        service_level_description: scalar_text(raw.get("ServiceLevelDescription")),
        service_level_code: scalar_text(raw.get("ServiceLevelCode")),
        start_date: scalar_text(raw.get("StartDate")).and_then(|s| parse_api_date(&s)),
        end_date,
        item_number,
    })
}

/// Accepts RFC 3339, or an offset-less timestamp or plain date read as UTC.
pub fn parse_api_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use httpmock::prelude::*;
    use std::collections::HashMap;

    fn api_config(endpoint: String) -> ApiConfig {
        ApiConfig {
            endpoint,
            api_key: Some("test-key".to_string()),
            method: HttpMethod::Get,
            service_tag_param: "svctags".to_string(),
            api_key_param: "apikey".to_string(),
            timeout_seconds: 5,
            headers: HashMap::new(),
        }
    }

    fn body_with_warranty(warranty: Value) -> Value {
        serde_json::json!({
            "GetAssetWarrantyResponse": {
                "GetAssetWarrantyResult": {
                    "Faults": null,
                    "Response": {
                        "DellAsset": {
                            "ServiceTag": "ABC123",
                            "Warranties": { "Warranty": warranty }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_parse_warranty_array() {
        let body = body_with_warranty(serde_json::json!([
            {
                "EndDate": "2027-06-14T23:59:59",
                "EntitlementType": "INITIAL",
                "ItemNumber": "IT-1",
                "ServiceLevelCode": "ND",
                "ServiceLevelDescription": "Next Business Day",
                "ServiceLevelGroup": 5,
                "ServiceProvider": "UNY",
                "StartDate": "2024-06-14T00:00:00"
            },
            {
                "EndDate": "2025-06-14T23:59:59",
                "EntitlementType": "EXTENDED",
                "ItemNumber": "IT-2",
                "ServiceLevelCode": "4H",
                "ServiceLevelDescription": "4 Hour On-Site",
                "ServiceLevelGroup": 8,
                "ServiceProvider": {},
                "StartDate": "2024-06-14T00:00:00"
            }
        ]));

        let entries = parse_warranty_response(&body.to_string()).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].item_number, "IT-1");
        assert_eq!(
            entries[0].service_provider,
            ServiceProvider::Text("UNY".to_string())
        );
        assert_eq!(entries[0].service_level_group.as_deref(), Some("5"));
        assert_eq!(
            entries[0].end_date,
            Utc.with_ymd_and_hms(2027, 6, 14, 23, 59, 59).unwrap()
        );
        assert_eq!(entries[1].item_number, "IT-2");
        assert_eq!(entries[1].service_provider, ServiceProvider::NonScalar);
    }

    #[test]
    fn test_parse_single_warranty_object() {
        let body = body_with_warranty(serde_json::json!({
            "ItemNumber": "IT-1",
            "EndDate": "2027-01-01",
            "ServiceProvider": "Dell"
        }));

        let entries = parse_warranty_response(&body.to_string()).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].service_provider,
            ServiceProvider::Text("Dell".to_string())
        );
        assert_eq!(entries[0].start_date, None);
    }

    #[test]
    fn test_parse_absent_response_yields_nothing() {
        let body = serde_json::json!({
            "AssetWarrantyResponse": {
                "AssetWarrantyResult": { "Faults": { "FaultException": { "Code": 4001 } } }
            }
        });
        assert!(parse_warranty_response(&body.to_string()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_null_warranty_yields_nothing() {
        let body = body_with_warranty(Value::Null);
        assert!(parse_warranty_response(&body.to_string()).unwrap().is_empty());
    }

    #[test]
    fn test_parse_drops_entries_without_key_or_end_date() {
        let body = body_with_warranty(serde_json::json!([
            { "EndDate": "2027-01-01" },
            { "ItemNumber": "IT-2" },
            { "ItemNumber": "IT-3", "EndDate": "not a date" },
            { "ItemNumber": "IT-4", "EndDate": "2027-01-01T00:00:00Z" }
        ]));

        let entries = parse_warranty_response(&body.to_string()).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].item_number, "IT-4");
    }

    #[test]
    fn test_parse_rejects_malformed_bodies() {
        assert!(parse_warranty_response("<html>busy</html>").is_err());
        assert!(matches!(
            parse_warranty_response(r#"{"unexpected": true}"#),
            Err(SyncError::MalformedResponseError { .. })
        ));
    }

    #[test]
    fn test_parse_api_date_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(parse_api_date("2026-03-04T05:06:07"), Some(expected));
        assert_eq!(parse_api_date("2026-03-04T05:06:07Z"), Some(expected));
        assert_eq!(parse_api_date("2026-03-04T07:06:07+02:00"), Some(expected));
        assert_eq!(parse_api_date("2026-03-04 05:06:07"), Some(expected));
        assert_eq!(
            parse_api_date("2026-03-04"),
            Some(Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_api_date("04/03/2026"), None);
    }

    #[tokio::test]
    async fn test_lookup_sends_service_tag_and_key() {
        let server = MockServer::start();
        let body = body_with_warranty(serde_json::json!({
            "ItemNumber": "IT-1",
            "EndDate": "2027-01-01T00:00:00"
        }));

        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/warranty")
                .query_param("svctags", "ABC123")
                .query_param("apikey", "test-key");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(body);
        });

        let client = DellWarrantyClient::new(api_config(server.url("/warranty"))).unwrap();
        let entries = client.lookup("ABC123").await.unwrap();

        api_mock.assert();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_lookup_post_sends_form_and_headers() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/warranty")
                .header("X-Client", "warranty-sync")
                .body_contains("svctags=ABC123");
            then.status(200)
                .json_body(body_with_warranty(Value::Null));
        });

        let mut config = api_config(server.url("/warranty"));
        config.method = HttpMethod::Post;
        config
            .headers
            .insert("X-Client".to_string(), "warranty-sync".to_string());
        let client = DellWarrantyClient::new(config).unwrap();

        let entries = client.lookup("ABC123").await.unwrap();

        api_mock.assert();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_non_success_status_is_error() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/warranty");
            then.status(500);
        });

        let client = DellWarrantyClient::new(api_config(server.url("/warranty"))).unwrap();
        let result = client.lookup("ABC123").await;

        api_mock.assert();
        assert!(matches!(
            result,
            Err(SyncError::LookupStatusError { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_lookup_malformed_json_is_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/warranty");
            then.status(200).body("{ not json");
        });

        let client = DellWarrantyClient::new(api_config(server.url("/warranty"))).unwrap();
        assert!(matches!(
            client.lookup("ABC123").await,
            Err(SyncError::SerializationError(_))
        ));
    }
}
