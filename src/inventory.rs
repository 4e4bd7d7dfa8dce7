//! Authenticated scene inventory lookup.
//!
//! The USGS EarthExplorer inventory resolves scene ids to bundle download
//! urls after a credentialed login. Its error payloads come back either as
//! a SOAP fault envelope or as a JSON object with an `error` field; both
//! are reduced to the human-readable message.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const INVENTORY_API: &str = "https://earthexplorer.usgs.gov/inventory/json/v/1.4.1";

pub trait InventoryService {
    /// Authenticates and returns a session key for subsequent lookups.
    async fn login(&self, username: &str, password: &str) -> Result<String>;

    /// Resolves scene ids to bundle download urls within a dataset/node.
    async fn download_urls(
        &self,
        dataset: &str,
        node: &str,
        ids: &[String],
        session: &str,
    ) -> Result<Vec<String>>;
}

pub struct EarthExplorer {
    client: reqwest::Client,
    endpoint: String,
}

impl EarthExplorer {
    pub fn new() -> Self {
        Self::with_endpoint(INVENTORY_API)
    }

    pub fn with_endpoint(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for EarthExplorer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DownloadRequest<'a> {
    dataset_name: &'a str,
    node: &'a str,
    entity_ids: &'a [String],
    api_key: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    data: Option<T>,
    error: Option<String>,
}

impl InventoryService for EarthExplorer {
    async fn login(&self, username: &str, password: &str) -> Result<String> {
        let url = format!("{}/login", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|err| Error::network(&url, err))?;

        if !response.status().is_success() {
            let payload = response.text().await.unwrap_or_default();
            return Err(Error::InventoryAccess(
                fault_string(&payload).unwrap_or(payload),
            ));
        }

        let body: ApiResponse<String> = response
            .json()
            .await
            .map_err(|err| Error::network(&url, err))?;
        if let Some(message) = body.error {
            return Err(Error::InventoryAccess(message));
        }
        body.data
            .ok_or_else(|| Error::InventoryAccess("login returned no session key".to_string()))
    }

    async fn download_urls(
        &self,
        dataset: &str,
        node: &str,
        ids: &[String],
        session: &str,
    ) -> Result<Vec<String>> {
        let url = format!("{}/download", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(&DownloadRequest {
                dataset_name: dataset,
                node,
                entity_ids: ids,
                api_key: session,
            })
            .send()
            .await
            .map_err(|err| Error::network(&url, err))?;

        if !response.status().is_success() {
            let payload = response.text().await.unwrap_or_default();
            return Err(Error::InventoryAccess(
                fault_string(&payload).unwrap_or(payload),
            ));
        }

        let body: ApiResponse<Vec<String>> = response
            .json()
            .await
            .map_err(|err| Error::network(&url, err))?;
        if let Some(message) = body.error {
            return Err(Error::InventoryAccess(message));
        }
        Ok(body.data.unwrap_or_default())
    }
}

/// Pulls the human-readable message out of a structured error payload.
fn fault_string(payload: &str) -> Option<String> {
    if let Ok(doc) = roxmltree::Document::parse(payload) {
        if let Some(fault) = doc
            .descendants()
            .find(|node| node.has_tag_name("faultstring"))
        {
            return fault.text().map(|text| text.trim().to_string());
        }
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) {
        if let Some(message) = value.get("error").and_then(|error| error.as_str()) {
            return Some(message.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOAP_FAULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP-ENV:Body>
    <SOAP-ENV:Fault>
      <faultcode>SOAP-ENV:Client</faultcode>
      <faultstring>Account does not have access to the requested node</faultstring>
    </SOAP-ENV:Fault>
  </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#;

    #[test]
    fn fault_string_from_soap_envelope() {
        assert_eq!(
            fault_string(SOAP_FAULT).as_deref(),
            Some("Account does not have access to the requested node")
        );
    }

    #[test]
    fn fault_string_from_json_payload() {
        assert_eq!(
            fault_string(r#"{"errorCode":"AUTH_INVALID","error":"Invalid username/password"}"#)
                .as_deref(),
            Some("Invalid username/password")
        );
    }

    #[test]
    fn unstructured_payloads_yield_nothing() {
        assert_eq!(fault_string("service unavailable"), None);
    }
}
