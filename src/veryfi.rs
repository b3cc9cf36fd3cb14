//! Veryfi API client for processing documents from a URL.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::VeryfiConfig;
use crate::error::ExtractError;

/// Something that turns a document URL into the provider's raw JSON document.
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn process_document_url(&self, file_url: &str) -> Result<serde_json::Value, ExtractError>;
}

/// Veryfi client for the partner documents endpoint.
#[derive(Clone)]
pub struct VeryfiClient {
    client: Client,
    config: VeryfiConfig,
}

impl VeryfiClient {
    /// Build a client whose HTTP timeout follows `config.timeout`.
    pub fn new(config: VeryfiConfig) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn documents_url(&self) -> String {
        format!("{}/partner/documents", self.config.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ProcessDocumentRequest<'a> {
    file_url: &'a str,
}

#[async_trait]
impl DocumentProvider for VeryfiClient {
    fn name(&self) -> &str {
        "veryfi"
    }

    async fn process_document_url(&self, file_url: &str) -> Result<serde_json::Value, ExtractError> {
        // Checked before any I/O so a misconfigured service never hits the network.
        let creds = self.config.credentials()?;

        let url = self.documents_url();
        info!("VeryfiClient: processing document {} via {}", file_url, url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("CLIENT-ID", creds.client_id)
            .header(
                "Authorization",
                format!("apikey {}:{}", creds.username, creds.api_key),
            )
            .json(&ProcessDocumentRequest { file_url })
            .send()
            .await
            .map_err(|e| {
                warn!("VeryfiClient: request failed (timeout={}): {}", e.is_timeout(), e);
                ExtractError::UpstreamUnavailable(e)
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(ExtractError::UpstreamUnavailable)?;
        debug!("VeryfiClient: status={} body={} bytes", status, body.len());

        if status.as_u16() >= 400 {
            return Err(ExtractError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ExtractError::InvalidProviderResponse(e.to_string()))
    }
}
