//! Transport HTTP (`reqwest`, rustls)

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use super::{FetchError, Transport};

/// GET `{base_url}/{dataset}`
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Crée un transport avec timeout optionnel par requête
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// URL complète d'un jeu de données
    pub fn url_for(&self, dataset: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), dataset)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, dataset: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(dataset);
        info!(dataset, url = %url, "Fetching dataset");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::unreachable(dataset, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(
                dataset,
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::unreachable(dataset, e))?;
        debug!(dataset, bytes = body.len(), "Response received");

        Ok(body.to_vec())
    }
}
