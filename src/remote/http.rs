//! HTTP/JSON client for the synth server

use super::{Remote, TransportError};
use crate::groups::WireFormat;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Shared client for every group and action; cheap to clone
#[derive(Debug, Clone)]
pub struct SynthClient {
    client: Client,
    base_url: String,
}

impl SynthClient {
    /// `base_url` like `http://localhost:8080`; a trailing slash is ignored
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| TransportError::Request {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn get_json(&self, path: &str) -> Result<Value, TransportError> {
        let url = self.url(path);
        trace!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            warn!("GET {} returned {}", url, status);
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| TransportError::Decode {
                url,
                reason: e.to_string(),
            })
    }

    /// POST a JSON body; returns the response body, which may be empty
    pub(crate) async fn post_json(&self, path: &str, body: &Value) -> Result<String, TransportError> {
        let url = self.url(path);
        trace!("POST {} {}", url, body);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            warn!("POST {} returned {}", url, status);
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
            });
        }
        response
            .text()
            .await
            .map_err(|source| TransportError::Request { url, source })
    }
}

#[async_trait]
impl<G: WireFormat> Remote<G> for SynthClient {
    async fn fetch(&self, template: &G) -> Result<G, TransportError> {
        let body = self.get_json(G::read_path()).await?;
        template.decode(&body).map_err(|reason| TransportError::Decode {
            url: self.url(G::read_path()),
            reason,
        })
    }

    async fn send(&self, snapshot: &G, changed: &[G::Field]) -> Result<(), TransportError> {
        let body = snapshot.encode_patch(changed);
        debug!("Sending {} update: {}", snapshot.label(), body);
        self.post_json(G::write_path(), &body).await.map(|_| ())
    }
}
