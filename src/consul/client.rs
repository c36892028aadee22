//! HTTP implementation of the discovery client.
//!
//! Talks to a Consul agent's `/v1` API with `reqwest`.

use super::{DiscoveryClient, DiscoveryError, DiscoveryResult};
use crate::models::{CatalogNode, HealthCheck, NodeServices, ServiceHealth};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const TOKEN_HEADER: &str = "X-Consul-Token";

/// Connection settings for [`ConsulClient`].
#[derive(Debug, Clone)]
pub struct ConsulClientConfig {
    /// Agent base URL, e.g. `http://localhost:8500`.
    pub url: String,
    /// ACL token. An empty token is sent as `anonymous`.
    pub token: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for ConsulClientConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8500".to_string(),
            token: None,
            timeout_seconds: 30,
        }
    }
}

impl ConsulClientConfig {
    /// The token actually sent to Consul, if any.
    pub fn effective_token(&self) -> Option<&str> {
        match self.token.as_deref() {
            Some("") => Some("anonymous"),
            other => other,
        }
    }
}

/// Consul HTTP API client.
pub struct ConsulClient {
    config: ConsulClientConfig,
    base: Url,
    http_client: reqwest::Client,
}

impl ConsulClient {
    /// Create a client for the agent described by `config`.
    pub fn new(config: ConsulClientConfig) -> DiscoveryResult<Self> {
        let base = parse_base_url(&config.url)?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|source| DiscoveryError::Http {
                url: config.url.clone(),
                source,
            })?;

        Ok(Self {
            config,
            base,
            http_client,
        })
    }

    /// Build an API URL from path segments and a datacenter.
    ///
    /// Segments are percent-escaped individually, so node and service names
    /// cannot inject extra path components.
    fn endpoint(&self, segments: &[&str], datacenter: Option<&str>) -> DiscoveryResult<Url> {
        build_endpoint(&self.base, segments, datacenter)
    }

    async fn get(&self, url: Url) -> DiscoveryResult<reqwest::Response> {
        debug!("GET {}", url);

        let mut request = self.http_client.get(url.clone());
        if let Some(token) = self.config.effective_token() {
            request = request.header(TOKEN_HEADER, token);
        }

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                DiscoveryError::Timeout {
                    url: url.to_string(),
                    seconds: self.config.timeout_seconds,
                }
            } else if e.is_connect() {
                DiscoveryError::Connect(self.config.url.clone())
            } else {
                DiscoveryError::Http {
                    url: url.to_string(),
                    source: e,
                }
            }
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> DiscoveryResult<T> {
        let response = self.get(url.clone()).await?;
        let (status, body) = read_body(response, &url).await?;
        let body = success_body(status, body, &url)?;

        decode_json(&body, &url)
    }
}

#[async_trait]
impl DiscoveryClient for ConsulClient {
    async fn datacenters(&self) -> DiscoveryResult<Vec<String>> {
        let url = self.endpoint(&["catalog", "datacenters"], None)?;
        self.get_json(url).await
    }

    async fn nodes(&self, datacenter: &str) -> DiscoveryResult<Vec<CatalogNode>> {
        let url = self.endpoint(&["catalog", "nodes"], Some(datacenter))?;
        let nodes: Option<Vec<CatalogNode>> = self.get_json(url).await?;
        Ok(nodes.unwrap_or_default())
    }

    async fn node(&self, name: &str, datacenter: &str) -> DiscoveryResult<Option<NodeServices>> {
        let url = self.endpoint(&["catalog", "node", name], Some(datacenter))?;
        self.get_json(url).await
    }

    async fn service_health(
        &self,
        service: &str,
        datacenter: &str,
    ) -> DiscoveryResult<Vec<ServiceHealth>> {
        let url = self.endpoint(&["health", "service", service], Some(datacenter))?;
        let entries: Option<Vec<ServiceHealth>> = self.get_json(url).await?;
        Ok(entries.unwrap_or_default())
    }

    async fn node_health(
        &self,
        node: &str,
        _services: &[&str],
        datacenter: &str,
    ) -> DiscoveryResult<Vec<HealthCheck>> {
        let url = self.endpoint(&["health", "node", node], Some(datacenter))?;
        let checks: Option<Vec<HealthCheck>> = self.get_json(url).await?;
        Ok(checks.unwrap_or_default())
    }

    async fn kv_get(&self, key: &str, datacenter: &str) -> DiscoveryResult<Option<Vec<u8>>> {
        let mut segments = vec!["kv"];
        segments.extend(key.split('/').filter(|s| !s.is_empty()));

        let mut url = self.endpoint(&segments, Some(datacenter))?;
        url.query_pairs_mut().append_pair("raw", "true");

        let response = self.get(url.clone()).await?;
        let (status, body) = read_body(response, &url).await?;
        kv_value(status, body, &url)
    }
}

fn parse_base_url(raw: &str) -> DiscoveryResult<Url> {
    let url = Url::parse(raw.trim_end_matches('/'))
        .map_err(|e| DiscoveryError::InvalidUrl(format!("{}: {}", raw, e)))?;

    if url.cannot_be_a_base() {
        return Err(DiscoveryError::InvalidUrl(raw.to_string()));
    }

    Ok(url)
}

fn build_endpoint(base: &Url, segments: &[&str], datacenter: Option<&str>) -> DiscoveryResult<Url> {
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| DiscoveryError::InvalidUrl(base.to_string()))?;
        path.pop_if_empty().push("v1").extend(segments);
    }

    if let Some(dc) = datacenter {
        url.query_pairs_mut().append_pair("dc", dc);
    }

    Ok(url)
}

async fn read_body(response: reqwest::Response, url: &Url) -> DiscoveryResult<(StatusCode, Vec<u8>)> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(|source| DiscoveryError::Http {
        url: url.to_string(),
        source,
    })?;

    Ok((status, bytes.to_vec()))
}

fn success_body(status: StatusCode, body: Vec<u8>, url: &Url) -> DiscoveryResult<Vec<u8>> {
    if !status.is_success() {
        return Err(DiscoveryError::Status {
            status: status.as_u16(),
            url: url.to_string(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    Ok(body)
}

/// A missing key answers 404; a key holding nothing is treated the same.
fn kv_value(status: StatusCode, body: Vec<u8>, url: &Url) -> DiscoveryResult<Option<Vec<u8>>> {
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    let body = success_body(status, body, url)?;
    Ok(Some(body).filter(|b| !b.is_empty()))
}

fn decode_json<T: DeserializeOwned>(body: &[u8], url: &Url) -> DiscoveryResult<T> {
    serde_json::from_slice(body).map_err(|e| DiscoveryError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}
