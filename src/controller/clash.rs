//! Clash external-controller REST client.
//!
//! # Responsibilities
//! - Read a proxy group's active node and members (`GET /proxies/{group}`)
//! - Switch a selector group's node (`PUT /proxies/{group}`)
//! - Optionally drop members the controller reports as dead (`GET /proxies`)
//! - Map HTTP and transport failures onto `ControllerError`

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::config::ControllerConfig;
use crate::controller::{ControllerError, ControllerResult, ProxyController};
use crate::stats::NodeId;

/// Parse a controller address, defaulting the scheme to `http`.
pub fn controller_base_url(address: &str) -> Result<Url, url::ParseError> {
    let address = address.trim();
    let full = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    };
    let url = Url::parse(&full)?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(url::ParseError::EmptyHost);
    }
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct ProxyInfo {
    #[serde(default)]
    now: Option<String>,
    #[serde(default)]
    all: Vec<String>,
    #[serde(default)]
    alive: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ProxyList {
    proxies: HashMap<String, ProxyInfo>,
}

/// REST client for a Clash-compatible controller.
#[derive(Clone)]
pub struct ClashController {
    client: Client,
    base_url: Url,
    timeout_secs: u64,
    skip_dead_nodes: bool,
}

impl ClashController {
    /// Create a client from configuration. No request is made yet.
    pub fn new(config: &ControllerConfig) -> ControllerResult<Self> {
        let base_url = controller_base_url(&config.address).map_err(|e| {
            ControllerError::Transport(format!(
                "invalid controller address '{}': {}",
                config.address, e
            ))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(secret) = config.secret.as_deref().filter(|s| !s.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", secret))
                .map_err(|e| ControllerError::Transport(format!("invalid secret: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        // The controller is local; never route it through an environment proxy.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("proxy-rotator/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()
            .map_err(|e| ControllerError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout_secs: config.timeout_secs,
            skip_dead_nodes: config.skip_dead_nodes,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn transport_error(&self, e: reqwest::Error) -> ControllerError {
        if e.is_timeout() {
            ControllerError::Timeout(self.timeout_secs)
        } else {
            ControllerError::Transport(e.to_string())
        }
    }

    async fn decode<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
        group: &str,
    ) -> ControllerResult<T> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ControllerError::GroupNotFound(group.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ControllerError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ControllerError::Decode(e.to_string()))
    }

    async fn get_group(&self, group: &str) -> ControllerResult<ProxyInfo> {
        let response = self
            .client
            .get(self.endpoint(&["proxies", group]))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.decode(response, group).await
    }

    async fn get_all(&self, group: &str) -> ControllerResult<ProxyList> {
        let response = self
            .client
            .get(self.endpoint(&["proxies"]))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.decode(response, group).await
    }
}

#[async_trait]
impl ProxyController for ClashController {
    async fn current_node(&self, group: &str) -> ControllerResult<NodeId> {
        let info = self.get_group(group).await?;
        info.now
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ControllerError::Decode(format!("group '{}' has no active node", group)))
    }

    async fn list_nodes(&self, group: &str) -> ControllerResult<Vec<NodeId>> {
        if !self.skip_dead_nodes {
            return Ok(self.get_group(group).await?.all);
        }

        let mut list = self.get_all(group).await?;
        let info = list
            .proxies
            .remove(group)
            .ok_or_else(|| ControllerError::GroupNotFound(group.to_string()))?;

        let (alive, dead): (Vec<_>, Vec<_>) = info.all.into_iter().partition(|member| {
            list.proxies.get(member).and_then(|p| p.alive) != Some(false)
        });
        if !dead.is_empty() {
            tracing::debug!(group = %group, dead = ?dead, "Skipping dead nodes");
        }
        Ok(alive)
    }

    async fn select_node(&self, group: &str, node: &str) -> ControllerResult<()> {
        let response = self
            .client
            .put(self.endpoint(&["proxies", group]))
            .json(&serde_json::json!({ "name": node }))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(ControllerError::GroupNotFound(group.to_string())),
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                Err(ControllerError::NotSelectable(body))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ControllerError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

impl std::fmt::Debug for ClashController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClashController")
            .field("base_url", &self.base_url.as_str())
            .field("timeout_secs", &self.timeout_secs)
            .field("skip_dead_nodes", &self.skip_dead_nodes)
            .finish()
    }
}
