//! HTTP reachability probe routed through the proxy under test.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::{redirect, Client, Proxy, StatusCode};

use crate::probe::{ProbeOutcome, ServiceKind, ServiceProbe};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Probes a service's landing endpoint through an HTTP proxy.
pub struct HttpProbe {
    /// One client per proxy address; reqwest binds the proxy at build time.
    clients: DashMap<String, Client>,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        Self {
            clients: DashMap::new(),
            timeout,
        }
    }

    fn client_for(&self, http_proxy: &str) -> Result<Client, reqwest::Error> {
        if let Some(client) = self.clients.get(http_proxy) {
            return Ok(client.clone());
        }
        let client = Client::builder()
            .proxy(Proxy::all(http_proxy)?)
            .timeout(self.timeout)
            .redirect(redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .build()?;
        self.clients.insert(http_proxy.to_string(), client.clone());
        Ok(client)
    }
}

/// 2xx/3xx means the service answered through the proxy.
fn classify(status: StatusCode) -> ProbeOutcome {
    if status.is_success() || status.is_redirection() {
        ProbeOutcome::Reachable
    } else {
        ProbeOutcome::Unreachable(format!("HTTP {}", status.as_u16()))
    }
}

#[async_trait]
impl ServiceProbe for HttpProbe {
    async fn probe(&self, service: &str, http_proxy: &str) -> ProbeOutcome {
        let Some(kind) = ServiceKind::from_name(service) else {
            return ProbeOutcome::Error(format!("unknown service '{}'", service));
        };

        let client = match self.client_for(http_proxy) {
            Ok(client) => client,
            Err(e) => return ProbeOutcome::Error(format!("invalid proxy '{}': {}", http_proxy, e)),
        };

        match client.get(kind.target_url()).send().await {
            Ok(response) => {
                let outcome = classify(response.status());
                tracing::debug!(
                    service = kind.display_name(),
                    status = %response.status(),
                    %outcome,
                    "Probe finished"
                );
                outcome
            }
            Err(e) if e.is_timeout() => ProbeOutcome::Error(format!("timed out after {:?}", self.timeout)),
            Err(e) => ProbeOutcome::Error(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify(StatusCode::OK), ProbeOutcome::Reachable);
        assert_eq!(classify(StatusCode::FOUND), ProbeOutcome::Reachable);
        assert_eq!(
            classify(StatusCode::FORBIDDEN),
            ProbeOutcome::Unreachable("HTTP 403".into())
        );
    }

    #[tokio::test]
    async fn test_unknown_service_is_error() {
        let probe = HttpProbe::new(Duration::from_secs(1));
        let outcome = probe.probe("myspace", "http://127.0.0.1:7890").await;
        assert!(matches!(outcome, ProbeOutcome::Error(_)));
    }

    #[tokio::test]
    async fn test_clients_are_cached_per_proxy() {
        let probe = HttpProbe::new(Duration::from_secs(1));
        probe.client_for("http://127.0.0.1:7890").unwrap();
        probe.client_for("http://127.0.0.1:7890").unwrap();
        probe.client_for("http://127.0.0.1:7891").unwrap();
        assert_eq!(probe.clients.len(), 2);
    }
}
