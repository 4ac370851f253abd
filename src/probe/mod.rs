//! Service reachability probing.
//!
//! # Data Flow
//! ```text
//! RotationEngine
//!     → ServiceProbe::probe(service, http_proxy)
//!     → http.rs (GET the service endpoint through the proxy)
//!     → ProbeOutcome { Reachable | Unreachable | Error }
//! ```
//!
//! # Design Decisions
//! - Service names resolve through a fixed, case-insensitive alias table
//! - Errors are treated as "unreachable" for rotation but stay distinct in logs
//! - A freshly selected node is confirmed with several probes before it is trusted

pub mod http;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

pub use http::HttpProbe;

/// Services with a known probe target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    BilibiliMainland,
    BilibiliHkMcTw,
    ChatGpt,
    Gemini,
    YoutubePremium,
    BahamutAnime,
    Netflix,
    DisneyPlus,
    PrimeVideo,
}

impl ServiceKind {
    /// Resolve a configured service name (case-insensitive, aliases allowed).
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.trim().to_ascii_lowercase().as_str() {
            "bilibili_cn" | "bilibili_mainland" => Self::BilibiliMainland,
            "bilibili_hk" | "bilibili_hk_mc_tw" => Self::BilibiliHkMcTw,
            "chatgpt" | "openai" => Self::ChatGpt,
            "gemini" => Self::Gemini,
            "youtube" | "youtube_premium" => Self::YoutubePremium,
            "bahamut" | "bahamut_anime" => Self::BahamutAnime,
            "netflix" => Self::Netflix,
            "disney" | "disney+" | "disney_plus" => Self::DisneyPlus,
            "prime" | "prime_video" | "amazon_prime" => Self::PrimeVideo,
            _ => return None,
        };
        Some(kind)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::BilibiliMainland => "Bilibili China Mainland Only",
            Self::BilibiliHkMcTw => "Bilibili HongKong/Macau/Taiwan",
            Self::ChatGpt => "ChatGPT",
            Self::Gemini => "Gemini",
            Self::YoutubePremium => "Youtube Premium",
            Self::BahamutAnime => "Bahamut Anime",
            Self::Netflix => "Netflix",
            Self::DisneyPlus => "Disney+",
            Self::PrimeVideo => "Prime Video",
        }
    }

    /// Endpoint whose reachability stands in for the service.
    pub fn target_url(&self) -> &'static str {
        match self {
            Self::BilibiliMainland => "https://api.bilibili.com/pgc/player/web/playurl?avid=82846771&qn=0&type=&otype=json&ep_id=307247&fourk=1&fnver=0&fnval=16&module=bangumi",
            Self::BilibiliHkMcTw => "https://api.bilibili.com/pgc/player/web/playurl?avid=18281381&cid=29892777&qn=0&type=&otype=json&ep_id=183799&fourk=1&fnver=0&fnval=16&module=bangumi",
            Self::ChatGpt => "https://ios.chat.openai.com/",
            Self::Gemini => "https://gemini.google.com",
            Self::YoutubePremium => "https://www.youtube.com/premium",
            Self::BahamutAnime => "https://ani.gamer.com.tw/",
            Self::Netflix => "https://www.netflix.com/title/81280792",
            Self::DisneyPlus => "https://www.disneyplus.com/",
            Self::PrimeVideo => "https://www.primevideo.com",
        }
    }
}

/// Result of a single service check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    Unreachable(String),
    Error(String),
}

impl ProbeOutcome {
    pub fn is_reachable(&self) -> bool {
        matches!(self, ProbeOutcome::Reachable)
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Reachable => "reachable",
            ProbeOutcome::Unreachable(_) => "unreachable",
            ProbeOutcome::Error(_) => "error",
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Reachable => write!(f, "reachable"),
            ProbeOutcome::Unreachable(detail) => write!(f, "unreachable ({})", detail),
            ProbeOutcome::Error(detail) => write!(f, "probe error ({})", detail),
        }
    }
}

/// Checks whether a service is reachable through a proxy.
#[async_trait]
pub trait ServiceProbe: Send + Sync {
    async fn probe(&self, service: &str, http_proxy: &str) -> ProbeOutcome;
}

/// Probe up to `samples` times, `gap` apart, stopping at the first failure.
pub async fn probe_confirmed(
    probe: &dyn ServiceProbe,
    service: &str,
    http_proxy: &str,
    samples: u32,
    gap: Duration,
) -> ProbeOutcome {
    let samples = samples.max(1);
    for attempt in 1..=samples {
        let outcome = probe.probe(service, http_proxy).await;
        if !outcome.is_reachable() {
            tracing::debug!(service = %service, attempt, samples, %outcome, "Confirmation probe failed");
            return outcome;
        }
        if attempt < samples {
            tokio::time::sleep(gap).await;
        }
    }
    ProbeOutcome::Reachable
}
