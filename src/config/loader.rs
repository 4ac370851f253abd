//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::RotatorConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    NotFound(String),
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
    AlreadyExists(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(path) => write!(
                f,
                "Config file {} not found (create one with `generate-config`)",
                path
            ),
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
            ConfigError::AlreadyExists(path) => {
                write!(f, "{} already exists (use --force to overwrite)", path)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RotatorConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<RotatorConfig, ConfigError> {
    let config: RotatorConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

const TEMPLATE: &str = r#"# proxy-rotator configuration

[controller]
# External controller of the proxy core (scheme optional).
address = "127.0.0.1:9097"
# secret = "set-your-secret"
timeout_secs = 10
skip_dead_nodes = true

[probe]
# HTTP proxy port of the proxy core; probes are routed through it.
http_proxy = "http://127.0.0.1:7890"
timeout_secs = 30
# Probes required before trusting a freshly selected node.
confirm_samples = 3
confirm_gap_ms = 1000

[monitoring]
interval_sec = 30.0
# Rotations before cooling down, 0 = unlimited.
max_rotations = 0
once = false
cooldown_secs = 30
shutdown_grace_secs = 5

[observability]
log_level = "info"
log_format = "pretty"
metrics_enabled = false
metrics_address = "127.0.0.1:9091"

[admin]
enabled = false
bind_address = "127.0.0.1:8082"
api_key = ""

# Services: chatgpt|openai, gemini, netflix, disney_plus, prime_video,
# youtube_premium, bahamut_anime, bilibili_mainland, bilibili_hk_mc_tw
[[tasks]]
name = "chatgpt"
proxy_group_name = "Proxy"
service_name = "chatgpt"
enabled = true

[[tasks]]
name = "netflix"
proxy_group_name = "Streaming"
service_name = "netflix"
enabled = false
"#;

/// Write the annotated configuration template.
pub fn write_template(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists(path.display().to_string()));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(ConfigError::Io)?;
    }
    fs::write(path, TEMPLATE).map_err(ConfigError::Io)
}
