//! Configuration loading for yolink-mcp.
//!
//! The two YoLink API secrets always come from the environment:
//!
//! - `YOLINK_CLIENT_ID`
//! - `YOLINK_CLIENT_SECRET`
//!
//! Endpoint URLs default to the public YoLink cloud and can be overridden with
//! `--api-url` / `YOLINK_API_URL` and `--token-url` / `YOLINK_TOKEN_URL`
//! (the CLI flag wins).

use std::fmt;
use std::time::Duration;

use clap::Parser;

pub const DEFAULT_API_URL: &str = "https://api.yosmart.com/open/yolink/v2/api";
pub const DEFAULT_TOKEN_URL: &str = "https://api.yosmart.com/open/yolink/token";

pub const ENV_CLIENT_ID: &str = "YOLINK_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "YOLINK_CLIENT_SECRET";
const ENV_API_URL: &str = "YOLINK_API_URL";
const ENV_TOKEN_URL: &str = "YOLINK_TOKEN_URL";

/// CLI arguments parsed by `clap`.
#[derive(Parser, Debug)]
#[command(name = "yolink-mcp", version, about = "MCP server for YoLink devices")]
pub struct Cli {
    /// YoLink API endpoint (overrides YOLINK_API_URL)
    #[arg(long)]
    pub api_url: Option<String>,

    /// YoLink token endpoint (overrides YOLINK_TOKEN_URL)
    #[arg(long)]
    pub token_url: Option<String>,

    /// Overall timeout for each upstream HTTP request, in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Log level filter when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Client-credentials pair for the YoLink token endpoint.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &format_args!("[SET] (len: {})", self.client_id.len()))
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Upstream endpoints and request timeout.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub api_url: String,
    pub token_url: String,
    pub timeout: Duration,
}

/// Validated configuration ready for the upstream client.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub credentials: Credentials,
    pub endpoints: Endpoints,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingSecrets(Vec<&'static str>),
    #[error("{name} must be an http(s) URL, got {value:?}")]
    InvalidUrl { name: &'static str, value: String },
    #[error("timeout must be at least one second")]
    ZeroTimeout,
}

/// Load configuration from the process environment.
pub fn load_config(cli: &Cli) -> Result<ResolvedConfig, ConfigError> {
    load_with(cli, |key| std::env::var(key).ok())
}

/// Resolve configuration using `lookup` for environment access.
fn load_with<F>(cli: &Cli, lookup: F) -> Result<ResolvedConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let client_id = non_empty(ENV_CLIENT_ID);
    let client_secret = non_empty(ENV_CLIENT_SECRET);

    let mut missing = Vec::new();
    if client_id.is_none() {
        missing.push(ENV_CLIENT_ID);
    }
    if client_secret.is_none() {
        missing.push(ENV_CLIENT_SECRET);
    }
    let (Some(client_id), Some(client_secret)) = (client_id, client_secret) else {
        return Err(ConfigError::MissingSecrets(missing));
    };

    let api_url = resolve_url(
        "api_url",
        cli.api_url.clone().or_else(|| non_empty(ENV_API_URL)),
        DEFAULT_API_URL,
    )?;
    let token_url = resolve_url(
        "token_url",
        cli.token_url.clone().or_else(|| non_empty(ENV_TOKEN_URL)),
        DEFAULT_TOKEN_URL,
    )?;

    if cli.timeout_secs == 0 {
        return Err(ConfigError::ZeroTimeout);
    }

    Ok(ResolvedConfig {
        credentials: Credentials {
            client_id,
            client_secret,
        },
        endpoints: Endpoints {
            api_url,
            token_url,
            timeout: Duration::from_secs(cli.timeout_secs),
        },
    })
}

fn resolve_url(
    name: &'static str,
    value: Option<String>,
    default: &str,
) -> Result<String, ConfigError> {
    let Some(value) = value else {
        return Ok(default.to_string());
    };
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(value)
    } else {
        Err(ConfigError::InvalidUrl { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn cli() -> Cli {
        Cli::parse_from(["yolink-mcp"])
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn both_secrets_missing_are_reported() {
        let err = load_with(&cli(), env(&[])).unwrap_err();
        match err {
            ConfigError::MissingSecrets(names) => {
                assert_eq!(names, vec![ENV_CLIENT_ID, ENV_CLIENT_SECRET]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_secret_counts_as_missing() {
        let err = load_with(
            &cli(),
            env(&[(ENV_CLIENT_ID, "abc"), (ENV_CLIENT_SECRET, "  ")]),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing required environment variables: YOLINK_CLIENT_SECRET"
        );
    }

    #[test]
    fn defaults_apply_when_only_secrets_set() {
        let config = load_with(
            &cli(),
            env(&[(ENV_CLIENT_ID, "id"), (ENV_CLIENT_SECRET, "secret")]),
        )
        .unwrap();
        assert_eq!(config.credentials.client_id, "id");
        assert_eq!(config.credentials.client_secret, "secret");
        assert_eq!(config.endpoints.api_url, DEFAULT_API_URL);
        assert_eq!(config.endpoints.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(config.endpoints.timeout, Duration::from_secs(30));
    }

    #[test]
    fn cli_flag_overrides_env_url() {
        let cli = Cli::parse_from(["yolink-mcp", "--api-url", "http://cli.local/api"]);
        let config = load_with(
            &cli,
            env(&[
                (ENV_CLIENT_ID, "id"),
                (ENV_CLIENT_SECRET, "secret"),
                ("YOLINK_API_URL", "http://env.local/api"),
                ("YOLINK_TOKEN_URL", "http://env.local/token"),
            ]),
        )
        .unwrap();
        assert_eq!(config.endpoints.api_url, "http://cli.local/api");
        assert_eq!(config.endpoints.token_url, "http://env.local/token");
    }

    #[test]
    fn non_http_url_rejected() {
        let cli = Cli::parse_from(["yolink-mcp", "--token-url", "ftp://nope"]);
        let err = load_with(
            &cli,
            env(&[(ENV_CLIENT_ID, "id"), (ENV_CLIENT_SECRET, "secret")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { name: "token_url", .. }));
    }

    #[test]
    fn zero_timeout_rejected() {
        let cli = Cli::parse_from(["yolink-mcp", "--timeout-secs", "0"]);
        let err = load_with(
            &cli,
            env(&[(ENV_CLIENT_ID, "id"), (ENV_CLIENT_SECRET, "secret")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroTimeout));
    }

    #[test]
    fn debug_output_hides_secret() {
        let creds = Credentials {
            client_id: "id-123".into(),
            client_secret: "hunter2".into(),
        };
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("[REDACTED]"));
    }
}
