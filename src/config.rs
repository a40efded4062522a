use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result, anyhow};
use url::Url;

pub const HTTP_ADDR_KEY: &str = "BABELCHAT_HTTP_ADDR";
pub const TRANSLATOR_BASE_URI_KEY: &str = "BABELCHAT_TRANSLATOR_BASE_URI";
pub const TRANSLATOR_API_KEY_KEY: &str = "BABELCHAT_TRANSLATOR_API_KEY";
pub const TRANSLATOR_REGION_KEY: &str = "BABELCHAT_TRANSLATOR_REGION";
pub const PUSH_ENDPOINT_KEY: &str = "BABELCHAT_PUSH_ENDPOINT";
pub const PUSH_HUB_KEY: &str = "BABELCHAT_PUSH_HUB";
pub const PUSH_ACCESS_KEY_KEY: &str = "BABELCHAT_PUSH_ACCESS_KEY";

const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_PUSH_HUB: &str = "chat";

#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    pub base_url: Url,
    pub api_key: String,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct PushConfig {
    pub endpoint: Url,
    pub hub: String,
    pub access_key: Option<String>,
}

/// Built once at startup and passed by reference into each component's
/// constructor; no component reads the environment after this point.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub translator: TranslatorConfig,
    pub push: PushConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env::var(HTTP_ADDR_KEY)
            .unwrap_or_else(|_| DEFAULT_HTTP_ADDR.to_string())
            .parse()
            .with_context(|| format!("invalid {HTTP_ADDR_KEY}"))?;

        let translator = TranslatorConfig {
            base_url: Url::parse(&required(TRANSLATOR_BASE_URI_KEY)?)
                .with_context(|| format!("invalid {TRANSLATOR_BASE_URI_KEY}"))?,
            api_key: required(TRANSLATOR_API_KEY_KEY)?,
            region: required(TRANSLATOR_REGION_KEY)?,
        };

        let push = PushConfig {
            endpoint: Url::parse(&required(PUSH_ENDPOINT_KEY)?)
                .with_context(|| format!("invalid {PUSH_ENDPOINT_KEY}"))?,
            hub: env::var(PUSH_HUB_KEY).unwrap_or_else(|_| DEFAULT_PUSH_HUB.to_string()),
            access_key: env::var(PUSH_ACCESS_KEY_KEY).ok(),
        };

        Ok(Self {
            http_addr,
            translator,
            push,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| anyhow!("{key} environment variable is not set"))
}
