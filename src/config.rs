use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable prefix; sections are separated by `__`,
/// e.g. `NEXUS_AI__API_KEY`.
pub const ENV_PREFIX: &str = "NEXUS_";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub loglevel: String,
    /// Shared service key required on every `/api` request.
    pub nexus_key: String,
    pub max_body_bytes: usize,
    /// Applied to organisations created without an explicit appetite.
    pub default_risk_appetite: u8,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: "sqlite:nexus.db".to_string(),
            loglevel: "info".to_string(),
            nexus_key: "change-me".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
            default_risk_appetite: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub enabled: bool,
    /// OpenAI-compatible API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub proxy: Option<Url>,
    pub timeout_secs: u64,
    pub requests_per_minute: u32,
    pub max_retries: usize,
    pub temperature: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.openai.com/v1/".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            proxy: None,
            timeout_secs: 30,
            requests_per_minute: 20,
            max_retries: 3,
            temperature: 0.2,
        }
    }
}

impl AiConfig {
    /// The assistant is usable only when switched on and given a key.
    pub fn is_usable(&self) -> bool {
        self.enabled && self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// `{base_url}/chat/completions`, keeping every segment of the base.
    pub fn completions_url(&self) -> Result<Url, url::ParseError> {
        let mut base = Url::parse(&self.base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join("chat/completions")
    }
}

impl Config {
    /// Defaults, then `config.toml`, then `NEXUS_*` environment variables.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn basic(&self) -> &BasicConfig {
        &self.basic
    }

    pub fn ai(&self) -> &AiConfig {
        &self.ai
    }
}
