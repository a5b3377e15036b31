use anyhow::{bail, Result};
use serde::Deserialize;

/// Environment variable prefix; `LOQA_VOICE__DIALOGUE__API_KEY` sets `dialogue.api_key`
pub const ENV_PREFIX: &str = "LOQA_VOICE";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub nats: NatsConfig,
    pub speech: SpeechConfig,
    pub dialogue: DialogueConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

#[derive(Clone, Deserialize)]
pub struct SpeechConfig {
    /// Recognition and synthesis language (e.g. "en-US")
    pub language: String,
    #[serde(default)]
    pub subscription_key: String,
    #[serde(default)]
    pub region: String,
}

#[derive(Clone, Deserialize)]
pub struct DialogueConfig {
    pub api_key: String,
    pub assistant_id: String,
    /// Base URL of the assistant instance
    pub instance_url: String,
    pub api_version: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Spoken when recognition starts; nothing is said if unset
    #[serde(default)]
    pub greeting: Option<String>,
    #[serde(default = "default_true")]
    pub strip_trailing_period: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            greeting: None,
            strip_trailing_period: true,
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl std::fmt::Debug for SpeechConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechConfig")
            .field("language", &self.language)
            .field("subscription_key", &redact(&self.subscription_key))
            .field("region", &self.region)
            .finish()
    }
}

impl std::fmt::Debug for DialogueConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogueConfig")
            .field("api_key", &redact(&self.api_key))
            .field("assistant_id", &self.assistant_id)
            .field("instance_url", &self.instance_url)
            .field("api_version", &self.api_version)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Config {
    /// Load from `path` (any format the config crate detects by extension),
    /// then apply `LOQA_VOICE__*` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: Config = settings.try_deserialize()?;
        cfg.validate()?;

        Ok(cfg)
    }

    /// Reject configurations the dialogue backend cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.dialogue.api_key.trim().is_empty() {
            bail!("dialogue.api_key is not set (use {}__DIALOGUE__API_KEY)", ENV_PREFIX);
        }
        if self.dialogue.assistant_id.trim().is_empty() {
            bail!("dialogue.assistant_id is not set");
        }
        if self.dialogue.instance_url.trim().is_empty() {
            bail!("dialogue.instance_url is not set");
        }
        if self.speech.language.trim().is_empty() {
            bail!("speech.language is not set");
        }

        Ok(())
    }
}
