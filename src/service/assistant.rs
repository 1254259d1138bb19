use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use backon::ExponentialBuilder;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tracing::{debug, info};
use url::Url;

use crate::api::ai_api::AiApi;
use crate::config::AiConfig;
use crate::error::NexusError;
use crate::types::ai::{ChatCompletionRequest, ChatMessage};

/// Chat-completions client shared by every AI-assisted endpoint.
/// Cheap to clone; the HTTP pool and rate limiter are shared.
#[derive(Clone)]
pub struct AiAssistant {
    client: reqwest::Client,
    limiter: Arc<DefaultDirectRateLimiter>,
    config: Arc<AiConfig>,
    completions_url: Url,
}

impl AiAssistant {
    pub fn new(config: &AiConfig) -> Result<Self, NexusError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("grc-nexus/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(config.timeout_secs.max(1)));
        if let Some(proxy_url) = config.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }
        let client = builder.build()?;

        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        if config.is_usable() {
            info!(model = %config.model, base_url = %config.base_url, "AI assistant enabled");
        } else {
            info!("AI assistant disabled");
        }

        Ok(Self {
            client,
            limiter,
            completions_url: config.completions_url()?,
            config: Arc::new(config.clone()),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_usable()
    }

    fn retry_policy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(8))
            .with_max_times(self.config.max_retries)
            .with_jitter()
    }

    /// One system + user exchange; returns the trimmed reply text.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, NexusError> {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) if self.config.is_usable() => key,
            _ => return Err(NexusError::AiDisabled),
        };

        self.limiter.until_ready().await;

        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: self.config.temperature,
        };
        let started = Instant::now();
        let resp = AiApi::chat(
            &self.client,
            &self.completions_url,
            api_key,
            self.retry_policy(),
            &body,
        )
        .await?;
        debug!(
            model = %self.config.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "AI completion received"
        );
        resp.into_text().ok_or(NexusError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_assistant_refuses_without_network() {
        let assistant = AiAssistant::new(&AiConfig::default()).unwrap();
        assert!(!assistant.is_enabled());
        let err = assistant.complete("sys", "user").await.unwrap_err();
        assert!(matches!(err, NexusError::AiDisabled));
    }

    #[tokio::test]
    async fn enabled_without_key_is_still_disabled() {
        let cfg = AiConfig {
            enabled: true,
            api_key: Some("   ".to_string()),
            ..AiConfig::default()
        };
        let assistant = AiAssistant::new(&cfg).unwrap();
        assert!(matches!(
            assistant.complete("sys", "user").await,
            Err(NexusError::AiDisabled)
        ));
    }
}
