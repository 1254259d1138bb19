use backon::{ExponentialBuilder, Retryable};
use reqwest::StatusCode;
use tracing::{error, warn};
use url::Url;

use crate::error::{AiProviderError, IsRetryable, NexusError};
use crate::types::ai::{ChatCompletionRequest, ChatCompletionResponse};

pub struct AiApi;

impl AiApi {
    /// POST a chat completion, retrying network failures, 429 and 5xx.
    pub async fn chat(
        client: &reqwest::Client,
        url: &Url,
        api_key: &str,
        retry_policy: ExponentialBuilder,
        body: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, NexusError> {
        (|| async {
            let resp = client
                .post(url.clone())
                .bearer_auth(api_key)
                .json(body)
                .send()
                .await?;
            let status = resp.status();
            if status.is_success() {
                return Ok(resp.json::<ChatCompletionResponse>().await?);
            }
            let bytes = resp.bytes().await.unwrap_or_default();
            Err(provider_error(status, &bytes))
        })
        .retry(retry_policy)
        .when(|e: &NexusError| e.is_retryable())
        .notify(|e, dur| warn!(error = %e, retry_in = ?dur, "AI provider call failed, retrying"))
        .await
        .inspect_err(|e| error!(error = %e, "AI provider call failed"))
    }
}

/// Prefer the provider's own error payload; fall back to the bare status.
fn provider_error(status: StatusCode, body: &[u8]) -> NexusError {
    match serde_json::from_slice::<AiProviderError>(body) {
        Ok(mut err) => {
            err.status = Some(status.as_u16());
            NexusError::AiProvider(err)
        }
        Err(_) => NexusError::UpstreamStatus(status),
    }
}
