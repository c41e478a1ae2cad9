//! Thin REST client over Hyperliquid's `Info`/`Exchange` endpoints (spec §4.5). Every
//! outbound call goes through the shared [`RateLimiter`] first.

use super::signer::Signer;
use super::wire::{ExchangeAction, ExchangeRequest, ExchangeResponse, InfoRequest};
use hq_core::error::{ApiError, NetworkError};
use hq_core::Result;
use hq_integration::RateLimiter;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    rate_limiter: RateLimiter,
    signer: Option<Arc<dyn Signer>>,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>, signer: Option<Arc<dyn Signer>>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            rate_limiter: RateLimiter::default_hyperliquid(),
            signer,
        }
    }

    pub async fn info<T: DeserializeOwned>(&self, request: &InfoRequest<'_>) -> Result<T> {
        self.post_with_retry("/info", request).await
    }

    pub async fn exchange(&self, action: ExchangeAction, nonce: u64) -> Result<ExchangeResponse> {
        let Some(signer) = &self.signer else {
            return Err(ApiError::SignerRequired.into());
        };

        let payload = serde_json::to_vec(&action).map_err(|e| {
            hq_core::error::DataError::ParseError(format!("encoding exchange action: {e}"))
        })?;
        let signature = signer.sign(&payload);

        let request = ExchangeRequest {
            action,
            nonce,
            signature,
        };

        self.post_with_retry("/exchange", &request).await
    }

    async fn post_with_retry<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: serde::Serialize,
        Resp: DeserializeOwned,
    {
        const MAX_ATTEMPTS: u32 = 3;
        let mut backoff = Duration::from_millis(100);

        let mut last_err = None;
        for attempt in 0..MAX_ATTEMPTS {
            self.rate_limiter.wait().await;

            match self.post_once(path, body).await {
                Ok(value) => return Ok(value),
                Err(err) if is_retryable(&err) && attempt + 1 < MAX_ATTEMPTS => {
                    warn!(attempt, ?err, "retrying Hyperliquid request");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(Duration::from_secs(5));
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err.expect("loop only exits via return or a stored error"))
    }

    async fn post_once<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: serde::Serialize,
        Resp: DeserializeOwned,
    {
        debug!(path, "POST to Hyperliquid");
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimitExceeded.into());
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized.into());
        }
        if status.is_server_error() {
            return Err(ApiError::ServerError(status.to_string()).into());
        }

        let text = response
            .text()
            .await
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        serde_json::from_str(&text).map_err(|e| ApiError::InvalidResponse(e.to_string()).into())
    }
}

fn is_retryable(err: &hq_core::Error) -> bool {
    matches!(
        err,
        hq_core::Error::Network(_) | hq_core::Error::Api(ApiError::ServerError(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_and_server_errors_are_retryable() {
        assert!(is_retryable(
            &NetworkError::ConnectionFailed("reset".into()).into()
        ));
        assert!(is_retryable(
            &ApiError::ServerError("502".into()).into()
        ));
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert!(!is_retryable(&ApiError::Unauthorized.into()));
        assert!(!is_retryable(&ApiError::RateLimitExceeded.into()));
    }
}
