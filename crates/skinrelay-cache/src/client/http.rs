//! HTTP layer: status mapping, rate budget, retry.
//!
//! This is the ONLY place for status code handling. client/mod.rs never
//! interprets status codes.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::error::{SkinError, SkinResult};

use super::helpers::{classify_generator_error, generator_delay, retry_after_header, truncate};
use super::rate_limit::RateBudget;

/// Which upstream service a request is for; status codes mean different things per service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Service {
    Session,
    Profiles,
    Generator,
}

#[derive(Debug)]
pub(crate) struct Request<'a> {
    pub method: reqwest::Method,
    pub url: &'a str,
    pub form: Option<&'a [(&'a str, String)]>,
    pub service: Service,
    /// What is being looked up, for `NotFound` messages.
    pub subject: &'a str,
}

/// HTTP backend for making requests (holds reqwest client, budget, config).
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) config: UpstreamConfig,
    pub(crate) budget: RateBudget,
}

impl HttpBackend {
    /// Send a request, retrying transient failures; returns the 2xx body.
    ///
    /// Every attempt spends one slot of the shared budget.
    pub(crate) async fn request(&self, req: &Request<'_>) -> SkinResult<String> {
        use rand::Rng;

        let mut retries = 0;
        let max_retries = self.config.max_retries;
        let cap = Duration::from_secs(self.config.retry_cap_secs);

        loop {
            self.budget.acquire().await;
            let result = self.request_once(req).await;

            match result {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && retries < max_retries => {
                    // never retry before the server allows it
                    if let SkinError::RateLimited {
                        retry_after: Some(hint),
                    } = e
                    {
                        if hint > cap {
                            warn!(
                                url = req.url,
                                retry_after_ms = hint.as_millis() as u64,
                                cap_ms = cap.as_millis() as u64,
                                "server retry delay exceeds cap, giving up"
                            );
                            return Err(e);
                        }
                    }

                    retries += 1;

                    let backoff = match &e {
                        SkinError::RateLimited {
                            retry_after: Some(retry_after),
                        } => {
                            let base_ms = retry_after.as_millis() as u64;
                            let jitter_factor: f64 =
                                rand::thread_rng().gen_range(1.0_f64..=1.1_f64);
                            let jittered_ms = ((base_ms as f64) * jitter_factor).round() as u64;
                            Duration::from_millis(jittered_ms.max(100))
                        }
                        _ => {
                            let exp = self
                                .config
                                .retry_base_ms
                                .saturating_mul(1 << (retries - 1).min(16));
                            let base_backoff = Duration::from_millis(exp).min(cap);
                            let jittered_ms =
                                rand::thread_rng().gen_range(0..=base_backoff.as_millis() as u64);
                            Duration::from_millis(jittered_ms.max(10))
                        }
                    };

                    warn!(
                        error = %e,
                        url = req.url,
                        retry = retries,
                        max_retries = max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying request"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_once(&self, req: &Request<'_>) -> SkinResult<String> {
        let mut request = self.client.request(req.method.clone(), req.url);

        if req.service == Service::Generator {
            if let Some(key) = &self.config.api_key {
                request = request.bearer_auth(key);
            }
        }

        if let Some(form) = req.form {
            request = request.form(form);
        }

        debug!(url = req.url, method = %req.method, "sending upstream request");
        let response = request.send().await?;
        let status = response.status();

        match status.as_u16() {
            204 => Err(SkinError::NotFound {
                subject: req.subject.to_string(),
            }),

            200..=299 => response.text().await.map_err(|e| SkinError::UpstreamUnavailable {
                message: format!("failed to read response body: {}", e),
            }),

            404 if req.service != Service::Generator => Err(SkinError::NotFound {
                subject: req.subject.to_string(),
            }),

            429 => {
                let header = retry_after_header(response.headers());
                let body = response.text().await.unwrap_or_default();
                let retry_after = header.or_else(|| {
                    let now = chrono::Utc::now().timestamp().max(0) as u64;
                    generator_delay(&body, now)
                });

                Err(SkinError::RateLimited { retry_after })
            }

            400 | 403 | 500..=599 if req.service == Service::Generator => {
                let body = response.text().await.unwrap_or_default();
                Err(classify_generator_error(status.as_u16(), &body))
            }

            500..=599 => {
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(SkinError::UpstreamUnavailable {
                    message: format!("HTTP {}: {}", status.as_u16(), truncate(&message)),
                })
            }

            _ => Err(unexpected_status(status)),
        }
    }
}

fn unexpected_status(status: StatusCode) -> SkinError {
    SkinError::InvalidResponse {
        message: format!("unexpected HTTP status {}", status),
    }
}
