//! Webhook delivery with exponential-backoff retry.
//!
//! [`WebhookDelivery`] POSTs a JSON-encoded [`IncidentEvent`] to an external
//! URL. Failed attempts are retried with backoff (1 s, 2 s, 4 s by default).

use std::time::Duration;

use crate::bus::IncidentEvent;

/// Retry delays in seconds (exponential backoff: 1s, 2s, 4s).
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// WebhookDelivery
// ---------------------------------------------------------------------------

/// Delivers incident events to external webhook endpoints.
pub struct WebhookDelivery {
    client: reqwest::Client,
    retry_delays: Vec<Duration>,
}

impl WebhookDelivery {
    /// Create a new delivery service with a pre-configured HTTP client.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            retry_delays: RETRY_DELAYS_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
        }
    }

    /// Override the backoff schedule. One retry is made per entry.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    /// Deliver an event to a webhook URL with retry.
    ///
    /// Returns `Ok(())` on the first successful attempt.
    pub async fn deliver(&self, url: &str, event: &IncidentEvent) -> Result<(), WebhookError> {
        let payload = serde_json::json!({
            "event_type": event.event_type,
            "incident_id": event.incident_id,
            "camera_id": event.camera_id,
            "payload": event.payload,
            "timestamp": event.timestamp,
        });

        let mut last_err: Option<WebhookError> = None;

        for (attempt, delay) in self.retry_delays.iter().enumerate() {
            match self.try_send(url, &payload).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url,
                        error = %e,
                        "Webhook delivery attempt failed, retrying"
                    );
                    last_err = Some(e);
                    tokio::time::sleep(*delay).await;
                }
            }
        }

        // Final attempt after the last backoff.
        match self.try_send(url, &payload).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(url, error = %e, "Webhook delivery failed after all retries");
                Err(last_err.unwrap_or(e))
            }
        }
    }

    /// Execute a single POST request and check the response status.
    async fn try_send(&self, url: &str, payload: &serde_json::Value) -> Result<(), WebhookError> {
        let response = self.client.post(url).json(payload).send().await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

impl Default for WebhookDelivery {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EVENT_INCIDENT_DETECTED;

    #[test]
    fn webhook_error_display_http_status() {
        let err = WebhookError::HttpStatus(502);
        assert_eq!(err.to_string(), "Webhook returned HTTP 502");
    }

    #[test]
    fn webhook_error_display_request() {
        let req_err = reqwest::Client::new().get("://bad").build().unwrap_err();
        let err = WebhookError::Request(req_err);
        assert!(err.to_string().contains("HTTP request failed"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_after_retries() {
        let delivery = WebhookDelivery::new().with_retry_delays(vec![Duration::ZERO]);
        let event = IncidentEvent::new(EVENT_INCIDENT_DETECTED).with_incident(1);

        // Nothing listens on the loopback discard port.
        let result = delivery.deliver("http://127.0.0.1:9/hook", &event).await;
        assert!(matches!(result, Err(WebhookError::Request(_))));
    }
}
