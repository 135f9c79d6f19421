//! Fan-out of incident events to configured webhook URLs.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::bus::IncidentEvent;
use crate::delivery::webhook::WebhookDelivery;

/// Bus subscriber that POSTs every incident event to each configured URL.
///
/// Each delivery runs on its own task so a slow or failing endpoint only
/// delays itself.
pub struct WebhookForwarder {
    urls: Vec<String>,
    delivery: Arc<WebhookDelivery>,
}

impl WebhookForwarder {
    pub fn new(urls: Vec<String>, delivery: WebhookDelivery) -> Self {
        Self {
            urls,
            delivery: Arc::new(delivery),
        }
    }

    /// Parse a comma-separated URL list, ignoring blank entries.
    pub fn parse_urls(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Run the forwarding loop until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<IncidentEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.forward(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Webhook forwarder lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, webhook forwarder shutting down");
                    break;
                }
            }
        }
    }

    fn forward(&self, event: IncidentEvent) {
        let event = Arc::new(event);
        for url in &self.urls {
            let url = url.clone();
            let event = Arc::clone(&event);
            let delivery = Arc::clone(&self.delivery);
            tokio::spawn(async move {
                if delivery.deliver(&url, &event).await.is_ok() {
                    tracing::debug!(%url, event_type = %event.event_type, "Webhook delivered");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;

    #[test]
    fn parse_urls_skips_blanks() {
        let urls = WebhookForwarder::parse_urls(" https://a.example/hook, ,https://b.example ");
        assert_eq!(urls, vec!["https://a.example/hook", "https://b.example"]);
    }

    #[tokio::test]
    async fn run_exits_when_bus_is_dropped() {
        let bus = EventBus::default();
        let forwarder = WebhookForwarder::new(vec![], WebhookDelivery::new());
        let handle = tokio::spawn(forwarder.run(bus.subscribe()));

        drop(bus);
        tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .expect("forwarder should stop")
            .unwrap();
    }
}
