//! Fire-and-forget webhook delivery for health events.
//!
//! Delivery is best-effort and never on the request path: failures are
//! logged and dropped, a slow endpoint cannot back up the emitter.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use url::Url;

use super::bus::EventBus;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Subscribe to the bus and POST each event as JSON to `url`.
///
/// Runs until the shutdown signal fires. Lagged events are counted and
/// skipped, not replayed.
pub fn spawn_webhook_sink(
    url: Url,
    bus: &EventBus,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let mut events = bus.subscribe();
    let client = reqwest::Client::builder()
        .timeout(DELIVERY_TIMEOUT)
        .build()
        .unwrap_or_default();

    tokio::spawn(async move {
        tracing::info!(endpoint = %url, "Webhook sink started");
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => {
                        let client = client.clone();
                        let url = url.clone();
                        tokio::spawn(async move {
                            let body = event.to_json();
                            match client.post(url.clone()).json(&body).send().await {
                                Ok(response) if !response.status().is_success() => {
                                    tracing::warn!(
                                        endpoint = %url,
                                        status = %response.status(),
                                        event = event.name(),
                                        "Webhook delivery rejected"
                                    );
                                }
                                Ok(_) => {}
                                Err(e) => {
                                    tracing::warn!(
                                        endpoint = %url,
                                        event = event.name(),
                                        error = %e,
                                        "Webhook delivery failed"
                                    );
                                }
                            }
                        });
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Webhook sink lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = shutdown.recv() => {
                    tracing::info!("Webhook sink received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    })
}
