//! Active health checking of the render service.
//!
//! # Responsibilities
//! - Periodically check the render endpoint
//! - Update the shared health flag based on results

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::config::RenderConfig;
use crate::health::state::RenderHealth;

pub struct HealthMonitor {
    health: RenderHealth,
    endpoint: String,
    interval: Duration,
    timeout: Duration,
    client: reqwest::Client,
}

impl HealthMonitor {
    pub fn new(health: RenderHealth, config: &RenderConfig) -> Self {
        Self {
            health,
            endpoint: config.endpoint.clone(),
            interval: Duration::from_secs(config.health_interval_secs),
            timeout: Duration::from_secs(config.health_timeout_secs),
            client: reqwest::Client::new(),
        }
    }

    /// Check every interval until shutdown. The first check runs one
    /// interval after start; until then the service counts as healthy.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            endpoint = %self.endpoint,
            "Render health monitor starting"
        );

        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let healthy = self.check().await;
                    self.health.set(healthy);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One GET check. Transport errors, timeouts and 5xx count as unhealthy.
    pub async fn check(&self) -> bool {
        let request = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT_ENCODING, "gzip,deflate")
            .timeout(self.timeout)
            .send();

        match request.await {
            Ok(response) if response.status().is_server_error() => {
                tracing::warn!(status = %response.status(), "Render health check failed: server error");
                false
            }
            Ok(_) => true,
            Err(e) if e.is_timeout() => {
                tracing::warn!("Render health check failed: timeout");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Render health check failed: connection error");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn monitor(endpoint: String, interval_secs: u64) -> (HealthMonitor, RenderHealth) {
        let health = RenderHealth::new();
        let config = RenderConfig {
            endpoint,
            health_interval_secs: interval_secs,
            health_timeout_secs: 1,
            ..RenderConfig::default()
        };
        (HealthMonitor::new(health.clone(), &config), health)
    }

    #[tokio::test]
    async fn test_check_outcomes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(405))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (monitor, _) = monitor(server.uri(), 60);
        // Any non-5xx answer means the service is up.
        assert!(monitor.check().await);
        assert!(!monitor.check().await);
    }

    #[tokio::test]
    async fn test_unreachable_is_unhealthy() {
        let (monitor, _) = monitor("http://127.0.0.1:1/".to_string(), 60);
        assert!(!monitor.check().await);
    }

    #[tokio::test]
    async fn test_loop_updates_flag_and_stops_on_shutdown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (monitor, health) = monitor(server.uri(), 1);
        let mut rx = health.subscribe();
        let (tx, shutdown) = broadcast::channel(1);
        let handle = tokio::spawn(monitor.run(shutdown));

        assert!(health.is_healthy());
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(!health.is_healthy());

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    }
}
