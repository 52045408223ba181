use reqwest::Client;
use std::time::Duration;

use crate::app::config::Config;

/// Builds the single outbound client shared by the identity and transaction calls.
/// The configured timeout bounds each call end to end.
pub fn build_http_client(config: &Config) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.request_timeout)
        .pool_max_idle_per_host(20) // Mantém conexões vivas
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}
