pub mod config;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers::{app_data, payments};
use crate::services::http_client::build_http_client;
use crate::services::{OAuthCredentialProvider, PaymentProcessorClient, PaymentService};
use config::Config;

/// Wires the real identity and processor clients around one shared HTTP client.
pub fn build_service(config: &Config) -> reqwest::Result<PaymentService> {
    let client = build_http_client(config)?;
    let credentials = Arc::new(OAuthCredentialProvider::new(client.clone(), config));
    let gateway = Arc::new(PaymentProcessorClient::new(client, config));
    Ok(PaymentService::new(
        credentials,
        gateway,
        config.payload.clone(),
    ))
}

pub fn router(service: Arc<PaymentService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/process-payment", post(payments::process_payment))
        .route("/app-data", get(app_data::get_app_data))
        .with_state(service)
}

async fn health_handler() -> StatusCode {
    StatusCode::OK
}
