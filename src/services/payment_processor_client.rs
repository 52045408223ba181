use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::app::config::Config;
use crate::models::transaction::TransactionRequest;
use crate::services::credential_provider::AccessToken;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("processor timed out")]
    Timeout,
    #[error("processor unreachable: {0}")]
    Transport(String),
    #[error("processor returned HTTP {status}")]
    Status { status: u16, body: String },
    #[error("processor returned a non-JSON body: {0}")]
    InvalidBody(String),
}

impl GatewayError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Outbound calls to the processor API. Both require a bearer token.
#[async_trait]
pub trait TransactionGateway: Send + Sync {
    async fn submit_transaction(
        &self,
        token: &AccessToken,
        request: &TransactionRequest,
    ) -> Result<Value, GatewayError>;

    async fn fetch_applications(&self, token: &AccessToken) -> Result<Value, GatewayError>;
}

pub struct PaymentProcessorClient {
    client: Client,
    transactions_url: Url,
    applications_url: Url,
}

impl PaymentProcessorClient {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            transactions_url: config.transactions_url.clone(),
            applications_url: config.applications_url.clone(),
        }
    }

    async fn read_json(response: Response) -> Result<Value, GatewayError> {
        let status = response.status();
        let body = response.text().await.map_err(GatewayError::from_reqwest)?;

        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| GatewayError::InvalidBody(e.to_string()))
    }
}

#[async_trait]
impl TransactionGateway for PaymentProcessorClient {
    async fn submit_transaction(
        &self,
        token: &AccessToken,
        request: &TransactionRequest,
    ) -> Result<Value, GatewayError> {
        debug!(url = %self.transactions_url, reference = %request.reference, "POST transaction");

        let response = self
            .client
            .post(self.transactions_url.clone())
            .bearer_auth(token.as_str())
            .json(request)
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;

        Self::read_json(response).await
    }

    async fn fetch_applications(&self, token: &AccessToken) -> Result<Value, GatewayError> {
        debug!(url = %self.applications_url, "GET applications");

        let response = self
            .client
            .get(self.applications_url.clone())
            .bearer_auth(token.as_str())
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;

        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::PayloadSettings;
    use crate::models::payment::PaymentRequest;
    use crate::test_support::{spawn_upstream, test_config};
    use axum::{
        http::{header, HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};
    use uuid::Uuid;

    fn transaction() -> TransactionRequest {
        let payment = PaymentRequest {
            email: Some("ana@example.com".to_string()),
            card_holder: Some("Ana Perez".to_string()),
            card_number: Some("4242424242424242".to_string()),
            expiry_date: Some("09/26".to_string()),
            cvc: Some("123".to_string()),
            amount: Some(dec!(12.34)),
        }
        .validate(true)
        .unwrap();
        TransactionRequest::new(&payment, &PayloadSettings::default(), Uuid::new_v4())
    }

    fn client_for(addr: std::net::SocketAddr, extra: &[(&str, &str)]) -> PaymentProcessorClient {
        let config = test_config(
            &format!("http://{addr}/connect/token"),
            &format!("http://{addr}"),
            extra,
        );
        let client = crate::services::http_client::build_http_client(&config).unwrap();
        PaymentProcessorClient::new(client, &config)
    }

    #[tokio::test]
    async fn test_submits_json_with_bearer_token() {
        let seen: Arc<Mutex<Option<(Option<String>, Value)>>> = Arc::default();
        let router = Router::new().route(
            "/v1/transactions",
            post({
                let seen = seen.clone();
                move |headers: HeaderMap, Json(body): Json<Value>| {
                    let seen = seen.clone();
                    async move {
                        let auth = headers
                            .get(header::AUTHORIZATION)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        *seen.lock().unwrap() = Some((auth, body));
                        Json(json!({ "data": { "id": "tx-9", "status": "APPROVED" } }))
                    }
                }
            }),
        );
        let addr = spawn_upstream(router).await;

        let response = assert_ok!(
            client_for(addr, &[])
                .submit_transaction(&AccessToken::new("tok-abc"), &transaction())
                .await
        );
        assert_eq!(response["data"]["status"], "APPROVED");

        let (auth, body) = seen.lock().unwrap().take().unwrap();
        assert_eq!(auth.as_deref(), Some("Bearer tok-abc"));
        assert_eq!(body["amount"], 1234);
        assert_eq!(body["payment_source"]["exp_year"], "2026");
        assert_eq!(body["payment_source"]["type"], "CARD");
    }

    #[tokio::test]
    async fn test_error_status_keeps_body_for_logging() {
        let router = Router::new().route(
            "/v1/transactions",
            post(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "error": { "type": "INPUT_VALIDATION_ERROR" } })),
                )
            }),
        );
        let addr = spawn_upstream(router).await;

        let err = assert_err!(
            client_for(addr, &[])
                .submit_transaction(&AccessToken::new("t"), &transaction())
                .await
        );
        match err {
            GatewayError::Status { status, body } => {
                assert_eq!(status, 422);
                assert!(body.contains("INPUT_VALIDATION_ERROR"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_invalid() {
        let router = Router::new().route("/v1/transactions", post(|| async { "<html>oops</html>" }));
        let addr = spawn_upstream(router).await;

        let err = assert_err!(
            client_for(addr, &[])
                .submit_transaction(&AccessToken::new("t"), &transaction())
                .await
        );
        assert!(matches!(err, GatewayError::InvalidBody(_)));
    }

    #[tokio::test]
    async fn test_slow_processor_times_out() {
        let router = Router::new().route(
            "/v1/transactions",
            post(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Json(json!({}))
            }),
        );
        let addr = spawn_upstream(router).await;

        let err = assert_err!(
            client_for(addr, &[("REQUEST_TIMEOUT_MS", "50")])
                .submit_transaction(&AccessToken::new("t"), &transaction())
                .await
        );
        assert!(matches!(err, GatewayError::Timeout));
    }

    #[tokio::test]
    async fn test_fetches_applications() {
        let router = Router::new().route(
            "/Aplicativo",
            get(|headers: HeaderMap| async move {
                let authorized = headers
                    .get(header::AUTHORIZATION)
                    .is_some_and(|v| v == "Bearer tok-apps");
                if authorized {
                    (StatusCode::OK, Json(json!([{ "idAplicativo": "app-1" }])))
                } else {
                    (StatusCode::UNAUTHORIZED, Json(json!({})))
                }
            }),
        );
        let addr = spawn_upstream(router).await;

        let apps = assert_ok!(
            client_for(addr, &[])
                .fetch_applications(&AccessToken::new("tok-apps"))
                .await
        );
        assert_eq!(apps, json!([{ "idAplicativo": "app-1" }]));
    }
}
