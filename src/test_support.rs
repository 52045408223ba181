//! Fakes and fixtures shared by the unit tests.

use async_trait::async_trait;
use axum::Router;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use crate::app::config::Config;
use crate::models::payment::PaymentRequest;
use crate::models::transaction::TransactionRequest;
use crate::services::credential_provider::{AccessToken, AuthError, CredentialProvider};
use crate::services::payment_processor_client::{GatewayError, TransactionGateway};

/// Serves `router` on an ephemeral loopback port for the rest of the test.
pub async fn spawn_upstream(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

pub fn test_config(identity_url: &str, api_base_url: &str, extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("WOMPI_CLIENT_ID", "test-client"),
        ("WOMPI_CLIENT_SECRET", "test-secret"),
        ("WOMPI_IDENTITY_URL", identity_url),
        ("WOMPI_API_URL", api_base_url),
        ("TOKEN_RETRY_BACKOFF_MS", "1"),
        ("REQUEST_TIMEOUT_MS", "2000"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    vars.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    Config::from_map(&vars).unwrap()
}

pub fn complete_request() -> PaymentRequest {
    PaymentRequest {
        email: Some("ana@example.com".to_string()),
        card_holder: Some("Ana Perez".to_string()),
        card_number: Some("4242424242424242".to_string()),
        expiry_date: Some("09/26".to_string()),
        cvc: Some("123".to_string()),
        amount: Some(dec!(10.00)),
    }
}

/// Ordered record of outbound calls made through the fakes.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub struct FakeCredentials {
    token: Option<String>,
    log: CallLog,
}

impl FakeCredentials {
    pub fn issuing(token: &str, log: CallLog) -> Self {
        Self {
            token: Some(token.to_string()),
            log,
        }
    }

    pub fn failing(log: CallLog) -> Self {
        Self { token: None, log }
    }
}

#[async_trait]
impl CredentialProvider for FakeCredentials {
    async fn access_token(&self) -> Result<AccessToken, AuthError> {
        self.log.push("token");
        match &self.token {
            Some(token) => Ok(AccessToken::new(token.clone())),
            None => Err(AuthError::Transport("connection refused".to_string())),
        }
    }
}

pub struct FakeGateway {
    response: Result<Value, GatewayError>,
    last_request: Mutex<Option<Value>>,
    log: CallLog,
}

impl FakeGateway {
    pub fn responding(response: Result<Value, GatewayError>) -> Self {
        Self {
            response,
            last_request: Mutex::new(None),
            log: CallLog::default(),
        }
    }

    pub fn approving() -> Self {
        Self::responding(Ok(json!({
            "data": {
                "id": "tx-1",
                "status": "APPROVED",
                "reference": "ref-1",
                "amount_in_cents": 1000,
                "currency": "USD"
            }
        })))
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn last_request(&self) -> Option<Value> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransactionGateway for FakeGateway {
    async fn submit_transaction(
        &self,
        token: &AccessToken,
        request: &TransactionRequest,
    ) -> Result<Value, GatewayError> {
        self.log.push(format!("submit Bearer {}", token.as_str()));
        *self.last_request.lock().unwrap() = Some(serde_json::to_value(request).unwrap());
        self.response.clone()
    }

    async fn fetch_applications(&self, token: &AccessToken) -> Result<Value, GatewayError> {
        self.log.push(format!("applications Bearer {}", token.as_str()));
        Ok(json!([{ "idAplicativo": "app-1" }]))
    }
}
