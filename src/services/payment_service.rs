use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::app::config::PayloadSettings;
use crate::models::payment::{mask_card_number, PaymentRequest, ValidationError};
use crate::models::transaction::{classify_transaction, TransactionOutcome, TransactionRequest};
use crate::services::credential_provider::{AuthError, CredentialProvider};
use crate::services::payment_processor_client::{GatewayError, TransactionGateway};
use crate::utils::money::format_currency;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("authentication with the processor failed: {0}")]
    Authentication(#[from] AuthError),
    #[error("processor call failed: {0}")]
    Gateway(#[from] GatewayError),
    #[error("processor response has no transaction status")]
    UnexpectedResponse,
}

impl ServiceError {
    /// Stable code handed to callers instead of upstream diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Authentication(_) => "AUTHENTICATION_FAILED",
            Self::Gateway(GatewayError::Timeout | GatewayError::Transport(_)) => {
                "PROCESSOR_UNAVAILABLE"
            }
            Self::Gateway(GatewayError::Status { .. }) => "PROCESSOR_ERROR",
            Self::Gateway(GatewayError::InvalidBody(_)) | Self::UnexpectedResponse => {
                "UNEXPECTED_RESPONSE"
            }
        }
    }
}

pub struct PaymentService {
    credentials: Arc<dyn CredentialProvider>,
    gateway: Arc<dyn TransactionGateway>,
    settings: PayloadSettings,
}

impl PaymentService {
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        gateway: Arc<dyn TransactionGateway>,
        settings: PayloadSettings,
    ) -> Self {
        Self {
            credentials,
            gateway,
            settings,
        }
    }

    /// Validates the payment, obtains a fresh token and submits the
    /// transaction once. The submission is never retried.
    pub async fn process_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<TransactionOutcome, ServiceError> {
        let reference = Uuid::new_v4();
        self.forward(request, reference)
            .instrument(info_span!("payment", %reference))
            .await
    }

    async fn forward(
        &self,
        request: PaymentRequest,
        reference: Uuid,
    ) -> Result<TransactionOutcome, ServiceError> {
        let payment = request
            .validate(self.settings.validate_fields)
            .inspect_err(|e| warn!("Rejected payment request: {}", e))?;
        let transaction = TransactionRequest::new(&payment, &self.settings, reference);

        let token = self.credentials.access_token().await?;

        info!(
            card = %mask_card_number(&payment.card_number),
            "Submitting transaction of {} {}",
            format_currency(transaction.amount.value()),
            transaction.currency
        );

        let body = self
            .gateway
            .submit_transaction(&token, &transaction)
            .await
            .inspect_err(log_gateway_error)?;

        match classify_transaction(&body) {
            Some(TransactionOutcome::Approved(summary)) => {
                info!(transaction_id = ?summary.id, "Payment approved");
                Ok(TransactionOutcome::Approved(summary))
            }
            Some(TransactionOutcome::Declined(detail)) => {
                warn!(
                    transaction_id = ?detail.transaction_id,
                    status = %detail.status,
                    upstream_body = %body,
                    "Payment declined"
                );
                Ok(TransactionOutcome::Declined(detail))
            }
            None => {
                error!(upstream_body = %body, "Processor response carried no transaction status");
                Err(ServiceError::UnexpectedResponse)
            }
        }
    }

    /// Proxies the processor's applications listing using a fresh token.
    pub async fn application_data(&self) -> Result<Value, ServiceError> {
        let token = self.credentials.access_token().await?;
        let apps = self
            .gateway
            .fetch_applications(&token)
            .await
            .inspect_err(log_gateway_error)?;
        Ok(apps)
    }
}

fn log_gateway_error(err: &GatewayError) {
    match err {
        GatewayError::Status { status, body } => {
            error!(status, upstream_body = %body, "Processor returned an error status")
        }
        other => error!("Processor call failed: {}", other),
    }
}
