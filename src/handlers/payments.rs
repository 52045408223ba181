use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::models::payment::PaymentRequest;
use crate::models::response::ApiResponse;
use crate::models::transaction::TransactionOutcome;
use crate::services::{PaymentService, ServiceError};

pub async fn process_payment(
    State(service): State<Arc<PaymentService>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse>) {
    let request = match payload.map_err(|e| e.body_text()).and_then(|Json(body)| {
        serde_json::from_value::<PaymentRequest>(body).map_err(|e| e.to_string())
    })
    {
        Ok(req) => req,
        Err(e) => {
            error!("Invalid payment request: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::failure(format!("Invalid payment request: {e}"), None)),
            );
        }
    };

    match service.process_payment(request).await {
        Ok(TransactionOutcome::Approved(summary)) => {
            info!("Payment processed successfully");
            (
                StatusCode::OK,
                Json(ApiResponse::success("Payment successful", json!(summary))),
            )
        }
        Ok(TransactionOutcome::Declined(detail)) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::failure("Payment declined", Some(json!(detail)))),
        ),
        Err(ServiceError::Validation(e)) => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::failure(e.to_string(), None)),
        ),
        Err(e) => {
            error!("Failed to process payment: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::failure(
                    "Error processing payment",
                    Some(json!(e.code())),
                )),
            )
        }
    }
}
