use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::models::response::ApiResponse;
use crate::services::PaymentService;

pub async fn get_app_data(
    State(service): State<Arc<PaymentService>>,
) -> Result<Json<Value>, (StatusCode, Json<ApiResponse>)> {
    info!("Fetching processor application data");

    service.application_data().await.map(Json).map_err(|e| {
        error!("Failed to fetch application data: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::failure(
                "Error fetching application data",
                Some(json!(e.code())),
            )),
        )
    })
}
