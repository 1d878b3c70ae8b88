//! Gateway HTTP handler.

use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppError, models::dashboard::DashboardResponse,
    services::aggregation::AggregationGateway,
};

/// `GET /bff/dashboard/{userId}`
///
/// 200 whenever the profile is available, even if some account or
/// history lookups degraded. 404 for an unknown user.
pub async fn get_dashboard(
    State(gateway): State<Arc<AggregationGateway>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<DashboardResponse>, AppError> {
    let dashboard = gateway.dashboard(user_id).await?;
    Ok(Json(dashboard))
}
