use super::error::ApiError;
use super::AppState;
use crate::pipeline::types::Leaderboard;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

/// Raw query parameters; validation happens in the query engine
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardParams {
    pub category: Option<String>,
    pub page: Option<String>,
    pub cursor: Option<String>,
}

/// `GET /api/v1/leaderboard`
pub async fn get_leaderboard(
    State(state): State<AppState>,
    params: Result<Query<LeaderboardParams>, QueryRejection>,
) -> Result<Json<Leaderboard>, ApiError> {
    let Query(params) = params?;
    let leaderboard = state
        .engine
        .query_params(
            params.category.as_deref(),
            params.page.as_deref(),
            params.cursor.as_deref(),
        )
        .await?;

    Ok(Json(leaderboard))
}

pub async fn liveness() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "not found" })))
}
