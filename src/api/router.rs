use super::handlers::{get_leaderboard, liveness, not_found};
use super::AppState;
use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use std::time::Instant;

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/v1/leaderboard", get(get_leaderboard))
        .layer(middleware::from_fn(log_request));

    Router::new()
        .route("/", get(liveness))
        .nest("/api", api_routes)
        .fallback(not_found)
        .with_state(state)
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started = Instant::now();

    let response = next.run(request).await;

    log::info!(
        "📡 {} {} -> {} ({:?})",
        method,
        uri,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::category::Category;
    use crate::pipeline::db::{AppendLog, SqliteAppendLog};
    use crate::pipeline::query::QueryEngine;
    use crate::pipeline::types::{PlayerEntry, Ranking, Snapshot};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request as HttpRequest, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn app_with_snapshot() -> (Router, String) {
        let store = Arc::new(SqliteAppendLog::open_in_memory().unwrap());
        let snapshot = Snapshot::new().with_ranking(
            Category::Kills,
            Ranking::Players(vec![PlayerEntry {
                name: "alpha".to_string(),
                value: "42".to_string(),
            }]),
        );
        let id = store.append(&snapshot).await.unwrap();
        let state = AppState::new(Arc::new(QueryEngine::new(store)));
        (create_router(state), id.to_hex())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(HttpRequest::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_leaderboard_ok() {
        let (app, id) = app_with_snapshot().await;

        let (status, body) = get_json(app, "/api/v1/leaderboard?category=kills&page=1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["Id"], id);
        assert_eq!(body["MostKills"][0]["Name"], "alpha");
        assert_eq!(body["MostKills"][0]["Value"], "42");
    }

    #[tokio::test]
    async fn test_invalid_page_is_bad_request() {
        let (app, _) = app_with_snapshot().await;

        let (status, body) = get_json(app, "/api/v1/leaderboard?page=0").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("invalid page"));
    }

    #[tokio::test]
    async fn test_invalid_category_is_bad_request() {
        let (app, _) = app_with_snapshot().await;

        let (status, body) = get_json(app, "/api/v1/leaderboard?category=kills,nope").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid category: nope");
    }

    #[tokio::test]
    async fn test_malformed_query_string_is_json_bad_request() {
        let (app, _) = app_with_snapshot().await;

        let (status, body) = get_json(app, "/api/v1/leaderboard?page=1&page=2").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("page"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (app, _) = app_with_snapshot().await;

        let (status, body) = get_json(app, "/api/v2/nothing").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "not found");
    }

    #[tokio::test]
    async fn test_liveness() {
        let (app, _) = app_with_snapshot().await;

        let (status, body) = get_json(app, "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
