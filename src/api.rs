const DEFAULT_NUM_STORIES: i64 = 10;

#[derive(Debug, Clone)]
pub(crate) struct AppState {
    pub(crate) aggregator: std::sync::Arc<crate::stories::Aggregator>,
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct BestStoriesQuery {
    n: Option<i64>,
}

pub(crate) fn create_router(state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/api/beststories", axum::routing::get(best_stories))
        .route("/health", axum::routing::get(health))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn best_stories(
    axum::extract::State(state): axum::extract::State<AppState>,
    axum::extract::Query(query): axum::extract::Query<BestStoriesQuery>,
) -> Result<axum::Json<crate::stories::Stories>, crate::stories::StoriesError> {
    let n = query.n.unwrap_or(DEFAULT_NUM_STORIES);
    let stories = state.aggregator.top_stories(n).await?;
    Ok(axum::Json(stories))
}

async fn health() -> &'static str {
    "ok"
}

impl axum::response::IntoResponse for crate::stories::StoriesError {
    fn into_response(self) -> axum::response::Response {
        use axum::response::IntoResponse;

        match self {
            crate::stories::StoriesError::InvalidArgument(message) => {
                (axum::http::StatusCode::BAD_REQUEST, message).into_response()
            }
            crate::stories::StoriesError::UpstreamUnavailable(e) => {
                tracing::error!(error = %e, "Error fetching stories");
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error fetching stories: {e}"),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stories::tests::{aggregator_for, mount_ids, mount_item, settings};
    use axum::http::StatusCode;
    use tower::ServiceExt;
    use wiremock::MockServer;

    fn router_for(server: &MockServer) -> axum::Router {
        create_router(AppState {
            aggregator: std::sync::Arc::new(aggregator_for(
                server,
                settings(std::time::Duration::from_secs(300)),
            )),
        })
    }

    async fn get_uri(router: axum::Router, uri: &str) -> (StatusCode, axum::body::Bytes) {
        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri(uri)
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn test_best_stories_sorted_by_score() {
        let server = MockServer::start().await;
        mount_ids(&server, &[101, 102, 103, 104, 105], 1).await;
        mount_item(&server, 101, 10, 1).await;
        mount_item(&server, 102, 50, 1).await;
        mount_item(&server, 103, 30, 1).await;

        let (status, body) = get_uri(router_for(&server), "/api/beststories?n=3").await;

        assert_eq!(status, StatusCode::OK);
        let stories: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        let scores: Vec<i64> = stories.iter().map(|s| s["score"].as_i64().unwrap()).collect();
        assert_eq!(scores, vec![50, 30, 10]);

        let first = &stories[0];
        assert_eq!(first["title"], "Story 102");
        assert_eq!(first["url"], "https://example.com/102");
        assert_eq!(first["by"], "user102");
        assert_eq!(first["time"], 1_700_000_102);
        assert_eq!(first["descendants"], 102 % 7);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_missing_n_defaults_to_ten() {
        let server = MockServer::start().await;
        let ids: Vec<i64> = (1..=12).collect();
        mount_ids(&server, &ids, 1).await;
        for id in 1..=10 {
            mount_item(&server, id, id as u64, 1).await;
        }
        mount_item(&server, 11, 11, 0).await;
        mount_item(&server, 12, 12, 0).await;

        let (status, body) = get_uri(router_for(&server), "/api/beststories").await;

        assert_eq!(status, StatusCode::OK);
        let stories: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(stories.len(), 10);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_non_positive_n_is_bad_request() {
        let server = MockServer::start().await;
        mount_ids(&server, &[1], 0).await;

        let (status, body) = get_uri(router_for(&server), "/api/beststories?n=0").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(&body[..], b"The number of stories must be greater than 0.");
        server.verify().await;
    }

    #[tokio::test]
    async fn test_non_integer_n_is_bad_request() {
        let server = MockServer::start().await;
        mount_ids(&server, &[1], 0).await;

        let (status, _) = get_uri(router_for(&server), "/api/beststories?n=ten").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_empty_id_list_is_internal_error() {
        let server = MockServer::start().await;
        mount_ids(&server, &[], 1).await;

        let (status, body) = get_uri(router_for(&server), "/api/beststories?n=3").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.starts_with("Error fetching stories: "), "{text}");
        assert!(text.contains("Failed to fetch the story IDs"), "{text}");
    }

    #[tokio::test]
    async fn test_health() {
        let server = MockServer::start().await;

        let (status, body) = get_uri(router_for(&server), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"ok");
    }
}
