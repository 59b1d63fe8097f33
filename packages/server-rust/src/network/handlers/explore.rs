//! `POST /explore`: lists every dispatchable URL, grouped by namespace.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use super::AppState;

/// Returns the introspection mapping as a bare JSON object (no envelope).
pub async fn explore_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<BTreeMap<String, Vec<String>>> {
    let ctx = state.request_context(&headers);
    Json(state.explorer.explore(&ctx.origin))
}

#[cfg(test)]
mod tests {
    use axum::http::header::HOST;
    use axum::http::HeaderValue;

    use super::*;
    use crate::network::handlers::tests::test_state;

    #[tokio::test]
    async fn urls_use_the_request_host() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("birds.local:3000"));

        let listing = explore_handler(State(test_state()), headers).await.0;
        assert_eq!(
            listing["Routes for widgets"],
            vec![
                "http://birds.local:3000/widgets/list",
                "http://birds.local:3000/widgets/put"
            ]
        );
    }

    #[tokio::test]
    async fn missing_host_uses_fallback() {
        let listing = explore_handler(State(test_state()), HeaderMap::new()).await.0;
        assert!(listing["Routes for widgets"]
            .iter()
            .all(|url| url.starts_with("http://127.0.0.1:8080/")));
    }
}
