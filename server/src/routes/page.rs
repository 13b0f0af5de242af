use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use bytes::Bytes;
use roster_shared::render::content_etag;

use crate::routes::api::{bytes_response, if_none_match_matches, not_modified_response};
use crate::state::AppState;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Team page rendered from the current view. The ETag changes with every
/// visible change, including each counter frame.
pub async fn team_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.observability.record_page_request();
    let html = state.view.read().await.render_page();
    let etag = content_etag(html.as_bytes());

    if if_none_match_matches(&headers, &etag) {
        return not_modified_response("no-cache", Some(etag.as_str()));
    }

    bytes_response(
        Bytes::from(html),
        HTML_CONTENT_TYPE,
        "no-cache",
        Some(etag.as_str()),
    )
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use roster_shared::BotRules;
    use tower::ServiceExt;

    use crate::state::AppState;

    fn test_state() -> AppState {
        AppState::new(BotRules::default(), "http://127.0.0.1:9/unused")
    }

    #[tokio::test]
    async fn team_page_serves_html_with_etag() {
        let app = crate::app::build_app(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/team")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("team page response");

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        assert_eq!(content_type.as_deref(), Some("text/html; charset=utf-8"));
        assert!(response.headers().contains_key(header::ETAG));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let html = String::from_utf8(body.to_vec()).expect("utf-8 html");
        assert!(html.contains(r#"id="membersGrid""#));
        assert!(html.contains(r#"id="botsGrid""#));
        assert!(html.contains("loading-spinner"));
    }

    #[tokio::test]
    async fn matching_if_none_match_returns_not_modified() {
        let state = test_state();
        let first = crate::app::build_app(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/team")
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("first response");
        let etag = first
            .headers()
            .get(header::ETAG)
            .cloned()
            .expect("etag header");

        let second = crate::app::build_app(state.clone())
            .oneshot(
                Request::builder()
                    .uri("/team")
                    .header(header::IF_NONE_MATCH, etag)
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("second response");

        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(state.observability.snapshot().page_requests_total, 2);
    }
}
