use std::fmt::Write as _;

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use bytes::Bytes;
use tracing::warn;

use crate::services::roster_poller;
use crate::state::{AppState, ObservabilitySnapshot};
use crate::view::Phase;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let (phase, applied_seq, fetched_at, stats) = {
        let view = state.view.read().await;
        (
            view.phase(),
            view.applied_seq(),
            view.fetched_at().map(|at| at.to_rfc3339()),
            view.stats(),
        )
    };
    let observability = state.observability.snapshot();
    Json(serde_json::json!({
        "status": "ok",
        "phase": phase,
        "applied_seq": applied_seq,
        "fetched_at": fetched_at,
        "stats": stats,
        "bot_rules": state.rules.len(),
        "observability": {
            "cycles_started_total": observability.cycles_started_total,
            "cycles_succeeded_total": observability.cycles_succeeded_total,
            "cycles_failed_total": observability.cycles_failed_total,
            "stale_cycles_discarded_total": observability.stale_cycles_discarded_total,
            "manual_retries_total": observability.manual_retries_total,
            "page_requests_total": observability.page_requests_total,
        }
    }))
}

pub async fn get_roster(State(state): State<AppState>) -> Response {
    let json = {
        let view = state.view.read().await;
        serde_json::to_vec(&view.payload())
    };
    match json {
        Ok(json) => json_bytes_response(Bytes::from(json), "no-cache", None),
        Err(e) => {
            warn!(error = %e, "failed to serialize roster payload");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Starts a cycle right away. Form posts from the error panel are sent back
/// to the team page; API callers get the issued cycle ticket.
pub async fn retry(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.observability.record_manual_retry();
    let seq = roster_poller::issue_cycle(&state);
    tokio::spawn(roster_poller::run_issued_cycle(state.clone(), seq));

    if is_form_post(&headers) {
        return Redirect::to("/team").into_response();
    }
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "seq": seq })),
    )
        .into_response()
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let (phase, applied_seq) = {
        let view = state.view.read().await;
        (view.phase(), view.applied_seq())
    };
    let body = render_prometheus_metrics(phase, applied_seq, state.observability.snapshot());

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn render_prometheus_metrics(
    phase: Phase,
    applied_seq: u64,
    observability: ObservabilitySnapshot,
) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "# HELP roster_applied_seq Sequence of the last applied roster cycle."
    );
    let _ = writeln!(body, "# TYPE roster_applied_seq gauge");
    let _ = writeln!(body, "roster_applied_seq {applied_seq}");

    let _ = writeln!(
        body,
        "# HELP roster_last_cycle_failed Whether the last applied cycle failed (1) or not (0)."
    );
    let _ = writeln!(body, "# TYPE roster_last_cycle_failed gauge");
    let _ = writeln!(
        body,
        "roster_last_cycle_failed {}",
        u8::from(phase == Phase::Failure)
    );

    let counters = [
        (
            "roster_cycles_started_total",
            "Roster cycles started.",
            observability.cycles_started_total,
        ),
        (
            "roster_cycles_succeeded_total",
            "Roster cycles that rendered a fresh snapshot.",
            observability.cycles_succeeded_total,
        ),
        (
            "roster_cycles_failed_total",
            "Roster cycles that ended in a fetch failure.",
            observability.cycles_failed_total,
        ),
        (
            "roster_stale_cycles_discarded_total",
            "Cycle results dropped because a newer cycle had already applied.",
            observability.stale_cycles_discarded_total,
        ),
        (
            "roster_manual_retries_total",
            "Cycles triggered through the retry endpoint.",
            observability.manual_retries_total,
        ),
        (
            "roster_page_requests_total",
            "Team page requests served.",
            observability.page_requests_total,
        ),
    ];
    for (name, help, value) in counters {
        let _ = writeln!(body, "# HELP {name} {help}");
        let _ = writeln!(body, "# TYPE {name} counter");
        let _ = writeln!(body, "{name} {value}");
    }

    body
}

fn is_form_post(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

pub(crate) fn json_bytes_response(
    body: Bytes,
    cache_control: &'static str,
    etag: Option<&str>,
) -> Response {
    bytes_response(body, "application/json", cache_control, etag)
}

pub(crate) fn bytes_response(
    body: Bytes,
    content_type: &'static str,
    cache_control: &'static str,
    etag: Option<&str>,
) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

pub(crate) fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate).trim()
}

pub(crate) fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}
