use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use bytes::Bytes;
use futures::stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

use crate::config::SSE_KEEPALIVE_SECS;
use crate::state::AppState;

pub async fn roster_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        // Subscribe before reading the view so no render between the two is missed.
        let rx = state.event_tx.subscribe();
        if let Some((seq, payload)) = current_view_payload(&state).await {
            yield Ok(render_event(seq, payload));
        }

        let mut stream = BroadcastStream::new(rx);
        while let Some(result) = stream.next().await {
            match result {
                Ok(event) => {
                    let Some(payload) = event_payload(event.json.as_ref()) else {
                        warn!(seq = event.seq, "render payload is not valid utf-8; dropping SSE event");
                        continue;
                    };
                    yield Ok(render_event(event.seq, payload.to_string()));
                }
                Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(
                        skipped_events = skipped,
                        "SSE client lagged behind broadcast buffer; replaying current view"
                    );
                    if let Some((seq, payload)) = current_view_payload(&state).await {
                        yield Ok(render_event(seq, payload));
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEPALIVE_SECS))
            .text("keep-alive"),
    )
}

async fn current_view_payload(state: &AppState) -> Option<(u64, String)> {
    let view = state.view.read().await;
    match serde_json::to_string(&view.payload()) {
        Ok(json) => Some((view.applied_seq(), json)),
        Err(e) => {
            warn!(error = %e, "failed to serialize current view for SSE");
            None
        }
    }
}

fn render_event(seq: u64, payload: String) -> Event {
    Event::default()
        .id(seq.to_string())
        .event("render")
        .data(payload)
}

fn event_payload(bytes: &Bytes) -> Option<&str> {
    std::str::from_utf8(bytes.as_ref()).ok()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use roster_shared::{BotRules, Member, MemberSnapshot, MemberStatus};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use crate::services::roster_poller::{apply_result, issue_cycle};
    use crate::state::AppState;

    async fn read_until(stream: &mut tokio::net::TcpStream, needle: &str) -> String {
        let mut received = String::new();
        let mut buf = [0u8; 4096];
        while !received.contains(needle) {
            let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
                .await
                .expect("sse read timed out")
                .expect("sse read");
            assert!(n > 0, "sse stream closed early");
            received.push_str(&String::from_utf8_lossy(&buf[..n]));
        }
        received
    }

    #[tokio::test]
    async fn stream_sends_current_view_then_applied_renders() {
        let state = AppState::new(BotRules::default(), "http://127.0.0.1:9/unused");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let app = crate::app::build_app(state.clone());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });

        let mut stream = tokio::net::TcpStream::connect(addr)
            .await
            .expect("connect sse");
        stream
            .write_all(
                b"GET /api/events HTTP/1.1\r\nHost: localhost\r\nAccept: text/event-stream\r\n\r\n",
            )
            .await
            .expect("write request");

        let initial = read_until(&mut stream, "\"phase\":\"idle\"").await;
        assert!(initial.contains("event: render"));

        let seq = issue_cycle(&state);
        let snapshot = MemberSnapshot {
            presence_count: 1,
            members: vec![Member::new("Alice", MemberStatus::Online)],
            ..MemberSnapshot::default()
        };
        apply_result(&state, seq, Ok(snapshot)).await;

        let update = read_until(&mut stream, "\"phase\":\"success\"").await;
        assert!(update.contains("id: 1"));

        handle.abort();
        let _ = handle.await;
    }
}
