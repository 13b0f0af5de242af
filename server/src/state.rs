use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use roster_shared::BotRules;
use tokio::sync::{RwLock, broadcast};
use tracing::warn;

use crate::config::{
    bot_rules_path, discord_server_id, poll_interval, sse_broadcast_buffer,
    upstream_connect_timeout, upstream_http_timeout, widget_url,
};
use crate::rules::load_bot_rules;
use crate::view::PageView;

/// Pre-serialized render event, serialized once and shared by all SSE clients.
#[derive(Debug, Clone)]
pub struct RenderEvent {
    pub seq: u64,
    pub json: Arc<Bytes>,
}

#[derive(Clone)]
pub struct AppState {
    pub view: Arc<RwLock<PageView>>,
    /// Last issued cycle ticket.
    pub next_seq: Arc<AtomicU64>,
    pub event_tx: broadcast::Sender<RenderEvent>,
    pub rules: Arc<BotRules>,
    pub widget_url: Arc<str>,
    pub poll_interval: Duration,
    pub http_client: reqwest::Client,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    cycles_started_total: AtomicU64,
    cycles_succeeded_total: AtomicU64,
    cycles_failed_total: AtomicU64,
    stale_cycles_discarded_total: AtomicU64,
    manual_retries_total: AtomicU64,
    page_requests_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySnapshot {
    pub cycles_started_total: u64,
    pub cycles_succeeded_total: u64,
    pub cycles_failed_total: u64,
    pub stale_cycles_discarded_total: u64,
    pub manual_retries_total: u64,
    pub page_requests_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            cycles_started_total: self.cycles_started_total.load(Ordering::Relaxed),
            cycles_succeeded_total: self.cycles_succeeded_total.load(Ordering::Relaxed),
            cycles_failed_total: self.cycles_failed_total.load(Ordering::Relaxed),
            stale_cycles_discarded_total: self
                .stale_cycles_discarded_total
                .load(Ordering::Relaxed),
            manual_retries_total: self.manual_retries_total.load(Ordering::Relaxed),
            page_requests_total: self.page_requests_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_cycle_started(&self) {
        self.cycles_started_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle_succeeded(&self) {
        self.cycles_succeeded_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle_failed(&self) {
        self.cycles_failed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_cycle_discarded(&self) {
        self.stale_cycles_discarded_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_manual_retry(&self) {
        self.manual_retries_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page_request(&self) {
        self.page_requests_total.fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    pub fn new(rules: BotRules, widget_url: impl Into<Arc<str>>) -> Self {
        let (event_tx, _) = broadcast::channel(sse_broadcast_buffer());
        let request_timeout = upstream_http_timeout();
        let connect_timeout = upstream_connect_timeout();
        let http_client = reqwest::Client::builder()
            .user_agent("discord-roster/0.1")
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .or_else(|e| {
                warn!(
                    error = %e,
                    "failed to build configured HTTP client, retrying without custom user-agent"
                );
                reqwest::Client::builder()
                    .timeout(request_timeout)
                    .connect_timeout(connect_timeout)
                    .build()
            })
            .unwrap_or_else(|e| {
                panic!("failed to build timeout-configured HTTP client: {e}");
            });
        Self {
            view: Arc::new(RwLock::new(PageView::default())),
            next_seq: Arc::new(AtomicU64::new(0)),
            event_tx,
            rules: Arc::new(rules),
            widget_url: widget_url.into(),
            poll_interval: poll_interval(),
            http_client,
            observability: Arc::new(ObservabilityCounters::default()),
        }
    }

    pub fn from_env() -> Self {
        let rules = load_bot_rules(bot_rules_path().as_deref());
        Self::new(rules, widget_url(&discord_server_id()))
    }

    /// Serializes the current view and broadcasts it. No receivers is fine.
    pub fn publish(&self, view: &PageView) {
        let payload = match serde_json::to_vec(&view.payload()) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize render event");
                return;
            }
        };
        let _ = self.event_tx.send(RenderEvent {
            seq: view.applied_seq(),
            json: Arc::new(Bytes::from(payload)),
        });
    }
}
