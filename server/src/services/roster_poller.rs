use std::sync::atomic::Ordering;

use roster_shared::{MemberSnapshot, Roster, RosterStats, render_roster};
use tracing::{debug, info, warn};

use crate::error::{FetchError, body_preview};
use crate::services::counter_animator;
use crate::state::AppState;
use crate::view::RosterView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Success(RosterStats),
    Failure,
    /// A newer cycle already applied its result; this one was dropped.
    Stale,
}

/// Starts a cycle on every tick. Cycles are spawned rather than awaited so a
/// slow fetch never delays the schedule; stale results are dropped on apply.
pub async fn run(state: AppState) {
    let mut interval = tokio::time::interval(state.poll_interval);

    loop {
        interval.tick().await;
        let seq = issue_cycle(&state);
        tokio::spawn(run_issued_cycle(state.clone(), seq));
    }
}

/// Hands out the next cycle ticket. Tickets order cycles by issue time.
pub fn issue_cycle(state: &AppState) -> u64 {
    state.next_seq.fetch_add(1, Ordering::AcqRel) + 1
}

pub async fn run_cycle(state: AppState) -> CycleOutcome {
    let seq = issue_cycle(&state);
    run_issued_cycle(state, seq).await
}

pub async fn run_issued_cycle(state: AppState, seq: u64) -> CycleOutcome {
    state.observability.record_cycle_started();
    begin_cycle(&state, seq).await;
    let result = fetch_snapshot(&state.http_client, &state.widget_url).await;
    apply_result(&state, seq, result).await
}

/// Shows loading placeholders unless a newer cycle has already been issued.
async fn begin_cycle(state: &AppState, seq: u64) {
    let mut view = state.view.write().await;
    if state.next_seq.load(Ordering::Acquire) != seq || view.applied_seq() >= seq {
        return;
    }
    view.show_loading();
    state.publish(&view);
}

pub(crate) async fn apply_result(
    state: &AppState,
    seq: u64,
    result: Result<MemberSnapshot, FetchError>,
) -> CycleOutcome {
    let outcome = {
        let mut view = state.view.write().await;
        if view.applied_seq() >= seq {
            debug!(
                seq,
                applied_seq = view.applied_seq(),
                "discarding stale roster cycle"
            );
            state.observability.record_stale_cycle_discarded();
            return CycleOutcome::Stale;
        }

        let outcome = match result {
            Ok(snapshot) => {
                let roster = Roster::from_snapshot(&snapshot, &state.rules);
                let stats = RosterStats::from_snapshot(&snapshot, &state.rules);
                view.show_roster(render_roster(&roster));
                view.set_server_info(snapshot.name, snapshot.instant_invite);
                view.reset_counters(seq, stats);
                info!(
                    seq,
                    humans = roster.humans.len(),
                    bots = roster.bots.len(),
                    presence_count = stats.total,
                    "roster refreshed"
                );
                state.observability.record_cycle_succeeded();
                CycleOutcome::Success(stats)
            }
            Err(e) => {
                warn!(seq, status = ?e.status(), error = %e, "failed to fetch discord widget");
                view.show_error();
                state.observability.record_cycle_failed();
                CycleOutcome::Failure
            }
        };
        view.mark_applied(seq);
        state.publish(&view);
        outcome
    };

    if let CycleOutcome::Success(stats) = outcome {
        tokio::spawn(counter_animator::run(state.clone(), seq, stats));
    }
    outcome
}

pub async fn fetch_snapshot(
    client: &reqwest::Client,
    url: &str,
) -> Result<MemberSnapshot, FetchError> {
    let resp = client.get(url).send().await.map_err(FetchError::Request)?;
    let status = resp.status();
    let bytes = resp.bytes().await.map_err(FetchError::Body)?;

    if !status.is_success() {
        return Err(FetchError::Status {
            status,
            preview: body_preview(&bytes),
        });
    }

    MemberSnapshot::from_widget_json(bytes.as_ref()).map_err(|source| FetchError::Decode {
        source,
        preview: body_preview(&bytes),
    })
}
