use std::time::Duration;

use roster_shared::{CountUp, Counter, RosterStats};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::config::{FRAME_INTERVAL_MS, FRAME_PUBLISH_INTERVAL_MS};
use crate::state::AppState;
use crate::view::RosterView;

type CounterAnimations = [(Counter, CountUp); 3];

fn animations_for(stats: RosterStats) -> CounterAnimations {
    Counter::ALL.map(|counter| (counter, CountUp::new(stats.target(counter))))
}

/// Drives the three counters from 0 to their targets, one write per frame.
/// Subscribers get intermediate frames at most every
/// `FRAME_PUBLISH_INTERVAL_MS`, and always the final values.
/// Stops early if a newer successful cycle takes over the counters.
pub async fn run(state: AppState, seq: u64, stats: RosterStats) {
    let animations = animations_for(stats);
    let started = Instant::now();
    let publish_every = Duration::from_millis(FRAME_PUBLISH_INTERVAL_MS);
    let mut last_published = started;
    let mut frames = tokio::time::interval(Duration::from_millis(FRAME_INTERVAL_MS));
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        frames.tick().await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        match apply_frame(&state, seq, &animations, elapsed_ms).await {
            FrameResult::Running => {
                if last_published.elapsed() >= publish_every {
                    publish_frame(&state, seq).await;
                    last_published = Instant::now();
                }
            }
            FrameResult::Finished => {
                publish_frame(&state, seq).await;
                return;
            }
            FrameResult::Superseded => {
                debug!(seq, "counter animation superseded by a newer cycle");
                return;
            }
        }
    }
}

async fn publish_frame(state: &AppState, seq: u64) {
    let view = state.view.read().await;
    if view.counter_seq() == seq {
        state.publish(&view);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameResult {
    Running,
    Finished,
    Superseded,
}

async fn apply_frame(
    state: &AppState,
    seq: u64,
    animations: &CounterAnimations,
    elapsed_ms: f64,
) -> FrameResult {
    let mut view = state.view.write().await;
    if view.counter_seq() != seq {
        return FrameResult::Superseded;
    }

    for (counter, animation) in animations {
        view.set_counter(*counter, animation.value_at(elapsed_ms));
    }

    if animations
        .iter()
        .all(|(_, animation)| animation.is_finished(elapsed_ms))
    {
        FrameResult::Finished
    } else {
        FrameResult::Running
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use roster_shared::{BotRules, Counter, RosterStats};

    use super::{FrameResult, animations_for, apply_frame, run};
    use crate::state::AppState;

    const STATS: RosterStats = RosterStats {
        total: 5,
        online_humans: 2,
        bots: 1,
    };

    fn test_state() -> AppState {
        AppState::new(BotRules::default(), "http://127.0.0.1:9/unused")
    }

    #[tokio::test]
    async fn frames_count_up_and_finish_at_targets() {
        let state = test_state();
        state.view.write().await.reset_counters(1, STATS);
        let animations = animations_for(STATS);

        assert_eq!(
            apply_frame(&state, 1, &animations, 500.0).await,
            FrameResult::Running
        );
        {
            let view = state.view.read().await;
            assert_eq!(view.counter(Counter::Total), 2);
            assert_eq!(view.counter(Counter::OnlineHumans), 1);
            assert_eq!(view.counter(Counter::Bots), 0);
        }

        assert_eq!(
            apply_frame(&state, 1, &animations, 1000.0).await,
            FrameResult::Finished
        );
        let view = state.view.read().await;
        assert_eq!(view.counter(Counter::Total), 5);
        assert_eq!(view.counter(Counter::OnlineHumans), 2);
        assert_eq!(view.counter(Counter::Bots), 1);
    }

    #[tokio::test]
    async fn newer_cycle_supersedes_running_animation() {
        let state = test_state();
        state.view.write().await.reset_counters(2, STATS);

        let result = apply_frame(&state, 1, &animations_for(STATS), 1000.0).await;

        assert_eq!(result, FrameResult::Superseded);
        assert_eq!(state.view.read().await.counter(Counter::Total), 0);
    }

    #[tokio::test]
    async fn run_reaches_targets_and_publishes_final_values() {
        let state = test_state();
        state.view.write().await.reset_counters(3, STATS);
        let mut rx = state.event_tx.subscribe();

        tokio::time::timeout(Duration::from_secs(5), run(state.clone(), 3, STATS))
            .await
            .expect("animation should finish");

        let view = state.view.read().await;
        assert_eq!(view.counter(Counter::Total), 5);
        assert_eq!(view.counter(Counter::Bots), 1);

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        let event = last.expect("final counters event");
        let json: serde_json::Value =
            serde_json::from_slice(event.json.as_ref()).expect("event json");
        assert_eq!(json["counters"]["total"], 5);
    }

    #[tokio::test]
    async fn run_publishes_throttled_intermediate_frames() {
        let stats = RosterStats {
            total: 100,
            online_humans: 40,
            bots: 3,
        };
        let state = test_state();
        state.view.write().await.reset_counters(4, stats);
        let mut rx = state.event_tx.subscribe();

        tokio::time::timeout(Duration::from_secs(5), run(state.clone(), 4, stats))
            .await
            .expect("animation should finish");

        let mut totals = Vec::new();
        while let Ok(event) = rx.try_recv() {
            let json: serde_json::Value =
                serde_json::from_slice(event.json.as_ref()).expect("event json");
            totals.push(json["counters"]["total"].as_u64().expect("total counter"));
        }

        assert_eq!(totals.last(), Some(&100));
        assert!(totals.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(
            totals.iter().any(|&total| total > 0 && total < 100),
            "expected intermediate frames, got {totals:?}"
        );
        // One second at one publish per 100 ms, plus the final frame.
        assert!(totals.len() <= 12, "frames were not throttled: {totals:?}");
    }
}
