use chrono::{DateTime, Utc};
use roster_shared::render::{ERROR_HTML, LOADING_HTML};
use roster_shared::{Counter, RenderedRoster, RosterStats, TeamPage, render_team_page};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Loading,
    Success,
    Failure,
}

/// Output surface the roster builder writes to: two list containers and three
/// counters. Each call replaces what it touches wholesale.
pub trait RosterView {
    fn show_loading(&mut self);
    fn show_roster(&mut self, rendered: RenderedRoster);
    fn show_error(&mut self);
    fn set_counter(&mut self, counter: Counter, value: u64);
}

#[derive(Debug, Clone)]
pub struct PageView {
    phase: Phase,
    members_html: String,
    bots_html: String,
    counters: [u64; 3],
    /// Sequence of the last cycle whose result was applied.
    applied_seq: u64,
    /// Sequence of the successful cycle that owns the counters.
    counter_seq: u64,
    stats: Option<RosterStats>,
    server_name: Option<String>,
    instant_invite: Option<String>,
    fetched_at: Option<DateTime<Utc>>,
}

impl Default for PageView {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            members_html: LOADING_HTML.to_string(),
            bots_html: LOADING_HTML.to_string(),
            counters: [0; 3],
            applied_seq: 0,
            counter_seq: 0,
            stats: None,
            server_name: None,
            instant_invite: None,
            fetched_at: None,
        }
    }
}

impl RosterView for PageView {
    fn show_loading(&mut self) {
        self.phase = Phase::Loading;
        self.members_html = LOADING_HTML.to_string();
        self.bots_html = LOADING_HTML.to_string();
    }

    fn show_roster(&mut self, rendered: RenderedRoster) {
        self.phase = Phase::Success;
        self.members_html = rendered.members_html;
        self.bots_html = rendered.bots_html;
    }

    fn show_error(&mut self) {
        self.phase = Phase::Failure;
        self.members_html = ERROR_HTML.to_string();
        self.bots_html.clear();
    }

    fn set_counter(&mut self, counter: Counter, value: u64) {
        self.counters[counter.index()] = value;
    }
}

impl PageView {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn members_html(&self) -> &str {
        &self.members_html
    }

    pub fn bots_html(&self) -> &str {
        &self.bots_html
    }

    pub fn counter(&self, counter: Counter) -> u64 {
        self.counters[counter.index()]
    }

    pub fn applied_seq(&self) -> u64 {
        self.applied_seq
    }

    pub fn counter_seq(&self) -> u64 {
        self.counter_seq
    }

    pub fn stats(&self) -> Option<RosterStats> {
        self.stats
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn mark_applied(&mut self, seq: u64) {
        self.applied_seq = seq;
    }

    pub fn set_server_info(&mut self, name: Option<String>, instant_invite: Option<String>) {
        self.server_name = name;
        self.instant_invite = instant_invite;
        self.fetched_at = Some(Utc::now());
    }

    /// Hands the counters to the animation for `seq`, restarting each from 0.
    pub fn reset_counters(&mut self, seq: u64, stats: RosterStats) {
        self.counter_seq = seq;
        self.stats = Some(stats);
        self.counters = [0; 3];
    }

    pub fn render_page(&self) -> String {
        render_team_page(&TeamPage {
            server_name: self.server_name.as_deref(),
            instant_invite: self.instant_invite.as_deref(),
            members_html: &self.members_html,
            bots_html: &self.bots_html,
            counters: self.counters,
        })
    }

    pub fn payload(&self) -> RosterPayload<'_> {
        RosterPayload {
            seq: self.applied_seq,
            phase: self.phase,
            members_html: &self.members_html,
            bots_html: &self.bots_html,
            counters: CounterValues {
                total: self.counter(Counter::Total),
                online_humans: self.counter(Counter::OnlineHumans),
                bots: self.counter(Counter::Bots),
            },
            stats: self.stats,
            server_name: self.server_name.as_deref(),
            instant_invite: self.instant_invite.as_deref(),
            fetched_at: self.fetched_at.map(|at| at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CounterValues {
    pub total: u64,
    pub online_humans: u64,
    pub bots: u64,
}

#[derive(Debug, Serialize)]
pub struct RosterPayload<'a> {
    pub seq: u64,
    pub phase: Phase,
    pub members_html: &'a str,
    pub bots_html: &'a str,
    pub counters: CounterValues,
    pub stats: Option<RosterStats>,
    pub server_name: Option<&'a str>,
    pub instant_invite: Option<&'a str>,
    pub fetched_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use roster_shared::render::{ERROR_HTML, LOADING_HTML};
    use roster_shared::{Counter, RenderedRoster, RosterStats};

    use super::{PageView, Phase, RosterView};

    #[test]
    fn error_replaces_both_containers_and_keeps_counters() {
        let mut view = PageView::default();
        view.show_roster(RenderedRoster {
            members_html: "<p>humans</p>".to_string(),
            bots_html: "<p>bots</p>".to_string(),
        });
        view.set_counter(Counter::Total, 9);

        view.show_error();

        assert_eq!(view.phase(), Phase::Failure);
        assert_eq!(view.members_html(), ERROR_HTML);
        assert!(view.bots_html().is_empty());
        assert_eq!(view.counter(Counter::Total), 9);
    }

    #[test]
    fn loading_fills_both_containers() {
        let mut view = PageView::default();
        view.show_error();
        view.show_loading();
        assert_eq!(view.phase(), Phase::Loading);
        assert_eq!(view.members_html(), LOADING_HTML);
        assert_eq!(view.bots_html(), LOADING_HTML);
    }

    #[test]
    fn reset_counters_restarts_from_zero() {
        let mut view = PageView::default();
        view.set_counter(Counter::Bots, 3);
        let stats = RosterStats {
            total: 5,
            online_humans: 2,
            bots: 1,
        };
        view.reset_counters(4, stats);

        assert_eq!(view.counter_seq(), 4);
        assert_eq!(view.counter(Counter::Bots), 0);
        assert_eq!(view.stats(), Some(stats));
    }

    #[test]
    fn payload_serializes_phase_and_counters() {
        let mut view = PageView::default();
        view.show_loading();
        view.set_counter(Counter::OnlineHumans, 2);
        let json = serde_json::to_value(view.payload()).expect("payload should serialize");
        assert_eq!(json["phase"], "loading");
        assert_eq!(json["counters"]["online_humans"], 2);
        assert!(json["stats"].is_null());
    }
}
