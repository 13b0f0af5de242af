pub mod animation;
pub mod classify;
pub mod member;
pub mod render;
pub mod roster;

pub use animation::{COUNTER_ANIMATION_MS, CountUp};
pub use classify::{BotRule, BotRules, Classification};
pub use member::*;
pub use render::{RETRY_ACTION, RenderedRoster, TeamPage, escape_html, render_roster, render_team_page};
pub use roster::{Counter, Roster, RosterStats, partition, sort_group};
