use std::cmp::Ordering;

use icu_collator::{Collator, CollatorOptions, Strength};
use serde::{Deserialize, Serialize};

use crate::classify::{BotRules, Classification};
use crate::member::{Member, MemberSnapshot};

/// Members split into humans and bots, each group sorted for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    pub humans: Vec<Member>,
    pub bots: Vec<Member>,
}

impl Roster {
    pub fn from_snapshot(snapshot: &MemberSnapshot, rules: &BotRules) -> Self {
        let mut roster = partition(&snapshot.members, rules);
        sort_group(&mut roster.humans);
        sort_group(&mut roster.bots);
        roster
    }

    pub fn is_empty(&self) -> bool {
        self.humans.is_empty() && self.bots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.humans.len() + self.bots.len()
    }
}

/// Splits members into humans and bots, keeping input order within each group.
pub fn partition(members: &[Member], rules: &BotRules) -> Roster {
    let (bots, humans): (Vec<Member>, Vec<Member>) = members
        .iter()
        .cloned()
        .partition(|member| rules.classify(member).is_bot());
    Roster { humans, bots }
}

/// Online before offline, then by username. Stable, so equal usernames keep
/// their input order.
pub fn sort_group(members: &mut [Member]) {
    members.sort_by(|a, b| {
        b.status
            .is_online()
            .cmp(&a.status.is_online())
            .then_with(|| compare_usernames(&a.username, &b.username))
    });
}

thread_local! {
    static USERNAME_COLLATOR: Option<Collator> = {
        let mut options = CollatorOptions::new();
        options.strength = Some(Strength::Tertiary);
        Collator::try_new(&Default::default(), options).ok()
    };
}

/// Root-locale collation at tertiary strength: accents and case only break
/// ties, lowercase sorts before uppercase, punctuation before letters.
pub fn compare_usernames(a: &str, b: &str) -> Ordering {
    USERNAME_COLLATOR
        .with(|collator| match collator {
            Some(collator) => collator.compare(a, b),
            None => fold_case_compare(a, b),
        })
        .then_with(|| a.cmp(b))
}

fn fold_case_compare(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| {
            a.chars()
                .zip(b.chars())
                .map(|(x, y)| x.is_uppercase().cmp(&y.is_uppercase()))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterStats {
    pub total: u64,
    pub online_humans: u64,
    pub bots: u64,
}

impl RosterStats {
    /// `total` is the source's own presence count, independent of classification.
    pub fn from_snapshot(snapshot: &MemberSnapshot, rules: &BotRules) -> Self {
        let mut online_humans = 0;
        let mut bots = 0;
        for member in &snapshot.members {
            match rules.classify(member) {
                Classification::Bot => bots += 1,
                Classification::Human if member.status.is_online() => online_humans += 1,
                Classification::Human => {}
            }
        }

        Self {
            total: snapshot.presence_count,
            online_humans,
            bots,
        }
    }

    pub fn target(&self, counter: Counter) -> u64 {
        match counter {
            Counter::Total => self.total,
            Counter::OnlineHumans => self.online_humans,
            Counter::Bots => self.bots,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Counter {
    Total,
    OnlineHumans,
    Bots,
}

impl Counter {
    pub const ALL: [Counter; 3] = [Counter::Total, Counter::OnlineHumans, Counter::Bots];

    pub fn element_id(self) -> &'static str {
        match self {
            Self::Total => "totalMembers",
            Self::OnlineHumans => "onlineMembers",
            Self::Bots => "totalBots",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Total => "Members Online",
            Self::OnlineHumans => "Humans Online",
            Self::Bots => "Bots",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Total => 0,
            Self::OnlineHumans => 1,
            Self::Bots => 2,
        }
    }
}
