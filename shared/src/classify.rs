use serde::{Deserialize, Serialize};

use crate::member::Member;

/// A single case-insensitive username predicate. Rules are independent: a
/// username is a bot if any rule matches, regardless of order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotRule {
    Suffix(String),
    Prefix(String),
    Contains(String),
}

impl BotRule {
    fn text(&self) -> &str {
        match self {
            Self::Suffix(text) | Self::Prefix(text) | Self::Contains(text) => text,
        }
    }

    fn lowercased(&self) -> Self {
        match self {
            Self::Suffix(text) => Self::Suffix(text.to_lowercase()),
            Self::Prefix(text) => Self::Prefix(text.to_lowercase()),
            Self::Contains(text) => Self::Contains(text.to_lowercase()),
        }
    }

    /// `username` must already be lowercased.
    fn matches_lowercased(&self, username: &str) -> bool {
        match self {
            Self::Suffix(text) => username.ends_with(text.as_str()),
            Self::Prefix(text) => username.starts_with(text.as_str()),
            Self::Contains(text) => username.contains(text.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Human,
    Bot,
}

impl Classification {
    pub fn is_bot(self) -> bool {
        matches!(self, Self::Bot)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<BotRule>", into = "Vec<BotRule>")]
pub struct BotRules {
    rules: Vec<BotRule>,
}

impl BotRules {
    /// Normalizes every rule to lowercase and drops rules with empty text.
    pub fn new(rules: Vec<BotRule>) -> Self {
        let rules = rules
            .iter()
            .filter(|rule| !rule.text().trim().is_empty())
            .map(BotRule::lowercased)
            .collect();
        Self { rules }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn rules(&self) -> &[BotRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_bot_name(&self, username: &str) -> bool {
        let username = username.to_lowercase();
        self.rules
            .iter()
            .any(|rule| rule.matches_lowercased(&username))
    }

    pub fn classify(&self, member: &Member) -> Classification {
        if self.is_bot_name(&member.username) {
            Classification::Bot
        } else {
            Classification::Human
        }
    }
}

impl Default for BotRules {
    fn default() -> Self {
        Self::new(vec![
            BotRule::Suffix("bot".into()),
            BotRule::Prefix("bot".into()),
            BotRule::Contains("[bot]".into()),
            BotRule::Contains("(bot)".into()),
            BotRule::Contains("maki".into()),
            BotRule::Contains("apollo".into()),
            BotRule::Contains("medal".into()),
        ])
    }
}

impl From<Vec<BotRule>> for BotRules {
    fn from(rules: Vec<BotRule>) -> Self {
        Self::new(rules)
    }
}

impl From<BotRules> for Vec<BotRule> {
    fn from(rules: BotRules) -> Self {
        rules.rules
    }
}
