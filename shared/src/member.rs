use serde::{Deserialize, Deserializer, Serialize};

/// Widget presence status. The widget also reports `idle` and `dnd`; anything
/// that is not `online` is treated as offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Online,
    #[default]
    #[serde(other)]
    Offline,
}

impl MemberStatus {
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Offline => "Offline",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: MemberStatus,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Currently played game or app, reported by the widget as `game`.
    #[serde(default, rename = "game")]
    pub activity: Option<Activity>,
}

impl Member {
    pub fn new(username: impl Into<String>, status: MemberStatus) -> Self {
        Self {
            username: username.into(),
            status,
            avatar_url: None,
            activity: None,
        }
    }

    pub fn with_activity(mut self, name: impl Into<String>) -> Self {
        self.activity = Some(Activity { name: name.into() });
        self
    }

    pub fn with_avatar(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }
}

/// One fetched view of server presence. Replaced wholesale every cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub presence_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub members: Vec<Member>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub instant_invite: Option<String>,
}

/// The widget sends explicit `null` for fields it has no value for.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl MemberSnapshot {
    pub fn from_widget_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
