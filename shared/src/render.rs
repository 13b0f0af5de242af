use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::classify::Classification;
use crate::member::Member;
use crate::roster::{Counter, Roster};

pub const DEFAULT_AVATAR_URL: &str = "https://cdn.discordapp.com/embed/avatars/0.png";
pub const MEMBERS_CONTAINER_ID: &str = "membersGrid";
pub const BOTS_CONTAINER_ID: &str = "botsGrid";
macro_rules! retry_action {
    () => {
        "/api/roster/retry"
    };
}

/// Route that the error panel's Retry form posts to.
pub const RETRY_ACTION: &str = retry_action!();

pub const LOADING_HTML: &str = concat!(
    r#"<div class="loading-container">"#,
    r#"<div class="loading-spinner"></div>"#,
    "<p>Loading...</p>",
    "</div>"
);

pub const ERROR_HTML: &str = concat!(
    r#"<div class="error-message">"#,
    "<p>\u{26a0}\u{fe0f} Unable to load data</p>",
    r#"<p class="error-details">Make sure the Discord widget is enabled in server settings</p>"#,
    r#"<form method="post" action=""#,
    retry_action!(),
    r#"">"#,
    r#"<button type="submit" class="btn btn-primary mt-3">Retry</button>"#,
    "</form>",
    "</div>"
);

/// The two list fragments produced from one roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedRoster {
    pub members_html: String,
    pub bots_html: String,
}

/// Escapes text for use in element content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn is_http_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

fn avatar_url(member: &Member) -> &str {
    member
        .avatar_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty() && is_http_url(url))
        .unwrap_or(DEFAULT_AVATAR_URL)
}

pub fn placeholder_html(message: &str) -> String {
    format!(
        r#"<div class="no-members"><p>{}</p></div>"#,
        escape_html(message)
    )
}

pub fn member_card(member: &Member, classification: Classification) -> String {
    let status_class = member.status.css_class();
    let is_bot = classification.is_bot();
    let name = escape_html(&member.username);

    let mut card = String::new();
    let _ = write!(
        card,
        r#"<div class="member-card {status_class}{bot_class}">"#,
        bot_class = if is_bot { " bot-card" } else { "" }
    );
    let _ = write!(
        card,
        r#"<div class="member-avatar-container"><img src="{src}" alt="{name}" class="member-avatar"><span class="status-indicator {status_class}"></span></div>"#,
        src = escape_html(avatar_url(member)),
    );
    let _ = write!(
        card,
        r#"<div class="member-info"><h3 class="member-name">{name}</h3>"#
    );
    if is_bot {
        card.push_str("<span class=\"bot-badge\">\u{1f916} BOT</span>");
    }
    let _ = write!(
        card,
        r#"<span class="member-status {status_class}">{label}</span>"#,
        label = member.status.label()
    );
    if let Some(activity) = &member.activity {
        let _ = write!(
            card,
            "<div class=\"member-activity\"><span class=\"activity-icon\">\u{1f3ae}</span><span class=\"activity-name\">{}</span></div>",
            escape_html(&activity.name)
        );
    }
    card.push_str("</div></div>");
    card
}

fn render_group(members: &[Member], classification: Classification, empty_message: &str) -> String {
    if members.is_empty() {
        return placeholder_html(empty_message);
    }
    members
        .iter()
        .map(|member| member_card(member, classification))
        .collect()
}

/// An empty roster gets the "at the moment" placeholders in both lists; an
/// empty group alongside a non-empty one gets its own placeholder.
pub fn render_roster(roster: &Roster) -> RenderedRoster {
    if roster.is_empty() {
        return RenderedRoster {
            members_html: placeholder_html("No members online at the moment"),
            bots_html: placeholder_html("No bots online at the moment"),
        };
    }

    RenderedRoster {
        members_html: render_group(
            &roster.humans,
            Classification::Human,
            "No human members online",
        ),
        bots_html: render_group(&roster.bots, Classification::Bot, "No bots online"),
    }
}

pub struct TeamPage<'a> {
    pub server_name: Option<&'a str>,
    pub instant_invite: Option<&'a str>,
    pub members_html: &'a str,
    pub bots_html: &'a str,
    pub counters: [u64; 3],
}

pub fn render_team_page(page: &TeamPage<'_>) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>Our Team</title>\n<link rel=\"stylesheet\" href=\"/css/style.css\">\n</head>\n<body>\n",
    );

    html.push_str("<section class=\"team-header\">\n");
    match page.server_name.filter(|name| !name.trim().is_empty()) {
        Some(name) => {
            let _ = writeln!(html, "<h1>{}</h1>", escape_html(name));
        }
        None => html.push_str("<h1>Our Team</h1>\n"),
    }
    if let Some(invite) = page.instant_invite.filter(|url| is_http_url(url)) {
        let _ = writeln!(
            html,
            r#"<a class="btn btn-primary" href="{}" rel="noopener">Join</a>"#,
            escape_html(invite)
        );
    }
    html.push_str("</section>\n");

    html.push_str("<section class=\"team-stats\">\n");
    for counter in Counter::ALL {
        let _ = writeln!(
            html,
            r#"<div class="stat"><span class="stat-number" id="{id}">{value}</span><span class="stat-label">{label}</span></div>"#,
            id = counter.element_id(),
            value = page.counters[counter.index()],
            label = counter.label(),
        );
    }
    html.push_str("</section>\n");

    let _ = writeln!(
        html,
        "<section class=\"team-members\">\n<h2>Members</h2>\n<div class=\"members-grid\" id=\"{MEMBERS_CONTAINER_ID}\">{}</div>\n</section>",
        page.members_html
    );
    let _ = writeln!(
        html,
        "<section class=\"team-bots\">\n<h2>Bots</h2>\n<div class=\"members-grid\" id=\"{BOTS_CONTAINER_ID}\">{}</div>\n</section>",
        page.bots_html
    );
    html.push_str("</body>\n</html>\n");
    html
}

/// Strong ETag over a rendered body.
pub fn content_etag(body: &[u8]) -> String {
    format!("\"team-{:08x}\"", crc32fast::hash(body))
}
