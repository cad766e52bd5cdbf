//! Notification rendering.
//!
//! Rendering is pure: it turns an action request plus configuration into the
//! up-to-three outbound messages (requester ack, audit-log entry, direct
//! notification) without performing any I/O. Dispatch is the pipeline's job.

use poise::serenity_prelude as serenity;
use serenity::builder::{CreateEmbed, CreateEmbedFooter};

use crate::config::BotConfig;
use crate::moderation::{ActionKind, ActionRequest};

/// Identity used for embed footers: the guild's name when acting inside a
/// guild, the bot's own identity as fallback.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub bot_name: String,
    pub bot_avatar_url: Option<String>,
    pub guild_name: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn footer_text(&self) -> &str {
        self.guild_name.as_deref().unwrap_or(&self.bot_name)
    }

    /// Name substituted for `{server}` in direct notifications
    #[must_use]
    pub fn server_name(&self) -> &str {
        self.footer_text()
    }
}

/// A rendered outbound message, independent of the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub color: u32,
    pub footer_text: String,
    pub footer_icon: Option<String>,
}

impl Notification {
    /// Convert to a serenity embed; the timestamp is attached here so
    /// rendering itself stays deterministic.
    #[must_use]
    pub fn to_embed(&self) -> CreateEmbed {
        let mut footer = CreateEmbedFooter::new(&self.footer_text);
        if let Some(icon) = &self.footer_icon {
            footer = footer.icon_url(icon);
        }
        CreateEmbed::new()
            .title(&self.title)
            .description(&self.body)
            .colour(serenity::Colour::new(self.color))
            .timestamp(serenity::Timestamp::now())
            .footer(footer)
    }
}

/// The fan-out for one action: each message is optional per action kind
#[derive(Debug, Clone)]
pub struct NotificationSet {
    /// Ephemeral acknowledgment returned to the requester
    pub ack: String,
    /// Audit-log entry, when the kind has one
    pub audit: Option<Notification>,
    /// Direct notification to the target, when the kind has one
    pub direct: Option<Notification>,
}

/// Substitute `{name}` placeholders. Substitution is total: an unresolvable
/// placeholder is left verbatim rather than failing the render.
#[must_use]
pub fn substitute(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end)
                if end > 0
                    && after[..end]
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_') =>
            {
                let name = &after[..end];
                match vars.iter().find(|(key, _)| *key == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn notification(title: &str, body: String, color: u32, identity: &Identity) -> Notification {
    Notification {
        title: title.to_string(),
        body: format!("**{body}**"),
        color,
        footer_text: identity.footer_text().to_string(),
        footer_icon: identity.bot_avatar_url.clone(),
    }
}

/// Build the notification set for one action request.
pub fn render_action(
    config: &BotConfig,
    identity: &Identity,
    request: &ActionRequest,
) -> NotificationSet {
    let messages = &config.messages;
    let target = request.target_tag();
    let moderator = request.requester.tag.as_str();
    let reason = request.reason.as_deref().unwrap_or("No reason");
    let duration = request.duration.as_deref().unwrap_or("");
    let server = identity.server_name();
    let contact = config.contact.as_str();
    let color = config.embed_colors.for_action(request.kind);

    let action_vars: [(&str, &str); 3] =
        [("user", target), ("reason", reason), ("duration", duration)];
    let dm_vars: [(&str, &str); 5] = [
        ("server", server),
        ("moderator", moderator),
        ("reason", reason),
        ("duration", duration),
        ("contact", contact),
    ];

    let (title, dm_title, template, dm_template) = match request.kind {
        ActionKind::Ban => (
            "🚫 Ban",
            "🚫 Ban Notification",
            &messages.ban,
            Some(&messages.dm_ban),
        ),
        ActionKind::Kick => (
            "👢 Kick",
            "👢 Kick Notification",
            &messages.kick,
            Some(&messages.dm_kick),
        ),
        ActionKind::Warn => (
            "⚠️ Warn",
            "⚠️ Warn Notification",
            &messages.warn,
            Some(&messages.dm_warn),
        ),
        ActionKind::Mute => (
            "🔇 Mute",
            "🔇 Mute Notification",
            &messages.mute,
            Some(&messages.dm_mute),
        ),
        ActionKind::TempMute => (
            "⏳ TempMute",
            "⏳ TempMute Notification",
            &messages.tempmute,
            Some(&messages.dm_tempmute),
        ),
        ActionKind::Unmute => ("🔊 Unmute", "", &messages.unmute, None),
        ActionKind::BulkRoleGrant => {
            // Bulk replies are composed by the command layer; nothing to
            // render here.
            return NotificationSet {
                ack: String::new(),
                audit: None,
                direct: None,
            };
        }
    };

    let ack = substitute(template, &action_vars);
    let audit = Some(notification(
        title,
        substitute(template, &action_vars),
        color,
        identity,
    ));
    let direct = dm_template
        .map(|template| notification(dm_title, substitute(template, &dm_vars), color, identity));

    NotificationSet { ack, audit, direct }
}

/// Audit entry emitted when a scheduled sanction reversal fires.
#[must_use]
pub fn render_reversal(config: &BotConfig, identity: &Identity, user_tag: &str) -> Notification {
    let body = substitute(&config.messages.unmute, &[("user", user_tag)]);
    notification("🔊 Unmute", body, config.embed_colors.unmute, identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::Requester;

    fn identity() -> Identity {
        Identity {
            bot_name: "warden".to_string(),
            bot_avatar_url: Some("https://cdn.example/avatar.png".to_string()),
            guild_name: Some("Test Guild".to_string()),
        }
    }

    #[test]
    fn test_substitute_replaces_known_placeholders() {
        let out = substitute("{user} banned: {reason}", &[("user", "a#1"), ("reason", "spam")]);
        assert_eq!(out, "a#1 banned: spam");
    }

    #[test]
    fn test_substitute_leaves_unknown_placeholders_verbatim() {
        let out = substitute("{user} in {server}", &[("user", "a#1")]);
        assert_eq!(out, "a#1 in {server}");
    }

    #[test]
    fn test_substitute_never_fails_on_odd_shapes() {
        assert_eq!(substitute("", &[]), "");
        assert_eq!(substitute("{", &[]), "{");
        assert_eq!(substitute("{}", &[]), "{}");
        assert_eq!(substitute("a { b } c", &[]), "a { b } c");
        assert_eq!(substitute("{user", &[("user", "x")]), "{user");
    }

    #[test]
    fn test_ban_renders_all_three_messages() {
        let config = BotConfig::default();
        let requester = Requester::new(1, "mod#1");
        let request = ActionRequest::ban(10, requester, 2, "user#2", Some("spam".to_string()));

        let set = render_action(&config, &identity(), &request);
        assert!(set.ack.contains("user#2"));
        assert!(set.ack.contains("spam"));

        let audit = set.audit.expect("ban has an audit entry");
        assert_eq!(audit.title, "🚫 Ban");
        assert!(audit.body.contains("spam"));
        assert_eq!(audit.footer_text, "Test Guild");

        let direct = set.direct.expect("ban has a direct notification");
        assert!(direct.body.contains("Test Guild"));
        assert!(direct.body.contains("mod#1"));
    }

    #[test]
    fn test_missing_reason_defaults() {
        let config = BotConfig::default();
        let requester = Requester::new(1, "mod#1");
        let request = ActionRequest::kick(10, requester, 2, "user#2", None);
        let set = render_action(&config, &identity(), &request);
        assert!(set.ack.contains("No reason"));
    }

    #[test]
    fn test_tempmute_substitutes_duration_token() {
        let config = BotConfig::default();
        let requester = Requester::new(1, "mod#1");
        let request =
            ActionRequest::tempmute(10, requester, 2, "user#2", "10m", Some("flood".to_string()));
        let set = render_action(&config, &identity(), &request);
        assert!(set.ack.contains("10m"));
        let direct = set.direct.expect("tempmute has a direct notification");
        assert!(direct.body.contains("10m"));
    }

    #[test]
    fn test_unmute_has_no_direct_notification() {
        let config = BotConfig::default();
        let requester = Requester::new(1, "mod#1");
        let request = ActionRequest::unmute(10, requester, 2, "user#2");
        let set = render_action(&config, &identity(), &request);
        assert!(set.audit.is_some());
        assert!(set.direct.is_none());
    }

    #[test]
    fn test_footer_falls_back_to_bot_identity() {
        let config = BotConfig::default();
        let identity = Identity {
            bot_name: "warden".to_string(),
            bot_avatar_url: None,
            guild_name: None,
        };
        let requester = Requester::new(1, "mod#1");
        let request = ActionRequest::warn(10, requester, 2, "user#2", None);
        let set = render_action(&config, &identity, &request);
        assert_eq!(set.audit.expect("warn audits").footer_text, "warden");
    }

    #[test]
    fn test_reversal_entry_matches_unmute_shape() {
        let config = BotConfig::default();
        let entry = render_reversal(&config, &identity(), "user#2");
        assert_eq!(entry.title, "🔊 Unmute");
        assert!(entry.body.contains("user#2"));
        assert_eq!(entry.color, config.embed_colors.unmute);
    }
}
