//! Event log routing.
//!
//! A stateless mapping from guild events to rendered log notifications and
//! their destinations. Some events fan out to more than one destination
//! (the general log channel is looked up by name, per-kind channels by id);
//! every destination is evaluated and dispatched independently. No
//! permission checks, no retries.

use crate::config::BotConfig;
use crate::moderation::render::{Identity, Notification, substitute};

/// A guild event worth logging
#[derive(Debug, Clone)]
pub enum LogEvent {
    MemberJoined {
        user_tag: String,
        member_count: u64,
    },
    MemberLeft {
        user_tag: String,
    },
    MessageDeleted {
        author_tag: String,
        content: String,
    },
    MessageEdited {
        author_tag: String,
        before: String,
        after: String,
    },
    VoiceJoined {
        user_tag: String,
        channel: String,
    },
    VoiceLeft {
        user_tag: String,
        channel: String,
    },
    VoiceMoved {
        user_tag: String,
        from: String,
        to: String,
    },
    /// Rendered shape for a moderator-forced disconnect. The gateway does
    /// not surface a disconnect reason, so the handlers never emit this.
    VoiceDisconnected {
        user_tag: String,
        channel: String,
    },
}

/// Where a log notification goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// A configured channel id
    ById(u64),
    /// A channel looked up by name in the acting guild
    ByName(String),
}

/// One notification bound for one destination
#[derive(Debug, Clone)]
pub struct LogDispatch {
    pub destination: LogDestination,
    pub notification: Notification,
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

/// Map an event to its dispatches. An event with no configured destination
/// yields an empty list.
#[must_use]
pub fn route(event: &LogEvent, config: &BotConfig, identity: &Identity) -> Vec<LogDispatch> {
    let messages = &config.messages;
    let colors = &config.embed_colors;
    let named = config
        .logs_channel_name
        .as_ref()
        .map(|name| LogDestination::ByName(name.clone()));

    let mut dispatches = Vec::new();

    match event {
        LogEvent::MemberJoined {
            user_tag,
            member_count,
        } => {
            if let Some(destination) = named {
                let count = member_count.to_string();
                let body = substitute(
                    &messages.welcome,
                    &[("user", user_tag), ("member_count", &count)],
                );
                dispatches.push(LogDispatch {
                    destination,
                    notification: notification("👋 Welcome", body, colors.welcome, identity),
                });
            }
        }
        LogEvent::MemberLeft { user_tag } => {
            if let Some(destination) = named {
                let body = substitute(&messages.leave, &[("user", user_tag)]);
                dispatches.push(LogDispatch {
                    destination,
                    notification: notification("🚪 Left", body, colors.welcome, identity),
                });
            }
        }
        LogEvent::MessageDeleted {
            author_tag,
            content,
        } => {
            let body = substitute(
                &messages.message_delete,
                &[("user", author_tag), ("content", content)],
            );
            let note = notification("🗑️ Message Deleted", body, colors.message_delete, identity);
            if let Some(destination) = named {
                dispatches.push(LogDispatch {
                    destination,
                    notification: note.clone(),
                });
            }
            if let Some(id) = config.log_channels.message_delete {
                dispatches.push(LogDispatch {
                    destination: LogDestination::ById(id),
                    notification: note,
                });
            }
        }
        LogEvent::MessageEdited {
            author_tag,
            before,
            after,
        } => {
            let body = substitute(
                &messages.message_edit,
                &[("user", author_tag), ("before", before), ("after", after)],
            );
            let note = notification("✏️ Message Edited", body, colors.message_edit, identity);
            if let Some(destination) = named {
                dispatches.push(LogDispatch {
                    destination,
                    notification: note.clone(),
                });
            }
            if let Some(id) = config.log_channels.message_edit {
                dispatches.push(LogDispatch {
                    destination: LogDestination::ById(id),
                    notification: note,
                });
            }
        }
        LogEvent::VoiceJoined { user_tag, channel } => {
            if let Some(id) = config.log_channels.voice {
                let body = substitute(
                    &messages.vc_join,
                    &[("user", user_tag), ("channel", channel)],
                );
                dispatches.push(LogDispatch {
                    destination: LogDestination::ById(id),
                    notification: notification("🎤 VC Join", body, colors.vc_join, identity),
                });
            }
        }
        LogEvent::VoiceLeft { user_tag, channel } => {
            if let Some(id) = config.log_channels.voice {
                let body = substitute(
                    &messages.vc_leave,
                    &[("user", user_tag), ("channel", channel)],
                );
                dispatches.push(LogDispatch {
                    destination: LogDestination::ById(id),
                    notification: notification("🚪 VC Leave", body, colors.vc_leave, identity),
                });
            }
        }
        LogEvent::VoiceMoved {
            user_tag,
            from,
            to,
        } => {
            if let Some(id) = config.log_channels.voice {
                let body = substitute(
                    &messages.vc_move,
                    &[("user", user_tag), ("old_channel", from), ("new_channel", to)],
                );
                dispatches.push(LogDispatch {
                    destination: LogDestination::ById(id),
                    notification: notification("🔀 VC Move", body, colors.vc_move, identity),
                });
            }
        }
        LogEvent::VoiceDisconnected { user_tag, channel } => {
            if let Some(id) = config.log_channels.voice {
                let body = substitute(
                    &messages.vc_disconnect,
                    &[("user", user_tag), ("channel", channel)],
                );
                dispatches.push(LogDispatch {
                    destination: LogDestination::ById(id),
                    notification: notification(
                        "❌ VC Disconnect",
                        body,
                        colors.vc_disconnect,
                        identity,
                    ),
                });
            }
        }
    }

    dispatches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BotConfig {
        let mut config = BotConfig {
            guild_id: 10,
            admin_role_id: 600,
            mute_role_id: 500,
            logs_channel_name: Some("logs".to_string()),
            ..Default::default()
        };
        config.log_channels.message_delete = Some(9007);
        config.log_channels.message_edit = Some(9008);
        config.log_channels.voice = Some(9009);
        config
    }

    fn identity() -> Identity {
        Identity {
            bot_name: "warden".to_string(),
            bot_avatar_url: None,
            guild_name: Some("Test Guild".to_string()),
        }
    }

    #[test]
    fn test_member_joined_goes_to_named_channel() {
        let event = LogEvent::MemberJoined {
            user_tag: "user#2".to_string(),
            member_count: 42,
        };
        let dispatches = route(&event, &config(), &identity());
        assert_eq!(dispatches.len(), 1);
        assert_eq!(
            dispatches[0].destination,
            LogDestination::ByName("logs".to_string())
        );
        assert!(dispatches[0].notification.body.contains("42"));
    }

    #[test]
    fn test_message_delete_dispatches_to_both_destinations() {
        let event = LogEvent::MessageDeleted {
            author_tag: "user#2".to_string(),
            content: "oops".to_string(),
        };
        let dispatches = route(&event, &config(), &identity());
        assert_eq!(dispatches.len(), 2);
        assert_eq!(
            dispatches[0].destination,
            LogDestination::ByName("logs".to_string())
        );
        assert_eq!(dispatches[1].destination, LogDestination::ById(9007));
        for dispatch in &dispatches {
            assert!(dispatch.notification.body.contains("oops"));
        }
    }

    #[test]
    fn test_message_edit_shows_before_and_after() {
        let event = LogEvent::MessageEdited {
            author_tag: "user#2".to_string(),
            before: "helo".to_string(),
            after: "hello".to_string(),
        };
        let dispatches = route(&event, &config(), &identity());
        assert_eq!(dispatches.len(), 2);
        assert!(dispatches[0].notification.body.contains("helo"));
        assert!(dispatches[0].notification.body.contains("hello"));
    }

    #[test]
    fn test_voice_events_use_the_voice_channel_only() {
        let event = LogEvent::VoiceMoved {
            user_tag: "user#2".to_string(),
            from: "General".to_string(),
            to: "AFK".to_string(),
        };
        let dispatches = route(&event, &config(), &identity());
        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].destination, LogDestination::ById(9009));
        assert!(dispatches[0].notification.body.contains("General"));
        assert!(dispatches[0].notification.body.contains("AFK"));
    }

    #[test]
    fn test_unconfigured_destinations_yield_nothing() {
        let mut bare = config();
        bare.logs_channel_name = None;
        bare.log_channels.voice = None;

        let event = LogEvent::MemberLeft {
            user_tag: "user#2".to_string(),
        };
        assert!(route(&event, &bare, &identity()).is_empty());

        let event = LogEvent::VoiceJoined {
            user_tag: "user#2".to_string(),
            channel: "General".to_string(),
        };
        assert!(route(&event, &bare, &identity()).is_empty());
    }

    #[test]
    fn test_forced_disconnect_shape_renders() {
        let event = LogEvent::VoiceDisconnected {
            user_tag: "user#2".to_string(),
            channel: "General".to_string(),
        };
        let dispatches = route(&event, &config(), &identity());
        assert_eq!(dispatches.len(), 1);
        assert_eq!(dispatches[0].notification.title, "❌ VC Disconnect");
    }
}
