//! Gateway event handlers.
//!
//! Everything here is glue: it lifts serenity events into [`LogEvent`]s for
//! the router, runs the verification flow, and delivers whatever the router
//! hands back. No moderation decisions are made in this module.

use poise::serenity_prelude::{
    self as serenity, ActivityData, ChannelId, Context, EventHandler, GuildId, Member, Message,
    MessageId, MessageUpdateEvent, Reaction, ReactionType, Ready, User, VoiceState,
};
use tracing::{info, warn};

use crate::moderation::render::{Identity, Notification, substitute};
use crate::moderation::{Gateway, SerenityGateway};
use crate::router::{self, LogDestination, LogDispatch, LogEvent};
use crate::{Data, EVENT_TARGET};

pub struct Handler {
    pub data: Data,
}

impl Handler {
    fn identity(&self, ctx: &Context, guild_id: Option<GuildId>) -> Identity {
        let (bot_name, bot_avatar_url) = {
            let current = ctx.cache.current_user();
            (current.name.to_string(), current.avatar_url())
        };
        let guild_name = guild_id.and_then(|id| ctx.cache.guild(id).map(|guild| guild.name.clone()));
        Identity {
            bot_name,
            bot_avatar_url,
            guild_name,
        }
    }

    async fn dispatch(&self, ctx: &Context, guild_id: GuildId, dispatches: Vec<LogDispatch>) {
        for dispatch in dispatches {
            let channel_id = match &dispatch.destination {
                LogDestination::ById(id) => Some(ChannelId::new(*id)),
                LogDestination::ByName(name) => ctx.cache.guild(guild_id).and_then(|guild| {
                    guild
                        .channels
                        .values()
                        .find(|channel| channel.name == *name)
                        .map(|channel| channel.id)
                }),
            };
            let Some(channel_id) = channel_id else {
                continue;
            };
            if let Err(e) = channel_id
                .send_message(
                    &ctx.http,
                    serenity::CreateMessage::new().embed(dispatch.notification.to_embed()),
                )
                .await
            {
                warn!(target: EVENT_TARGET, "Failed to deliver log entry: {e}");
            }
        }
    }

    async fn route_and_dispatch(&self, ctx: &Context, guild_id: GuildId, event: LogEvent) {
        let identity = self.identity(ctx, Some(guild_id));
        let dispatches = router::route(&event, &self.data.config, &identity);
        self.dispatch(ctx, guild_id, dispatches).await;
    }

    async fn channel_name(ctx: &Context, channel_id: ChannelId) -> String {
        channel_id
            .name(ctx)
            .await
            .unwrap_or_else(|_| channel_id.to_string())
    }
}

#[serenity::async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        ctx.set_activity(Some(ActivityData::playing(
            self.data.config.game_activity.clone(),
        )));
        info!(target: EVENT_TARGET, "Connected as {}", ready.user.name);
    }

    async fn cache_ready(&self, _ctx: Context, guilds: Vec<GuildId>) {
        info!(target: EVENT_TARGET, "Cache ready! The bot is in {} guild(s)", guilds.len());
    }

    async fn guild_member_addition(&self, ctx: Context, member: Member) {
        let config = &self.data.config;
        let guild_id = member.guild_id;
        let identity = self.identity(&ctx, Some(guild_id));
        let member_count = ctx
            .cache
            .guild(guild_id)
            .map(|guild| guild.member_count)
            .unwrap_or_default();
        let guild_name = identity.guild_name.clone().unwrap_or_default();
        let user_mention = format!("<@{}>", member.user.id.get());

        // Greeting in the welcome channel
        if let Some(channel_id) = config.welcome_channel_id {
            let count = member_count.to_string();
            let body = substitute(
                &config.messages.greeting,
                &[
                    ("server", guild_name.as_str()),
                    ("user", user_mention.as_str()),
                    ("member_count", count.as_str()),
                ],
            );
            let note = Notification {
                title: "👋 Welcome".to_string(),
                body: format!("**{body}**"),
                color: config.embed_colors.welcome,
                footer_text: identity.footer_text().to_string(),
                footer_icon: identity.bot_avatar_url.clone(),
            };
            if let Err(e) = ChannelId::new(channel_id)
                .send_message(&ctx.http, serenity::CreateMessage::new().embed(note.to_embed()))
                .await
            {
                warn!(target: EVENT_TARGET, "Failed to send welcome message: {e}");
            }
        }

        // Verification prompt, when the flag is on
        if self.data.verification.is_enabled() {
            if let Some(channel_id) = config.verify_channel_id {
                let body = substitute(&config.messages.verify, &[("user", user_mention.as_str())]);
                let embed = serenity::CreateEmbed::new()
                    .colour(serenity::Colour::new(config.embed_colors.verify))
                    .description(body);
                match ChannelId::new(channel_id)
                    .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
                    .await
                {
                    Ok(message) => {
                        if let Err(e) = message
                            .react(&ctx.http, ReactionType::Unicode("✅".to_string()))
                            .await
                        {
                            warn!(target: EVENT_TARGET, "Failed to seed verify reaction: {e}");
                        }
                    }
                    Err(e) => {
                        warn!(target: EVENT_TARGET, "Failed to send verify prompt: {e}");
                    }
                }
            }
        }

        self.route_and_dispatch(
            &ctx,
            guild_id,
            LogEvent::MemberJoined {
                user_tag: member.user.tag(),
                member_count,
            },
        )
        .await;
    }

    async fn guild_member_removal(
        &self,
        ctx: Context,
        guild_id: GuildId,
        user: User,
        _member_data_if_available: Option<Member>,
    ) {
        self.route_and_dispatch(
            &ctx,
            guild_id,
            LogEvent::MemberLeft {
                user_tag: user.tag(),
            },
        )
        .await;
    }

    async fn message_delete(
        &self,
        ctx: Context,
        channel_id: ChannelId,
        deleted_message_id: MessageId,
        guild_id: Option<GuildId>,
    ) {
        let Some(guild_id) = guild_id else { return };
        // Content only exists while the message is still cached
        let cached = ctx
            .cache
            .message(channel_id, deleted_message_id)
            .map(|message| (message.author.tag(), message.content.clone()));
        let Some((author_tag, content)) = cached else {
            return;
        };
        self.route_and_dispatch(
            &ctx,
            guild_id,
            LogEvent::MessageDeleted {
                author_tag,
                content,
            },
        )
        .await;
    }

    async fn message_update(
        &self,
        ctx: Context,
        old_if_available: Option<Message>,
        new: Option<Message>,
        event: MessageUpdateEvent,
    ) {
        let Some(guild_id) = event.guild_id else { return };
        let (Some(old), Some(new)) = (old_if_available, new) else {
            return;
        };
        // Embed resolution and pins fire this event without a content change
        if old.content == new.content {
            return;
        }
        self.route_and_dispatch(
            &ctx,
            guild_id,
            LogEvent::MessageEdited {
                author_tag: new.author.tag(),
                before: old.content.clone(),
                after: new.content.clone(),
            },
        )
        .await;
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id.or_else(|| old.as_ref().and_then(|s| s.guild_id))
        else {
            return;
        };
        let user_tag = new
            .member
            .as_ref()
            .or_else(|| old.as_ref().and_then(|s| s.member.as_ref()))
            .map(|member| member.user.tag());
        let Some(user_tag) = user_tag else { return };

        let old_channel = old.as_ref().and_then(|s| s.channel_id);
        let event = match (old_channel, new.channel_id) {
            (None, Some(joined)) => LogEvent::VoiceJoined {
                user_tag,
                channel: Self::channel_name(&ctx, joined).await,
            },
            (Some(left), None) => LogEvent::VoiceLeft {
                user_tag,
                channel: Self::channel_name(&ctx, left).await,
            },
            (Some(from), Some(to)) if from != to => LogEvent::VoiceMoved {
                user_tag,
                from: Self::channel_name(&ctx, from).await,
                to: Self::channel_name(&ctx, to).await,
            },
            _ => return,
        };
        self.route_and_dispatch(&ctx, guild_id, event).await;
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        let config = &self.data.config;
        let (Some(verify_channel), Some(verify_role)) =
            (config.verify_channel_id, config.verify_role_id)
        else {
            return;
        };
        if reaction.channel_id.get() != verify_channel {
            return;
        }
        if !matches!(&reaction.emoji, ReactionType::Unicode(emoji) if emoji == "✅") {
            return;
        }
        let Some(guild_id) = reaction.guild_id else { return };
        let Some(user_id) = reaction.user_id else { return };

        let gateway = SerenityGateway::new(ctx.http.clone());
        let profile = match gateway.resolve_member(guild_id.get(), user_id.get()).await {
            Ok(Some(profile)) => profile,
            _ => return,
        };
        if profile.is_bot || profile.holds_role(verify_role) {
            return;
        }

        if let Err(e) = gateway
            .add_role(guild_id.get(), user_id.get(), verify_role)
            .await
        {
            warn!(target: EVENT_TARGET, "Failed to grant verify role: {e}");
            return;
        }
        info!(
            target: EVENT_TARGET,
            user_id = %user_id,
            guild_id = %guild_id,
            "Member verified"
        );

        // Confirmation DM; closed DMs are not an error
        let embed = serenity::CreateEmbed::new()
            .colour(serenity::Colour::new(config.embed_colors.verify))
            .description("You have been verified!");
        if let Ok(channel) = user_id.create_dm_channel(&ctx.http).await {
            let _ = channel
                .id
                .send_message(&ctx.http, serenity::CreateMessage::new().embed(embed))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Context and gateway payloads are not constructible outside a live
    // connection; verify at compile time that Handler wires into serenity.
    #[test]
    fn test_handler_implements_event_handler() {
        fn assert_impl<T: EventHandler>() {}
        assert_impl::<Handler>();
    }
}
