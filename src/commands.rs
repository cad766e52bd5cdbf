//! Slash and prefix commands.
//!
//! Commands are thin: they collect the invocation context into an
//! [`ActionRequest`], hand it to the pipeline, and reply ephemerally with
//! whatever comes back.

use std::collections::HashSet;
use std::sync::Arc;

use poise::CreateReply;
use poise::serenity_prelude as serenity;

use crate::moderation::render::Identity;
use crate::moderation::{
    ActionRequest, Capability, Gateway, ModerationPipeline, PipelineOutcome, Requester,
    SerenityGateway, gate,
};
use crate::{Context, Error};

/// Capabilities the invoking member holds, read from the interaction
async fn build_requester(ctx: Context<'_>) -> Requester {
    let mut capabilities = HashSet::new();
    if let Some(member) = ctx.author_member().await {
        if let Some(permissions) = member.permissions {
            if permissions.ban_members() {
                capabilities.insert(Capability::BanMembers);
            }
            if permissions.kick_members() {
                capabilities.insert(Capability::KickMembers);
            }
            if permissions.administrator() {
                capabilities.insert(Capability::Administrator);
            }
        }
    }
    Requester {
        user_id: ctx.author().id.get(),
        tag: ctx.author().tag(),
        capabilities,
    }
}

fn identity(ctx: Context<'_>) -> Identity {
    let (bot_name, bot_avatar_url) = {
        let current = ctx.serenity_context().cache.current_user();
        (current.name.to_string(), current.avatar_url())
    };
    let guild_name = ctx.guild().map(|guild| guild.name.clone());
    Identity {
        bot_name,
        bot_avatar_url,
        guild_name,
    }
}

fn pipeline(ctx: Context<'_>) -> ModerationPipeline {
    let gateway = Arc::new(SerenityGateway::new(ctx.serenity_context().http.clone()));
    let data = ctx.data();
    ModerationPipeline::new(gateway, Arc::clone(&data.config), data.sanctions.clone())
}

fn guild_id(ctx: Context<'_>) -> u64 {
    ctx.guild_id().map_or(0, |id| id.get())
}

async fn reply_ephemeral(ctx: Context<'_>, content: impl Into<String>) -> Result<(), Error> {
    ctx.send(CreateReply::default().content(content.into()).ephemeral(true))
        .await?;
    Ok(())
}

/// Run a single-target action and return the pipeline's reply verbatim
async fn run_and_reply(ctx: Context<'_>, request: ActionRequest) -> Result<(), Error> {
    let identity = identity(ctx);
    match pipeline(ctx).run(request, &identity).await {
        Ok(PipelineOutcome::Completed { ack }) => reply_ephemeral(ctx, ack).await,
        Ok(PipelineOutcome::BulkCompleted { role_id, granted }) => {
            reply_ephemeral(ctx, format!("Role <@&{role_id}> added to {granted} members.")).await
        }
        Err(error) => reply_ephemeral(ctx, error.to_string()).await,
    }
}

/// Ban a user
#[poise::command(slash_command, guild_only)]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "User to ban"] user: serenity::User,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let requester = build_requester(ctx).await;
    let request = ActionRequest::ban(guild_id(ctx), requester, user.id.get(), user.tag(), reason);
    run_and_reply(ctx, request).await
}

/// Kick a user
#[poise::command(slash_command, guild_only)]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "User to kick"] user: serenity::User,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let requester = build_requester(ctx).await;
    let request = ActionRequest::kick(guild_id(ctx), requester, user.id.get(), user.tag(), reason);
    run_and_reply(ctx, request).await
}

/// Warn a user
#[poise::command(slash_command, guild_only)]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "User to warn"] user: serenity::User,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let requester = build_requester(ctx).await;
    let request = ActionRequest::warn(guild_id(ctx), requester, user.id.get(), user.tag(), reason);
    run_and_reply(ctx, request).await
}

/// Mute a user
#[poise::command(slash_command, guild_only)]
pub async fn mute(
    ctx: Context<'_>,
    #[description = "User to mute"] user: serenity::User,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let requester = build_requester(ctx).await;
    let request = ActionRequest::mute(guild_id(ctx), requester, user.id.get(), user.tag(), reason);
    run_and_reply(ctx, request).await
}

/// Temporarily mute a user
#[poise::command(slash_command, guild_only)]
pub async fn tempmute(
    ctx: Context<'_>,
    #[description = "User to mute"] user: serenity::User,
    #[description = "Duration (e.g. 10m, 1h)"] duration: String,
    #[description = "Reason"] reason: Option<String>,
) -> Result<(), Error> {
    let requester = build_requester(ctx).await;
    let request = ActionRequest::tempmute(
        guild_id(ctx),
        requester,
        user.id.get(),
        user.tag(),
        duration,
        reason,
    );
    run_and_reply(ctx, request).await
}

/// Unmute a user
#[poise::command(slash_command, guild_only)]
pub async fn unmute(
    ctx: Context<'_>,
    #[description = "User to unmute"] user: serenity::User,
) -> Result<(), Error> {
    let requester = build_requester(ctx).await;
    let request = ActionRequest::unmute(guild_id(ctx), requester, user.id.get(), user.tag());
    run_and_reply(ctx, request).await
}

/// Enable or disable verification messages from the bot
#[poise::command(slash_command, guild_only, rename = "verify-toggle")]
pub async fn verify_toggle(
    ctx: Context<'_>,
    #[description = "Enable (true) or disable (false)"] enabled: bool,
) -> Result<(), Error> {
    ctx.data().verification.set_enabled(enabled).await?;

    let text = if enabled {
        "Verification messages from the bot are now globally enabled."
    } else {
        "Verification messages from the bot are now globally disabled."
    };
    let embed = serenity::CreateEmbed::new()
        .colour(serenity::Colour::new(ctx.data().config.embed_colors.verify))
        .description(text);
    ctx.send(CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Add a role to all users in the server
#[poise::command(slash_command, guild_only)]
pub async fn addroleall(
    ctx: Context<'_>,
    #[description = "Role to add"] role: serenity::Role,
) -> Result<(), Error> {
    let requester = build_requester(ctx).await;
    let request = ActionRequest::bulk_role_grant(guild_id(ctx), requester, role.id.get());

    // Validate up front so the progress acknowledgment only goes out for a
    // request that will actually run; the pipeline re-checks both.
    if let Err(error) = gate::authorize(&request) {
        return reply_ephemeral(ctx, error.to_string()).await;
    }
    if !ctx
        .data()
        .config
        .self_assign_role_ids
        .contains(&role.id.get())
    {
        return reply_ephemeral(ctx, "Invalid role.").await;
    }

    reply_ephemeral(ctx, format!("Adding role <@&{}> to all members...", role.id)).await?;

    let identity = identity(ctx);
    match pipeline(ctx).run(request, &identity).await {
        Ok(PipelineOutcome::BulkCompleted { role_id, granted }) => {
            reply_ephemeral(ctx, format!("Role <@&{role_id}> added to {granted} members.")).await
        }
        Ok(PipelineOutcome::Completed { ack }) => reply_ephemeral(ctx, ack).await,
        Err(error) => reply_ephemeral(ctx, error.to_string()).await,
    }
}

/// Admin-only command
#[poise::command(prefix_command, guild_only)]
pub async fn admin(ctx: Context<'_>) -> Result<(), Error> {
    let admin_role = ctx.data().config.admin_role_id;
    let is_admin = ctx
        .author_member()
        .await
        .is_some_and(|member| member.roles.iter().any(|role| role.get() == admin_role));
    if is_admin {
        ctx.say("Admin command executed.").await?;
    } else {
        ctx.say("You do not have permission!").await?;
    }
    Ok(())
}

/// Show server name and member count
#[poise::command(prefix_command, guild_only)]
pub async fn info(ctx: Context<'_>) -> Result<(), Error> {
    let (name, member_count) = ctx
        .guild()
        .map(|guild| (guild.name.clone(), guild.member_count))
        .unwrap_or_default();
    ctx.say(format!("Server: {name}\nMembers: {member_count}"))
        .await?;
    Ok(())
}

/// Grant yourself one of the self-service roles
#[poise::command(prefix_command, guild_only)]
pub async fn role(ctx: Context<'_>, role_id: String) -> Result<(), Error> {
    let Ok(role_id) = role_id.parse::<u64>() else {
        ctx.say("Invalid role.").await?;
        return Ok(());
    };
    if !ctx.data().config.self_assign_role_ids.contains(&role_id) {
        ctx.say("Invalid role.").await?;
        return Ok(());
    }

    let gateway = SerenityGateway::new(ctx.serenity_context().http.clone());
    let guild = guild_id(ctx);
    if !gateway.role_exists(guild, role_id).await? {
        ctx.say("Role does not exist.").await?;
        return Ok(());
    }
    gateway
        .add_role(guild, ctx.author().id.get(), role_id)
        .await?;
    ctx.say("Role has been added.").await?;
    Ok(())
}
