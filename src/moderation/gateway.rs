//! Platform gateway seam.
//!
//! The pipeline only ever talks to the platform through the [`Gateway`]
//! trait; [`SerenityGateway`] is the production implementation over the
//! Discord HTTP client. Tests substitute fakes.

use std::sync::Arc;

use poise::serenity_prelude as serenity;
use serenity::{ChannelId, GuildId, Http, HttpError, RoleId, UserId};

use crate::moderation::{GatewayError, Notification};

/// Transient view of a platform principal, held only for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberProfile {
    pub user_id: u64,
    pub tag: String,
    pub is_bot: bool,
    pub role_ids: Vec<u64>,
}

impl MemberProfile {
    #[must_use]
    pub fn holds_role(&self, role_id: u64) -> bool {
        self.role_ids.contains(&role_id)
    }
}

/// Mutation and delivery operations the moderation core needs from the
/// platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    /// Resolve a user to a current guild member. `Ok(None)` means the user
    /// is not a member; errors are reserved for transport failures.
    async fn resolve_member(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Option<MemberProfile>, GatewayError>;

    /// All current members of the guild
    async fn list_members(&self, guild_id: u64) -> Result<Vec<MemberProfile>, GatewayError>;

    /// Whether a role currently exists on the guild
    async fn role_exists(&self, guild_id: u64, role_id: u64) -> Result<bool, GatewayError>;

    async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64)
        -> Result<(), GatewayError>;

    async fn remove_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), GatewayError>;

    async fn ban(&self, guild_id: u64, user_id: u64, reason: &str) -> Result<(), GatewayError>;

    async fn kick(&self, guild_id: u64, user_id: u64, reason: &str) -> Result<(), GatewayError>;

    /// Deliver a notification to a user's direct channel
    async fn send_direct(&self, user_id: u64, note: &Notification) -> Result<(), GatewayError>;

    /// Deliver a notification to a guild channel
    async fn send_to_channel(
        &self,
        channel_id: u64,
        note: &Notification,
    ) -> Result<(), GatewayError>;
}

/// Production gateway over the Discord HTTP client
pub struct SerenityGateway {
    http: Arc<Http>,
}

impl SerenityGateway {
    #[must_use]
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn profile_from(member: &serenity::Member) -> MemberProfile {
    MemberProfile {
        user_id: member.user.id.get(),
        tag: member.user.tag(),
        is_bot: member.user.bot,
        role_ids: member.roles.iter().map(|role| role.get()).collect(),
    }
}

#[async_trait::async_trait]
impl Gateway for SerenityGateway {
    async fn resolve_member(
        &self,
        guild_id: u64,
        user_id: u64,
    ) -> Result<Option<MemberProfile>, GatewayError> {
        match GuildId::new(guild_id)
            .member(&self.http, UserId::new(user_id))
            .await
        {
            Ok(member) => Ok(Some(profile_from(&member))),
            Err(serenity::Error::Http(HttpError::UnsuccessfulRequest(response)))
                if response.status_code.as_u16() == 404 =>
            {
                Ok(None)
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn list_members(&self, guild_id: u64) -> Result<Vec<MemberProfile>, GatewayError> {
        let members = GuildId::new(guild_id)
            .members(&self.http, None, None)
            .await?;
        Ok(members.iter().map(profile_from).collect())
    }

    async fn role_exists(&self, guild_id: u64, role_id: u64) -> Result<bool, GatewayError> {
        let roles = GuildId::new(guild_id).roles(&self.http).await?;
        Ok(roles.contains_key(&RoleId::new(role_id)))
    }

    async fn add_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), GatewayError> {
        self.http
            .add_member_role(
                GuildId::new(guild_id),
                UserId::new(user_id),
                RoleId::new(role_id),
                None,
            )
            .await?;
        Ok(())
    }

    async fn remove_role(
        &self,
        guild_id: u64,
        user_id: u64,
        role_id: u64,
    ) -> Result<(), GatewayError> {
        self.http
            .remove_member_role(
                GuildId::new(guild_id),
                UserId::new(user_id),
                RoleId::new(role_id),
                None,
            )
            .await?;
        Ok(())
    }

    async fn ban(&self, guild_id: u64, user_id: u64, reason: &str) -> Result<(), GatewayError> {
        GuildId::new(guild_id)
            .ban_with_reason(&self.http, UserId::new(user_id), 0, reason)
            .await?;
        Ok(())
    }

    async fn kick(&self, guild_id: u64, user_id: u64, reason: &str) -> Result<(), GatewayError> {
        GuildId::new(guild_id)
            .kick_with_reason(&self.http, UserId::new(user_id), reason)
            .await?;
        Ok(())
    }

    async fn send_direct(&self, user_id: u64, note: &Notification) -> Result<(), GatewayError> {
        let channel = UserId::new(user_id).create_dm_channel(&self.http).await?;
        channel
            .id
            .send_message(
                &self.http,
                serenity::CreateMessage::new().embed(note.to_embed()),
            )
            .await?;
        Ok(())
    }

    async fn send_to_channel(
        &self,
        channel_id: u64,
        note: &Notification,
    ) -> Result<(), GatewayError> {
        ChannelId::new(channel_id)
            .send_message(
                &self.http,
                serenity::CreateMessage::new().embed(note.to_embed()),
            )
            .await?;
        Ok(())
    }
}
