pub mod commands;
pub mod config;
pub mod data;
pub mod duration;
pub mod handlers;
pub mod logging;
pub mod moderation;
pub mod router;
pub mod verification;

// Customize these constants for your bot
pub const BOT_NAME: &str = "warden";
pub const COMMAND_TARGET: &str = "warden::command";
pub const ERROR_TARGET: &str = "warden::error";
pub const EVENT_TARGET: &str = "warden::handlers";
pub const SANCTION_TARGET: &str = "warden::sanctions";
pub const CONSOLE_TARGET: &str = "warden";

pub use config::BotConfig;
pub use data::{Data, DataInner};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
