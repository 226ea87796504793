//! Serenity-based Discord bot. Registers slash commands and answers interactions.

use chrono_tz::Tz;
use serenity::all::{
    Client, Command, CommandInteraction, Context, CreateCommand, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, EventHandler,
    GatewayIntents, GuildId, Interaction, Ready,
};
use serenity::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::commands::{self, JournalArgs};
use crate::journal::Clock;
use crate::sheets::RowSink;
use crate::utils::user_label;

pub struct Handler {
    pub guild_id: Option<GuildId>,
    pub tz: Tz,
    pub clock: Arc<dyn Clock>,
    pub sink: Arc<dyn RowSink>,
}

impl Handler {
    async fn handle_journal(&self, ctx: &Context, command: &CommandInteraction) {
        // Sheets I/O can outlive the 3s interaction window; acknowledge first.
        let deferred = match command.defer_ephemeral(&ctx.http).await {
            Ok(()) => true,
            Err(e) => {
                warn!("defer failed, replying directly: {:#}", e);
                false
            }
        };

        let user = user_label(
            &command.user.name,
            command.user.discriminator.map(|d| d.get()),
        );
        let parsed = JournalArgs::from_options(
            command.data.options.iter().map(|o| (o.name.as_str(), &o.value)),
        );
        let result = match parsed {
            Ok(args) => {
                commands::run_journal(
                    &args,
                    &user,
                    command.id.get(),
                    self.clock.as_ref(),
                    self.tz,
                    self.sink.as_ref(),
                )
                .await
            }
            Err(e) => Err(e.into()),
        };

        let reply = match result {
            Ok(msg) => msg,
            Err(e) => {
                error!("journal command from {} failed: {:#}", user, e);
                commands::failure(&e)
            }
        };

        let sent = if deferred {
            command
                .create_followup(
                    &ctx.http,
                    CreateInteractionResponseFollowup::new()
                        .content(reply)
                        .ephemeral(true),
                )
                .await
                .map(|_| ())
        } else {
            reply_ephemeral(ctx, command, reply).await
        };
        if let Err(e) = sent {
            error!("journal reply failed: {:#}", e);
        }
    }
}

async fn reply_ephemeral(
    ctx: &Context,
    command: &CommandInteraction,
    content: String,
) -> serenity::Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await
}

fn command_set() -> Vec<CreateCommand> {
    vec![commands::register_journal(), commands::register_ping()]
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        // Guild sync is instant; global sync can take a while to appear.
        let (synced, scope) = match self.guild_id {
            Some(gid) => (
                gid.set_commands(&ctx.http, command_set()).await,
                format!("guild {}", gid),
            ),
            None => (
                Command::set_global_commands(&ctx.http, command_set()).await,
                "global".to_string(),
            ),
        };
        match synced {
            Ok(cmds) => {
                info!(
                    "Logged in as {} | synced {} commands to {}",
                    ready.user.name,
                    cmds.len(),
                    scope
                );
                info!(
                    "Commands: {:?}",
                    cmds.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
                );
            }
            Err(e) => error!("Slash command sync failed: {:#}", e),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };
        match command.data.name.as_str() {
            commands::JOURNAL => self.handle_journal(&ctx, &command).await,
            commands::PING => {
                if let Err(e) = reply_ephemeral(&ctx, &command, "pong".to_string()).await {
                    error!("ping reply failed: {:#}", e);
                }
            }
            other => warn!("Unknown command: {}", other),
        }
    }
}

pub async fn run(token: &str, handler: Handler) -> anyhow::Result<()> {
    let intents = GatewayIntents::GUILDS;
    let mut client = Client::builder(token, intents)
        .event_handler(handler)
        .await?;

    info!("Discord bot starting...");
    client.start().await?;
    Ok(())
}
