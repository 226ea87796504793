//! Entry point. Wires Discord -> Journal -> Google Sheets.

mod commands;
mod config;
mod discord;
mod error;
mod journal;
mod keepalive;
mod pl;
mod sheets;
mod types;
mod utils;

use anyhow::Context;
use dotenvy::dotenv;
use serenity::all::GuildId;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use crate::journal::SystemClock;
use crate::sheets::SheetsClient;
use crate::utils::mask_id;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    // Load config
    let cfg_path = std::env::var("JOURNAL_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let cfg = config::AppConfig::load(&cfg_path).with_context(|| format!("load {cfg_path}"))?;
    let discord_token = std::env::var("DISCORD_TOKEN").context("missing DISCORD_TOKEN")?;
    let tz = cfg.timezone()?;

    // Sheets: open spreadsheet, create worksheet + header if needed
    let sheets = SheetsClient::new(
        &cfg.sheets.credentials,
        &cfg.sheets.spreadsheet_id,
        &cfg.sheets.worksheet_name,
    )?;
    sheets.ensure_worksheet().await?;

    if cfg.keepalive.enabled {
        let addr = cfg.keepalive_addr()?;
        tokio::spawn(async move {
            if let Err(e) = keepalive::serve(addr).await {
                error!("Keep-alive server error: {:#}", e);
            }
        });
    }

    info!(
        "Journal bot started. Sheet={} / '{}', TZ={}, Guild={:?}, KeepAlive={}",
        mask_id(&cfg.sheets.spreadsheet_id),
        sheets.worksheet(),
        tz,
        cfg.discord.guild_id,
        cfg.keepalive.enabled
    );

    let handler = discord::Handler {
        guild_id: cfg.discord.guild_id.filter(|id| *id != 0).map(GuildId::new),
        tz,
        clock: Arc::new(SystemClock),
        sink: Arc::new(sheets),
    };
    discord::run(&discord_token, handler).await
}
