//! Slash-command definitions and the transport-free `/journal` handler.

use chrono_tz::Tz;
use serenity::all::{CommandDataOptionValue, CommandOptionType, CreateCommand, CreateCommandOption};
use tracing::info;

use crate::error::JournalError;
use crate::journal::{self, Clock};
use crate::sheets::RowSink;
use crate::utils::sanitize_symbol;

pub const JOURNAL: &str = "journal";
pub const PING: &str = "ping";

pub fn register_journal() -> CreateCommand {
    CreateCommand::new(JOURNAL)
        .description("Log a trade journal row to Google Sheets")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "ticker",
                "Ticker symbol (e.g., EMTK, VWO)",
            )
            .required(true),
        )
        .add_option(
            CreateCommandOption::new(CommandOptionType::String, "position", "long or short")
                .required(true)
                .add_string_choice("long", "long")
                .add_string_choice("short", "short"),
        )
        .add_option(
            CreateCommandOption::new(CommandOptionType::Number, "price_open", "Entry price")
                .required(true),
        )
        .add_option(CreateCommandOption::new(
            CommandOptionType::Number,
            "price_close",
            "Exit price (optional)",
        ))
}

pub fn register_ping() -> CreateCommand {
    CreateCommand::new(PING).description("Test command visibility")
}

#[derive(Debug, Clone, PartialEq)]
pub struct JournalArgs {
    pub ticker: String,
    pub position: String,
    pub price_open: f64,
    pub price_close: Option<f64>,
}

impl JournalArgs {
    /// Pull typed arguments out of `(name, value)` option pairs.
    pub fn from_options<'a>(
        options: impl IntoIterator<Item = (&'a str, &'a CommandDataOptionValue)>,
    ) -> Result<Self, JournalError> {
        let mut ticker = None;
        let mut position = None;
        let mut price_open = None;
        let mut price_close = None;
        for (name, value) in options {
            match (name, value) {
                ("ticker", CommandDataOptionValue::String(s)) => ticker = Some(s.clone()),
                ("position", CommandDataOptionValue::String(s)) => position = Some(s.clone()),
                ("price_open", v) => price_open = as_number(v),
                ("price_close", v) => price_close = as_number(v),
                _ => {}
            }
        }
        Ok(Self {
            ticker: ticker.ok_or(JournalError::MissingOption("ticker"))?,
            position: position.ok_or(JournalError::MissingOption("position"))?,
            price_open: price_open.ok_or(JournalError::MissingOption("price_open"))?,
            price_close,
        })
    }
}

fn as_number(v: &CommandDataOptionValue) -> Option<f64> {
    match v {
        CommandDataOptionValue::Number(n) => Some(*n),
        CommandDataOptionValue::Integer(i) => Some(*i as f64),
        _ => None,
    }
}

pub fn acknowledgment(args: &JournalArgs) -> String {
    let suffix = match args.price_close {
        Some(c) => format!(" | closed @ {c:?}"),
        None => String::new(),
    };
    format!(
        "✅ Journaled {} {} | open @ {:?}{}",
        args.position.trim().to_uppercase(),
        sanitize_symbol(&args.ticker),
        args.price_open,
        suffix
    )
}

pub fn failure(err: &anyhow::Error) -> String {
    format!("❌ Failed: {err}")
}

/// Build the row, append it, and return the user-facing reply.
pub async fn run_journal(
    args: &JournalArgs,
    user: &str,
    message_id: u64,
    clock: &dyn Clock,
    tz: Tz,
    sink: &dyn RowSink,
) -> anyhow::Result<String> {
    let entry = journal::build(
        user,
        message_id,
        &args.ticker,
        &args.position,
        args.price_open,
        args.price_close,
        clock,
        tz,
    )?;
    sink.append_row(&entry).await?;
    info!(
        "Journaled {} {} for {} (msg {})",
        entry.position, entry.ticker, entry.user, entry.message_id
    );
    Ok(acknowledgment(args))
}
