//! Build normalized, timestamped journal rows.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::JournalError;
use crate::types::{JournalEntry, Position};
use crate::utils::sanitize_symbol;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of "now". Injected so rows can be built deterministically in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Normalize inputs, stamp local time in `tz`, and attach P/L.
#[allow(clippy::too_many_arguments)]
pub fn build(
    user: &str,
    message_id: impl ToString,
    ticker: &str,
    position: &str,
    price_open: f64,
    price_close: Option<f64>,
    clock: &dyn Clock,
    tz: Tz,
) -> Result<JournalEntry, JournalError> {
    let ticker = sanitize_symbol(ticker);
    let side: Position = position.parse()?;
    let timestamp_local = local_timestamp(clock, tz);

    let (gain_loss, gain_loss_percent) = crate::pl::compute(side.as_str(), price_open, price_close)?;

    Ok(JournalEntry {
        timestamp_local,
        user: user.to_string(),
        message_id: message_id.to_string(),
        ticker,
        position: side,
        price_open,
        price_close,
        gain_loss,
        gain_loss_percent,
    })
}

pub fn local_timestamp(clock: &dyn Clock, tz: Tz) -> String {
    clock.now().with_timezone(&tz).format(TIMESTAMP_FORMAT).to_string()
}
