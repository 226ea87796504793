//! Per-unit profit/loss for a single long or short position.

use crate::error::JournalError;
use crate::types::Position;

/// `(gain_loss, gain_loss_percent)`; both `None` while the position is open.
pub type PlResult = (Option<f64>, Option<f64>);

/// Validate `position` and compute P/L. See [`Position::pl`].
pub fn compute(
    position: &str,
    price_open: f64,
    price_close: Option<f64>,
) -> Result<PlResult, JournalError> {
    let side: Position = position.parse()?;
    Ok(side.pl(price_open, price_close))
}

impl Position {
    /// Long gains when price rises, short when it falls. Percent is relative
    /// to the open price and is 0 when the open price is exactly 0.
    pub fn pl(self, price_open: f64, price_close: Option<f64>) -> PlResult {
        let Some(close) = price_close else {
            return (None, None);
        };
        let gl = match self {
            Position::Long => close - price_open,
            Position::Short => price_open - close,
        };
        let gl_pct = if price_open != 0.0 {
            gl / price_open * 100.0
        } else {
            0.0
        };
        (Some(gl), Some(gl_pct))
    }
}
