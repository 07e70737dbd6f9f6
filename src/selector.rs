//! Signed update selection and value decoding

use crate::error::{FeedError, Result};
use crate::types::SignedUpdate;
use ethers::types::{H256, U256};
use ethers::utils::format_units;
use rust_decimal::Decimal;

/// Pick the freshest update matching the OEV template ID.
///
/// Strict key equality, maximum timestamp. Ties keep the first entry
/// encountered; the fold is deterministic for a given input sequence even
/// though the upstream document itself is unordered.
pub fn select_latest(updates: &[SignedUpdate], oev_template_id: H256) -> Option<&SignedUpdate> {
    updates
        .iter()
        .filter(|update| update.template_id == oev_template_id)
        .fold(None, |best: Option<&SignedUpdate>, update| match best {
            Some(current) if update.timestamp > current.timestamp => Some(update),
            None => Some(update),
            _ => best,
        })
}

/// Decode an update's value into a USD price.
///
/// Values are 18-decimal fixed-point integers ("wei" scaling), served either
/// as `0x` hex or as decimal strings. The f64 result is a designed
/// approximation: magnitudes beyond f64's safe integer range round. The
/// `Decimal` companion is exact whenever the value fits 28 significant
/// digits, and `None` otherwise.
pub fn decode_price(update: &SignedUpdate) -> Result<(f64, Option<Decimal>)> {
    let wei = parse_encoded_value(&update.encoded_value)?;

    let units = format_units(wei, 18)
        .map_err(|e| FeedError::Value(format!("cannot scale {wei}: {e}")))?;
    let price_usd: f64 = units
        .parse()
        .map_err(|e| FeedError::Value(format!("cannot parse {units:?} as float: {e}")))?;
    let price_exact = Decimal::from_str_exact(&units).ok();

    Ok((price_usd, price_exact))
}

fn parse_encoded_value(raw: &str) -> Result<U256> {
    let trimmed = raw.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex_digits) => U256::from_str_radix(hex_digits, 16)
            .map_err(|e| FeedError::Value(format!("bad hex value {trimmed:?}: {e}"))),
        None => U256::from_dec_str(trimmed)
            .map_err(|e| FeedError::Value(format!("bad decimal value {trimmed:?}: {e}"))),
    }?;
    Ok(parsed)
}
