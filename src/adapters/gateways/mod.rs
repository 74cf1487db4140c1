//! Payment gateway adapters.
//!
//! - `cinetpay` - form/JSON webhooks signed with an `x-token` HMAC
//! - `notchpay` - JSON webhooks signed with an `x-notch-signature` HMAC
//! - `mock` - scripted gateway for tests and local runs

mod cinetpay;
mod mock;
mod notchpay;

pub use cinetpay::{CinetPayConfig, CinetPayGateway};
pub use mock::MockGateway;
pub use notchpay::{NotchPayConfig, NotchPayGateway};

use crate::domain::foundation::Timestamp;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `payload`.
fn hmac_hex(secret: &[u8], payload: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature.
fn signature_matches(secret: &[u8], payload: &[u8], provided_hex: &str) -> bool {
    let Some(expected) = hmac_hex(secret, payload) else {
        return false;
    };
    let provided = provided_hex.trim().to_ascii_lowercase();
    expected.as_bytes().ct_eq(provided.as_bytes()).unwrap_u8() == 1
}

/// Reads an amount sent either as a JSON number or as a string.
fn parse_amount(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64)),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<i64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().map(|f| f.round() as i64)),
        _ => None,
    }
}

/// Gateways send either RFC 3339 or `YYYY-MM-DD HH:MM:SS` (UTC).
fn parse_datetime(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(Timestamp::from_datetime(dt.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| Timestamp::from_datetime(Utc.from_utc_datetime(&naive)))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
