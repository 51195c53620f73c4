use chrono::Utc;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

/// Current wall clock in UNIX milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Seconds described by an `expiredToken` duration string.
///
/// Accepts `Nd`, `Nh`, `Nm` and bare seconds; any other suffix is read as
/// seconds. Returns `None` when there are no leading digits or the value
/// does not fit in an `i64` of seconds.
pub fn parse_duration_secs(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let digits: String = raw
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
        .map(|(_, c)| c)
        .collect();
    let value: i64 = digits.parse().ok()?;

    let unit: i64 = if raw.ends_with('d') {
        24 * 60 * 60
    } else if raw.ends_with('h') {
        60 * 60
    } else if raw.ends_with('m') {
        60
    } else {
        1
    };
    value.checked_mul(unit)
}

/// Absolute expiry (UNIX ms) for a duration string received at `now`.
/// Empty, unparseable or out-of-range input gives `0`, meaning "no known expiry".
pub fn expires_at(raw: &str, now: i64) -> i64 {
    parse_duration_secs(raw)
        .and_then(|secs| secs.checked_mul(1000))
        .and_then(|ms| now.checked_add(ms))
        .unwrap_or(0)
}

/// Expired iff an expiry is known and has passed
pub fn is_expired(expires_at: i64, now: i64) -> bool {
    expires_at > 0 && now >= expires_at
}

#[derive(Debug, Deserialize)]
struct ExpClaim {
    exp: i64,
}

/// `exp` claim of a JWT in UNIX ms, read without verifying the signature.
/// Used only when the backend omits `expiredToken`.
pub fn jwt_expires_at(token: &str) -> Option<i64> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;

    decode::<ExpClaim>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .and_then(|data| data.claims.exp.checked_mul(1000))
}
