use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use blog_shared::errors::{AppError, ErrorCode};

type HmacSha256 = Hmac<Sha256>;

pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Keyed digest of a code, bound to the address it was sent to.
pub fn hash_otp(secret: &str, email: &str, otp: &str) -> Result<String, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::internal(format!("invalid OTP secret: {e}")))?;
    mac.update(format!("{email}:{otp}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn digest_matches(expected: &str, candidate: &str) -> bool {
    expected.as_bytes().ct_eq(candidate.as_bytes()).into()
}

pub fn expires_at(now: DateTime<Utc>, minutes: u64) -> DateTime<Utc> {
    now + Duration::minutes(minutes as i64)
}

/// Checks that must pass before the digest is compared. Expiry wins over the
/// attempt counter.
pub fn ensure_usable(
    expires_at: DateTime<Utc>,
    attempts: i32,
    max_attempts: i32,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if now > expires_at {
        return Err(AppError::new(ErrorCode::OtpExpired, "OTP expired"));
    }
    if attempts >= max_attempts {
        return Err(AppError::new(
            ErrorCode::OtpAttemptsExceeded,
            "too many attempts, request a new OTP",
        ));
    }
    Ok(())
}

/// Normalized form used as the key for every OTP lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
