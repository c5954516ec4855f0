use axum::extract::State;
use axum::Json;
use chrono::{Duration, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use blog_shared::clients::db;
use blog_shared::errors::{AppError, AppResult, ErrorCode};
use blog_shared::types::auth::{AccessToken, TokenPair};
use blog_shared::types::ApiResponse;

use crate::middleware::{ClientIp, JsonBody};
use crate::models::{AuthorSummary, EmailOtp, NewEmailOtp, NewRefreshToken, Profile, RefreshToken};
use crate::schema::{email_otps, profiles, refresh_tokens};
use crate::services::{otp_service, token_service};
use crate::AppState;

use super::validation_error;

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub otp: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpSent {
    pub email: String,
    pub expires_in_minutes: u64,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: AuthorSummary,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// A normalized address, checked against the `profiles.email` column.
#[derive(Debug, Validate)]
struct EmailAddress {
    #[validate(
        email(message = "invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    email: String,
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Trimmed, lowercased and syntactically valid address, or a 400.
pub(crate) fn require_email(raw: Option<String>) -> AppResult<String> {
    let email = present(raw)
        .map(|e| otp_service::normalize_email(&e))
        .ok_or_else(|| AppError::new(ErrorCode::ValidationError, "Email is required"))?;
    let address = EmailAddress { email };
    address.validate().map_err(validation_error)?;
    Ok(address.email)
}

fn check_otp_limit(state: &AppState, ip: &ClientIp, email: &str) -> AppResult<()> {
    if !state.otp_limiter.hit(&format!("{}:{}", ip.0, email)) {
        tracing::warn!(ip = %ip.0, email = %email, "otp rate limit exceeded");
        return Err(AppError::new(
            ErrorCode::RateLimited,
            "Too many OTP requests. Please try again later.",
        ));
    }
    Ok(())
}

fn find_profile(conn: &mut PgConnection, email: &str) -> AppResult<Option<Profile>> {
    Ok(profiles::table
        .filter(profiles::email.eq(email))
        .select(Profile::as_select())
        .first(conn)
        .optional()?)
}

pub async fn send_otp(
    State(state): State<Arc<AppState>>,
    client_ip: ClientIp,
    JsonBody(req): JsonBody<SendOtpRequest>,
) -> AppResult<Json<ApiResponse<OtpSent>>> {
    let email = require_email(req.email)?;
    check_otp_limit(&state, &client_ip, &email)?;

    if let Err(wait) = state.otp_cooldown.check_and_mark(&email) {
        return Err(AppError::with_details(
            ErrorCode::OtpCooldown,
            format!("Please wait {wait} seconds before requesting another OTP."),
            serde_json::json!({ "retryAfter": wait }),
        ));
    }

    let otp = otp_service::generate_otp();
    let otp_hash = otp_service::hash_otp(&state.config.otp_secret, &email, &otp)?;
    let expiry_minutes = state.config.otp_expiry_minutes;

    let lookup_email = email.clone();
    db::run(&state.db, move |conn| {
        match find_profile(conn, &lookup_email)? {
            Some(profile) if profile.can_login() => {}
            Some(profile) => {
                tracing::warn!(user_id = %profile.id, role = %profile.role, "otp refused for role");
                return Err(AppError::new(ErrorCode::AccessDenied, "Access denied. Role is not allowed to login."));
            }
            None => {
                return Err(AppError::new(
                    ErrorCode::AccessDenied,
                    "Access denied. This email is not registered in the system.",
                ));
            }
        }

        let now = Utc::now();
        let row = NewEmailOtp {
            email: lookup_email,
            otp_hash,
            expires_at: otp_service::expires_at(now, expiry_minutes),
            attempts: 0,
            created_at: now,
        };
        diesel::insert_into(email_otps::table)
            .values(&row)
            .on_conflict(email_otps::email)
            .do_update()
            .set(&row)
            .execute(conn)?;
        Ok(())
    })
    .await?;

    if let Err(e) = state.email.send_login_code(&email, &otp, expiry_minutes).await {
        tracing::error!(email = %email, error = %e, "failed to send otp email");
        return Err(AppError::new(ErrorCode::OtpDeliveryFailed, "Failed to send OTP email"));
    }

    tracing::info!(email = %email, "otp sent");

    Ok(Json(ApiResponse::ok_with_message(
        OtpSent { email, expires_in_minutes: expiry_minutes },
        "OTP sent successfully",
    )))
}

pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    client_ip: ClientIp,
    JsonBody(req): JsonBody<VerifyOtpRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let (email, otp) = match (present(req.email), present(req.otp)) {
        (Some(e), Some(o)) => (otp_service::normalize_email(&e), o),
        _ => {
            return Err(AppError::new(ErrorCode::ValidationError, "Email and OTP are required"));
        }
    };
    check_otp_limit(&state, &client_ip, &email)?;

    let candidate = otp_service::hash_otp(&state.config.otp_secret, &email, &otp)?;
    let max_attempts = state.config.otp_max_attempts;
    let jwt_secret = state.config.jwt_secret.clone();
    let access_ttl = state.config.access_token_ttl;
    let refresh_ttl = state.config.refresh_token_ttl;

    let response = db::run(&state.db, move |conn| {
        let stored: EmailOtp = email_otps::table
            .find(&email)
            .select(EmailOtp::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::OtpInvalid, "Invalid or expired OTP"))?;

        otp_service::ensure_usable(stored.expires_at, stored.attempts, max_attempts, Utc::now())?;

        if !otp_service::digest_matches(&stored.otp_hash, &candidate) {
            diesel::update(email_otps::table.find(&email))
                .set(email_otps::attempts.eq(email_otps::attempts + 1))
                .execute(conn)?;
            tracing::warn!(email = %email, attempts = stored.attempts + 1, "otp mismatch");
            return Err(AppError::new(ErrorCode::OtpInvalid, "Invalid OTP"));
        }

        let profile = find_profile(conn, &email)?
            .ok_or_else(|| AppError::new(ErrorCode::AccessDenied, "Access denied. User not found."))?;
        let role = profile
            .role()
            .filter(|r| r.can_login())
            .ok_or_else(|| AppError::new(ErrorCode::AccessDenied, "Access denied. Role not allowed."))?;

        diesel::delete(email_otps::table.find(&email)).execute(conn)?;

        let access_token = token_service::create_access_token(profile.id, role, &jwt_secret, access_ttl)?;
        let refresh_token = token_service::create_refresh_token();

        diesel::insert_into(refresh_tokens::table)
            .values(&NewRefreshToken {
                user_id: profile.id,
                token_hash: token_service::hash_token(&refresh_token),
                expires_at: Utc::now() + Duration::seconds(refresh_ttl),
            })
            .execute(conn)?;

        tracing::info!(user_id = %profile.id, role = %role, "user logged in");

        Ok(LoginResponse {
            user: AuthorSummary::from(&profile),
            tokens: TokenPair::new(access_token, refresh_token, access_ttl),
        })
    })
    .await?;

    Ok(Json(ApiResponse::ok(response)))
}

/// Mint a new access token from a refresh token. The refresh token itself
/// stays valid until it expires.
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RefreshRequest>,
) -> AppResult<Json<ApiResponse<AccessToken>>> {
    let token = present(req.refresh_token)
        .ok_or_else(|| AppError::new(ErrorCode::ValidationError, "Refresh token is required"))?;
    let token_hash = token_service::hash_token(&token);
    let jwt_secret = state.config.jwt_secret.clone();
    let access_ttl = state.config.access_token_ttl;

    let access_token = db::run(&state.db, move |conn| {
        let stored: RefreshToken = refresh_tokens::table
            .filter(refresh_tokens::token_hash.eq(&token_hash))
            .select(RefreshToken::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::TokenInvalid, "Invalid refresh token"))?;

        if stored.expires_at < Utc::now() {
            return Err(AppError::new(ErrorCode::TokenExpired, "Refresh token expired"));
        }

        let profile: Profile = profiles::table
            .find(stored.user_id)
            .select(Profile::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::TokenInvalid, "Invalid refresh token"))?;

        let role = profile
            .role()
            .filter(|r| r.can_login())
            .ok_or_else(|| AppError::new(ErrorCode::AccessDenied, "Access denied"))?;

        tracing::debug!(user_id = %profile.id, "access token refreshed");
        token_service::create_access_token(profile.id, role, &jwt_secret, access_ttl)
    })
    .await?;

    Ok(Json(ApiResponse::ok(AccessToken::new(access_token, access_ttl))))
}
