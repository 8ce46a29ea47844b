use axum::{
    extract::{FromRef, State},
    http::{header::SET_COOKIE, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        cookies,
        dto::{
            normalize_email, require_field, ApiResponse, LoginRequest, RegisterRequest,
            ResetPasswordRequest, SendResetOtpRequest, UserData, UserDataResponse,
            VerifyAccountRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        otp,
        password::{hash_password, verify_password},
        repo::{ResetOtpStore, VerifyOtpStore},
        repo_types::User,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/send-verify-otp", post(send_verify_otp))
        .route("/auth/verify-account", post(verify_account))
        .route("/auth/is-auth", get(is_auth))
        .route("/auth/send-reset-otp", post(send_reset_otp))
        .route("/auth/reset-password", post(reset_password))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/user/data", get(get_user_data))
}

/// Sign a session token for `user_id` and wrap it in a `Set-Cookie` header.
fn session_headers(state: &AppState, user_id: Uuid) -> Result<HeaderMap, ApiError> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.sign_session(user_id)?;
    let cookie = cookies::session_cookie(
        &token,
        keys.session_ttl.as_secs(),
        state.config.cookie_secure,
    )
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    Ok(headers)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(HeaderMap, Json<ApiResponse>), ApiError> {
    require_field(&payload.name, "Name")?;
    require_field(&payload.password, "Password")?;
    let email = normalize_email(&payload.email)?;

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::conflict("Email already exists"));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, payload.name.trim(), &email, &hash).await?;

    let headers = session_headers(&state, user.id)?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((headers, Json(ApiResponse::ok())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<ApiResponse>), ApiError> {
    require_field(&payload.password, "Password")?;
    let email = normalize_email(&payload.email)?;

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| {
            warn!(email = %email, "login unknown email");
            ApiError::not_found("No user found with this email")
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(ApiError::auth("Invalid password"));
    }

    let headers = session_headers(&state, user.id)?;
    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((headers, Json(ApiResponse::ok())))
}

/// Idempotent: clears the cookie whether or not a session was present.
#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
) -> Result<(HeaderMap, Json<ApiResponse>), ApiError> {
    let cookie = cookies::clear_session_cookie(state.config.cookie_secure)
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    Ok((headers, Json(ApiResponse::msg("Logged out"))))
}

#[instrument(skip(state))]
pub async fn send_verify_otp(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if user.is_account_verified {
        return Err(ApiError::conflict("Account already verified"));
    }

    let store = VerifyOtpStore {
        db: &state.db,
        user_id: user.id,
    };
    otp::issue_and_send(
        &store,
        state.mailer.as_ref(),
        &user.email,
        "Account Verification OTP",
        state.config.otp.verify_ttl_minutes,
        |code| format!("Your OTP is {code}. Verify your account using this OTP."),
    )
    .await?;

    info!(user_id = %user.id, "verification otp sent");
    Ok(Json(ApiResponse::msg("Verification OTP sent on email")))
}

#[instrument(skip(state, payload))]
pub async fn verify_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<VerifyAccountRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    require_field(&payload.otp, "OTP")?;

    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    otp::check_code(
        user.verify_otp.as_deref(),
        user.verify_otp_expire_at,
        payload.otp.trim(),
        OffsetDateTime::now_utc(),
    )
    .map_err(|e| {
        warn!(user_id = %user.id, kind = e.kind(), "verify otp rejected");
        e
    })?;

    User::mark_verified(&state.db, user.id).await?;
    info!(user_id = %user.id, "account verified");
    Ok(Json(ApiResponse::msg("Email verified successfully")))
}

/// The token alone is not enough: the identity it names must still exist.
#[instrument(skip(state))]
pub async fn is_auth(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse>, ApiError> {
    User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::auth("Not authorized, login again"))?;
    Ok(Json(ApiResponse::ok()))
}

#[instrument(skip(state, payload))]
pub async fn send_reset_otp(
    State(state): State<AppState>,
    Json(payload): Json<SendResetOtpRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    let email = normalize_email(&payload.email)?;

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let store = ResetOtpStore {
        db: &state.db,
        user_id: user.id,
    };
    otp::issue_and_send(
        &store,
        state.mailer.as_ref(),
        &user.email,
        "Password Reset OTP",
        state.config.otp.reset_ttl_minutes,
        |code| {
            format!(
                "Your OTP for resetting your password is {code}. \
                 Use this OTP to proceed with resetting your password."
            )
        },
    )
    .await?;

    info!(user_id = %user.id, "reset otp sent");
    Ok(Json(ApiResponse::msg("OTP sent to your email")))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<ApiResponse>, ApiError> {
    require_field(&payload.otp, "OTP")?;
    require_field(&payload.new_password, "New password")?;
    let email = normalize_email(&payload.email)?;

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    otp::check_code(
        user.reset_otp.as_deref(),
        user.reset_otp_expire_at,
        payload.otp.trim(),
        OffsetDateTime::now_utc(),
    )
    .map_err(|e| {
        warn!(user_id = %user.id, kind = e.kind(), "reset otp rejected");
        e
    })?;

    let hash = hash_password(&payload.new_password)?;
    User::update_password(&state.db, user.id, &hash).await?;
    info!(user_id = %user.id, "password reset");
    Ok(Json(ApiResponse::msg("Password has been reset successfully")))
}

#[instrument(skip(state))]
pub async fn get_user_data(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserDataResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserDataResponse {
        success: true,
        user_data: UserData {
            name: user.name,
            is_account_verified: user.is_account_verified,
        },
    }))
}
