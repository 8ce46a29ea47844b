use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::otp::OtpStore;
use crate::auth::repo_types::User;

const USER_COLUMNS: &str = "id, name, email, password_hash, is_account_verified, \
     verify_otp, verify_otp_expire_at, reset_otp, reset_otp_expire_at, created_at";

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Find a user by id.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new unverified user with a hashed password.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash) \
             VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Store a pending email-verification code and its expiry.
    pub async fn set_verify_otp(
        db: &PgPool,
        id: Uuid,
        code: &str,
        expire_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET verify_otp = $2, verify_otp_expire_at = $3 WHERE id = $1")
            .bind(id)
            .bind(code)
            .bind(expire_at)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Drop a pending verification code, e.g. after a failed mail send.
    pub async fn clear_verify_otp(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET verify_otp = NULL, verify_otp_expire_at = NULL WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Flip the account to verified and consume the code, atomically.
    pub async fn mark_verified(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET is_account_verified = TRUE, \
             verify_otp = NULL, verify_otp_expire_at = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Store a pending password-reset code and its expiry.
    pub async fn set_reset_otp(
        db: &PgPool,
        id: Uuid,
        code: &str,
        expire_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET reset_otp = $2, reset_otp_expire_at = $3 WHERE id = $1")
            .bind(id)
            .bind(code)
            .bind(expire_at)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Drop a pending reset code, e.g. after a failed mail send.
    pub async fn clear_reset_otp(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET reset_otp = NULL, reset_otp_expire_at = NULL WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Install the new password hash and consume the reset code, atomically.
    pub async fn update_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET password_hash = $2, \
             reset_otp = NULL, reset_otp_expire_at = NULL WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }
}

/// Pending verification code for one user, written as a pair.
pub struct VerifyOtpStore<'a> {
    pub db: &'a PgPool,
    pub user_id: Uuid,
}

#[async_trait]
impl OtpStore for VerifyOtpStore<'_> {
    async fn store(&self, code: &str, expire_at: OffsetDateTime) -> anyhow::Result<()> {
        User::set_verify_otp(self.db, self.user_id, code, expire_at).await
    }

    async fn clear(&self) -> anyhow::Result<()> {
        User::clear_verify_otp(self.db, self.user_id).await
    }
}

/// Pending password-reset code for one user, written as a pair.
pub struct ResetOtpStore<'a> {
    pub db: &'a PgPool,
    pub user_id: Uuid,
}

#[async_trait]
impl OtpStore for ResetOtpStore<'_> {
    async fn store(&self, code: &str, expire_at: OffsetDateTime) -> anyhow::Result<()> {
        User::set_reset_otp(self.db, self.user_id, code, expire_at).await
    }

    async fn clear(&self) -> anyhow::Result<()> {
        User::clear_reset_otp(self.db, self.user_id).await
    }
}
