use async_trait::async_trait;
use rand::Rng;
use time::{Duration, OffsetDateTime};
use tracing::error;

use crate::error::ApiError;
use crate::mailer::Mailer;

pub const OTP_DIGITS: usize = 6;

/// Generate a fixed-length numeric one-time code.
pub fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    n.to_string()
}

/// Expiry for a code issued now, given a validity window in minutes.
pub fn expiry_from_now(ttl_minutes: i64) -> OffsetDateTime {
    OffsetDateTime::now_utc() + Duration::minutes(ttl_minutes)
}

/// Compare a submitted code against the stored one. Constant-time over the
/// code bytes so a mismatch position is not observable; `None` (no pending
/// code) never matches.
pub fn code_matches(stored: Option<&str>, submitted: &str) -> bool {
    let Some(stored) = stored else {
        return false;
    };
    if stored.len() != submitted.len() {
        return false;
    }
    stored
        .bytes()
        .zip(submitted.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Whether a stored expiry has passed. A missing expiry counts as expired,
/// since the code/expiry pair is always written together.
pub fn is_expired(expire_at: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
    match expire_at {
        Some(at) => now > at,
        None => true,
    }
}

/// Validate a submitted code against the stored pair. Mismatch (including
/// an already-consumed code) is reported before expiry.
pub fn check_code(
    stored: Option<&str>,
    expire_at: Option<OffsetDateTime>,
    submitted: &str,
    now: OffsetDateTime,
) -> Result<(), ApiError> {
    if !code_matches(stored, submitted) {
        return Err(ApiError::auth("Invalid OTP"));
    }
    if is_expired(expire_at, now) {
        return Err(ApiError::expired("OTP expired"));
    }
    Ok(())
}

/// Storage seam for a user's pending code. Implementations write and clear
/// the code and its expiry in a single statement.
#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn store(&self, code: &str, expire_at: OffsetDateTime) -> anyhow::Result<()>;
    async fn clear(&self) -> anyhow::Result<()>;
}

/// Generate a code, persist it, then mail it. A failed send clears the
/// stored pair so a code the user never received cannot linger.
pub async fn issue_and_send(
    store: &dyn OtpStore,
    mailer: &dyn Mailer,
    to: &str,
    subject: &str,
    ttl_minutes: i64,
    body: impl Fn(&str) -> String + Send,
) -> Result<(), ApiError> {
    let code = generate_code();
    let expire_at = expiry_from_now(ttl_minutes);
    store.store(&code, expire_at).await?;

    let text = body(&code);
    if let Err(e) = mailer.send(to, subject, &text).await {
        error!(error = %e, to = %to, "otp mail failed");
        if let Err(e) = store.clear().await {
            error!(error = %e, to = %to, "failed to clear otp after mail error");
        }
        return Err(ApiError::Internal(e));
    }
    Ok(())
}


#[cfg(test)]
mod flow_tests {
    use super::*;
    use crate::mailer::test_support::RecordingMailer;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        pending: Mutex<Option<(String, OffsetDateTime)>>,
    }

    #[async_trait]
    impl OtpStore for MemoryStore {
        async fn store(&self, code: &str, expire_at: OffsetDateTime) -> anyhow::Result<()> {
            *self.pending.lock().unwrap() = Some((code.to_string(), expire_at));
            Ok(())
        }

        async fn clear(&self) -> anyhow::Result<()> {
            *self.pending.lock().unwrap() = None;
            Ok(())
        }
    }

    #[tokio::test]
    async fn issue_stores_then_mails_the_same_code() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        issue_and_send(&store, &mailer, "ann@x.com", "Verify", 15, |code| {
            format!("Your OTP is {code}.")
        })
        .await
        .expect("issue should succeed");

        let (code, expire_at) = store.pending.lock().unwrap().clone().expect("code stored");
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "ann@x.com");
        assert!(sent[0].2.contains(&code));
        assert!(expire_at > OffsetDateTime::now_utc());
    }

    #[tokio::test]
    async fn failed_send_rolls_back_the_stored_code() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer {
            fail: true,
            ..Default::default()
        };
        let err = issue_and_send(&store, &mailer, "ann@x.com", "Verify", 15, |c| c.to_string())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "internal");
        assert!(
            store.pending.lock().unwrap().is_none(),
            "a code the user never received must not stay pending"
        );
    }

    #[tokio::test]
    async fn verification_succeeds_exactly_once() {
        let store = MemoryStore::default();
        let mailer = RecordingMailer::default();
        issue_and_send(&store, &mailer, "ann@x.com", "Verify", 15, |c| c.to_string())
            .await
            .expect("issue should succeed");
        let (code, expire_at) = store.pending.lock().unwrap().clone().expect("code stored");

        let now = OffsetDateTime::now_utc();
        check_code(Some(&code), Some(expire_at), &code, now).expect("first submission");

        // Consuming the code clears the pair; a replay must fail.
        store.clear().await.unwrap();
        let (stored, stored_expiry) = match store.pending.lock().unwrap().clone() {
            Some((c, at)) => (Some(c), Some(at)),
            None => (None, None),
        };
        let err = check_code(stored.as_deref(), stored_expiry, &code, now).unwrap_err();
        assert_eq!(err.kind(), "auth");
    }
}
