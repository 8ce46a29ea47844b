use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::config::MailConfig;

/// Outbound mail delivery. Handlers only see this trait; tests swap in
/// a recording fake.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Delivers mail through an HTTP mail API (Resend-style JSON endpoint).
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
    sender: String,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
            sender: config.sender.clone(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let payload = json!({
            "from": self.sender,
            "to": to,
            "subject": subject,
            "text": body,
        });

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .context("mail API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("mail API returned {status}: {text}");
        }

        debug!(to = %to, subject = %subject, "mail sent");
        Ok(())
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Records sends for assertions; never touches the network.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<(String, String, String)>>,
        pub fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("simulated mail failure");
            }
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), subject.to_string(), body.to_string()));
            Ok(())
        }
    }
}
