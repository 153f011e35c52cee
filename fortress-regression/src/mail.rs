//! Mailbox inspection against the lab mail-capture server.
//!
//! The product's SMTP traffic lands in a capture server that exposes a
//! small REST API; notification-email assertions search it by recipient and
//! subject. Arrival is asynchronous, so lookups go through the wait utility.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{HarnessError, Result};
use crate::wait::{self, WaitOptions};

/// A captured email.
#[derive(Debug, Clone, Deserialize)]
pub struct CapturedMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct MessageListResponse {
    messages: Vec<CapturedMessage>,
}

/// Client for the mail-capture REST API.
pub struct MailSpy {
    base_url: String,
    http: reqwest::Client,
}

impl MailSpy {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// All captured messages addressed to `recipient`.
    ///
    /// # Errors
    ///
    /// `Mail` for non-200 responses.
    pub async fn messages_for(&self, recipient: &str) -> Result<Vec<CapturedMessage>> {
        let url = format!("{}/api/v1/messages", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("to", recipient)])
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let text = response.text().await.unwrap_or_default();
            return Err(HarnessError::Mail(format!("HTTP {status}: {text}")));
        }
        let list: MessageListResponse = response.json().await?;
        Ok(list.messages)
    }

    /// Wait for a message to `recipient` whose subject contains
    /// `subject_part`, then return it.
    ///
    /// # Errors
    ///
    /// `WaitTimeout` when no matching message arrives in time.
    pub async fn expect_message(
        &self,
        recipient: &str,
        subject_part: &str,
        timeout: Duration,
    ) -> Result<CapturedMessage> {
        let options = WaitOptions::timeout(timeout);
        wait::wait_until(
            &format!("email to {recipient} with subject containing '{subject_part}'"),
            &options,
            || async move {
                let messages = self.messages_for(recipient).await?;
                Ok(messages.iter().any(|m| m.subject.contains(subject_part)))
            },
        )
        .await?;

        let messages = self.messages_for(recipient).await?;
        messages
            .into_iter()
            .find(|m| m.subject.contains(subject_part))
            .ok_or_else(|| HarnessError::Mail(format!("message to {recipient} vanished")))
    }

    /// Whether any message to `recipient` matches; never waits. For
    /// asserting the *absence* of fan-out after a settle period.
    ///
    /// # Errors
    ///
    /// `Mail` for non-200 responses.
    pub async fn has_message(&self, recipient: &str, subject_part: &str) -> Result<bool> {
        let messages = self.messages_for(recipient).await?;
        Ok(messages.iter().any(|m| m.subject.contains(subject_part)))
    }

    /// Delete everything addressed to `recipient`.
    ///
    /// # Errors
    ///
    /// `Mail` for non-2xx responses.
    pub async fn purge(&self, recipient: &str) -> Result<()> {
        let url = format!("{}/api/v1/messages", self.base_url);
        let response = self
            .http
            .delete(&url)
            .query(&[("to", recipient)])
            .send()
            .await?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let text = response.text().await.unwrap_or_default();
            return Err(HarnessError::Mail(format!("HTTP {status}: {text}")));
        }
        Ok(())
    }
}
