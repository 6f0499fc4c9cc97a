use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{Notifier, NotifyError};
use crate::config::TelegramConfig;

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

/// Broadcasts notifications to admin chats through the Telegram Bot API.
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    chat_ids: Vec<i64>,
}

impl TelegramNotifier {
    pub fn new(token: &str, config: &TelegramConfig) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/bot{}/sendMessage", config.api_url.trim_end_matches('/'), token),
            chat_ids: config.admin_chat_ids.clone(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    /// Sends to every chat; the first failure is returned after all attempts.
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        if self.chat_ids.is_empty() {
            return Err(NotifyError::NoRecipients);
        }

        let mut first_error = None;
        for &chat_id in &self.chat_ids {
            let result = self
                .client
                .post(&self.endpoint)
                .json(&SendMessage { chat_id, text })
                .send()
                .await;

            let err = match result {
                Ok(response) if response.status().is_success() => continue,
                Ok(response) => NotifyError::Rejected {
                    chat_id,
                    status: response.status(),
                },
                Err(err) => NotifyError::Http(err),
            };
            tracing::warn!(chat_id, error = %err, "telegram delivery failed");
            first_error.get_or_insert(err);
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
