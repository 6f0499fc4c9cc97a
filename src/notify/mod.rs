//! Order notifications for store staff.
//!
//! Delivery is best-effort: the order engine hands a committed order to the
//! [`NotificationDispatcher`] and returns immediately, a background worker
//! renders the summary and pushes it through a [`Notifier`].

mod dispatcher;
mod message;
mod telegram;

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

pub use dispatcher::{DispatchStats, NotificationDispatcher};
pub use message::render_order_message;
pub use telegram::TelegramNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("no recipients configured")]
    NoRecipients,

    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("message rejected for chat {chat_id}: {status}")]
    Rejected {
        chat_id: i64,
        status: reqwest::StatusCode,
    },

    #[error("{0}")]
    Other(String),
}

/// Delivers pre-rendered text to the administrative audience.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log; used when no bot token is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        tracing::info!(message = %text, "order notification");
        Ok(())
    }
}

/// In-memory notifier for tests.
#[derive(Debug, Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify(&self, text: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Other("mock delivery failure".into()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(text.to_string());
        }
        Ok(())
    }
}
