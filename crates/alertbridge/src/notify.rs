use async_trait::async_trait;

use crate::error::NotifyError;

/// Outbound chat notification. Best effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<(), NotifyError>;
}

/// Which pipeline outcomes produce a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotifyPolicy {
    pub on_success: bool,
    pub on_failure: bool,
}

impl NotifyPolicy {
    pub fn none() -> Self {
        Self {
            on_success: false,
            on_failure: false,
        }
    }

    pub fn all() -> Self {
        Self {
            on_success: true,
            on_failure: true,
        }
    }
}

impl Default for NotifyPolicy {
    /// Success only
    fn default() -> Self {
        Self {
            on_success: true,
            on_failure: false,
        }
    }
}
