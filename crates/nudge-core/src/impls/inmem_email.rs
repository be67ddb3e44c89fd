//! EmailSender の実装（開発用・テスト用）
//!
//! - **RecordingEmailSender**: 送信内容をメモリに記録（テスト用、宛先単位の障害注入つき）
//! - **LogEmailSender**: 送信内容を tracing に出すだけ（CLI 用）

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::ports::{ChannelError, EmailMessage, EmailSender};

#[derive(Default)]
struct Recorded {
    sent: Vec<EmailMessage>,
    failing: HashSet<String>,
}

/// RecordingEmailSender は送信したメールをすべて保持する
#[derive(Clone, Default)]
pub struct RecordingEmailSender {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// この宛先への送信を Rejected で失敗させる
    pub fn fail_for(&self, address: impl Into<String>) {
        self.lock().failing.insert(address.into());
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.lock().sent.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, email: EmailMessage) -> Result<(), ChannelError> {
        let mut recorded = self.lock();
        if recorded.failing.contains(&email.to) {
            return Err(ChannelError::Rejected(format!("mailbox {} unavailable", email.to)));
        }
        recorded.sent.push(email);
        Ok(())
    }
}

/// LogEmailSender は実際には送らず、ログに書くだけ
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, email: EmailMessage) -> Result<(), ChannelError> {
        info!(recipient = %email.to, subject = %email.subject, "email sent");
        Ok(())
    }
}
