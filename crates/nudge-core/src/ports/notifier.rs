//! Notifier ports - 送信チャネルの抽象化
//!
//! - EmailSender: トランザクションメールの送信
//! - MessageOutbox: チャット / SMS の送信レコードをキューに積む
//!
//! エンジンの責任はキュー投入まで（配送確認はしない）。

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{MessageChannel, OutboundMessage};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("{op} timed out")]
    Timeout { op: String },

    #[error("rejected by provider: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// 送信レコードの作成要求（ID と作成時刻はストア側で付与）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOutboundMessage {
    pub channel: MessageChannel,
    pub to: String,
    pub body: String,
    /// Occurrence key the message belongs to.
    pub source: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: EmailMessage) -> Result<(), ChannelError>;
}

#[async_trait]
pub trait MessageOutbox: Send + Sync {
    async fn enqueue(&self, message: NewOutboundMessage) -> Result<OutboundMessage, ChannelError>;
}
