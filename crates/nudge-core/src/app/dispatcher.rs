//! ChannelDispatcher - チャネルごとに独立した送信
//!
//! # 設計原則
//! - チャネル同士は互いに影響しない（メール失敗でもチャット / SMS / ポップアップは続行）
//! - 宛先単位で失敗を隔離（1 人の失敗で他の宛先を止めない）
//! - チャット / SMS はキュー投入まで（配送確認はしない）
//! - ポップアップは呼び出し側に返すだけで、永続化はしない

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use tracing::{debug, warn};

use super::bounded::bounded;
use crate::domain::message::{email_content, short_text};
use crate::domain::{
    Channel, ChannelOutcome, ChannelResult, MessageChannel, PopupPayload, ReminderOccurrence,
    TimeResolver,
};
use crate::ports::{ChannelError, EmailMessage, EmailSender, MessageOutbox, NewOutboundMessage};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
});

const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15;

/// Result of dispatching one occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatch {
    pub outcome: ChannelOutcome,
    pub popup: Option<PopupPayload>,
}

pub struct ChannelDispatcher {
    email: Arc<dyn EmailSender>,
    outbox: Arc<dyn MessageOutbox>,
    resolver: TimeResolver,
    io_timeout: Duration,
    default_ringtone: String,
}

impl ChannelDispatcher {
    pub fn new(
        email: Arc<dyn EmailSender>,
        outbox: Arc<dyn MessageOutbox>,
        resolver: TimeResolver,
        io_timeout: Duration,
        default_ringtone: impl Into<String>,
    ) -> Self {
        Self {
            email,
            outbox,
            resolver,
            io_timeout,
            default_ringtone: default_ringtone.into(),
        }
    }

    /// Dispatch every outstanding channel of `occurrence`. Never fails as a
    /// whole; per-channel problems are recorded in the outcome.
    pub async fn dispatch(&self, occurrence: &ReminderOccurrence) -> Dispatch {
        let (email, chat, sms) = tokio::join!(
            self.send_email(occurrence),
            self.enqueue(occurrence, Channel::Chat),
            self.enqueue(occurrence, Channel::Sms),
        );

        let popup = occurrence
            .channels
            .popup_outstanding()
            .then(|| self.popup(occurrence));

        Dispatch {
            outcome: ChannelOutcome {
                email,
                chat,
                sms,
                popup: if popup.is_some() {
                    ChannelResult::surfaced()
                } else {
                    ChannelResult::idle()
                },
            },
            popup,
        }
    }

    async fn send_email(&self, occurrence: &ReminderOccurrence) -> ChannelResult {
        if !occurrence.channels.email.is_outstanding() {
            return ChannelResult::idle();
        }
        let recipients = email_recipients(occurrence);
        let content = email_content(occurrence, &self.resolver);

        let mut attempts = Vec::with_capacity(recipients.len());
        for to in recipients {
            let message = EmailMessage {
                to: to.clone(),
                subject: content.subject.clone(),
                body: content.body.clone(),
            };
            let result = bounded("send_email", self.io_timeout, self.email.send(message)).await;
            self.log_attempt(occurrence, Channel::Email, &to, &result);
            attempts.push((to, result));
        }
        ChannelResult::from_attempts(attempts)
    }

    async fn enqueue(&self, occurrence: &ReminderOccurrence, channel: Channel) -> ChannelResult {
        let (raw, kind) = match channel {
            Channel::Chat => (&occurrence.recipients.chat, MessageChannel::Whatsapp),
            Channel::Sms => (&occurrence.recipients.sms, MessageChannel::Sms),
            Channel::Email | Channel::Popup => return ChannelResult::idle(),
        };
        if !occurrence.channels.get(channel).is_outstanding() {
            return ChannelResult::idle();
        }
        let body = short_text(occurrence, &self.resolver);

        let mut attempts = Vec::new();
        for to in phone_recipients(raw) {
            let message = NewOutboundMessage {
                channel: kind,
                to: to.clone(),
                body: body.clone(),
                source: occurrence.key(),
            };
            let result = bounded("enqueue_message", self.io_timeout, self.outbox.enqueue(message))
                .await
                .map(|_| ());
            self.log_attempt(occurrence, channel, &to, &result);
            attempts.push((to, result));
        }
        ChannelResult::from_attempts(attempts)
    }

    fn popup(&self, occurrence: &ReminderOccurrence) -> PopupPayload {
        PopupPayload {
            id: occurrence.key(),
            entity_id: occurrence.owner().raw_id().to_string(),
            kind: occurrence.origin.popup_type().to_string(),
            title: occurrence.label.clone(),
            client_name: occurrence.client_name.clone(),
            message: occurrence
                .message
                .clone()
                .unwrap_or_else(|| short_text(occurrence, &self.resolver)),
            ringtone: occurrence
                .ringtone
                .clone()
                .filter(|tone| !tone.trim().is_empty())
                .unwrap_or_else(|| self.default_ringtone.clone()),
            reminder_index: occurrence.origin.index(),
        }
    }

    fn log_attempt(
        &self,
        occurrence: &ReminderOccurrence,
        channel: Channel,
        recipient: &str,
        result: &Result<(), ChannelError>,
    ) {
        match result {
            Ok(()) => debug!(key = %occurrence.key(), %channel, recipient, "delivered"),
            Err(err) => warn!(
                key = %occurrence.key(),
                %channel,
                recipient,
                error = %err,
                "delivery failed"
            ),
        }
    }
}

/// Explicit recipients, else the creator; deduplicated and filtered to
/// plausible addresses.
pub fn email_recipients(occurrence: &ReminderOccurrence) -> Vec<String> {
    let explicit: Vec<&String> = occurrence
        .recipients
        .email
        .iter()
        .filter(|r| !r.trim().is_empty())
        .collect();
    let candidates: Vec<&String> = if explicit.is_empty() {
        occurrence.recipients.creator.iter().collect()
    } else {
        explicit
    };

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .map(|r| r.trim())
        .filter(|r| EMAIL_RE.is_match(r))
        .filter(|r| seen.insert(r.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Normalize to `+digits`. `None` when the digit count is implausible.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mut digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if !trimmed.starts_with('+') && digits.starts_with("00") {
        digits.drain(..2);
    }
    (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS)
        .contains(&digits.len())
        .then(|| format!("+{digits}"))
}

fn phone_recipients(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter_map(|r| normalize_phone(r))
        .filter(|r| seen.insert(r.clone()))
        .collect()
}
