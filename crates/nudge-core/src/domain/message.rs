//! Message text for each channel.

use super::occurrence::{ReminderOccurrence, SourceKind};
use super::time::TimeResolver;

/// Rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

fn heading(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Standalone => "Reminder",
        SourceKind::TaskLegacy | SourceKind::TaskList => "Task reminder",
        SourceKind::MeetingList => "Meeting reminder",
    }
}

pub fn email_content(occurrence: &ReminderOccurrence, resolver: &TimeResolver) -> EmailContent {
    let mut body = format!("{}: {}\n", heading(occurrence.origin.kind()), occurrence.label);
    if let Some(client) = &occurrence.client_name {
        body.push_str(&format!("Client: {client}\n"));
    }
    body.push_str(&format!("When: {}\n", resolver.format_local(occurrence.due_at)));
    if let Some(message) = &occurrence.message {
        body.push('\n');
        body.push_str(message);
        body.push('\n');
    }

    EmailContent {
        subject: format!("Reminder: {}", occurrence.label),
        body,
    }
}

/// Short text shared by chat, SMS and popup.
pub fn short_text(occurrence: &ReminderOccurrence, resolver: &TimeResolver) -> String {
    let mut text = format!(
        "{}: {} ({})",
        heading(occurrence.origin.kind()),
        occurrence.label,
        resolver.format_local(occurrence.due_at)
    );
    if let Some(client) = &occurrence.client_name {
        text.push_str(&format!(" - {client}"));
    }
    if let Some(message) = &occurrence.message {
        text.push_str(&format!("\n{message}"));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::MeetingId;
    use crate::domain::occurrence::{ChannelPlan, Origin, Recipients};
    use chrono::{TimeZone, Utc};
    use ulid::Ulid;

    fn occurrence() -> ReminderOccurrence {
        ReminderOccurrence {
            origin: Origin::MeetingList {
                meeting_id: MeetingId::new(Ulid::new().to_string()),
                index: 0,
            },
            due_at: Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap(),
            label: "Quarterly review".to_string(),
            client_name: Some("Acme".to_string()),
            message: Some("Bring the Q1 numbers".to_string()),
            channels: ChannelPlan::default(),
            recipients: Recipients::default(),
            ringtone: None,
        }
    }

    #[test]
    fn email_mentions_label_client_and_local_time() {
        let resolver = TimeResolver::from_zone_str("+02:00").unwrap();
        let email = email_content(&occurrence(), &resolver);
        assert_eq!(email.subject, "Reminder: Quarterly review");
        assert!(email.body.starts_with("Meeting reminder: Quarterly review"));
        assert!(email.body.contains("Client: Acme"));
        assert!(email.body.contains("When: 2024-03-10 09:00"));
        assert!(email.body.contains("Bring the Q1 numbers"));
    }

    #[test]
    fn short_text_is_one_line_plus_message() {
        let resolver = TimeResolver::from_zone_str("+02:00").unwrap();
        let text = short_text(&occurrence(), &resolver);
        assert_eq!(
            text,
            "Meeting reminder: Quarterly review (2024-03-10 09:00) - Acme\nBring the Q1 numbers"
        );
    }
}
