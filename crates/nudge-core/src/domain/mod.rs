//! Domain model (IDs, entity shapes, occurrences, outcomes, reports, ...).
//!
//! ドメイン層は I/O を持ちません。
//! - entity: ストアとやり取りするレコードの形
//! - occurrence: エンジンが扱う統一形（ReminderOccurrence）
//! - time / recurrence: 時刻の解決と繰り返しの計算
//! - outcome / report: 実行結果の形

pub mod entity;
pub mod errors;
pub mod ids;
pub mod message;
pub mod occurrence;
pub mod outcome;
pub mod recurrence;
pub mod report;
pub mod time;

pub use entity::{
    EmbeddedReminder, Frequency, Meeting, MeetingStatus, MessageChannel, MessageStatus,
    NewReminder, OutboundMessage, Recurrence, Reminder, ReminderStatus, Task, TaskStatus,
};
pub use errors::{ErrorKind, NudgeError};
pub use ids::{EntityRef, MeetingId, MessageId, ReminderId, TaskId};
pub use occurrence::{
    Channel, ChannelPlan, ChannelRequirement, Origin, Recipients, ReminderOccurrence, SourceKind,
};
pub use outcome::{ChannelOutcome, ChannelResult, ItemOutcome, ItemStatus, PopupPayload};
pub use recurrence::NextOccurrence;
pub use report::{CheckedCounts, DebugInfo, ErrorReport, RunReport, SkippedItem, SourceError};
pub use time::{TimeError, TimeResolver};
