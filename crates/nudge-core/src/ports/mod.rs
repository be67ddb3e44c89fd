//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（ホスト側エンティティストア、メール送信、
//! メッセージキュー）へのインターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - エンティティストアが source of truth（正本）
//! - エンジン自身は実行履歴を持たない（送信済みフラグだけが状態）

pub mod clock;
pub mod entity_store;
pub mod id_generator;
pub mod notifier;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::entity_store::{EntityStore, MeetingPatch, ReminderPatch, StoreError, TaskPatch};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::notifier::{ChannelError, EmailMessage, EmailSender, MessageOutbox, NewOutboundMessage};
