//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryEntityStore**: JSON スナップショットで初期化する正本（MessageOutbox も兼ねる）
//! - **RecordingEmailSender**: テスト用のメール送信（記録するだけ）
//! - **LogEmailSender**: CLI 用のメール送信（ログに出すだけ）
//!
//! # 本番用実装
//! 本番用の実装（ホスト側ストアの HTTP クライアント、SMTP 送信など）は
//! 別クレートに配置する想定です。

pub mod inmem_email;
pub mod inmem_store;

pub use self::inmem_email::{LogEmailSender, RecordingEmailSender};
pub use self::inmem_store::{Faults, InMemoryEntityStore, Snapshot};
