//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **EngineBuilder**: エンジンの構築とワイヤリング
//! - **ReminderEngine**: 1 回の実行（collect → partition → dispatch → commit → report）
//! - **SourceAggregator**: 3 種類のリマインダー源の統合
//! - **DueEvaluator**: 期限到来の判定
//! - **ChannelDispatcher**: チャネルごとの送信
//! - **StateMutator**: 送信済みフラグの書き戻しと繰り返しの生成
//! - **RunReporter**: 実行結果の組み立て

pub mod aggregator;
pub mod bounded;
pub mod builder;
pub mod dispatcher;
pub mod engine;
pub mod evaluator;
pub mod mutator;
pub mod reporter;

#[cfg(test)]
pub(crate) mod fixtures;

// 主要な型を再エクスポート
pub use self::aggregator::{Collection, SourceAggregator};
pub use self::builder::{BuildError, EngineBuilder};
pub use self::dispatcher::{ChannelDispatcher, Dispatch};
pub use self::engine::ReminderEngine;
pub use self::evaluator::{DueEvaluator, Partition};
pub use self::mutator::{Commit, StateMutator};
pub use self::reporter::RunReporter;
