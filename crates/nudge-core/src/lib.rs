//! nudge-core
//!
//! Due-reminder resolution and multi-channel dispatch engine.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, entity, occurrence, time, recurrence, outcome, report, errors）
//! - **ports**: 抽象化レイヤー（EntityStore, EmailSender, MessageOutbox, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（builder, engine, aggregator, evaluator, dispatcher, mutator, reporter）
//! - **impls**: 実装（InMemoryEntityStore など開発用）
//! - **config**: TOML 設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
