//! EngineBuilder - エンジンの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 開発体験の改善（明確なエラーメッセージ）

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveTime, TimeDelta};

use super::aggregator::SourceAggregator;
use super::dispatcher::ChannelDispatcher;
use super::engine::ReminderEngine;
use super::evaluator::DueEvaluator;
use super::mutator::StateMutator;
use crate::config::EngineConfig;
use crate::domain::TimeResolver;
use crate::ports::{Clock, EmailSender, EntityStore, MessageOutbox, SystemClock};

/// EngineBuilder は ReminderEngine を構築
///
/// # 使用例
/// ```ignore
/// let engine = EngineBuilder::new(config.engine)
///     .store(store.clone())
///     .email(Arc::new(LogEmailSender))
///     .outbox(store)
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - ポートが欠けていれば build() 時に BuildError
/// - 設定値（タイムゾーン、時刻、タイムアウト）も build() 時に検証
pub struct EngineBuilder {
    config: EngineConfig,
    store: Option<Arc<dyn EntityStore>>,
    email: Option<Arc<dyn EmailSender>>,
    outbox: Option<Arc<dyn MessageOutbox>>,
    clock: Option<Arc<dyn Clock>>,
}

/// BuildError はエンジン構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing port: {0}. Wire it before calling build().")]
    MissingPort(&'static str),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            store: None,
            email: None,
            outbox: None,
            clock: None,
        }
    }

    pub fn store(mut self, store: Arc<dyn EntityStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn email(mut self, email: Arc<dyn EmailSender>) -> Self {
        self.email = Some(email);
        self
    }

    pub fn outbox(mut self, outbox: Arc<dyn MessageOutbox>) -> Self {
        self.outbox = Some(outbox);
        self
    }

    /// Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<ReminderEngine, BuildError> {
        let store = self.store.ok_or(BuildError::MissingPort("entity store"))?;
        let email = self.email.ok_or(BuildError::MissingPort("email sender"))?;
        let outbox = self.outbox.ok_or(BuildError::MissingPort("message outbox"))?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let config = self.config;
        let resolver = TimeResolver::from_zone_str(&config.home_timezone)
            .map_err(|e| BuildError::InvalidConfig(format!("home_timezone: {e}")))?;
        let reference_time = NaiveTime::parse_from_str(config.default_reference_time.trim(), "%H:%M")
            .map_err(|e| {
                BuildError::InvalidConfig(format!(
                    "default_reference_time {:?}: {e}",
                    config.default_reference_time
                ))
            })?;
        if config.io_timeout_ms == 0 {
            return Err(BuildError::InvalidConfig("io_timeout_ms must be > 0".to_string()));
        }
        if config.max_concurrent_entities == 0 {
            return Err(BuildError::InvalidConfig(
                "max_concurrent_entities must be > 0".to_string(),
            ));
        }
        let io_timeout = Duration::from_millis(config.io_timeout_ms);
        let lookahead = TimeDelta::hours(i64::from(config.lookahead_hours));

        Ok(ReminderEngine::from_parts(
            SourceAggregator::new(Arc::clone(&store), resolver, reference_time, io_timeout),
            DueEvaluator::new(lookahead),
            ChannelDispatcher::new(email, outbox, resolver, io_timeout, config.default_ringtone),
            StateMutator::new(store, resolver, io_timeout),
            clock,
            config.max_concurrent_entities,
        ))
    }
}
