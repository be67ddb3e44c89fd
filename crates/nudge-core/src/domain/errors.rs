//! Errors - エラー型と分類
//!
//! 各ポート（ストア・チャネル）は自分のエラー型を持ち、
//! エンジンの境界で `NudgeError` にまとめます。
//! チャネルの送信エラーは `ChannelResult` に畳み込まれるのでここには現れません。

use thiserror::Error;

use crate::ports::StoreError;

/// ErrorKind は実行エラーの分類
///
/// - Transient: 一時的なエラー（次回の実行で再試行される）
/// - Permanent: 恒久的なエラー（再試行しても無意味、人の対応が要る）
/// - Infrastructure: インフラエラー（ストアの障害）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

/// NudgeError はエンジン全体のエラー
#[derive(Debug, Error)]
pub enum NudgeError {
    #[error("a reminder run is already in progress")]
    RunInProgress,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("occurrence {key} no longer exists in its owner's reminder list")]
    StaleOccurrence { key: String },

    /// The reminder is already marked sent, so no later run will retry this.
    #[error("reminder {reminder} was marked sent but its next occurrence was not created: {source}")]
    SuccessorNotCreated {
        reminder: String,
        #[source]
        source: StoreError,
    },

    #[error("worker failed: {0}")]
    Worker(String),
}

impl NudgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NudgeError::RunInProgress => ErrorKind::Transient,
            NudgeError::Store(StoreError::Timeout { .. }) => ErrorKind::Transient,
            NudgeError::Store(StoreError::NotFound { .. }) => ErrorKind::Permanent,
            NudgeError::Store(_) => ErrorKind::Infrastructure,
            NudgeError::StaleOccurrence { .. } => ErrorKind::Transient,
            NudgeError::SuccessorNotCreated { .. } => ErrorKind::Permanent,
            NudgeError::Worker(_) => ErrorKind::Infrastructure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_errors() {
        assert_eq!(NudgeError::RunInProgress.kind(), ErrorKind::Transient);
        assert_eq!(
            NudgeError::from(StoreError::NotFound {
                entity: "task-x".to_string()
            })
            .kind(),
            ErrorKind::Permanent
        );
        assert_eq!(
            NudgeError::from(StoreError::Backend("disk full".to_string())).kind(),
            ErrorKind::Infrastructure
        );
        assert_eq!(
            NudgeError::from(StoreError::Timeout {
                op: "update_task".to_string()
            })
            .kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            NudgeError::SuccessorNotCreated {
                reminder: "reminder-x".to_string(),
                source: StoreError::Backend("down".to_string()),
            }
            .kind(),
            ErrorKind::Permanent
        );
    }

    #[test]
    fn messages_are_readable() {
        let err = NudgeError::StaleOccurrence {
            key: "01H_3".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "occurrence 01H_3 no longer exists in its owner's reminder list"
        );

        let err = NudgeError::SuccessorNotCreated {
            reminder: "reminder-7".to_string(),
            source: StoreError::Timeout {
                op: "create_reminder".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "reminder reminder-7 was marked sent but its next occurrence was not created: \
             store operation create_reminder timed out"
        );
    }
}
