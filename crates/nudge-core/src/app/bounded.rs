//! Bounded collaborator calls.
//!
//! 外部呼び出しはすべて `io_timeout` で包み、経過したら
//! そのポートのエラー型の Timeout に変換します。

use std::future::Future;
use std::time::Duration;

use crate::ports::{ChannelError, StoreError};

/// Port errors that can express "the call took too long".
pub trait TimedOut {
    fn timed_out(op: &str) -> Self;
}

impl TimedOut for StoreError {
    fn timed_out(op: &str) -> Self {
        StoreError::Timeout { op: op.to_string() }
    }
}

impl TimedOut for ChannelError {
    fn timed_out(op: &str) -> Self {
        ChannelError::Timeout { op: op.to_string() }
    }
}

pub async fn bounded<T, E, F>(op: &str, limit: Duration, call: F) -> Result<T, E>
where
    E: TimedOut,
    F: Future<Output = Result<T, E>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(E::timed_out(op)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_a_fast_result() {
        let result: Result<u8, StoreError> =
            bounded("list_tasks", Duration::from_millis(100), async { Ok(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn slow_call_becomes_a_timeout() {
        let result: Result<(), ChannelError> = bounded("send_email", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;
        assert_eq!(
            result,
            Err(ChannelError::Timeout {
                op: "send_email".to_string()
            })
        );
    }
}
