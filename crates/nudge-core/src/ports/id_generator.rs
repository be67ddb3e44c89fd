//! IdGenerator port - ID 生成の抽象化
//!
//! ホスト側ストアが ID を払い出すのが本来の形ですが、
//! 開発用のインメモリストアは自分で ID を作る必要があります。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース

use crate::domain::ids::{MessageId, ReminderId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は新規レコードの ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数ワーカーから使える）
pub trait IdGenerator: Send + Sync {
    /// 繰り返しで作られる後続リマインダーの ID
    fn generate_reminder_id(&self) -> ReminderId;

    /// キュー投入されるメッセージレコードの ID
    fn generate_message_id(&self) -> MessageId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// テストで FixedClock を渡すと timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_reminder_id(&self) -> ReminderId {
        ReminderId::new(self.next_ulid().to_string())
    }

    fn generate_message_id(&self) -> MessageId {
        MessageId::new(self.next_ulid().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let id1 = id_gen.generate_reminder_id();
        let id2 = id_gen.generate_reminder_id();

        assert_ne!(id1, id2);
    }

    #[test]
    fn ulid_generator_with_fixed_clock_is_deterministic() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_reminder_id();
        let id2 = id_gen.generate_message_id();

        let ulid1 = Ulid::from_string(id1.as_str()).unwrap();
        let ulid2 = Ulid::from_string(id2.as_str()).unwrap();

        // ランダム部分があるので ID は異なる
        assert_ne!(ulid1, ulid2);

        // ただし、timestamp 部分は同じはず
        assert_eq!(ulid1.timestamp_ms(), fixed_time.timestamp_millis() as u64);
        assert_eq!(ulid2.timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }
}
