//! UseCase: ハートビートによる死活監視
//!
//! 一定間隔ごとに全接続を走査し、
//!
//! - 最後の生存確認から `2 × interval` を超えた接続は強制的に閉じてレジストリから削除し、そのルームにプレゼンスを通知
//!   （削除した接続ごとに 1 回。既に切断処理で削除されていれば通知しない）
//! - それ以外の接続には ping を送る
//!
//! ping / close の失敗は走査を止めません。pong を受け取ると最終生存確認時刻が更新されます。

use std::{sync::Arc, time::Duration};

use archei_shared::time::Clock;
use tokio::time::{Instant, MissedTickBehavior};

use crate::domain::{ConnectionId, ConnectionRepository, MessagePusher, Timestamp};

use super::presence::PresenceTracker;

/// Result of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub pinged: usize,
    pub pruned: Vec<ConnectionId>,
}

/// ハートビートモニター
pub struct HeartbeatMonitor {
    connections: Arc<dyn ConnectionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    presence: Arc<PresenceTracker>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl HeartbeatMonitor {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        presence: Arc<PresenceTracker>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            connections,
            message_pusher,
            presence,
            clock,
            interval,
        }
    }

    /// Silence longer than this marks a connection dead.
    pub fn timeout_millis(&self) -> i64 {
        i64::try_from(self.interval.as_millis().saturating_mul(2)).unwrap_or(i64::MAX)
    }

    /// One pass over every registered connection.
    pub async fn sweep(&self) -> SweepReport {
        let now = Timestamp::new(self.clock.now_millis());
        let timeout = self.timeout_millis();
        let mut report = SweepReport::default();

        for connection in self.connections.list().await {
            if connection.is_expired(now, timeout) {
                if let Err(e) = self.message_pusher.terminate(&connection.id).await {
                    tracing::debug!("Failed to close '{}': {}", connection.id, e);
                }
                if self.connections.unregister(&connection.id).await.is_some() {
                    tracing::info!(
                        "Connection '{}' timed out ({} ms silent)",
                        connection.id,
                        now.millis_since(connection.last_liveness_at)
                    );
                    self.presence.announce(&connection.room).await;
                    report.pruned.push(connection.id);
                }
            } else {
                match self.message_pusher.ping(&connection.id).await {
                    Ok(()) => report.pinged += 1,
                    Err(e) => tracing::debug!("Failed to ping '{}': {}", connection.id, e),
                }
            }
        }

        report
    }

    /// A pong arrived from `id`.
    pub async fn record_pong(&self, id: &ConnectionId) {
        let now = Timestamp::new(self.clock.now_millis());
        if let Err(e) = self.connections.touch(id, now).await {
            tracing::debug!("Ignoring pong: {}", e);
        }
    }

    /// Sweep every `interval` until the task is aborted.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let report = self.sweep().await;
            tracing::debug!(
                "Heartbeat sweep: {} pinged, {} pruned",
                report.pinged,
                report.pruned.len()
            );
        }
    }
}
