//! 永続化スケジューラ
//!
//! 状態の変更通知（mark dirty）を受け取り、スナップショットの書き込みをまとめて行うアクター。
//!
//! - mark dirty のたびにデバウンスタイマーを張り直す（連続した変更は 1 回の書き込みにまとまる）
//! - それとは独立に、一定周期で強制フラッシュを試みる（dirty のときだけ書き込む）
//! - 書き込みに失敗した場合は dirty のまま残し、次の機会に再試行する
//!
//! タイマーはアクターが 1 つだけ所有するため、重複したタイマーが競合することはありません。

use std::{future, sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use crate::domain::{PersistenceError, PersistenceTrigger, RoomStateRepository, SnapshotStore};

/// Result of a flush attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// A snapshot was written.
    Written,
    /// Nothing changed since the last successful write.
    Clean,
}

/// Dirty flag plus the write path from the room state store to the snapshot store.
pub struct SnapshotFlusher {
    room_states: Arc<dyn RoomStateRepository>,
    store: Arc<dyn SnapshotStore>,
    dirty: bool,
}

impl SnapshotFlusher {
    pub fn new(room_states: Arc<dyn RoomStateRepository>, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            room_states,
            store,
            dirty: false,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the full snapshot if dirty. The flag survives a failed write.
    pub async fn flush(&mut self) -> Result<FlushOutcome, PersistenceError> {
        if !self.dirty {
            return Ok(FlushOutcome::Clean);
        }
        let snapshot = self.room_states.export().await;
        self.store.save(&snapshot).await?;
        self.dirty = false;
        tracing::debug!("Snapshot flushed ({} rooms)", snapshot.rooms.len());
        Ok(FlushOutcome::Written)
    }

    /// Populate the room state store from the saved snapshot.
    ///
    /// Returns the number of rooms restored. A missing or unreadable file starts empty.
    pub async fn load_from_disk(&self) -> usize {
        match self.store.load().await {
            Ok(Some(snapshot)) => {
                let rooms = snapshot.rooms.len();
                self.room_states.import(snapshot).await;
                tracing::info!("Loaded snapshot with {} rooms", rooms);
                rooms
            }
            Ok(None) => {
                tracing::info!("No snapshot found, starting with empty state");
                0
            }
            Err(e) => {
                tracing::warn!("Failed to load snapshot, starting with empty state: {}", e);
                0
            }
        }
    }
}

enum Command {
    MarkDirty,
    FlushNow(oneshot::Sender<Result<FlushOutcome, PersistenceError>>),
    IsDirty(oneshot::Sender<bool>),
    Shutdown(oneshot::Sender<Result<FlushOutcome, PersistenceError>>),
}

/// Cloneable handle to a running `PersistenceScheduler`.
#[derive(Debug, Clone)]
pub struct PersistenceHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::MarkDirty => "MarkDirty",
            Command::FlushNow(_) => "FlushNow",
            Command::IsDirty(_) => "IsDirty",
            Command::Shutdown(_) => "Shutdown",
        };
        f.write_str(name)
    }
}

impl PersistenceTrigger for PersistenceHandle {
    fn mark_dirty(&self) {
        if self.commands.send(Command::MarkDirty).is_err() {
            tracing::warn!("Persistence scheduler stopped, state change will not be saved");
        }
    }
}

impl PersistenceHandle {
    /// Flush immediately (if dirty) and wait for the result.
    pub async fn flush_now(&self) -> Result<FlushOutcome, PersistenceError> {
        let (reply, result) = oneshot::channel();
        self.send(Command::FlushNow(reply))?;
        result.await.map_err(|_| PersistenceError::SchedulerStopped)?
    }

    /// Final flush; the scheduler stops after replying.
    pub async fn shutdown_flush(&self) -> Result<FlushOutcome, PersistenceError> {
        let (reply, result) = oneshot::channel();
        self.send(Command::Shutdown(reply))?;
        result.await.map_err(|_| PersistenceError::SchedulerStopped)?
    }

    pub async fn is_dirty(&self) -> Result<bool, PersistenceError> {
        let (reply, result) = oneshot::channel();
        self.send(Command::IsDirty(reply))?;
        result.await.map_err(|_| PersistenceError::SchedulerStopped)
    }

    fn send(&self, command: Command) -> Result<(), PersistenceError> {
        self.commands
            .send(command)
            .map_err(|_| PersistenceError::SchedulerStopped)
    }
}

/// The persistence actor. Owns the flusher, the debounce deadline and the forced-flush ticker.
pub struct PersistenceScheduler {
    flusher: SnapshotFlusher,
    commands: mpsc::UnboundedReceiver<Command>,
    debounce: Duration,
    flush_interval: Duration,
}

impl PersistenceScheduler {
    pub fn new(
        flusher: SnapshotFlusher,
        debounce: Duration,
        flush_interval: Duration,
    ) -> (Self, PersistenceHandle) {
        let (sender, commands) = mpsc::unbounded_channel();
        (
            Self {
                flusher,
                commands,
                debounce,
                flush_interval,
            },
            PersistenceHandle { commands: sender },
        )
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let Self {
            mut flusher,
            mut commands,
            debounce,
            flush_interval,
        } = self;

        let mut forced = tokio::time::interval_at(Instant::now() + flush_interval, flush_interval);
        forced.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut deadline: Option<Instant> = None;

        loop {
            let armed = deadline;
            let debounce_elapsed = async move {
                match armed {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => future::pending().await,
                }
            };

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::MarkDirty) => {
                        flusher.mark_dirty();
                        deadline = Some(Instant::now() + debounce);
                    }
                    Some(Command::FlushNow(reply)) => {
                        let result = flusher.flush().await;
                        if !flusher.is_dirty() {
                            deadline = None;
                        }
                        let _ = reply.send(result);
                    }
                    Some(Command::IsDirty(reply)) => {
                        let _ = reply.send(flusher.is_dirty());
                    }
                    Some(Command::Shutdown(reply)) => {
                        let result = flusher.flush().await;
                        match &result {
                            Ok(outcome) => tracing::info!("Shutdown flush completed: {:?}", outcome),
                            Err(e) => tracing::error!("Shutdown flush failed: {}", e),
                        }
                        let _ = reply.send(result);
                        break;
                    }
                    None => {
                        flush_logged(&mut flusher, "final").await;
                        break;
                    }
                },
                _ = debounce_elapsed => {
                    deadline = None;
                    flush_logged(&mut flusher, "debounced").await;
                }
                _ = forced.tick() => {
                    flush_logged(&mut flusher, "periodic").await;
                }
            }
        }
        tracing::debug!("Persistence scheduler stopped");
    }
}

async fn flush_logged(flusher: &mut SnapshotFlusher, trigger: &str) {
    if let Err(e) = flusher.flush().await {
        tracing::error!("{} snapshot flush failed, will retry: {}", trigger, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Envelope, RoomId, Slot, Snapshot},
        infrastructure::repository::InMemoryRoomStateRepository,
    };
    use async_trait::async_trait;
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    };

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - dirty フラグに応じた書き込み／スキップ
    // - 書き込み失敗時に dirty が残ること
    // - デバウンスによる書き込みの集約と、周期的な強制フラッシュ
    // - シャットダウン時の最終フラッシュ
    // - 起動時のロード
    //
    // 【どのような状況を想定しているか】
    // - 時間は tokio の一時停止クロックで進める（start_paused）
    // ========================================

    /// Records every saved snapshot; can be told to fail.
    #[derive(Default)]
    struct RecordingStore {
        saved: Mutex<Vec<Snapshot>>,
        fail: AtomicBool,
        stored: Option<Snapshot>,
        corrupt: bool,
    }

    impl RecordingStore {
        fn save_count(&self) -> usize {
            self.saved.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SnapshotStore for RecordingStore {
        async fn load(&self) -> Result<Option<Snapshot>, PersistenceError> {
            if self.corrupt {
                return Err(serde_json::from_str::<serde_json::Value>("{")
                    .unwrap_err()
                    .into());
            }
            Ok(self.stored.clone())
        }

        async fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(std::io::Error::other("disk full").into());
            }
            self.saved.lock().unwrap().push(snapshot.clone());
            Ok(())
        }
    }

    fn room(name: &str) -> RoomId {
        RoomId::new(name.to_string()).unwrap()
    }

    fn scene(title: &str) -> Envelope {
        serde_json::from_value(serde_json::json!({
            "t": "DISPLAY_SCENE_STATE",
            "title": title,
        }))
        .unwrap()
    }

    fn flusher_with(store: Arc<RecordingStore>) -> (SnapshotFlusher, Arc<InMemoryRoomStateRepository>) {
        let room_states = Arc::new(InMemoryRoomStateRepository::new());
        (SnapshotFlusher::new(room_states.clone(), store), room_states)
    }

    #[tokio::test]
    async fn test_flush_writes_once_then_clean() {
        // テスト項目: dirty のときだけ書き込み、連続したフラッシュの 2 回目は何もしない
        // given (前提条件):
        let store = Arc::new(RecordingStore::default());
        let (mut flusher, room_states) = flusher_with(store.clone());
        room_states.set(room("demo"), Slot::Scene, scene("Cave")).await;
        flusher.mark_dirty();

        // when (操作):
        let first = flusher.flush().await.unwrap();
        let second = flusher.flush().await.unwrap();

        // then (期待する結果):
        assert_eq!(first, FlushOutcome::Written);
        assert_eq!(second, FlushOutcome::Clean);
        assert_eq!(store.save_count(), 1);
        assert!(!flusher.is_dirty());
    }

    #[tokio::test]
    async fn test_failed_write_keeps_dirty() {
        // テスト項目: 書き込みに失敗した場合は dirty のまま残り、次のフラッシュで再試行される
        // given (前提条件):
        let store = Arc::new(RecordingStore::default());
        store.fail.store(true, Ordering::SeqCst);
        let (mut flusher, _room_states) = flusher_with(store.clone());
        flusher.mark_dirty();

        // when (操作):
        let failed = flusher.flush().await;
        store.fail.store(false, Ordering::SeqCst);
        let retried = flusher.flush().await.unwrap();

        // then (期待する結果):
        assert!(matches!(failed, Err(PersistenceError::Io(_))));
        assert_eq!(retried, FlushOutcome::Written);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_load_from_disk_imports_snapshot() {
        // テスト項目: 保存済みスナップショットがルーム状態に取り込まれる
        // given (前提条件):
        let mut snapshot = Snapshot::default();
        snapshot
            .rooms
            .entry(room("demo"))
            .or_default()
            .set(Slot::Scene, scene("Cave"));
        let store = Arc::new(RecordingStore {
            stored: Some(snapshot),
            ..Default::default()
        });
        let (flusher, room_states) = flusher_with(store);

        // when (操作):
        let rooms = flusher.load_from_disk().await;

        // then (期待する結果):
        assert_eq!(rooms, 1);
        assert_eq!(
            room_states.get(&room("demo"), Slot::Scene).await,
            Some(scene("Cave"))
        );
        assert!(!flusher.is_dirty());
    }

    #[tokio::test]
    async fn test_load_from_unreadable_store_starts_empty() {
        // テスト項目: 読み込みに失敗しても空の状態で起動できる
        // given (前提条件):
        let store = Arc::new(RecordingStore {
            corrupt: true,
            ..Default::default()
        });
        let (flusher, room_states) = flusher_with(store);

        // when (操作):
        let rooms = flusher.load_from_disk().await;

        // then (期待する結果):
        assert_eq!(rooms, 0);
        assert!(room_states.export().await.rooms.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_changes_is_coalesced() {
        // テスト項目: デバウンス期間内の連続した変更は 1 回の書き込みにまとまる
        // given (前提条件):
        let store = Arc::new(RecordingStore::default());
        let (flusher, _room_states) = flusher_with(store.clone());
        let (scheduler, handle) = PersistenceScheduler::new(
            flusher,
            Duration::from_secs(2),
            Duration::from_secs(60),
        );
        scheduler.spawn();

        // when (操作):
        for _ in 0..5 {
            handle.mark_dirty();
        }
        tokio::time::sleep(Duration::from_millis(2100)).await;

        // then (期待する結果):
        assert_eq!(store.save_count(), 1);
        assert!(!handle.is_dirty().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_dirty_rearms_debounce() {
        // テスト項目: mark dirty のたびにデバウンスタイマーが張り直される
        // given (前提条件):
        let store = Arc::new(RecordingStore::default());
        let (flusher, _room_states) = flusher_with(store.clone());
        let (scheduler, handle) = PersistenceScheduler::new(
            flusher,
            Duration::from_secs(2),
            Duration::from_secs(60),
        );
        scheduler.spawn();

        // when (操作):
        handle.mark_dirty();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        handle.mark_dirty();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let before_deadline = store.save_count();
        tokio::time::sleep(Duration::from_millis(600)).await;

        // then (期待する結果):
        assert_eq!(before_deadline, 0);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_flush_fires_without_debounce() {
        // テスト項目: デバウンスが発火しなくても周期的な強制フラッシュで書き込まれる
        // given (前提条件):
        let store = Arc::new(RecordingStore::default());
        let (flusher, _room_states) = flusher_with(store.clone());
        let (scheduler, handle) = PersistenceScheduler::new(
            flusher,
            Duration::from_secs(600),
            Duration::from_secs(5),
        );
        scheduler.spawn();

        // when (操作):
        handle.mark_dirty();
        tokio::time::sleep(Duration::from_millis(5100)).await;

        // then (期待する結果):
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_debounced_write_is_retried_by_periodic_flush() {
        // テスト項目: デバウンス時の書き込みが失敗しても周期フラッシュで再試行される
        // given (前提条件):
        let store = Arc::new(RecordingStore::default());
        store.fail.store(true, Ordering::SeqCst);
        let (flusher, _room_states) = flusher_with(store.clone());
        let (scheduler, handle) = PersistenceScheduler::new(
            flusher,
            Duration::from_secs(2),
            Duration::from_secs(5),
        );
        scheduler.spawn();
        handle.mark_dirty();
        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(handle.is_dirty().await.unwrap());

        // when (操作):
        store.fail.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3)).await;

        // then (期待する結果):
        assert_eq!(store.save_count(), 1);
        assert!(!handle.is_dirty().await.unwrap());
    }

    #[tokio::test]
    async fn test_shutdown_flush_writes_and_stops_scheduler() {
        // テスト項目: シャットダウン時は待たずに書き込み、その後スケジューラは停止する
        // given (前提条件):
        let store = Arc::new(RecordingStore::default());
        let (flusher, _room_states) = flusher_with(store.clone());
        let (scheduler, handle) = PersistenceScheduler::new(
            flusher,
            Duration::from_secs(2),
            Duration::from_secs(5),
        );
        let task = scheduler.spawn();
        handle.mark_dirty();

        // when (操作):
        let outcome = handle.shutdown_flush().await.unwrap();
        task.await.unwrap();

        // then (期待する結果):
        assert_eq!(outcome, FlushOutcome::Written);
        assert_eq!(store.save_count(), 1);
        assert!(matches!(
            handle.flush_now().await,
            Err(PersistenceError::SchedulerStopped)
        ));
    }

    #[tokio::test]
    async fn test_flush_now_reports_clean_state() {
        // テスト項目: 変更が無ければ flush_now は書き込まずに Clean を返す
        // given (前提条件):
        let store = Arc::new(RecordingStore::default());
        let (flusher, _room_states) = flusher_with(store.clone());
        let (scheduler, handle) = PersistenceScheduler::new(
            flusher,
            Duration::from_secs(2),
            Duration::from_secs(5),
        );
        scheduler.spawn();

        // when (操作):
        let outcome = handle.flush_now().await.unwrap();

        // then (期待する結果):
        assert_eq!(outcome, FlushOutcome::Clean);
        assert_eq!(store.save_count(), 0);
    }
}
