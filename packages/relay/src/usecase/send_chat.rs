//! UseCase: `chat:*` の送信
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendChatUseCase::execute() メソッド
//! - `chat:msg` の正規化（ts の補完、nick / room の上書き）とルームへの配信
//!
//! ### なぜこのテストが必要か
//! - クライアントが名乗ったニックネームを信用しないことを保証する
//! - ロールに関係なく配信されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：player による chat:msg
//! - エッジケース：ts が偽値、chat:msg 以外の chat:* 種別（そのまま配信）

use std::sync::Arc;

use archei_shared::time::Clock;

use crate::domain::{
    ConnectionId, ConnectionRepository, Envelope, MessagePusher, Timestamp,
    message::TAG_CHAT_MSG,
};

use super::error::SendChatError;

/// `chat:*` 送信のユースケース
pub struct SendChatUseCase {
    connections: Arc<dyn ConnectionRepository>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl SendChatUseCase {
    pub fn new(
        connections: Arc<dyn ConnectionRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            connections,
            message_pusher,
            clock,
        }
    }

    /// `chat:*` の送信を実行
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - 配信した接続数
    /// * `Err(SendChatError)` - 送信者が登録されていない
    pub async fn execute(
        &self,
        id: &ConnectionId,
        mut envelope: Envelope,
    ) -> Result<usize, SendChatError> {
        let sender = self
            .connections
            .get(id)
            .await
            .ok_or_else(|| SendChatError::ConnectionNotFound(id.to_string()))?;

        let room = envelope.target_room(&sender.room);
        if envelope.tag() == Some(TAG_CHAT_MSG) {
            let now = Timestamp::new(self.clock.now_millis());
            envelope.canonicalize_chat(&sender.nickname, &room, now);
        }

        let delivered = self
            .message_pusher
            .broadcast_to_room(&room, &envelope.to_json())
            .await;
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{JoinRequest, Nickname},
        infrastructure::repository::InMemoryConnectionRepository,
        usecase::testing::{drain, register},
    };
    use archei_shared::time::FixedClock;
    use serde_json::{Value, json};

    const NOW: i64 = 1_700_000_000_000;

    fn usecase(repo: &Arc<InMemoryConnectionRepository>) -> SendChatUseCase {
        SendChatUseCase::new(repo.clone(), repo.clone(), Arc::new(FixedClock::new(NOW)))
    }

    fn envelope(value: Value) -> Envelope {
        serde_json::from_value(value).unwrap()
    }

    async fn named(repo: &Arc<InMemoryConnectionRepository>, id: &ConnectionId, nick: &str) {
        repo.apply_join(
            id,
            &JoinRequest {
                nickname: Some(Nickname::new(nick.to_string()).unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_chat_msg_is_canonicalized() {
        // テスト項目: nick / room はサーバーが知る値で上書きされ、ts が無ければ補完される
        // given (前提条件):
        let repo = Arc::new(InMemoryConnectionRepository::new());
        let (bob, mut bob_frames) = register(&repo, "demo", 0).await;
        let (_amy, mut amy_frames) = register(&repo, "demo", 0).await;
        named(&repo, &bob, "Bob").await;
        let usecase = usecase(&repo);

        // when (操作):
        let delivered = usecase
            .execute(
                &bob,
                envelope(json!({"t": "chat:msg", "nick": "Mallory", "text": "hi", "channel": "ooc"})),
            )
            .await
            .unwrap();

        // then (期待する結果):
        let expected = json!({
            "t": "chat:msg",
            "nick": "Bob",
            "room": "demo",
            "text": "hi",
            "channel": "ooc",
            "ts": NOW,
        });
        assert_eq!(delivered, 2);
        assert_eq!(drain(&mut bob_frames), vec![expected.clone()]);
        assert_eq!(drain(&mut amy_frames), vec![expected]);
    }

    #[tokio::test]
    async fn test_chat_msg_keeps_client_timestamp() {
        // テスト項目: クライアントが送った ts はそのまま、偽値の ts は補完される
        // given (前提条件):
        let repo = Arc::new(InMemoryConnectionRepository::new());
        let (id, mut frames) = register(&repo, "demo", 0).await;
        let usecase = usecase(&repo);

        // when (操作):
        usecase
            .execute(&id, envelope(json!({"t": "chat:msg", "text": "a", "ts": 42})))
            .await
            .unwrap();
        usecase
            .execute(&id, envelope(json!({"t": "chat:msg", "text": "b", "ts": 0})))
            .await
            .unwrap();

        // then (期待する結果):
        let received = drain(&mut frames);
        assert_eq!(received[0]["ts"], json!(42));
        assert_eq!(received[1]["ts"], json!(NOW));
        assert_eq!(received[0]["nick"], json!("anon"));
    }

    #[tokio::test]
    async fn test_chat_msg_to_other_room() {
        // テスト項目: room フィールドで指定されたルームに配信され、room はそのルーム名になる
        // given (前提条件):
        let repo = Arc::new(InMemoryConnectionRepository::new());
        let (sender, mut sender_frames) = register(&repo, "demo", 0).await;
        let (_in_cave, mut cave_frames) = register(&repo, "cave", 0).await;
        let usecase = usecase(&repo);

        // when (操作):
        usecase
            .execute(
                &sender,
                envelope(json!({"t": "chat:msg", "room": "cave", "text": "knock knock"})),
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert!(drain(&mut sender_frames).is_empty());
        assert_eq!(drain(&mut cave_frames)[0]["room"], json!("cave"));
    }

    #[tokio::test]
    async fn test_other_chat_kinds_are_relayed_verbatim() {
        // テスト項目: chat:msg 以外の chat:* は書き換えずに配信される
        // given (前提条件):
        let repo = Arc::new(InMemoryConnectionRepository::new());
        let (id, mut frames) = register(&repo, "demo", 0).await;
        let usecase = usecase(&repo);
        let typing = json!({"t": "chat:typing", "nick": "Whoever"});

        // when (操作):
        usecase.execute(&id, envelope(typing.clone())).await.unwrap();

        // then (期待する結果):
        assert_eq!(drain(&mut frames), vec![typing]);
    }
}
