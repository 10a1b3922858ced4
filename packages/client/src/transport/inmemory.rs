//! インメモリ Transport 実装
//!
//! ネットワークを使わずにチャネル接続を駆動するための Transport。
//! テストは [`InMemoryRemote`] を通じてサーバー側を演じます：
//!
//! - 次回 `open` の結果を予約する（接続失敗・ハンドシェイク拒否・応答なし）
//! - 受信フレームを注入する
//! - 接続を切断する
//! - クライアントが送信したフレームを確認する

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::protocol::{InboundFrame, OutboundFrame};

use super::{Transport, TransportError, TransportEvent, TransportEvents};

/// 予約された `open` の振る舞い
#[derive(Debug)]
enum OpenScript {
    Fail(TransportError),
    /// いつまでも完了しない
    Stall,
}

#[derive(Debug, Default)]
struct Shared {
    /// 予約された `open` の振る舞い（空なら成功）
    open_scripts: VecDeque<OpenScript>,
    /// 現在の接続の送信側
    events: Option<mpsc::UnboundedSender<TransportEvent>>,
    /// クライアントが送信したフレーム
    sent: Vec<String>,
    open_count: usize,
    close_count: usize,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// クライアント側の Transport
#[derive(Debug)]
pub struct InMemoryTransport {
    shared: Arc<Mutex<Shared>>,
}

/// サーバー側のハンドル
#[derive(Debug, Clone)]
pub struct InMemoryRemote {
    shared: Arc<Mutex<Shared>>,
}

impl InMemoryTransport {
    /// 新しい InMemoryTransport とそのリモートハンドルを作成
    pub fn pair() -> (Self, InMemoryRemote) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        (
            Self {
                shared: shared.clone(),
            },
            InMemoryRemote { shared },
        )
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn open(&mut self) -> Result<TransportEvents, TransportError> {
        let script = {
            let mut shared = lock(&self.shared);
            shared.open_count += 1;
            shared.events = None;
            shared.open_scripts.pop_front()
        };
        match script {
            Some(OpenScript::Fail(error)) => return Err(error),
            Some(OpenScript::Stall) => return std::future::pending().await,
            None => {}
        }

        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.shared).events = Some(tx);
        Ok(rx)
    }

    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        let mut shared = lock(&self.shared);
        if shared.events.is_none() {
            return Err(TransportError::NotOpen);
        }
        shared.sent.push(frame);
        Ok(())
    }

    async fn close(&mut self) {
        let mut shared = lock(&self.shared);
        shared.close_count += 1;
        shared.events = None;
    }
}

impl InMemoryRemote {
    /// 次回の `open` を指定したエラーで失敗させる
    pub fn fail_next_open(&self, error: TransportError) {
        lock(&self.shared)
            .open_scripts
            .push_back(OpenScript::Fail(error));
    }

    /// 次回の `open` を完了させない（応答しないサーバー）
    pub fn stall_next_open(&self) {
        lock(&self.shared).open_scripts.push_back(OpenScript::Stall);
    }

    /// `open` が戻った後のハンドシェイク失敗を通知する
    pub fn fail_handshake(&self, error: TransportError) -> bool {
        let mut shared = lock(&self.shared);
        match shared.events.take() {
            Some(tx) => tx.send(TransportEvent::Failed(error)).is_ok(),
            None => false,
        }
    }

    /// 受信フレーム（生テキスト）を注入する。接続がなければ `false`
    pub fn push_text(&self, text: impl Into<String>) -> bool {
        let shared = lock(&self.shared);
        shared
            .events
            .as_ref()
            .is_some_and(|tx| tx.send(TransportEvent::Frame(text.into())).is_ok())
    }

    /// 受信フレームを注入する
    pub fn push(&self, frame: &InboundFrame) -> bool {
        match serde_json::to_string(frame) {
            Ok(text) => self.push_text(text),
            Err(_) => false,
        }
    }

    /// サーバー側から接続を切断する
    pub fn drop_connection(&self) -> bool {
        let mut shared = lock(&self.shared);
        match shared.events.take() {
            Some(tx) => tx.send(TransportEvent::Closed).is_ok(),
            None => false,
        }
    }

    /// 接続エラーを発生させる
    pub fn fail_connection(&self, reason: &str) -> bool {
        let mut shared = lock(&self.shared);
        match shared.events.take() {
            Some(tx) => tx.send(TransportEvent::Error(reason.to_string())).is_ok(),
            None => false,
        }
    }

    /// クライアントが送信したフレーム（生テキスト）
    pub fn sent(&self) -> Vec<String> {
        lock(&self.shared).sent.clone()
    }

    /// クライアントが送信したフレーム（デコード済み）
    pub fn sent_frames(&self) -> Vec<OutboundFrame> {
        self.sent()
            .iter()
            .filter_map(|text| serde_json::from_str(text).ok())
            .collect()
    }

    pub fn is_open(&self) -> bool {
        lock(&self.shared).events.is_some()
    }

    pub fn open_count(&self) -> usize {
        lock(&self.shared).open_count
    }

    pub fn close_count(&self) -> usize {
        lock(&self.shared).close_count
    }
}
