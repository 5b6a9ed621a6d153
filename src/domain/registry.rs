//! セッションレジストリ
//!
//! セッションID → アクティブなセッションの対応表（スレッドセーフ）。
//! 作成・削除・一括キャンセルは書き込みロックで直列化し、
//! 参照は読み込みロックで並行に行える。セッションは構築を終えてから
//! 挿入するので、読み手が構築途中のセッションを見ることはない。

use crate::domain::error::DomainError;
use crate::domain::session::{SessionId, UploadMode, UploadSession, UploadTarget};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// 保持する終端セッションの上限
///
/// 作成時にこの数に達していたら、終端セッションをまとめて取り除く。
pub const MAX_FINISHED_SESSIONS: usize = 128;

/// アクティブなアップロードセッションの対応表
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<UploadSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// セッションを作成して登録する
    ///
    /// # Arguments
    /// * `session_id` - 呼び出し側が指定するID（None なら UUID を生成）
    ///
    /// # Errors
    /// - 同じIDの終端でないセッションが存在する場合 `DuplicateSession`
    /// - チャンクサイズが不正な場合 `InvalidChunkSize`
    ///
    /// 同じIDでも終端状態のセッションは置き換える。
    /// 終端セッションが [`MAX_FINISHED_SESSIONS`] に達していたら取り除いてから登録する。
    pub fn create(
        &self,
        session_id: Option<SessionId>,
        mode: UploadMode,
        target: UploadTarget,
        chunk_size: u64,
        total_size: Option<u64>,
    ) -> Result<Arc<UploadSession>, DomainError> {
        let id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let session = Arc::new(UploadSession::new(
            id.clone(),
            mode,
            target,
            chunk_size,
            total_size,
        )?);

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = sessions.get(&id) {
            if !existing.is_terminal() {
                return Err(DomainError::DuplicateSession { session_id: id });
            }
        }

        let finished = sessions.values().filter(|s| s.is_terminal()).count();
        if finished >= MAX_FINISHED_SESSIONS {
            sessions.retain(|_, s| !s.is_terminal());
            debug!(swept = finished, "finished upload sessions swept");
        }
        sessions.insert(id.clone(), Arc::clone(&session));
        debug!(session = %id, ?mode, "upload session registered");

        Ok(session)
    }

    /// セッションを取得する
    pub fn get(&self, session_id: &str) -> Result<Arc<UploadSession>, DomainError> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| DomainError::session_not_found(session_id))
    }

    /// セッションを削除する
    pub fn remove(&self, session_id: &str) -> Option<Arc<UploadSession>> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let removed = sessions.remove(session_id);
        if removed.is_some() {
            debug!(session = %session_id, "upload session removed");
        }
        removed
    }

    /// 全セッションにキャンセルを要求し、終端状態のセッションを取り除く
    ///
    /// 送信中のパートは次のチェックポイント（またはトランスポートの中断）で
    /// キャンセルが反映される。
    ///
    /// # Returns
    /// キャンセルを要求したセッション数
    pub fn cancel_all(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|_, session| !session.is_terminal());

        let signalled = sessions
            .values()
            .filter(|session| session.signal_cancel())
            .count();
        debug!(signalled, "cancellation requested for all sessions");
        signalled
    }

    /// 登録中のセッション数
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
