//! ドメイン層: アップロードセッションの状態機械
//!
//! 1本の動画アップロード（通常・トークン・プログレッシブ）の状態を保持する。
//!
//! ```text
//! Created → TransferringPart → PartComplete → (TransferringPart | AllPartsComplete)
//!         → Finalizing → Succeeded
//! ```
//!
//! `Cancelled` と `Failed` は終端以外のどの状態からも遷移できる。
//! 1セッションで同時に送信できるパートは1つだけ。完了済みパートの集合は増える一方で、
//! 終端状態に達したセッションは再開できない。
//!
//! レジストリと、パートを送信中のタスクの両方から参照されるため、
//! 内部状態は `RwLock` で保護する。

use crate::domain::chunk::{self, Part};
use crate::domain::error::DomainError;
use crate::domain::video::VideoDescriptor;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;

/// セッション識別子
pub type SessionId = String;

/// アップロード方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// APIキーで認証し、ファイル全体を1回の操作で送る
    Simple,
    /// アップロードトークンで認証し、ファイル全体を1回の操作で送る
    TokenAuthorized,
    /// 呼び出し側が1パートずつ別々の操作で送る
    Progressive,
}

/// アップロード先
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTarget {
    VideoId(String),
    Token(String),
}

impl UploadTarget {
    /// 動画IDまたはトークンの文字列
    pub fn key(&self) -> &str {
        match self {
            Self::VideoId(id) => id,
            Self::Token(token) => token,
        }
    }
}

/// セッションの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    TransferringPart,
    PartComplete,
    AllPartsComplete,
    Finalizing,
    Succeeded,
    Cancelled,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 終端状態の結果
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalResult {
    Succeeded(VideoDescriptor),
    Cancelled,
    Failed { message: String },
}

/// `begin_part` の結果
#[derive(Debug, Clone, PartialEq)]
pub enum PartStart {
    /// 送信してよい
    Send,
    /// 同一内容のパートが既に完了している（送信不要）
    AlreadyComplete(Option<VideoDescriptor>),
}

#[derive(Debug, Clone)]
struct CompletedPart {
    part: Part,
    digest: String,
    receipt: Option<VideoDescriptor>,
}

#[derive(Debug)]
struct SessionInner {
    state: SessionState,
    total_size: Option<u64>,
    plan: Vec<Part>,
    completed: BTreeMap<usize, CompletedPart>,
    in_flight: Option<(Part, String)>,
    remote_video_id: Option<String>,
    result: Option<TerminalResult>,
}

/// 1本のアップロードのセッション（スレッドセーフ）
#[derive(Debug)]
pub struct UploadSession {
    id: SessionId,
    mode: UploadMode,
    target: UploadTarget,
    chunk_size: u64,
    cancel: CancellationToken,
    inner: RwLock<SessionInner>,
}

impl UploadSession {
    /// 新しいセッションを `Created` 状態で作成する
    ///
    /// 総サイズが分かっていればこの時点でチャンク計画を立てる。
    /// プログレッシブ方式では総サイズは最終パートで確定する。
    pub fn new(
        id: SessionId,
        mode: UploadMode,
        target: UploadTarget,
        chunk_size: u64,
        total_size: Option<u64>,
    ) -> Result<Self, DomainError> {
        if chunk_size == 0 {
            return Err(DomainError::InvalidChunkSize { size: chunk_size });
        }

        let plan = match total_size {
            Some(total) => chunk::plan(total, chunk_size)?,
            None => Vec::new(),
        };

        let remote_video_id = match &target {
            UploadTarget::VideoId(id) => Some(id.clone()),
            UploadTarget::Token(_) => None,
        };

        Ok(Self {
            id,
            mode,
            target,
            chunk_size,
            cancel: CancellationToken::new(),
            inner: RwLock::new(SessionInner {
                state: SessionState::Created,
                total_size,
                plan,
                completed: BTreeMap::new(),
                in_flight: None,
                remote_video_id,
                result: None,
            }),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn invalid(&self, state: SessionState, message: impl Into<String>) -> DomainError {
        DomainError::invalid_state(&self.id, state, message)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> UploadMode {
        self.mode
    }

    pub fn target(&self) -> &UploadTarget {
        &self.target
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn state(&self) -> SessionState {
        self.read().state
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// 終端状態の結果（終端でなければ None）
    pub fn result(&self) -> Option<TerminalResult> {
        self.read().result.clone()
    }

    pub fn total_size(&self) -> Option<u64> {
        self.read().total_size
    }

    /// チャンク計画（総サイズ未確定なら空）
    pub fn plan(&self) -> Vec<Part> {
        self.read().plan.clone()
    }

    /// 完了済みパートの番号（昇順）
    pub fn completed_parts(&self) -> Vec<usize> {
        self.read().completed.keys().copied().collect()
    }

    /// 送信中パートの番号
    pub fn in_flight_part(&self) -> Option<usize> {
        self.read().in_flight.as_ref().map(|(part, _)| part.index)
    }

    /// リモートAPIが割り当てた動画ID（トークン方式では最初のパート完了後に確定）
    pub fn remote_video_id(&self) -> Option<String> {
        self.read().remote_video_id.clone()
    }

    pub fn set_remote_video_id(&self, video_id: impl Into<String>) {
        self.write().remote_video_id = Some(video_id.into());
    }

    /// 送信中の処理を中断するためのトークン
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// 総サイズを後から設定してチャンク計画を立てる
    pub fn set_total_size(&self, total_size: u64) -> Result<(), DomainError> {
        let mut s = self.write();
        if s.state != SessionState::Created {
            return Err(self.invalid(s.state, "total size can only be set before the first part"));
        }
        if let Some(existing) = s.total_size {
            if existing != total_size {
                return Err(self.invalid(
                    s.state,
                    format!("total size already set to {} bytes", existing),
                ));
            }
            return Ok(());
        }
        s.plan = chunk::plan(total_size, self.chunk_size)?;
        s.total_size = Some(total_size);
        Ok(())
    }

    /// キャンセルを要求する
    ///
    /// 送信中のパートがなければ即座に `Cancelled` へ遷移する。
    /// 送信中なら、送信タスクが次のチェックポイントで遷移させる。
    ///
    /// # Returns
    /// 要求時点で終端でなかった場合 true
    pub fn signal_cancel(&self) -> bool {
        self.cancel.cancel();
        let mut s = self.write();
        if s.state.is_terminal() {
            return false;
        }
        if s.in_flight.is_none() {
            s.state = SessionState::Cancelled;
            s.result = Some(TerminalResult::Cancelled);
        }
        true
    }

    /// チェックポイント: キャンセル要求を確認する
    ///
    /// # Returns
    /// キャンセル済み（`Cancelled` に遷移した、または既にしていた）なら true
    pub fn checkpoint(&self) -> bool {
        if self.cancel.is_cancelled() {
            self.mark_cancelled();
            return true;
        }
        self.state() == SessionState::Cancelled
    }

    /// パートの送信を開始する
    ///
    /// # Errors
    /// - 終端状態、または全パート完了後
    /// - 別のパートが送信中
    /// - 順序が飛んでいる
    /// - 完了済みの番号に異なる内容が渡された (`PartMismatch`)
    pub fn begin_part(&self, part: Part, digest: String) -> Result<PartStart, DomainError> {
        let mut s = self.write();

        if s.state.is_terminal() {
            return Err(self.invalid(s.state, "session is already finished"));
        }
        if let Some((current, _)) = &s.in_flight {
            return Err(self.invalid(
                s.state,
                format!("part {} is already in flight", current.index),
            ));
        }

        if let Some(done) = s.completed.get(&part.index) {
            if done.part.range() == part.range() && done.digest == digest {
                return Ok(PartStart::AlreadyComplete(done.receipt.clone()));
            }
            return Err(DomainError::PartMismatch {
                session_id: self.id.clone(),
                index: part.index,
            });
        }

        if matches!(
            s.state,
            SessionState::AllPartsComplete | SessionState::Finalizing
        ) {
            return Err(self.invalid(s.state, "the last part has already been uploaded"));
        }

        let expected = s.completed.len();
        if part.index != expected {
            return Err(self.invalid(
                s.state,
                format!("expected part {}, got part {}", expected, part.index),
            ));
        }

        s.in_flight = Some((part, digest));
        s.state = SessionState::TransferringPart;
        Ok(PartStart::Send)
    }

    /// 送信中パートの完了を記録する
    ///
    /// # Returns
    /// 遷移後の状態（最終パートなら `AllPartsComplete`）
    pub fn complete_part(
        &self,
        index: usize,
        receipt: Option<VideoDescriptor>,
    ) -> Result<SessionState, DomainError> {
        let mut s = self.write();

        let (part, digest) = match s.in_flight.take() {
            Some((part, digest)) if part.index == index => (part, digest),
            other => {
                s.in_flight = other;
                return Err(self.invalid(s.state, format!("part {} is not in flight", index)));
            }
        };

        if s.remote_video_id.is_none() {
            if let Some(video_id) = receipt.as_ref().and_then(VideoDescriptor::video_id) {
                s.remote_video_id = Some(video_id.to_string());
            }
        }

        s.completed.insert(
            index,
            CompletedPart {
                part,
                digest,
                receipt,
            },
        );

        if part.is_last {
            s.total_size = Some(part.end);
            s.state = SessionState::AllPartsComplete;
        } else {
            s.state = SessionState::PartComplete;
        }
        Ok(s.state)
    }

    /// 全パート完了後、動画の確定処理に入る
    pub fn begin_finalize(&self) -> Result<(), DomainError> {
        let mut s = self.write();
        if s.state != SessionState::AllPartsComplete {
            return Err(self.invalid(s.state, "cannot finalize before the last part completes"));
        }
        s.state = SessionState::Finalizing;
        Ok(())
    }

    /// 確定処理の成功を記録する
    pub fn succeed(&self, descriptor: VideoDescriptor) -> Result<(), DomainError> {
        let mut s = self.write();
        if s.state != SessionState::Finalizing {
            return Err(self.invalid(s.state, "session is not finalizing"));
        }
        s.state = SessionState::Succeeded;
        s.result = Some(TerminalResult::Succeeded(descriptor));
        Ok(())
    }

    /// 回復不能なエラーで終了する（終端状態なら何もしない）
    pub fn fail(&self, message: impl Into<String>) {
        let mut s = self.write();
        if s.state.is_terminal() {
            return;
        }
        s.in_flight = None;
        s.state = SessionState::Failed;
        s.result = Some(TerminalResult::Failed {
            message: message.into(),
        });
    }

    /// キャンセルで終了する（終端状態なら何もしない）
    pub fn mark_cancelled(&self) {
        let mut s = self.write();
        if s.state.is_terminal() {
            return;
        }
        s.in_flight = None;
        s.state = SessionState::Cancelled;
        s.result = Some(TerminalResult::Cancelled);
    }

    /// プログレッシブ方式の次のパート範囲を決める
    ///
    /// # Arguments
    /// * `index` - 再送時に指定するパート番号（None なら次の番号）
    /// * `len` - 今回送るファイルのバイト数
    /// * `is_last` - 最終パートかどうか
    pub fn progressive_part(
        &self,
        index: Option<usize>,
        len: u64,
        is_last: bool,
    ) -> Result<Part, DomainError> {
        let s = self.read();

        if s.state.is_terminal() {
            return Err(self.invalid(s.state, "session is already finished"));
        }

        let next = s.completed.len();
        let index = index.unwrap_or(next);

        if let Some(done) = s.completed.get(&index) {
            // 再送: 範囲は完了済みのものを使い、内容の一致は begin_part で確認する
            if done.part.len() != len || done.part.is_last != is_last {
                return Err(DomainError::PartMismatch {
                    session_id: self.id.clone(),
                    index,
                });
            }
            return Ok(done.part);
        }

        if matches!(
            s.state,
            SessionState::AllPartsComplete | SessionState::Finalizing
        ) {
            return Err(self.invalid(s.state, "the last part has already been uploaded"));
        }

        if index != next {
            return Err(self.invalid(
                s.state,
                format!("expected part {}, got part {}", next, index),
            ));
        }

        let start = s
            .completed
            .values()
            .next_back()
            .map(|done| done.part.end)
            .unwrap_or(0);
        Ok(Part::new(index, start, start + len, is_last))
    }
}
