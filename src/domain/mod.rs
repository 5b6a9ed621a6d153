//! ドメイン層
//!
//! アップロードのビジネスルール（チャンク計画、セッションの状態機械、
//! 進捗の集約、セッションレジストリ、アップロード元ファイルの扱い）。
//! HTTP やブリッジのプロトコルには依存しない。

pub mod chunk;
pub mod error;
pub mod progress;
pub mod registry;
pub mod session;
pub mod validator;
pub mod video;

pub use chunk::{Part, plan};
pub use error::DomainError;
pub use progress::ProgressAggregator;
pub use registry::SessionRegistry;
pub use session::{
    PartStart, SessionId, SessionState, TerminalResult, UploadMode, UploadSession, UploadTarget,
};
pub use video::VideoDescriptor;
