//! vidup: api.video へのアップロードのオーケストレーター
//!
//! - `domain`: チャンク計画、セッションの状態機械、進捗の集約、レジストリ
//! - `api`: リモートアップロードAPI（HTTP）
//! - `uploader`: 公開操作（ファサード）
//! - `commands` / `presentation` / `cli`: 1行1JSON のコマンド・イベントブリッジ

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error_severity;
pub mod presentation;
pub mod uploader;
