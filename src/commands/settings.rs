//! 設定系コマンド
//!
//! 成功時の値は `setChunkSize` 以外は null。
//! 引数の欠落・設定値の不正はコマンドごとの固定コードで返し、
//! 設定値の不正の原因は `details` に入れる。

use crate::commands::request::Arguments;
use crate::commands::result::BridgeError;
use crate::uploader::{UploadError, Uploader};
use serde_json::Value;

/// setSdkNameVersion
pub fn set_sdk_name_version(uploader: &Uploader, args: &Arguments) -> Result<Value, BridgeError> {
    let failed = |details: Option<Value>| {
        BridgeError::new("failed_to_set_sdk_name", "Failed to set SDK name", details)
    };
    let (Some(name), Some(version)) = (args.string("name"), args.string("version")) else {
        return Err(failed(None));
    };

    uploader
        .set_sdk_name_version(name, version)
        .map_err(|e| failed(Some(Value::String(e.to_string()))))?;
    Ok(Value::Null)
}

/// setApplicationName
pub fn set_application_name(uploader: &Uploader, args: &Arguments) -> Result<Value, BridgeError> {
    let failed = |details: Option<Value>| {
        BridgeError::new(
            "failed_to_set_application_name",
            "Failed to set application name",
            details,
        )
    };
    let (Some(name), Some(version)) = (args.string("name"), args.string("version")) else {
        return Err(failed(None));
    };

    uploader
        .set_application_name(name, version)
        .map_err(|e| failed(Some(Value::String(e.to_string()))))?;
    Ok(Value::Null)
}

/// setEnvironment
pub fn set_environment(uploader: &Uploader, args: &Arguments) -> Result<Value, BridgeError> {
    let environment =
        args.require_string("environment", "missing_environment", "Environment is missing")?;

    uploader.set_environment(environment).map_err(|e| {
        BridgeError::new(
            "missing_environment",
            "Environment is invalid",
            Some(Value::String(e.to_string())),
        )
    })?;
    Ok(Value::Null)
}

/// setApiKey
pub fn set_api_key(uploader: &Uploader, args: &Arguments) -> Result<Value, BridgeError> {
    let api_key = args.require_string("apiKey", "missing_api_key", "API key is missing")?;
    uploader.set_api_key(api_key);
    Ok(Value::Null)
}

/// setChunkSize
///
/// # 戻り値
/// 有効になったチャンクサイズ
pub fn set_chunk_size(uploader: &Uploader, args: &Arguments) -> Result<Value, BridgeError> {
    let size = args.require_int("size", "missing_chunk_size", "Chunk size is missing")?;

    let failed = |details: String| {
        BridgeError::new(
            "failed_to_set_chunk_size",
            "Failed to set chunk size",
            Some(Value::String(details)),
        )
    };
    let size = u64::try_from(size).map_err(|_| failed(format!("invalid chunk size: {}", size)))?;

    let effective = uploader
        .set_chunk_size(size)
        .map_err(|e| failed(e.to_string()))?;
    Ok(Value::from(effective))
}

/// setTimeout
///
/// 0以下や整数でない値は「指定なし」と同じ扱い。
pub fn set_timeout(uploader: &Uploader, args: &Arguments) -> Result<Value, BridgeError> {
    let missing = || UploadError::validation("missing_timeout", "Timeout is missing");
    let seconds = args
        .int("timeout")
        .and_then(|timeout| u64::try_from(timeout).ok())
        .ok_or_else(missing)?;

    uploader.set_timeout(seconds).map_err(|_| missing())?;
    Ok(Value::Null)
}
