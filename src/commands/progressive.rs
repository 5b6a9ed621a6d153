//! プログレッシブアップロードのコマンド
//!
//! セッションの作成と、パートの送信（`uploadPart` / `uploadLastPart`）。

use crate::commands::request::Arguments;
use crate::commands::result::BridgeError;
use crate::domain::UploadTarget;
use crate::uploader::{OperationHandle, UploadError, Uploader};
use serde_json::Value;

/// createProgressiveUploadSession: `videoId`
///
/// # 戻り値
/// セッションID
pub fn create_session(uploader: &Uploader, args: &Arguments) -> Result<Value, BridgeError> {
    let video_id = args.require_string("videoId", "missing_video_id", "videoId is missing")?;
    let session_id = uploader.create_progressive_session(video_id)?;
    Ok(Value::String(session_id))
}

/// createProgressiveUploadWithUploadTokenSession: `token`
pub fn create_session_with_token(uploader: &Uploader, args: &Arguments) -> Result<Value, BridgeError> {
    let token = args.require_string("token", "missing_token", "token is missing")?;
    let session_id = uploader.create_progressive_session_with_token(token)?;
    Ok(Value::String(session_id))
}

/// uploadPart / uploadLastPart: (`videoId` か `token` のどちらか一方), `filePath`, `uploadId`
///
/// `partIndex`（0始まり）は再送時のみ指定する。
pub fn upload_part(
    uploader: &Uploader,
    args: &Arguments,
    is_last: bool,
) -> Result<OperationHandle, UploadError> {
    let target = match (args.string("videoId"), args.string("token")) {
        (None, None) => {
            return Err(UploadError::validation(
                "missing_token_or_video_id",
                "videoId or token is missing",
            ));
        }
        (Some(_), Some(_)) => {
            return Err(UploadError::validation(
                "either_token_or_video_id",
                "Only one of videoId or token is required",
            ));
        }
        (Some(video_id), None) => UploadTarget::VideoId(video_id.to_string()),
        (None, Some(token)) => UploadTarget::Token(token.to_string()),
    };
    let file_path = args.require_string("filePath", "missing_file_path", "File path is missing")?;
    let upload_id =
        args.require_string("uploadId", "missing_operation_id", "Operation id is missing")?;
    let part_index = args
        .int("partIndex")
        .and_then(|index| usize::try_from(index).ok());

    if is_last {
        uploader.upload_last_part(upload_id, &target, file_path, part_index)
    } else {
        uploader.upload_part(upload_id, &target, file_path, part_index)
    }
}
