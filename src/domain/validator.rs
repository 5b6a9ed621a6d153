/// ドメインサービス: アップロード元ファイルの検証と読み出し
///
/// アップロード対象のファイルを検証し、パートのバイト範囲を読み出す。
/// 空ファイルも有効（空範囲のパート1つでセッションを完了できる）。
use crate::domain::chunk::Part;
use crate::domain::error::DomainError;
use sha2::{Digest, Sha256};
use std::io::{self, SeekFrom};
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// ファイルのバリデーション結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub path: String,
    pub size: u64,
    /// multipart の filename に使うファイル名
    pub file_name: String,
}

/// アップロード対象のファイルをバリデーションする
///
/// # エラー
/// - ファイルが存在しない
/// - ディレクトリが指定された
pub async fn validate_upload_file(file_path: &str) -> Result<ValidationResult, DomainError> {
    let path = Path::new(file_path);

    // メタデータ取得（存在しない・読めない場合はFileNotFoundとして扱う）
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| DomainError::file_not_found(file_path))?;

    // ディレクトリチェック
    if metadata.is_dir() {
        return Err(DomainError::not_a_file(file_path));
    }

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("file")
        .to_string();

    Ok(ValidationResult {
        path: file_path.to_string(),
        size: metadata.len(),
        file_name,
    })
}

/// パートのバイト範囲を読み出す
///
/// # エラー
/// ファイルが計画時より短くなっていた場合は `UnexpectedEof`
pub async fn read_part(file_path: &str, part: &Part) -> io::Result<Vec<u8>> {
    let mut file = tokio::fs::File::open(file_path).await?;
    file.seek(SeekFrom::Start(part.start)).await?;

    let len = usize::try_from(part.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("part of {} bytes does not fit in memory", part.len()),
        )
    })?;
    let mut buf = vec![0u8; len];
    file.read_exact(&mut buf).await?;
    Ok(buf)
}

/// パート内容の SHA-256 (hex)
///
/// 同じパートの再送が同一内容かどうかの判定に使う。
pub fn part_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
