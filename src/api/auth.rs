/// 認証マネージャー
///
/// APIキーによるHTTP Basic認証を管理します。
/// APIキーをユーザー名、空のパスワードとして Basic 認証ヘッダーを生成します。
/// アップロードトークン方式では認証ヘッダーは使いません。
use base64::{Engine as _, engine::general_purpose};

/// 認証マネージャー
#[derive(Clone)]
pub struct AuthManager {
    api_key: String,
}

impl AuthManager {
    /// 新しい認証マネージャーを作成
    ///
    /// # Arguments
    /// * `api_key` - APIキー
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }

    /// HTTP Basic認証ヘッダーの値を生成
    ///
    /// # Returns
    /// "Basic <base64(api_key:)>" 形式の文字列
    pub fn get_auth_header(&self) -> String {
        let credentials = format!("{}:", self.api_key);
        let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
        format!("Basic {}", encoded)
    }

    /// APIキーをマスキングして表示（ログ用）
    pub fn get_masked_key(&self) -> String {
        let len = self.api_key.chars().count();
        if len <= 8 {
            "*".repeat(len)
        } else {
            let head: String = self.api_key.chars().take(4).collect();
            let tail: String = self.api_key.chars().skip(len - 4).collect();
            format!("{}***{}", head, tail)
        }
    }
}
