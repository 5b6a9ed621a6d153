/// HTTPクライアント
///
/// api.videoとの通信を担当するHTTPクライアント。
/// タイムアウト、エラーハンドリング、HTTP Basic認証、multipart でのパート送信を含みます。
use crate::api::auth::AuthManager;
use crate::api::error::InfraError;
use crate::api::remote::{PartRequest, ProgressFn, RemoteUploadApi, SendPartFuture};
use crate::api::types::ApiProblem;
use crate::config::error::ConfigError;
use crate::config::{APP_CONFIG, UploaderSettings};
use crate::domain::{UploadTarget, VideoDescriptor};
use futures_util::{StreamExt, stream};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part as FormPart};
use reqwest::{Body, Client, Response};
use std::io;
use std::time::Duration;
use tracing::debug;

/// APIクライアントの結果型
type ApiResult<T> = Result<T, InfraError>;

const SDK_ORIGIN_HEADER: &str = "AV-Origin-Sdk";
const APP_ORIGIN_HEADER: &str = "AV-Origin-App";

/// APIクライアント
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Option<AuthManager>,
    /// 進捗を通知する単位（バイト）
    progress_step: usize,
}

impl ApiClient {
    /// 新しいAPIクライアントを作成
    ///
    /// # Arguments
    /// * `base_url` - APIのベースURL（例: "https://ws.api.video"）
    /// * `timeout` - リクエストのタイムアウト
    /// * `default_headers` - 全リクエストに付けるヘッダー
    ///
    /// # Returns
    /// 設定済みのAPIクライアント
    pub fn new(base_url: String, timeout: Duration, default_headers: HeaderMap) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|e| InfraError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth: None,
            progress_step: APP_CONFIG.upload.progress_step_bytes,
        })
    }

    /// 設定のスナップショットからクライアントを作成
    ///
    /// 環境（ベースURL）、タイムアウト、APIキー、SDK/アプリ識別ヘッダーを反映する。
    pub fn from_settings(settings: &UploaderSettings) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        for (name, identity) in [
            (SDK_ORIGIN_HEADER, &settings.sdk),
            (APP_ORIGIN_HEADER, &settings.application),
        ] {
            if let Some(identity) = identity {
                headers.insert(name, header_value(name, &identity.header_value())?);
            }
        }

        let client = Self::new(
            settings.environment.base_url().to_string(),
            settings.timeout,
            headers,
        )?;

        Ok(match &settings.api_key {
            Some(key) => client.with_auth(AuthManager::new(key.clone())),
            None => client,
        })
    }

    /// APIキー認証を付与
    pub fn with_auth(mut self, auth: AuthManager) -> Self {
        debug!(api_key = %auth.get_masked_key(), "API key authentication enabled");
        self.auth = Some(auth);
        self
    }

    /// 進捗通知の単位を変更
    pub fn with_progress_step(mut self, bytes: usize) -> Self {
        self.progress_step = bytes.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// パートを multipart で送信
    ///
    /// - 動画ID指定: `POST /videos/{videoId}/source`（Basic認証）
    /// - トークン指定: `POST /upload?token=...`（認証なし、2パート目以降は `videoId` フィールドを付与）
    async fn upload_part(&self, request: PartRequest, progress: ProgressFn) -> ApiResult<VideoDescriptor> {
        let endpoint = match &request.target {
            UploadTarget::VideoId(video_id) => format!("/videos/{}/source", video_id),
            UploadTarget::Token(_) => "/upload".to_string(),
        };
        let url = self.build_url(&endpoint);

        let content_range = request.content_range();
        let length = request.data.len() as u64;
        let body = progress_body(request.data, self.progress_step, progress);
        let file = FormPart::stream_with_length(body, length).file_name(request.file_name);

        let mut form = Form::new().part("file", file);
        if let (UploadTarget::Token(_), Some(video_id)) = (&request.target, request.video_id) {
            form = form.text("videoId", video_id);
        }

        let mut builder = self.client.post(&url).multipart(form);
        match &request.target {
            UploadTarget::VideoId(_) => {
                if let Some(auth) = &self.auth {
                    builder = builder.header("Authorization", auth.get_auth_header());
                }
            }
            UploadTarget::Token(token) => {
                builder = builder.query(&[("token", token)]);
            }
        }
        if let Some(range) = &content_range {
            builder = builder.header("Content-Range", range);
        }

        debug!(
            endpoint = %endpoint,
            part = request.part.index,
            bytes = length,
            content_range = content_range.as_deref().unwrap_or("-"),
            "sending part"
        );

        let response = Self::send_with_error_handling(builder, &endpoint, "POST").await?;
        let response = Self::check_response(response, &endpoint).await?;
        let body: serde_json::Value = Self::parse_json(response, &endpoint).await?;
        Ok(VideoDescriptor::new(body))
    }

    /// URLを構築
    fn build_url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// リクエストを送信し、エラーハンドリングを行う
    async fn send_with_error_handling(
        request: reqwest::RequestBuilder,
        endpoint: &str,
        method: &str,
    ) -> ApiResult<Response> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                InfraError::timeout(format!("{} {}", method, endpoint))
            } else if e.is_connect() {
                InfraError::network(format!("Connection failed for {} {}: {}", method, endpoint, e))
            } else {
                InfraError::network(format!("Request failed for {} {}: {}", method, endpoint, e))
            }
        })
    }

    /// レスポンスをチェックしてエラーを返す
    ///
    /// エラー時の本文はそのまま保持し、problem JSON ならメッセージを取り出す。
    ///
    /// # Arguments
    /// * `response` - HTTPレスポンス
    /// * `endpoint` - エンドポイント名（エラーメッセージ用）
    pub async fn check_response(response: Response, endpoint: &str) -> ApiResult<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let status_code = status.as_u16();
        let body = response.text().await.ok().filter(|text| !text.is_empty());

        let problem = body.as_deref().and_then(ApiProblem::from_body);
        let message = problem
            .as_ref()
            .and_then(ApiProblem::message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {}", status_code))
            });
        let status_code = problem
            .and_then(|problem| problem.status)
            .unwrap_or(status_code);

        Err(InfraError::api(endpoint, message, Some(status_code), body))
    }

    /// JSONレスポンスをデシリアライズ
    pub async fn parse_json<T: serde::de::DeserializeOwned>(
        response: Response,
        endpoint: &str,
    ) -> ApiResult<T> {
        response.json().await.map_err(|e| {
            InfraError::invalid_response(endpoint, format!("Failed to parse JSON response: {}", e))
        })
    }
}

impl RemoteUploadApi for ApiClient {
    fn send_part(&self, request: PartRequest, progress: ProgressFn) -> SendPartFuture<'_> {
        Box::pin(self.upload_part(request, progress))
    }
}

/// ヘッダー値を作成（不正な値は設定エラー）
fn header_value(name: &str, value: &str) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| {
        InfraError::from(ConfigError::invalid_client_identity(
            name,
            format!("invalid header value: {}", e),
        ))
    })
}

/// 送信したバイト数を通知しながら本文を流すストリーム
///
/// reqwest が1スライス取り出すごとに、そのパートの累計送信バイト数を通知する。
fn progress_body(data: Vec<u8>, step: usize, progress: ProgressFn) -> Body {
    let slices: Vec<Vec<u8>> = data.chunks(step.max(1)).map(<[u8]>::to_vec).collect();
    let mut sent = 0u64;
    let stream = stream::iter(slices).map(move |slice| {
        sent += slice.len() as u64;
        progress(sent);
        Ok::<_, io::Error>(slice)
    });
    Body::wrap_stream(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientIdentity, Environment};
    use crate::domain::Part;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::Arc;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> UploaderSettings {
        UploaderSettings {
            environment: Environment::Custom(server.uri()),
            api_key: Some("my_api_key".to_string()),
            ..Default::default()
        }
    }

    fn request(target: UploadTarget, part: Part, total: u64, data: &[u8]) -> PartRequest {
        PartRequest {
            target,
            file_name: "clip.mp4".into(),
            part,
            total_size: Some(total),
            data: data.to_vec(),
            progressive: false,
            video_id: None,
        }
    }

    fn recorder() -> (ProgressFn, Arc<Mutex<Vec<u64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress: ProgressFn = Arc::new(move |bytes| sink.lock().unwrap().push(bytes));
        (progress, seen)
    }

    #[test]
    fn test_client_creation() {
        let client = ApiClient::new(
            "https://ws.api.video/".to_string(),
            Duration::from_secs(5),
            HeaderMap::new(),
        );
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url(), "https://ws.api.video");
    }

    #[test]
    fn test_sandbox_client_from_settings() {
        let settings = UploaderSettings {
            environment: Environment::Sandbox,
            ..Default::default()
        };
        let client = ApiClient::from_settings(&settings).unwrap();
        assert_eq!(client.base_url(), "https://sandbox.api.video");
    }

    #[test]
    fn test_invalid_header_value_is_config_error() {
        let err = header_value(SDK_ORIGIN_HEADER, "flutter\nuploader:1.0").unwrap_err();
        assert!(matches!(
            err,
            InfraError::Config(ConfigError::InvalidClientIdentity { .. })
        ));
        assert!(header_value(SDK_ORIGIN_HEADER, "flutter-uploader:1.2.0").is_ok());
    }

    #[tokio::test]
    async fn test_video_source_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/videos/vi1/source"))
            .and(header("Authorization", "Basic bXlfYXBpX2tleTo="))
            .and(header("Content-Range", "bytes 0-9/20"))
            .and(header("AV-Origin-Sdk", "flutter-uploader:1.2.0"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "videoId": "vi1",
                "title": "clip"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut settings = settings_for(&server);
        settings.sdk = Some(ClientIdentity::new("sdk", "flutter-uploader", "1.2.0").unwrap());
        let client = ApiClient::from_settings(&settings)
            .unwrap()
            .with_progress_step(4);

        let (progress, seen) = recorder();
        let descriptor = client
            .send_part(
                request(
                    UploadTarget::VideoId("vi1".into()),
                    Part::new(0, 0, 10, false),
                    20,
                    &[7u8; 10],
                ),
                progress,
            )
            .await
            .unwrap();

        assert_eq!(descriptor.video_id(), Some("vi1"));
        assert_eq!(*seen.lock().unwrap(), vec![4, 8, 10]);
    }

    #[tokio::test]
    async fn test_token_upload_sends_video_id_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(query_param("token", "to1"))
            .and(header("Content-Range", "part 2/2"))
            .and(body_string_contains("name=\"videoId\""))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "videoId": "vi9" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::from_settings(&settings_for(&server)).unwrap();
        let mut req = request(
            UploadTarget::Token("to1".into()),
            Part::new(1, 3, 6, true),
            6,
            b"abc",
        );
        req.progressive = true;
        req.total_size = None;
        req.video_id = Some("vi9".into());

        let (progress, _) = recorder();
        let descriptor = client.send_part(req, progress).await.unwrap();
        assert_eq!(descriptor.video_id(), Some("vi9"));
    }

    #[tokio::test]
    async fn test_api_error_is_kept_verbatim() {
        let server = MockServer::start().await;
        let body = r#"{"title":"This token is invalid.","status":404}"#;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(404).set_body_string(body))
            .mount(&server)
            .await;

        let client = ApiClient::from_settings(&settings_for(&server)).unwrap();
        let (progress, _) = recorder();
        let err = client
            .send_part(
                request(UploadTarget::Token("bad".into()), Part::new(0, 0, 1, true), 1, b"x"),
                progress,
            )
            .await
            .unwrap_err();

        match err {
            InfraError::Api {
                status_code,
                message,
                body: raw,
                ..
            } => {
                assert_eq!(status_code, Some(404));
                assert_eq!(message, "This token is invalid.");
                assert_eq!(raw.as_deref(), Some(body));
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_plain_error_body_uses_reason_phrase() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let client = ApiClient::from_settings(&settings_for(&server)).unwrap();
        let (progress, _) = recorder();
        let err = client
            .send_part(
                request(UploadTarget::VideoId("vi1".into()), Part::new(0, 0, 1, true), 1, b"x"),
                progress,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            InfraError::Api { status_code: Some(502), ref message, .. } if message == "Bad Gateway"
        ));
    }

    #[tokio::test]
    async fn test_connection_failure_is_network_error() {
        let settings = UploaderSettings {
            environment: Environment::Custom("http://127.0.0.1:9".to_string()),
            ..Default::default()
        };
        let client = ApiClient::from_settings(&settings).unwrap();
        let (progress, _) = recorder();
        let err = client
            .send_part(
                request(UploadTarget::VideoId("vi1".into()), Part::new(0, 0, 1, true), 1, b"x"),
                progress,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, InfraError::Network { .. }));
    }
}
