use vidup::api::error::InfraError;
use vidup::cli;
use vidup::config::APP_CONFIG;
use vidup::config::error::ConfigError;
use vidup::domain::error::DomainError;
use vidup::uploader::UploadError;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = cli::run().await {
        handle_error(e);
    }
}

/// ログの初期化
///
/// stdout はブリッジのプロトコル専用なので、ログは stderr に出す。
/// `RUST_LOG` がなければ埋め込み設定のレベルを使う。
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&APP_CONFIG.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// エラーハンドリングとユーザーへの表示
///
/// anyhow::Error から元のエラー型を downcast して、
/// エラーの種類に応じた exit code とメッセージを決定する。
fn handle_error(error: anyhow::Error) {
    // エラーメッセージのヘッダー
    eprintln!("Error: {}", error);

    // エラーチェーンを辿って詳細を表示
    let chain: Vec<_> = error.chain().skip(1).collect();
    if !chain.is_empty() {
        eprintln!("\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            eprintln!("  {}: {}", i + 1, cause);
        }
    }

    // エラーの根本原因を downcast して判定
    let exit_code = determine_exit_code(&error);

    // ユーザー向けのヒントを表示
    if let Some(hint) = get_error_hint(&error) {
        eprintln!("\nHint: {}", hint);
    }

    // 適切な終了コードで終了
    std::process::exit(exit_code);
}

/// エラーチェーンから適切な終了コードを決定
fn determine_exit_code(error: &anyhow::Error) -> i32 {
    for cause in error.chain() {
        if let Some(upload_err) = cause.downcast_ref::<UploadError>() {
            return upload_err.severity().exit_code();
        }

        if let Some(domain_err) = cause.downcast_ref::<DomainError>() {
            return domain_err.severity().exit_code();
        }

        if let Some(infra_err) = cause.downcast_ref::<InfraError>() {
            return infra_err.severity().exit_code();
        }

        if let Some(config_err) = cause.downcast_ref::<ConfigError>() {
            return config_err.severity().exit_code();
        }

        // 標準入出力の障害
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return vidup::error_severity::ErrorSeverity::SystemError.exit_code();
        }
    }

    // 不明なエラーの場合はデフォルトの終了コード
    1
}

/// エラーに対するユーザー向けヒントを取得
fn get_error_hint(error: &anyhow::Error) -> Option<String> {
    for cause in error.chain() {
        if let Some(domain_err) = cause.downcast_ref::<DomainError>() {
            if let Some(hint) = domain_err.hint() {
                return Some(hint.to_string());
            }
        }

        if let Some(config_err) = cause.downcast_ref::<ConfigError>() {
            if let Some(hint) = config_err.hint() {
                return Some(hint.to_string());
            }
        }
    }

    None
}
