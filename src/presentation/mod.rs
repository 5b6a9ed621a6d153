/// プレゼンテーション層モジュール
///
/// アップローダーの結果とブリッジの出力プロトコルの橋渡しを行います。
/// プレゼンテーション層はアップローダーに依存しますが、その逆はありません。
///
/// # モジュール
/// - `output`: 出力メッセージを1行1JSONで書き出す
/// - `progress`: 操作のイベントを出力メッセージへ変換・転送

pub mod output;
pub mod progress;
