//! lash ライブラリ — テスト・ベンチマーク用にモジュールを公開する。
//!
//! バイナリ本体は `main.rs` の起動処理と [`repl`] のループ。
//!
//! ## モジュール構成
//!
//! | モジュール | 役割 |
//! |-----------|------|
//! | [`tokenizer`] | 入力行を空白区切りのトークン列に分割 |
//! | [`parser`] | パイプライン分割（`|`）、リダイレクト解決（`>`, `>>`, `<`） |
//! | [`builtins`] | ビルトインの静的テーブル（`cd`, `pwd`, `help`, `exit`） |
//! | [`executor`] | ディスパッチ、外部コマンド起動、2 段パイプライン |
//! | [`spawn`] | `posix_spawnp` ラッパー（stdin/stdout の付け替え、不要 fd の close） |
//! | [`process`] | 子プロセスハンドル（wait は 1 回だけ）と終了ステータス |
//! | [`shell`] | シェルの状態（終了要求、直前のステータス） |
//! | [`repl`] | プロンプト → 読み取り → 実行のループ |
//! | [`prompt`] | `<user>@<host> <cwd> > ` の組み立て |
//! | [`config`] | コマンドライン引数・環境変数からの起動設定 |
//! | [`error`] | シェル全体のエラー型 |

pub mod builtins;
pub mod config;
pub mod error;
pub mod executor;
pub mod parser;
pub mod process;
pub mod prompt;
pub mod repl;
pub mod shell;
pub mod spawn;
pub mod tokenizer;
